// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! Typed memory layout descriptor.
//!
//! A [`Descriptor`] is an ordered list of [`Segment`]s. Each segment is one permission-uniform
//! `PT_LOAD` program header and carries an ordered list of [`OutputSection`]s, which in turn are
//! built from [`Item`]s: symbol definitions, alignment and reservation directives, and input
//! section patterns.

use crate::{error::LayoutError, is_aligned};
use bitflags::bitflags;
use std::collections::BTreeSet;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// First address past a 32 bit address space.
pub const ADDRESS_LIMIT: u64 = 1 << 32;

bitflags! {
    /// Program header permission bits, as found in `p_flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct SegmentFlags: u32 {
        /// `PF_X`
        const EXECUTE = 1 << 0;
        /// `PF_W`
        const WRITE = 1 << 1;
        /// `PF_R`
        const READ = 1 << 2;
    }
}

/// Ordering applied to the input sections matched by one [`InputSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortPolicy {
    /// Keep the order in which the inputs were encountered.
    #[default]
    None,
    /// `SORT_BY_NAME`
    ByName,
    /// `SORT_BY_INIT_PRIORITY`, ascending numeric suffix.
    ByInitPriority,
}

/// A set of input section name patterns and how to treat what they match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    /// Glob patterns (`*`, `?`) matched against input section names.
    pub patterns: Vec<&'static str>,
    /// Matched sections survive garbage collection.
    pub keep: bool,
    /// Ordering of the matched sections.
    pub sort: SortPolicy,
}

/// One statement inside an output section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// Define a symbol at the current location.
    Symbol(&'static str),
    /// Align the current location.
    Align(u64),
    /// Advance the current location by a fixed number of bytes.
    Reserve(u64),
    /// Place the matching input sections.
    Input(InputSpec),
}

/// Whether an output section occupies bytes in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// Contents are stored in the image.
    Progbits,
    /// Only the extent is recorded, contents are zero at runtime.
    Nobits,
}

/// A named output section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSection {
    /// Section name, e.g. `.text`.
    pub name: &'static str,
    /// Minimum start alignment.
    pub align: u64,
    /// File-backed or not.
    pub kind: SectionKind,
    /// Statements, in placement order.
    pub items: Vec<Item>,
}

/// A loadable segment, i.e. one `PT_LOAD` program header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Program header name used in `PHDRS`.
    pub name: &'static str,
    /// Permissions.
    pub flags: SegmentFlags,
    /// Output sections, in address order.
    pub sections: Vec<OutputSection>,
}

/// The complete layout of a process image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// BFD output format name.
    pub output_format: &'static str,
    /// BFD architecture name.
    pub output_arch: &'static str,
    /// Entry symbol.
    pub entry: &'static str,
    /// Input section holding the entry symbol.
    pub entry_section: &'static str,
    /// Address of the first segment.
    pub load_address: u64,
    /// Segment start alignment.
    pub page_size: u64,
    /// Loadable segments, in address order.
    pub segments: Vec<Segment>,
    /// Sections collected at address 0, outside every segment.
    pub unloaded: Vec<OutputSection>,
    /// Symbols consumers rely on. Each must be defined exactly once.
    pub required_symbols: Vec<&'static str>,
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl SegmentFlags {
    /// Code.
    pub const RX: Self = Self::READ.union(Self::EXECUTE);

    /// Read-only data.
    pub const RO: Self = Self::READ;

    /// Writable data.
    pub const RW: Self = Self::READ.union(Self::WRITE);

    /// True if the combination must never be mapped.
    pub const fn is_writable_and_executable(self) -> bool {
        self.contains(Self::WRITE.union(Self::EXECUTE))
    }
}

impl InputSpec {
    /// Create an unkept, unsorted spec.
    pub fn new(patterns: &[&'static str]) -> Self {
        Self {
            patterns: patterns.to_vec(),
            keep: false,
            sort: SortPolicy::None,
        }
    }

    /// Protect the matched sections from garbage collection.
    pub fn kept(mut self) -> Self {
        self.keep = true;
        self
    }

    /// Order the matched sections.
    pub fn sorted(mut self, sort: SortPolicy) -> Self {
        self.sort = sort;
        self
    }

    /// True if any pattern matches `name`.
    pub fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| crate::glob::matches(p, name))
    }
}

impl OutputSection {
    /// Create an empty, 1-byte-aligned, file-backed section.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            align: 1,
            kind: SectionKind::Progbits,
            items: Vec::new(),
        }
    }

    /// Set the start alignment.
    pub fn aligned(mut self, align: u64) -> Self {
        self.align = align;
        self
    }

    /// Mark the section as not file-backed.
    pub fn nobits(mut self) -> Self {
        self.kind = SectionKind::Nobits;
        self
    }

    /// Append a symbol definition.
    pub fn symbol(mut self, name: &'static str) -> Self {
        self.items.push(Item::Symbol(name));
        self
    }

    /// Append an alignment directive.
    pub fn align(mut self, align: u64) -> Self {
        self.items.push(Item::Align(align));
        self
    }

    /// Append a fixed-size reservation.
    pub fn reserve(mut self, size: u64) -> Self {
        self.items.push(Item::Reserve(size));
        self
    }

    /// Append an input statement.
    pub fn input(mut self, spec: InputSpec) -> Self {
        self.items.push(Item::Input(spec));
        self
    }

    /// Append an unkept, unsorted input statement.
    pub fn inputs(self, patterns: &[&'static str]) -> Self {
        self.input(InputSpec::new(patterns))
    }

    /// Append a kept input statement.
    pub fn keep(self, patterns: &[&'static str]) -> Self {
        self.input(InputSpec::new(patterns).kept())
    }

    /// Symbols defined by this section, in order.
    pub fn symbols(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.items.iter().filter_map(|i| match i {
            Item::Symbol(s) => Some(*s),
            _ => None,
        })
    }

    /// Input statements of this section, in order.
    pub fn input_specs(&self) -> impl Iterator<Item = &InputSpec> {
        self.items.iter().filter_map(|i| match i {
            Item::Input(spec) => Some(spec),
            _ => None,
        })
    }
}

impl Segment {
    /// Create a segment without sections.
    pub fn new(name: &'static str, flags: SegmentFlags) -> Self {
        Self {
            name,
            flags,
            sections: Vec::new(),
        }
    }

    /// Append an output section.
    pub fn section(mut self, section: OutputSection) -> Self {
        self.sections.push(section);
        self
    }
}

impl Descriptor {
    /// All output sections, loadable ones first.
    pub fn sections(&self) -> impl Iterator<Item = &OutputSection> {
        self.segments
            .iter()
            .flat_map(|s| s.sections.iter())
            .chain(self.unloaded.iter())
    }

    /// All symbols the descriptor defines.
    pub fn defined_symbols(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.sections().flat_map(|s| s.symbols())
    }

    /// Look up a segment by name.
    pub fn segment(&self, name: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.name == name)
    }

    /// Look up an output section by name.
    pub fn section(&self, name: &str) -> Option<&OutputSection> {
        self.sections().find(|s| s.name == name)
    }

    /// The first executable segment.
    pub fn code_segment(&self) -> Option<&Segment> {
        self.segments
            .iter()
            .find(|s| s.flags.contains(SegmentFlags::EXECUTE))
    }

    /// The flags declared for the segment at `index`, if any.
    pub fn flags_of(&self, index: usize) -> Option<SegmentFlags> {
        self.segments.get(index).map(|s| s.flags)
    }

    /// Check the structural rules every usable descriptor follows.
    pub fn validate(&self) -> Result<(), LayoutError> {
        check_alignment("page size", self.page_size)?;

        if !is_aligned(self.load_address, self.page_size) {
            return Err(LayoutError::UnalignedLoadAddress {
                address: self.load_address,
                page_size: self.page_size,
            });
        }
        if self.load_address >= ADDRESS_LIMIT {
            return Err(LayoutError::AddressOverflow {
                limit: ADDRESS_LIMIT,
            });
        }

        let mut segment_names = BTreeSet::new();
        for segment in &self.segments {
            if !segment_names.insert(segment.name) {
                return Err(LayoutError::DuplicateSegment(segment.name.into()));
            }
            if segment.flags.is_writable_and_executable() {
                return Err(LayoutError::WritableAndExecutable(segment.name.into()));
            }
            if segment.sections.is_empty() {
                return Err(LayoutError::EmptySegment(segment.name.into()));
            }
        }

        let mut section_names = BTreeSet::new();
        for section in self.sections() {
            if !section_names.insert(section.name) {
                return Err(LayoutError::DuplicateSection(section.name.into()));
            }
            check_alignment(section.name, section.align)?;

            for item in &section.items {
                if let Item::Align(a) = item {
                    check_alignment(section.name, *a)?;
                }
            }
        }

        let mut symbols = BTreeSet::new();
        for symbol in self.defined_symbols() {
            if !symbols.insert(symbol) {
                return Err(LayoutError::DuplicateSymbol(symbol.into()));
            }
        }
        if let Some(missing) = self
            .required_symbols
            .iter()
            .find(|s| !symbols.contains(*s))
        {
            return Err(LayoutError::MissingSymbol((*missing).into()));
        }

        self.validate_entry_placement()
    }
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

fn check_alignment(what: &str, value: u64) -> Result<(), LayoutError> {
    if value.is_power_of_two() {
        Ok(())
    } else {
        Err(LayoutError::BadAlignment {
            what: what.into(),
            value,
        })
    }
}

impl Descriptor {
    /// The code segment must be declared first, and the entry section must be its first input,
    /// kept.
    fn validate_entry_placement(&self) -> Result<(), LayoutError> {
        if let Some(first) = self.segments.first() {
            if !first.flags.contains(SegmentFlags::EXECUTE) {
                return Err(LayoutError::CodeNotFirst(first.name.into()));
            }
        }

        let first = self
            .code_segment()
            .and_then(|seg| seg.sections.first())
            .and_then(|sec| {
                sec.items.iter().find_map(|i| match i {
                    Item::Input(spec) => Some(Some(spec)),
                    Item::Reserve(n) if *n > 0 => Some(None),
                    _ => None,
                })
            })
            .flatten();

        match first {
            Some(spec) if spec.keep && spec.patterns == [self.entry_section] => Ok(()),
            _ => Err(LayoutError::EntryNotFirst(self.entry_section.into())),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
