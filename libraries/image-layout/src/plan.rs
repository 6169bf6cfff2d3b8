// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! Address planning.
//!
//! Evaluates a [`Descriptor`] against a list of input sections the way the link-time tool does:
//! every input goes to the first statement in script order whose patterns match it, segments start
//! page aligned in declaration order, and symbols take the value of the location counter where they
//! are defined. Inputs that no statement matches are orphans; they are reported, not placed.

use crate::{
    align_up,
    descriptor::{
        Descriptor, InputSpec, Item, OutputSection, SectionKind, SegmentFlags, SortPolicy,
        ADDRESS_LIMIT,
    },
    error::LayoutError,
};
use log::{debug, warn};
use std::collections::BTreeMap;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// One input section, as found in an object file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSection {
    /// Section name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Required alignment.
    pub align: u64,
    /// Reachable from a garbage collection root.
    pub retained: bool,
}

/// Knobs of the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlanOptions {
    /// Drop inputs that are neither retained nor kept, like `--gc-sections`.
    pub gc_sections: bool,
}

/// Where one input section ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Input section name.
    pub name: String,
    /// Start address.
    pub address: u64,
    /// Size in bytes.
    pub size: u64,
}

/// A planned output section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSection {
    /// Output section name.
    pub name: &'static str,
    /// File-backed or not.
    pub kind: SectionKind,
    /// Start address.
    pub address: u64,
    /// Size in bytes.
    pub size: u64,
    /// Placed inputs, in address order.
    pub placements: Vec<Placement>,
}

/// A planned loadable segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSegment {
    /// Program header name.
    pub name: &'static str,
    /// Permissions.
    pub flags: SegmentFlags,
    /// Start address.
    pub address: u64,
    /// Size in memory.
    pub mem_size: u64,
    /// Size in the file. Trailing `Nobits` sections do not count.
    pub file_size: u64,
    /// Output sections.
    pub sections: Vec<PlannedSection>,
}

/// The result of planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Entry address.
    pub entry: u64,
    /// Loadable segments, in address order.
    pub segments: Vec<PlannedSegment>,
    /// Sections at address 0.
    pub unloaded: Vec<PlannedSection>,
    /// Symbol values, including the entry symbol.
    pub symbols: BTreeMap<String, u64>,
    /// Inputs that matched no statement.
    pub orphans: Vec<InputSection>,
    /// Inputs removed by garbage collection.
    pub discarded: Vec<InputSection>,
}

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

/// Inputs assigned to each statement, keyed by (output section index, item index).
type Assignment<'a> = BTreeMap<(usize, usize), Vec<&'a InputSection>>;

struct Cursor {
    value: u64,
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl Cursor {
    fn align(&mut self, alignment: u64) -> Result<(), LayoutError> {
        self.value = align_up(self.value, alignment).ok_or(LayoutError::AddressOverflow {
            limit: ADDRESS_LIMIT,
        })?;
        self.check()
    }

    fn advance(&mut self, size: u64) -> Result<(), LayoutError> {
        self.value = self.value.checked_add(size).ok_or(LayoutError::AddressOverflow {
            limit: ADDRESS_LIMIT,
        })?;
        self.check()
    }

    fn check(&self) -> Result<(), LayoutError> {
        if self.value > ADDRESS_LIMIT {
            return Err(LayoutError::AddressOverflow {
                limit: ADDRESS_LIMIT,
            });
        }
        Ok(())
    }
}

/// Numeric suffix after the last dot, e.g. `101` for `.init_array.00101`.
fn init_priority(name: &str) -> u64 {
    name.rsplit_once('.')
        .and_then(|(_, suffix)| suffix.parse().ok())
        .unwrap_or(u64::MAX)
}

fn sort_inputs(inputs: &mut [&InputSection], sort: SortPolicy) {
    match sort {
        SortPolicy::None => (),
        SortPolicy::ByName => inputs.sort_by(|a, b| a.name.cmp(&b.name)),
        SortPolicy::ByInitPriority => inputs.sort_by_key(|i| init_priority(&i.name)),
    }
}

fn input_align(section: &OutputSection, index: usize, assignment: &Assignment<'_>) -> u64 {
    section
        .items
        .iter()
        .enumerate()
        .filter_map(|(item, _)| assignment.get(&(index, item)))
        .flatten()
        .map(|i| i.align)
        .fold(section.align, u64::max)
}

fn place_section(
    section: &OutputSection,
    index: usize,
    assignment: &Assignment<'_>,
    cursor: &mut Cursor,
    symbols: &mut BTreeMap<String, u64>,
) -> Result<PlannedSection, LayoutError> {
    cursor.align(input_align(section, index, assignment))?;

    let address = cursor.value;
    let mut placements = Vec::new();

    for (item_index, item) in section.items.iter().enumerate() {
        match item {
            Item::Symbol(name) => {
                symbols.insert((*name).to_string(), cursor.value);
            }
            Item::Align(a) => cursor.align(*a)?,
            Item::Reserve(n) => cursor.advance(*n)?,
            Item::Input(_) => {
                for input in assignment.get(&(index, item_index)).into_iter().flatten() {
                    cursor.align(input.align)?;
                    placements.push(Placement {
                        name: input.name.clone(),
                        address: cursor.value,
                        size: input.size,
                    });
                    cursor.advance(input.size)?;
                }
            }
        }
    }

    Ok(PlannedSection {
        name: section.name,
        kind: section.kind,
        address,
        size: cursor.value - address,
        placements,
    })
}

/// Find the first statement in script order that matches `name`.
fn first_match<'d>(
    sections: &[&'d OutputSection],
    name: &str,
) -> Option<(usize, usize, &'d InputSpec)> {
    sections.iter().enumerate().find_map(|(s, section)| {
        section
            .items
            .iter()
            .enumerate()
            .find_map(|(i, item)| match item {
                Item::Input(spec) if spec.matches(name) => Some((s, i, spec)),
                _ => None,
            })
    })
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl PlannedSegment {
    /// A segment is loadable only if one of its sections has content.
    pub fn is_loadable(&self) -> bool {
        self.sections.iter().any(|s| s.size > 0)
    }

    /// First address past the segment in memory.
    pub fn end(&self) -> u64 {
        self.address + self.mem_size
    }
}

impl Plan {
    /// Value of `name`, if defined.
    pub fn symbol(&self, name: &str) -> Option<u64> {
        self.symbols.get(name).copied()
    }

    /// Look up a planned section, loadable or not.
    pub fn section(&self, name: &str) -> Option<&PlannedSection> {
        self.segments
            .iter()
            .flat_map(|s| s.sections.iter())
            .chain(self.unloaded.iter())
            .find(|s| s.name == name)
    }

    /// Iterate over every placement in the loadable segments.
    pub fn placements(&self) -> impl Iterator<Item = (&PlannedSegment, &Placement)> {
        self.segments.iter().flat_map(|seg| {
            seg.sections
                .iter()
                .flat_map(move |sec| sec.placements.iter().map(move |p| (seg, p)))
        })
    }
}

/// Plan the addresses of `inputs` under `descriptor`.
pub fn plan(
    descriptor: &Descriptor,
    inputs: &[InputSection],
    options: PlanOptions,
) -> Result<Plan, LayoutError> {
    descriptor.validate()?;

    let sections: Vec<&OutputSection> = descriptor.sections().collect();
    let mut assignment = Assignment::new();
    let mut orphans = Vec::new();
    let mut discarded = Vec::new();

    for input in inputs {
        if !input.align.is_power_of_two() {
            return Err(LayoutError::BadAlignment {
                what: input.name.clone(),
                value: input.align,
            });
        }

        let matched = first_match(&sections, &input.name);
        let kept = matches!(matched, Some((_, _, spec)) if spec.keep);

        if options.gc_sections && !input.retained && !kept {
            discarded.push(input.clone());
            continue;
        }

        match matched {
            Some((s, i, _)) => assignment.entry((s, i)).or_default().push(input),
            None => {
                warn!("orphan input section {} ({:#x} bytes)", input.name, input.size);
                orphans.push(input.clone());
            }
        }
    }

    for (&(s, i), matched) in assignment.iter_mut() {
        if let Item::Input(spec) = &sections[s].items[i] {
            sort_inputs(matched, spec.sort);
        }
    }

    let mut symbols = BTreeMap::new();
    let mut cursor = Cursor {
        value: descriptor.load_address,
    };
    let mut segments = Vec::with_capacity(descriptor.segments.len());
    let mut index = 0;

    for segment in &descriptor.segments {
        cursor.align(descriptor.page_size)?;
        let address = cursor.value;
        let mut planned = Vec::with_capacity(segment.sections.len());

        for section in &segment.sections {
            planned.push(place_section(
                section,
                index,
                &assignment,
                &mut cursor,
                &mut symbols,
            )?);
            index += 1;
        }

        let file_end = planned
            .iter()
            .filter(|s| s.kind == SectionKind::Progbits)
            .map(|s| s.address + s.size)
            .max()
            .unwrap_or(address);

        debug!(
            "segment {} flags {} at {:#x}..{:#x}",
            segment.name,
            segment.flags.bits(),
            address,
            cursor.value
        );

        segments.push(PlannedSegment {
            name: segment.name,
            flags: segment.flags,
            address,
            mem_size: cursor.value - address,
            file_size: file_end.saturating_sub(address),
            sections: planned,
        });
    }

    let mut unloaded = Vec::with_capacity(descriptor.unloaded.len());
    for section in &descriptor.unloaded {
        let mut scratch = BTreeMap::new();
        let mut at_zero = Cursor { value: 0 };

        unloaded.push(place_section(
            section,
            index,
            &assignment,
            &mut at_zero,
            &mut scratch,
        )?);
        index += 1;
    }

    let entry = segments
        .iter()
        .find(|s| s.flags.contains(SegmentFlags::EXECUTE))
        .and_then(|s| s.sections.first())
        .and_then(|s| s.placements.first())
        .filter(|p| p.name == descriptor.entry_section)
        .map(|p| p.address)
        .ok_or_else(|| LayoutError::MissingEntrySection(descriptor.entry_section.into()))?;
    symbols.insert(descriptor.entry.to_string(), entry);

    Ok(Plan {
        entry,
        segments,
        unloaded,
        symbols,
        orphans,
        discarded,
    })
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::horizon;

    fn input(name: &str, size: u64, align: u64) -> InputSection {
        InputSection {
            name: name.into(),
            size,
            align,
            retained: true,
        }
    }

    fn typical() -> Vec<InputSection> {
        vec![
            input(".crt0", 0x40, 4),
            input(".text.main", 0x120, 4),
            input(".text", 0x10, 2),
            input(".rodata.str", 0x33, 1),
            input(".ARM.exidx.text.main", 0x8, 4),
            input(".data.counter", 0x4, 4),
            input(".init_array.00200", 0x4, 4),
            input(".init_array", 0x4, 4),
            input(".init_array.00100", 0x4, 4),
            input(".bss.buffer", 0x100, 8),
            input(".debug_info", 0x500, 1),
        ]
    }

    /// The canonical layout with name-sorted `.rodata.sorted.*` leading `.rodata`.
    fn with_name_sorted_rodata() -> Descriptor {
        let mut d = horizon::descriptor();
        d.segments[1].sections[0].items.insert(
            0,
            Item::Input(InputSpec::new(&[".rodata.sorted.*"]).sorted(SortPolicy::ByName)),
        );
        d
    }

    #[test]
    fn name_sorted_inputs_are_placed_alphabetically() {
        let inputs = [
            input(".crt0", 0x40, 4),
            input(".rodata.sorted.b", 0x4, 4),
            input(".rodata.str", 0x4, 4),
            input(".rodata.sorted.c", 0x4, 4),
            input(".rodata.sorted.a", 0x4, 4),
        ];

        let p = plan(&with_name_sorted_rodata(), &inputs, PlanOptions::default()).unwrap();
        let names: Vec<_> = p
            .section(".rodata")
            .unwrap()
            .placements
            .iter()
            .map(|pl| pl.name.as_str())
            .collect();

        assert_eq!(
            names,
            [
                ".rodata.sorted.a",
                ".rodata.sorted.b",
                ".rodata.sorted.c",
                ".rodata.str"
            ]
        );
    }

    #[test]
    fn entry_is_the_load_address() {
        let p = plan(&horizon::descriptor(), &typical(), PlanOptions::default()).unwrap();

        assert_eq!(p.entry, horizon::LOAD_ADDRESS);
        assert_eq!(p.symbol("_start"), Some(horizon::LOAD_ADDRESS));
    }

    #[test]
    fn segments_are_page_aligned_and_ordered() {
        let p = plan(&horizon::descriptor(), &typical(), PlanOptions::default()).unwrap();
        let starts: Vec<_> = p.segments.iter().map(|s| s.address).collect();

        assert_eq!(starts, [0x10_0000, 0x10_1000, 0x10_2000]);
        for pair in p.segments.windows(2) {
            assert!(pair[0].end() <= pair[1].address);
        }
    }

    #[test]
    fn bss_follows_data_and_is_not_file_backed() {
        let p = plan(&horizon::descriptor(), &typical(), PlanOptions::default()).unwrap();
        let data = &p.segments[2];

        let bss = p.section(".bss").unwrap();
        assert_eq!(bss.placements[0].address % 8, 0);
        assert_eq!(data.file_size, bss.address - data.address);
        assert_eq!(data.mem_size, data.file_size + bss.size);
        assert_eq!(p.symbol("__bss_start__"), Some(bss.address));
        assert_eq!(p.symbol("__bss_end__"), p.symbol("__end__"));
    }

    #[test]
    fn tls_placeholder_is_empty_and_inside_bss() {
        let p = plan(&horizon::descriptor(), &typical(), PlanOptions::default()).unwrap();

        let tls_start = p.symbol("__tls_start").unwrap();
        assert_eq!(p.symbol("__tls_end"), Some(tls_start));
        assert!(p.symbol("__bss_start__").unwrap() <= tls_start);
        assert!(tls_start <= p.symbol("__bss_end__").unwrap());
    }

    #[test]
    fn init_array_is_sorted_by_priority_then_unsuffixed() {
        let p = plan(&horizon::descriptor(), &typical(), PlanOptions::default()).unwrap();
        let names: Vec<_> = p
            .section(".init_array")
            .unwrap()
            .placements
            .iter()
            .map(|p| p.name.as_str())
            .collect();

        assert_eq!(names, [".init_array.00100", ".init_array.00200", ".init_array"]);
        assert_eq!(
            p.symbol("__init_array_end").unwrap() - p.symbol("__init_array_start").unwrap(),
            12
        );
    }

    #[test]
    fn empty_lists_still_define_their_bounds() {
        let p = plan(&horizon::descriptor(), &typical(), PlanOptions::default()).unwrap();

        assert_eq!(
            p.symbol("__preinit_array_start"),
            p.symbol("__preinit_array_end")
        );
        for symbol in horizon::CONTRACT_SYMBOLS {
            assert!(p.symbol(symbol).is_some(), "{}", symbol);
        }
    }

    #[test]
    fn debug_sections_sit_at_zero() {
        let p = plan(&horizon::descriptor(), &typical(), PlanOptions::default()).unwrap();
        let debug = p.section(".debug_info").unwrap();

        assert_eq!(debug.address, 0);
        assert_eq!(debug.size, 0x500);
        assert!(p.placements().all(|(_, pl)| pl.name != ".debug_info"));
    }

    #[test]
    fn unmatched_inputs_are_orphans() {
        let mut inputs = typical();
        inputs.push(input(".fini_array", 4, 4));

        let p = plan(&horizon::descriptor(), &inputs, PlanOptions::default()).unwrap();

        assert_eq!(p.orphans, [input(".fini_array", 4, 4)]);
        assert!(p.placements().all(|(_, pl)| pl.name != ".fini_array"));
    }

    #[test]
    fn gc_keeps_kept_sections_only() {
        let mut inputs = typical();
        for i in inputs.iter_mut() {
            i.retained = false;
        }

        let p = plan(
            &horizon::descriptor(),
            &inputs,
            PlanOptions { gc_sections: true },
        )
        .unwrap();
        let placed: Vec<_> = p.placements().map(|(_, pl)| pl.name.as_str()).collect();

        assert_eq!(
            placed,
            [".crt0", ".init_array.00100", ".init_array.00200", ".init_array"]
        );
        assert_eq!(p.discarded.len(), inputs.len() - placed.len());
    }

    #[test]
    fn missing_entry_section_is_an_error() {
        let inputs = vec![input(".text", 4, 4)];

        assert_eq!(
            plan(&horizon::descriptor(), &inputs, PlanOptions::default()),
            Err(LayoutError::MissingEntrySection(".crt0".into()))
        );
    }

    #[test]
    fn oversized_images_overflow() {
        let inputs = vec![input(".crt0", 4, 4), input(".bss", 0xffff_ffff, 4)];

        assert!(matches!(
            plan(&horizon::descriptor(), &inputs, PlanOptions::default()),
            Err(LayoutError::AddressOverflow { .. })
        ));
    }

    #[test]
    fn init_priority_parses_numeric_suffixes() {
        assert_eq!(init_priority(".init_array.00101"), 101);
        assert_eq!(init_priority(".init_array"), u64::MAX);
        assert_eq!(init_priority(".init_array.foo"), u64::MAX);
    }
}
