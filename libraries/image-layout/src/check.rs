// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! Image verification.
//!
//! [`check()`] compares the observable facts of a finished image, the entry address, the loadable
//! segments and the symbol table, with the policy a [`Descriptor`] states. All violations are
//! collected, so one run reports everything that is wrong with an image.

use crate::{
    descriptor::{Descriptor, SegmentFlags},
    horizon::POINTER_SIZE,
    is_aligned,
    plan::Plan,
};
use std::{collections::BTreeMap, fmt};
use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// One loadable program header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentFacts {
    /// `p_flags`
    pub flags: SegmentFlags,
    /// `p_vaddr`
    pub address: u64,
    /// `p_memsz`
    pub mem_size: u64,
    /// `p_filesz`
    pub file_size: u64,
}

/// What can be observed about a finished image.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageFacts {
    /// Entry address from the file header.
    pub entry: u64,
    /// Loadable segments, in program header order.
    pub segments: Vec<SegmentFacts>,
    /// Symbol values.
    pub symbols: BTreeMap<String, u64>,
}

/// A single policy violation.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("entry {entry:#x} differs from `{symbol}` at {value:#x}")]
    EntryMismatch {
        entry: u64,
        symbol: String,
        value: u64,
    },

    #[error("entry {entry:#x} is not the start of the code segment")]
    EntryNotAtCodeStart { entry: u64 },

    #[error("entry {entry:#x} is not the load address {expected:#x}")]
    EntryNotAtLoadAddress { entry: u64, expected: u64 },

    #[error("the first segment starts at {found:#x}, expected {expected:#x}")]
    WrongLoadAddress { expected: u64, found: u64 },

    #[error("the image has no loadable segments")]
    NoSegments,

    #[error("segment {index} is both writable and executable")]
    WritableAndExecutable { index: usize },

    #[error("segment {index} has flags {flags:#x}, which the layout does not declare at this position")]
    UnexpectedPermissions { index: usize, flags: u32 },

    #[error("segment {index} at {address:#x} is not page aligned")]
    MisalignedSegment { index: usize, address: u64 },

    #[error("segment {second} starts before segment {first} ends")]
    SegmentOverlap { first: usize, second: usize },

    #[error("segment {index} stores more bytes than it maps")]
    FileSizeExceedsMemSize { index: usize },

    #[error("required symbol `{0}` is not defined")]
    MissingSymbol(String),

    #[error("`{start}` lies above `{end}`")]
    RangeInverted { start: String, end: String },

    #[error("`{start}`..`{end}` is not {align}-byte aligned")]
    RangeMisaligned {
        start: String,
        end: String,
        align: u64,
    },

    #[error("`{start}`..`{end}` is not inside a single writable segment")]
    RangeNotWritable { start: String, end: String },

    #[error("`{start}`..`{end}` is not a whole number of {size}-byte entries")]
    NotPointerMultiple { start: String, end: String, size: u64 },

    #[error("the thread-local placeholder is not inside the uninitialized-data range")]
    TlsOutsideBss,

    #[error("`__end__` lies below `__bss_end__`")]
    EndBeforeBss,
}

/// All violations found in an image.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Report {
    /// Violations, in the order they were found.
    pub violations: Vec<CheckError>,
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

struct Checker<'a> {
    descriptor: &'a Descriptor,
    facts: &'a ImageFacts,
    report: Report,
}

impl Checker<'_> {
    fn fail(&mut self, e: CheckError) {
        self.report.violations.push(e);
    }

    fn symbol(&self, name: &str) -> Option<u64> {
        self.facts.symbols.get(name).copied()
    }

    fn entry(&mut self) {
        let entry = self.facts.entry;

        if let Some(value) = self.symbol(self.descriptor.entry) {
            if value != entry {
                self.fail(CheckError::EntryMismatch {
                    entry,
                    symbol: self.descriptor.entry.into(),
                    value,
                });
            }
        }

        let code_start = self
            .facts
            .segments
            .iter()
            .find(|s| s.flags.contains(SegmentFlags::EXECUTE))
            .map(|s| s.address);
        if code_start != Some(entry) {
            self.fail(CheckError::EntryNotAtCodeStart { entry });
        }
        if entry != self.descriptor.load_address {
            self.fail(CheckError::EntryNotAtLoadAddress {
                entry,
                expected: self.descriptor.load_address,
            });
        }
    }

    fn segments(&mut self) {
        let loaded: Vec<(usize, SegmentFacts)> = self
            .facts
            .segments
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, s)| s.mem_size > 0)
            .collect();

        match loaded.first() {
            None => return self.fail(CheckError::NoSegments),
            Some((_, first)) if first.address != self.descriptor.load_address => {
                self.fail(CheckError::WrongLoadAddress {
                    expected: self.descriptor.load_address,
                    found: first.address,
                })
            }
            Some(_) => (),
        }

        // Present segments must follow the declared order; absent (empty) ones may be skipped.
        let mut declared = 0;
        for &(index, segment) in &loaded {
            if segment.flags.is_writable_and_executable() {
                self.fail(CheckError::WritableAndExecutable { index });
            }

            match (declared..self.descriptor.segments.len())
                .find(|&d| self.descriptor.flags_of(d) == Some(segment.flags))
            {
                Some(d) => declared = d + 1,
                None => self.fail(CheckError::UnexpectedPermissions {
                    index,
                    flags: segment.flags.bits(),
                }),
            }

            if !is_aligned(segment.address, self.descriptor.page_size) {
                self.fail(CheckError::MisalignedSegment {
                    index,
                    address: segment.address,
                });
            }
            if segment.file_size > segment.mem_size {
                self.fail(CheckError::FileSizeExceedsMemSize { index });
            }
        }

        for pair in loaded.windows(2) {
            let ((first, a), (second, b)) = (pair[0], pair[1]);
            if b.address < a.address + a.mem_size {
                self.fail(CheckError::SegmentOverlap { first, second });
            }
        }
    }

    fn required_symbols(&mut self) {
        let descriptor = self.descriptor;

        for name in &descriptor.required_symbols {
            if self.symbol(name).is_none() {
                self.fail(CheckError::MissingSymbol((*name).into()));
            }
        }
    }

    /// Returns the range if both bounds are defined and ordered.
    fn range(&mut self, start: &str, end: &str) -> Option<(u64, u64)> {
        let (s, e) = (self.symbol(start)?, self.symbol(end)?);

        if s > e {
            self.fail(CheckError::RangeInverted {
                start: start.into(),
                end: end.into(),
            });
            return None;
        }
        Some((s, e))
    }

    fn writable(&mut self, start: &str, end: &str, (s, e): (u64, u64)) {
        if s == e {
            return;
        }

        let inside = self.facts.segments.iter().any(|seg| {
            seg.flags.contains(SegmentFlags::WRITE)
                && !seg.flags.contains(SegmentFlags::EXECUTE)
                && seg.address <= s
                && e <= seg.address + seg.mem_size
        });
        if !inside {
            self.fail(CheckError::RangeNotWritable {
                start: start.into(),
                end: end.into(),
            });
        }
    }

    fn bss(&mut self) {
        let (start, end) = ("__bss_start__", "__bss_end__");
        let Some(bss) = self.range(start, end) else {
            return;
        };

        if !is_aligned(bss.0, 4) || !is_aligned(bss.1, 4) {
            self.fail(CheckError::RangeMisaligned {
                start: start.into(),
                end: end.into(),
                align: 4,
            });
        }
        self.writable(start, end, bss);

        if let Some((tls_start, tls_end)) = self.range("__tls_start", "__tls_end") {
            if tls_start < bss.0 || tls_end > bss.1 {
                self.fail(CheckError::TlsOutsideBss);
            }
        }

        if let Some(image_end) = self.symbol("__end__") {
            if image_end < bss.1 {
                self.fail(CheckError::EndBeforeBss);
            }
        }
    }

    fn data(&mut self) {
        let (start, end) = ("__data_start__", "__data_end__");

        if let Some(data) = self.range(start, end) {
            self.writable(start, end, data);
        }
    }

    fn function_pointer_lists(&mut self) {
        for (start, end) in [
            ("__preinit_array_start", "__preinit_array_end"),
            ("__init_array_start", "__init_array_end"),
        ] {
            let Some(list) = self.range(start, end) else {
                continue;
            };

            if (list.1 - list.0) % POINTER_SIZE != 0 || !is_aligned(list.0, POINTER_SIZE) {
                self.fail(CheckError::NotPointerMultiple {
                    start: start.into(),
                    end: end.into(),
                    size: POINTER_SIZE,
                });
            }
            self.writable(start, end, list);
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl ImageFacts {
    /// The facts an image linked according to `plan` would have.
    pub fn from_plan(plan: &Plan) -> Self {
        Self {
            entry: plan.entry,
            segments: plan
                .segments
                .iter()
                .filter(|s| s.is_loadable())
                .map(|s| SegmentFacts {
                    flags: s.flags,
                    address: s.address,
                    mem_size: s.mem_size,
                    file_size: s.file_size,
                })
                .collect(),
            symbols: plan.symbols.clone(),
        }
    }
}

impl Report {
    /// True if no violation was found.
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    /// True if `e` was found.
    pub fn contains(&self, e: &CheckError) -> bool {
        self.violations.contains(e)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "no violations");
        }

        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", v)?;
        }
        Ok(())
    }
}

/// Verify `facts` against the policy of `descriptor`.
pub fn check(descriptor: &Descriptor, facts: &ImageFacts) -> Report {
    let mut checker = Checker {
        descriptor,
        facts,
        report: Report::default(),
    };

    checker.entry();
    checker.segments();
    checker.required_symbols();
    checker.bss();
    checker.data();
    checker.function_pointer_lists();

    checker.report
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
