// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! Memory layout descriptor for Horizon process images.
//!
//! The layout of a process image (where code, read-only data and writable data go, with which
//! permissions and alignment, and which symbols the bootstrap code relies on) is authored exactly
//! once, as typed data, in [`horizon::descriptor()`]. Everything else is derived from it:
//!
//! - [`script::render()`] turns it into the linker script (`link.x`) that `horizon-rt0`'s build
//!   script hands to the linker.
//! - [`plan::plan()`] evaluates it against a list of input sections the same way the link-time tool
//!   does, which makes the layout policy testable without a cross toolchain.
//! - [`check::check()`] verifies the facts of a finished image (entry point, program headers,
//!   symbol values) against the policy. With the `elf` feature, [`elf`] extracts those facts from a
//!   linked ELF file.
//!
//! ```text
//!                      +----------------------+
//!                      |  horizon::descriptor |
//!                      +----+------+------+---+
//!                           |      |      |
//!              render()     |      |      |   check()
//!          +----------------+      |      +----------------+
//!          v                       v                       v
//!     +---------+            +-----------+          +-------------+
//!     | link.x  |            |   Plan    |--------->| ImageFacts  |
//!     +---------+            +-----------+          +-------------+
//!                               plan()               (plan or ELF)
//! ```

#![deny(missing_docs)]

mod error;
mod glob;

pub mod check;
pub mod descriptor;
#[cfg(feature = "elf")]
pub mod elf;
pub mod horizon;
pub mod plan;
pub mod script;

pub use check::{check, CheckError, ImageFacts, Report};
pub use descriptor::{
    Descriptor, InputSpec, Item, OutputSection, SectionKind, Segment, SegmentFlags, SortPolicy,
};
pub use error::LayoutError;
pub use plan::{plan, InputSection, Plan, PlanOptions};

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Align `value` up to `alignment`, which must be a power of two.
///
/// Returns `None` if the result does not fit.
#[inline(always)]
pub const fn align_up(value: u64, alignment: u64) -> Option<u64> {
    let mask = alignment - 1;

    match value.checked_add(mask) {
        Some(v) => Some(v & !mask),
        None => None,
    }
}

/// Check if `value` is a multiple of `alignment`, which must be a power of two.
#[inline(always)]
pub const fn is_aligned(value: u64, alignment: u64) -> bool {
    (value & (alignment - 1)) == 0
}

/// Parse a decimal or `0x`/`0X` hexadecimal number. `_` separators are ignored.
///
/// Configuration values and section list files share this notation.
pub fn parse_number(text: &str) -> Result<u64, core::num::ParseIntError> {
    let text = text.trim();
    let (digits, radix) = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (text, 10),
    };

    let digits: String = digits.chars().filter(|&c| c != '_').collect();
    u64::from_str_radix(&digits, radix)
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
