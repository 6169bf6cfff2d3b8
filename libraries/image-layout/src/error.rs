// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! Descriptor validation and planning errors.

use thiserror::Error;

/// Everything that makes a descriptor unusable, or a plan impossible.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("{what} alignment {value:#x} is not a non-zero power of two")]
    BadAlignment { what: String, value: u64 },

    #[error("load address {address:#x} is not aligned to the page size {page_size:#x}")]
    UnalignedLoadAddress { address: u64, page_size: u64 },

    #[error("segment `{0}` is declared more than once")]
    DuplicateSegment(String),

    #[error("output section `{0}` is declared more than once")]
    DuplicateSection(String),

    #[error("segment `{0}` is both writable and executable")]
    WritableAndExecutable(String),

    #[error("segment `{0}` carries no output sections")]
    EmptySegment(String),

    #[error("symbol `{0}` is defined more than once")]
    DuplicateSymbol(String),

    #[error("required symbol `{0}` is not defined by the descriptor")]
    MissingSymbol(String),

    #[error("the first placement of the code segment is not a kept `{0}` input")]
    EntryNotFirst(String),

    #[error("segment `{0}` is declared before the code segment, the entry would not sit at the load address")]
    CodeNotFirst(String),

    #[error("no input section named `{0}` was supplied, the image would have no entry code")]
    MissingEntrySection(String),

    #[error("the image does not fit below {limit:#x}")]
    AddressOverflow { limit: u64 },
}
