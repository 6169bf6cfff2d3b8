// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! The process image layout for Horizon userland.
//!
//! ```text
//!   0x0010_0000  +----------------------------+  text (R+X)
//!                | .crt0: _start, image header|
//!                | .text.start .init .fini    |
//!                | .text .text.* ...          |
//!                +----------------------------+
//!                   page aligned
//!                +----------------------------+  rodata (R)
//!                | .rodata .ARM.extab         |
//!                | .ARM.exidx                 |
//!                +----------------------------+
//!                   page aligned
//!                +----------------------------+  data (R+W)
//!                | .data                      |
//!                | .preinit_array .init_array |
//!                | .bss (TLS placeholder)     |
//!                +----------------------------+  __end__
//! ```

use crate::descriptor::{
    Descriptor, InputSpec, OutputSection, Segment, SegmentFlags, SortPolicy,
};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Where the loader maps the first segment.
pub const LOAD_ADDRESS: u64 = 0x0010_0000;

/// Segment start alignment.
pub const PAGE_SIZE: u64 = 0x1000;

/// The entry symbol.
pub const ENTRY_SYMBOL: &str = "_start";

/// Input section the entry stub is assembled into.
pub const ENTRY_SECTION: &str = ".crt0";

/// Symbol of the runtime initializer the entry stub calls.
pub const RUNTIME_INIT_SYMBOL: &str = "__rt0_runtime_init";

/// Bytes reserved for the thread-local storage placeholder inside `.bss`.
///
/// Growing this is the one change needed to give statically sized thread-local data a home.
pub const TLS_RESERVED_SIZE: u64 = 0;

/// Width of one pre-init or init list entry.
pub const POINTER_SIZE: u64 = 4;

/// Symbols the entry stub and the runtime initializer depend on.
pub const CONTRACT_SYMBOLS: [&str; 11] = [
    "__bss_start__",
    "__bss_end__",
    "__data_start__",
    "__data_end__",
    "__tls_start",
    "__tls_end",
    "__preinit_array_start",
    "__preinit_array_end",
    "__init_array_start",
    "__init_array_end",
    "__end__",
];

const DEBUG_SECTIONS: &[(&str, &[&str])] = &[
    (".comment", &[".comment"]),
    (".ARM.attributes", &[".ARM.attributes"]),
    (".debug", &[".debug"]),
    (".line", &[".line"]),
    (".debug_srcinfo", &[".debug_srcinfo"]),
    (".debug_sfnames", &[".debug_sfnames"]),
    (".debug_aranges", &[".debug_aranges"]),
    (".debug_pubnames", &[".debug_pubnames"]),
    (".debug_pubtypes", &[".debug_pubtypes"]),
    (".debug_info", &[".debug_info", ".gnu.linkonce.wi.*"]),
    (".debug_abbrev", &[".debug_abbrev"]),
    (".debug_line", &[".debug_line"]),
    (".debug_line_str", &[".debug_line_str"]),
    (".debug_frame", &[".debug_frame"]),
    (".debug_str", &[".debug_str"]),
    (".debug_loc", &[".debug_loc"]),
    (".debug_loclists", &[".debug_loclists"]),
    (".debug_ranges", &[".debug_ranges"]),
    (".debug_rnglists", &[".debug_rnglists"]),
    (".debug_macinfo", &[".debug_macinfo"]),
    (".debug_macro", &[".debug_macro"]),
];

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// The canonical descriptor.
pub fn descriptor() -> Descriptor {
    Descriptor {
        output_format: "elf32-littlearm",
        output_arch: "arm",
        entry: ENTRY_SYMBOL,
        entry_section: ENTRY_SECTION,
        load_address: LOAD_ADDRESS,
        page_size: PAGE_SIZE,
        segments: vec![text(), rodata(), data()],
        unloaded: DEBUG_SECTIONS
            .iter()
            .map(|&(name, patterns)| OutputSection::new(name).inputs(patterns))
            .collect(),
        required_symbols: CONTRACT_SYMBOLS.to_vec(),
    }
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

fn text() -> Segment {
    Segment::new("text", SegmentFlags::RX).section(
        OutputSection::new(".text")
            .aligned(4)
            .keep(&[ENTRY_SECTION])
            .keep(&[".text.start"])
            .keep(&[".init"])
            .keep(&[".fini"])
            .align(4)
            .inputs(&[
                ".text",
                ".text.*",
                ".gnu.linkonce.t.*",
                ".stub",
                ".glue_7",
                ".glue_7t",
                ".vfp11_veneer",
                ".v4_bx",
            ])
            .align(4),
    )
}

fn rodata() -> Segment {
    Segment::new("rodata", SegmentFlags::RO)
        .section(
            OutputSection::new(".rodata")
                .aligned(4)
                .inputs(&[".rodata", ".rodata.*", ".gnu.linkonce.r.*"])
                .align(4),
        )
        .section(
            OutputSection::new(".ARM.extab")
                .aligned(4)
                .inputs(&[".ARM.extab*", ".gnu.linkonce.armextab.*"]),
        )
        .section(
            OutputSection::new(".ARM.exidx")
                .aligned(4)
                .symbol("__exidx_start")
                .inputs(&[".ARM.exidx*", ".gnu.linkonce.armexidx.*"])
                .symbol("__exidx_end"),
        )
}

fn data() -> Segment {
    Segment::new("data", SegmentFlags::RW)
        .section(
            OutputSection::new(".data")
                .aligned(4)
                .symbol("__data_start__")
                .inputs(&[".data", ".data.*", ".gnu.linkonce.d.*"])
                .align(4)
                .symbol("__data_end__"),
        )
        .section(function_pointer_list(
            ".preinit_array",
            ".preinit_array.*",
            "__preinit_array_start",
            "__preinit_array_end",
        ))
        .section(function_pointer_list(
            ".init_array",
            ".init_array.*",
            "__init_array_start",
            "__init_array_end",
        ))
        .section(
            OutputSection::new(".bss")
                .aligned(4)
                .nobits()
                .symbol("__bss_start__")
                .symbol("__tls_start")
                .reserve(TLS_RESERVED_SIZE)
                .symbol("__tls_end")
                .inputs(&[".dynbss", ".bss", ".bss.*", ".gnu.linkonce.b*", "COMMON"])
                .align(4)
                .symbol("__bss_end__")
                .symbol("__end__"),
        )
}

/// A kept list of `name` entries, `prioritized` ones first in priority order, bounded by `start`
/// and `end`.
fn function_pointer_list(
    name: &'static str,
    prioritized: &'static str,
    start: &'static str,
    end: &'static str,
) -> OutputSection {
    OutputSection::new(name)
        .aligned(POINTER_SIZE)
        .symbol(start)
        .input(
            InputSpec::new(&[prioritized])
                .kept()
                .sorted(SortPolicy::ByInitPriority),
        )
        .keep(&[name])
        .symbol(end)
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
