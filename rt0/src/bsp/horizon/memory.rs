// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! BSP Memory Management.
//!
//! The process image as laid out by `link.x`:
//!
//! ```text
//! 0x0010_0000  +---------------------------+ <- _start
//!              | text (R+X)                |    image header at +0x04..+0x1c
//!              +---------------------------+
//!              | rodata (R)                |
//!              +---------------------------+
//!              | data (R+W)                | <- __data_start__
//!              |   .data                   | <- __data_end__
//!              |   .preinit_array          | <- __preinit_array_start/end
//!              |   .init_array             | <- __init_array_start/end
//!              |   .bss                    | <- __bss_start__, __tls_start/end
//!              +---------------------------+ <- __bss_end__, __end__
//! ```
//!
//! Segments start on page boundaries.

#[cfg(target_os = "horizon")]
use crate::hooks::Hook;
#[cfg(target_os = "horizon")]
use core::{cell::UnsafeCell, ops::Range, slice};

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

// Symbols from the linker script.
#[cfg(target_os = "horizon")]
extern "Rust" {
    static __bss_start__: UnsafeCell<()>;
    static __bss_end__: UnsafeCell<()>;
    static __data_start__: UnsafeCell<()>;
    static __data_end__: UnsafeCell<()>;
    static __tls_start: UnsafeCell<()>;
    static __tls_end: UnsafeCell<()>;
    static __preinit_array_start: UnsafeCell<()>;
    static __preinit_array_end: UnsafeCell<()>;
    static __init_array_start: UnsafeCell<()>;
    static __init_array_end: UnsafeCell<()>;
    static __end__: UnsafeCell<()>;
}

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// The image's memory map.
#[rustfmt::skip]
pub mod map {
    /// Where the loader maps `_start`.
    pub const LOAD_ADDRESS: usize =                 0x0010_0000;

    /// Segment start alignment.
    pub const PAGE_SIZE:    usize =                      0x1000;

    /// Width of one pre-init or init list entry.
    pub const POINTER_SIZE: usize = core::mem::size_of::<usize>();
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

/// Number of `size`-byte elements between two linker-provided bounds.
///
/// An inverted range counts as empty.
#[cfg_attr(not(target_os = "horizon"), allow(dead_code))]
#[inline(always)]
const fn elements_between(start: usize, end: usize, size: usize) -> usize {
    end.saturating_sub(start) / size
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Return the range spanning the uninitialized-data (`.bss`) region.
///
/// # Safety
///
/// - Values are provided by the linker script and must be trusted as-is.
/// - The linker-provided addresses must be u32 aligned.
#[cfg(target_os = "horizon")]
#[inline(always)]
pub fn bss_range() -> Range<*mut u32> {
    unsafe { __bss_start__.get().cast()..__bss_end__.get().cast() }
}

/// Return the range spanning the initialized-data (`.data`) region.
#[cfg(target_os = "horizon")]
#[inline(always)]
pub fn data_range() -> Range<*mut u8> {
    unsafe { __data_start__.get().cast()..__data_end__.get().cast() }
}

/// Return the range reserved for thread-local storage. Currently always empty.
#[cfg(target_os = "horizon")]
#[inline(always)]
pub fn tls_range() -> Range<*mut u8> {
    unsafe { __tls_start.get().cast()..__tls_end.get().cast() }
}

/// First free address after the image.
#[cfg(target_os = "horizon")]
#[inline(always)]
pub fn image_end() -> *mut u8 {
    unsafe { __end__.get().cast() }
}

/// The pre-init function-pointer list.
///
/// # Safety
///
/// - Values are provided by the linker script and must be trusted as-is.
/// - Every entry must have been placed by the compiler as a function pointer.
#[cfg(target_os = "horizon")]
pub fn preinit_array() -> &'static [Hook] {
    unsafe { hook_list(__preinit_array_start.get(), __preinit_array_end.get()) }
}

/// The init function-pointer list, in priority order.
///
/// # Safety
///
/// - Values are provided by the linker script and must be trusted as-is.
/// - Every entry must have been placed by the compiler as a function pointer.
#[cfg(target_os = "horizon")]
pub fn init_array() -> &'static [Hook] {
    unsafe { hook_list(__init_array_start.get(), __init_array_end.get()) }
}

#[cfg(target_os = "horizon")]
unsafe fn hook_list(start: *mut (), end: *mut ()) -> &'static [Hook] {
    let len = elements_between(start as usize, end as usize, map::POINTER_SIZE);

    slice::from_raw_parts(start as *const Hook, len)
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image_layout::horizon;

    #[test]
    fn map_matches_the_layout_descriptor() {
        assert_eq!(map::LOAD_ADDRESS as u64, horizon::LOAD_ADDRESS);
        assert_eq!(map::PAGE_SIZE as u64, horizon::PAGE_SIZE);
    }

    #[test]
    fn element_count_rounds_down_and_ignores_inverted_bounds() {
        assert_eq!(elements_between(0x100, 0x100, 4), 0);
        assert_eq!(elements_between(0x100, 0x10c, 4), 3);
        assert_eq!(elements_between(0x100, 0x10e, 4), 3);
        assert_eq!(elements_between(0x10c, 0x100, 4), 0);
    }
}
