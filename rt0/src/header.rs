// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! The image header.
//!
//! Six words placed directly after the entry branch. The loader, or a launcher, reads and writes
//! them by fixed offset from `_start` before transferring control, so their order and width are an
//! external contract.
//!
//! ```text
//! _start + 0x00   b .L_rt0_entry
//!        + 0x04   service_override_ptr   0: started by the loader, else by a launcher
//!        + 0x08   app_id                 opaque
//!        + 0x0c   heap_size              0: let the runtime decide
//!        + 0x10   linear_heap_size       0: let the runtime decide
//!        + 0x14   arg_list_ptr           0: no argument block
//!        + 0x18   run_flags              see RunFlags
//!        + 0x1c   first instruction of the stub proper
//! ```

use bitflags::bitflags;
use core::{ffi::CStr, iter::FusedIterator, mem, slice};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Size of the branch instruction in front of the header.
pub const ENTRY_BRANCH_SIZE: usize = 4;

/// Size of the header.
pub const HEADER_SIZE: usize = 24;

/// Header word offsets, relative to `_start`.
#[rustfmt::skip]
pub mod offset {
    /// `service_override_ptr`
    pub const SERVICE_OVERRIDE_PTR: usize = 0x04;
    /// `app_id`
    pub const APP_ID:               usize = 0x08;
    /// `heap_size`
    pub const HEAP_SIZE:            usize = 0x0c;
    /// `linear_heap_size`
    pub const LINEAR_HEAP_SIZE:     usize = 0x10;
    /// `arg_list_ptr`
    pub const ARG_LIST_PTR:         usize = 0x14;
    /// `run_flags`
    pub const RUN_FLAGS:            usize = 0x18;
}

/// Header words this build assembles into the image, from `RT0_APP_ID`, `RT0_HEAP_SIZE` and
/// `RT0_LINEAR_HEAP_SIZE` at build time.
pub mod defaults {
    include!(concat!(env!("OUT_DIR"), "/header_defaults.rs"));
}

/// The header, word for word.
#[allow(missing_docs)]
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageHeader {
    pub service_override_ptr: u32,
    pub app_id: u32,
    pub heap_size: u32,
    pub linear_heap_size: u32,
    pub arg_list_ptr: u32,
    pub run_flags: u32,
}

/// How the process was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// By the system loader. Returning from the runtime initializer ends the process.
    Standalone,
    /// By a launcher that pre-populated service handles and expects a normal return.
    Launcher,
}

bitflags! {
    /// Restrictions the runtime initializer should observe. Unknown bits are kept as they are.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RunFlags: u32 {
        /// Work around APT misbehaving under some launchers.
        const APT_WORKAROUND = 1 << 0;
        /// Re-initialize APT.
        const APT_REINIT     = 1 << 1;
        /// The launcher supports chainloading another application.
        const APT_CHAINLOAD  = 1 << 2;
    }
}

/// The argument block: a word count followed by that many NUL-terminated strings.
///
/// Yields each argument without its terminator.
#[derive(Debug, Clone)]
pub struct ArgList<'a> {
    remaining: usize,
    strings: &'a [u8],
}

/// One pre-populated service handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOverride<'a> {
    /// Service name, without NUL padding.
    pub name: &'a [u8],
    /// Handle to use instead of asking the service manager.
    pub handle: u32,
}

/// The service override list: a word count followed by that many 12-byte entries, an 8-byte
/// NUL-padded name and a handle each.
#[derive(Debug, Clone, Copy)]
pub struct ServiceOverrides<'a> {
    entries: &'a [u8],
}

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

const WORD: usize = mem::size_of::<u32>();
const SERVICE_NAME_SIZE: usize = 8;
const SERVICE_ENTRY_SIZE: usize = SERVICE_NAME_SIZE + WORD;

// Offsets are part of the contract with launchers; the struct must match them.
const _: () = {
    assert!(mem::size_of::<ImageHeader>() == HEADER_SIZE);
    assert!(
        ENTRY_BRANCH_SIZE + mem::offset_of!(ImageHeader, service_override_ptr)
            == offset::SERVICE_OVERRIDE_PTR
    );
    assert!(ENTRY_BRANCH_SIZE + mem::offset_of!(ImageHeader, app_id) == offset::APP_ID);
    assert!(ENTRY_BRANCH_SIZE + mem::offset_of!(ImageHeader, heap_size) == offset::HEAP_SIZE);
    assert!(
        ENTRY_BRANCH_SIZE + mem::offset_of!(ImageHeader, linear_heap_size)
            == offset::LINEAR_HEAP_SIZE
    );
    assert!(
        ENTRY_BRANCH_SIZE + mem::offset_of!(ImageHeader, arg_list_ptr) == offset::ARG_LIST_PTR
    );
    assert!(ENTRY_BRANCH_SIZE + mem::offset_of!(ImageHeader, run_flags) == offset::RUN_FLAGS);
};

#[cfg(target_os = "horizon")]
extern "C" {
    static __rt0_image_header: ImageHeader;
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

fn read_word(bytes: &[u8], at: usize) -> Option<u32> {
    let word = bytes.get(at..at.checked_add(WORD)?)?;

    Some(u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
}

fn non_zero(word: u32) -> Option<u32> {
    (word != 0).then_some(word)
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl ImageHeader {
    /// Build a header from its words, in order.
    pub const fn from_words(words: [u32; 6]) -> Self {
        Self {
            service_override_ptr: words[0],
            app_id: words[1],
            heap_size: words[2],
            linear_heap_size: words[3],
            arg_list_ptr: words[4],
            run_flags: words[5],
        }
    }

    /// Decode the header from image bytes that start at `_start`.
    pub fn read_from(image: &[u8]) -> Option<Self> {
        Some(Self {
            service_override_ptr: read_word(image, offset::SERVICE_OVERRIDE_PTR)?,
            app_id: read_word(image, offset::APP_ID)?,
            heap_size: read_word(image, offset::HEAP_SIZE)?,
            linear_heap_size: read_word(image, offset::LINEAR_HEAP_SIZE)?,
            arg_list_ptr: read_word(image, offset::ARG_LIST_PTR)?,
            run_flags: read_word(image, offset::RUN_FLAGS)?,
        })
    }

    /// The header as assembled, before any loader or launcher writes to it.
    pub const fn assembled() -> Self {
        Self::from_words([
            0,
            defaults::APP_ID,
            defaults::HEAP_SIZE,
            defaults::LINEAR_HEAP_SIZE,
            0,
            0,
        ])
    }

    /// How the process was started.
    pub const fn launch_mode(&self) -> LaunchMode {
        if self.service_override_ptr == 0 {
            LaunchMode::Standalone
        } else {
            LaunchMode::Launcher
        }
    }

    /// Requested heap size, `None` if the runtime should decide.
    pub fn heap_size(&self) -> Option<u32> {
        non_zero(self.heap_size)
    }

    /// Requested linear heap size, `None` if the runtime should decide.
    pub fn linear_heap_size(&self) -> Option<u32> {
        non_zero(self.linear_heap_size)
    }

    /// Run flags, unknown bits included.
    pub const fn run_flags(&self) -> RunFlags {
        RunFlags::from_bits_retain(self.run_flags)
    }

    /// Address of the argument block, if there is one.
    pub fn arg_list_addr(&self) -> Option<u32> {
        non_zero(self.arg_list_ptr)
    }

    /// Address of the service override list, if a launcher provided one.
    pub fn service_override_addr(&self) -> Option<u32> {
        non_zero(self.service_override_ptr)
    }
}

#[cfg(target_os = "horizon")]
impl ImageHeader {
    /// Address of the header in this process.
    pub fn address() -> usize {
        unsafe { core::ptr::addr_of!(__rt0_image_header) as usize }
    }

    /// The header of this process.
    pub fn get() -> Self {
        unsafe { core::ptr::read_volatile(core::ptr::addr_of!(__rt0_image_header)) }
    }

    /// The argument block of this process.
    ///
    /// # Safety
    ///
    /// - A non-zero `arg_list_ptr` must point at a well-formed block that outlives the process.
    pub unsafe fn arg_list(&self) -> Option<ArgList<'static>> {
        self.arg_list_addr()
            .map(|addr| ArgList::from_ptr(addr as usize as *const u8))
    }

    /// The service overrides of this process.
    ///
    /// # Safety
    ///
    /// - A non-zero `service_override_ptr` must point at a well-formed list that outlives the
    ///   process.
    pub unsafe fn service_overrides(&self) -> Option<ServiceOverrides<'static>> {
        self.service_override_addr()
            .map(|addr| ServiceOverrides::from_ptr(addr as usize as *const u8))
    }
}

impl<'a> ArgList<'a> {
    /// Validate and wrap an argument block.
    ///
    /// Returns `None` if `block` is shorter than its count says.
    pub fn parse(block: &'a [u8]) -> Option<Self> {
        let count = read_word(block, 0)? as usize;
        let strings = &block[WORD..];

        let mut len = 0;
        for _ in 0..count {
            let nul = strings[len..].iter().position(|&b| b == 0)?;
            len += nul + 1;
        }

        Some(Self {
            remaining: count,
            strings: &strings[..len],
        })
    }

    /// Wrap the argument block at `block`.
    ///
    /// # Safety
    ///
    /// - `block` must point at a count word followed by at least that many NUL-terminated strings,
    ///   valid for `'a`.
    pub unsafe fn from_ptr(block: *const u8) -> Self {
        let count = u32::from_le((block as *const u32).read_unaligned()) as usize;
        let strings = block.add(WORD);

        let mut len = 0;
        for _ in 0..count {
            len += CStr::from_ptr(strings.add(len).cast())
                .to_bytes_with_nul()
                .len();
        }

        Self {
            remaining: count,
            strings: slice::from_raw_parts(strings, len),
        }
    }
}

impl<'a> Iterator for ArgList<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let nul = self.strings.iter().position(|&b| b == 0)?;
        let (arg, rest) = self.strings.split_at(nul);

        self.strings = &rest[1..];
        self.remaining -= 1;
        Some(arg)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for ArgList<'_> {}

impl FusedIterator for ArgList<'_> {}

impl<'a> ServiceOverride<'a> {
    /// The name as text, if it is UTF-8.
    pub fn name_str(&self) -> Option<&'a str> {
        core::str::from_utf8(self.name).ok()
    }
}

impl<'a> ServiceOverrides<'a> {
    /// Validate and wrap a service override list.
    ///
    /// Returns `None` if `block` is shorter than its count says.
    pub fn parse(block: &'a [u8]) -> Option<Self> {
        let count = read_word(block, 0)? as usize;
        let len = count.checked_mul(SERVICE_ENTRY_SIZE)?;

        Some(Self {
            entries: block.get(WORD..WORD.checked_add(len)?)?,
        })
    }

    /// Wrap the service override list at `block`.
    ///
    /// # Safety
    ///
    /// - `block` must point at a count word followed by that many entries, valid for `'a`.
    pub unsafe fn from_ptr(block: *const u8) -> Self {
        let count = u32::from_le((block as *const u32).read_unaligned()) as usize;

        Self {
            entries: slice::from_raw_parts(block.add(WORD), count * SERVICE_ENTRY_SIZE),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len() / SERVICE_ENTRY_SIZE
    }

    /// True if the launcher provided no handles.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The entries, in list order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = ServiceOverride<'a>> + 'a {
        self.entries.chunks_exact(SERVICE_ENTRY_SIZE).map(|entry| {
            let (name, handle) = entry.split_at(SERVICE_NAME_SIZE);
            let end = name.iter().position(|&b| b == 0).unwrap_or(SERVICE_NAME_SIZE);

            ServiceOverride {
                name: &name[..end],
                handle: u32::from_le_bytes([handle[0], handle[1], handle[2], handle[3]]),
            }
        })
    }

    /// The handle provided for service `name`.
    pub fn find(&self, name: &str) -> Option<u32> {
        self.iter()
            .find(|s| s.name == name.as_bytes())
            .map(|s| s.handle)
    }
}

/// How this process was started.
#[cfg(target_os = "horizon")]
pub fn launch_mode() -> LaunchMode {
    ImageHeader::get().launch_mode()
}

/// The application id word.
#[cfg(target_os = "horizon")]
pub fn app_id() -> u32 {
    ImageHeader::get().app_id
}

/// Requested heap size, `None` if the runtime should decide.
#[cfg(target_os = "horizon")]
pub fn heap_size() -> Option<u32> {
    ImageHeader::get().heap_size()
}

/// Requested linear heap size, `None` if the runtime should decide.
#[cfg(target_os = "horizon")]
pub fn linear_heap_size() -> Option<u32> {
    ImageHeader::get().linear_heap_size()
}

/// Run flags of this process.
#[cfg(target_os = "horizon")]
pub fn run_flags() -> RunFlags {
    ImageHeader::get().run_flags()
}

/// The argument block of this process.
///
/// # Safety
///
/// - The block is provided by the loader or a launcher and must be trusted as-is.
#[cfg(target_os = "horizon")]
pub fn arg_list() -> Option<ArgList<'static>> {
    let header = ImageHeader::get();
    let args = unsafe { header.arg_list() };

    if let Some(args) = &args {
        log::debug!(
            "argument block at {:#x}, {} arguments",
            header.arg_list_ptr,
            args.len()
        );
    }
    args
}

/// The service overrides of this process, if a launcher started it.
///
/// # Safety
///
/// - The list is provided by a launcher and must be trusted as-is.
#[cfg(target_os = "horizon")]
pub fn service_overrides() -> Option<ServiceOverrides<'static>> {
    let header = ImageHeader::get();
    let overrides = unsafe { header.service_overrides() };

    if let Some(overrides) = &overrides {
        log::debug!(
            "{} service overrides at {:#x}",
            overrides.len(),
            header.service_override_ptr
        );
    }
    overrides
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
