// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! Architectural processor code.
//!
//! # Orientation
//!
//! Since arch modules are imported into generic modules using the path attribute, the path of this
//! file is:
//!
//! crate::cpu::arch_cpu

use core::arch::asm;

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Pause execution on the core.
#[inline(always)]
pub fn wait_forever() -> ! {
    loop {
        unsafe { asm!("wfe", options(nomem, nostack)) }
    }
}

/// Terminate the calling process.
///
/// This is the same call the entry stub issues when the runtime initializer returns in a process
/// that was not started by a launcher.
#[inline(always)]
pub fn exit_process() -> ! {
    unsafe {
        asm!(
            "svc {n}",
            n = const super::SVC_EXIT_PROCESS,
            options(noreturn, nostack)
        )
    }
}
