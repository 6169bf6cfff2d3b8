// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! Processor code.

#[cfg(all(target_arch = "arm", target_os = "horizon"))]
#[path = "_arch/arm/cpu.rs"]
mod arch_cpu;

mod boot;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Supervisor call number of `ExitProcess`.
pub const SVC_EXIT_PROCESS: u32 = 0x03;

//--------------------------------------------------------------------------------------------------
// Architectural Public Reexports
//--------------------------------------------------------------------------------------------------
#[cfg(all(target_arch = "arm", target_os = "horizon"))]
pub use arch_cpu::{exit_process, wait_forever};
