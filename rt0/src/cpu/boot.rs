// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! Boot code.

#[cfg(all(target_arch = "arm", target_os = "horizon"))]
#[path = "../_arch/arm/cpu/boot.rs"]
mod arch_boot;
