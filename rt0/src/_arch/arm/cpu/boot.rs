// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! Architectural boot code.
//!
//! # Orientation
//!
//! Since arch modules are imported into generic modules using the path attribute, the path of this
//! file is:
//!
//! crate::cpu::boot::arch_boot

use crate::{cpu::SVC_EXIT_PROCESS, header::defaults};
use core::arch::global_asm;

// Assembly counterpart to this file.
global_asm!(
    include_str!("boot.s"),
    CONST_APP_ID = const defaults::APP_ID,
    CONST_HEAP_SIZE = const defaults::HEAP_SIZE,
    CONST_LINEAR_HEAP_SIZE = const defaults::LINEAR_HEAP_SIZE,
    CONST_SVC_EXIT_PROCESS = const SVC_EXIT_PROCESS,
);
