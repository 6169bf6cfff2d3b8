// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! Conditional reexporting of Board Support Packages.

mod horizon;

pub use horizon::*;
