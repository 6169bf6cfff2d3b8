// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! Entry stub, image header and boot symbols for Horizon (3DS) process images.
//!
//! # Boot flow
//!
//! 1. The loader maps the image's three segments, starting at `0x0010_0000`, and branches to
//!    `_start`, the first instruction of the code segment. A launcher that wants control back
//!    enters with `lr` pointing at its continuation and writes a non-zero service override pointer
//!    into the image header first.
//! 2. `_start` keeps the caller's `lr` in `r4` and zeroes `[__bss_start__, __bss_end__)`.
//! 3. It calls `__rt0_runtime_init`, which the application or its runtime provides through
//!    [`runtime_init!`]. The runtime initializer typically reads the [`header`], runs the
//!    [`hooks`] and eventually calls into the application's main logic.
//! 4. If the runtime initializer returns, `_start` either returns to the launcher or ends the
//!    process with the `ExitProcess` supervisor call.
//!
//! # Usage
//!
//! ```ignore
//! use horizon_rt0 as _;
//!
//! horizon_rt0::runtime_init!(init);
//!
//! fn init() {
//!     horizon_rt0::hooks::run_preinit_and_init();
//!     // ...
//! }
//! ```
//!
//! Link with `-Tlink.x`. The build script renders `link.x` and adds its directory to the linker
//! search path; see `config.toml.example`.
//!
//! # Code organization and architecture
//!
//! Architecture specific code lives in `src/_arch`, included into the generic modules with the
//! `path` attribute, so that `crate::cpu` and `crate::cpu::boot` always show the generic
//! interface. Board specific code, currently only the Horizon memory map, lives in `src/bsp`.

#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]

pub mod bsp;
pub mod cpu;
pub mod header;
pub mod hooks;
mod runtime_init;

pub use runtime_init::RUNTIME_INIT_SYMBOL;
