// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! Pre-init and init function-pointer lists.
//!
//! The stub does not run these; the runtime initializer does, once the heap and services it needs
//! are up.

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// One entry of `.preinit_array` or `.init_array`.
pub type Hook = extern "C" fn();

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Call every hook, in list order.
pub fn run_hooks(hooks: &[Hook]) {
    for (i, hook) in hooks.iter().enumerate() {
        log::trace!("hook {}/{} at {:p}", i + 1, hooks.len(), *hook as *const ());
        hook();
    }
}

/// Run `.preinit_array`, then `.init_array`.
///
/// # Safety
///
/// - Must be called at most once, from the runtime initializer.
#[cfg(target_os = "horizon")]
pub fn run_preinit_and_init() {
    use crate::bsp::memory;

    let preinit = memory::preinit_array();
    let init = memory::init_array();

    log::debug!(
        "running {} pre-init and {} init hooks",
        preinit.len(),
        init.len()
    );
    run_hooks(preinit);
    run_hooks(init);
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
