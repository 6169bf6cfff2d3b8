// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! Registration of the runtime initializer.

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Symbol `_start` calls once `.bss` is zeroed.
pub const RUNTIME_INIT_SYMBOL: &str = "__rt0_runtime_init";

/// Register the function `_start` calls once `.bss` is zeroed.
///
/// The function may return. What happens next depends on how the process was started, see
/// [`header::LaunchMode`](crate::header::LaunchMode).
///
/// ```ignore
/// horizon_rt0::runtime_init!(init);
///
/// fn init() {
///     // ...
/// }
/// ```
#[macro_export]
macro_rules! runtime_init {
    ($path:path) => {
        /// Called by `_start`.
        #[export_name = "__rt0_runtime_init"]
        pub extern "C" fn __rt0_runtime_init() {
            // type check the given path
            let f: fn() = $path;

            f()
        }
    };
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
