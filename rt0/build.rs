// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

use std::{env, fs, path::PathBuf};

const HEADER_DEFAULTS: [(&str, &str, u32, &str); 3] = [
    ("RT0_APP_ID", "APP_ID", 0x300, "Application id."),
    (
        "RT0_HEAP_SIZE",
        "HEAP_SIZE",
        0,
        "Heap size in bytes, 0 to let the runtime decide.",
    ),
    (
        "RT0_LINEAR_HEAP_SIZE",
        "LINEAR_HEAP_SIZE",
        0,
        "Linear heap size in bytes, 0 to let the runtime decide.",
    ),
];

fn parse_word(var: &str, value: &str) -> u32 {
    let parsed = image_layout::parse_number(value)
        .unwrap_or_else(|e| panic!("{var}={value:?} is not a number: {e}"));

    u32::try_from(parsed).unwrap_or_else(|_| panic!("{var}={value:?} does not fit in 32 bits"))
}

fn header_defaults() -> String {
    let mut out = String::new();

    for (var, name, default, doc) in HEADER_DEFAULTS {
        println!("cargo:rerun-if-env-changed={var}");

        let value = match env::var(var) {
            Ok(value) => parse_word(var, &value),
            Err(_) => default,
        };
        out += &format!("/// {doc}\npub const {name}: u32 = {value:#x};\n");
    }
    out
}

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));

    fs::write(out_dir.join("header_defaults.rs"), header_defaults())
        .expect("failed to write header_defaults.rs");

    let descriptor = image_layout::horizon::descriptor();
    if let Err(e) = descriptor.validate() {
        panic!("invalid layout descriptor: {e}");
    }
    fs::write(out_dir.join("link.x"), image_layout::script::render(&descriptor))
        .expect("failed to write link.x");

    // Lets applications link with a bare `-Tlink.x`.
    println!("cargo:rustc-link-search={}", out_dir.display());

    // The target's default link arguments bring a crt0 of their own.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("horizon") {
        println!("cargo:rustc-link-arg-tests=-Tlink.x");
        println!("cargo:rustc-link-arg-tests=-nostartfiles");
    }

    println!("cargo:rerun-if-changed=build.rs");
}
