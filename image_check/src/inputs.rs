// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! Section list files.
//!
//! One input section per line: `name size align`, optionally followed by `unreferenced` for a
//! section no garbage collection root reaches. Numbers are decimal or `0x` hex, `_` separators
//! allowed. Blank lines and lines starting with `#` are skipped.
//!
//! ```text
//! .crt0              0x44   4
//! .text.main         0x120  4
//! .text.unused       0x10   4  unreferenced
//! .init_array.00101  4      4
//! ```

use anyhow::{bail, Context, Result};
use image_layout::InputSection;

fn number(field: &str) -> Result<u64> {
    image_layout::parse_number(field).with_context(|| format!("`{field}` is not a number"))
}

fn line(text: &str) -> Result<InputSection> {
    let fields: Vec<&str> = text.split_whitespace().collect();

    let retained = match fields.get(3) {
        None => true,
        Some(&"unreferenced") => false,
        Some(other) => bail!("unknown attribute `{other}`"),
    };
    if fields.len() < 3 || fields.len() > 4 {
        bail!("expected `name size align [unreferenced]`");
    }

    Ok(InputSection {
        name: fields[0].to_string(),
        size: number(fields[1])?,
        align: number(fields[2])?,
        retained,
    })
}

/// Parse a section list.
pub fn parse(text: &str) -> Result<Vec<InputSection>> {
    text.lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'))
        .map(|(n, l)| line(l).with_context(|| format!("line {n}")))
        .collect()
}
