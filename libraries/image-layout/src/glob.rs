// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! Section name wildcards, the subset the link-time tool understands that descriptors use.

/// Match `name` against `pattern`, where `*` matches any run of bytes and `?` exactly one.
pub fn matches(pattern: &str, name: &str) -> bool {
    let (p, n) = (pattern.as_bytes(), name.as_bytes());
    let (mut pi, mut ni) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ni < n.len() {
        match p.get(pi) {
            Some(b'*') => {
                backtrack = Some((pi, ni));
                pi += 1;
            }
            Some(&c) if c == b'?' || c == n[ni] => {
                pi += 1;
                ni += 1;
            }
            _ => match backtrack {
                // Let the last star swallow one more byte.
                Some((star, consumed)) => {
                    pi = star + 1;
                    ni = consumed + 1;
                    backtrack = Some((star, consumed + 1));
                }
                None => return false,
            },
        }
    }

    p[pi..].iter().all(|&c| c == b'*')
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
