// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! Run the `image-check` binary.

#[path = "../../libraries/image-layout/tests/common/mod.rs"]
mod common;

use common::{words, ElfBuilder};
use std::{
    fs,
    io::Write,
    path::Path,
    process::{Command, Output},
};
use tempfile::{NamedTempFile, TempDir};

const TEXT: u32 = 0x0010_0000;
const RODATA: u32 = 0x0010_1000;
const DATA: u32 = 0x0010_2000;

fn image_check(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_image-check"))
        .args(args)
        .output()
        .expect("image-check runs")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn linked(text_flags: u32, heap_size: u32) -> Vec<u8> {
    let text = words(&[0xea00_0005, 0, 0x300, heap_size, 0, 0, 0, 0xe320_f000]);

    ElfBuilder::new(TEXT)
        .segment(".text", text_flags, TEXT, &text)
        .segment(".rodata", 4, RODATA, b"hello\0\0\0")
        .segment_with_bss(".data", 6, DATA, &words(&[1, 2]), 0x10)
        .symbol("_start", TEXT)
        .symbol("__data_start__", DATA)
        .symbol("__data_end__", DATA + 8)
        .symbol("__preinit_array_start", DATA + 8)
        .symbol("__preinit_array_end", DATA + 8)
        .symbol("__init_array_start", DATA + 8)
        .symbol("__init_array_end", DATA + 8)
        .symbol("__bss_start__", DATA + 8)
        .symbol("__tls_start", DATA + 8)
        .symbol("__tls_end", DATA + 8)
        .symbol("__bss_end__", DATA + 0x18)
        .symbol("__end__", DATA + 0x18)
        .build()
}

fn file_with(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn script_prints_the_rendered_layout() {
    let output = image_check(&["script"]);

    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        image_layout::script::render(&image_layout::horizon::descriptor())
    );
}

#[test]
fn script_writes_to_a_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("link.x");

    let output = image_check(&["script", "-o", path_str(&path)]);
    assert!(output.status.success());

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("ENTRY(_start)"));
    assert!(text.contains("KEEP(*(.crt0))"));
}

#[test]
fn plan_places_sections_and_reports_orphans() {
    let list = file_with(
        b"# name size align\n\
          .crt0 0x44 4\n\
          .text.main 0x100 4\n\
          .text.unused 0x10 4 unreferenced\n\
          .rodata.str 0x20 1\n\
          .bss.counter 4 4\n\
          .tbss 4 4\n",
    );

    let output = image_check(&["plan", "--gc-sections", path_str(list.path())]);
    assert!(output.status.success());

    let out = stdout(&output);
    assert!(out.starts_with("entry 0x00100000\n"));
    assert!(out.contains("symbol _start 0x00100000"));
    assert!(out.contains("orphan .tbss"));
    assert!(out.contains("discarded .text.unused"));
}

#[test]
fn plan_rejects_malformed_lists() {
    let list = file_with(b".crt0 0x44\n");

    let output = image_check(&["plan", path_str(list.path())]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("line 1"));
}

#[test]
fn verify_accepts_a_linked_image_and_decodes_its_header() {
    let image = file_with(&linked(5, 0x0040_0000));

    let output = image_check(&["verify", path_str(image.path())]);
    assert!(output.status.success(), "{}", stdout(&output));

    let out = stdout(&output);
    assert!(out.contains("launch mode       Standalone"));
    assert!(out.contains("app id            0x300"));
    assert!(out.contains("heap size         0x400000"));
    assert!(out.contains("no violations"));
}

#[test]
fn verify_fails_on_violations() {
    let image = file_with(&linked(7, 0));

    let output = image_check(&["verify", path_str(image.path())]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("segment 0 is both writable and executable"));
}

#[test]
fn verify_reports_unreadable_input() {
    let garbage = file_with(b"\x7fELF but not really");

    let output = image_check(&["verify", path_str(garbage.path())]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("parsing"));
}

#[test]
fn compare_tells_identical_and_different_links_apart() {
    let a = file_with(&linked(5, 0));
    let b = file_with(&linked(5, 0));
    let c = file_with(&linked(5, 0x1000));

    let same = image_check(&["compare", path_str(a.path()), path_str(b.path())]);
    assert!(same.status.success());
    assert!(stdout(&same).contains("identical"));

    let different = image_check(&["compare", path_str(a.path()), path_str(c.path())]);
    assert_eq!(different.status.code(), Some(1));
    assert!(stdout(&different).contains("differs  .text"));
}

#[test]
fn compare_reports_differing_program_headers() {
    let a = file_with(&linked(5, 0));
    let b = file_with(&linked(7, 0));

    let output = image_check(&["compare", path_str(a.path()), path_str(b.path())]);
    assert_eq!(output.status.code(), Some(1));

    let out = stdout(&output);
    assert!(out.contains("differs  segment 0"));
    assert!(!out.contains("differs  segment 1"));
    assert!(!out.contains("identical"));
}
