// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! Linker script rendering.
//!
//! The output is a GNU ld compatible script. Rendering is a pure function of the descriptor, so the
//! same descriptor always yields a byte-identical script.

use crate::descriptor::{Descriptor, InputSpec, Item, OutputSection, SectionKind, SortPolicy};
use std::fmt;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// A [`Descriptor`] viewed as linker script text.
pub struct Script<'a>(pub &'a Descriptor);

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Render `descriptor` to linker script text.
pub fn render(descriptor: &Descriptor) -> String {
    Script(descriptor).to_string()
}

impl fmt::Display for Script<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.0;

        writeln!(f, "/* Generated by image-layout. Do not edit. */")?;
        writeln!(f)?;
        writeln!(f, "OUTPUT_FORMAT(\"{}\")", d.output_format)?;
        writeln!(f, "OUTPUT_ARCH({})", d.output_arch)?;
        writeln!(f, "ENTRY({})", d.entry)?;
        writeln!(f, "EXTERN({})", d.entry)?;
        writeln!(f)?;

        writeln!(f, "PHDRS")?;
        writeln!(f, "{{")?;
        for segment in &d.segments {
            writeln!(
                f,
                "    {} PT_LOAD FLAGS({});",
                segment.name,
                segment.flags.bits()
            )?;
        }
        writeln!(f, "}}")?;
        writeln!(f)?;

        writeln!(f, "SECTIONS")?;
        writeln!(f, "{{")?;
        writeln!(f, "    . = {:#x};", d.load_address)?;

        for (i, segment) in d.segments.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
                writeln!(f, "    . = ALIGN({:#x});", d.page_size)?;
            }

            for section in &segment.sections {
                writeln!(f)?;
                write_section(f, section, &format!(":{}", segment.name))?;
            }
        }

        if !d.unloaded.is_empty() {
            writeln!(f)?;
            writeln!(f, "    /* Not loaded. */")?;
            for section in &d.unloaded {
                write!(f, "    {} 0 : {{ ", section.name)?;
                for item in &section.items {
                    write!(f, "{} ", item_text(item))?;
                }
                writeln!(f, "}}")?;
            }
        }

        writeln!(f, "}}")
    }
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

fn write_section(f: &mut fmt::Formatter<'_>, section: &OutputSection, phdr: &str) -> fmt::Result {
    let noload = match section.kind {
        SectionKind::Progbits => "",
        SectionKind::Nobits => " (NOLOAD)",
    };

    writeln!(
        f,
        "    {}{} : ALIGN({})",
        section.name, noload, section.align
    )?;
    writeln!(f, "    {{")?;
    for item in &section.items {
        writeln!(f, "        {}", item_text(item))?;
    }
    writeln!(f, "    }} {}", phdr)
}

fn item_text(item: &Item) -> String {
    match item {
        Item::Symbol(name) => format!("{} = .;", name),
        Item::Align(a) => format!(". = ALIGN({});", a),
        Item::Reserve(n) => format!(". += {:#x};", n),
        Item::Input(spec) => input_text(spec),
    }
}

fn input_text(spec: &InputSpec) -> String {
    let patterns: Vec<String> = spec
        .patterns
        .iter()
        .map(|p| match spec.sort {
            SortPolicy::None => (*p).to_string(),
            SortPolicy::ByName => format!("SORT_BY_NAME({})", p),
            SortPolicy::ByInitPriority => format!("SORT_BY_INIT_PRIORITY({})", p),
        })
        .collect();
    let statement = format!("*({})", patterns.join(" "));

    if spec.keep {
        format!("KEEP({})", statement)
    } else {
        statement
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
