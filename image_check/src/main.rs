// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! Print the Horizon linker script, plan section placement and verify linked images.

mod inputs;
mod logger;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use horizon_rt0::header::{self, ImageHeader};
use image_layout::{check, elf::Image, horizon, plan, script, PlanOptions};
use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

#[derive(Parser, Debug)]
#[command(name = "image-check", version, about, long_about = None)]
struct Cli {
    /// More logging, repeat for more
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the linker script
    Script {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print where a list of input sections would be placed
    Plan {
        /// Section list, one `name size align [unreferenced]` per line
        sections: PathBuf,

        /// Drop unreferenced sections that are not kept
        #[arg(long)]
        gc_sections: bool,
    },

    /// Verify a linked image against the layout
    Verify {
        /// ELF file
        image: PathBuf,
    },

    /// Compare the entry, program headers and sections of two linked images
    Compare {
        /// ELF file
        first: PathBuf,

        /// ELF file
        second: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logger::init(cli.verbose) {
        eprintln!("Error: {e}");
    }

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Script { output } => print_script(output),
        Command::Plan {
            sections,
            gc_sections,
        } => print_plan(sections, gc_sections),
        Command::Verify { image } => verify(image),
        Command::Compare { first, second } => compare(first, second),
    }
}

fn print_script(output: Option<PathBuf>) -> Result<ExitCode> {
    let descriptor = horizon::descriptor();
    descriptor.validate()?;

    let text = script::render(&descriptor);
    match output {
        Some(path) => {
            fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
            log::info!("wrote {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(ExitCode::SUCCESS)
}

fn print_plan(sections: PathBuf, gc_sections: bool) -> Result<ExitCode> {
    let text = fs::read_to_string(&sections)
        .with_context(|| format!("reading {}", sections.display()))?;
    let inputs = inputs::parse(&text).with_context(|| format!("in {}", sections.display()))?;

    let plan = plan(
        &horizon::descriptor(),
        &inputs,
        PlanOptions { gc_sections },
    )?;

    println!("entry {:#010x}", plan.entry);
    for segment in &plan.segments {
        println!(
            "segment {:<8} {:#010x} mem {:#x} file {:#x} flags {:#x}",
            segment.name,
            segment.address,
            segment.mem_size,
            segment.file_size,
            segment.flags.bits()
        );
        for section in segment.sections.iter().filter(|s| s.size > 0) {
            println!(
                "  {:<16} {:#010x} {:#x}",
                section.name, section.address, section.size
            );
            for p in &section.placements {
                println!("    {:<24} {:#010x} {:#x}", p.name, p.address, p.size);
            }
        }
    }
    for (name, value) in &plan.symbols {
        println!("symbol {name} {value:#010x}");
    }
    for orphan in &plan.orphans {
        println!("orphan {}", orphan.name);
    }
    for input in &plan.discarded {
        println!("discarded {}", input.name);
    }
    Ok(ExitCode::SUCCESS)
}

fn load(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn parse<'a>(path: &Path, bytes: &'a [u8]) -> Result<Image<'a>> {
    Image::parse(bytes).with_context(|| format!("parsing {}", path.display()))
}

fn print_header(image: &Image) {
    let entry = image.facts().entry;
    let bytes = image.bytes_at(entry, (header::ENTRY_BRANCH_SIZE + header::HEADER_SIZE) as u64);

    let Some(header) = bytes.and_then(ImageHeader::read_from) else {
        println!("header: not stored in a loadable segment");
        return;
    };

    println!("header:");
    println!("  launch mode       {:?}", header.launch_mode());
    println!("  app id            {:#x}", header.app_id);
    println!("  heap size         {:#x}", header.heap_size);
    println!("  linear heap size  {:#x}", header.linear_heap_size);
    println!("  arg list          {:#x}", header.arg_list_ptr);
    println!("  run flags         {:?}", header.run_flags());
}

fn verify(path: PathBuf) -> Result<ExitCode> {
    let bytes = load(&path)?;
    let image = parse(&path, &bytes)?;

    let report = check(&horizon::descriptor(), &image.facts());
    print_header(&image);
    println!("{report}");

    if report.is_ok() {
        Ok(ExitCode::SUCCESS)
    } else {
        log::warn!(
            "{}: {} violations",
            path.display(),
            report.violations.len()
        );
        Ok(ExitCode::FAILURE)
    }
}

fn compare(first: PathBuf, second: PathBuf) -> Result<ExitCode> {
    let (a, b) = (load(&first)?, load(&second)?);
    let (a, b) = (parse(&first, &a)?, parse(&second, &b)?);
    let mut differences = 0;

    let (facts_a, facts_b) = (a.facts(), b.facts());
    if facts_a.entry != facts_b.entry {
        println!("differs  entry");
        differences += 1;
    }
    for i in 0..facts_a.segments.len().max(facts_b.segments.len()) {
        if facts_a.segments.get(i) != facts_b.segments.get(i) {
            println!("differs  segment {i}");
            differences += 1;
        }
    }

    let (a, b) = (a.sections(), b.sections());
    for section in &a {
        match b.iter().find(|s| s.name == section.name) {
            Some(other) if other == section => (),
            Some(_) => {
                println!("differs  {}", section.name);
                differences += 1;
            }
            None => {
                println!("missing  {} in {}", section.name, second.display());
                differences += 1;
            }
        }
    }
    for section in b.iter().filter(|s| !a.iter().any(|o| o.name == s.name)) {
        println!("missing  {} in {}", section.name, first.display());
        differences += 1;
    }

    if differences == 0 {
        println!("identical");
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use image_layout::elf::ElfError;

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn verbosity_counts_and_is_global() {
        let cli = Cli::parse_from(["image-check", "verify", "-vv", "a.elf"]);

        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Verify { .. }));
    }

    #[test]
    fn elf_errors_keep_their_cause() {
        let e = parse(Path::new("x.elf"), b"not an elf").unwrap_err();

        assert_eq!(e.to_string(), "parsing x.elf");
        assert!(e.downcast_ref::<ElfError>().is_some());
    }
}
