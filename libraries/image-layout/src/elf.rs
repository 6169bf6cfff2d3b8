// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! Facts extraction from linked ELF images.

use crate::check::{ImageFacts, SegmentFacts};
use crate::descriptor::SegmentFlags;
use goblin::elf::{header::EM_ARM, program_header::PT_LOAD, section_header::SHT_NOBITS, Elf};
use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Why a file could not be inspected.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ElfError {
    #[error("malformed ELF file")]
    Parse(#[from] goblin::error::Error),

    #[error("not a 32 bit ELF file")]
    NotElf32,

    #[error("not a little-endian ELF file")]
    NotLittleEndian,

    #[error("machine {0:#x} is not ARM")]
    WrongMachine(u16),
}

/// A parsed image.
#[derive(Debug)]
pub struct Image<'a> {
    elf: Elf<'a>,
    bytes: &'a [u8],
}

/// One named section and its file contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionImage<'a> {
    /// Section name.
    pub name: String,
    /// `sh_addr`
    pub address: u64,
    /// `sh_size`
    pub size: u64,
    /// Contents; empty for `SHT_NOBITS`.
    pub data: &'a [u8],
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl<'a> Image<'a> {
    /// Parse `bytes` as a little-endian ELF32 ARM file.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, ElfError> {
        let elf = Elf::parse(bytes)?;

        if elf.is_64 {
            return Err(ElfError::NotElf32);
        }
        if !elf.little_endian {
            return Err(ElfError::NotLittleEndian);
        }
        if elf.header.e_machine != EM_ARM {
            return Err(ElfError::WrongMachine(elf.header.e_machine));
        }

        Ok(Self { elf, bytes })
    }

    /// Entry address, loadable segments and defined symbols.
    pub fn facts(&self) -> ImageFacts {
        let segments = self
            .elf
            .program_headers
            .iter()
            .filter(|ph| ph.p_type == PT_LOAD)
            .map(|ph| SegmentFacts {
                flags: SegmentFlags::from_bits_retain(ph.p_flags),
                address: ph.p_vaddr,
                mem_size: ph.p_memsz,
                file_size: ph.p_filesz,
            })
            .collect();

        let symbols = self
            .elf
            .syms
            .iter()
            .filter(|sym| sym.st_shndx != 0)
            .filter_map(|sym| {
                let name = self.elf.strtab.get_at(sym.st_name)?;
                (!name.is_empty()).then(|| (name.to_string(), sym.st_value))
            })
            .collect();

        ImageFacts {
            entry: self.elf.entry,
            segments,
            symbols,
        }
    }

    /// Named sections with their contents, in section header order.
    pub fn sections(&self) -> Vec<SectionImage<'a>> {
        self.elf
            .section_headers
            .iter()
            .filter_map(|sh| {
                let name = self.elf.shdr_strtab.get_at(sh.sh_name)?;
                if name.is_empty() {
                    return None;
                }

                let data = if sh.sh_type == SHT_NOBITS {
                    &self.bytes[0..0]
                } else {
                    let start = usize::try_from(sh.sh_offset).ok()?;
                    let end = start.checked_add(usize::try_from(sh.sh_size).ok()?)?;
                    self.bytes.get(start..end)?
                };

                Some(SectionImage {
                    name: name.to_string(),
                    address: sh.sh_addr,
                    size: sh.sh_size,
                    data,
                })
            })
            .collect()
    }

    /// File-backed bytes at virtual `address`, if a loadable segment stores all `len` of them.
    pub fn bytes_at(&self, address: u64, len: u64) -> Option<&'a [u8]> {
        let ph = self.elf.program_headers.iter().find(|ph| {
            ph.p_type == PT_LOAD
                && ph.p_vaddr <= address
                && address.saturating_add(len) <= ph.p_vaddr + ph.p_filesz
        })?;

        let start = usize::try_from(ph.p_offset + (address - ph.p_vaddr)).ok()?;
        let end = start.checked_add(usize::try_from(len).ok()?)?;
        self.bytes.get(start..end)
    }
}

/// Shorthand for parsing and extracting facts.
pub fn facts_from_elf(bytes: &[u8]) -> Result<ImageFacts, ElfError> {
    Ok(Image::parse(bytes)?.facts())
}
