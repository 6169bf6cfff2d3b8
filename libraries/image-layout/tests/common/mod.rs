// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025-2026 The horizon-rt0 developers

//! Hand-assembled ELF32 images for tests.

#![allow(dead_code)]

const EHDR_SIZE: usize = 52;
const PHDR_SIZE: usize = 32;
const SHDR_SIZE: usize = 40;
const SYM_SIZE: usize = 16;

const PT_LOAD: u32 = 1;
const SHT_PROGBITS: u32 = 1;
const SHT_SYMTAB: u32 = 2;
const SHT_STRTAB: u32 = 3;
const SHT_NOBITS: u32 = 8;
const SHN_ABS: u16 = 0xfff1;
const EM_ARM: u16 = 40;

struct Segment {
    name: &'static str,
    flags: u32,
    address: u32,
    data: Vec<u8>,
    mem_size: u32,
}

/// Builds a little-endian ELF32 executable, one section per segment plus a trailing `.bss` for
/// segments whose memory size exceeds their contents.
pub struct ElfBuilder {
    machine: u16,
    entry: u32,
    segments: Vec<Segment>,
    symbols: Vec<(String, u32)>,
}

struct Section {
    name: &'static str,
    kind: u32,
    address: u32,
    offset: u32,
    size: u32,
    link: u32,
    info: u32,
    align: u32,
    entsize: u32,
}

fn put16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn pad_to(buf: &mut Vec<u8>, align: usize) {
    while buf.len() % align != 0 {
        buf.push(0);
    }
}

fn strtab<'a>(names: impl Iterator<Item = &'a str>) -> (Vec<u8>, Vec<u32>) {
    let mut table = vec![0u8];
    let mut offsets = Vec::new();

    for name in names {
        offsets.push(table.len() as u32);
        table.extend_from_slice(name.as_bytes());
        table.push(0);
    }
    (table, offsets)
}

impl ElfBuilder {
    pub fn new(entry: u32) -> Self {
        Self {
            machine: EM_ARM,
            entry,
            segments: Vec::new(),
            symbols: Vec::new(),
        }
    }

    pub fn machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    pub fn segment(mut self, name: &'static str, flags: u32, address: u32, data: &[u8]) -> Self {
        self.segments.push(Segment {
            name,
            flags,
            address,
            data: data.to_vec(),
            mem_size: data.len() as u32,
        });
        self
    }

    /// Like `segment`, with `bss` zero bytes after the contents.
    pub fn segment_with_bss(
        mut self,
        name: &'static str,
        flags: u32,
        address: u32,
        data: &[u8],
        bss: u32,
    ) -> Self {
        self = self.segment(name, flags, address, data);
        if let Some(s) = self.segments.last_mut() {
            s.mem_size += bss;
        }
        self
    }

    pub fn symbol(mut self, name: &str, value: u32) -> Self {
        self.symbols.push((name.into(), value));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut body = Vec::new();
        let data_start = EHDR_SIZE + PHDR_SIZE * self.segments.len();
        let mut sections = Vec::new();
        let mut phdrs = Vec::new();

        for seg in &self.segments {
            pad_to(&mut body, 4);
            let offset = (data_start + body.len()) as u32;
            body.extend_from_slice(&seg.data);

            phdrs.push((offset, seg));
            sections.push(Section {
                name: seg.name,
                kind: SHT_PROGBITS,
                address: seg.address,
                offset,
                size: seg.data.len() as u32,
                link: 0,
                info: 0,
                align: 4,
                entsize: 0,
            });
            if seg.mem_size > seg.data.len() as u32 {
                sections.push(Section {
                    name: ".bss",
                    kind: SHT_NOBITS,
                    address: seg.address + seg.data.len() as u32,
                    offset: offset + seg.data.len() as u32,
                    size: seg.mem_size - seg.data.len() as u32,
                    link: 0,
                    info: 0,
                    align: 4,
                    entsize: 0,
                });
            }
        }

        // Symbol table.
        let (sym_strtab, sym_names) = strtab(self.symbols.iter().map(|(n, _)| n.as_str()));
        pad_to(&mut body, 4);
        let symtab_offset = (data_start + body.len()) as u32;
        body.extend_from_slice(&[0u8; SYM_SIZE]);
        for ((_, value), name) in self.symbols.iter().zip(&sym_names) {
            put32(&mut body, *name);
            put32(&mut body, *value);
            put32(&mut body, 0);
            body.push(0x10); // STB_GLOBAL, STT_NOTYPE
            body.push(0);
            put16(&mut body, SHN_ABS);
        }
        let symtab_size = (SYM_SIZE * (self.symbols.len() + 1)) as u32;

        let strtab_offset = (data_start + body.len()) as u32;
        body.extend_from_slice(&sym_strtab);

        let symtab_index = sections.len() as u32 + 1;
        sections.push(Section {
            name: ".symtab",
            kind: SHT_SYMTAB,
            address: 0,
            offset: symtab_offset,
            size: symtab_size,
            link: symtab_index + 1,
            info: 1,
            align: 4,
            entsize: SYM_SIZE as u32,
        });
        sections.push(Section {
            name: ".strtab",
            kind: SHT_STRTAB,
            address: 0,
            offset: strtab_offset,
            size: sym_strtab.len() as u32,
            link: 0,
            info: 0,
            align: 1,
            entsize: 0,
        });

        // Section name table, naming itself last.
        let (shstrtab, sh_names) =
            strtab(sections.iter().map(|s| s.name).chain([".shstrtab"]));
        let shstrtab_offset = (data_start + body.len()) as u32;
        body.extend_from_slice(&shstrtab);
        sections.push(Section {
            name: ".shstrtab",
            kind: SHT_STRTAB,
            address: 0,
            offset: shstrtab_offset,
            size: shstrtab.len() as u32,
            link: 0,
            info: 0,
            align: 1,
            entsize: 0,
        });

        pad_to(&mut body, 4);
        let shoff = (data_start + body.len()) as u32;
        let shnum = sections.len() as u16 + 1;

        let mut out = Vec::new();
        out.extend_from_slice(&[0x7f, b'E', b'L', b'F', 1, 1, 1, 0]);
        out.extend_from_slice(&[0; 8]);
        put16(&mut out, 2); // ET_EXEC
        put16(&mut out, self.machine);
        put32(&mut out, 1);
        put32(&mut out, self.entry);
        put32(&mut out, EHDR_SIZE as u32);
        put32(&mut out, shoff);
        put32(&mut out, 0x0500_0400); // EABI5, hard-float
        put16(&mut out, EHDR_SIZE as u16);
        put16(&mut out, PHDR_SIZE as u16);
        put16(&mut out, self.segments.len() as u16);
        put16(&mut out, SHDR_SIZE as u16);
        put16(&mut out, shnum);
        put16(&mut out, shnum - 1);

        for (offset, seg) in phdrs {
            put32(&mut out, PT_LOAD);
            put32(&mut out, offset);
            put32(&mut out, seg.address);
            put32(&mut out, seg.address);
            put32(&mut out, seg.data.len() as u32);
            put32(&mut out, seg.mem_size);
            put32(&mut out, seg.flags);
            put32(&mut out, 0x1000);
        }

        assert_eq!(out.len(), data_start);
        out.extend_from_slice(&body);

        out.extend_from_slice(&[0u8; SHDR_SIZE]);
        for (section, name) in sections.iter().zip(&sh_names) {
            put32(&mut out, *name);
            put32(&mut out, section.kind);
            put32(&mut out, 0);
            put32(&mut out, section.address);
            put32(&mut out, section.offset);
            put32(&mut out, section.size);
            put32(&mut out, section.link);
            put32(&mut out, section.info);
            put32(&mut out, section.align);
            put32(&mut out, section.entsize);
        }

        out
    }
}

/// Little-endian words as bytes.
pub fn words(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}
