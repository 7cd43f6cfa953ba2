//! Reads back the `PT_LOAD` segments of a cs8 ELF executable (the format
//! `cs8_asm::elf` writes) so they can be placed into simulated memory at
//! their declared virtual addresses.
//!
//! This only understands the fixed subset of ELF64 the assembler emits: a
//! 64-byte header, `Elf64_Phdr` program headers, `PT_LOAD` segments. It does
//! not touch section headers or the symbol table -- the emulator has no use
//! for either.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::{Error, Result};

const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];
const ELFCLASS64: u8 = 2;
const ELFDATA2LSB: u8 = 1;
const PT_LOAD: u32 = 1;

const EHDR_SIZE: u64 = 64;
const PHDR_SIZE: u64 = 56;

/// One `PT_LOAD` segment's file-backed bytes and the virtual address they
/// belong at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub vaddr: u32,
    pub data: Vec<u8>,
}

/// A parsed executable: its entry point plus every loadable segment, in the
/// order the program headers listed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedElf {
    pub entry: u64,
    pub segments: Vec<Segment>,
}

fn require(condition: bool, message: &'static str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(Error::InvalidElf(message))
    }
}

/// Parses `bytes` as a cs8 ELF64 executable and returns its `PT_LOAD`
/// segments and entry point.
pub fn load(bytes: &[u8]) -> Result<LoadedElf> {
    require(bytes.len() >= EHDR_SIZE as usize, "file shorter than an ELF header")?;
    require(bytes[0..4] == ELF_MAGIC, "missing ELF magic")?;
    require(bytes[4] == ELFCLASS64, "not a 64-bit ELF file")?;
    require(bytes[5] == ELFDATA2LSB, "not little-endian")?;

    let mut header = Cursor::new(&bytes[16..]);
    let _e_type = header.read_u16::<LittleEndian>()?;
    let _e_machine = header.read_u16::<LittleEndian>()?;
    let _e_version = header.read_u32::<LittleEndian>()?;
    let entry = header.read_u64::<LittleEndian>()?;
    let phoff = header.read_u64::<LittleEndian>()?;
    let _shoff = header.read_u64::<LittleEndian>()?;
    let _e_flags = header.read_u32::<LittleEndian>()?;
    let _e_ehsize = header.read_u16::<LittleEndian>()?;
    let phentsize = header.read_u16::<LittleEndian>()?;
    let phnum = header.read_u16::<LittleEndian>()?;

    require(phentsize as u64 == PHDR_SIZE || phnum == 0, "unexpected program header size")?;

    let mut segments = Vec::new();
    for i in 0..phnum as u64 {
        let offset = (phoff + i * phentsize as u64) as usize;
        require(bytes.len() >= offset + PHDR_SIZE as usize, "program header runs past end of file")?;

        let mut phdr = Cursor::new(&bytes[offset..]);
        let p_type = phdr.read_u32::<LittleEndian>()?;
        let _p_flags = phdr.read_u32::<LittleEndian>()?;
        let p_offset = phdr.read_u64::<LittleEndian>()?;
        let p_vaddr = phdr.read_u64::<LittleEndian>()?;
        let _p_paddr = phdr.read_u64::<LittleEndian>()?;
        let p_filesz = phdr.read_u64::<LittleEndian>()?;

        if p_type != PT_LOAD {
            continue;
        }

        let start = p_offset as usize;
        let end = start + p_filesz as usize;
        require(bytes.len() >= end, "segment data runs past end of file")?;

        segments.push(Segment {
            vaddr: p_vaddr as u32,
            data: bytes[start..end].to_vec(),
        });
    }

    Ok(LoadedElf { entry, segments })
}
