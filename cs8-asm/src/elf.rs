//! A minimal 64-bit little-endian ELF writer (§3.3, §4.4): `ET_EXEC`,
//! `EM_NONE`, `ELFOSABI_NONE`, one `PT_LOAD` segment per declared section,
//! plus a `.symtab`/`.strtab` pair.
//!
//! The `object` crate's write API targets relocatable (`ET_REL`) object
//! emission for compiler backends; it has no entry point for placing
//! sections at arbitrary, assembler-chosen virtual addresses inside an
//! `ET_EXEC`. The fields this format needs are few and fixed, so they are
//! written directly with `byteorder`, the same crate already used for the
//! machine's own endianness handling.

use byteorder::{LittleEndian, WriteBytesExt};

use crate::emitter::{Module, SymbolClass};

const EI_NIDENT: usize = 16;
const ET_EXEC: u16 = 2;
const EM_NONE: u16 = 0;
const EV_CURRENT: u32 = 1;
const ELFCLASS64: u8 = 2;
const ELFDATA2LSB: u8 = 1;
const ELFOSABI_NONE: u8 = 0;

const PT_LOAD: u32 = 1;
const PF_X: u32 = 1;
const PF_W: u32 = 2;
const PF_R: u32 = 4;

const SHT_NULL: u32 = 0;
const SHT_PROGBITS: u32 = 1;
const SHT_SYMTAB: u32 = 2;
const SHT_STRTAB: u32 = 3;
const SHF_WRITE: u64 = 0x1;
const SHF_ALLOC: u64 = 0x2;
const SHF_EXECINSTR: u64 = 0x4;

const STB_GLOBAL: u8 = 1;
const STB_WEAK: u8 = 2;
const STT_OBJECT: u8 = 1;
const STT_FUNC: u8 = 2;
const STV_DEFAULT: u8 = 0;
const STV_HIDDEN: u8 = 2;
const SHN_UNDEF: u16 = 0;

const EHDR_SIZE: u64 = 64;
const PHDR_SIZE: u64 = 56;
const SHDR_SIZE: u64 = 64;
const SYM_SIZE: u64 = 24;

struct StringTable {
    bytes: Vec<u8>,
}

impl StringTable {
    fn new() -> StringTable {
        StringTable { bytes: vec![0] }
    }

    fn add(&mut self, s: &str) -> u32 {
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);
        offset
    }
}

fn section_flags(read: bool, write: bool, execute: bool) -> u64 {
    let mut flags = SHF_ALLOC;
    if write {
        flags |= SHF_WRITE;
    }
    if execute {
        flags |= SHF_EXECINSTR;
    }
    let _ = read;
    flags
}

fn segment_flags(read: bool, write: bool, execute: bool) -> u32 {
    let mut flags = 0;
    if read {
        flags |= PF_R;
    }
    if write {
        flags |= PF_W;
    }
    if execute {
        flags |= PF_X;
    }
    flags
}

/// Serializes an assembled [`Module`] into a complete ELF64 image.
pub fn write_elf(module: &Module) -> Vec<u8> {
    let section_count = module.sections.len();

    let phoff = EHDR_SIZE;
    let data_offset = phoff + PHDR_SIZE * section_count as u64;

    let mut section_data = Vec::new();
    let mut section_file_offsets = Vec::with_capacity(section_count);
    let mut cursor = data_offset;
    for section in &module.sections {
        section_file_offsets.push(cursor);
        section_data.extend_from_slice(&section.bytes);
        cursor += section.bytes.len() as u64;
    }

    let mut shstrtab = StringTable::new();
    let section_name_offsets: Vec<u32> = module
        .sections
        .iter()
        .map(|s| shstrtab.add(&s.name))
        .collect();
    let symtab_name = shstrtab.add(".symtab");
    let strtab_name = shstrtab.add(".strtab");
    let shstrtab_name = shstrtab.add(".shstrtab");

    let mut strtab = StringTable::new();
    let mut symtab_bytes = Vec::new();
    // Null symbol, index 0.
    symtab_bytes.extend_from_slice(&[0u8; SYM_SIZE as usize]);

    let section_index_of = |name: &str| -> Option<u16> {
        module
            .sections
            .iter()
            .position(|s| s.name == name)
            .map(|i| (i + 1) as u16)
    };

    for symbol in &module.symbols {
        let name_offset = strtab.add(&symbol.name);
        let (shndx, st_value, is_func) = match &symbol.section {
            Some(section_name) => {
                let section = module.sections.iter().find(|s| &s.name == section_name);
                (
                    section_index_of(section_name).unwrap_or(SHN_UNDEF),
                    symbol.address as u64,
                    section.map(|s| s.execute).unwrap_or(false),
                )
            }
            None => (SHN_UNDEF, 0u64, false),
        };

        let bind = match symbol.class {
            SymbolClass::Weak => STB_WEAK,
            SymbolClass::Global | SymbolClass::Extern | SymbolClass::Static => STB_GLOBAL,
        };
        let sym_type = if is_func { STT_FUNC } else { STT_OBJECT };
        let other = match symbol.class {
            SymbolClass::Static => STV_HIDDEN,
            _ => STV_DEFAULT,
        };

        let mut entry = Vec::with_capacity(SYM_SIZE as usize);
        entry.write_u32::<LittleEndian>(name_offset).unwrap();
        entry.push((bind << 4) | sym_type);
        entry.push(other);
        entry.write_u16::<LittleEndian>(shndx).unwrap();
        entry.write_u64::<LittleEndian>(st_value).unwrap();
        entry.write_u64::<LittleEndian>(0).unwrap(); // st_size
        symtab_bytes.extend_from_slice(&entry);
    }

    let symtab_offset = cursor;
    cursor += symtab_bytes.len() as u64;
    let strtab_offset = cursor;
    cursor += strtab.bytes.len() as u64;
    let shstrtab_offset = cursor;
    cursor += shstrtab.bytes.len() as u64;

    let shoff = cursor;
    let shnum = 1 + section_count + 3; // null + declared sections + symtab/strtab/shstrtab
    let shstrndx = (shnum - 1) as u16;

    let mut out = Vec::new();

    // e_ident
    out.extend_from_slice(&[0x7F, b'E', b'L', b'F']);
    out.push(ELFCLASS64);
    out.push(ELFDATA2LSB);
    out.push(EV_CURRENT as u8);
    out.push(ELFOSABI_NONE);
    out.extend_from_slice(&[0u8; EI_NIDENT - 9]);
    debug_assert_eq!(out.len(), EI_NIDENT);

    out.write_u16::<LittleEndian>(ET_EXEC).unwrap();
    out.write_u16::<LittleEndian>(EM_NONE).unwrap();
    out.write_u32::<LittleEndian>(EV_CURRENT).unwrap();
    out.write_u64::<LittleEndian>(module.entry).unwrap();
    out.write_u64::<LittleEndian>(phoff).unwrap();
    out.write_u64::<LittleEndian>(shoff).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap(); // e_flags
    out.write_u16::<LittleEndian>(EHDR_SIZE as u16).unwrap();
    out.write_u16::<LittleEndian>(PHDR_SIZE as u16).unwrap();
    out.write_u16::<LittleEndian>(section_count as u16).unwrap();
    out.write_u16::<LittleEndian>(SHDR_SIZE as u16).unwrap();
    out.write_u16::<LittleEndian>(shnum as u16).unwrap();
    out.write_u16::<LittleEndian>(shstrndx).unwrap();
    debug_assert_eq!(out.len() as u64, EHDR_SIZE);

    for (i, section) in module.sections.iter().enumerate() {
        out.write_u32::<LittleEndian>(PT_LOAD).unwrap();
        out.write_u32::<LittleEndian>(segment_flags(section.read, section.write, section.execute))
            .unwrap();
        out.write_u64::<LittleEndian>(section_file_offsets[i]).unwrap();
        out.write_u64::<LittleEndian>(section.base as u64).unwrap();
        out.write_u64::<LittleEndian>(section.base as u64).unwrap();
        out.write_u64::<LittleEndian>(section.bytes.len() as u64).unwrap();
        out.write_u64::<LittleEndian>(section.bytes.len() as u64).unwrap();
        out.write_u64::<LittleEndian>(1).unwrap();
    }

    out.extend_from_slice(&section_data);
    out.extend_from_slice(&symtab_bytes);
    out.extend_from_slice(&strtab.bytes);
    out.extend_from_slice(&shstrtab.bytes);

    // Section header 0: SHT_NULL.
    out.extend_from_slice(&[0u8; SHDR_SIZE as usize]);

    for (i, section) in module.sections.iter().enumerate() {
        out.write_u32::<LittleEndian>(section_name_offsets[i]).unwrap();
        out.write_u32::<LittleEndian>(SHT_PROGBITS).unwrap();
        out.write_u64::<LittleEndian>(section_flags(section.read, section.write, section.execute))
            .unwrap();
        out.write_u64::<LittleEndian>(section.base as u64).unwrap();
        out.write_u64::<LittleEndian>(section_file_offsets[i]).unwrap();
        out.write_u64::<LittleEndian>(section.bytes.len() as u64).unwrap();
        out.write_u32::<LittleEndian>(0).unwrap(); // sh_link
        out.write_u32::<LittleEndian>(0).unwrap(); // sh_info
        out.write_u64::<LittleEndian>(1).unwrap();
        out.write_u64::<LittleEndian>(0).unwrap();
    }

    let strtab_index = (1 + section_count + 1) as u32;

    // .symtab
    out.write_u32::<LittleEndian>(symtab_name).unwrap();
    out.write_u32::<LittleEndian>(SHT_SYMTAB).unwrap();
    out.write_u64::<LittleEndian>(0).unwrap();
    out.write_u64::<LittleEndian>(0).unwrap();
    out.write_u64::<LittleEndian>(symtab_offset).unwrap();
    out.write_u64::<LittleEndian>(symtab_bytes.len() as u64).unwrap();
    out.write_u32::<LittleEndian>(strtab_index).unwrap();
    out.write_u32::<LittleEndian>(1).unwrap(); // first non-local symbol index
    out.write_u64::<LittleEndian>(8).unwrap();
    out.write_u64::<LittleEndian>(SYM_SIZE).unwrap();

    // .strtab
    out.write_u32::<LittleEndian>(strtab_name).unwrap();
    out.write_u32::<LittleEndian>(SHT_STRTAB).unwrap();
    out.write_u64::<LittleEndian>(0).unwrap();
    out.write_u64::<LittleEndian>(0).unwrap();
    out.write_u64::<LittleEndian>(strtab_offset).unwrap();
    out.write_u64::<LittleEndian>(strtab.bytes.len() as u64).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    out.write_u64::<LittleEndian>(1).unwrap();
    out.write_u64::<LittleEndian>(0).unwrap();

    // .shstrtab
    out.write_u32::<LittleEndian>(shstrtab_name).unwrap();
    out.write_u32::<LittleEndian>(SHT_STRTAB).unwrap();
    out.write_u64::<LittleEndian>(0).unwrap();
    out.write_u64::<LittleEndian>(0).unwrap();
    out.write_u64::<LittleEndian>(shstrtab_offset).unwrap();
    out.write_u64::<LittleEndian>(shstrtab.bytes.len() as u64).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    out.write_u32::<LittleEndian>(0).unwrap();
    out.write_u64::<LittleEndian>(1).unwrap();
    out.write_u64::<LittleEndian>(0).unwrap();

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::{Section, Symbol};

    #[test]
    fn header_fields_and_section_count_round_trip() {
        let module = Module {
            sections: vec![Section {
                name: "flat".to_owned(),
                base: 0,
                bytes: vec![0x00, 0x12, 0x34],
                read: true,
                write: false,
                execute: true,
            }],
            symbols: vec![Symbol {
                name: "start".to_owned(),
                address: 0,
                section: Some("flat".to_owned()),
                class: SymbolClass::Global,
            }],
            entry: 0,
        };

        let bytes = write_elf(&module);
        assert_eq!(&bytes[0..4], &[0x7F, b'E', b'L', b'F']);
        assert_eq!(bytes[4], ELFCLASS64);
        assert_eq!(bytes[5], ELFDATA2LSB);

        let e_type = u16::from_le_bytes([bytes[16], bytes[17]]);
        assert_eq!(e_type, ET_EXEC);

        let e_phnum = u16::from_le_bytes([bytes[56], bytes[57]]);
        assert_eq!(e_phnum, 1);
    }
}
