//! Exercises the `emulator` binary against a real ELF file on disk,
//! assembled by `cs8-asm` into a temporary file.

use std::fs;
use std::process::Command;

use tempfile::NamedTempFile;

#[test]
fn runs_an_elf_file_to_halt() {
    let elf = cs8_asm::assemble(
        "test",
        ".section flat 0\n\
         limm 3\n\
         tr tmp, sc0\n\
         limm 4\n\
         tr tmp, sc1\n\
         add\n\
         limm 0xFFFF\n\
         jmp\n",
    )
    .unwrap();

    let file = NamedTempFile::new().unwrap();
    fs::write(file.path(), &elf).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_emulator"))
        .arg(file.path())
        .status()
        .unwrap();

    assert!(status.success());
}

#[test]
fn exits_nonzero_on_a_non_elf_file() {
    let file = NamedTempFile::new().unwrap();
    fs::write(file.path(), b"not an elf").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_emulator"))
        .arg(file.path())
        .status()
        .unwrap();

    assert!(!status.success());
}
