//! Exercises the `assembler` binary the way a user invokes it: a source
//! file on disk in, `out.elf` on disk out.

use std::fs;
use std::process::Command;

use tempfile::tempdir;

#[test]
fn assembles_a_source_file_into_out_elf() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("program.s"), ".section flat 0\nlimm 0x1234\n").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_assembler"))
        .current_dir(dir.path())
        .arg("program.s")
        .status()
        .unwrap();

    assert!(status.success());

    let elf = fs::read(dir.path().join("out.elf")).unwrap();
    assert_eq!(&elf[0..4], &[0x7F, b'E', b'L', b'F']);
}

#[test]
fn exits_nonzero_on_an_unknown_instruction() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("program.s"), "bogus\n").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_assembler"))
        .current_dir(dir.path())
        .arg("program.s")
        .status()
        .unwrap();

    assert!(!status.success());
    assert!(!dir.path().join("out.elf").exists());
}
