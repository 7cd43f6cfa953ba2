//! Loads a cs8 ELF executable and runs it to completion on the bus-driven
//! emulator core (§6): every `PT_LOAD` segment is copied into simulated
//! memory at its declared virtual address, a serial port is wired to one
//! fixed address, and the board ticks until the CPU halts.

mod elf_loader;
mod error;

use std::fs;
use std::path::Path;

use log::info;

use cs8::{Board, Cpu, Memory, SerialPort};

pub use error::{Error, Result};

/// Bus address the serial port responds to. Chosen so it sits just past the
/// 64 KiB address space's last byte of general memory, leaving the full
/// `0x0000..=0xFFFE` range free for program and data sections.
pub const SERIAL_ADDRESS: u16 = 0xFFFF;

/// Size, in bytes, of the flat memory region backing every `PT_LOAD`
/// segment. Covers every address below [`SERIAL_ADDRESS`].
pub const MEMORY_SIZE: usize = SERIAL_ADDRESS as usize;

/// Builds a [`Board`] with its memory pre-loaded from `elf_bytes`, wired to
/// a serial port at [`SERIAL_ADDRESS`].
pub fn load(elf_bytes: &[u8]) -> Result<Board> {
    let loaded = elf_loader::load(elf_bytes)?;
    info!("loaded {} segment(s), entry point {:#06x}", loaded.segments.len(), loaded.entry);

    let mut memory = Memory::zeroed(0, MEMORY_SIZE);
    for segment in &loaded.segments {
        memory.load(segment.vaddr as u16, &segment.data);
    }

    let mut board = Board::new(Cpu::new());
    board.add_peripheral(Box::new(memory));
    board.add_peripheral(Box::new(SerialPort::new(SERIAL_ADDRESS)));
    Ok(board)
}

/// Reads `path`, loads it as a cs8 ELF executable, and runs it until the CPU
/// halts. Standard input/output back the serial port for the whole run.
pub fn run_file<P: AsRef<Path>>(path: P) -> Result<()> {
    let bytes = fs::read(path)?;
    let mut board = load(&bytes)?;
    board.run_until_halt();
    info!("run complete, ip={:#06x}", board.cpu().ip());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs8::RegisterId;

    #[test]
    fn runs_an_assembled_program_to_halt() {
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

        let mut board = load(&elf).unwrap();
        board.run_until_halt();

        assert!(board.cpu().is_halted());
        assert_eq!(board.cpu().register(RegisterId::dst), 7);
    }

    #[test]
    fn rejects_a_file_that_is_not_an_elf_image() {
        assert!(matches!(load(b"definitely not elf"), Err(Error::InvalidElf(_))));
    }
}
