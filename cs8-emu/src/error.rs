//! The emulator's error taxonomy: a malformed ELF file or an I/O failure
//! loading it. The machine itself has no recovery path once running (§7):
//! an invalid opcode just leaves the CPU in an unspecified state.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("not a loadable cs8 ELF executable: {0}")]
    InvalidElf(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
