//! The assembler's error taxonomy.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown instruction mnemonic `{0}`")]
    UnknownInstruction(String),

    #[error("`{mnemonic}` expects {expected} parameter(s), got {actual}")]
    InvalidInstructionParameterCount {
        mnemonic: String,
        expected: usize,
        actual: usize,
    },

    #[error("`{mnemonic}` parameter {index} has the wrong kind: expected {expected}")]
    InvalidParameterKind {
        mnemonic: String,
        index: usize,
        expected: &'static str,
    },

    #[error("symbol `{0}` is neither a known label nor a macro formal")]
    UnknownSymbol(String),

    #[error("label `{0}` is referenced but never defined")]
    UnresolvedLabel(String),

    #[error("macro `{name}` invoked with {actual} argument(s), expected {expected}")]
    MacroArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
