//! Assembler for the cs8 machine: parses source text, expands macros,
//! transforms the result into a typed asm tree with resolved label
//! addresses, and emits it as a 64-bit little-endian ELF executable.

mod ast;
mod asmtree;
mod elf;
mod emitter;
mod error;
mod expander;
mod parser;

use log::debug;

pub use ast::{AstRoot, Line, MacroDef, Param};
pub use asmtree::{AsmInstruction, AsmNode, AsmTree, Operand};
pub use emitter::{Module, Section, Symbol, SymbolClass};
pub use error::{Error, Result};

/// Runs the full pipeline -- parse, expand, transform, emit -- producing a
/// complete ELF image.
pub fn assemble(filename: &str, source: &str) -> Result<Vec<u8>> {
    let root = parser::parse(filename, source)?;
    debug!("parsed {} line(s), {} macro(s)", root.lines.len(), root.macros.len());

    let expanded = expander::expand(&root)?;
    debug!("macro-expanded to {} line(s)", expanded.len());

    let tree = asmtree::transform(&expanded)?;
    debug!("transformed to {} asm node(s), {} label(s)", tree.nodes.len(), tree.labels.len());

    let module = emitter::emit(&tree)?;
    debug!("emitted {} section(s), {} symbol(s)", module.sections.len(), module.symbols.len());

    Ok(elf::write_elf(&module))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_a_single_instruction_program() {
        let elf = assemble("test", ".section flat 0\nlimm 0x1234\n").unwrap();
        assert_eq!(&elf[0..4], &[0x7F, b'E', b'L', b'F']);
    }

    #[test]
    fn assembles_an_empty_program() {
        let elf = assemble("test", "").unwrap();
        assert_eq!(&elf[0..4], &[0x7F, b'E', b'L', b'F']);
    }

    #[test]
    fn assembles_a_label_back_patch() {
        let elf = assemble("test", ".section flat 0\ntarget:\nlimm target\n").unwrap();
        assert_eq!(&elf[0..4], &[0x7F, b'E', b'L', b'F']);
    }
}
