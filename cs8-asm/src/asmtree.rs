//! The asm-tree transformer (§4.3): translates expanded AST lines into typed
//! asm nodes, then numbers labels and back-patches label-referencing
//! instructions against section-scoped offsets.

use std::collections::{HashMap, HashSet};

use cs8::RegisterId;

use crate::ast::{Line, Param};
use crate::error::{Error, Result};

/// Either an already-resolved 16-bit value or a label awaiting resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Immediate(u16),
    Label(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsmInstruction {
    LoadImmediate(Operand),
    LoadDirect(Operand),
    StoreDirect(Operand),
    LoadIndexed,
    StoreIndexed,
    Transfer { src: RegisterId, tgt: RegisterId },
    Push0(RegisterId),
    Push1(RegisterId),
    Pop0(RegisterId),
    Pop1(RegisterId),
    Add,
    Sub,
    Mul,
    DivMod,
    Nand,
    Or,
    And,
    Invert,
    ShiftLeft,
    ShiftRight,
    RotateLeft,
    RotateRight,
    JumpIfLE,
    Jump,
    RestoreTMP,
}

impl AsmInstruction {
    pub fn length(&self) -> u32 {
        match self {
            AsmInstruction::LoadImmediate(_)
            | AsmInstruction::LoadDirect(_)
            | AsmInstruction::StoreDirect(_) => 3,
            AsmInstruction::Transfer { .. } => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsmNode {
    Label {
        name: String,
        section: String,
        position: Option<u32>,
    },
    Directive {
        name: String,
        args: Vec<String>,
    },
    Instruction(AsmInstruction),
}

/// name -> (absolute address, section name).
pub type LabelMap = HashMap<String, (u32, String)>;

pub struct AsmTree {
    pub nodes: Vec<AsmNode>,
    pub labels: LabelMap,
}

fn flatten_param(param: &Param, out: &mut Vec<String>) {
    match param {
        Param::Register(name) => out.push(name.clone()),
        Param::Symbol(name) => out.push(name.clone()),
        Param::Number(n) => out.push(n.to_string()),
        Param::String(text) => {
            for byte in text.bytes() {
                out.push(byte.to_string());
            }
        }
        Param::ReplaceSymbol(name) => out.push(name.clone()),
    }
}

fn translate_directive(name: String, params: &[Param]) -> AsmNode {
    let mut args = Vec::new();
    for param in params {
        flatten_param(param, &mut args);
    }
    AsmNode::Directive { name, args }
}

fn expect_arity(mnemonic: &str, params: &[Param], expected: usize) -> Result<()> {
    if params.len() != expected {
        return Err(Error::InvalidInstructionParameterCount {
            mnemonic: mnemonic.to_owned(),
            expected,
            actual: params.len(),
        });
    }
    Ok(())
}

fn expect_register(mnemonic: &str, index: usize, param: &Param) -> Result<RegisterId> {
    match param {
        Param::Register(name) => name.parse().map_err(|_| Error::InvalidParameterKind {
            mnemonic: mnemonic.to_owned(),
            index,
            expected: "register",
        }),
        _ => Err(Error::InvalidParameterKind {
            mnemonic: mnemonic.to_owned(),
            index,
            expected: "register",
        }),
    }
}

fn expect_operand(mnemonic: &str, index: usize, param: &Param, labels: &HashSet<String>) -> Result<Operand> {
    match param {
        Param::Number(n) => Ok(Operand::Immediate(*n as i16 as u16)),
        Param::Symbol(name) => {
            if labels.contains(name) {
                Ok(Operand::Label(name.clone()))
            } else {
                Err(Error::UnknownSymbol(name.clone()))
            }
        }
        _ => Err(Error::InvalidParameterKind {
            mnemonic: mnemonic.to_owned(),
            index,
            expected: "number or label",
        }),
    }
}

fn translate_instruction(name: &str, params: &[Param], labels: &HashSet<String>) -> Result<AsmInstruction> {
    match name {
        "limm" => {
            expect_arity(name, params, 1)?;
            Ok(AsmInstruction::LoadImmediate(expect_operand(
                name, 0, &params[0], labels,
            )?))
        }
        "lmem" => {
            expect_arity(name, params, 1)?;
            Ok(AsmInstruction::LoadDirect(expect_operand(
                name, 0, &params[0], labels,
            )?))
        }
        "smem" => {
            expect_arity(name, params, 1)?;
            Ok(AsmInstruction::StoreDirect(expect_operand(
                name, 0, &params[0], labels,
            )?))
        }
        "lidx" => {
            expect_arity(name, params, 0)?;
            Ok(AsmInstruction::LoadIndexed)
        }
        "sidx" => {
            expect_arity(name, params, 0)?;
            Ok(AsmInstruction::StoreIndexed)
        }
        "tr" => {
            expect_arity(name, params, 2)?;
            Ok(AsmInstruction::Transfer {
                src: expect_register(name, 0, &params[0])?,
                tgt: expect_register(name, 1, &params[1])?,
            })
        }
        "psh0" => {
            expect_arity(name, params, 1)?;
            Ok(AsmInstruction::Push0(expect_register(name, 0, &params[0])?))
        }
        "psh1" => {
            expect_arity(name, params, 1)?;
            Ok(AsmInstruction::Push1(expect_register(name, 0, &params[0])?))
        }
        "pop0" => {
            expect_arity(name, params, 1)?;
            Ok(AsmInstruction::Pop0(expect_register(name, 0, &params[0])?))
        }
        "pop1" => {
            expect_arity(name, params, 1)?;
            Ok(AsmInstruction::Pop1(expect_register(name, 0, &params[0])?))
        }
        "add" => {
            expect_arity(name, params, 0)?;
            Ok(AsmInstruction::Add)
        }
        "sub" => {
            expect_arity(name, params, 0)?;
            Ok(AsmInstruction::Sub)
        }
        "mul" => {
            expect_arity(name, params, 0)?;
            Ok(AsmInstruction::Mul)
        }
        "divmod" => {
            expect_arity(name, params, 0)?;
            Ok(AsmInstruction::DivMod)
        }
        "nand" => {
            expect_arity(name, params, 0)?;
            Ok(AsmInstruction::Nand)
        }
        "or" => {
            expect_arity(name, params, 0)?;
            Ok(AsmInstruction::Or)
        }
        "and" => {
            expect_arity(name, params, 0)?;
            Ok(AsmInstruction::And)
        }
        "invert" => {
            expect_arity(name, params, 0)?;
            Ok(AsmInstruction::Invert)
        }
        "shl" => {
            expect_arity(name, params, 0)?;
            Ok(AsmInstruction::ShiftLeft)
        }
        "shr" => {
            expect_arity(name, params, 0)?;
            Ok(AsmInstruction::ShiftRight)
        }
        "rol" => {
            expect_arity(name, params, 0)?;
            Ok(AsmInstruction::RotateLeft)
        }
        "ror" => {
            expect_arity(name, params, 0)?;
            Ok(AsmInstruction::RotateRight)
        }
        "jle" => {
            expect_arity(name, params, 0)?;
            Ok(AsmInstruction::JumpIfLE)
        }
        "jmp" => {
            expect_arity(name, params, 0)?;
            Ok(AsmInstruction::Jump)
        }
        "rtm" => {
            expect_arity(name, params, 0)?;
            Ok(AsmInstruction::RestoreTMP)
        }
        other => Err(Error::UnknownInstruction(other.to_owned())),
    }
}

fn label_scan(lines: &[Line]) -> HashSet<String> {
    lines
        .iter()
        .filter_map(|line| match line {
            Line::Label { name } => Some(name.clone()),
            _ => None,
        })
        .collect()
}

fn translate(lines: &[Line]) -> Result<Vec<AsmNode>> {
    let labels = label_scan(lines);
    let mut nodes = Vec::with_capacity(lines.len());

    for line in lines {
        let node = match line {
            Line::Label { name } => AsmNode::Label {
                name: name.clone(),
                section: String::new(),
                position: None,
            },
            Line::Directive { name, params } => translate_directive(name.clone(), params),
            Line::Instruction { name, params } => {
                AsmNode::Instruction(translate_instruction(name, params, &labels)?)
            }
            Line::Redact => continue,
        };
        nodes.push(node);
    }

    Ok(nodes)
}

fn parse_decimal(args: &[String], index: usize) -> u32 {
    args.get(index)
        .and_then(|s| s.parse::<i64>().ok())
        .map(|n| n as u32)
        .unwrap_or(0)
}

/// Numbers labels against section-scoped offsets and back-patches
/// label-referencing instructions (§4.3c).
fn number_and_backpatch(mut nodes: Vec<AsmNode>) -> AsmTree {
    let mut offsets: HashMap<String, u32> = HashMap::new();
    offsets.insert("flat".to_owned(), 0);
    let mut current_section = "flat".to_owned();
    let mut labels: LabelMap = HashMap::new();

    for node in &mut nodes {
        match node {
            AsmNode::Label {
                name,
                section,
                position,
            } => {
                let offset = *offsets.get(&current_section).unwrap_or(&0);
                *position = Some(offset);
                *section = current_section.clone();
                labels.insert(name.clone(), (offset, current_section.clone()));
            }
            AsmNode::Instruction(instr) => {
                let entry = offsets.entry(current_section.clone()).or_insert(0);
                *entry += instr.length();
            }
            AsmNode::Directive { name, args } => match name.as_str() {
                "section" => {
                    let section_name = args.get(0).cloned().unwrap_or_default();
                    let base = parse_decimal(args, 1);
                    offsets.entry(section_name.clone()).or_insert(base);
                    current_section = section_name;
                }
                "skip" => {
                    let n = parse_decimal(args, 0);
                    *offsets.entry(current_section.clone()).or_insert(0) += n;
                }
                "byte" => {
                    *offsets.entry(current_section.clone()).or_insert(0) += 1;
                }
                "word" => {
                    *offsets.entry(current_section.clone()).or_insert(0) += 2;
                }
                "bytes" => {
                    *offsets.entry(current_section.clone()).or_insert(0) += args.len() as u32;
                }
                _ => {}
            },
        }
    }

    for node in &mut nodes {
        if let AsmNode::Instruction(instr) = node {
            resolve_operand(instr, &labels);
        }
    }

    AsmTree { nodes, labels }
}

fn resolve_operand(instr: &mut AsmInstruction, labels: &LabelMap) {
    let operand = match instr {
        AsmInstruction::LoadImmediate(operand)
        | AsmInstruction::LoadDirect(operand)
        | AsmInstruction::StoreDirect(operand) => operand,
        _ => return,
    };

    if let Operand::Label(name) = operand {
        if let Some((address, _section)) = labels.get(name) {
            *operand = Operand::Immediate(*address as u16);
        }
    }
}

/// Runs the transformer's three sub-phases over an already macro-expanded
/// line stream.
pub fn transform(lines: &[Line]) -> Result<AsmTree> {
    let nodes = translate(lines)?;
    Ok(number_and_backpatch(nodes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_resolve_to_absolute_section_offsets() {
        let lines = vec![
            Line::Directive {
                name: "section".to_owned(),
                params: vec![
                    Param::Symbol("flat".to_owned()),
                    Param::Number(0),
                ],
            },
            Line::Label {
                name: "target".to_owned(),
            },
            Line::Instruction {
                name: "limm".to_owned(),
                params: vec![Param::Symbol("target".to_owned())],
            },
        ];

        let tree = transform(&lines).unwrap();
        assert_eq!(tree.labels["target"], (0, "flat".to_owned()));
        assert_eq!(
            tree.nodes.last().unwrap(),
            &AsmNode::Instruction(AsmInstruction::LoadImmediate(Operand::Immediate(0)))
        );
    }

    #[test]
    fn two_sections_get_independent_offsets() {
        let lines = vec![
            Line::Directive {
                name: "section".to_owned(),
                params: vec![Param::Symbol("code".to_owned()), Param::Number(0x100)],
            },
            Line::Label {
                name: "start".to_owned(),
            },
            Line::Instruction {
                name: "jmp".to_owned(),
                params: vec![],
            },
            Line::Directive {
                name: "section".to_owned(),
                params: vec![Param::Symbol("data".to_owned()), Param::Number(0x200)],
            },
            Line::Directive {
                name: "byte".to_owned(),
                params: vec![Param::Number(42)],
            },
        ];

        let tree = transform(&lines).unwrap();
        assert_eq!(tree.labels["start"], (0x100, "code".to_owned()));
    }

    #[test]
    fn unknown_mnemonic_is_an_error() {
        let lines = vec![Line::Instruction {
            name: "bogus".to_owned(),
            params: vec![],
        }];
        assert!(matches!(
            transform(&lines),
            Err(Error::UnknownInstruction(_))
        ));
    }

    #[test]
    fn undeclared_symbol_is_an_error() {
        let lines = vec![Line::Instruction {
            name: "limm".to_owned(),
            params: vec![Param::Symbol("nowhere".to_owned())],
        }];
        assert!(matches!(transform(&lines), Err(Error::UnknownSymbol(_))));
    }
}
