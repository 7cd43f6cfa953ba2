//! Macro expansion (§4.2): rewrites the line stream to a fixed point by
//! replacing every invocation of a defined macro with its body, tombstoning
//! the invocation line so iteration position stays stable mid-pass.

use std::collections::HashMap;

use crate::ast::{AstRoot, Line, MacroDef, Param};
use crate::error::{Error, Result};

fn substitute(params: &[Param], actuals: &HashMap<&str, &Param>) -> Vec<Param> {
    params
        .iter()
        .map(|param| match param {
            Param::ReplaceSymbol(name) => actuals
                .get(name.as_str())
                .map(|actual| (*actual).clone())
                .unwrap_or_else(|| param.clone()),
            other => other.clone(),
        })
        .collect()
}

fn substitute_line(line: &Line, actuals: &HashMap<&str, &Param>) -> Line {
    match line {
        Line::Instruction { name, params } => Line::Instruction {
            name: name.clone(),
            params: substitute(params, actuals),
        },
        Line::Directive { name, params } => Line::Directive {
            name: name.clone(),
            params: substitute(params, actuals),
        },
        Line::Label { name } => Line::Label { name: name.clone() },
        Line::Redact => Line::Redact,
    }
}

fn expand_pass(lines: &[Line], macros: &HashMap<&str, &MacroDef>) -> Result<(Vec<Line>, usize)> {
    let mut out = Vec::with_capacity(lines.len());
    let mut replacements = 0usize;

    for line in lines {
        match line {
            Line::Instruction { name, params } if macros.contains_key(name.as_str()) => {
                let def = macros[name.as_str()];
                if params.len() != def.formals.len() {
                    return Err(Error::MacroArityMismatch {
                        name: name.clone(),
                        expected: def.formals.len(),
                        actual: params.len(),
                    });
                }

                let actuals: HashMap<&str, &Param> = def
                    .formals
                    .iter()
                    .map(String::as_str)
                    .zip(params.iter())
                    .collect();

                for body_line in &def.body {
                    out.push(substitute_line(body_line, &actuals));
                }
                out.push(Line::Redact);
                replacements += 1;
            }
            other => out.push(other.clone()),
        }
    }

    Ok((out, replacements))
}

/// Expands every macro invocation in `root.lines` to a fixed point, then
/// strips the tombstones left behind.
pub fn expand(root: &AstRoot) -> Result<Vec<Line>> {
    let mut by_name: HashMap<&str, &MacroDef> = HashMap::new();
    for def in &root.macros {
        // Later definitions win on a duplicate name.
        by_name.insert(def.name.as_str(), def);
    }

    let mut lines = root.lines.clone();
    loop {
        let (next, replacements) = expand_pass(&lines, &by_name)?;
        lines = next;
        if replacements == 0 {
            break;
        }
    }

    lines.retain(|line| !matches!(line, Line::Redact));
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_a_single_invocation_with_substitution() {
        let mut root = AstRoot::new("test".to_owned());
        root.macros.push(MacroDef {
            name: "inc".to_owned(),
            formals: vec!["r".to_owned()],
            body: vec![Line::Instruction {
                name: "add".to_owned(),
                params: vec![Param::ReplaceSymbol("r".to_owned())],
            }],
        });
        root.lines.push(Line::Instruction {
            name: "inc".to_owned(),
            params: vec![Param::Register("dt0".to_owned())],
        });

        let expanded = expand(&root).unwrap();
        assert_eq!(
            expanded,
            vec![Line::Instruction {
                name: "add".to_owned(),
                params: vec![Param::Register("dt0".to_owned())],
            }]
        );
    }

    #[test]
    fn arity_mismatch_is_fatal() {
        let mut root = AstRoot::new("test".to_owned());
        root.macros.push(MacroDef {
            name: "inc".to_owned(),
            formals: vec!["r".to_owned()],
            body: vec![],
        });
        root.lines.push(Line::Instruction {
            name: "inc".to_owned(),
            params: vec![],
        });

        assert!(matches!(
            expand(&root),
            Err(Error::MacroArityMismatch { .. })
        ));
    }

    #[test]
    fn macros_expanding_to_other_macros_reach_a_fixed_point() {
        let mut root = AstRoot::new("test".to_owned());
        root.macros.push(MacroDef {
            name: "outer".to_owned(),
            formals: vec!["r".to_owned()],
            body: vec![Line::Instruction {
                name: "inner".to_owned(),
                params: vec![Param::ReplaceSymbol("r".to_owned())],
            }],
        });
        root.macros.push(MacroDef {
            name: "inner".to_owned(),
            formals: vec!["r".to_owned()],
            body: vec![Line::Instruction {
                name: "add".to_owned(),
                params: vec![Param::ReplaceSymbol("r".to_owned())],
            }],
        });
        root.lines.push(Line::Instruction {
            name: "outer".to_owned(),
            params: vec![Param::Register("dt0".to_owned())],
        });

        let expanded = expand(&root).unwrap();
        assert_eq!(
            expanded,
            vec![Line::Instruction {
                name: "add".to_owned(),
                params: vec![Param::Register("dt0".to_owned())],
            }]
        );
    }
}
