//! Surface-syntax parsing. The grammar and decoding rules here are an
//! assembler-author's choice -- this toolchain's specification treats the
//! parser as an external collaborator and only requires that it populate
//! the AST described alongside it.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;

use crate::ast::{AstRoot, Line, MacroDef, Param};
use crate::error::{Error, Result};

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct Cs8Parser;

const REGISTER_NAMES: &[&str] = &[
    "dst", "sc0", "sc1", "idx", "tmp", "sp0", "sp1", "dt0", "dt1", "dt2", "dt3", "dt4", "dt5",
    "lnk", "cnt", "bse",
];

fn parse_number(text: &str) -> i64 {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let value = if let Some(digits) = rest.strip_prefix("0x") {
        i64::from_str_radix(digits, 16).unwrap_or(0)
    } else if let Some(digits) = rest.strip_prefix("0o") {
        i64::from_str_radix(digits, 8).unwrap_or(0)
    } else if let Some(digits) = rest.strip_prefix("0b") {
        i64::from_str_radix(digits, 2).unwrap_or(0)
    } else {
        rest.parse().unwrap_or(0)
    };

    if negative {
        -value
    } else {
        value
    }
}

fn build_param(pair: Pair<Rule>) -> Param {
    let inner = pair.into_inner().next().expect("param always has one child");
    match inner.as_rule() {
        Rule::replace_symbol => {
            let text = inner.as_str();
            Param::ReplaceSymbol(text.trim_start_matches('\\').to_owned())
        }
        Rule::string => {
            let text = inner
                .into_inner()
                .next()
                .map(|p| p.as_str())
                .unwrap_or("");
            Param::String(text.to_owned())
        }
        Rule::number => Param::Number(parse_number(inner.as_str())),
        Rule::identifier => {
            let name = inner.as_str();
            if REGISTER_NAMES.contains(&name) {
                Param::Register(name.to_owned())
            } else {
                Param::Symbol(name.to_owned())
            }
        }
        _ => unreachable!("unexpected param alternative"),
    }
}

fn build_params(pairs: pest::iterators::Pairs<Rule>) -> Vec<Param> {
    pairs.map(build_param).collect()
}

fn build_label(pair: Pair<Rule>) -> Line {
    let name = pair
        .into_inner()
        .next()
        .expect("label always has an identifier")
        .as_str()
        .to_owned();
    Line::Label { name }
}

fn build_directive(pair: Pair<Rule>) -> Line {
    let mut pairs = pair.into_inner();
    let name_pair = pairs.next().expect("directive always has a name");
    let name = name_pair.as_str().trim_start_matches('.').to_owned();
    Line::Directive {
        name,
        params: build_params(pairs),
    }
}

fn build_instruction(pair: Pair<Rule>) -> Line {
    let mut pairs = pair.into_inner();
    let name = pairs
        .next()
        .expect("instruction always has a mnemonic")
        .as_str()
        .to_owned();
    Line::Instruction {
        name,
        params: build_params(pairs),
    }
}

fn build_macro_def(pair: Pair<Rule>) -> MacroDef {
    let mut pairs = pair.into_inner().peekable();
    let name = pairs
        .next()
        .expect("macro always has a name")
        .as_str()
        .to_owned();

    let mut formals = Vec::new();
    while let Some(next) = pairs.peek() {
        if next.as_rule() == Rule::identifier {
            formals.push(pairs.next().unwrap().as_str().to_owned());
        } else {
            break;
        }
    }

    let body = pairs.map(build_statement).collect();

    MacroDef {
        name,
        formals,
        body,
    }
}

fn build_statement(pair: Pair<Rule>) -> Line {
    let inner = pair
        .into_inner()
        .next()
        .expect("statement always wraps one alternative");
    match inner.as_rule() {
        Rule::label => build_label(inner),
        Rule::directive => build_directive(inner),
        Rule::instruction => build_instruction(inner),
        _ => unreachable!("macro_def is handled before descending into statement"),
    }
}

/// Parses `source` into an [`AstRoot`] named `filename`.
pub fn parse(filename: &str, source: &str) -> Result<AstRoot> {
    let mut program = Cs8Parser::parse(Rule::program, source)
        .map_err(|err| Error::Parse(err.to_string()))?;
    let pairs = program
        .next()
        .expect("program rule always produces one pair")
        .into_inner();

    let mut root = AstRoot::new(filename.to_owned());

    for pair in pairs {
        match pair.as_rule() {
            Rule::statement => {
                let inner = pair
                    .into_inner()
                    .next()
                    .expect("statement always wraps one alternative");
                match inner.as_rule() {
                    Rule::macro_def => root.macros.push(build_macro_def(inner)),
                    Rule::label => root.lines.push(build_label(inner)),
                    Rule::directive => root.lines.push(build_directive(inner)),
                    Rule::instruction => root.lines.push(build_instruction(inner)),
                    _ => unreachable!(),
                }
            }
            Rule::EOI => {}
            _ => unreachable!("program only contains statements and EOI"),
        }
    }

    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_directive_and_instruction() {
        let root = parse(
            "test",
            ".section flat 0\nlimm 0x1234\n",
        )
        .unwrap();

        assert_eq!(
            root.lines[0],
            Line::Directive {
                name: "section".to_owned(),
                params: vec![Param::Symbol("flat".to_owned()), Param::Number(0)],
            }
        );
        assert_eq!(
            root.lines[1],
            Line::Instruction {
                name: "limm".to_owned(),
                params: vec![Param::Number(0x1234)],
            }
        );
    }

    #[test]
    fn parses_a_label_and_register_params() {
        let root = parse("test", "start:\ntr tmp, sc0\n").unwrap();
        assert_eq!(
            root.lines[0],
            Line::Label {
                name: "start".to_owned()
            }
        );
        assert_eq!(
            root.lines[1],
            Line::Instruction {
                name: "tr".to_owned(),
                params: vec![
                    Param::Register("tmp".to_owned()),
                    Param::Register("sc0".to_owned())
                ],
            }
        );
    }

    #[test]
    fn parses_a_macro_definition_with_replace_symbols() {
        let root = parse(
            "test",
            ".macro inc(\\r)\ntr \\r, sc0\n.endmacro\ninc dt0\n",
        )
        .unwrap();

        assert_eq!(root.macros.len(), 1);
        assert_eq!(root.macros[0].name, "inc");
        assert_eq!(root.macros[0].formals, vec!["r".to_owned()]);
        assert_eq!(
            root.macros[0].body,
            vec![Line::Instruction {
                name: "tr".to_owned(),
                params: vec![
                    Param::ReplaceSymbol("r".to_owned()),
                    Param::Register("sc0".to_owned())
                ],
            }]
        );
        assert_eq!(
            root.lines[0],
            Line::Instruction {
                name: "inc".to_owned(),
                params: vec![Param::Register("dt0".to_owned())],
            }
        );
    }
}
