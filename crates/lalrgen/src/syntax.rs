//! Line-oriented grammar definition format.
//!
//! ```text
//! # comment
//! %start S
//! %token c d
//! S -> C C
//! C -> c C
//!    | d
//! E -> ε
//! ```
//!
//! `ε`, `@empty` or an empty alternative denotes an epsilon body.

use crate::grammar::{Grammar, GrammarDefError};
use std::{fs, path::Path};

const EPSILON_LABELS: &[&str] = &["ε", "@empty"];

#[derive(Debug, thiserror::Error)]
#[error("{}{}", line_prefix(.line), .kind)]
pub struct SyntaxError {
    /// 1-based line number, if the error can be attributed to a line.
    pub line: Option<usize>,
    pub kind: SyntaxErrorKind,
}

fn line_prefix(line: &Option<usize>) -> String {
    line.map_or_else(String::new, |line| format!("line {}: ", line))
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SyntaxErrorKind {
    #[error("unknown directive `%{}'", name)]
    UnknownDirective { name: String },

    #[error("`%start' requires exactly one symbol")]
    InvalidStartDirective,

    #[error("missing `->' in a production rule")]
    MissingArrow,

    #[error("the head of a production rule must be a single symbol")]
    InvalidHead,

    #[error("`|' without a preceding production rule")]
    DanglingAlternative,

    #[error(transparent)]
    Definition(#[from] GrammarDefError),

    #[error("failed to read the grammar file")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
enum Line<'s> {
    Start(&'s str),
    Tokens(Vec<&'s str>),
    Rule {
        head: &'s str,
        alternatives: Vec<Vec<&'s str>>,
    },
    Continue(Vec<Vec<&'s str>>),
}

pub fn parse_file(path: impl AsRef<Path>) -> Result<Grammar, SyntaxError> {
    let source = fs::read_to_string(path).map_err(|err| SyntaxError {
        line: None,
        kind: err.into(),
    })?;
    parse(&source)
}

pub fn parse(source: &str) -> Result<Grammar, SyntaxError> {
    parse_with_start(source, None)
}

/// Parse a grammar, overriding its `%start` directive when `start` is given.
pub fn parse_with_start(source: &str, start: Option<&str>) -> Result<Grammar, SyntaxError> {
    let span = tracing::trace_span!("parse");
    let _entered = span.enter();

    let mut lines = vec![];
    for (i, text) in source.lines().enumerate() {
        let lineno = i + 1;
        let line = parse_line(text).map_err(|kind| SyntaxError {
            line: Some(lineno),
            kind,
        })?;
        if let Some(line) = line {
            tracing::trace!("line {}: {:?}", lineno, line);
            lines.push((lineno, line));
        }
    }

    let mut current_line = None;
    let mut dangling = false;
    let res = Grammar::define(|g| {
        let mut last_head = None;
        for (lineno, line) in lines {
            current_line = Some(lineno);
            match line {
                Line::Start(name) => g.start_symbol(name)?,
                Line::Tokens(names) => {
                    for name in names {
                        g.terminal(name)?;
                    }
                }
                Line::Rule { head, alternatives } => {
                    for body in alternatives {
                        g.rule(head, body)?;
                    }
                    last_head = Some(head);
                }
                Line::Continue(alternatives) => {
                    let head = match last_head {
                        Some(head) => head,
                        None => {
                            dangling = true;
                            return Ok(());
                        }
                    };
                    for body in alternatives {
                        g.rule(head, body)?;
                    }
                }
            }
        }
        current_line = None;
        if let Some(start) = start {
            g.start_symbol(start)?;
        }
        Ok(())
    });

    if dangling {
        return Err(SyntaxError {
            line: current_line,
            kind: SyntaxErrorKind::DanglingAlternative,
        });
    }
    res.map_err(|err| SyntaxError {
        line: current_line,
        kind: err.into(),
    })
}

fn parse_line(text: &str) -> Result<Option<Line<'_>>, SyntaxErrorKind> {
    let tokens: Vec<&str> = text
        .split_whitespace()
        .take_while(|token| !token.starts_with('#'))
        .collect();

    match tokens.as_slice() {
        [] => Ok(None),

        [directive, args @ ..] if directive.starts_with('%') => match (&directive[1..], args) {
            ("start", [name]) => Ok(Some(Line::Start(*name))),
            ("start", _) => Err(SyntaxErrorKind::InvalidStartDirective),
            ("token", names) => Ok(Some(Line::Tokens(names.to_vec()))),
            (name, _) => Err(SyntaxErrorKind::UnknownDirective {
                name: name.to_owned(),
            }),
        },

        ["|", ..] => Ok(Some(Line::Continue(split_alternatives(&tokens[1..])))),

        _ => {
            let arrow = tokens
                .iter()
                .position(|token| is_arrow(token))
                .ok_or(SyntaxErrorKind::MissingArrow)?;
            let head = match &tokens[..arrow] {
                [head] => *head,
                _ => return Err(SyntaxErrorKind::InvalidHead),
            };
            Ok(Some(Line::Rule {
                head,
                alternatives: split_alternatives(&tokens[arrow + 1..]),
            }))
        }
    }
}

fn is_arrow(token: &str) -> bool {
    matches!(token, "->" | "→")
}

fn split_alternatives<'s>(tokens: &[&'s str]) -> Vec<Vec<&'s str>> {
    tokens
        .split(|token| *token == "|")
        .map(|body| {
            body.iter()
                .copied()
                .filter(|label| !EPSILON_LABELS.contains(label))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID;

    #[test]
    fn simple_grammar() {
        let g = parse(
            "# the textbook example\n\
             S -> C C\n\
             C -> c C | d\n",
        )
        .unwrap();
        eprintln!("{}", g);

        assert_eq!(g.rules.len(), 4); // including the accept rule
        let s = g.find_nonterminal("S").unwrap();
        assert_eq!(g.start_symbol, s);
        let c = g.find_nonterminal("C").unwrap();
        let bodies: Vec<_> = g.rules_of(c).map(|rule| rule.right().to_vec()).collect();
        assert_eq!(
            bodies,
            vec![
                vec![
                    SymbolID::T(g.find_terminal("c").unwrap()),
                    SymbolID::N(c)
                ],
                vec![SymbolID::T(g.find_terminal("d").unwrap())],
            ]
        );
    }

    #[test]
    fn start_directive_and_continuation() {
        let g = parse(
            "%start E\n\
             T -> num\n\
             E -> E + T   # left recursive\n\
             | T\n",
        )
        .unwrap();
        assert_eq!(g.start_symbol, g.find_nonterminal("E").unwrap());
        let e = g.find_nonterminal("E").unwrap();
        assert_eq!(g.rules_of(e).count(), 2);
    }

    #[test]
    fn start_symbol_override() {
        let source = "%start S\nS -> A\nA -> a\n";
        let g = parse_with_start(source, Some("A")).unwrap();
        assert_eq!(g.start_symbol, g.find_nonterminal("A").unwrap());
    }

    #[test]
    fn epsilon_bodies() {
        let g = parse("S -> A b\nA -> a | ε\nB -> @empty\nC -> c |\n").unwrap();
        for name in ["A", "B", "C"] {
            let n = g.find_nonterminal(name).unwrap();
            assert!(
                g.rules_of(n).any(|rule| rule.right().is_empty()),
                "{} has no epsilon body",
                name
            );
        }
    }

    #[test]
    fn syntax_errors_carry_line_numbers() {
        let err = parse("S -> a\nS a b\n").unwrap_err();
        assert_eq!(err.line, Some(2));
        assert!(matches!(err.kind, SyntaxErrorKind::MissingArrow));

        let err = parse("S T -> a\n").unwrap_err();
        assert!(matches!(err.kind, SyntaxErrorKind::InvalidHead));

        let err = parse("%prec left\n").unwrap_err();
        assert!(matches!(err.kind, SyntaxErrorKind::UnknownDirective { .. }));

        let err = parse("| a\n").unwrap_err();
        assert_eq!(err.line, Some(1));
        assert!(matches!(err.kind, SyntaxErrorKind::DanglingAlternative));
    }

    #[test]
    fn definition_errors_are_reported() {
        let err = parse("S -> a\nS -> a\n").unwrap_err();
        assert_eq!(err.line, Some(2));
        assert!(matches!(
            err.kind,
            SyntaxErrorKind::Definition(GrammarDefError::DuplicateRule { .. })
        ));

        let err = parse("%start X\nS -> a\n").unwrap_err();
        assert_eq!(err.line, None);
        assert!(matches!(
            err.kind,
            SyntaxErrorKind::Definition(GrammarDefError::UnknownStartSymbol { .. })
        ));

        let err = parse("# nothing here\n").unwrap_err();
        assert!(matches!(
            err.kind,
            SyntaxErrorKind::Definition(GrammarDefError::EmptyGrammar)
        ));
    }
}
