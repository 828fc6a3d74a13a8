//! Grammar types.

use crate::{
    types::{Map, Set},
    util::display_fn,
};
use std::fmt;

/// The label reserved for the end-of-input marker.
pub const END_MARKER: &str = "$";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}

impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self::from_raw(0);

    const OFFSET: u16 = 1;

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

#[derive(Debug)]
pub struct Terminal {
    id: TerminalID,
    name: String,
}
impl Terminal {
    pub fn id(&self) -> TerminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}
impl NonterminalID {
    /// The head of the augmented start production.
    pub const START: Self = Self::new(0);
    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

#[derive(Debug)]
pub struct Nonterminal {
    id: NonterminalID,
    name: String,
}
impl Nonterminal {
    pub fn id(&self) -> NonterminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleID {
    raw: u16,
}

impl RuleID {
    /// The augmented production `Start' -> Start`.
    pub const ACCEPT: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    /// The position of this production in the augmented production list.
    #[inline]
    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

impl fmt::Display for RuleID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// The type that represents a production rule in grammar.
#[derive(Debug)]
pub struct Rule {
    id: RuleID,
    left: NonterminalID,
    right: Vec<SymbolID>,
}
impl Rule {
    pub fn id(&self) -> RuleID {
        self.id
    }

    /// Return the left-hand side of this production.
    pub fn left(&self) -> NonterminalID {
        self.left
    }

    /// Return the right-hand side of this production.
    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    // `"LHS -> R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(f, "{} ->", g.nonterminals[&self.left])?;
            if self.right.is_empty() {
                return f.write_str(" ε");
            }
            for symbol in &self.right {
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            Ok(())
        })
    }
}

/// The grammar definition used to derive the parser tables.
///
/// The grammar is always augmented: `rules[RuleID::ACCEPT]` is the synthetic
/// production `Start' -> Start`, whose head is `NonterminalID::START`.
#[derive(Debug)]
#[non_exhaustive]
pub struct Grammar {
    pub terminals: Map<TerminalID, Terminal>,
    pub nonterminals: Map<NonterminalID, Nonterminal>,
    pub rules: Map<RuleID, Rule>,
    pub start_symbol: NonterminalID,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.terminals.values() {
            writeln!(f, "{}", terminal)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.nonterminals.values() {
            write!(f, "{}", nonterminal)?;
            if nonterminal.id() == self.start_symbol {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## rules:")?;
        for rule in self.rules.values() {
            writeln!(f, "{}: {}", rule.id(), rule.display(self))?;
        }

        Ok(())
    }
}

impl Grammar {
    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef::default();
        f(&mut def)?;
        def.end()
    }

    pub fn rule(&self, id: RuleID) -> &Rule {
        &self.rules[&id]
    }

    pub fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => self.terminals[&t].name(),
            SymbolID::N(n) => self.nonterminals[&n].name(),
        }
    }

    /// Iterate over the grammar symbols that may label a transition, i.e.
    /// every symbol except the end-marker and the augmented start symbol.
    pub fn transition_symbols(&self) -> impl Iterator<Item = SymbolID> + '_ {
        let terminals = self
            .terminals
            .keys()
            .filter(|&&t| t != TerminalID::EOI)
            .map(|&t| SymbolID::T(t));
        let nonterminals = self
            .nonterminals
            .keys()
            .filter(|&&n| n != NonterminalID::START)
            .map(|&n| SymbolID::N(n));
        terminals.chain(nonterminals)
    }

    /// Iterate over the production rules whose head is `left`.
    pub fn rules_of(&self, left: NonterminalID) -> impl Iterator<Item = &Rule> + '_ {
        self.rules.values().filter(move |rule| rule.left == left)
    }

    pub fn find_terminal(&self, name: &str) -> Option<TerminalID> {
        self.terminals
            .values()
            .find(|t| t.name == name)
            .map(|t| t.id)
    }

    pub fn find_nonterminal(&self, name: &str) -> Option<NonterminalID> {
        self.nonterminals
            .values()
            .find(|n| n.id != NonterminalID::START && n.name == name)
            .map(|n| n.id)
    }

    /// Map the labels of an input sequence onto terminal symbols.
    ///
    /// The end-marker is appended by the parser and must not occur in the input.
    pub fn tokenize<I, S>(&self, labels: I) -> Result<Vec<TerminalID>, TokenError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        labels
            .into_iter()
            .map(|label| {
                let label = label.as_ref();
                match self.find_terminal(label) {
                    Some(TerminalID::EOI) => Err(TokenError::EndMarker),
                    Some(t) => Ok(t),
                    None => Err(TokenError::NotATerminal {
                        name: label.to_owned(),
                    }),
                }
            })
            .collect()
    }
}

/// The contextural values for building a `Grammar`.
///
/// Symbols are plain labels: a label becomes a nonterminal iff it appears as
/// the head of some production, and every other label in a body becomes a
/// terminal. Once a terminal has been declared explicitly, body labels that
/// are neither heads nor declared terminals are rejected.
#[derive(Debug, Default)]
pub struct GrammarDef {
    rules: Vec<(String, Vec<String>)>,
    declared_terminals: Set<String>,
    start: Option<String>,
}

impl GrammarDef {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str) -> Result<(), GrammarDefError> {
        verify_label(name)?;
        self.declared_terminals.insert(name.to_owned());
        Ok(())
    }

    /// Specify a production rule into this grammer.
    ///
    /// An empty `body` denotes an epsilon production.
    pub fn rule<I, S>(&mut self, head: &str, body: I) -> Result<(), GrammarDefError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        verify_label(head)?;
        let body: Vec<String> = body
            .into_iter()
            .map(|s| {
                let s = s.as_ref();
                verify_label(s).map(|()| s.to_owned())
            })
            .collect::<Result<_, _>>()?;

        if self.rules.iter().any(|(h, b)| h == head && *b == body) {
            return Err(GrammarDefError::DuplicateRule {
                head: head.to_owned(),
                body: body.join(" "),
            });
        }

        self.rules.push((head.to_owned(), body));
        Ok(())
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, name: &str) -> Result<(), GrammarDefError> {
        verify_label(name)?;
        self.start.replace(name.to_owned());
        Ok(())
    }

    fn end(self) -> Result<Grammar, GrammarDefError> {
        let GrammarDef {
            rules: pending_rules,
            declared_terminals,
            start,
        } = self;

        if pending_rules.is_empty() {
            return Err(GrammarDefError::EmptyGrammar);
        }

        let mut nonterminal_ids = Map::<String, NonterminalID>::default();
        for (head, _) in &pending_rules {
            if !nonterminal_ids.contains_key(head) {
                let raw = next_raw(NonterminalID::OFFSET, nonterminal_ids.len())?;
                nonterminal_ids.insert(head.clone(), NonterminalID::new(raw));
            }
        }

        if let Some(name) = declared_terminals
            .iter()
            .find(|name| nonterminal_ids.contains_key(*name))
        {
            return Err(GrammarDefError::TerminalAsHead { name: name.clone() });
        }

        // 指定されていない場合は最初の構文規則の左辺を開始記号とする
        let start_name = match start {
            Some(start) => start,
            None => pending_rules[0].0.clone(),
        };
        let start_symbol = nonterminal_ids
            .get(&start_name)
            .copied()
            .ok_or_else(|| GrammarDefError::UnknownStartSymbol {
                name: start_name.clone(),
            })?;

        let mut terminal_ids = Map::<String, TerminalID>::default();
        terminal_ids.insert(END_MARKER.to_owned(), TerminalID::EOI);
        for name in &declared_terminals {
            let raw = next_raw(TerminalID::OFFSET, terminal_ids.len() - 1)?;
            terminal_ids.insert(name.clone(), TerminalID::from_raw(raw));
        }

        let mut rules = Map::default();
        rules.insert(
            RuleID::ACCEPT,
            Rule {
                id: RuleID::ACCEPT,
                left: NonterminalID::START,
                right: vec![SymbolID::N(start_symbol)],
            },
        );
        for (i, (head, body)) in pending_rules.iter().enumerate() {
            let mut right = Vec::with_capacity(body.len());
            for label in body {
                if let Some(&n) = nonterminal_ids.get(label) {
                    right.push(SymbolID::N(n));
                    continue;
                }
                if let Some(&t) = terminal_ids.get(label) {
                    right.push(SymbolID::T(t));
                    continue;
                }
                if !declared_terminals.is_empty() {
                    return Err(GrammarDefError::UndeclaredSymbol {
                        name: label.clone(),
                        head: head.clone(),
                    });
                }
                let raw = next_raw(TerminalID::OFFSET, terminal_ids.len() - 1)?;
                let t = TerminalID::from_raw(raw);
                terminal_ids.insert(label.clone(), t);
                right.push(SymbolID::T(t));
            }

            let id = RuleID::new(next_raw(RuleID::OFFSET, i)?);
            rules.insert(
                id,
                Rule {
                    id,
                    left: nonterminal_ids[head],
                    right,
                },
            );
        }

        let terminals = terminal_ids
            .into_iter()
            .map(|(name, id)| (id, Terminal { id, name }))
            .collect();

        let mut nonterminals = Map::default();
        nonterminals.insert(
            NonterminalID::START,
            Nonterminal {
                id: NonterminalID::START,
                name: format!("{}'", start_name),
            },
        );
        for (name, id) in nonterminal_ids {
            nonterminals.insert(id, Nonterminal { id, name });
        }

        Ok(Grammar {
            terminals,
            nonterminals,
            rules,
            start_symbol,
        })
    }
}

fn next_raw(offset: u16, count: usize) -> Result<u16, GrammarDefError> {
    u16::try_from(count)
        .ok()
        .and_then(|count| count.checked_add(offset))
        .ok_or(GrammarDefError::TooManySymbols)
}

fn verify_label(label: &str) -> Result<(), GrammarDefError> {
    if label == END_MARKER {
        return Err(GrammarDefError::ReservedSymbol {
            name: label.to_owned(),
        });
    }
    if label.is_empty() || label.chars().any(char::is_whitespace) {
        return Err(GrammarDefError::InvalidSymbol {
            name: label.to_owned(),
        });
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarDefError {
    #[error("the grammar has no production rules")]
    EmptyGrammar,

    #[error("unknown start symbol: `{}'", name)]
    UnknownStartSymbol { name: String },

    #[error("`{}' is reserved as the end-of-input marker", name)]
    ReservedSymbol { name: String },

    #[error("incorrect symbol name: {:?}", name)]
    InvalidSymbol { name: String },

    #[error("duplicate production rule detected: `{} -> {}'", head, body)]
    DuplicateRule { head: String, body: String },

    #[error("the terminal `{}' is used as the head of a production rule", name)]
    TerminalAsHead { name: String },

    #[error("undeclared symbol `{}' in a production rule of `{}'", name, head)]
    UndeclaredSymbol { name: String, head: String },

    #[error("too many symbols or production rules")]
    TooManySymbols,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("the end-of-input marker must not appear in the input")]
    EndMarker,

    #[error("`{}' is not a terminal symbol of the grammar", name)]
    NotATerminal { name: String },
}
