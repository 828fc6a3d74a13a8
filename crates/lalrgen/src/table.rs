//! Calculation of LALR(1) parse table.

use crate::{
    grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID},
    lalr::LALRAutomaton,
    lr1::{StateID, Transition},
    types::Map,
    util::display_fn,
};
use indexmap::map::Entry;
use lalrgen_runtime::definition::ParseAction;
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("no transition on `{}' from state {:?}", symbol, state)]
    MissingTransition { state: StateID, symbol: String },

    #[error("detected {} conflict(s) in the parse table", count)]
    Conflicts { count: usize },

    #[error("too many LR states ({}); at most {} are supported", count, u16::MAX as usize + 1)]
    TooManyStates { count: usize },
}

/// The action that the LR automaton in a state performs on a particular
/// lookahead symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    /// Read a lookahead symbol and transition to the specified state.
    Shift(StateID),

    /// Reduce to the specified production rule.
    Reduce(RuleID),

    Accept,
}

impl Action {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| match self {
            Action::Shift(n) => write!(f, "shift({})", n),
            Action::Reduce(r) => write!(f, "reduce({})", g.rule(*r).display(g)),
            Action::Accept => f.write_str("accept"),
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
    AcceptReduce,
}

/// Two actions competing for the same ACTION cell.
///
/// The table keeps the action that was written first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateID,
    pub lookahead: TerminalID,
    pub kept: Action,
    pub discarded: Action,
}

impl Conflict {
    pub fn kind(&self) -> ConflictKind {
        match (self.kept, self.discarded) {
            (Action::Shift(..), _) | (_, Action::Shift(..)) => ConflictKind::ShiftReduce,
            (Action::Accept, _) | (_, Action::Accept) => ConflictKind::AcceptReduce,
            _ => ConflictKind::ReduceReduce,
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(
                f,
                "{:?} conflict in state {} on {}: kept {}, discarded {}",
                self.kind(),
                self.state,
                g.terminals[&self.lookahead],
                self.kept.display(g),
                self.discarded.display(g)
            )
        })
    }
}

#[derive(Debug, Default)]
#[non_exhaustive]
pub struct ParseTableRow {
    pub actions: Map<TerminalID, Action>,
    pub gotos: Map<NonterminalID, StateID>,
}

/// The left-hand side and the body length of a production rule.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Reduction {
    pub left: NonterminalID,
    pub len: usize,
}

#[derive(Debug)]
pub struct ParseTable {
    pub states: Map<StateID, ParseTableRow>,
    pub reductions: Map<RuleID, Reduction>,
    conflicts: Vec<Conflict>,
}

impl ParseTable {
    /// `ACTION[state][lookahead]`
    pub fn action(&self, state: StateID, lookahead: TerminalID) -> Option<Action> {
        self.states.get(&state)?.actions.get(&lookahead).copied()
    }

    /// `GOTO[state][symbol]`
    pub fn goto(&self, state: StateID, symbol: NonterminalID) -> Option<StateID> {
        self.states.get(&state)?.gotos.get(&symbol).copied()
    }

    /// The actions dropped by the first-definition-wins policy.
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn is_consistent(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (i, (id, row)) in self.states.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }

                writeln!(f, "#### State {:?}", id)?;
                writeln!(f, "## actions")?;
                for (token, action) in &row.actions {
                    writeln!(f, "- {} => {}", g.terminals[token], action.display(g))?;
                }

                writeln!(f, "## gotos")?;
                for (symbol, goto) in &row.gotos {
                    writeln!(f, "- {} => goto({})", g.nonterminals[symbol], goto)?;
                }
            }

            if !self.conflicts.is_empty() {
                writeln!(f, "\n## conflicts")?;
                for conflict in &self.conflicts {
                    writeln!(f, "- {}", conflict.display(g))?;
                }
            }
            Ok(())
        })
    }
}

pub fn generate(g: &Grammar, lalr: &LALRAutomaton) -> Result<ParseTable, TableError> {
    let span = tracing::debug_span!("parse_table");
    let _entered = span.enter();

    let mut states: Map<StateID, ParseTableRow> = lalr
        .states
        .keys()
        .map(|&id| (id, ParseTableRow::default()))
        .collect();
    let mut conflicts = vec![];

    for (&id, merged) in &lalr.states {
        let row = &mut states[&id];
        let mut put = |lookahead: TerminalID, action: Action| match row.actions.entry(lookahead) {
            Entry::Vacant(entry) => {
                entry.insert(action);
            }
            Entry::Occupied(entry) if *entry.get() == action => {}
            Entry::Occupied(entry) => {
                let conflict = Conflict {
                    state: id,
                    lookahead,
                    kept: *entry.get(),
                    discarded: action,
                };
                tracing::debug!("{}", conflict.display(g));
                conflicts.push(conflict);
            }
        };

        // shift
        for item in &merged.items {
            if let Some(SymbolID::T(t)) = item.core.next_symbol(g) {
                let key = Transition {
                    from: id,
                    symbol: SymbolID::T(t),
                };
                let next = lalr.transitions.get(&key).copied().ok_or_else(|| {
                    TableError::MissingTransition {
                        state: id,
                        symbol: g.terminals[&t].to_string(),
                    }
                })?;
                put(t, Action::Shift(next));
            }
        }

        // accept
        for item in &merged.items {
            if item.core.rule == RuleID::ACCEPT
                && item.core.is_complete(g)
                && item.lookahead == TerminalID::EOI
            {
                put(TerminalID::EOI, Action::Accept);
            }
        }

        // reduce
        for item in &merged.items {
            if item.core.rule != RuleID::ACCEPT && item.core.is_complete(g) {
                put(item.lookahead, Action::Reduce(item.core.rule));
            }
        }
    }

    for (&Transition { from, symbol }, &to) in &lalr.transitions {
        match symbol {
            SymbolID::N(n) if n != NonterminalID::START => {
                states[&from].gotos.insert(n, to);
            }
            _ => {}
        }
    }

    let reductions = g
        .rules
        .values()
        .map(|rule| {
            (
                rule.id(),
                Reduction {
                    left: rule.left(),
                    len: rule.right().len(),
                },
            )
        })
        .collect();

    tracing::debug!(
        states = states.len(),
        conflicts = conflicts.len(),
        "generated parse table"
    );

    Ok(ParseTable {
        states,
        reductions,
        conflicts,
    })
}

impl lalrgen_runtime::definition::ParseTable for ParseTable {
    type State = StateID;
    type Terminal = TerminalID;
    type Nonterminal = NonterminalID;
    type Rule = RuleID;

    fn initial_state(&self) -> StateID {
        StateID::START
    }

    fn action(
        &self,
        current: StateID,
        lookahead: Option<TerminalID>,
    ) -> Option<ParseAction<StateID, RuleID>> {
        let action = ParseTable::action(self, current, lookahead.unwrap_or(TerminalID::EOI))?;
        Some(match action {
            Action::Shift(next) => ParseAction::Shift(next),
            Action::Reduce(rule) => ParseAction::Reduce(rule),
            Action::Accept => ParseAction::Accept,
        })
    }

    fn goto(&self, current: StateID, symbol: NonterminalID) -> Option<StateID> {
        ParseTable::goto(self, current, symbol)
    }

    fn reduction(&self, rule: RuleID) -> (NonterminalID, usize) {
        let Reduction { left, len } = self.reductions[&rule];
        (left, len)
    }

    fn num_states(&self) -> usize {
        self.states.len()
    }

    fn num_rules(&self) -> usize {
        self.reductions.len()
    }
}
