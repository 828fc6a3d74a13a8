//! Canonical LR(1) item sets.

use crate::{
    first_sets::FirstSets,
    grammar::{Grammar, RuleID, SymbolID, TerminalID},
    table::TableError,
    types::Map,
    util::display_fn,
};
use std::{
    collections::{BTreeSet, VecDeque},
    fmt,
};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u16);

impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StateID {
    /// The state containing the initial item `[Start' -> . Start, $]`.
    pub const START: Self = Self(0);

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn try_from_index(index: usize) -> Result<Self, TableError> {
        u16::try_from(index)
            .map(Self)
            .map_err(|_| TableError::TooManyStates { count: index + 1 })
    }
}

/// The LR(0) item, a.k.a. LR item core.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LR0Item {
    pub rule: RuleID,
    pub marker: u16,
}

impl LR0Item {
    /// The symbol right after the marker, if any.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolID> {
        g.rule(self.rule).right().get(self.marker as usize).copied()
    }

    pub fn is_complete(&self, g: &Grammar) -> bool {
        self.marker as usize == g.rule(self.rule).right().len()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let rule = g.rule(self.rule);
            write!(f, "{} ->", g.nonterminals[&rule.left()])?;
            for (i, symbol) in rule.right().iter().enumerate() {
                if i == self.marker as usize {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            if self.marker as usize == rule.right().len() {
                f.write_str(" .")?;
            }
            Ok(())
        })
    }
}

/// LR(1) item: a production rule with a marker position and one lookahead symbol.
///
/// `X -> Y1 Y2 ... Yn` という構文規則にマーカ位置と先読み記号を付与したもの
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LR1Item {
    pub core: LR0Item,
    pub lookahead: TerminalID,
}

impl LR1Item {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(
                f,
                "[{}, {}]",
                self.core.display(g),
                g.terminals[&self.lookahead]
            )
        })
    }
}

/// A set of LR(1) items.
///
/// Items are kept sorted, so two item sets with the same content compare
/// (and hash) equal regardless of the order in which they were built.
pub type ItemSet = BTreeSet<LR1Item>;

pub fn display_item_set<'g>(items: &'g ItemSet, g: &'g Grammar) -> impl fmt::Display + 'g {
    display_fn(move |f| {
        for item in items {
            writeln!(f, "- {}", item.display(g))?;
        }
        Ok(())
    })
}

/// A labelled edge of the automaton.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Transition {
    pub from: StateID,
    pub symbol: SymbolID,
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?},{:?})", self.from, self.symbol)
    }
}

pub(crate) fn display_transitions<'g>(
    transitions: &'g Map<Transition, StateID>,
    g: &'g Grammar,
) -> impl fmt::Display + 'g {
    display_fn(move |f| {
        for (Transition { from, symbol }, to) in transitions {
            writeln!(f, "goto(I{}, {}) = I{}", from, g.symbol_name(*symbol), to)?;
        }
        Ok(())
    })
}

/// Closure/goto over LR(1) item sets.
#[derive(Debug)]
pub struct ItemSetConstructor<'g> {
    grammar: &'g Grammar,
    first_sets: &'g FirstSets,
}

impl<'g> ItemSetConstructor<'g> {
    pub fn new(grammar: &'g Grammar, first_sets: &'g FirstSets) -> Self {
        Self {
            grammar,
            first_sets,
        }
    }

    /// クロージャ展開
    ///
    /// For every `[A -> α . B β, a]` and every `B -> γ`, adds `[B -> . γ, b]`
    /// for each `b` in `First(β a)` until no more items are added.
    pub fn closure(&self, kernels: ItemSet) -> ItemSet {
        let mut items = kernels;
        let mut pending: VecDeque<LR1Item> = items.iter().copied().collect();
        while let Some(item) = pending.pop_front() {
            let rule = self.grammar.rule(item.core.rule);

            // [X -> ... @ Y beta, a]
            //  Y: one nonterminal symbol
            let (y_symbol, beta) = match &rule.right()[item.core.marker as usize..] {
                [SymbolID::N(y_symbol), beta @ ..] => (*y_symbol, beta),
                _ => continue,
            };

            let lookaheads = self.first_sets.first_of_sequence(beta, item.lookahead);
            for y_rule in self.grammar.rules_of(y_symbol) {
                for lookahead in lookaheads.iter() {
                    let new_item = LR1Item {
                        core: LR0Item {
                            rule: y_rule.id(),
                            marker: 0,
                        },
                        lookahead,
                    };
                    if items.insert(new_item) {
                        pending.push_back(new_item);
                    }
                }
            }
        }
        items
    }

    /// `goto(I, X)`
    ///
    /// An empty result means that `items` has no transition on `symbol`.
    pub fn goto(&self, items: &ItemSet, symbol: SymbolID) -> ItemSet {
        let kernels: ItemSet = items
            .iter()
            .filter(|item| item.core.next_symbol(self.grammar) == Some(symbol))
            .map(|item| LR1Item {
                core: LR0Item {
                    marker: item.core.marker + 1,
                    ..item.core
                },
                ..*item
            })
            .collect();
        if kernels.is_empty() {
            return kernels;
        }
        self.closure(kernels)
    }
}

/// The canonical collection of LR(1) item sets and its transition graph.
#[derive(Debug)]
pub struct CanonicalCollection {
    pub states: Map<StateID, ItemSet>,
    pub transitions: Map<Transition, StateID>,
}

impl CanonicalCollection {
    pub fn generate(g: &Grammar, first_sets: &FirstSets) -> Result<Self, TableError> {
        let span = tracing::debug_span!("canonical_collection");
        let _entered = span.enter();

        let constructor = ItemSetConstructor::new(g, first_sets);
        let symbols: Vec<SymbolID> = g.transition_symbols().collect();

        // [S' -> @ S, $eoi]
        let initial = constructor.closure(
            Some(LR1Item {
                core: LR0Item {
                    rule: RuleID::ACCEPT,
                    marker: 0,
                },
                lookahead: TerminalID::EOI,
            })
            .into_iter()
            .collect(),
        );

        let mut known = Map::<ItemSet, StateID>::default();
        known.insert(initial, StateID::START);

        let mut transitions = Map::default();
        let mut pending = VecDeque::from([StateID::START]);
        while let Some(current) = pending.pop_front() {
            for &symbol in &symbols {
                let next = {
                    let (items, _) = known
                        .get_index(current.index())
                        .unwrap_or_else(|| unreachable!("unregistered state {:?}", current));
                    constructor.goto(items, symbol)
                };
                if next.is_empty() {
                    continue;
                }

                let target = match known.get(&next) {
                    Some(&id) => id,
                    None => {
                        let id = StateID::try_from_index(known.len())?;
                        tracing::trace!("new state {:?} from {:?}", id, current);
                        known.insert(next, id);
                        pending.push_back(id);
                        id
                    }
                };
                transitions.insert(
                    Transition {
                        from: current,
                        symbol,
                    },
                    target,
                );
            }
        }

        tracing::debug!(
            states = known.len(),
            transitions = transitions.len(),
            "built canonical LR(1) collection"
        );

        Ok(Self {
            states: known.into_iter().map(|(items, id)| (id, items)).collect(),
            transitions,
        })
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (id, items) in &self.states {
                writeln!(f, "--- I{} ---", id)?;
                write!(f, "{}", display_item_set(items, g))?;
            }
            Ok(())
        })
    }

    pub fn display_transitions<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_transitions(&self.transitions, g)
    }
}
