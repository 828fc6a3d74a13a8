//! Calculation of first set function.

use crate::{
    grammar::{Grammar, SymbolID, TerminalID},
    types::{Map, TerminalSet},
};

/// `First(X)`: the terminals that can begin a string derived from `X`,
/// together with the epsilon marker when `X` derives the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirstSet {
    terminals: TerminalSet,
    epsilon: bool,
}

impl FirstSet {
    pub fn terminals(&self) -> &TerminalSet {
        &self.terminals
    }

    pub fn contains(&self, t: TerminalID) -> bool {
        self.terminals.contains(t)
    }

    /// Whether the epsilon marker is a member of this set.
    pub fn has_epsilon(&self) -> bool {
        self.epsilon
    }
}

#[derive(Debug)]
pub struct FirstSets {
    map: Map<SymbolID, FirstSet>,
}

impl FirstSets {
    pub fn new(grammar: &Grammar) -> Self {
        let span = tracing::debug_span!("first_sets");
        let _entered = span.enter();

        let mut map = Map::<SymbolID, FirstSet>::default();

        // terminal symbols については First(T) = {T} になる
        for &t in grammar.terminals.keys() {
            map.insert(
                SymbolID::T(t),
                FirstSet {
                    terminals: Some(t).into_iter().collect(),
                    epsilon: false,
                },
            );
        }
        // nonterminal symbols は First(N) = {} と初期化する
        for &n in grammar.nonterminals.keys() {
            map.insert(SymbolID::N(n), FirstSet::default());
        }

        // 値が更新されなくなるまで繰り返す
        let mut iterations = 0;
        loop {
            iterations += 1;
            let mut changed = false;
            for rule in grammar.rules.values() {
                let mut added = TerminalSet::default();
                let mut nullable = true;
                for symbol in rule.right() {
                    let first = &map[symbol];
                    added.union_with(&first.terminals);
                    if !first.epsilon {
                        nullable = false;
                        break;
                    }
                }

                let head = &mut map[&SymbolID::N(rule.left())];
                changed |= head.terminals.extend_from(&added);
                if nullable && !head.epsilon {
                    head.epsilon = true;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        tracing::debug!(symbols = map.len(), iterations, "first sets converged");
        for (symbol, first) in &map {
            if let SymbolID::N(..) = symbol {
                tracing::trace!(
                    "First({}) = {:?}{}",
                    grammar.symbol_name(*symbol),
                    first.terminals,
                    if first.epsilon { " + ε" } else { "" }
                );
            }
        }

        Self { map }
    }

    /// `First(symbol)`
    pub fn first(&self, symbol: SymbolID) -> &FirstSet {
        &self.map[&symbol]
    }

    pub fn is_nullable(&self, symbol: SymbolID) -> bool {
        self.map[&symbol].epsilon
    }

    /// `First(sequence lookahead)`
    ///
    /// The lookahead is included only if every symbol in `sequence` is nullable,
    /// so the result never contains the epsilon marker.
    pub fn first_of_sequence(&self, sequence: &[SymbolID], lookahead: TerminalID) -> TerminalSet {
        let mut res = TerminalSet::default();
        for symbol in sequence {
            let first = &self.map[symbol];
            res.union_with(&first.terminals);
            if !first.epsilon {
                return res;
            }
        }
        res.insert(lookahead);
        res
    }
}
