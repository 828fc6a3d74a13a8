//! LALR(1) state merging.
//!
//! Canonical LR(1) states sharing the same LR(0) core are unified into a single
//! state whose items carry the union of the lookaheads. This may introduce
//! reduce/reduce conflicts that the canonical collection does not have.

use crate::{
    grammar::Grammar,
    lr1::{
        display_item_set, display_transitions, CanonicalCollection, ItemSet, LR0Item, StateID,
        Transition,
    },
    table::TableError,
    types::Map,
    util::{display_fn, write_joined},
};
use std::{collections::BTreeSet, fmt};

/// An item set with its lookaheads stripped.
pub type Core = BTreeSet<LR0Item>;

pub fn core_of(items: &ItemSet) -> Core {
    items.iter().map(|item| item.core).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedState {
    pub items: ItemSet,
    /// The canonical states folded into this state, in ascending order.
    pub members: Vec<StateID>,
}

#[derive(Debug)]
pub struct LALRAutomaton {
    pub states: Map<StateID, MergedState>,
    pub transitions: Map<Transition, StateID>,
    /// canonical state -> merged state
    pub mapping: Map<StateID, StateID>,
}

impl LALRAutomaton {
    pub fn merge(canonical: &CanonicalCollection) -> Result<Self, TableError> {
        let span = tracing::debug_span!("lalr_merge");
        let _entered = span.enter();

        // 同じLR(0) coreを持つ状態をまとめる
        let mut buckets = Map::<Core, MergedState>::default();
        let mut mapping = Map::default();
        for (&id, items) in &canonical.states {
            let entry = buckets.entry(core_of(items));
            let merged_id = StateID::try_from_index(entry.index())?;
            let merged = entry.or_insert_with(|| MergedState {
                items: ItemSet::new(),
                members: vec![],
            });
            merged.items.extend(items.iter().copied());
            merged.members.push(id);
            mapping.insert(id, merged_id);
        }

        let mut transitions = Map::default();
        for (&Transition { from, symbol }, to) in &canonical.transitions {
            let key = Transition {
                from: mapping[&from],
                symbol,
            };
            let to = mapping[to];
            // same-core states have the same outgoing symbols
            let prev = transitions.insert(key, to);
            debug_assert!(
                prev.map_or(true, |prev| prev == to),
                "inconsistent transitions on {:?}",
                key
            );
        }

        let states: Map<StateID, MergedState> = buckets
            .into_values()
            .enumerate()
            .map(|(i, merged)| Ok((StateID::try_from_index(i)?, merged)))
            .collect::<Result<_, TableError>>()?;

        tracing::debug!(
            canonical = canonical.states.len(),
            merged = states.len(),
            "merged LR(1) states by core"
        );
        for (id, merged) in &states {
            if merged.members.len() > 1 {
                tracing::trace!("{:?} <= {:?}", id, merged.members);
            }
        }

        Ok(Self {
            states,
            transitions,
            mapping,
        })
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (id, merged) in &self.states {
                write!(f, "--- I{} (", id)?;
                write_joined(f, merged.members.iter().map(|m| format!("I{}", m)), ", ")?;
                writeln!(f, ") ---")?;
                write!(f, "{}", display_item_set(&merged.items, g))?;
            }
            Ok(())
        })
    }

    pub fn display_transitions<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_transitions(&self.transitions, g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{first_sets::FirstSets, grammar::SymbolID};

    fn g_cc() -> Grammar {
        Grammar::define(|g| {
            g.rule("S", ["C", "C"])?;
            g.rule("C", ["c", "C"])?;
            g.rule("C", ["d"])?;
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn merges_states_with_identical_cores() {
        let g = g_cc();
        let first_sets = FirstSets::new(&g);
        let canonical = CanonicalCollection::generate(&g, &first_sets).unwrap();
        let lalr = LALRAutomaton::merge(&canonical).unwrap();
        eprintln!("{}", lalr.display(&g));

        // I3/I6, I4/I7 and I8/I9 share their cores.
        assert_eq!(lalr.states.len(), 7);
        assert_eq!(lalr.mapping[&StateID::START], StateID::START);

        for merged in lalr.states.values() {
            let mut union = ItemSet::new();
            for member in &merged.members {
                let items = &canonical.states[member];
                assert_eq!(core_of(items), core_of(&merged.items));
                union.extend(items.iter().copied());
            }
            assert_eq!(union, merged.items);
        }

        // no two merged states share a core
        let cores: BTreeSet<Core> = lalr.states.values().map(|m| core_of(&m.items)).collect();
        assert_eq!(cores.len(), lalr.states.len());
    }

    #[test]
    fn transitions_are_remapped() {
        let g = g_cc();
        let first_sets = FirstSets::new(&g);
        let canonical = CanonicalCollection::generate(&g, &first_sets).unwrap();
        let lalr = LALRAutomaton::merge(&canonical).unwrap();
        eprintln!("{}", lalr.display_transitions(&g));

        for (&Transition { from, symbol }, to) in &canonical.transitions {
            let key = Transition {
                from: lalr.mapping[&from],
                symbol,
            };
            assert_eq!(lalr.transitions[&key], lalr.mapping[to]);
        }

        // S, C, c, d from the start state; C, c, d from each of the states after `C` and `c`.
        assert_eq!(lalr.transitions.len(), 10);
        let c = SymbolID::T(g.find_terminal("c").unwrap());
        let after_c = lalr.transitions[&Transition {
            from: StateID::START,
            symbol: c,
        }];
        assert_eq!(
            lalr.transitions[&Transition {
                from: after_c,
                symbol: c
            }],
            after_c
        );
    }
}
