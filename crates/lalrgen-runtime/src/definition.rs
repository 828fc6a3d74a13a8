//! Parser definition.

use std::fmt;

/// The trait for abstracting the generated ACTION/GOTO tables.
pub trait ParseTable {
    /// The number to identify the state of LR automaton.
    type State: Copy + fmt::Debug;

    /// The number to identify the terminal symbols.
    type Terminal: Copy + fmt::Debug;

    /// The number to identify the nonterminal symbols.
    type Nonterminal: Copy + fmt::Debug;

    /// The number to identify the production rules.
    type Rule: Copy + fmt::Debug;

    /// Return the initial state number.
    fn initial_state(&self) -> Self::State;

    /// Return the action corresponding to the specified state number and
    /// lookahead symbol, or `None` if the table has no entry.
    ///
    /// If there is no lookahead symbol, a `None` is passsed as the end of input.
    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Terminal>,
    ) -> Option<ParseAction<Self::State, Self::Rule>>;

    /// Return the destination of the GOTO transition on a nonterminal symbol.
    fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State>;

    /// Return the left-hand side and the length of the right-hand side of
    /// the specified production rule.
    fn reduction(&self, rule: Self::Rule) -> (Self::Nonterminal, usize);

    /// Return the number of states in the table.
    fn num_states(&self) -> usize;

    /// Return the number of production rules, including the augmented one.
    fn num_rules(&self) -> usize;
}

macro_rules! impl_parse_table_for_pointer {
    ($($Ptr:ty),*) => {$(
        impl<T: ?Sized> ParseTable for $Ptr
        where
            T: ParseTable,
        {
            type State = T::State;
            type Terminal = T::Terminal;
            type Nonterminal = T::Nonterminal;
            type Rule = T::Rule;

            fn initial_state(&self) -> Self::State {
                (**self).initial_state()
            }

            fn action(
                &self,
                current: Self::State,
                lookahead: Option<Self::Terminal>,
            ) -> Option<ParseAction<Self::State, Self::Rule>> {
                (**self).action(current, lookahead)
            }

            fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State> {
                (**self).goto(current, symbol)
            }

            fn reduction(&self, rule: Self::Rule) -> (Self::Nonterminal, usize) {
                (**self).reduction(rule)
            }

            fn num_states(&self) -> usize {
                (**self).num_states()
            }

            fn num_rules(&self) -> usize {
                (**self).num_rules()
            }
        }
    )*};
}

impl_parse_table_for_pointer!(&T, std::rc::Rc<T>, std::sync::Arc<T>);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseAction<TState, TRule> {
    Shift(TState),
    Reduce(TRule),
    Accept,
}
