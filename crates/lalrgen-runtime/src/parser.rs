//! The shift-reduce parser driven by a parse table.

use crate::definition::{ParseAction, ParseTable};

/// The parser driven based on the generated parse table.
///
/// The parser only reads the table. Every call to [`Parser::parse`] owns its
/// own stacks, so a single parser can serve any number of parses.
#[derive(Debug, Clone)]
pub struct Parser<TDef>
where
    TDef: ParseTable,
{
    definition: TDef,
}

/// The trace type produced by a `Parser<TDef>`.
pub type TraceOf<TDef> = ParseTrace<
    <TDef as ParseTable>::State,
    <TDef as ParseTable>::Terminal,
    <TDef as ParseTable>::Nonterminal,
    <TDef as ParseTable>::Rule,
>;

impl<TDef> Parser<TDef>
where
    TDef: ParseTable,
{
    /// Create an instance of `Parser` using the specified parse table.
    pub fn new(definition: TDef) -> Self {
        Self { definition }
    }

    pub fn definition(&self) -> &TDef {
        &self.definition
    }

    /// Run the automaton over `tokens` followed by the end of input.
    ///
    /// The returned trace always ends with exactly one `Accept` or `Error` step.
    pub fn parse<I>(&self, tokens: I) -> TraceOf<TDef>
    where
        I: IntoIterator<Item = TDef::Terminal>,
    {
        let span = tracing::trace_span!("parse");
        let _entered = span.enter();

        let input: Vec<TDef::Terminal> = tokens.into_iter().collect();
        let mut cursor = 0;
        let mut states = vec![self.definition.initial_state()];
        let mut symbols: Vec<Symbol<TDef::Terminal, TDef::Nonterminal>> = vec![];
        let mut steps = vec![];

        // Without a cycle in the table, the reductions between two shifts
        // either pop the stack or go through distinct states and rules.
        let reduction_limit = |height: usize| {
            (height + self.definition.num_states())
                .saturating_mul(self.definition.num_rules().max(1))
        };
        let mut reductions = 0;
        let mut limit = reduction_limit(states.len());

        loop {
            let current = match states.last() {
                Some(current) => *current,
                None => unreachable!("the state stack must not be empty"),
            };
            let lookahead = input.get(cursor).copied();
            tracing::trace!("state = {:?}, lookahead = {:?}", current, lookahead);

            let snapshot = |action| TraceStep {
                states: states.clone(),
                symbols: symbols.clone(),
                remaining: input[cursor..].to_vec(),
                action,
            };

            let action = match self.definition.action(current, lookahead) {
                Some(action) => action,
                None => {
                    steps.push(snapshot(TraceAction::Error(ParseError::UnexpectedToken {
                        state: current,
                        lookahead,
                    })));
                    break;
                }
            };

            match (action, lookahead) {
                (ParseAction::Accept, _) => {
                    steps.push(snapshot(TraceAction::Accept));
                    break;
                }

                (ParseAction::Shift(next), Some(token)) => {
                    steps.push(snapshot(TraceAction::Shift(next)));
                    symbols.push(Symbol::T(token));
                    states.push(next);
                    cursor += 1;
                    reductions = 0;
                    limit = reduction_limit(states.len());
                }

                // shifting the end of input
                (ParseAction::Shift(..), None) => {
                    steps.push(snapshot(TraceAction::Error(ParseError::UnexpectedToken {
                        state: current,
                        lookahead,
                    })));
                    break;
                }

                (ParseAction::Reduce(rule), _) => {
                    if reductions >= limit {
                        tracing::trace!("giving up after {} reductions without a shift", reductions);
                        steps.push(snapshot(TraceAction::Error(ParseError::ReductionCycle {
                            state: current,
                            reductions,
                        })));
                        break;
                    }
                    reductions += 1;

                    let (lhs, n) = self.definition.reduction(rule);
                    if n >= states.len() {
                        steps.push(snapshot(TraceAction::Error(ParseError::StackUnderflow {
                            state: current,
                        })));
                        break;
                    }
                    let step = snapshot(TraceAction::Reduce(rule));

                    states.truncate(states.len() - n);
                    symbols.truncate(symbols.len().saturating_sub(n));
                    let top = states[states.len() - 1];

                    match self.definition.goto(top, lhs) {
                        Some(next) => {
                            steps.push(step);
                            symbols.push(Symbol::N(lhs));
                            states.push(next);
                        }
                        None => {
                            steps.push(TraceStep {
                                states: states.clone(),
                                symbols: symbols.clone(),
                                remaining: input[cursor..].to_vec(),
                                action: TraceAction::Error(ParseError::MissingGoto {
                                    state: top,
                                    symbol: lhs,
                                }),
                            });
                            break;
                        }
                    }
                }
            }
        }

        let trace = ParseTrace { steps };
        tracing::trace!(
            steps = trace.steps.len(),
            accepted = trace.is_accepted(),
            "parse finished"
        );
        trace
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Symbol<TTerm, TNonterm> {
    T(TTerm),
    N(TNonterm),
}

/// One entry of a parse trace.
///
/// The stacks and the remaining input are captured before the action is
/// performed. The end of input is not part of `remaining`.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceStep<TState, TTerm, TNonterm, TRule> {
    pub states: Vec<TState>,
    pub symbols: Vec<Symbol<TTerm, TNonterm>>,
    pub remaining: Vec<TTerm>,
    pub action: TraceAction<TState, TTerm, TNonterm, TRule>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TraceAction<TState, TTerm, TNonterm, TRule> {
    Shift(TState),
    Reduce(TRule),
    Accept,
    Error(ParseError<TState, TTerm, TNonterm>),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError<TState, TTerm, TNonterm> {
    /// The table has no action for the lookahead symbol.
    #[error("unexpected {lookahead:?} in state {state:?}")]
    UnexpectedToken {
        state: TState,
        /// `None` for the end of input.
        lookahead: Option<TTerm>,
    },

    /// The table has no GOTO entry for a reduced nonterminal.
    #[error("no GOTO for {symbol:?} from state {state:?}")]
    MissingGoto { state: TState, symbol: TNonterm },

    /// A reduction would pop the initial state.
    #[error("stack underflow while reducing in state {state:?}")]
    StackUnderflow { state: TState },

    /// The table keeps reducing without ever consuming the lookahead.
    #[error("{reductions} reductions in a row without a shift, stopped in state {state:?}")]
    ReductionCycle { state: TState, reductions: usize },
}

impl<TState, TTerm, TNonterm> ParseError<TState, TTerm, TNonterm> {
    /// Whether this error points at an inconsistent table rather than at the input.
    pub fn is_table_defect(&self) -> bool {
        !matches!(self, Self::UnexpectedToken { .. })
    }
}

/// The ordered record of a parse, terminated by one `Accept` or `Error` step.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseTrace<TState, TTerm, TNonterm, TRule> {
    steps: Vec<TraceStep<TState, TTerm, TNonterm, TRule>>,
}

impl<TState, TTerm, TNonterm, TRule> ParseTrace<TState, TTerm, TNonterm, TRule> {
    pub fn steps(&self) -> &[TraceStep<TState, TTerm, TNonterm, TRule>] {
        &self.steps
    }

    pub fn actions(&self) -> impl Iterator<Item = &TraceAction<TState, TTerm, TNonterm, TRule>> + '_ {
        self.steps.iter().map(|step| &step.action)
    }

    /// The terminating action.
    pub fn outcome(&self) -> Option<&TraceAction<TState, TTerm, TNonterm, TRule>> {
        self.steps.last().map(|step| &step.action)
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self.outcome(), Some(TraceAction::Accept))
    }

    pub fn error(&self) -> Option<&ParseError<TState, TTerm, TNonterm>> {
        match self.outcome() {
            Some(TraceAction::Error(err)) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug, Copy, Clone, PartialEq)]
    enum Tok {
        C,
        D,
    }

    #[derive(Debug, Copy, Clone, PartialEq)]
    enum Nt {
        S,
        C,
    }

    /// LALR(1) table of `S -> C C`, `C -> c C | d`.
    #[derive(Debug)]
    struct CcTable;

    impl ParseTable for CcTable {
        type State = u8;
        type Terminal = Tok;
        type Nonterminal = Nt;
        type Rule = u8;

        fn initial_state(&self) -> u8 {
            0
        }

        fn action(&self, current: u8, lookahead: Option<Tok>) -> Option<ParseAction<u8, u8>> {
            use ParseAction::*;
            match (current, lookahead) {
                (0 | 2 | 3, Some(Tok::C)) => Some(Shift(3)),
                (0 | 2 | 3, Some(Tok::D)) => Some(Shift(4)),
                (1, None) => Some(Accept),
                (4, _) => Some(Reduce(3)),
                (5, None) => Some(Reduce(1)),
                (6, _) => Some(Reduce(2)),
                _ => None,
            }
        }

        fn goto(&self, current: u8, symbol: Nt) -> Option<u8> {
            match (current, symbol) {
                (0, Nt::S) => Some(1),
                (0, Nt::C) => Some(2),
                (2, Nt::C) => Some(5),
                (3, Nt::C) => Some(6),
                _ => None,
            }
        }

        fn reduction(&self, rule: u8) -> (Nt, usize) {
            match rule {
                1 => (Nt::S, 2),
                2 => (Nt::C, 2),
                3 => (Nt::C, 1),
                _ => unreachable!(),
            }
        }

        fn num_states(&self) -> usize {
            7
        }

        fn num_rules(&self) -> usize {
            4
        }
    }

    /// The same table with the GOTO entries of state 0 removed.
    #[derive(Debug)]
    struct BrokenTable;

    impl ParseTable for BrokenTable {
        type State = u8;
        type Terminal = Tok;
        type Nonterminal = Nt;
        type Rule = u8;

        fn initial_state(&self) -> u8 {
            CcTable.initial_state()
        }
        fn action(&self, current: u8, lookahead: Option<Tok>) -> Option<ParseAction<u8, u8>> {
            CcTable.action(current, lookahead)
        }
        fn goto(&self, current: u8, symbol: Nt) -> Option<u8> {
            match current {
                0 => None,
                _ => CcTable.goto(current, symbol),
            }
        }
        fn reduction(&self, rule: u8) -> (Nt, usize) {
            CcTable.reduction(rule)
        }
        fn num_states(&self) -> usize {
            CcTable.num_states()
        }
        fn num_rules(&self) -> usize {
            CcTable.num_rules()
        }
    }

    /// The same table, but `C -> d` claims two symbols.
    #[derive(Debug)]
    struct OverlongTable;

    impl ParseTable for OverlongTable {
        type State = u8;
        type Terminal = Tok;
        type Nonterminal = Nt;
        type Rule = u8;

        fn initial_state(&self) -> u8 {
            CcTable.initial_state()
        }
        fn action(&self, current: u8, lookahead: Option<Tok>) -> Option<ParseAction<u8, u8>> {
            CcTable.action(current, lookahead)
        }
        fn goto(&self, current: u8, symbol: Nt) -> Option<u8> {
            CcTable.goto(current, symbol)
        }
        fn reduction(&self, rule: u8) -> (Nt, usize) {
            match rule {
                3 => (Nt::C, 2),
                _ => CcTable.reduction(rule),
            }
        }
        fn num_states(&self) -> usize {
            CcTable.num_states()
        }
        fn num_rules(&self) -> usize {
            CcTable.num_rules()
        }
    }

    /// `A -> c`, `B -> A`, `A -> B` with every reduction kept: after `c`, the
    /// parser reduces `B -> A` and `A -> B` forever.
    #[derive(Debug)]
    struct CyclicTable;

    impl ParseTable for CyclicTable {
        type State = u8;
        type Terminal = Tok;
        type Nonterminal = Nt;
        type Rule = u8;

        fn initial_state(&self) -> u8 {
            0
        }
        fn action(&self, current: u8, lookahead: Option<Tok>) -> Option<ParseAction<u8, u8>> {
            use ParseAction::*;
            match (current, lookahead) {
                (0, Some(Tok::C)) => Some(Shift(1)),
                (1, None) => Some(Reduce(1)),
                (2, None) => Some(Reduce(2)),
                (3, None) => Some(Reduce(3)),
                _ => None,
            }
        }
        fn goto(&self, current: u8, symbol: Nt) -> Option<u8> {
            // Nt::C plays `A`, Nt::S plays `B`
            match (current, symbol) {
                (0, Nt::C) => Some(2),
                (0, Nt::S) => Some(3),
                _ => None,
            }
        }
        fn reduction(&self, rule: u8) -> (Nt, usize) {
            match rule {
                1 => (Nt::C, 1),
                2 => (Nt::S, 1),
                3 => (Nt::C, 1),
                _ => unreachable!(),
            }
        }
        fn num_states(&self) -> usize {
            4
        }
        fn num_rules(&self) -> usize {
            3
        }
    }

    type Action = TraceAction<u8, Tok, Nt, u8>;

    #[test]
    fn accepts_ccdd() {
        let parser = Parser::new(CcTable);
        let trace = parser.parse([Tok::C, Tok::C, Tok::D, Tok::D]);

        let actions: Vec<Action> = trace.actions().cloned().collect();
        assert_eq!(
            actions,
            vec![
                Action::Shift(3),
                Action::Shift(3),
                Action::Shift(4),
                Action::Reduce(3),
                Action::Reduce(2),
                Action::Reduce(2),
                Action::Shift(4),
                Action::Reduce(3),
                Action::Reduce(1),
                Action::Accept,
            ]
        );
        assert!(trace.is_accepted());
        assert!(trace.error().is_none());
    }

    #[test]
    fn snapshots_are_taken_before_the_action() {
        let parser = Parser::new(CcTable);
        let trace = parser.parse([Tok::D, Tok::D]);
        let steps = trace.steps();

        assert_eq!(steps[0].states, vec![0]);
        assert!(steps[0].symbols.is_empty());
        assert_eq!(steps[0].remaining, vec![Tok::D, Tok::D]);
        assert_eq!(steps[0].action, Action::Shift(4));

        assert_eq!(steps[1].states, vec![0, 4]);
        assert_eq!(steps[1].symbols, vec![Symbol::T(Tok::D)]);
        assert_eq!(steps[1].remaining, vec![Tok::D]);
        assert_eq!(steps[1].action, Action::Reduce(3));

        assert_eq!(steps[2].states, vec![0, 2]);
        assert_eq!(steps[2].symbols, vec![Symbol::N(Nt::C)]);

        let last = steps.last().unwrap();
        assert_eq!(last.states, vec![0, 1]);
        assert!(last.remaining.is_empty());
        assert!(trace.is_accepted());
    }

    #[test]
    fn rejects_incomplete_input() {
        let parser = Parser::new(CcTable);
        let trace = parser.parse([Tok::C, Tok::C]);
        assert_eq!(trace.steps().len(), 3);
        assert_eq!(
            trace.error(),
            Some(&ParseError::UnexpectedToken {
                state: 3,
                lookahead: None,
            })
        );
        assert!(!trace.error().unwrap().is_table_defect());
    }

    #[test]
    fn rejects_unexpected_token() {
        let parser = Parser::new(CcTable);
        let trace = parser.parse([Tok::D, Tok::D, Tok::D]);
        assert!(!trace.is_accepted());
        assert!(matches!(
            trace.error(),
            Some(ParseError::UnexpectedToken {
                lookahead: Some(Tok::D),
                ..
            })
        ));
        let errors = trace
            .actions()
            .filter(|action| matches!(action, TraceAction::Error(..)))
            .count();
        assert_eq!(errors, 1);
    }

    #[test]
    fn reports_missing_goto() {
        let parser = Parser::new(BrokenTable);
        let trace = parser.parse([Tok::D, Tok::D]);
        let err = trace.error().unwrap();
        assert_eq!(
            *err,
            ParseError::MissingGoto {
                state: 0,
                symbol: Nt::C
            }
        );
        assert!(err.is_table_defect());
        assert_eq!(trace.steps().last().unwrap().states, vec![0]);
    }

    #[test]
    fn reports_stack_underflow() {
        let parser = Parser::new(OverlongTable);
        let trace = parser.parse([Tok::D, Tok::D]);
        assert_eq!(trace.steps().len(), 2);
        let err = trace.error().unwrap();
        assert_eq!(*err, ParseError::StackUnderflow { state: 4 });
        assert!(err.is_table_defect());
        assert_eq!(trace.steps().last().unwrap().states, vec![0, 4]);
    }

    #[test]
    fn stops_cyclic_reductions() {
        let parser = Parser::new(CyclicTable);
        let trace = parser.parse([Tok::C]);

        // (2 + 4) * 3 reductions after the shift of `c`
        assert_eq!(trace.steps().len(), 1 + 18 + 1);
        let err = trace.error().unwrap();
        assert_eq!(
            *err,
            ParseError::ReductionCycle {
                state: 3,
                reductions: 18
            }
        );
        assert!(err.is_table_defect());
    }

    #[test]
    fn long_reduction_chains_are_not_cycles() {
        // c^n d d reduces `C -> c C` n times in a row
        let parser = Parser::new(CcTable);
        let mut tokens = vec![Tok::C; 40];
        tokens.extend([Tok::D, Tok::D]);
        let trace = parser.parse(tokens);
        assert!(trace.is_accepted());
    }

    #[test]
    fn shared_table_across_threads() {
        let table = Arc::new(CcTable);
        std::thread::scope(|s| {
            for _ in 0..4 {
                let parser = Parser::new(Arc::clone(&table));
                assert!(Arc::ptr_eq(parser.definition(), &table));
                s.spawn(move || {
                    let trace = parser.parse([Tok::C, Tok::D, Tok::D]);
                    assert!(trace.is_accepted());
                });
            }
        });
    }
}
