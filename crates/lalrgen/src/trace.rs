//! Rendering of parse traces with the symbol names of a grammar.

use crate::{
    grammar::{Grammar, NonterminalID, RuleID, TerminalID},
    lr1::StateID,
    table::ParseTable,
    util::display_fn,
};
use lalrgen_runtime::parser::{ParseError, Symbol, TraceAction, TraceOf, TraceStep};
use std::fmt;

pub type Trace = TraceOf<ParseTable>;
pub type Step = TraceStep<StateID, TerminalID, NonterminalID, RuleID>;
pub type StepAction = TraceAction<StateID, TerminalID, NonterminalID, RuleID>;

/// `"Shift 3"`, `"Reduce by C -> d"`, ...
pub fn describe<'g>(action: &'g StepAction, g: &'g Grammar) -> impl fmt::Display + 'g {
    display_fn(move |f| match action {
        TraceAction::Shift(next) => write!(f, "Shift {}", next),
        TraceAction::Reduce(rule) => write!(f, "Reduce by {}", g.rule(*rule).display(g)),
        TraceAction::Accept => f.write_str("Accept"),
        TraceAction::Error(ParseError::UnexpectedToken { state, lookahead }) => {
            let lookahead = lookahead.unwrap_or(TerminalID::EOI);
            write!(
                f,
                "Error: unexpected `{}' in state {}",
                g.terminals[&lookahead], state
            )
        }
        TraceAction::Error(ParseError::MissingGoto { state, symbol }) => {
            write!(
                f,
                "Error: no GOTO for {} from state {}",
                g.nonterminals[symbol], state
            )
        }
        TraceAction::Error(ParseError::StackUnderflow { state }) => {
            write!(f, "Error: stack underflow in state {}", state)
        }
        TraceAction::Error(ParseError::ReductionCycle { state, reductions }) => {
            write!(
                f,
                "Error: {} reductions without a shift, stopped in state {}",
                reductions, state
            )
        }
    })
}

/// The parser stack as alternating states and symbols, e.g. `"0 c 3 C 6"`.
pub fn stack_of(step: &Step, g: &Grammar) -> String {
    let mut parts = Vec::with_capacity(step.states.len() + step.symbols.len());
    for (i, state) in step.states.iter().enumerate() {
        if i > 0 {
            let symbol = match step.symbols.get(i - 1) {
                Some(Symbol::T(t)) => g.terminals[t].name(),
                Some(Symbol::N(n)) => g.nonterminals[n].name(),
                None => "?",
            };
            parts.push(symbol.to_owned());
        }
        parts.push(state.to_string());
    }
    parts.join(" ")
}

/// The remaining input including the end-marker, e.g. `"d d $"`.
pub fn input_of(step: &Step, g: &Grammar) -> String {
    let mut out = String::new();
    for t in step.remaining.iter().chain(Some(&TerminalID::EOI)) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(g.terminals[t].name());
    }
    out
}

pub fn display<'g>(trace: &'g Trace, g: &'g Grammar) -> impl fmt::Display + 'g {
    display_fn(move |f| {
        writeln!(f, "{:<6}{:<40}{:<20}Action", "Step", "Stack", "Input Buffer")?;
        for (i, step) in trace.steps().iter().enumerate() {
            writeln!(
                f,
                "{:<6}{:<40}{:<20}{}",
                i + 1,
                stack_of(step, g),
                input_of(step, g),
                describe(&step.action, g)
            )?;
        }
        Ok(())
    })
}
