//! LALR(1) parser table generator.
//!
//! The tables are derived by a forward-only pipeline: grammar, FIRST sets,
//! canonical LR(1) collection, LALR(1) merged states, and finally the
//! ACTION/GOTO tables consumed by [`lalrgen_runtime::parser::Parser`].

pub mod first_sets;
pub mod grammar;
pub mod lalr;
pub mod lr1;
pub mod syntax;
pub mod table;
pub mod trace;
pub mod types;
pub mod util;

pub use lalrgen_runtime as runtime;

use crate::{
    first_sets::FirstSets,
    grammar::Grammar,
    lalr::LALRAutomaton,
    lr1::CanonicalCollection,
    table::{ParseTable, TableError},
};
use lalrgen_runtime::parser::Parser;

#[derive(Debug, Default, Clone)]
pub struct Config {
    reject_conflicts: bool,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            reject_conflicts: false,
        }
    }

    /// Fail the generation instead of keeping the first action of a
    /// conflicting ACTION cell.
    pub fn reject_conflicts(&mut self, enabled: bool) -> &mut Self {
        self.reject_conflicts = enabled;
        self
    }

    pub fn generate(&self, g: &Grammar) -> Result<Generated, TableError> {
        compute_with_config(g, self)
    }
}

/// All artifacts derived from a grammar.
#[derive(Debug)]
#[non_exhaustive]
pub struct Generated {
    pub first_sets: FirstSets,
    pub canonical: CanonicalCollection,
    pub lalr: LALRAutomaton,
    pub table: ParseTable,
}

impl Generated {
    /// Create a parser that reads the generated table.
    pub fn parser(&self) -> Parser<&ParseTable> {
        Parser::new(&self.table)
    }
}

/// Compute the LALR(1) parse table from the specified grammar.
pub fn compute(g: &Grammar) -> Result<Generated, TableError> {
    compute_with_config(g, &Config::new())
}

pub fn compute_with_config(g: &Grammar, config: &Config) -> Result<Generated, TableError> {
    let first_sets = FirstSets::new(g);
    let canonical = CanonicalCollection::generate(g, &first_sets)?;
    let lalr = LALRAutomaton::merge(&canonical)?;
    let table = table::generate(g, &lalr)?;

    if config.reject_conflicts && !table.is_consistent() {
        return Err(TableError::Conflicts {
            count: table.conflicts().len(),
        });
    }

    Ok(Generated {
        first_sets,
        canonical,
        lalr,
        table,
    })
}
