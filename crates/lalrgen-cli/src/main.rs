use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use lalrgen::{
    grammar::{Grammar, TerminalID},
    syntax, trace, Config,
};
use std::{path::PathBuf, time::Instant};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path of grammar definition file.
    grammar: PathBuf,

    /// Override the start symbol of the grammar.
    #[arg(long)]
    start: Option<String>,

    /// The token sequence to be parsed, separated by whitespaces.
    #[arg(long)]
    input: Option<String>,

    /// Treat each non-whitespace character of the input as a token.
    #[arg(long)]
    chars: bool,

    /// Fail if the parse table has any conflicts.
    #[arg(long)]
    strict: bool,

    /// What to print.
    #[arg(long, value_enum, value_delimiter = ',')]
    print: Vec<Print>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Print {
    Grammar,
    Collection,
    Transitions,
    Lalr,
    Table,
    Trace,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::trace!("CLI args = {:?}", args);

    let print = if args.print.is_empty() {
        vec![Print::Table, Print::Trace]
    } else {
        args.print.clone()
    };

    let grammar = {
        let source = std::fs::read_to_string(&args.grammar).with_context(|| {
            anyhow::anyhow!("failed to read the grammar file {}", args.grammar.display())
        })?;
        syntax::parse_with_start(&source, args.start.as_deref())
            .with_context(|| anyhow::anyhow!("invalid grammar in {}", args.grammar.display()))?
    };

    let started = Instant::now();
    let generated = Config::new()
        .reject_conflicts(args.strict)
        .generate(&grammar)
        .context("failed to generate the parse table")?;
    tracing::info!(
        elapsed = ?started.elapsed(),
        canonical = generated.canonical.states.len(),
        merged = generated.lalr.states.len(),
        "generated the parse table"
    );

    let conflicts = generated.table.conflicts();
    if !conflicts.is_empty() {
        let suffix = if conflicts.len() == 1 { "" } else { "s" };
        println!(
            "[warning] The parse table has {} conflict{}; the first action of each cell is kept.",
            conflicts.len(),
            suffix
        );
    }

    if print.contains(&Print::Grammar) {
        println!("{}", grammar);
    }
    if print.contains(&Print::Collection) {
        println!("## canonical LR(1) collection");
        print!("{}", generated.canonical.display(&grammar));
    }
    if print.contains(&Print::Transitions) {
        println!("## canonical LR(1) transitions");
        print!("{}", generated.canonical.display_transitions(&grammar));
    }
    if print.contains(&Print::Lalr) {
        println!("## LALR(1) states");
        print!("{}", generated.lalr.display(&grammar));
        print!("{}", generated.lalr.display_transitions(&grammar));
    }
    if print.contains(&Print::Table) {
        println!("{}", generated.table.display(&grammar));
    }

    if let Some(input) = &args.input {
        let tokens = tokenize(&grammar, input, args.chars)?;
        let trace = generated.parser().parse(tokens);
        if print.contains(&Print::Trace) {
            print!("{}", trace::display(&trace, &grammar));
        }
        if !trace.is_accepted() {
            let outcome = trace
                .outcome()
                .map(|action| trace::describe(action, &grammar).to_string());
            anyhow::bail!("the input was rejected ({})", outcome.unwrap_or_default());
        }
        println!("accepted");
    }

    Ok(())
}

fn tokenize(
    grammar: &Grammar,
    input: &str,
    chars: bool,
) -> anyhow::Result<Vec<TerminalID>> {
    let tokens = if chars {
        let labels: Vec<String> = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(String::from)
            .collect();
        grammar.tokenize(labels)
    } else {
        grammar.tokenize(input.split_whitespace())
    };
    tokens.context("failed to tokenize the input")
}
