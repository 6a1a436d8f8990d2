//! Monkey interpreter command-line.
//!
//! When called without files it drops into an interactive read-evaluate-print loop.
//!
//! When called with files, it interprets them in a single interpreter session (so a file can use
//! bindings made by the ones before it).

use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use monkey::diag::FullParseError;
use monkey::interpreter::{self, Interpreter, MonkeyError};
use monkey::object::Object;

const PROMPT: &str = ">> ";

#[derive(Debug, Parser)]
#[command(name = "monkey", about = "Monkey language interpreter", version)]
struct Args {
    /// Source files, evaluated in order in one session.
    files: Vec<PathBuf>,

    /// Print the tokens of the input instead of evaluating it.
    #[arg(long, conflicts_with = "ast")]
    tokens: bool,

    /// Print the parsed program instead of evaluating it.
    #[arg(long)]
    ast: bool,
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Tokens,
    Ast,
    Eval,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging();

    let mode = if args.tokens {
        Mode::Tokens
    } else if args.ast {
        Mode::Ast
    } else {
        Mode::Eval
    };

    if args.files.is_empty() {
        run_prompt(mode)?;
    } else {
        run_all_files(&args.files, mode)?;
    }
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run_all_files(paths: &[PathBuf], mode: Mode) -> anyhow::Result<()> {
    let mut interp = Interpreter::new();

    for p in paths {
        let source =
            fs::read_to_string(p).with_context(|| format!("failed to read {}", p.display()))?;
        tracing::debug!(file = %p.display(), "running");
        match mode {
            Mode::Tokens => print_tokens(&source),
            Mode::Ast => {
                let program = interpreter::parse(&source)
                    .with_context(|| format!("failed to parse {}", p.display()))?;
                println!("{}", program);
            }
            Mode::Eval => {
                let value = interp
                    .eval(&source)
                    .with_context(|| format!("failed to parse {}", p.display()))?;
                match value {
                    Some(Object::Error(message)) => bail!("{}: {}", p.display(), message),
                    Some(value) => println!("{}", value),
                    None => {}
                }
            }
        }
    }

    Ok(())
}

fn run_prompt(mode: Mode) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    let mut interp = Interpreter::new();

    let mut input = String::new();
    loop {
        stdout.write_all(PROMPT.as_bytes())?;
        stdout.flush()?;

        input.clear();
        let nbytes = stdin.lock().read_line(&mut input)?;
        if nbytes == 0 {
            break;
        }

        match mode {
            Mode::Tokens => print_tokens(&input),
            Mode::Ast => match interpreter::parse(&input) {
                Ok(program) => println!("{}", program),
                Err(e) => print_error(&e),
            },
            Mode::Eval => match interp.eval(&input) {
                Ok(Some(value)) => println!("{}", value),
                Ok(None) => {}
                Err(e) => print_error(&e),
            },
        }
    }

    Ok(())
}

fn print_tokens(input: &str) {
    for token in interpreter::tokenize(input) {
        println!("{}", token);
    }
}

fn print_error(e: &MonkeyError) {
    match e {
        MonkeyError::Parse(errors) => print!("{}", parse_error_lines(errors)),
        e => println!("{}", e),
    }
}

/// One tab-indented message per syntax error, without the line number.
fn parse_error_lines(errors: &[FullParseError]) -> String {
    errors
        .iter()
        .map(|e| format!("\t{}\n", e.error))
        .collect()
}
