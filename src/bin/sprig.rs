use std::{path::PathBuf, process::ExitCode, sync::Arc};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sprig::{Interpreter, InterpreterConfig, Repl, ResolutionOrder, SprigError, StdConsole};

#[derive(Parser)]
#[command(author, version, about = "Sprig scripting language interpreter")]
struct Args {
    /// Log filter directives, e.g. `sprig=debug`; defaults to RUST_LOG or `warn`
    #[arg(long, global = true)]
    log: Option<String>,

    /// Resolve every enclosing frame's locals before any bound object's members
    #[arg(long, global = true)]
    chain_first: bool,

    /// Maximum nesting of scripted method calls
    #[arg(long, global = true, default_value_t = 200)]
    max_depth: usize,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a script file
    Run { script: PathBuf },
    /// Start an interactive session
    Repl,
    /// Evaluate a snippet and print its value
    Eval { source: String },
}

fn install_tracing(directives: Option<&str>) {
    let filter = match directives {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    install_tracing(args.log.as_deref());

    let order = if args.chain_first {
        ResolutionOrder::ChainThenBound
    } else {
        ResolutionOrder::LocalThenBound
    };
    let config = InterpreterConfig::default()
        .resolution_order(order)
        .max_call_depth(args.max_depth);

    let outcome = match args.command.unwrap_or(Command::Repl) {
        Command::Run { script } => run_script(config, script),
        Command::Repl => Repl::with_config(config).run(),
        Command::Eval { source } => eval_snippet(config, &source),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: {err}", err.classify());
            ExitCode::FAILURE
        }
    }
}

fn run_script(config: InterpreterConfig, path: PathBuf) -> Result<(), SprigError> {
    let mut interpreter = Interpreter::with_config(config, Arc::new(StdConsole));
    interpreter.source(&path)?;
    Ok(())
}

fn eval_snippet(config: InterpreterConfig, source: &str) -> Result<(), SprigError> {
    let mut interpreter = Interpreter::with_config(config, Arc::new(StdConsole));
    let value = interpreter.eval(source)?;
    if !value.is_void() {
        println!("{value}");
    }
    Ok(())
}
