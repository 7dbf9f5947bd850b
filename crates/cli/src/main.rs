//! replicoin CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod repl;

#[derive(Parser)]
#[command(name = "replicoin")]
#[command(about = "A replicated coin ledger", long_about = None)]
struct Cli {
    /// Log replica activity at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<commands::Commands>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(cmd) => {
            if let Err(e) = commands::run(cmd) {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("replicoin - A replicated coin ledger");
            println!("Run 'replicoin --help' for usage information.");
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
