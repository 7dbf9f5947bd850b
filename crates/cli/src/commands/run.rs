//! Run a local cluster with an interactive client.

use crate::repl::Session;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use replicoin_core::HolderId;
use replicoin_replica::{ClusterConfig, LocalCluster};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Args)]
pub struct RunArgs {
    /// Directory holding config.json
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Holder id to act as
    #[arg(short, long, default_value = "0")]
    client_id: u32,
}

pub fn run(args: RunArgs) -> Result<()> {
    let config = ClusterConfig::load_or_default(&args.data_dir)
        .with_context(|| format!("Failed to load config from {:?}", args.data_dir))?;
    let cluster = LocalCluster::start(config.clone()).context("Failed to start cluster")?;

    println!(
        "{}  Started {} replicas (tolerates {} faulty)",
        "✓".green().bold(),
        config.replicas.to_string().bright_cyan(),
        config.fault_tolerance().to_string().bright_cyan()
    );

    let mut session = Session::new(&cluster, HolderId(args.client_id));
    session.register()?;
    println!(
        "{}  Acting as holder {}. Type {} for commands.",
        "✓".green().bold(),
        session.user().to_string().bright_yellow(),
        "HELP".bright_cyan()
    );
    println!();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{} ", format!("replicoin[{}]>", session.user()).bold());
        io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        match session.handle_line(&line?) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => println!("{}  {:#}", "✗".red().bold(), e),
        }
    }

    println!("Bye.");
    Ok(())
}
