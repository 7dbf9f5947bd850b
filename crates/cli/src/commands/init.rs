//! Initialize cluster command.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use replicoin_replica::ClusterConfig;
use std::path::PathBuf;

#[derive(Args)]
pub struct InitArgs {
    /// Directory to store cluster data
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Number of replicas to run
    #[arg(short, long, default_value = "4")]
    replicas: usize,

    /// How long a client waits for replies, in milliseconds
    #[arg(short, long, default_value = "2000")]
    timeout_ms: u64,
}

pub fn run(args: InitArgs) -> Result<()> {
    println!("{}", "Initializing replicoin...".bold().cyan());
    println!();

    let config = ClusterConfig::new(args.replicas, args.timeout_ms);
    config.validate()?;
    if config.replicas < 4 {
        println!(
            "{}  {} replica(s) cannot tolerate any faulty replica",
            "!".yellow().bold(),
            config.replicas
        );
    }

    let config_file = config
        .save(&args.data_dir)
        .with_context(|| format!("Failed to write config to {:?}", args.data_dir))?;

    if ClusterConfig::load(&args.data_dir)? != config {
        bail!("config at {} did not read back intact", config_file.display());
    }

    println!("{}  Created data directory", "✓".green().bold());
    println!("    Replicas:        {}", config.replicas.to_string().bright_cyan());
    println!(
        "    Fault tolerance: {}",
        config.fault_tolerance().to_string().bright_cyan()
    );
    println!(
        "    Reply quorum:    {}",
        config.reply_quorum().to_string().bright_cyan()
    );
    println!(
        "    Timeout:         {}",
        format!("{} ms", config.request_timeout_ms).bright_cyan()
    );
    println!(
        "{}  Saved config to: {}",
        "✓".green().bold(),
        config_file.display().to_string().bright_black()
    );

    println!();
    println!("{}", "Cluster initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!(
        "  • Use {} to start the cluster and a client prompt",
        "replicoin run".bright_cyan()
    );

    Ok(())
}
