//! CLI commands module.

use anyhow::Result;
use clap::Subcommand;

mod init;
mod run;

#[derive(Subcommand)]
pub enum Commands {
    /// Write a cluster configuration
    Init(init::InitArgs),
    /// Start a local cluster and an interactive client
    Run(run::RunArgs),
}

pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init(args) => init::run(args),
        Commands::Run(args) => run::run(args),
    }
}
