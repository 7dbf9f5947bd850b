//! Interactive client prompt.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use replicoin_core::{Amount, CoinId, HolderId, ReplicaId};
use replicoin_ledger::{snapshot, Ledger, Snapshot};
use replicoin_replica::{ClientProxy, LocalCluster};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::PathBuf;

const HELP: &[(&str, &str)] = &[
    ("COINS", "list your coins (fast, may lag)"),
    ("FRESH", "list your coins through the total order"),
    ("MINT <value>", "create a coin you own"),
    ("SPEND <receiver> <amount> <id,id,...>", "pay a holder from your coins"),
    ("USER <id>", "act as another holder"),
    ("LEDGER", "list every coin with its owner"),
    ("STATUS", "show replica state digests"),
    ("CRASH <replica>", "take a replica offline"),
    ("RECOVER <replica>", "bring a replica back from a snapshot"),
    ("SAVE <file>", "write a ledger snapshot to a file"),
    ("HELP", "show this list"),
    ("QUIT", "exit"),
];

/// A parsed prompt line.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplCommand {
    Coins,
    Fresh,
    Mint(Amount),
    Spend {
        receiver: HolderId,
        amount: Amount,
        inputs: Vec<CoinId>,
    },
    User(HolderId),
    Ledger,
    Status,
    Crash(ReplicaId),
    Recover(ReplicaId),
    Save(PathBuf),
    Help,
    Quit,
}

impl ReplCommand {
    /// Parse one line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(keyword) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match keyword.to_ascii_uppercase().as_str() {
            "COINS" => {
                expect_args(&args, 0, "COINS")?;
                Self::Coins
            }
            "FRESH" => {
                expect_args(&args, 0, "FRESH")?;
                Self::Fresh
            }
            "MINT" => {
                expect_args(&args, 1, "MINT <value>")?;
                Self::Mint(args[0].parse().context("invalid value")?)
            }
            "SPEND" => {
                if args.len() < 3 {
                    bail!("usage: SPEND <receiver> <amount> <id,id,...>");
                }
                let receiver = args[0].parse().context("invalid receiver")?;
                let amount = args[1].parse().context("invalid amount")?;
                let inputs = args[2..]
                    .join(",")
                    .split(',')
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| s.parse().with_context(|| format!("invalid coin id: {s}")))
                    .collect::<Result<Vec<CoinId>>>()?;
                Self::Spend {
                    receiver,
                    amount,
                    inputs,
                }
            }
            "USER" => {
                expect_args(&args, 1, "USER <id>")?;
                Self::User(args[0].parse().context("invalid holder id")?)
            }
            "LEDGER" => {
                expect_args(&args, 0, "LEDGER")?;
                Self::Ledger
            }
            "STATUS" => Self::Status,
            "CRASH" => {
                expect_args(&args, 1, "CRASH <replica>")?;
                Self::Crash(args[0].parse().context("invalid replica id")?)
            }
            "RECOVER" => {
                expect_args(&args, 1, "RECOVER <replica>")?;
                Self::Recover(args[0].parse().context("invalid replica id")?)
            }
            "SAVE" => {
                expect_args(&args, 1, "SAVE <file>")?;
                Self::Save(PathBuf::from(args[0]))
            }
            "HELP" | "?" => Self::Help,
            "QUIT" | "EXIT" => Self::Quit,
            other => bail!("unknown command: {other} (try HELP)"),
        };
        Ok(Some(command))
    }
}

fn expect_args(args: &[&str], count: usize, usage: &str) -> Result<()> {
    if args.len() != count {
        bail!("usage: {usage}");
    }
    Ok(())
}

/// A client session against a local cluster.
pub struct Session<'a> {
    cluster: &'a LocalCluster,
    client: ClientProxy<&'a LocalCluster>,
}

impl<'a> Session<'a> {
    pub fn new(cluster: &'a LocalCluster, user: HolderId) -> Self {
        Self {
            cluster,
            client: Self::client_for(cluster, user),
        }
    }

    fn client_for(cluster: &'a LocalCluster, user: HolderId) -> ClientProxy<&'a LocalCluster> {
        ClientProxy::new(user, cluster, cluster.config().request_timeout())
    }

    pub fn user(&self) -> HolderId {
        self.client.id()
    }

    /// Register the current holder so others can pay it.
    pub fn register(&self) -> Result<()> {
        self.client
            .register()
            .with_context(|| format!("failed to register holder {}", self.user()))
    }

    /// Parse and run one line. Returns `false` when the session should end.
    pub fn handle_line(&mut self, line: &str) -> Result<bool> {
        match ReplCommand::parse(line)? {
            Some(command) => self.execute(command),
            None => Ok(true),
        }
    }

    pub fn execute(&mut self, command: ReplCommand) -> Result<bool> {
        match command {
            ReplCommand::Coins => print_coins(&self.client.coins()?),
            ReplCommand::Fresh => print_coins(&self.client.coins_fresh()?),
            ReplCommand::Mint(value) => {
                let id = self.client.mint(value)?;
                println!(
                    "{}  Minted coin {} worth {}",
                    "✓".green().bold(),
                    id.to_string().bright_yellow(),
                    value.to_string().bright_cyan()
                );
            }
            ReplCommand::Spend {
                receiver,
                amount,
                inputs,
            } => {
                let outcome = self.client.spend(&inputs, receiver, amount)?;
                println!(
                    "{}  Sent {} to holder {} as coin {}",
                    "✓".green().bold(),
                    amount.to_string().bright_cyan(),
                    receiver.to_string().bright_yellow(),
                    outcome.transferred().to_string().bright_yellow()
                );
                if let Some(change) = outcome.change() {
                    println!("    Change: coin {}", change.to_string().bright_yellow());
                }
            }
            ReplCommand::User(id) => {
                self.client = Self::client_for(self.cluster, id);
                self.register()?;
                println!("{}  Now acting as holder {}", "✓".green().bold(), id.to_string().bright_yellow());
            }
            ReplCommand::Ledger => print_ledger(&self.ledger()?),
            ReplCommand::Status => self.print_status()?,
            ReplCommand::Crash(id) => {
                self.cluster.crash(id)?;
                println!("{}  Replica {} is offline", "✓".green().bold(), id.to_string().bright_yellow());
            }
            ReplCommand::Recover(id) => {
                let digest = self.cluster.recover(id)?;
                println!(
                    "{}  Replica {} recovered at state {}",
                    "✓".green().bold(),
                    id.to_string().bright_yellow(),
                    digest.short().bright_black()
                );
            }
            ReplCommand::Save(path) => {
                let state = self.cluster.snapshot()?;
                fs::write(&path, &state).with_context(|| format!("failed to write {}", path.display()))?;
                println!(
                    "{}  Saved {} bytes to {} (digest {})",
                    "✓".green().bold(),
                    state.len(),
                    path.display().to_string().bright_black(),
                    snapshot::fingerprint(&state).short().bright_black()
                );
            }
            ReplCommand::Help => print_help(),
            ReplCommand::Quit => return Ok(false),
        }
        Ok(true)
    }

    /// Full ledger as held by the first online replica.
    fn ledger(&self) -> Result<Ledger> {
        let state = self.cluster.snapshot()?;
        Snapshot::from_bytes(&state)?
            .into_ledger()
            .context("replica exported an inconsistent ledger")
    }

    fn print_status(&self) -> Result<()> {
        let digests: BTreeMap<_, _> = self.cluster.digests()?.into_iter().collect();
        let distinct = digests.values().collect::<HashSet<_>>().len();

        println!("{}", "Replicas:".bold());
        for id in self.cluster.replica_ids() {
            match digests.get(&id) {
                Some(digest) => println!(
                    "  {}  {}  {}",
                    id.to_string().bright_yellow(),
                    "online ".green(),
                    digest.short().bright_black()
                ),
                None => println!("  {}  {}", id.to_string().bright_yellow(), "offline".red()),
            }
        }
        match distinct {
            0 => println!("{}", "No replica online".red().bold()),
            1 => println!("{}", "Online replicas agree".green()),
            _ => println!("{}", "Online replicas diverge".red().bold()),
        }
        Ok(())
    }
}

fn print_coins(coins: &BTreeMap<CoinId, Amount>) {
    if coins.is_empty() {
        println!("No coins.");
        return;
    }
    for (id, value) in coins {
        println!("  coin {:>6}  {}", id.to_string().bright_yellow(), value.to_string().bright_cyan());
    }
    match Amount::checked_sum(coins.values().copied()) {
        Some(total) => println!("  {:>11}  {}", "total".bold(), total.to_string().bright_cyan().bold()),
        None => println!("  {:>11}  {}", "total".bold(), "overflow".red()),
    }
}

fn print_ledger(ledger: &Ledger) {
    if ledger.is_empty() {
        println!("Ledger is empty ({} holder(s) registered).", ledger.holders().len());
        return;
    }
    println!("{}", "Coins:".bold());
    for coin in ledger.coins().keys().filter_map(|id| ledger.coin(*id)) {
        println!(
            "  coin {:>6}  holder {:>6}  {}",
            coin.id.to_string().bright_yellow(),
            coin.owner.to_string().bright_yellow(),
            coin.value.to_string().bright_cyan()
        );
    }
    if let Some(total) = ledger.total_supply() {
        println!("  {:>27}  {}", "supply".bold(), total.to_string().bright_cyan().bold());
    }
}

fn print_help() {
    println!("{}", "Commands:".bold());
    for (usage, what) in HELP {
        println!("  {:<40} {}", usage.bright_cyan(), what);
    }
}
