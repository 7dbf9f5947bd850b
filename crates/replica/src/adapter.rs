//! Replica adapter: the boundary the ordering layer drives.

use replicoin_core::{Command, HolderId, Rejection, Response};
use replicoin_ledger::{snapshot, Interpreter, Ledger, SnapshotError};
use tracing::{debug, error, info, warn};

/// Delivery metadata supplied by the ordering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageContext {
    /// Authenticated sender. This is the only identity a replica trusts.
    pub sender: HolderId,
    /// Position in the total order, for ordered deliveries.
    pub sequence: Option<u64>,
}

impl MessageContext {
    pub fn ordered(sender: HolderId, sequence: u64) -> Self {
        Self {
            sender,
            sequence: Some(sequence),
        }
    }

    pub fn unordered(sender: HolderId) -> Self {
        Self {
            sender,
            sequence: None,
        }
    }
}

/// A deterministic service that an ordering layer can replicate.
///
/// Ordered commands take `&mut self` and are applied one at a time in
/// delivery order. Unordered commands take `&self` and cannot change state.
pub trait ReplicatedService {
    /// Apply a command delivered in total order.
    fn execute_ordered(&mut self, command: &[u8], ctx: &MessageContext) -> Vec<u8>;

    /// Serve a command delivered outside the total order.
    fn execute_unordered(&self, command: &[u8], ctx: &MessageContext) -> Vec<u8>;

    /// Export the complete service state.
    fn snapshot(&self) -> Vec<u8>;

    /// Replace the service state with a snapshot from another replica.
    fn install_snapshot(&mut self, state: &[u8]) -> Result<(), SnapshotError>;
}

/// Runs coin ledger commands on behalf of the ordering layer.
#[derive(Debug, Default)]
pub struct ReplicaAdapter {
    interpreter: Interpreter,
    /// Sequence number of the last ordered command applied.
    last_sequence: Option<u64>,
}

impl ReplicaAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ledger(ledger: Ledger) -> Self {
        Self {
            interpreter: Interpreter::with_ledger(ledger),
            last_sequence: None,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        self.interpreter.ledger()
    }

    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    fn decode(command: &[u8], ctx: &MessageContext) -> Option<Command> {
        match Command::from_bytes(command) {
            Ok(command) => Some(command),
            Err(e) => {
                warn!(sender = %ctx.sender, error = %e, "rejecting malformed command");
                None
            }
        }
    }

    fn encode(response: &Response) -> Vec<u8> {
        // Responses are plain enums of ids and amounts; encoding only fails
        // if the codec itself is broken. Empty bytes signal that to the client.
        response.to_bytes().unwrap_or_else(|e| {
            error!(error = %e, "failed to encode response");
            Vec::new()
        })
    }
}

impl ReplicatedService for ReplicaAdapter {
    fn execute_ordered(&mut self, command: &[u8], ctx: &MessageContext) -> Vec<u8> {
        if let Some(sequence) = ctx.sequence {
            self.last_sequence = Some(sequence);
        }
        let response = match Self::decode(command, ctx) {
            Some(command) => {
                debug!(sender = %ctx.sender, sequence = ?ctx.sequence, kind = %command.kind(), "ordered execution");
                self.interpreter.apply(ctx.sender, command)
            }
            None => Response::Rejected(Rejection::Malformed),
        };
        Self::encode(&response)
    }

    fn execute_unordered(&self, command: &[u8], ctx: &MessageContext) -> Vec<u8> {
        let response = match Self::decode(command, ctx) {
            Some(command) => self.interpreter.apply_read_only(ctx.sender, &command),
            None => Response::Rejected(Rejection::Malformed),
        };
        Self::encode(&response)
    }

    fn snapshot(&self) -> Vec<u8> {
        snapshot::export(self.interpreter.ledger()).unwrap_or_else(|e| {
            error!(error = %e, "failed to export snapshot");
            Vec::new()
        })
    }

    fn install_snapshot(&mut self, state: &[u8]) -> Result<(), SnapshotError> {
        snapshot::import(self.interpreter.ledger_mut(), state)?;
        info!(
            coins = self.ledger().len(),
            holders = self.ledger().holders().len(),
            "installed snapshot"
        );
        Ok(())
    }
}
