//! Client proxy: encodes commands, submits them through the ordering
//! layer, and decodes the replies.

use crate::oracle::{OracleError, OrderingOracle};
use replicoin_core::codec::CodecError;
use replicoin_core::{Amount, CoinId, Command, HolderId, Rejection, Response, SpendOutcome};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Why a proxy call did not produce a result.
///
/// `Rejected` means the replicas executed the command and refused it.
/// Every other variant means the outcome is unknown: the command may or may
/// not have been applied.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("ordering layer failure: {0}")]
    Oracle(#[from] OracleError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("rejected: {0}")]
    Rejected(Rejection),

    #[error("unexpected response: {0:?}")]
    UnexpectedResponse(Response),
}

pub type Result<T> = std::result::Result<T, ProxyError>;

/// A client bound to one holder identity.
pub struct ClientProxy<O> {
    id: HolderId,
    oracle: O,
    timeout: Duration,
}

impl<O: OrderingOracle> ClientProxy<O> {
    pub fn new(id: HolderId, oracle: O, timeout: Duration) -> Self {
        Self { id, oracle, timeout }
    }

    pub fn id(&self) -> HolderId {
        self.id
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Register this holder so it can receive coins. Idempotent.
    pub fn register(&self) -> Result<()> {
        self.coins_fresh().map(|_| ())
    }

    /// This holder's coins, read through the unordered path. Fast, but may
    /// lag behind recent ordered commands.
    pub fn coins(&self) -> Result<BTreeMap<CoinId, Amount>> {
        match self.invoke(Command::Query, false)? {
            Response::Coins(coins) => Ok(coins),
            other => Err(unexpected(other)),
        }
    }

    /// This holder's coins, read through the ordered path. Reflects every
    /// command ordered before it, and registers the holder.
    pub fn coins_fresh(&self) -> Result<BTreeMap<CoinId, Amount>> {
        match self.invoke(Command::Query, true)? {
            Response::Coins(coins) => Ok(coins),
            other => Err(unexpected(other)),
        }
    }

    /// Create a coin of `value` owned by this holder.
    pub fn mint(&self, value: Amount) -> Result<CoinId> {
        match self.invoke(Command::mint(value), true)? {
            Response::Minted(id) => Ok(id),
            other => Err(unexpected(other)),
        }
    }

    /// Spend `inputs`, sending `amount` to `receiver`.
    pub fn spend(&self, inputs: &[CoinId], receiver: HolderId, amount: Amount) -> Result<SpendOutcome> {
        match self.invoke(Command::spend(inputs.to_vec(), receiver, amount), true)? {
            Response::Spent(outcome) => Ok(outcome),
            other => Err(unexpected(other)),
        }
    }

    fn invoke(&self, command: Command, ordered: bool) -> Result<Response> {
        let request = command.to_bytes()?;
        debug!(client = %self.id, kind = %command.kind(), ordered, "submitting command");

        let reply = if ordered {
            self.oracle.invoke_ordered(self.id, &request, self.timeout)?
        } else {
            self.oracle.invoke_unordered(self.id, &request, self.timeout)?
        };
        match Response::from_bytes(&reply)? {
            Response::Rejected(rejection) => Err(ProxyError::Rejected(rejection)),
            response => Ok(response),
        }
    }
}

fn unexpected(response: Response) -> ProxyError {
    ProxyError::UnexpectedResponse(response)
}
