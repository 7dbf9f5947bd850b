//! Replica responses and the rejection taxonomy.

use crate::amount::Amount;
use crate::codec::{self, Result};
use crate::id::{CoinId, HolderId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Why a replica refused a command. Every rejection is detected before the
/// ledger is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Rejection {
    #[error("malformed command")]
    Malformed,

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("sender is not a known holder")]
    UnknownSender,

    #[error("no input coins given")]
    EmptyInputs,

    #[error("coin {0} listed more than once")]
    DuplicateInput(CoinId),

    #[error("coin {0} does not exist")]
    UnknownCoin(CoinId),

    #[error("coin {0} is not owned by the sender")]
    NotOwned(CoinId),

    #[error("receiver {0} is not a known holder")]
    UnknownReceiver(HolderId),

    #[error("sender and receiver are the same holder")]
    SelfTransfer,

    #[error("insufficient funds (available {available}, requested {requested})")]
    InsufficientFunds { available: Amount, requested: Amount },

    #[error("command must be submitted through the ordered path")]
    OrderedOnly,

    #[error("no coin ids left to allocate")]
    IdsExhausted,
}

/// Coins produced by a successful spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpendOutcome {
    /// Inputs summed exactly to the amount; no change coin.
    Exact { transferred: CoinId },
    /// The remainder went back to the sender as `change`.
    WithChange { change: CoinId, transferred: CoinId },
}

impl SpendOutcome {
    /// The coin now owned by the receiver.
    pub fn transferred(&self) -> CoinId {
        match self {
            Self::Exact { transferred } | Self::WithChange { transferred, .. } => *transferred,
        }
    }

    /// The change coin returned to the sender, if any.
    pub fn change(&self) -> Option<CoinId> {
        match self {
            Self::Exact { .. } => None,
            Self::WithChange { change, .. } => Some(*change),
        }
    }
}

/// A replica's answer to a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Coins(BTreeMap<CoinId, Amount>),
    Minted(CoinId),
    Spent(SpendOutcome),
    Rejected(Rejection),
}

impl Response {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        codec::encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        codec::decode(bytes)
    }
}

impl<T> From<std::result::Result<T, Rejection>> for Response
where
    T: Into<Response>,
{
    fn from(result: std::result::Result<T, Rejection>) -> Self {
        match result {
            Ok(value) => value.into(),
            Err(rejection) => Self::Rejected(rejection),
        }
    }
}

impl From<BTreeMap<CoinId, Amount>> for Response {
    fn from(coins: BTreeMap<CoinId, Amount>) -> Self {
        Self::Coins(coins)
    }
}

impl From<CoinId> for Response {
    fn from(id: CoinId) -> Self {
        Self::Minted(id)
    }
}

impl From<SpendOutcome> for Response {
    fn from(outcome: SpendOutcome) -> Self {
        Self::Spent(outcome)
    }
}
