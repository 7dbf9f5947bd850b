//! Client commands as they travel through the ordering layer.

use crate::amount::Amount;
use crate::codec::{self, Result};
use crate::id::{CoinId, HolderId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A client command.
///
/// The requester is deliberately absent: the replica takes it from the
/// delivery metadata supplied by the ordering layer, never from the payload.
/// Amounts travel as decimal text and are validated by the replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// List the requester's coins and their values.
    Query,
    /// Create a new coin owned by the requester.
    Mint { value: String },
    /// Consume `inputs` and transfer `amount` to `receiver`, returning any
    /// remainder to the requester as a change coin.
    Spend {
        inputs: Vec<CoinId>,
        receiver: HolderId,
        amount: String,
    },
}

/// Discriminant of a command, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Query,
    Mint,
    Spend,
}

impl Command {
    pub fn mint(value: Amount) -> Self {
        Self::Mint {
            value: value.to_string(),
        }
    }

    pub fn spend(inputs: Vec<CoinId>, receiver: HolderId, amount: Amount) -> Self {
        Self::Spend {
            inputs,
            receiver,
            amount: amount.to_string(),
        }
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Query => CommandKind::Query,
            Self::Mint { .. } => CommandKind::Mint,
            Self::Spend { .. } => CommandKind::Spend,
        }
    }

    /// Whether this command changes ledger state and so must be ordered.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::Query)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        codec::encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        codec::decode(bytes)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "QUERY"),
            Self::Mint => write!(f, "MINT"),
            Self::Spend => write!(f, "SPEND"),
        }
    }
}
