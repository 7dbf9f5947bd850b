//! Coin representation.

use crate::amount::Amount;
use crate::id::{CoinId, HolderId};
use serde::{Deserialize, Serialize};

/// An indivisible unit of value. A coin is never partially spent: spending
/// consumes it wholly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub id: CoinId,
    pub value: Amount,
    pub owner: HolderId,
}

impl Coin {
    pub fn new(id: CoinId, value: Amount, owner: HolderId) -> Self {
        Self { id, value, owner }
    }
}
