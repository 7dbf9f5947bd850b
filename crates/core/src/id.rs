//! Identifier types.
//!
//! Holders, coins, and replicas each get their own newtype so one can never
//! be passed where another is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Identity of a coin holder. Maps 1:1 to a requester identity as
/// authenticated by the ordering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HolderId(pub u32);

/// Identity of a coin. Allocated by the ledger, never reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoinId(pub u64);

/// Identity of a replica inside a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReplicaId(pub u32);

impl CoinId {
    /// The first id handed out by an empty ledger.
    pub const ZERO: Self = Self(0);

    /// The id allocated right after this one, or `None` on overflow.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HolderId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl FromStr for CoinId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl FromStr for ReplicaId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_id_next() {
        assert_eq!(CoinId::ZERO.next(), Some(CoinId(1)));
        assert_eq!(CoinId(u64::MAX).next(), None);
        assert_eq!(CoinId::default(), CoinId::ZERO);
    }

    #[test]
    fn test_parse_ids() {
        assert_eq!("7".parse::<HolderId>().unwrap(), HolderId(7));
        assert_eq!(" 42 ".parse::<CoinId>().unwrap(), CoinId(42));
        assert!("-1".parse::<CoinId>().is_err());
        assert!("abc".parse::<HolderId>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(HolderId(1001).to_string(), "1001");
        assert_eq!(CoinId(3).to_string(), "3");
        assert_eq!(ReplicaId(0).to_string(), "0");
    }
}
