//! Core primitives for replicoin.
//!
//! This crate provides the types shared by replicas and clients:
//! - Holder, coin, and replica identifiers
//! - Fixed-point coin amounts
//! - Command and response wire records (bincode)
//! - The rejection taxonomy
//! - Blake3 digests for snapshot fingerprints

pub mod amount;
pub mod codec;
pub mod coin;
pub mod command;
pub mod hash;
pub mod id;
pub mod response;

// Re-export commonly used types at the crate root
pub use amount::{Amount, AmountError};
pub use codec::CodecError;
pub use coin::Coin;
pub use command::{Command, CommandKind};
pub use hash::{digest, Digest};
pub use id::{CoinId, HolderId, ReplicaId};
pub use response::{Rejection, Response, SpendOutcome};
