//! Snapshot export and import for bulk state transfer.
//!
//! A snapshot is the whole ledger: coin values, holder sets, and the
//! allocation mark. Ordered maps make the encoding canonical, so two ledgers
//! that hold the same state always produce the same bytes (and digest).

use crate::ledger::{InvariantViolation, Ledger};
use replicoin_core::codec::{self, CodecError};
use replicoin_core::{digest, Amount, CoinId, Digest, HolderId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u16 = 1;

/// Errors that can occur while exporting or installing a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u16, expected: u16 },

    #[error("snapshot violates ledger invariant: {0}")]
    Invariant(#[from] InvariantViolation),
}

pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Decoded snapshot contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u16,
    pub next_id: CoinId,
    pub coins: BTreeMap<CoinId, Amount>,
    pub owners: BTreeMap<HolderId, BTreeSet<CoinId>>,
}

impl Snapshot {
    /// Capture the current state of a ledger.
    pub fn capture(ledger: &Ledger) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            next_id: ledger.next_id(),
            coins: ledger.coins().clone(),
            owners: ledger.holders().clone(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(codec::encode(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let snapshot: Self = codec::decode(bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        Ok(snapshot)
    }

    /// Turn the snapshot into a ledger, checking every invariant first.
    pub fn into_ledger(self) -> Result<Ledger> {
        let ledger = Ledger::from_parts(self.coins, self.owners, self.next_id);
        ledger.check_invariants()?;
        Ok(ledger)
    }
}

/// Serialize the full ledger.
pub fn export(ledger: &Ledger) -> Result<Vec<u8>> {
    Snapshot::capture(ledger).to_bytes()
}

/// Replace `ledger` wholesale with the state encoded in `bytes`.
///
/// The snapshot is decoded and validated before anything is replaced; on
/// error the ledger is left exactly as it was.
pub fn import(ledger: &mut Ledger, bytes: &[u8]) -> Result<()> {
    let restored = Snapshot::from_bytes(bytes)?.into_ledger()?;
    *ledger = restored;
    Ok(())
}

/// Fingerprint of an encoded snapshot.
pub fn fingerprint(bytes: &[u8]) -> Digest {
    digest(bytes)
}
