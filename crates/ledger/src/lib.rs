//! Deterministic coin ledger state machine for replicoin.
//!
//! This crate holds everything a replica executes locally:
//! - The coin ledger (values, ownership, id allocation)
//! - The command interpreter (query, mint, spend)
//! - Snapshot export/import for state transfer
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Replica Adapter                       │
//! │          (decodes bytes, picks ordered/unordered)        │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//! ┌────────────────────────▼────────────────────────────────┐
//! │                   Ledger Layer                           │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────┐  │
//! │  │ Interpreter │  │  Snapshot   │  │ Ledger          │  │
//! │  │  - Query    │  │  - export   │  │  - coins        │  │
//! │  │  - Mint     │  │  - import   │  │  - owners       │  │
//! │  │  - Spend    │  │  - digest   │  │  - next id      │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use replicoin_core::{CoinId, HolderId, SpendOutcome};
//! use replicoin_ledger::{snapshot, Interpreter};
//!
//! let mut interpreter = Interpreter::new();
//! let alice = HolderId(1);
//! let bob = HolderId(2);
//!
//! let coin = interpreter.mint(alice, "10").unwrap();
//! interpreter.query(bob);
//!
//! let outcome = interpreter.spend(alice, &[coin], bob, "4").unwrap();
//! assert_eq!(
//!     outcome,
//!     SpendOutcome::WithChange { change: CoinId(1), transferred: CoinId(2) }
//! );
//!
//! let bytes = snapshot::export(interpreter.ledger()).unwrap();
//! assert!(!bytes.is_empty());
//! ```

pub mod interpreter;
pub mod ledger;
pub mod snapshot;

// Re-export commonly used types
pub use interpreter::Interpreter;
pub use ledger::{InvariantViolation, Ledger, MAX_MARK};
pub use snapshot::{Snapshot, SnapshotError, SNAPSHOT_VERSION};
