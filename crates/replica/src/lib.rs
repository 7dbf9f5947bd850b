//! Replication boundary for replicoin.
//!
//! This crate connects the ledger state machine to an ordering layer:
//! - **Adapter**: decodes delivered command bytes and runs them on the
//!   interpreter, ordered or unordered; serves snapshot transfer
//! - **Oracle**: the client-side contract of the ordering layer
//! - **Cluster**: an in-process ordering layer with replica threads,
//!   reply quorums, crash injection, and snapshot catch-up
//! - **Proxy**: the typed client API
//! - **Config**: cluster settings stored as JSON
//!
//! # Example
//!
//! ```rust,no_run
//! use replicoin_core::HolderId;
//! use replicoin_replica::{ClientProxy, ClusterConfig, LocalCluster};
//!
//! let config = ClusterConfig::default();
//! let cluster = LocalCluster::start(config.clone()).unwrap();
//!
//! let alice = ClientProxy::new(HolderId(1), &cluster, config.request_timeout());
//! let bob = ClientProxy::new(HolderId(2), &cluster, config.request_timeout());
//! bob.register().unwrap();
//!
//! let coin = alice.mint("10".parse().unwrap()).unwrap();
//! let outcome = alice.spend(&[coin], bob.id(), "4".parse().unwrap()).unwrap();
//! println!("bob received coin {}", outcome.transferred());
//! ```

pub mod adapter;
pub mod cluster;
pub mod config;
pub mod oracle;
pub mod proxy;

// Re-export commonly used types
pub use adapter::{MessageContext, ReplicaAdapter, ReplicatedService};
pub use cluster::{ClusterError, LocalCluster};
pub use config::{ClusterConfig, ConfigError};
pub use oracle::{OracleError, OrderingOracle};
pub use proxy::{ClientProxy, ProxyError};
