//! Client-side view of the ordering layer.

use replicoin_core::HolderId;
use std::time::Duration;
use thiserror::Error;

/// Failures of the ordering layer itself, as opposed to a replica refusing
/// a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("timed out waiting for replies ({received} matching, {required} required)")]
    Timeout { received: usize, required: usize },

    #[error("replicas answered without a quorum ({received} matching, {required} required)")]
    NoQuorum { received: usize, required: usize },

    #[error("no replica is available")]
    NoReplicas,

    #[error("ordering layer is shut down")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, OracleError>;

/// Submits command bytes to the replicas on behalf of `sender`.
///
/// Both calls block the caller for at most `timeout`.
pub trait OrderingOracle {
    /// Submit a command for total-order delivery and wait for a certified
    /// reply.
    fn invoke_ordered(&self, sender: HolderId, request: &[u8], timeout: Duration) -> Result<Vec<u8>>;

    /// Submit a read-only command outside the total order and wait for any
    /// reply.
    fn invoke_unordered(&self, sender: HolderId, request: &[u8], timeout: Duration) -> Result<Vec<u8>>;
}

impl<O: OrderingOracle + ?Sized> OrderingOracle for &O {
    fn invoke_ordered(&self, sender: HolderId, request: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        (**self).invoke_ordered(sender, request, timeout)
    }

    fn invoke_unordered(&self, sender: HolderId, request: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        (**self).invoke_unordered(sender, request, timeout)
    }
}

impl<O: OrderingOracle + ?Sized> OrderingOracle for std::sync::Arc<O> {
    fn invoke_ordered(&self, sender: HolderId, request: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        (**self).invoke_ordered(sender, request, timeout)
    }

    fn invoke_unordered(&self, sender: HolderId, request: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        (**self).invoke_unordered(sender, request, timeout)
    }
}
