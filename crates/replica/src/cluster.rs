//! In-process ordering layer.
//!
//! `LocalCluster` stands in for a BFT ordering service. It is not a
//! consensus protocol; it reproduces the guarantees replicas rely on:
//!
//! - every replica runs on its own thread and drains a FIFO inbox, so it
//!   applies ordered commands strictly one at a time;
//! - a single sequencer pushes each ordered command into every inbox while
//!   holding a lock, so all replicas see the same total order;
//! - an ordered call returns once `f + 1` replicas sent identical replies;
//! - crashed replicas drop requests and catch up through snapshot transfer.

use crate::adapter::{MessageContext, ReplicaAdapter, ReplicatedService};
use crate::config::{ClusterConfig, ConfigError};
use crate::oracle::{OracleError, OrderingOracle};
use replicoin_core::{Digest, HolderId, ReplicaId};
use replicoin_ledger::{snapshot, SnapshotError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Errors from cluster management operations.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to spawn replica thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("unknown replica: {0}")]
    UnknownReplica(ReplicaId),

    #[error("no online replica can serve as snapshot donor")]
    NoDonor,

    #[error("snapshot install failed: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("replica {0} did not answer in time")]
    Unresponsive(ReplicaId),

    #[error("cluster is shut down")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, ClusterError>;

/// A reply from one replica.
struct Reply {
    replica: ReplicaId,
    bytes: Vec<u8>,
}

/// Messages a replica worker consumes, in inbox order.
enum Request {
    Ordered {
        sequence: u64,
        sender: HolderId,
        command: Vec<u8>,
        reply: Sender<Reply>,
    },
    Unordered {
        sender: HolderId,
        command: Vec<u8>,
        reply: Sender<Reply>,
    },
    Snapshot {
        reply: Sender<Vec<u8>>,
    },
    Install {
        state: Vec<u8>,
        reply: Sender<std::result::Result<(), SnapshotError>>,
    },
    Shutdown,
}

struct ReplicaHandle {
    id: ReplicaId,
    inbox: Sender<Request>,
    online: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ReplicaHandle {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// A set of replicas behind an in-process ordering layer.
pub struct LocalCluster {
    config: ClusterConfig,
    replicas: Vec<ReplicaHandle>,
    /// Next sequence number. Held while commands are pushed to inboxes.
    sequencer: Mutex<u64>,
}

impl LocalCluster {
    /// Start a cluster of coin ledger replicas.
    pub fn start(config: ClusterConfig) -> Result<Self> {
        Self::spawn(config, |_| ReplicaAdapter::new())
    }

    /// Start a cluster running one service per replica, built by `make`.
    pub fn spawn<S, F>(config: ClusterConfig, mut make: F) -> Result<Self>
    where
        S: ReplicatedService + Send + 'static,
        F: FnMut(ReplicaId) -> S,
    {
        config.validate()?;

        let mut replicas = Vec::with_capacity(config.replicas);
        for index in 0..config.replicas {
            let id = ReplicaId(index as u32);
            let (inbox, requests) = mpsc::channel();
            let online = Arc::new(AtomicBool::new(true));
            let service = make(id);
            let worker_online = Arc::clone(&online);
            let worker = thread::Builder::new()
                .name(format!("replica-{id}"))
                .spawn(move || run_replica(id, service, requests, worker_online))?;

            replicas.push(ReplicaHandle {
                id,
                inbox,
                online,
                worker: Some(worker),
            });
        }

        info!(
            replicas = config.replicas,
            fault_tolerance = config.fault_tolerance(),
            "started local cluster"
        );

        Ok(Self {
            config,
            replicas,
            sequencer: Mutex::new(0),
        })
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Ids of all replicas.
    pub fn replica_ids(&self) -> Vec<ReplicaId> {
        self.replicas.iter().map(|r| r.id).collect()
    }

    /// Ids of replicas currently serving requests.
    pub fn online_replicas(&self) -> Vec<ReplicaId> {
        self.replicas
            .iter()
            .filter(|r| r.is_online())
            .map(|r| r.id)
            .collect()
    }

    pub fn is_online(&self, id: ReplicaId) -> Result<bool> {
        Ok(self.handle(id)?.is_online())
    }

    /// Take a replica offline. It silently drops requests until recovered,
    /// so it falls behind the ordered stream.
    pub fn crash(&self, id: ReplicaId) -> Result<()> {
        self.handle(id)?.online.store(false, Ordering::SeqCst);
        warn!(replica = %id, "replica crashed");
        Ok(())
    }

    /// Bring a replica back by installing a snapshot from an online donor.
    ///
    /// The sequencer is held throughout, so the snapshot covers exactly the
    /// ordered commands delivered before recovery and no ordered command can
    /// slip in between export and install.
    pub fn recover(&self, id: ReplicaId) -> Result<Digest> {
        let target = self.handle(id)?;
        let _order = self.lock_sequencer()?;

        let donor = self
            .replicas
            .iter()
            .find(|r| r.id != id && r.is_online())
            .ok_or(ClusterError::NoDonor)?;
        let state = self.fetch_snapshot(donor)?;

        // Install while still offline so ordered requests queued ahead of the
        // snapshot are dropped.
        let (reply, installed) = mpsc::channel();
        target
            .inbox
            .send(Request::Install {
                state: state.clone(),
                reply,
            })
            .map_err(|_| ClusterError::Disconnected)?;
        installed
            .recv_timeout(self.config.request_timeout())
            .map_err(|_| ClusterError::Unresponsive(id))??;
        target.online.store(true, Ordering::SeqCst);

        let digest = snapshot::fingerprint(&state);
        info!(replica = %id, donor = %donor.id, digest = %digest.short(), "replica recovered");
        Ok(digest)
    }

    /// Snapshot of the first online replica, taken at a consistent point of
    /// the ordered stream.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        let _order = self.lock_sequencer()?;
        let donor = self
            .replicas
            .iter()
            .find(|r| r.is_online())
            .ok_or(ClusterError::NoDonor)?;
        self.fetch_snapshot(donor)
    }

    /// Snapshot digest of every online replica, taken at the same point of
    /// the ordered stream. Correct replicas report identical digests.
    pub fn digests(&self) -> Result<Vec<(ReplicaId, Digest)>> {
        let _order = self.lock_sequencer()?;
        self.replicas
            .iter()
            .filter(|r| r.is_online())
            .map(|r| Ok((r.id, snapshot::fingerprint(&self.fetch_snapshot(r)?))))
            .collect()
    }

    /// Stop every worker and wait for it to exit.
    pub fn shutdown(&mut self) {
        for replica in &self.replicas {
            let _ = replica.inbox.send(Request::Shutdown);
        }
        for replica in &mut self.replicas {
            if let Some(worker) = replica.worker.take() {
                if worker.join().is_err() {
                    warn!(replica = %replica.id, "replica thread panicked");
                }
            }
        }
    }

    fn handle(&self, id: ReplicaId) -> Result<&ReplicaHandle> {
        self.replicas
            .iter()
            .find(|r| r.id == id)
            .ok_or(ClusterError::UnknownReplica(id))
    }

    fn lock_sequencer(&self) -> Result<MutexGuard<'_, u64>> {
        self.sequencer.lock().map_err(|_| ClusterError::Disconnected)
    }

    fn fetch_snapshot(&self, replica: &ReplicaHandle) -> Result<Vec<u8>> {
        let (reply, state) = mpsc::channel();
        replica
            .inbox
            .send(Request::Snapshot { reply })
            .map_err(|_| ClusterError::Disconnected)?;
        state
            .recv_timeout(self.config.request_timeout())
            .map_err(|_| ClusterError::Unresponsive(replica.id))
    }
}

impl OrderingOracle for LocalCluster {
    fn invoke_ordered(
        &self,
        sender: HolderId,
        request: &[u8],
        timeout: Duration,
    ) -> crate::oracle::Result<Vec<u8>> {
        let (reply, replies) = mpsc::channel();
        {
            let mut next = self.sequencer.lock().map_err(|_| OracleError::Disconnected)?;
            let sequence = *next;
            *next += 1;
            debug!(%sender, sequence, "ordering command");
            for replica in &self.replicas {
                let _ = replica.inbox.send(Request::Ordered {
                    sequence,
                    sender,
                    command: request.to_vec(),
                    reply: reply.clone(),
                });
            }
        }
        drop(reply);
        await_matching(replies, self.config.reply_quorum(), timeout)
    }

    fn invoke_unordered(
        &self,
        sender: HolderId,
        request: &[u8],
        timeout: Duration,
    ) -> crate::oracle::Result<Vec<u8>> {
        let (reply, replies) = mpsc::channel();
        let mut sent = 0;
        for replica in self.replicas.iter().filter(|r| r.is_online()) {
            let request = Request::Unordered {
                sender,
                command: request.to_vec(),
                reply: reply.clone(),
            };
            if replica.inbox.send(request).is_ok() {
                sent += 1;
            }
        }
        if sent == 0 {
            return Err(OracleError::NoReplicas);
        }
        drop(reply);
        await_matching(replies, 1, timeout)
    }
}

impl Drop for LocalCluster {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Wait until `required` replicas sent byte-identical replies.
fn await_matching(
    replies: Receiver<Reply>,
    required: usize,
    timeout: Duration,
) -> crate::oracle::Result<Vec<u8>> {
    let deadline = Instant::now() + timeout;
    let mut tally: HashMap<Vec<u8>, usize> = HashMap::new();
    let mut best = 0;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match replies.recv_timeout(remaining) {
            Ok(Reply { replica, bytes }) => {
                let count = tally.entry(bytes.clone()).or_insert(0);
                *count += 1;
                best = best.max(*count);
                debug!(%replica, matching = *count, required, "reply received");
                if *count >= required {
                    return Ok(bytes);
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(received = best, required, "request timed out");
                return Err(OracleError::Timeout {
                    received: best,
                    required,
                });
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!(received = best, required, "replies exhausted without quorum");
                return Err(OracleError::NoQuorum {
                    received: best,
                    required,
                });
            }
        }
    }
}

/// Replica worker loop.
fn run_replica<S: ReplicatedService>(
    id: ReplicaId,
    mut service: S,
    requests: Receiver<Request>,
    online: Arc<AtomicBool>,
) {
    for request in requests {
        match request {
            Request::Shutdown => break,
            Request::Snapshot { reply } => {
                let _ = reply.send(service.snapshot());
            }
            Request::Install { state, reply } => {
                let _ = reply.send(service.install_snapshot(&state));
            }
            Request::Ordered { sequence, .. } if !online.load(Ordering::SeqCst) => {
                debug!(replica = %id, sequence, "offline, dropping ordered command");
            }
            Request::Unordered { .. } if !online.load(Ordering::SeqCst) => {
                debug!(replica = %id, "offline, dropping unordered command");
            }
            Request::Ordered {
                sequence,
                sender,
                command,
                reply,
            } => {
                let bytes = service.execute_ordered(&command, &MessageContext::ordered(sender, sequence));
                let _ = reply.send(Reply { replica: id, bytes });
            }
            Request::Unordered {
                sender,
                command,
                reply,
            } => {
                let bytes = service.execute_unordered(&command, &MessageContext::unordered(sender));
                let _ = reply.send(Reply { replica: id, bytes });
            }
        }
    }
    debug!(replica = %id, "replica stopped");
}
