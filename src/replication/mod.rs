//! Leader/follower replication
//!
//! The role is chosen once from configuration. A leader keeps the set of
//! attached followers and forwards every applied write to them byte for byte;
//! there is no acknowledgment and no offset tracking. A follower that cannot
//! keep up within the write deadline is dropped.
//! A follower performs the handshake in [`Handshake`] and then applies the
//! leader's stream like any other commands, without replying.

mod error;
mod followers;
mod handshake;
mod snapshot;

pub use error::ReplicationError;
pub use followers::{shared_writer, FollowerHandle, FollowerSet, SharedWriter};
pub use handshake::{FullResync, Handshake, Synced};
pub use snapshot::{full_resync, EMPTY_SNAPSHOT};

use crate::config::{Config, LeaderAddr};
use crate::protocol::RespValue;
use bytes::Bytes;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Replication role, fixed for the process lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Leader,
    Follower(LeaderAddr),
}

/// Replication state shared by every connection
pub struct ReplicationManager {
    role: Role,
    replication_id: String,
    offset: u64,
    followers: FollowerSet,
    propagation_timeout: Duration,
}

impl ReplicationManager {
    pub fn new(config: &Config) -> Self {
        let role = match &config.replica_of {
            Some(leader) => Role::Follower(leader.clone()),
            None => Role::Leader,
        };

        ReplicationManager {
            role,
            replication_id: config.replication_id.clone(),
            offset: config.replication_offset,
            followers: FollowerSet::new(),
            propagation_timeout: config.propagation_timeout,
        }
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn is_leader(&self) -> bool {
        self.role == Role::Leader
    }

    pub fn replication_id(&self) -> &str {
        &self.replication_id
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Start streaming to a new follower over `writer` and register it
    ///
    /// The returned handle is also the connection's own outbound queue, so its
    /// replies stay ordered with the propagated frames.
    pub fn attach(
        &self,
        addr: SocketAddr,
        listening_port: Option<u16>,
        writer: SharedWriter,
    ) -> FollowerHandle {
        let follower =
            FollowerHandle::spawn(addr, listening_port, writer, self.propagation_timeout);
        self.register(follower.clone());
        follower
    }

    /// Register a follower (leader role)
    pub fn register(&self, follower: FollowerHandle) {
        info!(
            "Follower {} registered (listening port {:?})",
            follower.addr(),
            follower.listening_port()
        );
        self.followers.register(follower);
    }

    /// Detach the follower connected from `addr`
    pub fn unregister(&self, addr: &SocketAddr) -> bool {
        let removed = self.followers.unregister(addr);
        if removed {
            info!("Follower {} unregistered", addr);
        }
        removed
    }

    pub fn follower_count(&self) -> usize {
        self.followers.len()
    }

    /// Queue a write, exactly as received, for every follower
    ///
    /// Never waits on the network. Frames reach each follower in the order
    /// they were queued. A follower whose writer has stopped is evicted.
    pub fn propagate(&self, frame: &Bytes) {
        let followers = self.followers.snapshot();
        if followers.is_empty() {
            return;
        }

        debug!("Propagating {} bytes to {} followers", frame.len(), followers.len());

        for follower in followers {
            if !follower.send(frame.clone()) {
                warn!("Follower {} stopped accepting writes", follower.addr());
                self.unregister(&follower.addr());
            }
        }
    }

    /// Reply to PSYNC ? -1
    pub fn full_resync(&self) -> RespValue {
        full_resync(&self.replication_id, self.offset)
    }

    /// The `replication` section of INFO
    pub fn info_report(&self) -> String {
        let mut report = String::from("# Replication\r\n");
        match self.role {
            Role::Leader => {
                report.push_str("role:master\r\n");
                report.push_str(&format!("master_replid:{}\r\n", self.replication_id));
                report.push_str(&format!("master_repl_offset:{}\r\n", self.offset));
            }
            Role::Follower(_) => report.push_str("role:slave\r\n"),
        }
        report
    }
}
