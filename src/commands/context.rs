//! Command execution context

use crate::replication::ReplicationManager;
use crate::store::KeyValueStore;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

/// Where a connection's commands come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A regular client: every command gets a reply
    Client,

    /// The leader's stream on a follower: commands are applied silently
    Leader,
}

/// Per-connection state visible to commands
#[derive(Debug)]
pub struct Session {
    peer: SocketAddr,
    origin: Origin,
    listening_port: Mutex<Option<u16>>,
    follower_requested: AtomicBool,
}

impl Session {
    pub fn new(peer: SocketAddr, origin: Origin) -> Self {
        Session {
            peer,
            origin,
            listening_port: Mutex::new(None),
            follower_requested: AtomicBool::new(false),
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Whether replies must be written back
    pub fn wants_replies(&self) -> bool {
        self.origin == Origin::Client
    }

    /// Remember the port announced with REPLCONF listening-port
    pub fn set_listening_port(&self, port: u16) {
        *self.listening_port.lock() = Some(port);
    }

    pub fn listening_port(&self) -> Option<u16> {
        *self.listening_port.lock()
    }

    /// Ask the connection to become a follower once the current reply is written
    pub fn request_follower(&self) {
        self.follower_requested.store(true, Ordering::SeqCst);
    }

    /// Consume a pending follower request
    pub fn take_follower_request(&self) -> bool {
        self.follower_requested.swap(false, Ordering::SeqCst)
    }
}

/// Context provided to commands during execution
///
/// Gives commands access to the store, the replication state and the
/// session of the connection that sent them.
pub struct CommandContext<'a> {
    pub store: &'a KeyValueStore,
    pub replication: &'a ReplicationManager,
    pub session: &'a Session,
}

impl<'a> CommandContext<'a> {
    pub fn new(
        store: &'a KeyValueStore,
        replication: &'a ReplicationManager,
        session: &'a Session,
    ) -> Self {
        CommandContext {
            store,
            replication,
            session,
        }
    }
}
