//! Server module
//!
//! Handles TCP connections and manages the event loop.
//! This module is responsible for accepting connections and delegating
//! command processing to the dispatcher. On a follower it also starts the
//! link to the leader.

mod connection;
mod upstream;

use crate::commands::{Origin, Session};
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::replication::{shared_writer, ReplicationManager, Role};
use crate::store::KeyValueStore;
use anyhow::Context;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

pub use connection::Connection;
pub use upstream::follow;

/// A bound server, ready to accept connections
pub struct Server {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    /// Bind on all interfaces and set up the shared state
    pub async fn bind(config: &Config) -> anyhow::Result<Self> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;

        let store = Arc::new(KeyValueStore::new());
        let replication = Arc::new(ReplicationManager::new(config));

        Ok(Server {
            listener,
            dispatcher: Arc::new(Dispatcher::new(store, replication)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn store(&self) -> Arc<KeyValueStore> {
        self.dispatcher.store().clone()
    }

    pub fn replication(&self) -> Arc<ReplicationManager> {
        self.dispatcher.replication().clone()
    }

    /// Serve until the process ends
    pub async fn run(self) -> anyhow::Result<()> {
        let local = self.local_addr()?;
        info!("kvrelay RESP server listening on {}", local);

        let replication = self.dispatcher.replication();
        if replication.is_leader() {
            info!(
                "Leading with replid {} at offset {}",
                replication.replication_id(),
                replication.offset()
            );
        }

        if let Role::Follower(leader) = replication.role().clone() {
            let dispatcher = self.dispatcher.clone();
            tokio::spawn(async move {
                if let Err(e) = follow(leader, local.port(), dispatcher).await {
                    error!("Replication stopped: {:#}", e);
                }
            });
        }

        loop {
            // Accept incoming connections
            let (socket, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };
            info!("New RESP connection from {}", addr);

            // Clone the dispatcher Arc for this connection
            let dispatcher = self.dispatcher.clone();

            // Spawn a new task to handle this connection
            tokio::spawn(async move {
                let (reader, writer) = socket.into_split();
                let session = Session::new(addr, Origin::Client);
                let connection = Connection::new(reader, shared_writer(writer), session, dispatcher);

                if let Err(e) = connection.handle().await {
                    error!("Connection error from {}: {}", addr, e);
                }

                info!("Connection closed: {}", addr);
            });
        }
    }
}

/// Run the server
///
/// Binds `0.0.0.0:<port>` and serves connections.
pub async fn run(config: Config) -> anyhow::Result<()> {
    Server::bind(&config).await?.run().await
}
