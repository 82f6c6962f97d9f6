//! Follower link to the leader
//!
//! Connects, runs the handshake, then applies the leader's command stream
//! through the regular connection loop with replies turned off. Any failure
//! ends replication for good; the process keeps serving with the data it has.

use super::Connection;
use crate::commands::{Origin, Session};
use crate::config::LeaderAddr;
use crate::dispatch::Dispatcher;
use crate::replication::{shared_writer, Handshake};
use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Replicate from `leader`, announcing `listening_port` as our own port
pub async fn follow(
    leader: LeaderAddr,
    listening_port: u16,
    dispatcher: Arc<Dispatcher>,
) -> anyhow::Result<()> {
    info!("Connecting to leader {}", leader);
    let stream = TcpStream::connect((leader.host.as_str(), leader.port))
        .await
        .with_context(|| format!("failed to connect to leader {}", leader))?;
    let peer = stream.peer_addr()?;

    let synced = Handshake::new(stream, listening_port)
        .perform()
        .await
        .with_context(|| format!("handshake with leader {} failed", leader))?;
    info!(
        "Replicating from {} (replid {})",
        leader, synced.resync.replication_id
    );
    debug!("Snapshot: {}", STANDARD.encode(&synced.resync.snapshot));

    let (reader, writer) = synced.stream.into_split();
    let session = Session::new(peer, Origin::Leader);
    Connection::new(reader, shared_writer(writer), session, dispatcher)
        .with_buffer(synced.buffer)
        .handle()
        .await
        .with_context(|| format!("replication stream from {} failed", leader))?;

    info!("Leader {} closed the replication stream", leader);
    Ok(())
}
