//! Followers attached to a leader
//!
//! Every follower owns an outbound queue drained by its own writer task, so
//! queuing a frame never waits on the network. A write that fails or misses
//! its deadline may have left part of a frame on the wire; the writer task
//! then stops and the follower is dropped instead of being fed more frames.

use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::warn;

/// Write half of a connection, shared between its own replies and the follower writer
pub type SharedWriter = Arc<tokio::sync::Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// Wrap a writer so it can be shared
pub fn shared_writer<W>(writer: W) -> SharedWriter
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    let writer: Box<dyn AsyncWrite + Send + Unpin> = Box::new(writer);
    Arc::new(tokio::sync::Mutex::new(writer))
}

/// A follower's output channel
#[derive(Clone)]
pub struct FollowerHandle {
    addr: SocketAddr,
    listening_port: Option<u16>,
    sender: mpsc::UnboundedSender<Bytes>,
}

impl FollowerHandle {
    /// Start the writer task for `writer` and return its queue
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        addr: SocketAddr,
        listening_port: Option<u16>,
        writer: SharedWriter,
        write_timeout: Duration,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(drain(addr, receiver, writer, write_timeout));

        FollowerHandle {
            addr,
            listening_port,
            sender,
        }
    }

    /// Remote address of the follower's connection
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Port the follower announced with REPLCONF listening-port
    pub fn listening_port(&self) -> Option<u16> {
        self.listening_port
    }

    /// Queue one frame; false once the writer task has stopped
    pub fn send(&self, frame: Bytes) -> bool {
        self.sender.send(frame).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Resolves when the writer task has stopped
    pub async fn closed(&self) {
        self.sender.closed().await
    }
}

impl fmt::Debug for FollowerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FollowerHandle")
            .field("addr", &self.addr)
            .field("listening_port", &self.listening_port)
            .finish()
    }
}

/// Write queued frames in order until the queue closes or a write fails
async fn drain(
    addr: SocketAddr,
    mut receiver: mpsc::UnboundedReceiver<Bytes>,
    writer: SharedWriter,
    write_timeout: Duration,
) {
    while let Some(frame) = receiver.recv().await {
        let write = async {
            let mut writer = writer.lock().await;
            writer.write_all(&frame).await?;
            writer.flush().await
        };

        match tokio::time::timeout(write_timeout, write).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Dropping follower {}: write failed: {}", addr, e);
                return;
            }
            Err(_) => {
                warn!(
                    "Dropping follower {}: write timed out after {:?}",
                    addr, write_timeout
                );
                return;
            }
        }
    }
}

/// Registered followers, keyed by remote address
#[derive(Default)]
pub struct FollowerSet {
    followers: Mutex<HashMap<SocketAddr, FollowerHandle>>,
}

impl FollowerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a follower, replacing any previous one from the same address
    pub fn register(&self, follower: FollowerHandle) {
        self.followers.lock().insert(follower.addr, follower);
    }

    /// Remove a follower, returns true if it was registered
    pub fn unregister(&self, addr: &SocketAddr) -> bool {
        self.followers.lock().remove(addr).is_some()
    }

    /// Clone the current followers out of the lock
    pub fn snapshot(&self) -> Vec<FollowerHandle> {
        self.followers.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.followers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    const TIMEOUT: Duration = Duration::from_millis(50);

    fn handle(port: u16) -> FollowerHandle {
        let addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();
        FollowerHandle::spawn(addr, Some(6380), shared_writer(tokio::io::sink()), TIMEOUT)
    }

    #[tokio::test]
    async fn test_register_and_unregister() {
        let set = FollowerSet::new();
        set.register(handle(5000));
        set.register(handle(5001));
        set.register(handle(5001));
        assert_eq!(set.len(), 2);

        assert!(set.unregister(&handle(5000).addr()));
        assert!(!set.unregister(&handle(5000).addr()));
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn test_frames_are_written_in_order() {
        let (client, mut server) = tokio::io::duplex(64);
        let addr: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        let follower = FollowerHandle::spawn(addr, None, shared_writer(client), TIMEOUT);

        assert!(follower.send(Bytes::from("+A\r\n")));
        assert!(follower.send(Bytes::from("+B\r\n")));
        drop(follower);

        let mut written = Vec::new();
        server.read_to_end(&mut written).await.unwrap();
        assert_eq!(written, b"+A\r\n+B\r\n");
    }

    #[tokio::test]
    async fn test_timed_out_write_stops_the_follower() {
        // Nobody reads this pipe, and it holds 8 bytes
        let (client, mut server) = tokio::io::duplex(8);
        let addr: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        let follower = FollowerHandle::spawn(addr, None, shared_writer(client), TIMEOUT);

        let first = Bytes::from("*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n");
        assert!(follower.send(first.clone()));
        tokio::time::timeout(Duration::from_secs(2), follower.closed())
            .await
            .unwrap();

        // Nothing is appended after the cut frame
        assert!(!follower.send(Bytes::from("*3\r\n$3\r\nSET\r\n$3\r\nbaz\r\n$3\r\nqux\r\n")));
        assert!(follower.is_closed());

        let mut written = Vec::new();
        server.read_to_end(&mut written).await.unwrap();
        assert_eq!(written, first[..8].to_vec());
    }
}
