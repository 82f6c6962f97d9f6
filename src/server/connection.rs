//! Connection handling
//!
//! Manages individual connections, parsing RESP commands
//! and sending responses.

use crate::commands::Session;
use crate::dispatch::Dispatcher;
use crate::protocol::{DecodedCommand, RespEncoder, RespParser, RespValue};
use crate::replication::{FollowerHandle, SharedWriter};
use anyhow::bail;
use bytes::BytesMut;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

/// Connection handler
///
/// Used both for client connections and, on a follower, for the leader's
/// stream; the session's origin decides whether replies are written.
pub struct Connection<R> {
    /// Read half of the stream
    reader: R,

    /// Write half, handed to the follower writer on promotion
    writer: SharedWriter,

    /// Read buffer
    read_buffer: BytesMut,

    /// Write buffer
    write_buffer: BytesMut,

    session: Session,

    dispatcher: Arc<Dispatcher>,

    /// Outbound queue once this connection is a follower of this leader
    follower: Option<FollowerHandle>,
}

impl<R> Connection<R>
where
    R: AsyncRead + Unpin,
{
    /// Create a new connection handler
    pub fn new(reader: R, writer: SharedWriter, session: Session, dispatcher: Arc<Dispatcher>) -> Self {
        Connection {
            reader,
            writer,
            read_buffer: BytesMut::with_capacity(4096),
            write_buffer: BytesMut::with_capacity(4096),
            session,
            dispatcher,
            follower: None,
        }
    }

    /// Start from bytes that were already read off the stream
    pub fn with_buffer(mut self, buffer: BytesMut) -> Self {
        self.read_buffer = buffer;
        self
    }

    /// Handle the connection until the peer leaves or sends garbage
    ///
    /// A connection that became a follower is unregistered on the way out,
    /// and is closed once its follower writer stops.
    pub async fn handle(mut self) -> anyhow::Result<()> {
        let result = self.process().await;

        if self.follower.is_some() {
            self.dispatcher
                .replication()
                .unregister(&self.session.peer());
        }

        result
    }

    async fn process(&mut self) -> anyhow::Result<()> {
        loop {
            // Run every complete command already buffered
            loop {
                match RespParser::parse_command(&mut self.read_buffer) {
                    Ok(Some(command)) => self.execute(command).await?,
                    Ok(None) => break,
                    Err(e) => {
                        // The stream cannot be resynchronized
                        warn!("Protocol error from {}: {}", self.session.peer(), e);
                        if self.session.wants_replies() {
                            let reply = RespValue::error(format!("ERR Protocol error: {}", e));
                            self.send_response(&reply).await?;
                        }
                        return Err(e.into());
                    }
                }
            }

            // Read data from the socket
            let n = match &self.follower {
                Some(follower) => tokio::select! {
                    n = self.reader.read_buf(&mut self.read_buffer) => n?,
                    _ = follower.closed() => bail!("follower writer stopped"),
                },
                None => self.reader.read_buf(&mut self.read_buffer).await?,
            };

            // Connection closed
            if n == 0 {
                if self.read_buffer.is_empty() {
                    return Ok(());
                } else {
                    bail!("connection reset by peer");
                }
            }

            debug!("Read {} bytes", n);
        }
    }

    async fn execute(&mut self, command: DecodedCommand) -> anyhow::Result<()> {
        let response = self.dispatcher.dispatch(&command, &self.session);

        if self.session.wants_replies() {
            debug!("Response: {}", response);
            self.send_response(&response).await?;
        }

        // Only after FULLRESYNC and the snapshot are on the wire
        if self.session.take_follower_request() {
            self.follower = Some(self.dispatcher.replication().attach(
                self.session.peer(),
                self.session.listening_port(),
                self.writer.clone(),
            ));
        }

        Ok(())
    }

    /// Send a response to the peer
    async fn send_response(&mut self, response: &RespValue) -> anyhow::Result<()> {
        // Encode the response
        self.write_buffer.clear();
        RespEncoder::encode_to(&mut self.write_buffer, response);

        // Behind any frames already queued for this follower
        if let Some(follower) = &self.follower {
            if !follower.send(self.write_buffer.split().freeze()) {
                bail!("follower writer stopped");
            }
            return Ok(());
        }

        // Write to the socket
        let mut writer = self.writer.lock().await;
        writer.write_all(&self.write_buffer).await?;
        writer.flush().await?;

        Ok(())
    }
}
