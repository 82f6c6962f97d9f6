//! Follower side of the replication handshake
//!
//! PING, REPLCONF listening-port, REPLCONF capa psync2 and PSYNC ? -1 are sent
//! one at a time, each waiting for its reply. After FULLRESYNC the snapshot is
//! read and the stream is handed back, together with any bytes already
//! buffered past the snapshot.

use super::error::ReplicationError;
use crate::protocol::{RespEncoder, RespParser, RespValue};
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// What the leader granted on PSYNC
#[derive(Debug, Clone, PartialEq)]
pub struct FullResync {
    pub replication_id: String,
    pub offset: i64,
    pub snapshot: Bytes,
}

/// Outcome of a completed handshake
pub struct Synced<S> {
    /// The connection, now positioned on the command stream
    pub stream: S,

    /// Bytes already read past the snapshot
    pub buffer: BytesMut,

    pub resync: FullResync,
}

/// Handshake driver over any byte stream
pub struct Handshake<S> {
    stream: S,
    buffer: BytesMut,
    listening_port: u16,
}

impl<S> Handshake<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, listening_port: u16) -> Self {
        Handshake {
            stream,
            buffer: BytesMut::with_capacity(4096),
            listening_port,
        }
    }

    /// Run all four steps in order
    pub async fn perform(mut self) -> Result<Synced<S>, ReplicationError> {
        self.expect_status("PING", vec![Bytes::from_static(b"PING")], "PONG")
            .await?;

        self.expect_status(
            "REPLCONF listening-port",
            vec![
                Bytes::from_static(b"REPLCONF"),
                Bytes::from_static(b"listening-port"),
                Bytes::from(self.listening_port.to_string()),
            ],
            "OK",
        )
        .await?;

        self.expect_status(
            "REPLCONF capa",
            vec![
                Bytes::from_static(b"REPLCONF"),
                Bytes::from_static(b"capa"),
                Bytes::from_static(b"psync2"),
            ],
            "OK",
        )
        .await?;

        let status = self
            .round_trip(
                "PSYNC",
                vec![
                    Bytes::from_static(b"PSYNC"),
                    Bytes::from_static(b"?"),
                    Bytes::from_static(b"-1"),
                ],
            )
            .await?;
        let (replication_id, offset) = parse_full_resync(&status)?;
        info!(
            "Leader granted full resync, replid={} offset={}",
            replication_id, offset
        );

        let snapshot = self.read_snapshot().await?;
        debug!("Received {} byte snapshot", snapshot.len());

        Ok(Synced {
            stream: self.stream,
            buffer: self.buffer,
            resync: FullResync {
                replication_id,
                offset,
                snapshot,
            },
        })
    }

    /// Send a request and require a specific status reply
    async fn expect_status(
        &mut self,
        step: &'static str,
        parts: Vec<Bytes>,
        expected: &str,
    ) -> Result<(), ReplicationError> {
        let status = self.round_trip(step, parts).await?;
        if !status.eq_ignore_ascii_case(expected) {
            return Err(ReplicationError::UnexpectedReply {
                step,
                reply: status,
            });
        }
        debug!("{} -> {}", step, status);
        Ok(())
    }

    /// Send a request and wait for a status reply
    async fn round_trip(
        &mut self,
        step: &'static str,
        parts: Vec<Bytes>,
    ) -> Result<String, ReplicationError> {
        let request = RespEncoder::encode(&RespValue::command(parts));
        self.stream.write_all(&request).await?;
        self.stream.flush().await?;

        loop {
            match RespParser::parse(&mut self.buffer)? {
                Some(RespValue::SimpleString(status)) => return Ok(status),
                Some(other) => {
                    return Err(ReplicationError::UnexpectedReply {
                        step,
                        reply: other.to_string(),
                    })
                }
                None => self.fill(step).await?,
            }
        }
    }

    async fn read_snapshot(&mut self) -> Result<Bytes, ReplicationError> {
        loop {
            match RespParser::parse_snapshot(&mut self.buffer)? {
                Some(snapshot) => return Ok(snapshot),
                None => self.fill("snapshot transfer").await?,
            }
        }
    }

    async fn fill(&mut self, step: &'static str) -> Result<(), ReplicationError> {
        if self.stream.read_buf(&mut self.buffer).await? == 0 {
            return Err(ReplicationError::ConnectionClosed { step });
        }
        Ok(())
    }
}

/// Split `FULLRESYNC <replid> <offset>`
fn parse_full_resync(status: &str) -> Result<(String, i64), ReplicationError> {
    let unexpected = || ReplicationError::UnexpectedReply {
        step: "PSYNC",
        reply: status.to_string(),
    };

    let mut parts = status.split_whitespace();
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(keyword), Some(id), Some(offset), None) if keyword.eq_ignore_ascii_case("FULLRESYNC") => {
            let offset = offset.parse::<i64>().map_err(|_| unexpected())?;
            Ok((id.to_string(), offset))
        }
        _ => Err(unexpected()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    const REPLID: &str = "8371b4fb1155b71f4a04d3e1bc3e18c4a990aeeb";

    #[tokio::test]
    async fn test_full_handshake() {
        let mock = Builder::new()
            .write(b"*1\r\n$4\r\nPING\r\n")
            .read(b"+PONG\r\n")
            .write(b"*3\r\n$8\r\nREPLCONF\r\n$14\r\nlistening-port\r\n$4\r\n6380\r\n")
            .read(b"+OK\r\n")
            .write(b"*3\r\n$8\r\nREPLCONF\r\n$4\r\ncapa\r\n$6\r\npsync2\r\n")
            .read(b"+OK\r\n")
            .write(b"*3\r\n$5\r\nPSYNC\r\n$1\r\n?\r\n$2\r\n-1\r\n")
            .read(format!("+FULLRESYNC {} 0\r\n", REPLID).as_bytes())
            .read(b"$5\r\nREDIS")
            .build();

        let synced = Handshake::new(mock, 6380).perform().await.unwrap();
        assert_eq!(synced.resync.replication_id, REPLID);
        assert_eq!(synced.resync.offset, 0);
        assert_eq!(synced.resync.snapshot, Bytes::from("REDIS"));
        assert!(synced.buffer.is_empty());
    }

    #[tokio::test]
    async fn test_commands_after_snapshot_stay_buffered() {
        let mock = Builder::new()
            .write(b"*1\r\n$4\r\nPING\r\n")
            .read(b"+PONG\r\n")
            .write(b"*3\r\n$8\r\nREPLCONF\r\n$14\r\nlistening-port\r\n$4\r\n6380\r\n")
            .read(b"+OK\r\n")
            .write(b"*3\r\n$8\r\nREPLCONF\r\n$4\r\ncapa\r\n$6\r\npsync2\r\n")
            .read(b"+OK\r\n")
            .write(b"*3\r\n$5\r\nPSYNC\r\n$1\r\n?\r\n$2\r\n-1\r\n")
            .read(
                format!(
                    "+FULLRESYNC {} 7\r\n$3\r\nabc*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n",
                    REPLID
                )
                .as_bytes(),
            )
            .build();

        let synced = Handshake::new(mock, 6380).perform().await.unwrap();
        assert_eq!(synced.resync.offset, 7);
        assert_eq!(synced.resync.snapshot, Bytes::from("abc"));
        assert_eq!(
            &synced.buffer[..],
            b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n"
        );
    }

    #[tokio::test]
    async fn test_error_reply_aborts() {
        let mock = Builder::new()
            .write(b"*1\r\n$4\r\nPING\r\n")
            .read(b"-NOAUTH Authentication required.\r\n")
            .build();

        let err = Handshake::new(mock, 6380).perform().await.err().unwrap();
        assert!(matches!(
            err,
            ReplicationError::UnexpectedReply { step: "PING", .. }
        ));
    }

    #[tokio::test]
    async fn test_closed_connection_aborts() {
        let mock = Builder::new().write(b"*1\r\n$4\r\nPING\r\n").build();

        let err = Handshake::new(mock, 6380).perform().await.err().unwrap();
        assert!(matches!(
            err,
            ReplicationError::ConnectionClosed { step: "PING" }
        ));
    }

    #[tokio::test]
    async fn test_oversized_snapshot_aborts() {
        let mock = Builder::new()
            .write(b"*1\r\n$4\r\nPING\r\n")
            .read(b"+PONG\r\n")
            .write(b"*3\r\n$8\r\nREPLCONF\r\n$14\r\nlistening-port\r\n$4\r\n6380\r\n")
            .read(b"+OK\r\n")
            .write(b"*3\r\n$8\r\nREPLCONF\r\n$4\r\ncapa\r\n$6\r\npsync2\r\n")
            .read(b"+OK\r\n")
            .write(b"*3\r\n$5\r\nPSYNC\r\n$1\r\n?\r\n$2\r\n-1\r\n")
            .read(format!("+FULLRESYNC {} 0\r\n$9223372036854775807\r\n", REPLID).as_bytes())
            .build();

        let err = Handshake::new(mock, 6380).perform().await.err().unwrap();
        assert!(matches!(err, ReplicationError::Protocol(_)));
    }

    #[test]
    fn test_parse_full_resync() {
        assert_eq!(
            parse_full_resync(&format!("FULLRESYNC {} 42", REPLID)).unwrap(),
            (REPLID.to_string(), 42)
        );
        assert!(parse_full_resync("CONTINUE").is_err());
        assert!(parse_full_resync("FULLRESYNC id notanumber").is_err());
    }
}
