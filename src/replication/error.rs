//! Replication errors (follower side)

use crate::protocol::RespError;
use std::fmt;
use std::io;

/// Failure while establishing or reading the link to the leader
#[derive(Debug)]
pub enum ReplicationError {
    /// Transport failure
    Io(io::Error),

    /// The leader sent bytes that do not decode
    Protocol(RespError),

    /// The leader answered a handshake step with something else than expected
    UnexpectedReply { step: &'static str, reply: String },

    /// The leader closed the connection mid-handshake
    ConnectionClosed { step: &'static str },
}

impl fmt::Display for ReplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicationError::Io(e) => write!(f, "IO error: {}", e),
            ReplicationError::Protocol(e) => write!(f, "protocol error: {}", e),
            ReplicationError::UnexpectedReply { step, reply } => {
                write!(f, "unexpected reply to {}: {}", step, reply)
            }
            ReplicationError::ConnectionClosed { step } => {
                write!(f, "leader closed the connection during {}", step)
            }
        }
    }
}

impl std::error::Error for ReplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReplicationError::Io(e) => Some(e),
            ReplicationError::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ReplicationError {
    fn from(e: io::Error) -> Self {
        ReplicationError::Io(e)
    }
}

impl From<RespError> for ReplicationError {
    fn from(e: RespError) -> Self {
        ReplicationError::Protocol(e)
    }
}
