//! Server configuration
//!
//! Command-line flags are parsed with clap and turned into a [`Config`].
//! A malformed `--replicaof` is rejected by clap before anything starts.

use clap::Parser;
use rand::Rng;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default RESP port
pub const DEFAULT_PORT: u16 = 6379;

/// Default per-follower write deadline for propagated commands
pub const DEFAULT_PROPAGATION_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Port to listen on, on all interfaces.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Follow the leader at "<host> <port>" instead of acting as a leader.
    #[arg(long, value_name = "HOST PORT")]
    pub replicaof: Option<LeaderAddr>,

    /// Write deadline for each follower when propagating a command, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    pub repl_write_timeout: u64,
}

/// Address of the leader a follower connects to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderAddr {
    pub host: String,
    pub port: u16,
}

impl LeaderAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        LeaderAddr {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for LeaderAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for LeaderAddr {
    type Err = ConfigError;

    /// Parse the `"<host> <port>"` form used by `--replicaof`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        match parts.as_slice() {
            [host, port] => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidReplicaOf(s.to_string()))?;
                Ok(LeaderAddr::new(*host, port))
            }
            _ => Err(ConfigError::InvalidReplicaOf(s.to_string())),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// `--replicaof` is not of the form "<host> <port>"
    InvalidReplicaOf(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidReplicaOf(value) => {
                write!(f, "invalid replicaof '{}', expected \"<host> <port>\"", value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Listening port (0 picks an ephemeral one)
    pub port: u16,

    /// Leader to follow; None means this process is the leader
    pub replica_of: Option<LeaderAddr>,

    /// 40-character replication id advertised by a leader
    pub replication_id: String,

    /// Starting replication offset
    pub replication_offset: u64,

    /// Write deadline per follower when propagating
    pub propagation_timeout: Duration,
}

impl Config {
    /// Configuration for a leader on `port`
    pub fn leader(port: u16) -> Self {
        Config {
            port,
            replica_of: None,
            replication_id: generate_replication_id(),
            replication_offset: 0,
            propagation_timeout: DEFAULT_PROPAGATION_TIMEOUT,
        }
    }

    /// Configuration for a follower on `port` replicating from `leader`
    pub fn follower(port: u16, leader: LeaderAddr) -> Self {
        Config {
            replica_of: Some(leader),
            ..Self::leader(port)
        }
    }
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Config {
            port: cli.port,
            replica_of: cli.replicaof,
            replication_id: generate_replication_id(),
            replication_offset: 0,
            propagation_timeout: Duration::from_millis(cli.repl_write_timeout),
        }
    }
}

/// 40 random lowercase hex characters
pub fn generate_replication_id() -> String {
    let bytes: [u8; 20] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
