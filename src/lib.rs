//! kvrelay - An in-memory key-value server speaking RESP, with leader/follower replication
//!
//! kvrelay is designed with strong cohesion and loose coupling principles:
//! - Each module has a single, well-defined responsibility
//! - Modules communicate through clear, minimal interfaces
//! - No circular dependencies between modules

pub mod protocol;
pub mod store;
pub mod commands;
pub mod dispatch;
pub mod replication;
pub mod server;
pub mod config;

/// Re-export commonly used types
pub use store::{KeyValueStore, StoredValue};
pub use protocol::{DecodedCommand, RespValue, RespError};
pub use commands::{Command, CommandContext, Session};
pub use replication::{ReplicationManager, Role};
pub use config::{Config, LeaderAddr};
pub use server::Server;
