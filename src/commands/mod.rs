//! Command execution module
//!
//! Provides a unified interface for all commands through the Command trait.
//! Each family of commands is implemented in a separate file for high cohesion.

mod context;
mod registry;

// Command implementations
mod string;
mod connection;
mod admin;
mod replica;

pub use context::{CommandContext, Origin, Session};
pub use registry::CommandRegistry;

use crate::protocol::RespValue;
use bytes::Bytes;

/// Command execution trait
///
/// All commands implement this trait with a single execute method.
/// This provides loose coupling between command implementations and the dispatcher.
pub trait Command: Send + Sync {
    /// Execute the command with the given context and arguments
    ///
    /// Arguments:
    /// - ctx: the store, replication state and session of the caller
    /// - args: command arguments (excluding the command name itself)
    ///
    /// Returns:
    /// - RespValue representing the response to send to the client
    fn execute(&self, ctx: &CommandContext<'_>, args: &[Bytes]) -> RespValue;

    /// Get the command name, as matched on the wire
    fn name(&self) -> &'static str;

    /// Get the minimum number of arguments required
    fn min_args(&self) -> usize {
        0
    }

    /// Get the maximum number of arguments (None = unlimited)
    fn max_args(&self) -> Option<usize> {
        None
    }

    /// Whether a successful execution mutates the store and must reach followers
    fn is_write(&self) -> bool {
        false
    }
}

/// Error reply for a wrong argument count
pub(crate) fn wrong_arity(name: &str) -> RespValue {
    RespValue::error(format!(
        "ERR wrong number of arguments for '{}' command",
        name.to_lowercase()
    ))
}

/// Parse a decimal integer argument
pub(crate) fn parse_integer(arg: &[u8]) -> Option<i64> {
    std::str::from_utf8(arg).ok()?.parse::<i64>().ok()
}

/// Case-insensitive comparison of an argument with a keyword
pub(crate) fn is_keyword(arg: &[u8], keyword: &str) -> bool {
    arg.eq_ignore_ascii_case(keyword.as_bytes())
}
