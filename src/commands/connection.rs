//! Connection commands (PING, ECHO)

use super::{Command, CommandContext};
use crate::protocol::RespValue;
use bytes::Bytes;

/// PING command
///
/// Syntax: PING
pub struct PingCommand;

impl Command for PingCommand {
    fn execute(&self, _ctx: &CommandContext<'_>, _args: &[Bytes]) -> RespValue {
        RespValue::simple_string("PONG")
    }

    fn name(&self) -> &'static str {
        "PING"
    }
}

/// ECHO command - Return the message, or an empty string without one
///
/// Syntax: ECHO [message]
pub struct EchoCommand;

impl Command for EchoCommand {
    fn execute(&self, _ctx: &CommandContext<'_>, args: &[Bytes]) -> RespValue {
        RespValue::bulk_string(args.first().cloned().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "ECHO"
    }
}
