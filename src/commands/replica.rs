//! Replication handshake commands (REPLCONF, PSYNC), served by a leader

use super::{is_keyword, parse_integer, wrong_arity, Command, CommandContext};
use crate::protocol::RespValue;
use bytes::Bytes;
use tracing::debug;

/// REPLCONF command - Follower configuration during the handshake
///
/// Syntax: REPLCONF listening-port <port> | REPLCONF capa psync2
pub struct ReplConfCommand;

impl Command for ReplConfCommand {
    fn execute(&self, ctx: &CommandContext<'_>, args: &[Bytes]) -> RespValue {
        let [option, value, ..] = args else {
            return wrong_arity(self.name());
        };

        if is_keyword(option, "listening-port") {
            let port = match parse_integer(value).and_then(|p| u16::try_from(p).ok()) {
                Some(port) => port,
                None => return RespValue::error("ERR invalid port number"),
            };
            debug!("{} announced listening port {}", ctx.session.peer(), port);
            ctx.session.set_listening_port(port);
            return RespValue::simple_string("OK");
        }

        if is_keyword(option, "capa") && is_keyword(value, "psync2") {
            return RespValue::simple_string("OK");
        }

        RespValue::error("ERR invalid argument for 'replconf' command")
    }

    fn name(&self) -> &'static str {
        "REPLCONF"
    }

    fn min_args(&self) -> usize {
        2
    }
}

/// PSYNC command - Request a full resynchronization
///
/// Syntax: PSYNC ? -1
///
/// Replies `+FULLRESYNC <replid> <offset>` followed by the snapshot, and marks
/// the connection to be registered as a follower once that reply is out.
pub struct PsyncCommand;

impl Command for PsyncCommand {
    fn execute(&self, ctx: &CommandContext<'_>, args: &[Bytes]) -> RespValue {
        let [replication_id, offset] = args else {
            return wrong_arity(self.name());
        };

        if replication_id[..] != b"?"[..] || offset[..] != b"-1"[..] {
            return RespValue::error("ERR partial resynchronization is not supported");
        }

        if !ctx.replication.is_leader() {
            return RespValue::error("ERR PSYNC is not supported while acting as a follower");
        }

        ctx.session.request_follower();
        ctx.replication.full_resync()
    }

    fn name(&self) -> &'static str {
        "PSYNC"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}
