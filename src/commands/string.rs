//! String commands (SET, GET)

use super::{is_keyword, parse_integer, wrong_arity, Command, CommandContext};
use crate::protocol::RespValue;
use bytes::Bytes;

/// SET command - Set a key to a value
///
/// Syntax: SET key value [PX milliseconds | EX seconds]
pub struct SetCommand;

impl SetCommand {
    /// Read the optional expiry into a relative TTL in milliseconds
    fn parse_expiry(options: &[Bytes]) -> Result<Option<i64>, RespValue> {
        match options {
            [] => Ok(None),
            [unit, amount] => {
                let scale = if is_keyword(unit, "px") {
                    1
                } else if is_keyword(unit, "ex") {
                    1000
                } else {
                    return Err(RespValue::error("ERR syntax error"));
                };

                parse_integer(amount)
                    .and_then(|n| n.checked_mul(scale))
                    .map(Some)
                    .ok_or_else(|| RespValue::error("ERR invalid expiry value"))
            }
            _ => Err(RespValue::error("ERR syntax error")),
        }
    }
}

impl Command for SetCommand {
    fn execute(&self, ctx: &CommandContext<'_>, args: &[Bytes]) -> RespValue {
        let [key, value, options @ ..] = args else {
            return wrong_arity(self.name());
        };

        // Nothing is written unless the options are valid
        let ttl = match Self::parse_expiry(options) {
            Ok(ttl) => ttl,
            Err(reply) => return reply,
        };

        ctx.store.set(key.clone(), value.clone(), ttl);

        RespValue::simple_string("OK")
    }

    fn name(&self) -> &'static str {
        "SET"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn is_write(&self) -> bool {
        true
    }
}

/// GET command - Get the value of a key
///
/// Syntax: GET key
pub struct GetCommand;

impl Command for GetCommand {
    fn execute(&self, ctx: &CommandContext<'_>, args: &[Bytes]) -> RespValue {
        let Some(key) = args.first() else {
            return wrong_arity(self.name());
        };

        match ctx.store.get(key) {
            Some(value) => RespValue::bulk_string(value),
            None => RespValue::null(),
        }
    }

    fn name(&self) -> &'static str {
        "GET"
    }

    fn min_args(&self) -> usize {
        1
    }
}
