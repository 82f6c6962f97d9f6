//! Admin commands (INFO)

use super::{is_keyword, wrong_arity, Command, CommandContext};
use crate::protocol::RespValue;
use bytes::Bytes;

/// INFO command - Get information about the server
///
/// Syntax: INFO replication
pub struct InfoCommand;

impl Command for InfoCommand {
    fn execute(&self, ctx: &CommandContext<'_>, args: &[Bytes]) -> RespValue {
        let Some(section) = args.first() else {
            return wrong_arity(self.name());
        };

        if !is_keyword(section, "replication") {
            return RespValue::error(format!(
                "ERR unsupported INFO section '{}'",
                String::from_utf8_lossy(section)
            ));
        }

        RespValue::bulk_string(ctx.replication.info_report())
    }

    fn name(&self) -> &'static str {
        "INFO"
    }

    fn min_args(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{args, Fixture};

    fn report(result: RespValue) -> String {
        match result {
            RespValue::BulkString(bytes) => String::from_utf8(bytes.to_vec()).unwrap(),
            other => panic!("Expected bulk string response, got {}", other),
        }
    }

    #[test]
    fn test_info_on_leader() {
        let fixture = Fixture::leader();
        let info = report(InfoCommand.execute(&fixture.ctx(), &args(&["replication"])));

        assert!(info.starts_with("# Replication\r\n"));
        assert!(info.contains("role:master\r\n"));
        assert!(info.contains("master_replid:8371b4fb1155b71f4a04d3e1bc3e18c4a990aeeb\r\n"));
        assert!(info.contains("master_repl_offset:0\r\n"));
    }

    #[test]
    fn test_info_on_follower() {
        let fixture = Fixture::follower();
        let info = report(InfoCommand.execute(&fixture.ctx(), &args(&["replication"])));

        assert!(info.contains("role:slave"));
        assert!(!info.contains("master_replid"));
    }

    #[test]
    fn test_info_unknown_section() {
        let fixture = Fixture::leader();
        let result = InfoCommand.execute(&fixture.ctx(), &args(&["keyspace"]));
        assert!(result.is_error());
    }
}
