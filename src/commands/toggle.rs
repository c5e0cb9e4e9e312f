//! TOGGLE command.

use async_trait::async_trait;
use tracing::info;

use super::{CommandContext, CommandHandler, Reply, parse_id};
use crate::error::CommandError;

pub struct ToggleCommand;

#[async_trait]
impl CommandHandler for ToggleCommand {
    fn help(&self) -> Option<&'static str> {
        Some("usage: TOGGLE <id>")
    }

    async fn run(&self, ctx: &CommandContext<'_>, args: &[String]) -> Result<Reply, CommandError> {
        let id = match parse_id(args) {
            Ok(id) => id,
            Err(reply) => return Ok(reply),
        };

        Ok(match ctx.agent.db.mxbl().toggle(id).await? {
            Some(active) => {
                let state = if active { "enabled" } else { "disabled" };
                info!(id, active, oper = %ctx.caller.oper, "Blocklist entry toggled");
                format!("mxbl entry #{id} was {state}").into()
            }
            None => format!("no such mxbl entry #{id}").into(),
        })
    }
}
