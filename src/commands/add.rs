//! ADD command.

use async_trait::async_trait;
use tracing::info;

use super::{CommandContext, CommandHandler, Reply};
use crate::error::CommandError;

pub struct AddCommand;

#[async_trait]
impl CommandHandler for AddCommand {
    fn help(&self) -> Option<&'static str> {
        Some("usage: ADD <ip|domain> <reason>\n  add an ip or domain to the mxbl")
    }

    async fn run(&self, ctx: &CommandContext<'_>, args: &[String]) -> Result<Reply, CommandError> {
        let Some((pattern, reason)) = args.split_first() else {
            return Ok("missing argument: <ip|domain>".into());
        };
        let reason = reason.join(" ");
        if reason.is_empty() {
            return Ok("missing argument: <reason>".into());
        }

        let id = ctx
            .agent
            .db
            .mxbl()
            .add(pattern, &reason, true, &ctx.caller.oper)
            .await?;
        info!(id, pattern = %pattern, oper = %ctx.caller.oper, "Blocklist entry added");

        Ok(format!("added mxbl entry #{id}").into())
    }
}
