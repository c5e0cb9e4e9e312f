//! GET command.

use async_trait::async_trait;

use super::{CommandContext, CommandHandler, Reply, parse_id};
use crate::error::CommandError;

pub struct GetCommand;

#[async_trait]
impl CommandHandler for GetCommand {
    fn help(&self) -> Option<&'static str> {
        Some("usage: GET <id>")
    }

    async fn run(&self, ctx: &CommandContext<'_>, args: &[String]) -> Result<Reply, CommandError> {
        let id = match parse_id(args) {
            Ok(id) => id,
            Err(reply) => return Ok(reply),
        };

        Ok(match ctx.agent.db.mxbl().get(id).await? {
            Some(entry) => entry.to_string().into(),
            None => format!("no such mxbl entry #{id}").into(),
        })
    }
}
