//! LIST command.

use async_trait::async_trait;

use super::{CommandContext, CommandHandler, Reply};
use crate::error::CommandError;

pub struct ListCommand;

#[async_trait]
impl CommandHandler for ListCommand {
    fn help(&self) -> Option<&'static str> {
        Some("usage: LIST [limit = 0] [glob]")
    }

    async fn run(&self, ctx: &CommandContext<'_>, args: &[String]) -> Result<Reply, CommandError> {
        let limit = match args.first() {
            None => 0,
            Some(arg) => match arg.trim().parse::<u32>() {
                Ok(limit) => limit,
                Err(_) => return Ok("invalid limit (not an integer)".into()),
            },
        };
        let glob = args.get(1).map_or("*", String::as_str);

        let entries = ctx.agent.db.mxbl().list_all(limit, glob).await?;
        let now = chrono::Utc::now();
        Ok(Reply::Lines(entries.iter().map(|e| e.render(now)).collect()))
    }
}
