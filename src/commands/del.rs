//! DEL command.

use async_trait::async_trait;
use tracing::info;

use super::{CommandContext, CommandHandler, Reply, parse_id};
use crate::error::CommandError;

pub struct DelCommand;

#[async_trait]
impl CommandHandler for DelCommand {
    fn help(&self) -> Option<&'static str> {
        Some("usage: DEL <id>\n  remove an ip or domain from the mxbl")
    }

    async fn run(&self, ctx: &CommandContext<'_>, args: &[String]) -> Result<Reply, CommandError> {
        let id = match parse_id(args) {
            Ok(id) => id,
            Err(reply) => return Ok(reply),
        };

        Ok(match ctx.agent.db.mxbl().delete(id).await? {
            Some(id) => {
                info!(id, oper = %ctx.caller.oper, "Blocklist entry removed");
                format!("removed mxbl entry #{id}").into()
            }
            None => format!("no such mxbl entry #{id}").into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::test_support::run;
    use crate::testing::{agent, config};

    #[tokio::test]
    async fn removes_entry() {
        let (agent, _out) = agent(config("")).await;
        agent.db.mxbl().add("evil.com", "x", true, "root").await.unwrap();

        assert_eq!(run(&agent, "del", &["1"]).await, vec!["removed mxbl entry #1"]);
        assert!(agent.db.mxbl().get(1).await.unwrap().is_none());
        assert_eq!(run(&agent, "del", &["1"]).await, vec!["no such mxbl entry #1"]);
    }

    #[tokio::test]
    async fn bad_ids() {
        let (agent, _out) = agent(config("")).await;
        assert_eq!(run(&agent, "del", &[]).await, vec!["missing argument: <id>"]);
        assert_eq!(run(&agent, "del", &["one"]).await, vec!["invalid id (not an integer)"]);
    }
}
