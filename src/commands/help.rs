//! HELP command.

use async_trait::async_trait;

use super::{CommandContext, CommandHandler, Reply};
use crate::error::CommandError;

pub struct HelpCommand;

#[async_trait]
impl CommandHandler for HelpCommand {
    fn help(&self) -> Option<&'static str> {
        Some("usage: HELP [command]")
    }

    async fn run(&self, ctx: &CommandContext<'_>, args: &[String]) -> Result<Reply, CommandError> {
        let registry = ctx.registry;

        let Some(name) = args.first() else {
            let names: Vec<&str> = registry.names().collect();
            let overview = registry.help("help").unwrap_or_default();
            return Ok(format!("{overview}\n  available commands: {}", names.join(", ")).into());
        };

        let name = name.to_lowercase();
        Ok(registry
            .help(&name)
            .unwrap_or_else(|| format!("unknown command '{name}'"))
            .into())
    }
}
