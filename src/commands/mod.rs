//! Operator commands.
//!
//! The [`CommandRouter`] is a dispatcher handler for `PRIVMSG`. It works out
//! whether a message is addressed to us, who is asking, and which command
//! they want, then runs the command and sends its reply lines back as
//! NOTICEs.

mod add;
mod del;
mod get;
mod help;
mod list;
mod toggle;
mod tokenize;

use tokenize::tokenize;

use std::collections::BTreeMap;

use async_trait::async_trait;
use mxbl_proto::{Message, irc_eq};
use tracing::{Instrument, debug, info, warn};

use crate::config::{CallerPolicyConfig, SettingsConfig};
use crate::error::{CommandError, HandlerResult};
use crate::handlers::MessageHandler;
use crate::state::Agent;

/// Tag carrying the sender's oper name.
pub const OPER_TAG: &str = "solanum.chat/oper";

/// Whoever issued a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub nick: String,
    /// Full `nick!user@host`.
    pub source: String,
    /// Privilege identity; recorded as `added_by`.
    pub oper: String,
}

/// How to treat commands whose sender carries no oper tag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CallerPolicy {
    /// Drop the command.
    #[default]
    Ignore,
    /// Run it as this identity.
    Fallback(String),
}

impl CallerPolicy {
    pub fn from_settings(settings: &SettingsConfig) -> Self {
        match settings.untagged_callers {
            CallerPolicyConfig::Ignore => CallerPolicy::Ignore,
            CallerPolicyConfig::Fallback => {
                CallerPolicy::Fallback(settings.fallback_identity.clone())
            }
        }
    }

    /// Privilege identity for a caller with oper tag `tag`, or `None` if the
    /// command must be dropped.
    pub fn identity(&self, tag: Option<&str>) -> Option<String> {
        match (tag.filter(|t| !t.is_empty()), self) {
            (Some(oper), _) => Some(oper.to_owned()),
            (None, CallerPolicy::Fallback(identity)) => Some(identity.clone()),
            (None, CallerPolicy::Ignore) => None,
        }
    }
}

/// What a command sends back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Split on newlines, one NOTICE per line.
    Text(String),
    /// One NOTICE per element.
    Lines(Vec<String>),
}

impl Reply {
    pub fn into_lines(self) -> Vec<String> {
        match self {
            Reply::Text(text) => text.lines().map(str::to_owned).collect(),
            Reply::Lines(lines) => lines,
        }
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_owned())
    }
}

/// Everything a command can reach.
pub struct CommandContext<'a> {
    pub agent: &'a Agent,
    pub caller: &'a Caller,
    pub registry: &'a CommandRegistry,
}

/// A named operator command.
///
/// Bad input is reported through the returned [`Reply`]; `Err` is reserved
/// for failures the caller can do nothing about, and produces no reply.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Usage text shown by HELP.
    fn help(&self) -> Option<&'static str> {
        None
    }

    async fn run(&self, ctx: &CommandContext<'_>, args: &[String]) -> Result<Reply, CommandError>;
}

/// Commands by lower-case name.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Box<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The blocklist management commands.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("help", help::HelpCommand);
        registry.register("add", add::AddCommand);
        registry.register("del", del::DelCommand);
        registry.register("get", get::GetCommand);
        registry.register("list", list::ListCommand);
        registry.register("toggle", toggle::ToggleCommand);
        registry
    }

    pub fn register(&mut self, name: &str, handler: impl CommandHandler + 'static) {
        self.commands.insert(name.to_lowercase(), Box::new(handler));
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&dyn CommandHandler> {
        self.commands.get(&name.to_lowercase()).map(|h| h.as_ref())
    }

    /// Registered names, alphabetically.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Help text for `name`, if it is registered.
    pub fn help(&self, name: &str) -> Option<String> {
        let handler = self.get(name)?;
        Some(match handler.help() {
            Some(text) => text.to_owned(),
            None => format!("no help available for '{}'", name.to_lowercase()),
        })
    }
}

/// Parse the `<id>` argument shared by DEL, GET and TOGGLE.
fn parse_id(args: &[String]) -> Result<i64, Reply> {
    let arg = args.first().ok_or_else(|| Reply::from("missing argument: <id>"))?;
    arg.trim()
        .parse()
        .map_err(|_| Reply::from("invalid id (not an integer)"))
}

/// A message that turned out to be addressed to us.
#[derive(Debug, PartialEq, Eq)]
struct Invocation<'a> {
    reply_to: &'a str,
    command: &'a str,
    args: &'a str,
}

/// Decide whether `text`, sent by `nick` to `target`, is a command for us.
///
/// Direct messages are commands outright; in channels the line must start
/// with our nick, optionally followed by `:` or `,`, then a space.
fn address<'a>(
    agent: &Agent,
    nick: &'a str,
    target: &'a str,
    text: &'a str,
) -> Option<Invocation<'a>> {
    let (first, rest) = text.split_once(' ').unwrap_or((text, ""));

    if agent.is_me(target) {
        return Some(Invocation {
            reply_to: nick,
            command: first,
            args: rest,
        });
    }

    if rest.is_empty() {
        return None;
    }
    let name = first
        .strip_suffix(':')
        .or_else(|| first.strip_suffix(','))
        .unwrap_or(first);
    if !agent.is_me(name) {
        return None;
    }

    let (command, args) = rest.split_once(' ').unwrap_or((rest, ""));
    Some(Invocation {
        reply_to: target,
        command,
        args,
    })
}

/// Routes addressed PRIVMSGs to registered commands.
pub struct CommandRouter {
    registry: CommandRegistry,
    policy: CallerPolicy,
}

#[async_trait]
impl MessageHandler for CommandRouter {
    async fn handle(&self, agent: &Agent, msg: &Message) -> HandlerResult {
        let Some(nick) = msg.source_nickname() else {
            return Ok(());
        };
        if agent.is_me(nick) {
            return Ok(());
        }
        let (Some(target), Some(text)) = (msg.param(0), msg.param(1)) else {
            return Ok(());
        };
        let Some(invocation) = address(agent, nick, target, text) else {
            return Ok(());
        };

        let Some(oper) = self.policy.identity(msg.tag_value(OPER_TAG)) else {
            debug!(
                nick = %nick,
                command = %invocation.command,
                "Ignoring command from caller without oper tag"
            );
            return Ok(());
        };
        let caller = Caller {
            nick: nick.to_owned(),
            source: msg.prefix.as_ref().map(ToString::to_string).unwrap_or_default(),
            oper,
        };

        let name = invocation.command.to_lowercase();
        let Some(handler) = self.registry.get(&name) else {
            return Ok(());
        };

        let span = crate::telemetry::command(&name, &caller.nick, invocation.reply_to);
        self.invoke(agent, &caller, &invocation, handler)
            .instrument(span)
            .await
    }
}

impl CommandRouter {
    pub fn new(registry: CommandRegistry, policy: CallerPolicy) -> Self {
        Self { registry, policy }
    }

    async fn invoke(
        &self,
        agent: &Agent,
        caller: &Caller,
        invocation: &Invocation<'_>,
        handler: &dyn CommandHandler,
    ) -> HandlerResult {
        info!(
            oper = %caller.oper,
            source = %caller.source,
            args = %invocation.args,
            "Command invoked"
        );

        let args = match tokenize(invocation.args) {
            Ok(args) => args,
            Err(e) => {
                agent
                    .outbound
                    .notice(invocation.reply_to, &format!("syntax error: {e}"))
                    .await?;
                return Ok(());
            }
        };

        let ctx = CommandContext {
            agent,
            caller,
            registry: &self.registry,
        };
        match handler.run(&ctx, &args).await {
            Ok(reply) => {
                for line in reply.into_lines() {
                    agent.outbound.notice(invocation.reply_to, &line).await?;
                }
            }
            Err(e) => warn!(error = %e, "Command failed"),
        }
        Ok(())
    }
}
