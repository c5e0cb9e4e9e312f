//! Inbound event dispatch.
//!
//! Handlers are registered against a command token and an optional predicate.
//! For each inbound message every matching handler runs concurrently; the
//! dispatcher returns only when all of them have finished. A handler that
//! errors or panics is logged and does not affect its siblings.

mod connection;
mod services;

pub use connection::register;

use connection::{
    AuthenticateHandler, CapHandler, IsupportHandler, NickHandler, NickInUseHandler, PingHandler,
    SaslDoneHandler, WelcomeHandler, YoureOperHandler,
};
use services::ServicesHandler;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::join_all;
use mxbl_proto::{Message, irc_eq, response};
use tracing::{Instrument, error, warn};

use crate::commands::{CallerPolicy, CommandRegistry, CommandRouter};
use crate::config::Config;
use crate::error::{HandlerError, HandlerResult};
use crate::state::Agent;

/// A handler for one kind of inbound message.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, agent: &Agent, msg: &Message) -> HandlerResult;
}

/// Extra filter evaluated after the command token matched.
pub type Predicate = Box<dyn Fn(&Agent, &Message) -> bool + Send + Sync>;

struct Registration {
    name: &'static str,
    command: String,
    predicate: Option<Predicate>,
    handler: Arc<dyn MessageHandler>,
}

impl Registration {
    fn matches(&self, agent: &Agent, msg: &Message) -> bool {
        self.command == msg.command && self.predicate.as_ref().is_none_or(|p| p(agent, msg))
    }
}

/// Registry of message handlers.
#[derive(Default)]
pub struct Dispatcher {
    handlers: Vec<Registration>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every message with command `command`.
    pub fn on(
        &mut self,
        name: &'static str,
        command: &str,
        handler: impl MessageHandler + 'static,
    ) -> &mut Self {
        self.push(name, command, None, Arc::new(handler))
    }

    /// Register `handler` for messages with command `command` that also
    /// satisfy `predicate`.
    pub fn on_when(
        &mut self,
        name: &'static str,
        command: &str,
        predicate: impl Fn(&Agent, &Message) -> bool + Send + Sync + 'static,
        handler: impl MessageHandler + 'static,
    ) -> &mut Self {
        self.push(name, command, Some(Box::new(predicate)), Arc::new(handler))
    }

    fn push(
        &mut self,
        name: &'static str,
        command: &str,
        predicate: Option<Predicate>,
        handler: Arc<dyn MessageHandler>,
    ) -> &mut Self {
        self.handlers.push(Registration {
            name,
            command: command.to_ascii_uppercase(),
            predicate,
            handler,
        });
        self
    }

    /// Names of registered handlers, in registration order.
    pub fn names(&self) -> impl Iterator<Item = (&str, &'static str)> {
        self.handlers.iter().map(|r| (r.command.as_str(), r.name))
    }

    /// Run every matching handler and wait for all of them.
    ///
    /// Returns the number of handlers that failed.
    pub async fn dispatch(&self, agent: &Agent, msg: &Message) -> usize {
        let matched: Vec<&Registration> = self
            .handlers
            .iter()
            .filter(|r| r.matches(agent, msg))
            .collect();
        if matched.is_empty() {
            return 0;
        }

        let span = crate::telemetry::event(&msg.command, msg.source_nickname());
        let runs = matched.iter().map(|r| {
            let run = AssertUnwindSafe(r.handler.handle(agent, msg))
                .catch_unwind()
                .instrument(crate::telemetry::handler(r.name));
            async move {
                let result = run
                    .await
                    .unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(&*panic))));
                (r.name, result)
            }
        });
        let results = join_all(runs).instrument(span).await;

        let mut failed = 0;
        for (name, result) in results {
            match result {
                Ok(()) => {}
                Err(e @ HandlerError::Panicked(_)) => {
                    error!(handler = name, code = e.error_code(), error = %e, "Handler panicked");
                    failed += 1;
                }
                Err(e) => {
                    warn!(handler = name, code = e.error_code(), error = %e, "Handler failed");
                    failed += 1;
                }
            }
        }
        failed
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

/// The daemon's full handler table.
pub fn build_dispatcher(config: &Config) -> Dispatcher {
    let mut dispatcher = Dispatcher::new();

    // Connection upkeep and registration
    dispatcher
        .on("ping", "PING", PingHandler)
        .on("cap", "CAP", CapHandler)
        .on("authenticate", "AUTHENTICATE", AuthenticateHandler)
        .on("welcome", response::RPL_WELCOME, WelcomeHandler)
        .on("isupport", response::RPL_ISUPPORT, IsupportHandler)
        .on("youreoper", response::RPL_YOUREOPER, YoureOperHandler)
        .on("nick", "NICK", NickHandler)
        .on("nick_in_use", response::ERR_NICKNAMEINUSE, NickInUseHandler);
    for numeric in response::SASL_DONE {
        dispatcher.on("sasl_done", numeric, SaslDoneHandler);
    }

    // Account-services notifications
    dispatcher.on_when(
        "services",
        "PRIVMSG",
        |agent, msg| msg.source_nickname().is_some_and(|nick| irc_eq(nick, agent.services())),
        ServicesHandler,
    );

    // Operator commands
    let router = CommandRouter::new(
        CommandRegistry::builtin(),
        CallerPolicy::from_settings(&config.settings),
    );
    dispatcher.on_when(
        "command",
        "PRIVMSG",
        |_, msg| msg.source_nickname().is_some(),
        router,
    );

    dispatcher
}
