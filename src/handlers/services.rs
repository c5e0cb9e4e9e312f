//! Account-services notifications: new registrations and email changes.

use async_trait::async_trait;
use mxbl_proto::Message;
use tracing::{Instrument, debug, info};

use super::MessageHandler;
use crate::error::HandlerResult;
use crate::moderation::enforce;
use crate::state::Agent;

/// An account that just registered or changed its email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub account: String,
    /// Email domain, lower-cased.
    pub domain: String,
    /// New registration (drop) rather than email change (freeze).
    pub drop: bool,
}

/// Parse a services notice such as
/// `alice REGISTER: alice to alice@example.com` or
/// `alice VERIFY:EMAILCHG: alice (alice@example.com)`.
pub fn parse_notification(text: &str) -> Option<Notification> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let (&account, &last) = (words.first()?, words.last()?);

    let (domain, drop) = if words.contains(&"REGISTER:") {
        (last.split('@').nth(1)?, true)
    } else if words.contains(&"VERIFY:EMAILCHG:") {
        (last.split('@').nth(1)?.trim_end_matches(')'), false)
    } else {
        return None;
    };

    if domain.is_empty() {
        return None;
    }

    Some(Notification {
        account: account.to_owned(),
        domain: domain.to_ascii_lowercase(),
        drop,
    })
}

/// Checks the email domain of every notified account.
pub struct ServicesHandler;

#[async_trait]
impl MessageHandler for ServicesHandler {
    async fn handle(&self, agent: &Agent, msg: &Message) -> HandlerResult {
        let Some(note) = msg.trailing().and_then(parse_notification) else {
            return Ok(());
        };

        let span = crate::telemetry::check(&note.domain, &note.account);
        check_and_enforce(agent, &note).instrument(span).await
    }
}

async fn check_and_enforce(agent: &Agent, note: &Notification) -> HandlerResult {
    let Some(found) = agent.checker.check(&note.domain).await? else {
        debug!("Domain is clean");
        return Ok(());
    };

    info!(id = found.entry.id, drop = note.drop, "Blocklisted domain");
    let outcome = enforce(agent, &found, &note.domain, &note.account, note.drop).await;
    debug!(?outcome, "Enforcement finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::run;
    use crate::handlers::build_dispatcher;
    use crate::moderation::{Record, RecordKind};
    use crate::testing::{FakeDns, agent, agent_with_dns, config};
    use std::net::Ipv4Addr;

    #[test]
    fn parses_registration() {
        assert_eq!(
            parse_notification("alice REGISTER: alice to alice@Evil.COM"),
            Some(Notification {
                account: "alice".into(),
                domain: "evil.com".into(),
                drop: true,
            })
        );
    }

    #[test]
    fn parses_email_change() {
        assert_eq!(
            parse_notification("bob VERIFY:EMAILCHG: bob (bob@mail.example)"),
            Some(Notification {
                account: "bob".into(),
                domain: "mail.example".into(),
                drop: false,
            })
        );
    }

    #[test]
    fn ignores_other_notices() {
        assert_eq!(parse_notification("alice IDENTIFY: alice"), None);
        assert_eq!(parse_notification(""), None);
        assert_eq!(parse_notification("alice REGISTER: alice to nobody"), None);
        assert_eq!(parse_notification("alice REGISTER: alice to alice@"), None);
    }

    #[tokio::test]
    async fn registration_with_blocklisted_mx_is_dropped() {
        let dns = FakeDns::new()
            .answer("x.org", RecordKind::Mx, vec![Record::Mx { exchange: "mail.x.org.".into() }])
            .answer("mail.x.org", RecordKind::A, vec![Record::A(Ipv4Addr::new(10, 0, 0, 5))]);
        let (agent, out) = agent_with_dns(config(""), dns).await;
        agent.db.mxbl().add("10.0.0.5", "bad host", true, "root").await.unwrap();
        let dispatcher = build_dispatcher(&agent.config);

        let msg: Message =
            ":NickServ!NickServ@services. PRIVMSG #services :bob REGISTER: bob to bob@x.org"
                .parse()
                .unwrap();
        assert_eq!(dispatcher.dispatch(&agent, &msg).await, 0);

        let lines = out.lines();
        assert_eq!(lines[0], "PRIVMSG NickServ :BADMAIL ADD *@x.org mxbl #1 - bad host");
        assert_eq!(lines[1], "PRIVMSG NickServ :FDROP bob");
        assert_eq!(
            lines[2],
            "PRIVMSG #mxbl-log :BAD: <Unknown user> registered bob with *@x.org (mxbl #1 - bad host)"
        );
        assert!(lines[3].starts_with("NOTICE bob :Your account has been dropped"));
        assert_eq!(agent.db.mxbl().get(1).await.unwrap().unwrap().hits, 1);
    }

    #[tokio::test]
    async fn mixed_case_entry_blocks_registration() {
        let (agent, out) = agent(config("")).await;
        assert_eq!(
            run(&agent, "add", &["Mailinator.com", "disposable"]).await,
            vec!["added mxbl entry #1"]
        );
        let dispatcher = build_dispatcher(&agent.config);

        let msg: Message = concat!(
            ":NickServ!NickServ@services. PRIVMSG #services ",
            ":bob REGISTER: bob to bob@Mailinator.com"
        )
        .parse()
        .unwrap();
        assert_eq!(dispatcher.dispatch(&agent, &msg).await, 0);

        let lines = out.lines();
        assert_eq!(
            lines[0],
            "PRIVMSG NickServ :BADMAIL ADD *@mailinator.com mxbl #1 - disposable"
        );
        assert_eq!(lines[1], "PRIVMSG NickServ :FDROP bob");
        assert_eq!(agent.db.mxbl().get(1).await.unwrap().unwrap().hits, 1);
    }

    #[tokio::test]
    async fn clean_domain_sends_nothing() {
        let (agent, out) = agent(config("")).await;
        let msg: Message = concat!(
            ":NickServ!NickServ@services. PRIVMSG mxbl ",
            ":carol REGISTER: carol to carol@fine.example"
        )
        .parse()
        .unwrap();
        ServicesHandler.handle(&agent, &msg).await.unwrap();
        assert!(out.lines().is_empty());
    }

    #[tokio::test]
    async fn notices_from_others_are_not_services() {
        let (agent, out) = agent(config("")).await;
        agent.db.mxbl().add("evil.com", "x", true, "root").await.unwrap();
        let dispatcher = build_dispatcher(&agent.config);

        let msg: Message = ":mallory!m@h PRIVMSG #services :bob REGISTER: bob to bob@evil.com"
            .parse()
            .unwrap();
        dispatcher.dispatch(&agent, &msg).await;
        assert!(out.lines().is_empty());
    }
}
