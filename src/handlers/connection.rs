//! Registration and connection upkeep handlers.
//!
//! Capability negotiation (`CAP LS 302` → `REQ` → `ACK`/`NAK`), SASL PLAIN,
//! post-welcome OPER/JOIN and nickname tracking.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use mxbl_proto::{Message, response};
use tracing::{debug, info, warn};

use super::MessageHandler;
use crate::error::HandlerResult;
use crate::irc::OutboundError;
use crate::state::Agent;

/// Capability that exposes a sender's oper name as a message tag.
pub const CAP_OPER: &str = "solanum.chat/oper";

/// Maximum bytes per AUTHENTICATE line.
const SASL_CHUNK_SIZE: usize = 400;

/// Open the registration handshake.
pub async fn register(agent: &Agent) -> Result<(), OutboundError> {
    let irc = &agent.config.irc;
    let out = &agent.outbound;

    out.send(Message::new("CAP", ["LS", "302"])).await?;
    if let Some(pass) = &irc.password {
        out.send(Message::new("PASS", [pass.as_str()])).await?;
    }
    out.send(Message::new("NICK", [agent.nickname()])).await?;
    out.send(Message::new(
        "USER",
        [irc.username(), "0", "*", irc.realname()],
    ))
    .await?;
    Ok(())
}

fn wanted_caps(agent: &Agent) -> Vec<&'static str> {
    let mut caps = vec![CAP_OPER, "message-tags"];
    if agent.config.sasl.is_some() {
        caps.push("sasl");
    }
    caps
}

async fn cap_end(agent: &Agent) -> HandlerResult {
    agent.outbound.send(Message::new("CAP", ["END"])).await?;
    Ok(())
}

/// Base64 `authzid\0authcid\0password` split into AUTHENTICATE-sized pieces.
///
/// A payload that is an exact multiple of the chunk size is followed by `+`.
pub fn sasl_plain_payload(user: &str, password: &str) -> Vec<String> {
    let encoded = BASE64.encode(format!("{user}\0{user}\0{password}"));
    let mut chunks: Vec<String> = encoded
        .as_bytes()
        .chunks(SASL_CHUNK_SIZE)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect();
    if encoded.len() % SASL_CHUNK_SIZE == 0 {
        chunks.push("+".to_owned());
    }
    chunks
}

/// `PING` → `PONG`.
pub struct PingHandler;

#[async_trait]
impl MessageHandler for PingHandler {
    async fn handle(&self, agent: &Agent, msg: &Message) -> HandlerResult {
        agent
            .outbound
            .send(Message::new("PONG", msg.params.iter().map(String::as_str)))
            .await?;
        Ok(())
    }
}

/// Client side of `CAP`.
pub struct CapHandler;

#[async_trait]
impl MessageHandler for CapHandler {
    async fn handle(&self, agent: &Agent, msg: &Message) -> HandlerResult {
        let subcommand = msg.param(1).unwrap_or_default().to_ascii_uppercase();
        let caps = msg.trailing().unwrap_or_default();

        match subcommand.as_str() {
            "LS" => {
                agent.offer_caps(
                    caps.split_whitespace()
                        .map(|cap| cap.split_once('=').map_or(cap, |(name, _)| name)),
                );
                // `CAP * LS * :...` means more lines follow.
                if msg.params.len() > 3 && msg.param(2) == Some("*") {
                    return Ok(());
                }

                let offered = agent.take_offered_caps();
                let request: Vec<&str> = wanted_caps(agent)
                    .into_iter()
                    .filter(|cap| offered.iter().any(|o| o == cap))
                    .collect();
                debug!(offered = offered.len(), requested = ?request, "Capabilities offered");

                if request.is_empty() {
                    return cap_end(agent).await;
                }
                agent
                    .outbound
                    .send(Message::new("CAP", ["REQ".to_owned(), request.join(" ")]))
                    .await?;
                Ok(())
            }
            "ACK" => {
                let acked: Vec<&str> = caps.split_whitespace().collect();
                info!(caps = %caps, "Capabilities acknowledged");
                if !acked.contains(&CAP_OPER) {
                    warn!("Server did not grant {CAP_OPER}; operator tags will be missing");
                }
                if acked.contains(&"sasl") && agent.config.sasl.is_some() {
                    agent
                        .outbound
                        .send(Message::new("AUTHENTICATE", ["PLAIN"]))
                        .await?;
                    return Ok(());
                }
                cap_end(agent).await
            }
            "NAK" => {
                warn!(caps = %caps, "Capabilities rejected");
                cap_end(agent).await
            }
            _ => Ok(()),
        }
    }
}

/// Answers the server's `AUTHENTICATE +` with SASL PLAIN credentials.
pub struct AuthenticateHandler;

#[async_trait]
impl MessageHandler for AuthenticateHandler {
    async fn handle(&self, agent: &Agent, msg: &Message) -> HandlerResult {
        if msg.param(0) != Some("+") {
            return Ok(());
        }
        let Some(sasl) = &agent.config.sasl else {
            return Ok(());
        };

        for chunk in sasl_plain_payload(&sasl.user, &sasl.password) {
            agent
                .outbound
                .send(Message::new("AUTHENTICATE", [chunk]))
                .await?;
        }
        Ok(())
    }
}

/// Any SASL outcome numeric ends capability negotiation.
pub struct SaslDoneHandler;

#[async_trait]
impl MessageHandler for SaslDoneHandler {
    async fn handle(&self, agent: &Agent, msg: &Message) -> HandlerResult {
        if msg.command == response::RPL_SASLSUCCESS {
            info!("SASL authentication succeeded");
        } else {
            warn!(
                numeric = %msg.command,
                reason = msg.trailing().unwrap_or_default(),
                "SASL authentication failed"
            );
        }
        cap_end(agent).await
    }
}

/// `001`: oper up and join channels.
pub struct WelcomeHandler;

#[async_trait]
impl MessageHandler for WelcomeHandler {
    async fn handle(&self, agent: &Agent, msg: &Message) -> HandlerResult {
        agent.mark_registered();
        if let Some(nick) = msg.param(0) {
            agent.set_nickname(nick);
        }

        if let Some(oper) = &agent.config.oper {
            agent
                .outbound
                .send(Message::new("OPER", [oper.user.as_str(), oper.password.as_str()]))
                .await?;
        }

        let channels = agent.config.autojoin();
        if !channels.is_empty() {
            agent
                .outbound
                .send(Message::new("JOIN", [channels.join(",")]))
                .await?;
        }
        Ok(())
    }
}

/// `005`: log the network name once.
pub struct IsupportHandler;

#[async_trait]
impl MessageHandler for IsupportHandler {
    async fn handle(&self, agent: &Agent, msg: &Message) -> HandlerResult {
        let network = msg
            .params
            .iter()
            .skip(1)
            .find_map(|token| token.strip_prefix("NETWORK="));

        if let Some(network) = network
            && agent.announce_once()
        {
            info!(network = %network, nick = %agent.nickname(), "Connected to network");
        }
        Ok(())
    }
}

/// `381`: disable server notices, we never read them.
pub struct YoureOperHandler;

#[async_trait]
impl MessageHandler for YoureOperHandler {
    async fn handle(&self, agent: &Agent, _msg: &Message) -> HandlerResult {
        info!("Opered up");
        let nick = agent.nickname();
        agent
            .outbound
            .send(Message::new("MODE", [nick.as_str(), "-s"]))
            .await?;
        Ok(())
    }
}

/// Track our own nick changes.
pub struct NickHandler;

#[async_trait]
impl MessageHandler for NickHandler {
    async fn handle(&self, agent: &Agent, msg: &Message) -> HandlerResult {
        if let (Some(old), Some(new)) = (msg.source_nickname(), msg.param(0))
            && agent.is_me(old)
        {
            info!(old = %old, new = %new, "Nickname changed");
            agent.set_nickname(new);
        }
        Ok(())
    }
}

/// `433` before welcome: retry with `_` appended.
pub struct NickInUseHandler;

#[async_trait]
impl MessageHandler for NickInUseHandler {
    async fn handle(&self, agent: &Agent, msg: &Message) -> HandlerResult {
        if agent.is_registered() {
            return Ok(());
        }
        let taken = msg.param(1).map_or_else(|| agent.nickname(), str::to_owned);
        let next = format!("{taken}_");
        warn!(taken = %taken, next = %next, "Nickname in use");
        agent.set_nickname(&next);
        agent.outbound.send(Message::new("NICK", [next])).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{agent, config};

    fn line(s: &str) -> Message {
        s.parse().unwrap()
    }

    const SASL: &str = r#"
        [sasl]
        user = "mxbl"
        pass = "hunter2"
    "#;

    #[tokio::test]
    async fn register_opens_handshake() {
        let mut cfg = config("");
        cfg.irc.password = Some("letmein".into());
        let (agent, out) = agent(cfg).await;

        register(&agent).await.unwrap();
        assert_eq!(
            out.lines(),
            vec!["CAP LS 302", "PASS letmein", "NICK mxbl", "USER mxbl 0 * mxbl"]
        );
    }

    #[tokio::test]
    async fn multiline_ls_requests_intersection() {
        let (agent, out) = agent(config(SASL)).await;

        CapHandler
            .handle(&agent, &line(":srv CAP * LS * :multi-prefix sasl=PLAIN,EXTERNAL"))
            .await
            .unwrap();
        assert!(out.lines().is_empty());

        CapHandler
            .handle(&agent, &line(":srv CAP * LS :message-tags solanum.chat/oper"))
            .await
            .unwrap();
        assert_eq!(
            out.lines(),
            vec!["CAP REQ :solanum.chat/oper message-tags sasl"]
        );
    }

    #[tokio::test]
    async fn ls_without_wanted_caps_ends_negotiation() {
        let (agent, out) = agent(config("")).await;
        CapHandler
            .handle(&agent, &line(":srv CAP * LS :multi-prefix sasl"))
            .await
            .unwrap();
        assert_eq!(out.lines(), vec!["CAP END"]);
    }

    #[tokio::test]
    async fn ack_with_sasl_starts_authentication() {
        let (agent, out) = agent(config(SASL)).await;
        CapHandler
            .handle(&agent, &line(":srv CAP mxbl ACK :solanum.chat/oper message-tags sasl"))
            .await
            .unwrap();
        AuthenticateHandler
            .handle(&agent, &line("AUTHENTICATE +"))
            .await
            .unwrap();
        SaslDoneHandler
            .handle(&agent, &line(":srv 903 mxbl :SASL authentication successful"))
            .await
            .unwrap();

        assert_eq!(
            out.lines(),
            vec![
                "AUTHENTICATE PLAIN".to_owned(),
                format!("AUTHENTICATE {}", BASE64.encode("mxbl\0mxbl\0hunter2")),
                "CAP END".to_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn ack_without_sasl_config_ends_negotiation() {
        let (agent, out) = agent(config("")).await;
        CapHandler
            .handle(&agent, &line(":srv CAP mxbl ACK :solanum.chat/oper sasl"))
            .await
            .unwrap();
        assert_eq!(out.lines(), vec!["CAP END"]);
    }

    #[tokio::test]
    async fn nak_ends_negotiation() {
        let (agent, out) = agent(config("")).await;
        CapHandler
            .handle(&agent, &line(":srv CAP mxbl NAK :solanum.chat/oper"))
            .await
            .unwrap();
        assert_eq!(out.lines(), vec!["CAP END"]);
    }

    #[test]
    fn long_sasl_payload_is_chunked() {
        let chunks = sasl_plain_payload("u", &"p".repeat(600));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), SASL_CHUNK_SIZE);

        // 300 raw bytes encode to exactly 400 characters.
        let exact = sasl_plain_payload("a", &"b".repeat(296));
        assert_eq!(exact.len(), 2);
        assert_eq!(exact[1], "+");
    }

    #[tokio::test]
    async fn welcome_opers_and_joins() {
        let mut cfg = config(
            r#"
            [oper]
            user = "mxbl"
            pass = "operpass"
            "#,
        );
        cfg.irc.channels = vec!["#ops".into()];
        let (agent, out) = agent(cfg).await;

        WelcomeHandler
            .handle(&agent, &line(":srv 001 mxbl_ :Welcome"))
            .await
            .unwrap();

        assert!(agent.is_registered());
        assert!(agent.is_me("mxbl_"));
        assert_eq!(
            out.lines(),
            vec!["OPER mxbl operpass", "JOIN #ops,#mxbl-log"]
        );
    }

    #[tokio::test]
    async fn isupport_announces_once() {
        let (agent, _out) = agent(config("")).await;
        IsupportHandler
            .handle(&agent, &line(":srv 005 mxbl CHANTYPES=# :are supported"))
            .await
            .unwrap();
        assert!(agent.announce_once());

        let (agent, _out) = crate::testing::agent(config("")).await;
        IsupportHandler
            .handle(&agent, &line(":srv 005 mxbl NETWORK=Example :are supported"))
            .await
            .unwrap();
        assert!(!agent.announce_once());
    }

    #[tokio::test]
    async fn youreoper_disables_snotes() {
        let (agent, out) = agent(config("")).await;
        YoureOperHandler
            .handle(&agent, &line(":srv 381 mxbl :You are now an IRC operator"))
            .await
            .unwrap();
        assert_eq!(out.lines(), vec!["MODE mxbl -s"]);
    }

    #[tokio::test]
    async fn own_nick_changes_are_tracked() {
        let (agent, _out) = agent(config("")).await;
        NickHandler
            .handle(&agent, &line(":someone!u@h NICK other"))
            .await
            .unwrap();
        assert!(agent.is_me("mxbl"));

        NickHandler
            .handle(&agent, &line(":mxbl!u@h NICK :mxbl2"))
            .await
            .unwrap();
        assert!(agent.is_me("mxbl2"));
    }

    #[tokio::test]
    async fn nick_in_use_retries_only_before_welcome() {
        let (agent, out) = agent(config("")).await;
        NickInUseHandler
            .handle(&agent, &line(":srv 433 * mxbl :Nickname is already in use"))
            .await
            .unwrap();
        assert_eq!(out.lines(), vec!["NICK mxbl_"]);
        assert!(agent.is_me("mxbl_"));

        agent.mark_registered();
        NickInUseHandler
            .handle(&agent, &line(":srv 433 mxbl_ other :Nickname is already in use"))
            .await
            .unwrap();
        assert_eq!(out.lines().len(), 1);
    }
}
