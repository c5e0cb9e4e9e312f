//! TCP/TLS connection and its reader/writer tasks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use mxbl_proto::Message;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, trace, warn};

use super::codec::IrcLineCodec;
use super::whois::WhoisTracker;
use super::{Outbound, OutboundError, WhoisInfo};
use crate::config::IrcConfig;

/// Lines buffered between the reader task and the dispatch loop.
const INBOUND_QUEUE: usize = 1024;
/// Messages buffered between handlers and the writer task.
const OUTBOUND_QUEUE: usize = 256;

/// Commands whose parameters carry credentials.
const SECRET_COMMANDS: [&str; 3] = ["PASS", "OPER", "AUTHENTICATE"];

/// Errors establishing a connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid server name for TLS: {0}")]
    InvalidServerName(String),
}

/// A live connection: the sending handle plus the inbound event stream.
///
/// The stream ends when the server closes the connection or a read fails.
pub struct Session {
    pub sender: Arc<IrcSender>,
    pub events: mpsc::Receiver<Message>,
}

/// [`Outbound`] implementation backed by the writer task.
pub struct IrcSender {
    tx: mpsc::Sender<Message>,
    whois: Arc<WhoisTracker>,
    timeout: Duration,
}

#[async_trait]
impl Outbound for IrcSender {
    async fn send(&self, msg: Message) -> Result<(), OutboundError> {
        self.tx.send(msg).await.map_err(|_| OutboundError::Closed)
    }

    async fn whois(&self, nick: &str) -> Option<WhoisInfo> {
        let (rx, first) = self.whois.register(nick);
        if first && self.send(Message::new("WHOIS", [nick])).await.is_err() {
            drop(rx);
            self.whois.abandon(nick);
            return None;
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(reply) => reply.ok().flatten(),
            Err(_) => {
                debug!(nick = %nick, "WHOIS timed out");
                self.whois.abandon(nick);
                None
            }
        }
    }
}

/// Connect to the configured server and start the I/O tasks.
///
/// `timeout` bounds WHOIS correlation on this session.
pub async fn connect(irc: &IrcConfig, timeout: Duration) -> Result<Session, ConnectError> {
    let tcp = TcpStream::connect((irc.server.as_str(), irc.port)).await?;
    tcp.set_nodelay(true)?;
    info!(server = %irc.server, port = irc.port, tls = irc.tls, "Connected");

    if irc.tls {
        let tls = upgrade_to_tls(tcp, &irc.server).await?;
        Ok(spawn_io(tls, timeout))
    } else {
        Ok(spawn_io(tcp, timeout))
    }
}

async fn upgrade_to_tls(
    tcp: TcpStream,
    hostname: &str,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>, ConnectError> {
    let mut roots = RootCertStore::empty();
    let certs = rustls_native_certs::load_native_certs();
    for cert in certs.certs {
        if let Err(e) = roots.add(cert) {
            warn!(error = %e, "Failed to add root cert");
        }
    }
    for e in &certs.errors {
        warn!(error = %e, "Error loading native certs");
    }

    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|_| ConnectError::InvalidServerName(hostname.to_string()))?;

    let stream = connector.connect(server_name, tcp).await?;
    info!(hostname = %hostname, "TLS handshake completed");
    Ok(stream)
}

fn spawn_io<S>(stream: S, timeout: Duration) -> Session
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = FramedRead::new(read_half, IrcLineCodec::new());
    let mut writer = FramedWrite::new(write_half, IrcLineCodec::new());

    let (out_tx, mut out_rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE);
    let (event_tx, event_rx) = mpsc::channel::<Message>(INBOUND_QUEUE);
    let whois = Arc::new(WhoisTracker::new());

    tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if SECRET_COMMANDS.contains(&msg.command.as_str()) {
                trace!(command = %msg.command, ">> <redacted>");
            } else {
                trace!(line = %msg, ">>");
            }
            if let Err(e) = writer.send(msg).await {
                warn!(error = %e, "Write failed");
                break;
            }
        }
        debug!("Writer task finished");
    });

    let tracker = Arc::clone(&whois);
    tokio::spawn(async move {
        while let Some(line) = reader.next().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "Read failed");
                    break;
                }
            };
            if line.is_empty() {
                continue;
            }
            trace!(line = %line, "<<");

            match line.parse::<Message>() {
                Ok(msg) => {
                    tracker.observe(&msg);
                    if event_tx.send(msg).await.is_err() {
                        break;
                    }
                }
                Err(e) => debug!(error = %e, line = %line, "Unparseable line"),
            }
        }
        debug!("Reader task finished");
    });

    Session {
        sender: Arc::new(IrcSender {
            tx: out_tx,
            whois,
            timeout,
        }),
        events: event_rx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    #[tokio::test]
    async fn session_round_trip_over_duplex() {
        let (client, server) = tokio::io::duplex(4096);
        let mut session = spawn_io(client, Duration::from_secs(1));
        let (server_read, mut server_write) = tokio::io::split(server);
        let mut server_lines = BufReader::new(server_read).lines();

        server_write.write_all(b"PING :abc\r\n").await.unwrap();
        let msg = session.events.recv().await.unwrap();
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.param(0), Some("abc"));

        session
            .sender
            .send(Message::new("PONG", ["abc"]))
            .await
            .unwrap();
        assert_eq!(server_lines.next_line().await.unwrap().unwrap(), "PONG abc");
    }

    #[tokio::test]
    async fn whois_is_correlated_with_replies() {
        let (client, server) = tokio::io::duplex(4096);
        let session = spawn_io(client, Duration::from_secs(2));
        let (server_read, mut server_write) = tokio::io::split(server);
        let mut server_lines = BufReader::new(server_read).lines();

        let sender = Arc::clone(&session.sender);
        let lookup = tokio::spawn(async move { sender.whois("alice").await });

        assert_eq!(server_lines.next_line().await.unwrap().unwrap(), "WHOIS alice");
        server_write
            .write_all(b":srv 311 mxbl alice ~a example.org * :Alice\r\n")
            .await
            .unwrap();
        server_write
            .write_all(b":srv 318 mxbl alice :End\r\n")
            .await
            .unwrap();

        let info = lookup.await.unwrap().unwrap();
        assert_eq!(info.hostmask(), "alice!~a@example.org");
    }

    #[tokio::test]
    async fn whois_times_out_to_none() {
        let (client, _server) = tokio::io::duplex(4096);
        let session = spawn_io(client, Duration::from_millis(50));
        assert!(session.sender.whois("nobody").await.is_none());
    }

    #[tokio::test]
    async fn events_end_when_server_closes() {
        let (client, server) = tokio::io::duplex(4096);
        let mut session = spawn_io(client, Duration::from_secs(1));
        drop(server);
        assert!(session.events.recv().await.is_none());
    }
}
