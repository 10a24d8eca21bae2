//! The live channel: one socket, one background task.
//!
//! The task owns both halves of the socket and the outbound queue. It is the
//! only writer of frame-derived state and exits when the link is cancelled or
//! the socket ends.

use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use lobster_core::{Error, Result};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::frames::Outbound;
use crate::session::Shared;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const DEFAULT_LIVE_PATH: &str = "/api/world/ws";

/// Handle to an open channel. Dropping it cancels the task.
pub(crate) struct LiveLink {
    outbound: mpsc::UnboundedSender<Message>,
    cancel: CancellationToken,
}

impl LiveLink {
    /// Connects, sends `auth` as the first frame and starts the channel task.
    pub(crate) async fn open(url: &str, auth: &Outbound, shared: Arc<Shared>) -> Result<Self> {
        debug!(%url, "opening live channel");
        let (socket, _) = connect_async(url)
            .await
            .map_err(|err| Error::Channel(format!("failed to connect to {url}: {err}")))?;
        let (mut sink, stream) = socket.split();

        sink.send(Message::Text(auth.to_text()?))
            .await
            .map_err(|err| Error::Channel(format!("failed to send BOT_AUTH: {err}")))?;

        let (outbound, queue) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        tokio::spawn(run(sink, stream, queue, cancel.clone(), shared));
        info!(%url, "live channel open");

        Ok(Self { outbound, cancel })
    }

    /// Queues a frame. Fails once the task has ended.
    pub(crate) fn send(&self, frame: &Outbound) -> Result<()> {
        let text = frame.to_text()?;
        self.outbound
            .send(Message::Text(text))
            .map_err(|_closed| Error::NotConnected)
    }

    /// Whether the task has exited.
    pub(crate) fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.outbound.is_closed()
    }
}

impl Drop for LiveLink {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    mut sink: SplitSink<Socket, Message>,
    mut stream: SplitStream<Socket>,
    mut queue: mpsc::UnboundedReceiver<Message>,
    cancel: CancellationToken,
    shared: Arc<Shared>,
) {
    let reason = loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                // Best effort; the peer may already be gone.
                let _ = sink.send(Message::Close(None)).await;
                debug!("live channel closed locally");
                return;
            }
            Some(message) = queue.recv() => {
                if let Err(err) = sink.send(message).await {
                    break Some(format!("send failed: {err}"));
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => shared.handle_text(&text),
                Some(Ok(Message::Close(frame))) => {
                    break frame.map(|frame| frame.reason.to_string()).filter(|r| !r.is_empty());
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => break Some(err.to_string()),
                None => break None,
            },
        }
    };

    if !cancel.is_cancelled() {
        shared.channel_lost(reason);
    }
}

/// Picks the live endpoint: explicit override, then the endpoint returned at
/// authentication, then the server URL with its scheme switched to ws(s).
pub fn resolve_live_url(
    override_url: Option<&str>,
    advertised: Option<&str>,
    server: &str,
) -> Result<String> {
    if let Some(url) = override_url.map(str::trim).filter(|url| !url.is_empty()) {
        return Ok(url.to_string());
    }

    let mut base = Url::parse(server)
        .map_err(|err| Error::Config(format!("invalid server URL {server:?}: {err}")))?;
    let scheme = if base.scheme() == "https" { "wss" } else { "ws" };
    base.set_scheme(scheme)
        .map_err(|()| Error::Config(format!("cannot derive a live URL from {server}")))?;
    let base = base.as_str().trim_end_matches('/').to_string();

    match advertised.map(str::trim).filter(|url| !url.is_empty()) {
        Some(url) if url.starts_with("ws://") || url.starts_with("wss://") => Ok(url.to_string()),
        Some(path) if path.starts_with('/') => Ok(format!("{base}{path}")),
        _ => Ok(format!("{base}{DEFAULT_LIVE_PATH}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins() {
        let url = resolve_live_url(
            Some("ws://elsewhere:1/ws"),
            Some("wss://advertised/ws"),
            "http://localhost:5173",
        )
        .unwrap();
        assert_eq!(url, "ws://elsewhere:1/ws");
    }

    #[test]
    fn test_absolute_advertised_endpoint_is_used_as_is() {
        let url = resolve_live_url(None, Some("wss://live.example/socket"), "http://x").unwrap();
        assert_eq!(url, "wss://live.example/socket");
    }

    #[test]
    fn test_relative_advertised_endpoint_joins_server() {
        let url = resolve_live_url(None, Some("/api/world/ws"), "https://foundry.example").unwrap();
        assert_eq!(url, "wss://foundry.example/api/world/ws");
    }

    #[test]
    fn test_default_path_from_server() {
        let url = resolve_live_url(None, None, "http://localhost:5173").unwrap();
        assert_eq!(url, "ws://localhost:5173/api/world/ws");

        let url = resolve_live_url(Some("  "), Some(""), "http://host/prefix/").unwrap();
        assert_eq!(url, "ws://host/prefix/api/world/ws");
    }

    #[test]
    fn test_bad_server_is_config_error() {
        assert!(matches!(
            resolve_live_url(None, None, "localhost"),
            Err(Error::Config(_))
        ));
    }
}
