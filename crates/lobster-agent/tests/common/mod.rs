//! Local world server fixtures: a scripted live socket and REST mocks.

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use lobster_agent::{Phase, Session};
use lobster_core::config::Config;
use lobster_core::credentials::{CredentialStore, Identity};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const BOT_ID: &str = "bot_test";
pub const API_KEY: &str = "lf_test_key";

pub fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

/// How the socket answers the first frame.
pub enum Greeting {
    Accept(Value),
    Reject(&'static str),
    Silent,
    Hangup,
}

/// Things the test can make the socket do after the greeting.
pub enum Push {
    Frame(Value),
    Raw(String),
    Close,
}

pub struct WorldSocket {
    pub url: String,
    pub received: mpsc::UnboundedReceiver<Value>,
    pub push: mpsc::UnboundedSender<Push>,
}

impl WorldSocket {
    /// Next frame the agent sent, failing the test after two seconds.
    pub async fn next_frame(&mut self) -> Value {
        tokio::time::timeout(Duration::from_secs(2), self.received.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket task ended")
    }

    pub fn send(&self, frame: Value) {
        self.push.send(Push::Frame(frame)).expect("socket task ended");
    }
}

pub fn auth_success() -> Value {
    json!({
        "type": "AUTH_SUCCESS",
        "avatar": {"name": "Pax", "x": 10, "y": 5, "state": "idle"},
        "wallet": {"cc": 25, "tokens": {"ore": 3}},
        "license": {"tier": "CITIZEN", "school": null}
    })
}

/// Serves exactly one live connection on an ephemeral port.
pub async fn spawn_world_socket(greeting: Greeting) -> WorldSocket {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/api/world/ws", listener.local_addr().unwrap());
    let (received_tx, received) = mpsc::unbounded_channel();
    let (push, mut push_rx) = mpsc::unbounded_channel::<Push>();

    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let Ok(mut ws) = accept_async(stream).await else {
            return;
        };
        let Some(Ok(Message::Text(text))) = ws.next().await else {
            return;
        };
        let _ = received_tx.send(serde_json::from_str(&text).unwrap_or(Value::Null));

        match greeting {
            Greeting::Accept(frame) => {
                let _ = ws.send(Message::Text(frame.to_string())).await;
            }
            Greeting::Reject(reason) => {
                let frame = json!({"type": "AUTH_FAILED", "error": reason});
                let _ = ws.send(Message::Text(frame.to_string())).await;
            }
            Greeting::Silent => {}
            Greeting::Hangup => {
                let _ = ws.close(None).await;
                return;
            }
        }

        loop {
            tokio::select! {
                command = push_rx.recv() => match command {
                    Some(Push::Frame(frame)) => {
                        let _ = ws.send(Message::Text(frame.to_string())).await;
                    }
                    Some(Push::Raw(text)) => {
                        let _ = ws.send(Message::Text(text)).await;
                    }
                    Some(Push::Close) | None => {
                        let _ = ws.close(None).await;
                        break;
                    }
                },
                incoming = ws.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let _ = received_tx.send(serde_json::from_str(&text).unwrap_or(Value::Null));
                    }
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => {}
                },
            }
        }
    });

    WorldSocket {
        url,
        received,
        push,
    }
}

/// A port with nothing listening on it.
pub fn refused_ws_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("ws://127.0.0.1:{port}/api/world/ws")
}

pub async fn mount_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/world/bot/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "botId": BOT_ID,
            "assignedAvatar": {"name": "Pax", "x": 1, "y": 1, "state": "idle"},
            "permissions": ["move", "interact"],
            "wsEndpoint": "/api/world/ws"
        })))
        .mount(server)
        .await;
}

pub fn status_body(tier: &str, cc: i64) -> Value {
    json!({
        "ok": true,
        "bot_id": BOT_ID,
        "registered": true,
        "connected": true,
        "license": {"tier": tier, "school": null},
        "avatar": {"name": "Pax", "x": 1, "y": 1, "state": "idle"},
        "wallet": {"cc": cc, "tokens": {"ore": 0}}
    })
}

pub async fn mount_status(server: &MockServer, tier: &str, cc: i64) {
    Mock::given(method("GET"))
        .and(path("/api/world/bot/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(tier, cc)))
        .mount(server)
        .await;
}

pub fn test_config(rest: &MockServer, ws_url: Option<&str>) -> Config {
    Config {
        server: Some(rest.uri()),
        ws_url: ws_url.map(str::to_string),
        handshake_timeout_ms: 500,
        handshake_poll_ms: 20,
        action_pacing_ms: 10,
        ..Config::default()
    }
}

pub fn store_identity(home: &Path) -> CredentialStore {
    let store = CredentialStore::new(home.join("credentials.json"));
    store
        .save(&Identity::new(
            API_KEY.to_string(),
            BOT_ID.to_string(),
            "Pax#0001".to_string(),
            "Pax".to_string(),
            "http://unused.invalid".to_string(),
        ))
        .unwrap();
    store
}

/// A registered session that has already authenticated over REST.
pub async fn authenticated_session(rest: &MockServer, ws_url: Option<&str>, home: &Path) -> Session {
    mount_auth(rest).await;
    let mut session = Session::open(test_config(rest, ws_url), store_identity(home)).unwrap();
    session.authenticate().await.unwrap();
    assert_eq!(session.phase(), Phase::Authenticated);
    session
}

pub async fn wait_for_phase(session: &Session, phase: Phase) {
    let mut watcher = session.watch_phase();
    tokio::time::timeout(Duration::from_secs(2), watcher.wait_for(|current| *current == phase))
        .await
        .expect("timed out waiting for phase")
        .expect("phase channel closed");
}
