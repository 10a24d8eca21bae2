//! Session core: lifecycle, live channel ownership and action dispatch.
//!
//! Phases move `Unregistered -> Registered -> Authenticated -> LiveConnected`.
//! `LiveUnavailable` is the degraded state reached when the live channel cannot
//! be opened or drops; every request/response call still works there.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use lobster_core::api::{
    ApiClient, AuthResponse, RegisterRequest, RegisterResponse, StatusResponse, TaskResponse,
};
use lobster_core::config::Config;
use lobster_core::credentials::{CredentialStore, Identity, generate_public_key};
use lobster_core::{Error, Result};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::channel::{LiveLink, resolve_live_url};
use crate::events::SessionEvent;
use crate::frames::{Action, InteractTarget, Outbound};
use crate::mirror::Mirror;

mod bootstrap;
mod shared;

pub use bootstrap::{BootstrapReport, TutorialOutcome};
pub(crate) use shared::Shared;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unregistered,
    Registered,
    Authenticated,
    LiveConnected,
    LiveUnavailable,
}

impl Phase {
    /// Whether REST authentication has succeeded in this process.
    pub fn is_authenticated(self) -> bool {
        matches!(
            self,
            Phase::Authenticated | Phase::LiveConnected | Phase::LiveUnavailable
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Unregistered => "unregistered",
            Phase::Registered => "registered",
            Phase::Authenticated => "authenticated",
            Phase::LiveConnected => "live",
            Phase::LiveUnavailable => "live unavailable",
        })
    }
}

/// One agent session. Owns the identity, the REST client and at most one live channel.
pub struct Session {
    config: Config,
    store: CredentialStore,
    api: ApiClient,
    identity: Option<Identity>,
    shared: Arc<Shared>,
    link: Option<LiveLink>,
    permissions: Vec<String>,
    live_endpoint: Option<String>,
    authenticated_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("phase", &self.phase())
            .field("server", &self.api.base_url())
            .field("bot_id", &self.identity.as_ref().map(|id| id.bot_id.as_str()))
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(config: Config, store: CredentialStore) -> Result<Self> {
        let api = ApiClient::new(&config.resolve_server(None), config.request_timeout())?;
        Ok(Self {
            config,
            store,
            api,
            identity: None,
            shared: Arc::new(Shared::new(Phase::Unregistered)),
            link: None,
            permissions: Vec::new(),
            live_endpoint: None,
            authenticated_at: None,
        })
    }

    /// Builds a session and loads any stored identity.
    pub fn open(config: Config, store: CredentialStore) -> Result<Self> {
        let mut session = Self::new(config, store)?;
        session.load_identity()?;
        Ok(session)
    }

    /// Loads the stored identity, if any, and points the REST client at its server.
    pub fn load_identity(&mut self) -> Result<Option<&Identity>> {
        let Some(identity) = self.store.load()? else {
            return Ok(None);
        };
        let server = self.config.resolve_server(Some(&identity.server));
        self.api = ApiClient::new(&server, self.config.request_timeout())?
            .with_api_key(identity.api_key.clone());
        if self.phase() == Phase::Unregistered {
            self.shared.set_phase(Phase::Registered);
        }
        debug!(bot_id = %identity.bot_id, %server, "identity loaded");
        self.identity = Some(identity);
        Ok(self.identity.as_ref())
    }

    /// Registers a new bot and persists its identity, replacing any previous one.
    pub async fn register(&mut self, name: &str) -> Result<RegisterResponse> {
        let request = RegisterRequest {
            agent_type: self.config.agent_type.clone(),
            agent_version: self.config.agent_version.clone(),
            public_key: generate_public_key(),
            requested_name: name.to_string(),
        };
        let response = self.api.register(&request).await.map_err(|err| match err {
            Error::Server { message, .. } => Error::Registration(message),
            other => other,
        })?;

        let identity = Identity::new(
            response.api_key.clone(),
            response.bot_id.clone(),
            response.signer_id.clone(),
            name.to_string(),
            self.api.base_url().to_string(),
        );
        self.store.save(&identity)?;

        self.link = None;
        self.permissions.clear();
        self.live_endpoint = None;
        self.authenticated_at = None;
        self.api = self.api.clone().with_api_key(identity.api_key.clone());
        self.shared.set_phase(Phase::Registered);
        info!(bot_id = %identity.bot_id, signer_id = %identity.signer_id, "registered");
        self.identity = Some(identity);
        Ok(response)
    }

    /// Presents the stored API key. The assigned avatar seeds the mirror unless a
    /// live channel owns it.
    pub async fn authenticate(&mut self) -> Result<AuthResponse> {
        if self.identity.is_none() {
            return Err(Error::NotRegistered);
        }
        let auth = self.api.authenticate().await.map_err(|err| match err {
            Error::Server { message, .. } => Error::Authentication(message),
            other => other,
        })?;

        if !self.has_open_link() {
            let avatar = auth.assigned_avatar.clone();
            self.shared.update_mirror(|mirror| {
                mirror.avatar = avatar;
                true
            });
        }
        self.permissions.clone_from(&auth.permissions);
        self.live_endpoint.clone_from(&auth.ws_endpoint);
        self.authenticated_at = Some(Utc::now());
        if self.link.is_none() {
            self.shared.set_phase(Phase::Authenticated);
        }
        info!(bot_id = %auth.bot_id, "authenticated");
        Ok(auth)
    }

    /// Opens the live channel and waits for the server's verdict on `BOT_AUTH`.
    ///
    /// On any failure the channel is torn down and the session is left in
    /// [`Phase::LiveUnavailable`].
    pub async fn connect_live(&mut self) -> Result<()> {
        let identity = self.identity.as_ref().ok_or(Error::NotRegistered)?;
        if self.authenticated_at.is_none() {
            return Err(Error::NotAuthenticated);
        }
        if self.is_live() {
            return Ok(());
        }
        let auth = Outbound::BotAuth {
            bot_id: identity.bot_id.clone(),
            token: identity.api_key.clone(),
        };

        self.link = None;
        self.shared.take_rejection();
        self.shared.set_phase(Phase::Authenticated);

        let result = match self.live_url() {
            Ok(url) => match LiveLink::open(&url, &auth, Arc::clone(&self.shared)).await {
                Ok(link) => self.await_handshake(&link).await.map(|()| link),
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };

        match result {
            Ok(link) => {
                self.link = Some(link);
                Ok(())
            }
            Err(err) => {
                self.shared.set_phase(Phase::LiveUnavailable);
                warn!(error = %err, "live channel unavailable");
                Err(err)
            }
        }
    }

    async fn await_handshake(&self, link: &LiveLink) -> Result<()> {
        let timeout = self.config.handshake_timeout();
        let deadline = Instant::now() + timeout;
        loop {
            match self.shared.phase() {
                Phase::LiveConnected => return Ok(()),
                Phase::LiveUnavailable => {
                    let reason = self
                        .shared
                        .take_rejection()
                        .unwrap_or_else(|| "unknown reason".to_string());
                    return Err(Error::Channel(format!("live authentication rejected: {reason}")));
                }
                _ => {}
            }
            if link.is_closed() {
                return Err(Error::Channel(
                    "live channel closed during handshake".to_string(),
                ));
            }
            if Instant::now() >= deadline {
                return Err(Error::Channel(format!(
                    "no answer to BOT_AUTH within {} ms",
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(self.config.handshake_poll()).await;
        }
    }

    /// Closes the live channel, if any. Always succeeds.
    pub fn disconnect(&mut self) {
        if self.link.take().is_some() {
            info!("live channel disconnected");
        }
        if matches!(self.phase(), Phase::LiveConnected | Phase::LiveUnavailable) {
            self.shared.set_phase(Phase::Authenticated);
        }
    }

    pub fn move_to(&self, x: i64, y: i64) -> Result<()> {
        self.dispatch(Action::Move { x, y })
    }

    pub fn interact(&self, target: InteractTarget) -> Result<()> {
        self.dispatch(Action::Interact(target))
    }

    pub fn read_notices(&self) -> Result<()> {
        self.dispatch(Action::ReadNotices)
    }

    pub fn accept_quest(&self, quest_id: &str) -> Result<()> {
        self.dispatch(Action::AcceptQuest(quest_id.to_string()))
    }

    pub fn celebrate(&self) -> Result<()> {
        self.dispatch(Action::Celebrate)
    }

    /// Queues an action without waiting for its result.
    fn dispatch(&self, action: Action) -> Result<()> {
        if self.phase() != Phase::LiveConnected {
            return Err(Error::NotConnected);
        }
        let link = self
            .link
            .as_ref()
            .filter(|link| !link.is_closed())
            .ok_or(Error::NotConnected)?;
        debug!(action = ?action.kind(), "queueing action");
        link.send(&action.into_frame())
    }

    /// Fetches status over REST. Seeds the mirror unless a live channel owns it.
    pub async fn refresh_status(&self) -> Result<StatusResponse> {
        if self.identity.is_none() {
            return Err(Error::NotRegistered);
        }
        let status = self.api.status().await?;
        if !self.has_open_link() {
            self.shared.update_mirror(|mirror| {
                mirror.seed_from_status(&status);
                true
            });
        }
        Ok(status)
    }

    pub async fn complete_task(&self, task_id: &str) -> Result<TaskResponse> {
        self.api.complete_task(task_id).await
    }

    /// Endpoint the live channel connects to.
    pub fn live_url(&self) -> Result<String> {
        resolve_live_url(
            self.config.ws_url.as_deref(),
            self.live_endpoint.as_deref(),
            self.api.base_url(),
        )
    }

    fn has_open_link(&self) -> bool {
        self.link.as_ref().is_some_and(|link| !link.is_closed())
    }

    pub fn phase(&self) -> Phase {
        self.shared.phase()
    }

    pub fn is_live(&self) -> bool {
        self.phase() == Phase::LiveConnected && self.has_open_link()
    }

    /// Snapshot of the mirror.
    pub fn mirror(&self) -> Mirror {
        self.shared.mirror.borrow().clone()
    }

    pub fn watch_mirror(&self) -> watch::Receiver<Mirror> {
        self.shared.mirror.subscribe()
    }

    pub fn watch_phase(&self) -> watch::Receiver<Phase> {
        self.shared.phase.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    pub fn authenticated_at(&self) -> Option<DateTime<Utc>> {
        self.authenticated_at
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn offline_session(dir: &std::path::Path) -> Session {
        let config = Config {
            server: Some("http://127.0.0.1:9".to_string()),
            ..Config::default()
        };
        Session::new(config, CredentialStore::new(dir.join("credentials.json"))).unwrap()
    }

    #[test]
    fn test_new_session_is_unregistered_and_not_live() {
        let dir = tempdir().unwrap();
        let session = offline_session(dir.path());
        assert_eq!(session.phase(), Phase::Unregistered);
        assert!(!session.is_live());
        assert!(session.identity().is_none());
    }

    #[test]
    fn test_actions_without_channel_are_not_connected() {
        let dir = tempdir().unwrap();
        let session = offline_session(dir.path());
        assert!(matches!(session.move_to(1, 2), Err(Error::NotConnected)));
        assert!(matches!(session.celebrate(), Err(Error::NotConnected)));
        assert!(matches!(session.read_notices(), Err(Error::NotConnected)));
        assert!(matches!(session.accept_quest("q"), Err(Error::NotConnected)));
        assert!(matches!(
            session.interact(InteractTarget::Stall("forge_stall".to_string())),
            Err(Error::NotConnected)
        ));
    }

    #[test]
    fn test_disconnect_without_channel_is_noop() {
        let dir = tempdir().unwrap();
        let mut session = offline_session(dir.path());
        session.disconnect();
        session.disconnect();
        assert_eq!(session.phase(), Phase::Unregistered);
    }

    #[test]
    fn test_load_identity_moves_to_registered() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.json"));
        store
            .save(&Identity::new(
                "key".to_string(),
                "bot_1".to_string(),
                "Pax#1".to_string(),
                "Pax".to_string(),
                "http://stored:7000".to_string(),
            ))
            .unwrap();

        let session = Session::open(Config::default(), store).unwrap();
        assert_eq!(session.phase(), Phase::Registered);
        assert_eq!(session.api().base_url(), "http://stored:7000");
        assert!(session.api().has_api_key());
        assert_eq!(
            session.live_url().unwrap(),
            "ws://stored:7000/api/world/ws"
        );
    }

    #[tokio::test]
    async fn test_connect_live_requires_registration_then_authentication() {
        let dir = tempdir().unwrap();
        let mut session = offline_session(dir.path());
        assert!(matches!(
            session.connect_live().await,
            Err(Error::NotRegistered)
        ));
        assert!(matches!(
            session.authenticate().await,
            Err(Error::NotRegistered)
        ));

        CredentialStore::new(dir.path().join("credentials.json"))
            .save(&Identity::new(
                "key".to_string(),
                "bot_1".to_string(),
                "Pax#1".to_string(),
                "Pax".to_string(),
                "http://127.0.0.1:9".to_string(),
            ))
            .unwrap();
        session.load_identity().unwrap();
        assert!(matches!(
            session.connect_live().await,
            Err(Error::NotAuthenticated)
        ));
        assert_eq!(session.phase(), Phase::Registered);
    }
}
