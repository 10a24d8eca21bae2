//! Request/response client for the world service.
//!
//! Every endpoint answers with a JSON envelope carrying an `ok` flag. A not-ok
//! envelope (or a non-JSON error page) becomes [`Error::Server`]; the typed
//! fields of an ok envelope are decoded into the call's response type.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use url::Url;

use crate::error::{Error, Result};

mod types;

pub use types::{
    Artifact, ArtifactKind, ArtifactSpec, AuthResponse, BasicTask, BotStats, CraftResponse,
    EconomyResponse, ImprovementRequest, ImprovementResponse, LicenseRequirement, Quest, QuestFilter, QuestsResponse, Recipe, RegisterRequest,
    RegisterResponse, SkillInstructions, Stall, StallCost, StallInfo, StallsResponse,
    StampDecision, StatusResponse, SubmitRequest, SubmitResponse, TaskResponse, UpgradeResponse,
    VerificationJob, WalletResponse, WalletStats, WorldStateResponse, value_label,
};

pub const USER_AGENT: &str = concat!("lobster/", env!("CARGO_PKG_VERSION"));

/// Thin HTTP client bound to one server and, optionally, one API key.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|err| Error::Config(format!("invalid server URL {base_url:?}: {err}")))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| Error::Transport {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self {
            http,
            base_url,
            api_key: None,
        })
    }

    /// Same client, presenting `api_key` as a bearer token.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse> {
        self.post("/api/world/bot/register", request).await
    }

    /// Exchanges the stored API key for an avatar assignment and live endpoint.
    pub async fn authenticate(&self) -> Result<AuthResponse> {
        let token = self.api_key.as_deref().ok_or(Error::NotRegistered)?;
        self.post("/api/world/bot/auth", &json!({ "token": token }))
            .await
    }

    pub async fn status(&self) -> Result<StatusResponse> {
        self.get("/api/world/bot/status").await
    }

    pub async fn stalls(&self) -> Result<StallsResponse> {
        self.get("/api/world/stalls").await
    }

    pub async fn stall(&self, stall_id: &str) -> Result<StallInfo> {
        let path = segment_path("/api/world/stall", stall_id)?;
        self.get(&path).await
    }

    pub async fn quests(&self, filter: &QuestFilter) -> Result<QuestsResponse> {
        let path = "/api/world/quests";
        let request = self.request(Method::GET, path).query(filter);
        self.send(path, request).await
    }

    pub async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse> {
        self.post("/api/world/submit", request).await
    }

    /// Proposes a change to a stall's skill instructions.
    pub async fn submit_improvement(
        &self,
        request: &ImprovementRequest,
    ) -> Result<ImprovementResponse> {
        self.post("/api/skills/improvement", request).await
    }

    pub async fn world_state(&self) -> Result<WorldStateResponse> {
        self.get("/api/world/state").await
    }

    pub async fn wallet(&self) -> Result<WalletResponse> {
        self.get("/api/world/wallet").await
    }

    pub async fn complete_task(&self, task_id: &str) -> Result<TaskResponse> {
        self.post("/api/world/task", &json!({ "task_id": task_id }))
            .await
    }

    pub async fn craft(&self, recipe_id: &str) -> Result<CraftResponse> {
        self.post("/api/world/craft", &json!({ "recipe_id": recipe_id }))
            .await
    }

    pub async fn upgrade_license(
        &self,
        target_license: &str,
        school: Option<&str>,
    ) -> Result<UpgradeResponse> {
        let mut body = json!({ "target_license": target_license });
        if let Some(school) = school {
            body["school"] = Value::from(school);
        }
        self.post("/api/world/upgrade-license", &body).await
    }

    pub async fn economy(&self) -> Result<EconomyResponse> {
        self.get("/api/world/economy").await
    }

    pub async fn accept_verification(&self, job_id: &str) -> Result<Value> {
        self.post("/api/world/verification/accept", &json!({ "job_id": job_id }))
            .await
    }

    pub async fn submit_stamp(
        &self,
        job_id: &str,
        decision: StampDecision,
        evidence: Value,
    ) -> Result<Value> {
        let body = json!({
            "job_id": job_id,
            "decision": decision,
            "evidence": evidence,
        });
        self.post("/api/world/verification/stamp", &body).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.request(Method::GET, path);
        self.send(path, request).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.request(Method::POST, path).json(body);
        self.send(path, request).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self
            .http
            .request(method, format!("{}{path}", self.base_url));
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let response = request.send().await.map_err(|source| Error::Transport {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| Error::Transport { url, source })?;
        tracing::debug!(path, status = status.as_u16(), "response received");

        let envelope = parse_envelope(path, status, &body)?;
        serde_json::from_value(envelope).map_err(|source| Error::Decode {
            path: path.to_string(),
            source,
        })
    }
}

/// Appends `segment` to `prefix` as a single percent-encoded path segment.
fn segment_path(prefix: &str, segment: &str) -> Result<String> {
    let mut url = Url::parse(&format!("http://localhost{prefix}"))
        .map_err(|err| Error::Config(format!("invalid path {prefix:?}: {err}")))?;
    url.path_segments_mut()
        .map_err(|()| Error::Config(format!("invalid path {prefix:?}")))?
        .push(segment);
    Ok(url.path().to_string())
}

/// Splits a raw response into an ok envelope or a server error.
fn parse_envelope(path: &str, status: StatusCode, body: &str) -> Result<Value> {
    let payload = match serde_json::from_str::<Value>(body) {
        Ok(payload) => payload,
        Err(source) if status.is_success() => {
            return Err(Error::Decode {
                path: path.to_string(),
                source,
            });
        }
        Err(_) => {
            return Err(Error::Server {
                status: status.as_u16(),
                message: format!("HTTP {}: {}", status.as_u16(), body.trim()),
                payload: Value::Null,
            });
        }
    };

    let ok = payload
        .get("ok")
        .and_then(Value::as_bool)
        .unwrap_or_else(|| status.is_success());
    if ok {
        return Ok(payload);
    }

    let message = ["message", "error"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str))
        .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_string);
    Err(Error::Server {
        status: status.as_u16(),
        message,
        payload,
    })
}
