//! Error taxonomy shared by the transport, the credential store and the session core.

use std::io;
use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Network failure, timeout or refused connection at the HTTP layer.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered but reported a not-ok business result.
    #[error("{message}")]
    Server {
        status: u16,
        message: String,
        /// Full response envelope, kept for callers that want extra fields.
        payload: Value,
    },

    #[error("unexpected response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("registration failed: {0}")]
    Registration(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("not registered (run `lobster register --name <NAME>` first)")]
    NotRegistered,

    #[error("session is not authenticated")]
    NotAuthenticated,

    #[error("not connected: real-time actions need a live channel")]
    NotConnected,

    #[error("live channel error: {0}")]
    Channel(String),

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("credential store error at {path}: {source}")]
    Credentials {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("credential file {path} is invalid: {source}")]
    CredentialsFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Server-supplied list under `key`, if the not-ok envelope carried one.
    pub fn payload_strings(&self, key: &str) -> Vec<String> {
        let Error::Server { payload, .. } = self else {
            return Vec::new();
        };
        payload
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}
