//! Bot identity storage and retrieval.
//!
//! Stores the identity in `<base>/credentials.json` with restricted permissions (0600).
//! The API key is never logged or displayed in full.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::paths;
use crate::error::{Error, Result};

/// Durable bot credential set, created once by registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub api_key: String,
    pub bot_id: String,
    pub signer_id: String,
    pub name: String,
    pub server: String,
    /// Seconds since the Unix epoch.
    pub registered_at: f64,
}

impl Identity {
    /// Builds an identity stamped with the current time.
    pub fn new(
        api_key: String,
        bot_id: String,
        signer_id: String,
        name: String,
        server: String,
    ) -> Self {
        let registered_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        Self {
            api_key,
            bot_id,
            signer_id,
            name,
            server,
            registered_at,
        }
    }

    pub fn registered_at_utc(&self) -> Option<DateTime<Utc>> {
        let secs = self.registered_at.trunc() as i64;
        let nanos = (self.registered_at.fract() * 1e9) as u32;
        DateTime::from_timestamp(secs, nanos)
    }

    /// API key with everything but the last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 4 {
            return "****".to_string();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{tail}")
    }
}

/// Generates a fresh 32-byte public key, hex encoded.
pub fn generate_public_key() -> String {
    // Two v4 UUIDs give 32 random bytes.
    let first = uuid::Uuid::new_v4();
    let second = uuid::Uuid::new_v4();
    first
        .as_bytes()
        .iter()
        .chain(second.as_bytes())
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Passive durable backing for the identity.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new(paths::credentials_path())
    }
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the identity from disk.
    /// Returns `None` if nothing has been stored yet.
    pub fn load(&self) -> Result<Option<Identity>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path).map_err(|source| Error::Credentials {
            path: self.path.clone(),
            source,
        })?;

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| Error::CredentialsFormat {
                path: self.path.clone(),
                source,
            })
    }

    /// Saves the identity with restricted permissions (0600), replacing any previous one.
    ///
    /// Writes to a sibling temp file first, then renames it into place.
    pub fn save(&self, identity: &Identity) -> Result<()> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| Error::Credentials { path, source }
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        let contents = serde_json::to_string_pretty(identity).map_err(|source| {
            Error::CredentialsFormat {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&tmp_path).map_err(io_err(&tmp_path))?;
        file.write_all(contents.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(io_err(&tmp_path))?;
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(io_err(&self.path))?;
        tracing::debug!(path = %self.path.display(), bot_id = %identity.bot_id, "identity saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn sample() -> Identity {
        Identity {
            api_key: "lf_key_0123456789abcdef".to_string(),
            bot_id: "bot_42".to_string(),
            signer_id: "PaxAgent#0042".to_string(),
            name: "PaxAgent".to_string(),
            server: "http://localhost:5173".to_string(),
            registered_at: 1_738_000_000.125,
        }
    }

    #[test]
    fn test_load_missing_returns_none() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_round_trip_preserves_key_and_bot_id() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");
        CredentialStore::new(&path).save(&sample()).unwrap();

        // fresh store instance, as a new process would build
        let loaded = CredentialStore::new(&path).load().unwrap().unwrap();
        assert_eq!(loaded.api_key.as_bytes(), sample().api_key.as_bytes());
        assert_eq!(loaded.bot_id.as_bytes(), sample().bot_id.as_bytes());
        assert_eq!(loaded, sample());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_uses_wire_field_names() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.json"));
        store.save(&sample()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        for key in ["api_key", "bot_id", "signer_id", "name", "server", "registered_at"] {
            assert!(raw.get(key).is_some(), "missing {key}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.json"));
        store.save(&sample()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_save_replaces_previous_identity() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.json"));
        store.save(&sample()).unwrap();

        let mut replacement = sample();
        replacement.bot_id = "bot_43".to_string();
        store.save(&replacement).unwrap();

        assert_eq!(store.load().unwrap().unwrap().bot_id, "bot_43");
    }

    #[test]
    fn test_corrupt_file_is_format_error() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.json"));
        fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(
            store.load(),
            Err(Error::CredentialsFormat { .. })
        ));
    }

    #[test]
    fn test_generate_public_key_is_64_hex_chars() {
        let key = generate_public_key();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, generate_public_key());
    }

    #[test]
    fn test_registered_at_converts_to_utc() {
        let at = sample().registered_at_utc().unwrap();
        assert_eq!(at.timestamp(), 1_738_000_000);
    }

    #[test]
    fn test_masked_api_key_keeps_tail() {
        assert_eq!(sample().masked_api_key(), "****cdef");
    }
}
