//! CLI command handlers.

use anyhow::{Context, Result};
use lobster_agent::Session;
use lobster_core::Error;
use lobster_core::config::{Config, paths};
use lobster_core::credentials::CredentialStore;

pub mod account;
pub mod config;
pub mod live;
pub mod trade;
pub mod verify;
pub mod world;

/// Session backed by the default credential file, with any stored identity loaded.
fn open_session(config: Config) -> Result<Session> {
    let store = CredentialStore::new(paths::credentials_path());
    Session::open(config, store).context("open session")
}

/// Like [`open_session`], but fails when no identity has been saved yet.
fn registered_session(config: Config) -> Result<Session> {
    let session = open_session(config)?;
    if session.identity().is_none() {
        return Err(Error::NotRegistered.into());
    }
    Ok(session)
}
