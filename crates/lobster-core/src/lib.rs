//! Core LobsterFoundry client library (config, credentials, REST transport).

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod world;

pub use error::{Error, Result};
