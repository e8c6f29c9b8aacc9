//! Error handling for the sitesched client

use std::fmt;
use thiserror::Error;

/// Unified error type for the sitesched client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Record-store errors
    #[error("Store error: {0}")]
    Store(#[from] sitesched_recordstore::RecordStoreError),

    /// Schedule consistency errors
    #[error("Schedule error: {0}")]
    Schedule(String),

    /// Viewer host errors
    #[error("Viewer error: {0}")]
    Viewer(String),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// General errors
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Create a new schedule error
    pub fn schedule<T: fmt::Display>(msg: T) -> Self {
        Error::Schedule(msg.to_string())
    }

    /// Create a new viewer error
    pub fn viewer<T: fmt::Display>(msg: T) -> Self {
        Error::Viewer(msg.to_string())
    }

    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }
}
