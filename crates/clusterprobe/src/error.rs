//! Error types for probe registration and probe cycles.

use std::time::Duration;
use thiserror::Error;

/// Rejected registration input. Raised synchronously when a probe target
/// cannot be turned into a [`crate::location::Location`] or a working probe.
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("probe target `{uri}` is not a valid URL: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("hostname `{host}` does not match service.partition.namespace.datacenter")]
    MalformedHost { host: String },

    #[error("failed to build probe HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Outcome of a single probe cycle that did not succeed.
///
/// Most variants are routine operational noise and end up as a failed sample
/// in the probe's history. `Unresolved` means the registration itself is
/// broken and must never be recorded as a sample.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("unexpected status {0}")]
    Status(u16),

    #[error("transport error after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),

    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("hostname `{0}` did not resolve")]
    Unresolved(String),
}

impl CheckError {
    /// True for errors that indicate a broken registration rather than a
    /// flaky endpoint. Fatal errors are logged and skipped, not recorded.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CheckError::Unresolved(_))
    }
}
