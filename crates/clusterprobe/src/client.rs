//! HTTP probing client with a bounded retry budget.

use crate::error::{CheckError, RegisterError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Determines endpoint health with a single logical GET.
#[async_trait]
pub trait HttpHealth: Send + Sync {
    /// Probe the target once. `Ok` means the endpoint answered 200.
    async fn probe(&self, target: &Url) -> Result<(), CheckError>;
}

/// Retry and timeout budget for [`HttpProbeClient`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Upper bound on one attempt.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Attempts allowed per logical probe before the failure is surfaced.
    pub max_attempts: u32,

    /// Wall-clock ceiling from the first attempt; once exceeded no further
    /// retries are made even if attempts remain.
    #[serde(with = "humantime_serde")]
    pub retry_deadline: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            max_attempts: 6,
            retry_deadline: Duration::from_secs(10),
        }
    }
}

/// Shared probing client.
///
/// All probes in the process share one connection pool. Server certificates
/// are accepted unconditionally: the targets are internal cluster endpoints
/// carrying certificates the prober has no trust chain for.
#[derive(Debug, Clone)]
pub struct HttpProbeClient {
    client: reqwest::Client,
    settings: ClientSettings,
}

impl HttpProbeClient {
    pub fn new(settings: ClientSettings) -> Result<Self, RegisterError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self { client, settings })
    }
}

#[async_trait]
impl HttpHealth for HttpProbeClient {
    async fn probe(&self, target: &Url) -> Result<(), CheckError> {
        let started = Instant::now();
        let mut attempts = 0;

        loop {
            attempts += 1;
            match self.client.get(target.clone()).send().await {
                Ok(response) if response.status() == StatusCode::OK => return Ok(()),
                // Non-200 is an answer, not a transport hiccup. No retry.
                Ok(response) => return Err(CheckError::Status(response.status().as_u16())),
                Err(source) => {
                    if attempts >= self.settings.max_attempts
                        || started.elapsed() >= self.settings.retry_deadline
                    {
                        return Err(CheckError::Transport { attempts, source });
                    }
                    debug!(target = %target, attempts, error = %source, "retrying probe");
                }
            }
        }
    }
}
