//! Per-endpoint probe entity and its scheduled check cycles.

use crate::client::HttpHealth;
use crate::error::RegisterError;
use crate::history::History;
use crate::latency;
use crate::location::Location;
use crate::metrics::ProbeMetrics;
use crate::tcp;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use url::Url;

/// TCP reachability is always checked against the standard TLS port,
/// independent of any port in the probe URL.
const TCP_PROBE_PORT: u16 = 443;

/// The TCP window is sized for roughly a hundred seconds of cadence.
const TCP_HISTORY_SIZE: usize = 1000;

/// Small offset between the two cycles of one probe so registration bursts do
/// not fire every HTTP check at the same instant.
const START_STAGGER: Duration = Duration::from_millis(50);

/// Tunables shared by every probe built from one registry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeSettings {
    /// Capacity of the HTTP outcome window.
    pub http_history_size: usize,

    /// Fixed delay between consecutive cycles of each check.
    #[serde(with = "humantime_serde")]
    pub check_delay: Duration,

    /// Bound on one TCP connect attempt.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            http_history_size: 100_000,
            check_delay: Duration::from_millis(100),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Point-in-time health snapshot of one probe. Later probe activity never
/// mutates a snapshot already handed out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    /// The registered probe URI.
    pub cluster: String,

    pub http_samples: usize,
    pub http_failures: usize,

    /// Approximate span of the TCP window: sample count times the smoothed
    /// cycle duration.
    #[serde(with = "humantime_serde")]
    pub window: Duration,

    pub tcp_samples: usize,
    pub tcp_failures: usize,

    /// Fraction of TCP samples in the window that failed; 0 when the window
    /// is empty.
    pub error_rate: f64,
}

struct ProbeState {
    http: History,
    tcp: History,
    /// Smoothed TCP cycle duration, zero until the first sample.
    lap: Duration,
}

/// One registered endpoint: two bounded outcome histories, a smoothed RTT
/// estimate, and two periodic check tasks.
///
/// The scheduled tasks hold only a [`Weak`] reference, so a probe whose last
/// strong reference is dropped stops probing on its next cycle even if nobody
/// called [`Probe::stop`]. The directory remains the owning structure and
/// stops probes explicitly when they leave it.
pub struct Probe {
    target: Url,
    host: String,
    location: Location,
    client: Arc<dyn HttpHealth>,
    settings: ProbeSettings,
    metrics: Option<Arc<ProbeMetrics>>,
    state: Mutex<ProbeState>,
    cancel: CancellationToken,
    started: AtomicBool,
    /// Handed to the scheduled tasks so they never extend the probe's
    /// lifetime.
    weak_self: Weak<Probe>,
}

enum CycleKind {
    Http,
    Tcp,
}

impl Probe {
    pub fn new(
        target: Url,
        location: Location,
        client: Arc<dyn HttpHealth>,
        settings: ProbeSettings,
        metrics: Option<Arc<ProbeMetrics>>,
    ) -> Result<Arc<Self>, RegisterError> {
        let host = target
            .host_str()
            .ok_or_else(|| RegisterError::MalformedHost {
                host: target.to_string(),
            })?
            .to_string();

        Ok(Arc::new_cyclic(|weak_self| Self {
            target,
            host,
            location,
            client,
            settings,
            metrics,
            state: Mutex::new(ProbeState {
                http: History::new(settings.http_history_size),
                tcp: History::new(TCP_HISTORY_SIZE),
                lap: Duration::ZERO,
            }),
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
            weak_self: weak_self.clone(),
        }))
    }

    /// Spawn both periodic check tasks. A second call is a no-op.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        tokio::spawn(run_cycles(
            self.weak_self.clone(),
            self.cancel.clone(),
            START_STAGGER,
            CycleKind::Http,
        ));
        tokio::spawn(run_cycles(
            self.weak_self.clone(),
            self.cancel.clone(),
            Duration::ZERO,
            CycleKind::Tcp,
        ));
    }

    /// Cancel both periodic tasks. Idempotent; an in-flight attempt finishes
    /// naturally, no further cycles run afterwards. Safe on a probe that was
    /// never started.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// True from `start` until `stop` (or removal) cancels the tasks.
    pub fn is_active(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.cancel.is_cancelled()
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Immutable snapshot of the current histories and window estimate.
    pub fn health(&self) -> Health {
        let state = self.lock_state();
        let tcp_samples = state.tcp.samples();
        let tcp_failures = state.tcp.failures();
        let error_rate = if tcp_samples == 0 {
            0.0
        } else {
            tcp_failures as f64 / tcp_samples as f64
        };

        Health {
            cluster: self.target.to_string(),
            http_samples: state.http.samples(),
            http_failures: state.http.failures(),
            window: state.lap * tcp_samples as u32,
            tcp_samples,
            tcp_failures,
            error_rate,
        }
    }

    async fn run_http_cycle(&self) {
        match self.client.probe(&self.target).await {
            Ok(()) => self.record_http_sample(true),
            Err(err) if err.is_fatal() => {
                error!(target = %self.target, error = %err, "http probe hit a non-probe failure");
            }
            Err(err) => {
                debug!(target = %self.target, error = %err, "http probe failed");
                self.record_http_sample(false);
            }
        }
    }

    async fn run_tcp_cycle(&self) {
        let started = Instant::now();
        let outcome = tcp::connect(&self.host, TCP_PROBE_PORT, self.settings.connect_timeout).await;
        // The estimate approximates real cadence, so the pacing delay is part
        // of the measured cycle.
        let duration = started.elapsed() + self.settings.check_delay;

        match outcome {
            Ok(()) => self.record_tcp_sample(true, duration),
            Err(err) if err.is_fatal() => {
                error!(host = %self.host, error = %err, "tcp probe target is misconfigured");
            }
            Err(err) => {
                debug!(host = %self.host, error = %err, "tcp probe failed");
                self.record_tcp_sample(false, duration);
            }
        }
    }

    pub(crate) fn record_http_sample(&self, success: bool) {
        self.lock_state().http.record(success);
        if let Some(metrics) = &self.metrics {
            metrics.record_http(&self.location, success);
        }
    }

    pub(crate) fn record_tcp_sample(&self, success: bool, duration: Duration) {
        {
            let mut state = self.lock_state();
            state.tcp.record(success);
            let samples = state.tcp.samples();
            state.lap = latency::smooth(state.lap, duration, samples);
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_tcp(&self.location, success, duration);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ProbeState> {
        // The lock is only held for O(1) bookkeeping, never across awaits.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn run_cycles(
    probe: Weak<Probe>,
    cancel: CancellationToken,
    initial_delay: Duration,
    kind: CycleKind,
) {
    if !initial_delay.is_zero() {
        tokio::select! {
            _ = tokio::time::sleep(initial_delay) => {}
            _ = cancel.cancelled() => return,
        }
    }

    loop {
        // The probe may have been dropped without an explicit stop; the weak
        // reference is the cleanup of last resort.
        let Some(probe) = probe.upgrade() else { return };
        if cancel.is_cancelled() {
            return;
        }

        match kind {
            CycleKind::Http => probe.run_http_cycle().await,
            CycleKind::Tcp => probe.run_tcp_cycle().await,
        }

        let delay = probe.settings.check_delay;
        drop(probe);

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => return,
        }
    }
}
