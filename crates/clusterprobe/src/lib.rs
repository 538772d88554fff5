//! Continuous dual probing of remote cluster endpoints.
//!
//! Each registered endpoint is probed two ways on independent fixed-delay
//! schedules: an HTTPS GET against its health URI and a raw TCP connect to
//! its host. Outcomes land in bounded ring histories from which immutable
//! health snapshots (sample counts, failure counts, error rate, estimated
//! window span) are served on demand. A concurrent three-level directory
//! (namespace, partition, datacenter/service) indexes live probes for point
//! lookup, filtered listing, and removal while probing continues in the
//! background.
//!
//! # Example
//!
//! ```no_run
//! use clusterprobe::{ClientSettings, HttpProbeClient, ProbeRegistry, ProbeSettings};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(HttpProbeClient::new(ClientSettings::default())?);
//! let registry = ProbeRegistry::new(client, ProbeSettings::default(), None);
//!
//! // Starts HTTP and TCP check cycles in the background.
//! let probe = registry.register("https://envoy.df-a.ic3-ns.eastus-prod.example.net/probe")?;
//!
//! let health = probe.health();
//! println!("error rate: {}", health.error_rate);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod directory;
pub mod error;
pub mod history;
pub mod latency;
pub mod location;
pub mod metrics;
pub mod probe;
pub mod registry;
pub mod tcp;

pub use client::{ClientSettings, HttpHealth, HttpProbeClient};
pub use directory::Directory;
pub use error::{CheckError, RegisterError};
pub use history::History;
pub use location::{Location, Partition};
pub use metrics::ProbeMetrics;
pub use probe::{Health, Probe, ProbeSettings};
pub use registry::ProbeRegistry;
