//! Clusterprobe server: REST registration/query API, settings, registration
//! persistence, and the Prometheus metrics endpoint over the probing core.

pub mod api;
pub mod config;
pub mod persist;

pub use api::AppState;
pub use config::{Config, ConfigError};
pub use persist::RegistrationStore;
