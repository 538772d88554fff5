//! Registration and query boundary over the probe directory.

use crate::client::HttpHealth;
use crate::directory::Directory;
use crate::error::RegisterError;
use crate::location::{Location, Partition};
use crate::metrics::ProbeMetrics;
use crate::probe::{Health, Probe, ProbeSettings};
use std::sync::Arc;
use tracing::info;
use url::Url;

/// Owns the directory, the shared probing client, and the settings every new
/// probe is built with. One registry per process; tests construct their own
/// isolated instances.
pub struct ProbeRegistry {
    directory: Directory,
    client: Arc<dyn HttpHealth>,
    settings: ProbeSettings,
    metrics: Option<Arc<ProbeMetrics>>,
}

impl ProbeRegistry {
    pub fn new(
        client: Arc<dyn HttpHealth>,
        settings: ProbeSettings,
        metrics: Option<Arc<ProbeMetrics>>,
    ) -> Self {
        Self {
            directory: Directory::new(),
            client,
            settings,
            metrics,
        }
    }

    /// Parse, construct, start, and index a probe for `uri`.
    ///
    /// Fails synchronously when the URI or its hostname does not describe a
    /// probe location; a registered endpoint that merely cannot be reached is
    /// not an error here, it just accumulates failures.
    pub fn register(&self, uri: &str) -> Result<Arc<Probe>, RegisterError> {
        let target = Url::parse(uri).map_err(|err| RegisterError::InvalidUri {
            uri: uri.to_string(),
            reason: err.to_string(),
        })?;
        let location = Location::from_url(&target)?;

        let probe = Probe::new(
            target,
            location.clone(),
            Arc::clone(&self.client),
            self.settings,
            self.metrics.clone(),
        )?;
        probe.start();
        self.directory.add(&location, Arc::clone(&probe));
        self.update_active_gauge();

        info!(uri = %uri, namespace = location.partition().namespace(), "registered probe");
        Ok(probe)
    }

    /// Remove and stop the probe at `location`. Returns whether one existed.
    pub fn unregister(&self, location: &Location) -> bool {
        let removed = self.directory.remove(location).is_some();
        if removed {
            self.update_active_gauge();
        }
        removed
    }

    /// Health snapshot of the probe at `location`.
    pub fn lookup(&self, location: &Location) -> Option<Health> {
        self.directory.find_one(location).map(|probe| probe.health())
    }

    /// Health snapshots for every probe of one partition.
    pub fn list_partition(&self, partition: &Partition) -> Vec<Health> {
        self.directory
            .partition(partition)
            .iter()
            .map(|probe| probe.health())
            .collect()
    }

    /// Health snapshots across a namespace, optionally filtered by partition
    /// substring and minimum error rate.
    ///
    /// With a rate threshold, endpoints failing 100% of their window are
    /// always dropped: an endpoint that never connects says nothing useful
    /// about cluster health.
    pub fn list_namespace(
        &self,
        namespace: &str,
        partition_contains: Option<&str>,
        min_error_rate: Option<f64>,
    ) -> Vec<Health> {
        self.directory
            .find(namespace, partition_contains)
            .iter()
            .map(|probe| probe.health())
            .filter(|health| match min_error_rate {
                None => true,
                Some(threshold) => health.error_rate >= threshold && health.error_rate != 1.0,
            })
            .collect()
    }

    pub fn exists_namespace(&self, namespace: &str) -> bool {
        self.directory.exists(namespace)
    }

    /// Snapshot of every registered probe's health.
    pub fn all(&self) -> Vec<Health> {
        self.directory.all().iter().map(|probe| probe.health()).collect()
    }

    pub fn len(&self) -> usize {
        self.directory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directory.is_empty()
    }

    fn update_active_gauge(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.set_active_probes(self.directory.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientSettings, HttpProbeClient};
    use crate::error::CheckError;
    use async_trait::async_trait;
    use std::time::Duration;

    struct NeverReached;

    #[async_trait]
    impl HttpHealth for NeverReached {
        async fn probe(&self, _target: &Url) -> Result<(), CheckError> {
            Err(CheckError::Status(503))
        }
    }

    fn test_registry() -> ProbeRegistry {
        ProbeRegistry::new(Arc::new(NeverReached), ProbeSettings::default(), None)
    }

    fn real_client_registry() -> ProbeRegistry {
        let client = HttpProbeClient::new(ClientSettings::default()).unwrap();
        ProbeRegistry::new(Arc::new(client), ProbeSettings::default(), None)
    }

    #[tokio::test]
    async fn register_resolves_location_and_lookup_finds_it() {
        let registry = test_registry();
        let uri = "https://envoy.df-a.ic3-ns.eastus-prod.example.net/probe";
        registry.register(uri).unwrap();

        let location = Location::new(Partition::new("ic3-ns", "df-a"), "eastus", "envoy");
        let health = registry.lookup(&location).unwrap();
        assert_eq!(health.cluster, uri);
    }

    #[tokio::test]
    async fn register_rejects_invalid_input() {
        let registry = test_registry();

        assert!(matches!(
            registry.register("not a uri"),
            Err(RegisterError::InvalidUri { .. })
        ));
        assert!(matches!(
            registry.register("https://toofew.example/probe"),
            Err(RegisterError::MalformedHost { .. })
        ));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn unregister_removes_and_reports_missing() {
        let registry = test_registry();
        registry
            .register("https://envoy.df-a.ic3-ns.eastus.example.net/probe")
            .unwrap();
        let location = Location::new(Partition::new("ic3-ns", "df-a"), "eastus", "envoy");

        assert!(registry.unregister(&location));
        assert!(registry.lookup(&location).is_none());
        assert!(!registry.unregister(&location));
    }

    #[tokio::test]
    async fn list_partition_returns_each_datacenter() {
        let registry = test_registry();
        registry
            .register("https://envoy.apac-a.voice.japan.example.net/probe")
            .unwrap();
        registry
            .register("https://envoy.apac-a.voice.malaysia.example.net/probe")
            .unwrap();
        registry
            .register("https://envoy.apac-b.voice.malaysia.example.net/probe")
            .unwrap();

        let healths = registry.list_partition(&Partition::new("voice", "apac-a"));
        assert_eq!(healths.len(), 2);
    }

    #[tokio::test]
    async fn list_namespace_applies_rate_filter() {
        let registry = test_registry();
        let dead = registry
            .register("https://envoy.apac-a.voice.japan.example.net/probe")
            .unwrap();
        let flaky = registry
            .register("https://envoy.apac-b.voice.dublin.example.net/probe")
            .unwrap();
        let healthy = registry
            .register("https://envoy.apac-c.voice.oslo.example.net/probe")
            .unwrap();

        let lap = Duration::from_millis(100);
        for _ in 0..4 {
            dead.record_tcp_sample(false, lap);
        }
        for i in 0..4 {
            flaky.record_tcp_sample(i % 2 == 0, lap);
        }
        for _ in 0..4 {
            healthy.record_tcp_sample(true, lap);
        }

        // No threshold: everything, including the fully dead endpoint.
        assert_eq!(registry.list_namespace("voice", None, None).len(), 3);

        // Thresholded: the 100%-failing endpoint is noise and always drops.
        let filtered = registry.list_namespace("voice", None, Some(0.4));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].error_rate, 0.5);

        // Threshold zero still keeps the healthy endpoint and drops the dead one.
        assert_eq!(registry.list_namespace("voice", None, Some(0.0)).len(), 2);
    }

    #[tokio::test]
    async fn list_namespace_filters_partitions() {
        let registry = test_registry();
        registry
            .register("https://envoy.apac-a.voice.japan.example.net/probe")
            .unwrap();
        registry
            .register("https://envoy.emea-a.voice.dublin.example.net/probe")
            .unwrap();

        assert_eq!(registry.list_namespace("voice", Some("apac"), None).len(), 1);
        assert_eq!(registry.list_namespace("voice", Some(""), None).len(), 2);
        assert_eq!(registry.list_namespace("nowhere", None, None).len(), 0);
    }

    #[tokio::test]
    async fn exists_namespace_after_registration() {
        let registry = test_registry();
        assert!(!registry.exists_namespace("voice"));
        registry
            .register("https://envoy.apac-a.voice.japan.example.net/probe")
            .unwrap();
        assert!(registry.exists_namespace("voice"));
    }

    #[tokio::test]
    async fn reregistering_replaces_and_stops_previous() {
        let registry = real_client_registry();
        let uri = "https://envoy.df-a.ic3-ns.eastus.example.invalid/probe";
        let first = registry.register(uri).unwrap();
        let second = registry.register(uri).unwrap();

        assert!(!first.is_active());
        assert!(second.is_active());
        assert_eq!(registry.len(), 1);
    }
}
