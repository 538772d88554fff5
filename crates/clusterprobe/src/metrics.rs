//! Prometheus metrics recorded by probe cycles.

use crate::location::Location;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::time::Duration;

/// Labels for per-check metrics.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct CheckLabels {
    pub namespace: String,
    pub partition: String,
    pub datacenter: String,
    pub service: String,
    /// Probe kind (http, tcp)
    pub kind: String,
    /// Cycle outcome (success, failure)
    pub outcome: String,
}

/// Labels identifying one probe target.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct LocationLabels {
    pub namespace: String,
    pub partition: String,
    pub datacenter: String,
    pub service: String,
}

impl LocationLabels {
    fn from_location(location: &Location) -> Self {
        Self {
            namespace: location.partition().namespace().to_string(),
            partition: location.partition().partition().to_string(),
            datacenter: location.datacenter().to_string(),
            service: location.service().to_string(),
        }
    }
}

/// Metrics shared by all probes in one registry.
pub struct ProbeMetrics {
    checks_total: Family<CheckLabels, Counter>,
    tcp_rtt_seconds: Family<LocationLabels, Histogram>,
    probes_active: Gauge,
}

impl ProbeMetrics {
    /// Create and register the probe metric families.
    pub fn new(registry: &mut Registry) -> Self {
        let checks_total = Family::<CheckLabels, Counter>::default();
        registry.register(
            "probe_checks",
            "Total probe checks by kind and outcome",
            checks_total.clone(),
        );

        let tcp_rtt_seconds = Family::<LocationLabels, Histogram>::new_with_constructor(|| {
            Histogram::new(exponential_buckets(0.001, 2.0, 14))
        });
        registry.register(
            "probe_tcp_rtt_seconds",
            "Measured TCP probe cycle duration including pacing delay",
            tcp_rtt_seconds.clone(),
        );

        let probes_active = Gauge::default();
        registry.register(
            "probes_active",
            "Probes currently registered in the directory",
            probes_active.clone(),
        );

        Self {
            checks_total,
            tcp_rtt_seconds,
            probes_active,
        }
    }

    pub(crate) fn record_http(&self, location: &Location, success: bool) {
        self.checks_total
            .get_or_create(&Self::check_labels(location, "http", success))
            .inc();
    }

    pub(crate) fn record_tcp(&self, location: &Location, success: bool, duration: Duration) {
        self.checks_total
            .get_or_create(&Self::check_labels(location, "tcp", success))
            .inc();
        self.tcp_rtt_seconds
            .get_or_create(&LocationLabels::from_location(location))
            .observe(duration.as_secs_f64());
    }

    pub fn set_active_probes(&self, count: usize) {
        self.probes_active.set(count as i64);
    }

    fn check_labels(location: &Location, kind: &str, success: bool) -> CheckLabels {
        let outcome = if success { "success" } else { "failure" };
        CheckLabels {
            namespace: location.partition().namespace().to_string(),
            partition: location.partition().partition().to_string(),
            datacenter: location.datacenter().to_string(),
            service: location.service().to_string(),
            kind: kind.to_string(),
            outcome: outcome.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Partition;
    use prometheus_client::encoding::text::encode;

    #[test]
    fn records_and_encodes() {
        let mut registry = Registry::default();
        let metrics = ProbeMetrics::new(&mut registry);
        let location = Location::new(Partition::new("voice", "apac-a"), "japan", "envoy");

        metrics.record_http(&location, true);
        metrics.record_tcp(&location, false, Duration::from_millis(150));
        metrics.set_active_probes(1);

        let mut buffer = String::new();
        encode(&mut buffer, &registry).unwrap();
        assert!(buffer.contains("probe_checks_total"));
        assert!(buffer.contains("outcome=\"failure\""));
        assert!(buffer.contains("probes_active 1"));
    }
}
