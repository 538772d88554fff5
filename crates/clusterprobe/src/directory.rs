//! Concurrent hierarchical index of live probes.

use crate::location::{Location, Partition};
use crate::probe::Probe;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

type PartitionProbes = DashMap<String, Arc<Probe>>;

/// Three-level index `namespace -> partition -> datacenter#service -> probe`.
///
/// The directory owns every registered probe: a probe it displaces or removes
/// is stopped before the reference is released, so nothing unreachable through
/// a lookup keeps probing. Every level is a sharded concurrent map; no
/// operation takes a lock across the whole structure.
#[derive(Default)]
pub struct Directory {
    namespaces: DashMap<String, DashMap<Partition, PartitionProbes>>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a probe, creating intermediate levels on demand. A probe
    /// already registered at the same location is stopped and replaced.
    pub fn add(&self, location: &Location, probe: Arc<Probe>) {
        let displaced = self
            .namespaces
            .entry(location.partition().namespace().to_string())
            .or_default()
            .entry(location.partition().clone())
            .or_default()
            .insert(location.key(), probe);

        if let Some(previous) = displaced {
            info!(target = %previous.target(), "replacing probe, stopping previous");
            previous.stop();
        }
    }

    /// Exact point lookup. Absence at any level is "not found", not an error.
    pub fn find_one(&self, location: &Location) -> Option<Arc<Probe>> {
        let partitions = self.namespaces.get(location.partition().namespace())?;
        let probes = partitions.get(location.partition())?;
        let probe = probes.get(&location.key())?;
        Some(Arc::clone(probe.value()))
    }

    /// All probes registered under one partition.
    pub fn partition(&self, partition: &Partition) -> Vec<Arc<Probe>> {
        let Some(partitions) = self.namespaces.get(partition.namespace()) else {
            return Vec::new();
        };
        let Some(probes) = partitions.get(partition) else {
            return Vec::new();
        };
        probes.iter().map(|entry| Arc::clone(entry.value())).collect()
    }

    /// Probes across all partitions of a namespace whose partition name
    /// contains `pattern`. An empty or absent pattern matches everything.
    /// Unknown namespaces yield an empty result.
    pub fn find(&self, namespace: &str, pattern: Option<&str>) -> Vec<Arc<Probe>> {
        let Some(partitions) = self.namespaces.get(namespace) else {
            return Vec::new();
        };

        let mut result = Vec::new();
        for entry in partitions.iter() {
            let matches = match pattern {
                None | Some("") => true,
                Some(pattern) => entry.key().partition().contains(pattern),
            };
            if matches {
                result.extend(entry.value().iter().map(|probe| Arc::clone(probe.value())));
            }
        }
        result
    }

    /// Remove and return the probe at the exact key, stopping it as part of
    /// removal. Emptied intermediate levels stay in place, so the namespace
    /// still `exists` afterwards.
    pub fn remove(&self, location: &Location) -> Option<Arc<Probe>> {
        let partitions = self.namespaces.get(location.partition().namespace())?;
        let probes = partitions.get(location.partition())?;
        let (_, probe) = probes.remove(&location.key())?;

        info!(target = %probe.target(), "removed probe, stopping");
        probe.stop();
        Some(probe)
    }

    /// O(1) namespace membership check.
    pub fn exists(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }

    /// Stable snapshot of every registered probe.
    pub fn all(&self) -> Vec<Arc<Probe>> {
        let mut result = Vec::new();
        for partitions in self.namespaces.iter() {
            for probes in partitions.value().iter() {
                result.extend(probes.value().iter().map(|probe| Arc::clone(probe.value())));
            }
        }
        result
    }

    /// Number of registered probes.
    pub fn len(&self) -> usize {
        self.namespaces
            .iter()
            .map(|partitions| {
                partitions
                    .value()
                    .iter()
                    .map(|probes| probes.value().len())
                    .sum::<usize>()
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
