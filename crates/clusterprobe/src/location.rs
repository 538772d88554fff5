//! Identity types for probe targets.
//!
//! A probe URL's hostname encodes where the endpoint lives:
//! `service.partition.namespace.datacenter[-suffix][.domain...]`. The fourth
//! label may carry a regional suffix (`eastus-prod`) which is not part of the
//! datacenter identity and is stripped on parse.

use crate::error::RegisterError;
use url::Url;

/// A logical service-partition grouping. Value-equal and hashable; used as a
/// map key in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Partition {
    namespace: String,
    partition: String,
}

impl Partition {
    pub fn new(namespace: impl Into<String>, partition: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            partition: partition.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }
}

/// Full identity of one probe target: partition, datacenter, and service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    partition: Partition,
    datacenter: String,
    service: String,
}

impl Location {
    pub fn new(
        partition: Partition,
        datacenter: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            partition,
            datacenter: datacenter.into(),
            service: service.into(),
        }
    }

    /// Parse a location from a probe URL.
    pub fn from_url(url: &Url) -> Result<Self, RegisterError> {
        let host = url.host_str().ok_or_else(|| RegisterError::MalformedHost {
            host: url.to_string(),
        })?;
        Self::from_host(host)
    }

    /// Parse a location from a hostname.
    ///
    /// Requires at least four labels; anything past the fourth is the domain
    /// suffix and carries no identity. A wrong label count or an empty label
    /// is a registration error, never silently defaulted.
    pub fn from_host(host: &str) -> Result<Self, RegisterError> {
        let malformed = || RegisterError::MalformedHost {
            host: host.to_string(),
        };

        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() < 4 {
            return Err(malformed());
        }
        let (service, partition, namespace) = (labels[0], labels[1], labels[2]);
        // Regional suffix is not part of the datacenter identity.
        let datacenter = labels[3].split('-').next().unwrap_or("");

        if service.is_empty() || partition.is_empty() || namespace.is_empty() || datacenter.is_empty()
        {
            return Err(malformed());
        }

        Ok(Self {
            partition: Partition::new(namespace, partition),
            datacenter: datacenter.to_string(),
            service: service.to_string(),
        })
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn datacenter(&self) -> &str {
        &self.datacenter
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Leaf key in the directory. Distinct services probed in the same
    /// datacenter and partition must coexist.
    pub(crate) fn key(&self) -> String {
        format!("{}#{}", self.datacenter, self.service)
    }
}
