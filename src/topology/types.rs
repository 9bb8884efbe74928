//! Topology type definitions.
//!
//! The synthesis input: annotated nodes plus the application-level tables
//! (infrastructure overrides, serial link assignments, ot-sim defaults).

use super::metadata::{NodeMetadata, SerialLink};
use crate::infrastructure::InfrastructureOverrides;
use crate::otsim::OtSimSettings;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Infrastructure class assumed when neither the node nor the topology names one.
pub const DEFAULT_INFRASTRUCTURE: &str = "power-distribution";

/// Role a node plays in the control system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Aggregates upstream field devices and re-exposes them downstream
    #[serde(alias = "fep")]
    FrontEndProcessor,
    /// Exposes its own monitored points (RTU, PLC, relay)
    #[serde(alias = "fd-server")]
    FieldDeviceServer,
    /// Polls upstream devices without exposing anything (HMI, historian)
    #[serde(alias = "fd-client")]
    FieldDeviceClient,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::FrontEndProcessor => "front-end-processor",
            Role::FieldDeviceServer => "field-device-server",
            Role::FieldDeviceClient => "field-device-client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A network interface of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl NetworkInterface {
    /// The interface address, if set and non-empty.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref().map(str::trim).filter(|a| !a.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    #[serde(default)]
    pub interfaces: Vec<NetworkInterface>,
}

/// A topology node.
#[derive(Debug, Clone, Deserialize)]
pub struct Node {
    pub hostname: String,
    pub role: Role,
    #[serde(default)]
    pub metadata: NodeMetadata,
    #[serde(default)]
    pub network: Network,
}

impl Node {
    /// Find an interface by name.
    pub fn interface(&self, name: &str) -> Option<&NetworkInterface> {
        self.network
            .interfaces
            .iter()
            .find(|iface| iface.name.as_deref() == Some(name))
    }
}

/// The synthesis input document.
#[derive(Debug, Clone, Deserialize)]
pub struct TopologyConfig {
    pub nodes: Vec<Node>,
    /// Application-wide ot-sim settings
    #[serde(default)]
    pub defaults: OtSimSettings,
    /// Infrastructure class used by nodes that do not name one
    #[serde(default)]
    pub default_infrastructure: Option<String>,
    /// Per-deployment infrastructure overrides
    #[serde(default)]
    pub infrastructure: InfrastructureOverrides,
    /// Serial link table keyed by hostname
    #[serde(default)]
    pub serial_links: BTreeMap<String, Vec<SerialLink>>,
}

impl TopologyConfig {
    /// Validate the topology
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.nodes.is_empty() {
            return Err(ValidationError::InvalidTopology(
                "topology has no nodes".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if node.hostname.trim().is_empty() {
                return Err(ValidationError::InvalidNode(
                    "hostname cannot be empty".to_string(),
                ));
            }
            if !seen.insert(node.hostname.as_str()) {
                return Err(ValidationError::InvalidNode(format!(
                    "duplicate hostname '{}'",
                    node.hostname
                )));
            }
            for upstream in node.metadata.upstream() {
                if upstream.hostname == node.hostname {
                    return Err(ValidationError::InvalidNode(format!(
                        "node '{}' lists itself as upstream",
                        node.hostname
                    )));
                }
            }
        }

        for hostname in self.serial_links.keys() {
            if !seen.contains(hostname.as_str()) {
                log::warn!("Serial links assigned to unknown node '{}'", hostname);
            }
        }

        Ok(())
    }

    /// Infrastructure class for `node`.
    pub fn infrastructure_for<'a>(&'a self, node: &'a Node) -> &'a str {
        node.metadata
            .infrastructure
            .as_deref()
            .or(self.default_infrastructure.as_deref())
            .unwrap_or(DEFAULT_INFRASTRUCTURE)
    }
}

/// Topology validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),
    #[error("Invalid node: {0}")]
    InvalidNode(String),
}
