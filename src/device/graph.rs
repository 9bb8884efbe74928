//! Device graph resolution.
//!
//! Devices live in an arena keyed by hostname. Resolving a device first
//! resolves every upstream peer it names, transitively, then accumulates the
//! registers it exposes. Each device is resolved at most once per graph, no
//! matter how many downstream devices share it; an upstream loop is reported
//! as an error instead of recursing forever.

use super::register::{Register, RegisterTable};
use crate::infrastructure::InfrastructureMappings;
use crate::protocol::Protocol;
use crate::topology::{Node, Role, TopologyConfig};
use std::collections::BTreeMap;

/// Errors that abort graph resolution
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Unknown device '{0}'")]
    UnknownDevice(String),

    #[error("Device '{device}' references unknown upstream device '{upstream}'")]
    UnknownUpstream { device: String, upstream: String },

    #[error("Device '{device}' monitors '{name}' of type '{kind}', which infrastructure '{infrastructure}' does not define")]
    UnknownInfrastructureType {
        device: String,
        name: String,
        kind: String,
        infrastructure: String,
    },

    #[error("Upstream cycle detected: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },
}

/// Resolution progress of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionState {
    #[default]
    Unresolved,
    /// On the current resolution path; seeing it again means a cycle
    Resolving,
    Resolved,
}

/// A topology node together with its resolved registers.
#[derive(Debug, Clone)]
pub struct Device {
    pub node: Node,
    /// Infrastructure class used to expand monitored devices
    pub infrastructure: String,
    /// Registers by protocol: own points for a field-device server, points
    /// relayed from upstream for a front-end processor
    pub registers: RegisterTable,
    state: ResolutionState,
}

impl Device {
    pub fn new(node: Node, infrastructure: impl Into<String>) -> Self {
        Self {
            node,
            infrastructure: infrastructure.into(),
            registers: RegisterTable::new(),
            state: ResolutionState::Unresolved,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.node.hostname
    }

    pub fn role(&self) -> Role {
        self.node.role
    }

    pub fn state(&self) -> ResolutionState {
        self.state
    }

    pub fn is_processed(&self) -> bool {
        self.state == ResolutionState::Resolved
    }

    /// Registers a downstream client of this device addresses, by protocol.
    ///
    /// A front-end processor serves everything it relays over its single
    /// downstream protocol, so its table collapses into one list.
    pub fn exposed_registers(&self) -> RegisterTable {
        match self.role() {
            Role::FieldDeviceServer => self.registers.clone(),
            Role::FrontEndProcessor => {
                let mut exposed = RegisterTable::new();
                exposed
                    .entry(self.node.metadata.downstream_protocol())
                    .extend_from(&self.registers.concatenated());
                exposed
            }
            Role::FieldDeviceClient => RegisterTable::new(),
        }
    }

    /// Expand the monitored devices declared under each protocol block into
    /// registers.
    fn expand_points(&self, mappings: &InfrastructureMappings) -> Result<RegisterTable, ResolveError> {
        let mut table = RegisterTable::new();

        for protocol in Protocol::ALL {
            let Some(block) = self.node.metadata.protocol(protocol) else {
                continue;
            };
            let list = table.entry(protocol);

            for group in &block.devices {
                let variables = mappings
                    .device_type(&self.infrastructure, &group.kind)
                    .ok_or_else(|| ResolveError::UnknownInfrastructureType {
                        device: self.hostname().to_string(),
                        name: group.name.clone(),
                        kind: group.kind.clone(),
                        infrastructure: self.infrastructure.clone(),
                    })?;

                for (variable, spec) in variables.iter() {
                    list.push(Register::new(
                        spec.kind(),
                        Register::tag_for(&group.name, variable),
                        spec.options(protocol),
                    ));
                }
            }
        }

        Ok(table)
    }
}

/// Arena of devices keyed by hostname.
#[derive(Debug, Clone, Default)]
pub struct DeviceGraph {
    devices: BTreeMap<String, Device>,
    /// Hostnames in topology order
    order: Vec<String>,
    /// Hostnames in the order their resolution completed
    resolution_order: Vec<String>,
}

impl DeviceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from a validated topology.
    pub fn from_topology(topology: &TopologyConfig) -> Self {
        let mut graph = Self::new();
        for node in &topology.nodes {
            let infrastructure = topology.infrastructure_for(node).to_string();
            graph.insert(Device::new(node.clone(), infrastructure));
        }
        graph
    }

    /// Add a device, replacing any device with the same hostname.
    pub fn insert(&mut self, device: Device) -> Option<Device> {
        let hostname = device.hostname().to_string();
        if !self.devices.contains_key(&hostname) {
            self.order.push(hostname.clone());
        }
        self.devices.insert(hostname, device)
    }

    pub fn get(&self, hostname: &str) -> Option<&Device> {
        self.devices.get(hostname)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Hostnames in the order their resolution completed. Every device
    /// appears at most once.
    pub fn resolution_order(&self) -> &[String] {
        &self.resolution_order
    }

    /// Resolve every device in topology order.
    pub fn resolve_all(&mut self, mappings: &InfrastructureMappings) -> Result<(), ResolveError> {
        let hostnames = self.order.clone();
        for hostname in &hostnames {
            self.resolve(hostname, mappings)?;
        }
        log::info!("Resolved {} devices", self.resolution_order.len());
        Ok(())
    }

    /// Resolve one device and, first, everything upstream of it.
    ///
    /// Resolving an already resolved device is a no-op.
    pub fn resolve(&mut self, hostname: &str, mappings: &InfrastructureMappings) -> Result<(), ResolveError> {
        let mut path = Vec::new();
        self.resolve_on_path(hostname, mappings, &mut path)
    }

    fn resolve_on_path(
        &mut self,
        hostname: &str,
        mappings: &InfrastructureMappings,
        path: &mut Vec<String>,
    ) -> Result<(), ResolveError> {
        let device = self
            .devices
            .get_mut(hostname)
            .ok_or_else(|| ResolveError::UnknownDevice(hostname.to_string()))?;

        match device.state {
            ResolutionState::Resolved => return Ok(()),
            ResolutionState::Resolving => {
                let start = path.iter().position(|h| h == hostname).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(hostname.to_string());
                return Err(ResolveError::Cycle { path: cycle });
            }
            ResolutionState::Unresolved => {}
        }

        device.state = ResolutionState::Resolving;
        let role = device.role();
        let upstream: Vec<String> = device
            .node
            .metadata
            .upstream()
            .iter()
            .map(|u| u.hostname.clone())
            .collect();

        path.push(hostname.to_string());
        let mut registers = RegisterTable::new();

        match role {
            Role::FrontEndProcessor | Role::FieldDeviceClient => {
                for peer in &upstream {
                    if !self.devices.contains_key(peer) {
                        return Err(ResolveError::UnknownUpstream {
                            device: hostname.to_string(),
                            upstream: peer.clone(),
                        });
                    }

                    self.resolve_on_path(peer, mappings, path)?;

                    if role == Role::FrontEndProcessor {
                        if let Some(peer_device) = self.devices.get(peer) {
                            registers.extend_from(&peer_device.exposed_registers());
                        }
                    }
                }
            }
            Role::FieldDeviceServer => {
                if !upstream.is_empty() {
                    log::warn!(
                        "Field device server {} declares upstream devices; they are ignored",
                        hostname
                    );
                }
                if let Some(device) = self.devices.get(hostname) {
                    registers = device.expand_points(mappings)?;
                }
            }
        }

        path.pop();

        let device = self
            .devices
            .get_mut(hostname)
            .ok_or_else(|| ResolveError::UnknownDevice(hostname.to_string()))?;
        device.registers = registers;
        device.state = ResolutionState::Resolved;
        self.resolution_order.push(hostname.to_string());

        log::debug!(
            "Resolved {} {} with protocols {:?}",
            role,
            hostname,
            self.devices
                .get(hostname)
                .map(|d| d.registers.protocols())
                .unwrap_or_default()
        );

        Ok(())
    }
}
