//! Role-specific configuration.
//!
//! Turns a resolved device into the protocol roots and module declarations
//! of its ot-sim document:
//!
//! - a field-device server serves its own registers, one server root set per
//!   protocol it declares
//! - a field-device client polls every upstream peer over every protocol the
//!   peer exposes, against the peer's endpoints
//! - a front-end processor does both: it polls upstream like a client, then
//!   serves everything it relayed over its downstream protocol
//!
//! The client side always encodes the peer's exposed registers, the same
//! list the peer's server side encodes, so both ends address every tag
//! identically.

use super::graph::DeviceGraph;
use super::register::RegisterList;
use crate::protocol::{
    Dnp3Encoder, Dnp3Root, EndpointError, ModbusEncoder, ModbusRoot, Mode, Protocol,
    SimulatorModule,
};
use crate::topology::{Node, Role, SerialEntry, SerialLink, SerialOverride, SerialSpec, UpstreamRef};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Serial link table keyed by hostname.
pub type SerialLinkTable = BTreeMap<String, Vec<SerialLink>>;

/// Protocol output of one configured device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeArtifacts {
    pub dnp3: Vec<Dnp3Root>,
    pub modbus: Vec<ModbusRoot>,
    /// One module per protocol in use, in first-use order
    pub modules: Vec<SimulatorModule>,
}

impl NodeArtifacts {
    fn activate(&mut self, protocol: Protocol) {
        let module = protocol.module();
        if !self.modules.iter().any(|m| m.name == module.name) {
            self.modules.push(module);
        }
    }

    /// Encode `registers` in `mode` against `node`'s endpoints and keep the
    /// resulting roots.
    fn encode(
        &mut self,
        protocol: Protocol,
        mode: Mode,
        node: &Node,
        registers: &RegisterList,
    ) -> Result<(), EndpointError> {
        match protocol {
            Protocol::Dnp3 => {
                let mut encoder = Dnp3Encoder::new(mode);
                encoder.init_endpoint(node)?;
                encoder.init_roles();
                encoder.encode(registers);
                self.dnp3.extend(encoder.finish());
            }
            Protocol::Modbus => {
                let mut encoder = ModbusEncoder::new(mode);
                encoder.init_endpoint(node)?;
                encoder.encode(registers);
                self.modbus.extend(encoder.finish());
            }
        }
        self.activate(protocol);
        Ok(())
    }
}

/// Errors from configuring a device
#[derive(Debug, thiserror::Error)]
pub enum ConfigureError {
    #[error("Unknown device '{0}'")]
    UnknownDevice(String),

    #[error("Device '{0}' must be resolved before it is configured")]
    Unresolved(String),

    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

impl DeviceGraph {
    /// Build the protocol artifacts of `hostname`.
    ///
    /// The device and everything upstream of it must already be resolved.
    /// Nothing in the graph is modified: serial links taken from the link
    /// table are applied to copies of the nodes involved, so configuring
    /// devices in any order yields the same result.
    pub fn configure(&self, hostname: &str, links: &SerialLinkTable) -> Result<NodeArtifacts, ConfigureError> {
        let device = self
            .get(hostname)
            .ok_or_else(|| ConfigureError::UnknownDevice(hostname.to_string()))?;
        if !device.is_processed() {
            return Err(ConfigureError::Unresolved(hostname.to_string()));
        }
        let role = device.role();

        let mut artifacts = NodeArtifacts::default();

        match role {
            Role::FieldDeviceServer => {
                self.configure_server(hostname, links, &mut artifacts)?;
            }
            Role::FieldDeviceClient => {
                self.configure_clients(hostname, links, &mut artifacts)?;
            }
            Role::FrontEndProcessor => {
                self.configure_clients(hostname, links, &mut artifacts)?;
                self.configure_server(hostname, links, &mut artifacts)?;
            }
        }

        log::info!(
            "Configured {} {}: {} DNP3 roots, {} Modbus roots",
            role,
            hostname,
            artifacts.dnp3.len(),
            artifacts.modbus.len()
        );

        Ok(artifacts)
    }

    /// Serve the registers `hostname` exposes.
    fn configure_server(
        &self,
        hostname: &str,
        links: &SerialLinkTable,
        artifacts: &mut NodeArtifacts,
    ) -> Result<(), ConfigureError> {
        let device = self
            .get(hostname)
            .ok_or_else(|| ConfigureError::UnknownDevice(hostname.to_string()))?;

        for (protocol, registers) in device.exposed_registers().iter() {
            let target = server_view(&device.node, protocol, links)?;
            artifacts.encode(protocol, Mode::Server, &target, registers)?;
        }
        Ok(())
    }

    /// Poll every upstream peer of `hostname`.
    fn configure_clients(
        &self,
        hostname: &str,
        links: &SerialLinkTable,
        artifacts: &mut NodeArtifacts,
    ) -> Result<(), ConfigureError> {
        let device = self
            .get(hostname)
            .ok_or_else(|| ConfigureError::UnknownDevice(hostname.to_string()))?;

        for upstream in device.node.metadata.upstream() {
            let peer = self
                .get(&upstream.hostname)
                .ok_or_else(|| ConfigureError::UnknownDevice(upstream.hostname.clone()))?;
            if !peer.is_processed() {
                return Err(ConfigureError::Unresolved(upstream.hostname.clone()));
            }

            for (protocol, registers) in peer.exposed_registers().iter() {
                let target = peer_view(hostname, &peer.node, protocol, upstream, links)?;
                artifacts.encode(protocol, Mode::Client, &target, registers)?;
            }
        }
        Ok(())
    }
}

fn find_link<'a>(links: &'a [SerialLink], remote: &str) -> Option<&'a SerialLink> {
    links.iter().find(|link| link.remote == remote)
}

/// The node as its own server side sees it for `protocol`.
///
/// `serial: app` becomes every link assigned to the node. A link entry
/// naming a `downstream` peer takes its device and baud rate from the link
/// to that peer. Only the block of the served protocol is rewritten.
fn server_view<'a>(node: &'a Node, protocol: Protocol, links: &SerialLinkTable) -> Result<Cow<'a, Node>, EndpointError> {
    let serial = match node.metadata.protocol(protocol) {
        Some(block) if block.structured => block.serial.as_ref(),
        _ => None,
    };
    let assigned = links.get(&node.hostname).map(Vec::as_slice).unwrap_or(&[]);

    let rewritten = match serial {
        Some(SerialSpec::App) if assigned.is_empty() => {
            log::warn!(
                "Node {} uses app-assigned {} serial links but has none",
                node.hostname,
                protocol
            );
            return Ok(Cow::Borrowed(node));
        }
        Some(SerialSpec::App) => assigned.iter().map(SerialEntry::from).collect(),
        Some(SerialSpec::Links(entries)) if entries.iter().any(|e| e.downstream.is_some()) => {
            let mut entries = entries.clone();
            for entry in entries.iter_mut() {
                let Some(remote) = entry.downstream.as_deref() else {
                    continue;
                };
                let link = find_link(assigned, remote).ok_or_else(|| EndpointError::NoSerialLink {
                    hostname: node.hostname.clone(),
                    remote: remote.to_string(),
                })?;
                entry.device = Some(link.device.clone());
                entry.baud = Some(link.baud);
            }
            entries
        }
        _ => return Ok(Cow::Borrowed(node)),
    };

    let mut view = node.clone();
    if let Some(block) = view.metadata.protocol_mut(protocol) {
        block.serial = Some(SerialSpec::Links(rewritten));
    }
    Ok(Cow::Owned(view))
}

/// The peer node as the client `hostname` sees it for `protocol`.
///
/// When the peer serves `protocol` over serial, the client's end of the line
/// is what goes into the client root: either the link given on the upstream
/// reference, or the client's link-table entry to the peer. Otherwise the
/// peer is used as is.
fn peer_view<'a>(
    hostname: &str,
    peer: &'a Node,
    protocol: Protocol,
    upstream: &UpstreamRef,
    links: &SerialLinkTable,
) -> Result<Cow<'a, Node>, EndpointError> {
    let serial = match peer.metadata.protocol(protocol) {
        Some(block) if block.structured => block.serial.as_ref(),
        _ => None,
    };
    let Some(serial) = serial else {
        return Ok(Cow::Borrowed(peer));
    };

    let entry = match (&upstream.serial, serial) {
        (Some(SerialOverride::Link(entry)), _) => entry.clone(),
        (Some(SerialOverride::App), _) | (None, SerialSpec::App) => {
            let assigned = links.get(hostname).map(Vec::as_slice).unwrap_or(&[]);
            find_link(assigned, &peer.hostname)
                .map(SerialEntry::from)
                .ok_or_else(|| EndpointError::NoSerialLink {
                    hostname: hostname.to_string(),
                    remote: peer.hostname.clone(),
                })?
        }
        (None, SerialSpec::Links(_)) => return Ok(Cow::Borrowed(peer)),
    };

    let mut view = peer.clone();
    if let Some(block) = view.metadata.protocol_mut(protocol) {
        block.serial = Some(SerialSpec::Links(vec![entry]));
    }
    Ok(Cow::Owned(view))
}
