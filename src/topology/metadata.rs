//! Node metadata normalization.
//!
//! Topology metadata is hand-written YAML with a few historical shapes: a
//! protocol block may be a bare list of monitored devices or a map with
//! `devices`/`serial`/`interface` keys, an upstream reference may be a bare
//! hostname or a map, and a serial spec may be a list of links or the `app`
//! sentinel. All of that is resolved here, once, at deserialization time.

use crate::otsim::OtSimSettings;
use crate::protocol::Protocol;
use serde::{Deserialize, Serialize};

/// The string marking a serial endpoint as assigned by the serial link table.
pub const APP_ASSIGNED: &str = "app";

/// Metadata of one topology node, normalized.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeMetadata {
    /// Infrastructure class used to expand monitored devices into points
    #[serde(default)]
    pub infrastructure: Option<String>,
    #[serde(default)]
    pub dnp3: Option<ProtocolBlock>,
    #[serde(default)]
    pub modbus: Option<ProtocolBlock>,
    #[serde(default)]
    upstream: Option<Vec<UpstreamRef>>,
    #[serde(default, rename = "connected_rtus")]
    connected_rtus: Option<Vec<UpstreamRef>>,
    /// Protocol a front-end processor exposes downstream
    #[serde(default)]
    pub downstream: Option<Protocol>,
    /// Per-node overrides of the ot-sim document settings
    #[serde(flatten)]
    pub settings: OtSimSettings,
}

impl NodeMetadata {
    pub fn protocol(&self, protocol: Protocol) -> Option<&ProtocolBlock> {
        match protocol {
            Protocol::Dnp3 => self.dnp3.as_ref(),
            Protocol::Modbus => self.modbus.as_ref(),
        }
    }

    pub fn protocol_mut(&mut self, protocol: Protocol) -> Option<&mut ProtocolBlock> {
        match protocol {
            Protocol::Dnp3 => self.dnp3.as_mut(),
            Protocol::Modbus => self.modbus.as_mut(),
        }
    }

    /// Upstream peers; the legacy `connected_rtus` key is only consulted when
    /// `upstream` is absent.
    pub fn upstream(&self) -> &[UpstreamRef] {
        self.upstream
            .as_deref()
            .or(self.connected_rtus.as_deref())
            .unwrap_or(&[])
    }

    /// Downstream protocol of a front-end processor, DNP3 unless chosen.
    pub fn downstream_protocol(&self) -> Protocol {
        self.downstream.unwrap_or(Protocol::Dnp3)
    }
}

/// A monitored device declared under a protocol block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointGroup {
    /// Infrastructure type, e.g. `breaker`
    #[serde(rename = "type")]
    pub kind: String,
    /// Instance name, optionally prefixed by a federate name
    pub name: String,
}

/// Per-protocol metadata of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawProtocolBlock")]
pub struct ProtocolBlock {
    pub devices: Vec<PointGroup>,
    /// False for the legacy list-only form, which carries no endpoint data
    pub structured: bool,
    pub serial: Option<SerialSpec>,
    pub interface: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProtocolBlock {
    Devices(Vec<PointGroup>),
    Structured {
        #[serde(default)]
        devices: Vec<PointGroup>,
        #[serde(default)]
        serial: Option<SerialSpec>,
        #[serde(default)]
        interface: Option<String>,
    },
}

impl From<RawProtocolBlock> for ProtocolBlock {
    fn from(raw: RawProtocolBlock) -> Self {
        match raw {
            RawProtocolBlock::Devices(devices) => Self {
                devices,
                structured: false,
                serial: None,
                interface: None,
            },
            RawProtocolBlock::Structured {
                devices,
                serial,
                interface,
            } => Self {
                devices,
                structured: true,
                serial,
                interface,
            },
        }
    }
}

/// Serial endpoint declaration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawSerialSpec")]
pub enum SerialSpec {
    /// Links are taken from the serial link table at configure time
    App,
    Links(Vec<SerialEntry>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSerialSpec {
    Links(Vec<SerialEntry>),
    Sentinel(String),
}

impl TryFrom<RawSerialSpec> for SerialSpec {
    type Error = String;

    fn try_from(raw: RawSerialSpec) -> Result<Self, Self::Error> {
        match raw {
            RawSerialSpec::Links(links) => Ok(SerialSpec::Links(links)),
            RawSerialSpec::Sentinel(s) if s == APP_ASSIGNED => Ok(SerialSpec::App),
            RawSerialSpec::Sentinel(s) => Err(format!(
                "serial must be a list of links or '{}', found '{}'",
                APP_ASSIGNED, s
            )),
        }
    }
}

/// One serial link as declared in metadata; missing fields take ot-sim
/// defaults when the endpoint is resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baud: Option<u32>,
    /// Downstream peer whose link-table entry fills `device` and `baud`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downstream: Option<String>,
}

impl From<&SerialLink> for SerialEntry {
    fn from(link: &SerialLink) -> Self {
        Self {
            device: Some(link.device.clone()),
            baud: Some(link.baud),
            downstream: None,
        }
    }
}

/// An entry of the serial link table assigned to a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialLink {
    /// Hostname at the other end of the link
    pub remote: String,
    pub device: String,
    pub baud: u32,
}

/// Serial override carried on an upstream reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerialOverride {
    /// Use the link-table entry connecting the two nodes
    App,
    Link(SerialEntry),
}

/// Reference from a device to one of its upstream peers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawUpstreamRef")]
pub struct UpstreamRef {
    pub hostname: String,
    pub serial: Option<SerialOverride>,
}

impl UpstreamRef {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            serial: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawUpstreamRef {
    Hostname(String),
    Detailed {
        hostname: String,
        #[serde(default)]
        serial: Option<RawSerialOverride>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSerialOverride {
    Link(SerialEntry),
    Sentinel(String),
}

impl TryFrom<RawUpstreamRef> for UpstreamRef {
    type Error = String;

    fn try_from(raw: RawUpstreamRef) -> Result<Self, Self::Error> {
        match raw {
            RawUpstreamRef::Hostname(hostname) => Ok(UpstreamRef::new(hostname)),
            RawUpstreamRef::Detailed { hostname, serial } => {
                let serial = match serial {
                    None => None,
                    Some(RawSerialOverride::Link(entry)) => Some(SerialOverride::Link(entry)),
                    Some(RawSerialOverride::Sentinel(s)) if s == APP_ASSIGNED => {
                        Some(SerialOverride::App)
                    }
                    Some(RawSerialOverride::Sentinel(s)) => {
                        return Err(format!(
                            "upstream '{}': serial must be a link or '{}', found '{}'",
                            hostname, APP_ASSIGNED, s
                        ))
                    }
                };
                Ok(UpstreamRef { hostname, serial })
            }
        }
    }
}
