//! # Protocol Encoders
//!
//! This module turns ordered register lists into ot-sim protocol
//! configuration trees for DNP3 and Modbus.
//!
//! ## Key Components
//!
//! - `endpoint.rs`: decides whether a node talks over a serial link or a
//!   network socket, and where
//! - `dnp3.rs`: outstation/master roots with per-type point addressing
//! - `modbus.rs`: server/client roots with the classic 1/10001/30001/40001
//!   register bases
//! - `types.rs`: the emitted configuration tree
//!
//! ## Address Parity
//!
//! A server-side encoder and the client-side encoder configured against it
//! never share state. They agree on addresses only because both are handed
//! the same [`RegisterList`](crate::device::RegisterList), in the same order,
//! and both assign addresses from the same fixed bases.
//!
//! ```text
//! server (outstation)            client (master)
//! breaker.voltage -> AI 0        breaker.voltage -> AI 0
//! breaker.current -> AI 1        breaker.current -> AI 1
//! breaker.status  -> BI 0        breaker.status  -> BI 0
//! ```

pub mod dnp3;
pub mod endpoint;
pub mod modbus;
pub mod types;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use dnp3::Dnp3Encoder;
pub use endpoint::{resolve_endpoints, EndpointError};
pub use modbus::ModbusEncoder;
pub use types::{
    Dnp3Point, Dnp3PointKind, Dnp3Root, Dnp3Session, ModbusRegister, ModbusRegisterKind,
    ModbusRoot, PointDirection, Transport,
};

/// Industrial control protocols ot-sim can simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Dnp3,
    Modbus,
}

impl Protocol {
    pub const ALL: [Protocol; 2] = [Protocol::Dnp3, Protocol::Modbus];

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Dnp3 => "dnp3",
            Protocol::Modbus => "modbus",
        }
    }

    /// TCP port used when an interface is given without one.
    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Dnp3 => 20000,
            Protocol::Modbus => 502,
        }
    }

    /// The ot-sim module that has to run on a node speaking this protocol.
    pub fn module(&self) -> SimulatorModule {
        SimulatorModule::new(
            self.as_str(),
            format!("ot-sim-{}-module {{{{config_file}}}}", self.as_str()),
        )
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of a protocol pairing an encoder configures.
///
/// `Server` is a DNP3 outstation or Modbus server; `Client` is a DNP3 master
/// or Modbus client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Server,
    Client,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Server => "server",
            Mode::Client => "client",
        }
    }
}

/// A runtime module declaration for the ot-sim CPU.
///
/// `command` carries a `{{config_file}}` placeholder that the template
/// renderer replaces with the on-node config path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorModule {
    pub name: String,
    pub command: String,
}

impl SimulatorModule {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_modules() {
        let dnp3 = Protocol::Dnp3.module();
        assert_eq!(dnp3.name, "dnp3");
        assert_eq!(dnp3.command, "ot-sim-dnp3-module {{config_file}}");

        let modbus = Protocol::Modbus.module();
        assert_eq!(modbus.command, "ot-sim-modbus-module {{config_file}}");
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(Protocol::Dnp3.default_port(), 20000);
        assert_eq!(Protocol::Modbus.default_port(), 502);
    }

    #[test]
    fn test_protocol_parses_lowercase() {
        let proto: Protocol = serde_yaml::from_str("modbus").unwrap();
        assert_eq!(proto, Protocol::Modbus);
        assert!(serde_yaml::from_str::<Protocol>("bacnet").is_err());
    }
}
