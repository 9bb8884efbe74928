//! Modbus encoder.
//!
//! Register type to Modbus table mapping:
//!
//! | register            | table            | first address |
//! |---------------------|------------------|---------------|
//! | `binary-read-write` | coil             | 1             |
//! | `binary-read`       | discrete input   | 10001         |
//! | `analog-read`       | input register   | 30001         |
//! | `analog-read-write` | holding register | 40001         |
//!
//! A `scaling` option is emitted on analog registers, negated on the server
//! side: the server divides by the scale on ingest, the client multiplies it
//! back on display.

use super::endpoint::{resolve_endpoints, EndpointError};
use super::types::{ModbusRegister, ModbusRegisterKind, ModbusRoot};
use super::{Mode, Protocol};
use crate::device::{Register, RegisterList, RegisterType};
use crate::topology::Node;

/// Root name used for Modbus blocks.
pub const DEFAULT_ROOT_NAME: &str = "modbus-outstation";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ModbusCounters {
    coil: u32,
    discrete: u32,
    input: u32,
    holding: u32,
}

impl Default for ModbusCounters {
    fn default() -> Self {
        Self {
            coil: ModbusRegisterKind::Coil.base_address(),
            discrete: ModbusRegisterKind::Discrete.base_address(),
            input: ModbusRegisterKind::Input.base_address(),
            holding: ModbusRegisterKind::Holding.base_address(),
        }
    }
}

impl ModbusCounters {
    fn next(&mut self, kind: ModbusRegisterKind) -> u32 {
        let counter = match kind {
            ModbusRegisterKind::Coil => &mut self.coil,
            ModbusRegisterKind::Discrete => &mut self.discrete,
            ModbusRegisterKind::Input => &mut self.input,
            ModbusRegisterKind::Holding => &mut self.holding,
        };
        let address = *counter;
        *counter += 1;
        address
    }
}

/// Builds the Modbus roots of one node in one direction.
#[derive(Debug)]
pub struct ModbusEncoder {
    mode: Mode,
    name: String,
    roots: Vec<ModbusRoot>,
    counters: ModbusCounters,
}

impl ModbusEncoder {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            name: DEFAULT_ROOT_NAME.to_string(),
            roots: Vec::new(),
            counters: ModbusCounters::default(),
        }
    }

    /// Emit one root per transport `node` exposes for Modbus.
    ///
    /// In client mode `node` is the server being polled.
    pub fn init_endpoint(&mut self, node: &Node) -> Result<(), EndpointError> {
        for transport in resolve_endpoints(Protocol::Modbus, node)? {
            self.roots.push(ModbusRoot {
                name: self.name.clone(),
                mode: self.mode,
                transport,
                registers: Vec::new(),
            });
        }
        log::debug!(
            "Modbus {} roots for {}: {}",
            self.mode.as_str(),
            node.hostname,
            self.roots.len()
        );
        Ok(())
    }

    /// Address `registers` and append them to every root.
    pub fn encode(&mut self, registers: &RegisterList) {
        let entries: Vec<ModbusRegister> = registers
            .iter()
            .map(|register| self.register(register))
            .collect();

        for root in &mut self.roots {
            root.registers.extend(entries.iter().cloned());
        }
    }

    fn register(&mut self, register: &Register) -> ModbusRegister {
        let kind = match register.kind {
            RegisterType::BinaryReadWrite => ModbusRegisterKind::Coil,
            RegisterType::BinaryRead => ModbusRegisterKind::Discrete,
            RegisterType::AnalogRead => ModbusRegisterKind::Input,
            RegisterType::AnalogReadWrite => ModbusRegisterKind::Holding,
        };

        let scaling = match kind {
            ModbusRegisterKind::Input | ModbusRegisterKind::Holding => {
                register.options.scaling.map(|scale| match self.mode {
                    Mode::Server => scale.saturating_neg(),
                    Mode::Client => scale,
                })
            }
            ModbusRegisterKind::Coil | ModbusRegisterKind::Discrete => None,
        };

        ModbusRegister {
            kind,
            address: self.counters.next(kind),
            tag: register.tag.clone(),
            scaling,
        }
    }

    pub fn roots(&self) -> &[ModbusRoot] {
        &self.roots
    }

    pub fn finish(self) -> Vec<ModbusRoot> {
        self.roots
    }
}
