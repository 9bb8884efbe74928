//! DNP3 encoder.
//!
//! Register type to DNP3 point mapping:
//!
//! | register            | point          | counter |
//! |---------------------|----------------|---------|
//! | `analog-read`       | analog input   | AI      |
//! | `analog-read-write` | analog output  | AO      |
//! | `binary-read`       | binary input   | BI      |
//! | `binary-read-write` | binary output  | BO      |
//!
//! Each counter starts at 0 and is scoped to one encoder instance.

use super::endpoint::{resolve_endpoints, EndpointError};
use super::types::{Dnp3Point, Dnp3PointKind, Dnp3Root, PointDirection};
use super::{Mode, Protocol};
use crate::device::{Register, RegisterList, RegisterType};
use crate::topology::Node;

/// Root name used for DNP3 blocks.
pub const DEFAULT_ROOT_NAME: &str = "dnp3-outstation";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Dnp3Counters {
    analog_input: u32,
    analog_output: u32,
    binary_input: u32,
    binary_output: u32,
}

impl Dnp3Counters {
    fn next(&mut self, kind: RegisterType) -> u32 {
        let counter = match kind {
            RegisterType::AnalogRead => &mut self.analog_input,
            RegisterType::AnalogReadWrite => &mut self.analog_output,
            RegisterType::BinaryRead => &mut self.binary_input,
            RegisterType::BinaryReadWrite => &mut self.binary_output,
        };
        let address = *counter;
        *counter += 1;
        address
    }
}

/// Builds the DNP3 roots of one node in one direction.
#[derive(Debug)]
pub struct Dnp3Encoder {
    mode: Mode,
    name: String,
    roots: Vec<Dnp3Root>,
    counters: Dnp3Counters,
}

impl Dnp3Encoder {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            name: DEFAULT_ROOT_NAME.to_string(),
            roots: Vec::new(),
            counters: Dnp3Counters::default(),
        }
    }

    /// Emit one root per transport `node` exposes for DNP3.
    ///
    /// In client mode `node` is the outstation being polled, not the node the
    /// configuration is for.
    pub fn init_endpoint(&mut self, node: &Node) -> Result<(), EndpointError> {
        for transport in resolve_endpoints(Protocol::Dnp3, node)? {
            self.roots.push(Dnp3Root::new(self.name.clone(), self.mode, transport));
        }
        log::debug!(
            "DNP3 {} roots for {}: {}",
            self.mode.as_str(),
            node.hostname,
            self.roots.len()
        );
        Ok(())
    }

    /// Add a master (client) or outstation (server) session to every root.
    pub fn init_roles(&mut self) {
        for root in &mut self.roots {
            root.session_mut();
        }
    }

    /// Address `registers` and append them to every root.
    ///
    /// Addresses are assigned once per register, so every root of this
    /// encoder carries the same address for the same tag.
    pub fn encode(&mut self, registers: &RegisterList) {
        let points: Vec<Dnp3Point> = registers
            .iter()
            .map(|register| self.point(register))
            .collect();

        for root in &mut self.roots {
            root.session_mut().points.extend(points.iter().cloned());
        }
    }

    fn point(&mut self, register: &Register) -> Dnp3Point {
        let (direction, kind) = match register.kind {
            RegisterType::AnalogRead => (PointDirection::Input, Dnp3PointKind::Analog),
            RegisterType::AnalogReadWrite => (PointDirection::Output, Dnp3PointKind::Analog),
            RegisterType::BinaryRead => (PointDirection::Input, Dnp3PointKind::Binary),
            RegisterType::BinaryReadWrite => (PointDirection::Output, Dnp3PointKind::Binary),
        };
        let options = &register.options;

        Dnp3Point {
            direction,
            kind,
            address: self.counters.next(register.kind),
            tag: register.tag.clone(),
            sgvar: options.sgvar.clone(),
            egvar: options.egvar.clone(),
            class: options.class.clone(),
            sbo: match direction {
                PointDirection::Output => options.sbo,
                PointDirection::Input => None,
            },
        }
    }

    pub fn roots(&self) -> &[Dnp3Root] {
        &self.roots
    }

    pub fn finish(self) -> Vec<Dnp3Root> {
        self.roots
    }
}
