//! Protocol configuration tree types.
//!
//! These structures are what the encoders emit and what ends up in each
//! node's ot-sim document. Field names follow ot-sim's element names.

use super::Mode;
use serde::Serialize;

// ============================================================================
// Transport
// ============================================================================

/// Physical transport of one protocol root.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Transport {
    /// Serial line, e.g. an RS-232 link between two VMs
    Serial {
        device: String,
        #[serde(rename = "baud-rate")]
        baud_rate: u32,
    },
    /// Network socket as `ip:port`
    Endpoint(String),
}

// ============================================================================
// DNP3
// ============================================================================

/// One DNP3 root block; a node gets one per physical endpoint.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Dnp3Root {
    pub name: String,
    pub mode: Mode,
    #[serde(flatten)]
    pub transport: Transport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master: Option<Dnp3Session>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outstation: Option<Dnp3Session>,
}

impl Dnp3Root {
    pub fn new(name: impl Into<String>, mode: Mode, transport: Transport) -> Self {
        Self {
            name: name.into(),
            mode,
            transport,
            master: None,
            outstation: None,
        }
    }

    /// The session points are appended to for this root's mode.
    pub fn session(&self) -> Option<&Dnp3Session> {
        match self.mode {
            Mode::Server => self.outstation.as_ref(),
            Mode::Client => self.master.as_ref(),
        }
    }

    /// Same as [`session`](Self::session), creating the default session for
    /// the root's mode when none was initialized.
    pub fn session_mut(&mut self) -> &mut Dnp3Session {
        match self.mode {
            Mode::Server => self.outstation.get_or_insert_with(Dnp3Session::outstation),
            Mode::Client => self.master.get_or_insert_with(Dnp3Session::master),
        }
    }
}

/// A DNP3 master or outstation session and its points.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Dnp3Session {
    pub name: String,
    pub local_address: u16,
    pub remote_address: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_rate: Option<u32>,
    pub points: Vec<Dnp3Point>,
}

impl Dnp3Session {
    pub const MASTER_ADDRESS: u16 = 1;
    pub const OUTSTATION_ADDRESS: u16 = 1024;
    pub const DEFAULT_SCAN_RATE: u32 = 5;

    pub fn master() -> Self {
        Self {
            name: "dnp3-master".to_string(),
            local_address: Self::MASTER_ADDRESS,
            remote_address: Self::OUTSTATION_ADDRESS,
            scan_rate: Some(Self::DEFAULT_SCAN_RATE),
            points: Vec::new(),
        }
    }

    pub fn outstation() -> Self {
        Self {
            name: "dnp3-outstation".to_string(),
            local_address: Self::OUTSTATION_ADDRESS,
            remote_address: Self::MASTER_ADDRESS,
            scan_rate: None,
            points: Vec::new(),
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PointDirection {
    Input,
    Output,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Dnp3PointKind {
    Analog,
    Binary,
}

/// An addressed DNP3 point.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Dnp3Point {
    pub direction: PointDirection,
    #[serde(rename = "type")]
    pub kind: Dnp3PointKind,
    pub address: u32,
    pub tag: String,
    /// Static variation group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sgvar: Option<String>,
    /// Event variation group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub egvar: Option<String>,
    /// Event class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Select-before-operate, outputs only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sbo: Option<bool>,
}

// ============================================================================
// Modbus
// ============================================================================

/// One Modbus root block; a node gets one per physical endpoint.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ModbusRoot {
    pub name: String,
    pub mode: Mode,
    #[serde(flatten)]
    pub transport: Transport,
    pub registers: Vec<ModbusRegister>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ModbusRegisterKind {
    Coil,
    Discrete,
    Input,
    Holding,
}

impl ModbusRegisterKind {
    /// First address of the register table.
    pub fn base_address(&self) -> u32 {
        match self {
            ModbusRegisterKind::Coil => 1,
            ModbusRegisterKind::Discrete => 10001,
            ModbusRegisterKind::Input => 30001,
            ModbusRegisterKind::Holding => 40001,
        }
    }
}

/// An addressed Modbus register.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ModbusRegister {
    #[serde(rename = "type")]
    pub kind: ModbusRegisterKind,
    pub address: u32,
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaling: Option<i64>,
}
