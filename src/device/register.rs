//! Register model.
//!
//! A [`Register`] is one monitored or controlled point, independent of the
//! protocol that will eventually carry it. Registers are immutable once
//! built; graph resolution copies them between devices.

use crate::protocol::Protocol;
use crate::utils::scalar::{bool_like, int_like, string_like};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type of a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegisterType {
    AnalogRead,
    AnalogReadWrite,
    BinaryRead,
    BinaryReadWrite,
}

impl RegisterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegisterType::AnalogRead => "analog-read",
            RegisterType::AnalogReadWrite => "analog-read-write",
            RegisterType::BinaryRead => "binary-read",
            RegisterType::BinaryReadWrite => "binary-read-write",
        }
    }
}

impl fmt::Display for RegisterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol-specific options attached to a point.
///
/// DNP3 reads `sgvar`, `egvar`, `class` and `sbo`; Modbus reads `scaling`.
/// Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterOptions {
    #[serde(default, deserialize_with = "string_like", skip_serializing_if = "Option::is_none")]
    pub sgvar: Option<String>,
    #[serde(default, deserialize_with = "string_like", skip_serializing_if = "Option::is_none")]
    pub egvar: Option<String>,
    #[serde(default, deserialize_with = "string_like", skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, deserialize_with = "bool_like", skip_serializing_if = "Option::is_none")]
    pub sbo: Option<bool>,
    #[serde(default, deserialize_with = "int_like", skip_serializing_if = "Option::is_none")]
    pub scaling: Option<i64>,
}

/// A single typed point with its tag and option bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    pub kind: RegisterType,
    pub tag: String,
    pub options: RegisterOptions,
}

impl Register {
    pub fn new(kind: RegisterType, tag: impl Into<String>, options: RegisterOptions) -> Self {
        Self {
            kind,
            tag: tag.into(),
            options,
        }
    }

    /// Build the tag for `variable` on the named device instance.
    ///
    /// Instance names may carry a federation prefix (`federate/bus-1`); only
    /// the last `/` segment is part of the tag.
    pub fn tag_for(instance: &str, variable: &str) -> String {
        let name = instance.rsplit('/').next().unwrap_or(instance);
        format!("{}.{}", name, variable)
    }
}

/// The ordered register list handed to a server encoder and to every client
/// encoder configured against that server.
///
/// Addresses are assigned in list order, so both sides of a pairing must see
/// the same list. Devices hand out shared references or clones of one list
/// rather than rebuilding it per side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterList {
    registers: Vec<Register>,
}

impl RegisterList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, register: Register) {
        self.registers.push(register);
    }

    pub fn extend_from(&mut self, other: &RegisterList) {
        self.registers.extend(other.registers.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Register> {
        self.registers.iter()
    }

    pub fn tags(&self) -> Vec<&str> {
        self.registers.iter().map(|r| r.tag.as_str()).collect()
    }
}

impl From<Vec<Register>> for RegisterList {
    fn from(registers: Vec<Register>) -> Self {
        Self { registers }
    }
}

impl<'a> IntoIterator for &'a RegisterList {
    type Item = &'a Register;
    type IntoIter = std::slice::Iter<'a, Register>;

    fn into_iter(self) -> Self::IntoIter {
        self.registers.iter()
    }
}

/// Registers of one device keyed by protocol.
///
/// Iteration follows the order in which protocols were first added, which
/// for a front-end processor is the order its upstream peers declared them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterTable {
    entries: Vec<(Protocol, RegisterList)>,
}

impl RegisterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, protocol: Protocol) -> Option<&RegisterList> {
        self.entries.iter().find(|(p, _)| *p == protocol).map(|(_, list)| list)
    }

    pub fn contains(&self, protocol: Protocol) -> bool {
        self.get(protocol).is_some()
    }

    /// The list for `protocol`, created empty when missing.
    pub fn entry(&mut self, protocol: Protocol) -> &mut RegisterList {
        let index = match self.entries.iter().position(|(p, _)| *p == protocol) {
            Some(index) => index,
            None => {
                self.entries.push((protocol, RegisterList::new()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }

    /// Append every list of `other` onto the matching list here.
    pub fn extend_from(&mut self, other: &RegisterTable) {
        for (protocol, list) in other.iter() {
            self.entry(protocol).extend_from(list);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Protocol, &RegisterList)> {
        self.entries.iter().map(|(p, list)| (*p, list))
    }

    pub fn protocols(&self) -> Vec<Protocol> {
        self.entries.iter().map(|(p, _)| *p).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every register of every protocol, in table order.
    pub fn concatenated(&self) -> RegisterList {
        let mut all = RegisterList::new();
        for (_, list) in self.iter() {
            all.extend_from(list);
        }
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(kind: RegisterType, tag: &str) -> Register {
        Register::new(kind, tag, RegisterOptions::default())
    }

    #[test]
    fn test_tag_strips_federation_prefix() {
        assert_eq!(Register::tag_for("bkr-1", "status"), "bkr-1.status");
        assert_eq!(Register::tag_for("grid/bkr-1", "status"), "bkr-1.status");
        assert_eq!(Register::tag_for("a/b/bkr-1", "status"), "bkr-1.status");
    }

    #[test]
    fn test_register_type_names() {
        let kind: RegisterType = serde_yaml::from_str("analog-read-write").unwrap();
        assert_eq!(kind, RegisterType::AnalogReadWrite);
        assert!(serde_yaml::from_str::<RegisterType>("analog").is_err());
    }

    #[test]
    fn test_table_keeps_first_seen_protocol_order() {
        let mut table = RegisterTable::new();
        table.entry(Protocol::Modbus).push(reg(RegisterType::AnalogRead, "a.v"));
        table.entry(Protocol::Dnp3).push(reg(RegisterType::BinaryRead, "b.s"));
        table.entry(Protocol::Modbus).push(reg(RegisterType::AnalogRead, "a.i"));

        assert_eq!(table.protocols(), vec![Protocol::Modbus, Protocol::Dnp3]);
        assert_eq!(table.concatenated().tags(), vec!["a.v", "a.i", "b.s"]);
    }

    #[test]
    fn test_extend_from_appends_per_protocol() {
        let mut upstream = RegisterTable::new();
        upstream.entry(Protocol::Dnp3).push(reg(RegisterType::AnalogRead, "up.v"));

        let mut table = RegisterTable::new();
        table.entry(Protocol::Dnp3).push(reg(RegisterType::AnalogRead, "own.v"));
        table.extend_from(&upstream);

        assert_eq!(table.get(Protocol::Dnp3).unwrap().tags(), vec!["own.v", "up.v"]);
        assert!(!table.contains(Protocol::Modbus));
    }

    #[test]
    fn test_options_from_loose_yaml() {
        let yaml = "sgvar: Group30Var5\nclass: 2\nsbo: true\nscaling: -3\nunknown: x\n";
        let options: RegisterOptions = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(options.sgvar.as_deref(), Some("Group30Var5"));
        assert_eq!(options.class.as_deref(), Some("2"));
        assert_eq!(options.sbo, Some(true));
        assert_eq!(options.scaling, Some(-3));
    }
}
