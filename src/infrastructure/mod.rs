//! # Infrastructure Mapping Module
//!
//! Maps infrastructure types (breaker, load, pump, ...) to the variables a
//! monitored device of that type exposes and the register type of each.
//!
//! ## Table Layout
//!
//! ```text
//! infrastructure class      power-distribution
//! \-- device type           breaker
//!     \-- variable          status: binary-read
//!                           current: { type: analog-read, modbus: { scaling: 2 } }
//! ```
//!
//! A default table ships with the crate (`defaults.yaml`). A deployment can
//! override it per class: an overridden variable replaces the default entry
//! wholesale and keeps its position, new variables and types are appended,
//! and everything the override does not mention is kept.

use crate::device::{RegisterOptions, RegisterType};
use crate::protocol::Protocol;
use crate::utils::OrderedMap;
use serde::{Deserialize, Serialize};

const DEFAULT_TABLE: &str = include_str!("defaults.yaml");

/// Variable name -> type specifier, in declaration order.
pub type VariableTable = OrderedMap<VariableSpec>;
/// Device type -> variables.
pub type InfrastructureClass = OrderedMap<VariableTable>;
/// Infrastructure class -> device types, as written by a deployment.
pub type InfrastructureOverrides = OrderedMap<InfrastructureClass>;

/// Errors from loading infrastructure tables
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    #[error("Failed to parse infrastructure table: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Register type of a variable, with optional per-protocol options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableSpec {
    Bare(RegisterType),
    Detailed(DetailedSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedSpec {
    #[serde(rename = "type")]
    pub kind: RegisterType,
    #[serde(default)]
    pub dnp3: RegisterOptions,
    #[serde(default)]
    pub modbus: RegisterOptions,
}

impl VariableSpec {
    pub fn kind(&self) -> RegisterType {
        match self {
            VariableSpec::Bare(kind) => *kind,
            VariableSpec::Detailed(spec) => spec.kind,
        }
    }

    /// Options for `protocol`; empty for bare specifiers.
    pub fn options(&self, protocol: Protocol) -> RegisterOptions {
        match self {
            VariableSpec::Bare(_) => RegisterOptions::default(),
            VariableSpec::Detailed(spec) => match protocol {
                Protocol::Dnp3 => spec.dnp3.clone(),
                Protocol::Modbus => spec.modbus.clone(),
            },
        }
    }
}

/// Resolved infrastructure tables for one synthesis run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfrastructureMappings {
    classes: OrderedMap<InfrastructureClass>,
}

impl InfrastructureMappings {
    /// The table shipped with the crate.
    pub fn with_defaults() -> Result<Self, InfrastructureError> {
        Self::from_yaml(DEFAULT_TABLE)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, InfrastructureError> {
        let classes: OrderedMap<InfrastructureClass> = serde_yaml::from_str(yaml)?;
        Ok(Self { classes })
    }

    /// Merge `overrides` for `class` onto the defaults of that class.
    pub fn merge_with_default(
        &self,
        class: &str,
        overrides: Option<&InfrastructureClass>,
    ) -> InfrastructureClass {
        let mut merged = self.classes.get(class).cloned().unwrap_or_default();

        if let Some(overrides) = overrides {
            for (kind, variables) in overrides.iter() {
                match merged.get_mut(kind) {
                    Some(existing) => {
                        for (var, spec) in variables.iter() {
                            existing.insert(var, spec.clone());
                        }
                    }
                    None => {
                        merged.insert(kind, variables.clone());
                    }
                }
            }
        }

        merged
    }

    /// Merge every class of `overrides` onto these defaults.
    pub fn resolve(&self, overrides: &InfrastructureOverrides) -> Self {
        let mut classes = OrderedMap::new();

        for class in self.classes.keys().chain(overrides.keys()) {
            if classes.contains_key(class) {
                continue;
            }
            let merged = self.merge_with_default(class, overrides.get(class));
            classes.insert(class, merged);
        }

        log::debug!("Resolved {} infrastructure classes", classes.len());
        Self { classes }
    }

    pub fn class(&self, class: &str) -> Option<&InfrastructureClass> {
        self.classes.get(class)
    }

    /// Variables of `kind` in `class`.
    pub fn device_type(&self, class: &str, kind: &str) -> Option<&VariableTable> {
        self.classes.get(class).and_then(|c| c.get(kind))
    }
}
