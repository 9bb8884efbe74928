//! ot-sim document and settings type definitions.
//!
//! `OtSimSettings` is what users write (application defaults and per-node
//! overrides); `OtSimConfig` is what gets emitted for every node.

use crate::protocol::{Dnp3Root, ModbusRoot, SimulatorModule};
use crate::utils::scalar::explicit_null;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_PULL_ENDPOINT: &str = "tcp://127.0.0.1:1234";
pub const DEFAULT_PUB_ENDPOINT: &str = "tcp://127.0.0.1:5678";
pub const DEFAULT_API_ENDPOINT: &str = "0.0.0.0:9101";
pub const DEFAULT_ELASTIC_ENDPOINT: &str = "http://localhost:9200";
pub const DEFAULT_LOG_INDEX: &str = "ot-sim-logs";
pub const DEFAULT_INDEX_BASE_NAME: &str = "ot-sim";

// ============================================================================
// Settings (input)
// ============================================================================

/// ot-sim settings as written in application or node metadata.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OtSimSettings {
    #[serde(default)]
    pub message_bus: Option<MessageBusSettings>,
    #[serde(default)]
    pub cpu_module: Option<CpuModuleSettings>,
    #[serde(default)]
    pub logs: Option<LogSettings>,
    /// `Some(None)` when set to `null`, which disables ground truth for a
    /// node even if it is enabled application-wide
    #[serde(default, deserialize_with = "explicit_null")]
    pub ground_truth_module: Option<Option<GroundTruthSettings>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MessageBusSettings {
    #[serde(default)]
    pub pull_endpoint: Option<String>,
    #[serde(default)]
    pub pub_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CpuModuleSettings {
    #[serde(default)]
    pub api_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LogSettings {
    #[serde(default)]
    pub elastic: Option<ElasticLogSettings>,
    /// Loki push endpoint
    #[serde(default)]
    pub loki: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ElasticLogSettings {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub index: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GroundTruthSettings {
    #[serde(default)]
    pub elastic: Option<ElasticGroundTruthSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ElasticGroundTruthSettings {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub index_base_name: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

// ============================================================================
// Document (output)
// ============================================================================

/// Complete ot-sim configuration of one node.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct OtSimConfig {
    pub message_bus: MessageBus,
    pub cpu: Cpu,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ground_truth: Option<GroundTruth>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dnp3: Vec<Dnp3Root>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modbus: Vec<ModbusRoot>,
}

impl OtSimConfig {
    /// Names of the CPU modules, in launch order.
    pub fn module_names(&self) -> Vec<&str> {
        self.cpu.modules.iter().map(|m| m.name.as_str()).collect()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct MessageBus {
    pub pull_endpoint: String,
    pub pub_endpoint: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Cpu {
    pub api_endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<Logs>,
    pub modules: Vec<SimulatorModule>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Logs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elastic: Option<ElasticLogs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loki: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ElasticLogs {
    pub endpoint: String,
    pub index: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GroundTruth {
    pub elastic: ElasticGroundTruth,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ElasticGroundTruth {
    pub endpoint: String,
    pub index_base_name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}
