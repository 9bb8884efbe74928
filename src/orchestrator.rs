//! Configuration orchestrator.
//!
//! This module coordinates the overall synthesis process, managing the flow
//! from a validated topology through device resolution to one ot-sim document
//! per node, and writing those documents out.

use crate::device::{ConfigureError, DeviceGraph, ResolveError};
use crate::infrastructure::{InfrastructureError, InfrastructureMappings};
use crate::otsim::{build_config, OtSimConfig};
use crate::topology::{TopologyConfig, ValidationError};
use clap::ValueEnum;
use color_eyre::eyre::WrapErr;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors that abort a synthesis run
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Failed to configure '{hostname}': {source}")]
    Configure {
        hostname: String,
        #[source]
        source: ConfigureError,
    },
}

/// Serialization format of the written documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Yaml => "yaml",
            OutputFormat::Json => "json",
        }
    }
}

/// Synthesize the ot-sim document of every node, keyed by hostname.
///
/// Every device is resolved before any is configured, so a node's document
/// does not depend on where it sits in the topology file.
pub fn synthesize(topology: &TopologyConfig) -> Result<BTreeMap<String, OtSimConfig>, SynthesisError> {
    topology.validate()?;

    let mappings = InfrastructureMappings::with_defaults()?.resolve(&topology.infrastructure);

    let mut graph = DeviceGraph::from_topology(topology);
    graph.resolve_all(&mappings)?;

    let mut configs = BTreeMap::new();
    for node in &topology.nodes {
        let artifacts = graph
            .configure(&node.hostname, &topology.serial_links)
            .map_err(|source| SynthesisError::Configure {
                hostname: node.hostname.clone(),
                source,
            })?;

        let config = build_config(&topology.defaults, &node.metadata.settings, artifacts);
        configs.insert(node.hostname.clone(), config);
    }

    log::info!("Synthesized {} ot-sim configurations", configs.len());
    Ok(configs)
}

/// Path of the document written for `hostname`.
pub fn config_path(dir: &Path, hostname: &str, format: OutputFormat) -> PathBuf {
    dir.join(format!("{}.{}", hostname, format.extension()))
}

/// Write every document to `<dir>/<hostname>.<format>`, creating `dir`.
pub fn write_configs(
    configs: &BTreeMap<String, OtSimConfig>,
    dir: &Path,
    format: OutputFormat,
) -> color_eyre::eyre::Result<()> {
    fs::create_dir_all(dir)
        .wrap_err_with(|| format!("Failed to create output directory '{}'", dir.display()))?;

    for (hostname, config) in configs {
        let content = match format {
            OutputFormat::Yaml => serde_yaml::to_string(config)?,
            OutputFormat::Json => serde_json::to_string_pretty(config)?,
        };

        let path = config_path(dir, hostname, format);
        fs::write(&path, content)
            .wrap_err_with(|| format!("Failed to write '{}'", path.display()))?;
        log::debug!("Wrote {:?}", path);
    }

    log::info!("Wrote {} configurations to {:?}", configs.len(), dir);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn topology(yaml: &str) -> TopologyConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    const SIMPLE: &str = r#"
nodes:
  - hostname: rtu-1
    role: fd-server
    metadata:
      dnp3: [{type: bus, name: bus-1}]
    network:
      interfaces: [{name: eth0, address: 10.0.0.1}]
  - hostname: hmi
    role: fd-client
    metadata:
      upstream: [rtu-1]
"#;

    #[test]
    fn test_synthesize_every_node() {
        let configs = synthesize(&topology(SIMPLE)).unwrap();
        assert_eq!(configs.keys().collect::<Vec<_>>(), vec!["hmi", "rtu-1"]);

        let rtu = &configs["rtu-1"];
        assert_eq!(rtu.module_names(), vec!["backplane", "dnp3"]);
        assert_eq!(rtu.dnp3.len(), 1);
        assert!(rtu.modbus.is_empty());
    }

    #[test]
    fn test_synthesize_reports_failing_node() {
        let err = synthesize(&topology(
            "nodes:\n  - {hostname: rtu-1, role: fd-server, metadata: {dnp3: [{type: bus, name: b}]}}\n",
        ))
        .unwrap_err();

        match err {
            SynthesisError::Configure { hostname, .. } => assert_eq!(hostname, "rtu-1"),
            other => panic!("expected configure error, got {:?}", other),
        }
    }

    #[test]
    fn test_write_configs_yaml_and_json() {
        let configs = synthesize(&topology(SIMPLE)).unwrap();
        let dir = TempDir::new().unwrap();

        write_configs(&configs, dir.path(), OutputFormat::Yaml).unwrap();
        write_configs(&configs, dir.path(), OutputFormat::Json).unwrap();

        let yaml = fs::read_to_string(config_path(dir.path(), "rtu-1", OutputFormat::Yaml)).unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed["dnp3"][0]["mode"], serde_yaml::Value::from("server"));

        let json = fs::read_to_string(config_path(dir.path(), "hmi", OutputFormat::Json)).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["dnp3"][0]["endpoint"], "10.0.0.1:20000");
    }
}
