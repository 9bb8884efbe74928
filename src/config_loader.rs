use crate::topology::TopologyConfig;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{info, warn};
use std::fs::File;
use std::path::Path;

/// Load, parse and validate a topology from a YAML file
pub fn load_topology(topology_path: &Path) -> Result<TopologyConfig> {
    info!("Loading topology from: {:?}", topology_path);

    let file = File::open(topology_path)
        .wrap_err_with(|| format!("Failed to open topology file '{}'", topology_path.display()))?;

    let topology: TopologyConfig = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse topology file '{}'", topology_path.display()))?;

    topology.validate()?;

    let orphans = topology
        .nodes
        .iter()
        .filter(|node| node.metadata.dnp3.is_none() && node.metadata.modbus.is_none())
        .filter(|node| node.metadata.upstream().is_empty())
        .count();
    if orphans > 0 {
        warn!("{} nodes declare neither protocol blocks nor upstream devices", orphans);
    }

    info!(
        "Loaded {} nodes ({} serial link assignments)",
        topology.nodes.len(),
        topology.serial_links.len()
    );

    Ok(topology)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Role;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_topology() {
        let yaml = r#"
nodes:
  - hostname: rtu-1
    role: field-device-server
    metadata:
      dnp3:
        - type: breaker
          name: bkr-1
    network:
      interfaces:
        - name: eth0
          address: 10.0.0.1
  - hostname: hmi
    role: field-device-client
    metadata:
      upstream: [rtu-1]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let topology = load_topology(temp_file.path()).unwrap();
        assert_eq!(topology.nodes.len(), 2);
        assert_eq!(topology.nodes[0].role, Role::FieldDeviceServer);
    }

    #[test]
    fn test_load_rejects_invalid_topology() {
        let yaml = r#"
nodes:
  - {hostname: rtu-1, role: fd-server}
  - {hostname: rtu-1, role: fd-server}
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let err = load_topology(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("duplicate hostname"));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_topology(Path::new("/nonexistent/topology.yaml")).is_err());
    }
}
