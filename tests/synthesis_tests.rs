#[cfg(test)]
mod synthesis_tests {
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    use otsim_config::config_loader::load_topology;
    use otsim_config::orchestrator::{config_path, synthesize, write_configs, OutputFormat, SynthesisError};
    use otsim_config::otsim::OtSimConfig;
    use otsim_config::protocol::{Dnp3PointKind, Dnp3Root, Mode, PointDirection, Transport};
    use otsim_config::topology::TopologyConfig;

    const SUBSTATION: &str = r#"
defaults:
  ground-truth-module:
    elastic:
      endpoint: http://elastic:9200
      labels:
        site: substation-1

infrastructure:
  power-distribution:
    load:
      current:
        type: analog-read
        modbus:
          scaling: 2

nodes:
  - hostname: rtu-1
    role: field-device-server
    metadata:
      dnp3:
        - type: breaker
          name: grid/bkr-1
    network:
      interfaces:
        - name: eth0
          address: 10.0.0.1

  - hostname: plc-1
    role: field-device-server
    metadata:
      modbus:
        interface: ot:5020
        devices:
          - type: load
            name: load-1
    network:
      interfaces:
        - name: mgmt
          address: 192.168.1.2
        - name: ot
          address: 10.0.0.2/24

  - hostname: fep-1
    role: front-end-processor
    metadata:
      upstream: [rtu-1, plc-1]
      dnp3:
        interface: 10.0.1.1
    network:
      interfaces:
        - name: eth0
          address: 10.0.0.3

  - hostname: hmi
    role: field-device-client
    metadata:
      connected_rtus: [fep-1]
      ground-truth-module: null
"#;

    const APP_SERIAL: &str = r#"
serial_links:
  rtu-1:
    - {remote: fep-1, device: /dev/ttyS1, baud: 19200}
    - {remote: hmi, device: /dev/ttyS2, baud: 9600}
  fep-1:
    - {remote: rtu-1, device: /dev/ttyUSB0, baud: 19200}
  hmi:
    - {remote: rtu-1, device: /dev/ttyS3, baud: 9600}

nodes:
  - hostname: rtu-1
    role: field-device-server
    metadata:
      dnp3:
        serial: app
        devices:
          - type: breaker
            name: bkr-1

  - hostname: fep-1
    role: front-end-processor
    metadata:
      upstream: [rtu-1]
    network:
      interfaces:
        - name: eth0
          address: 10.0.0.3

  - hostname: hmi
    role: field-device-client
    metadata:
      upstream: [rtu-1]
"#;

    fn load(yaml: &str) -> TopologyConfig {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();
        load_topology(temp_file.path()).unwrap()
    }

    fn point(root: &Dnp3Root, tag: &str) -> (PointDirection, Dnp3PointKind, u32) {
        let session = root.session().unwrap();
        let p = session
            .points
            .iter()
            .find(|p| p.tag == tag)
            .unwrap_or_else(|| panic!("no point {} on {}", tag, root.name));
        (p.direction, p.kind, p.address)
    }

    fn root_by_mode(config: &OtSimConfig, mode: Mode) -> Vec<&Dnp3Root> {
        config.dnp3.iter().filter(|r| r.mode == mode).collect()
    }

    #[test]
    fn test_substation_documents() {
        let configs = synthesize(&load(SUBSTATION)).unwrap();
        assert_eq!(configs.len(), 4);

        let rtu = &configs["rtu-1"];
        assert_eq!(rtu.module_names(), vec!["backplane", "ground-truth", "dnp3"]);
        assert_eq!(
            rtu.dnp3[0].transport,
            Transport::Endpoint("10.0.0.1:20000".to_string())
        );
        let ground_truth = rtu.ground_truth.as_ref().unwrap();
        assert_eq!(ground_truth.elastic.endpoint, "http://elastic:9200");
        assert_eq!(ground_truth.elastic.index_base_name, "ot-sim");

        let plc = &configs["plc-1"];
        assert_eq!(plc.module_names(), vec!["backplane", "ground-truth", "modbus"]);
        assert_eq!(
            plc.modbus[0].transport,
            Transport::Endpoint("10.0.0.2:5020".to_string())
        );

        let fep = &configs["fep-1"];
        assert_eq!(fep.module_names(), vec!["backplane", "ground-truth", "dnp3", "modbus"]);
        assert_eq!(root_by_mode(fep, Mode::Client).len(), 1);
        assert_eq!(fep.modbus.len(), 1);
        assert_eq!(fep.modbus[0].mode, Mode::Client);
        let fep_outstation = root_by_mode(fep, Mode::Server);
        assert_eq!(fep_outstation.len(), 1);
        assert_eq!(
            fep_outstation[0].transport,
            Transport::Endpoint("10.0.1.1:20000".to_string())
        );

        let hmi = &configs["hmi"];
        assert!(hmi.ground_truth.is_none());
        assert_eq!(hmi.module_names(), vec!["backplane", "dnp3"]);
        assert_eq!(hmi.dnp3.len(), 1);
        assert_eq!(
            hmi.dnp3[0].transport,
            Transport::Endpoint("10.0.1.1:20000".to_string())
        );
    }

    #[test]
    fn test_addresses_agree_on_both_ends_of_every_link() {
        let configs = synthesize(&load(SUBSTATION)).unwrap();

        let rtu = &configs["rtu-1"].dnp3[0];
        let fep = &configs["fep-1"];
        let fep_master = root_by_mode(fep, Mode::Client)[0];
        let fep_outstation = root_by_mode(fep, Mode::Server)[0];
        let hmi = &configs["hmi"].dnp3[0];

        for tag in ["bkr-1.voltage", "bkr-1.status", "bkr-1.controls"] {
            assert_eq!(point(rtu, tag), point(fep_master, tag), "{}", tag);
            assert_eq!(point(fep_outstation, tag), point(hmi, tag), "{}", tag);
        }
        assert_eq!(
            point(rtu, "bkr-1.controls"),
            (PointDirection::Output, Dnp3PointKind::Binary, 0)
        );

        // Modbus points relayed by the FEP continue the DNP3 counters after
        // the breaker's four analog inputs.
        assert_eq!(
            point(fep_outstation, "load-1.current"),
            (PointDirection::Input, Dnp3PointKind::Analog, 5)
        );
        assert_eq!(point(hmi, "load-1.current"), point(fep_outstation, "load-1.current"));

        let plc = &configs["plc-1"].modbus[0];
        let fep_client = &fep.modbus[0];
        for (server, client) in plc.registers.iter().zip(fep_client.registers.iter()) {
            assert_eq!(server.tag, client.tag);
            assert_eq!(server.address, client.address);
        }
    }

    #[test]
    fn test_writable_breaker_status_parity() {
        let topology = load(
            r#"
infrastructure:
  power-distribution:
    breaker:
      status: analog-read-write
nodes:
  - hostname: relay
    role: fd-server
    metadata:
      dnp3:
        - type: breaker
          name: breaker
    network:
      interfaces: [{name: eth0, address: 10.0.0.8}]
  - hostname: hmi
    role: fd-client
    metadata:
      upstream: [relay]
"#,
        );
        let configs = synthesize(&topology).unwrap();

        let outstation = &configs["relay"].dnp3[0];
        let master = &configs["hmi"].dnp3[0];
        let expected = (PointDirection::Output, Dnp3PointKind::Analog, 0);
        assert_eq!(point(outstation, "breaker.status"), expected);
        assert_eq!(point(master, "breaker.status"), expected);
        assert_eq!(master.mode, Mode::Client);
    }

    #[test]
    fn test_modbus_scaling_is_negated_on_server_only() {
        let configs = synthesize(&load(SUBSTATION)).unwrap();

        let server = configs["plc-1"].modbus[0]
            .registers
            .iter()
            .find(|r| r.tag == "load-1.current")
            .unwrap();
        let client = configs["fep-1"].modbus[0]
            .registers
            .iter()
            .find(|r| r.tag == "load-1.current")
            .unwrap();

        assert_eq!(server.address, 30002);
        assert_eq!(server.scaling, Some(-2));
        assert_eq!(client.scaling, Some(2));
    }

    #[test]
    fn test_node_order_does_not_change_output() {
        let forward: TopologyConfig = serde_yaml::from_str(SUBSTATION).unwrap();
        let mut reversed = forward.clone();
        reversed.nodes.reverse();

        assert_eq!(synthesize(&forward).unwrap(), synthesize(&reversed).unwrap());

        // The server's app-assigned links stay its own, whichever node
        // happens to be configured first.
        let forward: TopologyConfig = serde_yaml::from_str(APP_SERIAL).unwrap();
        let mut reversed = forward.clone();
        reversed.nodes.reverse();

        let configs = synthesize(&forward).unwrap();
        assert_eq!(configs, synthesize(&reversed).unwrap());

        let rtu_devices: Vec<&Transport> = configs["rtu-1"].dnp3.iter().map(|r| &r.transport).collect();
        assert_eq!(
            rtu_devices,
            vec![
                &Transport::Serial {
                    device: "/dev/ttyS1".to_string(),
                    baud_rate: 19200
                },
                &Transport::Serial {
                    device: "/dev/ttyS2".to_string(),
                    baud_rate: 9600
                },
            ]
        );
        let fep_master = root_by_mode(&configs["fep-1"], Mode::Client);
        assert_eq!(fep_master.len(), 1);
        assert_eq!(
            fep_master[0].transport,
            Transport::Serial {
                device: "/dev/ttyUSB0".to_string(),
                baud_rate: 19200
            }
        );
        assert_eq!(
            configs["hmi"].dnp3[0].transport,
            Transport::Serial {
                device: "/dev/ttyS3".to_string(),
                baud_rate: 9600
            }
        );
    }

    #[test]
    fn test_cycle_aborts_synthesis() {
        let topology: TopologyConfig = serde_yaml::from_str(
            r#"
nodes:
  - {hostname: fep-a, role: fep, metadata: {upstream: [fep-b]}}
  - {hostname: fep-b, role: fep, metadata: {upstream: [fep-a]}}
"#,
        )
        .unwrap();

        let err = synthesize(&topology).unwrap_err();
        assert!(matches!(err, SynthesisError::Resolve(_)));
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_write_documents() {
        let configs = synthesize(&load(SUBSTATION)).unwrap();
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested/out");

        write_configs(&configs, &out, OutputFormat::Yaml).unwrap();

        for hostname in ["rtu-1", "plc-1", "fep-1", "hmi"] {
            let path = config_path(&out, hostname, OutputFormat::Yaml);
            assert!(path.exists(), "missing {:?}", path);
        }

        let content = std::fs::read_to_string(config_path(&out, "plc-1", OutputFormat::Yaml)).unwrap();
        let doc: serde_yaml::Value = serde_yaml::from_str(&content).unwrap();
        assert_eq!(doc["message-bus"]["pull-endpoint"], serde_yaml::Value::from("tcp://127.0.0.1:1234"));
        assert_eq!(doc["modbus"][0]["endpoint"], serde_yaml::Value::from("10.0.0.2:5020"));
        assert_eq!(doc["modbus"][0]["registers"][0]["type"], serde_yaml::Value::from("input"));
    }
}
