//! Endpoint resolution.
//!
//! Decides, per node and protocol, which physical transports a protocol root
//! binds to. Priority order:
//! 1) Serial links listed in the protocol block (one root per link)
//! 2) The protocol block's `interface`, as a literal IP or an interface name,
//!    optionally followed by `:port`. An IPv6 address with a port must be
//!    bracketed (`[fd00::5]:20002`)
//! 3) The address of the node's first network interface

use super::{Protocol, Transport};
use crate::topology::{Node, SerialSpec};
use std::net::{IpAddr, SocketAddr};

/// Serial device used when a link does not name one.
pub const DEFAULT_SERIAL_DEVICE: &str = "/dev/ttyS4";
/// Baud rate used when a link does not give one.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Errors that leave a node without a usable endpoint
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("Node '{hostname}' has no address for {protocol}: no serial link, no interface and no addressed network interface")]
    NoAddress { hostname: String, protocol: Protocol },

    #[error("Node '{hostname}' has no addressed interface named '{interface}' for {protocol}")]
    UnknownInterface {
        hostname: String,
        protocol: Protocol,
        interface: String,
    },

    #[error("Node '{hostname}' has an invalid {protocol} port '{port}'")]
    InvalidPort {
        hostname: String,
        protocol: Protocol,
        port: String,
    },

    #[error("Node '{hostname}' has an invalid IP address '{address}'")]
    InvalidAddress { hostname: String, address: String },

    #[error("Node '{hostname}' has no serial link to '{remote}' in the serial link table")]
    NoSerialLink { hostname: String, remote: String },

    #[error("Node '{hostname}' uses app-assigned {protocol} serial links but none were assigned")]
    UnassignedSerial { hostname: String, protocol: Protocol },
}

/// Resolve every transport `node` exposes for `protocol`.
///
/// A structured protocol block can yield serial roots and a network root at
/// the same time. When it yields nothing, or the block is missing or in the
/// legacy list form, the node's first interface address is used.
pub fn resolve_endpoints(protocol: Protocol, node: &Node) -> Result<Vec<Transport>, EndpointError> {
    let mut transports = Vec::new();

    if let Some(block) = node.metadata.protocol(protocol).filter(|b| b.structured) {
        match &block.serial {
            Some(SerialSpec::Links(links)) => {
                for link in links {
                    transports.push(Transport::Serial {
                        device: link
                            .device
                            .clone()
                            .unwrap_or_else(|| DEFAULT_SERIAL_DEVICE.to_string()),
                        baud_rate: link.baud.unwrap_or(DEFAULT_BAUD_RATE),
                    });
                }
            }
            Some(SerialSpec::App) => {
                return Err(EndpointError::UnassignedSerial {
                    hostname: node.hostname.clone(),
                    protocol,
                });
            }
            None => {}
        }

        if let Some(interface) = &block.interface {
            let address = interface_endpoint(protocol, node, interface)?;
            transports.push(Transport::Endpoint(address.to_string()));
        }
    }

    if transports.is_empty() {
        log::debug!(
            "Node {} has no explicit {} endpoint, using its primary interface",
            node.hostname,
            protocol
        );
        let address = primary_endpoint(protocol, node)?;
        transports.push(Transport::Endpoint(address.to_string()));
    }

    Ok(transports)
}

/// Resolve an `interface` spec: `10.0.0.1`, `10.0.0.1:2000`, `eth1`,
/// `eth1:2000` or a bracketed IPv6 socket address.
///
/// An unbracketed IPv6 spec is only ever a bare address: `fd00::5:2000` is
/// the address `fd00::5:2000` on the default port, and a spec such as
/// `fe80::1:20000` that only parses by splitting off a port is rejected.
fn interface_endpoint(protocol: Protocol, node: &Node, spec: &str) -> Result<SocketAddr, EndpointError> {
    let spec = spec.trim();

    if let Ok(ip) = spec.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, protocol.default_port()));
    }
    if let Ok(socket) = spec.parse::<SocketAddr>() {
        return Ok(socket);
    }

    let (host, port) = match spec.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse::<u16>().map_err(|_| EndpointError::InvalidPort {
                hostname: node.hostname.clone(),
                protocol,
                port: port.to_string(),
            })?;
            (host, port)
        }
        None => (spec, protocol.default_port()),
    };

    if host.contains(':') {
        return Err(EndpointError::InvalidAddress {
            hostname: node.hostname.clone(),
            address: spec.to_string(),
        });
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    // Not a literal address, so it names one of the node's interfaces.
    let address = node
        .interface(host)
        .and_then(|iface| iface.address())
        .ok_or_else(|| EndpointError::UnknownInterface {
            hostname: node.hostname.clone(),
            protocol,
            interface: host.to_string(),
        })?;

    Ok(SocketAddr::new(parse_address(node, address)?, port))
}

fn primary_endpoint(protocol: Protocol, node: &Node) -> Result<SocketAddr, EndpointError> {
    let address = node
        .network
        .interfaces
        .first()
        .and_then(|iface| iface.address())
        .ok_or_else(|| EndpointError::NoAddress {
            hostname: node.hostname.clone(),
            protocol,
        })?;

    Ok(SocketAddr::new(parse_address(node, address)?, protocol.default_port()))
}

/// Parse an interface address, tolerating a trailing `/prefix`.
fn parse_address(node: &Node, address: &str) -> Result<IpAddr, EndpointError> {
    let bare = address.split('/').next().unwrap_or(address).trim();
    bare.parse::<IpAddr>().map_err(|_| EndpointError::InvalidAddress {
        hostname: node.hostname.clone(),
        address: address.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(yaml: &str) -> Node {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_legacy_primary_interface() {
        let n = node(
            r#"
hostname: rtu-1
role: fd-server
network:
  interfaces:
    - name: IF0
      address: 10.0.0.1
    - name: IF1
      address: 192.168.0.1
"#,
        );

        let transports = resolve_endpoints(Protocol::Dnp3, &n).unwrap();
        assert_eq!(transports, vec![Transport::Endpoint("10.0.0.1:20000".to_string())]);

        let transports = resolve_endpoints(Protocol::Modbus, &n).unwrap();
        assert_eq!(transports, vec![Transport::Endpoint("10.0.0.1:502".to_string())]);
    }

    #[test]
    fn test_legacy_without_address_fails() {
        let n = node(
            r#"
hostname: rtu-1
role: fd-server
network:
  interfaces:
    - name: IF0
"#,
        );
        assert!(matches!(
            resolve_endpoints(Protocol::Dnp3, &n),
            Err(EndpointError::NoAddress { .. })
        ));

        let bare = node("hostname: rtu-2\nrole: fd-server\n");
        assert!(matches!(
            resolve_endpoints(Protocol::Modbus, &bare),
            Err(EndpointError::NoAddress { .. })
        ));
    }

    #[test]
    fn test_interface_literal_ip_and_port() {
        let n = node(
            r#"
hostname: rtu-1
role: fd-server
metadata:
  dnp3:
    interface: 172.16.1.5:20001
  modbus:
    interface: 172.16.1.5
"#,
        );

        assert_eq!(
            resolve_endpoints(Protocol::Dnp3, &n).unwrap(),
            vec![Transport::Endpoint("172.16.1.5:20001".to_string())]
        );
        assert_eq!(
            resolve_endpoints(Protocol::Modbus, &n).unwrap(),
            vec![Transport::Endpoint("172.16.1.5:502".to_string())]
        );
    }

    #[test]
    fn test_interface_by_name() {
        let n = node(
            r#"
hostname: rtu-1
role: fd-server
metadata:
  modbus:
    interface: ot:5020
network:
  interfaces:
    - name: mgmt
      address: 10.0.0.1
    - name: ot
      address: 10.1.0.7/24
"#,
        );

        assert_eq!(
            resolve_endpoints(Protocol::Modbus, &n).unwrap(),
            vec![Transport::Endpoint("10.1.0.7:5020".to_string())]
        );
    }

    #[test]
    fn test_unknown_interface_and_bad_port() {
        let n = node(
            r#"
hostname: rtu-1
role: fd-server
metadata:
  dnp3:
    interface: eth9
  modbus:
    interface: 10.0.0.1:http
network:
  interfaces:
    - name: eth0
      address: 10.0.0.1
"#,
        );

        assert!(matches!(
            resolve_endpoints(Protocol::Dnp3, &n),
            Err(EndpointError::UnknownInterface { .. })
        ));
        assert!(matches!(
            resolve_endpoints(Protocol::Modbus, &n),
            Err(EndpointError::InvalidPort { .. })
        ));
    }

    #[test]
    fn test_serial_links_with_defaults() {
        let n = node(
            r#"
hostname: rtu-1
role: fd-server
metadata:
  dnp3:
    serial:
      - device: /dev/ttyS1
        baud: 115200
      - {}
"#,
        );

        assert_eq!(
            resolve_endpoints(Protocol::Dnp3, &n).unwrap(),
            vec![
                Transport::Serial {
                    device: "/dev/ttyS1".to_string(),
                    baud_rate: 115200
                },
                Transport::Serial {
                    device: "/dev/ttyS4".to_string(),
                    baud_rate: 9600
                },
            ]
        );
    }

    #[test]
    fn test_serial_and_interface_together() {
        let n = node(
            r#"
hostname: rtu-1
role: fd-server
metadata:
  dnp3:
    serial:
      - device: /dev/ttyS0
    interface: 10.0.0.1
"#,
        );

        let transports = resolve_endpoints(Protocol::Dnp3, &n).unwrap();
        assert_eq!(transports.len(), 2);
        assert_eq!(transports[1], Transport::Endpoint("10.0.0.1:20000".to_string()));
    }

    #[test]
    fn test_unassigned_app_serial_fails() {
        let n = node("hostname: rtu-1\nrole: fd-server\nmetadata:\n  dnp3:\n    serial: app\n");
        assert!(matches!(
            resolve_endpoints(Protocol::Dnp3, &n),
            Err(EndpointError::UnassignedSerial { .. })
        ));
    }

    #[test]
    fn test_ipv6_interface() {
        let n = node("hostname: h\nrole: fd-server\nmetadata:\n  dnp3:\n    interface: \"[fd00::5]:20002\"\n");
        assert_eq!(
            resolve_endpoints(Protocol::Dnp3, &n).unwrap(),
            vec![Transport::Endpoint("[fd00::5]:20002".to_string())]
        );
    }

    #[test]
    fn test_unbracketed_ipv6_is_a_bare_address() {
        let n = node("hostname: h\nrole: fd-server\nmetadata:\n  dnp3:\n    interface: \"fd00::5:2000\"\n");
        assert_eq!(
            resolve_endpoints(Protocol::Dnp3, &n).unwrap(),
            vec![Transport::Endpoint("[fd00::5:2000]:20000".to_string())]
        );

        let n = node("hostname: h\nrole: fd-server\nmetadata:\n  dnp3:\n    interface: \"fe80::1:20000\"\n");
        assert!(matches!(
            resolve_endpoints(Protocol::Dnp3, &n),
            Err(EndpointError::InvalidAddress { .. })
        ));
    }
}
