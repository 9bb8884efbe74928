//! # otsim-config - ot-sim configuration synthesis for emulated ICS networks
//!
//! This library turns an annotated network topology into one ot-sim
//! configuration document per node, with the DNP3 and Modbus sides of every
//! control link wired to agree on point addresses.
//!
//! ## Overview
//!
//! Each node plays one of three roles:
//!
//! - **Field-device server** (RTU, PLC, relay): serves the points of the
//!   infrastructure devices it monitors
//! - **Front-end processor**: polls upstream field devices and re-serves
//!   everything it collected over a single downstream protocol
//! - **Field-device client** (HMI, historian): polls upstream devices
//!
//! Monitored devices are expanded into points through infrastructure tables
//! (`breaker` -> voltage, current, status, ...), which ship with defaults and
//! can be overridden per deployment.
//!
//! ## Architecture
//!
//! - `topology`: input model and metadata normalization
//! - `config_loader`: topology file loading and validation
//! - `infrastructure`: device type -> variable tables
//! - `device`: register model, upstream graph resolution, per-role configuration
//! - `protocol`: endpoint resolution plus the DNP3 and Modbus encoders
//! - `otsim`: assembly of the per-node document
//! - `orchestrator`: end-to-end synthesis and output
//! - `utils`: utility functions and helpers
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use otsim_config::{config_loader, orchestrator};
//! use std::path::Path;
//!
//! let topology = config_loader::load_topology(Path::new("topology.yaml"))?;
//! let configs = orchestrator::synthesize(&topology)?;
//! orchestrator::write_configs(&configs, Path::new("otsim_output"), orchestrator::OutputFormat::Yaml)?;
//! # Ok::<(), color_eyre::eyre::Report>(())
//! ```
//!
//! ## Topology Format
//!
//! ```yaml
//! serial_links:
//!   fep-1:
//!     - remote: rtu-1
//!       device: /dev/ttyS1
//!       baud: 19200
//!
//! nodes:
//!   - hostname: rtu-1
//!     role: field-device-server
//!     metadata:
//!       dnp3:
//!         - type: breaker
//!           name: bkr-1
//!     network:
//!       interfaces:
//!         - name: eth0
//!           address: 10.0.0.1
//!   - hostname: fep-1
//!     role: front-end-processor
//!     metadata:
//!       upstream:
//!         - hostname: rtu-1
//!           serial: app
//! ```
//!
//! ## Error Handling
//!
//! Library layers return typed errors built with `thiserror`; file I/O and
//! the binary use `color_eyre` for reporting with context.

pub mod config_loader;
pub mod device;
pub mod infrastructure;
pub mod orchestrator;
pub mod otsim;
pub mod protocol;
pub mod topology;
pub mod utils;
