//! # Device Module
//!
//! Devices are topology nodes seen through their role. This module resolves
//! the registers each device exposes and turns them into protocol roots.
//!
//! ## Key Components
//!
//! - `register.rs`: register types, per-register protocol options and the
//!   ordered lists and tables devices carry
//! - `graph.rs`: the hostname-keyed device arena and the upstream resolver
//! - `roles.rs`: per-role configuration into DNP3/Modbus roots
//!
//! ## Two Passes
//!
//! Resolution runs first and walks the upstream graph depth-first, so every
//! device sees finished peers. Configuration runs second and only reads peers,
//! which keeps the output independent of the order nodes are configured in.

pub mod graph;
pub mod register;
pub mod roles;

pub use graph::{Device, DeviceGraph, ResolutionState, ResolveError};
pub use register::{Register, RegisterList, RegisterOptions, RegisterTable, RegisterType};
pub use roles::{ConfigureError, NodeArtifacts, SerialLinkTable};
