//! Topology input module.
//!
//! This module contains the annotated topology consumed by synthesis: nodes,
//! their roles and network interfaces, and the normalized per-node metadata.

pub mod metadata;
pub mod types;

// Re-export key types for easier access
pub use metadata::{
    NodeMetadata, PointGroup, ProtocolBlock, SerialEntry, SerialLink, SerialOverride, SerialSpec,
    UpstreamRef, APP_ASSIGNED,
};
pub use types::{
    Network, NetworkInterface, Node, Role, TopologyConfig, ValidationError, DEFAULT_INFRASTRUCTURE,
};
