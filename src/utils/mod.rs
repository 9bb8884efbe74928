//! Shared utilities: order-preserving maps and lenient scalar deserializers.

pub mod ordered_map;
pub mod scalar;

pub use ordered_map::OrderedMap;
