//! Relational write engine

pub mod engine;
pub mod status;
pub mod store;

pub use engine::{NewAddress, RegistryEngine};
pub use status::{derive_status, resolve_status, StatusOverride};
