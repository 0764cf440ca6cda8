//! # IPAM Common Library
//!
//! Shared code for the address registry:
//! - Database initialization, schema and region reference list
//! - Shared models (address records, tags, owners, status)
//! - Bootstrap configuration loading
//! - Request gate primitives (timestamp + hash)

pub mod api;
pub mod config;
pub mod db;
pub mod error;

pub use db::models::{AddressRecord, AddressStatus, AddressSummary, Owner, Tag};
pub use error::{Error, Result};
