//! Request gate primitives shared by HTTP surfaces
//!
//! Contains ONLY pure functions and database operations. The axum middleware
//! that wraps them lives in the service crate.

pub mod auth;

pub use auth::{
    calculate_hash, initialize_shared_secret, load_shared_secret, validate_hash,
    validate_timestamp, ApiAuthError, HASH_HEADER, TIMESTAMP_HEADER,
};
