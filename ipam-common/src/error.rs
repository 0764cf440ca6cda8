//! Errors raised while bootstrapping the registry store

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Opening, migrating or querying the database failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Creating the database folder failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML config missing or unparsable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stored status text outside `ACTIVE` / `INACTIVE`
    #[error("Unknown address status: {0}")]
    UnknownStatus(String),
}
