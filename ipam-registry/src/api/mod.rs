//! HTTP API handlers for ipam-registry

pub mod addresses;
pub mod auth;
pub mod health;
pub mod regions;
pub mod transfer;

pub use addresses::{
    create_address, delete_address, get_address, reassign_owners, rename_address, retag_address,
    update_address,
};
pub use auth::auth_middleware;
pub use health::health_routes;
pub use regions::list_regions;
pub use transfer::{download_export, download_template, import_file};
