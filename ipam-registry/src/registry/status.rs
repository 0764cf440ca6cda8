//! Status derivation
//!
//! An address is ACTIVE exactly when it has at least one owner link. Every
//! path that changes owner links goes through [`resolve_status`] before commit.

use ipam_common::AddressStatus;

/// Named exception to the owner-derived rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOverride {
    /// An import row said `UP` but named no owner
    ///
    /// The record is stored ACTIVE with no owner links until the next owner
    /// reassignment recomputes it.
    ExplicitActive,
}

/// Owner-derived status
pub fn derive_status(owner_links: usize) -> AddressStatus {
    if owner_links > 0 {
        AddressStatus::Active
    } else {
        AddressStatus::Inactive
    }
}

/// Derived status with an optional override applied
pub fn resolve_status(owner_links: usize, status_override: Option<StatusOverride>) -> AddressStatus {
    match status_override {
        Some(StatusOverride::ExplicitActive) => AddressStatus::Active,
        None => derive_status(owner_links),
    }
}
