//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// Availability of an address
///
/// Stored as `ACTIVE` / `INACTIVE` in the `addresses.status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddressStatus {
    Active,
    Inactive,
}

impl AddressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressStatus::Active => "ACTIVE",
            AddressStatus::Inactive => "INACTIVE",
        }
    }

    /// Spelling used in delimited files (`up` / `down`)
    pub fn as_csv_str(&self) -> &'static str {
        match self {
            AddressStatus::Active => "up",
            AddressStatus::Inactive => "down",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, AddressStatus::Active)
    }
}

impl fmt::Display for AddressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddressStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(AddressStatus::Active),
            "INACTIVE" => Ok(AddressStatus::Inactive),
            other => Err(Error::UnknownStatus(other.to_string())),
        }
    }
}

/// Address record with its resolved tag values and owner names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub id: Uuid,
    pub address: String,
    pub region: String,
    pub status: AddressStatus,
    /// Tag values, sorted
    pub tags: Vec<String>,
    /// Owner names, sorted
    pub owners: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AddressRecord {
    pub fn summary(&self) -> AddressSummary {
        AddressSummary {
            id: self.id,
            address: self.address.clone(),
            region: self.region.clone(),
            status: self.status,
        }
    }
}

/// Address row without relationships
///
/// Returned to callers that hit a duplicate so they can reconcile by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSummary {
    pub id: Uuid,
    pub address: String,
    pub region: String,
    pub status: AddressStatus,
}

impl fmt::Display for AddressSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (status: {}, region: {})", self.address, self.status, self.region)
    }
}

/// Network segment identifier, unique by value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub value: String,
}

/// Assigned customer, unique by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: Uuid,
    pub name: String,
    pub region: Option<String>,
}
