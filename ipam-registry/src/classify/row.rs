//! Content-shape classification of one data row
//!
//! Roles are resolved in strict priority order, most distinctive shape first:
//!
//! 1. header-mapped columns, verbatim
//! 2. status words (`up` / `down`) and known region names
//! 3. dotted-quad addresses, then digit-bearing tag lists
//! 4. the first leftover plain-text cell becomes the owner
//!
//! Each cell is consumed by at most one of these passes. Two rescue scans over
//! the whole row then fill a still-missing address or tag list.

use std::collections::HashMap;

use ipam_common::AddressStatus;

use super::columns::{ColumnMapping, Role};
use super::normalize_cell;

/// Known region names with case-insensitive lookup
#[derive(Debug, Clone)]
pub struct RegionList {
    names: Vec<String>,
    by_lowercase: HashMap<String, usize>,
    default_region: String,
}

impl RegionList {
    pub fn new<I, S>(names: I, default_region: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self {
            names: Vec::new(),
            by_lowercase: HashMap::new(),
            default_region: default_region.into(),
        };
        for name in names {
            let name = name.into();
            let key = name.trim().to_lowercase();
            if key.is_empty() || list.by_lowercase.contains_key(&key) {
                continue;
            }
            list.by_lowercase.insert(key, list.names.len());
            list.names.push(name.trim().to_string());
        }
        list
    }

    /// Canonical spelling of a known region, matched case-insensitively
    pub fn canonical(&self, value: &str) -> Option<&str> {
        self.by_lowercase
            .get(&value.trim().to_lowercase())
            .map(|&i| self.names[i].as_str())
    }

    pub fn contains(&self, value: &str) -> bool {
        self.canonical(value).is_some()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Region given to rows that name none
    pub fn default_region(&self) -> &str {
        &self.default_region
    }
}

/// Fully resolved import row
///
/// `None` marks a role that no header mapping and no heuristic could fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRow {
    pub address: Option<String>,
    /// Status cell as found (upper-cased when resolved by shape)
    pub status_cell: Option<String>,
    /// Raw tag list, comma separated
    pub tags: Option<String>,
    /// Raw owner list, comma separated
    pub owner: Option<String>,
    /// Region cell, or the default region
    pub region: String,
}

impl ClassifiedRow {
    /// Status the row asks for: ACTIVE only for an explicit `UP`
    pub fn requested_status(&self) -> AddressStatus {
        match &self.status_cell {
            Some(cell) if cell.eq_ignore_ascii_case("up") => AddressStatus::Active,
            _ => AddressStatus::Inactive,
        }
    }

    pub fn tag_list(&self) -> Vec<String> {
        split_list(self.tags.as_deref())
    }

    pub fn owner_list(&self) -> Vec<String> {
        split_list(self.owner.as_deref())
    }
}

/// Split a comma-separated cell, dropping blank entries
pub fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(normalize_cell)
            .filter(|entry| !entry.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// Strict `d.d.d.d` shape with 1-3 ASCII digits per part (no range check)
pub fn is_dotted_quad(value: &str) -> bool {
    let parts: Vec<&str> = value.split('.').collect();
    parts.len() == 4
        && parts
            .iter()
            .all(|p| (1..=3).contains(&p.len()) && p.bytes().all(|b| b.is_ascii_digit()))
}

fn is_status_word(value: &str) -> bool {
    value.eq_ignore_ascii_case("up") || value.eq_ignore_ascii_case("down")
}

fn has_digit(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_digit())
}

fn looks_like_tags(value: &str, regions: &RegionList) -> bool {
    !is_dotted_quad(value) && !is_status_word(value) && !regions.contains(value) && has_digit(value)
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Resolve every role of one data row
pub fn classify_row<S: AsRef<str>>(
    row: &[S],
    mapping: &ColumnMapping,
    regions: &RegionList,
) -> ClassifiedRow {
    let cells: Vec<String> = row.iter().map(|c| normalize_cell(c.as_ref())).collect();
    let mut used = vec![false; cells.len()];

    let mut address: Option<String> = None;
    let mut status: Option<String> = None;
    let mut tags: Option<String> = None;
    let mut owner: Option<String> = None;
    let mut region: Option<String> = None;

    // Pass 1: header-mapped columns
    for role in Role::ALL {
        let Some(index) = mapping.get(role) else {
            continue;
        };
        if index >= cells.len() || used[index] {
            continue;
        }
        used[index] = true;
        let value = non_empty(&cells[index]);
        match role {
            Role::Address => address = value,
            Role::Status => status = value,
            Role::Tags => tags = value,
            Role::Owner => owner = value,
            Role::Region => region = value,
        }
    }

    // Pass 2: status words and known regions
    for (index, value) in cells.iter().enumerate() {
        if used[index] {
            continue;
        }
        if is_status_word(value) {
            if status.is_none() {
                status = Some(value.to_uppercase());
                used[index] = true;
            }
        } else if let Some(canonical) = regions.canonical(value) {
            if region.is_none() {
                region = Some(canonical.to_string());
                used[index] = true;
            }
        }
    }

    // Pass 3: addresses, then tag lists
    for (index, value) in cells.iter().enumerate() {
        if used[index] || value.is_empty() {
            continue;
        }
        if is_dotted_quad(value) {
            if address.is_none() {
                address = Some(value.clone());
                used[index] = true;
            }
        } else if tags.is_none() && looks_like_tags(value, regions) {
            tags = Some(value.clone());
            used[index] = true;
        }
    }

    // Pass 4: one plain-text owner
    if owner.is_none() {
        if let Some(index) = (0..cells.len()).find(|&i| {
            let value = &cells[i];
            !used[i]
                && !value.is_empty()
                && !is_status_word(value)
                && !regions.contains(value)
                && !has_digit(value)
        }) {
            owner = Some(cells[index].clone());
        }
    }

    // Rescue scans over the whole row
    if address.is_none() {
        address = cells.iter().find(|c| is_dotted_quad(c)).cloned();
    }
    if tags.is_none() {
        tags = cells.iter().find(|c| looks_like_tags(c, regions)).cloned();
    }

    ClassifiedRow {
        address,
        status_cell: status,
        tags,
        owner,
        region: region.unwrap_or_else(|| regions.default_region().to_string()),
    }
}
