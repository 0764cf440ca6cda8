//! Header-based column role mapping

use super::{normalize_cell, strip_bom};

/// Semantic role of an import column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Address,
    Status,
    Tags,
    Owner,
    Region,
}

impl Role {
    /// Evaluation order: for one header cell the first matching role wins
    pub const ALL: [Role; 5] = [Role::Address, Role::Status, Role::Tags, Role::Owner, Role::Region];

    /// Lowercase substrings that identify this role in a header cell
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Role::Address => &["ip", "address", "adresse"],
            Role::Status => &["status", "statut", "etat", "état"],
            Role::Tags => &["vlan", "tag"],
            Role::Owner => &["customer", "client", "name", "owner"],
            Role::Region => &["city", "ville", "region", "région"],
        }
    }

    fn matches(&self, header: &str) -> bool {
        self.keywords().iter().any(|keyword| header.contains(keyword))
    }
}

/// Column index per role; `None` means no header matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMapping {
    pub address: Option<usize>,
    pub status: Option<usize>,
    pub tags: Option<usize>,
    pub owner: Option<usize>,
    pub region: Option<usize>,
}

impl Default for ColumnMapping {
    /// Address defaults to the first column; every other role is unmapped
    fn default() -> Self {
        Self {
            address: Some(0),
            status: None,
            tags: None,
            owner: None,
            region: None,
        }
    }
}

impl ColumnMapping {
    /// A mapping with no role assigned, not even the address default
    pub fn unmapped() -> Self {
        Self {
            address: None,
            status: None,
            tags: None,
            owner: None,
            region: None,
        }
    }

    pub fn get(&self, role: Role) -> Option<usize> {
        match role {
            Role::Address => self.address,
            Role::Status => self.status,
            Role::Tags => self.tags,
            Role::Owner => self.owner,
            Role::Region => self.region,
        }
    }

    fn slot(&mut self, role: Role) -> &mut Option<usize> {
        match role {
            Role::Address => &mut self.address,
            Role::Status => &mut self.status,
            Role::Tags => &mut self.tags,
            Role::Owner => &mut self.owner,
            Role::Region => &mut self.region,
        }
    }

    /// Role mapped to a column, if any
    pub fn role_of(&self, index: usize) -> Option<Role> {
        Role::ALL
            .into_iter()
            .find(|role| self.get(*role) == Some(index))
    }
}

/// Map header cells onto roles
///
/// Matching is case-insensitive substring search over [`Role::keywords`].
/// Each header cell is claimed by the first role whose keywords it contains,
/// and each role keeps the first column that matched it. When no header
/// names the address, it falls back to column 0 unless another role already
/// claimed that column.
pub fn map_columns<S: AsRef<str>>(headers: &[S]) -> ColumnMapping {
    let mut mapping = ColumnMapping::unmapped();

    for (index, header) in headers.iter().enumerate() {
        let raw = if index == 0 {
            strip_bom(header.as_ref())
        } else {
            header.as_ref()
        };
        let header = normalize_cell(raw).to_lowercase();
        if header.is_empty() {
            continue;
        }

        if let Some(role) = Role::ALL.into_iter().find(|role| role.matches(&header)) {
            let slot = mapping.slot(role);
            if slot.is_none() {
                *slot = Some(index);
            }
        }
    }

    if mapping.address.is_none() && mapping.role_of(0).is_none() {
        mapping.address = Some(0);
    }

    mapping
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_header_maps_every_role() {
        let mapping = map_columns(&["\u{FEFF}ADDRESS", "STATUS", "TAGS", "OWNER NAMES", "REGION"]);
        assert_eq!(
            mapping,
            ColumnMapping {
                address: Some(0),
                status: Some(1),
                tags: Some(2),
                owner: Some(3),
                region: Some(4),
            }
        );
    }

    #[test]
    fn test_legacy_french_header() {
        let mapping = map_columns(&["Adresse IP", "Etat", "VLAN", "Client", "Ville"]);
        assert_eq!(mapping.address, Some(0));
        assert_eq!(mapping.status, Some(1));
        assert_eq!(mapping.tags, Some(2));
        assert_eq!(mapping.owner, Some(3));
        assert_eq!(mapping.region, Some(4));
    }

    #[test]
    fn test_reordered_columns() {
        let mapping = map_columns(&["Customer", "city", "IP", "vlan id", "statut"]);
        assert_eq!(mapping.owner, Some(0));
        assert_eq!(mapping.region, Some(1));
        assert_eq!(mapping.address, Some(2));
        assert_eq!(mapping.tags, Some(3));
        assert_eq!(mapping.status, Some(4));
    }

    #[test]
    fn test_first_column_per_role_wins() {
        let mapping = map_columns(&["ip", "client", "second client"]);
        assert_eq!(mapping.owner, Some(1));
    }

    #[test]
    fn test_first_matching_role_claims_column() {
        // "ip" wins over "name" for this cell
        let mapping = map_columns(&["ip name", "other"]);
        assert_eq!(mapping.address, Some(0));
        assert_eq!(mapping.owner, None);
    }

    #[test]
    fn test_unrecognized_header_defaults_address_to_zero() {
        let mapping = map_columns(&["foo", "bar", "baz"]);
        assert_eq!(mapping, ColumnMapping::default());
    }

    #[test]
    fn test_address_default_yields_to_claimed_first_column() {
        let mapping = map_columns(&["status", "vlan"]);
        assert_eq!(mapping.status, Some(0));
        assert_eq!(mapping.address, None);
    }

    #[test]
    fn test_nbsp_in_header() {
        let mapping = map_columns(&["ip", "nom\u{00A0}client"]);
        assert_eq!(mapping.owner, Some(1));
    }
}
