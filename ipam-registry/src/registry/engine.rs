//! Registry engine
//!
//! Add, update and delete of address records. Each operation is one
//! transaction: any failing step rolls back every earlier write of that call.
//! Owner-link changes always recompute status before commit.

use ipam_common::{AddressRecord, AddressStatus, AddressSummary};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::status::{derive_status, resolve_status, StatusOverride};
use super::store;
use crate::error::{is_address_conflict, RegistryError, RegistryResult};

/// Input of [`RegistryEngine::add_record`]
#[derive(Debug, Clone, Default)]
pub struct NewAddress {
    pub address: String,
    pub tags: Vec<String>,
    pub owners: Vec<String>,
    /// `None` uses the engine's default region
    pub region: Option<String>,
    pub status_override: Option<StatusOverride>,
}

impl NewAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_owners<I, S>(mut self, owners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.owners = owners.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_override(mut self, status_override: StatusOverride) -> Self {
        self.status_override = Some(status_override);
        self
    }
}

/// Address must be non-empty after trimming
fn validate_address(address: &str) -> RegistryResult<String> {
    let address = address.trim();
    if address.is_empty() {
        return Err(RegistryError::Validation("address must not be empty".to_string()));
    }
    Ok(address.to_string())
}

/// Trim entries and drop blanks; order is kept
fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Transactional write front for address records
#[derive(Clone)]
pub struct RegistryEngine {
    pool: SqlitePool,
    default_region: String,
}

impl RegistryEngine {
    pub fn new(pool: SqlitePool, default_region: impl Into<String>) -> Self {
        Self {
            pool,
            default_region: default_region.into(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn default_region(&self) -> &str {
        &self.default_region
    }

    /// Create a record with its tag and owner links
    ///
    /// Fails with [`RegistryError::DuplicateAddress`] before any write when the
    /// address is taken. A duplicate that slips past the pre-check is caught by
    /// the unique index and reported the same way after rollback.
    pub async fn add_record(&self, new: &NewAddress) -> RegistryResult<Uuid> {
        let address = validate_address(&new.address)?;
        if let Some(existing) = self.find_by_address(&address).await? {
            debug!(address = %address, "Add rejected, address exists");
            return Err(RegistryError::duplicate(existing));
        }

        let region = new
            .region
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(self.default_region.as_str())
            .to_string();
        let tags = clean_list(&new.tags);
        let owners = clean_list(&new.owners);
        let id = Uuid::new_v4();

        let mut tx = self.pool.begin().await?;
        let outcome = async {
            store::insert_address(&mut tx, id, &address, &region, AddressStatus::Inactive).await?;
            store::replace_tag_links(&mut tx, id, &tags).await?;
            let owner_links = store::replace_owner_links(&mut tx, id, &owners, Some(region.as_str())).await?;
            let status = resolve_status(owner_links, new.status_override);
            store::write_status(&mut tx, id, status).await?;
            Ok::<_, sqlx::Error>(status)
        }
        .await;
        let status = self.settle(tx, outcome, Some(id), Some(&address)).await?;

        info!(
            address_id = %id,
            address = %address,
            region = %region,
            status = %status,
            tags = tags.len(),
            owners = owners.len(),
            "Added address record"
        );
        Ok(id)
    }

    /// Replace the owner set, optionally move the record to `region`, recompute status
    ///
    /// An empty owner list unassigns the address.
    pub async fn reassign_owners(
        &self,
        address_id: Uuid,
        owners: &[String],
        region: Option<&str>,
    ) -> RegistryResult<AddressStatus> {
        let owners = clean_list(owners);
        let region = region.map(str::trim).filter(|r| !r.is_empty());

        let mut tx = self.pool.begin().await?;
        let outcome = async {
            let current = store::load_summary(&mut tx, address_id)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            let region = region.unwrap_or(current.region.as_str());
            if region != current.region {
                store::write_region(&mut tx, address_id, region).await?;
            }
            let owner_links = store::replace_owner_links(&mut tx, address_id, &owners, Some(region)).await?;
            let status = derive_status(owner_links);
            store::write_status(&mut tx, address_id, status).await?;
            Ok::<_, sqlx::Error>(status)
        }
        .await;
        let status = self.settle(tx, outcome, Some(address_id), None).await?;

        info!(
            address_id = %address_id,
            owners = owners.len(),
            status = %status,
            "Reassigned owners"
        );
        Ok(status)
    }

    /// Replace the tag set; status is untouched
    pub async fn retag_address(&self, address_id: Uuid, tags: &[String]) -> RegistryResult<()> {
        let tags = clean_list(tags);

        let mut tx = self.pool.begin().await?;
        let outcome = async {
            store::load_summary(&mut tx, address_id)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            store::replace_tag_links(&mut tx, address_id, &tags).await?;
            store::touch(&mut tx, address_id).await?;
            Ok::<_, sqlx::Error>(())
        }
        .await;
        self.settle(tx, outcome, Some(address_id), None).await?;

        info!(address_id = %address_id, tags = tags.len(), "Retagged address");
        Ok(())
    }

    /// Change the address text of a record
    pub async fn rename_address(&self, address_id: Uuid, new_address: &str) -> RegistryResult<()> {
        let address = validate_address(new_address)?;
        if let Some(existing) = self.exists_other(&address, address_id).await? {
            return Err(RegistryError::duplicate(existing));
        }

        let mut tx = self.pool.begin().await?;
        let outcome = async {
            store::load_summary(&mut tx, address_id)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            store::write_address(&mut tx, address_id, &address).await?;
            Ok::<_, sqlx::Error>(())
        }
        .await;
        self.settle(tx, outcome, Some(address_id), Some(&address)).await?;

        info!(address_id = %address_id, address = %address, "Renamed address");
        Ok(())
    }

    /// Rename, retag and reassign owners in one transaction
    ///
    /// Region is kept; status follows the new owner set.
    pub async fn update_record(
        &self,
        address_id: Uuid,
        new_address: &str,
        tags: &[String],
        owners: &[String],
    ) -> RegistryResult<AddressStatus> {
        let address = validate_address(new_address)?;
        if let Some(existing) = self.exists_other(&address, address_id).await? {
            return Err(RegistryError::duplicate(existing));
        }
        let tags = clean_list(tags);
        let owners = clean_list(owners);

        let mut tx = self.pool.begin().await?;
        let outcome = async {
            let current = store::load_summary(&mut tx, address_id)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            if current.address != address {
                store::write_address(&mut tx, address_id, &address).await?;
            }
            store::replace_tag_links(&mut tx, address_id, &tags).await?;
            let owner_links =
                store::replace_owner_links(&mut tx, address_id, &owners, Some(current.region.as_str())).await?;
            let status = derive_status(owner_links);
            store::write_status(&mut tx, address_id, status).await?;
            Ok::<_, sqlx::Error>(status)
        }
        .await;
        let status = self.settle(tx, outcome, Some(address_id), Some(&address)).await?;

        info!(
            address_id = %address_id,
            address = %address,
            tags = tags.len(),
            owners = owners.len(),
            status = %status,
            "Updated address record"
        );
        Ok(status)
    }

    /// Delete a record; its junction rows cascade, tags and owners remain
    pub async fn delete_record(&self, address_id: Uuid) -> RegistryResult<()> {
        let mut conn = self.pool.acquire().await?;
        if !store::delete_address(&mut conn, address_id).await? {
            return Err(not_found(address_id));
        }

        info!(address_id = %address_id, "Deleted address record");
        Ok(())
    }

    /// Whether `address` is held by a record other than `excluding`
    pub async fn exists(&self, address: &str, excluding: Option<Uuid>) -> RegistryResult<bool> {
        let mut conn = self.pool.acquire().await?;
        let found = store::find_summary_by_address(&mut conn, address.trim(), excluding).await?;
        Ok(found.is_some())
    }

    pub async fn find_by_address(&self, address: &str) -> RegistryResult<Option<AddressSummary>> {
        let mut conn = self.pool.acquire().await?;
        Ok(store::find_summary_by_address(&mut conn, address.trim(), None).await?)
    }

    pub async fn load_record(&self, address_id: Uuid) -> RegistryResult<AddressRecord> {
        let mut conn = self.pool.acquire().await?;
        store::load_record(&mut conn, address_id)
            .await?
            .ok_or_else(|| not_found(address_id))
    }

    /// Every record ordered by address
    pub async fn list_records(&self) -> RegistryResult<Vec<AddressRecord>> {
        let mut conn = self.pool.acquire().await?;
        Ok(store::list_records(&mut conn).await?)
    }

    async fn exists_other(&self, address: &str, address_id: Uuid) -> RegistryResult<Option<AddressSummary>> {
        let mut conn = self.pool.acquire().await?;
        Ok(store::find_summary_by_address(&mut conn, address, Some(address_id)).await?)
    }

    /// Commit on success, roll back and classify the failure otherwise
    async fn settle<T>(
        &self,
        tx: Transaction<'static, Sqlite>,
        outcome: sqlx::Result<T>,
        address_id: Option<Uuid>,
        address: Option<&str>,
    ) -> RegistryResult<T> {
        let err = match outcome {
            Ok(value) => match tx.commit().await {
                Ok(()) => return Ok(value),
                Err(err) => err,
            },
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                err
            }
        };

        warn!(address_id = ?address_id, error = %err, "Write rolled back");
        Err(self.classify_failure(err, address_id, address).await)
    }

    async fn classify_failure(
        &self,
        err: sqlx::Error,
        address_id: Option<Uuid>,
        address: Option<&str>,
    ) -> RegistryError {
        if let (true, Some(address)) = (is_address_conflict(&err), address) {
            let lookup = match address_id {
                Some(id) => self.exists_other(address, id).await,
                None => self.find_by_address(address).await,
            };
            if let Ok(Some(existing)) = lookup {
                return RegistryError::duplicate(existing);
            }
        }

        match (err, address_id) {
            (sqlx::Error::RowNotFound, Some(id)) => not_found(id),
            (err, _) => err.into(),
        }
    }
}

fn not_found(address_id: Uuid) -> RegistryError {
    RegistryError::NotFound(format!("address record {}", address_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipam_common::config::TomlConfig;
    use ipam_common::db::init_memory_database;

    async fn engine() -> RegistryEngine {
        let pool = init_memory_database(&TomlConfig::default()).await.unwrap();
        RegistryEngine::new(pool, "Douala")
    }

    #[test]
    fn test_validate_address_trims() {
        assert_eq!(validate_address("  10.0.0.1 ").unwrap(), "10.0.0.1");
        assert!(matches!(
            validate_address("   "),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn test_clean_list_drops_blanks() {
        let cleaned = clean_list(&[" a ".to_string(), "".to_string(), "b".to_string()]);
        assert_eq!(cleaned, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_add_uses_default_region() {
        let engine = engine().await;
        let id = engine.add_record(&NewAddress::new("10.0.0.1")).await.unwrap();
        let record = engine.load_record(id).await.unwrap();
        assert_eq!(record.region, "Douala");
        assert_eq!(record.status, AddressStatus::Inactive);
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let engine = engine().await;
        let id = Uuid::new_v4();
        assert!(matches!(
            engine.retag_address(id, &["1".to_string()]).await,
            Err(RegistryError::NotFound(_))
        ));
        assert!(matches!(
            engine.reassign_owners(id, &[], None).await,
            Err(RegistryError::NotFound(_))
        ));
        assert!(matches!(engine.delete_record(id).await, Err(RegistryError::NotFound(_))));
        assert!(matches!(engine.load_record(id).await, Err(RegistryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rename_to_own_address_is_allowed() {
        let engine = engine().await;
        let id = engine.add_record(&NewAddress::new("10.0.0.1")).await.unwrap();
        engine.rename_address(id, "10.0.0.1").await.unwrap();
        engine.rename_address(id, "10.0.0.9").await.unwrap();
        assert_eq!(engine.load_record(id).await.unwrap().address, "10.0.0.9");
    }
}
