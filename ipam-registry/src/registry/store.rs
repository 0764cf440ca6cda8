//! Relation store
//!
//! Canonical entities (addresses, tags, owners) and their junction rows.
//! Every function runs on a caller-supplied connection so the engine can
//! compose several of them inside one transaction (`&mut *tx`).
//!
//! Tag values and owner names are matched exactly, case included.

use chrono::{DateTime, Utc};
use ipam_common::{AddressRecord, AddressStatus, AddressSummary, Owner, Tag};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;
use uuid::Uuid;

fn decode_error<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

fn parse_guid(text: &str) -> sqlx::Result<Uuid> {
    Uuid::parse_str(text).map_err(decode_error)
}

fn parse_timestamp(text: &str) -> sqlx::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(decode_error)
}

fn parse_status(text: &str) -> sqlx::Result<AddressStatus> {
    text.parse().map_err(decode_error)
}

fn now_text() -> String {
    Utc::now().to_rfc3339()
}

fn summary_from_row(row: &SqliteRow) -> sqlx::Result<AddressSummary> {
    let guid: String = row.try_get("guid")?;
    let status: String = row.try_get("status")?;
    Ok(AddressSummary {
        id: parse_guid(&guid)?,
        address: row.try_get("address")?,
        region: row.try_get("region")?,
        status: parse_status(&status)?,
    })
}

/// Insert a bare address row; links and final status are written separately
pub async fn insert_address(
    conn: &mut SqliteConnection,
    id: Uuid,
    address: &str,
    region: &str,
    status: AddressStatus,
) -> sqlx::Result<()> {
    let now = now_text();
    sqlx::query(
        r#"
        INSERT INTO addresses (guid, address, region, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(address)
    .bind(region)
    .bind(status.as_str())
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Existing tag id for `value`, or a freshly created one
///
/// Returns `(tag_id, created)`.
pub async fn get_or_create_tag(conn: &mut SqliteConnection, value: &str) -> sqlx::Result<(Uuid, bool)> {
    let existing: Option<String> = sqlx::query_scalar("SELECT guid FROM tags WHERE value = ?")
        .bind(value)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(guid) = existing {
        let tag_id = parse_guid(&guid)?;
        debug!(tag_id = %tag_id, value, "Reusing existing tag");
        return Ok((tag_id, false));
    }

    let tag_id = Uuid::new_v4();
    sqlx::query("INSERT INTO tags (guid, value) VALUES (?, ?)")
        .bind(tag_id.to_string())
        .bind(value)
        .execute(&mut *conn)
        .await?;

    debug!(tag_id = %tag_id, value, "Created tag");
    Ok((tag_id, true))
}

/// Existing owner id for `name`, or a freshly created one
///
/// `region` is only recorded when the owner is created.
pub async fn get_or_create_owner(
    conn: &mut SqliteConnection,
    name: &str,
    region: Option<&str>,
) -> sqlx::Result<(Uuid, bool)> {
    let existing: Option<String> = sqlx::query_scalar("SELECT guid FROM owners WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(guid) = existing {
        let owner_id = parse_guid(&guid)?;
        debug!(owner_id = %owner_id, name, "Reusing existing owner");
        return Ok((owner_id, false));
    }

    let owner_id = Uuid::new_v4();
    sqlx::query("INSERT INTO owners (guid, name, region) VALUES (?, ?, ?)")
        .bind(owner_id.to_string())
        .bind(name)
        .bind(region)
        .execute(&mut *conn)
        .await?;

    debug!(owner_id = %owner_id, name, "Created owner");
    Ok((owner_id, true))
}

/// Replace the whole tag-link set of an address
///
/// Clears every existing link, then links each value (created on first use).
/// Returns the number of distinct links now held.
pub async fn replace_tag_links(
    conn: &mut SqliteConnection,
    address_id: Uuid,
    tags: &[String],
) -> sqlx::Result<usize> {
    sqlx::query("DELETE FROM address_tags WHERE address_id = ?")
        .bind(address_id.to_string())
        .execute(&mut *conn)
        .await?;

    let mut linked = 0;
    for value in tags {
        let (tag_id, _) = get_or_create_tag(conn, value).await?;
        linked += sqlx::query("INSERT OR IGNORE INTO address_tags (address_id, tag_id) VALUES (?, ?)")
            .bind(address_id.to_string())
            .bind(tag_id.to_string())
            .execute(&mut *conn)
            .await?
            .rows_affected() as usize;
    }

    Ok(linked)
}

/// Replace the whole owner-link set of an address
///
/// Returns the number of distinct links now held, which drives status.
pub async fn replace_owner_links(
    conn: &mut SqliteConnection,
    address_id: Uuid,
    owners: &[String],
    region: Option<&str>,
) -> sqlx::Result<usize> {
    sqlx::query("DELETE FROM address_owners WHERE address_id = ?")
        .bind(address_id.to_string())
        .execute(&mut *conn)
        .await?;

    let mut linked = 0;
    for name in owners {
        let (owner_id, _) = get_or_create_owner(conn, name, region).await?;
        linked += sqlx::query(
            "INSERT OR IGNORE INTO address_owners (address_id, owner_id) VALUES (?, ?)",
        )
        .bind(address_id.to_string())
        .bind(owner_id.to_string())
        .execute(&mut *conn)
        .await?
        .rows_affected() as usize;
    }

    Ok(linked)
}

pub async fn count_owner_links(conn: &mut SqliteConnection, address_id: Uuid) -> sqlx::Result<usize> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM address_owners WHERE address_id = ?")
        .bind(address_id.to_string())
        .fetch_one(&mut *conn)
        .await?;

    Ok(count.max(0) as usize)
}

pub async fn write_status(
    conn: &mut SqliteConnection,
    address_id: Uuid,
    status: AddressStatus,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE addresses SET status = ?, updated_at = ? WHERE guid = ?")
        .bind(status.as_str())
        .bind(now_text())
        .bind(address_id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn write_region(conn: &mut SqliteConnection, address_id: Uuid, region: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE addresses SET region = ?, updated_at = ? WHERE guid = ?")
        .bind(region)
        .bind(now_text())
        .bind(address_id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn write_address(conn: &mut SqliteConnection, address_id: Uuid, address: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE addresses SET address = ?, updated_at = ? WHERE guid = ?")
        .bind(address)
        .bind(now_text())
        .bind(address_id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Bump `updated_at` after a change that only touched junction rows
pub async fn touch(conn: &mut SqliteConnection, address_id: Uuid) -> sqlx::Result<()> {
    sqlx::query("UPDATE addresses SET updated_at = ? WHERE guid = ?")
        .bind(now_text())
        .bind(address_id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Remove an address; junction rows go with it, tags and owners stay
///
/// Returns false when no such record existed.
pub async fn delete_address(conn: &mut SqliteConnection, address_id: Uuid) -> sqlx::Result<bool> {
    let deleted = sqlx::query("DELETE FROM addresses WHERE guid = ?")
        .bind(address_id.to_string())
        .execute(&mut *conn)
        .await?
        .rows_affected();

    Ok(deleted > 0)
}

pub async fn load_summary(
    conn: &mut SqliteConnection,
    address_id: Uuid,
) -> sqlx::Result<Option<AddressSummary>> {
    let row = sqlx::query("SELECT guid, address, region, status FROM addresses WHERE guid = ?")
        .bind(address_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(summary_from_row).transpose()
}

/// Summary of the record holding `address`, ignoring `excluding`
pub async fn find_summary_by_address(
    conn: &mut SqliteConnection,
    address: &str,
    excluding: Option<Uuid>,
) -> sqlx::Result<Option<AddressSummary>> {
    let row = sqlx::query(
        r#"
        SELECT guid, address, region, status FROM addresses
        WHERE address = ? AND (? IS NULL OR guid != ?)
        "#,
    )
    .bind(address)
    .bind(excluding.map(|id| id.to_string()))
    .bind(excluding.map(|id| id.to_string()))
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(summary_from_row).transpose()
}

async fn tag_values(conn: &mut SqliteConnection, address_id: &str) -> sqlx::Result<Vec<String>> {
    sqlx::query_scalar(
        r#"
        SELECT t.value FROM address_tags at
        JOIN tags t ON t.guid = at.tag_id
        WHERE at.address_id = ?
        ORDER BY t.value
        "#,
    )
    .bind(address_id)
    .fetch_all(&mut *conn)
    .await
}

async fn owner_names(conn: &mut SqliteConnection, address_id: &str) -> sqlx::Result<Vec<String>> {
    sqlx::query_scalar(
        r#"
        SELECT o.name FROM address_owners ao
        JOIN owners o ON o.guid = ao.owner_id
        WHERE ao.address_id = ?
        ORDER BY o.name
        "#,
    )
    .bind(address_id)
    .fetch_all(&mut *conn)
    .await
}

async fn record_from_row(conn: &mut SqliteConnection, row: &SqliteRow) -> sqlx::Result<AddressRecord> {
    let guid: String = row.try_get("guid")?;
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(AddressRecord {
        id: parse_guid(&guid)?,
        address: row.try_get("address")?,
        region: row.try_get("region")?,
        status: parse_status(&status)?,
        tags: tag_values(conn, &guid).await?,
        owners: owner_names(conn, &guid).await?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

/// Full record with tag values and owner names
pub async fn load_record(
    conn: &mut SqliteConnection,
    address_id: Uuid,
) -> sqlx::Result<Option<AddressRecord>> {
    let row = sqlx::query(
        r#"
        SELECT guid, address, region, status, created_at, updated_at
        FROM addresses WHERE guid = ?
        "#,
    )
    .bind(address_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => Ok(Some(record_from_row(conn, &row).await?)),
        None => Ok(None),
    }
}

/// Every record, ordered by address text
pub async fn list_records(conn: &mut SqliteConnection) -> sqlx::Result<Vec<AddressRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, address, region, status, created_at, updated_at
        FROM addresses ORDER BY address
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        records.push(record_from_row(conn, row).await?);
    }
    Ok(records)
}

pub async fn find_tag(conn: &mut SqliteConnection, value: &str) -> sqlx::Result<Option<Tag>> {
    let guid: Option<String> = sqlx::query_scalar("SELECT guid FROM tags WHERE value = ?")
        .bind(value)
        .fetch_optional(&mut *conn)
        .await?;

    guid.map(|guid| {
        Ok(Tag {
            id: parse_guid(&guid)?,
            value: value.to_string(),
        })
    })
    .transpose()
}

pub async fn find_owner(conn: &mut SqliteConnection, name: &str) -> sqlx::Result<Option<Owner>> {
    let row = sqlx::query("SELECT guid, name, region FROM owners WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(|row| {
        let guid: String = row.try_get("guid")?;
        Ok(Owner {
            id: parse_guid(&guid)?,
            name: row.try_get("name")?,
            region: row.try_get("region")?,
        })
    })
    .transpose()
}

/// Row counts of the entity tables: (tags, owners)
pub async fn entity_counts(conn: &mut SqliteConnection) -> sqlx::Result<(i64, i64)> {
    let tags: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
        .fetch_one(&mut *conn)
        .await?;
    let owners: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM owners")
        .fetch_one(&mut *conn)
        .await?;

    Ok((tags, owners))
}
