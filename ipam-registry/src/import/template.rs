//! Template and export files
//!
//! Both use the import format: UTF-8 with BOM, `;` separated, one header line.
//! An export can be imported back as is.

use ipam_common::AddressRecord;

use crate::classify::BOM;
use crate::error::{RegistryError, RegistryResult};
use crate::registry::RegistryEngine;

pub const TEMPLATE_HEADER: [&str; 5] = ["ADDRESS", "STATUS", "TAGS", "OWNER NAMES", "REGION"];

const TEMPLATE_ROWS: [[&str; 5]; 7] = [
    ["172.22.250.2", "up", "413, 8", "DOUALA", "DOUALA"],
    ["172.22.250.3", "down", "", "", "DOUALA"],
    ["172.22.250.4", "up", "413, 556", "WANTSUK-VODACOM", "DOUALA"],
    ["172.22.250.5", "down", "", "", "DOUALA"],
    ["172.22.250.6", "up", "2,210,413", "", "DOUALA"],
    ["192.168.1.10", "up", "VLAN20", "Client Test", "Yaounde"],
    ["192.168.1.11", "down", "VLAN30", "", "Douala"],
];

fn write_rows<I, R>(rows: I) -> RegistryResult<Vec<u8>>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut out = String::from(BOM).into_bytes();
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .from_writer(&mut out);
        writer.write_record(TEMPLATE_HEADER)?;
        for row in rows {
            writer.write_record(row)?;
        }
        writer
            .flush()
            .map_err(|e| RegistryError::Validation(format!("delimited text: {}", e)))?;
    }
    Ok(out)
}

/// Example file users fill in before importing
pub fn template_csv() -> RegistryResult<Vec<u8>> {
    write_rows(TEMPLATE_ROWS)
}

fn export_row(record: &AddressRecord) -> [String; 5] {
    [
        record.address.clone(),
        record.status.as_csv_str().to_string(),
        record.tags.join(", "),
        record.owners.join(", "),
        record.region.clone(),
    ]
}

/// Every stored record, ordered by address
pub async fn export_csv(engine: &RegistryEngine) -> RegistryResult<Vec<u8>> {
    let records = engine.list_records().await?;
    write_rows(records.iter().map(export_row))
}
