//! Batch import of delimited text
//!
//! The first line is the header. Every following line is classified and added
//! on its own; a bad line is counted and described, never fatal to the batch.

use ipam_common::db::load_regions;
use ipam_common::AddressStatus;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classify::{
    classify_row, detect_delimiter, map_columns, normalize_cell, strip_bom_bytes, RegionList,
};
use crate::error::{RegistryError, RegistryResult};
use crate::registry::{NewAddress, RegistryEngine, StatusOverride};

/// Outcome counts and per-line messages of one import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub accepted: usize,
    pub rejected: usize,
    pub duplicates: usize,
    /// `line N: ...` messages in file order
    pub diagnostics: Vec<String>,
}

impl ImportReport {
    fn reject(&mut self, line: u64, message: impl std::fmt::Display) {
        let diagnostic = format!("line {}: {}", line, message);
        warn!("Import row rejected: {}", diagnostic);
        self.rejected += 1;
        self.diagnostics.push(diagnostic);
    }

    fn duplicate(&mut self, line: u64, address: &str) {
        debug!(line, address, "Import row is a duplicate");
        self.duplicates += 1;
        self.diagnostics
            .push(format!("line {}: address {} already exists", line, address));
    }
}

/// 1-based line on which the record read from `byte` begins
///
/// The reader reports the offset where it started reading, which sits before
/// any blank lines it skipped on the way to the record.
fn physical_line(data: &[u8], byte: u64) -> u64 {
    let from = usize::try_from(byte).unwrap_or(usize::MAX).min(data.len());
    let skipped = data[from..]
        .iter()
        .take_while(|&&b| b == b'\r' || b == b'\n')
        .count();
    let newlines = data[..from + skipped].iter().filter(|&&b| b == b'\n').count();
    newlines as u64 + 1
}

fn malformed_row(err: &csv::Error) -> String {
    match err.kind() {
        csv::ErrorKind::Utf8 { err, .. } => {
            format!("malformed row: field {} is not valid UTF-8", err.field() + 1)
        }
        _ => format!("malformed row: {}", err),
    }
}

/// Import front over a [`RegistryEngine`]
pub struct ImportPipeline {
    engine: RegistryEngine,
}

impl ImportPipeline {
    pub fn new(engine: RegistryEngine) -> Self {
        Self { engine }
    }

    /// Import one file
    ///
    /// Errors only when the run cannot start: empty input, no header line, or
    /// the region list cannot be read. Rows that are not valid UTF-8 are
    /// rejected one by one.
    pub async fn run(&self, input: &[u8]) -> RegistryResult<ImportReport> {
        let data = strip_bom_bytes(input);

        let Some(header_line) = data
            .split(|&b| b == b'\n')
            .map(String::from_utf8_lossy)
            .find(|line| !line.trim().is_empty())
        else {
            return Err(RegistryError::Validation("empty or unreadable file".to_string()));
        };
        let delimiter = detect_delimiter(&header_line);

        let regions = load_regions(self.engine.pool()).await?;
        let regions = RegionList::new(regions, self.engine.default_region());

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter.as_byte())
            .has_headers(false)
            .flexible(true)
            .from_reader(data);

        // Header cells only feed keyword matching, so a stray byte there is tolerated
        let mut header = csv::ByteRecord::new();
        let has_header = reader
            .read_byte_record(&mut header)
            .map_err(|err| RegistryError::Validation(format!("unreadable header: {}", err)))?;
        if !has_header {
            return Err(RegistryError::Validation("empty or unreadable file".to_string()));
        }
        let header: Vec<String> = header
            .iter()
            .map(|cell| String::from_utf8_lossy(cell).into_owned())
            .collect();
        let mapping = map_columns(&header);

        info!(
            delimiter = ?delimiter,
            columns = header.len(),
            mapping = ?mapping,
            "Starting import"
        );

        let mut report = ImportReport::default();
        let mut last_line = 1u64;

        for result in reader.records() {
            let record = match result {
                Ok(record) => record,
                Err(err) => {
                    let line = err
                        .position()
                        .map(|p| physical_line(data, p.byte()))
                        .unwrap_or(last_line + 1);
                    last_line = line;
                    report.reject(line, malformed_row(&err));
                    continue;
                }
            };
            let line = record
                .position()
                .map(|p| physical_line(data, p.byte()))
                .unwrap_or(last_line + 1);
            last_line = line;

            let cells: Vec<&str> = record.iter().collect();
            if cells.iter().all(|cell| normalize_cell(cell).is_empty()) {
                continue;
            }

            let row = classify_row(&cells, &mapping, &regions);
            let Some(address) = row.address.clone() else {
                report.reject(line, "missing address");
                continue;
            };

            match self.engine.exists(&address, None).await {
                Ok(true) => {
                    report.duplicate(line, &address);
                    continue;
                }
                Ok(false) => {}
                Err(err) => {
                    report.reject(line, err);
                    continue;
                }
            }

            let owners = row.owner_list();
            let mut new = NewAddress::new(address.as_str())
                .with_tags(row.tag_list())
                .with_region(row.region.as_str());
            if row.requested_status() == AddressStatus::Active && owners.is_empty() {
                new = new.with_override(StatusOverride::ExplicitActive);
            }
            new = new.with_owners(owners);

            match self.engine.add_record(&new).await {
                Ok(id) => {
                    debug!(line, address_id = %id, address = %address, "Imported row");
                    report.accepted += 1;
                }
                Err(err) => report.reject(line, err),
            }
        }

        info!(
            accepted = report.accepted,
            rejected = report.rejected,
            duplicates = report.duplicates,
            "Import finished"
        );
        Ok(report)
    }
}
