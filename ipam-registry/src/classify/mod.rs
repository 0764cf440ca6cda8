//! Heuristic classification of loosely structured delimited rows
//!
//! Three pure stages, leaf first:
//! - [`delimiter`]: pick the field separator from a sample line
//! - [`columns`]: map header cells onto semantic roles
//! - [`row`]: resolve every role for one data row, filling header gaps by cell shape

pub mod columns;
pub mod delimiter;
pub mod row;

pub use columns::{map_columns, ColumnMapping, Role};
pub use delimiter::{detect_delimiter, Delimiter};
pub use row::{classify_row, ClassifiedRow, RegionList};

/// UTF-8 byte-order mark as it appears at the start of a decoded string
pub const BOM: char = '\u{FEFF}';

/// UTF-8 byte-order mark as raw bytes
pub const BOM_BYTES: &[u8] = b"\xEF\xBB\xBF";

/// Strip any leading byte-order marks
pub fn strip_bom(text: &str) -> &str {
    text.trim_start_matches(BOM)
}

/// Strip any leading byte-order marks from undecoded input
pub fn strip_bom_bytes(mut data: &[u8]) -> &[u8] {
    while let Some(rest) = data.strip_prefix(BOM_BYTES) {
        data = rest;
    }
    data
}

/// Trim a cell and turn non-breaking spaces into plain spaces
pub fn normalize_cell(cell: &str) -> String {
    cell.replace('\u{00A0}', " ").trim().to_string()
}
