//! Delimited-text import and export

pub mod pipeline;
pub mod template;

pub use pipeline::{ImportPipeline, ImportReport};
pub use template::{export_csv, template_csv, TEMPLATE_HEADER};
