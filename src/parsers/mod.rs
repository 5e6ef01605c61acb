//! Row readers for performance exports

mod csv_export;
pub mod filename;
pub mod schema;

pub use csv_export::CsvExportReader;
pub use filename::{is_entity_code, ExportFileName};

use crate::types::{ExportRow, Result};
use std::path::Path;

/// Streams one export file into validated rows, in file order
pub trait RowReader: Send + Sync {
    /// Reader name (e.g., "csv")
    fn name(&self) -> &str;

    /// Read a whole file. Any I/O, CSV or schema failure fails the file.
    fn read_file(&self, path: &Path) -> Result<Vec<ExportRow>>;
}
