//! CSV performance export reader

use crate::parsers::schema::ColumnIndex;
use crate::types::{ExportRow, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::RowReader;

/// Reads `{ENTITY}-ALLMODELS-*.csv` exports with the `csv` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvExportReader;

impl CsvExportReader {
    pub fn new() -> Self {
        Self
    }

    /// Read every row from any CSV source. Ragged records and a header
    /// missing a required column fail the whole source.
    pub fn read_from<R: Read>(reader: R) -> Result<Vec<ExportRow>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let index = ColumnIndex::resolve(csv_reader.headers()?)?;

        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            // Spreadsheet exports often pad with blank lines of commas
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            rows.push(index.row(&record));
        }

        Ok(rows)
    }
}

impl RowReader for CsvExportReader {
    fn name(&self) -> &str {
        "csv"
    }

    fn read_file(&self, path: &Path) -> Result<Vec<ExportRow>> {
        let file = File::open(path)?;
        Self::read_from(file)
    }
}
