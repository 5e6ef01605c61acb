//! Column schema for performance exports
//!
//! Every recognised column is listed once with its accepted header names.
//! Headers are resolved a single time per file; rows are then converted
//! into typed [`ExportRow`] values with explicit defaults.

use crate::types::{ExportRow, Result, RollupError};
use csv::StringRecord;

/// A logical export column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Week,
    Model,
    MediaSpend,
    Impressions,
    Clicks,
    InteractingVisits,
    Conversions,
    Ctr,
    Cpm,
    Cpc,
    CpIv,
    CpNvwr,
}

const COLUMN_COUNT: usize = 12;

/// Header names and requirement for one column
#[derive(Debug)]
pub struct ColumnSpec {
    pub column: Column,
    /// Accepted header names, matched case-insensitively
    pub names: &'static [&'static str],
    pub required: bool,
}

/// The export schema. Only `Week of Year` is required; numeric columns
/// default to 0 and ratio columns to "absent".
pub const EXPORT_SCHEMA: [ColumnSpec; COLUMN_COUNT] = [
    required(Column::Week, &["Week of Year"]),
    optional(Column::Model, &["Model"]),
    optional(Column::MediaSpend, &["Media Cost", "Media Spend"]),
    optional(Column::Impressions, &["Impressions"]),
    optional(Column::Clicks, &["Clicks"]),
    optional(Column::InteractingVisits, &["IV"]),
    optional(Column::Conversions, &["NVWR"]),
    optional(Column::Ctr, &["CTR"]),
    optional(Column::Cpm, &["CPM"]),
    optional(Column::Cpc, &["CPC"]),
    optional(Column::CpIv, &["CP IV"]),
    optional(Column::CpNvwr, &["Cp NVWR"]),
];

const fn required(column: Column, names: &'static [&'static str]) -> ColumnSpec {
    ColumnSpec {
        column,
        names,
        required: true,
    }
}

const fn optional(column: Column, names: &'static [&'static str]) -> ColumnSpec {
    ColumnSpec {
        column,
        names,
        required: false,
    }
}

/// Header positions of each schema column within one file
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    positions: [Option<usize>; COLUMN_COUNT],
}

impl ColumnIndex {
    /// Resolve header positions, failing when a required column is absent
    pub fn resolve(headers: &StringRecord) -> Result<Self> {
        let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
        let mut positions = [None; COLUMN_COUNT];

        for (slot, spec) in positions.iter_mut().zip(EXPORT_SCHEMA.iter()) {
            *slot = spec.names.iter().find_map(|name| {
                let wanted = normalize_header(name);
                normalized.iter().position(|h| *h == wanted)
            });
            if slot.is_none() && spec.required {
                return Err(RollupError::Schema(format!(
                    "missing required column '{}'",
                    spec.names[0]
                )));
            }
        }

        Ok(Self { positions })
    }

    fn position(&self, column: Column) -> Option<usize> {
        EXPORT_SCHEMA
            .iter()
            .position(|spec| spec.column == column)
            .and_then(|i| self.positions[i])
    }

    fn cell<'r>(&self, record: &'r StringRecord, column: Column) -> Option<&'r str> {
        self.position(column)
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn number(&self, record: &StringRecord, column: Column) -> f64 {
        self.cell(record, column).and_then(parse_number).unwrap_or(0.0)
    }

    fn ratio(&self, record: &StringRecord, column: Column) -> Option<f64> {
        self.cell(record, column).and_then(parse_number)
    }

    /// Convert one record into a typed row
    pub fn row(&self, record: &StringRecord) -> ExportRow {
        ExportRow {
            week: self.cell(record, Column::Week).map(String::from),
            model: self.cell(record, Column::Model).map(String::from),
            media_spend: self.number(record, Column::MediaSpend),
            impressions: self.number(record, Column::Impressions),
            clicks: self.number(record, Column::Clicks),
            interacting_visits: self.number(record, Column::InteractingVisits),
            conversions: self.number(record, Column::Conversions),
            ctr: self.ratio(record, Column::Ctr),
            cpm: self.ratio(record, Column::Cpm),
            cpc: self.ratio(record, Column::Cpc),
            cp_iv: self.ratio(record, Column::CpIv),
            cp_nvwr: self.ratio(record, Column::CpNvwr),
        }
    }
}

fn normalize_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

/// Parse a numeric cell, tolerating thousands separators, currency
/// symbols and a trailing percent sign.
///
/// # Examples
/// ```
/// use perfrollup::parsers::schema::parse_number;
///
/// assert_eq!(parse_number("1,234.5"), Some(1234.5));
/// assert_eq!(parse_number("€12.40"), Some(12.4));
/// assert_eq!(parse_number("2.5%"), Some(2.5));
/// assert_eq!(parse_number("n/a"), None);
/// ```
pub fn parse_number(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '€' | '£' | '%' | ' ' | '\u{a0}'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cols: &[&str]) -> StringRecord {
        StringRecord::from(cols.to_vec())
    }

    #[test]
    fn test_resolve_requires_week_column() {
        let result = ColumnIndex::resolve(&headers(&["Model", "Impressions"]));
        assert!(matches!(result, Err(RollupError::Schema(_))));
    }

    #[test]
    fn test_resolve_accepts_either_media_cost_name() {
        let a = ColumnIndex::resolve(&headers(&["Week of Year", "Media Cost"])).unwrap();
        let b = ColumnIndex::resolve(&headers(&["Week of Year", "Media Spend"])).unwrap();
        let record = StringRecord::from(vec!["10", "125.5"]);
        assert_eq!(a.row(&record).media_spend, 125.5);
        assert_eq!(b.row(&record).media_spend, 125.5);
    }

    #[test]
    fn test_resolve_is_case_and_space_insensitive() {
        let index =
            ColumnIndex::resolve(&headers(&["\u{feff}week  of year", " cp iv ", "CP NVWR"])).unwrap();
        let row = index.row(&StringRecord::from(vec!["7", "3.5", "12"]));
        assert_eq!(row.week.as_deref(), Some("7"));
        assert_eq!(row.cp_iv, Some(3.5));
        assert_eq!(row.cp_nvwr, Some(12.0));
    }

    #[test]
    fn test_missing_optional_columns_default() {
        let index = ColumnIndex::resolve(&headers(&["Week of Year", "Model"])).unwrap();
        let row = index.row(&StringRecord::from(vec!["12", "Model X"]));

        assert_eq!(row.week.as_deref(), Some("12"));
        assert_eq!(row.model.as_deref(), Some("Model X"));
        assert_eq!(row.media_spend, 0.0);
        assert_eq!(row.impressions, 0.0);
        assert_eq!(row.cpm, None);
    }

    #[test]
    fn test_blank_cells_become_none_or_zero() {
        let index =
            ColumnIndex::resolve(&headers(&["Week of Year", "Model", "Clicks", "CPC"])).unwrap();
        let row = index.row(&StringRecord::from(vec!["", "  ", "", "abc"]));

        assert_eq!(row.week, None);
        assert_eq!(row.model, None);
        assert_eq!(row.clicks, 0.0);
        assert_eq!(row.cpc, None);
    }

    #[test]
    fn test_parse_number_variants() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number(" $1,000.25 "), Some(1000.25));
        assert_eq!(parse_number("0.75%"), Some(0.75));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("-"), None);
    }
}
