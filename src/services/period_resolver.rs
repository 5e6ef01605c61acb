//! Week-of-year to reporting period resolution
//!
//! Weeks map to months through a fixed 52-entry table of four- and
//! five-week months. Week 53 straddles the year boundary and is dropped;
//! any other week outside the table falls back to the month declared by
//! the export's filename. A January export reporting December weeks, or a
//! December export reporting January weeks, belongs to the adjacent year.

use crate::parsers::ExportFileName;
use crate::types::{DropReason, PeriodKey};
use regex::Regex;
use std::sync::OnceLock;

/// Month (1-12) for weeks 1..=52, index 0 is week 1
const WEEK_TO_MONTH: [u32; 52] = [
    1, 1, 1, 1, // JAN 1-4
    2, 2, 2, 2, // FEB 5-8
    3, 3, 3, 3, 3, // MAR 9-13
    4, 4, 4, 4, // APR 14-17
    5, 5, 5, 5, 5, // MAY 18-22
    6, 6, 6, 6, // JUN 23-26
    7, 7, 7, 7, // JUL 27-30
    8, 8, 8, 8, 8, // AUG 31-35
    9, 9, 9, 9, // SEP 36-39
    10, 10, 10, 10, 10, // OCT 40-44
    11, 11, 11, 11, // NOV 45-48
    12, 12, 12, 12, // DEC 49-52
];

const CROSS_YEAR_WEEK: u32 = 53;

fn week_number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid regex"))
}

/// Month for a week number, if the table has one
pub fn month_for_week(week: u32) -> Option<u32> {
    week.checked_sub(1)
        .and_then(|i| WEEK_TO_MONTH.get(i as usize))
        .copied()
}

/// Extract the week number from a cell like `"12"`, `"W05"` or `"Week 7"`
pub fn parse_week(cell: &str) -> Option<u32> {
    week_number_regex()
        .find(cell)
        .and_then(|m| m.as_str().parse().ok())
}

/// Resolve a row's week cell to a period, or a reason to drop the row.
///
/// The year is the filename's, except across the year boundary: DEC weeks
/// in a JAN export fall in the previous year, JAN weeks in a DEC export in
/// the next one.
pub fn resolve_period(
    week: Option<&str>,
    source: &ExportFileName,
) -> std::result::Result<PeriodKey, DropReason> {
    let cell = week
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or(DropReason::MissingWeek)?;

    let declared = source.period;
    let month = match parse_week(cell) {
        Some(CROSS_YEAR_WEEK) => return Err(DropReason::Week53),
        Some(n) => month_for_week(n),
        None => None,
    };
    let Some(month) = month else {
        return Ok(declared);
    };

    let year_delta = match (declared.month(), month) {
        (1, 12) => -1,
        (12, 1) => 1,
        _ => 0,
    };

    Ok(PeriodKey::new(declared.year() + year_delta, month).unwrap_or(declared))
}
