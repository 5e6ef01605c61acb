//! Weighted metric accumulation for export rows

use crate::parsers::ExportFileName;
use crate::services::normalizer::normalize_model_name;
use crate::services::period_resolver::resolve_period;
use crate::types::{DropReason, ExportRow, PeriodAccumulation, PeriodKey};
use std::collections::BTreeMap;

/// Everything one export file contributes, grouped by period
#[derive(Debug, Clone, PartialEq)]
pub struct FileAccumulation {
    pub source: ExportFileName,
    pub periods: BTreeMap<PeriodKey, PeriodAccumulation>,
    pub rows_read: usize,
    pub dropped_missing_week: usize,
    pub dropped_week53: usize,
}

impl FileAccumulation {
    pub fn rows_dropped(&self) -> usize {
        self.dropped_missing_week + self.dropped_week53
    }

    pub fn rows_accumulated(&self) -> usize {
        self.rows_read - self.rows_dropped()
    }
}

/// Accumulator for additive totals and weighted ratio sums
pub struct Accumulator;

impl Accumulator {
    /// Accumulate rows already resolved to a single period.
    ///
    /// Additive metrics are summed. Ratio metrics accumulate
    /// `ratio * weight` and `weight` so the period average is weighted by
    /// the metric's own denominator, never a row-count mean.
    pub fn accumulate<'a, I>(rows: I) -> PeriodAccumulation
    where
        I: IntoIterator<Item = &'a ExportRow>,
    {
        let mut acc = PeriodAccumulation::default();
        for row in rows {
            let model = normalize_model_name(row.model.as_deref());
            acc.add_row(row, &model);
        }
        acc
    }

    /// Resolve every row of one file to its period and accumulate per
    /// period. Rows without a week, or reporting week 53, are dropped.
    pub fn accumulate_file(source: &ExportFileName, rows: &[ExportRow]) -> FileAccumulation {
        let mut grouped: BTreeMap<PeriodKey, Vec<&ExportRow>> = BTreeMap::new();
        let mut dropped_missing_week = 0;
        let mut dropped_week53 = 0;

        for row in rows {
            match resolve_period(row.week.as_deref(), source) {
                Ok(period) => grouped.entry(period).or_default().push(row),
                Err(DropReason::MissingWeek) => dropped_missing_week += 1,
                Err(DropReason::Week53) => dropped_week53 += 1,
            }
        }

        let periods = grouped
            .into_iter()
            .map(|(period, rows)| (period, Self::accumulate(rows)))
            .collect();

        FileAccumulation {
            source: source.clone(),
            periods,
            rows_read: rows.len(),
            dropped_missing_week,
            dropped_week53,
        }
    }
}
