//! Rollup state types: per-period, per-model, year-to-date and comparison

use crate::types::{ExportRow, MetricAverages, MetricTotals, PeriodKey, RatioAccumulators};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Model sentinel for rows with a blank or missing model
pub const UNMAPPED_MODEL: &str = "unmapped";

/// Filenames already absorbed into an entity's rollup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct ProcessedFileIndex(BTreeSet<String>);

impl ProcessedFileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.0.contains(filename)
    }

    /// Returns false if the filename was already present
    pub fn insert(&mut self, filename: impl Into<String>) -> bool {
        self.0.insert(filename.into())
    }

    pub fn extend(&mut self, other: &ProcessedFileIndex) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ProcessedFileIndex {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Accumulation of one period's rows from a single file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PeriodAccumulation {
    pub totals: MetricTotals,
    pub weighted: RatioAccumulators,
    pub models: BTreeMap<String, MetricTotals>,
}

/// Persisted aggregate for one `(entity, period)`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PeriodAggregate {
    pub totals: MetricTotals,
    pub weighted: RatioAccumulators,
    /// Recomputed from `weighted` after every load and merge
    #[serde(default, skip_deserializing)]
    pub averages: MetricAverages,
    #[serde(default)]
    pub models: BTreeMap<String, MetricTotals>,
}

impl PeriodAggregate {
    pub fn recompute_averages(&mut self) {
        self.averages = self.weighted.averages();
    }
}

/// Lifetime totals for one model plus its per-period history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GlobalModelAggregate {
    pub totals: MetricTotals,
    #[serde(default)]
    pub history: BTreeMap<PeriodKey, MetricTotals>,
}

/// Year-to-date sums over every period of one calendar year
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct YearToDateTotals {
    pub year: i32,
    pub period_count: usize,
    #[serde(flatten)]
    pub totals: MetricTotals,
    pub weighted: RatioAccumulators,
}

/// Derived year-to-date view, never mutated incrementally
#[derive(Debug, Clone, PartialEq, Default)]
pub struct YearToDateAggregate {
    pub totals: YearToDateTotals,
    pub averages: MetricAverages,
}

/// Percentage change per headline metric
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MetricChanges {
    pub media_spend: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub ctr: f64,
    pub cpm: f64,
    pub cpc: f64,
    pub cp_iv: f64,
    pub cp_nvwr: f64,
}

/// Change between the two chronologically latest periods
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PeriodComparison {
    pub current_period: PeriodKey,
    pub previous_period: PeriodKey,
    pub changes: MetricChanges,
}

/// Full persisted rollup for one entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RollupState {
    pub entity: String,
    #[serde(default)]
    pub months: BTreeMap<PeriodKey, PeriodAggregate>,
    #[serde(default)]
    pub models: BTreeMap<String, GlobalModelAggregate>,
    #[serde(default)]
    pub year_to_date_totals: YearToDateTotals,
    #[serde(default)]
    pub year_to_date_averages: MetricAverages,
    #[serde(default)]
    pub monthly_comparison: Option<PeriodComparison>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    /// Files absorbed into `months`; unioned with the index artifact on load
    #[serde(default)]
    pub processed_files: ProcessedFileIndex,
}

impl RollupState {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            months: BTreeMap::new(),
            models: BTreeMap::new(),
            year_to_date_totals: YearToDateTotals::default(),
            year_to_date_averages: MetricAverages::default(),
            monthly_comparison: None,
            last_updated: None,
            processed_files: ProcessedFileIndex::new(),
        }
    }

    /// Records across every known period
    pub fn total_records(&self) -> u64 {
        self.months
            .values()
            .fold(0u64, |acc, m| acc.saturating_add(m.totals.records))
    }

    pub fn recompute_averages(&mut self) {
        for aggregate in self.months.values_mut() {
            aggregate.recompute_averages();
        }
        self.year_to_date_averages = self.year_to_date_totals.weighted.averages();
    }

    /// Flattened export: one row per period, then a year-to-date row
    pub fn summary_rows(&self) -> Vec<SummaryRow> {
        let mut rows: Vec<SummaryRow> = self
            .months
            .iter()
            .map(|(period, m)| SummaryRow::new(period.to_string(), &m.totals, &m.averages))
            .collect();
        rows.push(SummaryRow::new(
            format!("YTD {}", self.year_to_date_totals.year),
            &self.year_to_date_totals.totals,
            &self.year_to_date_averages,
        ));
        rows
    }
}

/// One line of the flattened summary export
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SummaryRow {
    #[serde(rename = "Month")]
    pub label: String,
    #[serde(rename = "Media Spend")]
    pub media_spend: f64,
    #[serde(rename = "Impressions")]
    pub impressions: f64,
    #[serde(rename = "Clicks")]
    pub clicks: f64,
    #[serde(rename = "CTR")]
    pub ctr: f64,
    #[serde(rename = "CPM")]
    pub cpm: f64,
    #[serde(rename = "CPC")]
    pub cpc: f64,
    #[serde(rename = "CP IV")]
    pub cp_iv: f64,
    #[serde(rename = "Cp NVWR")]
    pub cp_nvwr: f64,
}

impl SummaryRow {
    fn new(label: String, totals: &MetricTotals, averages: &MetricAverages) -> Self {
        Self {
            label,
            media_spend: round2(totals.media_spend),
            impressions: totals.impressions,
            clicks: totals.clicks,
            ctr: round2(averages.ctr),
            cpm: round2(averages.cpm),
            cpc: round2(averages.cpc),
            cp_iv: round2(averages.cp_iv),
            cp_nvwr: round2(averages.cp_nvwr),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl PeriodAccumulation {
    /// Fold one resolved row into the accumulation under `model`
    pub fn add_row(&mut self, row: &ExportRow, model: &str) {
        self.totals.add_row(row);
        self.weighted.add_row(row);
        self.models.entry(model.to_string()).or_default().add_row(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_aggregate(spend: f64, records: u64, cpm_sum: f64, cpm_weight: f64) -> PeriodAggregate {
        let mut agg = PeriodAggregate::default();
        agg.totals.media_spend = spend;
        agg.totals.records = records;
        agg.weighted.cpm.weighted_sum = cpm_sum;
        agg.weighted.cpm.weight_total = cpm_weight;
        agg
    }

    #[test]
    fn test_processed_index_serializes_as_array() {
        let index: ProcessedFileIndex = ["FR-ALLMODELS-MAR-25.csv", "FR-ALLMODELS-APR-25.csv"]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&index).unwrap();
        assert_eq!(
            json,
            r#"["FR-ALLMODELS-APR-25.csv","FR-ALLMODELS-MAR-25.csv"]"#
        );
    }

    #[test]
    fn test_processed_index_insert_is_set_like() {
        let mut index = ProcessedFileIndex::new();
        assert!(index.insert("a.csv"));
        assert!(!index.insert("a.csv"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_averages_not_deserialized() {
        let mut agg = make_aggregate(100.0, 1, 10_000.0, 1000.0);
        agg.recompute_averages();
        let mut json = serde_json::to_value(&agg).unwrap();
        json["averages"]["avgCPM"] = serde_json::json!(999.0);

        let mut back: PeriodAggregate = serde_json::from_value(json).unwrap();
        assert_eq!(back.averages.cpm, 0.0);
        back.recompute_averages();
        assert!((back.averages.cpm - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_state_total_records() {
        let mut state = RollupState::new("FR");
        state
            .months
            .insert(PeriodKey::new(2025, 2).unwrap(), make_aggregate(1.0, 3, 0.0, 0.0));
        state
            .months
            .insert(PeriodKey::new(2025, 3).unwrap(), make_aggregate(1.0, 4, 0.0, 0.0));
        assert_eq!(state.total_records(), 7);
    }

    #[test]
    fn test_summary_rows_trailing_ytd() {
        let mut state = RollupState::new("FR");
        state
            .months
            .insert(PeriodKey::new(2025, 3).unwrap(), make_aggregate(300.0, 2, 0.0, 0.0));
        state
            .months
            .insert(PeriodKey::new(2025, 1).unwrap(), make_aggregate(100.0, 1, 0.0, 0.0));
        state.year_to_date_totals.year = 2025;

        let rows = state.summary_rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].label, "JAN-2025");
        assert_eq!(rows[1].label, "MAR-2025");
        assert_eq!(rows[2].label, "YTD 2025");
    }

    #[test]
    fn test_state_json_shape() {
        let state = RollupState::new("FR");
        let json = serde_json::to_value(&state).unwrap();
        for key in [
            "months",
            "models",
            "yearToDateTotals",
            "yearToDateAverages",
            "monthlyComparison",
            "lastUpdated",
        ] {
            assert!(json.get(key).is_some(), "missing key {}", key);
        }
    }
}
