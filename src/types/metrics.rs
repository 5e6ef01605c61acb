//! Metric types for marketing performance exports

use serde::{Deserialize, Serialize};

/// One validated row of a performance export.
///
/// Numeric columns missing from the file default to 0. Ratio columns
/// stay `None` when missing, blank or non-numeric.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExportRow {
    /// Raw `Week of Year` cell, `None` when blank
    pub week: Option<String>,
    /// Raw `Model` cell, `None` when blank
    pub model: Option<String>,
    pub media_spend: f64,
    pub impressions: f64,
    pub clicks: f64,
    /// Interacting visits (`IV`)
    pub interacting_visits: f64,
    /// Conversions (`NVWR`)
    pub conversions: f64,
    pub ctr: Option<f64>,
    pub cpm: Option<f64>,
    pub cpc: Option<f64>,
    /// Cost per interacting visit (`CP IV`)
    pub cp_iv: Option<f64>,
    /// Cost per conversion (`Cp NVWR`)
    pub cp_nvwr: Option<f64>,
}

/// Additive totals
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct MetricTotals {
    #[serde(rename = "totalMediaSpend")]
    pub media_spend: f64,
    #[serde(rename = "totalImpressions")]
    pub impressions: f64,
    #[serde(rename = "totalClicks")]
    pub clicks: f64,
    #[serde(rename = "totalIV")]
    pub interacting_visits: f64,
    #[serde(rename = "totalConversions")]
    pub conversions: f64,
    #[serde(rename = "recordCount")]
    pub records: u64,
}

impl MetricTotals {
    pub fn add_row(&mut self, row: &ExportRow) {
        self.media_spend += row.media_spend;
        self.impressions += row.impressions;
        self.clicks += row.clicks;
        self.interacting_visits += row.interacting_visits;
        self.conversions += row.conversions;
        self.records = self.records.saturating_add(1);
    }

    pub fn merge(&mut self, other: &MetricTotals) {
        self.media_spend += other.media_spend;
        self.impressions += other.impressions;
        self.clicks += other.clicks;
        self.interacting_visits += other.interacting_visits;
        self.conversions += other.conversions;
        self.records = self.records.saturating_add(other.records);
    }
}

/// Weighted-sum / weight-total pair for one ratio metric
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WeightedSum {
    pub weighted_sum: f64,
    pub weight_total: f64,
}

impl WeightedSum {
    /// Add `value * weight`. A zero, missing or non-finite value, or a
    /// non-positive weight, contributes nothing to either side.
    pub fn add(&mut self, value: Option<f64>, weight: f64) {
        let Some(value) = value else {
            return;
        };
        if value == 0.0 || !value.is_finite() || !weight.is_finite() || weight <= 0.0 {
            return;
        }
        self.weighted_sum += value * weight;
        self.weight_total += weight;
    }

    pub fn merge(&mut self, other: &WeightedSum) {
        self.weighted_sum += other.weighted_sum;
        self.weight_total += other.weight_total;
    }

    /// `weighted_sum / weight_total`, 0 when nothing was weighted
    pub fn average(&self) -> f64 {
        if self.weight_total <= 0.0 {
            return 0.0;
        }
        self.weighted_sum / self.weight_total
    }
}

/// Weighted accumulators for every ratio metric.
///
/// CTR and CPM are weighted by impressions, CPC by clicks, CP IV by
/// interacting visits and Cp NVWR by conversions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RatioAccumulators {
    pub ctr: WeightedSum,
    pub cpm: WeightedSum,
    pub cpc: WeightedSum,
    pub cp_iv: WeightedSum,
    pub cp_nvwr: WeightedSum,
}

impl RatioAccumulators {
    pub fn add_row(&mut self, row: &ExportRow) {
        self.ctr.add(row.ctr, row.impressions);
        self.cpm.add(row.cpm, row.impressions);
        self.cpc.add(row.cpc, row.clicks);
        self.cp_iv.add(row.cp_iv, row.interacting_visits);
        self.cp_nvwr.add(row.cp_nvwr, row.conversions);
    }

    pub fn merge(&mut self, other: &RatioAccumulators) {
        self.ctr.merge(&other.ctr);
        self.cpm.merge(&other.cpm);
        self.cpc.merge(&other.cpc);
        self.cp_iv.merge(&other.cp_iv);
        self.cp_nvwr.merge(&other.cp_nvwr);
    }

    pub fn averages(&self) -> MetricAverages {
        MetricAverages {
            ctr: self.ctr.average(),
            cpm: self.cpm.average(),
            cpc: self.cpc.average(),
            cp_iv: self.cp_iv.average(),
            cp_nvwr: self.cp_nvwr.average(),
        }
    }
}

/// Derived averages, always recomputed from [`RatioAccumulators`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct MetricAverages {
    #[serde(rename = "avgCTR")]
    pub ctr: f64,
    #[serde(rename = "avgCPM")]
    pub cpm: f64,
    #[serde(rename = "avgCPC")]
    pub cpc: f64,
    #[serde(rename = "avgCPIV")]
    pub cp_iv: f64,
    #[serde(rename = "avgCPNVWR")]
    pub cp_nvwr: f64,
}
