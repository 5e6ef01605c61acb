//! Year-to-date rollup and month-over-month comparison
//!
//! Both views are derived from the period aggregates on every run and
//! never updated incrementally.

use crate::types::{
    MetricChanges, PeriodAggregate, PeriodComparison, PeriodKey, RatioAccumulators,
    RollupState, YearToDateAggregate, YearToDateTotals,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Sum every period of `year`, then derive averages from the summed
/// weighted accumulators (never a mean of period averages).
pub fn year_to_date(months: &BTreeMap<PeriodKey, PeriodAggregate>, year: i32) -> YearToDateAggregate {
    let mut totals = YearToDateTotals {
        year,
        ..Default::default()
    };
    let mut weighted = RatioAccumulators::default();

    for aggregate in months
        .iter()
        .filter(|(period, _)| period.year() == year)
        .map(|(_, aggregate)| aggregate)
    {
        totals.totals.merge(&aggregate.totals);
        weighted.merge(&aggregate.weighted);
        totals.period_count += 1;
    }

    totals.weighted = weighted;
    YearToDateAggregate {
        averages: weighted.averages(),
        totals,
    }
}

/// Percentage change from `previous` to `latest`.
///
/// A zero previous value yields 100 when the latest is positive and 0
/// otherwise.
pub fn percent_change(latest: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return if latest > 0.0 { 100.0 } else { 0.0 };
    }
    (latest - previous) / previous * 100.0
}

/// Compare the two chronologically latest periods. `None` with fewer than
/// two periods.
pub fn compare_latest(months: &BTreeMap<PeriodKey, PeriodAggregate>) -> Option<PeriodComparison> {
    let mut latest_two = months.iter().rev().take(2);
    let (current_period, current) = latest_two.next()?;
    let (previous_period, previous) = latest_two.next()?;

    let changes = MetricChanges {
        media_spend: percent_change(current.totals.media_spend, previous.totals.media_spend),
        impressions: percent_change(current.totals.impressions, previous.totals.impressions),
        clicks: percent_change(current.totals.clicks, previous.totals.clicks),
        ctr: percent_change(current.averages.ctr, previous.averages.ctr),
        cpm: percent_change(current.averages.cpm, previous.averages.cpm),
        cpc: percent_change(current.averages.cpc, previous.averages.cpc),
        cp_iv: percent_change(current.averages.cp_iv, previous.averages.cp_iv),
        cp_nvwr: percent_change(current.averages.cp_nvwr, previous.averages.cp_nvwr),
    };

    Some(PeriodComparison {
        current_period: *current_period,
        previous_period: *previous_period,
        changes,
    })
}

/// Rebuild every derived field of the state for `year`
pub fn refresh_derived(mut state: RollupState, year: i32, now: DateTime<Utc>) -> RollupState {
    for aggregate in state.months.values_mut() {
        aggregate.recompute_averages();
    }

    let ytd = year_to_date(&state.months, year);
    state.year_to_date_totals = ytd.totals;
    state.year_to_date_averages = ytd.averages;
    state.monthly_comparison = compare_latest(&state.months);
    state.last_updated = Some(now);
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_aggregate(spend: f64, impressions: f64, cpm: f64) -> PeriodAggregate {
        let mut aggregate = PeriodAggregate::default();
        aggregate.totals.media_spend = spend;
        aggregate.totals.impressions = impressions;
        aggregate.totals.records = 1;
        aggregate.weighted.cpm.add(Some(cpm), impressions);
        aggregate.recompute_averages();
        aggregate
    }

    fn key(year: i32, month: u32) -> PeriodKey {
        PeriodKey::new(year, month).unwrap()
    }

    // ========== year_to_date() tests ==========

    #[test]
    fn test_ytd_sums_only_requested_year() {
        let mut months = BTreeMap::new();
        months.insert(key(2024, 12), make_aggregate(1000.0, 10_000.0, 5.0));
        months.insert(key(2025, 1), make_aggregate(100.0, 1000.0, 10.0));
        months.insert(key(2025, 2), make_aggregate(300.0, 3000.0, 2.0));

        let ytd = year_to_date(&months, 2025);

        assert_eq!(ytd.totals.year, 2025);
        assert_eq!(ytd.totals.period_count, 2);
        assert!((ytd.totals.totals.media_spend - 400.0).abs() < f64::EPSILON);
        assert!((ytd.totals.totals.impressions - 4000.0).abs() < f64::EPSILON);
        assert_eq!(ytd.totals.totals.records, 2);
    }

    #[test]
    fn test_ytd_average_is_weighted_not_mean_of_periods() {
        let mut months = BTreeMap::new();
        months.insert(key(2025, 1), make_aggregate(100.0, 1000.0, 10.0));
        months.insert(key(2025, 2), make_aggregate(300.0, 3000.0, 2.0));

        let ytd = year_to_date(&months, 2025);

        // Mean of period averages would be 6.0
        assert!((ytd.averages.cpm - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_ytd_empty_year() {
        let mut months = BTreeMap::new();
        months.insert(key(2024, 5), make_aggregate(100.0, 1000.0, 10.0));

        let ytd = year_to_date(&months, 2025);
        assert_eq!(ytd.totals.period_count, 0);
        assert_eq!(ytd.totals.totals.media_spend, 0.0);
        assert_eq!(ytd.averages.cpm, 0.0);
    }

    // ========== percent_change() tests ==========

    #[test]
    fn test_percent_change_regular() {
        assert!((percent_change(150.0, 100.0) - 50.0).abs() < 1e-9);
        assert!((percent_change(50.0, 100.0) + 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_percent_change_from_zero() {
        assert_eq!(percent_change(10.0, 0.0), 100.0);
        assert_eq!(percent_change(0.0, 0.0), 0.0);
    }

    // ========== compare_latest() tests ==========

    #[test]
    fn test_compare_single_period_is_none() {
        let mut months = BTreeMap::new();
        months.insert(key(2025, 3), make_aggregate(100.0, 1000.0, 10.0));
        assert!(compare_latest(&months).is_none());
        assert!(compare_latest(&BTreeMap::new()).is_none());
    }

    #[test]
    fn test_compare_uses_two_latest_chronologically() {
        let mut months = BTreeMap::new();
        months.insert(key(2025, 1), make_aggregate(999.0, 1000.0, 10.0));
        months.insert(key(2024, 12), make_aggregate(1.0, 1000.0, 10.0));
        months.insert(key(2024, 11), make_aggregate(1.0, 1000.0, 10.0));

        let cmp = compare_latest(&months).unwrap();
        assert_eq!(cmp.current_period, key(2025, 1));
        assert_eq!(cmp.previous_period, key(2024, 12));
        assert!((cmp.changes.media_spend - 99_800.0).abs() < 1e-6);
        assert_eq!(cmp.changes.cpm, 0.0);
    }

    #[test]
    fn test_compare_previous_zero_gives_100() {
        let mut months = BTreeMap::new();
        months.insert(key(2025, 2), make_aggregate(0.0, 0.0, 0.0));
        months.insert(key(2025, 3), make_aggregate(250.0, 1000.0, 10.0));

        let cmp = compare_latest(&months).unwrap();
        assert_eq!(cmp.changes.media_spend, 100.0);
        assert_eq!(cmp.changes.cpm, 100.0);
        assert_eq!(cmp.changes.clicks, 0.0);
    }

    // ========== refresh_derived() tests ==========

    #[test]
    fn test_refresh_derived_sets_all_views() {
        let mut state = RollupState::new("FR");
        state.months.insert(key(2025, 2), make_aggregate(100.0, 1000.0, 10.0));
        state.months.insert(key(2025, 3), make_aggregate(200.0, 1000.0, 12.0));
        let now = Utc::now();

        let state = refresh_derived(state, 2025, now);

        assert_eq!(state.last_updated, Some(now));
        assert!((state.year_to_date_totals.totals.media_spend - 300.0).abs() < f64::EPSILON);
        assert!((state.year_to_date_averages.cpm - 11.0).abs() < 1e-9);
        assert!(state.monthly_comparison.is_some());
    }

    #[test]
    fn test_ytd_totals_equal_sum_of_periods() {
        let mut state = RollupState::new("FR");
        state.months.insert(key(2025, 1), make_aggregate(12.5, 100.0, 3.0));
        state.months.insert(key(2025, 4), make_aggregate(7.25, 300.0, 9.0));
        state.months.insert(key(2025, 9), make_aggregate(80.0, 50.0, 1.0));

        let state = refresh_derived(state, 2025, Utc::now());

        let sum: f64 = state.months.values().map(|m| m.totals.media_spend).sum();
        assert!((state.year_to_date_totals.totals.media_spend - sum).abs() < 1e-9);
    }
}
