//! Rollup merger: folds file accumulations into persisted rollup state
//!
//! Merging is always addition of totals, weighted sums and weight totals,
//! so several partial files for one period accumulate. Averages are then
//! recomputed from the merged accumulators, never carried over.

use crate::services::accumulator::FileAccumulation;
use crate::types::{
    GlobalModelAggregate, MetricTotals, PeriodAccumulation, PeriodAggregate, PeriodKey,
    RollupState,
};
use tracing::warn;

/// Owner of every mutation of period and model aggregates
pub struct RollupMerger;

impl RollupMerger {
    /// Merge one period's accumulation into its existing aggregate (or a
    /// fresh one) and recompute the averages.
    pub fn merge_period(
        existing: Option<PeriodAggregate>,
        acc: &PeriodAccumulation,
    ) -> PeriodAggregate {
        let mut aggregate = existing.unwrap_or_default();

        aggregate.totals.merge(&acc.totals);
        aggregate.weighted.merge(&acc.weighted);
        for (model, totals) in &acc.models {
            aggregate
                .models
                .entry(model.clone())
                .or_default()
                .merge(totals);
        }

        aggregate.recompute_averages();
        aggregate
    }

    /// Merge one period's totals for a model into its lifetime aggregate,
    /// recording the period in the model's history.
    pub fn merge_model(
        existing: Option<GlobalModelAggregate>,
        period: PeriodKey,
        totals: &MetricTotals,
    ) -> GlobalModelAggregate {
        let mut aggregate = existing.unwrap_or_default();
        aggregate.totals.merge(totals);
        aggregate.history.entry(period).or_default().merge(totals);
        aggregate
    }

    /// Merge a whole file into the state and mark the file as absorbed.
    ///
    /// A file the state already absorbed is left out; the state is
    /// returned unchanged.
    pub fn merge_file(mut state: RollupState, file: &FileAccumulation) -> RollupState {
        let file_name = &file.source.file_name;
        if state.processed_files.contains(file_name) {
            warn!(entity = %state.entity, file = %file_name, "file already merged, not merging again");
            return state;
        }

        for (period, acc) in &file.periods {
            let existing = state.months.remove(period);
            state
                .months
                .insert(*period, Self::merge_period(existing, acc));

            for (model, totals) in &acc.models {
                let existing = state.models.remove(model);
                state
                    .models
                    .insert(model.clone(), Self::merge_model(existing, *period, totals));
            }
        }

        state.processed_files.insert(file_name.clone());
        state
    }
}
