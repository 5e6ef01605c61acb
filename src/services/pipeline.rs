//! Rollup run orchestration
//!
//! Per entity: discover new exports, read and accumulate each file in
//! order, merge into the entity's rollup, refresh derived views and
//! persist. Entities run in parallel with no shared state.

use crate::config::Config;
use crate::parsers::{CsvExportReader, RowReader};
use crate::services::accumulator::Accumulator;
use crate::services::discovery::{self, EntitySource};
use crate::services::merger::RollupMerger;
use crate::services::store::{JsonFileStore, RollupStore};
use crate::services::year_to_date::refresh_derived;
use crate::types::{ProcessedFileIndex, Result, RollupState};
use chrono::Utc;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// A file that could not be read; it stays out of the index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileFailure {
    pub file: String,
    pub error: String,
}

/// Outcome of one entity's run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntityReport {
    pub entity: String,
    pub files_processed: usize,
    pub files_already_processed: usize,
    pub files_failed: Vec<FileFailure>,
    pub rows_dropped: usize,
    pub total_records: u64,
    pub periods: usize,
}

impl EntityReport {
    fn new(entity: &str) -> Self {
        Self {
            entity: entity.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntityOutcome {
    Completed(EntityReport),
    Failed { entity: String, error: String },
}

impl EntityOutcome {
    pub fn entity(&self) -> &str {
        match self {
            EntityOutcome::Completed(report) => &report.entity,
            EntityOutcome::Failed { entity, .. } => entity,
        }
    }
}

/// Every entity outcome of a run, in entity order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub outcomes: Vec<EntityOutcome>,
}

impl RunSummary {
    pub fn reports(&self) -> impl Iterator<Item = &EntityReport> {
        self.outcomes.iter().filter_map(|o| match o {
            EntityOutcome::Completed(report) => Some(report),
            EntityOutcome::Failed { .. } => None,
        })
    }

    pub fn failed_entities(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|o| match o {
            EntityOutcome::Failed { entity, .. } => Some(entity.as_str()),
            EntityOutcome::Completed(_) => None,
        })
    }

    pub fn report(&self, entity: &str) -> Option<&EntityReport> {
        self.reports().find(|r| r.entity == entity)
    }
}

/// Aggregation service bound to a reader, a store and a config
pub struct RollupService {
    config: Config,
    reader: Box<dyn RowReader>,
    store: Box<dyn RollupStore>,
}

impl RollupService {
    /// CSV reader and JSON file store under `config.output_dir`
    pub fn new(config: Config) -> Self {
        let store = JsonFileStore::new(config.output_dir.clone());
        Self::with_parts(config, Box::new(CsvExportReader::new()), Box::new(store))
    }

    pub fn with_parts(
        config: Config,
        reader: Box<dyn RowReader>,
        store: Box<dyn RollupStore>,
    ) -> Self {
        Self {
            config,
            reader,
            store,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &dyn RollupStore {
        self.store.as_ref()
    }

    /// Run every selected entity. Only an unreadable data root fails the
    /// whole run; entity failures are recorded in the summary.
    pub fn run(&self) -> Result<RunSummary> {
        let sources = self.select_sources(discovery::discover_entities(&self.config.data_dir)?);
        info!(
            data_dir = %self.config.data_dir.display(),
            entities = sources.len(),
            "starting rollup run"
        );

        let outcomes = sources
            .par_iter()
            .map(|source| match self.run_entity(source) {
                Ok(report) => EntityOutcome::Completed(report),
                Err(e) => {
                    error!(entity = %source.entity, error = %e, "entity run failed");
                    EntityOutcome::Failed {
                        entity: source.entity.clone(),
                        error: e.to_string(),
                    }
                }
            })
            .collect();

        Ok(RunSummary { outcomes })
    }

    /// Keep requested entities; a requested entity with no discovered
    /// source falls back to `<data_dir>/<ENTITY>`.
    fn select_sources(&self, discovered: Vec<EntitySource>) -> Vec<EntitySource> {
        if self.config.entities.is_empty() {
            return discovered;
        }

        self.config
            .entities
            .iter()
            .map(|entity| {
                discovered
                    .iter()
                    .find(|s| &s.entity == entity)
                    .cloned()
                    .unwrap_or_else(|| EntitySource {
                        entity: entity.clone(),
                        dirs: vec![self.config.data_dir.join(entity)],
                    })
            })
            .collect()
    }

    /// Aggregate one entity's new files and persist the result.
    ///
    /// Unreadable files are skipped and reported; listing or persistence
    /// failures fail the entity. When reprocessing, the stored rollup is
    /// ignored rather than deleted, and only replaced by a successful write.
    pub fn run_entity(&self, source: &EntitySource) -> Result<EntityReport> {
        let entity = source.entity.as_str();
        let mut report = EntityReport::new(entity);

        let candidates = discovery::list_candidates(entity, &source.dirs)?;

        let (mut index, stored) = if self.config.reprocess {
            info!(entity, "reprocessing from an empty rollup");
            (ProcessedFileIndex::new(), None)
        } else {
            (self.store.processed_files(entity)?, self.store.get(entity)?)
        };

        let found = discovery::filter_new(candidates, &index);
        report.files_already_processed = found.already_processed;
        if found.already_processed > 0 {
            debug!(entity, files = found.already_processed, "skipping already processed files");
        }

        let mut state = stored.unwrap_or_else(|| RollupState::new(entity));

        for candidate in &found.new_files {
            let file_name = &candidate.name.file_name;
            info!(entity, file = %file_name, reader = self.reader.name(), "processing file");

            let rows = match self.reader.read_file(&candidate.path) {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(entity, file = %file_name, error = %e, "skipping unreadable file");
                    report.files_failed.push(FileFailure {
                        file: file_name.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let accumulation = Accumulator::accumulate_file(&candidate.name, &rows);
            if accumulation.rows_dropped() > 0 {
                info!(
                    entity,
                    file = %file_name,
                    missing_week = accumulation.dropped_missing_week,
                    week_53 = accumulation.dropped_week53,
                    "dropped rows"
                );
            }
            debug!(
                entity,
                file = %file_name,
                rows = accumulation.rows_accumulated(),
                periods = accumulation.periods.len(),
                "file accumulated"
            );
            report.rows_dropped += accumulation.rows_dropped();

            state = RollupMerger::merge_file(state, &accumulation);
            report.files_processed += 1;
        }

        let state = refresh_derived(state, self.config.year, Utc::now());
        index.extend(&state.processed_files);
        self.store.put(entity, &state, &index)?;

        report.total_records = state.total_records();
        report.periods = state.months.len();
        info!(
            entity,
            processed = report.files_processed,
            failed = report.files_failed.len(),
            records = report.total_records,
            "entity rollup written"
        );
        Ok(report)
    }
}
