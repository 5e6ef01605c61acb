//! Services for discovery, aggregation and persistence

pub mod accumulator;
pub mod discovery;
pub mod merger;
pub mod normalizer;
pub mod period_resolver;
pub mod pipeline;
pub mod store;
pub mod year_to_date;

pub use accumulator::{Accumulator, FileAccumulation};
pub use merger::RollupMerger;
pub use normalizer::normalize_model_name;
pub use pipeline::{EntityOutcome, EntityReport, FileFailure, RollupService, RunSummary};
pub use store::{JsonFileStore, MemoryStore, RollupStore};
