//! Incremental, idempotent month and year rollups of per-entity marketing
//! performance exports.

pub mod cli;
pub mod config;
pub mod parsers;
pub mod services;
pub mod types;
