//! Run configuration

use crate::parsers::is_entity_code;
use crate::types::{Result, RollupError};
use chrono::{Datelike, Local};
use directories::BaseDirs;
use std::path::PathBuf;

/// Settings for one aggregation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root holding entity subdirectories and/or export files
    pub data_dir: PathBuf,
    /// Where rollup artifacts are written
    pub output_dir: PathBuf,
    /// Calendar year used for the year-to-date view
    pub year: i32,
    /// Ignore the stored index and rollup and aggregate every file again
    pub reprocess: bool,
    /// Restrict the run to these entity codes; empty means all
    pub entities: Vec<String>,
}

impl Config {
    /// Config rooted in explicit directories, current year, all entities
    pub fn with_dirs(data_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            data_dir,
            output_dir,
            year: current_year(),
            reprocess: false,
            entities: Vec::new(),
        }
    }

    /// Fill unset directories with the defaults under `~/.perfrollup`
    pub fn resolve(data_dir: Option<PathBuf>, output_dir: Option<PathBuf>) -> Result<Self> {
        let (data_dir, output_dir) = match (data_dir, output_dir) {
            (Some(data), Some(output)) => (data, output),
            (data, output) => {
                let root = default_root()?;
                (
                    data.unwrap_or_else(|| root.join("data")),
                    output.unwrap_or_else(|| root.join("rollups")),
                )
            }
        };
        Ok(Self::with_dirs(data_dir, output_dir))
    }

    pub fn with_year(mut self, year: Option<i32>) -> Result<Self> {
        if let Some(year) = year {
            if !(2000..=2099).contains(&year) {
                return Err(RollupError::Config(format!(
                    "year {} outside supported range 2000-2099",
                    year
                )));
            }
            self.year = year;
        }
        Ok(self)
    }

    pub fn with_reprocess(mut self, reprocess: bool) -> Self {
        self.reprocess = reprocess;
        self
    }

    /// Restrict to the given entity codes (normalised to uppercase)
    pub fn with_entities<I, S>(mut self, entities: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut codes = Vec::new();
        for entity in entities {
            let entity = entity.as_ref().trim();
            if !is_entity_code(entity) {
                return Err(RollupError::Config(format!(
                    "invalid entity code '{}': expected 2-3 letters",
                    entity
                )));
            }
            let code = entity.to_ascii_uppercase();
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
        self.entities = codes;
        Ok(self)
    }
}

/// `~/.perfrollup`
pub fn default_root() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new()
        .ok_or_else(|| RollupError::Config("Cannot determine home directory".into()))?;
    Ok(base_dirs.home_dir().join(".perfrollup"))
}

pub fn current_year() -> i32 {
    Local::now().year()
}
