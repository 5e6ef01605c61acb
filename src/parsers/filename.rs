//! `{ENTITY}-ALLMODELS-{MON}-{YY}.csv` export filenames

use crate::types::{month_from_code, PeriodKey};
use regex::Regex;
use std::sync::OnceLock;

fn export_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^([A-Z]{2,3})-ALLMODELS-([A-Z]{3})-(\d{2})\.csv$").expect("valid regex")
    })
}

/// A parsed export filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFileName {
    /// Original filename, used as the processed-index key
    pub file_name: String,
    /// Upper-cased entity code, e.g. `FR`
    pub entity: String,
    /// Month declared by the filename
    pub period: PeriodKey,
}

impl ExportFileName {
    /// Parse a bare filename. Returns `None` for anything that does not
    /// follow the naming convention, including unknown month codes.
    pub fn parse(file_name: &str) -> Option<Self> {
        let caps = export_name_regex().captures(file_name)?;
        let month = month_from_code(&caps[2])?;
        let yy: i32 = caps[3].parse().ok()?;
        Some(Self {
            file_name: file_name.to_string(),
            entity: caps[1].to_ascii_uppercase(),
            period: PeriodKey::new(2000 + yy, month).ok()?,
        })
    }

    /// Parse only if the filename belongs to `entity`
    pub fn parse_for_entity(file_name: &str, entity: &str) -> Option<Self> {
        Self::parse(file_name).filter(|f| f.entity.eq_ignore_ascii_case(entity))
    }
}

/// Entity codes are two or three ASCII letters
pub fn is_entity_code(name: &str) -> bool {
    (2..=3).contains(&name.len()) && name.chars().all(|c| c.is_ascii_alphabetic())
}
