//! Canonical `MON-YYYY` reporting period

use crate::types::{Result, RollupError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Three-letter month codes, January first
pub const MONTH_CODES: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Month number (1-12) for a three-letter code, case-insensitive
pub fn month_from_code(code: &str) -> Option<u32> {
    let code = code.trim();
    MONTH_CODES
        .iter()
        .position(|m| m.eq_ignore_ascii_case(code))
        .map(|i| i as u32 + 1)
}

/// A reporting bucket: one calendar month of one year.
///
/// Orders chronologically and serializes as `"MAR-2025"`, so it can be
/// used directly as a JSON map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeriodKey {
    year: i32,
    /// Always 1-12; only [`PeriodKey::new`] builds keys
    month: u32,
}

impl PeriodKey {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(RollupError::Parse(format!("month out of range: {}", month)));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn month_code(&self) -> &'static str {
        MONTH_CODES[(self.month - 1) as usize]
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.month_code(), self.year)
    }
}

impl FromStr for PeriodKey {
    type Err = RollupError;

    fn from_str(s: &str) -> Result<Self> {
        let (code, year) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| RollupError::Parse(format!("invalid period key '{}'", s)))?;
        let month = month_from_code(code)
            .ok_or_else(|| RollupError::Parse(format!("invalid month code in '{}'", s)))?;
        let year: i32 = year
            .parse()
            .map_err(|_| RollupError::Parse(format!("invalid year in '{}'", s)))?;
        Self::new(year, month)
    }
}

impl Serialize for PeriodKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PeriodKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
