//! Type definitions for perfrollup

mod error;
mod metrics;
mod period;
mod rollup;

pub use error::*;
pub use metrics::*;
pub use period::*;
pub use rollup::*;

/// Why a row was left out of every period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// `Week of Year` blank or absent
    MissingWeek,
    /// Week 53 straddles the year boundary and has no month
    Week53,
}
