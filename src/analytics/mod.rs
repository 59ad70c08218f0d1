//! Session analytics: statistics over game records and the final summary.

pub mod statistics;
pub mod summary;

pub use statistics::{StatisticsAggregator, StatisticsSnapshot};
pub use summary::SessionSummary;
