//! Input/Output for MD runs
//!
//! Snapshot files for initial and final configurations, logging setup and the
//! summary report.

mod output;
mod snapshot;

pub use output::{setup_logging, write_report};
pub use snapshot::{parse_snapshot, read_snapshot, write_snapshot, Snapshot};
