//! The sr_scoring crate.
//!
//! Scores candidate designs and picks one:
//!  - the metric catalog and its weights,
//!  - the per-candidate metric battery,
//!  - the score matrix and its CSV artifact,
//!  - replicate runs on a worker pool,
//!  - multi-criteria selection and its report.
//!

mod error;
mod matrix;
mod aggregate;
mod runner;

/// Metric names, families, directions and weights.
pub mod metrics;

/// Ranking, normalization and the winner.
pub mod select;

/// Run outcomes and their text report.
pub mod report;

pub use error::*;
pub use matrix::*;
pub use aggregate::*;
pub use runner::*;
pub use report::RunOutcome;
pub use select::SelectionReport;
