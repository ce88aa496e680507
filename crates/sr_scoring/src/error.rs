use std::path::PathBuf;
use thiserror::Error;

use sr_design::DesignError;
use sr_energy::EnergyError;

#[derive(Debug, Error)]
pub enum ScoringError {
    /// A score row whose metric names differ from the matrix header.
    #[error("score row for candidate {index} does not match the metric list: {msg}")]
    MismatchedRow {
        index: usize,
        msg: String,
    },

    #[error("malformed score table: {0}")]
    MalformedScores(String),

    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("cannot build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Design(#[from] DesignError),

    #[error(transparent)]
    Energy(#[from] EnergyError),
}

impl ScoringError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScoringError::Io { path: path.into(), source }
    }
}
