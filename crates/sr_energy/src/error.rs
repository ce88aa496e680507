use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the energy model and the mismatch scanner.
#[derive(Debug, Error)]
pub enum EnergyError {
    /// A parameter table is absent, has the wrong shape or holds garbage.
    #[error("missing parameter data ({source_name}): {msg}")]
    MissingParameterData {
        source_name: String,
        msg: String,
    },

    /// Could not read a parameter file from disk.
    #[error("cannot read parameter file {path}: {source}")]
    ParameterIo {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Mismatch mode name is not one of `max`, `loop`, `dangle`.
    #[error("mismatch mode '{0}' is not supported")]
    UnsupportedMismatchMode(String),

    /// Two sequence batches that cannot be paired up row by row.
    #[error("incompatible shapes: {0}")]
    IncompatibleShapes(String),

    /// A character outside `acgt` (case-insensitive).
    #[error("invalid nucleotide '{0}'")]
    InvalidNucleotide(char),
}

impl EnergyError {
    pub(crate) fn missing(source_name: &str, msg: impl Into<String>) -> Self {
        EnergyError::MissingParameterData {
            source_name: source_name.to_string(),
            msg: msg.into(),
        }
    }
}
