use std::path::PathBuf;
use thiserror::Error;

use sr_energy::EnergyError;

/// Errors raised at the design boundary.
#[derive(Debug, Error)]
pub enum DesignError {
    /// Reaction network or record syntax that cannot be interpreted.
    #[error("malformed input (line {line}): {msg}")]
    MalformedInputFile {
        line: usize,
        msg: String,
    },

    /// The folding tool did not produce the expected result.
    #[error("external tool '{tool}' failed: {msg}")]
    ExternalToolFailure {
        tool: String,
        msg: String,
    },

    #[error("unknown domain '{0}'")]
    UnknownDomain(String),

    #[error("unknown strand '{0}'")]
    UnknownStrand(String),

    #[error("unknown complex '{0}'")]
    UnknownComplex(String),

    /// A candidate record that is well-formed JSON but inconsistent.
    #[error("invalid design: {0}")]
    InvalidDesign(String),

    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse design record: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Energy(#[from] EnergyError),
}

impl DesignError {
    pub(crate) fn malformed(line: usize, msg: impl Into<String>) -> Self {
        DesignError::MalformedInputFile { line, msg: msg.into() }
    }

    pub(crate) fn tool(tool: &str, msg: impl Into<String>) -> Self {
        DesignError::ExternalToolFailure { tool: tool.to_string(), msg: msg.into() }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DesignError::Io { path: path.into(), source }
    }
}
