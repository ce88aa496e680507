use serde::Deserialize;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

use sr_design::OracleParams;
use sr_energy::EnergeticsKind;
use sr_energy::MismatchMode;

const DEFAULT_TOEHOLD_LENGTH: usize = 7;
const DEFAULT_TARGET_DG: f64 = 7.7;
const DEFAULT_DEVIATION: f64 = 0.5;
const DEFAULT_SPURIOUS_FRACTION: f64 = 0.4;

/// Settings of one scoring run, loaded from JSON. Every field has a
/// default, so `{}` is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub energetics: EnergeticsKind,
    pub mismatch: MismatchMode,
    /// Toehold length in nucleotides.
    pub toehold_length: usize,
    /// Target toehold binding energy (kcal/mol, positive).
    pub target_dg: f64,
    /// Allowed deviation from the target (kcal/mol).
    pub deviation: f64,
    /// Spurious ceiling as a fraction of the target energy.
    pub spurious_fraction: f64,
    pub candidates: usize,
    pub seed: u64,
    /// Worker threads; `None` uses every available core.
    pub threads: Option<usize>,
    /// Replace metrics with seeded random placeholders.
    pub quick: bool,
    /// Directory with `stacking_dg.csv` and `dangle_dg.csv`; bundled tables otherwise.
    pub params_dir: Option<PathBuf>,
    pub oracle: OracleParams,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            energetics: EnergeticsKind::default(),
            mismatch: MismatchMode::default(),
            toehold_length: DEFAULT_TOEHOLD_LENGTH,
            target_dg: DEFAULT_TARGET_DG,
            deviation: DEFAULT_DEVIATION,
            spurious_fraction: DEFAULT_SPURIOUS_FRACTION,
            candidates: 1,
            seed: 0,
            threads: None,
            quick: false,
            params_dir: None,
            oracle: OracleParams::default(),
        }
    }
}

impl RunConfig {
    /// Load configuration from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let cfg: RunConfig =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid { path: path_buf, source })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let positive = [
            ("target_dg", self.target_dg),
            ("oracle.strand_concentration", self.oracle.strand_concentration),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(invalid(field, "must be greater than zero"));
            }
        }
        if !(self.deviation >= 0.0) {
            return Err(invalid("deviation", "must not be negative"));
        }
        if !(self.spurious_fraction > 0.0 && self.spurious_fraction <= 1.0) {
            return Err(invalid("spurious_fraction", "must lie in (0, 1]"));
        }
        if self.toehold_length < 2 {
            return Err(invalid("toehold_length", "toeholds need at least two nucleotides"));
        }
        if self.candidates == 0 {
            return Err(invalid("candidates", "number of candidates must be greater than zero"));
        }
        if self.threads == Some(0) {
            return Err(invalid("threads", "thread count must be at least 1"));
        }
        if self.oracle.max_complex_size < 2 {
            return Err(invalid("oracle.max_complex_size", "complexes of two strands are required"));
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ValidationError {
    ValidationError::InvalidField {
        field: field.to_string(),
        message: message.to_string(),
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("invalid config {path}: {source}")]
    Invalid {
        #[source]
        source: ValidationError,
        path: PathBuf,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}
