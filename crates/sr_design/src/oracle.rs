use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::DesignError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Material {
    #[default]
    Dna,
    Rna,
}

impl Material {
    pub fn as_str(&self) -> &'static str {
        match self {
            Material::Dna => "dna",
            Material::Rna => "rna",
        }
    }
}

/// Folding conditions, fixed when an oracle is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleParams {
    /// Temperature in °C.
    pub temperature: f64,
    pub material: Material,
    /// Largest complex considered for pairwise interaction scores.
    pub max_complex_size: usize,
    /// Initial concentration of every strand (M).
    pub strand_concentration: f64,
    /// Sodium and magnesium concentrations (M).
    pub sodium: f64,
    pub magnesium: f64,
    /// Directory holding the folding executables; `None` means `PATH`.
    pub bin_dir: Option<PathBuf>,
}

impl Default for OracleParams {
    fn default() -> Self {
        Self {
            temperature: 25.0,
            material: Material::Dna,
            max_complex_size: 2,
            strand_concentration: 1e-6,
            sodium: 0.05,
            magnesium: 0.0125,
            bin_dir: None,
        }
    }
}

/// The numeric contract with a secondary-structure folding tool.
///
/// Sequences are passed as plain strings; `+`-joined complexes are given
/// as separate strands.
pub trait FoldingOracle: Send + Sync {
    fn params(&self) -> &OracleParams;

    /// Equilibrium concentration (M) of the complex holding each of
    /// `strands` exactly once.
    fn complex_concentration(&self, strands: &[String]) -> Result<f64, DesignError>;

    /// Total equilibrium concentration (M) of all multi-strand complexes
    /// formed by two strands.
    fn interaction_concentration(&self, a: &str, b: &str) -> Result<f64, DesignError>;

    /// Ensemble defect (in nucleotides) of `strands` with respect to the
    /// target dot-bracket `structure`.
    fn ensemble_defect(&self, strands: &[String], structure: &str) -> Result<f64, DesignError>;

    /// Probability of each nucleotide of `strand` being unpaired.
    fn unpaired_probabilities(&self, strand: &str) -> Result<Vec<f64>, DesignError>;
}
