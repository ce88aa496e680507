//! Nearest-neighbor parameter tables.
//!
//! Two tables are read from comma-separated files holding free energies
//! in kcal/mol at 37°C:
//!
//!  - `stacking_dg.csv`: 16×16 stacking energies. The row is the top
//!    strand dinucleotide (5'→3'), the column the bottom strand
//!    dinucleotide read 3'→5', both as stacking indices `4*a + b`.
//!  - `dangle_dg.csv`: 2×16 single-nucleotide overhang energies. Row 0
//!    holds 5' dangles, row 1 holds 3' dangles; the column is
//!    `4*dangle + paired`.
//!
//! Values are stored negated, so stable interactions are positive.
//!

use std::path::Path;

use csv::ReaderBuilder;
use csv::Trim;
use ndarray::Array1;
use ndarray::Array2;

use crate::sequence::complement_stack;
use crate::sequence::N_STACKS;
use crate::EnergyError;

pub const STACKING_FILE: &str = "stacking_dg.csv";
pub const DANGLE_FILE: &str = "dangle_dg.csv";

const BUNDLED_STACKING: &str = include_str!("../data/stacking_dg.csv");
const BUNDLED_DANGLE: &str = include_str!("../data/dangle_dg.csv");

/// The code of `c`, used for the fixed dangle base.
const DANGLE_BASE_C: usize = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct ThermoParams {
    stack_full: Array2<f64>,
    stack_matched: Array1<f64>,
    dangle_full: Array2<f64>,
    dangle: Array1<f64>,
    dangle_fixed_c: Array1<f64>,
}

impl ThermoParams {
    /// The tables shipped with this crate.
    pub fn bundled() -> Result<Self, EnergyError> {
        Self::from_csv(BUNDLED_STACKING, BUNDLED_DANGLE)
    }

    /// Load `stacking_dg.csv` and `dangle_dg.csv` from a directory.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, EnergyError> {
        let dir = dir.as_ref();
        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read_to_string(&path).map_err(|source| EnergyError::ParameterIo { path, source })
        };
        let params = Self::from_csv(&read(STACKING_FILE)?, &read(DANGLE_FILE)?)?;
        log::debug!("Loaded energy parameters from {}", dir.display());
        Ok(params)
    }

    pub fn from_csv(stacking: &str, dangle: &str) -> Result<Self, EnergyError> {
        let stack_full = -parse_table(stacking, STACKING_FILE, N_STACKS, N_STACKS)?;
        let dangle_full = -parse_table(dangle, DANGLE_FILE, 2, N_STACKS)?;

        let stack_matched = Array1::from_shape_fn(N_STACKS, |i| stack_full[[i, complement_stack(i)]]);
        // Only 3' dangles matter, flipped from (dangle, paired) to the
        // 5'→3' order (paired, dangle).
        let dangle = Array1::from_shape_fn(N_STACKS, |k| dangle_full[[1, 4 * (k % 4) + k / 4]]);
        let dangle_fixed_c = Array1::from_shape_fn(4, |j| dangle_full[[1, j + 4 * DANGLE_BASE_C]]);

        Ok(Self {
            stack_full,
            stack_matched,
            dangle_full,
            dangle,
            dangle_fixed_c,
        })
    }

    /// The full (negated) 16×16 stacking table.
    pub fn stack_full(&self) -> &Array2<f64> {
        &self.stack_full
    }

    #[inline]
    pub fn stack(&self, top: usize, bottom: usize) -> f64 {
        self.stack_full[[top, bottom]]
    }

    /// Stacking energy of each context paired with its Watson-Crick complement.
    pub fn matched(&self) -> &Array1<f64> {
        &self.stack_matched
    }

    #[inline]
    pub fn matched_at(&self, i: usize) -> f64 {
        self.stack_matched[i]
    }

    pub fn dangle_full(&self) -> &Array2<f64> {
        &self.dangle_full
    }

    /// 3' dangle energies indexed by `4*paired + dangle`.
    pub fn dangle(&self) -> &Array1<f64> {
        &self.dangle
    }

    /// 3' dangle energies for a `c` overhang, indexed by the terminal base.
    pub fn dangle_fixed_c(&self) -> &Array1<f64> {
        &self.dangle_fixed_c
    }
}

fn parse_table(text: &str, name: &str, rows: usize, cols: usize) -> Result<Array2<f64>, EnergyError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut values = Vec::with_capacity(rows * cols);
    let mut nrows = 0;
    for (lnum, record) in reader.records().enumerate() {
        let record = record.map_err(|e| EnergyError::missing(name, e.to_string()))?;
        if record.len() != cols {
            return Err(EnergyError::missing(name, format!(
                "line {} has {} columns, expected {cols}", lnum + 1, record.len()
            )));
        }
        for field in record.iter() {
            let v: f64 = field.parse().map_err(|_| {
                EnergyError::missing(name, format!("line {}: cannot parse '{field}'", lnum + 1))
            })?;
            values.push(v);
        }
        nrows += 1;
    }
    if nrows != rows {
        return Err(EnergyError::missing(name, format!("found {nrows} rows, expected {rows}")));
    }
    Array2::from_shape_vec((rows, cols), values).map_err(|e| EnergyError::missing(name, e.to_string()))
}
