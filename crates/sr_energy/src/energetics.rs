//! Toehold binding energetics.
//!
//! All queries are batched: rows of `seqs` are equal-length sequences, the
//! result holds one free energy (kcal/mol, positive = stable) per row.
//!

use std::str::FromStr;
use std::sync::Arc;

use ndarray::Array1;
use ndarray::ArrayView2;
use ndarray::Axis;
use ndarray::Zip;
use serde::Deserialize;
use serde::Serialize;

use crate::mismatch;
use crate::mismatch::MismatchMode;
use crate::sequence::stack_index;
use crate::EndArray;
use crate::EnergyError;
use crate::ThermoParams;

/// Penalty for the single-stranded tail next to a bound toehold.
pub const TAIL_DG: f64 = 1.3;

/// SantaLucia duplex initiation free energy.
pub const INITIATION_DG: f64 = 1.96;

/// The energy queries the scoring pipeline relies on.
pub trait Energetics: Send + Sync {
    /// The toehold binding energy designs aim for.
    fn target_dg(&self) -> f64;

    /// Toehold binding with a 3' dangle: the 3' flank is excluded.
    fn external_dg3(&self, seqs: ArrayView2<u8>) -> Array1<f64>;

    /// Toehold binding with a 5' dangle: the 5' flank is excluded.
    fn external_dg5(&self, seqs: ArrayView2<u8>) -> Array1<f64>;

    /// Toehold binding stacked on both sides.
    fn internal_dg(&self, seqs: ArrayView2<u8>) -> Array1<f64>;

    /// Worst-case spurious binding energy between two batches of ends.
    fn uniform(&self, a: &EndArray, b: &EndArray) -> Result<Array1<f64>, EnergyError>;

    /// Whichever external context is further from the target.
    fn external_dg(&self, seqs: ArrayView2<u8>) -> Array1<f64> {
        further_from(self.target_dg(), &self.external_dg3(seqs), &self.external_dg5(seqs))
    }

    /// Whichever of the external and internal energies is further from the target.
    fn matching_uniform(&self, seqs: ArrayView2<u8>) -> Array1<f64> {
        further_from(self.target_dg(), &self.external_dg(seqs), &self.internal_dg(seqs))
    }
}

/// Elementwise pick of `first` where it deviates strictly more from
/// `target` than `second`, otherwise `second`.
fn further_from(target: f64, first: &Array1<f64>, second: &Array1<f64>) -> Array1<f64> {
    Zip::from(first).and(second).map_collect(|&x, &y| {
        if (x - target).abs() > (y - target).abs() { x } else { y }
    })
}

/// The available energetics models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergeticsKind {
    /// Stacking sums with tail penalty and no initiation term.
    #[default]
    Cardelli,
    /// As `Cardelli`, plus the duplex initiation penalty.
    Initiated,
}

impl EnergeticsKind {
    pub fn init_dg(&self) -> f64 {
        match self {
            EnergeticsKind::Cardelli => 0.0,
            EnergeticsKind::Initiated => INITIATION_DG,
        }
    }

    pub fn build(self, params: Arc<ThermoParams>, mismatch: MismatchMode, target_dg: f64) -> StackingEnergetics {
        StackingEnergetics {
            params,
            mismatch,
            target_dg,
            tail_dg: TAIL_DG,
            init_dg: self.init_dg(),
        }
    }
}

impl FromStr for EnergeticsKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cardelli" => Ok(EnergeticsKind::Cardelli),
            "initiated" => Ok(EnergeticsKind::Initiated),
            _ => Err(format!("unknown energetics model '{s}'")),
        }
    }
}

/// Nearest-neighbor stacking energetics over a shared parameter set.
#[derive(Debug, Clone)]
pub struct StackingEnergetics {
    params: Arc<ThermoParams>,
    mismatch: MismatchMode,
    target_dg: f64,
    tail_dg: f64,
    init_dg: f64,
}

impl StackingEnergetics {
    pub fn params(&self) -> &ThermoParams {
        &self.params
    }

    pub fn mismatch_mode(&self) -> MismatchMode {
        self.mismatch
    }

    pub fn init_dg(&self) -> f64 {
        self.init_dg
    }

    /// Sum of matched stacks over the columns `from..to` of every row.
    fn stacking_sum(&self, seqs: ArrayView2<u8>, from: usize, to: usize) -> Array1<f64> {
        seqs.map_axis(Axis(1), |row| {
            let to = to.min(row.len());
            (from..to.saturating_sub(1))
                .map(|k| self.params.matched_at(stack_index(row[k], row[k + 1])))
                .sum::<f64>()
                - self.tail_dg
                - self.init_dg
        })
    }
}

impl Energetics for StackingEnergetics {
    fn target_dg(&self) -> f64 {
        self.target_dg
    }

    fn external_dg3(&self, seqs: ArrayView2<u8>) -> Array1<f64> {
        let n = seqs.ncols();
        self.stacking_sum(seqs, 0, n.saturating_sub(1))
    }

    fn external_dg5(&self, seqs: ArrayView2<u8>) -> Array1<f64> {
        self.stacking_sum(seqs, 1, seqs.ncols())
    }

    fn internal_dg(&self, seqs: ArrayView2<u8>) -> Array1<f64> {
        self.stacking_sum(seqs, 0, seqs.ncols())
    }

    fn uniform(&self, a: &EndArray, b: &EndArray) -> Result<Array1<f64>, EnergyError> {
        mismatch::uniform(&self.params, self.mismatch, a, b, self.init_dg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    use crate::sequence::encode;

    fn batch(seqs: &[&str]) -> Array2<u8> {
        let rows: Vec<Vec<u8>> = seqs.iter().map(|s| encode(s).unwrap()).collect();
        Array2::from_shape_fn((rows.len(), rows[0].len()), |(i, j)| rows[i][j])
    }

    fn model(kind: EnergeticsKind) -> StackingEnergetics {
        let params = Arc::new(ThermoParams::bundled().unwrap());
        kind.build(params, MismatchMode::Max, 7.7)
    }

    fn matched_sum(p: &ThermoParams, seq: &str) -> f64 {
        let s = encode(seq).unwrap();
        s.windows(2).map(|w| p.matched_at(stack_index(w[0], w[1]))).sum()
    }

    #[test]
    fn test_stacking_sums() {
        let e = model(EnergeticsKind::Cardelli);
        let p = e.params();
        let seqs = batch(&["acgtacga", "ttgacctg"]);
        for (i, s) in ["acgtacga", "ttgacctg"].iter().enumerate() {
            assert_relative_eq!(e.internal_dg(seqs.view())[i], matched_sum(p, s) - TAIL_DG);
            assert_relative_eq!(e.external_dg3(seqs.view())[i], matched_sum(p, &s[..7]) - TAIL_DG);
            assert_relative_eq!(e.external_dg5(seqs.view())[i], matched_sum(p, &s[1..]) - TAIL_DG);
        }
    }

    #[test]
    fn test_initiation_penalty() {
        let seqs = batch(&["gcgcatgc"]);
        let plain = model(EnergeticsKind::Cardelli).internal_dg(seqs.view())[0];
        let initiated = model(EnergeticsKind::Initiated).internal_dg(seqs.view())[0];
        assert_relative_eq!(plain - initiated, INITIATION_DG);
    }

    #[test]
    fn test_further_from_target() {
        let target = 7.7;
        let first = ndarray::arr1(&[9.0, 7.0, 8.7]);
        let second = ndarray::arr1(&[7.5, 9.9, 6.7]);
        // The tie in the last entry keeps the second value.
        assert_eq!(further_from(target, &first, &second), ndarray::arr1(&[9.0, 9.9, 6.7]));
    }

    #[test]
    fn test_matching_uniform_reports_worst_context() {
        let e = model(EnergeticsKind::Cardelli);
        let seqs = batch(&["gcgcgcgc", "atatatat", "acgttgca"]);
        let ext = e.external_dg(seqs.view());
        let int = e.internal_dg(seqs.view());
        let mu = e.matching_uniform(seqs.view());
        for i in 0..3 {
            let worst = (ext[i] - 7.7).abs().max((int[i] - 7.7).abs());
            assert_relative_eq!((mu[i] - 7.7).abs(), worst);
            let ext_worst = (e.external_dg3(seqs.view())[i] - 7.7).abs()
                .max((e.external_dg5(seqs.view())[i] - 7.7).abs());
            assert_relative_eq!((ext[i] - 7.7).abs(), ext_worst);
        }
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("cardelli".parse::<EnergeticsKind>().unwrap(), EnergeticsKind::Cardelli);
        assert_eq!("initiated".parse::<EnergeticsKind>().unwrap(), EnergeticsKind::Initiated);
        assert!("james".parse::<EnergeticsKind>().is_err());
    }
}
