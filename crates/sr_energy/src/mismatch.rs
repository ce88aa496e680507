//! Worst-case spurious hybridization between sequence ends.
//!
//! Two scans are provided, both evaluated row by row over a pair of
//! [`EndArray`] batches (or a singleton broadcast against a batch):
//!
//!  - [`loop_mismatch`]: slide one end along the other and sum the full
//!    stacking table (mismatches included) over every register shift.
//!  - [`dangle_mismatch`]: count only runs of Watson-Crick matched stacks
//!    across all offsets; a mismatch ends the run.
//!
//! The dangle scan has a reference implementation ([`max_run_sum`], one
//! row at a time) and a column-wise one ([`max_run_sums`]) that updates all
//! rows per column. They perform the same operations in the same order per
//! row and therefore agree exactly.
//!

use std::str::FromStr;

use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::ArrayView2;
use ndarray::Axis;
use ndarray::Zip;
use serde::Deserialize;
use serde::Serialize;

use crate::sequence::complement;
use crate::sequence::stack_index;
use crate::sequence::EndArray;
use crate::sequence::EndType;
use crate::sequence::Pairing;
use crate::EnergyError;
use crate::ThermoParams;

/// How mismatched binding is estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchMode {
    /// Elementwise maximum of loop and dangle estimates.
    #[default]
    Max,
    Loop,
    Dangle,
}

impl FromStr for MismatchMode {
    type Err = EnergyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max" => Ok(MismatchMode::Max),
            "loop" => Ok(MismatchMode::Loop),
            "dangle" => Ok(MismatchMode::Dangle),
            _ => Err(EnergyError::UnsupportedMismatchMode(s.to_string())),
        }
    }
}

/// Mismatch energy according to `mode`, minus the initiation penalty.
pub fn uniform(
    params: &ThermoParams,
    mode: MismatchMode,
    a: &EndArray,
    b: &EndArray,
    init_dg: f64,
) -> Result<Array1<f64>, EnergyError> {
    match mode {
        MismatchMode::Loop => loop_mismatch(params, a, b, init_dg),
        MismatchMode::Dangle => dangle_mismatch_columnwise(params, a, b, init_dg),
        MismatchMode::Max => {
            let lm = loop_mismatch(params, a, b, init_dg)?;
            let dm = dangle_mismatch_columnwise(params, a, b, init_dg)?;
            Ok(Zip::from(&lm).and(&dm).map_collect(|&l, &d| l.max(d)))
        }
    }
}

/// Strongest binding over all register shifts, using the full stacking table.
///
/// For ends of length `n` there are `L = n - 2` stacks that do not involve
/// the flank, and `2L - 1` shifts. The home alignment also gets the two
/// endpoint stacks formed with the flanking bases. Shifts without any
/// favorable overlap score 0.
pub fn loop_mismatch(
    params: &ThermoParams,
    a: &EndArray,
    b: &EndArray,
    init_dg: f64,
) -> Result<Array1<f64>, EnergyError> {
    let pairing = Pairing::new(a, b)?;
    let end_type = a.end_type();
    Ok(Array1::from_shape_fn(pairing.rows, |i| {
        loop_row(params, a.row(pairing.a(i)), b.row(pairing.b(i)), end_type) - init_dg
    }))
}

fn loop_row(params: &ThermoParams, s1: ArrayView1<u8>, s2: ArrayView1<u8>, end_type: EndType) -> f64 {
    let n = s1.len();
    let plen = n - 2;
    let (ps1, ps2, home): (Vec<usize>, Vec<usize>, f64) = match end_type {
        EndType::Td => {
            let ps1 = (0..plen).map(|k| stack_index(s1[k], s1[k + 1])).collect();
            let ps2 = (0..plen).map(|k| stack_index(s2[n - 2 - k], s2[n - 3 - k])).collect();
            let pa1 = stack_index(s1[n - 2], s1[n - 1]);
            let pac1 = stack_index(s2[n - 1], complement(s1[n - 1]));
            let pa2 = stack_index(s2[n - 2], s2[n - 1]);
            let pac2 = stack_index(s1[n - 1], complement(s2[n - 1]));
            (ps1, ps2, params.stack(pa1, pac1) + params.stack(pa2, pac2))
        }
        EndType::Dt => {
            let ps1 = (0..plen).map(|k| stack_index(s1[k + 1], s1[k + 2])).collect();
            let ps2 = (0..plen).map(|k| stack_index(s2[n - 1 - k], s2[n - 2 - k])).collect();
            let pa1 = stack_index(s1[0], s1[1]);
            let pac1 = stack_index(complement(s1[0]), s2[n - 1]);
            let pa2 = stack_index(s2[0], s2[1]);
            let pac2 = stack_index(complement(s2[0]), s1[n - 1]);
            (ps1, ps2, params.stack(pa1, pac1) + params.stack(pa2, pac2))
        }
    };

    let plen = plen as isize;
    let mut best = 0.0_f64;
    for shift in (1 - plen)..plen {
        // The shift moves the second end relative to the first.
        let (o1, o2) = if shift >= 0 { (shift as usize, 0) } else { (0, (-shift) as usize) };
        let width = (plen - shift.abs()) as usize;
        let mut en: f64 = (0..width)
            .map(|k| params.stack(ps1[o1 + k], ps2[o2 + k]))
            .sum();
        if shift == 0 {
            en += home;
        }
        best = best.max(en);
    }
    best
}

/// Width of one dangle profile row for ends with `l` stacks.
pub fn profile_width(l: usize) -> usize {
    l * l + 2 * l - 1
}

/// Per-position matched-stack energies for every offset of each pair.
///
/// Each row concatenates, for offsets `1..l-1` in both directions, the
/// energies of stacks where the first end matches the reverse complement
/// of the second (zero elsewhere), separated by zero gaps, followed by the
/// home alignment extended by one constructed dangle context on each side.
pub fn dangle_profile(params: &ThermoParams, a: &EndArray, b: &EndArray) -> Result<Array2<f64>, EnergyError> {
    let pairing = Pairing::new(a, b)?;
    let l = a.len() - 1;
    let mut m = Array2::zeros((pairing.rows, profile_width(l)));
    for (i, mut out) in m.axis_iter_mut(Axis(0)).enumerate() {
        let s1 = crate::sequence::stacks(a.row(pairing.a(i)));
        let s2 = crate::sequence::stacks(b.row(pairing.b(i)));
        let row = dangle_row(params, &s1, &s2, a.end_type());
        for (o, v) in out.iter_mut().zip(row) {
            *o = v;
        }
    }
    Ok(m)
}

fn dangle_row(params: &ThermoParams, s1: &[usize], s2: &[usize], end_type: EndType) -> Vec<f64> {
    let l = s1.len();
    // Stacks of the reverse complement of the second end.
    let s2r: Vec<usize> = (0..l)
        .map(|k| {
            let v = 15 - s2[l - 1 - k];
            v / 4 + 4 * (v % 4)
        })
        .collect();

    let (s1c, s2rc, s1l, s2rl): (&[usize], &[usize], Vec<usize>, Vec<usize>) = match end_type {
        EndType::Td => {
            let mut s1l = vec![4 * (s2r[0] / 4) + s1[0] / 4];
            s1l.extend_from_slice(s1);
            let mut s2rl = s2r.clone();
            s2rl.push(4 * (s2r[l - 1] % 4) + s1[l - 1] % 4);
            (&s1[..l - 1], &s2r[1..], s1l, s2rl)
        }
        EndType::Dt => {
            let mut s2rl = vec![4 * (s1[0] / 4) + s2r[0] / 4];
            s2rl.extend_from_slice(&s2r);
            let mut s1l = s1.to_vec();
            s1l.push(4 * (s1[l - 1] % 4) + s2r[l - 1] % 4);
            (&s1[1..], &s2r[..l - 1], s1l, s2rl)
        }
    };

    let matched = |x: usize, y: usize| if x == y { params.matched_at(x) } else { 0.0 };
    let mut row = Vec::with_capacity(profile_width(l));
    for o in 1..l.saturating_sub(1) {
        let zn = l - 1 - o;
        row.extend((0..zn).map(|k| matched(s1c[k], s2rc[k + o])));
        row.extend([0.0, 0.0]);
        row.extend((0..zn).map(|k| matched(s2rc[k], s1c[k + o])));
        row.extend([0.0, 0.0]);
    }
    row.extend(s1l.iter().zip(&s2rl).map(|(&x, &y)| matched(x, y)));
    row.resize(profile_width(l), 0.0);
    row
}

/// Largest sum over a run of consecutive non-zero entries.
///
/// A zero entry resets the running sum. This is the reference semantics
/// for the dangle scan.
pub fn max_run_sum(row: ArrayView1<f64>) -> f64 {
    let mut best = 0.0;
    let mut run = 0.0;
    for &y in row {
        if y == 0.0 {
            run = 0.0;
        } else {
            run += y;
            if run > best {
                best = run;
            }
        }
    }
    best
}

/// [`max_run_sum`] for every row, sweeping the matrix column by column.
pub fn max_run_sums(m: ArrayView2<f64>) -> Array1<f64> {
    let mut run = Array1::<f64>::zeros(m.nrows());
    let mut best = Array1::<f64>::zeros(m.nrows());
    for col in m.columns() {
        Zip::from(&mut run).and(&mut best).and(&col).for_each(|r, b, &y| {
            if y == 0.0 {
                *r = 0.0;
            } else {
                *r += y;
                if *r > *b {
                    *b = *r;
                }
            }
        });
    }
    best
}

/// Dangle mismatch energies using the row-by-row reference scan.
pub fn dangle_mismatch(
    params: &ThermoParams,
    a: &EndArray,
    b: &EndArray,
    init_dg: f64,
) -> Result<Array1<f64>, EnergyError> {
    let m = dangle_profile(params, a, b)?;
    Ok(m.rows().into_iter().map(|row| max_run_sum(row) - init_dg).collect())
}

/// Dangle mismatch energies using the column-wise scan.
pub fn dangle_mismatch_columnwise(
    params: &ThermoParams,
    a: &EndArray,
    b: &EndArray,
    init_dg: f64,
) -> Result<Array1<f64>, EnergyError> {
    let m = dangle_profile(params, a, b)?;
    Ok(max_run_sums(m.view()) - init_dg)
}
