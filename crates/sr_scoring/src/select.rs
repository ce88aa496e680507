//! Multi-criteria candidate selection.
//!
//! Every ranked metric column is turned into three relative scores per
//! candidate: a dense rank, the fractional excess over the column minimum,
//! and the percent badness between column minimum and maximum. Six
//! summaries are derived from those; the winner is the candidate with the
//! smallest unweighted rank sum. The other summaries are reported for
//! inspection only.
//!

use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::Axis;
use serde::Serialize;

use crate::metrics;
use crate::ScoreMatrix;

/// Dense rank, 0-based: the smallest distinct value gets rank 0 and equal
/// values share a rank.
pub fn dense_rank(col: ArrayView1<f64>) -> Array1<usize> {
    // Adding 0.0 turns -0.0 into 0.0, so both share a rank.
    let col = col.mapv(|v| v + 0.0);
    let mut distinct: Vec<f64> = col.to_vec();
    distinct.sort_by(|a, b| a.total_cmp(b));
    distinct.dedup_by(|a, b| a.total_cmp(b).is_eq());
    col.mapv(|v| distinct.partition_point(|d| d.total_cmp(&v).is_lt()))
}

fn column_min_max(col: ArrayView1<f64>) -> (f64, f64) {
    col.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// `(v - min) / |min|`, dividing by 1 when the minimum is 0.
pub fn fractional_excess(col: ArrayView1<f64>) -> Array1<f64> {
    let (min, _) = column_min_max(col);
    let denom = if min == 0.0 { 1.0 } else { min.abs() };
    col.mapv(|v| (v - min) / denom)
}

/// `(v - min) / (max - min)`; a constant column scores 0 everywhere.
pub fn percent_badness(col: ArrayView1<f64>) -> Array1<f64> {
    let (min, max) = column_min_max(col);
    if max == min {
        return Array1::zeros(col.len());
    }
    col.mapv(|v| (v - min) / (max - min))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SummaryKind {
    RankSum,
    WeightedRankSum,
    FractionSum,
    WeightedFractionSum,
    PercentSum,
    WeightedPercentSum,
}

impl SummaryKind {
    pub const ALL: [SummaryKind; 6] = [
        SummaryKind::RankSum,
        SummaryKind::WeightedRankSum,
        SummaryKind::FractionSum,
        SummaryKind::WeightedFractionSum,
        SummaryKind::PercentSum,
        SummaryKind::WeightedPercentSum,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SummaryKind::RankSum => "sum-of-ranks",
            SummaryKind::WeightedRankSum => "sum-of-weighted-ranks",
            SummaryKind::FractionSum => "fractional excess sum",
            SummaryKind::WeightedFractionSum => "weighted fractional excess sum",
            SummaryKind::PercentSum => "percent badness sum",
            SummaryKind::WeightedPercentSum => "weighted percent badness sum",
        }
    }
}

/// One per-candidate summary with its best (smallest) and worst row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub kind: SummaryKind,
    pub values: Vec<f64>,
    pub best: usize,
    pub worst: usize,
}

impl Summary {
    fn new(kind: SummaryKind, values: Vec<f64>) -> Self {
        // First index wins ties in both directions.
        let mut best = 0;
        let mut worst = 0;
        for (i, &v) in values.iter().enumerate() {
            if v < values[best] {
                best = i;
            }
            if v > values[worst] {
                worst = i;
            }
        }
        Self { kind, values, best, worst }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionReport {
    /// Ranked metric names, in matrix order.
    pub names: Vec<String>,
    pub weights: Vec<f64>,
    /// Candidate index of every row.
    pub set_indices: Vec<usize>,
    /// Raw values of the ranked metrics (before sign normalization).
    pub raw: Vec<Vec<f64>>,
    pub ranks: Vec<Vec<usize>>,
    pub fractions: Vec<Vec<f64>>,
    pub percents: Vec<Vec<f64>>,
    /// Smallest worst-rank any candidate achieves.
    pub worst_rank: usize,
    /// Rows whose worst rank equals `worst_rank`.
    pub shortlist: Vec<usize>,
    pub summaries: Vec<Summary>,
    /// Row of the winner.
    pub winner_row: usize,
    /// Candidate index of the winner.
    pub winner: usize,
}

impl SelectionReport {
    pub fn summary(&self, kind: SummaryKind) -> &Summary {
        &self.summaries[SummaryKind::ALL.iter().position(|&k| k == kind).unwrap_or(0)]
    }
}

/// Rank the candidates of a non-empty matrix.
///
/// Columns named in `exclude` do not take part. Returns `None` for an
/// empty matrix or when nothing is left to rank.
pub fn select(matrix: &ScoreMatrix, exclude: &[String]) -> Option<SelectionReport> {
    if matrix.is_empty() {
        return None;
    }
    let cols: Vec<usize> = (0..matrix.names().len())
        .filter(|&j| !exclude.contains(&matrix.names()[j]))
        .collect();
    if cols.is_empty() {
        return None;
    }
    let names: Vec<String> = cols.iter().map(|&j| matrix.names()[j].clone()).collect();
    let weights = Array1::from_iter(names.iter().map(|n| metrics::weight_of(n)));

    let all = matrix.values();
    let raw = all.select(Axis(1), &cols);
    let mut normalized = raw.clone();
    for (mut col, name) in normalized.columns_mut().into_iter().zip(&names) {
        if metrics::is_larger_better(name) {
            col.mapv_inplace(|v| -v);
        }
    }

    let (n, m) = normalized.dim();
    let mut ranks = Array2::<usize>::zeros((n, m));
    let mut fractions = Array2::<f64>::zeros((n, m));
    let mut percents = Array2::<f64>::zeros((n, m));
    for (j, col) in normalized.columns().into_iter().enumerate() {
        ranks.column_mut(j).assign(&dense_rank(col));
        fractions.column_mut(j).assign(&fractional_excess(col));
        percents.column_mut(j).assign(&percent_badness(col));
    }

    let row_worst: Vec<usize> = ranks.rows().into_iter()
        .map(|r| r.iter().copied().max().unwrap_or(0))
        .collect();
    let worst_rank = row_worst.iter().copied().min().unwrap_or(0);
    let shortlist: Vec<usize> = (0..n).filter(|&i| row_worst[i] <= worst_rank).collect();

    let franks = ranks.mapv(|r| r as f64);
    let sums = |a: &Array2<f64>, scale: f64| -> Vec<f64> {
        a.sum_axis(Axis(1)).mapv(|s| s * scale).to_vec()
    };
    let weighted = |a: &Array2<f64>, scale: f64| -> Vec<f64> {
        a.dot(&weights).mapv(|s| s * scale).to_vec()
    };
    let summaries = vec![
        Summary::new(SummaryKind::RankSum, sums(&franks, 1.0)),
        Summary::new(SummaryKind::WeightedRankSum, weighted(&franks, 0.01)),
        Summary::new(SummaryKind::FractionSum, sums(&fractions, 1.0)),
        Summary::new(SummaryKind::WeightedFractionSum, weighted(&fractions, 0.01)),
        Summary::new(SummaryKind::PercentSum, sums(&percents, 100.0)),
        Summary::new(SummaryKind::WeightedPercentSum, weighted(&percents, 1.0)),
    ];

    let winner_row = summaries[0].best;
    let set_indices = matrix.set_indices();
    let winner = set_indices[winner_row];
    log::debug!("Selected candidate {winner} (worst rank {worst_rank}, shortlist {shortlist:?})");

    let to_rows = |a: &Array2<f64>| a.rows().into_iter().map(|r| r.to_vec()).collect::<Vec<_>>();
    Some(SelectionReport {
        names,
        weights: weights.to_vec(),
        set_indices,
        raw: to_rows(&raw),
        ranks: ranks.rows().into_iter().map(|r| r.to_vec()).collect(),
        fractions: to_rows(&fractions),
        percents: to_rows(&percents),
        worst_rank,
        shortlist,
        summaries,
        winner_row,
        winner,
    })
}
