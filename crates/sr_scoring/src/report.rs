//! Run outcome and its plain-text report.

use std::fmt::Write as _;

use serde::Serialize;

use crate::metrics;
use crate::select::select;
use crate::select::SelectionReport;
use crate::select::SummaryKind;
use crate::FailureRecord;
use crate::ScoreMatrix;

/// Selection needs more than this many scored candidates.
pub const MIN_SELECTION_ROWS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Not a single candidate was scored.
    NoCandidates { failures: Vec<FailureRecord> },
    /// Too few candidates to rank; raw scores only.
    RawOnly { scores: ScoreMatrix, failures: Vec<FailureRecord> },
    Selected { scores: ScoreMatrix, report: SelectionReport, failures: Vec<FailureRecord> },
}

impl RunOutcome {
    /// Decide what can be reported for a finished run.
    pub fn from_scores(scores: ScoreMatrix, failures: Vec<FailureRecord>) -> Self {
        if scores.is_empty() {
            return RunOutcome::NoCandidates { failures };
        }
        if scores.len() <= MIN_SELECTION_ROWS {
            return RunOutcome::RawOnly { scores, failures };
        }
        match select(&scores, &metrics::unranked_names()) {
            Some(report) => RunOutcome::Selected { scores, report, failures },
            None => RunOutcome::RawOnly { scores, failures },
        }
    }

    pub fn winner(&self) -> Option<usize> {
        match self {
            RunOutcome::Selected { report, .. } => Some(report.winner),
            _ => None,
        }
    }

    pub fn scores(&self) -> Option<&ScoreMatrix> {
        match self {
            RunOutcome::NoCandidates { .. } => None,
            RunOutcome::RawOnly { scores, .. } | RunOutcome::Selected { scores, .. } => Some(scores),
        }
    }

    pub fn failures(&self) -> &[FailureRecord] {
        match self {
            RunOutcome::NoCandidates { failures }
            | RunOutcome::RawOnly { failures, .. }
            | RunOutcome::Selected { failures, .. } => failures,
        }
    }
}

fn header(out: &mut String, names: &[String]) {
    out.push_str("                         ");
    for n in names {
        let short: String = n.chars().take(6).collect();
        let _ = write!(out, "{short:>7}");
    }
    out.push('\n');
}

fn table<T, F>(out: &mut String, title: &str, names: &[String], rows: &[Vec<T>], indices: &[usize], sums: &[f64], cell: F)
where
    F: Fn(&T) -> String,
{
    let _ = writeln!(out, "\n{title}");
    header(out, names);
    for ((row, idx), sum) in rows.iter().zip(indices).zip(sums) {
        let _ = write!(out, "design {idx:>3}: {sum:>9.2} = [");
        for v in row {
            let _ = write!(out, "{:>7}", cell(v));
        }
        out.push_str(" ]\n");
    }
}

fn render_raw(out: &mut String, scores: &ScoreMatrix) {
    let _ = writeln!(out, "Raw scores:");
    header(out, scores.names());
    for row in scores.rows() {
        let _ = write!(out, "design {:>3}:            [", row.index);
        for v in &row.values {
            let _ = write!(out, "{v:>7.3}");
        }
        out.push_str(" ]\n");
    }
}

fn render_selection(out: &mut String, r: &SelectionReport) {
    let rank_sums = &r.summary(SummaryKind::RankSum).values;
    let frac_sums = &r.summary(SummaryKind::FractionSum).values;
    let pct_sums = &r.summary(SummaryKind::PercentSum).values;
    table(out, "Rank array:", &r.names, &r.ranks, &r.set_indices, rank_sums, |v| v.to_string());
    table(out, "Fractional excess array:", &r.names, &r.fractions, &r.set_indices, frac_sums, |v| format!("{v:.2}"));
    table(out, "Percent badness (best to worst) array:", &r.names, &r.percents, &r.set_indices, pct_sums,
        |v| format!("{:.2}", 100.0 * v));

    let shortlist: Vec<usize> = r.shortlist.iter().map(|&i| r.set_indices[i]).collect();
    let _ = writeln!(out, "\nIndices of sequences with best worst rank of {}: {shortlist:?}", r.worst_rank);
    for kind in SummaryKind::ALL {
        let s = r.summary(kind);
        let picked: Vec<String> = r.shortlist.iter().map(|&i| format!("{:.2}", s.values[i])).collect();
        let _ = writeln!(out, "  {:<32} [{}]", format!("{}:", kind.label()), picked.join(", "));
    }
    out.push('\n');
    for kind in SummaryKind::ALL {
        let s = r.summary(kind);
        let _ = writeln!(
            out,
            "Best {:<32} {:>9.2} by [{}]   and the worst: {:>9.2} by [{}]",
            format!("{}:", kind.label()),
            s.values[s.best], r.set_indices[s.best],
            s.values[s.worst], r.set_indices[s.worst],
        );
    }
    let _ = writeln!(out, "\nWinner : {}", r.winner);
}

/// Render an outcome as a human readable report.
pub fn render_text(outcome: &RunOutcome) -> String {
    let mut out = String::new();
    match outcome {
        RunOutcome::NoCandidates { .. } => out.push_str("No candidates completed.\n"),
        RunOutcome::RawOnly { scores, .. } => {
            render_raw(&mut out, scores);
            let _ = writeln!(out, "\nToo few candidates for selection ({}); no winner.", scores.len());
        }
        RunOutcome::Selected { scores, report, .. } => {
            render_raw(&mut out, scores);
            render_selection(&mut out, report);
        }
    }
    let failures = outcome.failures();
    if !failures.is_empty() {
        let _ = writeln!(out, "\nFailed candidates:");
        for f in failures {
            let _ = writeln!(out, "  {}: {}", f.index, f.reason);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScoreRow;

    fn scores(n: usize) -> ScoreMatrix {
        let names = metrics::metric_names();
        let mut m = ScoreMatrix::new(names.clone());
        for i in 0..n {
            let values = (0..metrics::N_METRICS).map(|j| ((i * 7 + j * 3) % 5) as f64).collect();
            m.push(&names, ScoreRow { index: i, values, worst_complex: None }).unwrap();
        }
        m
    }

    #[test]
    fn test_outcome_thresholds() {
        let none = RunOutcome::from_scores(scores(0), vec![FailureRecord { index: 0, reason: "boom".into() }]);
        assert!(matches!(none, RunOutcome::NoCandidates { .. }));
        assert_eq!(none.winner(), None);
        let text = render_text(&none);
        assert!(text.starts_with("No candidates completed."));
        assert!(text.contains("0: boom"));

        for n in [1, 2] {
            let raw = RunOutcome::from_scores(scores(n), vec![]);
            assert!(matches!(raw, RunOutcome::RawOnly { .. }));
            assert_eq!(raw.winner(), None);
            assert!(render_text(&raw).contains("no winner"));
        }

        let sel = RunOutcome::from_scores(scores(4), vec![]);
        let winner = sel.winner().unwrap();
        assert!(winner < 4);
        let text = render_text(&sel);
        assert!(text.contains("Rank array:"));
        assert!(text.contains("Best sum-of-ranks:"));
        assert!(text.ends_with(&format!("Winner : {winner}\n")));
    }

    #[test]
    fn test_two_candidates_report_raw_scores() {
        let names = metrics::metric_names();
        let mut m = ScoreMatrix::new(names.clone());
        for (index, first) in [(0, 2.0), (1, 5.0)] {
            let mut values = vec![1.0; metrics::N_METRICS];
            values[0] = first;
            m.push(&names, ScoreRow { index, values, worst_complex: None }).unwrap();
        }
        // The pair alone would select candidate 0.
        assert_eq!(select(&m, &metrics::unranked_names()).unwrap().winner, 0);

        let outcome = RunOutcome::from_scores(m, vec![]);
        assert!(matches!(outcome, RunOutcome::RawOnly { .. }));
        assert_eq!(outcome.winner(), None);
        let csv = outcome.scores().unwrap().to_csv_string(outcome.winner()).unwrap();
        assert!(csv.ends_with("Winner : None\n"));
    }

    #[test]
    fn test_outcome_serializes() {
        let sel = RunOutcome::from_scores(scores(3), vec![]);
        let json = serde_json::to_value(&sel).unwrap();
        assert_eq!(json["outcome"], "selected");
        assert_eq!(json["report"]["names"].as_array().unwrap().len(), metrics::N_METRICS - 1);
    }
}
