//! The metric catalog.
//!
//! One ordered list shared by the aggregator (which fills it), the score
//! matrix (which checks it) and the selector (which weights it). The order
//! is what makes candidates comparable.
//!

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Family {
    /// Spurious interactions between strands (oracle).
    CrossStrand,
    /// Long sequence identities that enable spurious branch migration.
    BranchMigration,
    /// Availability of single strands and their toeholds (oracle).
    SingleStrand,
    /// Tube ensemble defect of the target complexes (oracle).
    Defect,
    /// Worst-case toehold mismatch binding (energy model).
    Mismatch,
    /// Spread of toehold binding energies (energy model).
    Toehold,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSpec {
    pub name: &'static str,
    pub family: Family,
    pub larger_is_better: bool,
    /// Unranked metrics are reported but never enter selection.
    pub ranked: bool,
    pub weight: f64,
}

const fn metric(name: &'static str, family: Family, weight: f64) -> MetricSpec {
    MetricSpec { name, family, larger_is_better: false, ranked: true, weight }
}

const fn larger(name: &'static str, family: Family, weight: f64) -> MetricSpec {
    MetricSpec { name, family, larger_is_better: true, ranked: true, weight }
}

const fn unranked(name: &'static str, family: Family) -> MetricSpec {
    MetricSpec { name, family, larger_is_better: false, ranked: false, weight: 0.0 }
}

pub const N_METRICS: usize = 18;

pub const METRICS: [MetricSpec; N_METRICS] = [
    metric("TSI avg", Family::CrossStrand, 5.0),
    metric("TSI max", Family::CrossStrand, 20.0),
    metric("TO avg", Family::CrossStrand, 10.0),
    metric("TO max", Family::CrossStrand, 30.0),
    metric("BM Score", Family::BranchMigration, 2.0),
    metric("Largest Match", Family::BranchMigration, 3.0),
    larger("SSU Min", Family::SingleStrand, 30.0),
    larger("SSU Avg", Family::SingleStrand, 10.0),
    larger("SSTU Min", Family::SingleStrand, 50.0),
    larger("SSTU Avg", Family::SingleStrand, 20.0),
    metric("Max Bad Nt %", Family::Defect, 10.0),
    metric("Mean Bad Nt %", Family::Defect, 5.0),
    metric("Spurious dG max", Family::Mismatch, 6.0),
    metric("Spurious dG avg", Family::Mismatch, 4.0),
    metric("Spurious count", Family::Mismatch, 5.0),
    unranked("Spurious Risk", Family::Mismatch),
    metric("Toehold Avg dG", Family::Toehold, 8.0),
    metric("Toehold dG range", Family::Toehold, 20.0),
];

pub fn metric_names() -> Vec<String> {
    METRICS.iter().map(|m| m.name.to_string()).collect()
}

pub fn lookup(name: &str) -> Option<&'static MetricSpec> {
    METRICS.iter().find(|m| m.name == name)
}

/// Names excluded from selection by default.
pub fn unranked_names() -> Vec<String> {
    METRICS.iter().filter(|m| !m.ranked).map(|m| m.name.to_string()).collect()
}

/// Selection weight of a metric; unknown names weigh nothing.
pub fn weight_of(name: &str) -> f64 {
    lookup(name).map_or(0.0, |m| m.weight)
}

/// Unpaired-probability families are larger-is-better.
pub fn is_larger_better(name: &str) -> bool {
    name.starts_with("SSU") || name.starts_with("SSTU")
}
