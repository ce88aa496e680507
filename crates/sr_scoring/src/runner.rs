//! Replicate evaluation on a worker pool.
//!
//! Candidates are independent: each worker gets its own random state,
//! derived from the run seed and the candidate index, so results do not
//! depend on scheduling. A failing candidate becomes a [`FailureRecord`]
//! and its siblings carry on.
//!

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::Serialize;
use sr_design::CandidateDesign;
use sr_design::toeholds;

use crate::MetricAggregator;
use crate::ScoreMatrix;
use crate::ScoreRow;
use crate::ScoringError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug)]
pub struct RunResults {
    pub matrix: ScoreMatrix,
    pub failures: Vec<FailureRecord>,
}

pub struct ReplicateRunner {
    aggregator: Arc<MetricAggregator>,
    threads: usize,
    seed: u64,
    toehold_pool: Option<Vec<String>>,
}

/// Seed of the random state owned by candidate `index`.
pub fn candidate_seed(seed: u64, index: usize) -> u64 {
    seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(index as u64)
}

impl ReplicateRunner {
    pub fn new(aggregator: Arc<MetricAggregator>, seed: u64) -> Self {
        let threads = std::thread::available_parallelism().map_or(1, |n| n.get());
        Self { aggregator, threads, seed, toehold_pool: None }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Draw a fresh toehold assignment from `pool` for every candidate.
    pub fn with_toehold_pool(mut self, pool: Vec<String>) -> Self {
        self.toehold_pool = Some(pool);
        self
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    fn run_one(&self, index: usize, template: &CandidateDesign) -> Result<ScoreRow, ScoringError> {
        let mut rng = StdRng::seed_from_u64(candidate_seed(self.seed, index));
        let mut design = template.clone();
        if let Some(pool) = &self.toehold_pool {
            let assignment = toeholds::assign_toeholds(&design, pool, &mut rng)?;
            toeholds::apply_toeholds(&mut design, &assignment)?;
            design.validate()?;
        }
        self.aggregator.evaluate(index, &design, &mut rng)
    }

    /// Evaluate `count` candidates; candidate `i` is built from
    /// `designs[i % designs.len()]`.
    pub fn run(&self, designs: &[CandidateDesign], count: usize) -> Result<RunResults, ScoringError> {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(self.threads).build()?;
        log::info!("Scoring {count} candidates on {} threads", self.threads);

        let outcomes: Vec<(usize, Result<ScoreRow, ScoringError>)> = if designs.is_empty() {
            Vec::new()
        } else {
            pool.install(|| {
                (0..count)
                    .into_par_iter()
                    .map(|i| (i, self.run_one(i, &designs[i % designs.len()])))
                    .collect()
            })
        };

        let names = self.aggregator.names();
        let mut matrix = ScoreMatrix::new(names.clone());
        let mut failures = Vec::new();
        for (index, outcome) in outcomes {
            match outcome {
                Ok(row) => matrix.push(&names, row)?,
                Err(e) => {
                    log::warn!("Candidate {index} failed: {e}");
                    failures.push(FailureRecord { index, reason: e.to_string() });
                }
            }
        }
        matrix.finalize();
        log::info!("{} candidates scored, {} failed", matrix.len(), failures.len());
        Ok(RunResults { matrix, failures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sr_design::OracleParams;
    use sr_energy::EnergeticsKind;
    use sr_energy::MismatchMode;
    use sr_energy::ThermoParams;

    use crate::aggregate::tests::aggregator;
    use crate::aggregate::tests::toy_design;
    use crate::aggregate::tests::StubOracle;
    use crate::metrics::N_METRICS;

    fn pool() -> Vec<String> {
        ["acgtcat", "ttgcaga", "gcatgca", "cagtacg", "tgacgta"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_seeds_are_distinct() {
        let seeds: Vec<u64> = (0..100).map(|i| candidate_seed(42, i)).collect();
        let mut dedup = seeds.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), seeds.len());
    }

    #[test]
    fn test_run_is_reproducible_across_thread_counts() {
        let agg = Arc::new(aggregator(true));
        let designs = vec![toy_design()];
        let one = ReplicateRunner::new(agg.clone(), 7).with_threads(1).run(&designs, 6).unwrap();
        let four = ReplicateRunner::new(agg, 7).with_threads(4).run(&designs, 6).unwrap();
        assert_eq!(one.matrix, four.matrix);
        assert_eq!(one.matrix.set_indices(), (0..6).collect::<Vec<_>>());
        assert!(one.failures.is_empty());
        assert_eq!(one.matrix.rows()[0].values.len(), N_METRICS);
    }

    #[test]
    fn test_toehold_assignment_per_candidate() {
        let agg = Arc::new(aggregator(false));
        let runner = ReplicateRunner::new(agg, 3).with_threads(2).with_toehold_pool(pool());
        let results = runner.run(&[toy_design()], 4).unwrap();
        assert_eq!(results.matrix.len(), 4);
    }

    #[test]
    fn test_failures_do_not_stop_siblings() {
        let params = Arc::new(ThermoParams::bundled().unwrap());
        let energetics = Arc::new(EnergeticsKind::Cardelli.build(params, MismatchMode::Max, 7.7));
        let failing = MetricAggregator::new(
            energetics,
            Arc::new(StubOracle { params: OracleParams::default(), fail: true }),
            0.5,
            false,
        );
        let runner = ReplicateRunner::new(Arc::new(failing), 1).with_threads(2);
        let results = runner.run(&[toy_design()], 3).unwrap();
        assert!(results.matrix.is_empty());
        assert_eq!(results.failures.len(), 3);
        assert_eq!(results.failures.iter().map(|f| f.index).collect::<Vec<_>>(), vec![0, 1, 2]);

        // A pool too small for the design fails per candidate as well.
        let runner = ReplicateRunner::new(Arc::new(aggregator(true)), 1)
            .with_toehold_pool(vec!["acgtcat".to_string()]);
        let results = runner.run(&[toy_design()], 2).unwrap();
        assert_eq!(results.failures.len(), 2);
    }
}
