//! The per-candidate metric battery.
//!
//! Families are independent of each other and are evaluated in parallel,
//! then concatenated in catalog order.
//!

use std::sync::Arc;

use ahash::AHashSet;
use itertools::Itertools;
use ndarray::Array2;
use rand::Rng;
use sr_design::CandidateDesign;
use sr_design::FoldingOracle;
use sr_energy::encode;
use sr_energy::EndArray;
use sr_energy::EndType;
use sr_energy::Energetics;

use crate::metrics::metric_names;
use crate::metrics::N_METRICS;
use crate::ScoreRow;
use crate::ScoringError;

/// Shared substrings shorter than this do not count as matches.
const MIN_MATCH: usize = 5;

/// Branch migration weights, indexed by `min(match length, 10)`.
const BM_WEIGHTS: [f64; 11] = [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0];

/// Evaluates the full metric battery for candidate designs.
pub struct MetricAggregator {
    energetics: Arc<dyn Energetics>,
    oracle: Arc<dyn FoldingOracle>,
    spurious_fraction: f64,
    quick: bool,
}

/// The defect family: max and mean percent of bad nucleotides, plus the
/// complex responsible for the max.
#[derive(Debug, Clone, PartialEq)]
pub struct DefectScores {
    pub max_bad: f64,
    pub mean_bad: f64,
    pub worst_complex: Option<String>,
}

/// Percent of incorrectly paired nucleotides for one complex in a tube
/// where it should form at `target` concentration.
pub fn bad_nucleotide_percent(defect: f64, conc: f64, target: f64, len: usize, base_pairs: usize) -> f64 {
    let ted = defect * conc.min(target) + len as f64 * (target - conc).max(0.0);
    let denom = target * base_pairs as f64 + ted;
    if denom == 0.0 { 0.0 } else { 100.0 * ted / denom }
}

/// Length of the longest substring (at least [`MIN_MATCH`] long) shared
/// by `s1` and `s2` that is not itself a toehold; 0 if there is none.
pub fn longest_shared_match(s1: &str, s2: &str, toeholds: &[String]) -> usize {
    let siz = s1.len().min(s2.len());
    let toeholds: AHashSet<&str> = toeholds.iter().map(String::as_str).collect();
    let mut best = 0;
    for ll in MIN_MATCH..=siz {
        let windows: AHashSet<&str> = (0..=s1.len() - ll)
            .map(|i| &s1[i..i + ll])
            .filter(|w| !toeholds.contains(w))
            .collect();
        if (0..=s2.len() - ll).any(|j| windows.contains(&s2[j..j + ll])) {
            best = ll;
        }
    }
    best
}

fn mean(v: &[f64]) -> f64 {
    if v.is_empty() { 0.0 } else { v.iter().sum::<f64>() / v.len() as f64 }
}

fn max(v: &[f64]) -> f64 {
    if v.is_empty() { 0.0 } else { v.iter().copied().fold(f64::NEG_INFINITY, f64::max) }
}

fn min(v: &[f64]) -> f64 {
    v.iter().copied().fold(f64::INFINITY, f64::min)
}

fn encode_batch(seqs: &[String]) -> Result<Array2<u8>, ScoringError> {
    let len = seqs.first().map_or(0, |s| s.len());
    let codes: Vec<u8> = seqs.iter().map(|s| encode(s)).flatten_ok().collect::<Result<_, _>>()?;
    if codes.len() != len * seqs.len() {
        return Err(sr_energy::EnergyError::IncompatibleShapes(
            "toehold sequences differ in length".to_string(),
        ).into());
    }
    Ok(Array2::from_shape_vec((seqs.len(), len), codes).map_err(|e| {
        sr_energy::EnergyError::IncompatibleShapes(e.to_string())
    })?)
}

impl MetricAggregator {
    pub fn new(
        energetics: Arc<dyn Energetics>,
        oracle: Arc<dyn FoldingOracle>,
        spurious_fraction: f64,
        quick: bool,
    ) -> Self {
        Self { energetics, oracle, spurious_fraction, quick }
    }

    pub fn names(&self) -> Vec<String> {
        metric_names()
    }

    pub fn spurious_ceiling(&self) -> f64 {
        self.spurious_fraction * self.energetics.target_dg()
    }

    /// Percent of strand capacity bound up in a concentration.
    fn interaction_percent(&self, conc: f64) -> f64 {
        100.0 * conc / (2.0 * self.oracle.params().strand_concentration)
    }

    /// TSI avg, TSI max, TO avg, TO max.
    pub fn cross_strand(&self, design: &CandidateDesign) -> Result<[f64; 4], ScoringError> {
        let seqs: Vec<String> = design.signal_strands.iter()
            .map(|s| design.strand_sequence(s))
            .collect::<Result<_, _>>()?;
        let n = seqs.len();
        let mut pairwise = Array2::<f64>::zeros((n, n));
        for (i, j) in (0..n).tuple_combinations::<(_, _)>().chain((0..n).map(|i| (i, i))) {
            let score = self.interaction_percent(self.oracle.interaction_concentration(&seqs[i], &seqs[j])?);
            pairwise[[i, j]] = score;
            pairwise[[j, i]] = score;
        }
        let tsi = pairwise.sum_axis(ndarray::Axis(0)).to_vec();

        let mut occupation = Vec::with_capacity(design.non_interacting.len());
        for group in &design.non_interacting {
            let base = design.strand_sequence(&group.base)?;
            let mut total = 0.0;
            for partner in &group.partners {
                let seq = design.strand_sequence(partner)?;
                total += self.interaction_percent(self.oracle.interaction_concentration(&base, &seq)?);
            }
            occupation.push(total);
        }
        Ok([mean(&tsi), max(&tsi), mean(&occupation), max(&occupation)])
    }

    /// BM Score, Largest Match.
    pub fn branch_migration(&self, design: &CandidateDesign) -> Result<[f64; 2], ScoringError> {
        let toeholds = design.toehold_sequences()?;
        let seqs: Vec<String> = design.branch_migration.iter()
            .map(|s| design.strand_sequence(s))
            .collect::<Result<_, _>>()?;
        let mut score = 0.0;
        let mut largest = 0;
        for (s1, s2) in seqs.iter().tuple_combinations() {
            let m = longest_shared_match(s1, s2, &toeholds);
            largest = largest.max(m);
            score += BM_WEIGHTS[m.min(10)];
        }
        Ok([score, largest as f64])
    }

    /// SSU Min, SSU Avg, SSTU Min, SSTU Avg.
    pub fn single_strand(&self, design: &CandidateDesign) -> Result<[f64; 4], ScoringError> {
        let mut mins = Vec::new();
        let mut avgs = Vec::new();
        let mut toe_mins = Vec::new();
        let mut toe_avgs = Vec::new();
        for strand in &design.signal_strands {
            let probs = self.oracle.unpaired_probabilities(&design.strand_sequence(strand)?)?;
            let toe: Vec<f64> = design.toehold_positions(strand)?
                .into_iter()
                .filter_map(|i| probs.get(i).copied())
                .collect();
            mins.push(min(&probs).min(1.0));
            avgs.push(mean(&probs));
            toe_mins.push(min(&toe).min(1.0));
            toe_avgs.push(mean(&toe));
        }
        Ok([min(&mins).min(1.0), mean(&avgs), min(&toe_mins).min(1.0), mean(&toe_avgs)])
    }

    pub fn defect(&self, design: &CandidateDesign) -> Result<DefectScores, ScoringError> {
        let target = self.oracle.params().strand_concentration;
        let mut bad = Vec::with_capacity(design.complexes.len());
        for (name, cplx) in &design.complexes {
            let seqs = design.complex_sequences(name)?;
            let conc = self.oracle.complex_concentration(&seqs)?;
            let defect = self.oracle.ensemble_defect(&seqs, &cplx.structure)?;
            let len = seqs.iter().map(|s| s.len()).sum();
            let bp = cplx.structure.chars().filter(|&c| c == '(' || c == ')').count();
            bad.push((name, bad_nucleotide_percent(defect, conc, target, len, bp)));
        }
        let worst = bad.iter().fold(None, |acc: Option<&(&String, f64)>, x| match acc {
            Some(a) if a.1 >= x.1 => Some(a),
            _ => Some(x),
        });
        let values: Vec<f64> = bad.iter().map(|b| b.1).collect();
        Ok(DefectScores {
            max_bad: worst.map_or(0.0, |w| w.1),
            mean_bad: mean(&values),
            worst_complex: worst.map(|w| w.0.clone()),
        })
    }

    /// Spurious dG max, Spurious dG avg, Spurious count, Spurious Risk.
    ///
    /// The toehold end of every interaction group is scanned against every
    /// window of the same length in each partner strand.
    pub fn mismatch(&self, design: &CandidateDesign) -> Result<[f64; 4], ScoringError> {
        let ceiling = self.spurious_ceiling();
        let mut worst = Vec::with_capacity(design.non_interacting.len());
        let mut count = 0usize;
        let mut risk = 0.0;
        for group in &design.non_interacting {
            let (end, three_prime) = design.toehold_end(group)?;
            let end_type = if three_prime { EndType::Td } else { EndType::Dt };
            let base = EndArray::from_strs(&[end.as_str()], end_type)?;
            let n = end.len();
            let mut group_worst: f64 = 0.0;
            for partner in &group.partners {
                let seq = design.strand_sequence(partner)?;
                if seq.len() < n {
                    continue;
                }
                let windows: Vec<&str> = (0..=seq.len() - n).map(|i| &seq[i..i + n]).collect();
                let energies = self.energetics.uniform(&base, &EndArray::from_strs(&windows, end_type)?)?;
                for &e in &energies {
                    group_worst = group_worst.max(e);
                    if e > ceiling {
                        count += 1;
                        risk += e - ceiling;
                    }
                }
            }
            worst.push(group_worst);
        }
        Ok([max(&worst), mean(&worst), count as f64, risk])
    }

    /// Toehold Avg dG (distance of the mean from the target), Toehold dG range.
    pub fn toehold(&self, design: &CandidateDesign) -> Result<[f64; 2], ScoringError> {
        let seqs = design.toehold_sequences()?;
        if seqs.is_empty() {
            return Ok([0.0, 0.0]);
        }
        let dg = self.energetics.matching_uniform(encode_batch(&seqs)?.view()).to_vec();
        let range = max(&dg) - min(&dg);
        Ok([(mean(&dg) - self.energetics.target_dg()).abs(), range])
    }

    /// Run the whole battery for one candidate.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        index: usize,
        design: &CandidateDesign,
        rng: &mut R,
    ) -> Result<ScoreRow, ScoringError> {
        if self.quick {
            let values = (0..N_METRICS).map(|_| rng.random::<f64>()).collect();
            return Ok(ScoreRow { index, values, worst_complex: None });
        }

        let ((cross, single), ((defect, bm), (mm, th))) = rayon::join(
            || rayon::join(|| self.cross_strand(design), || self.single_strand(design)),
            || rayon::join(
                || rayon::join(|| self.defect(design), || self.branch_migration(design)),
                || rayon::join(|| self.mismatch(design), || self.toehold(design)),
            ),
        );
        let (cross, single, defect, bm, mm, th) = (cross?, single?, defect?, bm?, mm?, th?);

        let mut values = Vec::with_capacity(N_METRICS);
        values.extend(cross);
        values.extend(bm);
        values.extend(single);
        values.extend([defect.max_bad, defect.mean_bad]);
        values.extend(mm);
        values.extend(th);
        debug_assert_eq!(values.len(), N_METRICS);
        log::debug!("Candidate {index}: {} metrics, worst complex {:?}", values.len(), defect.worst_complex);
        Ok(ScoreRow { index, values, worst_complex: defect.worst_complex })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use sr_design::DesignError;
    use sr_design::OracleParams;
    use sr_energy::EnergeticsKind;
    use sr_energy::MismatchMode;
    use sr_energy::ThermoParams;

    /// A deterministic oracle: interactions scale with GC content, every
    /// base is half unpaired, complexes form at half the target.
    pub struct StubOracle {
        pub params: OracleParams,
        pub fail: bool,
    }

    impl StubOracle {
        pub fn new() -> Self {
            Self { params: OracleParams::default(), fail: false }
        }
    }

    fn gc(s: &str) -> f64 {
        s.chars().filter(|&c| c == 'g' || c == 'c').count() as f64 / s.len() as f64
    }

    impl FoldingOracle for StubOracle {
        fn params(&self) -> &OracleParams {
            &self.params
        }

        fn complex_concentration(&self, _strands: &[String]) -> Result<f64, DesignError> {
            Ok(0.5e-6)
        }

        fn interaction_concentration(&self, a: &str, b: &str) -> Result<f64, DesignError> {
            if self.fail {
                return Err(DesignError::ExternalToolFailure { tool: "stub".into(), msg: "no".into() });
            }
            Ok(1e-8 * (gc(a) + gc(b)))
        }

        fn ensemble_defect(&self, strands: &[String], _structure: &str) -> Result<f64, DesignError> {
            Ok(strands.len() as f64)
        }

        fn unpaired_probabilities(&self, strand: &str) -> Result<Vec<f64>, DesignError> {
            Ok(vec![0.5; strand.len()])
        }
    }

    pub fn aggregator(quick: bool) -> MetricAggregator {
        let params = Arc::new(ThermoParams::bundled().unwrap());
        let energetics = Arc::new(EnergeticsKind::Cardelli.build(params, MismatchMode::Max, 7.7));
        MetricAggregator::new(energetics, Arc::new(StubOracle::new()), 0.5, quick)
    }

    pub fn toy_design() -> CandidateDesign {
        let json = r#"{
            "domains": { "t1": "ctacgtc", "t2": "gatgcat", "b1": "tcatcgttgcatcagt", "b2": "agtcgacttacgcatg" },
            "strands": {
                "S1": ["b1", "t1"], "S2": ["b2", "t2"],
                "G1": ["t1*", "b1*"], "G2": ["t2*", "b2*"]
            },
            "complexes": {
                "C1": { "strands": ["S1", "G1"], "structure": "(((((((((((((((((((((((+)))))))))))))))))))))))" }
            },
            "signal_strands": ["S1", "S2"],
            "toeholds": ["t1", "t2"],
            "branch_migration": ["S1", "S2", "G1"],
            "non_interacting": [
                { "base": "G1", "toehold": "t1*", "partners": ["S2", "S1"] },
                { "base": "G2", "toehold": "t2*", "partners": ["S1"] }
            ]
        }"#;
        CandidateDesign::from_json(json).unwrap()
    }

    #[test]
    fn test_bad_nucleotide_percent() {
        // Fully formed and perfectly folded.
        assert_eq!(bad_nucleotide_percent(0.0, 1e-6, 1e-6, 20, 20), 0.0);
        // Half formed: the missing half counts every nucleotide as bad.
        let p = bad_nucleotide_percent(2.0, 0.5e-6, 1e-6, 40, 40);
        let ted = 2.0 * 0.5e-6 + 40.0 * 0.5e-6;
        assert_relative_eq!(p, 100.0 * ted / (1e-6 * 40.0 + ted));
        assert_eq!(bad_nucleotide_percent(0.0, 0.0, 0.0, 0, 0), 0.0);
    }

    #[test]
    fn test_longest_shared_match() {
        assert_eq!(longest_shared_match("aaaaccgtacgtt", "ttccgtacgaa", &[]), 7);
        assert_eq!(longest_shared_match("acgt", "acgt", &[]), 0);
        // A toehold-sized identity does not count, its parts still do.
        let th = vec!["ccgtacg".to_string()];
        assert_eq!(longest_shared_match("aaaaccgtacgtt", "ttccgtacgaa", &th), 6);
    }

    #[test]
    fn test_families() {
        let agg = aggregator(false);
        let d = toy_design();

        let [tsi_avg, tsi_max, to_avg, to_max] = agg.cross_strand(&d).unwrap();
        assert!(tsi_max >= tsi_avg && tsi_avg > 0.0);
        assert!(to_max >= to_avg && to_avg > 0.0);

        let [ssu_min, ssu_avg, sstu_min, sstu_avg] = agg.single_strand(&d).unwrap();
        assert_eq!([ssu_min, ssu_avg, sstu_min, sstu_avg], [0.5; 4]);

        let defect = agg.defect(&d).unwrap();
        assert_eq!(defect.worst_complex.as_deref(), Some("C1"));
        assert_relative_eq!(defect.max_bad, bad_nucleotide_percent(2.0, 0.5e-6, 1e-6, 46, 46));
        assert_relative_eq!(defect.mean_bad, defect.max_bad);

        let [bm, largest] = agg.branch_migration(&d).unwrap();
        assert!(bm >= 0.0);
        assert!(largest == 0.0 || largest >= MIN_MATCH as f64);

        let th = agg.toehold(&d).unwrap();
        assert!(th[0] >= 0.0 && th[1] >= 0.0);
    }

    #[test]
    fn test_mismatch_sees_the_toehold() {
        let agg = aggregator(false);
        let d = toy_design();
        let [worst, avg, count, risk] = agg.mismatch(&d).unwrap();
        // G1's toehold end against the last window of S1, which holds t1
        // one position off the home alignment.
        let end = d.toehold_end(&d.non_interacting[0]).unwrap().0;
        let window = agg.energetics.uniform(
            &EndArray::from_strs(&[end.as_str()], EndType::Td).unwrap(),
            &EndArray::from_strs(&["tctacgtc"], EndType::Td).unwrap(),
        ).unwrap()[0];
        assert!(window > agg.spurious_ceiling());
        assert!(worst >= window);
        assert!(worst >= avg);
        assert!(count >= 1.0);
        assert!(risk >= window - agg.spurious_ceiling());
    }

    #[test]
    fn test_evaluate_shape_and_quick_mode() {
        let d = toy_design();
        let full = aggregator(false).evaluate(3, &d, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(full.index, 3);
        assert_eq!(full.values.len(), N_METRICS);

        let quick = aggregator(true);
        let a = quick.evaluate(3, &d, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = quick.evaluate(3, &d, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(a.values.len(), N_METRICS);
        assert_eq!(a, b);
        assert_eq!(quick.names(), metric_names());
    }

    #[test]
    fn test_oracle_failure_propagates() {
        let params = Arc::new(ThermoParams::bundled().unwrap());
        let energetics = Arc::new(EnergeticsKind::Cardelli.build(params, MismatchMode::Max, 7.7));
        let oracle = StubOracle { params: OracleParams::default(), fail: true };
        let agg = MetricAggregator::new(energetics, Arc::new(oracle), 0.5, false);
        assert!(matches!(
            agg.evaluate(0, &toy_design(), &mut StdRng::seed_from_u64(1)),
            Err(ScoringError::Design(DesignError::ExternalToolFailure { .. }))
        ));
    }
}
