//! Toehold pools and their assignment to toehold domains.
//!
//! Toeholds are interchangeable: any pool member can serve any toehold
//! domain. Each candidate draws its own random assignment.
//!

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use itertools::Itertools;
use ndarray::Array2;
use rand::Rng;
use rand::seq::SliceRandom;
use sr_energy::encode;
use sr_energy::Energetics;

use crate::CandidateDesign;
use crate::DesignError;
use crate::design::domain_base;

/// Read a toehold pool: one sequence per line, blank lines and `#`
/// comments skipped.
pub fn read_pool(path: impl AsRef<Path>) -> Result<Vec<String>, DesignError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| DesignError::io(path, e))?;
    let mut pool = Vec::new();
    for (lnum, line) in text.lines().enumerate() {
        let seq = line.split('#').next().unwrap_or("").trim();
        if seq.is_empty() {
            continue;
        }
        if encode(seq).is_err() {
            return Err(DesignError::malformed(lnum + 1, format!("'{seq}' is not a DNA sequence")));
        }
        pool.push(seq.to_lowercase());
    }
    Ok(pool)
}

/// Keep the pool members whose binding energy lies within `deviation` of
/// the energetics' target.
pub fn filter_pool(pool: &[String], energetics: &dyn Energetics, deviation: f64) -> Result<Vec<String>, DesignError> {
    let Some(first) = pool.first() else {
        return Ok(Vec::new());
    };
    let len = first.len();
    if let Some(bad) = pool.iter().find(|s| s.len() != len) {
        return Err(DesignError::InvalidDesign(format!(
            "toehold pool mixes lengths {len} and {}", bad.len()
        )));
    }
    let codes: Vec<u8> = pool.iter().map(|s| encode(s)).flatten_ok().collect::<Result<_, _>>()?;
    let seqs = Array2::from_shape_vec((pool.len(), len), codes)
        .map_err(|e| DesignError::InvalidDesign(e.to_string()))?;
    let dg = energetics.matching_uniform(seqs.view());
    let target = energetics.target_dg();
    let kept: Vec<String> = pool.iter()
        .zip(dg.iter())
        .filter(|&(_, &e)| (e - target).abs() <= deviation)
        .map(|(s, _)| s.clone())
        .collect();
    log::debug!("{} of {} pool toeholds within {deviation} kcal/mol of target", kept.len(), pool.len());
    Ok(kept)
}

/// Toehold domain name → sequence.
pub type ToeholdAssignment = BTreeMap<String, String>;

/// Randomly assign distinct pool members to the design's toehold domains.
pub fn assign_toeholds<R: Rng + ?Sized>(
    design: &CandidateDesign,
    pool: &[String],
    rng: &mut R,
) -> Result<ToeholdAssignment, DesignError> {
    let names: Vec<&str> = design.toeholds.iter().map(|t| domain_base(t).0).unique().sorted().collect();
    if pool.len() < names.len() {
        return Err(DesignError::InvalidDesign(format!(
            "{} toehold domains but only {} pool sequences", names.len(), pool.len()
        )));
    }
    let mut shuffled = pool.to_vec();
    shuffled.shuffle(rng);
    Ok(names.into_iter().map(str::to_string).zip(shuffled).collect())
}

/// Overwrite the toehold domain sequences of a design.
pub fn apply_toeholds(design: &mut CandidateDesign, assignment: &ToeholdAssignment) -> Result<(), DesignError> {
    for (name, seq) in assignment {
        match design.domains.get_mut(name) {
            Some(slot) => *slot = seq.clone(),
            None => return Err(DesignError::UnknownDomain(name.clone())),
        }
    }
    Ok(())
}

/// Render the sequence-constraint file for the designer: one line per
/// toehold, annotated with the strands using it.
pub fn toehold_constraints(design: &CandidateDesign, assignment: &ToeholdAssignment) -> String {
    let mut out = String::new();
    for (name, seq) in assignment {
        let users = design.strands.iter()
            .filter(|(_, doms)| doms.iter().any(|d| domain_base(d).0 == name.as_str()))
            .map(|(s, _)| s.as_str())
            .join(", ");
        let _ = writeln!(out, "sequence {name} = {} # species {users}", seq.to_uppercase());
    }
    out
}

pub fn write_toehold_file(
    path: impl AsRef<Path>,
    design: &CandidateDesign,
    assignment: &ToeholdAssignment,
) -> Result<(), DesignError> {
    let path = path.as_ref();
    std::fs::write(path, toehold_constraints(design, assignment)).map_err(|e| DesignError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use sr_energy::EnergeticsKind;
    use sr_energy::MismatchMode;
    use sr_energy::ThermoParams;

    use crate::design::tests::toy_design;

    fn pool() -> Vec<String> {
        ["acgtcat", "ttgcaga", "gcatgca", "cagtacg"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_assignment_is_seeded() {
        let d = toy_design();
        let a1 = assign_toeholds(&d, &pool(), &mut StdRng::seed_from_u64(5)).unwrap();
        let a2 = assign_toeholds(&d, &pool(), &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(a1, a2);
        assert_eq!(a1.keys().collect::<Vec<_>>(), vec!["t1", "t2"]);
        assert_ne!(a1["t1"], a1["t2"]);
        assert!(a1.values().all(|s| pool().contains(s)));
    }

    #[test]
    fn test_assignment_needs_enough_toeholds() {
        let d = toy_design();
        let short = vec!["acgtcat".to_string()];
        assert!(assign_toeholds(&d, &short, &mut StdRng::seed_from_u64(1)).is_err());
    }

    #[test]
    fn test_apply_and_render() {
        let mut d = toy_design();
        let mut a = ToeholdAssignment::new();
        a.insert("t1".into(), "acgtcat".into());
        a.insert("t2".into(), "ttgcaga".into());
        apply_toeholds(&mut d, &a).unwrap();
        assert_eq!(d.domain_sequence("t1").unwrap(), "acgtcat");
        let text = toehold_constraints(&d, &a);
        assert_eq!(text.lines().next().unwrap(), "sequence t1 = ACGTCAT # species G1, S1");
        assert_eq!(text.lines().count(), 2);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toeholds.fixed");
        write_toehold_file(&path, &d, &a).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), text);
    }

    #[test]
    fn test_read_and_filter_pool() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.txt");
        std::fs::write(&path, "# pool\nACGTCAT\n\nttgcaga\n").unwrap();
        let p = read_pool(&path).unwrap();
        assert_eq!(p, vec!["acgtcat", "ttgcaga"]);
        std::fs::write(&path, "acgtn\n").unwrap();
        assert!(matches!(read_pool(&path), Err(DesignError::MalformedInputFile { line: 1, .. })));

        let params = Arc::new(ThermoParams::bundled().unwrap());
        let e = EnergeticsKind::Cardelli.build(params, MismatchMode::Max, 7.7);
        assert_eq!(filter_pool(&pool(), &e, 100.0).unwrap(), pool());
        assert!(filter_pool(&pool(), &e, 0.0).unwrap().len() <= pool().len());
        let mixed = vec!["acgt".to_string(), "acgtc".to_string()];
        assert!(filter_pool(&mixed, &e, 1.0).is_err());
    }
}
