//! The candidate design record handed over by the sequence designer.
//!
//! A record names domains (with sequences), strands (as ordered domain
//! lists, `x*` denoting the complement of `x`) and target complexes, plus
//! the groupings the scoring battery needs.
//!

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use sr_energy::reverse_complement_str;

use crate::DesignError;

/// A target complex: participating strands and the intended structure in
/// dot-bracket notation, strands separated by `+`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexSpec {
    pub strands: Vec<String>,
    pub structure: String,
}

/// A toehold that must not bind any of the `partners`.
///
/// `base` is the strand carrying the toehold complement `toehold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionGroup {
    pub base: String,
    pub toehold: String,
    pub partners: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateDesign {
    pub domains: BTreeMap<String, String>,
    pub strands: BTreeMap<String, Vec<String>>,
    pub complexes: BTreeMap<String, ComplexSpec>,
    pub signal_strands: Vec<String>,
    pub toeholds: Vec<String>,
    pub branch_migration: Vec<String>,
    pub non_interacting: Vec<InteractionGroup>,
}

/// Strip the complement marker from a domain identifier.
pub fn domain_base(name: &str) -> (&str, bool) {
    match name.strip_suffix('*') {
        Some(base) => (base, true),
        None => (name, false),
    }
}

impl CandidateDesign {
    pub fn from_json(text: &str) -> Result<Self, DesignError> {
        let design: CandidateDesign = serde_json::from_str(text)?;
        design.validate()?;
        Ok(design)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, DesignError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| DesignError::io(path, e))?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String, DesignError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that every name resolves and complex structures fit their strands.
    pub fn validate(&self) -> Result<(), DesignError> {
        for (name, seq) in &self.domains {
            if seq.is_empty() {
                return Err(DesignError::InvalidDesign(format!("domain '{name}' is empty")));
            }
            reverse_complement_str(seq)?;
        }
        for strand in self.strands.keys() {
            self.strand_sequence(strand)?;
        }
        for (name, cplx) in &self.complexes {
            let seqs = self.complex_sequences(name)?;
            let parts: Vec<&str> = cplx.structure.split('+').collect();
            let fits = parts.len() == seqs.len()
                && parts.iter().zip(&seqs).all(|(p, s)| p.len() == s.len());
            if !fits {
                return Err(DesignError::InvalidDesign(format!(
                    "structure of complex '{name}' does not match its strands"
                )));
            }
        }
        let strands = self.signal_strands.iter()
            .chain(&self.branch_migration)
            .chain(self.non_interacting.iter().flat_map(|g| std::iter::once(&g.base).chain(&g.partners)));
        for s in strands {
            self.strand_sequence(s)?;
        }
        for th in &self.toeholds {
            self.domain_sequence(th)?;
        }
        for g in &self.non_interacting {
            self.toehold_end(g)?;
        }
        Ok(())
    }

    /// Sequence of a domain, or of its complement for `x*`.
    pub fn domain_sequence(&self, name: &str) -> Result<String, DesignError> {
        let (base, comp) = domain_base(name);
        let seq = self.domains.get(base).ok_or_else(|| DesignError::UnknownDomain(name.to_string()))?;
        if comp {
            Ok(reverse_complement_str(seq)?)
        } else {
            Ok(seq.clone())
        }
    }

    pub fn strand_domains(&self, name: &str) -> Result<&[String], DesignError> {
        self.strands.get(name)
            .map(|v| v.as_slice())
            .ok_or_else(|| DesignError::UnknownStrand(name.to_string()))
    }

    pub fn strand_sequence(&self, name: &str) -> Result<String, DesignError> {
        self.strand_domains(name)?
            .iter()
            .map(|d| self.domain_sequence(d))
            .collect()
    }

    pub fn complex_sequences(&self, name: &str) -> Result<Vec<String>, DesignError> {
        let cplx = self.complexes.get(name).ok_or_else(|| DesignError::UnknownComplex(name.to_string()))?;
        cplx.strands.iter().map(|s| self.strand_sequence(s)).collect()
    }

    /// Whether `domain` (or its complement) is a toehold.
    pub fn is_toehold(&self, domain: &str) -> bool {
        let (base, _) = domain_base(domain);
        self.toeholds.iter().any(|t| domain_base(t).0 == base)
    }

    /// Zero-based nucleotide positions of toehold domains within a strand.
    pub fn toehold_positions(&self, strand: &str) -> Result<Vec<usize>, DesignError> {
        let mut positions = Vec::new();
        let mut offset = 0;
        for d in self.strand_domains(strand)? {
            let len = self.domain_sequence(d)?.len();
            if self.is_toehold(d) {
                positions.extend(offset..offset + len);
            }
            offset += len;
        }
        Ok(positions)
    }

    /// Sequences of all toehold domains, in record order.
    pub fn toehold_sequences(&self) -> Result<Vec<String>, DesignError> {
        self.toeholds.iter().map(|t| self.domain_sequence(t)).collect()
    }

    /// The toehold end of an interaction group: the toehold domain as it
    /// appears in the base strand plus one flanking base, taken from the 3'
    /// side when there is one (`true`), otherwise from the 5' side (`false`).
    pub fn toehold_end(&self, group: &InteractionGroup) -> Result<(String, bool), DesignError> {
        let domains = self.strand_domains(&group.base)?;
        let idx = domains.iter().position(|d| d == &group.toehold).ok_or_else(|| {
            DesignError::InvalidDesign(format!(
                "strand '{}' does not contain domain '{}'", group.base, group.toehold
            ))
        })?;
        let strand = self.strand_sequence(&group.base)?;
        let start: usize = domains[..idx]
            .iter()
            .map(|d| self.domain_sequence(d).map(|s| s.len()))
            .sum::<Result<usize, _>>()?;
        let end = start + self.domain_sequence(&group.toehold)?.len();

        if end < strand.len() {
            Ok((strand[start..=end].to_string(), true))
        } else if start > 0 {
            Ok((strand[start - 1..end].to_string(), false))
        } else {
            Err(DesignError::InvalidDesign(format!(
                "toehold '{}' spans all of strand '{}'", group.toehold, group.base
            )))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A two-gate toy record used across the crate's tests.
    pub fn toy_design() -> CandidateDesign {
        let json = r#"{
            "domains": {
                "t1": "ctacgtc", "t2": "gatgcat",
                "b1": "tcatcgttgcatcagt", "b2": "agtcgacttacgcatg"
            },
            "strands": {
                "S1": ["b1", "t1"],
                "S2": ["b2", "t2"],
                "G1": ["t1*", "b1*"],
                "G2": ["t2*", "b2*"]
            },
            "complexes": {
                "C1": { "strands": ["S1", "G1"], "structure": "(((((((((((((((((((((((+)))))))))))))))))))))))" }
            },
            "signal_strands": ["S1", "S2"],
            "toeholds": ["t1", "t2"],
            "branch_migration": ["S1", "S2"],
            "non_interacting": [
                { "base": "G1", "toehold": "t1*", "partners": ["S2"] },
                { "base": "G2", "toehold": "t2*", "partners": ["S1"] }
            ]
        }"#;
        CandidateDesign::from_json(json).unwrap()
    }

    #[test]
    fn test_sequences() {
        let d = toy_design();
        assert_eq!(d.domain_sequence("t1*").unwrap(), "gacgtag");
        assert_eq!(d.strand_sequence("S1").unwrap(), "tcatcgttgcatcagtctacgtc");
        assert_eq!(d.complex_sequences("C1").unwrap().len(), 2);
        assert!(matches!(d.domain_sequence("t9"), Err(DesignError::UnknownDomain(_))));
        assert!(matches!(d.strand_sequence("X"), Err(DesignError::UnknownStrand(_))));
    }

    #[test]
    fn test_toehold_positions() {
        let d = toy_design();
        assert_eq!(d.toehold_positions("S1").unwrap(), (16..23).collect::<Vec<_>>());
        assert_eq!(d.toehold_positions("G1").unwrap(), (0..7).collect::<Vec<_>>());
        assert!(d.is_toehold("t2*"));
        assert!(!d.is_toehold("b2"));
    }

    #[test]
    fn test_toehold_end() {
        let d = toy_design();
        // t1* is 5' in G1, so the flank is the next base on the 3' side.
        let (end, three_prime) = d.toehold_end(&d.non_interacting[0]).unwrap();
        assert_eq!(end, "gacgtaga");
        assert!(three_prime);

        let mut d = d;
        d.strands.insert("G3".to_string(), vec!["b1*".to_string(), "t1*".to_string()]);
        let g = InteractionGroup { base: "G3".into(), toehold: "t1*".into(), partners: vec![] };
        let (end, three_prime) = d.toehold_end(&g).unwrap();
        assert_eq!(end, "agacgtag");
        assert!(!three_prime);
    }

    #[test]
    fn test_validate_rejects_bad_structures() {
        let mut d = toy_design();
        d.complexes.get_mut("C1").unwrap().structure = "((((+))))".to_string();
        assert!(matches!(d.validate(), Err(DesignError::InvalidDesign(_))));
        let mut d = toy_design();
        d.domains.insert("t1".into(), "acgx".into());
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let d = toy_design();
        let back = CandidateDesign::from_json(&d.to_json().unwrap()).unwrap();
        assert_eq!(d, back);
    }
}
