//! Reaction network text format.
//!
//! One reaction per line, e.g. `2A + B -> C (1.5)`:
//!  - whitespace is insignificant,
//!  - an optional rate constant is enclosed in parentheses (a number or a
//!    fraction `a/b`, default 1),
//!  - numbers may use exponent form (`1e-3`); in a coefficient the
//!    exponent is read greedily, so `2e3X` is `2000 X`, not `2 e3X`,
//!  - exactly one `->` separates reactants from products,
//!  - terms are separated by `+`, each an optional numeric coefficient
//!    followed by a species identifier (`\w+`).
//!
//! Empty lines and `#` comments are ignored.
//!

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use ahash::AHashSet;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::DesignError;

static RATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((.*)\)").expect("valid regex"));
static COEFF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9.]+(?:[eE][-+]?[0-9]+)?(?:/[0-9.]+(?:[eE][-+]?[0-9]+)?)?").expect("valid regex")
});
static SPECIES: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+$").expect("valid regex"));

/// A species with its stoichiometric coefficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub species: String,
    pub coeff: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub reactants: Vec<Term>,
    pub products: Vec<Term>,
    pub rate: f64,
}

impl Reaction {
    /// Net reactant coefficients per species.
    pub fn reactant_stoichiometry(&self) -> BTreeMap<&str, f64> {
        stoichiometry(&self.reactants)
    }

    /// Net product coefficients per species.
    pub fn product_stoichiometry(&self) -> BTreeMap<&str, f64> {
        stoichiometry(&self.products)
    }
}

fn stoichiometry(terms: &[Term]) -> BTreeMap<&str, f64> {
    let mut map = BTreeMap::new();
    for t in terms {
        *map.entry(t.species.as_str()).or_insert(0.0) += t.coeff;
    }
    map
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.coeff == 1.0 {
            write!(f, "{}", self.species)
        } else {
            write!(f, "{}{}", self.coeff, self.species)
        }
    }
}

impl fmt::Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |terms: &[Term]| {
            terms.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(" + ")
        };
        write!(f, "{} -> {} ({})", side(&self.reactants), side(&self.products), self.rate)
    }
}

/// A parsed reaction network. Species are listed in order of first
/// appearance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Crn {
    pub reactions: Vec<Reaction>,
    pub species: Vec<String>,
}

impl Crn {
    pub fn read(path: impl AsRef<Path>) -> Result<Self, DesignError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| DesignError::io(path, e))?;
        let crn = text.parse::<Crn>()?;
        log::debug!(
            "Read {} reactions over {} species from {}",
            crn.reactions.len(), crn.species.len(), path.display()
        );
        Ok(crn)
    }
}

impl std::str::FromStr for Crn {
    type Err = DesignError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut crn = Crn::default();
        let mut seen = AHashSet::new();
        for (lnum, line) in text.lines().enumerate() {
            let line = line.split('#').next().unwrap_or("");
            if line.trim().is_empty() {
                continue;
            }
            let rxn = parse_reaction(line, lnum + 1)?;
            for t in rxn.reactants.iter().chain(&rxn.products) {
                if seen.insert(t.species.clone()) {
                    crn.species.push(t.species.clone());
                }
            }
            crn.reactions.push(rxn);
        }
        Ok(crn)
    }
}

/// Parse a single reaction line; `lnum` is only used in error messages.
pub fn parse_reaction(line: &str, lnum: usize) -> Result<Reaction, DesignError> {
    let mut line: String = line.chars().filter(|c| !c.is_whitespace()).collect();

    let mut rate = 1.0;
    if let Some(caps) = RATE.captures(&line) {
        rate = parse_number(&caps[1])
            .ok_or_else(|| DesignError::malformed(lnum, format!("cannot read rate '{}'", &caps[1])))?;
        let whole = caps[0].to_string();
        line = line.replacen(&whole, "", 1);
    }

    let sides: Vec<&str> = line.split("->").collect();
    if sides.len() != 2 {
        return Err(DesignError::malformed(lnum, "expected exactly one '->' per reaction"));
    }

    Ok(Reaction {
        reactants: parse_side(sides[0], lnum)?,
        products: parse_side(sides[1], lnum)?,
        rate,
    })
}

fn parse_side(side: &str, lnum: usize) -> Result<Vec<Term>, DesignError> {
    let mut terms = Vec::new();
    for token in side.split('+').filter(|t| !t.is_empty()) {
        // A leading numeral belongs to this token only.
        let (coeff, species) = match COEFF.find(token) {
            Some(m) => {
                let coeff = parse_number(m.as_str()).ok_or_else(|| {
                    DesignError::malformed(lnum, format!("improper coefficient '{}'", m.as_str()))
                })?;
                (coeff, &token[m.end()..])
            }
            None => (1.0, token),
        };
        if !SPECIES.is_match(species) {
            return Err(DesignError::malformed(lnum, format!("invalid species in term '{token}'")));
        }
        terms.push(Term { species: species.to_string(), coeff });
    }
    Ok(terms)
}

/// A decimal number (exponent form allowed) or a fraction `a/b`.
fn parse_number(s: &str) -> Option<f64> {
    match s.split_once('/') {
        Some((num, den)) => {
            let (num, den) = (num.parse::<f64>().ok()?, den.parse::<f64>().ok()?);
            (den != 0.0).then_some(num / den)
        }
        None => s.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_reaction_with_coefficients() {
        let rxn = parse_reaction("2A + B -> C (1.5)", 1).unwrap();
        let r = rxn.reactant_stoichiometry();
        assert_eq!(r.len(), 2);
        assert_eq!(r["A"], 2.0);
        assert_eq!(r["B"], 1.0);
        let p = rxn.product_stoichiometry();
        assert_eq!(p.len(), 1);
        assert_eq!(p["C"], 1.0);
        assert_eq!(rxn.rate, 1.5);
    }

    #[test]
    fn test_coefficient_binds_to_one_token() {
        let rxn = parse_reaction("3X + Y + 2Z -> W", 1).unwrap();
        let coeffs: Vec<f64> = rxn.reactants.iter().map(|t| t.coeff).collect();
        assert_eq!(coeffs, vec![3.0, 1.0, 2.0]);
        assert_eq!(rxn.rate, 1.0);
    }

    #[test]
    fn test_fraction_rates_and_coefficients() {
        let rxn = parse_reaction("1/2 A -> B ( 1 / 4 )", 1).unwrap();
        assert_relative_eq!(rxn.reactants[0].coeff, 0.5);
        assert_relative_eq!(rxn.rate, 0.25);
        let rxn = parse_reaction("A -> (3e-2)", 1).unwrap();
        assert!(rxn.products.is_empty());
        assert_eq!(rxn.rate, 0.03);
    }

    #[test]
    fn test_exponent_numbers() {
        let rxn = parse_reaction("2.5e-1A + 1E2B -> C (1e-3)", 1).unwrap();
        assert_relative_eq!(rxn.reactants[0].coeff, 0.25);
        assert_eq!(rxn.reactants[0].species, "A");
        assert_relative_eq!(rxn.reactants[1].coeff, 100.0);
        assert_eq!(rxn.reactants[1].species, "B");
        assert_relative_eq!(rxn.rate, 1e-3);
        // Without exponent digits the letter starts the species.
        let rxn = parse_reaction("2eA -> B", 1).unwrap();
        assert_eq!(rxn.reactants[0].coeff, 2.0);
        assert_eq!(rxn.reactants[0].species, "eA");
    }

    #[test]
    fn test_malformed_reactions() {
        assert!(matches!(
            parse_reaction("A + B => C", 4),
            Err(DesignError::MalformedInputFile { line: 4, .. })
        ));
        assert!(parse_reaction("A -> B -> C", 1).is_err());
        assert!(parse_reaction("1..2A -> B", 1).is_err());
        assert!(parse_reaction("2 -> B", 1).is_err());
        assert!(parse_reaction("A$ -> B", 1).is_err());
        assert!(parse_reaction("A -> B (fast)", 1).is_err());
    }

    #[test]
    fn test_species_in_first_seen_order() {
        let text = "A + B -> 2C (0.5)\n\n# comment\nC + D -> A\n";
        let crn: Crn = text.parse().unwrap();
        assert_eq!(crn.reactions.len(), 2);
        assert_eq!(crn.species, vec!["A", "B", "C", "D"]);
        assert_eq!(crn.reactions[0].to_string(), "A + B -> 2C (0.5)");
    }
}
