//! A [`FoldingOracle`] backed by the NUPACK 3 command line tools.
//!
//! Every query runs in its own temporary directory:
//!  - `complexes` + `concentrations` for equilibrium concentrations
//!    (`<prefix>.eq`) and pair probabilities (`<prefix>.fpairs`),
//!  - `defect -multi` for ensemble defects.
//!

use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;

use itertools::Itertools;
use tempfile::TempDir;

use crate::DesignError;
use crate::FoldingOracle;
use crate::OracleParams;

const PREFIX: &str = "job";

/// Concentration cutoff handed to `concentrations`.
const CUTOFF: &str = "0.000001";

#[derive(Debug, Clone)]
pub struct NupackOracle {
    params: OracleParams,
}

/// One line of an `.eq` file.
#[derive(Debug, Clone, PartialEq)]
pub struct EqEntry {
    /// Copies of each input strand in the complex.
    pub composition: Vec<usize>,
    pub permutation: usize,
    pub concentration: f64,
}

impl EqEntry {
    pub fn size(&self) -> usize {
        self.composition.iter().sum()
    }
}

impl NupackOracle {
    pub fn new(params: OracleParams) -> Self {
        Self { params }
    }

    fn executable(&self, tool: &str) -> PathBuf {
        match &self.params.bin_dir {
            Some(dir) => dir.join(tool),
            None => PathBuf::from(tool),
        }
    }

    fn run(&self, tool: &str, args: &[String], dir: &Path) -> Result<String, DesignError> {
        let exe = self.executable(tool);
        log::trace!("Running {} {}", exe.display(), args.join(" "));
        let output = Command::new(&exe)
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => DesignError::tool(tool, format!("executable {} not found", exe.display())),
                _ => DesignError::tool(tool, e.to_string()),
            })?;
        if !output.status.success() {
            return Err(DesignError::tool(tool, format!(
                "exit status {:?}: {}", output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn workdir() -> Result<TempDir, DesignError> {
        tempfile::Builder::new()
            .prefix("strandrank-nupack")
            .tempdir()
            .map_err(|e| DesignError::tool("complexes", format!("cannot create work directory: {e}")))
    }

    fn write(dir: &Path, ext: &str, content: String) -> Result<(), DesignError> {
        let path = dir.join(format!("{PREFIX}.{ext}"));
        std::fs::write(&path, content).map_err(|e| DesignError::io(path, e))
    }

    fn read(dir: &Path, ext: &str, tool: &str) -> Result<String, DesignError> {
        let path = dir.join(format!("{PREFIX}.{ext}"));
        std::fs::read_to_string(&path)
            .map_err(|e| DesignError::tool(tool, format!("no output {}: {e}", path.display())))
    }

    /// Run `complexes` and `concentrations` on `strands` with complexes of
    /// up to `max_size` strands.
    fn equilibrium(&self, strands: &[&str], max_size: usize, dir: &Path) -> Result<(), DesignError> {
        let p = &self.params;
        let mut input = format!("{}\n", strands.len());
        for s in strands {
            input.push_str(s);
            input.push('\n');
        }
        input.push_str(&max_size.to_string());
        Self::write(dir, "in", input)?;
        Self::write(dir, "con", format!("{}\n", p.strand_concentration).repeat(strands.len()))?;

        let args = [
            "-T".to_string(), format!("{:.1}", p.temperature),
            "-material".to_string(), p.material.as_str().to_string(),
            "-ordered".to_string(), "-pairs".to_string(), "-mfe".to_string(),
            "-dangles".to_string(), "some".to_string(),
            "-sodium".to_string(), p.sodium.to_string(),
            "-magnesium".to_string(), p.magnesium.to_string(),
            PREFIX.to_string(),
        ];
        self.run("complexes", &args, dir)?;
        let args = ["-ordered", "-pairs", "-cutoff", CUTOFF, "-sort", "0", "-quiet", PREFIX]
            .map(str::to_string);
        self.run("concentrations", &args, dir)?;
        Ok(())
    }
}

/// Data lines of a NUPACK output file: `%` comment lines dropped.
fn data_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().filter(|l| !l.starts_with('%') && !l.trim().is_empty())
}

/// Parse an ordered `.eq` file for `nstrands` input strands. Columns:
/// complex id, permutation id, one count per strand, free energy,
/// concentration.
pub fn parse_eq(text: &str, nstrands: usize) -> Result<Vec<EqEntry>, DesignError> {
    data_lines(text)
        .map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != nstrands + 4 {
                return Err(DesignError::tool("concentrations", format!("unexpected .eq line '{line}'")));
            }
            let num = |s: &str| {
                s.parse::<usize>()
                    .map_err(|_| DesignError::tool("concentrations", format!("bad field '{s}' in .eq")))
            };
            let composition = fields[2..2 + nstrands].iter().map(|&s| num(s)).collect::<Result<_, _>>()?;
            let concentration = fields[nstrands + 3].parse::<f64>().map_err(|_| {
                DesignError::tool("concentrations", format!("bad concentration in '{line}'"))
            })?;
            Ok(EqEntry { composition, permutation: num(fields[1])?, concentration })
        })
        .collect()
}

/// Parse an `.fpairs` file into unpaired probabilities for a strand of
/// length `len`. Pairs `(i, len + 1)` carry the probability that base `i`
/// (1-based) is unpaired.
///
/// `concentrations` only lists probabilities above its cutoff, so a base
/// without an unpaired line is taken as unpaired with probability 0 and
/// still takes part in minima and means over the strand.
pub fn parse_fpairs(text: &str, len: usize) -> Result<Vec<f64>, DesignError> {
    let bad = |line: &str| DesignError::tool("concentrations", format!("unexpected .fpairs line '{line}'"));
    let mut unpaired = vec![0.0; len];
    // The first data line holds the number of bases.
    for line in data_lines(text).skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let &[i, j, p] = fields.as_slice() else {
            return Err(bad(line));
        };
        let i: usize = i.parse().map_err(|_| bad(line))?;
        let j: usize = j.parse().map_err(|_| bad(line))?;
        let p: f64 = p.parse().map_err(|_| bad(line))?;
        if j == len + 1 {
            if i == 0 || i > len {
                return Err(bad(line));
            }
            unpaired[i - 1] = p;
        }
    }
    Ok(unpaired)
}

/// The first data line of `defect` output.
pub fn parse_defect(text: &str) -> Result<f64, DesignError> {
    let line = data_lines(text)
        .next()
        .ok_or_else(|| DesignError::tool("defect", "empty output"))?;
    line.trim()
        .parse()
        .map_err(|_| DesignError::tool("defect", format!("cannot read defect from '{line}'")))
}

impl FoldingOracle for NupackOracle {
    fn params(&self) -> &OracleParams {
        &self.params
    }

    fn complex_concentration(&self, strands: &[String]) -> Result<f64, DesignError> {
        let dir = Self::workdir()?;
        let seqs = strands.iter().map(String::as_str).collect_vec();
        self.equilibrium(&seqs, strands.len().max(self.params.max_complex_size), dir.path())?;
        let entries = parse_eq(&Self::read(dir.path(), "eq", "concentrations")?, strands.len())?;
        Ok(entries.iter()
            .find(|e| e.permutation == 1 && e.composition.iter().all(|&c| c == 1))
            .map_or(0.0, |e| e.concentration))
    }

    fn interaction_concentration(&self, a: &str, b: &str) -> Result<f64, DesignError> {
        let dir = Self::workdir()?;
        self.equilibrium(&[a, b], self.params.max_complex_size, dir.path())?;
        let entries = parse_eq(&Self::read(dir.path(), "eq", "concentrations")?, 2)?;
        Ok(entries.iter().filter(|e| e.size() > 1).map(|e| e.concentration).sum())
    }

    fn ensemble_defect(&self, strands: &[String], structure: &str) -> Result<f64, DesignError> {
        let dir = Self::workdir()?;
        let p = &self.params;
        let order = (1..=strands.len()).join(" ");
        let input = format!("{}\n{}\n{order}\n{structure}\n", strands.len(), strands.join("\n"));
        Self::write(dir.path(), "in", input)?;
        let args = [
            "-T".to_string(), format!("{:.1}", p.temperature),
            "-material".to_string(), p.material.as_str().to_string(),
            "-dangles".to_string(), "some".to_string(),
            "-multi".to_string(),
            PREFIX.to_string(),
        ];
        let out = self.run("defect", &args, dir.path())?;
        parse_defect(&out)
    }

    fn unpaired_probabilities(&self, strand: &str) -> Result<Vec<f64>, DesignError> {
        let dir = Self::workdir()?;
        self.equilibrium(&[strand], 1, dir.path())?;
        parse_fpairs(&Self::read(dir.path(), "fpairs", "concentrations")?, strand.len())
    }
}
