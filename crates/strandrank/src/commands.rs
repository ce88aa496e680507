//! The work behind each subcommand. Printing is left to `main`.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use anyhow::bail;
use rand::SeedableRng;
use rand::rngs::StdRng;
use sr_design::CandidateDesign;
use sr_design::Crn;
use sr_design::NupackOracle;
use sr_design::toeholds;
use sr_design::toeholds::ToeholdAssignment;
use sr_energy::Energetics;
use sr_energy::StackingEnergetics;
use sr_energy::ThermoParams;
use sr_scoring::MetricAggregator;
use sr_scoring::ReplicateRunner;
use sr_scoring::RunOutcome;
use sr_scoring::ScoreMatrix;
use sr_scoring::metrics;
use sr_scoring::report::render_text;

use crate::config::RunConfig;

pub const SCORES_FILE: &str = "scores.csv";
pub const REPORT_FILE: &str = "report.txt";
pub const JSON_FILE: &str = "report.json";

/// Paths of the artifacts written by a run.
#[derive(Debug)]
pub struct Artifacts {
    pub scores: PathBuf,
    pub report: PathBuf,
    pub json: Option<PathBuf>,
}

pub fn energetics(cfg: &RunConfig) -> anyhow::Result<Arc<StackingEnergetics>> {
    let params = match &cfg.params_dir {
        Some(dir) => ThermoParams::from_dir(dir)
            .with_context(|| format!("loading parameter tables from {}", dir.display()))?,
        None => ThermoParams::bundled().context("loading bundled parameter tables")?,
    };
    Ok(Arc::new(cfg.energetics.build(Arc::new(params), cfg.mismatch, cfg.target_dg)))
}

/// Read a toehold pool and keep the members of the configured length whose
/// binding energy is close enough to the target.
pub fn toehold_pool(cfg: &RunConfig, path: &Path, energetics: &dyn Energetics) -> anyhow::Result<Vec<String>> {
    let pool = toeholds::read_pool(path)
        .with_context(|| format!("reading toehold pool {}", path.display()))?;
    let total = pool.len();
    let sized: Vec<String> = pool.into_iter().filter(|s| s.len() == cfg.toehold_length).collect();
    if sized.len() < total {
        log::warn!("Dropped {} pool sequences not of length {}", total - sized.len(), cfg.toehold_length);
    }
    let kept = toeholds::filter_pool(&sized, energetics, cfg.deviation)?;
    log::info!("Toehold pool: {} of {total} sequences usable", kept.len());
    if kept.is_empty() {
        bail!("no toehold in {} is within {} kcal/mol of {}", path.display(), cfg.deviation, cfg.target_dg);
    }
    Ok(kept)
}

fn read_designs(paths: &[PathBuf]) -> anyhow::Result<Vec<CandidateDesign>> {
    paths.iter()
        .map(|p| CandidateDesign::read(p).with_context(|| format!("reading design {}", p.display())))
        .collect()
}

/// Evaluate candidates, select a winner and write the artifacts to `out`.
pub fn score(
    cfg: &RunConfig,
    design_paths: &[PathBuf],
    pool: Option<&Path>,
    out: &Path,
    json: bool,
) -> anyhow::Result<(RunOutcome, Artifacts)> {
    if design_paths.is_empty() {
        bail!("at least one design record is required");
    }
    let designs = read_designs(design_paths)?;
    let energetics = energetics(cfg)?;
    let oracle = Arc::new(NupackOracle::new(cfg.oracle.clone()));
    let aggregator = Arc::new(MetricAggregator::new(
        energetics.clone(),
        oracle,
        cfg.spurious_fraction,
        cfg.quick,
    ));

    let mut runner = ReplicateRunner::new(aggregator, cfg.seed);
    if let Some(threads) = cfg.threads {
        runner = runner.with_threads(threads);
    }
    if let Some(path) = pool {
        runner = runner.with_toehold_pool(toehold_pool(cfg, path, energetics.as_ref())?);
    }

    let results = runner.run(&designs, cfg.candidates)?;
    let outcome = RunOutcome::from_scores(results.matrix, results.failures);
    let artifacts = write_artifacts(&outcome, out, json)?;
    Ok((outcome, artifacts))
}

pub fn write_artifacts(outcome: &RunOutcome, out: &Path, json: bool) -> anyhow::Result<Artifacts> {
    std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;

    let scores = out.join(SCORES_FILE);
    let file = File::create(&scores).with_context(|| format!("creating {}", scores.display()))?;
    let empty;
    let matrix = match outcome.scores() {
        Some(m) => m,
        None => {
            empty = ScoreMatrix::new(metrics::metric_names());
            &empty
        }
    };
    matrix.write_csv(BufWriter::new(file), outcome.winner())?;

    let report = out.join(REPORT_FILE);
    std::fs::write(&report, render_text(outcome)).with_context(|| format!("writing {}", report.display()))?;

    let json = if json {
        let path = out.join(JSON_FILE);
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), outcome)?;
        Some(path)
    } else {
        None
    };
    log::info!("Artifacts written to {}", out.display());
    Ok(Artifacts { scores, report, json })
}

/// Re-run selection on a scores artifact.
pub fn select(path: &Path) -> anyhow::Result<RunOutcome> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let matrix = ScoreMatrix::read_csv(file).with_context(|| format!("reading scores {}", path.display()))?;
    log::info!("Read {} candidates with {} metrics", matrix.len(), matrix.names().len());
    Ok(RunOutcome::from_scores(matrix, Vec::new()))
}

pub fn crn(path: &Path) -> anyhow::Result<Crn> {
    Crn::read(path).with_context(|| format!("reading reaction network {}", path.display()))
}

/// Draw a toehold assignment for a design and write its constraint file.
pub fn assign_toeholds(
    cfg: &RunConfig,
    design_path: &Path,
    pool_path: &Path,
    out: &Path,
) -> anyhow::Result<ToeholdAssignment> {
    let design = CandidateDesign::read(design_path)
        .with_context(|| format!("reading design {}", design_path.display()))?;
    let energetics = energetics(cfg)?;
    let pool = toehold_pool(cfg, pool_path, energetics.as_ref())?;
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let assignment = toeholds::assign_toeholds(&design, &pool, &mut rng)?;
    toeholds::write_toehold_file(out, &design, &assignment)?;
    Ok(assignment)
}
