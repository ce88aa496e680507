use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use colored::Colorize;
use env_logger::Env;

use sr_energy::EnergeticsKind;
use sr_energy::MismatchMode;
use sr_scoring::RunOutcome;
use sr_scoring::report::render_text;

mod commands;
mod config;

use config::RunConfig;

/// Score candidate strand displacement designs and pick the best one.
#[derive(Debug, Parser)]
#[command(name = "strandrank", author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Evaluate candidate designs, select a winner and write the artifacts.
    Score {
        /// Candidate design records (JSON); candidate i uses record i mod n.
        #[arg(required = true, value_name = "DESIGN")]
        designs: Vec<PathBuf>,

        /// Draw fresh toeholds for every candidate from this pool file.
        #[arg(short, long, value_name = "FILE")]
        pool: Option<PathBuf>,

        /// Output directory for the scores and report.
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        out: PathBuf,

        /// Also write the report as JSON.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Re-run selection on an existing scores CSV.
    Select {
        #[arg(value_name = "SCORES")]
        scores: PathBuf,
    },
    /// Parse a reaction network and print its reactions and species.
    Crn {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
    /// Assign pool toeholds to a design and write the constraint file.
    Toeholds {
        #[arg(value_name = "DESIGN")]
        design: PathBuf,

        #[arg(value_name = "POOL")]
        pool: PathBuf,

        /// Constraint file to write.
        #[arg(short, long, value_name = "FILE", default_value = "toeholds.fixed")]
        out: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },
}

/// Run settings; flags override the configuration file.
#[derive(Debug, Args)]
struct RunArgs {
    /// JSON configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of candidates to evaluate.
    #[arg(short = 'n', long)]
    candidates: Option<usize>,

    /// Toehold length in nucleotides.
    #[arg(short = 'l', long)]
    length: Option<usize>,

    /// Target toehold binding energy (kcal/mol).
    #[arg(short = 'e', long)]
    energy: Option<f64>,

    /// Allowed toehold energy deviation (kcal/mol).
    #[arg(short = 'd', long)]
    deviation: Option<f64>,

    /// Spurious interaction ceiling as a fraction of the target energy.
    #[arg(short = 'M', long)]
    max_spurious: Option<f64>,

    /// Energetics model: cardelli or initiated.
    #[arg(short = 'g', long)]
    energetics: Option<EnergeticsKind>,

    /// Mismatch mode: max, loop or dangle.
    #[arg(long)]
    mismatch: Option<MismatchMode>,

    /// Directory with stacking_dg.csv and dangle_dg.csv.
    #[arg(long, value_name = "DIR")]
    params_dir: Option<PathBuf>,

    /// Directory with the NUPACK executables (default: $NUPACKHOME/bin, then PATH).
    #[arg(long, value_name = "DIR")]
    nupack_bin: Option<PathBuf>,

    #[arg(short, long)]
    seed: Option<u64>,

    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Random placeholder metrics instead of real scoring.
    #[arg(short, long)]
    quick: bool,
}

impl RunArgs {
    fn into_config(self) -> anyhow::Result<RunConfig> {
        let mut cfg = match &self.config {
            Some(path) => RunConfig::from_path(path)?,
            None => RunConfig::default(),
        };
        if let Some(v) = self.candidates { cfg.candidates = v; }
        if let Some(v) = self.length { cfg.toehold_length = v; }
        if let Some(v) = self.energy { cfg.target_dg = v; }
        if let Some(v) = self.deviation { cfg.deviation = v; }
        if let Some(v) = self.max_spurious { cfg.spurious_fraction = v; }
        if let Some(v) = self.energetics { cfg.energetics = v; }
        if let Some(v) = self.mismatch { cfg.mismatch = v; }
        if let Some(v) = self.seed { cfg.seed = v; }
        if self.threads.is_some() { cfg.threads = self.threads; }
        if self.params_dir.is_some() { cfg.params_dir = self.params_dir; }
        if self.quick { cfg.quick = true; }
        if self.nupack_bin.is_some() {
            cfg.oracle.bin_dir = self.nupack_bin;
        } else if cfg.oracle.bin_dir.is_none() {
            cfg.oracle.bin_dir = std::env::var_os("NUPACKHOME").map(|home| PathBuf::from(home).join("bin"));
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn print_outcome(outcome: &RunOutcome) {
    print!("{}", render_text(outcome));
    match outcome {
        RunOutcome::Selected { report, .. } => {
            println!("{} candidate {}", "Selected".green().bold(), report.winner);
        }
        RunOutcome::RawOnly { .. } => {
            println!("{}", "Not enough candidates for selection.".yellow());
        }
        RunOutcome::NoCandidates { .. } => {
            println!("{}", "No candidate could be scored.".red().bold());
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Score { designs, pool, out, json, run } => {
            let cfg = run.into_config()?;
            log::info!(
                "Scoring {} candidates ({:?} energetics, {:?} mismatch, target {} kcal/mol)",
                cfg.candidates, cfg.energetics, cfg.mismatch, cfg.target_dg
            );
            let (outcome, artifacts) = commands::score(&cfg, &designs, pool.as_deref(), &out, json)?;
            print_outcome(&outcome);
            println!("Scores: {}", artifacts.scores.display());
            println!("Report: {}", artifacts.report.display());
            if let Some(path) = artifacts.json {
                println!("JSON:   {}", path.display());
            }
        }
        Command::Select { scores } => {
            let outcome = commands::select(&scores)?;
            print_outcome(&outcome);
        }
        Command::Crn { path } => {
            let crn = commands::crn(&path)?;
            println!("{} ({} reactions)", "Reactions".bold(), crn.reactions.len());
            for r in &crn.reactions {
                println!("  {r}");
            }
            println!("{} ({})", "Species".bold(), crn.species.len());
            println!("  {}", crn.species.join(", "));
        }
        Command::Toeholds { design, pool, out, run } => {
            let cfg = run.into_config()?;
            let assignment = commands::assign_toeholds(&cfg, &design, &pool, &out)?;
            for (name, seq) in &assignment {
                println!("{:>8} = {}", name.bold(), seq.to_uppercase());
            }
            println!("Toehold constraints: {}", out.display());
        }
    }
    Ok(())
}
