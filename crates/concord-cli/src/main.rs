//! Concord CLI
//!
//! - `align`: align two knowledge bases and write score files
//! - `snapshot`: load a TSV base once and store it as a `.kbfs` snapshot
//! - `stats`: counts and relation functionalities of one base

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use concord_align::{Aligner, Direction, LiteralMode, ResumePoint, Settings, StopSignal};
use concord_facts::{FactsConfig, Rel};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, Level};

mod load;

#[derive(Parser)]
#[command(name = "concord")]
#[command(
    author,
    version,
    about = "Concord: probabilistic alignment of two knowledge bases"
)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Align two bases; score files go to `--out`.
    Align(AlignArgs),

    /// Load a TSV base and write a binary snapshot.
    Snapshot {
        /// Input TSV file
        #[arg(short, long)]
        input: PathBuf,
        /// Output snapshot (`.kbfs`)
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Print counts and per-relation statistics of a base.
    Stats {
        /// TSV file or `.kbfs` snapshot
        #[arg(long)]
        kb: PathBuf,
    },
}

#[derive(Args, Debug)]
struct AlignArgs {
    /// First base (TSV or `.kbfs`)
    #[arg(long)]
    kb1: PathBuf,
    /// Second base (TSV or `.kbfs`)
    #[arg(long)]
    kb2: PathBuf,
    /// Output directory for score files
    #[arg(short, long)]
    out: PathBuf,
    /// JSON settings file; flags below override it
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Worker threads (0 = all cores, 1 = sequential)
    #[arg(long)]
    threads: Option<usize>,
    /// Maximum number of iterations
    #[arg(long)]
    iterations: Option<usize>,
    #[arg(long, value_enum)]
    literal_mode: Option<LiteralModeArg>,
    /// Minimum similarity for approximate literal matches
    #[arg(long)]
    literal_threshold: Option<f64>,
    /// Lower equalities contradicted by functional relations
    #[arg(long)]
    punish: bool,
    /// Longest join relation explored (1-4)
    #[arg(long)]
    max_join_length: Option<usize>,
    /// Iteration to resume at
    #[arg(long, requires = "resume_entity")]
    resume_iteration: Option<usize>,
    /// Base-1 instances already done in the resumed iteration
    #[arg(long, requires = "resume_iteration")]
    resume_entity: Option<usize>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LiteralModeArg {
    Identity,
    Normalized,
    Approximate,
}

impl From<LiteralModeArg> for LiteralMode {
    fn from(arg: LiteralModeArg) -> Self {
        match arg {
            LiteralModeArg::Identity => LiteralMode::Identity,
            LiteralModeArg::Normalized => LiteralMode::Normalized,
            LiteralModeArg::Approximate => LiteralMode::Approximate,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Align(args) => cmd_align(&args),
        Commands::Snapshot { input, out } => cmd_snapshot(&input, &out),
        Commands::Stats { kb } => cmd_stats(&kb),
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ============================================================================
// align
// ============================================================================

/// File settings (or defaults) with the command-line overrides applied.
fn build_settings(args: &AlignArgs) -> Result<Settings> {
    let mut settings = match &args.settings {
        Some(path) => Settings::from_json_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(threads) = args.threads {
        settings.threads = threads;
    }
    if let Some(iterations) = args.iterations {
        settings.max_iterations = iterations;
    }
    if let Some(mode) = args.literal_mode {
        settings.literal_mode = mode.into();
    }
    if let Some(threshold) = args.literal_threshold {
        settings.literal_threshold = threshold;
    }
    if args.punish {
        settings.punish = true;
    }
    if let Some(len) = args.max_join_length {
        settings.max_join_length = len;
    }
    if let (Some(iteration), Some(entity_offset)) = (args.resume_iteration, args.resume_entity) {
        settings.resume = ResumePoint {
            iteration,
            entity_offset,
        };
    }
    settings.output_dir = Some(args.out.clone());
    if settings.stop_file.is_none() {
        settings.stop_file = Some(args.out.join("STOP"));
    }
    settings.validate()?;
    Ok(settings)
}

fn cmd_align(args: &AlignArgs) -> Result<()> {
    let settings = build_settings(args)?;
    debug!(settings = %serde_json::to_string(&settings)?, "effective settings");
    if let Some(stop_file) = settings.stop_file.as_deref().filter(|p| p.exists()) {
        bail!(
            "stop file {} exists; remove it before starting a run",
            stop_file.display()
        );
    }
    fs::create_dir_all(&args.out).with_context(|| format!("creating {}", args.out.display()))?;

    let kb1 = load::load_kb(&args.kb1, &settings.facts)?;
    let kb2 = load::load_kb(&args.kb2, &settings.facts)?;

    let flag = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&flag))
            .with_context(|| format!("registering handler for signal {signal}"))?;
    }
    let stop = StopSignal::new(settings.stop_file.clone()).with_flag(flag);

    let mut aligner = Aligner::new(&kb1, &kb2, &settings)?.with_stop(stop);
    let outcome = aligner.run()?;

    match outcome.stopped {
        Some(point) => eprintln!(
            "{} resume with --resume-iteration {} --resume-entity {}",
            "stopped;".yellow().bold(),
            point.iteration,
            point.entity_offset
        ),
        None => eprintln!(
            "{} after {} iteration(s){}",
            "done".green().bold(),
            outcome.iterations,
            if outcome.converged {
                ", converged"
            } else {
                ""
            }
        ),
    }
    println!("equalities\t{}", aligner.assignment().len());
    for direction in Direction::BOTH {
        println!(
            "superrelations{}\t{}",
            direction.suffix(),
            aligner.sub_relations(direction).len()
        );
        println!(
            "superclasses{}\t{}",
            direction.suffix(),
            aligner.sub_classes(direction).len()
        );
    }
    eprintln!("{} {}", "wrote".green().bold(), args.out.display().to_string().bold());
    Ok(())
}

// ============================================================================
// snapshot / stats
// ============================================================================

fn cmd_snapshot(input: &Path, out: &Path) -> Result<()> {
    let kb = load::load_kb(input, &FactsConfig::default())?;
    let bytes = kb.to_bytes()?;
    fs::write(out, &bytes).with_context(|| format!("writing {}", out.display()))?;
    eprintln!(
        "{} {} ({} facts, {} bytes)",
        "wrote".green().bold(),
        out.display().to_string().bold(),
        kb.len(),
        bytes.len()
    );
    Ok(())
}

fn cmd_stats(path: &Path) -> Result<()> {
    let kb = load::load_kb(path, &FactsConfig::default())?;
    println!("facts\t{}", kb.len());
    println!("entities\t{}", kb.entity_count());
    println!("instances\t{}", kb.instance_ids().len());
    println!("classes\t{}", kb.classes().len());
    println!("relations\t{}", kb.relation_count());
    println!("literals\t{}", kb.literal_count());
    println!();
    println!(
        "{}",
        "relation\tfacts\tsubjects\tobjects\tfun\tinvfun\ttarget".bold()
    );
    for &relation in kb.relations() {
        let Some(stats) = kb.relation_stats(relation) else {
            continue;
        };
        let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"));
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{:?}",
            kb.entity_name(relation).unwrap_or("?"),
            stats.facts,
            stats.subjects,
            stats.objects,
            fmt(kb.functionality(Rel::forward(relation))),
            fmt(kb.functionality(Rel::forward(relation).inverse())),
            stats.dominant_target()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> AlignArgs {
        let mut argv = vec!["concord", "align", "--kb1", "a.tsv", "--kb2", "b.tsv", "--out", "out"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Align(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn flags_override_defaults() -> Result<()> {
        let settings = build_settings(&args(&[
            "--threads",
            "1",
            "--literal-mode",
            "approximate",
            "--literal-threshold",
            "0.6",
            "--punish",
            "--max-join-length",
            "2",
        ]))?;
        assert_eq!(settings.threads, 1);
        assert_eq!(settings.literal_mode, LiteralMode::Approximate);
        assert_eq!(settings.literal_threshold, 0.6);
        assert!(settings.punish);
        assert_eq!(settings.max_join_length, 2);
        assert_eq!(settings.output_dir.as_deref(), Some(Path::new("out")));
        assert_eq!(settings.stop_file.as_deref(), Some(Path::new("out/STOP")));
        Ok(())
    }

    #[test]
    fn settings_file_is_the_base_layer() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "theta": 0.2, "max_iterations": 3 }"#)?;
        let path = path.to_string_lossy().into_owned();
        let settings = build_settings(&args(&["--settings", &path, "--iterations", "5"]))?;
        assert_eq!(settings.theta, 0.2);
        assert_eq!(settings.max_iterations, 5);
        Ok(())
    }

    #[test]
    fn out_of_range_flags_are_rejected() {
        assert!(build_settings(&args(&["--max-join-length", "9"])).is_err());
    }

    #[test]
    fn resume_flags_come_in_pairs() {
        assert!(Cli::try_parse_from([
            "concord", "align", "--kb1", "a", "--kb2", "b", "--out", "o",
            "--resume-iteration", "2",
        ])
        .is_err());
        let resumed = args(&["--resume-iteration", "2", "--resume-entity", "7"]);
        let settings = build_settings(&resumed).map(|s| s.resume).ok();
        assert_eq!(
            settings,
            Some(ResumePoint {
                iteration: 2,
                entity_offset: 7
            })
        );
    }
}
