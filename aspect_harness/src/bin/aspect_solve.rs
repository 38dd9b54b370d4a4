//! Aspect solver command-line tool
//!
//! Subcommands:
//! - `solve`: solve a single frame and print center and fiducials
//! - `batch`: solve every frame in a directory in parallel
//! - `synthetic`: write a synthetic solar frame and matching mask
//! - `default-config`: write the default configuration as JSON
//!
//! Usage:
//! ```
//! cargo run --release --bin aspect_solve -- solve --frame frame.png --mask mask.png
//! ```

use anyhow::{bail, Result};
use aspect::{AspectConfig, FiducialMethod};
use aspect_harness::frames::{list_frames, SyntheticScene};
use aspect_harness::report::{format_batch_line, format_solution, BatchSummary, FrameReport};
use aspect_harness::{build_engine, load_config, solve_batch, solve_file, ConfigOverrides};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "aspect_solve")]
#[command(about = "Solar disk center and fiducial localization on recorded frames")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve a single frame
    Solve {
        /// Frame image (PNG, BMP, TIFF, PGM)
        #[arg(short, long)]
        frame: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,

        /// Print the solution as JSON
        #[arg(long)]
        json: bool,
    },

    /// Solve all frames in a directory in parallel
    Batch {
        /// Directory containing frame images
        #[arg(short, long)]
        dir: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,

        /// Number of worker threads (default: all cores)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Print one JSON object per frame instead of text
        #[arg(long)]
        json: bool,
    },

    /// Write a synthetic solar frame with dark fiducials and its mask
    Synthetic {
        /// Output directory
        #[arg(short, long)]
        out: PathBuf,

        /// Read noise sigma in counts
        #[arg(long, default_value_t = 2.0)]
        noise: f64,

        /// Noise seed
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },

    /// Write the default configuration
    DefaultConfig {
        /// Output JSON file
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[derive(Args, Debug)]
struct EngineArgs {
    /// JSON configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reference mask image for the matched filter
    #[arg(short, long)]
    mask: Option<PathBuf>,

    /// Fiducial detection method
    #[arg(long, value_enum)]
    method: Option<Method>,

    /// Number of row and column chords
    #[arg(long)]
    chords: Option<usize>,

    /// Limb threshold in counts
    #[arg(long)]
    threshold: Option<f64>,

    /// Maximum fiducials per frame
    #[arg(long)]
    max_fiducials: Option<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Method {
    /// 1-D top-hat on row/column projections
    Tophat,
    /// 2-D correlation against the reference mask
    Matched,
}

impl From<Method> for FiducialMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Tophat => FiducialMethod::TopHat,
            Method::Matched => FiducialMethod::MatchedFilter,
        }
    }
}

impl EngineArgs {
    fn config(&self) -> Result<AspectConfig> {
        let overrides = ConfigOverrides {
            method: self.method.map(FiducialMethod::from),
            mask_path: self.mask.clone(),
            chord_count: self.chords,
            edge_threshold: self.threshold,
            max_fiducials: self.max_fiducials,
        };
        load_config(self.config.as_deref(), &overrides)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Solve {
            frame,
            engine,
            json,
        } => cmd_solve(&frame, &engine, json),
        Command::Batch {
            dir,
            engine,
            threads,
            json,
        } => cmd_batch(&dir, &engine, threads, json),
        Command::Synthetic { out, noise, seed } => cmd_synthetic(&out, noise, seed),
        Command::DefaultConfig { out } => {
            AspectConfig::default().save_to_file(&out)?;
            log::info!("Wrote default configuration to {}", out.display());
            Ok(())
        }
    }
}

fn cmd_solve(frame: &Path, args: &EngineArgs, json: bool) -> Result<()> {
    let engine = build_engine(args.config()?)?;
    let solution = solve_file(&engine, frame)?;

    if json {
        let report = FrameReport {
            frame,
            solution: &solution,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", format_solution(&solution));
    }
    Ok(())
}

fn cmd_batch(dir: &Path, args: &EngineArgs, threads: Option<usize>, json: bool) -> Result<()> {
    let paths = list_frames(dir)?;
    if paths.is_empty() {
        bail!("no frames found in {}", dir.display());
    }

    if let Some(threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }

    let engine = build_engine(args.config()?)?;
    log::info!("Solving {} frames from {}", paths.len(), dir.display());
    let results = solve_batch(&engine, &paths);

    for (path, result) in &results {
        match result {
            Ok(solution) if json => {
                let report = FrameReport {
                    frame: path,
                    solution,
                };
                println!("{}", serde_json::to_string(&report)?);
            }
            Ok(solution) => println!("{}", format_batch_line(path, solution)),
            Err(err) => log::error!("{}: {err:#}", path.display()),
        }
    }

    let summary = BatchSummary::from_results(
        results
            .iter()
            .map(|(path, result)| (path.as_path(), result.as_ref().ok())),
    );
    log::info!("{summary}");
    Ok(())
}

fn cmd_synthetic(out: &Path, noise: f64, seed: u64) -> Result<()> {
    let scene = SyntheticScene {
        noise_sigma: noise,
        seed,
        ..Default::default()
    };
    let (frame, mask) = scene.write(out)?;
    println!("frame: {}", frame.display());
    println!("mask:  {}", mask.display());
    Ok(())
}
