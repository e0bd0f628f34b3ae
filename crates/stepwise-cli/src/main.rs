// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `stepwise`: run, animate and pin down algorithm traces from a terminal.
//!
//! Every subcommand takes `ALGORITHM ARGS…` (see `stepwise list`). Output
//! goes to stdout; logs go to stderr and follow `RUST_LOG`.

mod commands;
mod golden;
mod job;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use stepwise_app_core::config::ConfigService;
use stepwise_app_core::prefs::PlayerPrefs;
use stepwise_app_core::prefs_port::PrefsPort;
use stepwise_config_fs::FsConfigStore;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::commands::{Play, Record, Run, Torture};
use crate::golden::Golden;
use crate::job::{Job, CATALOGUE};

#[derive(Parser)]
#[command(
    name = "stepwise",
    version,
    about = "Record, replay and verify step-by-step algorithm traces"
)]
struct Cli {
    /// Directory holding `player.json` (defaults to the platform config dir).
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a trace, one narration line per snapshot
    Run {
        #[command(flatten)]
        job: JobArgs,
        /// Print the trace as JSON, including its digest
        #[arg(long)]
        json: bool,
    },
    /// Animate a trace at the configured speed
    Play {
        #[command(flatten)]
        job: JobArgs,
        /// Milliseconds per step; overrides the stored preference
        #[arg(long)]
        speed: Option<u64>,
    },
    /// Record a trace digest to a golden file
    Record {
        #[command(flatten)]
        job: JobArgs,
        /// Path to write the golden JSON
        #[arg(long)]
        out: PathBuf,
    },
    /// Run an executor repeatedly and fail on any digest divergence
    Torture {
        #[command(flatten)]
        job: JobArgs,
        /// Number of runs
        #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..))]
        runs: u32,
    },
    /// Check a trace against a golden file
    Verify {
        #[command(flatten)]
        job: JobArgs,
        /// Path to the golden JSON
        #[arg(long)]
        golden: PathBuf,
    },
    /// Show the algorithm catalogue and argument shapes
    List,
    /// Show player preferences, optionally storing a new default speed
    Prefs {
        /// Milliseconds per step to store
        #[arg(long)]
        speed: Option<u64>,
    },
}

#[derive(Args)]
struct JobArgs {
    /// Algorithm keyword
    algorithm: String,
    /// Algorithm input; quote operations that contain spaces
    #[arg(allow_negative_numbers = true)]
    args: Vec<String>,
}

impl JobArgs {
    fn resolve(&self, prefs: &PlayerPrefs) -> Result<Job> {
        if self.args.len() > prefs.max_input_items {
            bail!(
                "{} arguments given; at most {} are allowed (max_input_items)",
                self.args.len(),
                prefs.max_input_items
            );
        }
        Job::parse(&self.algorithm, &self.args)
    }

    fn invocation(&self) -> Vec<String> {
        std::iter::once(self.algorithm.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(cli, &mut out)
}

fn prefs_service(dir: Option<&Path>) -> Result<ConfigService<FsConfigStore>> {
    let store = match dir {
        Some(dir) => FsConfigStore::at(dir),
        None => FsConfigStore::new(),
    }
    .context("failed to open the config directory")?;
    Ok(ConfigService::new(store))
}

// Reading commands still work when the config dir is unusable.
fn load_prefs(dir: Option<&Path>) -> PlayerPrefs {
    match prefs_service(dir) {
        Ok(service) => service.load_prefs(),
        Err(err) => {
            warn!(error = %err, "using default player prefs");
            PlayerPrefs::default()
        }
    }
}

fn execute<W: Write>(cli: Cli, out: &mut W) -> Result<()> {
    let dir = cli.config_dir.as_deref();
    match cli.command {
        Commands::Run { job, json } => {
            let prefs = load_prefs(dir);
            job.resolve(&prefs)?.dispatch(Run {
                out,
                json,
                show_metrics: prefs.show_metrics,
            })
        }
        Commands::Play { job, speed } => {
            let mut prefs = load_prefs(dir);
            if let Some(ms) = speed {
                prefs = prefs.with_speed_ms(ms);
            }
            info!(speed = ?prefs.speed(), "playing");
            job.resolve(&prefs)?.dispatch(Play {
                out,
                speed: prefs.speed(),
                show_metrics: prefs.show_metrics,
            })
        }
        Commands::Record { job, out: path } => {
            let prefs = load_prefs(dir);
            let recording = job.resolve(&prefs)?.dispatch(Record)?;
            let golden = Golden::new(
                recording.executor,
                job.invocation(),
                recording.snapshots,
                recording.digest.to_hex(),
            );
            golden.write(&path)?;
            writeln!(
                out,
                "recorded {} ({} snapshots) {} -> {}",
                golden.executor,
                golden.snapshots,
                golden.digest_hex,
                path.display()
            )?;
            Ok(())
        }
        Commands::Torture { job, runs } => {
            let prefs = load_prefs(dir);
            let parsed = job.resolve(&prefs)?;
            let digest = parsed.dispatch(Torture {
                runs: usize::try_from(runs)?,
            })?;
            writeln!(
                out,
                "{runs} runs of {} agree on {digest}",
                parsed.executor_name()
            )?;
            Ok(())
        }
        Commands::Verify { job, golden } => {
            let prefs = load_prefs(dir);
            let expected = Golden::read(&golden)?;
            let recording = job.resolve(&prefs)?.dispatch(Record)?;
            let actual = Golden::new(
                recording.executor,
                job.invocation(),
                recording.snapshots,
                recording.digest.to_hex(),
            );
            expected.check(&actual)?;
            writeln!(out, "ok {} {}", actual.executor, actual.digest_hex)?;
            Ok(())
        }
        Commands::List => {
            for (keywords, shape) in CATALOGUE {
                writeln!(out, "{keywords}\n    {shape}")?;
            }
            Ok(())
        }
        Commands::Prefs { speed } => {
            let service = prefs_service(dir)?;
            let mut prefs = service.load_prefs();
            if let Some(ms) = speed {
                prefs = prefs.with_speed_ms(ms);
                service.save_prefs(&prefs).context("failed to save player prefs")?;
                info!(speed_ms = prefs.speed_ms, "player prefs saved");
            }
            serde_json::to_writer_pretty(&mut *out, &prefs)?;
            writeln!(out)?;
            Ok(())
        }
    }
}
