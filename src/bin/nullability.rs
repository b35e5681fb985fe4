//! Nullability Check CLI
//!
//! Backfills snapshot defaults, diffs model revisions, runs the full
//! compatibility check, and captures snapshot entries.

use anyhow::Context;
use clap::{Parser, Subcommand};
use shape_guard::graph::{load_from_str, load_model};
use shape_guard::history::previous_model_source;
use shape_guard::nullability::{backfill, evaluate, CompatibilityEngine, ExceptionSnapshot};
use shape_guard::{CheckMode, Diagnostics, GuardConfig, NullabilityError, ReportFormat, SchemaGraph, ShapeId};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nullability-check")]
#[command(about = "Govern nullability drift with an exception snapshot")]
struct Cli {
    /// Exception snapshot (default: from config)
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// Nullability check mode (default: from config)
    #[arg(long)]
    check_mode: Option<CheckMode>,

    /// Output format (text or json)
    #[arg(short, long)]
    format: Option<ReportFormat>,

    /// Config file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply snapshot defaults to a model and summarize the result
    Backfill {
        /// Model file or directory
        #[arg(short, long)]
        model: PathBuf,
        /// Service whose snapshot entries to apply
        #[arg(short, long)]
        service: String,
    },

    /// Compare two model revisions after backfilling both
    Diff {
        #[arg(long)]
        old: PathBuf,
        #[arg(long)]
        new: PathBuf,
        #[arg(short, long)]
        service: String,
    },

    /// Full compatibility run: backfill, diff, snapshot audit
    Check {
        /// Current model file or directory
        #[arg(long)]
        new: PathBuf,
        /// Previous model file or directory
        #[arg(long, conflicts_with = "previous_from_git")]
        old: Option<PathBuf>,
        /// Read the previous model from the git history of `--new`
        #[arg(long)]
        previous_from_git: bool,
        /// Services to check (default: config, then every snapshot service)
        #[arg(short, long)]
        service: Vec<String>,
    },

    /// Print the snapshot entry a service's model implies
    Capture {
        #[arg(short, long)]
        model: PathBuf,
        #[arg(short, long)]
        service: String,
        /// Merge the entry into the snapshot file instead of printing it
        #[arg(long)]
        write: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Ok(false) means the check ran and found violations
fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = GuardConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    let snapshot_path = cli.snapshot.clone().unwrap_or_else(|| config.snapshot_path());
    let mode = cli.check_mode.unwrap_or(config.nullability.check_mode);
    let format = cli.format.unwrap_or(config.report.format);

    match cli.command {
        Commands::Backfill { model, service } => {
            let snapshot = load_snapshot(&snapshot_path)?;
            let service = ShapeId::parse(&service)?;
            let graph = load(&model)?;
            let outcome = backfill(&graph, &service, &snapshot)?;

            match format {
                ReportFormat::Json => {
                    let summary = serde_json::json!({
                        "service": service,
                        "generated_at": chrono::Utc::now().to_rfc3339(),
                        "bundle_hash": graph.bundle_hash,
                        "backfilled": outcome.backfilled,
                        "already_defaulted": outcome.already_defaulted,
                        "missing": outcome.missing,
                    });
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
                ReportFormat::Text => {
                    println!("🔧 Backfilled {} shape(s) for {}", outcome.backfilled.len(), service);
                    for id in &outcome.backfilled {
                        let default = outcome
                            .graph
                            .get(id)
                            .and_then(|s| s.default_value())
                            .map(|v| v.to_string())
                            .unwrap_or_default();
                        println!("  └─ {} = {}", id, default);
                    }
                    if !outcome.already_defaulted.is_empty() {
                        println!("  {} already defaulted", outcome.already_defaulted.len());
                    }
                    for id in &outcome.missing {
                        println!("  ⚠️  {} not found in model", id);
                    }
                }
            }
            Ok(true)
        }

        Commands::Diff { old, new, service } => {
            let snapshot = load_snapshot(&snapshot_path)?;
            let service = ShapeId::parse(&service)?;
            let old = backfill(&load(&old)?, &service, &snapshot)?;
            let new = backfill(&load(&new)?, &service, &snapshot)?;

            let report = evaluate(&old.graph, &new.graph, &service, &snapshot, mode);
            print_report(&service, &report, &new.graph, format)?;
            Ok(!report.has_errors())
        }

        Commands::Check {
            new,
            old,
            previous_from_git,
            service,
        } => {
            let snapshot = load_snapshot(&snapshot_path)?;
            let new_graph = load(&new)?;
            let old_graph = match (old, previous_from_git) {
                (Some(old), _) => load(&old)?,
                (None, true) => previous_from_history(&new)?.unwrap_or_else(|| new_graph.clone()),
                (None, false) => anyhow::bail!("either --old or --previous-from-git is required"),
            };

            let services = select_services(service, &config, &snapshot)?;
            let engine = CompatibilityEngine::new(snapshot).with_check_mode(mode);

            let mut passed = true;
            for service in &services {
                match engine.run(service, &old_graph, &new_graph) {
                    Ok(outcome) if !outcome.enrolled => {
                        println!("⏭️  {} is not enrolled in the exception snapshot", service);
                    }
                    Ok(outcome) => {
                        println!(
                            "✅ {} - nullability compatible ({} default(s) backfilled)",
                            service,
                            outcome.backfilled.len()
                        );
                        if !outcome.report.is_empty() {
                            print_report(service, &outcome.report, &outcome.graph, format)?;
                        }
                    }
                    Err(NullabilityError::Violations { report, .. }) => {
                        println!("❌ {} - nullability changes detected", service);
                        print_report(service, &report, &new_graph, format)?;
                        passed = false;
                    }
                    Err(e) => return Err(e).with_context(|| format!("checking {}", service)),
                }
            }
            Ok(passed)
        }

        Commands::Capture { model, service, write } => {
            let service = ShapeId::parse(&service)?;
            let graph = load(&model)?;
            let captured = ExceptionSnapshot::capture(&graph, &service);

            if write {
                let mut snapshot = if snapshot_path.exists() {
                    load_snapshot(&snapshot_path)?
                } else {
                    ExceptionSnapshot::new()
                };
                snapshot.merge(captured);
                snapshot.write_to(&snapshot_path)?;
                println!("📝 Wrote snapshot entry for {} to {}", service, snapshot_path.display());
            } else {
                println!("{}", captured.to_json_pretty()?);
            }
            Ok(true)
        }
    }
}

fn load(path: &Path) -> anyhow::Result<SchemaGraph> {
    load_model(path).with_context(|| format!("loading model from {}", path.display()))
}

fn load_snapshot(path: &Path) -> anyhow::Result<ExceptionSnapshot> {
    ExceptionSnapshot::from_path(path).with_context(|| format!("reading snapshot {}", path.display()))
}

fn previous_from_history(model: &Path) -> anyhow::Result<Option<SchemaGraph>> {
    let absolute = model
        .canonicalize()
        .with_context(|| format!("resolving {}", model.display()))?;
    let repo_dir = absolute.parent().unwrap_or(Path::new("."));

    match previous_model_source(repo_dir, &absolute)? {
        Some(source) => Ok(Some(load_from_str(&source, &format!("{} (previous)", model.display()))?)),
        None => {
            println!("ℹ️  No previous revision of {}; comparing against itself", model.display());
            Ok(None)
        }
    }
}

fn select_services(
    explicit: Vec<String>,
    config: &GuardConfig,
    snapshot: &ExceptionSnapshot,
) -> anyhow::Result<Vec<ShapeId>> {
    let names = if !explicit.is_empty() {
        explicit
    } else if !config.nullability.services.is_empty() {
        config.nullability.services.clone()
    } else {
        return Ok(snapshot.services().cloned().collect());
    };
    names
        .iter()
        .map(|name| ShapeId::parse(name).map_err(anyhow::Error::from))
        .collect()
}

fn print_report(
    service: &ShapeId,
    report: &Diagnostics,
    model: &SchemaGraph,
    format: ReportFormat,
) -> anyhow::Result<()> {
    match format {
        ReportFormat::Json => {
            let report = report.to_report(service).with_bundle_hash(model.bundle_hash.clone());
            println!("{}", report.to_json()?);
        }
        ReportFormat::Text => print!("{}", report),
    }
    Ok(())
}
