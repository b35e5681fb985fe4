//! Validation Index CLI
//!
//! Prints which operations need input validation and which containers must
//! emit a validation helper.

use anyhow::Context;
use clap::Parser;
use shape_guard::graph::load_model;
use shape_guard::{GuardConfig, ReportFormat, ServiceValidation, ShapeId, ValidationIndex};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shape-validation")]
#[command(about = "Compute validation requirements for a service model")]
struct Cli {
    /// Model file or directory of JSON models
    #[arg(short, long)]
    model: PathBuf,

    /// Service to analyze (default: every service in the model)
    #[arg(short, long)]
    service: Option<String>,

    /// Treat path-bound members as requiring validation
    #[arg(long)]
    validate_http_bindings: bool,

    /// Output format (text or json)
    #[arg(short, long)]
    format: Option<ReportFormat>,

    /// Config file
    #[arg(short, long)]
    config: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = GuardConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    let mut options = config.validation_options();
    options.validate_http_bindings |= cli.validate_http_bindings;
    let format = cli.format.unwrap_or(config.report.format);

    let graph = load_model(&cli.model)
        .with_context(|| format!("loading model from {}", cli.model.display()))?;

    let results: Vec<ServiceValidation> = match cli.service {
        Some(service) => {
            let service = ShapeId::parse(&service)?;
            if !graph.contains(&service) {
                anyhow::bail!("service {} not found in model", service);
            }
            vec![ValidationIndex::for_service(&graph, &service, options)]
        }
        None => ValidationIndex::new(&graph, options).services().cloned().collect(),
    };

    match format {
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        ReportFormat::Text => {
            for result in &results {
                print_text(result);
            }
        }
    }
    Ok(())
}

fn print_text(result: &ServiceValidation) {
    println!("🔍 {}", result.service);
    if result.operations.is_empty() {
        println!("  ✅ No operation requires validation");
        println!();
        return;
    }

    println!("  Operations requiring validation ({}):", result.operations.len());
    for op in &result.operations {
        println!("    └─ {}", op);
    }
    println!("  Containers emitting a validation helper ({}):", result.containers.len());
    for container in &result.containers {
        println!("    └─ {}", container);
    }
    println!();
}
