//! sitepilot command-line interface.
//!
//! ## Commands
//!
//! - `diagnose`: run a scripted diagnostic against a service config
//! - `show`: print a stored run as redacted JSON
//! - `list`: list stored runs, newest first
//! - `assemble`: build a phased plan from raw recommendations
//! - `redact`: redact secrets from a JSON file

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use tracing::info;

use sitepilot_core::telemetry::level_for_verbosity;
use sitepilot_core::{
    assemble_with_options, format_for_copy, redact_secrets, AssemblyContext, AssemblyOptions,
    BucketPolicy, DiagnosticsRunner, RawRecommendation, RunnerOptions, ScriptedExecutor,
    ServiceDiagnosticConfig, StageResultsExt, METRICS,
};
use sitepilot_state::{DiagnosticStore, RunId, SurrealDiagnosticStore, DB_URL_ENV};

#[derive(Parser)]
#[command(name = "sitepilot")]
#[command(author = "Sitepilot Developers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Service diagnostics and SEO action plans", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Database URL (mem://, surrealkv://<dir>, ws://host:port)
    #[arg(long, global = true, env = DB_URL_ENV)]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run diagnostics for one service from a scripted executor
    Diagnose {
        /// Service config (TOML or JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Executor script (TOML or JSON)
        #[arg(short, long)]
        script: PathBuf,

        /// Reject stages that are not in the catalog
        #[arg(long)]
        strict: bool,

        /// Give up after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Print a stored run as redacted JSON
    Show {
        /// Run ID
        run_id: String,
    },

    /// List stored runs, newest first
    List {
        /// Only runs for this service
        #[arg(long)]
        service: Option<String>,

        /// Maximum number of runs to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Assemble raw recommendations into a phased plan
    Assemble {
        /// Assembly context (JSON)
        #[arg(long)]
        context: PathBuf,

        /// Raw recommendations (JSON array)
        #[arg(short, long)]
        input: PathBuf,

        /// Write the plan here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Capacity of the `now` phase
        #[arg(long, default_value = "3")]
        now_capacity: usize,

        /// Capacity of the `next` phase
        #[arg(long, default_value = "5")]
        next_capacity: usize,

        /// Phase allocation policy
        #[arg(long, value_enum, default_value = "greedy")]
        policy: PolicyArg,
    },

    /// Redact secrets from a JSON file and print the result
    Redact {
        /// JSON file
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Greedy,
    SeededCascade,
}

impl From<PolicyArg> for BucketPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Greedy => BucketPolicy::Greedy,
            PolicyArg::SeededCascade => BucketPolicy::SeededCascade,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    sitepilot_core::init_tracing(cli.json, level_for_verbosity(cli.verbose));

    let result = match cli.command {
        Commands::Diagnose {
            config,
            script,
            strict,
            timeout_secs,
        } => {
            let store = open_store(cli.db.as_deref()).await?;
            cmd_diagnose(store, &config, &script, strict, timeout_secs).await
        }
        Commands::Show { run_id } => {
            let store = open_store(cli.db.as_deref()).await?;
            cmd_show(store.as_ref(), &run_id).await
        }
        Commands::List { service, limit } => {
            let store = open_store(cli.db.as_deref()).await?;
            cmd_list(store.as_ref(), service.as_deref(), limit).await
        }
        Commands::Assemble {
            context,
            input,
            output,
            now_capacity,
            next_capacity,
            policy,
        } => {
            let options = AssemblyOptions {
                now_capacity,
                next_capacity,
                bucket_policy: policy.into(),
                ..AssemblyOptions::default()
            };
            cmd_assemble(&context, &input, output.as_deref(), &options)
        }
        Commands::Redact { file } => cmd_redact(&file),
    };

    METRICS.flush();
    result
}

async fn open_store(db: Option<&str>) -> Result<Arc<dyn DiagnosticStore>> {
    let store = SurrealDiagnosticStore::from_env(db)
        .await
        .context("Failed to connect to sitepilot database")?;
    Ok(Arc::new(store))
}

/// Read a file as TOML when it has a `.toml` extension, JSON otherwise.
fn read_structured<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
    if is_toml {
        toml::from_str(&content).with_context(|| format!("Invalid TOML in {:?}", path))
    } else {
        serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))
    }
}

/// Run a scripted diagnostic and print the per-stage outcome.
async fn cmd_diagnose(
    store: Arc<dyn DiagnosticStore>,
    config_path: &Path,
    script_path: &Path,
    strict: bool,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let config: ServiceDiagnosticConfig = read_structured(config_path)?;
    config.validate()?;
    let mut script: ScriptedExecutor = read_structured(script_path)?;
    script.validate()?;

    let runner = DiagnosticsRunner::new(store).with_options(RunnerOptions { strict });
    let service_id = config.service_id.clone();
    let run = runner.run_diagnostics_for_service(config, &mut script);

    let outcome = match timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), run)
            .await
            .map_err(|_| anyhow::anyhow!("Diagnostics for {} timed out after {}s", service_id, secs))?,
        None => run.await,
    }
    .with_context(|| format!("Diagnostics for {} failed", service_id))?;

    info!(run_id = %outcome.run_id, status = %outcome.status, "diagnostics complete");

    println!("run {}", outcome.run_id);
    println!("status: {}", outcome.status);
    println!();
    for stage in &outcome.stages {
        let duration = stage
            .duration_ms
            .map(|d| format!("{}ms", d))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<22} {:<8} {:>8}  {}",
            stage.stage,
            stage.status.as_str(),
            duration,
            stage.message
        );
    }

    Ok(())
}

async fn cmd_show(store: &dyn DiagnosticStore, run_id: &str) -> Result<()> {
    let record = store
        .get(&RunId::from(run_id))
        .await
        .with_context(|| format!("Run not found: {}", run_id))?;
    println!("{}", format_for_copy(&record)?);
    Ok(())
}

async fn cmd_list(store: &dyn DiagnosticStore, service: Option<&str>, limit: usize) -> Result<()> {
    let records = store.list(service).await?;
    if records.is_empty() {
        match service {
            Some(s) => println!("No diagnostic runs for '{}'", s),
            None => println!("No diagnostic runs"),
        }
        return Ok(());
    }

    for record in records.iter().take(limit) {
        let failed = record
            .stage_results()
            .map(|stages| {
                stages
                    .iter()
                    .filter(|s| s.status == sitepilot_core::StageStatus::Fail)
                    .count()
            })
            .unwrap_or(0);
        println!(
            "{}  {:<8} {:<16} {}  failed stages: {}",
            record.run_id,
            record.status.as_str(),
            record.service_id,
            record.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            failed
        );
    }

    Ok(())
}

fn cmd_assemble(
    context_path: &Path,
    input_path: &Path,
    output: Option<&Path>,
    options: &AssemblyOptions,
) -> Result<()> {
    if options.now_capacity == 0 && options.next_capacity == 0 {
        bail!("At least one of --now-capacity and --next-capacity must be non-zero");
    }
    let context: AssemblyContext = read_structured(context_path)?;
    let raw: Vec<RawRecommendation> = read_structured(input_path)?;

    let plan = assemble_with_options(&context, raw, options);
    let rendered = serde_json::to_string_pretty(&plan)?;

    match output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write plan to {:?}", path))?;
            let summary = sitepilot_core::PlanSummary::of(&plan);
            println!(
                "Wrote {} recommendations to {:?} (now {}, next {}, later {})",
                summary.total, path, summary.now, summary.next, summary.later
            );
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

fn cmd_redact(path: &Path) -> Result<()> {
    let value: serde_json::Value = read_structured(path)?;
    println!("{}", serde_json::to_string_pretty(&redact_secrets(&value))?);
    Ok(())
}
