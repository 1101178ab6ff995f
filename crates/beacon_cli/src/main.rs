//! BEACON CLI
//!
//! Validate and compare mod catalogs, and run dashboards against fixture data.

#![warn(missing_docs)]
#![warn(clippy::all)]

use beacon_catalog::{load_workspace, Diagnostics, LoadedWorkspace, Severity};
use beacon_core::QualifiedName;
use beacon_log::{event_channel, RunStatus};
use beacon_runtime::{Fixtures, MemoryBackend, Scheduler, SchedulerConfig};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use indexmap::IndexMap;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "beacon")]
#[command(about = "BEACON - dashboard resource catalog and run engine", long_about = None)]
struct Cli {
    /// Log level for beacon crates (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a catalog and report diagnostics
    Validate {
        /// Path to catalog file
        #[arg(short, long)]
        catalog: PathBuf,
        /// Root mod (defaults to the first mod in the file)
        #[arg(short, long)]
        root: Option<String>,
    },
    /// List query providers in walk order
    Providers {
        /// Path to catalog file
        #[arg(short, long)]
        catalog: PathBuf,
        /// Root mod
        #[arg(short, long)]
        root: Option<String>,
    },
    /// Compare two catalogs
    Diff {
        /// Older catalog
        #[arg(long)]
        left: PathBuf,
        /// Newer catalog
        #[arg(long)]
        right: PathBuf,
        /// Root mod
        #[arg(short, long)]
        root: Option<String>,
    },
    /// Run a dashboard, printing status events as JSON lines
    Run {
        /// Path to catalog file
        #[arg(short, long)]
        catalog: PathBuf,
        /// Root mod
        #[arg(short, long)]
        root: Option<String>,
        /// Qualified dashboard name
        #[arg(short, long)]
        dashboard: String,
        /// Initial input binding, `name=value`
        #[arg(short, long = "input", value_parser = parse_binding)]
        inputs: Vec<(String, Value)>,
        /// Input change applied after the first run, `name=value`; repeatable
        #[arg(long = "set", value_parser = parse_binding)]
        changes: Vec<(String, Value)>,
        /// Canned query answers
        #[arg(short, long)]
        fixtures: Option<PathBuf>,
        /// Children of one node allowed to run at once
        #[arg(long)]
        max_parallel: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.command {
        Commands::Validate { catalog, root } => {
            let loaded = read_catalog(&catalog, root.as_deref())?;
            print_diagnostics(&loaded.diagnostics);
            println!(
                "{} resources in {} mods, {} diagnostics",
                loaded.catalog.len(),
                loaded.catalog.mods().count(),
                loaded.diagnostics.len()
            );
            if loaded.diagnostics.has_errors() {
                bail!("catalog has errors");
            }
            Ok(())
        }
        Commands::Providers { catalog, root } => {
            let loaded = read_catalog(&catalog, root.as_deref())?;
            for provider in loaded.catalog.query_providers() {
                println!("{}", provider.name);
            }
            Ok(())
        }
        Commands::Diff { left, right, root } => {
            let left = read_catalog(&left, root.as_deref())?;
            let right = read_catalog(&right, root.as_deref())?;
            let diff = left.catalog.diff(&right.catalog);
            if diff.is_empty() {
                println!("catalogs are equal");
                return Ok(());
            }
            for name in &diff.added {
                println!("{} {}", console::style("+").green(), name);
            }
            for name in &diff.removed {
                println!("{} {}", console::style("-").red(), name);
            }
            for name in &diff.modified {
                println!("{} {}", console::style("~").yellow(), name);
            }
            let summary = diff.summary();
            println!(
                "{} added, {} removed, {} modified",
                summary.added_count, summary.removed_count, summary.modified_count
            );
            Ok(())
        }
        Commands::Run {
            catalog,
            root,
            dashboard,
            inputs,
            changes,
            fixtures,
            max_parallel,
        } => {
            let loaded = read_catalog(&catalog, root.as_deref())?;
            print_diagnostics(&loaded.diagnostics);

            let dashboard: QualifiedName = dashboard.parse()?;
            let backend = match fixtures {
                Some(path) => MemoryBackend::from_fixtures(read_fixtures(&path)?),
                None => MemoryBackend::new(),
            };
            let mut config = SchedulerConfig::default();
            if let Some(limit) = max_parallel {
                config = config.with_max_parallel_children(limit);
            }
            let scheduler = Scheduler::new(Arc::new(loaded.catalog), Arc::new(backend), config);

            let (sink, mut stream) = event_channel();
            let printer = tokio::spawn(async move {
                while let Some(event) = stream.recv().await {
                    match serde_json::to_string(&event) {
                        Ok(line) => println!("{line}"),
                        Err(err) => tracing::error!(error = %err, "event not serialisable"),
                    }
                }
            });

            let inputs: IndexMap<String, Value> = inputs.into_iter().collect();
            let mut tree = scheduler.build(&dashboard, inputs, Arc::new(sink))?;
            let mut status = tree.execute().await;
            for (name, value) in changes {
                tree.set_input(name, value).await;
                status = tree.status();
            }
            drop(tree);
            printer.await.wrap_err("event printer failed")?;

            if status == RunStatus::Error {
                bail!("dashboard {} finished with errors", dashboard);
            }
            tracing::info!(dashboard = %dashboard, status = %status, "done");
            Ok(())
        }
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(format!("beacon={level}")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("beacon=info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_catalog(path: &Path, root: Option<&str>) -> Result<LoadedWorkspace> {
    let text = std::fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))?;
    load_workspace(&text, root).wrap_err_with(|| format!("loading {}", path.display()))
}

fn read_fixtures(path: &Path) -> Result<Fixtures> {
    let text = std::fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).wrap_err_with(|| format!("parsing {}", path.display()))
}

fn print_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics {
        let level = match diagnostic.severity {
            Severity::Error => console::style("error").red().bold(),
            Severity::Warning => console::style("warning").yellow().bold(),
        };
        eprintln!("{}: {} ({})", level, diagnostic.summary, diagnostic.subject);
        eprintln!("  {}", diagnostic.detail);
    }
}

/// Parse `name=value`; the value is JSON when it parses as JSON, a string otherwise
fn parse_binding(text: &str) -> std::result::Result<(String, Value), String> {
    let (name, raw) = text
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{text}'"))?;
    beacon_core::name::validate_segment(name).map_err(|err| err.to_string())?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((name.to_string(), value))
}
