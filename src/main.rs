use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use opsbench::config::SuiteConfig;
use opsbench::display;
use opsbench::errors::OpsbenchError;
use opsbench::pipeline::{self, Event};
use opsbench::report::{self, REPORT_FILE, Report};
use opsbench::runner::BenchmarkRunner;
use opsbench::store::{RESULTS_FILE, ResultStore};

#[derive(Parser)]
#[command(
    name = "opsbench",
    version,
    about = "Build, run and rank interchangeable benchmark implementations"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Suite file (defaults to <root>/opsbench.toml, then the built-in suite)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory benchmark work dirs and the results dir are relative to
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Override the results directory
    #[arg(long, global = true)]
    results_dir: Option<PathBuf>,

    /// Override the per-benchmark execution timeout, in seconds
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Only run the named benchmark (repeatable)
    #[arg(long, global = true)]
    only: Vec<String>,

    /// Log debug diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Build and run every benchmark, then write results and the report (default)
    Run,
    /// Regenerate the report from previously persisted results
    Report,
    /// Print the built-in suite as a TOML file
    InitConfig,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Suite root: `--root`, else the directory of `--config`, else the cwd.
fn resolve_root(cli: &Cli) -> Result<PathBuf> {
    let root = match (&cli.root, &cli.config) {
        (Some(root), _) => root.clone(),
        (None, Some(config)) => config
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
        (None, None) => PathBuf::from("."),
    };
    std::path::absolute(&root)
        .with_context(|| format!("Could not resolve root directory {}", root.display()))
}

fn load_config(cli: &Cli, root: &Path) -> Result<SuiteConfig> {
    let mut config = SuiteConfig::discover(cli.config.as_deref(), root)?;
    if let Some(dir) = &cli.results_dir {
        config.results_dir = dir.clone();
    }
    if let Some(secs) = cli.timeout {
        config.timeout_secs = secs;
    }
    config.retain_only(&cli.only)?;
    Ok(config)
}

fn run_measurements(cli: &Cli) -> Result<()> {
    let root = resolve_root(cli)?;
    let config = load_config(cli, &root)?;
    let results_dir = config.results_path(&root);
    let specs = config.resolved_specs(&root);
    let runner = BenchmarkRunner::new(config.toolchain.clone(), config.timeout());

    print!("{}", display::format_banner());
    print!("{}", display::format_phase(1, 2, "Running all measurements..."));

    let mut store = ResultStore::new();
    let skipped = pipeline::run_suite(&specs, &runner, &mut store, |event| match event {
        Event::Started { spec, index, total } => {
            print!("{}", display::format_started(spec, index, total));
        }
        Event::Captured { spec, output } => {
            print!("{}", display::format_captured(spec, output));
        }
        Event::Collected { spec, record } => {
            print!("{}", display::format_collected(spec, record));
        }
        Event::Skipped { reason, .. } => {
            print!("{}", display::format_skipped(reason));
        }
    });

    let results_path = results_dir.join(RESULTS_FILE);
    store.persist(&results_path)?;
    print!("\n{}", display::format_saved("Results", &results_path));
    print!("{}", display::format_skip_summary(&skipped));

    if store.is_empty() {
        return Err(OpsbenchError::NoResultsCollected.into());
    }

    print!("{}", display::format_phase(2, 2, "Generating report..."));
    emit_report(&store, &results_dir)?;

    print!("{}", display::format_completion(&results_dir, Local::now()));
    Ok(())
}

fn regenerate_report(cli: &Cli) -> Result<()> {
    let root = resolve_root(cli)?;
    let results_dir = match &cli.results_dir {
        Some(dir) => root.join(dir),
        None => SuiteConfig::discover(cli.config.as_deref(), &root)?.results_path(&root),
    };

    let store = ResultStore::load(&results_dir.join(RESULTS_FILE))?;
    if store.is_empty() {
        return Err(OpsbenchError::NoResultsCollected.into());
    }
    emit_report(&store, &results_dir)
}

/// Write the report file and print the exact same text.
fn emit_report(store: &ResultStore, results_dir: &Path) -> Result<()> {
    let report = Report::from_store(store).ok_or(OpsbenchError::NoResultsCollected)?;
    let text = report.render();

    let report_path = results_dir.join(REPORT_FILE);
    report::write_report(&text, &report_path)?;
    print!("{}", display::format_saved("Report", &report_path));
    print!("\n{}", text);
    Ok(())
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        None | Some(Command::Run) => run_measurements(&cli),
        Some(Command::Report) => regenerate_report(&cli),
        Some(Command::InitConfig) => {
            print!("{}", SuiteConfig::default().to_toml()?);
            Ok(())
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{}", err);
        process::exit(1);
    }
}
