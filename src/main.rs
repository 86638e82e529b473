use anyhow::{Context, Result};
use backup_retention::{
    check_destination, delete_disposable, move_disposable, prepare_destination, resolve,
    scan_directory, write_report, Action, DispositionOptions, FileConfig, Overrides, RunConfig,
    SelectionMode,
};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Decide which timestamped backups to keep under a generational retention policy",
    long_about = None
)]
struct Args {
    /// Directory holding the backups (defaults to current directory)
    directory: Option<PathBuf>,

    /// Backup name format. Placeholders {YYYY} {MM} {DD} {hh} {mm}; wildcards ? and *
    /// [default: {YYYY}{MM}{DD}T{hh}{mm}]
    #[arg(long, short)]
    format: Option<String>,

    /// Retention policy, e.g. "last=3 days=7 weeks=6 years=10". Units: last, hours,
    /// days, weeks, fortnights, months, quarters, halfyears, years. "all" keeps
    /// everything [default: all]
    #[arg(long, short)]
    retention: Option<String>,

    /// Whether coarser units overlap finer ones (progressive) or continue where
    /// they stopped (cumulative) [default: progressive]
    #[arg(long, short, value_enum)]
    selection: Option<SelectionMode>,

    /// What to do with backups that have no reason to be kept [default: report]
    #[arg(long, short, value_enum)]
    action: Option<Action>,

    /// Destination directory for the move action
    #[arg(long, short)]
    destination: Option<PathBuf>,

    /// List reasons for every backup, or log each move/delete
    #[arg(long, short)]
    verbose: bool,

    /// Show what move or delete would do without touching anything
    #[arg(long)]
    dry_run: bool,

    /// Reference time for detecting future-dated backups (YYYY-MM-DDThh:mm)
    #[arg(long)]
    now: Option<String>,

    /// Read defaults from a TOML config file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Disable coloured output
    #[arg(long)]
    no_color: bool,
}

/// Diagnostics go to stderr; RUST_LOG overrides the default level
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .try_init()
        .ok();
}

fn run(args: Args) -> Result<()> {
    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let overrides = Overrides {
        directory: args.directory,
        format: args.format,
        retention: args.retention,
        selection: args.selection,
        action: args.action,
        destination: args.destination,
        verbose: args.verbose,
        dry_run: args.dry_run,
        now: args.now,
    };
    let config = RunConfig::resolve(file, overrides)?;
    info!(
        directory = %config.directory.display(),
        format = config.template.as_str(),
        policy = %config.policy,
        selection = %config.selection,
        "starting"
    );

    let artifacts = scan_directory(&config.directory, &config.template, config.now)?;
    let reasons = resolve(&artifacts, &config.policy, config.selection);

    let options = DispositionOptions {
        verbose: config.verbose,
        dry_run: config.dry_run,
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let summary = match config.action {
        Action::Report => {
            write_report(&mut out, &reasons, config.verbose)
                .context("Failed to write report")?;
            None
        }
        Action::Move => {
            let destination = config
                .destination
                .as_deref()
                .context("destination directory required for the move action")?;
            if config.dry_run {
                check_destination(destination)?;
            } else {
                prepare_destination(destination)?;
            }
            Some(move_disposable(&mut out, &reasons, destination, options)?)
        }
        Action::Delete => Some(delete_disposable(&mut out, &reasons, options)?),
    };
    out.flush()?;

    if let Some(summary) = summary {
        info!(
            processed = summary.processed,
            kept = summary.kept,
            failed = summary.failures.len(),
            "disposition complete"
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    if args.no_color {
        colored::control::set_override(false);
    }

    run(args)
}
