//! # CLI Module
//!
//! Command-line interface for the photo reconciler.
//!
//! ## Usage
//! ```bash
//! # Match by name and move exports next to their originals
//! photo-reconcile run ~/Originals ~/Exports ~/Sorted
//!
//! # Strip an export suffix and confirm by capture time
//! photo-reconcile run ~/Originals ~/Exports ~/Sorted --suffix _export --compare-metadata
//!
//! # Preview without moving anything
//! photo-reconcile run ~/Originals ~/Exports ~/Sorted --dry-run
//!
//! # Everything from a JSON file, JSON report
//! photo-reconcile run-config reconcile.json --output json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_reconciler::core::cache::MetadataCache;
use photo_reconciler::core::pipeline::{
    CancellationToken, ReconcileConfig, ReconcileReport, Reconciler,
};
use photo_reconciler::error::Result;
use photo_reconciler::events::{Event, EventChannel, PipelineEvent, Severity};
use std::path::{Path, PathBuf};
use std::thread;

/// Photo Reconciler - Put exports back next to their originals
#[derive(Parser, Debug)]
#[command(name = "photo-reconcile")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Match derivatives to sources and relocate them
    Run {
        /// Tree of camera originals
        source: PathBuf,

        /// Tree of exported derivatives
        derivatives: PathBuf,

        /// Output tree (mirrors the source layout)
        output_root: PathBuf,

        /// Export suffix to strip when matching, e.g. `_export`
        #[arg(short, long)]
        suffix: Option<String>,

        /// Only try the stripped name for suffixed derivatives
        #[arg(long)]
        no_check_without_suffix: bool,

        /// Confirm matches by EXIF capture time (enables duplicate-marker matching)
        #[arg(short = 'm', long)]
        compare_metadata: bool,

        /// Worker cap for matching
        #[arg(short, long)]
        workers: Option<usize>,

        /// Attempts per metadata read
        #[arg(long, default_value = "3")]
        retries: u32,

        /// Initial delay between metadata read attempts, in seconds
        #[arg(long, default_value = "0.1")]
        retry_delay: f64,

        /// Source extensions to accept (repeatable; replaces the default set)
        #[arg(long = "ext")]
        extensions: Vec<String>,

        /// Include hidden files and directories
        #[arg(long)]
        include_hidden: bool,

        /// Match and report without moving anything
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        display: DisplayArgs,
    },

    /// Run with every setting taken from a JSON config file
    RunConfig {
        /// Path to the JSON config
        config: PathBuf,

        /// Override the file's dry_run setting
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        display: DisplayArgs,
    },

    /// Delete the metadata cache for a source tree
    ClearCache {
        /// Tree of camera originals
        source: PathBuf,

        /// Output tree holding the cache
        output_root: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct DisplayArgs {
    /// Output format
    #[arg(short, long, default_value = "pretty")]
    output: OutputFormat,

    /// List every match and unmatched derivative
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            source,
            derivatives,
            output_root,
            suffix,
            no_check_without_suffix,
            compare_metadata,
            workers,
            retries,
            retry_delay,
            extensions,
            include_hidden,
            dry_run,
            display,
        } => {
            let mut config = ReconcileConfig::new(source, derivatives, output_root);
            if let Some(suffix) = suffix {
                config.use_suffix = true;
                config.suffix_text = suffix;
            }
            config.check_without_suffix = !no_check_without_suffix;
            config.compare_metadata = compare_metadata;
            if let Some(workers) = workers {
                config.max_workers = workers;
            }
            config.max_retries = retries;
            config.retry_delay_seconds = retry_delay;
            if !extensions.is_empty() {
                config.source_extensions = extensions
                    .iter()
                    .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                    .collect();
            }
            config.include_hidden = include_hidden;
            config.dry_run = dry_run;

            run_reconcile(config, display)
        }
        Commands::RunConfig {
            config,
            dry_run,
            display,
        } => {
            let mut config = ReconcileConfig::from_json_file(&config)?;
            config.dry_run |= dry_run;
            run_reconcile(config, display)
        }
        Commands::ClearCache {
            source,
            output_root,
        } => clear_cache(&source, &output_root),
    }
}

fn run_reconcile(config: ReconcileConfig, display: DisplayArgs) -> Result<()> {
    let term = Term::stderr();
    let pretty = matches!(display.output, OutputFormat::Pretty);

    // Print header
    if pretty {
        term.write_line(&format!(
            "{} {}",
            style("Photo Reconciler").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        if config.dry_run {
            term.write_line(&format!("{}", style("Dry run: nothing will be moved").yellow()))
                .ok();
        }
        term.write_line("").ok();
    }

    let reconciler = Reconciler::builder().config(config).build();

    // The CLI never cancels; the token is there for embedding front ends
    let token = CancellationToken::new();
    let (sender, receiver) = EventChannel::new();

    // Progress bar for pretty output
    let progress = if pretty {
        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let verbose = display.verbose;

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_position(0);
                    pb.set_message(phase.to_string());
                }
                Event::Progress { percent, .. } => pb.set_position(percent as u64),
                Event::Log { message, severity } => {
                    let line = match severity {
                        Severity::Error => format!("{} {}", style("✗").red().bold(), message),
                        Severity::Warning => format!("{} {}", style("!").yellow().bold(), message),
                        Severity::Info if verbose => format!("  {}", style(message).dim()),
                        _ => continue,
                    };
                    pb.println(line);
                }
                Event::Pipeline(PipelineEvent::Completed { .. }) => pb.finish_and_clear(),
                _ => {}
            }
        }
    });

    // Run the pipeline
    let result = reconciler.run_with_events(&sender, &token);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    let report = result?;

    // Output results
    match display.output {
        OutputFormat::Pretty => print_pretty_results(&term, &report, display.verbose),
        OutputFormat::Json => print_json_results(&report),
    }

    Ok(())
}

fn clear_cache(source: &Path, output_root: &Path) -> Result<()> {
    let term = Term::stderr();
    let cache = MetadataCache::new(source, output_root);

    let message = if cache.clear()? {
        format!("{} Removed {}", style("✓").green().bold(), display_path(cache.path()))
    } else {
        format!("No metadata cache at {}", display_path(cache.path()))
    };
    term.write_line(&message).ok();
    Ok(())
}

fn print_pretty_results(term: &Term, report: &ReconcileReport, verbose: bool) {
    let (mark, title) = if report.cancelled {
        (style("■").yellow().bold(), "Reconciliation Cancelled")
    } else {
        (style("✓").green().bold(), "Reconciliation Complete")
    };
    term.write_line("").ok();
    term.write_line(&format!("{} {}", mark, title)).ok();
    term.write_line("").ok();

    // Summary
    term.write_line(&format!(
        "  {} sources, {} derivatives in {:.1}s",
        style(report.total_sources).cyan(),
        style(report.total_derivatives).cyan(),
        report.duration_ms as f64 / 1000.0
    ))
    .ok();

    let tiers = &report.matched_by_tier;
    term.write_line(&format!(
        "  {} matched ({} exact, {} suffix stripped, {} canonical)",
        style(tiers.total()).cyan(),
        tiers.exact,
        tiers.suffix_stripped,
        tiers.canonical
    ))
    .ok();

    if report.unmatched > 0 {
        term.write_line(&format!("  {} unmatched", style(report.unmatched).yellow()))
            .ok();
    }

    if let Some(source) = report.metadata_source {
        term.write_line(&format!(
            "  {} source metadata: {:?}",
            style("•").dim(),
            source
        ))
        .ok();
    }

    let relocation = &report.relocation;
    let verb = if report.dry_run { "would move" } else { "moved" };
    term.write_line(&format!(
        "  {} {}, {} skipped, {} failed, {} folders created",
        style(relocation.moved).green(),
        verb,
        relocation.skipped,
        if relocation.failed > 0 {
            style(relocation.failed).red()
        } else {
            style(relocation.failed).dim()
        },
        relocation.folders_created
    ))
    .ok();

    if verbose {
        term.write_line("").ok();
        term.write_line(&format!("{}", style("Matches:").bold().underlined()))
            .ok();
        for result in &report.matches {
            let line = match (&result.matched_source, result.tier_used) {
                (Some(source), Some(tier)) => format!(
                    "  {} {} -> {} {}",
                    style("★").green(),
                    result.derivative.file_name,
                    source.relative_path.display(),
                    style(format!("({})", tier)).dim()
                ),
                _ => format!(
                    "  {} {}",
                    style("○").dim(),
                    display_path(&result.derivative.path)
                ),
            };
            term.write_line(&line).ok();
        }
    }

    if !relocation.errors.is_empty() {
        term.write_line("").ok();
        term.write_line(&format!("{}", style("Failures:").bold().underlined()))
            .ok();
        for error in &relocation.errors {
            term.write_line(&format!("  {} {}", style("✗").red(), error)).ok();
        }
    }

    term.write_line("").ok();
}

fn print_json_results(report: &ReconcileReport) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize report: {}", e),
    }
}

/// Abbreviate the home directory to `~`
fn display_path(path: &Path) -> String {
    let home = dirs::home_dir().unwrap_or_default();
    match path.strip_prefix(&home) {
        Ok(rest) if !home.as_os_str().is_empty() => format!("~/{}", rest.display()),
        _ => path.display().to_string(),
    }
}
