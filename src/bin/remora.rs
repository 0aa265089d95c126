//! Binary entry point for the index consistency repair driver.
#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::error;
use tracing_subscriber::EnvFilter;

use remora::paths::{ensure_store_root, IndexPaths};
use remora::repair::{IndexRepair, ScanReport};

#[derive(Parser, Debug)]
#[command(
    name = "remora",
    version,
    about = "Scans the full-text index segments of a graph store for documents missing the _id_ field"
)]
struct Cli {
    /// Path to the graph store root (must contain the store metadata file).
    #[arg(value_name = "STORE_ROOT")]
    store_root: PathBuf,

    /// Deletion policy: "true" or "repair" (case-insensitive) tombstones
    /// damaged documents; anything else or absent scans report-only.
    #[arg(value_name = "POLICY")]
    policy: Option<String>,

    /// Output format for per-segment reports.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = ensure_store_root(&cli.store_root) {
        eprintln!("{err}");
        return ExitCode::from(1);
    }

    let delete_damaged = cli
        .policy
        .as_deref()
        .is_some_and(|policy| {
            policy.eq_ignore_ascii_case("true") || policy.eq_ignore_ascii_case("repair")
        });

    println!(
        "starting scan in store {}",
        cli.store_root.display()
    );
    if delete_damaged {
        println!("repair option set: documents without the id field will be deleted");
    }

    let paths = IndexPaths::from_root(&cli.store_root);
    let segments = match collect_segments(&paths) {
        Ok(segments) => segments,
        Err(err) => {
            eprintln!("failed to enumerate index directories: {err}");
            return ExitCode::from(1);
        }
    };

    let mut reports = Vec::new();
    let mut failed = 0usize;
    for segment in &segments {
        match scan_segment(segment, delete_damaged) {
            Ok(report) => reports.push(report),
            Err(err) => {
                error!(segment = %segment.display(), %err, "repair.scan.failed");
                eprintln!("segment {} failed: {err}", segment.display());
                failed += 1;
            }
        }
    }

    match cli.format {
        OutputFormat::Json => match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("failed to serialize reports: {err}");
                failed += 1;
            }
        },
        OutputFormat::Text => {
            for report in &reports {
                print_report_text(report);
            }
            let damaged: u64 = reports.iter().map(ScanReport::damaged_count).sum();
            let scanned: u64 = reports.iter().map(|r| r.scanned_docs).sum();
            println!(
                "done: {} segments, {scanned} documents scanned, {damaged} damaged, {failed} failed",
                reports.len()
            );
        }
    }

    if failed > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn collect_segments(paths: &IndexPaths) -> remora::Result<Vec<PathBuf>> {
    let mut segments = paths.node_indexes()?;
    segments.extend(paths.relationship_indexes()?);
    Ok(segments)
}

fn scan_segment(segment: &Path, delete_damaged: bool) -> remora::Result<ScanReport> {
    let mut repair = IndexRepair::open(segment)?;
    repair.set_delete_damaged(delete_damaged);
    Ok(repair.scan()?.clone())
}

fn print_report_text(report: &ScanReport) {
    println!(
        "segment {}: scanned={} damaged={} skipped_deleted={} deleted={}",
        report.segment,
        report.scanned_docs,
        report.damaged_count(),
        report.skipped_deleted,
        report.deleted
    );
}
