//! flatcut CLI - flat patterns for laser cutting
//!
//! Converts STEP parts to DXF/SVG/PDF drawings and rotates existing DXF
//! drawings to their smallest bounding box.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use flatcut::{
    prepare_step, run_batch_with, BatchReport, CancellationToken, Config, FileOutcome, FileReport,
    UnsupportedPolicy,
};
use flatcut_export::{ExportTarget, PageSize};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "flatcut")]
#[command(about = "Flat patterns for laser cutting", long_about = None)]
struct Cli {
    /// Log debug detail (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Common {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Output directory (default: next to each input)
    #[arg(short, long)]
    out: Option<PathBuf>,
    /// Worker threads (0 = one per core)
    #[arg(short = 'j', long)]
    threads: Option<usize>,
    /// Print the batch report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert STEP parts to flat drawings
    Convert {
        #[command(flatten)]
        common: Common,
        /// Output units: mm or in
        #[arg(short, long)]
        units: Option<flatcut::Units>,
        /// Comma-separated formats: dxf,svg,pdf
        #[arg(short, long, value_delimiter = ',')]
        formats: Option<Vec<ExportTarget>>,
        /// PDF page: letter, a4, tabloid, or WIDTHxHEIGHT in mm
        #[arg(long)]
        page: Option<PageSize>,
        /// Input .step/.stp files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Rotate DXF drawings to their smallest bounding box
    Rotate {
        #[command(flatten)]
        common: Common,
        /// Fail on entities that cannot be rotated instead of copying them
        #[arg(long)]
        reject_unsupported: bool,
        /// Input .dxf files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show what convert would do with a STEP file, without writing
    Inspect {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output units: mm or in
        #[arg(short, long)]
        units: Option<flatcut::Units>,
        /// Input .step/.stp file
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Returns whether every file succeeded.
fn run(command: Commands) -> Result<bool> {
    match command {
        Commands::Convert {
            common,
            units,
            formats,
            page,
            files,
        } => {
            let mut config = load_config(common.config.as_deref())?;
            apply_common(&mut config, &common);
            if let Some(units) = units {
                config.units = units;
            }
            if let Some(formats) = formats {
                config.formats = formats;
            }
            if let Some(page) = page {
                config.pdf.page = page;
            }
            batch(&files, &config, common.json)
        }
        Commands::Rotate {
            common,
            reject_unsupported,
            files,
        } => {
            let mut config = load_config(common.config.as_deref())?;
            apply_common(&mut config, &common);
            if reject_unsupported {
                config.rotator.unsupported = UnsupportedPolicy::Reject;
            }
            batch(&files, &config, common.json)
        }
        Commands::Inspect {
            config,
            units,
            file,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(units) = units {
                config.units = units;
            }
            inspect(&file, &config)?;
            Ok(true)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn apply_common(config: &mut Config, common: &Common) {
    if let Some(out) = &common.out {
        config.output_dir = Some(out.clone());
    }
    if let Some(threads) = common.threads {
        config.threads = threads;
    }
}

fn batch(files: &[PathBuf], config: &Config, json: bool) -> Result<bool> {
    let cancel = CancellationToken::new();
    let report = run_batch_with(files, config, &cancel, |file, done, total| {
        if !json {
            println!("[{done}/{total}] {}", status_line(file));
        }
    })?;

    if json {
        println!("{}", report.to_json()?);
    } else {
        print_summary(&report);
    }
    Ok(!report.has_failures())
}

fn status_line(file: &FileReport) -> String {
    let name = file.input.display();
    match &file.outcome {
        FileOutcome::Succeeded { outputs, summary } => {
            let written: Vec<String> = outputs
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect();
            match summary {
                Some(s) => format!("ok   {name}: {} -> {}", s.describe(), written.join(", ")),
                None => format!("ok   {name} -> {}", written.join(", ")),
            }
        }
        FileOutcome::Failed { kind, message } => format!("FAIL {name}: {kind}: {message}"),
        FileOutcome::Skipped { reason } => format!("skip {name}: {reason}"),
    }
}

fn print_summary(report: &BatchReport) {
    println!(
        "\n{} succeeded, {} failed, {} skipped",
        report.succeeded(),
        report.failed(),
        report.skipped()
    );
    for file in &report.files {
        if let FileOutcome::Failed { kind, .. } = &file.outcome {
            println!("  {kind}: {}", file.input.display());
        }
    }
}

fn inspect(file: &Path, config: &Config) -> Result<()> {
    config.validate()?;
    let part = prepare_step(file, config)?;
    let s = &part.summary;
    let bb = part.outline.bbox();

    println!("{}", file.display());
    println!("  Body: {} ({} in file, {})", s.solid, s.solids, s.source_unit);
    println!("  Axis: {} ({})", s.axis, s.axis_reason);
    println!("  Thickness: {:.4} {}", s.thickness, s.units);
    println!("  Rotation: {:.3} deg", s.angle_deg);
    println!("  Size: {:.4} x {:.4} {}", bb.width(), bb.height(), s.units);
    println!("  Loops: 1 outer, {} holes", s.holes);
    println!("  Segments: {} ({} arcs)", s.segments, s.arcs);
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
