use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use ocr_table_grid::{
    DEFAULT_COLUMN_TOLERANCE, DEFAULT_ROW_TOLERANCE, Fragment, HeaderException, PageRuling,
    PageSelection, QualityMode, ReconstructOptions, ReconstructionReport, ReplacementTable,
    TableRegion, ValueRecord, reconstruct, retain_confident, write_csv, write_json,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "tablegrid",
    version,
    about = "Rebuild table structure from OCR text fragments"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Reconstruct tables and write one record per numeric value.
    Reconstruct(ReconstructArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[derive(Debug, Args)]
struct ReconstructArgs {
    /// JSON array of OCR fragments.
    #[arg(short, long)]
    input: PathBuf,

    /// JSON array of per-page ruling lines.
    #[arg(long)]
    lines: Option<PathBuf>,

    /// Output path.
    #[arg(short, long)]
    output: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// CSV delimiter character.
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Page selection like 1-3,5.
    #[arg(long)]
    pages: Option<String>,

    /// Table region in format page:x1,y1,x2,y2. Repeatable.
    #[arg(long = "region")]
    regions: Vec<String>,

    /// OCR miscue replacements like Colt=Col1,Col4a=Col4A.
    #[arg(long)]
    replace: Option<String>,

    /// Extra noise token to drop. Repeatable.
    #[arg(long = "noise")]
    noise: Vec<String>,

    /// Row clustering tolerance in pixels.
    #[arg(long, default_value_t = DEFAULT_ROW_TOLERANCE)]
    row_tolerance: f64,

    /// Column clustering tolerance in pixels.
    #[arg(long, default_value_t = DEFAULT_COLUMN_TOLERANCE)]
    column_tolerance: f64,

    /// Drop fragments whose OCR confidence is below this value.
    #[arg(long, default_value_t = 40.0)]
    min_confidence: f32,

    /// Fail on low-confidence tables instead of exporting them.
    #[arg(long, conflicts_with = "skip_ambiguous")]
    strict: bool,

    /// Leave low-confidence tables out of the output.
    #[arg(long, conflicts_with = "strict")]
    skip_ambiguous: bool,

    /// Clear row headers of values on rows without a label of their own.
    #[arg(long)]
    unlabeled_rows: bool,

    /// Process regions one at a time.
    #[arg(long)]
    sequential: bool,

    /// Enable verbose warning output.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_options(args: &ReconstructArgs) -> Result<ReconstructOptions> {
    let pages = args
        .pages
        .as_deref()
        .map(PageSelection::from_str)
        .transpose()
        .map_err(|error| anyhow!("invalid page selection: {error}"))
        .context("failed to parse --pages")?;

    let regions = args
        .regions
        .iter()
        .map(|value| {
            TableRegion::from_str(value)
                .map_err(|error| anyhow!("invalid table region: {error}"))
                .with_context(|| format!("failed to parse --region '{value}'"))
        })
        .collect::<Result<Vec<_>>>()?;

    let replacements = args
        .replace
        .as_deref()
        .map(ReplacementTable::from_str)
        .transpose()
        .map_err(|error| anyhow!("invalid replacement table: {error}"))
        .context("failed to parse --replace")?
        .unwrap_or_default();

    let quality_mode = if args.strict {
        QualityMode::Strict
    } else if args.skip_ambiguous {
        QualityMode::SkipAmbiguous
    } else {
        QualityMode::BestEffort
    };

    let exceptions = if args.unlabeled_rows {
        vec![HeaderException::unlabeled_rows()]
    } else {
        Vec::new()
    };

    Ok(ReconstructOptions {
        row_tolerance: args.row_tolerance,
        column_tolerance: args.column_tolerance,
        pages,
        regions,
        replacements,
        extra_noise_tokens: args.noise.clone(),
        exceptions,
        quality_mode,
        parallel: !args.sequential,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse '{}'", path.display()))
}

fn write_output(args: &ReconstructArgs, records: &[ValueRecord]) -> Result<()> {
    match args.format {
        OutputFormat::Json => write_json(&args.output, records),
        OutputFormat::Csv => {
            if !args.delimiter.is_ascii() {
                anyhow::bail!("delimiter must be a single ASCII character");
            }
            write_csv(&args.output, records, args.delimiter as u8)
        }
    }
    .with_context(|| format!("failed to write '{}'", args.output.display()))
}

fn log_report(report: &ReconstructionReport, verbose: bool) {
    if report.warnings.is_empty() {
        return;
    }

    eprintln!("warning: {} issue(s) detected", report.warnings.len());
    if verbose {
        for warning in &report.warnings {
            eprintln!("  - {warning}");
        }
    }
}

fn run_reconstruct(args: &ReconstructArgs) -> Result<ReconstructionReport> {
    let options = parse_options(args)?;
    let fragments: Vec<Fragment> = read_json(&args.input)?;
    let fragments = retain_confident(fragments, args.min_confidence);
    let rulings: Vec<PageRuling> = args
        .lines
        .as_deref()
        .map(read_json::<Vec<PageRuling>>)
        .transpose()?
        .unwrap_or_default();

    let (records, report) = reconstruct(&fragments, &rulings, &options)
        .with_context(|| format!("failed to reconstruct tables from '{}'", args.input.display()))?;
    write_output(args, &records)?;
    Ok(report)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let Commands::Reconstruct(args) = cli.command;

    let default_filter = if args.verbose {
        "ocr_table_grid=debug"
    } else {
        "ocr_table_grid=warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    match run_reconstruct(&args) {
        Ok(report) => {
            log_report(&report, args.verbose);
            if report.value_count > 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
