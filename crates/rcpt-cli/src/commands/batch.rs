//! Batch command - extract fields from many receipts concurrently.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use rcpt_core::{ExtractionEngine, ExtractionResult, FieldKind, FieldValue};

use super::extract::{OutputFormat, format_result};
use super::{InputReader, load_config};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching the input files
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Outcome for a single file.
struct FileResult {
    path: PathBuf,
    result: Option<ExtractionResult>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;
    let engine = Arc::new(ExtractionEngine::new(&config.extraction)?);
    let reader = InputReader::new(&config);

    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file() && reader.supports(p))
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let mut results: Vec<Option<FileResult>> = Vec::with_capacity(files.len());
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));
    let mut tasks = JoinSet::new();

    // Inputs are read here in order; extraction fans out over the shared engine.
    for (index, path) in files.into_iter().enumerate() {
        let read_start = Instant::now();
        let text = match reader.read_path(&path) {
            Ok(text) => text,
            Err(e) => {
                let error_msg = e.to_string();
                if !args.continue_on_error {
                    error!("Failed to read {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed: {}", error_msg);
                }
                warn!("Failed to read {}: {}", path.display(), error_msg);
                results.push(Some(FileResult {
                    path,
                    result: None,
                    error: Some(error_msg),
                    processing_time_ms: read_start.elapsed().as_millis() as u64,
                }));
                pb.inc(1);
                continue;
            }
        };
        results.push(None);

        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        let engine = Arc::clone(&engine);
        tasks.spawn_blocking(move || {
            let result = engine.extract(&text);
            drop(permit);
            (
                index,
                FileResult {
                    path,
                    result: Some(result),
                    error: None,
                    processing_time_ms: read_start.elapsed().as_millis() as u64,
                },
            )
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (index, file_result) = joined?;
        results[index] = Some(file_result);
        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    let results: Vec<FileResult> = results.into_iter().flatten().collect();

    if let Some(output_dir) = &args.output_dir {
        for file_result in &results {
            if let Some(result) = &file_result.result {
                write_output(output_dir, file_result, result, &args, &config.output)?;
            }
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let successful = results.iter().filter(|r| r.result.is_some()).count();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for file_result in &failed {
            println!(
                "  - {}: {}",
                file_result.path.display(),
                file_result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn write_output(
    output_dir: &Path,
    file_result: &FileResult,
    result: &ExtractionResult,
    args: &BatchArgs,
    options: &rcpt_core::models::config::OutputConfig,
) -> anyhow::Result<()> {
    let output_name = file_result
        .path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("receipt");

    let output_path = output_dir.join(format!("{}.{}", output_name, args.format.extension()));
    fs::write(&output_path, format_result(result, args.format, options)?)?;
    debug!("Wrote output to {}", output_path.display());

    Ok(())
}

fn write_summary(path: &Path, results: &[FileResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "amount",
        "currency",
        "date",
        "shop_name",
        "invoice_number",
        "payment_method",
        "fields",
        "failures",
        "processing_time_ms",
        "error",
    ])?;

    for file_result in results {
        let filename = file_result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        if let Some(result) = &file_result.result {
            let money = result.get(FieldKind::Amount.as_str()).and_then(FieldValue::as_money);
            let text = |kind: FieldKind| {
                result
                    .get(kind.as_str())
                    .and_then(FieldValue::as_text)
                    .unwrap_or_default()
                    .to_string()
            };

            wtr.write_record([
                filename,
                "success",
                &money.map(|m| m.amount.to_string()).unwrap_or_default(),
                &money
                    .and_then(|m| m.currency.as_ref())
                    .map(|c| c.to_string())
                    .unwrap_or_default(),
                &text(FieldKind::Date),
                &text(FieldKind::ShopName),
                &text(FieldKind::InvoiceNumber),
                &text(FieldKind::PaymentMethod),
                &result.len().to_string(),
                &result.failures.len().to_string(),
                &file_result.processing_time_ms.to_string(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                &file_result.processing_time_ms.to_string(),
                file_result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
