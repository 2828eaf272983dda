//! Batch extraction command for multiple receipts.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use recap_core::extraction::ReceiptParser;
use recap_core::models::config::RecapConfig;
use recap_core::{ExtractedFields, ImageRef, PureOcrRecognizer};

use super::extract::format_fields;
use super::{OutputFormat, load_config};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern (text files, or images when OCR models are installed)
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

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct BatchResult {
    path: PathBuf,
    fields: Option<ExtractedFields>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_text(p) || is_image(p))
        .collect();

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

    let parser = ReceiptParser::from_config(&config.extraction);
    let mut ocr: Option<PureOcrRecognizer> = None;
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        let file_start = Instant::now();
        let outcome = read_text(&path, &config, &mut ocr).map(|text| parser.extract(&text));
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        match outcome {
            Ok(fields) => results.push(BatchResult {
                path,
                fields: Some(fields),
                error: None,
                processing_time_ms,
            }),
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(BatchResult {
                        path,
                        fields: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    pb.abandon();
                    anyhow::bail!("Processing failed: {}", error_msg);
                }
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    let successful: Vec<_> = results.iter().filter(|r| r.fields.is_some()).collect();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    if let Some(output_dir) = &args.output_dir {
        for result in &successful {
            if let Some(fields) = &result.fields {
                let output_name = result
                    .path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("receipt");
                let output_path =
                    output_dir.join(format!("{}.{}", output_name, args.format.extension()));

                fs::write(&output_path, format_fields(fields, args.format)?)?;
                debug!("Wrote output to {}", output_path.display());
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

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn is_text(path: &Path) -> bool {
    matches!(extension(path).as_str(), "txt" | "text")
}

fn is_image(path: &Path) -> bool {
    matches!(
        extension(path).as_str(),
        "png" | "jpg" | "jpeg" | "webp" | "tiff" | "tif" | "bmp"
    )
}

/// Get recognized text for a file, loading the OCR engine on first use.
fn read_text(
    path: &Path,
    config: &RecapConfig,
    ocr: &mut Option<PureOcrRecognizer>,
) -> anyhow::Result<String> {
    if is_text(path) {
        return Ok(fs::read_to_string(path)?);
    }

    if ocr.is_none() {
        if !config.ocr.models_present() {
            anyhow::bail!(
                "OCR models not found in {}",
                config.ocr.model_dir.display()
            );
        }
        *ocr = Some(PureOcrRecognizer::from_config(config.ocr.clone())?);
    }

    match ocr.as_ref() {
        Some(engine) => {
            let text = engine.recognize_text(&ImageRef::from(path.to_path_buf()))?;
            if text.trim().is_empty() {
                anyhow::bail!("No text detected in image");
            }
            Ok(text)
        }
        None => anyhow::bail!("OCR engine unavailable"),
    }
}

fn write_summary(path: &Path, results: &[BatchResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "vendor_name",
        "transaction_date",
        "total_amount",
        "card_last_four",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();

        let record = match &result.fields {
            Some(fields) => [
                filename,
                "success".to_string(),
                fields.vendor_name.clone().unwrap_or_default(),
                fields
                    .transaction_date
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                fields
                    .total_amount
                    .map(|a| a.to_string())
                    .unwrap_or_default(),
                fields.card_last_four.clone().unwrap_or_default(),
                result.processing_time_ms.to_string(),
                String::new(),
            ],
            None => [
                filename,
                "error".to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                result.processing_time_ms.to_string(),
                result.error.clone().unwrap_or_default(),
            ],
        };
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}
