//! Batch command - crop patches for many pages.

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

use hannom_core::HannomConfig;

use super::crop::{Manifest, crop_page};
use super::load_config;

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern for page images; each needs a sibling <stem>.json
    #[arg(required = true)]
    input: String,

    /// Output directory (one sub-directory per page)
    #[arg(short, long, default_value = "patches")]
    output_dir: PathBuf,

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

/// Result of processing a single page.
struct PageResult {
    path: PathBuf,
    manifest: Option<Manifest>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = Arc::new(load_config(config_path)?);

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            matches!(
                ext.to_lowercase().as_str(),
                "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" | "webp"
            )
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching images found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} pages to process",
        style("ℹ").blue(),
        files.len()
    );

    fs::create_dir_all(&args.output_dir)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages")?
            .progress_chars("=>-"),
    );

    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));
    let mut tasks = JoinSet::new();

    for (i, path) in files.into_iter().enumerate() {
        let permit = semaphore.clone().acquire_owned().await?;
        let config = Arc::clone(&config);
        let output_dir = page_output_dir(&args.output_dir, &path);

        tasks.spawn_blocking(move || {
            let _permit = permit;
            let page_start = Instant::now();
            let result = process_page(&path, &output_dir, &config);
            (i, path, result, page_start.elapsed().as_millis() as u64)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (i, path, result, processing_time_ms) = joined?;

        match result {
            Ok(manifest) => results.push((
                i,
                PageResult {
                    path,
                    manifest: Some(manifest),
                    error: None,
                    processing_time_ms,
                },
            )),
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push((
                        i,
                        PageResult {
                            path,
                            manifest: None,
                            error: Some(error_msg),
                            processing_time_ms,
                        },
                    ));
                } else {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    tasks.abort_all();
                    pb.abandon();
                    anyhow::bail!("Processing {} failed: {}", path.display(), error_msg);
                }
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    results.sort_by_key(|(i, _)| *i);
    let results: Vec<PageResult> = results.into_iter().map(|(_, r)| r).collect();

    if args.summary {
        let summary_path = args.output_dir.join("summary.csv");
        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let successful: Vec<_> = results.iter().filter(|r| r.manifest.is_some()).collect();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();
    let patches: usize = successful
        .iter()
        .filter_map(|r| r.manifest.as_ref())
        .map(Manifest::written)
        .sum();

    println!();
    println!(
        "{} Processed {} pages in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed, {} patches written",
        style(successful.len()).green(),
        style(failed.len()).red(),
        patches
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed pages:").red());
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

/// `<output_dir>/<image stem>`.
fn page_output_dir(output_dir: &Path, image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("page");
    output_dir.join(stem)
}

fn process_page(
    image: &Path,
    output_dir: &Path,
    config: &HannomConfig,
) -> anyhow::Result<Manifest> {
    let boxes = image.with_extension("json");
    if !boxes.exists() {
        anyhow::bail!("No box file {} next to the image", boxes.display());
    }

    let manifest = crop_page(image, &boxes, output_dir, config)?;
    debug!(
        "{}: {} patches, {} skipped",
        image.display(),
        manifest.written(),
        manifest.failed()
    );
    Ok(manifest)
}

fn write_summary(path: &Path, results: &[PageResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "page_key",
        "patches",
        "skipped",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        if let Some(manifest) = &result.manifest {
            wtr.write_record([
                filename,
                "success",
                &manifest.page_key,
                &manifest.written().to_string(),
                &manifest.failed().to_string(),
                &result.processing_time_ms.to_string(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                &result.processing_time_ms.to_string(),
                result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
