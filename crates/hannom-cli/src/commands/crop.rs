//! Crop command - cut the patch under every box out of a page image.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::{debug, info, warn};

use hannom_core::{BoundingBox, HannomConfig, page_key};

use super::{load_boxes, load_config, report_rejected};

/// Arguments for the crop command.
#[derive(Args)]
pub struct CropArgs {
    /// Page image
    #[arg(required = true)]
    image: PathBuf,

    /// Canvas drawing or box list (JSON)
    #[arg(required = true)]
    boxes: PathBuf,

    /// Output directory for patches and manifest.json
    #[arg(short, long, default_value = "patches")]
    output_dir: PathBuf,
}

/// One entry of `manifest.json`.
#[derive(Debug, Serialize)]
pub struct ManifestEntry {
    /// Position in reading order, starting at 1.
    pub index: usize,
    pub bbox: BoundingBox,
    /// Patch file name, when the box could be cropped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `manifest.json` written next to the patches of a page.
#[derive(Debug, Serialize)]
pub struct Manifest {
    pub image: String,
    pub page_key: String,
    pub image_size: (u32, u32),
    pub patches: Vec<ManifestEntry>,
    /// Canvas rectangles that did not form a box.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<String>,
}

impl Manifest {
    pub fn written(&self) -> usize {
        self.patches.iter().filter(|p| p.file.is_some()).count()
    }

    pub fn failed(&self) -> usize {
        self.patches.len() - self.written() + self.rejected.len()
    }
}

pub async fn run(args: CropArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let manifest = crop_page(&args.image, &args.boxes, &args.output_dir, &config)?;
    report_rejected(&manifest.rejected);

    for entry in &manifest.patches {
        if let Some(error) = &entry.error {
            eprintln!("{} Box {}: {}", style("⚠").yellow(), entry.index, error);
        }
    }

    println!(
        "{} Wrote {} patches to {} in {:?}",
        style("✓").green(),
        manifest.written(),
        args.output_dir.display(),
        start.elapsed()
    );

    if manifest.failed() > 0 {
        println!(
            "   {} boxes skipped, see {}",
            style(manifest.failed()).red(),
            args.output_dir.join("manifest.json").display()
        );
    }

    Ok(())
}

/// Crop every box of one page into `output_dir` and write its manifest.
///
/// Boxes that cannot be cropped are recorded in the manifest; only I/O and
/// decoding problems fail the page.
pub fn crop_page(
    image_path: &Path,
    boxes_path: &Path,
    output_dir: &Path,
    config: &HannomConfig,
) -> anyhow::Result<Manifest> {
    if !image_path.exists() {
        anyhow::bail!("Image not found: {}", image_path.display());
    }

    info!("Cropping {}", image_path.display());

    let loaded = load_boxes(boxes_path)?;
    let image = image::open(image_path)?.to_rgb8();

    let ordered = config.reading_order().order(&loaded.boxes);
    let patches = config.patch_extractor().extract_all(&image, &ordered);

    fs::create_dir_all(output_dir)?;

    let mut entries = Vec::with_capacity(ordered.len());
    for (i, (bbox, patch)) in ordered.iter().zip(patches).enumerate() {
        let index = i + 1;
        let entry = match patch {
            Ok(patch) => {
                let file = format!("patch_{:02}.png", index);
                patch.save(output_dir.join(&file))?;
                debug!("Wrote {} ({}x{})", file, patch.width(), patch.height());
                ManifestEntry {
                    index,
                    bbox: *bbox,
                    file: Some(file),
                    error: None,
                }
            }
            Err(e) => {
                warn!("Box {} of {}: {}", index, image_path.display(), e);
                ManifestEntry {
                    index,
                    bbox: *bbox,
                    file: None,
                    error: Some(e.to_string()),
                }
            }
        };
        entries.push(entry);
    }

    let manifest = Manifest {
        image: image_path.display().to_string(),
        page_key: page_key(&image),
        image_size: image.dimensions(),
        patches: entries,
        rejected: loaded.rejected,
    };

    fs::write(
        output_dir.join("manifest.json"),
        serde_json::to_string_pretty(&manifest)?,
    )?;

    Ok(manifest)
}
