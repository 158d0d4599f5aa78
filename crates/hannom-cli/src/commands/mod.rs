//! Subcommands and the input handling they share.

pub mod batch;
pub mod config;
pub mod crop;
pub mod drawing;
pub mod order;

use std::fs;
use std::path::{Path, PathBuf};

use console::style;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use hannom_core::{BoundingBox, CanvasDrawing, Detection, HannomConfig};

/// Box lists accepted on the command line.
#[derive(Deserialize)]
#[serde(untagged)]
enum BoxList {
    /// Boxes as four `[x, y]` corners.
    Boxes(Vec<BoundingBox>),
    /// Boxes as eight flat coordinates.
    Flat(Vec<[f32; 8]>),
    /// Detector output.
    Detections(Vec<Detection>),
}

/// Box files accepted on the command line.
enum BoxInput {
    /// Drawing saved from the box editor.
    Drawing(CanvasDrawing),
    List(BoxList),
}

/// Boxes read from a file, plus the canvas rectangles that could not be used.
pub struct LoadedBoxes {
    pub boxes: Vec<BoundingBox>,
    pub rejected: Vec<String>,
}

/// Read boxes from a JSON file in any of the accepted layouts.
pub fn load_boxes(path: &Path) -> anyhow::Result<LoadedBoxes> {
    if !path.exists() {
        anyhow::bail!("Box file not found: {}", path.display());
    }

    let content = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("{} is not valid JSON: {}", path.display(), e))?;

    // Objects are drawings, arrays are box lists
    let input = if value.is_object() {
        let drawing = CanvasDrawing::deserialize(value).map_err(|e| {
            anyhow::anyhow!("{} is not a valid canvas drawing: {}", path.display(), e)
        })?;
        BoxInput::Drawing(drawing)
    } else {
        let list = BoxList::deserialize(value).map_err(|e| {
            debug!("Box list in {} did not parse: {}", path.display(), e);
            anyhow::anyhow!(
                "{} is neither a canvas drawing nor a list of boxes",
                path.display()
            )
        })?;
        BoxInput::List(list)
    };

    let loaded = match input {
        BoxInput::Drawing(drawing) => {
            let mut boxes = Vec::new();
            let mut rejected = Vec::new();
            for (i, converted) in drawing.to_boxes().into_iter().enumerate() {
                match converted {
                    Ok(bbox) => boxes.push(bbox),
                    Err(e) => rejected.push(format!("canvas rectangle {}: {}", i + 1, e)),
                }
            }
            LoadedBoxes { boxes, rejected }
        }
        BoxInput::List(BoxList::Boxes(boxes)) => LoadedBoxes {
            boxes,
            rejected: Vec::new(),
        },
        BoxInput::List(BoxList::Flat(coords)) => LoadedBoxes {
            boxes: coords.into_iter().map(BoundingBox::from_flat).collect(),
            rejected: Vec::new(),
        },
        BoxInput::List(BoxList::Detections(detections)) => LoadedBoxes {
            boxes: detections.into_iter().map(|d| d.bbox).collect(),
            rejected: Vec::new(),
        },
    };

    debug!(
        "Loaded {} boxes from {} ({} rejected)",
        loaded.boxes.len(),
        path.display(),
        loaded.rejected.len()
    );

    Ok(loaded)
}

/// Print rejected canvas rectangles to stderr.
pub fn report_rejected(rejected: &[String]) {
    for reason in rejected {
        eprintln!("{} Skipping {}", style("⚠").yellow(), reason);
    }
}

/// Per-user configuration file written by `hannom config`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hannom")
        .join("config.json")
}

/// Load the configuration named on the command line, else the per-user file
/// if it exists, else the defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<HannomConfig> {
    if let Some(path) = config_path {
        return Ok(HannomConfig::from_file(Path::new(path))?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using configuration from {}", default_path.display());
        Ok(HannomConfig::from_file(&default_path)?)
    } else {
        Ok(HannomConfig::default())
    }
}

/// Write `content` to `output`, or to stdout when no path is given.
pub fn write_output(output: Option<&Path>, content: &str) -> anyhow::Result<()> {
    if let Some(output_path) = output {
        fs::write(output_path, content)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", content);
    }
    Ok(())
}
