//! Drawing command - build the initial editor drawing for detected boxes.

use std::path::PathBuf;

use clap::Args;
use tracing::{info, warn};

use hannom_core::{BoundingBox, CanvasDrawing};

use super::{load_boxes, load_config, report_rejected, write_output};

/// Arguments for the drawing command.
#[derive(Args)]
pub struct DrawingArgs {
    /// Detector output or box list (JSON)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print the drawing
    #[arg(long)]
    pretty: bool,
}

pub async fn run(args: DrawingArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let loaded = load_boxes(&args.input)?;
    report_rejected(&loaded.rejected);

    let boxes: Vec<BoundingBox> = loaded
        .boxes
        .into_iter()
        .filter(|bbox| match bbox.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!("Dropping box: {}", e);
                false
            }
        })
        .collect();

    let drawing = CanvasDrawing::from_boxes(&boxes, &config.canvas);
    info!("Drawing has {} rectangles", drawing.objects.len());

    let output = if args.pretty {
        serde_json::to_string_pretty(&drawing)?
    } else {
        drawing.to_json()?
    };

    write_output(args.output.as_deref(), &output)
}
