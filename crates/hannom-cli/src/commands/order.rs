//! Order command - print boxes in reading order.

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use hannom_core::BoundingBox;

use super::{load_boxes, load_config, report_rejected, write_output};

/// Arguments for the order command.
#[derive(Args)]
pub struct OrderArgs {
    /// Canvas drawing or box list (JSON)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON array of boxes
    Json,
    /// One row of flat coordinates per box
    Csv,
    /// Numbered plain text
    Text,
}

pub async fn run(args: OrderArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let loaded = load_boxes(&args.input)?;
    report_rejected(&loaded.rejected);

    let ordered = config.reading_order().order(&loaded.boxes);
    info!(
        "Ordered {} boxes ({:?})",
        ordered.len(),
        config.geometry.layout
    );

    let output = format_boxes(&ordered, args.format)?;
    write_output(args.output.as_deref(), &output)
}

fn format_boxes(boxes: &[BoundingBox], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(boxes)?),
        OutputFormat::Csv => format_csv(boxes),
        OutputFormat::Text => Ok(format_text(boxes)),
    }
}

fn format_csv(boxes: &[BoundingBox]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["index", "x1", "y1", "x2", "y2", "x3", "y3", "x4", "y4"])?;

    for (i, bbox) in boxes.iter().enumerate() {
        let mut record = vec![(i + 1).to_string()];
        record.extend(bbox.to_flat().iter().map(|c| c.to_string()));
        wtr.write_record(&record)?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(boxes: &[BoundingBox]) -> String {
    let mut output = String::new();

    for (i, bbox) in boxes.iter().enumerate() {
        let corners: Vec<String> = bbox
            .points
            .iter()
            .map(|p| format!("({}, {})", p.x, p.y))
            .collect();
        output.push_str(&format!("{:>3}. {}\n", i + 1, corners.join(" ")));
    }

    output
}
