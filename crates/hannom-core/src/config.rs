//! Configuration structures for the digitization pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::canvas::CanvasStyle;
use crate::error::{HannomError, Result};
use crate::geometry::{PatchExtractor, ReadingLayout, ReadingOrder};

/// Main configuration for hannom.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HannomConfig {
    /// Box geometry configuration.
    pub geometry: GeometryConfig,

    /// Styling of generated canvas drawings.
    pub canvas: CanvasStyle,

    /// Pipeline configuration.
    pub pipeline: PipelineConfig,
}

/// Box geometry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Page layout used for reading order.
    pub layout: ReadingLayout,

    /// Right edges closer than this (pixels) belong to the same column.
    pub column_tolerance: f32,

    /// Top edges closer than this (pixels) belong to the same row.
    pub row_tolerance: f32,

    /// Boxes within this many pixels of a parallelogram use an affine de-skew.
    pub parallelogram_tolerance: f32,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            layout: ReadingLayout::VerticalRtl,
            column_tolerance: 1.0,
            row_tolerance: 20.0,
            parallelogram_tolerance: 0.5,
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Detections scoring below this are dropped (0.0 keeps everything).
    pub min_detection_score: f32,

    /// Run configured translators on recognized text.
    pub translate: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_detection_score: 0.0,
            translate: true,
        }
    }
}

impl HannomConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values no component can work with.
    pub fn validate(&self) -> Result<()> {
        let geometry = &self.geometry;
        for (name, value) in [
            ("geometry.column_tolerance", geometry.column_tolerance),
            ("geometry.row_tolerance", geometry.row_tolerance),
            ("geometry.parallelogram_tolerance", geometry.parallelogram_tolerance),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(HannomError::Config(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.pipeline.min_detection_score) {
            return Err(HannomError::Config(format!(
                "pipeline.min_detection_score must be within 0.0 - 1.0, got {}",
                self.pipeline.min_detection_score
            )));
        }

        Ok(())
    }

    /// Reading order described by this configuration.
    pub fn reading_order(&self) -> ReadingOrder {
        ReadingOrder::new()
            .with_layout(self.geometry.layout)
            .with_column_tolerance(self.geometry.column_tolerance)
            .with_row_tolerance(self.geometry.row_tolerance)
    }

    /// Patch extractor described by this configuration.
    pub fn patch_extractor(&self) -> PatchExtractor {
        PatchExtractor::new().with_parallelogram_tolerance(self.geometry.parallelogram_tolerance)
    }
}
