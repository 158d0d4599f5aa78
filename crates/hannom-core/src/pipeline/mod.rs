//! Page transcription pipeline.
//!
//! Detection, recognition and translation are provided by external models and
//! services. They plug in through the traits below; this module only moves
//! boxes and patches between them.

mod digitizer;

pub use digitizer::{Digitizer, DigitizerBuilder};

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::geometry::BoundingBox;

/// Text detection model: proposes text boxes for a page.
pub trait PageDetector: Send + Sync {
    /// Detect text regions on a whole page.
    fn predict_one_page(&self, image: &RgbImage) -> Result<Vec<Detection>, PipelineError>;
}

/// Text recognition model: transcribes one patch.
pub trait PatchRecognizer: Send + Sync {
    /// Recognize the text in a single patch.
    fn predict_one_patch(&self, patch: &RgbImage) -> Result<String, PipelineError>;
}

/// Translation or dictionary service applied to recognized text.
pub trait Translator: Send + Sync {
    /// Short service name shown next to its output.
    fn name(&self) -> &str;

    /// Translate or render `text`.
    fn translate(&self, text: &str) -> Result<String, PipelineError>;
}

/// A box proposed by the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Detected region.
    pub bbox: BoundingBox,

    /// Detection confidence (0.0 - 1.0), if the model reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl Detection {
    pub fn new(bbox: BoundingBox) -> Self {
        Self { bbox, score: None }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }
}

/// Output of one translator for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    /// Service name.
    pub service: String,

    /// Translated text, when the service succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Failure description, when the service failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A recognized region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscribedRegion {
    /// Position in reading order, starting at 1.
    pub position: usize,

    /// Region on the page.
    pub bbox: BoundingBox,

    /// Recognized text.
    pub text: String,

    /// Translator outputs, in translator order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub translations: Vec<Translation>,
}

/// A region that could not be transcribed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRegion {
    /// Position in reading order, if the region got that far.
    pub position: Option<usize>,

    /// Region on the page, if it could be built.
    pub bbox: Option<BoundingBox>,

    /// Why the region was skipped.
    pub reason: String,
}

/// Transcription of a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageTranscript {
    /// Content key of the page image.
    pub page_key: String,

    /// Image dimensions (width, height).
    pub image_size: (u32, u32),

    /// Transcribed regions in reading order.
    pub regions: Vec<TranscribedRegion>,

    /// Regions that failed, with reasons.
    pub skipped: Vec<SkippedRegion>,

    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

impl PageTranscript {
    /// Full text (region texts joined with newlines, in reading order).
    pub fn text(&self) -> String {
        self.regions
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}
