//! Core library for digitizing handwritten Han-Nom document pages.
//!
//! This crate provides:
//! - Box geometry (canvas rectangles to boxes, reading order, patch extraction)
//! - Canvas drawings exchanged with the interactive box editor
//! - Page keys for tracking a page image across edits
//! - A transcription pipeline over pluggable detection, recognition and
//!   translation collaborators

pub mod canvas;
pub mod config;
pub mod error;
pub mod geometry;
pub mod page;
pub mod pipeline;

pub use canvas::{CanvasDrawing, CanvasObject, CanvasStyle};
pub use config::HannomConfig;
pub use error::{GeometryError, HannomError, PipelineError, Result};
pub use geometry::{
    BoundingBox, Patch, PatchExtractor, Point, ReadingLayout, ReadingOrder, Rect, extract_patch,
    extract_patches, order_for_reading_order,
};
pub use page::page_key;
pub use pipeline::{
    Detection, Digitizer, DigitizerBuilder, PageDetector, PageTranscript, PatchRecognizer,
    Translator,
};
