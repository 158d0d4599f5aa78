//! Digitizer orchestrating detection, ordering, patch extraction, recognition
//! and translation for one page.

use std::time::Instant;

use image::RgbImage;
use tracing::{debug, info, warn};

use crate::canvas::{CanvasDrawing, CanvasStyle};
use crate::config::{HannomConfig, PipelineConfig};
use crate::error::PipelineError;
use crate::geometry::{BoundingBox, PatchExtractor, ReadingOrder};
use crate::page::page_key;

use super::{
    Detection, PageDetector, PageTranscript, PatchRecognizer, SkippedRegion, TranscribedRegion,
    Translation, Translator,
};

/// Page digitizer combining a detector, a recognizer and translators.
pub struct Digitizer<D: PageDetector, R: PatchRecognizer> {
    detector: Option<D>,
    recognizer: Option<R>,
    translators: Vec<Box<dyn Translator>>,
    reading_order: ReadingOrder,
    extractor: PatchExtractor,
    canvas_style: CanvasStyle,
    config: PipelineConfig,
}

/// Builder for Digitizer.
pub struct DigitizerBuilder<D: PageDetector, R: PatchRecognizer> {
    detector: Option<D>,
    recognizer: Option<R>,
    translators: Vec<Box<dyn Translator>>,
    config: HannomConfig,
}

impl<D: PageDetector, R: PatchRecognizer> DigitizerBuilder<D, R> {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            detector: None,
            recognizer: None,
            translators: Vec::new(),
            config: HannomConfig::default(),
        }
    }

    /// Set the text detector.
    pub fn with_detector(mut self, detector: D) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Set the text recognizer.
    pub fn with_recognizer(mut self, recognizer: R) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Add a translator. Translators run in the order they were added.
    pub fn with_translator(mut self, translator: impl Translator + 'static) -> Self {
        self.translators.push(Box::new(translator));
        self
    }

    /// Set configuration.
    pub fn with_config(mut self, config: HannomConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the digitizer.
    pub fn build(self) -> Digitizer<D, R> {
        Digitizer {
            detector: self.detector,
            recognizer: self.recognizer,
            translators: self.translators,
            reading_order: self.config.reading_order(),
            extractor: self.config.patch_extractor(),
            canvas_style: self.config.canvas,
            config: self.config.pipeline,
        }
    }
}

impl<D: PageDetector, R: PatchRecognizer> Default for DigitizerBuilder<D, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: PageDetector, R: PatchRecognizer> Digitizer<D, R> {
    /// Create a new builder.
    pub fn builder() -> DigitizerBuilder<D, R> {
        DigitizerBuilder::new()
    }

    /// Detect text boxes, dropping low-scoring and invalid detections.
    pub fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, PipelineError> {
        let detector = self
            .detector
            .as_ref()
            .ok_or(PipelineError::MissingComponent("detector"))?;

        let detections = detector.predict_one_page(image)?;
        let total = detections.len();

        let kept: Vec<Detection> = detections
            .into_iter()
            .filter(|detection| {
                if let Some(score) = detection.score {
                    if score < self.config.min_detection_score {
                        debug!("Dropping detection with score {:.3}", score);
                        return false;
                    }
                }

                match detection.bbox.validate() {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Dropping detection: {}", e);
                        false
                    }
                }
            })
            .collect();

        debug!("Kept {} of {} detections", kept.len(), total);
        Ok(kept)
    }

    /// Detect text boxes and turn them into a drawing for the box editor.
    pub fn initial_drawing(&self, image: &RgbImage) -> Result<CanvasDrawing, PipelineError> {
        let boxes: Vec<BoundingBox> = self.detect(image)?.into_iter().map(|d| d.bbox).collect();
        Ok(CanvasDrawing::from_boxes(&boxes, &self.canvas_style))
    }

    /// Transcribe the given boxes in reading order.
    ///
    /// A box that cannot be cut out or recognized is reported in
    /// [`PageTranscript::skipped`]; the remaining boxes are still processed.
    pub fn transcribe(
        &self,
        image: &RgbImage,
        boxes: &[BoundingBox],
    ) -> Result<PageTranscript, PipelineError> {
        let start = Instant::now();
        let recognizer = self
            .recognizer
            .as_ref()
            .ok_or(PipelineError::MissingComponent("recognizer"))?;

        let (width, height) = image.dimensions();
        info!("Transcribing {} boxes on a {}x{} page", boxes.len(), width, height);

        let ordered = self.reading_order.order(boxes);
        let mut regions = Vec::with_capacity(ordered.len());
        let mut skipped = Vec::new();

        for (i, bbox) in ordered.iter().enumerate() {
            let position = i + 1;

            let recognized = self
                .extractor
                .extract(image, bbox)
                .map_err(|e| e.to_string())
                .and_then(|patch| {
                    recognizer
                        .predict_one_patch(&patch)
                        .map_err(|e| e.to_string())
                });

            match recognized {
                Ok(text) => {
                    let translations = self.translate(&text);
                    regions.push(TranscribedRegion {
                        position,
                        bbox: *bbox,
                        text,
                        translations,
                    });
                }
                Err(reason) => {
                    warn!("Skipping box {}: {}", position, reason);
                    skipped.push(SkippedRegion {
                        position: Some(position),
                        bbox: Some(*bbox),
                        reason,
                    });
                }
            }
        }

        let transcript = PageTranscript {
            page_key: page_key(image),
            image_size: (width, height),
            regions,
            skipped,
            processing_time_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Transcription complete: {} regions, {} skipped in {}ms",
            transcript.regions.len(),
            transcript.skipped.len(),
            transcript.processing_time_ms
        );

        Ok(transcript)
    }

    /// Transcribe the rectangles of an edited drawing.
    ///
    /// Rectangles that do not form a valid box are reported as skipped.
    pub fn transcribe_drawing(
        &self,
        image: &RgbImage,
        drawing: &CanvasDrawing,
    ) -> Result<PageTranscript, PipelineError> {
        let mut boxes = Vec::new();
        let mut invalid = Vec::new();

        for (i, converted) in drawing.to_boxes().into_iter().enumerate() {
            match converted {
                Ok(bbox) => boxes.push(bbox),
                Err(e) => {
                    warn!("Skipping canvas rectangle {}: {}", i + 1, e);
                    invalid.push(SkippedRegion {
                        position: None,
                        bbox: None,
                        reason: format!("canvas rectangle {}: {}", i + 1, e),
                    });
                }
            }
        }

        let mut transcript = self.transcribe(image, &boxes)?;
        invalid.append(&mut transcript.skipped);
        transcript.skipped = invalid;
        Ok(transcript)
    }

    /// Detect and transcribe a page without manual edits.
    pub fn process(&self, image: &RgbImage) -> Result<PageTranscript, PipelineError> {
        let boxes: Vec<BoundingBox> = self.detect(image)?.into_iter().map(|d| d.bbox).collect();
        self.transcribe(image, &boxes)
    }

    fn translate(&self, text: &str) -> Vec<Translation> {
        if !self.config.translate || text.trim().is_empty() {
            return Vec::new();
        }

        self.translators
            .iter()
            .map(|translator| match translator.translate(text) {
                Ok(translated) => Translation {
                    service: translator.name().to_string(),
                    text: Some(translated),
                    error: None,
                },
                Err(e) => {
                    warn!("Translator {} failed: {}", translator.name(), e);
                    Translation {
                        service: translator.name().to_string(),
                        text: None,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect()
    }

    /// Check if a detector is configured.
    pub fn has_detector(&self) -> bool {
        self.detector.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::CanvasObject;
    use crate::geometry::ReadingLayout;
    use image::Rgb;
    use pretty_assertions::assert_eq;

    struct FixedDetector(Vec<Detection>);

    impl PageDetector for FixedDetector {
        fn predict_one_page(&self, _image: &RgbImage) -> Result<Vec<Detection>, PipelineError> {
            Ok(self.0.clone())
        }
    }

    /// Reports the patch size; refuses 13-pixel-wide patches.
    struct SizeRecognizer;

    impl PatchRecognizer for SizeRecognizer {
        fn predict_one_patch(&self, patch: &RgbImage) -> Result<String, PipelineError> {
            if patch.width() == 13 {
                return Err(PipelineError::Recognition("unreadable".to_string()));
            }
            Ok(format!("{}x{}", patch.width(), patch.height()))
        }
    }

    struct Shout;

    impl Translator for Shout {
        fn name(&self) -> &str {
            "shout"
        }

        fn translate(&self, text: &str) -> Result<String, PipelineError> {
            Ok(format!("{text}!"))
        }
    }

    struct Offline;

    impl Translator for Offline {
        fn name(&self) -> &str {
            "offline"
        }

        fn translate(&self, _text: &str) -> Result<String, PipelineError> {
            Err(PipelineError::Translation {
                service: "offline".to_string(),
                reason: "unreachable".to_string(),
            })
        }
    }

    fn page() -> RgbImage {
        RgbImage::from_pixel(400, 300, Rgb([240, 230, 200]))
    }

    fn digitizer(detections: Vec<Detection>) -> Digitizer<FixedDetector, SizeRecognizer> {
        Digitizer::builder()
            .with_detector(FixedDetector(detections))
            .with_recognizer(SizeRecognizer)
            .with_translator(Shout)
            .build()
    }

    #[test]
    fn test_transcribe_in_reading_order() {
        let left_column = BoundingBox::from_rect(100.0, 10.0, 120.0, 60.0);
        let right_lower = BoundingBox::from_rect(300.0, 100.0, 330.0, 140.0);
        let right_upper = BoundingBox::from_rect(310.0, 10.0, 330.0, 90.0);

        let transcript = digitizer(Vec::new())
            .transcribe(&page(), &[left_column, right_lower, right_upper])
            .unwrap();

        let texts: Vec<&str> = transcript.regions.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["20x80", "30x40", "20x50"]);
        assert_eq!(transcript.regions[0].position, 1);
        assert_eq!(transcript.regions[0].bbox, right_upper);
        assert_eq!(transcript.text(), "20x80\n30x40\n20x50");
        assert_eq!(
            transcript.regions[1].translations,
            vec![Translation {
                service: "shout".to_string(),
                text: Some("30x40!".to_string()),
                error: None,
            }]
        );
        assert!(transcript.is_complete());
    }

    #[test]
    fn test_failures_do_not_abort_the_page() {
        let outside = BoundingBox::from_rect(500.0, 10.0, 520.0, 50.0);
        let unreadable = BoundingBox::from_rect(200.0, 10.0, 213.0, 50.0);
        let good = BoundingBox::from_rect(100.0, 10.0, 120.0, 50.0);

        let transcript = digitizer(Vec::new())
            .transcribe(&page(), &[good, unreadable, outside])
            .unwrap();

        assert_eq!(transcript.regions.len(), 1);
        assert_eq!(transcript.regions[0].position, 3);
        assert_eq!(transcript.skipped.len(), 2);
        assert_eq!(transcript.skipped[0].position, Some(1));
        assert!(transcript.skipped[0].reason.contains("invalid geometry"));
        assert!(transcript.skipped[1].reason.contains("unreadable"));
    }

    #[test]
    fn test_translator_failure_keeps_region() {
        let digitizer: Digitizer<FixedDetector, SizeRecognizer> = Digitizer::builder()
            .with_recognizer(SizeRecognizer)
            .with_translator(Offline)
            .with_translator(Shout)
            .build();

        let transcript = digitizer
            .transcribe(&page(), &[BoundingBox::from_rect(0.0, 0.0, 10.0, 10.0)])
            .unwrap();

        let translations = &transcript.regions[0].translations;
        assert_eq!(translations.len(), 2);
        assert!(translations[0].error.is_some());
        assert_eq!(translations[1].text.as_deref(), Some("10x10!"));
    }

    #[test]
    fn test_translation_can_be_disabled() {
        let mut config = HannomConfig::default();
        config.pipeline.translate = false;

        let digitizer: Digitizer<FixedDetector, SizeRecognizer> = Digitizer::builder()
            .with_recognizer(SizeRecognizer)
            .with_translator(Shout)
            .with_config(config)
            .build();

        let transcript = digitizer
            .transcribe(&page(), &[BoundingBox::from_rect(0.0, 0.0, 10.0, 10.0)])
            .unwrap();
        assert!(transcript.regions[0].translations.is_empty());
    }

    #[test]
    fn test_detect_filters_scores_and_invalid_boxes() {
        let mut config = HannomConfig::default();
        config.pipeline.min_detection_score = 0.5;

        let digitizer = Digitizer::builder()
            .with_detector(FixedDetector(vec![
                Detection::new(BoundingBox::from_rect(0.0, 0.0, 10.0, 10.0)).with_score(0.9),
                Detection::new(BoundingBox::from_rect(20.0, 0.0, 30.0, 10.0)).with_score(0.1),
                Detection::new(BoundingBox::from_rect(40.0, 0.0, 40.0, 10.0)),
                Detection::new(BoundingBox::from_rect(60.0, 0.0, 70.0, 10.0)),
            ]))
            .with_recognizer(SizeRecognizer)
            .with_config(config)
            .build();

        let kept = digitizer.detect(&page()).unwrap();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, Some(0.9));
        assert_eq!(kept[1].score, None);
    }

    #[test]
    fn test_missing_components() {
        let digitizer: Digitizer<FixedDetector, SizeRecognizer> = Digitizer::builder().build();

        assert!(!digitizer.has_detector());
        assert!(matches!(
            digitizer.detect(&page()),
            Err(PipelineError::MissingComponent("detector"))
        ));
        assert!(matches!(
            digitizer.transcribe(&page(), &[]),
            Err(PipelineError::MissingComponent("recognizer"))
        ));
    }

    #[test]
    fn test_process_and_initial_drawing() {
        let detections = vec![
            Detection::new(BoundingBox::from_rect(50.0, 20.0, 70.0, 120.0)),
            Detection::new(BoundingBox::from_rect(250.0, 20.0, 280.0, 100.0)),
        ];
        let digitizer = digitizer(detections);

        let drawing = digitizer.initial_drawing(&page()).unwrap();
        assert_eq!(drawing.objects.len(), 2);
        assert_eq!(drawing.objects[1].left, 250.0);

        let transcript = digitizer.process(&page()).unwrap();
        assert_eq!(transcript.text(), "30x80\n20x100");
        assert_eq!(transcript.image_size, (400, 300));
        assert_eq!(transcript.page_key, page_key(&page()));
    }

    #[test]
    fn test_transcribe_edited_drawing() {
        let mut drawing = CanvasDrawing::from_boxes(
            &[BoundingBox::from_rect(10.0, 10.0, 40.0, 90.0)],
            &CanvasStyle::default(),
        );
        drawing.objects.push(CanvasObject::rect(300.0, 5.0, 25.0, 60.0));
        drawing.objects.push(CanvasObject::rect(200.0, 5.0, 0.0, 60.0));

        let transcript = digitizer(Vec::new())
            .transcribe_drawing(&page(), &drawing)
            .unwrap();

        assert_eq!(transcript.text(), "25x60\n30x80");
        assert_eq!(transcript.skipped.len(), 1);
        assert_eq!(transcript.skipped[0].position, None);
        assert!(transcript.skipped[0].reason.starts_with("canvas rectangle 3"));
    }

    #[test]
    fn test_horizontal_layout_from_config() {
        let mut config = HannomConfig::default();
        config.geometry.layout = ReadingLayout::HorizontalLtr;

        let digitizer: Digitizer<FixedDetector, SizeRecognizer> = Digitizer::builder()
            .with_recognizer(SizeRecognizer)
            .with_config(config)
            .build();

        let transcript = digitizer
            .transcribe(
                &page(),
                &[
                    BoundingBox::from_rect(200.0, 10.0, 260.0, 30.0),
                    BoundingBox::from_rect(10.0, 12.0, 50.0, 30.0),
                ],
            )
            .unwrap();
        assert_eq!(transcript.text(), "40x18\n60x20");
    }
}
