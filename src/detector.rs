//! High-level facade: one loaded model plus an overlay style.

use std::path::Path;

use image::{DynamicImage, RgbImage};
use tracing::debug;

use crate::annotate::{self, DrawStyle};
use crate::config::ModelConfig;
use crate::error::DetectorError;
use crate::inventory::{self, InventoryCount};
use crate::model::YoloModel;
use crate::DetectionResult;

/// Wraps a pretrained detection model for inventory scanning. The model is
/// loaded once; every other operation is stateless given its inputs.
pub struct Detector {
    model: YoloModel,
    style: DrawStyle,
}

impl Detector {
    /// Load model weights and the class catalog.
    pub fn load(config: &ModelConfig) -> Result<Self, DetectorError> {
        Ok(Self {
            model: YoloModel::load(config)?,
            style: DrawStyle::default(),
        })
    }

    pub fn with_style(mut self, style: DrawStyle) -> Self {
        self.style = style;
        self
    }

    /// Class-index → name catalog, fixed at load time.
    pub fn class_names(&self) -> &[String] {
        self.model.names()
    }

    pub fn style(&self) -> &DrawStyle {
        &self.style
    }

    /// Run inference on one frame. The timestamp is carried through
    /// unchanged; capture owns the clock.
    pub fn detect_frame(
        &mut self,
        frame: &DynamicImage,
        timestamp_ms: f64,
    ) -> Result<DetectionResult, DetectorError> {
        let bboxes = self.model.detect(frame)?;
        debug!(timestamp_ms, boxes = bboxes.len(), "frame analyzed");
        Ok(DetectionResult::new(timestamp_ms, bboxes))
    }

    /// Lazily analyze a finite stream of (timestamp, frame) pairs, one
    /// result per frame in input order. The stream is consumed once. A
    /// frame that fails inference yields its error in place; the caller
    /// decides whether to skip or abort.
    pub fn analyze_sequence<I>(&mut self, frames: I) -> SequenceAnalysis<'_, I::IntoIter>
    where
        I: IntoIterator<Item = (f64, DynamicImage)>,
    {
        SequenceAnalysis {
            detector: self,
            frames: frames.into_iter(),
        }
    }

    /// Per-class occurrence counts for one frame's detections.
    pub fn count_classes(&self, result: &DetectionResult) -> Result<InventoryCount, DetectorError> {
        inventory::count_classes(result, self.model.names())
    }

    /// Mark every detection of `target` on the frame. Returns whether it
    /// was found.
    pub fn annotate_item(
        &self,
        img: &mut RgbImage,
        result: &DetectionResult,
        target: &str,
    ) -> Result<bool, DetectorError> {
        annotate::annotate_item(img, result, self.model.names(), target, &self.style)
    }

    /// Mark every detection on the frame. Returns the per-class counts and
    /// the total.
    pub fn annotate_all(
        &self,
        img: &mut RgbImage,
        result: &DetectionResult,
    ) -> Result<(InventoryCount, usize), DetectorError> {
        annotate::annotate_all(img, result, self.model.names(), &self.style)
    }

    /// Write an object-location report for one frame to `path`.
    pub fn save_snapshot(
        &self,
        dims: (u32, u32),
        result: &DetectionResult,
        path: &Path,
    ) -> Result<(), DetectorError> {
        annotate::save_snapshot(dims, result, self.model.names(), &self.style, path)
    }

    /// Annotate `target` across a frame sequence and count frames of
    /// sustained absence. Frames and results are paired positionally.
    /// Returns the absence count and the per-frame found flags.
    pub fn track_item_absence(
        &self,
        frames: &mut [RgbImage],
        results: &[DetectionResult],
        target: &str,
    ) -> Result<(usize, Vec<bool>), DetectorError> {
        let mut found_flags = Vec::with_capacity(results.len());
        for (img, result) in frames.iter_mut().zip(results) {
            found_flags.push(self.annotate_item(img, result, target)?);
        }
        Ok((inventory::absence_count(&found_flags), found_flags))
    }
}

/// Lazy per-frame analysis over a frame stream. Not restartable.
pub struct SequenceAnalysis<'a, I> {
    detector: &'a mut Detector,
    frames: I,
}

impl<I> Iterator for SequenceAnalysis<'_, I>
where
    I: Iterator<Item = (f64, DynamicImage)>,
{
    type Item = Result<DetectionResult, DetectorError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (timestamp_ms, frame) = self.frames.next()?;
        Some(self.detector.detect_frame(&frame, timestamp_ms))
    }
}
