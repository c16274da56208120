// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

pub mod annotate; // overlay drawing + snapshot rendering
pub mod config; // model + CLI configuration
pub mod detector; // high-level detector facade
pub mod error;
pub mod inventory; // class counting and expected-inventory diffs
pub mod model; // YOLO preprocess / decode
pub mod ort_backend;

pub use crate::annotate::DrawStyle;
pub use crate::config::{Args, ModelConfig};
pub use crate::detector::Detector;
pub use crate::error::DetectorError;
pub use crate::inventory::{
    absence_count, diff_inventory, find_empty_frames, InventoryCount, InventoryDelta,
};
pub use crate::ort_backend::{OrtBackend, OrtConfig};

use serde::{Deserialize, Serialize};

/// A bounding box around a detected object, in original-frame pixel
/// coordinates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Bbox {
    xmin: f32,
    ymin: f32,
    width: f32,
    height: f32,
    class_id: usize,
    confidence: f32,
}

impl Bbox {
    pub fn new(
        xmin: f32,
        ymin: f32,
        width: f32,
        height: f32,
        class_id: usize,
        confidence: f32,
    ) -> Self {
        Self {
            xmin,
            ymin,
            width,
            height,
            class_id,
            confidence,
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn xmin(&self) -> f32 {
        self.xmin
    }

    pub fn ymin(&self) -> f32 {
        self.ymin
    }

    pub fn xmax(&self) -> f32 {
        self.xmin + self.width
    }

    pub fn ymax(&self) -> f32 {
        self.ymin + self.height
    }

    /// Center point (cx, cy).
    pub fn cxcy(&self) -> (f32, f32) {
        (self.xmin + self.width / 2., self.ymin + self.height / 2.)
    }

    pub fn class_id(&self) -> usize {
        self.class_id
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn intersection_area(&self, another: &Bbox) -> f32 {
        let l = self.xmin.max(another.xmin);
        let r = (self.xmin + self.width).min(another.xmin + another.width);
        let t = self.ymin.max(another.ymin);
        let b = (self.ymin + self.height).min(another.ymin + another.height);
        (r - l).max(0.) * (b - t).max(0.)
    }

    pub fn union(&self, another: &Bbox) -> f32 {
        self.area() + another.area() - self.intersection_area(another)
    }

    pub fn iou(&self, another: &Bbox) -> f32 {
        self.intersection_area(another) / self.union(another)
    }
}

/// Detections of a single analyzed frame. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    timestamp_ms: f64,
    bboxes: Vec<Bbox>,
}

impl DetectionResult {
    pub fn new(timestamp_ms: f64, bboxes: Vec<Bbox>) -> Self {
        Self {
            timestamp_ms,
            bboxes,
        }
    }

    pub fn timestamp_ms(&self) -> f64 {
        self.timestamp_ms
    }

    pub fn bboxes(&self) -> &[Bbox] {
        &self.bboxes
    }

    pub fn is_empty(&self) -> bool {
        self.bboxes.is_empty()
    }
}

/// Greedy NMS over confidence-sorted boxes, in place.
pub fn non_max_suppression(xs: &mut Vec<Bbox>, iou_threshold: f32) {
    xs.sort_by(|b1, b2| {
        b2.confidence()
            .partial_cmp(&b1.confidence())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut current_index = 0;
    for index in 0..xs.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            let iou = xs[prev_index].iou(&xs[index]);
            if iou > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            xs.swap(current_index, index);
            current_index += 1;
        }
    }
    xs.truncate(current_index);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_corner_accessors() {
        let b = Bbox::new(10.0, 20.0, 30.0, 40.0, 2, 0.9);
        assert_eq!(b.xmax(), 40.0);
        assert_eq!(b.ymax(), 60.0);
        assert_eq!(b.cxcy(), (25.0, 40.0));
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let b = Bbox::new(0.0, 0.0, 10.0, 10.0, 0, 1.0);
        assert!((b.iou(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = Bbox::new(0.0, 0.0, 10.0, 10.0, 0, 1.0);
        let b = Bbox::new(100.0, 100.0, 10.0, 10.0, 0, 1.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn nms_drops_overlapping_lower_confidence_box() {
        let mut boxes = vec![
            Bbox::new(0.0, 0.0, 10.0, 10.0, 0, 0.5),
            Bbox::new(1.0, 1.0, 10.0, 10.0, 0, 0.9),
            Bbox::new(50.0, 50.0, 10.0, 10.0, 1, 0.7),
        ];
        non_max_suppression(&mut boxes, 0.45);
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].confidence(), 0.9);
        assert_eq!(boxes[1].confidence(), 0.7);
    }
}
