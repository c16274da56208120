// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// Detect-task YOLO model: load, preprocess, inference, decode.

use image::{DynamicImage, GenericImageView};
use ndarray::{s, Array, Axis, IxDyn};
use tracing::info;

use crate::config::ModelConfig;
use crate::error::DetectorError;
use crate::ort_backend::{OrtBackend, OrtConfig};
use crate::{non_max_suppression, Bbox};

const CXYWH_OFFSET: usize = 4;

pub struct YoloModel {
    engine: OrtBackend,
    names: Vec<String>,
    input_size: u32,
    conf: f32,
    iou: f32,
}

impl YoloModel {
    /// Load ONNX weights and fix the class catalog.
    pub fn load(config: &ModelConfig) -> Result<Self, DetectorError> {
        let engine = OrtBackend::build(&OrtConfig {
            model_path: config.model.clone(),
            cuda: config.cuda,
            device_id: config.device_id,
        })?;

        let names = match &config.class_names {
            Some(names) => names.clone(),
            None => engine
                .names()
                .map(<[String]>::to_vec)
                .ok_or_else(|| DetectorError::MissingCatalog {
                    path: config.model.clone(),
                })?,
        };

        info!(
            model = %config.model,
            classes = names.len(),
            conf = config.conf,
            iou = config.iou,
            "detection model loaded"
        );

        Ok(Self {
            engine,
            names,
            input_size: config.input_size,
            conf: config.conf,
            iou: config.iou,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    fn scale_wh(&self, w0: f32, h0: f32, w1: f32, h1: f32) -> (f32, f32, f32) {
        let r = (w1 / w0).min(h1 / h0);
        (r, (w0 * r).round(), (h0 * r).round())
    }

    /// Letterbox the frame into the model's input square and pack it as an
    /// NCHW f32 tensor in [0, 1]. The image lands top-left; padding is the
    /// neutral gray the model was exported with.
    pub fn preprocess(&self, frame: &DynamicImage) -> Array<f32, IxDyn> {
        let size = self.input_size as usize;
        let mut ys = Array::ones((1, 3, size, size)).into_dyn();
        ys.fill(144.0 / 255.0);

        let (w0, h0) = frame.dimensions();
        let (_, w_new, h_new) = self.scale_wh(
            w0 as f32,
            h0 as f32,
            self.input_size as f32,
            self.input_size as f32,
        );
        let img = frame.resize_exact(
            w_new as u32,
            h_new as u32,
            image::imageops::FilterType::Triangle,
        );

        for (x, y, rgb) in img.pixels() {
            let x = x as usize;
            let y = y as usize;
            let [r, g, b, _] = rgb.0;
            ys[[0, 0, y, x]] = (r as f32) / 255.0;
            ys[[0, 1, y, x]] = (g as f32) / 255.0;
            ys[[0, 2, y, x]] = (b as f32) / 255.0;
        }

        ys
    }

    /// Run single-frame inference and return boxes in frame coordinates,
    /// confidence-filtered and NMS-suppressed.
    pub fn detect(&mut self, frame: &DynamicImage) -> Result<Vec<Bbox>, DetectorError> {
        let xs = self.preprocess(frame);
        let preds = self.engine.run(xs)?;
        let (w0, h0) = frame.dimensions();
        self.decode(&preds, w0 as f32, h0 as f32)
    }

    /// Decode a raw `[1, 4 + nc, anchors]` prediction tensor.
    fn decode(
        &self,
        preds: &Array<f32, IxDyn>,
        width_original: f32,
        height_original: f32,
    ) -> Result<Vec<Bbox>, DetectorError> {
        decode_predictions(
            preds,
            self.input_size,
            self.conf,
            self.iou,
            width_original,
            height_original,
        )
    }
}

/// Decode a `[1, 4 + nc, anchors]` prediction tensor into confidence-filtered,
/// NMS-suppressed boxes in original-frame coordinates.
pub fn decode_predictions(
    preds: &Array<f32, IxDyn>,
    input_size: u32,
    conf: f32,
    iou: f32,
    width_original: f32,
    height_original: f32,
) -> Result<Vec<Bbox>, DetectorError> {
    if preds.ndim() != 3 || preds.shape()[1] <= CXYWH_OFFSET {
        return Err(DetectorError::Inference(format!(
            "unexpected output shape {:?}",
            preds.shape()
        )));
    }
    let nc = preds.shape()[1] - CXYWH_OFFSET;

    let ratio = (input_size as f32 / width_original).min(input_size as f32 / height_original);

    let mut bboxes: Vec<Bbox> = Vec::new();
    for anchor in preds.axis_iter(Axis(0)) {
        for pred in anchor.axis_iter(Axis(1)) {
            let bbox = pred.slice(s![0..CXYWH_OFFSET]);
            let clss = pred.slice(s![CXYWH_OFFSET..CXYWH_OFFSET + nc]);

            let Some((id, &confidence)) = clss
                .into_iter()
                .enumerate()
                .reduce(|max, x| if x.1 > max.1 { x } else { max })
            else {
                continue;
            };

            if confidence < conf {
                continue;
            }

            let cx = bbox[0] / ratio;
            let cy = bbox[1] / ratio;
            let w = bbox[2] / ratio;
            let h = bbox[3] / ratio;
            let x = cx - w / 2.;
            let y = cy - h / 2.;
            bboxes.push(Bbox::new(
                x.max(0.0f32).min(width_original),
                y.max(0.0f32).min(height_original),
                w,
                h,
                id,
                confidence,
            ));
        }
    }

    non_max_suppression(&mut bboxes, iou);
    Ok(bboxes)
}
