use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Model-load configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to the ONNX weights file.
    pub model: String,
    /// Confidence threshold applied while decoding predictions.
    pub conf: f32,
    /// IoU threshold for NMS.
    pub iou: f32,
    /// Square inference input size.
    pub input_size: u32,
    /// Explicit class catalog. When `None` the names embedded in the ONNX
    /// metadata are used; loading fails if neither is available.
    pub class_names: Option<Vec<String>>,
    /// Use the CUDA execution provider (may still fall back to CPU).
    pub cuda: bool,
    /// CUDA device id.
    pub device_id: i32,
}

impl ModelConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            conf: 0.25,
            iou: 0.45,
            input_size: 640,
            class_names: None,
            cuda: false,
            device_id: 0,
        }
    }
}

/// Inventory scan parameters
#[derive(Parser, Debug)]
#[command(author, version, about = "Inventory detection over video frames", long_about = None)]
pub struct Args {
    /// ONNX detection model path
    #[arg(short, long)]
    pub model: String,

    /// Frame source: an image file, or a directory of frames (scanned in
    /// name order)
    #[arg(short, long)]
    pub source: PathBuf,

    /// Output directory for annotated frames and snapshots
    #[arg(short, long, default_value = "out")]
    pub out: PathBuf,

    /// Expected inventory as a JSON object {"class name": count}
    #[arg(long)]
    pub expected: Option<PathBuf>,

    /// Highlight a specific item by class name
    #[arg(long)]
    pub item: Option<String>,

    /// Class names as a JSON array, overriding the model metadata
    #[arg(long)]
    pub names: Option<PathBuf>,

    /// TTF/OTF font overriding the built-in overlay font
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Confidence threshold
    #[arg(long, default_value_t = 0.25)]
    pub conf: f32,

    /// IoU threshold for NMS
    #[arg(long, default_value_t = 0.45)]
    pub iou: f32,

    /// Inference input size
    #[arg(long, default_value_t = 640)]
    pub size: u32,

    /// Nominal frame rate used to synthesize timestamps
    #[arg(long, default_value_t = 25.0)]
    pub fps: f64,

    /// Use CUDA
    #[arg(long, default_value_t = false)]
    pub cuda: bool,

    /// CUDA device id
    #[arg(long, default_value_t = 0)]
    pub device_id: i32,
}
