//! ONNX Runtime session wrapper: build, metadata, raw tensor I/O.

use ndarray::{Array, IxDyn};
use ort::execution_providers as ep;
use ort::session::Session;
use ort::value::TensorRef;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::DetectorError;

/// Engine build parameters.
#[derive(Debug, Clone)]
pub struct OrtConfig {
    pub model_path: String,
    pub cuda: bool,
    pub device_id: i32,
}

/// Owns the ORT session and the class names read from the model metadata.
pub struct OrtBackend {
    session: Session,
    names: Option<Vec<String>>,
}

impl OrtBackend {
    pub fn build(config: &OrtConfig) -> Result<Self, DetectorError> {
        let load_err = |source: ort::Error| DetectorError::ModelLoad {
            path: config.model_path.clone(),
            source,
        };

        let mut builder = Session::builder().map_err(load_err)?;
        if config.cuda {
            builder = builder
                .with_execution_providers([ep::CUDAExecutionProvider::default()
                    .with_device_id(config.device_id)
                    .build()])
                .map_err(load_err)?;
        }
        let session = builder.commit_from_file(&config.model_path).map_err(load_err)?;

        let names = Self::parse_names(&session);
        match &names {
            Some(names) => debug!(classes = names.len(), "class catalog read from model metadata"),
            None => warn!("model metadata carries no class names"),
        }

        Ok(Self { session, names })
    }

    /// Class catalog embedded in the model, if any.
    pub fn names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    /// Run one NCHW batch through the session and return the first output.
    pub fn run(&mut self, input: Array<f32, IxDyn>) -> Result<Array<f32, IxDyn>, DetectorError> {
        let inference_err = |e: ort::Error| DetectorError::Inference(e.to_string());

        let tensor = TensorRef::from_array_view(input.view()).map_err(inference_err)?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .map_err(inference_err)?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(inference_err)?;
        let dims: Vec<usize> = shape.as_ref().iter().map(|&d| d as usize).collect();

        Array::from_shape_vec(IxDyn(&dims), data.to_vec())
            .map_err(|e| DetectorError::Inference(format!("bad output shape: {e}")))
    }

    /// Ultralytics exports store the catalog as a `names` custom metadata
    /// entry shaped like `{0: 'pink-clip', 1: 'screw', ...}`.
    fn parse_names(session: &Session) -> Option<Vec<String>> {
        let metadata = session.metadata().ok()?;
        let raw = metadata.custom("names").ok().flatten()?;

        let re = Regex::new(r#"(\d+):\s*'([^']*)'"#).ok()?;
        let mut entries: Vec<(usize, String)> = re
            .captures_iter(&raw)
            .filter_map(|caps| {
                let idx = caps.get(1)?.as_str().parse().ok()?;
                Some((idx, caps.get(2)?.as_str().to_string()))
            })
            .collect();
        entries.sort_by_key(|(idx, _)| *idx);

        // The map must be dense from zero, otherwise index lookups would
        // silently shift.
        if entries.is_empty() || entries.iter().enumerate().any(|(i, (idx, _))| i != *idx) {
            return None;
        }
        Some(entries.into_iter().map(|(_, name)| name).collect())
    }
}
