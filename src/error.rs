use std::path::PathBuf;

use thiserror::Error;

/// Error type for detection, catalog lookup, and snapshot persistence.
#[derive(Debug, Error)]
pub enum DetectorError {
    /// Invalid model path or malformed weights. Fatal.
    #[error("failed to load model from {path}: {source}")]
    ModelLoad {
        path: String,
        #[source]
        source: ort::Error,
    },

    /// The model exposes no class names and none were supplied.
    #[error("model at {path} carries no class names; supply them via ModelConfig::class_names")]
    MissingCatalog { path: String },

    /// A detection referenced a class index absent from the catalog.
    /// Never swallowed, unlike per-frame inference failures.
    #[error("class id {class_id} has no catalog entry ({catalog_len} names known)")]
    UnknownClass {
        class_id: usize,
        catalog_len: usize,
    },

    /// Per-frame inference failure. Surfaced through the sequence
    /// iterator so the caller decides skip vs abort.
    #[error("inference failed: {0}")]
    Inference(String),

    /// Snapshot write failure.
    #[error("failed to write snapshot to {}: {source}", path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
