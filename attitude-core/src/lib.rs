//! Core attitude classification primitives.
//!
//! This crate loads the attitude classifier ONNX model, runs inference with
//! `tract-onnx`, and provides the preprocessing, optional face cropping, and
//! score derivation stages of the prediction pipeline.

/// High-level classification pipeline.
pub mod classifier;
/// Error taxonomy shared across the pipeline stages.
pub mod error;
/// Optional face-cropping stage and the external detector contract.
pub mod face_crop;
/// Ordered output label space.
pub mod labels;
/// ONNX model loading, execution, and the model registry.
pub mod model;
/// Score-vector derivation (label selection, confidence, distribution).
pub mod postprocess;
/// Image decoding and tensor preparation.
pub mod preprocess;

pub use classifier::AttitudeClassifier;
pub use error::{ClassifyError, FailureClass};
pub use face_crop::{FaceBox, FaceCandidate, FaceDetector, crop_best_face, resolve_face_stage};
pub use labels::{DEFAULT_LABELS, LabelSpace};
pub use model::{AttitudeModel, ForwardPass, ModelRegistry, ReadinessReport};
pub use postprocess::{Prediction, apply_postprocess};
pub use preprocess::{
    DEFAULT_TARGET_SIZE, PreprocessConfig, PreprocessOutput, decode_image,
    preprocess_dynamic_image,
};

/// Returns the crate version for diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
