//! High-level prediction pipeline.
//!
//! [`AttitudeClassifier`] couples the model registry with preprocessing,
//! optional face cropping, and score derivation. Each call is independent and
//! stateless relative to other calls; the only shared state is the immutable
//! model handle and the label space.

use std::{path::Path, sync::Arc};

use image::DynamicImage;
use log::{Level, debug, error};

use attitude_utils::{load_image, timing_guard};

use crate::{
    error::ClassifyError,
    face_crop::{FaceDetector, crop_best_face},
    labels::LabelSpace,
    model::{ForwardPass, ModelRegistry},
    postprocess::{Prediction, apply_postprocess},
    preprocess::{PreprocessConfig, decode_image, preprocess_dynamic_image},
};

/// Classification pipeline over a shared model registry.
///
/// This is the main entry point for classifying an uploaded photograph.
#[derive(Debug)]
pub struct AttitudeClassifier {
    registry: Arc<ModelRegistry>,
    labels: LabelSpace,
    preprocess: PreprocessConfig,
    detector: Option<Arc<dyn FaceDetector>>,
}

impl AttitudeClassifier {
    /// Construct a classifier.
    ///
    /// # Arguments
    ///
    /// * `registry` - The shared model registry.
    /// * `labels` - The label space aligned with the model's output order.
    /// * `preprocess` - The preprocessing configuration.
    /// * `detector` - The resolved face-cropping stage; pass the result of
    ///   [`crate::face_crop::resolve_face_stage`] or `None` to disable it.
    pub fn new(
        registry: Arc<ModelRegistry>,
        labels: LabelSpace,
        preprocess: PreprocessConfig,
        detector: Option<Arc<dyn FaceDetector>>,
    ) -> Self {
        Self {
            registry,
            labels,
            preprocess,
            detector,
        }
    }

    /// Whether the face-cropping stage is active.
    pub fn face_detection_enabled(&self) -> bool {
        self.detector.is_some()
    }

    /// Access the underlying registry (for the health surface).
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Classify an uploaded photograph.
    ///
    /// Readiness is checked before anything else so that a registry that
    /// failed at startup rejects every request identically, regardless of
    /// input. The remaining stages run in order: decode, optional face crop,
    /// preprocess, forward pass, score derivation. Any stage failure aborts
    /// the request; there are no retries and no partial results.
    ///
    /// # Arguments
    ///
    /// * `bytes` - Raw encoded image bytes.
    /// * `detect_face` - Whether the caller asked for face cropping. A silent
    ///   no-op when the stage is disabled.
    pub fn classify_bytes(
        &self,
        bytes: &[u8],
        detect_face: bool,
    ) -> Result<Prediction, ClassifyError> {
        let _guard = timing_guard("attitude_core::classify_bytes", Level::Debug);

        let model = self.registry.model()?;
        let decoded = decode_image(bytes)?;
        self.run_decoded(model, decoded, detect_face)
    }

    /// Classify a photograph stored on disk.
    ///
    /// Same pipeline as [`AttitudeClassifier::classify_bytes`]; an unreadable
    /// or malformed file surfaces as a decode failure.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the image file.
    /// * `detect_face` - Whether the caller asked for face cropping.
    pub fn classify_path<P: AsRef<Path>>(
        &self,
        path: P,
        detect_face: bool,
    ) -> Result<Prediction, ClassifyError> {
        let _guard = timing_guard("attitude_core::classify_path", Level::Debug);

        let model = self.registry.model()?;
        let decoded = load_image(path.as_ref()).map_err(|err| {
            match err.downcast::<image::ImageError>() {
                Ok(image_err) => ClassifyError::Decode(image_err),
                Err(other) => ClassifyError::inference(format!("failed to load image: {other:#}")),
            }
        })?;
        self.run_decoded(model, decoded, detect_face)
    }

    /// Run the shared tail of the pipeline on a decoded image.
    fn run_decoded(
        &self,
        model: Arc<dyn ForwardPass>,
        decoded: DynamicImage,
        detect_face: bool,
    ) -> Result<Prediction, ClassifyError> {
        let framed = self.frame(decoded, detect_face);
        let prepared = preprocess_dynamic_image(&framed, &self.preprocess)?;

        let output = {
            let _guard = timing_guard("attitude_core::forward_pass", Level::Debug);
            model
                .run(prepared.tensor)
                .inspect_err(|err| error!("forward pass failed: {err}"))?
        };

        let prediction = apply_postprocess(&output, &self.labels)
            .inspect_err(|err| error!("score derivation failed: {err}"))?;
        debug!(
            "classified {}x{} image as {} (confidence {:.3})",
            prepared.original_size.0, prepared.original_size.1, prediction.label,
            prediction.confidence
        );
        Ok(prediction)
    }

    /// Apply the optional cropping stage. Requesting face detection while the
    /// stage is disabled is a silent no-op, mirroring the documented
    /// full-image fallback.
    fn frame(&self, decoded: DynamicImage, detect_face: bool) -> DynamicImage {
        match (&self.detector, detect_face) {
            (Some(detector), true) => crop_best_face(&decoded, detector.as_ref()),
            _ => decoded,
        }
    }
}
