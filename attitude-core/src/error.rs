//! Error taxonomy for the classification pipeline.
//!
//! Every failing stage maps onto one of three conditions: the model never
//! loaded (`ModelUnavailable`), the caller supplied bytes that are not an
//! image (`Decode`), or the forward pass / score derivation failed
//! (`Inference`). Face-detector failures are deliberately absent here: the
//! cropping stage downgrades them to a silent full-image fallback.

use thiserror::Error;

/// Failures surfaced by the classification pipeline.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The registry never loaded a usable artifact. Permanent for the process
    /// lifetime; every request fails the same way until restart.
    #[error("model is not available: {0}")]
    ModelUnavailable(String),

    /// The uploaded bytes are not a valid image.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// Shape mismatch or runtime failure during the forward pass or score
    /// derivation.
    #[error("inference failed: {0}")]
    Inference(String),
}

impl ClassifyError {
    /// Shorthand for an inference failure with a formatted message.
    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference(message.into())
    }

    /// Shorthand for a model-unavailable failure.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::ModelUnavailable(message.into())
    }

    /// Classify the failure for the transport boundary: caller-supplied data
    /// problems are client failures, everything else is a server failure.
    pub fn failure_class(&self) -> FailureClass {
        match self {
            ClassifyError::Decode(_) => FailureClass::Client,
            ClassifyError::ModelUnavailable(_) | ClassifyError::Inference(_) => {
                FailureClass::Server
            }
        }
    }
}

/// Coarse failure classification for mapping onto protocol-level statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The caller caused the failure (bad upload).
    Client,
    /// The service caused the failure (model state, runtime error).
    Server,
}

impl FailureClass {
    /// Stable lowercase name for log lines and transport mapping.
    pub fn as_str(self) -> &'static str {
        match self {
            FailureClass::Client => "client",
            FailureClass::Server => "server",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_failures_are_client_classified() {
        let err = image::load_from_memory(b"definitely not an image")
            .map(|_| ())
            .expect_err("garbage bytes should not decode");
        let err = ClassifyError::from(err);
        assert_eq!(err.failure_class(), FailureClass::Client);
        assert_eq!(err.failure_class().as_str(), "client");
    }

    #[test]
    fn model_and_inference_failures_are_server_classified() {
        assert_eq!(
            ClassifyError::unavailable("no artifact").failure_class(),
            FailureClass::Server
        );
        assert_eq!(
            ClassifyError::inference("shape mismatch").failure_class(),
            FailureClass::Server
        );
    }

    #[test]
    fn messages_keep_diagnostic_detail() {
        let err = ClassifyError::inference("expected 3 scores, got 7");
        assert!(format!("{err}").contains("expected 3 scores, got 7"));
    }
}
