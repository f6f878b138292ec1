//! Shared configuration types consumed across the attitude classifier workspace.
//!
//! These structures provide a common representation for model, input, and
//! face-detection settings that can be serialized to disk and combined with
//! environment overrides resolved once at startup.

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

/// Environment variable naming the model artifact location.
pub const MODEL_PATH_ENV: &str = "MODEL_PATH";
/// Environment variable toggling the face-cropping stage.
pub const USE_FACE_DETECTION_ENV: &str = "USE_FACE_DETECTION";

/// Location of the serialized classifier artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModelSettings {
    /// Path to the ONNX model file.
    pub path: PathBuf,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/attitude.onnx"),
        }
    }
}

/// Inference input resolution in pixels.
///
/// The input image is resized to a `size` x `size` square before being passed
/// to the model. This must match the resolution the model was trained
/// against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputSettings {
    /// Square input edge length in pixels.
    pub size: u32,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self { size: 160 }
    }
}

/// Settings for the optional face-cropping stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct FaceDetectionSettings {
    /// Whether the cropping stage may run at all. Off by default; a request
    /// asking for face detection while this is disabled is a silent no-op.
    pub enabled: bool,
}

/// Top-level settings consumed by the classifier and its front-ends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppSettings {
    /// Model artifact settings.
    pub model: ModelSettings,
    /// Input resolution settings.
    pub input: InputSettings,
    /// Face-cropping stage settings.
    pub face_detection: FaceDetectionSettings,
}

impl AppSettings {
    /// Load settings from a JSON file, filling missing fields with defaults.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the settings JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse settings JSON at {}", path.display()))
    }

    /// Persist settings to a JSON file.
    ///
    /// # Arguments
    ///
    /// * `path` - The destination path for the settings JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let raw = serde_json::to_string_pretty(self).context("failed to serialize settings")?;
        fs::write(path, raw)
            .with_context(|| format!("failed to write settings to {}", path.display()))
    }

    /// Apply environment overrides (`MODEL_PATH`, `USE_FACE_DETECTION`).
    ///
    /// Variables that are unset leave the corresponding field untouched. This
    /// is resolved once at startup; the settings are immutable afterwards.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var(MODEL_PATH_ENV) {
            if !value.is_empty() {
                self.model.path = PathBuf::from(value);
            }
        }
        if let Ok(value) = env::var(USE_FACE_DETECTION_ENV) {
            match parse_flag(&value) {
                Some(enabled) => self.face_detection.enabled = enabled,
                None => warn!(
                    "ignoring unrecognized {USE_FACE_DETECTION_ENV} value {value:?} \
                     (expected true/false)"
                ),
            }
        }
    }
}

/// Parse a boolean environment flag. Returns `None` for unrecognized values.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
