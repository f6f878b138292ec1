//! Command-line argument definitions for attitude-cli.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Classify the attitude expressed in a photograph.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct ClassifyArgs {
    /// Path to the image file to classify.
    #[arg(short, long, required_unless_present = "health")]
    pub input: Option<PathBuf>,

    /// Path to the attitude classifier ONNX model (overrides settings and
    /// the MODEL_PATH environment variable).
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Optional settings JSON (defaults to built-in parameters).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the square input size the model expects (pixels).
    #[arg(long)]
    pub size: Option<u32>,

    /// Request the face-cropping stage before classification. A silent no-op
    /// when face detection is disabled by configuration.
    #[arg(long, action = ArgAction::SetTrue)]
    pub detect_face: bool,

    /// Write the prediction to a JSON file instead of stdout.
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Print the model readiness report as JSON and exit.
    #[arg(long, action = ArgAction::SetTrue)]
    pub health: bool,
}
