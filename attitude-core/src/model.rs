//! ONNX model loading and execution, plus the process-wide model registry.

use std::{
    fmt,
    fmt::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::SystemTime,
};

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use serde::Serialize;
use tract_onnx::prelude::{
    DatumType, Framework, Graph, InferenceFact, InferenceModelExt, IntoTensor, SimplePlan, Tensor,
    TypedFact, TypedOp, tvec,
};

use crate::error::ClassifyError;

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Seam over the forward pass.
///
/// The production implementation is [`AttitudeModel`]; tests inject fixed
/// score vectors through this trait to exercise the pipeline without a model
/// artifact on disk.
pub trait ForwardPass: Send + Sync + fmt::Debug {
    /// Run the model on a prepared input tensor and return the raw score
    /// tensor, aligned to the label space's output order.
    fn run(&self, input: Tensor) -> Result<Tensor, ClassifyError>;
}

/// Wrapper around the attitude classifier ONNX runnable model.
///
/// This struct handles loading the ONNX graph, preparing it for execution,
/// and running inference.
#[derive(Debug)]
pub struct AttitudeModel {
    // The runtime does not promise that concurrent forward passes on one
    // shared plan are safe; the lock scopes exclusive access to each call.
    plan: Mutex<RunnableModel>,
    input_size: u32,
}

impl AttitudeModel {
    /// Load and optimize the classifier ONNX graph for a fixed square input
    /// size.
    pub fn load<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let path = model_path.as_ref();
        anyhow::ensure!(path.exists(), "model file not found: {}", path.display());
        anyhow::ensure!(input_size > 0, "input size must be greater than zero");

        let plan = match load_runnable_model(path, input_size, true) {
            Ok(model) => {
                debug!(
                    "attitude model {} optimized successfully ({}x{})",
                    path.display(),
                    input_size,
                    input_size
                );
                model
            }
            Err(opt_err) => {
                let optimize_msg = format!("{opt_err}");
                let mut chain_msg = String::new();
                for cause in opt_err.chain() {
                    let _ = writeln!(&mut chain_msg, "  - {cause}");
                }
                warn!(
                    "attitude model {} failed optimized load ({}); falling back to decluttered graph.\nError chain:\n{}",
                    path.display(),
                    optimize_msg,
                    chain_msg.trim_end()
                );
                load_runnable_model(path, input_size, false).with_context(|| {
                    format!(
                        "fallback to decluttered graph failed after optimize error: {optimize_msg}"
                    )
                })?
            }
        };

        Ok(Self {
            plan: Mutex::new(plan),
            input_size,
        })
    }

    /// The square input edge length this model expects.
    pub fn input_size(&self) -> u32 {
        self.input_size
    }
}

impl ForwardPass for AttitudeModel {
    fn run(&self, input: Tensor) -> Result<Tensor, ClassifyError> {
        let plan = self
            .plan
            .lock()
            .map_err(|_| ClassifyError::inference("model lock poisoned"))?;
        let outputs = plan
            .run(tvec![input.into()])
            .map_err(|e| ClassifyError::inference(format!("forward pass failed: {e}")))?;

        let mut tensors: Vec<Tensor> = outputs
            .into_iter()
            .map(|value| value.into_tensor())
            .collect();

        match tensors.len() {
            1 => tensors
                .pop()
                .ok_or_else(|| ClassifyError::inference("model produced no outputs")),
            0 => Err(ClassifyError::inference("model produced no outputs")),
            other => Err(ClassifyError::inference(format!(
                "expected a single score tensor, got {other} outputs"
            ))),
        }
    }
}

fn load_runnable_model(path: &Path, input_size: u32, optimized: bool) -> Result<RunnableModel> {
    let size = input_size as usize;
    let model = tract_onnx::onnx()
        .model_for_path(path)
        .with_context(|| format!("failed to parse ONNX graph from {}", path.display()))?
        .with_input_fact(0, InferenceFact::dt_shape(DatumType::F32, [1, size, size, 3]))
        .with_context(|| format!("failed to pin input shape to [1, {size}, {size}, 3]"))?;

    if optimized {
        model
            .into_optimized()
            .map_err(|e| anyhow::anyhow!("unable to optimize classifier graph: {e}"))?
            .into_runnable()
            .map_err(|e| anyhow::anyhow!("unable to make classifier graph runnable: {e}"))
    } else {
        model
            .into_typed()
            .map_err(|e| anyhow::anyhow!("unable to type-check classifier graph: {e}"))?
            .into_decluttered()
            .map_err(|e| anyhow::anyhow!("unable to declutter classifier graph: {e}"))?
            .into_runnable()
            .map_err(|e| anyhow::anyhow!("unable to make classifier graph runnable: {e}"))
    }
}

/// Readiness snapshot for the health surface.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessReport {
    /// Whether a usable model is loaded.
    pub ready: bool,
    /// The artifact path the registry attempted to load.
    pub model_path: PathBuf,
    /// When the artifact finished loading, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<SystemTime>,
    /// The recorded load failure, if loading failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug)]
enum ModelState {
    Ready {
        model: Arc<dyn ForwardPass>,
        loaded_at: SystemTime,
    },
    Failed {
        error: String,
    },
}

/// Owner of the loaded model artifact and its readiness state.
///
/// Loading happens exactly once, synchronously, at process startup. A load
/// failure is caught and recorded rather than propagated, leaving the
/// registry in a permanent unavailable state until process restart; there is
/// no implicit retry. The handle handed out by [`ModelRegistry::model`] is
/// read-only and shared by all concurrent requests.
#[derive(Debug)]
pub struct ModelRegistry {
    path: PathBuf,
    state: ModelState,
}

impl ModelRegistry {
    /// Load the artifact at `path` and record the outcome.
    pub fn initialize<P: AsRef<Path>>(path: P, input_size: u32) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = match AttitudeModel::load(&path, input_size) {
            Ok(model) => {
                info!(
                    "loaded attitude model from {} ({}x{} input)",
                    path.display(),
                    input_size,
                    input_size
                );
                ModelState::Ready {
                    model: Arc::new(model),
                    loaded_at: SystemTime::now(),
                }
            }
            Err(err) => {
                let message = format!("{err:#}");
                error!(
                    "failed to load attitude model from {}: {message}",
                    path.display()
                );
                ModelState::Failed { error: message }
            }
        };

        Self { path, state }
    }

    /// Build a registry around an already-constructed model (injection seam
    /// for embedders and tests).
    pub fn with_model<P: AsRef<Path>>(path: P, model: Arc<dyn ForwardPass>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            state: ModelState::Ready {
                model,
                loaded_at: SystemTime::now(),
            },
        }
    }

    /// Whether a usable model is loaded.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, ModelState::Ready { .. })
    }

    /// The artifact path this registry was initialized with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hand out the shared read-only model handle.
    pub fn model(&self) -> Result<Arc<dyn ForwardPass>, ClassifyError> {
        match &self.state {
            ModelState::Ready { model, .. } => Ok(Arc::clone(model)),
            ModelState::Failed { error } => Err(ClassifyError::unavailable(error.clone())),
        }
    }

    /// Snapshot of the load outcome for the health surface.
    pub fn readiness(&self) -> ReadinessReport {
        match &self.state {
            ModelState::Ready { loaded_at, .. } => ReadinessReport {
                ready: true,
                model_path: self.path.clone(),
                loaded_at: Some(*loaded_at),
                error: None,
            },
            ModelState::Failed { error } => ReadinessReport {
                ready: false,
                model_path: self.path.clone(),
                loaded_at: None,
                error: Some(error.clone()),
            },
        }
    }
}
