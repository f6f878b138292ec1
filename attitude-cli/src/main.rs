use std::{fs, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use attitude_core::{
    AttitudeClassifier, LabelSpace, ModelRegistry, PreprocessConfig, resolve_face_stage,
};
use attitude_utils::{config::AppSettings, init_logging, normalize_path};

mod args;

use args::ClassifyArgs;

fn main() -> Result<()> {
    init_logging(log::LevelFilter::Info)?;
    let args = ClassifyArgs::parse();

    let settings = resolve_settings(&args)?;
    let registry = Arc::new(ModelRegistry::initialize(
        &settings.model.path,
        settings.input.size,
    ));

    if args.health {
        println!("{}", serde_json::to_string_pretty(&registry.readiness())?);
        return Ok(());
    }

    let report = registry.readiness();
    anyhow::ensure!(
        report.ready,
        "model is not available: {}",
        report.error.unwrap_or_else(|| "unknown load failure".into())
    );

    // No detector implementation ships with the CLI; an enabled stage
    // resolves to disabled and requests fall back to the full image.
    let detector = resolve_face_stage(settings.face_detection.enabled, None);
    let classifier = AttitudeClassifier::new(
        registry,
        LabelSpace::default(),
        PreprocessConfig {
            target_size: settings.input.size,
        },
        detector,
    );

    let input = args
        .input
        .as_ref()
        .context("--input is required unless --health is given")?;
    let input = normalize_path(input)?;

    let prediction = match classifier.classify_path(&input, args.detect_face) {
        Ok(prediction) => prediction,
        Err(err) => {
            error!(
                "classification failed ({} error): {err}",
                err.failure_class().as_str()
            );
            return Err(err.into());
        }
    };

    info!(
        "{}: {} (confidence {:.3})",
        input.display(),
        prediction.label,
        prediction.confidence
    );

    let rendered = serde_json::to_string_pretty(&prediction)?;
    match args.json.as_ref() {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("failed to write prediction to {}", path.display()))?,
        None => println!("{rendered}"),
    }

    Ok(())
}

/// Resolve effective settings: config file, then environment, then CLI flags.
fn resolve_settings(args: &ClassifyArgs) -> Result<AppSettings> {
    let mut settings = match args.config.as_ref() {
        Some(path) => AppSettings::load(path)?,
        None => AppSettings::default(),
    };
    settings.apply_env_overrides();

    if let Some(model) = args.model.as_ref() {
        settings.model.path = model.clone();
    }
    if let Some(size) = args.size {
        settings.input.size = size;
    }
    Ok(settings)
}
