//! Derivation of the final prediction from the model's raw score tensor.

use std::collections::BTreeMap;

use serde::Serialize;
use tract_onnx::prelude::Tensor;

use crate::{error::ClassifyError, labels::LabelSpace};

/// Structured classification result returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// The chosen label, an element of the label space.
    pub label: String,
    /// Probability of the chosen label, in `[0, 1]`.
    pub confidence: f32,
    /// Full label-to-probability mapping, in the model's output order.
    pub probabilities: BTreeMap<String, f32>,
}

/// Derive label, confidence, and distribution from a raw score tensor.
///
/// The tensor must hold exactly one f32 score per label (a leading batch
/// dimension of 1 is accepted). Scores are taken as the model emits them:
/// softmax normalization happens inside the exported graph, and small
/// floating-point drift away from an exact unit sum is tolerated, never
/// corrected. The argmax uses a strict-greater comparison so ties keep the
/// lowest output index.
///
/// # Arguments
///
/// * `output` - The raw score tensor from the model.
/// * `labels` - The label space aligned with the model's output order.
pub fn apply_postprocess(
    output: &Tensor,
    labels: &LabelSpace,
) -> Result<Prediction, ClassifyError> {
    let scores = score_vector(output, labels.len())?;

    let mut best = 0usize;
    for (index, score) in scores.iter().enumerate().skip(1) {
        if *score > scores[best] {
            best = index;
        }
    }

    let label = labels
        .get(best)
        .ok_or_else(|| ClassifyError::inference("argmax index out of label range"))?
        .to_string();
    let probabilities = labels
        .iter()
        .zip(scores.iter())
        .map(|(label, score)| (label.to_string(), *score))
        .collect();

    Ok(Prediction {
        label,
        confidence: scores[best],
        probabilities,
    })
}

fn score_vector(output: &Tensor, expected: usize) -> Result<Vec<f32>, ClassifyError> {
    let slice = output
        .as_slice::<f32>()
        .map_err(|e| ClassifyError::inference(format!("model output is not f32: {e}")))?;

    if slice.len() != expected {
        return Err(ClassifyError::inference(format!(
            "score vector length mismatch: expected {expected} scores, got {} (output shape {:?})",
            slice.len(),
            output.shape()
        )));
    }
    if slice.iter().any(|v| !v.is_finite()) {
        return Err(ClassifyError::inference(
            "score vector contains non-finite values",
        ));
    }

    Ok(slice.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(values: &[f32]) -> Tensor {
        Tensor::from_shape(&[1, values.len()], values).expect("build score tensor")
    }

    #[test]
    fn picks_argmax_label_and_confidence() {
        let labels = LabelSpace::default();
        let prediction =
            apply_postprocess(&scores(&[0.1, 0.2, 0.7]), &labels).expect("postprocess");

        assert_eq!(prediction.label, "POSITIVE");
        assert_eq!(prediction.confidence, 0.7);
        assert_eq!(prediction.probabilities.len(), labels.len());
        assert_eq!(prediction.probabilities["NEGATIVE"], 0.1);
        assert_eq!(prediction.probabilities["NEUTRAL"], 0.2);
        assert_eq!(prediction.probabilities["POSITIVE"], 0.7);
    }

    #[test]
    fn ties_keep_the_lowest_output_index() {
        let labels = LabelSpace::default();
        let prediction =
            apply_postprocess(&scores(&[0.4, 0.4, 0.2]), &labels).expect("postprocess");
        assert_eq!(prediction.label, "NEGATIVE");
    }

    #[test]
    fn accepts_unbatched_score_vectors() {
        let labels = LabelSpace::default();
        let tensor = Tensor::from_shape(&[3], &[0.05f32, 0.9, 0.05]).expect("tensor");
        let prediction = apply_postprocess(&tensor, &labels).expect("postprocess");
        assert_eq!(prediction.label, "NEUTRAL");
    }

    #[test]
    fn tolerates_floating_point_drift_in_the_sum() {
        let labels = LabelSpace::default();
        let prediction =
            apply_postprocess(&scores(&[0.1, 0.2, 0.700001]), &labels).expect("postprocess");
        let sum: f32 = prediction.probabilities.values().sum();
        assert!((sum - 1.0).abs() < 1e-3);
    }

    #[test]
    fn rejects_length_mismatch() {
        let labels = LabelSpace::default();
        let err = apply_postprocess(&scores(&[0.5, 0.5]), &labels).expect_err("must fail");
        assert!(matches!(err, ClassifyError::Inference(_)));
        assert!(format!("{err}").contains("expected 3 scores, got 2"));
    }

    #[test]
    fn rejects_non_finite_scores() {
        let labels = LabelSpace::default();
        let err =
            apply_postprocess(&scores(&[0.5, f32::NAN, 0.5]), &labels).expect_err("must fail");
        assert!(matches!(err, ClassifyError::Inference(_)));
    }

    #[test]
    fn serializes_to_the_transport_record_shape() {
        let labels = LabelSpace::default();
        let prediction =
            apply_postprocess(&scores(&[0.1, 0.2, 0.7]), &labels).expect("postprocess");

        let json = serde_json::to_value(&prediction).expect("serialize");
        let object = json.as_object().expect("object");
        assert_eq!(object.len(), 3);
        assert!(object.contains_key("label"));
        assert!(object.contains_key("confidence"));
        assert!(object.contains_key("probabilities"));
    }
}
