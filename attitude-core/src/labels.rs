//! Ordered output label space for the attitude classifier.
//!
//! The label order is fixed at training time: index `i` in the label space
//! corresponds exactly to output index `i` of the model's score vector. This
//! correspondence is a contract the rest of the pipeline relies on and must
//! never be reordered at serving time.

use anyhow::Result;
use std::collections::HashSet;

/// The attitude categories the shipped model was trained against, in
/// training-time output order.
pub const DEFAULT_LABELS: [&str; 3] = ["NEGATIVE", "NEUTRAL", "POSITIVE"];

/// Fixed ordered set of output class names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSpace {
    labels: Vec<String>,
}

impl LabelSpace {
    /// Build a label space from an ordered list of class names.
    ///
    /// The list must be non-empty and free of duplicates; the given order is
    /// preserved and must match the model's output index order.
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        anyhow::ensure!(!labels.is_empty(), "label space must not be empty");

        let mut seen = HashSet::new();
        for label in &labels {
            anyhow::ensure!(seen.insert(label.as_str()), "duplicate label: {label}");
        }

        Ok(Self { labels })
    }

    /// Number of output classes.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always `false`: construction rejects empty label spaces.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label at output index `index`, if in range.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Iterate over labels in output-index order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl Default for LabelSpace {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_labels_keep_training_order() {
        let labels = LabelSpace::default();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels.get(0), Some("NEGATIVE"));
        assert_eq!(labels.get(1), Some("NEUTRAL"));
        assert_eq!(labels.get(2), Some("POSITIVE"));
        assert_eq!(labels.get(3), None);
    }

    #[test]
    fn custom_labels_preserve_given_order() {
        let labels = LabelSpace::new(["B", "A", "C"]).expect("valid labels");
        let collected: Vec<&str> = labels.iter().collect();
        assert_eq!(collected, vec!["B", "A", "C"]);
    }

    #[test]
    fn rejects_empty_label_space() {
        let labels: [&str; 0] = [];
        assert!(LabelSpace::new(labels).is_err());
    }

    #[test]
    fn rejects_duplicate_labels() {
        assert!(LabelSpace::new(["A", "B", "A"]).is_err());
    }
}
