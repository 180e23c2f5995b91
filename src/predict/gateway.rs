use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::artifact::ModelArtifact;
use super::feature::{FeatureColumn, FeatureRecord, column_mismatch};
use crate::error::{DashboardError, Result};

/// Predicted "next click order" class name.
pub type Label = String;

// ---------------------------------------------------------------------------
// Classifier capability
// ---------------------------------------------------------------------------

/// Anything that maps one feature row to class probabilities.
///
/// `predict_proba` is only called with rows whose length and column layout
/// match `feature_columns`, and must return one value per entry of `classes`.
pub trait Classifier: fmt::Debug + Send + Sync {
    fn kind(&self) -> &'static str;
    fn feature_columns(&self) -> &[FeatureColumn];
    fn classes(&self) -> &[String];
    fn predict_proba(&self, row: &[f64]) -> Vec<f64>;
}

/// Outcome of one prediction request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: Label,
    pub probability: f64,
    pub probabilities: BTreeMap<String, f64>,
}

// ---------------------------------------------------------------------------
// Predictor – a loaded, ready model
// ---------------------------------------------------------------------------

/// A deserialized model, ready for any number of `predict` calls.
///
/// Holding a `Predictor` means the model is loaded; there is no way back to
/// an unloaded state short of dropping it.
#[derive(Debug)]
pub struct Predictor {
    classifier: Box<dyn Classifier>,
    source: PathBuf,
}

/// Read and validate a model artifact.
pub fn load_model(path: &Path) -> Result<Predictor> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| DashboardError::model(path, format!("reading artifact: {e}")))?;
    let classifier = ModelArtifact::from_json(&text)
        .and_then(ModelArtifact::into_classifier)
        .map_err(|reason| {
            log::error!("Rejected model artifact {}: {reason}", path.display());
            DashboardError::model(path, reason)
        })?;
    let predictor = Predictor::new(classifier, path);
    log::info!(
        "Loaded {} model from {} with features [{}] and {} classes",
        predictor.kind(),
        path.display(),
        predictor
            .feature_columns()
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(", "),
        predictor.classes().len()
    );
    Ok(predictor)
}

/// Predict the label for one record.
pub fn predict(model: &Predictor, record: &FeatureRecord) -> Result<Label> {
    model.predict(record).map(|p| p.label)
}

impl Predictor {
    /// Wrap an already validated classifier.
    pub fn new(classifier: Box<dyn Classifier>, source: &Path) -> Self {
        Self {
            classifier,
            source: source.to_path_buf(),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.classifier.kind()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn feature_columns(&self) -> &[FeatureColumn] {
        self.classifier.feature_columns()
    }

    pub fn classes(&self) -> &[String] {
        self.classifier.classes()
    }

    /// Run the model on one record whose layout must equal the model's.
    ///
    /// Ties resolve to the class listed first in the artifact.
    pub fn predict(&self, record: &FeatureRecord) -> Result<Prediction> {
        if let Some(reason) = column_mismatch(self.feature_columns(), record.columns()) {
            return Err(DashboardError::prediction(format!(
                "record does not match the model's feature columns: {reason}"
            )));
        }
        let row = record.to_f64_row();
        if let Some(i) = row.iter().position(|v| !v.is_finite()) {
            return Err(DashboardError::prediction(format!(
                "feature '{}' is not a finite number",
                record.columns()[i].name
            )));
        }

        let classes = self.classes();
        if classes.is_empty() {
            return Err(DashboardError::prediction(format!(
                "{} model declares no classes",
                self.kind()
            )));
        }
        let proba = self.classifier.predict_proba(&row);
        if proba.len() != classes.len() || proba.iter().any(|p| !p.is_finite()) {
            return Err(DashboardError::prediction(format!(
                "{} model returned {} scores for {} classes",
                self.kind(),
                proba.len(),
                classes.len()
            )));
        }

        let mut best = 0;
        for (i, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = i;
            }
        }

        Ok(Prediction {
            label: classes[best].clone(),
            probability: proba[best],
            probabilities: classes.iter().cloned().zip(proba.iter().copied()).collect(),
        })
    }
}
