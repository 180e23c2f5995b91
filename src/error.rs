use std::path::{Path, PathBuf};

use thiserror::Error;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Every failure the dashboard core can report.
///
/// Dataset and model failures happen at startup and stop the dashboard.
/// Filter and prediction failures belong to a single request; the dataset
/// and model stay valid for the next one.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("failed to load dataset '{}': {reason}", path.display())]
    DatasetLoad { path: PathBuf, reason: String },

    #[error("invalid filter '{field}': {reason}")]
    InvalidFilter { field: String, reason: String },

    #[error("failed to load model '{}': {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },

    #[error("prediction failed: {0}")]
    Prediction(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;

impl DashboardError {
    pub fn dataset(path: &Path, reason: impl Into<String>) -> Self {
        DashboardError::DatasetLoad {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn filter(field: &str, reason: impl Into<String>) -> Self {
        DashboardError::InvalidFilter {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn model(path: &Path, reason: impl Into<String>) -> Self {
        DashboardError::ModelLoad {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn prediction(reason: impl Into<String>) -> Self {
        DashboardError::Prediction(reason.into())
    }

    /// The dashboard cannot start without the dataset or the model.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            DashboardError::DatasetLoad { .. } | DashboardError::ModelLoad { .. }
        )
    }

    /// Scoped to one prediction request.
    pub fn is_request_scoped(&self) -> bool {
        !self.is_startup_fatal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_and_request_errors_are_disjoint() {
        let errors = [
            DashboardError::dataset(Path::new("clicks.csv"), "missing"),
            DashboardError::model(Path::new("clicks_clf.json"), "corrupt"),
            DashboardError::filter("colour", "out of range"),
            DashboardError::prediction("shape mismatch"),
        ];
        let fatal: Vec<bool> = errors.iter().map(|e| e.is_startup_fatal()).collect();
        assert_eq!(fatal, vec![true, true, false, false]);
        assert!(errors.iter().all(|e| e.is_startup_fatal() != e.is_request_scoped()));
    }

    #[test]
    fn messages_name_the_source() {
        let err = DashboardError::dataset(Path::new("data/clicks.csv"), "column 3 is 'day'");
        assert_eq!(
            err.to_string(),
            "failed to load dataset 'data/clicks.csv': column 3 is 'day'"
        );
        let err = DashboardError::filter("location", "7 is outside 1..=6");
        assert_eq!(err.to_string(), "invalid filter 'location': 7 is outside 1..=6");
    }
}
