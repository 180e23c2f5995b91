use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::feature::FeatureColumn;
use super::gateway::Classifier;

// ---------------------------------------------------------------------------
// Serialized model artifacts
// ---------------------------------------------------------------------------

/// A trained classifier as stored on disk (JSON, tagged by `kind`).
///
/// ```json
/// {
///   "kind": "linear",
///   "feature_columns": [{ "name": "price", "dtype": "float" }, ...],
///   "classes": ["1", "2", ...],
///   "weights": [[...n_classes], ...n_features],
///   "biases": [...n_classes]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModelArtifact {
    Linear(LinearClassifier),
    Tree(TreeClassifier),
}

impl ModelArtifact {
    pub fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| format!("parsing artifact: {e}"))
    }

    pub fn to_json_pretty(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| e.to_string())
    }

    /// Check internal consistency and hand back a ready classifier.
    pub fn into_classifier(self) -> Result<Box<dyn Classifier>, String> {
        match self {
            ModelArtifact::Linear(m) => {
                m.validate()?;
                Ok(Box::new(m))
            }
            ModelArtifact::Tree(m) => {
                m.validate()?;
                Ok(Box::new(m))
            }
        }
    }
}

fn validate_header(columns: &[FeatureColumn], classes: &[String]) -> Result<(), String> {
    if columns.is_empty() {
        return Err("artifact declares no feature columns".to_string());
    }
    let mut names = BTreeSet::new();
    if let Some(dup) = columns.iter().find(|c| !names.insert(c.name.as_str())) {
        return Err(format!("duplicate feature column '{}'", dup.name));
    }
    if classes.is_empty() {
        return Err("artifact declares no classes".to_string());
    }
    let mut seen = BTreeSet::new();
    if let Some(dup) = classes.iter().find(|c| !seen.insert(c.as_str())) {
        return Err(format!("duplicate class '{dup}'"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Linear softmax classifier
// ---------------------------------------------------------------------------

/// Multiclass logistic regression: `softmax(((x - means) / stds) · W + b)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    pub feature_columns: Vec<FeatureColumn>,
    pub classes: Vec<String>,
    /// `n_features` rows of `n_classes` weights.
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub means: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stds: Option<Vec<f64>>,
}

impl LinearClassifier {
    fn validate(&self) -> Result<(), String> {
        validate_header(&self.feature_columns, &self.classes)?;
        let n_features = self.feature_columns.len();
        let n_classes = self.classes.len();
        if self.weights.len() != n_features {
            return Err(format!(
                "weights have {} rows for {n_features} feature columns",
                self.weights.len()
            ));
        }
        if let Some((i, row)) = self
            .weights
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != n_classes)
        {
            return Err(format!(
                "weight row {i} has {} entries for {n_classes} classes",
                row.len()
            ));
        }
        if self.biases.len() != n_classes {
            return Err(format!(
                "{} biases for {n_classes} classes",
                self.biases.len()
            ));
        }
        if let Some(means) = &self.means {
            if means.len() != n_features {
                return Err(format!("{} means for {n_features} features", means.len()));
            }
        }
        if let Some(stds) = &self.stds {
            if stds.len() != n_features {
                return Err(format!("{} stds for {n_features} features", stds.len()));
            }
            if stds.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
                return Err("stds must be positive".to_string());
            }
        }
        let finite = self.weights.iter().flatten().chain(&self.biases).all(|v| v.is_finite());
        if !finite {
            return Err("weights and biases must be finite".to_string());
        }
        Ok(())
    }
}

fn softmax(logits: &mut [f64]) {
    let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for l in logits.iter_mut() {
        *l = (*l - max).exp();
        sum += *l;
    }
    for l in logits.iter_mut() {
        *l /= sum;
    }
}

impl Classifier for LinearClassifier {
    fn kind(&self) -> &'static str {
        "linear"
    }

    fn feature_columns(&self) -> &[FeatureColumn] {
        &self.feature_columns
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut logits = self.biases.clone();
        for (j, (&x, weights)) in row.iter().zip(&self.weights).enumerate() {
            let mean = self.means.as_ref().map_or(0.0, |m| m[j]);
            let std = self.stds.as_ref().map_or(1.0, |s| s[j]);
            let x = (x - mean) / std;
            for (logit, w) in logits.iter_mut().zip(weights) {
                *logit += x * w;
            }
        }
        softmax(&mut logits);
        logits
    }
}

// ---------------------------------------------------------------------------
// Decision tree classifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    /// Rows with `x[feature] <= threshold` go left.
    Branch {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Class probabilities in `classes` order.
    Leaf { probabilities: Vec<f64> },
}

/// A single decision tree; `nodes[0]` is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeClassifier {
    pub feature_columns: Vec<FeatureColumn>,
    pub classes: Vec<String>,
    pub nodes: Vec<TreeNode>,
}

impl TreeClassifier {
    fn validate(&self) -> Result<(), String> {
        validate_header(&self.feature_columns, &self.classes)?;
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        let n_nodes = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Branch {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= self.feature_columns.len() {
                        return Err(format!("node {i} splits on missing feature {feature}"));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {i} has a non-finite threshold"));
                    }
                    // Children always follow their parent, so walks terminate.
                    for child in [left, right] {
                        if *child <= i || *child >= n_nodes {
                            return Err(format!("node {i} points to invalid child {child}"));
                        }
                    }
                }
                TreeNode::Leaf { probabilities } => {
                    if probabilities.len() != self.classes.len() {
                        return Err(format!(
                            "leaf {i} has {} probabilities for {} classes",
                            probabilities.len(),
                            self.classes.len()
                        ));
                    }
                    if probabilities.iter().any(|p| !(p.is_finite() && *p >= 0.0)) {
                        return Err(format!("leaf {i} has a negative or non-finite probability"));
                    }
                }
            }
        }
        Ok(())
    }
}

impl Classifier for TreeClassifier {
    fn kind(&self) -> &'static str {
        "tree"
    }

    fn feature_columns(&self) -> &[FeatureColumn] {
        &self.feature_columns
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Branch {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
                TreeNode::Leaf { probabilities } => return probabilities.clone(),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::model::ColumnType;
    use crate::predict::feature::FeatureSchema;

    pub(crate) fn linear_artifact() -> LinearClassifier {
        // Class "1" favours cheap items, "3" favours high colour codes.
        LinearClassifier {
            feature_columns: FeatureSchema::default().columns(),
            classes: vec!["1".into(), "2".into(), "3".into()],
            weights: vec![
                vec![-0.05, 0.0, 0.02],
                vec![0.0, 0.1, 0.4],
                vec![0.0, 0.05, 0.0],
                vec![0.1, 0.0, 0.0],
                vec![0.0, 0.2, 0.0],
            ],
            biases: vec![1.5, 0.0, -2.0],
            means: None,
            stds: None,
        }
    }

    fn tree_artifact() -> TreeClassifier {
        TreeClassifier {
            feature_columns: vec![FeatureColumn {
                name: "price".into(),
                dtype: ColumnType::Float,
            }],
            classes: vec!["early".into(), "late".into()],
            nodes: vec![
                TreeNode::Branch {
                    feature: 0,
                    threshold: 40.0,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf {
                    probabilities: vec![0.8, 0.2],
                },
                TreeNode::Leaf {
                    probabilities: vec![0.3, 0.7],
                },
            ],
        }
    }

    #[test]
    fn linear_probabilities_sum_to_one() {
        let model = linear_artifact();
        model.validate().unwrap();
        let p = model.predict_proba(&[50.0, 2.0, 1.0, 1.0, 1.0]);
        assert_eq!(p.len(), 3);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(p.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn standardisation_is_applied() {
        let mut model = linear_artifact();
        let raw = model.predict_proba(&[50.0, 2.0, 1.0, 1.0, 1.0]);
        model.means = Some(vec![50.0, 2.0, 1.0, 1.0, 1.0]);
        model.stds = Some(vec![1.0; 5]);
        model.validate().unwrap();
        let centred = model.predict_proba(&[50.0, 2.0, 1.0, 1.0, 1.0]);
        assert_ne!(raw, centred);
        // Every feature sits at its mean, so only the biases remain.
        let mut expected = model.biases.clone();
        softmax(&mut expected);
        for (a, b) in centred.iter().zip(&expected) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn tree_follows_threshold() {
        let model = tree_artifact();
        model.validate().unwrap();
        assert_eq!(model.predict_proba(&[40.0]), vec![0.8, 0.2]);
        assert_eq!(model.predict_proba(&[40.5]), vec![0.3, 0.7]);
    }

    #[test]
    fn artifact_json_is_tagged() {
        let artifact = ModelArtifact::Tree(tree_artifact());
        let json = artifact.to_json_pretty().unwrap();
        assert!(json.contains("\"kind\": \"tree\""));
        assert!(json.contains("\"type\": \"leaf\""));
        assert_eq!(ModelArtifact::from_json(&json).unwrap(), artifact);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = ModelArtifact::from_json(r#"{"kind": "forest", "classes": []}"#).unwrap_err();
        assert!(err.contains("parsing artifact"));
    }

    #[test]
    fn shape_errors_are_reported() {
        let mut model = linear_artifact();
        model.weights.pop();
        assert!(ModelArtifact::Linear(model).into_classifier().unwrap_err().contains("weights have 4 rows"));

        let mut model = linear_artifact();
        model.biases.push(0.0);
        assert!(ModelArtifact::Linear(model).into_classifier().is_err());

        let mut model = linear_artifact();
        model.classes.clear();
        assert!(ModelArtifact::Linear(model).into_classifier().is_err());

        let mut model = linear_artifact();
        model.stds = Some(vec![1.0, 0.0, 1.0, 1.0, 1.0]);
        assert!(ModelArtifact::Linear(model).into_classifier().is_err());
    }

    #[test]
    fn cyclic_tree_is_rejected() {
        let mut model = tree_artifact();
        model.nodes[0] = TreeNode::Branch {
            feature: 0,
            threshold: 40.0,
            left: 0,
            right: 2,
        };
        assert!(model.validate().unwrap_err().contains("invalid child 0"));

        let mut model = tree_artifact();
        model.nodes[0] = TreeNode::Branch {
            feature: 3,
            threshold: 40.0,
            left: 1,
            right: 2,
        };
        assert!(model.validate().is_err());
    }
}
