/// Prediction path: filter selection → feature record → model → label.
///
/// ```text
///  FilterSelection ──► feature::FeatureAssembler ──► FeatureRecord
///                                                        │
///  clicks_clf.json ──► gateway::load_model ──► Predictor ┴─► Prediction
/// ```

pub mod artifact;
pub mod feature;
pub mod gateway;
