//! Clickstream exploration and next-click prediction.

pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod predict;
pub mod report;
pub mod state;
pub mod views;

pub use config::AppConfig;
pub use data::filter::{FilterRanges, FilterSelection};
pub use data::loader::load;
pub use data::model::{ClickRecord, ClickTable, ColumnType};
pub use error::{DashboardError, Result};
pub use predict::feature::{FeatureAssembler, FeatureRecord, FeatureSchema, assemble};
pub use predict::gateway::{Classifier, Label, Prediction, Predictor, load_model, predict};
pub use state::Dashboard;
