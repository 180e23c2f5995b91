use std::sync::Arc;

use crate::config::AppConfig;
use crate::data::filter::{FilterSelection, matching_indices};
use crate::data::model::ClickTable;
use crate::error::{DashboardError, Result};
use crate::predict::feature::{FeatureAssembler, FeatureRecord};
use crate::predict::gateway::{Prediction, Predictor};
use crate::views;

// ---------------------------------------------------------------------------
// Dashboard session state
// ---------------------------------------------------------------------------

/// One user's dashboard: the shared dataset and model plus what the user
/// has selected so far. The dataset and model are never mutated here.
#[derive(Debug)]
pub struct Dashboard {
    dataset: Arc<ClickTable>,
    predictor: Arc<Predictor>,
    assembler: FeatureAssembler,
    price_bin_edges: Vec<f64>,

    /// Current filter controls.
    selection: FilterSelection,

    /// Last successful prediction, cleared when a control changes.
    pub last_prediction: Option<Prediction>,

    /// Status / error message shown to the user.
    pub status_message: Option<String>,
}

impl Dashboard {
    /// Wire the startup resources together. The model must declare exactly
    /// the configured feature columns.
    pub fn new(config: &AppConfig, dataset: Arc<ClickTable>, predictor: Arc<Predictor>) -> Result<Self> {
        let assembler = config
            .assembler()
            .map_err(|e| DashboardError::model(predictor.source(), format!("{e:#}")))?;
        if let Some(reason) = assembler.schema().mismatch(predictor.feature_columns()) {
            log::error!("Model does not accept the configured feature columns: {reason}");
            return Err(DashboardError::model(
                predictor.source(),
                format!("model feature columns differ from the configured contract: {reason}"),
            ));
        }
        let selection = config.filters.initial;
        selection.validate(assembler.ranges())?;

        Ok(Self {
            dataset,
            predictor,
            assembler,
            price_bin_edges: config.views.price_bin_edges.clone(),
            selection,
            last_prediction: None,
            status_message: None,
        })
    }

    pub fn dataset(&self) -> &ClickTable {
        &self.dataset
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    pub fn selection(&self) -> FilterSelection {
        self.selection
    }

    /// Replace the whole selection. An invalid selection is rejected and
    /// the previous one kept.
    pub fn set_selection(&mut self, selection: FilterSelection) -> Result<()> {
        if let Err(e) = selection.validate(self.assembler.ranges()) {
            self.status_message = Some(e.to_string());
            return Err(e);
        }
        if selection != self.selection {
            self.last_prediction = None;
        }
        self.selection = selection;
        self.status_message = None;
        Ok(())
    }

    pub fn set_price(&mut self, price: f64) -> Result<()> {
        self.set_selection(FilterSelection {
            price,
            ..self.selection
        })
    }

    pub fn set_colour(&mut self, colour: i64) -> Result<()> {
        self.set_selection(FilterSelection {
            colour,
            ..self.selection
        })
    }

    pub fn set_location(&mut self, location: i64) -> Result<()> {
        self.set_selection(FilterSelection {
            location,
            ..self.selection
        })
    }

    pub fn set_category(&mut self, category: i64) -> Result<()> {
        self.set_selection(FilterSelection {
            category,
            ..self.selection
        })
    }

    pub fn set_photography(&mut self, photography: i64) -> Result<()> {
        self.set_selection(FilterSelection {
            photography,
            ..self.selection
        })
    }

    /// The feature row the current selection produces.
    pub fn feature_record(&self) -> Result<FeatureRecord> {
        self.assembler.assemble(&self.selection, &self.dataset)
    }

    /// Run the model on the current selection ("Predict" button).
    pub fn predict(&mut self) -> Result<&Prediction> {
        let outcome = self
            .feature_record()
            .and_then(|record| self.predictor.predict(&record));

        match outcome {
            Ok(prediction) => {
                log::info!(
                    "Predicted order '{}' (p = {:.3}) for {:?}",
                    prediction.label,
                    prediction.probability,
                    self.selection
                );
                self.status_message = None;
                let stored: &Prediction = self.last_prediction.insert(prediction);
                Ok(stored)
            }
            Err(e) => {
                log::error!("Prediction failed for {:?}: {e:#}", self.selection);
                self.status_message = Some(format!("Error: {e}"));
                self.last_prediction = None;
                Err(e)
            }
        }
    }

    /// Number of logged clicks showing the selected kind of item.
    pub fn similar_clicks(&self) -> usize {
        matching_indices(&self.dataset, &self.selection).len()
    }

    // -- Views --

    pub fn price_bins_by_colour(&self) -> Vec<views::PriceColourCount> {
        views::price_bins_by_colour(&self.dataset, &self.price_bin_edges)
    }

    pub fn orders_by_category_month(&self) -> Vec<views::CategoryMonthCount> {
        views::orders_by_category_month(&self.dataset)
    }

    pub fn normalized_orders_by_country(&self) -> Vec<views::CountryOrders> {
        views::normalized_orders_by_country(&self.dataset)
    }

    pub fn daily_counts_by_category(&self) -> Vec<views::DailyCategoryCount> {
        views::daily_counts_by_category(&self.dataset)
    }

    pub fn average_price_by_colour(&self) -> Vec<views::ColourPrice> {
        views::average_price_by_colour(&self.dataset)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::data::model::tests::click;
    use crate::predict::artifact::{ModelArtifact, tests::linear_artifact};

    fn predictor() -> Arc<Predictor> {
        let classifier = ModelArtifact::Linear(linear_artifact())
            .into_classifier()
            .unwrap();
        Arc::new(Predictor::new(classifier, Path::new("memory")))
    }

    fn dashboard() -> Dashboard {
        let dataset = Arc::new(ClickTable::from_records(vec![
            click(29, 1, 1, 28.0),
            click(9, 2, 3, 52.0),
        ]));
        Dashboard::new(&AppConfig::default(), dataset, predictor()).unwrap()
    }

    #[test]
    fn predict_stores_result() {
        let mut dash = dashboard();
        let label = dash.predict().unwrap().label.clone();
        assert!(dash.predictor().classes().contains(&label));
        assert_eq!(dash.last_prediction.as_ref().unwrap().label, label);
        assert!(dash.status_message.is_none());
    }

    #[test]
    fn invalid_control_keeps_previous_selection() {
        let mut dash = dashboard();
        dash.set_colour(3).unwrap();
        let err = dash.set_colour(15).unwrap_err();
        assert!(matches!(err, DashboardError::InvalidFilter { .. }));
        assert_eq!(dash.selection().colour, 3);
        assert!(dash.status_message.is_some());
        assert!(dash.predict().is_ok());
    }

    #[test]
    fn changing_a_control_clears_the_prediction() {
        let mut dash = dashboard();
        dash.predict().unwrap();
        dash.set_price(75.0).unwrap();
        assert!(dash.last_prediction.is_none());
        assert_eq!(dash.selection().price, 75.0);
    }

    #[test]
    fn failed_request_leaves_shared_state_intact() {
        let mut config = AppConfig::default();
        config.features.excluded_columns.retain(|c| c != "country");
        let dataset = Arc::new(ClickTable::from_records(vec![click(29, 1, 1, 28.0)]));
        let mut dash = Dashboard::new(&config, dataset.clone(), predictor()).unwrap();
        assert!(matches!(dash.predict(), Err(DashboardError::Prediction(_))));
        assert!(dash.last_prediction.is_none());
        assert_eq!(dash.dataset().len(), 1);
        assert_eq!(dash.dataset().records(), dataset.records());
    }

    #[test]
    fn model_must_accept_configured_columns() {
        let mut config = AppConfig::default();
        config.features.columns.swap(0, 1);
        let err = Dashboard::new(&config, Arc::new(ClickTable::default()), predictor()).unwrap_err();
        assert!(matches!(err, DashboardError::ModelLoad { .. }));
    }

    #[test]
    fn views_and_similar_clicks() {
        let mut dash = dashboard();
        dash.set_selection(FilterSelection {
            price: 30.0,
            colour: 1,
            location: 5,
            category: 1,
            photography: 1,
        })
        .unwrap();
        assert_eq!(dash.similar_clicks(), 1);
        assert_eq!(dash.normalized_orders_by_country().len(), 2);
        assert_eq!(dash.price_bins_by_colour().len(), 2);
        assert_eq!(dash.average_price_by_colour().len(), 2);
        assert_eq!(dash.daily_counts_by_category().len(), 2);
        assert_eq!(dash.orders_by_category_month().len(), 2);
    }
}
