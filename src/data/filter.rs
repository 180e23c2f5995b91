use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::codes;
use super::model::{ClickRecord, ClickTable};
use crate::error::{DashboardError, Result};

// ---------------------------------------------------------------------------
// Filter selection: the five user-adjustable controls
// ---------------------------------------------------------------------------

/// The values chosen on the filter controls for one prediction request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSelection {
    /// US dollars.
    pub price: f64,
    pub colour: i64,
    pub location: i64,
    pub category: i64,
    pub photography: i64,
}

impl Default for FilterSelection {
    fn default() -> Self {
        Self {
            price: 50.0,
            colour: 1,
            location: 1,
            category: 1,
            photography: 1,
        }
    }
}

/// Allowed range of every control. Enum ranges are fixed by the dataset;
/// the price slider bounds are configurable.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterRanges {
    pub price: RangeInclusive<f64>,
    pub colour: RangeInclusive<i64>,
    pub location: RangeInclusive<i64>,
    pub category: RangeInclusive<i64>,
    pub photography: RangeInclusive<i64>,
}

impl Default for FilterRanges {
    fn default() -> Self {
        Self::with_price(1.0, 100.0)
    }
}

impl FilterRanges {
    pub fn with_price(min: f64, max: f64) -> Self {
        Self {
            price: min..=max,
            colour: codes::COLOUR_RANGE,
            location: codes::LOCATION_RANGE,
            category: codes::CATEGORY_RANGE,
            photography: codes::PHOTOGRAPHY_RANGE,
        }
    }
}

fn check(field: &str, value: i64, range: &RangeInclusive<i64>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(DashboardError::filter(
            field,
            format!("{value} is outside {}..={}", range.start(), range.end()),
        ))
    }
}

impl FilterSelection {
    /// Reject any field outside its declared range.
    pub fn validate(&self, ranges: &FilterRanges) -> Result<()> {
        if !self.price.is_finite() || !ranges.price.contains(&self.price) {
            return Err(DashboardError::filter(
                "price",
                format!(
                    "{} is outside {}..={}",
                    self.price,
                    ranges.price.start(),
                    ranges.price.end()
                ),
            ));
        }
        check("colour", self.colour, &ranges.colour)?;
        check("location", self.location, &ranges.location)?;
        check("category", self.category, &ranges.category)?;
        check("photography", self.photography, &ranges.photography)?;
        Ok(())
    }

    /// Whether a click shows the same kind of item in the same slot.
    /// Price is ignored.
    pub fn matches(&self, record: &ClickRecord) -> bool {
        record.colour == self.colour
            && record.location == self.location
            && record.main_category == self.category
            && record.model_photography == self.photography
    }
}

/// Return indices of clicks that match the selection's enum fields.
pub fn matching_indices(table: &ClickTable, selection: &FilterSelection) -> Vec<usize> {
    table
        .records()
        .iter()
        .enumerate()
        .filter(|(_, r)| selection.matches(r))
        .map(|(i, _)| i)
        .collect()
}
