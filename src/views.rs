//! Read-only aggregations over the clickstream, recomputed on every call.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::data::codes;
use crate::data::model::ClickTable;

/// Bucket edges used by the price/colour chart.
pub const DEFAULT_PRICE_BIN_EDGES: [f64; 5] = [0.0, 20.0, 40.0, 60.0, 80.0];

// ---------------------------------------------------------------------------
// Min-max scaling
// ---------------------------------------------------------------------------

/// Scale values to `[0, 1]`. A constant series maps to all ones, so the
/// maximum is always represented.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range.abs() < f64::EPSILON {
        vec![1.0; values.len()]
    } else {
        values.iter().map(|&v| (v - min) / range).collect()
    }
}

// ---------------------------------------------------------------------------
// Price bins by colour
// ---------------------------------------------------------------------------

/// Right-closed price interval `(lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceBin {
    pub lower: f64,
    pub upper: f64,
}

impl fmt::Display for PriceBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}]", self.lower, self.upper)
    }
}

/// Bins for consecutive edge pairs.
pub fn price_bins(edges: &[f64]) -> Vec<PriceBin> {
    edges
        .windows(2)
        .map(|w| PriceBin {
            lower: w[0],
            upper: w[1],
        })
        .collect()
}

fn bin_index(bins: &[PriceBin], price: f64) -> Option<usize> {
    bins.iter()
        .position(|b| price > b.lower && price <= b.upper)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceColourCount {
    pub bin: PriceBin,
    pub colour: i64,
    pub count: usize,
}

/// Clicks per (price bin, colour). Prices outside every bin are skipped.
pub fn price_bins_by_colour(table: &ClickTable, edges: &[f64]) -> Vec<PriceColourCount> {
    let bins = price_bins(edges);
    let mut counts: BTreeMap<(usize, i64), usize> = BTreeMap::new();
    for r in table.records() {
        if let Some(i) = bin_index(&bins, r.price) {
            *counts.entry((i, r.colour)).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .map(|((i, colour), count)| PriceColourCount {
            bin: bins[i],
            colour,
            count,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Category trend by month
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryMonthCount {
    pub category: i64,
    pub category_name: String,
    pub month: i64,
    pub orders: usize,
}

pub fn orders_by_category_month(table: &ClickTable) -> Vec<CategoryMonthCount> {
    let mut counts: BTreeMap<(i64, i64), usize> = BTreeMap::new();
    for r in table.records() {
        *counts.entry((r.main_category, r.month)).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|((category, month), orders)| CategoryMonthCount {
            category,
            category_name: codes::category_name(category),
            month,
            orders,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Orders per country
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryOrders {
    pub country: i64,
    pub country_name: String,
    pub orders: usize,
    /// `orders` min-max scaled across countries.
    pub normalized: f64,
}

pub fn normalized_orders_by_country(table: &ClickTable) -> Vec<CountryOrders> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for r in table.records() {
        *counts.entry(r.country).or_default() += 1;
    }
    let raw: Vec<f64> = counts.values().map(|&c| c as f64).collect();
    let scaled = min_max_normalize(&raw);
    counts
        .into_iter()
        .zip(scaled)
        .map(|((country, orders), normalized)| CountryOrders {
            country,
            country_name: codes::country_name(country),
            orders,
            normalized,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Daily clicks per category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCategoryCount {
    pub year: i64,
    pub month: i64,
    pub day: i64,
    pub category: i64,
    pub count: usize,
}

/// Clicks per calendar day and category, by date then category.
pub fn daily_counts_by_category(table: &ClickTable) -> Vec<DailyCategoryCount> {
    let mut counts: BTreeMap<(i64, i64, i64, i64), usize> = BTreeMap::new();
    for r in table.records() {
        *counts
            .entry((r.year, r.month, r.day, r.main_category))
            .or_default() += 1;
    }
    counts
        .into_iter()
        .map(|((year, month, day, category), count)| DailyCategoryCount {
            year,
            month,
            day,
            category,
            count,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Average price per colour
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColourPrice {
    pub colour: i64,
    pub colour_name: String,
    pub mean_price: f64,
    pub count: usize,
}

pub fn average_price_by_colour(table: &ClickTable) -> Vec<ColourPrice> {
    let mut sums: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for r in table.records() {
        let entry = sums.entry(r.colour).or_insert((0.0, 0));
        entry.0 += r.price;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(colour, (sum, count))| ColourPrice {
            colour,
            colour_name: codes::colour_name(colour),
            mean_price: sum / count as f64,
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::ClickRecord;
    use crate::data::model::tests::click;

    fn on_day(month: i64, day: i64, category: i64) -> ClickRecord {
        ClickRecord {
            month,
            day,
            ..click(29, category, 1, 30.0)
        }
    }

    #[test]
    fn normalisation_spans_unit_interval() {
        assert_eq!(min_max_normalize(&[2.0, 4.0, 6.0]), vec![0.0, 0.5, 1.0]);
        assert_eq!(min_max_normalize(&[3.0, 3.0]), vec![1.0, 1.0]);
        assert!(min_max_normalize(&[]).is_empty());
    }

    #[test]
    fn country_orders_are_normalised() {
        let table = ClickTable::from_records(vec![
            click(29, 1, 1, 10.0),
            click(29, 1, 1, 10.0),
            click(29, 1, 1, 10.0),
            click(9, 1, 1, 10.0),
            click(16, 1, 1, 10.0),
            click(16, 1, 1, 10.0),
        ]);
        let view = normalized_orders_by_country(&table);
        let by_country: Vec<(i64, usize, f64)> =
            view.iter().map(|c| (c.country, c.orders, c.normalized)).collect();
        assert_eq!(by_country, vec![(9, 1, 0.0), (16, 2, 0.5), (29, 3, 1.0)]);
        assert_eq!(view[2].country_name, "Poland");
        assert!(view.iter().all(|c| (0.0..=1.0).contains(&c.normalized)));
        assert!(view.iter().any(|c| c.normalized == 1.0));
    }

    #[test]
    fn single_country_is_the_maximum() {
        let table = ClickTable::from_records(vec![click(29, 1, 1, 10.0)]);
        let view = normalized_orders_by_country(&table);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].normalized, 1.0);
    }

    #[test]
    fn empty_dataset_gives_empty_views() {
        let table = ClickTable::default();
        assert!(normalized_orders_by_country(&table).is_empty());
        assert!(orders_by_category_month(&table).is_empty());
        assert!(price_bins_by_colour(&table, &DEFAULT_PRICE_BIN_EDGES).is_empty());
        assert!(daily_counts_by_category(&table).is_empty());
        assert!(average_price_by_colour(&table).is_empty());
    }

    #[test]
    fn price_bins_are_right_closed() {
        let table = ClickTable::from_records(vec![
            click(29, 1, 2, 20.0),
            click(29, 1, 2, 20.5),
            click(29, 1, 3, 40.0),
            click(29, 1, 3, 82.0),
        ]);
        let view = price_bins_by_colour(&table, &DEFAULT_PRICE_BIN_EDGES);
        let rows: Vec<(String, i64, usize)> = view
            .iter()
            .map(|c| (c.bin.to_string(), c.colour, c.count))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("(0, 20]".to_string(), 2, 1),
                ("(20, 40]".to_string(), 2, 1),
                ("(20, 40]".to_string(), 3, 1),
            ]
        );
    }

    #[test]
    fn category_month_counts_are_named() {
        let table = ClickTable::from_records(vec![
            on_day(4, 1, 1),
            on_day(4, 2, 1),
            on_day(5, 1, 1),
            on_day(4, 1, 3),
        ]);
        let view = orders_by_category_month(&table);
        let rows: Vec<(&str, i64, usize)> = view
            .iter()
            .map(|c| (c.category_name.as_str(), c.month, c.orders))
            .collect();
        assert_eq!(
            rows,
            vec![("trousers", 4, 2), ("trousers", 5, 1), ("blouses", 4, 1)]
        );
    }

    #[test]
    fn daily_counts_sort_by_date() {
        let table = ClickTable::from_records(vec![
            on_day(5, 1, 2),
            on_day(4, 3, 1),
            on_day(4, 3, 1),
            on_day(4, 3, 4),
        ]);
        let view = daily_counts_by_category(&table);
        let rows: Vec<(i64, i64, i64, usize)> = view
            .iter()
            .map(|d| (d.month, d.day, d.category, d.count))
            .collect();
        assert_eq!(rows, vec![(4, 3, 1, 2), (4, 3, 4, 1), (5, 1, 2, 1)]);
    }

    #[test]
    fn average_price_per_colour() {
        let table = ClickTable::from_records(vec![
            click(29, 1, 2, 20.0),
            click(29, 1, 2, 40.0),
            click(29, 1, 14, 52.0),
        ]);
        let view = average_price_by_colour(&table);
        assert_eq!(view.len(), 2);
        assert_eq!((view[0].colour_name.as_str(), view[0].mean_price, view[0].count), ("black", 30.0, 2));
        assert_eq!((view[1].colour_name.as_str(), view[1].mean_price), ("white", 52.0));
    }
}
