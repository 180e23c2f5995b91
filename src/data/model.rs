use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Column schema of the clickstream file
// ---------------------------------------------------------------------------

/// Storage type of a column, both in the dataset and in feature records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    Text,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::Text => write!(f, "text"),
        }
    }
}

pub const COL_YEAR: &str = "year";
pub const COL_MONTH: &str = "month";
pub const COL_DAY: &str = "day";
pub const COL_ORDER: &str = "order";
pub const COL_COUNTRY: &str = "country";
pub const COL_SESSION: &str = "session ID";
pub const COL_CATEGORY: &str = "page 1 (main category)";
pub const COL_CLOTHING_MODEL: &str = "page 2 (clothing model)";
pub const COL_COLOUR: &str = "colour";
pub const COL_LOCATION: &str = "location";
pub const COL_PHOTOGRAPHY: &str = "model photography";
pub const COL_PRICE: &str = "price";
pub const COL_PRICE_ABOVE_AVERAGE: &str = "price 2";
pub const COL_PAGE: &str = "page";

/// Exact header of the clickstream file, in file order.
pub const CLICK_COLUMNS: [(&str, ColumnType); 14] = [
    (COL_YEAR, ColumnType::Integer),
    (COL_MONTH, ColumnType::Integer),
    (COL_DAY, ColumnType::Integer),
    (COL_ORDER, ColumnType::Integer),
    (COL_COUNTRY, ColumnType::Integer),
    (COL_SESSION, ColumnType::Integer),
    (COL_CATEGORY, ColumnType::Integer),
    (COL_CLOTHING_MODEL, ColumnType::Text),
    (COL_COLOUR, ColumnType::Integer),
    (COL_LOCATION, ColumnType::Integer),
    (COL_PHOTOGRAPHY, ColumnType::Integer),
    (COL_PRICE, ColumnType::Float),
    (COL_PRICE_ABOVE_AVERAGE, ColumnType::Integer),
    (COL_PAGE, ColumnType::Integer),
];

// ---------------------------------------------------------------------------
// CellValue – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell, ordered so it can live in a `BTreeSet`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Integer(_) => 0,
                Float(_) => 1,
                Text(_) => 2,
            }
        }
        match (self, other) {
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v:.2}"),
            CellValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl CellValue {
    pub fn column_type(&self) -> ColumnType {
        match self {
            CellValue::Integer(_) => ColumnType::Integer,
            CellValue::Float(_) => ColumnType::Float,
            CellValue::Text(_) => ColumnType::Text,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Text(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ClickRecord – one row of the source file
// ---------------------------------------------------------------------------

/// One logged page view within a shopping session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickRecord {
    pub year: i64,
    pub month: i64,
    pub day: i64,
    /// Position of the click within its session.
    pub order: i64,
    pub country: i64,
    #[serde(rename = "session ID")]
    pub session_id: i64,
    #[serde(rename = "page 1 (main category)")]
    pub main_category: i64,
    #[serde(rename = "page 2 (clothing model)")]
    pub clothing_model: String,
    pub colour: i64,
    pub location: i64,
    #[serde(rename = "model photography")]
    pub model_photography: i64,
    /// US dollars.
    pub price: f64,
    #[serde(rename = "price 2")]
    pub price_above_average: i64,
    pub page: i64,
}

impl ClickRecord {
    /// Value of a named column, `None` for unknown names.
    pub fn cell(&self, column: &str) -> Option<CellValue> {
        let value = match column {
            COL_YEAR => CellValue::Integer(self.year),
            COL_MONTH => CellValue::Integer(self.month),
            COL_DAY => CellValue::Integer(self.day),
            COL_ORDER => CellValue::Integer(self.order),
            COL_COUNTRY => CellValue::Integer(self.country),
            COL_SESSION => CellValue::Integer(self.session_id),
            COL_CATEGORY => CellValue::Integer(self.main_category),
            COL_CLOTHING_MODEL => CellValue::Text(self.clothing_model.clone()),
            COL_COLOUR => CellValue::Integer(self.colour),
            COL_LOCATION => CellValue::Integer(self.location),
            COL_PHOTOGRAPHY => CellValue::Integer(self.model_photography),
            COL_PRICE => CellValue::Float(self.price),
            COL_PRICE_ABOVE_AVERAGE => CellValue::Integer(self.price_above_average),
            COL_PAGE => CellValue::Integer(self.page),
            _ => return None,
        };
        Some(value)
    }
}

// ---------------------------------------------------------------------------
// ClickTable – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The loaded clickstream. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct ClickTable {
    records: Vec<ClickRecord>,
}

impl ClickTable {
    pub fn from_records(records: Vec<ClickRecord>) -> Self {
        ClickTable { records }
    }

    pub fn records(&self) -> &[ClickRecord] {
        &self.records
    }

    /// Column names in file order.
    pub fn columns(&self) -> Vec<&'static str> {
        CLICK_COLUMNS.iter().map(|(name, _)| *name).collect()
    }

    pub fn column_type(&self, column: &str) -> Option<ColumnType> {
        CLICK_COLUMNS
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, ty)| *ty)
    }

    /// Columns left after dropping `excluded`, in file order.
    pub fn project(&self, excluded: &BTreeSet<String>) -> Vec<(&'static str, ColumnType)> {
        CLICK_COLUMNS
            .iter()
            .filter(|(name, _)| !excluded.contains(*name))
            .copied()
            .collect()
    }

    /// Sorted distinct values of one column.
    pub fn unique_values(&self, column: &str) -> BTreeSet<CellValue> {
        self.records.iter().filter_map(|r| r.cell(column)).collect()
    }

    /// Per-column distinct value counts, keyed by column name.
    pub fn cardinalities(&self) -> BTreeMap<&'static str, usize> {
        self.columns()
            .into_iter()
            .map(|col| (col, self.unique_values(col).len()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
