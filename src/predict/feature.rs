use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::data::filter::{FilterRanges, FilterSelection};
use crate::data::model::{COL_COLOUR, COL_LOCATION, COL_PHOTOGRAPHY, COL_PRICE, CellValue, ClickTable, ColumnType};
use crate::error::{DashboardError, Result};

/// Columns that are dropped from the clickstream before it meets the model:
/// the prediction target, leakage and derived columns.
pub const DEFAULT_EXCLUDED_COLUMNS: [&str; 11] = [
    "order",
    "year",
    "month",
    "day",
    "country",
    "session ID",
    "page 2 (clothing model)",
    "price 2",
    "page",
    "page 1 (main category)",
    "price-bin",
];

pub fn default_excluded_columns() -> BTreeSet<String> {
    DEFAULT_EXCLUDED_COLUMNS.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Feature contract
// ---------------------------------------------------------------------------

/// Which filter control feeds a feature column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionField {
    Price,
    Colour,
    Location,
    Category,
    Photography,
}

impl SelectionField {
    fn value(self, selection: &FilterSelection) -> CellValue {
        match self {
            SelectionField::Price => CellValue::Float(selection.price),
            SelectionField::Colour => CellValue::Integer(selection.colour),
            SelectionField::Location => CellValue::Integer(selection.location),
            SelectionField::Category => CellValue::Integer(selection.category),
            SelectionField::Photography => CellValue::Integer(selection.photography),
        }
    }
}

/// A named, typed column as a model declares it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    pub dtype: ColumnType,
}

impl fmt::Display for FeatureColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.dtype)
    }
}

/// A feature column plus the filter control that fills it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureBinding {
    #[serde(flatten)]
    pub column: FeatureColumn,
    pub source: SelectionField,
}

impl FeatureBinding {
    pub fn new(name: &str, dtype: ColumnType, source: SelectionField) -> Self {
        Self {
            column: FeatureColumn {
                name: name.to_string(),
                dtype,
            },
            source,
        }
    }
}

/// The exact, ordered input layout a trained model expects.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    bindings: Vec<FeatureBinding>,
}

impl Default for FeatureSchema {
    /// Layout of the clicks classifier: the selection columns in the order
    /// the filter form builds them.
    fn default() -> Self {
        FeatureSchema {
            bindings: default_bindings(),
        }
    }
}

pub fn default_bindings() -> Vec<FeatureBinding> {
    vec![
        FeatureBinding::new(COL_PRICE, ColumnType::Float, SelectionField::Price),
        FeatureBinding::new(COL_COLOUR, ColumnType::Integer, SelectionField::Colour),
        FeatureBinding::new(COL_LOCATION, ColumnType::Integer, SelectionField::Location),
        FeatureBinding::new("page1", ColumnType::Integer, SelectionField::Category),
        FeatureBinding::new(COL_PHOTOGRAPHY, ColumnType::Integer, SelectionField::Photography),
    ]
}

impl FeatureSchema {
    /// Check the layout is usable: non-empty, unique names, each control
    /// bound at most once, and numeric types that hold the control's value.
    pub fn new(bindings: Vec<FeatureBinding>) -> std::result::Result<Self, String> {
        if bindings.is_empty() {
            return Err("feature schema has no columns".to_string());
        }
        let mut names = BTreeSet::new();
        let mut sources = BTreeSet::new();
        for b in &bindings {
            if !names.insert(b.column.name.as_str()) {
                return Err(format!("duplicate feature column '{}'", b.column.name));
            }
            if !sources.insert(b.source) {
                return Err(format!("control {:?} is bound to more than one column", b.source));
            }
            let allowed = match b.source {
                SelectionField::Price => b.column.dtype == ColumnType::Float,
                _ => b.column.dtype != ColumnType::Text,
            };
            if !allowed {
                return Err(format!(
                    "column '{}' cannot hold {:?} as {}",
                    b.column.name, b.source, b.column.dtype
                ));
            }
        }
        Ok(FeatureSchema { bindings })
    }

    pub fn bindings(&self) -> &[FeatureBinding] {
        &self.bindings
    }

    pub fn columns(&self) -> Vec<FeatureColumn> {
        self.bindings.iter().map(|b| b.column.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&FeatureColumn> {
        self.bindings
            .iter()
            .map(|b| &b.column)
            .find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Describe how `other` differs from this layout, or `None` if identical.
    pub fn mismatch(&self, other: &[FeatureColumn]) -> Option<String> {
        column_mismatch(&self.columns(), other)
    }
}

/// Describe how `actual` differs from `expected`, or `None` if identical.
pub fn column_mismatch(expected: &[FeatureColumn], actual: &[FeatureColumn]) -> Option<String> {
    if expected.len() != actual.len() {
        return Some(format!(
            "expected {} columns [{}], got {} [{}]",
            expected.len(),
            join(expected),
            actual.len(),
            join(actual)
        ));
    }
    expected
        .iter()
        .zip(actual)
        .enumerate()
        .find(|(_, (a, b))| a != b)
        .map(|(i, (a, b))| format!("column {} is {b}, expected {a}", i + 1))
}

fn join(columns: &[FeatureColumn]) -> String {
    columns
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// FeatureRecord – the one row handed to the model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    columns: Vec<FeatureColumn>,
    values: Vec<CellValue>,
}

impl FeatureRecord {
    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&CellValue> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .map(|i| &self.values[i])
    }

    /// Values as a numeric vector, in column order.
    pub fn to_f64_row(&self) -> Vec<f64> {
        self.values
            .iter()
            .map(|v| v.as_f64().unwrap_or(f64::NAN))
            .collect()
    }

    /// Single-row Arrow batch with the record's exact schema.
    pub fn to_record_batch(&self) -> std::result::Result<RecordBatch, ArrowError> {
        let mut fields = Vec::with_capacity(self.columns.len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.columns.len());
        for (col, value) in self.columns.iter().zip(&self.values) {
            match (col.dtype, value) {
                (ColumnType::Integer, CellValue::Integer(v)) => {
                    fields.push(Field::new(&col.name, DataType::Int64, false));
                    arrays.push(Arc::new(Int64Array::from(vec![*v])));
                }
                (ColumnType::Float, v) => {
                    fields.push(Field::new(&col.name, DataType::Float64, false));
                    arrays.push(Arc::new(Float64Array::from(vec![v.as_f64().unwrap_or(f64::NAN)])));
                }
                (dtype, v) => {
                    return Err(ArrowError::InvalidArgumentError(format!(
                        "column '{}' declared {dtype} but holds {v}",
                        col.name
                    )));
                }
            }
        }
        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
    }
}

impl fmt::Display for FeatureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let batch = self.to_record_batch().map_err(|_| fmt::Error)?;
        let table = arrow::util::pretty::pretty_format_batches(&[batch]).map_err(|_| fmt::Error)?;
        write!(f, "{table}")
    }
}

// ---------------------------------------------------------------------------
// Assembler
// ---------------------------------------------------------------------------

/// Builds feature records from filter selections against a fixed contract.
#[derive(Debug, Clone)]
pub struct FeatureAssembler {
    schema: FeatureSchema,
    excluded: BTreeSet<String>,
    ranges: FilterRanges,
}

impl Default for FeatureAssembler {
    fn default() -> Self {
        Self::new(
            FeatureSchema::default(),
            default_excluded_columns(),
            FilterRanges::default(),
        )
    }
}

impl FeatureAssembler {
    pub fn new(schema: FeatureSchema, excluded: BTreeSet<String>, ranges: FilterRanges) -> Self {
        Self {
            schema,
            excluded,
            ranges,
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn ranges(&self) -> &FilterRanges {
        &self.ranges
    }

    /// Validate `selection` and lay it out as one feature row.
    ///
    /// `reference` contributes no rows. Its columns left after dropping the
    /// excluded set must each appear in the contract with the same type, so
    /// dataset drift surfaces here instead of inside the model.
    pub fn assemble(&self, selection: &FilterSelection, reference: &ClickTable) -> Result<FeatureRecord> {
        selection.validate(&self.ranges)?;

        for (name, dtype) in reference.project(&self.excluded) {
            match self.schema.column(name) {
                Some(col) if col.dtype == dtype => {}
                Some(col) => {
                    return Err(DashboardError::prediction(format!(
                        "dataset column '{name}' is {dtype} but the feature contract declares {}",
                        col.dtype
                    )));
                }
                None => {
                    return Err(DashboardError::prediction(format!(
                        "dataset column '{name}' is neither excluded nor part of the feature contract"
                    )));
                }
            }
        }

        let values = self
            .schema
            .bindings()
            .iter()
            .map(|b| match (b.column.dtype, b.source.value(selection)) {
                (ColumnType::Float, CellValue::Integer(v)) => CellValue::Float(v as f64),
                (_, v) => v,
            })
            .collect();

        Ok(FeatureRecord {
            columns: self.schema.columns(),
            values,
        })
    }
}

/// Assemble with the default contract, default ranges and the given exclusions.
pub fn assemble(
    selection: &FilterSelection,
    reference: &ClickTable,
    excluded_columns: &BTreeSet<String>,
) -> Result<FeatureRecord> {
    FeatureAssembler::new(
        FeatureSchema::default(),
        excluded_columns.clone(),
        FilterRanges::default(),
    )
    .assemble(selection, reference)
}
