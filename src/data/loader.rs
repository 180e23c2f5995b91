use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use arrow::array::{
    Array, AsArray, Float32Array, Float64Array, Int16Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::codes;
use super::model::{CLICK_COLUMNS, ClickRecord, ClickTable};
use crate::error::{DashboardError, Result};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load the clickstream from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` – delimited text with the exact clickstream header
/// * `.parquet`      – Parquet file with the same column names, in order
pub fn load(path: &Path, delimiter: u8) -> Result<ClickTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let loaded = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "csv" | "txt" => load_delimited(path, delimiter),
        other => Err(anyhow::anyhow!("unsupported file extension: .{other}")),
    };

    match loaded {
        Ok(table) => {
            log::info!(
                "Loaded {} click records from {} ({} columns)",
                table.len(),
                path.display(),
                CLICK_COLUMNS.len()
            );
            Ok(table)
        }
        Err(e) => {
            log::error!("Failed to load {}: {e:#}", path.display());
            Err(DashboardError::dataset(path, format!("{e:#}")))
        }
    }
}

/// Header names must match the clickstream schema by name, position and count.
fn check_header<'a>(found: impl Iterator<Item = &'a str>) -> anyhow::Result<()> {
    let found: Vec<&str> = found.collect();
    if found.len() != CLICK_COLUMNS.len() {
        bail!(
            "expected {} columns but found {}: {:?}",
            CLICK_COLUMNS.len(),
            found.len(),
            found
        );
    }
    for (i, ((expected, _), actual)) in CLICK_COLUMNS.iter().zip(&found).enumerate() {
        if expected != actual {
            bail!("column {} is '{actual}', expected '{expected}'", i + 1);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Delimited text loader
// ---------------------------------------------------------------------------

fn load_delimited(path: &Path, delimiter: u8) -> anyhow::Result<ClickTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_path(path)
        .context("opening clickstream file")?;

    let headers = reader.headers().context("reading header row")?.clone();
    check_header(headers.iter())?;

    let mut records = Vec::new();
    for (i, result) in reader.deserialize::<ClickRecord>().enumerate() {
        let row = i + 1;
        let record = result.with_context(|| format!("data row {row}"))?;
        validate_record(&record).with_context(|| format!("data row {row}"))?;
        records.push(record);
    }

    Ok(ClickTable::from_records(records))
}

// ---------------------------------------------------------------------------
// Row validation
// ---------------------------------------------------------------------------

fn check_code(column: &str, value: i64, range: RangeInclusive<i64>) -> anyhow::Result<()> {
    if !range.contains(&value) {
        bail!(
            "'{column}' = {value} is outside {}..={}",
            range.start(),
            range.end()
        );
    }
    Ok(())
}

fn validate_record(r: &ClickRecord) -> anyhow::Result<()> {
    check_code("month", r.month, 1..=12)?;
    check_code("day", r.day, 1..=31)?;
    check_code("order", r.order, 1..=i64::MAX)?;
    check_code("page", r.page, 1..=i64::MAX)?;
    check_code("country", r.country, codes::COUNTRY_RANGE)?;
    check_code("page 1 (main category)", r.main_category, codes::CATEGORY_RANGE)?;
    check_code("colour", r.colour, codes::COLOUR_RANGE)?;
    check_code("location", r.location, codes::LOCATION_RANGE)?;
    check_code("model photography", r.model_photography, codes::PHOTOGRAPHY_RANGE)?;
    check_code("price 2", r.price_above_average, codes::PRICE_ABOVE_AVERAGE_RANGE)?;
    if !(r.price.is_finite() && r.price > 0.0) {
        bail!("'price' = {} is not a positive amount", r.price);
    }
    if r.clothing_model.is_empty() {
        bail!("'page 2 (clothing model)' is empty");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with the clickstream columns.
///
/// Integer columns may be Int16, Int32 or Int64; `price` may be Float32,
/// Float64 or an integer type; the clothing model is Utf8 or LargeUtf8.
fn load_parquet(path: &Path) -> anyhow::Result<ClickTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    // Checked on the file schema so that a file without row groups is covered too.
    check_header(builder.schema().fields().iter().map(|f| f.name().as_str()))?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;

        let cols = batch.columns();
        for row in 0..batch.num_rows() {
            let data_row = records.len() + 1;
            let int = |idx: usize| {
                int_at(&cols[idx], row).with_context(|| {
                    format!("data row {data_row}, column '{}'", CLICK_COLUMNS[idx].0)
                })
            };
            let record = ClickRecord {
                year: int(0)?,
                month: int(1)?,
                day: int(2)?,
                order: int(3)?,
                country: int(4)?,
                session_id: int(5)?,
                main_category: int(6)?,
                clothing_model: text_at(&cols[7], row)
                    .with_context(|| format!("data row {data_row}, column 'page 2 (clothing model)'"))?,
                colour: int(8)?,
                location: int(9)?,
                model_photography: int(10)?,
                price: float_at(&cols[11], row)
                    .with_context(|| format!("data row {data_row}, column 'price'"))?,
                price_above_average: int(12)?,
                page: int(13)?,
            };
            validate_record(&record).with_context(|| format!("data row {data_row}"))?;
            records.push(record);
        }
    }

    Ok(ClickTable::from_records(records))
}

// -- Arrow helpers --

fn int_at(col: &Arc<dyn Array>, row: usize) -> anyhow::Result<i64> {
    if col.is_null(row) {
        bail!("null value");
    }
    let value = match col.data_type() {
        DataType::Int16 => col
            .as_any()
            .downcast_ref::<Int16Array>()
            .map(|a| a.value(row) as i64),
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .map(|a| a.value(row) as i64),
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .map(|a| a.value(row)),
        other => bail!("expected an integer column, got {other:?}"),
    };
    value.context("column array does not match its declared type")
}

fn float_at(col: &Arc<dyn Array>, row: usize) -> anyhow::Result<f64> {
    if col.is_null(row) {
        bail!("null value");
    }
    match col.data_type() {
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .map(|a| a.value(row))
            .context("column array does not match its declared type"),
        DataType::Float32 => col
            .as_any()
            .downcast_ref::<Float32Array>()
            .map(|a| a.value(row) as f64)
            .context("column array does not match its declared type"),
        _ => int_at(col, row).map(|v| v as f64),
    }
}

fn text_at(col: &Arc<dyn Array>, row: usize) -> anyhow::Result<String> {
    if col.is_null(row) {
        bail!("null value");
    }
    match col.data_type() {
        DataType::Utf8 => col
            .as_any()
            .downcast_ref::<StringArray>()
            .map(|a| a.value(row).to_string())
            .context("column array does not match its declared type"),
        DataType::LargeUtf8 => Ok(col.as_string::<i64>().value(row).to_string()),
        other => bail!("expected a string column, got {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;

    const HEADER: &str = "year;month;day;order;country;session ID;page 1 (main category);\
page 2 (clothing model);colour;location;model photography;price;price 2;page";

    fn write_csv(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    fn sample_csv() -> String {
        format!(
            "{HEADER}\n\
2008;4;1;1;29;1;1;A13;1;5;1;28;2;1\n\
2008;4;1;2;29;1;1;A16;1;6;1;33;2;1\n\
2008;4;2;1;9;2;3;C20;14;1;2;52;1;1\n"
        )
    }

    #[test]
    fn loads_semicolon_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "clicks.csv", &sample_csv());
        let table = load(&path, b';').unwrap();
        assert_eq!(table.len(), 3);
        let last = &table.records()[2];
        assert_eq!(last.country, 9);
        assert_eq!(last.clothing_model, "C20");
        assert_eq!(last.price, 52.0);
        assert_eq!(last.price_above_average, 1);
    }

    #[test]
    fn loading_twice_gives_identical_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "clicks.csv", &sample_csv());
        let a = load(&path, b';').unwrap();
        let b = load(&path, b';').unwrap();
        assert_eq!(a.len(), b.len());
        assert_eq!(a.columns(), b.columns());
        assert_eq!(a.records(), b.records());
    }

    #[test]
    fn header_only_file_is_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "clicks.csv", &format!("{HEADER}\n"));
        let table = load(&path, b';').unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn missing_file_is_dataset_error() {
        let err = load(Path::new("/nonexistent/clicks.csv"), b';').unwrap_err();
        assert!(matches!(err, DashboardError::DatasetLoad { .. }));
    }

    #[test]
    fn reordered_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let header = HEADER.replacen("year;month", "month;year", 1);
        let path = write_csv(&dir, "clicks.csv", &format!("{header}\n"));
        let err = load(&path, b';').unwrap_err();
        assert!(err.to_string().contains("column 1 is 'month'"), "{err}");
    }

    #[test]
    fn missing_column_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let header = HEADER.trim_end_matches(";page");
        let path = write_csv(&dir, "clicks.csv", &format!("{header}\n"));
        let err = load(&path, b';').unwrap_err();
        assert!(err.to_string().contains("expected 14 columns"), "{err}");
    }

    #[test]
    fn wrong_delimiter_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "clicks.csv", &sample_csv());
        assert!(load(&path, b',').is_err());
    }

    #[test]
    fn out_of_range_code_names_the_row() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!("{HEADER}\n2008;4;1;1;29;1;1;A13;1;5;1;28;2;1\n2008;4;1;2;29;1;1;A16;15;6;1;33;2;1\n");
        let path = write_csv(&dir, "clicks.csv", &body);
        let err = load(&path, b';').unwrap_err().to_string();
        assert!(err.contains("data row 2"), "{err}");
        assert!(err.contains("'colour' = 15"), "{err}");
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "clicks.xlsx", &sample_csv());
        let err = load(&path, b';').unwrap_err();
        assert!(err.to_string().contains("unsupported file extension"));
    }

    #[test]
    fn loads_parquet_file() {
        let mut fields = Vec::new();
        let mut arrays: Vec<Arc<dyn Array>> = Vec::new();
        for (name, ty) in CLICK_COLUMNS {
            match ty {
                crate::data::model::ColumnType::Integer => {
                    let value = match name {
                        "country" => 29,
                        "location" => 5,
                        "price 2" => 2,
                        "year" => 2008,
                        _ => 1,
                    };
                    fields.push(Field::new(name, DataType::Int64, false));
                    arrays.push(Arc::new(Int64Array::from(vec![value, value])));
                }
                crate::data::model::ColumnType::Float => {
                    fields.push(Field::new(name, DataType::Float64, false));
                    arrays.push(Arc::new(Float64Array::from(vec![28.0, 43.5])));
                }
                crate::data::model::ColumnType::Text => {
                    fields.push(Field::new(name, DataType::Utf8, false));
                    arrays.push(Arc::new(StringArray::from(vec!["A13", "P1"])));
                }
            }
        }
        let schema = Arc::new(Schema::new(fields));
        let batch = RecordBatch::try_new(schema.clone(), arrays).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clicks.parquet");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load(&path, b';').unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[1].price, 43.5);
        assert_eq!(table.records()[1].clothing_model, "P1");
        assert_eq!(table.records()[0].country, 29);
    }

    #[test]
    fn empty_parquet_with_wrong_columns_is_rejected() {
        let schema = Arc::new(Schema::new(vec![Field::new("bogus", DataType::Int64, false)]));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clicks.parquet");
        let file = std::fs::File::create(&path).unwrap();
        let writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.close().unwrap();

        let err = load(&path, b';').unwrap_err();
        assert!(matches!(err, DashboardError::DatasetLoad { .. }));
        assert!(err.to_string().contains("expected 14 columns"), "{err}");
    }
}
