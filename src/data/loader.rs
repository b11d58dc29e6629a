use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CandidateRecord, CandidateTable, FieldValue};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a candidate table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – Parquet file with scalar columns (recommended)
/// * `.json`    – `[{ "period": 12.3, "depth": 0.4, ... }, ...]`
/// * `.csv`     – header row with column names, one candidate per row
pub fn load_file(path: &Path) -> Result<CandidateTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "period": 12.3, "planet_radius": 1.1, "host": "K00752" },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<CandidateTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json_records(&text)
}

fn parse_json_records(text: &str) -> Result<CandidateTable> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;

    let records_json = root.as_array().context("Expected top-level JSON array")?;

    let mut records = Vec::with_capacity(records_json.len());

    for (i, rec) in records_json.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let mut fields = BTreeMap::new();
        for (key, val) in obj {
            fields.insert(key.clone(), json_to_field(val));
        }

        records.push(CandidateRecord { fields });
    }

    Ok(CandidateTable::from_records(records))
}

fn json_to_field(val: &JsonValue) -> FieldValue {
    match val {
        JsonValue::String(s) => FieldValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                FieldValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                FieldValue::Float(f)
            } else {
                FieldValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => FieldValue::Bool(*b),
        JsonValue::Null => FieldValue::Null,
        other => FieldValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, every following row is one
/// candidate.  Cell types are guessed (int → float → bool → string);
/// empty cells become Null.
fn load_csv(path: &Path) -> Result<CandidateTable> {
    let file = std::fs::File::open(path).context("opening CSV")?;
    parse_csv(file)
}

fn parse_csv(input: impl Read) -> Result<CandidateTable> {
    let mut reader = csv::Reader::from_reader(input);
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut records = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let mut fields = BTreeMap::new();
        for (col_idx, value) in record.iter().enumerate() {
            let col_name = headers
                .get(col_idx)
                .with_context(|| format!("CSV row {row_no}: more cells than headers"))?;
            fields.insert(col_name.clone(), guess_field_type(value));
        }

        records.push(CandidateRecord { fields });
    }

    Ok(CandidateTable::from_records(records))
}

fn guess_field_type(s: &str) -> FieldValue {
    if s.is_empty() {
        return FieldValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return FieldValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return FieldValue::Float(f);
    }
    if s == "true" || s == "false" {
        return FieldValue::Bool(s == "true");
    }
    FieldValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing a candidate table.
///
/// Every column is treated as a scalar field (strings, ints, floats,
/// bools).  Works with files written by both **Pandas** (`df.to_parquet()`)
/// and **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<CandidateTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let n_rows = batch.num_rows();

        let columns: Vec<(usize, String)> = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(i, f)| (i, f.name().clone()))
            .collect();

        for row in 0..n_rows {
            let mut fields = BTreeMap::new();
            for (col_idx, col_name) in &columns {
                let col_array = batch.column(*col_idx);
                let value = extract_field_value(col_array, row)
                    .with_context(|| format!("Row {row}: failed to read '{col_name}'"))?;
                fields.insert(col_name.clone(), value);
            }
            records.push(CandidateRecord { fields });
        }
    }

    Ok(CandidateTable::from_records(records))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_field_value(col: &Arc<dyn Array>, row: usize) -> Result<FieldValue> {
    if col.is_null(row) {
        return Ok(FieldValue::Null);
    }
    let value = match col.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => {
            if let Some(s) = col.as_any().downcast_ref::<StringArray>() {
                FieldValue::String(s.value(row).to_string())
            } else {
                // LargeStringArray
                let s = col.as_string::<i64>();
                FieldValue::String(s.value(row).to_string())
            }
        }
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            FieldValue::Integer(arr.value(row) as i64)
        }
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            FieldValue::Integer(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            FieldValue::Float(arr.value(row) as f64)
        }
        DataType::Float64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            FieldValue::Float(arr.value(row))
        }
        DataType::Boolean => {
            let arr = col
                .as_any()
                .downcast_ref::<BooleanArray>()
                .context("expected BooleanArray")?;
            FieldValue::Bool(arr.value(row))
        }
        other => bail!("Unsupported parquet column type: {other:?}"),
    };
    Ok(value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_cells_are_type_guessed() {
        let csv = "period,planet_radius,host,flagged,notes\n\
                   12,1.5,K00752,true,\n";
        let table = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);

        let rec = &table.records[0];
        assert_eq!(rec.fields["period"], FieldValue::Integer(12));
        assert_eq!(rec.fields["planet_radius"], FieldValue::Float(1.5));
        assert_eq!(rec.fields["host"], FieldValue::String("K00752".into()));
        assert_eq!(rec.fields["flagged"], FieldValue::Bool(true));
        assert_eq!(rec.fields["notes"], FieldValue::Null);
    }

    #[test]
    fn csv_column_order_is_stable() {
        let csv = "zeta,alpha\n1,2\n3,4\n";
        let table = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.column_names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn json_records_parse_into_fields() {
        let json = r#"[
            {"period": 12.3, "depth": 400, "host": "K00752", "ok": false, "gap": null}
        ]"#;
        let table = parse_json_records(json).unwrap();
        let rec = &table.records[0];
        assert_eq!(rec.fields["period"], FieldValue::Float(12.3));
        assert_eq!(rec.fields["depth"], FieldValue::Integer(400));
        assert_eq!(rec.fields["host"], FieldValue::String("K00752".into()));
        assert_eq!(rec.fields["ok"], FieldValue::Bool(false));
        assert_eq!(rec.fields["gap"], FieldValue::Null);
    }

    #[test]
    fn json_top_level_must_be_array() {
        assert!(parse_json_records(r#"{"period": 1.0}"#).is_err());
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        assert!(load_file(Path::new("data.xlsx")).is_err());
    }
}
