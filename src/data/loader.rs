use std::io::Cursor;
use std::sync::Arc;

use arrow::array::{
    Array, AsArray, BooleanArray, Date32Array, Float32Array, Float64Array, Int32Array,
    Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Days, NaiveDate};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{parse_date, CellValue, RawTable};
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Format of a tabular source, chosen from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Excel,
    Csv,
    Json,
    Parquet,
}

impl TableFormat {
    /// Detect the format from a path or URL (query string and fragment ignored).
    pub fn from_source(source: &str) -> Result<Self, LoadError> {
        let path = source.split(['?', '#']).next().unwrap_or(source);
        let file = path.rsplit('/').next().unwrap_or(path);
        let ext = file
            .rsplit_once('.')
            .map(|(_, e)| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(Self::Excel),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "parquet" | "pq" => Ok(Self::Parquet),
            other => Err(LoadError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Parse source bytes into a [`RawTable`].  Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx` and friends – first worksheet, first row is the header
/// * `.csv`     – header row, types guessed per cell
/// * `.json`    – `[{ "Event ID": 1, "Description": "...", ... }, ...]`
/// * `.parquet` – flat columns written by Pandas or Polars
pub fn parse_table(source: &str, bytes: &[u8]) -> Result<RawTable, LoadError> {
    let table = match TableFormat::from_source(source)? {
        TableFormat::Excel => parse_excel(bytes)?,
        TableFormat::Csv => parse_csv(bytes)?,
        TableFormat::Json => parse_json(bytes)?,
        TableFormat::Parquet => parse_parquet(bytes)?,
    };
    log::debug!(
        "parsed {source}: {} rows, columns {:?}",
        table.rows.len(),
        table.headers
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// Excel loader
// ---------------------------------------------------------------------------

fn parse_excel(bytes: &[u8]) -> Result<RawTable, LoadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| LoadError::Spreadsheet(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::Spreadsheet("workbook has no sheets".into()))?
        .map_err(|e| LoadError::Spreadsheet(e.to_string()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|c| excel_cell(c).as_text().unwrap_or_default())
            .collect(),
        None => return Ok(RawTable::default()),
    };

    let rows = rows
        .map(|r| r.iter().map(excel_cell).collect::<Vec<_>>())
        .collect();

    Ok(RawTable { headers, rows })
}

fn excel_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::String(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(CellValue::Date)
            .unwrap_or(CellValue::Null),
        Data::DateTimeIso(s) => parse_date(s)
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::String(s.clone())),
        Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Null,
    }
}

/// Excel stores dates as days since 1899-12-30 (1900 date system).
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn parse_csv(bytes: &[u8]) -> Result<RawTable, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(guess_cell_type).collect());
    }

    Ok(RawTable { headers, rows })
}

fn guess_cell_type(s: &str) -> CellValue {
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`.
fn parse_json(bytes: &[u8]) -> Result<RawTable, LoadError> {
    let root: JsonValue = serde_json::from_slice(bytes)?;
    let records = root.as_array().ok_or_else(|| LoadError::Row {
        row: 0,
        message: "expected top-level JSON array".into(),
    })?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec.as_object().ok_or_else(|| LoadError::Row {
            row: i,
            message: "not a JSON object".into(),
        })?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map(json_to_cell).unwrap_or(CellValue::Null))
                .collect()
        })
        .collect();

    Ok(RawTable { headers, rows })
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn parse_parquet(bytes: &[u8]) -> Result<RawTable, LoadError> {
    let data = bytes::Bytes::copy_from_slice(bytes);
    let reader = ParquetRecordBatchReaderBuilder::try_new(data)?.build()?;

    let mut headers: Vec<String> = Vec::new();
    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;
        if headers.is_empty() {
            headers = batch
                .schema()
                .fields()
                .iter()
                .map(|f| f.name().clone())
                .collect();
        }
        for row in 0..batch.num_rows() {
            rows.push(
                batch
                    .columns()
                    .iter()
                    .map(|col| extract_cell(col, row))
                    .collect(),
            );
        }
    }

    Ok(RawTable { headers, rows })
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    let any = col.as_any();
    match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|s| CellValue::String(s.value(row).to_string()))
            .unwrap_or(CellValue::Null),
        DataType::LargeUtf8 => CellValue::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| CellValue::Integer(a.value(row) as i64))
            .unwrap_or(CellValue::Null),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| CellValue::Integer(a.value(row)))
            .unwrap_or(CellValue::Null),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| CellValue::Float(a.value(row) as f64))
            .unwrap_or(CellValue::Null),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| CellValue::Float(a.value(row)))
            .unwrap_or(CellValue::Null),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| CellValue::Bool(a.value(row)))
            .unwrap_or(CellValue::Null),
        DataType::Date32 => any
            .downcast_ref::<Date32Array>()
            .and_then(|a| a.value_as_date(row))
            .map(CellValue::Date)
            .unwrap_or(CellValue::Null),
        // Timestamps and anything else go through Arrow's display formatting.
        _ => match arrow::util::display::array_value_to_string(col.as_ref(), row) {
            Ok(text) => parse_date(&text)
                .map(CellValue::Date)
                .unwrap_or(CellValue::String(text)),
            Err(_) => CellValue::Null,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use pretty_assertions::assert_eq;

    #[test]
    fn format_detection_ignores_query_strings() {
        assert_eq!(
            TableFormat::from_source("https://host/a/TRATADO.xlsx?raw=true").unwrap(),
            TableFormat::Excel
        );
        assert_eq!(TableFormat::from_source("events.CSV").unwrap(), TableFormat::Csv);
        assert!(matches!(
            TableFormat::from_source("notes.txt"),
            Err(LoadError::UnsupportedFormat(ext)) if ext == "txt"
        ));
    }

    #[test]
    fn csv_cells_are_typed() {
        let bytes = b"Event ID,Description,Score\n7,Slip on deck,0.5\n8,,\n";
        let t = parse_table("x.csv", bytes).unwrap();
        assert_eq!(t.headers, vec!["Event ID", "Description", "Score"]);
        assert_eq!(
            t.rows[0],
            vec![
                CellValue::Integer(7),
                CellValue::String("Slip on deck".into()),
                CellValue::Float(0.5)
            ]
        );
        assert_eq!(t.rows[1][1], CellValue::Null);
    }

    #[test]
    fn json_records_union_their_keys() {
        let bytes = br#"[{"a": 1, "b": "x"}, {"a": 2, "c": true}]"#;
        let t = parse_table("x.json", bytes).unwrap();
        assert_eq!(t.headers, vec!["a", "b", "c"]);
        assert_eq!(t.rows[1], vec![CellValue::Integer(2), CellValue::Null, CellValue::Bool(true)]);
    }

    #[test]
    fn parquet_columns_round_trip_through_bytes() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("Event ID", DataType::Int64, false),
            Field::new("Location", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![1, 2])),
                Arc::new(StringArray::from(vec![Some("P-52"), None])),
            ],
        )
        .unwrap();
        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let t = parse_table("events.parquet", &buf).unwrap();
        assert_eq!(t.headers, vec!["Event ID", "Location"]);
        assert_eq!(t.rows[0], vec![CellValue::Integer(1), CellValue::String("P-52".into())]);
        assert_eq!(t.rows[1][1], CellValue::Null);
    }

    #[test]
    fn excel_serials_map_to_calendar_dates() {
        assert_eq!(excel_serial_to_date(45000.0), NaiveDate::from_ymd_opt(2023, 3, 15));
        assert_eq!(excel_serial_to_date(-1.0), None);
    }
}
