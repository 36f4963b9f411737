use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use arrow::array::{Array, AsArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::{Map, Value as JsonValue};

use super::error::IngestError;
use super::model::{Floors, Record, RecordStore, REQUIRED_COLUMNS};

/// Number of required columns; cells are always passed in `REQUIRED_COLUMNS` order.
const N_COLUMNS: usize = REQUIRED_COLUMNS.len();

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a housing dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row naming at least the required columns
/// * `.json`    – `[{ "price": 221900.0, "date": "20141013T000000", ... }, ...]`
/// * `.parquet` – any integer/float/string/date column types
pub fn load_file(path: &Path) -> Result<RecordStore, IngestError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let open = || {
        File::open(path).map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })
    };

    let store = match ext.as_str() {
        "csv" => load_csv_reader(BufReader::new(open()?)),
        "json" => load_json_reader(BufReader::new(open()?)),
        "parquet" | "pq" => load_parquet(open()?),
        other => Err(IngestError::UnsupportedFormat(other.to_string())),
    }?;

    log::info!("Loaded {} records from {}", store.len(), path.display());
    Ok(store)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one sale per line.
/// Columns beyond the required set (`id`, `bathrooms`, `lat`, ...) are ignored.
pub fn load_csv_reader<R: Read>(reader: R) -> Result<RecordStore, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let mut positions = [0usize; N_COLUMNS];
    for (slot, name) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h == name)
            .ok_or(IngestError::MissingColumn(name))?;
    }

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let row = result?;
        let cells: [&str; N_COLUMNS] = std::array::from_fn(|i| row.get(positions[i]).unwrap_or(""));
        records.push(parse_record(row_no + 1, &cells)?);
    }

    RecordStore::from_records(records)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')` layout.
pub fn load_json_reader<R: Read>(reader: R) -> Result<RecordStore, IngestError> {
    let rows: Vec<Map<String, JsonValue>> = serde_json::from_reader(reader)?;

    let mut records = Vec::with_capacity(rows.len());
    for (row_no, obj) in rows.iter().enumerate() {
        let mut owned: [String; N_COLUMNS] = Default::default();
        for (slot, name) in owned.iter_mut().zip(REQUIRED_COLUMNS) {
            let value = obj.get(name).ok_or(IngestError::MissingColumn(name))?;
            *slot = json_to_text(value);
        }
        let cells: [&str; N_COLUMNS] = std::array::from_fn(|i| owned[i].as_str());
        records.push(parse_record(row_no + 1, &cells)?);
    }

    RecordStore::from_records(records)
}

fn json_to_text(val: &JsonValue) -> String {
    match val {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet table. Every required column is cast to text and parsed
/// through the same path as CSV, so any numeric width or a native date
/// column works.
fn load_parquet(file: File) -> Result<RecordStore, IngestError> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        let schema = batch.schema();

        let mut columns = Vec::with_capacity(N_COLUMNS);
        for name in REQUIRED_COLUMNS {
            let idx = schema
                .index_of(name)
                .map_err(|_| IngestError::MissingColumn(name))?;
            columns.push(cast(batch.column(idx), &DataType::Utf8)?);
        }

        for row in 0..batch.num_rows() {
            let cells: [&str; N_COLUMNS] = std::array::from_fn(|i| {
                let col = &columns[i];
                if col.is_null(row) {
                    ""
                } else {
                    col.as_string::<i32>().value(row)
                }
            });
            records.push(parse_record(records.len() + 1, &cells)?);
        }
    }

    RecordStore::from_records(records)
}

// ---------------------------------------------------------------------------
// Cell parsing (shared by every format)
// ---------------------------------------------------------------------------

/// Build one record from its cells, given in `REQUIRED_COLUMNS` order.
fn parse_record(row: usize, cells: &[&str; N_COLUMNS]) -> Result<Record, IngestError> {
    let [
        date,
        price,
        bedrooms,
        sqft_living,
        sqft_lot,
        floors,
        waterfront,
        view,
        condition,
        grade,
        zipcode,
        yr_built,
    ] = *cells;

    Ok(Record {
        date: parse_date(date)
            .ok_or_else(|| IngestError::invalid(row, "date", date, "is not a calendar date"))?,
        price: parse_number(row, "price", price)?,
        bedrooms: parse_whole(row, "bedrooms", bedrooms)?,
        sqft_living: parse_whole(row, "sqft_living", sqft_living)?,
        sqft_lot: parse_whole(row, "sqft_lot", sqft_lot)?,
        floors: Floors::new(parse_number(row, "floors", floors)?)
            .ok_or_else(|| IngestError::invalid(row, "floors", floors, "must be positive"))?,
        waterfront: parse_flag(waterfront)
            .ok_or_else(|| IngestError::invalid(row, "waterfront", waterfront, "is not 0 or 1"))?,
        view: parse_whole(row, "view", view)?,
        condition: parse_whole(row, "condition", condition)?,
        grade: parse_whole(row, "grade", grade)?,
        zipcode: parse_zipcode(zipcode)
            .ok_or_else(|| IngestError::invalid(row, "zipcode", zipcode, "must not be empty"))?,
        yr_built: parse_whole(row, "yr_built", yr_built)?,
    })
}

fn parse_number(row: usize, column: &'static str, s: &str) -> Result<f64, IngestError> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| IngestError::invalid(row, column, s, "is not a number"))
}

/// Integer-valued field. Accepts `3` as well as `3.0`.
fn parse_whole<T: TryFrom<i64>>(
    row: usize,
    column: &'static str,
    s: &str,
) -> Result<T, IngestError> {
    let trimmed = s.trim();
    let whole = match trimmed.parse::<i64>() {
        Ok(i) => Some(i),
        Err(_) => trimmed
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as i64),
    };
    let whole = whole.ok_or_else(|| IngestError::invalid(row, column, s, "is not a whole number"))?;
    T::try_from(whole).map_err(|_| IngestError::invalid(row, column, s, "is out of range"))
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "0" | "0.0" | "false" => Some(false),
        "1" | "1.0" | "true" => Some(true),
        _ => None,
    }
}

/// Zip codes are categories; a float spelling such as `98178.0` is reduced
/// to its integer text so it groups with `98178`.
fn parse_zipcode(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains('.') {
        if let Ok(v) = trimmed.parse::<f64>() {
            if v.is_finite() && v.fract() == 0.0 {
                return Some(format!("{}", v as i64));
            }
        }
    }
    Some(trimmed.to_string())
}

/// Accepts `20141013T000000` (King County export), `2014-10-13`,
/// ISO date-times, compact `20141013`, and epoch milliseconds.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y%m%dT%H%M%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in ["%Y-%m-%d", "%Y%m%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    if s.len() > 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        let millis = s.parse::<i64>().ok()?;
        return DateTime::from_timestamp_millis(millis).map(|dt| dt.date_naive());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "id,date,price,bedrooms,bathrooms,sqft_living,sqft_lot,floors,waterfront,view,condition,grade,yr_built,zipcode";

    fn csv_store(rows: &[&str]) -> Result<RecordStore, IngestError> {
        let text = format!("{HEADER}\n{}\n", rows.join("\n"));
        load_csv_reader(text.as_bytes())
    }

    #[test]
    fn parses_king_county_rows() {
        let store = csv_store(&[
            "7129300520,20141013T000000,221900,3,1,1180,5650,1,0,0,3,7,1955,98178",
            "6414100192,20141209T000000,538000.0,3,2.25,2570,7242,2,0,0,3,7,1951,98125",
            "5631500400,20150225T000000,180000,2,1,770,10000,1.5,1,4,3,6,1933,98028",
        ])
        .unwrap();

        assert_eq!(store.len(), 3);
        let r = &store.records()[2];
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2015, 2, 25).unwrap());
        assert_eq!(r.floors.value(), 1.5);
        assert!(r.waterfront);
        assert_eq!(r.view, 4);
        assert_eq!(r.zipcode, "98028");
        assert_eq!(store.records()[1].price, 538000.0);
    }

    #[test]
    fn missing_column_is_reported_by_name() {
        let text = "date,price,bedrooms\n20141013T000000,1,1\n";
        match load_csv_reader(text.as_bytes()) {
            Err(IngestError::MissingColumn(name)) => assert_eq!(name, "sqft_living"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn malformed_cell_names_row_and_column() {
        let err = csv_store(&[
            "1,20141013T000000,221900,3,1,1180,5650,1,0,0,3,7,1955,98178",
            "2,20141013T000000,cheap,3,1,1180,5650,1,0,0,3,7,1955,98178",
        ])
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "row 2, column 'price': 'cheap' is not a number"
        );
    }

    #[test]
    fn header_only_source_is_empty() {
        assert!(matches!(csv_store(&[]), Err(IngestError::Empty)));
    }

    #[test]
    fn fractional_bedrooms_are_rejected() {
        let err = csv_store(&["1,20141013T000000,1,2.5,1,1180,5650,1,0,0,3,7,1955,98178"])
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::InvalidValue { column: "bedrooms", .. }
        ));
    }

    #[test]
    fn json_records_are_accepted() {
        let text = r#"[
            {"date": "2014-05-02", "price": 313000.0, "bedrooms": 3, "sqft_living": 1340,
             "sqft_lot": 7912, "floors": 1.5, "waterfront": 0, "view": 0, "condition": 3,
             "grade": 7, "zipcode": 98133, "yr_built": 1955}
        ]"#;
        let store = load_json_reader(text.as_bytes()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].zipcode, "98133");
        assert_eq!(store.records()[0].date, NaiveDate::from_ymd_opt(2014, 5, 2).unwrap());
    }

    #[test]
    fn date_spellings() {
        let expected = NaiveDate::from_ymd_opt(2014, 10, 13);
        assert_eq!(parse_date("20141013T000000"), expected);
        assert_eq!(parse_date("2014-10-13"), expected);
        assert_eq!(parse_date("2014-10-13T00:00:00"), expected);
        assert_eq!(parse_date("20141013"), expected);
        assert_eq!(parse_date("1413158400000"), expected);
        assert_eq!(parse_date("last tuesday"), None);
    }

    #[test]
    fn zipcode_float_spelling_is_normalized() {
        assert_eq!(parse_zipcode("98178.0").as_deref(), Some("98178"));
        assert_eq!(parse_zipcode(" 98178 ").as_deref(), Some("98178"));
        assert_eq!(parse_zipcode(""), None);
    }

    #[test]
    fn unsupported_extension() {
        let err = load_file(Path::new("houses.xlsx")).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat(ext) if ext == "xlsx"));
    }
}
