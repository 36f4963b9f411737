use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Builder, Float64Builder, Int64Builder, StringBuilder};
use arrow::datatypes::{DataType, Date32Type, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Cell – a single value of a plain table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Null,
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Int(v)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Float(v)
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

impl From<NaiveDate> for Cell {
    fn from(v: NaiveDate) -> Self {
        Cell::Date(v)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map_or(Cell::Null, Into::into)
    }
}

/// Declared type of a column; every non-null cell in it has this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Int,
    Float,
    Text,
    Date,
}

impl ColumnKind {
    fn arrow_type(self) -> DataType {
        match self {
            ColumnKind::Int => DataType::Int64,
            ColumnKind::Float => DataType::Float64,
            ColumnKind::Text => DataType::Utf8,
            ColumnKind::Date => DataType::Date32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

// ---------------------------------------------------------------------------
// AggregateTable – what the charting layer consumes
// ---------------------------------------------------------------------------

/// Ordered rows under named, typed columns. Carries no presentation detail.
///
/// `annotations` holds scalar companions of the table, e.g. the slope and
/// intercept of a trendline; `note` explains why an expected companion is
/// missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTable {
    pub name: &'static str,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<&'static str, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl AggregateTable {
    pub fn new(name: &'static str, columns: &[(&'static str, ColumnKind)]) -> Self {
        AggregateTable {
            name,
            columns: columns
                .iter()
                .map(|&(name, kind)| Column { name, kind })
                .collect(),
            rows: Vec::new(),
            annotations: BTreeMap::new(),
            note: None,
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len(), "row width for {}", self.name);
        self.rows.push(row);
    }

    pub fn annotate(&mut self, key: &'static str, value: f64) {
        self.annotations.insert(key, value);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Convert to an Arrow record batch. Cells that do not match the
    /// declared column kind become nulls.
    pub fn to_record_batch(&self) -> Result<RecordBatch, ArrowError> {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|c| Field::new(c.name, c.kind.arrow_type(), true))
            .collect();

        let arrays = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| self.build_array(i, c.kind))
            .collect::<Vec<_>>();

        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
    }

    fn build_array(&self, col: usize, kind: ColumnKind) -> ArrayRef {
        let cells = self.rows.iter().map(|row| &row[col]);
        match kind {
            ColumnKind::Int => {
                let mut b = Int64Builder::with_capacity(self.rows.len());
                for cell in cells {
                    b.append_option(match cell {
                        Cell::Int(v) => Some(*v),
                        _ => None,
                    });
                }
                Arc::new(b.finish())
            }
            ColumnKind::Float => {
                let mut b = Float64Builder::with_capacity(self.rows.len());
                for cell in cells {
                    b.append_option(match cell {
                        Cell::Float(v) => Some(*v),
                        Cell::Int(v) => Some(*v as f64),
                        _ => None,
                    });
                }
                Arc::new(b.finish())
            }
            ColumnKind::Text => {
                let mut b = StringBuilder::new();
                for cell in cells {
                    match cell {
                        Cell::Text(v) => b.append_value(v),
                        _ => b.append_null(),
                    }
                }
                Arc::new(b.finish())
            }
            ColumnKind::Date => {
                let mut b = Date32Builder::with_capacity(self.rows.len());
                for cell in cells {
                    b.append_option(match cell {
                        Cell::Date(d) => Some(Date32Type::from_naive_date(*d)),
                        _ => None,
                    });
                }
                Arc::new(b.finish())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, AsArray};
    use arrow::datatypes::{Float64Type, Int64Type};

    fn sample() -> AggregateTable {
        let mut t = AggregateTable::new(
            "sample",
            &[
                ("day", ColumnKind::Date),
                ("zipcode", ColumnKind::Text),
                ("count", ColumnKind::Int),
                ("trend", ColumnKind::Float),
            ],
        );
        let day = NaiveDate::from_ymd_opt(1970, 1, 2).unwrap();
        t.push_row(vec![day.into(), "98178".to_string().into(), 3i64.into(), Cell::Null]);
        t.push_row(vec![day.into(), "98001".to_string().into(), 1i64.into(), 2.5f64.into()]);
        t
    }

    #[test]
    fn record_batch_keeps_types_and_nulls() {
        let batch = sample().to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().field(0).data_type(), &DataType::Date32);
        let days = batch.column(0).as_primitive::<Date32Type>();
        assert_eq!(days.value(0), 1);
        assert_eq!(
            Date32Type::to_naive_date(days.value(1)),
            NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()
        );
        assert_eq!(batch.column(1).as_string::<i32>().value(1), "98001");
        assert_eq!(batch.column(2).as_primitive::<Int64Type>().value(0), 3);
        let trend = batch.column(3).as_primitive::<Float64Type>();
        assert!(trend.is_null(0));
        assert_eq!(trend.value(1), 2.5);
    }

    #[test]
    fn serializes_as_plain_json() {
        let mut t = sample();
        t.annotate("slope", 2.0);
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["rows"][0][0], "1970-01-02");
        assert_eq!(json["rows"][0][3], serde_json::Value::Null);
        assert_eq!(json["columns"][2]["kind"], "int");
        assert_eq!(json["annotations"]["slope"], 2.0);
        assert!(json.get("note").is_none());
    }

    #[test]
    fn option_cells_become_null() {
        assert_eq!(Cell::from(None::<f64>), Cell::Null);
        assert_eq!(Cell::from(Some(4i64)), Cell::Int(4));
        assert_eq!(sample().column_index("count"), Some(2));
    }
}
