use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::IngestError;

// ---------------------------------------------------------------------------
// Floors – a storey count that may be fractional (1.5, 2.5, ...)
// ---------------------------------------------------------------------------

/// Number of floors of a house. Always positive and finite.
///
/// Half-floors are common in the data, so this wraps an `f64`; the manual
/// `Eq`/`Ord` lets it key a `BTreeMap` / `BTreeSet`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Floors(f64);

impl Floors {
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && value > 0.0).then_some(Floors(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Eq for Floors {}

impl PartialOrd for Floors {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Floors {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::hash::Hash for Floors {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl TryFrom<f64> for Floors {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Floors::new(value).ok_or_else(|| format!("floors must be positive, got {value}"))
    }
}

impl From<Floors> for f64 {
    fn from(floors: Floors) -> f64 {
        floors.0
    }
}

impl FromStr for Floors {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| format!("'{s}' is not a number"))?;
        Floors::try_from(value)
    }
}

impl fmt::Display for Floors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// NumericRange – inclusive [lo, hi]
// ---------------------------------------------------------------------------

/// Inclusive numeric interval, as produced by a range slider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub lo: f64,
    pub hi: f64,
}

impl NumericRange {
    pub fn new(lo: f64, hi: f64) -> Self {
        NumericRange { lo, hi }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lo <= value && value <= self.hi
    }

    /// Swap inverted ends; a NaN end falls back to the matching end of `fallback`.
    pub fn normalized(self, fallback: NumericRange) -> Self {
        let lo = if self.lo.is_nan() { fallback.lo } else { self.lo };
        let hi = if self.hi.is_nan() { fallback.hi } else { self.hi };
        if lo <= hi {
            NumericRange { lo, hi }
        } else {
            NumericRange { lo: hi, hi: lo }
        }
    }

    pub fn overlaps(&self, other: NumericRange) -> bool {
        self.lo <= other.hi && other.lo <= self.hi
    }

    /// Restrict both ends to `bounds`. Expects `self` to be normalized.
    /// A range disjoint from `bounds` is returned unchanged so it still
    /// contains none of the values inside `bounds`.
    pub fn clamp_to(self, bounds: NumericRange) -> Self {
        if !self.overlaps(bounds) {
            return self;
        }
        NumericRange {
            lo: self.lo.clamp(bounds.lo, bounds.hi),
            hi: self.hi.clamp(bounds.lo, bounds.hi),
        }
    }

    fn widen(self, value: f64) -> Self {
        NumericRange {
            lo: self.lo.min(value),
            hi: self.hi.max(value),
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one housing sale
// ---------------------------------------------------------------------------

/// A single housing sale observation (one row of the source table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Calendar day of the sale.
    pub date: NaiveDate,
    pub price: f64,
    pub bedrooms: u32,
    pub sqft_living: u32,
    pub sqft_lot: u32,
    pub floors: Floors,
    pub waterfront: bool,
    /// View quality score (0–4 in the King County data).
    pub view: u8,
    pub condition: u8,
    pub grade: u8,
    /// Categorical; compared as text, never as a number.
    pub zipcode: String,
    pub yr_built: i32,
}

/// Columns every source must provide.
pub const REQUIRED_COLUMNS: [&str; 12] = [
    "date",
    "price",
    "bedrooms",
    "sqft_living",
    "sqft_lot",
    "floors",
    "waterfront",
    "view",
    "condition",
    "grade",
    "zipcode",
    "yr_built",
];

impl Record {
    /// Check the semantic constraints that the type system cannot express.
    /// `row` is the 1-based data row used in error messages.
    fn validate(&self, row: usize) -> Result<(), IngestError> {
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(IngestError::invalid(
                row,
                "price",
                self.price.to_string(),
                "must be a non-negative amount",
            ));
        }
        if self.sqft_living == 0 {
            return Err(IngestError::invalid(row, "sqft_living", "0", "must be positive"));
        }
        if self.sqft_lot == 0 {
            return Err(IngestError::invalid(row, "sqft_lot", "0", "must be positive"));
        }
        if self.zipcode.trim().is_empty() {
            return Err(IngestError::invalid(row, "zipcode", "", "must not be empty"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// StoreSummary – observed bounds and option lists
// ---------------------------------------------------------------------------

/// Observed min/max per numeric field and distinct values per categorical
/// field. Seeds the default filter selection and multiselect option lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreSummary {
    pub price: NumericRange,
    pub sqft_living: NumericRange,
    pub sqft_lot: NumericRange,
    pub bedrooms: NumericRange,
    pub yr_built: NumericRange,
    pub first_sale: NaiveDate,
    pub last_sale: NaiveDate,
    pub floors: BTreeSet<Floors>,
    pub waterfront: BTreeSet<bool>,
    pub view: BTreeSet<u8>,
    pub condition: BTreeSet<u8>,
    pub grade: BTreeSet<u8>,
    pub zipcode: BTreeSet<String>,
}

impl StoreSummary {
    fn from_records(records: &[Record]) -> Option<Self> {
        let first = records.first()?;
        let point = |v: f64| NumericRange::new(v, v);
        let mut summary = StoreSummary {
            price: point(first.price),
            sqft_living: point(first.sqft_living as f64),
            sqft_lot: point(first.sqft_lot as f64),
            bedrooms: point(first.bedrooms as f64),
            yr_built: point(first.yr_built as f64),
            first_sale: first.date,
            last_sale: first.date,
            floors: BTreeSet::new(),
            waterfront: BTreeSet::new(),
            view: BTreeSet::new(),
            condition: BTreeSet::new(),
            grade: BTreeSet::new(),
            zipcode: BTreeSet::new(),
        };

        for r in records {
            summary.price = summary.price.widen(r.price);
            summary.sqft_living = summary.sqft_living.widen(r.sqft_living as f64);
            summary.sqft_lot = summary.sqft_lot.widen(r.sqft_lot as f64);
            summary.bedrooms = summary.bedrooms.widen(r.bedrooms as f64);
            summary.yr_built = summary.yr_built.widen(r.yr_built as f64);
            summary.first_sale = summary.first_sale.min(r.date);
            summary.last_sale = summary.last_sale.max(r.date);
            summary.floors.insert(r.floors);
            summary.waterfront.insert(r.waterfront);
            summary.view.insert(r.view);
            summary.condition.insert(r.condition);
            summary.grade.insert(r.grade);
            if !summary.zipcode.contains(&r.zipcode) {
                summary.zipcode.insert(r.zipcode.clone());
            }
        }
        Some(summary)
    }
}

// ---------------------------------------------------------------------------
// RecordStore – the immutable loaded dataset
// ---------------------------------------------------------------------------

/// The full validated dataset. Read-only after construction.
#[derive(Debug, Clone)]
pub struct RecordStore {
    records: Vec<Record>,
    summary: StoreSummary,
}

impl RecordStore {
    /// Validate typed records and compute the store summary.
    pub fn from_records(records: Vec<Record>) -> Result<Self, IngestError> {
        for (i, record) in records.iter().enumerate() {
            record.validate(i + 1)?;
        }
        let summary = StoreSummary::from_records(&records).ok_or(IngestError::Empty)?;
        Ok(RecordStore { records, summary })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false for a successfully constructed store.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn summary(&self) -> &StoreSummary {
        &self.summary
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn record(price: f64, bedrooms: u32) -> Record {
        Record {
            date: NaiveDate::from_ymd_opt(2014, 10, 13).unwrap(),
            price,
            bedrooms,
            sqft_living: 1180,
            sqft_lot: 5650,
            floors: Floors::new(1.0).unwrap(),
            waterfront: false,
            view: 0,
            condition: 3,
            grade: 7,
            zipcode: "98178".to_string(),
            yr_built: 1955,
        }
    }

    #[test]
    fn floors_order_by_value() {
        let mut set = BTreeSet::new();
        for v in [2.0, 1.5, 1.0, 3.5, 1.5] {
            set.insert(Floors::new(v).unwrap());
        }
        let ordered: Vec<f64> = set.iter().map(|f| f.value()).collect();
        assert_eq!(ordered, vec![1.0, 1.5, 2.0, 3.5]);
    }

    #[test]
    fn floors_reject_non_positive() {
        assert!(Floors::new(0.0).is_none());
        assert!(Floors::new(-1.0).is_none());
        assert!(Floors::new(f64::NAN).is_none());
        assert!("abc".parse::<Floors>().is_err());
        assert_eq!("2.5".parse::<Floors>().unwrap().value(), 2.5);
    }

    #[test]
    fn range_normalization_swaps_and_fills_nan() {
        let bounds = NumericRange::new(0.0, 10.0);
        assert_eq!(
            NumericRange::new(8.0, 2.0).normalized(bounds),
            NumericRange::new(2.0, 8.0)
        );
        assert_eq!(
            NumericRange::new(f64::NAN, 4.0).normalized(bounds),
            NumericRange::new(0.0, 4.0)
        );
        assert_eq!(
            NumericRange::new(-5.0, 50.0).clamp_to(bounds),
            NumericRange::new(0.0, 10.0)
        );
    }

    #[test]
    fn disjoint_range_is_not_clamped_onto_bounds() {
        let bounds = NumericRange::new(0.0, 10.0);
        let above = NumericRange::new(20.0, 30.0);
        assert!(!above.overlaps(bounds));
        assert_eq!(above.clamp_to(bounds), above);
        assert!(!above.clamp_to(bounds).contains(10.0));
        assert!(NumericRange::new(10.0, 12.0).overlaps(bounds));
    }

    #[test]
    fn summary_tracks_bounds_and_distinct_values() {
        let mut a = record(500_000.0, 3);
        a.floors = Floors::new(2.0).unwrap();
        a.zipcode = "98001".into();
        let mut b = record(200_000.0, 1);
        b.waterfront = true;
        b.date = NaiveDate::from_ymd_opt(2015, 1, 2).unwrap();
        let store = RecordStore::from_records(vec![a, b]).unwrap();

        let s = store.summary();
        assert_eq!(s.price, NumericRange::new(200_000.0, 500_000.0));
        assert_eq!(s.bedrooms, NumericRange::new(1.0, 3.0));
        assert_eq!(s.floors.len(), 2);
        assert_eq!(s.waterfront, BTreeSet::from([false, true]));
        assert_eq!(s.zipcode.iter().next().map(String::as_str), Some("98001"));
        assert_eq!(s.last_sale, NaiveDate::from_ymd_opt(2015, 1, 2).unwrap());
    }

    #[test]
    fn empty_store_is_rejected() {
        assert!(matches!(
            RecordStore::from_records(Vec::new()),
            Err(IngestError::Empty)
        ));
    }

    #[test]
    fn negative_price_is_rejected_with_row_number() {
        let err = RecordStore::from_records(vec![record(1.0, 1), record(-3.0, 1)]).unwrap_err();
        match err {
            IngestError::InvalidValue { row, column, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "price");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
