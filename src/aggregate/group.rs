use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use super::table::{Cell, ColumnKind};
use crate::data::{FilteredView, Floors, Record};

/// A value that can key a group and appear as a table cell.
pub trait GroupKey: Ord + Clone {
    const KIND: ColumnKind;

    fn to_cell(&self) -> Cell;
}

impl GroupKey for u8 {
    const KIND: ColumnKind = ColumnKind::Int;

    fn to_cell(&self) -> Cell {
        Cell::Int(i64::from(*self))
    }
}

impl GroupKey for u32 {
    const KIND: ColumnKind = ColumnKind::Int;

    fn to_cell(&self) -> Cell {
        Cell::Int(i64::from(*self))
    }
}

impl GroupKey for i32 {
    const KIND: ColumnKind = ColumnKind::Int;

    fn to_cell(&self) -> Cell {
        Cell::Int(i64::from(*self))
    }
}

/// Flags are reported as 0 / 1, the way the source data spells them.
impl GroupKey for bool {
    const KIND: ColumnKind = ColumnKind::Int;

    fn to_cell(&self) -> Cell {
        Cell::Int(i64::from(*self))
    }
}

impl GroupKey for Floors {
    const KIND: ColumnKind = ColumnKind::Float;

    fn to_cell(&self) -> Cell {
        Cell::Float(self.value())
    }
}

impl GroupKey for String {
    const KIND: ColumnKind = ColumnKind::Text;

    fn to_cell(&self) -> Cell {
        Cell::Text(self.clone())
    }
}

impl GroupKey for NaiveDate {
    const KIND: ColumnKind = ColumnKind::Date;

    fn to_cell(&self) -> Cell {
        Cell::Date(*self)
    }
}

/// Prices of the view bucketed by `key`, groups ascending by key.
/// Only keys that occur in the view get a group, so no group is empty.
pub fn group_prices<K, F>(view: &FilteredView<'_>, key: F) -> BTreeMap<K, Vec<f64>>
where
    K: Ord,
    F: Fn(&Record) -> K,
{
    let mut groups: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for record in view.iter() {
        groups.entry(key(record)).or_default().push(record.price);
    }
    groups
}

// ---------------------------------------------------------------------------
// Cross tabulation
// ---------------------------------------------------------------------------

/// Dense contingency table: `counts[r][c]` is the number of records with
/// row key `rows[r]` and column key `cols[c]`. Combinations that never
/// occur are present with a count of 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTab<R, C> {
    pub rows: Vec<R>,
    pub cols: Vec<C>,
    pub counts: Vec<Vec<usize>>,
}

impl<R: Ord, C: Ord> CrossTab<R, C> {
    pub fn count(&self, row: &R, col: &C) -> Option<usize> {
        let r = self.rows.binary_search(row).ok()?;
        let c = self.cols.binary_search(col).ok()?;
        Some(self.counts[r][c])
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }
}

/// Both axes span the keys observed in the view.
pub fn cross_tab<R, C, FR, FC>(view: &FilteredView<'_>, row_key: FR, col_key: FC) -> CrossTab<R, C>
where
    R: Ord + Clone,
    C: Ord + Clone,
    FR: Fn(&Record) -> R,
    FC: Fn(&Record) -> C,
{
    let pairs: Vec<(R, C)> = view.iter().map(|r| (row_key(r), col_key(r))).collect();
    let rows: Vec<R> = pairs
        .iter()
        .map(|(r, _)| r.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let cols: Vec<C> = pairs
        .iter()
        .map(|(_, c)| c.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut counts = vec![vec![0usize; cols.len()]; rows.len()];
    for (r, c) in &pairs {
        // Every key was collected above, so both searches succeed.
        if let (Ok(ri), Ok(ci)) = (rows.binary_search(r), cols.binary_search(c)) {
            counts[ri][ci] += 1;
        }
    }

    CrossTab { rows, cols, counts }
}
