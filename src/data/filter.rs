use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::model::{Floors, NumericRange, Record, RecordStore};

// ---------------------------------------------------------------------------
// Filter selection: the current sidebar values
// ---------------------------------------------------------------------------

/// Snapshot of the sidebar constraints.
///
/// An empty `floors` or `waterfront` set means nothing is selected for that
/// column, so nothing passes. There is no implicit "select all".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub price_range: NumericRange,
    pub sqft_living_range: NumericRange,
    pub floors: BTreeSet<Floors>,
    pub waterfront: BTreeSet<bool>,
}

impl FilterSelection {
    /// Initialise a selection covering the whole store (i.e., show everything).
    pub fn full(store: &RecordStore) -> Self {
        let summary = store.summary();
        FilterSelection {
            price_range: summary.price,
            sqft_living_range: summary.sqft_living,
            floors: summary.floors.clone(),
            waterfront: summary.waterfront.clone(),
        }
    }

    pub fn with_price_range(mut self, lo: f64, hi: f64) -> Self {
        self.price_range = NumericRange::new(lo, hi);
        self
    }

    pub fn with_sqft_living_range(mut self, lo: f64, hi: f64) -> Self {
        self.sqft_living_range = NumericRange::new(lo, hi);
        self
    }

    pub fn with_floors(mut self, floors: impl IntoIterator<Item = Floors>) -> Self {
        self.floors = floors.into_iter().collect();
        self
    }

    pub fn with_waterfront(mut self, waterfront: impl IntoIterator<Item = bool>) -> Self {
        self.waterfront = waterfront.into_iter().collect();
        self
    }

    /// Repair UI artifacts instead of rejecting them: inverted ranges are
    /// swapped, ranges are clamped to the observed bounds, and set members the
    /// store never contains are dropped. A range lying wholly outside the
    /// observed bounds stays as requested and matches nothing.
    pub fn normalized(&self, store: &RecordStore) -> Self {
        let summary = store.summary();
        FilterSelection {
            price_range: self
                .price_range
                .normalized(summary.price)
                .clamp_to(summary.price),
            sqft_living_range: self
                .sqft_living_range
                .normalized(summary.sqft_living)
                .clamp_to(summary.sqft_living),
            floors: self.floors.intersection(&summary.floors).copied().collect(),
            waterfront: self
                .waterfront
                .intersection(&summary.waterfront)
                .copied()
                .collect(),
        }
    }

    /// A record passes when every predicate holds (AND across columns,
    /// membership within a column).
    pub fn matches(&self, record: &Record) -> bool {
        self.price_range.contains(record.price)
            && self.sqft_living_range.contains(record.sqft_living as f64)
            && self.floors.contains(&record.floors)
            && self.waterfront.contains(&record.waterfront)
    }
}

// ---------------------------------------------------------------------------
// Filtered view: row indices into the store, never copies
// ---------------------------------------------------------------------------

/// The records of a store that satisfy a selection, in insertion order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    store: &'a RecordStore,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// A view over every record of the store.
    pub fn all(store: &'a RecordStore) -> Self {
        FilteredView {
            store,
            indices: (0..store.len()).collect(),
        }
    }

    /// Wrap indices computed earlier for the same store.
    /// Indices past the end of the store are dropped.
    pub fn from_indices(store: &'a RecordStore, mut indices: Vec<usize>) -> Self {
        indices.retain(|&i| i < store.len());
        FilteredView { store, indices }
    }

    pub fn store(&self) -> &'a RecordStore {
        self.store
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Records in original insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        let records = self.store.records();
        self.indices.iter().map(move |&i| &records[i])
    }
}

/// Return indices of records that pass the (normalized) selection.
pub fn filtered_indices(store: &RecordStore, selection: &FilterSelection) -> Vec<usize> {
    let selection = selection.normalized(store);
    store
        .records()
        .iter()
        .enumerate()
        .filter(|(_, record)| selection.matches(record))
        .map(|(i, _)| i)
        .collect()
}

/// Apply a selection to the store.
pub fn apply<'a>(store: &'a RecordStore, selection: &FilterSelection) -> FilteredView<'a> {
    let indices = filtered_indices(store, selection);
    log::debug!("Filter kept {} of {} records", indices.len(), store.len());
    FilteredView { store, indices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::record;

    fn three_sales() -> RecordStore {
        RecordStore::from_records(vec![
            record(500_000.0, 3),
            record(700_000.0, 3),
            record(200_000.0, 1),
        ])
        .unwrap()
    }

    #[test]
    fn full_selection_keeps_everything() {
        let store = three_sales();
        let view = apply(&store, &FilterSelection::full(&store));
        assert_eq!(view.indices(), &[0, 1, 2]);
    }

    #[test]
    fn price_range_excludes_expensive_sale() {
        let store = three_sales();
        let selection = FilterSelection::full(&store).with_price_range(0.0, 600_000.0);
        let view = apply(&store, &selection);
        assert_eq!(view.len(), 2);
        assert!(view.iter().all(|r| r.price != 700_000.0));
    }

    #[test]
    fn inverted_range_is_swapped() {
        let store = three_sales();
        let straight = FilterSelection::full(&store).with_price_range(250_000.0, 800_000.0);
        let inverted = FilterSelection::full(&store).with_price_range(800_000.0, 250_000.0);
        assert_eq!(
            filtered_indices(&store, &straight),
            filtered_indices(&store, &inverted)
        );
        assert_eq!(filtered_indices(&store, &inverted), vec![0, 1]);
    }

    #[test]
    fn out_of_bounds_range_is_clamped() {
        let store = three_sales();
        let selection = FilterSelection::full(&store).with_price_range(-1e12, 1e12);
        let normalized = selection.normalized(&store);
        assert_eq!(normalized.price_range, NumericRange::new(200_000.0, 700_000.0));
        assert_eq!(apply(&store, &selection).len(), 3);
    }

    #[test]
    fn range_outside_store_bounds_selects_nothing() {
        let store = RecordStore::from_records(vec![
            record(180_000.0, 2),
            record(1_225_000.0, 4),
        ])
        .unwrap();

        let below = FilterSelection::full(&store).with_price_range(0.0, 100.0);
        assert!(apply(&store, &below).is_empty());
        let above = FilterSelection::full(&store).with_price_range(2e6, 3e6);
        assert!(apply(&store, &above).is_empty());
        assert_eq!(above.normalized(&store).price_range, NumericRange::new(2e6, 3e6));

        // Inverted and disjoint: swapped, then still outside.
        let inverted = FilterSelection::full(&store).with_price_range(2e6, 1_300_000.0);
        assert!(apply(&store, &inverted).is_empty());

        let tiny = FilterSelection::full(&store).with_sqft_living_range(1.0, 10.0);
        assert!(apply(&store, &tiny).is_empty());
        let huge = FilterSelection::full(&store).with_sqft_living_range(50_000.0, 90_000.0);
        assert!(apply(&store, &huge).is_empty());

        let touching = FilterSelection::full(&store).with_price_range(1_225_000.0, 3e6);
        assert_eq!(apply(&store, &touching).indices(), &[1]);
    }

    #[test]
    fn empty_sets_select_nothing() {
        let store = three_sales();
        let no_floors = FilterSelection::full(&store).with_floors(Vec::<Floors>::new());
        assert!(apply(&store, &no_floors).is_empty());
        let no_waterfront = FilterSelection::full(&store).with_waterfront(Vec::<bool>::new());
        assert!(apply(&store, &no_waterfront).is_empty());
    }

    #[test]
    fn unknown_set_members_are_dropped() {
        let store = three_sales();
        let selection = FilterSelection::full(&store).with_floors([Floors::new(9.0).unwrap()]);
        assert!(selection.normalized(&store).floors.is_empty());
        assert!(apply(&store, &selection).is_empty());
    }

    #[test]
    fn from_indices_drops_out_of_range() {
        let store = three_sales();
        let view = FilteredView::from_indices(&store, vec![2, 7, 0]);
        assert_eq!(view.indices(), &[2, 0]);
    }
}
