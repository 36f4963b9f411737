use crate::aggregate::{self, CatalogEntry};
use crate::config::CatalogConfig;
use crate::data::filter::{filtered_indices, FilterSelection, FilteredView};
use crate::data::{Floors, NumericRange, RecordStore};

// ---------------------------------------------------------------------------
// Dashboard session state
// ---------------------------------------------------------------------------

/// Everything one dashboard session needs, independent of rendering.
///
/// Every mutation replaces the selection and recomputes the visible rows
/// from scratch.
pub struct Dashboard {
    store: RecordStore,

    /// Current sidebar values, always normalized against `store`.
    selection: FilterSelection,

    /// Indices of records passing the current selection.
    visible_indices: Vec<usize>,
}

impl Dashboard {
    /// Start a session with every filter wide open.
    pub fn new(store: RecordStore) -> Self {
        let selection = FilterSelection::full(&store);
        let visible_indices = (0..store.len()).collect();
        Dashboard {
            store,
            selection,
            visible_indices,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    pub fn visible_count(&self) -> usize {
        self.visible_indices.len()
    }

    pub fn view(&self) -> FilteredView<'_> {
        FilteredView::from_indices(&self.store, self.visible_indices.clone())
    }

    /// Replace the whole selection, e.g. from a fresh snapshot of the UI.
    pub fn set_selection(&mut self, selection: FilterSelection) {
        self.selection = selection.normalized(&self.store);
        self.refilter();
    }

    pub fn set_price_range(&mut self, lo: f64, hi: f64) {
        let next = self.selection.clone().with_price_range(lo, hi);
        self.set_selection(next);
    }

    pub fn set_sqft_living_range(&mut self, lo: f64, hi: f64) {
        let next = self.selection.clone().with_sqft_living_range(lo, hi);
        self.set_selection(next);
    }

    /// Toggle a single floors option in the multiselect.
    pub fn toggle_floor(&mut self, floors: Floors) {
        let mut next = self.selection.clone();
        if !next.floors.remove(&floors) {
            next.floors.insert(floors);
        }
        self.set_selection(next);
    }

    pub fn select_all_floors(&mut self) {
        let mut next = self.selection.clone();
        next.floors = self.store.summary().floors.clone();
        self.set_selection(next);
    }

    pub fn select_no_floors(&mut self) {
        let mut next = self.selection.clone();
        next.floors.clear();
        self.set_selection(next);
    }

    pub fn toggle_waterfront(&mut self, waterfront: bool) {
        let mut next = self.selection.clone();
        if !next.waterfront.remove(&waterfront) {
            next.waterfront.insert(waterfront);
        }
        self.set_selection(next);
    }

    pub fn select_all_waterfront(&mut self) {
        let mut next = self.selection.clone();
        next.waterfront = self.store.summary().waterfront.clone();
        self.set_selection(next);
    }

    pub fn select_no_waterfront(&mut self) {
        let mut next = self.selection.clone();
        next.waterfront.clear();
        self.set_selection(next);
    }

    /// Back to the default, unfiltered selection.
    pub fn reset(&mut self) {
        self.set_selection(FilterSelection::full(&self.store));
    }

    /// Slider bounds for the price control.
    pub fn price_bounds(&self) -> NumericRange {
        self.store.summary().price
    }

    pub fn sqft_living_bounds(&self) -> NumericRange {
        self.store.summary().sqft_living
    }

    /// Recompute the aggregates of the visible charts for the current view.
    pub fn refresh(&self, config: &CatalogConfig) -> Vec<CatalogEntry> {
        aggregate::evaluate(&self.view(), config)
    }

    fn refilter(&mut self) {
        self.visible_indices = filtered_indices(&self.store, &self.selection);
        log::debug!(
            "{} of {} records visible",
            self.visible_indices.len(),
            self.store.len()
        );
    }
}
