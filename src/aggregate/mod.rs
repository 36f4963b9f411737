/// Aggregation catalog: the fixed set of named summaries a chart consumes.
///
/// Every entry is a pure function of a [`FilteredView`]; nothing here is
/// cached between filter changes, and entries do not depend on each other,
/// so evaluation order never affects results.
pub mod catalog;
pub mod group;
pub mod stats;
pub mod table;

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::CatalogConfig;
use crate::data::FilteredView;
use catalog::*;

pub use stats::{Distribution, InsufficientDataError, LinearFit};
pub use table::{AggregateTable, Cell, ColumnKind};

// ---------------------------------------------------------------------------
// AggregateKind – catalog registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    BedroomsLotCount,
    PriceByBedrooms,
    PriceHistogram,
    PriceOverTime,
    PriceByFloors,
    WaterfrontViewCrosstab,
    GradeConditionCrosstab,
    PriceByZipcode,
    PriceByYearBuilt,
    PriceVsSqftLiving,
    PriceVsSqftLot,
    FloorsPriceSpread,
    ViewPriceDistribution,
    ConditionPrice,
    GradePrice,
    WaterfrontPriceDistribution,
    /// The filtered rows, unaggregated.
    FilteredRecords,
}

impl AggregateKind {
    /// The chart aggregates, in dashboard order.
    pub const CATALOG: [AggregateKind; 16] = [
        AggregateKind::BedroomsLotCount,
        AggregateKind::PriceByBedrooms,
        AggregateKind::PriceHistogram,
        AggregateKind::PriceOverTime,
        AggregateKind::PriceByFloors,
        AggregateKind::WaterfrontViewCrosstab,
        AggregateKind::GradeConditionCrosstab,
        AggregateKind::PriceByZipcode,
        AggregateKind::PriceByYearBuilt,
        AggregateKind::PriceVsSqftLiving,
        AggregateKind::PriceVsSqftLot,
        AggregateKind::FloorsPriceSpread,
        AggregateKind::ViewPriceDistribution,
        AggregateKind::ConditionPrice,
        AggregateKind::GradePrice,
        AggregateKind::WaterfrontPriceDistribution,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AggregateKind::BedroomsLotCount => "bedrooms_lot_count",
            AggregateKind::PriceByBedrooms => "price_by_bedrooms",
            AggregateKind::PriceHistogram => "price_histogram",
            AggregateKind::PriceOverTime => "price_over_time",
            AggregateKind::PriceByFloors => "price_by_floors",
            AggregateKind::WaterfrontViewCrosstab => "waterfront_view_crosstab",
            AggregateKind::GradeConditionCrosstab => "grade_condition_crosstab",
            AggregateKind::PriceByZipcode => "price_by_zipcode",
            AggregateKind::PriceByYearBuilt => "price_by_year_built",
            AggregateKind::PriceVsSqftLiving => "price_vs_sqft_living",
            AggregateKind::PriceVsSqftLot => "price_vs_sqft_lot",
            AggregateKind::FloorsPriceSpread => "floors_price_spread",
            AggregateKind::ViewPriceDistribution => "view_price_distribution",
            AggregateKind::ConditionPrice => "condition_price",
            AggregateKind::GradePrice => "grade_price",
            AggregateKind::WaterfrontPriceDistribution => "waterfront_price_distribution",
            AggregateKind::FilteredRecords => "filtered_records",
        }
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AggregateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AggregateKind::CATALOG
            .into_iter()
            .chain([AggregateKind::FilteredRecords])
            .find(|k| k.name() == s)
            .ok_or_else(|| format!("unknown aggregate '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// One evaluated catalog entry. `error` is set when part of the aggregate
/// (a trendline) could not be computed; the table is still usable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub kind: AggregateKind,
    pub table: AggregateTable,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<InsufficientDataError>,
}

/// Compute a single aggregate over the view.
pub fn compute(
    kind: AggregateKind,
    view: &FilteredView<'_>,
    config: &CatalogConfig,
) -> CatalogEntry {
    let name = kind.name();
    let mut error = None;
    let table = match kind {
        AggregateKind::BedroomsLotCount => {
            count_table(name, "bedrooms", "sqft_lot_count", &bedrooms_lot_count(view))
        }
        AggregateKind::PriceByBedrooms => {
            stat_table(name, "bedrooms", "mean_price", &price_by_bedrooms(view))
        }
        AggregateKind::PriceHistogram => {
            histogram_table(name, &price_histogram(view, config.histogram_bins))
        }
        AggregateKind::PriceOverTime => {
            stat_table(name, "date", "mean_price", &price_over_time(view))
        }
        AggregateKind::PriceByFloors => {
            stat_table(name, "floors", "mean_price", &price_by_floors(view))
        }
        AggregateKind::WaterfrontViewCrosstab => {
            crosstab_table(name, "waterfront", "view", &waterfront_view_crosstab(view))
        }
        AggregateKind::GradeConditionCrosstab => {
            crosstab_table(name, "grade", "condition", &grade_condition_crosstab(view))
        }
        AggregateKind::PriceByZipcode => {
            stat_table(name, "zipcode", "median_price", &price_by_zipcode(view))
        }
        AggregateKind::PriceByYearBuilt => {
            let trend = price_by_year_built(view);
            error = trend.fit.clone().err();
            year_trend_table(name, &trend)
        }
        AggregateKind::PriceVsSqftLiving => {
            let series = price_vs_sqft_living(view);
            error = series.fit.clone().err();
            trend_table(name, "sqft_living", &series)
        }
        AggregateKind::PriceVsSqftLot => {
            let series = price_vs_sqft_lot(view);
            error = series.fit.clone().err();
            trend_table(name, "sqft_lot", &series)
        }
        AggregateKind::FloorsPriceSpread => {
            spread_table(name, "floors", &floors_price_spread(view))
        }
        AggregateKind::ViewPriceDistribution => {
            distribution_table(name, "view", &view_price_distribution(view))
        }
        AggregateKind::ConditionPrice => {
            stat_table(name, "condition", "median_price", &condition_price(view))
        }
        AggregateKind::GradePrice => stat_table(name, "grade", "median_price", &grade_price(view)),
        AggregateKind::WaterfrontPriceDistribution => {
            distribution_table(name, "waterfront", &waterfront_price_distribution(view))
        }
        AggregateKind::FilteredRecords => records_table(name, view),
    };

    CatalogEntry { kind, table, error }
}

/// Compute every aggregate the config marks visible, in config order.
/// A failed trendline is reported on its own entry and never stops the rest.
pub fn evaluate(view: &FilteredView<'_>, config: &CatalogConfig) -> Vec<CatalogEntry> {
    config
        .visible
        .iter()
        .map(|&kind| {
            let started = Instant::now();
            let entry = compute(kind, view, config);
            log::debug!(
                "{kind}: {} rows in {:.2?}",
                entry.table.len(),
                started.elapsed()
            );
            if let Some(err) = &entry.error {
                log::warn!("{kind}: {err}");
            }
            entry
        })
        .collect()
}
