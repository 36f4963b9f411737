use chrono::NaiveDate;
use serde::Serialize;

use super::group::{cross_tab, group_prices, CrossTab, GroupKey};
use super::stats::{self, fit_ols, Distribution, InsufficientDataError, LinearFit};
use super::table::{AggregateTable, Cell, ColumnKind};
use crate::data::{FilteredView, Floors, Record};

// ---------------------------------------------------------------------------
// Typed results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCount<K> {
    pub key: K,
    pub count: usize,
}

/// One group with a single price statistic (mean or median).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStat<K> {
    pub key: K,
    pub count: usize,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSpread<K> {
    pub key: K,
    pub count: usize,
    pub median: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupDistribution<K> {
    pub key: K,
    pub summary: Distribution,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Scatter pairs plus their least-squares trendline.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendSeries {
    pub points: Vec<(f64, f64)>,
    pub fit: Result<LinearFit, InsufficientDataError>,
}

/// Per-year median prices plus a trendline through the medians.
#[derive(Debug, Clone, PartialEq)]
pub struct YearTrend {
    pub groups: Vec<GroupStat<i32>>,
    pub fit: Result<LinearFit, InsufficientDataError>,
}

// ---------------------------------------------------------------------------
// Group statistics
// ---------------------------------------------------------------------------

fn group_stat<K, F>(
    view: &FilteredView<'_>,
    key: F,
    stat: fn(&[f64]) -> Option<f64>,
) -> Vec<GroupStat<K>>
where
    K: Ord,
    F: Fn(&Record) -> K,
{
    group_prices(view, key)
        .into_iter()
        .filter_map(|(key, prices)| {
            Some(GroupStat {
                value: stat(&prices)?,
                count: prices.len(),
                key,
            })
        })
        .collect()
}

fn group_distribution<K, F>(view: &FilteredView<'_>, key: F) -> Vec<GroupDistribution<K>>
where
    K: Ord,
    F: Fn(&Record) -> K,
{
    group_prices(view, key)
        .into_iter()
        .filter_map(|(key, prices)| {
            Some(GroupDistribution {
                summary: Distribution::from_values(&prices)?,
                key,
            })
        })
        .collect()
}

/// Number of sales per bedroom count.
pub fn bedrooms_lot_count(view: &FilteredView<'_>) -> Vec<GroupCount<u32>> {
    group_prices(view, |r| r.bedrooms)
        .into_iter()
        .map(|(key, prices)| GroupCount {
            key,
            count: prices.len(),
        })
        .collect()
}

pub fn price_by_bedrooms(view: &FilteredView<'_>) -> Vec<GroupStat<u32>> {
    group_stat(view, |r| r.bedrooms, stats::mean)
}

/// Mean price per sale day, chronological.
pub fn price_over_time(view: &FilteredView<'_>) -> Vec<GroupStat<NaiveDate>> {
    group_stat(view, |r| r.date, stats::mean)
}

pub fn price_by_floors(view: &FilteredView<'_>) -> Vec<GroupStat<Floors>> {
    group_stat(view, |r| r.floors, stats::mean)
}

/// Median price per zip code, zip codes in lexicographic order.
pub fn price_by_zipcode(view: &FilteredView<'_>) -> Vec<GroupStat<String>> {
    group_stat(view, |r| r.zipcode.clone(), stats::median)
}

pub fn condition_price(view: &FilteredView<'_>) -> Vec<GroupStat<u8>> {
    group_stat(view, |r| r.condition, stats::median)
}

pub fn grade_price(view: &FilteredView<'_>) -> Vec<GroupStat<u8>> {
    group_stat(view, |r| r.grade, stats::median)
}

pub fn floors_price_spread(view: &FilteredView<'_>) -> Vec<GroupSpread<Floors>> {
    group_prices(view, |r| r.floors)
        .into_iter()
        .filter_map(|(key, prices)| {
            Some(GroupSpread {
                median: stats::median(&prices)?,
                std_dev: stats::std_dev(&prices)?,
                count: prices.len(),
                key,
            })
        })
        .collect()
}

pub fn view_price_distribution(view: &FilteredView<'_>) -> Vec<GroupDistribution<u8>> {
    group_distribution(view, |r| r.view)
}

pub fn waterfront_price_distribution(view: &FilteredView<'_>) -> Vec<GroupDistribution<bool>> {
    group_distribution(view, |r| r.waterfront)
}

pub fn waterfront_view_crosstab(view: &FilteredView<'_>) -> CrossTab<bool, u8> {
    cross_tab(view, |r| r.waterfront, |r| r.view)
}

pub fn grade_condition_crosstab(view: &FilteredView<'_>) -> CrossTab<u8, u8> {
    cross_tab(view, |r| r.grade, |r| r.condition)
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

/// Equal-width price bins over the view's own [min, max]. The last bin is
/// closed on the right so the maximum is counted.
pub fn price_histogram(view: &FilteredView<'_>, bins: usize) -> Vec<HistogramBin> {
    let bins = bins.max(1);
    let mut prices = view.iter().map(|r| r.price);
    let Some(first) = prices.next() else {
        return Vec::new();
    };
    let (min, max) = prices.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));

    if min == max {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: view.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();

    for record in view.iter() {
        let idx = (((record.price - min) / width).floor() as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

// ---------------------------------------------------------------------------
// Trends
// ---------------------------------------------------------------------------

fn trend_series(view: &FilteredView<'_>, x: fn(&Record) -> f64, what: &'static str) -> TrendSeries {
    let points: Vec<(f64, f64)> = view.iter().map(|r| (x(r), r.price)).collect();
    let fit = fit_ols(&points, what);
    TrendSeries { points, fit }
}

/// Raw `(sqft_living, price)` pairs with an OLS fit over all of them.
pub fn price_vs_sqft_living(view: &FilteredView<'_>) -> TrendSeries {
    trend_series(view, |r| r.sqft_living as f64, "price vs sqft_living trend")
}

pub fn price_vs_sqft_lot(view: &FilteredView<'_>) -> TrendSeries {
    trend_series(view, |r| r.sqft_lot as f64, "price vs sqft_lot trend")
}

/// Median price per construction year, with the trend fitted through the
/// per-year medians rather than the raw sales.
pub fn price_by_year_built(view: &FilteredView<'_>) -> YearTrend {
    let groups = group_stat(view, |r| r.yr_built, stats::median);
    let points: Vec<(f64, f64)> = groups.iter().map(|g| (g.key as f64, g.value)).collect();
    YearTrend {
        fit: fit_ols(&points, "price by yr_built trend"),
        groups,
    }
}

// ---------------------------------------------------------------------------
// Plain-table conversion
// ---------------------------------------------------------------------------

pub(crate) fn count_table<K: GroupKey>(
    name: &'static str,
    key_name: &'static str,
    count_name: &'static str,
    groups: &[GroupCount<K>],
) -> AggregateTable {
    let mut table =
        AggregateTable::new(name, &[(key_name, K::KIND), (count_name, ColumnKind::Int)]);
    for g in groups {
        table.push_row(vec![g.key.to_cell(), Cell::Int(g.count as i64)]);
    }
    table
}

pub(crate) fn stat_table<K: GroupKey>(
    name: &'static str,
    key_name: &'static str,
    value_name: &'static str,
    groups: &[GroupStat<K>],
) -> AggregateTable {
    let mut table = AggregateTable::new(
        name,
        &[
            (key_name, K::KIND),
            ("count", ColumnKind::Int),
            (value_name, ColumnKind::Float),
        ],
    );
    for g in groups {
        table.push_row(vec![g.key.to_cell(), Cell::Int(g.count as i64), Cell::Float(g.value)]);
    }
    table
}

pub(crate) fn spread_table<K: GroupKey>(
    name: &'static str,
    key_name: &'static str,
    groups: &[GroupSpread<K>],
) -> AggregateTable {
    let mut table = AggregateTable::new(
        name,
        &[
            (key_name, K::KIND),
            ("count", ColumnKind::Int),
            ("median_price", ColumnKind::Float),
            ("std_price", ColumnKind::Float),
        ],
    );
    for g in groups {
        table.push_row(vec![
            g.key.to_cell(),
            Cell::Int(g.count as i64),
            Cell::Float(g.median),
            Cell::Float(g.std_dev),
        ]);
    }
    table
}

pub(crate) fn distribution_table<K: GroupKey>(
    name: &'static str,
    key_name: &'static str,
    groups: &[GroupDistribution<K>],
) -> AggregateTable {
    let mut columns = vec![(key_name, K::KIND), ("count", ColumnKind::Int)];
    columns.extend(
        ["min", "q1", "median", "q3", "max", "mean", "whisker_low", "whisker_high"]
            .map(|c| (c, ColumnKind::Float)),
    );
    columns.push(("outliers", ColumnKind::Int));

    let mut table = AggregateTable::new(name, &columns);
    for g in groups {
        let s = &g.summary;
        let mut row = vec![g.key.to_cell(), Cell::Int(s.count as i64)];
        row.extend(
            [
                s.min,
                s.q1,
                s.median,
                s.q3,
                s.max,
                s.mean,
                s.whisker_low,
                s.whisker_high,
            ]
            .map(Cell::Float),
        );
        row.push(Cell::Int(s.outliers as i64));
        table.push_row(row);
    }
    table
}

/// Long format: one row per (row key, column key) cell of the dense grid.
pub(crate) fn crosstab_table<R: GroupKey, C: GroupKey>(
    name: &'static str,
    row_name: &'static str,
    col_name: &'static str,
    tab: &CrossTab<R, C>,
) -> AggregateTable {
    let mut table = AggregateTable::new(
        name,
        &[(row_name, R::KIND), (col_name, C::KIND), ("count", ColumnKind::Int)],
    );
    for (r, counts) in tab.rows.iter().zip(&tab.counts) {
        for (c, &count) in tab.cols.iter().zip(counts) {
            table.push_row(vec![r.to_cell(), c.to_cell(), Cell::Int(count as i64)]);
        }
    }
    table
}

pub(crate) fn histogram_table(name: &'static str, bins: &[HistogramBin]) -> AggregateTable {
    let mut table = AggregateTable::new(
        name,
        &[
            ("bin_start", ColumnKind::Float),
            ("bin_end", ColumnKind::Float),
            ("count", ColumnKind::Int),
        ],
    );
    for b in bins {
        table.push_row(vec![Cell::Float(b.lower), Cell::Float(b.upper), Cell::Int(b.count as i64)]);
    }
    table
}

fn annotate_fit(table: &mut AggregateTable, fit: &Result<LinearFit, InsufficientDataError>) {
    match fit {
        Ok(fit) => {
            table.annotate("slope", fit.slope);
            table.annotate("intercept", fit.intercept);
            table.annotate("r_squared", fit.r_squared);
        }
        Err(err) => table.note = Some(err.to_string()),
    }
}

pub(crate) fn trend_table(
    name: &'static str,
    x_name: &'static str,
    series: &TrendSeries,
) -> AggregateTable {
    let mut table = AggregateTable::new(
        name,
        &[
            (x_name, ColumnKind::Float),
            ("price", ColumnKind::Float),
            ("trend", ColumnKind::Float),
        ],
    );
    let fit = series.fit.as_ref().ok();
    for &(x, y) in &series.points {
        table.push_row(vec![
            Cell::Float(x),
            Cell::Float(y),
            fit.map(|f| f.predict(x)).into(),
        ]);
    }
    annotate_fit(&mut table, &series.fit);
    table
}

pub(crate) fn year_trend_table(name: &'static str, trend: &YearTrend) -> AggregateTable {
    let mut table = AggregateTable::new(
        name,
        &[
            ("yr_built", ColumnKind::Int),
            ("count", ColumnKind::Int),
            ("median_price", ColumnKind::Float),
            ("trend", ColumnKind::Float),
        ],
    );
    let fit = trend.fit.as_ref().ok();
    for g in &trend.groups {
        table.push_row(vec![
            g.key.to_cell(),
            Cell::Int(g.count as i64),
            Cell::Float(g.value),
            fit.map(|f| f.predict(g.key as f64)).into(),
        ]);
    }
    annotate_fit(&mut table, &trend.fit);
    table
}

/// The filtered rows themselves, every field as a column.
pub fn records_table(name: &'static str, view: &FilteredView<'_>) -> AggregateTable {
    let mut table = AggregateTable::new(
        name,
        &[
            ("date", ColumnKind::Date),
            ("price", ColumnKind::Float),
            ("bedrooms", ColumnKind::Int),
            ("sqft_living", ColumnKind::Int),
            ("sqft_lot", ColumnKind::Int),
            ("floors", ColumnKind::Float),
            ("waterfront", ColumnKind::Int),
            ("view", ColumnKind::Int),
            ("condition", ColumnKind::Int),
            ("grade", ColumnKind::Int),
            ("zipcode", ColumnKind::Text),
            ("yr_built", ColumnKind::Int),
        ],
    );
    for r in view.iter() {
        table.push_row(vec![
            r.date.to_cell(),
            Cell::Float(r.price),
            r.bedrooms.to_cell(),
            r.sqft_living.to_cell(),
            r.sqft_lot.to_cell(),
            r.floors.to_cell(),
            r.waterfront.to_cell(),
            r.view.to_cell(),
            r.condition.to_cell(),
            r.grade.to_cell(),
            r.zipcode.to_cell(),
            r.yr_built.to_cell(),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::record;
    use crate::data::RecordStore;

    fn store(records: Vec<Record>) -> RecordStore {
        RecordStore::from_records(records).unwrap()
    }

    #[test]
    fn mean_price_by_bedrooms() {
        let s = store(vec![
            record(500_000.0, 3),
            record(700_000.0, 3),
            record(200_000.0, 1),
        ]);
        let groups = price_by_bedrooms(&FilteredView::all(&s));
        let pairs: Vec<(u32, f64)> = groups.iter().map(|g| (g.key, g.value)).collect();
        assert_eq!(pairs, vec![(1, 200_000.0), (3, 600_000.0)]);
        assert_eq!(groups.iter().map(|g| g.count).sum::<usize>(), 3);
    }

    #[test]
    fn bedroom_counts_are_sorted() {
        let s = store(vec![record(1.0, 4), record(2.0, 2), record(3.0, 4)]);
        let counts = bedrooms_lot_count(&FilteredView::all(&s));
        assert_eq!(
            counts,
            vec![GroupCount { key: 2, count: 1 }, GroupCount { key: 4, count: 2 }]
        );
    }

    #[test]
    fn histogram_spans_view_range() {
        let s = store((0..=10).map(|i| record(100.0 + i as f64 * 10.0, 1)).collect());
        let bins = price_histogram(&FilteredView::all(&s), 5);
        assert_eq!(bins.len(), 5);
        assert_eq!(bins[0].lower, 100.0);
        assert_eq!(bins[4].upper, 200.0);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 11);
        // 100, 110 | 120, 130 | 140, 150 | 160, 170 | 180, 190, 200
        assert_eq!(bins[4].count, 3);
    }

    #[test]
    fn histogram_of_constant_prices_is_one_bin() {
        let s = store(vec![record(5.0, 1), record(5.0, 2)]);
        let bins = price_histogram(&FilteredView::all(&s), 50);
        assert_eq!(bins, vec![HistogramBin { lower: 5.0, upper: 5.0, count: 2 }]);
    }

    #[test]
    fn histogram_of_empty_view_is_empty() {
        let s = store(vec![record(5.0, 1)]);
        let empty = FilteredView::from_indices(&s, Vec::new());
        assert!(price_histogram(&empty, 50).is_empty());
    }

    #[test]
    fn crosstab_zero_fills_missing_pairs() {
        let mut a = record(1.0, 1);
        a.waterfront = true;
        a.view = 4;
        let b = record(1.0, 1); // waterfront 0, view 0
        let s = store(vec![a, b]);
        let tab = waterfront_view_crosstab(&FilteredView::all(&s));
        assert_eq!(tab.rows, vec![false, true]);
        assert_eq!(tab.cols, vec![0, 4]);
        assert_eq!(tab.count(&true, &0), Some(0));
        assert_eq!(tab.count(&false, &4), Some(0));
        assert_eq!(tab.count(&true, &4), Some(1));
        assert_eq!(tab.total(), 2);

        let table = crosstab_table("t", "waterfront", "view", &tab);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn spread_of_single_sale_is_zero() {
        let s = store(vec![record(300_000.0, 2)]);
        let spread = floors_price_spread(&FilteredView::all(&s));
        assert_eq!(spread.len(), 1);
        assert_eq!(spread[0].median, 300_000.0);
        assert_eq!(spread[0].std_dev, 0.0);
    }

    #[test]
    fn year_trend_fits_group_medians() {
        let mut a = record(100_000.0, 1);
        a.yr_built = 2014;
        let mut b = record(300_000.0, 1);
        b.yr_built = 2016;
        let mut c = record(500_000.0, 1);
        c.yr_built = 2016;
        let s = store(vec![a, b, c]);

        let trend = price_by_year_built(&FilteredView::all(&s));
        assert_eq!(trend.groups.len(), 2);
        assert_eq!(trend.groups[1].value, 400_000.0);
        let fit = trend.fit.unwrap();
        assert_eq!(fit.slope, 150_000.0);
        assert_eq!(fit.predict(2014.0), 100_000.0);
    }

    #[test]
    fn trend_on_single_x_keeps_points_and_reports() {
        let s = store(vec![record(1.0, 1), record(2.0, 1)]);
        let series = price_vs_sqft_living(&FilteredView::all(&s));
        assert_eq!(series.points.len(), 2);
        assert!(series.fit.is_err());

        let table = trend_table("t", "sqft_living", &series);
        assert!(table.rows.iter().all(|row| row[2] == Cell::Null));
        assert!(table.note.as_deref().unwrap_or("").contains("insufficient data"));
        assert!(table.annotations.is_empty());
    }

    fn sale(price: f64, sqft_living: u32, sqft_lot: u32) -> Record {
        let mut r = record(price, 3);
        r.sqft_living = sqft_living;
        r.sqft_lot = sqft_lot;
        r
    }

    #[test]
    fn area_trends_fit_raw_sales() {
        let s = store(vec![
            sale(150_000.0, 1000, 4000),
            sale(250_000.0, 2000, 6000),
            sale(350_000.0, 3000, 5000),
        ]);
        let view = FilteredView::all(&s);

        let living = price_vs_sqft_living(&view);
        let fit = living.fit.as_ref().unwrap();
        assert!((fit.slope - 100.0).abs() < 1e-9);
        assert!((fit.intercept - 50_000.0).abs() < 1e-6);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        assert_eq!(fit.n, 3);

        let table = trend_table("price_vs_sqft_living", "sqft_living", &living);
        assert!(table.note.is_none());
        assert!((table.annotations["slope"] - 100.0).abs() < 1e-9);
        assert!((table.annotations["intercept"] - 50_000.0).abs() < 1e-6);
        for row in &table.rows {
            let (Cell::Float(x), Cell::Float(trend)) = (&row[0], &row[2]) else {
                panic!("unexpected row {row:?}");
            };
            assert!((trend - fit.predict(*x)).abs() < 1e-6);
        }

        let lot = price_vs_sqft_lot(&view);
        let fit = lot.fit.as_ref().unwrap();
        assert!((fit.slope - 50.0).abs() < 1e-9);
        assert!(fit.intercept.abs() < 1e-6);
        assert!((fit.r_squared - 0.25).abs() < 1e-12);

        let table = trend_table("price_vs_sqft_lot", "sqft_lot", &lot);
        assert_eq!(table.rows[0][2], Cell::Float(fit.predict(4000.0)));
        assert!((table.annotations["r_squared"] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn zipcodes_sort_as_text() {
        let mut a = record(1.0, 1);
        a.zipcode = "98199".into();
        let mut b = record(3.0, 1);
        b.zipcode = "98001".into();
        let mut c = record(5.0, 1);
        c.zipcode = "98001".into();
        let s = store(vec![a, b, c]);
        let groups = price_by_zipcode(&FilteredView::all(&s));
        assert_eq!(groups[0].key, "98001");
        assert_eq!(groups[0].value, 4.0);
        assert_eq!(groups[1].key, "98199");
    }
}
