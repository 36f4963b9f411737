use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use housing_lens::aggregate::AggregateKind;
use housing_lens::config::CatalogConfig;
use housing_lens::data::{loader, FilterSelection, Floors};
use housing_lens::output::{write_report, Format, ReportContext};
use housing_lens::state::Dashboard;

/// Filter a housing-sales table and print the dashboard aggregates.
#[derive(Debug, Parser)]
#[command(name = "housing-lens", version)]
struct Args {
    /// Input table (.csv, .json or .parquet).
    input: PathBuf,

    /// JSON file with `histogram_bins` and `visible` aggregates.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    price_min: Option<f64>,

    #[arg(long)]
    price_max: Option<f64>,

    #[arg(long)]
    sqft_min: Option<f64>,

    #[arg(long)]
    sqft_max: Option<f64>,

    /// Floors to keep, e.g. `--floors 1,1.5`. Default: all observed values.
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    floors: Option<Vec<Floors>>,

    /// Waterfront flags to keep (0 and/or 1). Default: both.
    #[arg(long, value_delimiter = ',', num_args = 1.., value_parser = parse_flag)]
    waterfront: Option<Vec<bool>>,

    /// Aggregates to compute; overrides the config's `visible` list.
    #[arg(long = "aggregate", short = 'a', value_delimiter = ',')]
    aggregates: Vec<AggregateKind>,

    /// Bin count for the price histogram; overrides the config.
    #[arg(long)]
    bins: Option<usize>,

    /// Also print the filtered rows.
    #[arg(long)]
    records: bool,

    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,
}

fn parse_flag(s: &str) -> Result<bool, String> {
    match s.trim() {
        "0" | "false" => Ok(false),
        "1" | "true" => Ok(true),
        other => Err(format!("'{other}' is not 0 or 1")),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CatalogConfig::from_file(path)?,
        None => CatalogConfig::default(),
    };
    if !args.aggregates.is_empty() {
        config.visible = args.aggregates.clone();
    }
    if let Some(bins) = args.bins {
        config.histogram_bins = bins;
    }
    if args.records && !config.visible.contains(&AggregateKind::FilteredRecords) {
        config.visible.insert(0, AggregateKind::FilteredRecords);
    }
    config.validate()?;

    let store = loader::load_file(&args.input)
        .with_context(|| format!("loading {}", args.input.display()))?;

    let mut dashboard = Dashboard::new(store);
    dashboard.set_selection(selection_from_args(&args, &dashboard));

    let entries = dashboard.refresh(&config);
    log::info!(
        "{} of {} records visible, {} aggregates computed",
        dashboard.visible_count(),
        dashboard.store().len(),
        entries.len()
    );

    let ctx = ReportContext {
        total_records: dashboard.store().len(),
        visible_records: dashboard.visible_count(),
        selection: dashboard.selection(),
        summary: dashboard.store().summary(),
    };
    let mut out = BufWriter::new(io::stdout().lock());
    write_report(&mut out, args.format, &ctx, &entries)?;
    out.flush()?;
    Ok(())
}

/// Unset bounds and sets fall back to the store's full range.
fn selection_from_args(args: &Args, dashboard: &Dashboard) -> FilterSelection {
    let price = dashboard.price_bounds();
    let sqft = dashboard.sqft_living_bounds();
    let mut selection = FilterSelection::full(dashboard.store())
        .with_price_range(
            args.price_min.unwrap_or(price.lo),
            args.price_max.unwrap_or(price.hi),
        )
        .with_sqft_living_range(
            args.sqft_min.unwrap_or(sqft.lo),
            args.sqft_max.unwrap_or(sqft.hi),
        );
    if let Some(floors) = &args.floors {
        selection = selection.with_floors(floors.iter().copied());
    }
    if let Some(waterfront) = &args.waterfront {
        selection = selection.with_waterfront(waterfront.iter().copied());
    }
    selection
}
