use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Date32Type, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate};
use clap::Parser;
use parquet::arrow::ArrowWriter;

/// Write a synthetic King County style housing table.
#[derive(Debug, Parser)]
struct Args {
    /// Output file; `.csv` or `.parquet`.
    #[arg(default_value = "housing_sample.csv")]
    output: PathBuf,

    #[arg(long, default_value_t = 2000)]
    rows: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n
    }

    /// Index drawn with the given relative weights.
    fn weighted(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        let mut target = self.next_f64() * total;
        for (i, w) in weights.iter().enumerate() {
            if target < *w {
                return i;
            }
            target -= w;
        }
        weights.len() - 1
    }
}

/// Zip code and its neighbourhood price multiplier.
const ZIPCODES: [(&str, f64); 12] = [
    ("98004", 2.4),
    ("98039", 3.1),
    ("98040", 2.2),
    ("98112", 1.9),
    ("98115", 1.4),
    ("98117", 1.3),
    ("98125", 1.1),
    ("98133", 0.9),
    ("98001", 0.7),
    ("98002", 0.6),
    ("98023", 0.7),
    ("98178", 0.8),
];

const FLOORS: [f64; 6] = [1.0, 1.5, 2.0, 2.5, 3.0, 3.5];
const FLOOR_WEIGHTS: [f64; 6] = [49.0, 9.0, 38.0, 1.0, 3.0, 0.1];

struct Columns {
    id: Vec<i64>,
    date: Vec<NaiveDate>,
    price: Vec<f64>,
    bedrooms: Vec<i64>,
    sqft_living: Vec<i64>,
    sqft_lot: Vec<i64>,
    floors: Vec<f64>,
    waterfront: Vec<i64>,
    view: Vec<i64>,
    condition: Vec<i64>,
    grade: Vec<i64>,
    yr_built: Vec<i64>,
    zipcode: Vec<String>,
}

fn generate(rows: usize, rng: &mut SimpleRng) -> Result<Columns> {
    let first_day = NaiveDate::from_ymd_opt(2014, 5, 2).context("start date")?;
    let sale_days = 390;

    let mut c = Columns {
        id: Vec::with_capacity(rows),
        date: Vec::with_capacity(rows),
        price: Vec::with_capacity(rows),
        bedrooms: Vec::with_capacity(rows),
        sqft_living: Vec::with_capacity(rows),
        sqft_lot: Vec::with_capacity(rows),
        floors: Vec::with_capacity(rows),
        waterfront: Vec::with_capacity(rows),
        view: Vec::with_capacity(rows),
        condition: Vec::with_capacity(rows),
        grade: Vec::with_capacity(rows),
        yr_built: Vec::with_capacity(rows),
        zipcode: Vec::with_capacity(rows),
    };

    for i in 0..rows {
        let (zipcode, zip_factor) = ZIPCODES[rng.below(ZIPCODES.len())];
        let sqft_living = rng.gauss(7.55, 0.42).exp().clamp(370.0, 12_000.0).round();
        let sqft_lot = (sqft_living * rng.gauss(3.5, 1.2).max(0.8)).round();
        let bedrooms =
            ((sqft_living / 650.0).round() + rng.gauss(0.0, 0.7).round()).clamp(0.0, 11.0);
        let floors = FLOORS[rng.weighted(&FLOOR_WEIGHTS)];
        let waterfront = rng.next_f64() < 0.008;
        let view = if waterfront {
            3 + rng.below(2) as i64
        } else {
            rng.weighted(&[90.0, 1.5, 4.5, 2.4, 1.5]) as i64
        };
        let condition = 1 + rng.weighted(&[0.1, 0.8, 65.0, 26.0, 8.0]) as i64;
        let grade = (7.0 + (sqft_living / 2080.0).ln() * 2.5 + rng.gauss(0.0, 0.6))
            .round()
            .clamp(3.0, 13.0) as i64;
        let yr_built = 1900 + rng.below(116) as i64;

        let mut price = 140.0 * sqft_living * zip_factor;
        price *= 1.0 + 0.12 * (grade as f64 - 7.0);
        price *= 1.0 + 0.06 * (condition as f64 - 3.0);
        price *= 1.0 + 0.08 * view as f64;
        if waterfront {
            price *= 2.2;
        }
        price *= rng.gauss(1.0, 0.12).max(0.5);

        let date = first_day + Duration::days(rng.below(sale_days) as i64);

        c.id.push(1_000_000_000 + i as i64 * 7919);
        c.date.push(date);
        c.price.push((price / 100.0).round().max(750.0) * 100.0);
        c.bedrooms.push(bedrooms as i64);
        c.sqft_living.push(sqft_living as i64);
        c.sqft_lot.push(sqft_lot as i64);
        c.floors.push(floors);
        c.waterfront.push(waterfront as i64);
        c.view.push(view);
        c.condition.push(condition);
        c.grade.push(grade);
        c.yr_built.push(yr_built);
        c.zipcode.push(zipcode.to_string());
    }
    Ok(c)
}

fn write_csv(path: &Path, c: &Columns) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    writer.write_record([
        "id", "date", "price", "bedrooms", "sqft_living", "sqft_lot", "floors", "waterfront",
        "view", "condition", "grade", "yr_built", "zipcode",
    ])?;
    for i in 0..c.id.len() {
        writer.write_record([
            c.id[i].to_string(),
            c.date[i].format("%Y%m%dT000000").to_string(),
            c.price[i].to_string(),
            c.bedrooms[i].to_string(),
            c.sqft_living[i].to_string(),
            c.sqft_lot[i].to_string(),
            c.floors[i].to_string(),
            c.waterfront[i].to_string(),
            c.view[i].to_string(),
            c.condition[i].to_string(),
            c.grade[i].to_string(),
            c.yr_built[i].to_string(),
            c.zipcode[i].clone(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, c: &Columns) -> Result<()> {
    let int = |name: &str| Field::new(name, DataType::Int64, false);
    let schema = Arc::new(Schema::new(vec![
        int("id"),
        Field::new("date", DataType::Date32, false),
        Field::new("price", DataType::Float64, false),
        int("bedrooms"),
        int("sqft_living"),
        int("sqft_lot"),
        Field::new("floors", DataType::Float64, false),
        int("waterfront"),
        int("view"),
        int("condition"),
        int("grade"),
        int("yr_built"),
        Field::new("zipcode", DataType::Utf8, false),
    ]));

    let days: Vec<i32> = c.date.iter().map(|d| Date32Type::from_naive_date(*d)).collect();
    let ints = |v: &Vec<i64>| -> ArrayRef { Arc::new(Int64Array::from(v.clone())) };

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            ints(&c.id),
            Arc::new(Date32Array::from(days)),
            Arc::new(Float64Array::from(c.price.clone())),
            ints(&c.bedrooms),
            ints(&c.sqft_living),
            ints(&c.sqft_lot),
            Arc::new(Float64Array::from(c.floors.clone())),
            ints(&c.waterfront),
            ints(&c.view),
            ints(&c.condition),
            ints(&c.grade),
            ints(&c.yr_built),
            Arc::new(StringArray::from_iter_values(c.zipcode.iter())),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating Parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing Parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut rng = SimpleRng::new(args.seed);
    let columns = generate(args.rows, &mut rng)?;

    let ext = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "csv" => write_csv(&args.output, &columns)?,
        "parquet" | "pq" => write_parquet(&args.output, &columns)?,
        other => bail!("Unsupported output extension: .{other}"),
    }

    log::info!("Wrote {} sales to {}", args.rows, args.output.display());
    println!("Wrote {} sales to {}", args.rows, args.output.display());
    Ok(())
}
