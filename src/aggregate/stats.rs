use serde::Serialize;
use thiserror::Error;

/// An aggregate could not be computed for the current view.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("insufficient data for {what}: need at least {needed} distinct x-values, found {found}")]
pub struct InsufficientDataError {
    pub what: &'static str,
    pub needed: usize,
    pub found: usize,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n − 1 denominator). A single observation has
/// no spread, so it reports 0 rather than NaN.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if values.len() < 2 {
        return Some(0.0);
    }
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Quantile `q ∈ [0, 1]` of ascending `sorted` values, linearly
/// interpolated between closest ranks.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, 0.5)
}

// ---------------------------------------------------------------------------
// Five-number summary for box / violin plots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Distribution {
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
    /// Most extreme observation not below `q1 - 1.5 * IQR`.
    pub whisker_low: f64,
    /// Most extreme observation not above `q3 + 1.5 * IQR`.
    pub whisker_high: f64,
    /// Observations outside the whiskers.
    pub outliers: usize,
}

impl Distribution {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let (&min, &max) = (sorted.first()?, sorted.last()?);
        let q1 = quantile_sorted(&sorted, 0.25)?;
        let median = quantile_sorted(&sorted, 0.5)?;
        let q3 = quantile_sorted(&sorted, 0.75)?;

        let iqr = q3 - q1;
        let (fence_low, fence_high) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
        let inside = || sorted.iter().copied().filter(|v| (fence_low..=fence_high).contains(v));
        let whisker_low = inside().next().unwrap_or(min);
        let whisker_high = inside().last().unwrap_or(max);

        Some(Distribution {
            count: sorted.len(),
            min,
            q1,
            median,
            q3,
            max,
            mean: mean(&sorted)?,
            whisker_low,
            whisker_high,
            outliers: sorted.len() - inside().count(),
        })
    }
}

// ---------------------------------------------------------------------------
// Ordinary least squares
// ---------------------------------------------------------------------------

/// Simple linear regression `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub n: usize,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Closed-form OLS over `(x, y)` points. Needs at least two distinct x-values.
pub fn fit_ols(
    points: &[(f64, f64)],
    what: &'static str,
) -> Result<LinearFit, InsufficientDataError> {
    let distinct = match points.first() {
        None => 0,
        Some(&(x0, _)) if points.iter().all(|&(x, _)| x == x0) => 1,
        Some(_) => 2,
    };
    if distinct < 2 {
        return Err(InsufficientDataError {
            what,
            needed: 2,
            found: distinct,
        });
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in points {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    // A flat response is explained perfectly by a flat line.
    let r_squared = if syy == 0.0 { 1.0 } else { (sxy * sxy) / (sxx * syy) };

    Ok(LinearFit {
        slope,
        intercept,
        r_squared,
        n: points.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_median() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[500_000.0, 700_000.0]), Some(600_000.0));
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn std_dev_is_sample_and_zero_for_singletons() {
        assert_eq!(std_dev(&[42.0]), Some(0.0));
        assert_eq!(std_dev(&[]), None);
        // values 2, 4, 4, 4, 5, 5, 7, 9: sum of squares 32, n - 1 = 7
        let sd = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn quartiles_interpolate_linearly() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&sorted, 0.25), Some(1.75));
        assert_eq!(quantile_sorted(&sorted, 0.75), Some(3.25));
        assert_eq!(quantile_sorted(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile_sorted(&sorted, 1.0), Some(4.0));
    }

    #[test]
    fn single_value_distribution_collapses() {
        let d = Distribution::from_values(&[250_000.0]).unwrap();
        for v in [d.min, d.q1, d.median, d.q3, d.max, d.whisker_low, d.whisker_high] {
            assert_eq!(v, 250_000.0);
        }
        assert_eq!(d.outliers, 0);
        assert_eq!(d.count, 1);
    }

    #[test]
    fn distribution_flags_outliers() {
        let d = Distribution::from_values(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_eq!(d.median, 3.0);
        assert_eq!((d.q1, d.q3), (2.0, 4.0));
        assert_eq!(d.whisker_high, 4.0);
        assert_eq!(d.whisker_low, 1.0);
        assert_eq!(d.outliers, 1);
        assert_eq!(d.max, 100.0);
    }

    #[test]
    fn ols_through_two_points() {
        let fit = fit_ols(&[(2014.0, 100_000.0), (2016.0, 300_000.0)], "test").unwrap();
        assert_eq!(fit.slope, 100_000.0);
        assert_eq!(fit.predict(2014.0), 100_000.0);
        assert_eq!(fit.r_squared, 1.0);
        assert_eq!(fit.n, 2);
    }

    #[test]
    fn ols_needs_two_distinct_x() {
        let err = fit_ols(&[(3.0, 1.0), (3.0, 5.0)], "test").unwrap_err();
        assert_eq!(err.found, 1);
        assert!(fit_ols(&[], "test").is_err());
    }
}
