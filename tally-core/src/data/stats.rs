//! Descriptive Statistics
//!
//! Every function takes a slice of optional values, the shape produced by a
//! table column. Missing entries (and NaN) are skipped. An empty sequence is
//! reported as [`ComputeError::InsufficientData`] instead of yielding NaN.

use std::fmt;

use serde::Serialize;

use crate::error::ComputeError;

/// The present, non-NaN values of a sequence.
pub fn present(values: &[Option<f64>]) -> Vec<f64> {
    values
        .iter()
        .flatten()
        .copied()
        .filter(|v| !v.is_nan())
        .collect()
}

fn non_empty(values: &[Option<f64>], what: &str) -> Result<Vec<f64>, ComputeError> {
    let values = present(values);
    if values.is_empty() {
        return Err(ComputeError::insufficient(what));
    }
    Ok(values)
}

pub fn count(values: &[Option<f64>]) -> usize {
    present(values).len()
}

pub fn sum(values: &[Option<f64>]) -> f64 {
    present(values).iter().sum()
}

pub fn mean(values: &[Option<f64>]) -> Result<f64, ComputeError> {
    let values = non_empty(values, "mean")?;
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[Option<f64>]) -> Result<f64, ComputeError> {
    let mut values = non_empty(values, "median")?;
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Ok((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Ok(values[mid])
    }
}

/// Sample standard deviation (N - 1 denominator). Needs at least two values.
pub fn std_dev(values: &[Option<f64>]) -> Result<f64, ComputeError> {
    let values = present(values);
    if values.len() < 2 {
        return Err(ComputeError::insufficient("standard deviation"));
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Ok((squares / (n - 1.0)).sqrt())
}

pub fn min(values: &[Option<f64>]) -> Result<f64, ComputeError> {
    non_empty(values, "minimum")
        .map(|values| values.into_iter().fold(f64::INFINITY, f64::min))
}

pub fn max(values: &[Option<f64>]) -> Result<f64, ComputeError> {
    non_empty(values, "maximum")
        .map(|values| values.into_iter().fold(f64::NEG_INFINITY, f64::max))
}

/// Pearson correlation over the rows where both sides are present.
pub fn correlation(xs: &[Option<f64>], ys: &[Option<f64>]) -> Result<f64, ComputeError> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|pair| match pair {
            (Some(x), Some(y)) if !x.is_nan() && !y.is_nan() => Some((*x, *y)),
            _ => None,
        })
        .collect();
    if pairs.len() < 2 {
        return Err(ComputeError::insufficient("correlation"));
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return Err(ComputeError::insufficient("correlation of a constant column"));
    }
    Ok(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Summary of one numeric sequence, as shown by the statistics panels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub missing: usize,
    pub sum: f64,
    pub mean: f64,
    pub median: f64,
    /// `None` when fewer than two values are present.
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    pub fn of(values: &[Option<f64>]) -> Result<Self, ComputeError> {
        let count = count(values);
        Ok(Self {
            count,
            missing: values.len() - count,
            sum: sum(values),
            mean: mean(values)?,
            median: median(values)?,
            std: std_dev(values).ok(),
            min: min(values)?,
            max: max(values)?,
        })
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "count={} mean={:.2} median={:.2} std={} min={:.2} max={:.2}",
            self.count,
            self.mean,
            self.median,
            self.std.map_or_else(|| "n/a".to_owned(), |s| format!("{s:.2}")),
            self.min,
            self.max
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn mean_ignores_missing() {
        let values = vec![Some(100.0), None, Some(200.0), Some(300.0)];
        assert_eq!(mean(&values).unwrap(), 200.0);
    }

    #[test]
    fn empty_sequence_is_insufficient() {
        assert!(matches!(
            mean(&[None, None]),
            Err(ComputeError::InsufficientData { .. })
        ));
        assert!(matches!(
            median(&[]),
            Err(ComputeError::InsufficientData { .. })
        ));
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&some(&[3.0, 1.0, 2.0])).unwrap(), 2.0);
        assert_eq!(median(&some(&[4.0, 1.0, 3.0, 2.0])).unwrap(), 2.5);
    }

    #[test]
    fn std_uses_sample_denominator() {
        // Population std of this set is 2.0; the sample std is sqrt(32 / 7).
        let values = some(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let expected = (32.0f64 / 7.0).sqrt();
        assert!((std_dev(&values).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn std_needs_two_values() {
        assert!(matches!(
            std_dev(&some(&[1.0])),
            Err(ComputeError::InsufficientData { .. })
        ));
    }

    #[test]
    fn nan_is_treated_as_missing() {
        let values = vec![Some(1.0), Some(f64::NAN), Some(3.0)];
        assert_eq!(mean(&values).unwrap(), 2.0);
        assert_eq!(count(&values), 2);
    }

    #[test]
    fn correlation_of_linear_data() {
        let xs = some(&[1.0, 2.0, 3.0, 4.0]);
        let ys = vec![Some(2.0), Some(4.0), None, Some(8.0)];
        assert!((correlation(&xs, &ys).unwrap() - 1.0).abs() < 1e-12);

        let flat = some(&[5.0, 5.0, 5.0, 5.0]);
        assert!(correlation(&xs, &flat).is_err());
    }

    #[test]
    fn summary_of_single_value_has_no_std() {
        let summary = Summary::of(&[Some(7.0), None]).unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.std, None);
        assert_eq!(summary.min, 7.0);
        assert_eq!(summary.max, 7.0);
    }
}
