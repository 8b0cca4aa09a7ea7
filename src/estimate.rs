use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::config::CONFIDENCE_LEVEL;
use crate::error::StatsError;
use crate::models::{ConfidenceInterval, FiveNumberSummary, HistogramBin};

fn ensure_finite(values: &[f64]) -> Result<(), StatsError> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(bad) => Err(StatsError::InvalidRatio(format!(
            "series contains non-finite value {bad}"
        ))),
        None => Ok(()),
    }
}

pub fn mean(values: &[f64]) -> Result<f64, StatsError> {
    if values.is_empty() {
        return Err(StatsError::observations(1, 0));
    }
    ensure_finite(values)?;
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Unbiased (n − 1) variance.
pub fn sample_variance(values: &[f64]) -> Result<f64, StatsError> {
    if values.len() < 2 {
        return Err(StatsError::observations(2, values.len()));
    }
    let mean = mean(values)?;
    let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Ok(squares / (values.len() - 1) as f64)
}

pub fn standard_error(values: &[f64]) -> Result<f64, StatsError> {
    Ok((sample_variance(values)? / values.len() as f64).sqrt())
}

/// Two-sided Student-t interval around the sample mean with n − 1 degrees
/// of freedom. Collapses to the mean when every value is identical.
pub fn confidence_interval(values: &[f64]) -> Result<ConfidenceInterval, StatsError> {
    let n = values.len();
    let sem = standard_error(values)?;
    let mean = mean(values)?;

    let margin = if sem == 0.0 {
        0.0
    } else {
        let dist = StudentsT::new(0.0, 1.0, (n - 1) as f64)
            .map_err(|err| StatsError::DegenerateTest(err.to_string()))?;
        dist.inverse_cdf(0.5 + CONFIDENCE_LEVEL / 2.0) * sem
    };

    Ok(ConfidenceInterval {
        mean,
        lower: mean - margin,
        upper: mean + margin,
        sample_size: n,
        level: CONFIDENCE_LEVEL,
    })
}

/// Min, quartiles and max for box plots. Quartiles interpolate linearly
/// between order statistics.
pub fn five_number_summary(values: &[f64]) -> Result<FiveNumberSummary, StatsError> {
    if values.is_empty() {
        return Err(StatsError::observations(1, 0));
    }
    ensure_finite(values)?;
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    Ok(FiveNumberSummary {
        min: sorted[0],
        q1: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q3: quantile(&sorted, 0.75),
        max: sorted[sorted.len() - 1],
    })
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Equal-width bins spanning the data; the last bin includes its upper edge.
pub fn histogram(values: &[f64], bins: usize) -> Result<Vec<HistogramBin>, StatsError> {
    if values.is_empty() {
        return Err(StatsError::observations(1, 0));
    }
    ensure_finite(values)?;
    let bins = bins.max(1);

    let mut min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        min -= 0.5;
        max += 0.5;
    }
    let width = (max - min) / bins as f64;

    let mut counts = vec![0usize; bins];
    for value in values {
        let slot = (((value - min) / width).floor() as usize).min(bins - 1);
        counts[slot] += 1;
    }

    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_values_collapse_the_interval() {
        let ci = confidence_interval(&[2.0, 2.0, 2.0, 2.0]).unwrap();
        assert_eq!(ci.mean, 2.0);
        assert_eq!((ci.lower, ci.upper), (2.0, 2.0));
        assert_eq!(ci.sample_size, 4);
    }

    #[test]
    fn student_t_interval_for_small_sample() {
        let ci = confidence_interval(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!((ci.mean - 3.0).abs() < 1e-12);
        // t(0.975, 4) = 2.7764, SE = sqrt(2.5 / 5)
        let margin = 2.776_445 * (0.5f64).sqrt();
        assert!((ci.lower - (3.0 - margin)).abs() < 1e-4);
        assert!((ci.upper - (3.0 + margin)).abs() < 1e-4);
        assert!((ci.lower - 1.037).abs() < 1e-3);
        assert!((ci.upper - 4.963).abs() < 1e-3);
    }

    #[test]
    fn single_observation_is_reported_not_nan() {
        assert_eq!(
            confidence_interval(&[4.0]),
            Err(StatsError::InsufficientSampleSize {
                needed: 2,
                found: 1,
                what: "observations"
            })
        );
        assert!(confidence_interval(&[]).is_err());
    }

    #[test]
    fn non_finite_input_is_rejected() {
        assert!(matches!(
            confidence_interval(&[1.0, f64::NAN, 3.0]),
            Err(StatsError::InvalidRatio(_))
        ));
    }

    #[test]
    fn quartiles_interpolate() {
        let summary = five_number_summary(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.q1, 1.75);
        assert_eq!(summary.median, 2.5);
        assert_eq!(summary.q3, 3.25);
        assert_eq!(summary.max, 4.0);
    }

    #[test]
    fn histogram_counts_every_value() {
        let values = [0.0, 1.0, 1.0, 2.0, 5.0, 10.0];
        let bins = histogram(&values, 10).unwrap();
        assert_eq!(bins.len(), 10);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), values.len());
        assert_eq!(bins[0].lower, 0.0);
        assert_eq!(bins[9].upper, 10.0);
        assert_eq!(bins[9].count, 1);
        assert_eq!(bins[1].count, 2);
    }

    #[test]
    fn histogram_of_constant_series_has_width() {
        let bins = histogram(&[3.0, 3.0], 2).unwrap();
        assert_eq!(bins[0].lower, 2.5);
        assert_eq!(bins[1].upper, 3.5);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
    }
}
