use tracing::debug;

use crate::aggregate::{aggregate, fold_groups, Aggregation, Cohort};
use crate::error::StatsError;
use crate::models::{DerivedMetric, Grouping, Metric, MetricSeries, MetricSource};

/// Divides two observations, refusing zero denominators and non-finite results.
pub fn ratio(numerator: f64, denominator: f64) -> Result<f64, StatsError> {
    if denominator == 0.0 || !denominator.is_finite() {
        return Err(StatsError::InvalidRatio(format!(
            "{numerator} / {denominator}: denominator is zero or not finite"
        )));
    }
    let value = numerator / denominator;
    if !value.is_finite() {
        return Err(StatsError::InvalidRatio(format!(
            "{numerator} / {denominator} is not finite"
        )));
    }
    Ok(value)
}

/// Per-group ratio of two raw metrics.
///
/// Numerator and denominator are summed over rows where both are present;
/// groups whose ratio is invalid are left out of the series.
pub fn derived(cohort: &Cohort<'_>, grouping: Grouping, metric: DerivedMetric) -> MetricSeries {
    let (num, den) = (metric.numerator(), metric.denominator());
    let groups = fold_groups(cohort, grouping, |record| {
        Some((num.value(record)?, den.value(record)?))
    });

    let mut entries = Vec::with_capacity(groups.len());
    for (key, (numerator, denominator)) in groups {
        match ratio(numerator, denominator) {
            Ok(value) => entries.push((key, value)),
            Err(err) => debug!(entity = %key, metric = metric.label(), %err, "excluded"),
        }
    }
    MetricSeries::from_entries(entries)
}

/// Builds the series for any metric, failing with `MissingData` when the
/// cohort has no usable value for it.
pub fn metric_series(
    cohort: &Cohort<'_>,
    grouping: Grouping,
    metric: Metric,
) -> Result<MetricSeries, StatsError> {
    let series = match metric.source() {
        MetricSource::Raw(raw) => aggregate(cohort, grouping, raw, Aggregation::Sum),
        MetricSource::Derived(derived_metric) => derived(cohort, grouping, derived_metric),
    };
    debug!(
        metric = metric.label(),
        cohort = %cohort.name,
        entities = series.len(),
        "series built"
    );
    if series.is_empty() {
        return Err(StatsError::MissingData(format!(
            "no {} values for {}",
            metric.label(),
            cohort.name
        )));
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::{dataset, record};
    use crate::models::EntityKey;

    #[test]
    fn zero_minutes_excludes_the_player() {
        let data = dataset(vec![
            record(2022, "Leo", Some(3), 90.0),
            record(2022, "Ana", Some(0), 0.0),
        ]);
        let series = derived(&Cohort::all(&data), Grouping::Player, DerivedMetric::GoalsPerMinute);
        assert_eq!(series.len(), 1);
        let value = series.get(&EntityKey::Player("Leo".into())).unwrap();
        assert!((value - 0.0333).abs() < 1e-4);
        assert_eq!(series.get(&EntityKey::Player("Ana".into())), None);
    }

    #[test]
    fn nonzero_numerator_over_zero_is_filtered() {
        let data = dataset(vec![record(2022, "Ana", Some(2), 0.0)]);
        let series = derived(&Cohort::all(&data), Grouping::Player, DerivedMetric::GoalsPerMinute);
        assert!(series.is_empty());
    }

    #[test]
    fn rows_missing_either_side_do_not_contribute() {
        let mut no_total = record(2022, "Leo", Some(0), 90.0);
        no_total.total_passes = None;
        no_total.accurate_passes = Some(100);
        let data = dataset(vec![record(2022, "Leo", Some(0), 90.0), no_total]);
        let series = derived(&Cohort::all(&data), Grouping::Player, DerivedMetric::PassAccuracy);
        assert_eq!(series.get(&EntityKey::Player("Leo".into())), Some(0.8));
    }

    #[test]
    fn passes_per_minute_uses_chosen_basis() {
        let data = dataset(vec![record(2022, "Leo", Some(0), 50.0)]);
        let cohort = Cohort::all(&data);
        let accurate = derived(&cohort, Grouping::Player, DerivedMetric::AccuratePassesPerMinute);
        let total = derived(&cohort, Grouping::Player, DerivedMetric::TotalPassesPerMinute);
        assert_eq!(accurate.values(), vec![0.4]);
        assert_eq!(total.values(), vec![0.5]);
    }

    #[test]
    fn empty_metric_series_is_missing_data() {
        let data = dataset(vec![record(2022, "Leo", None, 90.0)]);
        let cohort = Cohort::all(&data);
        assert!(matches!(
            metric_series(&cohort, Grouping::Player, Metric::Goals),
            Err(StatsError::MissingData(_))
        ));
        let shots = metric_series(&cohort, Grouping::Player, Metric::Shots).unwrap();
        assert_eq!(shots.values(), vec![2.0]);
    }

    #[test]
    fn ratio_reports_invalid_values() {
        assert!(matches!(ratio(1.0, 0.0), Err(StatsError::InvalidRatio(_))));
        assert!(matches!(ratio(0.0, 0.0), Err(StatsError::InvalidRatio(_))));
        assert_eq!(ratio(3.0, 4.0), Ok(0.75));
    }
}
