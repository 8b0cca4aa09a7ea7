//! Property-based tests for the statistics pipeline.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::aggregate::tests::{dataset, record};
    use crate::aggregate::Cohort;
    use crate::derived::derived;
    use crate::estimate::confidence_interval;
    use crate::hypothesis::{two_proportion_z_test, welch_t_test};
    use crate::models::{DerivedMetric, EntityKey, Grouping, MetricSeries};
    use crate::ranking::top_n;

    fn finite_values(min_len: usize) -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(-1_000.0f64..1_000.0, min_len..40)
    }

    proptest! {
        /// The interval always brackets the sample mean.
        #[test]
        fn prop_interval_contains_mean(values in finite_values(2)) {
            let ci = confidence_interval(&values).unwrap();
            prop_assert!(ci.lower <= ci.mean);
            prop_assert!(ci.mean <= ci.upper);
            prop_assert!(ci.lower.is_finite() && ci.upper.is_finite());
        }

        /// Top-N is non-increasing and dominates everything left out.
        #[test]
        fn prop_top_n_dominates_rest(values in finite_values(0), n in 0usize..50) {
            let series = MetricSeries::from_entries(
                values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (EntityKey::Player(format!("p{i}")), *v)),
            );
            let top = top_n(&series, n);
            prop_assert_eq!(top.len(), n.min(values.len()));
            for pair in top.windows(2) {
                prop_assert!(pair[0].value >= pair[1].value);
            }
            if let Some(last) = top.last() {
                let chosen: Vec<&str> = top.iter().map(|e| e.entity.as_str()).collect();
                for (key, value) in series.entries() {
                    if !chosen.contains(&key.to_string().as_str()) {
                        prop_assert!(last.value >= *value);
                    }
                }
            }
        }

        /// Players with zero minutes never appear in a per-minute series.
        #[test]
        fn prop_zero_denominator_is_absent(
            rows in prop::collection::vec((0u32..5, prop::bool::ANY), 1..20),
        ) {
            let records: Vec<_> = rows
                .iter()
                .enumerate()
                .map(|(i, (goals, plays))| {
                    let minutes = if *plays { 90.0 } else { 0.0 };
                    record(2022, &format!("p{i}"), Some(*goals), minutes)
                })
                .collect();
            let data = dataset(records);
            let series = derived(&Cohort::all(&data), Grouping::Player, DerivedMetric::GoalsPerMinute);

            for (i, (_, plays)) in rows.iter().enumerate() {
                let value = series.get(&EntityKey::Player(format!("p{i}")));
                prop_assert_eq!(value.is_some(), *plays);
            }
            prop_assert!(series.values().iter().all(|v| v.is_finite()));
        }

        /// Swapping samples flips the sign of t and keeps the p-value.
        #[test]
        fn prop_welch_symmetric(a in finite_values(2), b in finite_values(2)) {
            match (welch_t_test(&a, &b), welch_t_test(&b, &a)) {
                (Ok(ab), Ok(ba)) => {
                    prop_assert!((ab.statistic + ba.statistic).abs() <= 1e-9 * ab.statistic.abs().max(1.0));
                    prop_assert!((ab.p_value - ba.p_value).abs() <= 1e-9);
                }
                (Err(_), Err(_)) => {}
                _ => prop_assert!(false, "only one direction was defined"),
            }
        }

        /// All successes against no successes is still a defined test.
        #[test]
        fn prop_opposite_extremes_are_defined(n1 in 1u64..500, n2 in 1u64..500) {
            let result = two_proportion_z_test(n1, n1, 0, n2).unwrap();
            prop_assert!(result.statistic > 0.0);
            prop_assert!(result.p_value >= 0.0 && result.p_value <= 1.0);
        }
    }
}
