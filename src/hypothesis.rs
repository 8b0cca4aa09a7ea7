use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

use crate::config::SIGNIFICANCE_LEVEL;
use crate::error::StatsError;
use crate::estimate::{mean, sample_variance};
use crate::models::{Decision, TestKind, TestResult};

fn decide(
    kind: TestKind,
    statistic: f64,
    p_value: f64,
    df: Option<f64>,
) -> Result<TestResult, StatsError> {
    if !statistic.is_finite() || !p_value.is_finite() {
        return Err(StatsError::DegenerateTest(format!(
            "statistic {statistic}, p-value {p_value}"
        )));
    }
    let decision = if p_value < SIGNIFICANCE_LEVEL {
        Decision::RejectNull
    } else {
        Decision::RetainNull
    };
    Ok(TestResult {
        kind,
        statistic,
        p_value,
        degrees_of_freedom: df,
        alpha: SIGNIFICANCE_LEVEL,
        decision,
    })
}

/// Two-sample t-test without assuming equal variances.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Result<TestResult, StatsError> {
    if a.len() < 2 || b.len() < 2 {
        return Err(StatsError::observations(2, a.len().min(b.len())));
    }
    let (n_a, n_b) = (a.len() as f64, b.len() as f64);
    let (var_a, var_b) = (sample_variance(a)?, sample_variance(b)?);
    if var_a == 0.0 && var_b == 0.0 {
        return Err(StatsError::DegenerateTest(
            "both samples have zero variance".to_string(),
        ));
    }

    let (se_a, se_b) = (var_a / n_a, var_b / n_b);
    let t = (mean(a)? - mean(b)?) / (se_a + se_b).sqrt();

    // Welch–Satterthwaite
    let df = (se_a + se_b).powi(2) / (se_a.powi(2) / (n_a - 1.0) + se_b.powi(2) / (n_b - 1.0));

    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|err| StatsError::DegenerateTest(err.to_string()))?;
    let p_value = 2.0 * dist.sf(t.abs());
    decide(TestKind::WelchT, t, p_value, Some(df))
}

/// Pooled two-proportion z-test for `k1/n1` against `k2/n2`.
pub fn two_proportion_z_test(
    k1: u64,
    n1: u64,
    k2: u64,
    n2: u64,
) -> Result<TestResult, StatsError> {
    if n1 == 0 || n2 == 0 {
        return Err(StatsError::DegenerateTest(format!(
            "empty sample ({n1} and {n2} trials)"
        )));
    }
    if k1 > n1 || k2 > n2 {
        return Err(StatsError::DegenerateTest(
            "successes exceed trials".to_string(),
        ));
    }

    let (n1f, n2f) = (n1 as f64, n2 as f64);
    let pooled = (k1 + k2) as f64 / (n1f + n2f);
    if pooled <= 0.0 || pooled >= 1.0 {
        return Err(StatsError::DegenerateTest(format!(
            "pooled proportion {pooled} leaves no variance"
        )));
    }

    let se = (pooled * (1.0 - pooled) * (1.0 / n1f + 1.0 / n2f)).sqrt();
    let z = (k1 as f64 / n1f - k2 as f64 / n2f) / se;
    let normal =
        Normal::new(0.0, 1.0).map_err(|err| StatsError::DegenerateTest(err.to_string()))?;
    let p_value = 2.0 * normal.sf(z.abs());
    decide(TestKind::TwoProportionZ, z, p_value, None)
}
