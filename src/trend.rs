use crate::error::StatsError;
use crate::models::{LinearTrend, MetricSeries};

/// (season, value) pairs from a series keyed by season or player-season.
/// Player-only keys carry no season and are skipped.
pub fn season_points(series: &MetricSeries) -> Vec<(f64, f64)> {
    series
        .entries()
        .iter()
        .filter_map(|(key, value)| key.season().map(|season| (f64::from(season), *value)))
        .collect()
}

/// Ordinary least squares fit of `value = slope * season + intercept`.
pub fn fit_trend(points: &[(f64, f64)]) -> Result<LinearTrend, StatsError> {
    let mut seasons: Vec<f64> = points.iter().map(|(x, _)| *x).collect();
    seasons.sort_by(|a, b| a.total_cmp(b));
    seasons.dedup();
    if seasons.len() < 2 {
        return Err(StatsError::InsufficientSampleSize {
            needed: 2,
            found: seasons.len(),
            what: "distinct seasons",
        });
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let (sxy, sxx) = points.iter().fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
        let dx = x - mean_x;
        (sxy + dx * (y - mean_y), sxx + dx * dx)
    });

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    if !slope.is_finite() || !intercept.is_finite() {
        return Err(StatsError::InvalidRatio(format!(
            "trend fit produced slope {slope}, intercept {intercept}"
        )));
    }

    Ok(LinearTrend {
        slope,
        intercept,
        observations: points.len(),
        distinct_seasons: seasons.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityKey;

    #[test]
    fn fits_exact_line() {
        let points = [(2020.0, 1.0), (2021.0, 3.0), (2022.0, 5.0)];
        let trend = fit_trend(&points).unwrap();
        assert!((trend.slope - 2.0).abs() < 1e-9);
        assert!((trend.predict(2023.0) - 7.0).abs() < 1e-6);
        assert_eq!(trend.distinct_seasons, 3);
    }

    #[test]
    fn uses_every_observation_not_season_means() {
        let points = [(2020.0, 0.0), (2020.0, 2.0), (2021.0, 4.0)];
        let trend = fit_trend(&points).unwrap();
        assert!((trend.slope - 3.0).abs() < 1e-9);
        assert_eq!(trend.observations, 3);
    }

    #[test]
    fn single_season_is_flagged() {
        let points = [(2022.0, 1.0), (2022.0, 4.0)];
        assert_eq!(
            fit_trend(&points),
            Err(StatsError::InsufficientSampleSize {
                needed: 2,
                found: 1,
                what: "distinct seasons"
            })
        );
    }

    #[test]
    fn season_points_skip_player_keys() {
        let series = MetricSeries::from_entries(vec![
            (
                EntityKey::PlayerSeason {
                    player: "Leo".into(),
                    season: 2021,
                },
                4.0,
            ),
            (EntityKey::Player("Ana".into()), 2.0),
            (EntityKey::Season(2022), 1.0),
        ]);
        assert_eq!(season_points(&series), vec![(2021.0, 4.0), (2022.0, 1.0)]);
    }
}
