use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::dataset::Dataset;
use crate::error::StatsError;
use crate::models::{EntityKey, Grouping, MatchRecord, MetricSeries, RawMetric, Venue};

/// A named, query-scoped subset of the dataset.
#[derive(Debug, Clone)]
pub struct Cohort<'a> {
    pub name: String,
    records: Vec<&'a MatchRecord>,
}

impl<'a> Cohort<'a> {
    pub fn select(
        dataset: &'a Dataset,
        name: impl Into<String>,
        predicate: impl Fn(&MatchRecord) -> bool,
    ) -> Self {
        Cohort {
            name: name.into(),
            records: dataset.records().iter().filter(|r| predicate(*r)).collect(),
        }
    }

    pub fn all(dataset: &'a Dataset) -> Self {
        Cohort::select(dataset, "all seasons", |_| true)
    }

    pub fn season(dataset: &'a Dataset, season: i32) -> Self {
        Cohort::select(dataset, format!("season {season}"), move |r| r.season == season)
    }

    /// Narrows an existing cohort to one venue.
    pub fn at_venue(&self, venue: Venue) -> Self {
        Cohort {
            name: format!("{} ({venue})", self.name),
            records: self
                .records
                .iter()
                .copied()
                .filter(|r| r.venue == Some(venue))
                .collect(),
        }
    }

    pub fn records(&self) -> &[&'a MatchRecord] {
        &self.records
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Mean,
}

/// Groups the cohort and reduces one raw metric per group.
///
/// Rows with a missing value are left out of their group rather than counted
/// as zero, and a group with no observed value does not appear at all.
pub fn aggregate(
    cohort: &Cohort<'_>,
    grouping: Grouping,
    metric: RawMetric,
    aggregation: Aggregation,
) -> MetricSeries {
    let groups = fold_groups(cohort, grouping, |record| {
        metric.value(record).map(|value| (value, 1.0))
    });

    MetricSeries::from_entries(groups.into_iter().map(|(key, (total, count))| {
        let value = match aggregation {
            Aggregation::Sum => total,
            Aggregation::Mean => total / count,
        };
        (key, value)
    }))
}

/// Sums a pair of values per group, keeping first-seen group order.
///
/// `extract` returns `None` to skip a row entirely.
pub(crate) fn fold_groups<F>(
    cohort: &Cohort<'_>,
    grouping: Grouping,
    extract: F,
) -> Vec<(EntityKey, (f64, f64))>
where
    F: Fn(&MatchRecord) -> Option<(f64, f64)>,
{
    let mut index: HashMap<EntityKey, usize> = HashMap::new();
    let mut groups: Vec<(EntityKey, (f64, f64))> = Vec::new();

    for record in cohort.records() {
        let Some((first, second)) = extract(record) else {
            continue;
        };
        let key = EntityKey::for_record(grouping, record);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push((key, (0.0, 0.0)));
            groups.len() - 1
        });
        let entry = &mut groups[slot].1;
        entry.0 += first;
        entry.1 += second;
    }

    groups
}

/// Wins and matches played for the team, one outcome per match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TeamOutcomes {
    pub wins: u64,
    pub matches: u64,
}

/// Collapses player rows into team results.
///
/// Every player row repeats its match's score, so rows are collapsed on
/// `(season, match_id)`. A row that carries a result but no match id cannot
/// be attributed to a match and fails the whole count. Rows without a venue
/// or score are ignored.
pub fn team_outcomes(cohort: &Cohort<'_>) -> Result<TeamOutcomes, StatsError> {
    let mut seen: HashSet<(i32, &str)> = HashSet::new();
    let mut outcomes = TeamOutcomes::default();

    for record in cohort.records() {
        let Some(won) = record.team_won() else {
            continue;
        };
        let Some(match_id) = record.match_id.as_deref() else {
            return Err(StatsError::MissingData(format!(
                "match id required for team outcomes ({} has a result without one in season {})",
                record.player, record.season
            )));
        };
        if !seen.insert((record.season, match_id)) {
            continue;
        }
        outcomes.matches += 1;
        if won {
            outcomes.wins += 1;
        }
    }

    Ok(outcomes)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn record(
        season: i32,
        player: &str,
        goals: Option<u32>,
        minutes: f64,
    ) -> MatchRecord {
        MatchRecord {
            season,
            player: player.to_string(),
            match_id: None,
            minutes_played: Some(minutes),
            goals,
            shots: Some(2),
            accurate_passes: Some(20),
            total_passes: Some(25),
            venue: Some(Venue::Home),
            home_score: Some(1),
            away_score: Some(0),
        }
    }

    pub(crate) fn dataset(records: Vec<MatchRecord>) -> Dataset {
        Dataset::from_records(records)
    }

    #[test]
    fn sums_by_player_in_first_seen_order() {
        let data = dataset(vec![
            record(2022, "Leo", Some(1), 90.0),
            record(2022, "Ana", Some(2), 90.0),
            record(2023, "Leo", Some(3), 90.0),
        ]);
        let series = aggregate(
            &Cohort::all(&data),
            Grouping::Player,
            RawMetric::Goals,
            Aggregation::Sum,
        );
        assert_eq!(
            series.entries(),
            &[
                (EntityKey::Player("Leo".into()), 4.0),
                (EntityKey::Player("Ana".into()), 2.0)
            ]
        );
    }

    #[test]
    fn missing_values_are_excluded_not_zeroed() {
        let data = dataset(vec![
            record(2022, "Leo", Some(2), 90.0),
            record(2022, "Leo", None, 90.0),
            record(2022, "Ana", None, 90.0),
        ]);
        let cohort = Cohort::all(&data);
        let mean = aggregate(&cohort, Grouping::Player, RawMetric::Goals, Aggregation::Mean);
        assert_eq!(mean.get(&EntityKey::Player("Leo".into())), Some(2.0));
        assert_eq!(mean.get(&EntityKey::Player("Ana".into())), None);
    }

    #[test]
    fn season_cohort_and_player_season_keys() {
        let data = dataset(vec![
            record(2022, "Leo", Some(1), 90.0),
            record(2023, "Leo", Some(3), 90.0),
        ]);
        let cohort = Cohort::season(&data, 2023);
        assert_eq!(cohort.name, "season 2023");
        let series = aggregate(
            &cohort,
            Grouping::PlayerSeason,
            RawMetric::Goals,
            Aggregation::Sum,
        );
        assert_eq!(series.len(), 1);
        assert_eq!(series.entries()[0].0.season(), Some(2023));
    }

    #[test]
    fn team_outcomes_count_each_match_once() {
        let mut a = record(2022, "Leo", Some(1), 90.0);
        a.match_id = Some("m1".into());
        let mut b = record(2022, "Ana", Some(0), 90.0);
        b.match_id = Some("m1".into());
        let mut c = record(2022, "Leo", Some(0), 90.0);
        c.match_id = Some("m2".into());
        c.home_score = Some(0);
        c.away_score = Some(3);
        let mut d = record(2022, "Leo", Some(0), 90.0);
        d.venue = None;

        let data = dataset(vec![a, b, c, d]);
        let outcomes = team_outcomes(&Cohort::all(&data)).unwrap();
        assert_eq!(outcomes, TeamOutcomes { wins: 1, matches: 2 });
    }

    #[test]
    fn team_outcomes_need_match_ids() {
        // three matches, eleven player rows each, no way to tell them apart
        let mut rows = Vec::new();
        for (home_score, away_score) in [(2, 0), (1, 0), (0, 1)] {
            for i in 0..11 {
                let mut row = record(2022, &format!("p{i}"), Some(0), 90.0);
                row.home_score = Some(home_score);
                row.away_score = Some(away_score);
                rows.push(row);
            }
        }
        let data = dataset(rows);
        match team_outcomes(&Cohort::all(&data)) {
            Err(StatsError::MissingData(message)) => {
                assert!(message.contains("match id required"))
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn same_season_repeated_match_id_counts_once_per_season() {
        let mut first = record(2022, "Leo", Some(1), 90.0);
        first.match_id = Some("1".into());
        let mut second = record(2023, "Leo", Some(1), 90.0);
        second.match_id = Some("1".into());
        let data = dataset(vec![first, second]);
        let outcomes = team_outcomes(&Cohort::all(&data)).unwrap();
        assert_eq!(outcomes, TeamOutcomes { wins: 2, matches: 2 });
    }

    #[test]
    fn venue_filter_narrows_cohort() {
        let mut away = record(2022, "Leo", Some(1), 90.0);
        away.venue = Some(Venue::Away);
        let data = dataset(vec![record(2022, "Ana", Some(1), 90.0), away]);
        let cohort = Cohort::all(&data).at_venue(Venue::Away);
        assert_eq!(cohort.records().len(), 1);
        assert_eq!(cohort.name, "all seasons (away)");
    }
}
