use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{aggregate, team_outcomes, Aggregation, Cohort, TeamOutcomes};
use crate::config::{ReportConfig, ViewConfig};
use crate::dataset::Dataset;
use crate::derived::metric_series;
use crate::error::StatsError;
use crate::estimate::{confidence_interval, five_number_summary, histogram};
use crate::hypothesis::{two_proportion_z_test, welch_t_test};
use crate::models::{
    ConfidenceInterval, Decision, FiveNumberSummary, Grouping, HistogramBin, LinearTrend,
    Metric, MetricSeries, RankedEntry, RawMetric, ScatterPoint, TestResult, Venue,
};
use crate::ranking::{bottom_n, top_n};
use crate::trend::{fit_trend, season_points};

/// A computed value, or the reason it could not be computed.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Section<T> {
    Ready { value: T },
    Unavailable { notice: String, reason: String },
}

impl<T> Section<T> {
    pub fn from_result(label: &str, result: Result<T, StatsError>) -> Self {
        match result {
            Ok(value) => Section::Ready { value },
            Err(err) => {
                warn!(section = label, error = %err, "section unavailable");
                Section::Unavailable {
                    notice: err.notice().to_string(),
                    reason: err.to_string(),
                }
            }
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Section::Ready { value } => Some(value),
            Section::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewReport {
    pub title: String,
    pub metric: Metric,
    pub grouping: Grouping,
    pub table: Vec<RankedEntry>,
    pub interval: Section<ConfidenceInterval>,
    pub top: Vec<RankedEntry>,
    pub bottom: Vec<RankedEntry>,
    pub histogram: Section<Vec<HistogramBin>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeasonComparison {
    pub metric: Metric,
    pub baseline: i32,
    pub other: i32,
    pub result: Section<TestResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HomeAdvantage {
    /// Absent when the rows cannot be collapsed into matches.
    pub home: Option<TeamOutcomes>,
    pub away: Option<TeamOutcomes>,
    pub result: Section<TestResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub metric: Metric,
    pub points: Vec<ScatterPoint>,
    pub fit: Section<LinearTrend>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeasonDistribution {
    pub season: i32,
    pub summary: FiveNumberSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub cohort: String,
    pub records: usize,
    pub players: usize,
    pub views: Vec<ViewReport>,
    pub season_comparison: Option<SeasonComparison>,
    pub home_advantage: HomeAdvantage,
    pub trends: Vec<TrendReport>,
    pub season_averages: Vec<RankedEntry>,
    pub season_distribution: Vec<SeasonDistribution>,
    pub shots_vs_goals: Vec<ScatterPoint>,
}

fn entries(series: &MetricSeries) -> Vec<RankedEntry> {
    series
        .entries()
        .iter()
        .map(|(key, value)| RankedEntry {
            entity: key.to_string(),
            value: *value,
        })
        .collect()
}

pub fn build_view(cohort: &Cohort<'_>, view: &ViewConfig, bins: usize) -> ViewReport {
    let series = metric_series(cohort, view.grouping, view.metric);
    let values = series.as_ref().map(|s| s.values()).map_err(|err| err.clone());

    let (table, top, bottom) = match &series {
        Ok(series) => (
            entries(series),
            top_n(series, view.top_n),
            bottom_n(series, view.bottom_n),
        ),
        Err(_) => (Vec::new(), Vec::new(), Vec::new()),
    };

    ViewReport {
        title: view.title.clone(),
        metric: view.metric,
        grouping: view.grouping,
        table,
        interval: Section::from_result(
            &view.title,
            values.clone().and_then(|v| confidence_interval(&v)),
        ),
        top,
        bottom,
        histogram: Section::from_result(&view.title, values.and_then(|v| histogram(&v, bins))),
    }
}

/// Welch test of per-player totals between two seasons.
pub fn compare_seasons(
    dataset: &Dataset,
    metric: Metric,
    baseline: i32,
    other: i32,
) -> SeasonComparison {
    let sample = |season: i32| {
        metric_series(&Cohort::season(dataset, season), Grouping::Player, metric)
            .map(|series| series.values())
    };
    let result = sample(baseline)
        .and_then(|a| sample(other).and_then(|b| welch_t_test(&a, &b)));

    SeasonComparison {
        metric,
        baseline,
        other,
        result: Section::from_result("season comparison", result),
    }
}

/// Home win rate against away win rate.
pub fn home_advantage(cohort: &Cohort<'_>) -> HomeAdvantage {
    let outcomes = team_outcomes(&cohort.at_venue(Venue::Home))
        .and_then(|home| team_outcomes(&cohort.at_venue(Venue::Away)).map(|away| (home, away)));
    let (home, away, result) = match outcomes {
        Ok((home, away)) => (
            Some(home),
            Some(away),
            two_proportion_z_test(home.wins, home.matches, away.wins, away.matches),
        ),
        Err(err) => (None, None, Err(err)),
    };
    HomeAdvantage {
        home,
        away,
        result: Section::from_result("home advantage", result),
    }
}

/// Linear trend of per-player season totals across every season.
pub fn season_trend(dataset: &Dataset, metric: Metric) -> TrendReport {
    let series = metric_series(&Cohort::all(dataset), Grouping::PlayerSeason, metric);
    let points = match &series {
        Ok(series) => series
            .entries()
            .iter()
            .filter_map(|(key, value)| {
                key.season().map(|season| ScatterPoint {
                    entity: key.to_string(),
                    x: f64::from(season),
                    y: *value,
                })
            })
            .collect(),
        Err(_) => Vec::new(),
    };
    let fit = series.and_then(|series| fit_trend(&season_points(&series)));

    TrendReport {
        metric,
        points,
        fit: Section::from_result("trend", fit),
    }
}

fn season_distribution(dataset: &Dataset, metric: Metric) -> Vec<SeasonDistribution> {
    dataset
        .seasons()
        .into_iter()
        .filter_map(|season| {
            let series =
                metric_series(&Cohort::season(dataset, season), Grouping::Player, metric).ok()?;
            let summary = five_number_summary(&series.values()).ok()?;
            Some(SeasonDistribution { season, summary })
        })
        .collect()
}

fn shots_vs_goals(cohort: &Cohort<'_>) -> Vec<ScatterPoint> {
    let shots = aggregate(cohort, Grouping::Player, RawMetric::Shots, Aggregation::Sum);
    let goals = aggregate(cohort, Grouping::Player, RawMetric::Goals, Aggregation::Sum);
    shots
        .entries()
        .iter()
        .filter_map(|(key, x)| {
            goals.get(key).map(|y| ScatterPoint {
                entity: key.to_string(),
                x: *x,
                y,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRequest {
    /// Season to report on; the first season in the file when absent.
    pub season: Option<i32>,
    pub compare_with: Option<i32>,
}

pub fn build_report(dataset: &Dataset, request: ReportRequest, config: &ReportConfig) -> Report {
    let season = request
        .season
        .or_else(|| dataset.seasons().first().copied());
    let cohort = match season {
        Some(season) => Cohort::season(dataset, season),
        None => Cohort::all(dataset),
    };
    info!(cohort = %cohort.name, views = config.views.len(), "building report");

    let views = config
        .views
        .iter()
        .map(|view| build_view(&cohort, view, config.histogram_bins))
        .collect();

    let season_comparison = match (season, request.compare_with) {
        (Some(baseline), Some(other)) => Some(compare_seasons(
            dataset,
            config.comparison_metric,
            baseline,
            other,
        )),
        _ => None,
    };

    let all = Cohort::all(dataset);
    let season_averages = entries(&aggregate(
        &all,
        Grouping::Season,
        RawMetric::Goals,
        Aggregation::Mean,
    ));

    Report {
        generated_at: Utc::now(),
        records: cohort.records().len(),
        players: {
            let players: std::collections::HashSet<&str> =
                cohort.records().iter().map(|r| r.player.as_str()).collect();
            players.len()
        },
        cohort: cohort.name.clone(),
        views,
        season_comparison,
        home_advantage: home_advantage(&cohort),
        trends: config
            .trend_metrics
            .iter()
            .map(|metric| season_trend(dataset, *metric))
            .collect(),
        season_averages,
        season_distribution: season_distribution(dataset, config.comparison_metric),
        shots_vs_goals: shots_vs_goals(&cohort),
    }
}

fn write_section<T>(output: &mut String, section: &Section<T>, render: impl Fn(&T) -> String) {
    let _ = match section {
        Section::Ready { value } => writeln!(output, "{}", render(value)),
        Section::Unavailable { notice, reason } => writeln!(output, "_{notice}: {reason}_"),
    };
}

fn describe_test(result: &TestResult) -> String {
    let verdict = match result.decision {
        Decision::RejectNull => "significant difference",
        Decision::RetainNull => "no significant difference",
    };
    let df = result
        .degrees_of_freedom
        .map(|df| format!(", df {df:.1}"))
        .unwrap_or_default();
    format!(
        "statistic {:.3}{df}, p-value {:.4} ({verdict} at α = {})",
        result.statistic, result.p_value, result.alpha
    )
}

fn write_entries(output: &mut String, entries: &[RankedEntry], empty: &str) {
    if entries.is_empty() {
        let _ = writeln!(output, "{empty}");
        return;
    }
    for entry in entries {
        let _ = writeln!(output, "- {}: {:.3}", entry.entity, entry.value);
    }
}

fn write_points(output: &mut String, points: &[ScatterPoint], empty: &str) {
    if points.is_empty() {
        let _ = writeln!(output, "{empty}");
        return;
    }
    for point in points {
        let _ = writeln!(output, "- {}: ({}, {:.3})", point.entity, point.x, point.y);
    }
}

pub fn render_markdown(report: &Report) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Squad Performance Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} records, {} players) at {}",
        report.cohort,
        report.records,
        report.players,
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    );

    for view in &report.views {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {}", view.title);
        let _ = write!(output, "Mean and 95% interval: ");
        write_section(&mut output, &view.interval, |ci| {
            format!(
                "{:.3} ({:.3}, {:.3}) over {} entities",
                ci.mean, ci.lower, ci.upper, ci.sample_size
            )
        });

        let _ = writeln!(output);
        let _ = writeln!(output, "### Values by {}", view.grouping.label());
        write_entries(&mut output, &view.table, "No values recorded for this cohort.");

        let _ = writeln!(output);
        let _ = writeln!(output, "### Top {}", view.top.len());
        write_entries(&mut output, &view.top, "No values recorded for this cohort.");
        let _ = writeln!(output);
        let _ = writeln!(output, "### Bottom {}", view.bottom.len());
        write_entries(&mut output, &view.bottom, "No values recorded for this cohort.");

        let _ = writeln!(output);
        let _ = writeln!(output, "### Distribution");
        write_section(&mut output, &view.histogram, |bins| {
            bins.iter()
                .map(|bin| format!("- [{:.3}, {:.3}): {}", bin.lower, bin.upper, bin.count))
                .collect::<Vec<_>>()
                .join("\n")
        });
    }

    if let Some(comparison) = &report.season_comparison {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "## {} per player: {} vs {}",
            comparison.metric.label(),
            comparison.baseline,
            comparison.other
        );
        write_section(&mut output, &comparison.result, describe_test);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Home vs Away");
    let advantage = &report.home_advantage;
    if let (Some(home), Some(away)) = (advantage.home, advantage.away) {
        let _ = writeln!(
            output,
            "Home: {} wins in {} matches. Away: {} wins in {} matches.",
            home.wins, home.matches, away.wins, away.matches
        );
    }
    write_section(&mut output, &advantage.result, describe_test);

    for trend in &report.trends {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Trend: {} per player-season", trend.metric.label());
        write_section(&mut output, &trend.fit, |fit| {
            format!(
                "slope {:.4} per season, intercept {:.2} ({} observations over {} seasons)",
                fit.slope, fit.intercept, fit.observations, fit.distinct_seasons
            )
        });
        write_points(&mut output, &trend.points, "No player-season values recorded.");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Average goals per appearance by season");
    write_entries(&mut output, &report.season_averages, "No goals recorded.");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Per-player distribution by season");
    if report.season_distribution.is_empty() {
        let _ = writeln!(output, "No per-player values recorded.");
    }
    for row in &report.season_distribution {
        let summary = &row.summary;
        let _ = writeln!(
            output,
            "- {}: min {:.3}, q1 {:.3}, median {:.3}, q3 {:.3}, max {:.3}",
            row.season, summary.min, summary.q1, summary.median, summary.q3, summary.max
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Shots against goals");
    write_points(&mut output, &report.shots_vs_goals, "No shots and goals recorded together.");

    output
}

pub fn render_json(report: &Report) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
