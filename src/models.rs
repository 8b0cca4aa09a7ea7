use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Venue {
    Home,
    Away,
}

impl Venue {
    pub fn parse(raw: &str) -> Option<Venue> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "home" | "casa" | "mandante" | "h" | "true" | "1" => Some(Venue::Home),
            "away" | "fora" | "visitante" | "a" | "false" | "0" => Some(Venue::Away),
            _ => None,
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::Home => write!(f, "home"),
            Venue::Away => write!(f, "away"),
        }
    }
}

/// One player's line for one match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub season: i32,
    pub player: String,
    pub match_id: Option<String>,
    pub minutes_played: Option<f64>,
    pub goals: Option<u32>,
    pub shots: Option<u32>,
    pub accurate_passes: Option<u32>,
    pub total_passes: Option<u32>,
    pub venue: Option<Venue>,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
}

impl MatchRecord {
    /// Whether the player's team won, from the venue and final score.
    pub fn team_won(&self) -> Option<bool> {
        let (home, away) = (self.home_score?, self.away_score?);
        match self.venue? {
            Venue::Home => Some(home > away),
            Venue::Away => Some(away > home),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawMetric {
    Goals,
    Shots,
    Minutes,
    AccuratePasses,
    TotalPasses,
}

impl RawMetric {
    pub fn value(self, record: &MatchRecord) -> Option<f64> {
        match self {
            RawMetric::Goals => record.goals.map(f64::from),
            RawMetric::Shots => record.shots.map(f64::from),
            RawMetric::Minutes => record.minutes_played,
            RawMetric::AccuratePasses => record.accurate_passes.map(f64::from),
            RawMetric::TotalPasses => record.total_passes.map(f64::from),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RawMetric::Goals => "goals",
            RawMetric::Shots => "shots",
            RawMetric::Minutes => "minutes played",
            RawMetric::AccuratePasses => "accurate passes",
            RawMetric::TotalPasses => "total passes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedMetric {
    GoalsPerMinute,
    PassAccuracy,
    AccuratePassesPerMinute,
    TotalPassesPerMinute,
}

impl DerivedMetric {
    pub fn numerator(self) -> RawMetric {
        match self {
            DerivedMetric::GoalsPerMinute => RawMetric::Goals,
            DerivedMetric::PassAccuracy | DerivedMetric::AccuratePassesPerMinute => {
                RawMetric::AccuratePasses
            }
            DerivedMetric::TotalPassesPerMinute => RawMetric::TotalPasses,
        }
    }

    pub fn denominator(self) -> RawMetric {
        match self {
            DerivedMetric::PassAccuracy => RawMetric::TotalPasses,
            _ => RawMetric::Minutes,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DerivedMetric::GoalsPerMinute => "goals per minute",
            DerivedMetric::PassAccuracy => "pass accuracy",
            DerivedMetric::AccuratePassesPerMinute => "accurate passes per minute",
            DerivedMetric::TotalPassesPerMinute => "passes per minute",
        }
    }
}

/// Either a raw column or a ratio of two raw columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    Goals,
    Shots,
    Minutes,
    AccuratePasses,
    TotalPasses,
    GoalsPerMinute,
    PassAccuracy,
    AccuratePassesPerMinute,
    TotalPassesPerMinute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricSource {
    Raw(RawMetric),
    Derived(DerivedMetric),
}

impl Metric {
    pub fn source(self) -> MetricSource {
        match self {
            Metric::Goals => MetricSource::Raw(RawMetric::Goals),
            Metric::Shots => MetricSource::Raw(RawMetric::Shots),
            Metric::Minutes => MetricSource::Raw(RawMetric::Minutes),
            Metric::AccuratePasses => MetricSource::Raw(RawMetric::AccuratePasses),
            Metric::TotalPasses => MetricSource::Raw(RawMetric::TotalPasses),
            Metric::GoalsPerMinute => MetricSource::Derived(DerivedMetric::GoalsPerMinute),
            Metric::PassAccuracy => MetricSource::Derived(DerivedMetric::PassAccuracy),
            Metric::AccuratePassesPerMinute => {
                MetricSource::Derived(DerivedMetric::AccuratePassesPerMinute)
            }
            Metric::TotalPassesPerMinute => {
                MetricSource::Derived(DerivedMetric::TotalPassesPerMinute)
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self.source() {
            MetricSource::Raw(raw) => raw.label(),
            MetricSource::Derived(derived) => derived.label(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Grouping {
    Player,
    Season,
    PlayerSeason,
}

impl Grouping {
    pub fn label(self) -> &'static str {
        match self {
            Grouping::Player => "player",
            Grouping::Season => "season",
            Grouping::PlayerSeason => "player and season",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum EntityKey {
    Player(String),
    Season(i32),
    PlayerSeason { player: String, season: i32 },
}

impl EntityKey {
    pub fn for_record(grouping: Grouping, record: &MatchRecord) -> EntityKey {
        match grouping {
            Grouping::Player => EntityKey::Player(record.player.clone()),
            Grouping::Season => EntityKey::Season(record.season),
            Grouping::PlayerSeason => EntityKey::PlayerSeason {
                player: record.player.clone(),
                season: record.season,
            },
        }
    }

    pub fn season(&self) -> Option<i32> {
        match self {
            EntityKey::Player(_) => None,
            EntityKey::Season(season) | EntityKey::PlayerSeason { season, .. } => Some(*season),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Player(player) => write!(f, "{player}"),
            EntityKey::Season(season) => write!(f, "{season}"),
            EntityKey::PlayerSeason { player, season } => write!(f, "{player} ({season})"),
        }
    }
}

/// Entity → value mapping, kept in first-seen order.
///
/// Only finite values are ever stored, so every summary statistic computed
/// from a series is safe from NaN or infinity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSeries {
    entries: Vec<(EntityKey, f64)>,
}

impl MetricSeries {
    pub fn from_entries(entries: impl IntoIterator<Item = (EntityKey, f64)>) -> Self {
        MetricSeries {
            entries: entries.into_iter().filter(|(_, v)| v.is_finite()).collect(),
        }
    }

    pub fn entries(&self) -> &[(EntityKey, f64)] {
        &self.entries
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }

    pub fn get(&self, key: &EntityKey) -> Option<f64> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
    pub sample_size: usize,
    pub level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    WelchT,
    TwoProportionZ,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    RejectNull,
    RetainNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestResult {
    pub kind: TestKind,
    pub statistic: f64,
    pub p_value: f64,
    pub degrees_of_freedom: Option<f64>,
    pub alpha: f64,
    pub decision: Decision,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearTrend {
    pub slope: f64,
    pub intercept: f64,
    pub observations: usize,
    pub distinct_seasons: usize,
}

impl LinearTrend {
    pub fn predict(&self, season: f64) -> f64 {
        self.slope * season + self.intercept
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub entity: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub entity: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FiveNumberSummary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}
