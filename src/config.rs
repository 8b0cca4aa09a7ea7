use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::models::{Grouping, Metric};

/// Two-sided confidence level used for every interval.
pub const CONFIDENCE_LEVEL: f64 = 0.95;

/// Null hypotheses are rejected when the p-value falls below this.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_HISTOGRAM_BINS: usize = 10;

/// One report view: which metric, grouped how, and how many entities to rank.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ViewConfig {
    pub title: String,
    pub metric: Metric,
    #[serde(default = "default_grouping")]
    pub grouping: Grouping,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_top_n")]
    pub bottom_n: usize,
}

impl ViewConfig {
    pub fn new(title: &str, metric: Metric, top_n: usize) -> Self {
        ViewConfig {
            title: title.to_string(),
            metric,
            grouping: Grouping::Player,
            top_n,
            bottom_n: top_n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub histogram_bins: usize,
    pub views: Vec<ViewConfig>,
    pub trend_metrics: Vec<Metric>,
    pub comparison_metric: Metric,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            views: vec![
                ViewConfig::new("Goals per player", Metric::Goals, DEFAULT_TOP_N),
                ViewConfig::new("Goals per minute", Metric::GoalsPerMinute, DEFAULT_TOP_N),
                ViewConfig::new("Pass accuracy", Metric::PassAccuracy, 3),
                ViewConfig::new("Passes per minute", Metric::TotalPassesPerMinute, 3),
            ],
            trend_metrics: vec![Metric::Goals],
            comparison_metric: Metric::Goals,
        }
    }
}

impl ReportConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: ReportConfig = serde_json::from_str(&raw)
            .with_context(|| format!("invalid report config {}", path.display()))?;
        anyhow::ensure!(config.histogram_bins > 0, "histogram_bins must be positive");
        Ok(config)
    }

    /// Replaces every view's ranking depth.
    pub fn with_top_n(mut self, n: usize) -> Self {
        for view in &mut self.views {
            view.top_n = n;
            view.bottom_n = n;
        }
        self
    }
}

fn default_grouping() -> Grouping {
    Grouping::Player
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}
