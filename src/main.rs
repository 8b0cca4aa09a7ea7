use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod aggregate;
mod config;
mod dataset;
mod derived;
mod error;
mod estimate;
mod hypothesis;
mod models;
mod property_tests;
mod ranking;
mod report;
mod trend;

use crate::aggregate::Cohort;
use crate::config::{ReportConfig, DEFAULT_TOP_N};
use crate::dataset::Dataset;
use crate::models::{Grouping, Metric};
use crate::report::{ReportRequest, Section};

#[derive(Parser)]
#[command(name = "performance-report")]
#[command(about = "Player and season performance statistics from match CSV exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the column mapping, seasons and a preview of the dataset
    Inspect {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },
    /// Generate the full report for one season
    Report {
        #[arg(long)]
        csv: PathBuf,
        /// Defaults to the first season in the file
        #[arg(long)]
        season: Option<i32>,
        /// Second season for the per-player comparison test
        #[arg(long)]
        compare_with: Option<i32>,
        /// JSON file with views, histogram bins and trend metrics
        #[arg(long)]
        config: Option<PathBuf>,
        /// Overrides the ranking depth of every view
        #[arg(long)]
        top: Option<usize>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Rank players (or seasons) by a metric
    Rank {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, value_enum, default_value_t = Metric::Goals)]
        metric: Metric,
        #[arg(long, value_enum, default_value_t = Grouping::Player)]
        grouping: Grouping,
        #[arg(long)]
        season: Option<i32>,
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        limit: usize,
        /// List the lowest values instead of the highest
        #[arg(long)]
        bottom: bool,
    },
    /// Welch t-test of per-player values between two seasons
    Compare {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, value_enum, default_value_t = Metric::Goals)]
        metric: Metric,
        #[arg(long)]
        baseline: i32,
        #[arg(long)]
        other: i32,
    },
    /// Two-proportion test of home against away win rate
    HomeAdvantage {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        season: Option<i32>,
    },
    /// Linear trend of a metric across seasons
    Trend {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, value_enum, default_value_t = Metric::Goals)]
        metric: Metric,
    },
}

fn print_section<T>(section: &Section<T>, render: impl Fn(&T) -> String) {
    match section {
        Section::Ready { value } => println!("{}", render(value)),
        Section::Unavailable { notice, reason } => println!("{notice}: {reason}"),
    }
}

fn season_cohort(dataset: &Dataset, season: Option<i32>) -> Cohort<'_> {
    match season {
        Some(season) => Cohort::season(dataset, season),
        None => Cohort::all(dataset),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { csv, rows } => {
            let dataset = Dataset::from_path(&csv)?;
            println!(
                "{} records, {} players, {} rows skipped.",
                dataset.records().len(),
                dataset.player_count(),
                dataset.skipped_rows()
            );
            let seasons: Vec<String> = dataset.seasons().iter().map(|s| s.to_string()).collect();
            println!("Seasons: {}", seasons.join(", "));
            println!("Columns:");
            for column in dataset.columns() {
                println!("- {} <- {}", column.canonical, column.source);
            }
            println!("Preview:");
            for record in dataset.records().iter().take(rows) {
                println!(
                    "- {} {}: {} goals, {} min, {}/{} passes",
                    record.season,
                    record.player,
                    record.goals.map_or("-".to_string(), |g| g.to_string()),
                    record.minutes_played.map_or("-".to_string(), |m| m.to_string()),
                    record.accurate_passes.map_or("-".to_string(), |p| p.to_string()),
                    record.total_passes.map_or("-".to_string(), |p| p.to_string()),
                );
            }
        }
        Commands::Report {
            csv,
            season,
            compare_with,
            config,
            top,
            format,
            out,
        } => {
            let dataset = Dataset::from_path(&csv)?;
            let mut report_config = match config {
                Some(path) => ReportConfig::load(&path)?,
                None => ReportConfig::default(),
            };
            if let Some(n) = top {
                report_config = report_config.with_top_n(n);
            }

            let report = report::build_report(
                &dataset,
                ReportRequest {
                    season,
                    compare_with,
                },
                &report_config,
            );
            let rendered = match format {
                OutputFormat::Markdown => report::render_markdown(&report),
                OutputFormat::Json => report::render_json(&report)?,
            };

            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Report written to {}.", path.display());
                }
                None => print!("{rendered}"),
            }
        }
        Commands::Rank {
            csv,
            metric,
            grouping,
            season,
            limit,
            bottom,
        } => {
            let dataset = Dataset::from_path(&csv)?;
            let cohort = season_cohort(&dataset, season);
            let series = match derived::metric_series(&cohort, grouping, metric) {
                Ok(series) => series,
                Err(err) => {
                    println!("{}: {err}", err.notice());
                    return Ok(());
                }
            };
            let ranked = if bottom {
                ranking::bottom_n(&series, limit)
            } else {
                ranking::top_n(&series, limit)
            };

            println!(
                "{} by {} ({}):",
                if bottom { "Lowest" } else { "Highest" },
                metric.label(),
                cohort.name
            );
            for entry in ranked {
                println!("- {}: {:.3}", entry.entity, entry.value);
            }
        }
        Commands::Compare {
            csv,
            metric,
            baseline,
            other,
        } => {
            let dataset = Dataset::from_path(&csv)?;
            let comparison = report::compare_seasons(&dataset, metric, baseline, other);
            print_section(&comparison.result, |result| {
                format!(
                    "{} per player, {baseline} vs {other}: t = {:.3}, p = {:.4}, {:?}",
                    metric.label(),
                    result.statistic,
                    result.p_value,
                    result.decision
                )
            });
        }
        Commands::HomeAdvantage { csv, season } => {
            let dataset = Dataset::from_path(&csv)?;
            let cohort = season_cohort(&dataset, season);
            let advantage = report::home_advantage(&cohort);
            if let (Some(home), Some(away)) = (advantage.home, advantage.away) {
                println!(
                    "Home {}/{} wins, away {}/{} wins ({}).",
                    home.wins, home.matches, away.wins, away.matches, cohort.name
                );
            }
            print_section(&advantage.result, |result| {
                format!(
                    "z = {:.3}, p = {:.4}, {:?}",
                    result.statistic, result.p_value, result.decision
                )
            });
        }
        Commands::Trend { csv, metric } => {
            let dataset = Dataset::from_path(&csv)?;
            let trend = report::season_trend(&dataset, metric);
            print_section(&trend.fit, |fit| {
                format!(
                    "{} per player-season: slope {:.4}, intercept {:.2} ({} observations, {} seasons)",
                    metric.label(),
                    fit.slope,
                    fit.intercept,
                    fit.observations,
                    fit.distinct_seasons
                )
            });
            if let (Some(fit), Some(last)) = (trend.fit.ready(), dataset.seasons().iter().max()) {
                let next = last + 1;
                println!("Projected for {next}: {:.3}", fit.predict(f64::from(next)));
            }
        }
    }

    Ok(())
}
