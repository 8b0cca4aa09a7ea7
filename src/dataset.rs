use std::io::Read;
use std::path::Path;

use anyhow::Context;
use csv::StringRecord;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::StatsError;
use crate::models::{MatchRecord, Venue};

/// Canonical column names and the header spellings accepted for each.
/// The canonical name always comes first; the first alias present wins.
const COLUMN_ALIASES: &[(&str, &[&str])] = &[
    ("season", &["season", "year", "ano"]),
    (
        "player",
        &["player", "player_name", "nome_jogador", "player_id", "jogador"],
    ),
    (
        "minutes_played",
        &[
            "minutes_played",
            "minutes",
            "statistics_minutes_played",
            "minutos_jogados",
        ],
    ),
    ("goals", &["goals", "statistics_goals", "gols"]),
    (
        "shots",
        &["shots", "statistics_total_shots", "statistics_shots", "finalizacoes"],
    ),
    (
        "accurate_passes",
        &["accurate_passes", "statistics_accurate_pass", "passes_certos"],
    ),
    (
        "total_passes",
        &["total_passes", "statistics_total_pass", "passes_totais"],
    ),
    ("venue", &["venue", "home_away", "mando", "is_home"]),
    ("home_score", &["home_score", "placar_casa", "gols_mandante"]),
    ("away_score", &["away_score", "placar_visitante", "gols_visitante"]),
    ("match_id", &["match_id", "game_id", "partida_id", "jogo_id"]),
];

const OPTIONAL_COLUMNS: &[&str] = &["match_id"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub canonical: &'static str,
    pub source: String,
}

/// The loaded table for one session. Read-only once built; loading a new
/// file produces a new `Dataset`.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<MatchRecord>,
    columns: Vec<ColumnMapping>,
    skipped_rows: usize,
}

#[derive(Deserialize)]
struct CsvRow {
    season: Option<f64>,
    player: Option<String>,
    match_id: Option<String>,
    minutes_played: Option<f64>,
    goals: Option<f64>,
    shots: Option<f64>,
    accurate_passes: Option<f64>,
    total_passes: Option<f64>,
    venue: Option<String>,
    home_score: Option<f64>,
    away_score: Option<f64>,
}

impl Dataset {
    pub fn from_path(path: &Path) -> anyhow::Result<Dataset> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let dataset = Dataset::from_reader(file)
            .with_context(|| format!("failed to load {}", path.display()))?;
        info!(
            path = %path.display(),
            records = dataset.records.len(),
            skipped = dataset.skipped_rows,
            "dataset loaded"
        );
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(source: R) -> anyhow::Result<Dataset> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        let headers = reader.headers()?.clone();
        let (normalized, columns) = normalize_headers(&headers)?;
        reader.set_headers(normalized);

        let mut records = Vec::new();
        let mut skipped_rows = 0usize;

        for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
            // header is line 1
            let line = index + 2;
            let row = match result {
                Ok(row) => row,
                Err(err)
                    if matches!(
                        err.kind(),
                        csv::ErrorKind::Deserialize { .. } | csv::ErrorKind::UnequalLengths { .. }
                    ) =>
                {
                    warn!(line, error = %err, "skipping unparseable row");
                    skipped_rows += 1;
                    continue;
                }
                Err(err) => return Err(err).context(format!("malformed CSV at line {line}")),
            };

            match row.into_record() {
                Ok(record) => records.push(record),
                Err(reason) => {
                    warn!(line, %reason, "skipping invalid row");
                    skipped_rows += 1;
                }
            }
        }

        if records.is_empty() {
            return Err(StatsError::MissingData("dataset has no usable rows".to_string()).into());
        }

        Ok(Dataset {
            records,
            columns,
            skipped_rows,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_records(records: Vec<MatchRecord>) -> Dataset {
        Dataset {
            records,
            columns: Vec::new(),
            skipped_rows: 0,
        }
    }

    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    pub fn columns(&self) -> &[ColumnMapping] {
        &self.columns
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// Seasons in the order they first appear in the file.
    pub fn seasons(&self) -> Vec<i32> {
        let mut seasons = Vec::new();
        for record in &self.records {
            if !seasons.contains(&record.season) {
                seasons.push(record.season);
            }
        }
        seasons
    }

    pub fn player_count(&self) -> usize {
        let players: std::collections::HashSet<&str> =
            self.records.iter().map(|r| r.player.as_str()).collect();
        players.len()
    }
}

/// Renames the best-matching header of every canonical column, failing with
/// `MissingData` when a required column has no match at all or when the
/// chosen spelling appears more than once ignoring case.
fn normalize_headers(
    headers: &StringRecord,
) -> Result<(StringRecord, Vec<ColumnMapping>), StatsError> {
    let mut names: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let lowered: Vec<String> = names.iter().map(|h| h.to_ascii_lowercase()).collect();
    let mut columns = Vec::new();
    let mut missing = Vec::new();

    for (canonical, aliases) in COLUMN_ALIASES {
        let found = aliases
            .iter()
            .find_map(|alias| lowered.iter().position(|h| h == alias));
        if let Some(position) = found {
            let duplicates: Vec<&str> = lowered
                .iter()
                .enumerate()
                .filter(|(_, h)| **h == lowered[position])
                .map(|(i, _)| &headers[i])
                .collect();
            if duplicates.len() > 1 {
                return Err(StatsError::MissingData(format!(
                    "ambiguous {canonical} column: headers {} differ only in case",
                    duplicates.join(", ")
                )));
            }
        }
        match found {
            Some(position) => {
                columns.push(ColumnMapping {
                    canonical: *canonical,
                    source: headers[position].to_string(),
                });
                names[position] = canonical.to_string();
            }
            None if OPTIONAL_COLUMNS.contains(canonical) => {}
            None => missing.push(*canonical),
        }
    }

    if !missing.is_empty() {
        return Err(StatsError::MissingData(format!(
            "required columns absent: {}",
            missing.join(", ")
        )));
    }

    Ok((StringRecord::from(names), columns))
}

impl CsvRow {
    fn into_record(self) -> Result<MatchRecord, String> {
        let season = match self.season {
            Some(value)
                if value.is_finite()
                    && value.fract() == 0.0
                    && value >= f64::from(i32::MIN)
                    && value <= f64::from(i32::MAX) =>
            {
                value as i32
            }
            Some(value) => return Err(format!("season {value} is not a year")),
            None => return Err("season is empty".to_string()),
        };
        let player = self
            .player
            .filter(|p| !p.is_empty())
            .ok_or_else(|| "player is empty".to_string())?;

        let minutes_played = match self.minutes_played {
            Some(value) if !value.is_finite() || value < 0.0 => {
                return Err(format!("minutes played {value} is not a valid duration"))
            }
            other => other,
        };
        let accurate_passes = count(self.accurate_passes, "accurate_passes")?;
        let total_passes = count(self.total_passes, "total_passes")?;
        if let (Some(accurate), Some(total)) = (accurate_passes, total_passes) {
            if accurate > total {
                return Err(format!(
                    "accurate passes {accurate} exceed total passes {total}"
                ));
            }
        }

        let venue = match self.venue.as_deref().filter(|v| !v.is_empty()) {
            Some(raw) => Some(Venue::parse(raw).ok_or_else(|| format!("unknown venue {raw:?}"))?),
            None => None,
        };

        Ok(MatchRecord {
            season,
            player,
            match_id: self.match_id.filter(|m| !m.is_empty()),
            minutes_played,
            goals: count(self.goals, "goals")?,
            shots: count(self.shots, "shots")?,
            accurate_passes,
            total_passes,
            venue,
            home_score: count(self.home_score, "home_score")?,
            away_score: count(self.away_score, "away_score")?,
        })
    }
}

/// Count columns often arrive as floats ("2.0") from spreadsheet exports.
fn count(value: Option<f64>, column: &str) -> Result<Option<u32>, String> {
    match value {
        None => Ok(None),
        Some(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => {
            Ok(Some(v as u32))
        }
        Some(v) => Err(format!("{column} {v} is not a non-negative count")),
    }
}
