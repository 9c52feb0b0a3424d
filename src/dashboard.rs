use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

use serde_json::Value;
use tracing::{info, warn};

use crate::aggregate::{
    GOALS_FIELD, PLAYER_FIELD, TEAM_FIELD, YEAR_FIELD, parse_goals, whole_number,
};
use crate::config::PipelineConfig;
use crate::store::{Document, DocumentStore, ID_FIELD, SqliteDocumentStore};

pub const TEAM_PAGE_SIZE: usize = 10;
pub const PLAYER_PAGE_SIZE: usize = 12;
const TOP_TEAMS: usize = 10;
const SHARE_SLICES: usize = 8;
const TOP_SCORERS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRow {
    pub team: String,
    pub year: u16,
    pub goals: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRow {
    pub player: String,
    pub team: String,
    pub year: u16,
    pub goals: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    Store,
    /// Store unreachable; built-in sample data.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TeamViewMode {
    #[default]
    Top10,
    All,
}

impl TeamViewMode {
    pub fn toggle(self) -> Self {
        match self {
            TeamViewMode::Top10 => TeamViewMode::All,
            TeamViewMode::All => TeamViewMode::Top10,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TeamViewMode::Top10 => "Top 10",
            TeamViewMode::All => "Todos",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub bars: Vec<(String, i64)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    pub page: usize,
    pub pages: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metrics {
    pub total_goals: i64,
    pub teams: usize,
    pub players: usize,
    pub top_team: Option<(String, i64)>,
    pub top_scorer: Option<(String, String, i64)>,
    pub goals_per_team: f64,
}

/// Read-only view over the two published collections.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub teams: Vec<TeamRow>,
    pub players: Vec<PlayerRow>,
    pub source: SnapshotSource,
}

impl Snapshot {
    pub fn from_documents(teams: &[Document], players: &[Document]) -> Self {
        Self {
            teams: teams.iter().filter_map(team_row).collect(),
            players: players.iter().filter_map(player_row).collect(),
            source: SnapshotSource::Store,
        }
    }

    pub fn fallback() -> Self {
        let teams = [
            ("Brasil", 8),
            ("Alemania", 7),
            ("Argentina", 6),
            ("España", 5),
            ("Francia", 4),
        ]
        .into_iter()
        .map(|(team, goals)| TeamRow {
            team: team.to_string(),
            year: 2022,
            goals: Some(goals),
        })
        .collect();
        let players = [
            ("Messi", "Argentina", 7),
            ("Mbappé", "Francia", 8),
            ("Giroud", "Francia", 4),
            ("Álvarez", "Argentina", 4),
            ("Gakpo", "Países Bajos", 3),
        ]
        .into_iter()
        .map(|(player, team, goals)| PlayerRow {
            player: player.to_string(),
            team: team.to_string(),
            year: 2022,
            goals: Some(goals),
        })
        .collect();
        Self {
            teams,
            players,
            source: SnapshotSource::Fallback,
        }
    }

    pub fn team_years(&self) -> Vec<u16> {
        self.teams
            .iter()
            .map(|t| t.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn player_years(&self) -> Vec<u16> {
        self.players
            .iter()
            .map(|p| p.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Teams of one tournament by goals, descending; top 10 or all.
    pub fn team_view(&self, year: u16, mode: TeamViewMode) -> Vec<TeamRow> {
        let mut rows: Vec<TeamRow> = self
            .teams
            .iter()
            .filter(|t| t.year == year)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.goals
                .unwrap_or(0)
                .cmp(&a.goals.unwrap_or(0))
                .then_with(|| a.team.cmp(&b.team))
        });
        if mode == TeamViewMode::Top10 {
            rows.truncate(TOP_TEAMS);
        }
        rows
    }

    /// Players of one tournament whose goals fall in `range`, descending.
    /// Rows with missing goals never match a range.
    pub fn player_view(&self, year: u16, range: RangeInclusive<i64>) -> Vec<PlayerRow> {
        let mut rows: Vec<PlayerRow> = self
            .players
            .iter()
            .filter(|p| p.year == year)
            .filter(|p| p.goals.is_some_and(|g| range.contains(&g)))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.goals
                .cmp(&a.goals)
                .then_with(|| a.player.cmp(&b.player))
        });
        rows
    }

    /// Bounds for the goals filter: 0 up to the highest tally in the dataset.
    pub fn goals_extent(&self) -> RangeInclusive<i64> {
        let max = self
            .players
            .iter()
            .filter_map(|p| p.goals)
            .max()
            .unwrap_or(0)
            .max(0);
        0..=max
    }

    pub fn metrics(&self, year: u16) -> Metrics {
        let teams: Vec<&TeamRow> = self.teams.iter().filter(|t| t.year == year).collect();
        let players: Vec<&PlayerRow> = self.players.iter().filter(|p| p.year == year).collect();
        let total_goals = teams
            .iter()
            .filter_map(|t| t.goals)
            .fold(0i64, i64::saturating_add);
        let top_team = teams
            .iter()
            .filter_map(|t| t.goals.map(|g| (t.team.clone(), g)))
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)));
        let top_scorer = players
            .iter()
            .filter_map(|p| p.goals.map(|g| (p.player.clone(), p.team.clone(), g)))
            .max_by(|a, b| a.2.cmp(&b.2).then_with(|| b.0.cmp(&a.0)));
        let goals_per_team = if teams.is_empty() {
            0.0
        } else {
            total_goals as f64 / teams.len() as f64
        };
        Metrics {
            total_goals,
            teams: teams.len(),
            players: players.len(),
            top_team,
            top_scorer,
            goals_per_team,
        }
    }

    pub fn team_chart(&self, year: u16, mode: TeamViewMode) -> ChartSpec {
        ChartSpec {
            title: format!("Goles por Equipo - Mundial {year}"),
            bars: self
                .team_view(year, mode)
                .into_iter()
                .map(|t| (t.team, t.goals.unwrap_or(0)))
                .collect(),
        }
    }

    pub fn team_share_chart(&self, year: u16, mode: TeamViewMode) -> ChartSpec {
        let mut chart = self.team_chart(year, mode);
        chart.title = "Distribución de Goles".to_string();
        chart.bars.truncate(SHARE_SLICES);
        chart
    }

    /// Total goals per tournament across every year in the snapshot.
    pub fn goals_trend_chart(&self) -> ChartSpec {
        let mut per_year: BTreeMap<u16, i64> = BTreeMap::new();
        for team in &self.teams {
            let total = per_year.entry(team.year).or_insert(0);
            *total = total.saturating_add(team.goals.unwrap_or(0));
        }
        ChartSpec {
            title: "Tendencia Total de Goles".to_string(),
            bars: per_year
                .into_iter()
                .map(|(year, goals)| (year.to_string(), goals))
                .collect(),
        }
    }

    /// Team × year goal matrix, absent cells as 0.
    pub fn team_year_matrix(&self) -> (Vec<u16>, Vec<(String, Vec<i64>)>) {
        let years = self.team_years();
        let mut by_team: BTreeMap<&str, BTreeMap<u16, i64>> = BTreeMap::new();
        for team in &self.teams {
            let cell = by_team
                .entry(team.team.as_str())
                .or_default()
                .entry(team.year)
                .or_insert(0);
            *cell = cell.saturating_add(team.goals.unwrap_or(0));
        }
        let rows = by_team
            .into_iter()
            .map(|(team, cells)| {
                let values = years
                    .iter()
                    .map(|y| cells.get(y).copied().unwrap_or(0))
                    .collect();
                (team.to_string(), values)
            })
            .collect();
        (years, rows)
    }

    pub fn scorers_chart(&self, year: u16, range: RangeInclusive<i64>) -> ChartSpec {
        ChartSpec {
            title: format!("Top Goleadores - Mundial {year}"),
            bars: self
                .player_view(year, range)
                .into_iter()
                .take(TOP_SCORERS)
                .map(|p| (p.player, p.goals.unwrap_or(0)))
                .collect(),
        }
    }

    /// Goals per country among the filtered scorers.
    pub fn scorers_by_team_chart(&self, year: u16, range: RangeInclusive<i64>) -> ChartSpec {
        let mut per_team: BTreeMap<String, i64> = BTreeMap::new();
        for p in self.player_view(year, range) {
            let total = per_team.entry(p.team).or_insert(0);
            *total = total.saturating_add(p.goals.unwrap_or(0));
        }
        let mut bars: Vec<(String, i64)> = per_team.into_iter().collect();
        bars.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ChartSpec {
            title: "Goles por País".to_string(),
            bars,
        }
    }
}

pub fn paginate<T>(items: &[T], page: usize, size: usize) -> Page<'_, T> {
    let size = size.max(1);
    let total = items.len();
    let pages = total.div_ceil(size).max(1);
    let page = page.min(pages - 1);
    let start = (page * size).min(total);
    let end = (start + size).min(total);
    Page {
        items: &items[start..end],
        page,
        pages,
        total,
    }
}

/// A store error, or a store with nothing usable in either collection,
/// degrades to the built-in sample.
pub fn load_snapshot(store: &dyn DocumentStore, cfg: &PipelineConfig) -> Snapshot {
    let loaded = store.find_all(&cfg.team_collection).and_then(|teams| {
        store
            .find_all(&cfg.player_collection)
            .map(|players| (teams, players))
    });
    match loaded {
        Ok((teams, players)) => {
            let snapshot = Snapshot::from_documents(&teams, &players);
            if snapshot.teams.is_empty() || snapshot.players.is_empty() {
                warn!(
                    teams = snapshot.teams.len(),
                    players = snapshot.players.len(),
                    "document store has no usable data, using sample data"
                );
                return Snapshot::fallback();
            }
            info!(
                teams = snapshot.teams.len(),
                players = snapshot.players.len(),
                "snapshot loaded from store"
            );
            snapshot
        }
        Err(err) => {
            warn!("document store unavailable, using sample data: {err:#}");
            Snapshot::fallback()
        }
    }
}

pub fn load_snapshot_from_config(cfg: &PipelineConfig) -> Snapshot {
    match SqliteDocumentStore::open(&cfg.db_path, &cfg.database) {
        Ok(store) => load_snapshot(&store, cfg),
        Err(err) => {
            warn!("document store unavailable, using sample data: {err:#}");
            Snapshot::fallback()
        }
    }
}

fn strip_id(doc: &Document) -> Document {
    let mut doc = doc.clone();
    doc.remove(ID_FIELD);
    doc
}

fn number_field(doc: &Document, key: &str) -> Option<i64> {
    match doc.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_number)),
        Value::String(s) => parse_goals(s),
        _ => None,
    }
}

fn text_field(doc: &Document, key: &str) -> String {
    match doc.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn year_field(doc: &Document) -> Option<u16> {
    number_field(doc, YEAR_FIELD).and_then(|y| u16::try_from(y).ok())
}

fn team_row(doc: &Document) -> Option<TeamRow> {
    let doc = strip_id(doc);
    Some(TeamRow {
        team: text_field(&doc, TEAM_FIELD),
        year: year_field(&doc)?,
        goals: number_field(&doc, GOALS_FIELD),
    })
}

fn player_row(doc: &Document) -> Option<PlayerRow> {
    let doc = strip_id(doc);
    Some(PlayerRow {
        player: text_field(&doc, PLAYER_FIELD),
        team: text_field(&doc, TEAM_FIELD),
        year: year_field(&doc)?,
        goals: number_field(&doc, GOALS_FIELD),
    })
}
