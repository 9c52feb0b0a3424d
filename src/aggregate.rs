use std::collections::{BTreeMap, HashMap};

use crate::error::PipelineError;
use crate::extract::SeasonTable;

/// Canonical name every goal-count header variant is renamed to.
pub const GOALS_FIELD: &str = "G";
pub const YEAR_FIELD: &str = "Año";
pub const PLAYER_FIELD: &str = "Jugador";
pub const TEAM_FIELD: &str = "Equipo";

const GOALS_EXACT_ALTERNATES: &[&str] = &["Goles", "Goals"];
const GOALS_SUBSTRING: &str = "Gol";
pub(crate) const PLAYER_CANDIDATES: &[&str] = &["Jugador", "Nombre", "Player", "Name"];
pub(crate) const TEAM_CANDIDATES: &[&str] = &["Equipo", "Team"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerGoalRecord {
    pub player: String,
    /// `None` when the season's table had no team cell for this row.
    pub team: Option<String>,
    /// `None` when the source cell could not be read as an integer.
    pub goals: Option<i64>,
    pub year: u16,
    /// Raw source cells aligned with `PlayerGoals::columns`; `None` when the
    /// season's table did not carry that column.
    pub cells: Vec<Option<String>>,
}

/// Flattened player dataset. `columns` is the union of all season headers in
/// first-seen order, with the goal column already renamed to `G`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerGoals {
    pub columns: Vec<String>,
    pub records: Vec<PlayerGoalRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamGoalSummary {
    pub team: String,
    pub year: u16,
    pub total_goals: i64,
}

#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub players: PlayerGoals,
    pub teams: Vec<TeamGoalSummary>,
}

/// `G` first, then `Goles`/`Goals`, then any header containing `Gol`.
pub fn resolve_goals_column(columns: &[String]) -> Option<&str> {
    columns
        .iter()
        .find(|c| c.as_str() == GOALS_FIELD)
        .or_else(|| {
            columns
                .iter()
                .find(|c| GOALS_EXACT_ALTERNATES.contains(&c.as_str()))
        })
        .or_else(|| columns.iter().find(|c| c.contains(GOALS_SUBSTRING)))
        .map(String::as_str)
}

/// Integer parse of the trimmed cell. Anything else is missing, never zero.
pub fn parse_goals(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Some(n);
    }
    // Some pages render whole numbers as "3.0".
    trimmed.parse::<f64>().ok().and_then(whole_number)
}

/// `f` as an integer when it is whole and inside the `i64` range.
pub fn whole_number(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.is_finite() && f.fract() == 0.0 && in_range).then_some(f as i64)
}

pub fn aggregate(tables: &[SeasonTable]) -> Result<Aggregation, PipelineError> {
    let mut seasons: Vec<&SeasonTable> = tables.iter().filter(|t| !t.is_empty()).collect();
    if seasons.is_empty() {
        return Err(PipelineError::NoSeasonData);
    }
    seasons.sort_by_key(|t| t.year);

    let mut source_columns: Vec<String> = Vec::new();
    for table in &seasons {
        for column in &table.columns {
            if !source_columns.contains(column) {
                source_columns.push(column.clone());
            }
        }
    }

    let goals_source = resolve_goals_column(&source_columns)
        .ok_or_else(|| PipelineError::NoGoalsColumn {
            columns: source_columns.clone(),
        })?
        .to_string();
    let player_source = resolve_named(&source_columns, PLAYER_CANDIDATES, &goals_source, 0);
    let team_source = resolve_named(&source_columns, TEAM_CANDIDATES, &goals_source, 1)
        .ok_or_else(|| PipelineError::NoTeamColumn {
            columns: source_columns.clone(),
        })?;

    let columns: Vec<String> = source_columns
        .iter()
        .map(|c| {
            if *c == goals_source {
                GOALS_FIELD.to_string()
            } else {
                c.clone()
            }
        })
        .collect();

    let mut records = Vec::new();
    for table in &seasons {
        let positions: Vec<Option<usize>> = source_columns
            .iter()
            .map(|c| table.column_index(c))
            .collect();
        for row in &table.rows {
            let cells: Vec<Option<String>> = positions
                .iter()
                .map(|pos| pos.and_then(|idx| row.get(idx).cloned()))
                .collect();
            let cell = |name: &str| -> Option<String> {
                let idx = source_columns.iter().position(|c| c == name)?;
                cells.get(idx).cloned().flatten()
            };
            let player = player_source
                .as_deref()
                .and_then(|name| cell(name))
                .unwrap_or_default();
            let team = cell(&team_source);
            let goals = cell(&goals_source).as_deref().and_then(parse_goals);
            records.push(PlayerGoalRecord {
                player,
                team,
                goals,
                year: table.year,
                cells,
            });
        }
    }

    let teams = summarize_teams(&records);
    Ok(Aggregation {
        players: PlayerGoals { columns, records },
        teams,
    })
}

/// Group by (team, year) and sum goals, missing counted as 0. Records with
/// no team cell are left out; an empty team name is its own group. Sums
/// saturate. Ordered by year, then total descending.
pub fn summarize_teams(records: &[PlayerGoalRecord]) -> Vec<TeamGoalSummary> {
    let mut totals: HashMap<(&str, u16), i64> = HashMap::new();
    for record in records {
        let Some(team) = record.team.as_deref() else {
            continue;
        };
        let total = totals.entry((team, record.year)).or_insert(0);
        *total = total.saturating_add(record.goals.unwrap_or(0));
    }

    let mut out: Vec<TeamGoalSummary> = totals
        .into_iter()
        .map(|((team, year), total_goals)| TeamGoalSummary {
            team: team.to_string(),
            year,
            total_goals,
        })
        .collect();
    out.sort_by(|a, b| {
        a.year
            .cmp(&b.year)
            .then(b.total_goals.cmp(&a.total_goals))
            .then_with(|| a.team.cmp(&b.team))
    });
    out
}

pub fn player_counts_per_year(records: &[PlayerGoalRecord]) -> BTreeMap<u16, usize> {
    let mut out = BTreeMap::new();
    for record in records {
        *out.entry(record.year).or_insert(0) += 1;
    }
    out
}

pub fn team_counts_per_year(teams: &[TeamGoalSummary]) -> BTreeMap<u16, usize> {
    let mut out = BTreeMap::new();
    for team in teams {
        *out.entry(team.year).or_insert(0) += 1;
    }
    out
}

/// Known header name if present, else the `fallback`-th non-goal column.
pub(crate) fn resolve_named(
    columns: &[String],
    candidates: &[&str],
    goals_column: &str,
    fallback: usize,
) -> Option<String> {
    if let Some(found) = candidates
        .iter()
        .find_map(|name| columns.iter().find(|c| c.as_str() == *name))
    {
        return Some(found.clone());
    }
    columns
        .iter()
        .filter(|c| c.as_str() != goals_column)
        .nth(fallback)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_g_beats_goles() {
        let columns = cols(&["Jugador", "Equipo", "Goles", "G"]);
        assert_eq!(resolve_goals_column(&columns), Some("G"));
    }

    #[test]
    fn exact_alternate_beats_substring() {
        let columns = cols(&["Gol en contra", "Equipo", "Goals"]);
        assert_eq!(resolve_goals_column(&columns), Some("Goals"));
    }

    #[test]
    fn substring_match_is_case_sensitive() {
        assert_eq!(
            resolve_goals_column(&cols(&["Nombre", "Goleador", "PJ"])),
            Some("Goleador")
        );
        assert_eq!(resolve_goals_column(&cols(&["Nombre", "gol"])), None);
    }

    #[test]
    fn parse_goals_distinguishes_missing_from_zero() {
        assert_eq!(parse_goals("0"), Some(0));
        assert_eq!(parse_goals(" 7 "), Some(7));
        assert_eq!(parse_goals("3.0"), Some(3));
        assert_eq!(parse_goals("N/A"), None);
        assert_eq!(parse_goals(""), None);
        assert_eq!(parse_goals("2.5"), None);
    }

    #[test]
    fn parse_goals_rejects_values_outside_i64() {
        assert_eq!(parse_goals("1e300"), None);
        assert_eq!(parse_goals("-1e300"), None);
        assert_eq!(parse_goals("9223372036854775807"), Some(i64::MAX));
        assert_eq!(parse_goals("9223372036854775808"), None);
    }

    #[test]
    fn fallback_player_and_team_columns_skip_goals() {
        let columns = cols(&["G", "Name X", "Squad"]);
        assert_eq!(
            resolve_named(&columns, PLAYER_CANDIDATES, "G", 0).as_deref(),
            Some("Name X")
        );
        assert_eq!(
            resolve_named(&columns, TEAM_CANDIDATES, "G", 1).as_deref(),
            Some("Squad")
        );
    }
}
