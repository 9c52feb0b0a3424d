use wc_scorers::aggregate::{
    PlayerGoalRecord, TeamGoalSummary, aggregate, player_counts_per_year, summarize_teams,
};
use wc_scorers::error::PipelineError;
use wc_scorers::extract::SeasonTable;

fn season(year: u16, columns: &[&str], rows: &[&[&str]]) -> SeasonTable {
    SeasonTable {
        year,
        columns: columns.iter().map(|s| s.to_string()).collect(),
        rows: rows
            .iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect(),
    }
}

fn record(team: &str, year: u16, goals: Option<i64>) -> PlayerGoalRecord {
    PlayerGoalRecord {
        player: format!("{team} player"),
        team: Some(team.to_string()),
        goals,
        year,
        cells: Vec::new(),
    }
}

fn summary(team: &str, year: u16, total_goals: i64) -> TeamGoalSummary {
    TeamGoalSummary {
        team: team.to_string(),
        year,
        total_goals,
    }
}

#[test]
fn team_totals_sum_per_team_and_year() {
    let records = vec![
        record("A", 2022, Some(3)),
        record("A", 2022, Some(4)),
        record("B", 2022, Some(5)),
    ];
    assert_eq!(
        summarize_teams(&records),
        vec![summary("A", 2022, 7), summary("B", 2022, 5)]
    );
}

#[test]
fn missing_goals_contribute_zero_and_stay_missing() {
    let tables = vec![season(
        2022,
        &["Nombre", "Equipo", "G"],
        &[&["Gakpo", "Países Bajos", "N/A"], &["Depay", "Países Bajos", "0"], &["Weghorst", "Países Bajos", "2"]],
    )];
    let agg = aggregate(&tables).expect("aggregate");
    let goals: Vec<Option<i64>> = agg.players.records.iter().map(|r| r.goals).collect();
    assert_eq!(goals, vec![None, Some(0), Some(2)]);
    assert_eq!(agg.teams, vec![summary("Países Bajos", 2022, 2)]);
}

#[test]
fn goals_column_is_renamed_to_canonical() {
    let tables = vec![season(
        2006,
        &["Jugador", "Equipo", "Goles"],
        &[&["Miroslav Klose", "Alemania", "5"]],
    )];
    let agg = aggregate(&tables).expect("aggregate");
    assert_eq!(agg.players.columns, vec!["Jugador", "Equipo", "G"]);
    let rec = &agg.players.records[0];
    assert_eq!(rec.player, "Miroslav Klose");
    assert_eq!(rec.team.as_deref(), Some("Alemania"));
    assert_eq!(rec.goals, Some(5));
    assert_eq!(rec.year, 2006);
}

#[test]
fn exact_g_preferred_over_goles_in_combined_headers() {
    let tables = vec![season(
        2014,
        &["Jugador", "Equipo", "Goles", "G"],
        &[&["James Rodríguez", "Colombia", "99", "6"]],
    )];
    let agg = aggregate(&tables).expect("aggregate");
    assert_eq!(agg.players.records[0].goals, Some(6));
    assert_eq!(agg.players.columns, vec!["Jugador", "Equipo", "Goles", "G"]);
}

#[test]
fn resolution_runs_on_the_combined_header_set() {
    let tables = vec![
        season(2022, &["Nombre", "Equipo", "G"], &[&["Messi", "Argentina", "7"]]),
        season(2018, &["Nombre", "Equipo", "Goles"], &[&["Kane", "Inglaterra", "6"]]),
    ];
    let agg = aggregate(&tables).expect("aggregate");
    assert_eq!(agg.players.columns, vec!["Nombre", "Equipo", "Goles", "G"]);
    // Ascending year regardless of input order.
    assert_eq!(agg.players.records[0].year, 2018);
    assert_eq!(agg.players.records[0].goals, None);
    assert_eq!(agg.players.records[1].goals, Some(7));
}

#[test]
fn empty_seasons_are_skipped() {
    let tables = vec![
        SeasonTable::empty(2010),
        season(2022, &["Nombre", "Equipo", "G"], &[&["Messi", "Argentina", "7"]]),
        SeasonTable::empty(2014),
    ];
    let agg = aggregate(&tables).expect("aggregate");
    let counts = player_counts_per_year(&agg.players.records);
    assert_eq!(counts.len(), 1);
    assert_eq!(counts.get(&2022), Some(&1));
}

#[test]
fn all_seasons_empty_is_fatal() {
    let tables = vec![SeasonTable::empty(2002), SeasonTable::empty(2006)];
    assert!(matches!(aggregate(&tables), Err(PipelineError::NoSeasonData)));
    assert!(matches!(aggregate(&[]), Err(PipelineError::NoSeasonData)));
}

#[test]
fn no_goal_column_is_fatal() {
    let tables = vec![season(
        2002,
        &["Nombre", "Equipo", "PJ"],
        &[&["Ronaldo", "Brasil", "7"]],
    )];
    match aggregate(&tables) {
        Err(PipelineError::NoGoalsColumn { columns }) => {
            assert_eq!(columns, vec!["Nombre", "Equipo", "PJ"]);
        }
        other => panic!("expected NoGoalsColumn, got {other:?}"),
    }
}

#[test]
fn summaries_order_by_year_then_total_descending() {
    let records = vec![
        record("C", 2006, Some(1)),
        record("A", 2002, Some(2)),
        record("B", 2002, Some(9)),
        record("D", 2002, None),
    ];
    assert_eq!(
        summarize_teams(&records),
        vec![
            summary("B", 2002, 9),
            summary("A", 2002, 2),
            summary("D", 2002, 0),
            summary("C", 2006, 1),
        ]
    );
}

#[test]
fn huge_goal_values_are_missing_and_never_overflow_the_team_sum() {
    let tables = vec![season(
        2022,
        &["Nombre", "Equipo", "G"],
        &[&["a", "X", "1e300"], &["b", "X", "1e300"], &["c", "X", "4"]],
    )];
    let agg = aggregate(&tables).expect("aggregate");
    let goals: Vec<Option<i64>> = agg.players.records.iter().map(|r| r.goals).collect();
    assert_eq!(goals, vec![None, None, Some(4)]);
    assert_eq!(agg.teams, vec![summary("X", 2022, 4)]);
}

#[test]
fn team_sums_saturate_instead_of_overflowing() {
    let records = vec![
        record("X", 2022, Some(i64::MAX)),
        record("X", 2022, Some(i64::MAX)),
    ];
    assert_eq!(summarize_teams(&records), vec![summary("X", 2022, i64::MAX)]);
}

#[test]
fn blank_team_is_its_own_group_and_totals_match_players() {
    let tables = vec![season(
        2022,
        &["Nombre", "Equipo", "G"],
        &[&["a", "", "3"], &["b", "Y", "2"]],
    )];
    let agg = aggregate(&tables).expect("aggregate");
    assert_eq!(agg.teams, vec![summary("", 2022, 3), summary("Y", 2022, 2)]);
    let player_total: i64 = agg.players.records.iter().filter_map(|r| r.goals).sum();
    let team_total: i64 = agg.teams.iter().map(|t| t.total_goals).sum();
    assert_eq!(player_total, team_total);
}

#[test]
fn rows_from_a_season_without_the_team_column_stay_out_of_team_totals() {
    let tables = vec![
        season(2018, &["Nombre", "G"], &[&["Kane", "6"]]),
        season(2022, &["Nombre", "Equipo", "G"], &[&["Messi", "Argentina", "7"]]),
    ];
    let agg = aggregate(&tables).expect("aggregate");
    assert_eq!(agg.players.records.len(), 2);
    assert_eq!(agg.players.records[0].team, None);
    assert_eq!(agg.teams, vec![summary("Argentina", 2022, 7)]);
}
