use std::fs;
use std::path::PathBuf;

use serde_json::{Value, json};

use wc_scorers::aggregate::{Aggregation, aggregate};
use wc_scorers::config::PipelineConfig;
use wc_scorers::csv::read_file;
use wc_scorers::error::SinkKind;
use wc_scorers::extract::SeasonTable;
use wc_scorers::publish::{publish, publish_documents, PublishReport};
use wc_scorers::store::{DocumentStore, SqliteDocumentStore};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("wc_scorers_{name}_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

fn sample_aggregation() -> Aggregation {
    let table = SeasonTable {
        year: 2022,
        columns: ["RK", "Nombre", "Equipo", "G"].map(String::from).to_vec(),
        rows: vec![
            ["1", "Kylian Mbappé", "Francia", "8"].map(String::from).to_vec(),
            ["2", "Lionel Messi", "Argentina", "7"].map(String::from).to_vec(),
            ["3", "Olivier Giroud", "Francia", "4"].map(String::from).to_vec(),
            ["4", "Cody Gakpo", "Países Bajos", "N/A"].map(String::from).to_vec(),
        ],
    };
    aggregate(&[table]).expect("aggregate")
}

fn config_in(dir: &PathBuf) -> PipelineConfig {
    PipelineConfig {
        output_dir: dir.clone(),
        ..PipelineConfig::default()
    }
}

#[test]
fn csv_files_keep_source_column_order() {
    let dir = scratch_dir("csv_order");
    let cfg = config_in(&dir);
    let report = publish(&cfg, &sample_aggregation(), None);
    assert!(report.is_success(), "{:?}", report.failures);

    let players = read_file(&cfg.player_csv_path()).expect("player csv");
    assert_eq!(players.headers, vec!["RK", "Nombre", "Equipo", "G", "Año"]);
    assert_eq!(players.rows.len(), 4);
    assert_eq!(players.rows[0], vec!["1", "Kylian Mbappé", "Francia", "8", "2022"]);
    // Missing goal value is written empty, never as 0.
    assert_eq!(players.rows[3][3], "");

    let teams = read_file(&cfg.team_csv_path()).expect("team csv");
    assert_eq!(teams.headers, vec!["Equipo", "Año", "G"]);
    assert_eq!(
        teams.rows,
        vec![
            vec!["Francia", "2022", "12"],
            vec!["Argentina", "2022", "7"],
            vec!["Países Bajos", "2022", "0"],
        ]
    );
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn documents_store_missing_goals_as_null() {
    let mut store = SqliteDocumentStore::open_in_memory("LasEstadisticasMundial").expect("store");
    let cfg = PipelineConfig::default();
    let mut report = PublishReport::default();
    publish_documents(&cfg, &sample_aggregation(), &mut store, &mut report);
    assert!(report.is_success());

    let players = store.find_all("goleadores_mundiales").expect("players");
    assert_eq!(players.len(), 4);
    assert_eq!(players[0].get("Jugador"), Some(&json!("Kylian Mbappé")));
    assert_eq!(players[0].get("Año"), Some(&json!(2022)));
    assert_eq!(players[3].get("G"), Some(&Value::Null));

    let teams = store.find_all("goles_por_equipo").expect("teams");
    let zero = teams
        .iter()
        .find(|d| d.get("Equipo") == Some(&json!("Países Bajos")))
        .expect("team row");
    assert_eq!(zero.get("G"), Some(&json!(0)));
}

#[test]
fn republishing_without_clearing_duplicates_documents() {
    let mut store = SqliteDocumentStore::open_in_memory("LasEstadisticasMundial").expect("store");
    let cfg = PipelineConfig::default();
    let agg = sample_aggregation();

    for _ in 0..2 {
        let mut report = PublishReport::default();
        publish_documents(&cfg, &agg, &mut store, &mut report);
        assert!(report.is_success());
    }
    assert_eq!(store.count("goleadores_mundiales").unwrap(), 8);
    assert_eq!(store.count("goles_por_equipo").unwrap(), 6);
}

#[test]
fn clearing_first_replaces_documents() {
    let mut store = SqliteDocumentStore::open_in_memory("LasEstadisticasMundial").expect("store");
    let cfg = PipelineConfig {
        clear_before_publish: true,
        ..PipelineConfig::default()
    };
    let agg = sample_aggregation();
    for _ in 0..2 {
        let mut report = PublishReport::default();
        publish_documents(&cfg, &agg, &mut store, &mut report);
    }
    assert_eq!(store.count("goleadores_mundiales").unwrap(), 4);
    assert_eq!(store.count("goles_por_equipo").unwrap(), 3);
}

#[test]
fn csv_failure_is_reported_and_documents_still_written() {
    let dir = scratch_dir("csv_failure");
    let blocker = dir.join("not_a_dir");
    fs::write(&blocker, "x").expect("write blocker");
    let cfg = config_in(&blocker);

    let mut store = SqliteDocumentStore::open_in_memory("LasEstadisticasMundial").expect("store");
    let report = publish(&cfg, &sample_aggregation(), Some(&mut store));

    assert!(!report.is_success());
    assert_eq!(report.failures.len(), 2);
    assert!(report.failures.iter().all(|f| f.sink == SinkKind::Csv));
    let failed: Vec<&str> = report.failures.iter().map(|f| f.dataset.as_str()).collect();
    assert_eq!(failed, vec!["goleadores_mundiales", "goles_por_equipo"]);
    assert!(report.failures[0].to_string().starts_with("csv sink failed writing goleadores_mundiales"));

    assert_eq!(store.count("goleadores_mundiales").unwrap(), 4);
    assert!(report
        .writes
        .iter()
        .all(|w| w.sink == SinkKind::Documents));
    let _ = fs::remove_dir_all(&dir);
}
