use anyhow::anyhow;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::aggregate::{
    Aggregation, GOALS_FIELD, PLAYER_FIELD, PlayerGoalRecord, TEAM_FIELD, TeamGoalSummary,
    YEAR_FIELD,
};
use crate::config::{PLAYER_DATASET, PipelineConfig, TEAM_DATASET};
use crate::csv::{player_rows, team_rows, write_file};
use crate::error::{PublishError, SinkKind};
use crate::export::write_workbook;
use crate::store::{Document, DocumentStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkWrite {
    pub sink: SinkKind,
    pub dataset: String,
    pub rows: usize,
}

#[derive(Debug, Default)]
pub struct PublishReport {
    pub writes: Vec<SinkWrite>,
    pub failures: Vec<PublishError>,
}

impl PublishReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, sink: SinkKind, dataset: &str, result: anyhow::Result<usize>) {
        match result {
            Ok(rows) => {
                info!(%sink, dataset, rows, "dataset published");
                self.writes.push(SinkWrite {
                    sink,
                    dataset: dataset.to_string(),
                    rows,
                });
            }
            Err(source) => {
                error!(%sink, dataset, "publish failed: {source:#}");
                self.failures.push(PublishError {
                    sink,
                    dataset: dataset.to_string(),
                    source,
                });
            }
        }
    }
}

pub fn player_document(record: &PlayerGoalRecord) -> Document {
    let mut doc = Document::new();
    doc.insert(PLAYER_FIELD.to_string(), Value::from(record.player.clone()));
    doc.insert(TEAM_FIELD.to_string(), Value::from(record.team.clone()));
    doc.insert(GOALS_FIELD.to_string(), goals_value(record.goals));
    doc.insert(YEAR_FIELD.to_string(), json!(record.year));
    doc
}

pub fn team_document(summary: &TeamGoalSummary) -> Document {
    let mut doc = Document::new();
    doc.insert(TEAM_FIELD.to_string(), Value::from(summary.team.clone()));
    doc.insert(GOALS_FIELD.to_string(), json!(summary.total_goals));
    doc.insert(YEAR_FIELD.to_string(), json!(summary.year));
    doc
}

/// Missing goals are stored as `null`, distinct from an explicit `0`.
pub fn goals_value(goals: Option<i64>) -> Value {
    goals.map(Value::from).unwrap_or(Value::Null)
}

/// Flat-file sink: one CSV per dataset, plus the workbook when enabled.
pub fn publish_files(cfg: &PipelineConfig, agg: &Aggregation, report: &mut PublishReport) {
    report.record(
        SinkKind::Csv,
        PLAYER_DATASET,
        write_file(&cfg.player_csv_path(), &player_rows(&agg.players)),
    );
    report.record(
        SinkKind::Csv,
        TEAM_DATASET,
        write_file(&cfg.team_csv_path(), &team_rows(&agg.teams)),
    );
    if cfg.write_xlsx {
        let rows = agg.players.records.len() + agg.teams.len();
        report.record(
            SinkKind::Xlsx,
            "workbook",
            write_workbook(&cfg.xlsx_path(), agg).map(|_| rows),
        );
    }
}

/// Document sink. Appends unless `cfg.clear_before_publish` is set, so
/// publishing the same run twice duplicates every document.
pub fn publish_documents(
    cfg: &PipelineConfig,
    agg: &Aggregation,
    store: &mut dyn DocumentStore,
    report: &mut PublishReport,
) {
    let players: Vec<Document> = agg.players.records.iter().map(player_document).collect();
    let teams: Vec<Document> = agg.teams.iter().map(team_document).collect();

    for (collection, docs) in [
        (cfg.player_collection.as_str(), &players),
        (cfg.team_collection.as_str(), &teams),
    ] {
        let result = replace_or_append(store, collection, docs, cfg.clear_before_publish);
        report.record(SinkKind::Documents, collection, result);
    }
}

fn replace_or_append(
    store: &mut dyn DocumentStore,
    collection: &str,
    docs: &[Document],
    clear: bool,
) -> anyhow::Result<usize> {
    if clear {
        let removed = store
            .clear(collection)
            .map_err(|err| anyhow!("clear {collection}: {err:#}"))?;
        info!(collection, removed, "collection cleared");
    }
    store.insert_many(collection, docs)
}

/// Both sinks, independently. A failure on one never undoes the other.
pub fn publish(
    cfg: &PipelineConfig,
    agg: &Aggregation,
    store: Option<&mut dyn DocumentStore>,
) -> PublishReport {
    let mut report = PublishReport::default();
    publish_files(cfg, agg, &mut report);
    if let Some(store) = store {
        publish_documents(cfg, agg, store, &mut report);
    }
    report
}
