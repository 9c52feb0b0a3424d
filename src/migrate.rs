use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tracing::info;

use crate::aggregate::{
    GOALS_FIELD, PLAYER_CANDIDATES, PLAYER_FIELD, TEAM_CANDIDATES, TEAM_FIELD, YEAR_FIELD,
    parse_goals, resolve_named,
};
use crate::csv::{CsvTable, read_file};
use crate::publish::goals_value;
use crate::store::{Document, DocumentStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sheet {
    Players,
    Teams,
}

fn cell(row: &[String], column: Option<usize>) -> Option<&str> {
    column.and_then(|idx| row.get(idx)).map(String::as_str)
}

fn year_value(raw: Option<&str>) -> Value {
    raw.and_then(|v| v.trim().parse::<u16>().ok())
        .map(Value::from)
        .unwrap_or(Value::Null)
}

fn text_value(raw: Option<&str>) -> Value {
    raw.map(|v| Value::from(v.to_string())).unwrap_or(Value::Null)
}

/// Maps a published CSV onto the fixed document shape of its collection.
pub fn documents_from_csv(table: &CsvTable, sheet: Sheet) -> Result<Vec<Document>> {
    let goals = table.column(GOALS_FIELD);
    let year = table.column(YEAR_FIELD);
    if goals.is_none() || year.is_none() {
        return Err(anyhow!(
            "csv lacks {GOALS_FIELD}/{YEAR_FIELD} columns: {:?}",
            table.headers
        ));
    }

    let (player, team) = match sheet {
        Sheet::Players => {
            let player = resolve_named(&table.headers, PLAYER_CANDIDATES, GOALS_FIELD, 0)
                .and_then(|name| table.column(&name));
            let team = resolve_named(&table.headers, TEAM_CANDIDATES, GOALS_FIELD, 1)
                .and_then(|name| table.column(&name));
            (player, team)
        }
        Sheet::Teams => (None, table.column(TEAM_FIELD)),
    };

    let mut out = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let mut doc = Document::new();
        if sheet == Sheet::Players {
            doc.insert(PLAYER_FIELD.to_string(), text_value(cell(row, player)));
        }
        doc.insert(TEAM_FIELD.to_string(), text_value(cell(row, team)));
        doc.insert(
            GOALS_FIELD.to_string(),
            goals_value(cell(row, goals).and_then(parse_goals)),
        );
        doc.insert(YEAR_FIELD.to_string(), year_value(cell(row, year)));
        out.push(doc);
    }
    Ok(out)
}

/// One-shot copy of a CSV file into a collection. Appends.
pub fn migrate_csv(
    store: &mut dyn DocumentStore,
    path: &Path,
    collection: &str,
    sheet: Sheet,
) -> Result<usize> {
    let table = read_file(path)?;
    let docs = documents_from_csv(&table, sheet)
        .with_context(|| format!("map {} to documents", path.display()))?;
    let inserted = store
        .insert_many(collection, &docs)
        .with_context(|| format!("insert into {collection}"))?;
    info!(collection, inserted, file = %path.display(), "csv migrated");
    Ok(inserted)
}
