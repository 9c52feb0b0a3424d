use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, params};
use serde_json::{Map, Value};

pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";

/// Schemaless named collections inside one named database.
pub trait DocumentStore {
    /// Appends; existing documents are never matched or replaced.
    fn insert_many(&mut self, collection: &str, docs: &[Document]) -> Result<usize>;
    /// Insertion order, each document carrying its `_id`.
    fn find_all(&self, collection: &str) -> Result<Vec<Document>>;
    fn count(&self, collection: &str) -> Result<usize>;
    fn clear(&mut self, collection: &str) -> Result<usize>;
}

pub struct SqliteDocumentStore {
    conn: Connection,
    database: String,
}

impl SqliteDocumentStore {
    pub fn open(path: &Path, database: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open sqlite db {}", path.display()))?;
        Self::with_connection(conn, database)
    }

    pub fn open_in_memory(database: &str) -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        Self::with_connection(conn, database)
    }

    fn with_connection(conn: Connection, database: &str) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn,
            database: database.to_string(),
        })
    }

    pub fn database(&self) -> &str {
        &self.database
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS documents (
            doc_id INTEGER PRIMARY KEY AUTOINCREMENT,
            database TEXT NOT NULL,
            collection TEXT NOT NULL,
            body TEXT NOT NULL,
            inserted_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(database, collection);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

impl DocumentStore for SqliteDocumentStore {
    fn insert_many(&mut self, collection: &str, docs: &[Document]) -> Result<usize> {
        let inserted_at = Utc::now().to_rfc3339();
        let tx = self.conn.transaction().context("begin insert transaction")?;
        for doc in docs {
            let mut body = doc.clone();
            body.remove(ID_FIELD);
            let json = serde_json::to_string(&body).context("serialize document")?;
            tx.execute(
                "INSERT INTO documents(database, collection, body, inserted_at) VALUES (?1, ?2, ?3, ?4)",
                params![self.database, collection, json, inserted_at],
            )
            .with_context(|| format!("insert into {collection}"))?;
        }
        tx.commit().context("commit insert transaction")?;
        Ok(docs.len())
    }

    fn find_all(&self, collection: &str) -> Result<Vec<Document>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT doc_id, body FROM documents
                 WHERE database = ?1 AND collection = ?2
                 ORDER BY doc_id ASC",
            )
            .context("prepare find query")?;
        let rows = stmt
            .query_map(params![self.database, collection], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .context("query documents")?;

        let mut out = Vec::new();
        for row in rows {
            let (id, body) = row.context("decode document row")?;
            let value: Value = serde_json::from_str(&body)
                .with_context(|| format!("invalid document json (id {id})"))?;
            let Value::Object(mut doc) = value else {
                return Err(anyhow!("document {id} is not an object"));
            };
            doc.insert(ID_FIELD.to_string(), Value::from(id));
            out.push(doc);
        }
        Ok(out)
    }

    fn count(&self, collection: &str) -> Result<usize> {
        let n = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM documents WHERE database = ?1 AND collection = ?2",
                params![self.database, collection],
                |row| row.get::<_, i64>(0),
            )
            .context("count documents")?;
        Ok(usize::try_from(n).unwrap_or_default())
    }

    fn clear(&mut self, collection: &str) -> Result<usize> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM documents WHERE database = ?1 AND collection = ?2",
                params![self.database, collection],
            )
            .with_context(|| format!("clear {collection}"))?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn inserts_append_and_ids_are_exposed() {
        let mut store = SqliteDocumentStore::open_in_memory("db").unwrap();
        let docs = vec![doc(json!({"Equipo": "Brasil", "G": 8, "Año": 2002}))];
        store.insert_many("teams", &docs).unwrap();
        store.insert_many("teams", &docs).unwrap();

        let found = store.find_all("teams").unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].get(ID_FIELD), Some(&json!(1)));
        assert_eq!(found[1].get(ID_FIELD), Some(&json!(2)));
        assert_eq!(found[1].get("Equipo"), Some(&json!("Brasil")));
    }

    #[test]
    fn collections_and_databases_are_isolated() {
        let mut store = SqliteDocumentStore::open_in_memory("a").unwrap();
        store
            .insert_many("x", &[doc(json!({"k": 1}))])
            .unwrap();
        assert_eq!(store.count("x").unwrap(), 1);
        assert_eq!(store.count("y").unwrap(), 0);
        assert_eq!(store.clear("x").unwrap(), 1);
        assert_eq!(store.count("x").unwrap(), 0);
    }

    #[test]
    fn open_creates_parent_dirs_and_reports_failures() {
        let root = std::env::temp_dir().join(format!("wc_scorers_store_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);

        let nested = root.join("a").join("b").join("db.sqlite");
        let store = SqliteDocumentStore::open(&nested, "db").unwrap();
        assert_eq!(store.count("x").unwrap(), 0);
        assert!(nested.exists());

        let blocker = root.join("blocker");
        std::fs::write(&blocker, b"not a dir").unwrap();
        let err = SqliteDocumentStore::open(&blocker.join("db.sqlite"), "db")
            .err()
            .expect("parent is a file");
        assert!(format!("{err:#}").contains("create dir"), "{err:#}");

        let _ = std::fs::remove_dir_all(&root);
    }
}
