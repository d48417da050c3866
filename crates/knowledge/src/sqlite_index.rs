//! SQLite-backed vector index.
//!
//! Embeddings are stored as little-endian `f32` blobs and searched with a
//! full scan. Source and timestamp are kept in their own columns so the
//! curated listing is a plain indexed query.

use crate::types::{Document, DocumentMetadata, DocumentSource, RetrievedHit};
use crate::vector_index::{cosine_distance, validate_batch, VectorIndex};
use askboard_core::{AppError, AppResult};
use chrono::SecondsFormat;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS index_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    source TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    metadata TEXT NOT NULL,
    embedding BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_source_ts ON documents(source, timestamp);
"#;

pub struct SqliteIndex {
    conn: Mutex<Connection>,
    dimensions: usize,
}

impl SqliteIndex {
    /// Open (or create) the index database at `db_path`.
    ///
    /// Fails with `AppError::Config` when the file was created with a
    /// different embedding dimension.
    pub fn open(db_path: &Path, dimensions: usize) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create index directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

        let index = Self::init(conn, dimensions)?;
        tracing::debug!("Opened SQLite index at {:?} (dim {})", db_path, dimensions);
        Ok(index)
    }

    /// An index that lives only as long as the value.
    pub fn open_in_memory(dimensions: usize) -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;
        Self::init(conn, dimensions)
    }

    fn init(conn: Connection, dimensions: usize) -> AppResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

        let stored: Option<String> = conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = 'dimensions'",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AppError::Knowledge(format!("Failed to read index metadata: {}", e)))?;

        match stored {
            Some(value) if value != dimensions.to_string() => {
                return Err(AppError::Config(format!(
                    "Index was built with embedding dimension {}, configured dimension is {}",
                    value, dimensions
                )));
            }
            Some(_) => {}
            None => {
                conn.execute(
                    "INSERT INTO index_meta (key, value) VALUES ('dimensions', ?1)",
                    params![dimensions.to_string()],
                )
                .map_err(|e| {
                    AppError::Knowledge(format!("Failed to write index metadata: {}", e))
                })?;
            }
        }

        Ok(Self {
            conn: Mutex::new(conn),
            dimensions,
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Knowledge("Index connection lock poisoned".to_string()))
    }
}

impl VectorIndex for SqliteIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn add(
        &self,
        contents: &[String],
        metadatas: Option<&[DocumentMetadata]>,
        embeddings: &[Vec<f32>],
        ids: Option<&[String]>,
    ) -> AppResult<Vec<String>> {
        let ids = validate_batch(self.dimensions, contents, metadatas, embeddings, ids)?;

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Knowledge(format!("Failed to begin transaction: {}", e)))?;

        {
            let mut exists = tx
                .prepare("SELECT 1 FROM documents WHERE id = ?1")
                .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;
            for id in &ids {
                let found = exists
                    .exists(params![id])
                    .map_err(|e| AppError::Knowledge(format!("Failed to check id: {}", e)))?;
                if found {
                    return Err(AppError::Validation(format!("duplicate document id: {}", id)));
                }
            }

            let mut insert = tx
                .prepare(
                    "INSERT INTO documents (id, content, source, timestamp, metadata, embedding)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(|e| AppError::Knowledge(format!("Failed to prepare insert: {}", e)))?;

            for (i, id) in ids.iter().enumerate() {
                let metadata = metadatas
                    .map(|m| m[i].clone())
                    .unwrap_or_default();
                let metadata_json = serde_json::to_string(&metadata)?;

                insert
                    .execute(params![
                        id,
                        contents[i],
                        metadata.source.as_str(),
                        metadata
                            .timestamp
                            .to_rfc3339_opts(SecondsFormat::Micros, true),
                        metadata_json,
                        embedding_to_bytes(&embeddings[i]),
                    ])
                    .map_err(|e| {
                        AppError::Knowledge(format!("Failed to insert document {}: {}", id, e))
                    })?;
            }
        }

        tx.commit()
            .map_err(|e| AppError::Knowledge(format!("Failed to commit documents: {}", e)))?;

        tracing::debug!("Inserted {} documents", ids.len());
        Ok(ids)
    }

    fn query(&self, embedding: &[f32], k: usize) -> AppResult<Vec<RetrievedHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT content, metadata, embedding FROM documents")
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })
            .map_err(|e| AppError::Knowledge(format!("Failed to query documents: {}", e)))?;

        let mut hits = Vec::new();
        for row in rows {
            let (content, metadata_json, blob) =
                row.map_err(|e| AppError::Knowledge(format!("Failed to read document: {}", e)))?;
            let stored = bytes_to_embedding(&blob)?;
            hits.push(RetrievedHit {
                content,
                metadata: serde_json::from_str(&metadata_json)?,
                distance: cosine_distance(embedding, &stored),
            });
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);

        tracing::debug!("Retrieved {} documents (requested top-{})", hits.len(), k);
        Ok(hits)
    }

    fn list_curated(&self, limit: usize) -> AppResult<Vec<Document>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, content, metadata, embedding FROM documents
                 WHERE source IN (?1, ?2)
                 ORDER BY timestamp DESC, rowid DESC
                 LIMIT ?3",
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let [approved, written] = DocumentSource::CURATED;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![approved.as_str(), written.as_str(), limit], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            })
            .map_err(|e| AppError::Knowledge(format!("Failed to list documents: {}", e)))?;

        let mut docs = Vec::new();
        for row in rows {
            let (id, content, metadata_json, blob) =
                row.map_err(|e| AppError::Knowledge(format!("Failed to read document: {}", e)))?;
            docs.push(Document {
                id,
                content,
                metadata: serde_json::from_str(&metadata_json)?,
                embedding: bytes_to_embedding(&blob)?,
            });
        }

        Ok(docs)
    }

    fn count(&self) -> AppResult<usize> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM documents", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n as usize)
        .map_err(|e| AppError::Knowledge(format!("Failed to count documents: {}", e)))
    }

    fn count_curated(&self) -> AppResult<usize> {
        let conn = self.lock()?;
        let [approved, written] = DocumentSource::CURATED;
        conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE source IN (?1, ?2)",
            params![approved.as_str(), written.as_str()],
            |row| row.get::<_, i64>(0),
        )
        .map(|n| n as usize)
        .map_err(|e| AppError::Knowledge(format!("Failed to count documents: {}", e)))
    }

    fn reset(&self) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM documents", [])
            .map_err(|e| AppError::Knowledge(format!("Failed to delete documents: {}", e)))?;

        tracing::info!("Reset vector index");
        Ok(())
    }
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn meta(source: DocumentSource, minutes_ago: i64) -> DocumentMetadata {
        let mut m = DocumentMetadata::new(source, "성능", &[]);
        m.timestamp = Utc::now() - Duration::minutes(minutes_ago);
        m
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_add_and_query_order() {
        let index = SqliteIndex::open_in_memory(3).unwrap();
        let ids = index
            .add(
                &strings(&["x", "y", "xy"]),
                None,
                &[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![1.0, 1.0, 0.0]],
                Some(strings(&["a", "b", "c"]).as_slice()),
            )
            .unwrap();
        assert_eq!(ids, strings(&["a", "b", "c"]));

        let hits = index.query(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "x");
        assert!(hits[0].distance.abs() < 1e-6);
        assert_eq!(hits[1].content, "xy");
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[test]
    fn test_query_empty_index() {
        let index = SqliteIndex::open_in_memory(3).unwrap();
        assert!(index.query(&[1.0, 0.0, 0.0], 4).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected_without_partial_write() {
        let index = SqliteIndex::open_in_memory(2).unwrap();
        index
            .add(&strings(&["one"]), None, &[vec![1.0, 0.0]], Some(strings(&["d1"]).as_slice()))
            .unwrap();

        let err = index
            .add(
                &strings(&["two", "three"]),
                None,
                &[vec![0.0, 1.0], vec![1.0, 1.0]],
                Some(strings(&["d2", "d1"]).as_slice()),
            )
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(index.count().unwrap(), 1);
    }

    #[test]
    fn test_wrong_dimension_rejected() {
        let index = SqliteIndex::open_in_memory(2).unwrap();
        let err = index
            .add(&strings(&["x"]), None, &[vec![1.0, 0.0, 0.0]], None)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(index.count().unwrap(), 0);
    }

    #[test]
    fn test_list_curated_filters_and_sorts() {
        let index = SqliteIndex::open_in_memory(2).unwrap();
        let metas = vec![
            meta(DocumentSource::Seed, 0),
            meta(DocumentSource::AdminApproved, 30),
            meta(DocumentSource::AdminWritten, 10),
            meta(DocumentSource::AdminApproved, 20),
        ];
        index
            .add(
                &strings(&["seed", "old", "newest", "middle"]),
                Some(metas.as_slice()),
                &vec![vec![1.0, 0.0]; 4],
                None,
            )
            .unwrap();

        let curated = index.list_curated(10).unwrap();
        let contents: Vec<&str> = curated.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["newest", "middle", "old"]);
        assert_eq!(curated[0].embedding, vec![1.0, 0.0]);
        assert_eq!(index.count_curated().unwrap(), 3);
        assert_eq!(index.list_curated(1).unwrap().len(), 1);
    }

    #[test]
    fn test_metadata_round_trips() {
        let index = SqliteIndex::open_in_memory(2).unwrap();
        let mut m = meta(DocumentSource::AdminWritten, 0);
        m.tags = strings(&["EPR", "보고"]);
        m.extra.insert("reviewer".to_string(), "kim".to_string());

        index
            .add(&strings(&["doc"]), Some(std::slice::from_ref(&m)), &[vec![0.0, 1.0]], None)
            .unwrap();

        let hit = index.query(&[0.0, 1.0], 1).unwrap().remove(0);
        assert_eq!(hit.metadata, m);
    }

    #[test]
    fn test_reopen_persists_and_checks_dimension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("index.sqlite");

        {
            let index = SqliteIndex::open(&path, 2).unwrap();
            index.add(&strings(&["kept"]), None, &[vec![1.0, 0.0]], None).unwrap();
        }

        let reopened = SqliteIndex::open(&path, 2).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);

        assert!(matches!(
            SqliteIndex::open(&path, 3),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_reset() {
        let index = SqliteIndex::open_in_memory(2).unwrap();
        index.add(&strings(&["x"]), None, &[vec![1.0, 0.0]], None).unwrap();
        index.reset().unwrap();
        assert_eq!(index.count().unwrap(), 0);
    }
}
