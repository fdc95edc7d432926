//! Durable vector backend on SQLite with similarity search via `sqlite-vec`.
//!
//! Documents live in a `documents` table with their metadata serialized as
//! JSON; embeddings live in a parallel `documents_embeddings` table keyed by
//! the same id. Similarity queries join the two through
//! `vec_distance_cosine`, and metadata filters push down as `json_extract`
//! equality clauses.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::Once;

use async_trait::async_trait;
use tokio_rusqlite::types::Value as SqlValue;
use tokio_rusqlite::{Connection, ffi, params_from_iter};
use tracing::info;

use super::{MetadataFilter, StoredDocument, VectorBackend};
use crate::types::{DocMetadata, RagError, RetrievalHit};

/// SQLite-backed vector store. Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct SqliteVectorBackend {
    conn: Connection,
}

impl SqliteVectorBackend {
    /// Opens (or creates) the store at `path` and prepares its schema.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RagError> {
        register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Self::initialize(conn).await
    }

    /// Opens an in-memory store, mainly for tests.
    pub async fn open_in_memory() -> Result<Self, RagError> {
        register_sqlite_vec()?;
        let conn = Connection::open_in_memory()
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Self::initialize(conn).await
    }

    async fn initialize(conn: Connection) -> Result<Self, RagError> {
        conn.call(|conn| {
            // Fails loudly if the sqlite-vec extension did not load.
            conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0))
                .map_err(tokio_rusqlite::Error::Rusqlite)?;
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS documents (
                     id TEXT PRIMARY KEY,
                     content TEXT NOT NULL,
                     metadata TEXT NOT NULL
                 );
                 CREATE TABLE IF NOT EXISTS documents_embeddings (
                     id TEXT PRIMARY KEY,
                     embedding BLOB NOT NULL
                 );",
            )
            .map_err(tokio_rusqlite::Error::Rusqlite)?;
            Ok(())
        })
        .await
        .map_err(|err| RagError::Storage(err.to_string()))?;
        info!("sqlite vector store ready");
        Ok(Self { conn })
    }
}

/// Registers sqlite-vec as an auto extension, once per process.
fn register_sqlite_vec() -> Result<(), RagError> {
    static INIT: Once = Once::new();
    static INIT_RESULT: parking_lot::Mutex<Option<Result<(), String>>> =
        parking_lot::Mutex::new(None);

    INIT.call_once(|| {
        let result = unsafe {
            type SqliteExtensionInit = unsafe extern "C" fn(
                *mut ffi::sqlite3,
                *mut *mut c_char,
                *const ffi::sqlite3_api_routines,
            ) -> i32;

            let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
            let init_fn: SqliteExtensionInit =
                transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
            let rc = ffi::sqlite3_auto_extension(Some(init_fn));
            if rc != 0 {
                Err(format!(
                    "failed to register sqlite-vec extension (code {rc})"
                ))
            } else {
                Ok(())
            }
        };
        *INIT_RESULT.lock() = Some(result);
    });

    match INIT_RESULT.lock().clone() {
        Some(Err(message)) => Err(RagError::Storage(message)),
        _ => Ok(()),
    }
}

/// Translates filter clauses into `json_extract` predicates and bind values.
fn filter_to_sql(filter: &MetadataFilter) -> Result<(String, Vec<SqlValue>), RagError> {
    let mut predicates = Vec::new();
    let mut params = Vec::new();

    for (field, expected) in filter.clauses() {
        if !field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(RagError::Validation(format!(
                "filter field '{field}' is not a plain metadata key"
            )));
        }
        let value = match expected {
            serde_json::Value::String(s) => SqlValue::Text(s.clone()),
            // json_extract yields 1/0 for JSON booleans.
            serde_json::Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    SqlValue::Real(f)
                } else {
                    return Err(RagError::Validation(format!(
                        "filter value for '{field}' is not representable"
                    )));
                }
            }
            other => {
                return Err(RagError::Validation(format!(
                    "filter on '{field}' requires a scalar, got {other}"
                )));
            }
        };
        predicates.push(format!("json_extract(d.metadata, '$.{field}') = ?"));
        params.push(value);
    }

    Ok((predicates.join(" AND "), params))
}

#[async_trait]
impl VectorBackend for SqliteVectorBackend {
    async fn insert(&self, documents: Vec<StoredDocument>) -> Result<(), RagError> {
        if documents.is_empty() {
            return Ok(());
        }

        let mut rows = Vec::with_capacity(documents.len());
        for doc in documents {
            let metadata = serde_json::to_string(&doc.metadata)?;
            let embedding = serde_json::to_string(&doc.embedding)?;
            rows.push((doc.id, doc.content, metadata, embedding));
        }

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(tokio_rusqlite::Error::Rusqlite)?;
                for (id, content, metadata, embedding) in &rows {
                    tx.execute(
                        "INSERT OR REPLACE INTO documents (id, content, metadata) VALUES (?, ?, ?)",
                        [id, content, metadata],
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                    tx.execute(
                        "INSERT OR REPLACE INTO documents_embeddings (id, embedding) \
                         VALUES (?, vec_f32(?))",
                        [id, embedding],
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                }
                tx.commit().map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(())
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<RetrievalHit>, RagError> {
        let embedding_json = serde_json::to_string(query)?;
        let (where_clause, filter_params) = match filter {
            Some(filter) if !filter.is_empty() => {
                let (predicates, params) = filter_to_sql(filter)?;
                (format!("WHERE {predicates}"), params)
            }
            _ => (String::new(), Vec::new()),
        };

        let sql = format!(
            "SELECT d.content, d.metadata, \
             vec_distance_cosine(e.embedding, vec_f32(?)) AS distance \
             FROM documents d \
             JOIN documents_embeddings e ON d.id = e.id \
             {where_clause} \
             ORDER BY distance ASC \
             LIMIT {top_k}"
        );

        let mut params = vec![SqlValue::Text(embedding_json)];
        params.extend(filter_params);

        let rows: Vec<(String, String, f32)> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql).map_err(tokio_rusqlite::Error::Rusqlite)?;
                let mapped = stmt
                    .query_map(params_from_iter(params), |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, f32>(2)?,
                        ))
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let mut results = Vec::new();
                for row in mapped {
                    results.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
                }
                Ok(results)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;

        let mut hits = Vec::with_capacity(rows.len());
        for (content, metadata, distance) in rows {
            let metadata: DocMetadata = serde_json::from_str(&metadata)?;
            hits.push(RetrievalHit {
                document: content,
                metadata,
                distance,
            });
        }
        Ok(hits)
    }

    async fn clear(&self) -> Result<(), RagError> {
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    "DELETE FROM documents_embeddings; DELETE FROM documents;",
                )
                .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(())
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn count(&self) -> Result<usize, RagError> {
        self.conn
            .call(|conn| {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }
}
