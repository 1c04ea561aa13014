//! Persistent store for normalized documents.
//!
//! [`DocumentStore`] is the seam the upsert engine and the validation
//! reporter talk to. [`SqliteStore`] keeps one row per natural key with the
//! full document as a JSON body; bulk writes run inside one transaction with
//! a savepoint per item, so a failing item rolls back alone.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use log::debug;
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use crate::document::{NaturalKey, NormalizedDocument};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("opening store at {path}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("store query failed")]
    Sqlite(#[from] rusqlite::Error),
    #[error("decoding stored document {key}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("field '{0}' cannot be queried")]
    UnknownField(String),
}

/// Replace-with-upsert of one full document under its natural key.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceOne {
    pub key: NaturalKey,
    pub document: NormalizedDocument,
}

impl ReplaceOne {
    pub fn new(document: NormalizedDocument) -> Self {
        Self {
            key: document.natural_key(),
            document,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub index: usize,
    pub key: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkWriteResult {
    /// Keys that did not exist before the write.
    pub upserted_count: usize,
    /// Keys that existed and had their document replaced.
    pub modified_count: usize,
    pub failures: Vec<WriteFailure>,
}

pub trait DocumentStore {
    /// Applies every operation independently; per-item failures are reported
    /// in the result, while connection-level failures abort with an error.
    fn bulk_replace(&mut self, ops: &[ReplaceOne]) -> Result<BulkWriteResult, StoreError>;

    /// Every stored document, in first-insertion order.
    fn find_all(&self) -> Result<Vec<NormalizedDocument>, StoreError>;

    fn count(&self) -> Result<usize, StoreError>;

    /// Number of documents whose year field `field` is non-null.
    fn count_non_null(&self, field: &str) -> Result<usize, StoreError>;

    /// Distinct non-null country values.
    fn distinct_countries(&self) -> Result<Vec<String>, StoreError>;
}

pub struct SqliteStore {
    connection: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let connection = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.display().to_string(),
            source,
        })?;
        connection
            .pragma_update(None, "journal_mode", "WAL")
            .map_err(|source| StoreError::Open {
                path: path.display().to_string(),
                source,
            })?;
        Self::with_connection(connection)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let connection = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: ":memory:".to_string(),
            source,
        })?;
        Self::with_connection(connection)
    }

    fn with_connection(connection: Connection) -> Result<Self, StoreError> {
        connection.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS documents (
              natural_key TEXT PRIMARY KEY,
              country TEXT,
              metric TEXT NOT NULL,
              source_link TEXT,
              body TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS documents_country ON documents(country);
            ",
        )?;
        Ok(Self { connection })
    }

    fn write_one(
        connection: &Connection,
        key: &str,
        document: &NormalizedDocument,
        now: &str,
    ) -> anyhow::Result<bool> {
        let body = serde_json::to_string(document)?;
        let existed = connection
            .query_row(
                "SELECT 1 FROM documents WHERE natural_key = ?1",
                [key],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        connection.execute(
            "INSERT INTO documents(natural_key, country, metric, source_link, body, updated_at)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(natural_key) DO UPDATE SET
               country=excluded.country,
               metric=excluded.metric,
               source_link=excluded.source_link,
               body=excluded.body,
               updated_at=excluded.updated_at",
            params![
                key,
                document.country,
                document.metric,
                document.source_link,
                body,
                now
            ],
        )?;
        Ok(existed)
    }
}

impl DocumentStore for SqliteStore {
    fn bulk_replace(&mut self, ops: &[ReplaceOne]) -> Result<BulkWriteResult, StoreError> {
        let mut result = BulkWriteResult::default();
        if ops.is_empty() {
            return Ok(result);
        }
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut tx = self.connection.transaction()?;
        for (index, op) in ops.iter().enumerate() {
            let key = op.key.encode();
            let savepoint = tx.savepoint()?;
            match Self::write_one(&savepoint, &key, &op.document, &now) {
                Ok(existed) => {
                    savepoint.commit()?;
                    if existed {
                        result.modified_count += 1;
                    } else {
                        result.upserted_count += 1;
                    }
                }
                Err(err) => {
                    // Dropping the savepoint rolls this item back.
                    debug!("Write for {key} failed: {err:#}");
                    result.failures.push(WriteFailure {
                        index,
                        key,
                        message: format!("{err:#}"),
                    });
                }
            }
        }
        tx.commit()?;
        Ok(result)
    }

    fn find_all(&self) -> Result<Vec<NormalizedDocument>, StoreError> {
        let mut statement = self
            .connection
            .prepare("SELECT natural_key, body FROM documents ORDER BY rowid")?;
        let rows = statement.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut documents = Vec::new();
        for row in rows {
            let (key, body) = row?;
            let document = serde_json::from_str(&body)
                .map_err(|source| StoreError::Decode { key, source })?;
            documents.push(document);
        }
        Ok(documents)
    }

    fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .connection
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn count_non_null(&self, field: &str) -> Result<usize, StoreError> {
        if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(StoreError::UnknownField(field.to_string()));
        }
        let path = format!("$.\"{field}\"");
        let count: i64 = self.connection.query_row(
            "SELECT COUNT(*) FROM documents WHERE json_extract(body, ?1) IS NOT NULL",
            [path],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn distinct_countries(&self) -> Result<Vec<String>, StoreError> {
        let mut statement = self.connection.prepare(
            "SELECT DISTINCT country FROM documents
             WHERE country IS NOT NULL AND country <> ''
             ORDER BY country",
        )?;
        let countries = statement
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(countries)
    }
}
