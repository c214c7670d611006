//! libSQL backend: local, file-backed signal store.
//!
//! Used when no remote endpoint is configured. Supports local file and
//! in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::signal::Signal;
use crate::store::migrations;
use crate::store::traits::{SignalRow, SignalStore};

/// libSQL signal store.
///
/// Holds a single connection reused for all inserts.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Signal database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;

        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }
}

/// Convert `Option<String>` to libsql Value.
fn opt_text_owned(s: Option<String>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s),
        None => libsql::Value::Null,
    }
}

#[async_trait]
impl SignalStore for LibSqlStore {
    fn backend(&self) -> &'static str {
        "libsql"
    }

    async fn insert_signal(&self, signal: &Signal) -> Result<(), DatabaseError> {
        let row = SignalRow::from(signal);
        let id = Uuid::new_v4();

        self.conn
            .execute(
                "INSERT INTO signals (id, source, source_label, symbol, action, price, message, raw_text, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id.to_string(),
                    row.source,
                    row.source_label,
                    row.symbol,
                    row.action,
                    row.price,
                    opt_text_owned(row.message),
                    opt_text_owned(row.raw_text),
                    row.created_at,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_signal: {e}")))?;

        debug!(signal_id = %id, symbol = signal.symbol(), "Signal inserted into DB");
        Ok(())
    }
}
