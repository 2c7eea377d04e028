//! libSQL capture repository.
//!
//! One `captures` row per artifact: the artifact is stored as its tagged JSON
//! form, with source, timestamp and task link pulled out into columns for
//! querying. Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::capture::model::{Capture, CaptureArtifact, SourceType};
use crate::error::{CollaboratorError, DatabaseError};
use crate::store::migrations;
use crate::store::traits::CaptureRepository;

/// libSQL-backed [`CaptureRepository`].
///
/// Holds a single connection reused for all operations.
pub struct LibSqlRepository {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlRepository {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;
        let repo = Self::from_database(db).await?;
        info!(path = %path.display(), "Capture store opened");
        Ok(repo)
    }

    /// Create an in-memory database.
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to create in-memory database: {e}")))?;
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

    /// Artifacts linked to a task id, newest first.
    pub async fn fetch_by_task_id(&self, task_id: &str) -> Result<Vec<CaptureArtifact>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT payload FROM captures WHERE linked_task_id = ?1
                 ORDER BY captured_at DESC, id ASC",
                params![task_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("fetch_by_task_id: {e}")))?;
        collect_payloads(&mut rows).await
    }

    async fn upsert(&self, artifact: &CaptureArtifact) -> Result<(), DatabaseError> {
        let payload = serde_json::to_string(artifact)
            .map_err(|e| DatabaseError::Serialization(format!("encode {}: {e}", artifact.id())))?;
        let now = format_timestamp(Utc::now());

        self.conn
            .execute(
                "INSERT INTO captures (id, source, payload, captured_at, updated_at, linked_task_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    source = excluded.source,
                    payload = excluded.payload,
                    captured_at = excluded.captured_at,
                    updated_at = excluded.updated_at,
                    linked_task_id = excluded.linked_task_id",
                params![
                    artifact.id(),
                    artifact.source_type().as_str(),
                    payload,
                    format_timestamp(artifact.timestamp()),
                    now,
                    artifact.linked_task_id().map(str::to_string)
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save capture: {e}")))?;
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<CaptureArtifact>, DatabaseError> {
        let mut rows = self
            .conn
            .query("SELECT payload FROM captures WHERE id = ?1", params![id])
            .await
            .map_err(|e| DatabaseError::Query(format!("fetch capture: {e}")))?;
        Ok(collect_payloads(&mut rows).await?.into_iter().next())
    }

    async fn recent(&self, source: SourceType, limit: usize) -> Result<Vec<CaptureArtifact>, DatabaseError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut rows = self
            .conn
            .query(
                "SELECT payload FROM captures WHERE source = ?1
                 ORDER BY captured_at DESC, id ASC LIMIT ?2",
                params![source.as_str(), limit],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("fetch recent captures: {e}")))?;
        collect_payloads(&mut rows).await
    }
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

async fn collect_payloads(rows: &mut libsql::Rows) -> Result<Vec<CaptureArtifact>, DatabaseError> {
    let mut artifacts = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Query(format!("read capture row: {e}")))?
    {
        let payload: String = row
            .get(0)
            .map_err(|e| DatabaseError::Query(format!("read payload column: {e}")))?;
        let artifact = serde_json::from_str(&payload)
            .map_err(|e| DatabaseError::Serialization(format!("decode capture: {e}")))?;
        artifacts.push(artifact);
    }
    Ok(artifacts)
}

#[async_trait]
impl CaptureRepository for LibSqlRepository {
    async fn save(&self, artifact: &CaptureArtifact) -> Result<String, CollaboratorError> {
        self.upsert(artifact).await?;
        debug!(id = %artifact.id(), source = %artifact.source_type(), "Capture saved");
        Ok(artifact.id().to_string())
    }

    async fn fetch_by_id(&self, id: &str) -> Result<CaptureArtifact, CollaboratorError> {
        self.load(id)
            .await?
            .ok_or_else(|| CollaboratorError::NotFound { id: id.to_string() })
    }

    async fn fetch_recent(
        &self,
        source: SourceType,
        limit: usize,
    ) -> Result<Vec<CaptureArtifact>, CollaboratorError> {
        Ok(self.recent(source, limit).await?)
    }
}
