//! `CaptureRepository`: the persistence contract the pipeline consumes.

use async_trait::async_trait;

use crate::capture::model::{CaptureArtifact, SourceType};
use crate::error::CollaboratorError;

/// Backend-agnostic capture persistence.
///
/// Errors are propagated to the caller unchanged; implementations do not retry.
#[async_trait]
pub trait CaptureRepository: Send + Sync {
    /// Insert or replace an artifact. Returns its id.
    async fn save(&self, artifact: &CaptureArtifact) -> Result<String, CollaboratorError>;

    /// Load one artifact, or `CollaboratorError::NotFound`.
    async fn fetch_by_id(&self, id: &str) -> Result<CaptureArtifact, CollaboratorError>;

    /// Up to `limit` artifacts of one source, newest timestamp first.
    async fn fetch_recent(
        &self,
        source: SourceType,
        limit: usize,
    ) -> Result<Vec<CaptureArtifact>, CollaboratorError>;
}
