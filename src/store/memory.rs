//! In-process repository backed by a `HashMap`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::capture::model::{Capture, CaptureArtifact, SourceType};
use crate::error::CollaboratorError;
use crate::store::traits::CaptureRepository;

#[derive(Default)]
pub struct InMemoryRepository {
    artifacts: RwLock<HashMap<String, CaptureArtifact>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.artifacts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.artifacts.read().await.is_empty()
    }
}

#[async_trait]
impl CaptureRepository for InMemoryRepository {
    async fn save(&self, artifact: &CaptureArtifact) -> Result<String, CollaboratorError> {
        let id = artifact.id().to_string();
        self.artifacts
            .write()
            .await
            .insert(id.clone(), artifact.clone());
        Ok(id)
    }

    async fn fetch_by_id(&self, id: &str) -> Result<CaptureArtifact, CollaboratorError> {
        self.artifacts
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound { id: id.to_string() })
    }

    async fn fetch_recent(
        &self,
        source: SourceType,
        limit: usize,
    ) -> Result<Vec<CaptureArtifact>, CollaboratorError> {
        let guard = self.artifacts.read().await;
        let mut matching: Vec<CaptureArtifact> = guard
            .values()
            .filter(|a| a.source_type() == source)
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.timestamp()
                .cmp(&a.timestamp())
                .then_with(|| a.id().cmp(b.id()))
        });
        matching.truncate(limit);
        Ok(matching)
    }
}
