//! Conversion state machine and the task-creation boundary.
//!
//! Two independent transitions:
//! - brain dumps: captured → processed (one-way)
//! - convertible artifacts: unlinked → linked (terminal; no un-linking here)
//!
//! The pipeline never owns a task. It proposes [`TaskDraft`]s, a
//! [`ConversionSink`] creates the real task, and only the returned id is
//! recorded on the artifact.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capture::emotional::SuggestedPriority;
use crate::capture::model::{Capture, CaptureArtifact, SourceType, TaskLink};
use crate::error::{CaptureError, CollaboratorError};
use crate::pipeline::adaptation::{ActionTime, BreakdownHint};
use crate::pipeline::types::AnnotatedCandidate;

/// Processing lifecycle. Only brain dumps have one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Captured,
    Processed,
}

/// Where an artifact stands on both transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<Lifecycle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<TaskLink>,
}

impl ConversionState {
    pub fn is_linked(&self) -> bool {
        self.link.is_some()
    }
}

/// Read the conversion state of an artifact.
pub fn state_of(artifact: &CaptureArtifact) -> ConversionState {
    let lifecycle = match artifact {
        CaptureArtifact::BrainDump(d) if d.is_processed() => Some(Lifecycle::Processed),
        CaptureArtifact::BrainDump(_) => Some(Lifecycle::Captured),
        _ => None,
    };
    ConversionState {
        lifecycle,
        link: artifact.task_link().cloned(),
    }
}

/// Captured → processed. Idempotent; other variants pass through unchanged.
pub fn mark_processed(artifact: CaptureArtifact) -> CaptureArtifact {
    match artifact {
        CaptureArtifact::BrainDump(d) => CaptureArtifact::BrainDump(d.mark_as_processed()),
        other => other,
    }
}

/// Unlinked → linked, with the task id and timestamp set together.
pub fn link(
    artifact: CaptureArtifact,
    task_id: impl Into<String>,
    at: DateTime<Utc>,
) -> Result<CaptureArtifact, CaptureError> {
    if !artifact.is_convertible() {
        return Err(CaptureError::NotConvertible {
            id: artifact.id().to_string(),
        });
    }
    artifact.link_to_task(task_id, at)
}

// ── Task drafts ─────────────────────────────────────────────────────

/// A proposed task, handed to the task-creation consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub source: SourceType,
    pub source_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub priority: SuggestedPriority,
    pub is_high_priority: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub recommended_action_time: ActionTime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breakdown: Vec<BreakdownHint>,
}

/// Drafts for a candidate.
///
/// Brain dumps yield one draft per extracted line item, or a single draft
/// when no item was found. Other sources yield one draft. Already-linked and
/// non-convertible artifacts yield none.
pub fn task_drafts(candidate: &AnnotatedCandidate) -> Vec<TaskDraft> {
    let artifact = &candidate.artifact;
    if !artifact.is_convertible() || artifact.task_link().is_some() {
        return Vec::new();
    }

    let signals = &candidate.signals;
    let draft = |title: String, description: Option<String>| TaskDraft {
        source: artifact.source_type(),
        source_id: artifact.id().to_string(),
        title,
        description,
        due_date: signals.suggested_due_date,
        priority: candidate.score.priority,
        is_high_priority: candidate.score.is_high_priority,
        tags: signals.tags.clone(),
        recommended_action_time: candidate.adaptation.recommended_action_time,
        breakdown: candidate.adaptation.breakdown.clone(),
    };

    match artifact {
        CaptureArtifact::BrainDump(_) if !signals.line_items.is_empty() => signals
            .line_items
            .iter()
            .map(|item| draft(item.clone(), None))
            .collect(),
        _ => vec![draft(signals.title.clone(), signals.description.clone())],
    }
}

/// Task-creation consumer. Creates a task from a draft and returns its id.
#[async_trait]
pub trait ConversionSink: Send + Sync {
    async fn create_task(&self, draft: &TaskDraft) -> Result<String, CollaboratorError>;
}
