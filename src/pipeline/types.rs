//! Shared types for the capture pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capture::emotional::{ComplexityLevel, EmotionalContext, SuggestedPriority};
use crate::capture::model::{BrainDump, Capture, CaptureArtifact, DriveFile, EmailCapture};
use crate::inference::SuggestionBundle;
use crate::pipeline::adaptation::Adaptation;
use crate::pipeline::extract;
use crate::pipeline::scoring::{self, CandidateScore, RelevanceSignals};

/// Title used when neither the source nor the suggestion offers one.
const UNTITLED: &str = "Untitled capture";

// ── Normalized signals ──────────────────────────────────────────────

/// One decision model for all three capture shapes.
///
/// Built from an artifact (plus an optional suggestion bundle); scoring and
/// adaptation only ever look at this.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateSignals {
    /// Best available task title.
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Clamped confidence or relevance. `None` means no signal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub priority: SuggestedPriority,
    pub complexity: ComplexityLevel,
    pub requires_focus: bool,
    pub is_urgent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_due_date: Option<DateTime<Utc>>,
    pub emotional_context: EmotionalContext,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Drive relevance breakdown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<RelevanceSignals>,
    /// Bullet/numbered lines (brain dumps only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<String>,
    pub word_count: usize,
}

impl CandidateSignals {
    /// Signals of an email. Suggestions are expected to be folded into the
    /// email already (see [`EmailCapture::with_suggestion`]).
    pub fn from_email(email: &EmailCapture) -> Self {
        let title = if email.suggested_title.trim().is_empty() {
            fallback_title(&email.subject)
        } else {
            email.suggested_title.clone()
        };
        Self {
            title,
            description: email.suggested_description.clone(),
            confidence: Some(email.confidence()),
            priority: email.suggested_priority,
            complexity: email.complexity_level,
            requires_focus: email.requires_focus,
            is_urgent: email.is_urgent(),
            suggested_due_date: email.suggested_due_date,
            emotional_context: email.emotional_context.clone(),
            tags: email.suggested_tags.clone(),
            relevance: None,
            line_items: Vec::new(),
            word_count: extract::word_count(&email.body),
        }
    }

    /// Signals of a brain dump, optionally enriched by a suggestion bundle.
    pub fn from_brain_dump(dump: &BrainDump, suggestion: Option<&SuggestionBundle>) -> Self {
        let line_items = dump.extract_tasks();
        let mut tags: Vec<String> = dump.tags().iter().cloned().collect();

        let Some(bundle) = suggestion else {
            let title = line_items
                .first()
                .cloned()
                .unwrap_or_else(|| fallback_title(dump.content()));
            return Self {
                title,
                is_urgent: dump.is_urgent(),
                tags,
                line_items,
                word_count: dump.word_count(),
                ..Default::default()
            };
        };

        for tag in &bundle.tags {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
        let title = if bundle.title.trim().is_empty() {
            line_items
                .first()
                .cloned()
                .unwrap_or_else(|| fallback_title(dump.content()))
        } else {
            bundle.title.clone()
        };

        Self {
            title,
            description: bundle.description.clone(),
            confidence: bundle.confidence.map(scoring::clamp_unit),
            priority: bundle.priority,
            complexity: bundle.complexity_level,
            requires_focus: bundle.requires_focus,
            is_urgent: dump.is_urgent(),
            suggested_due_date: bundle.due_date,
            emotional_context: bundle.emotional_context.clone(),
            tags,
            relevance: None,
            line_items,
            word_count: dump.word_count(),
        }
    }

    /// Signals of a Drive file at its last evaluation.
    pub fn from_drive_file(file: &DriveFile) -> Self {
        let relevance =
            scoring::drive_relevance(file.metadata(), file.task_link().is_some(), file.evaluated_at());
        Self {
            title: file.name().to_string(),
            description: file.metadata().web_view_link.clone(),
            confidence: Some(file.task_relevance_score()),
            relevance: Some(relevance),
            word_count: extract::word_count(file.name()),
            ..Default::default()
        }
    }

    /// Dispatch on the artifact variant.
    ///
    /// For emails the suggestion, when given, is folded in before reading.
    /// Brain dumps fall back to the suggestion stored with them.
    pub fn from_artifact(artifact: &CaptureArtifact, suggestion: Option<&SuggestionBundle>) -> Self {
        match artifact {
            CaptureArtifact::BrainDump(d) => Self::from_brain_dump(d, suggestion.or(d.suggestion())),
            CaptureArtifact::Email(e) => match suggestion {
                Some(bundle) => Self::from_email(&e.clone().with_suggestion(bundle)),
                None => Self::from_email(e),
            },
            CaptureArtifact::Drive(f) => Self::from_drive_file(f),
        }
    }
}

fn fallback_title(text: &str) -> String {
    extract::first_line(text)
        .map(|l| extract::preview(l, 80))
        .unwrap_or_else(|| UNTITLED.to_string())
}

// ── Annotated candidate ─────────────────────────────────────────────

/// A capture that went through scoring and adaptation, ready for conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedCandidate {
    pub artifact: CaptureArtifact,
    pub signals: CandidateSignals,
    pub score: CandidateScore,
    pub adaptation: Adaptation,
    /// Short content preview for list display.
    pub preview: String,
    /// The `now` the candidate was evaluated at.
    pub evaluated_at: DateTime<Utc>,
}

impl AnnotatedCandidate {
    pub fn id(&self) -> &str {
        self.artifact.id()
    }
}
