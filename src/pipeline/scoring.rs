//! Scoring engine: bounded relevance/confidence scores and discrete
//! priority/complexity classification.
//!
//! Drive files get an additive relevance score. Emails and brain dumps carry
//! an externally suggested priority that is escalated when any single strong
//! signal fires. Everything here is a pure function of its arguments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capture::emotional::{ComplexityLevel, EmotionalContext, SuggestedPriority};
use crate::capture::model::DriveFileMetadata;
use crate::config::PipelineConfig;
use crate::pipeline::extract;
use crate::pipeline::types::CandidateSignals;

// Weights are kept in hundredths so sums and threshold checks are exact.
const KEYWORD_POINTS: u32 = 30;
const WORKSPACE_DOC_POINTS: u32 = 20;
const PLAIN_TEXT_POINTS: u32 = 10;
const RECENT_POINTS: u32 = 20;
const SHARED_POINTS: u32 = 10;
const LINKED_POINTS: u32 = 30;
const FULL_SCORE_POINTS: u32 = 100;

/// Clamp an untrusted float into [0, 1]. NaN becomes 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Which relevance signals fired for a Drive file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceSignals {
    pub has_task_keywords: bool,
    pub is_workspace_document: bool,
    pub is_plain_text: bool,
    pub is_recent: bool,
    pub is_shared: bool,
    pub is_linked: bool,
}

impl RelevanceSignals {
    /// Raw sum in hundredths, before clamping. May exceed 100.
    pub fn points(&self) -> u32 {
        [
            (self.has_task_keywords, KEYWORD_POINTS),
            (self.is_workspace_document, WORKSPACE_DOC_POINTS),
            (self.is_plain_text, PLAIN_TEXT_POINTS),
            (self.is_recent, RECENT_POINTS),
            (self.is_shared, SHARED_POINTS),
            (self.is_linked, LINKED_POINTS),
        ]
        .into_iter()
        .filter(|(fired, _)| *fired)
        .map(|(_, points)| points)
        .sum()
    }

    /// Additive score saturated at 1.0.
    pub fn score(&self) -> f64 {
        f64::from(self.points().min(FULL_SCORE_POINTS)) / f64::from(FULL_SCORE_POINTS)
    }
}

/// Evaluate the relevance signals of a Drive file at `now`.
pub fn drive_relevance(
    metadata: &DriveFileMetadata,
    is_linked: bool,
    now: DateTime<Utc>,
) -> RelevanceSignals {
    RelevanceSignals {
        has_task_keywords: metadata.has_task_keywords(),
        is_workspace_document: metadata.is_workspace_document(),
        is_plain_text: metadata.is_plain_text(),
        is_recent: extract::is_recent(metadata.modified_at, now),
        is_shared: metadata.is_shared,
        is_linked,
    }
}

/// Logical OR over heterogeneous evidence: explicit label, model confidence
/// strictly above `threshold`, or an overwhelmed user.
pub fn is_high_priority(
    priority: SuggestedPriority,
    confidence: f64,
    emotional: &EmotionalContext,
    threshold: f64,
) -> bool {
    priority == SuggestedPriority::Important
        || clamp_unit(confidence) > threshold
        || emotional.is_overwhelmed
}

/// Logical OR: breakdown requested, complex work, or focus required.
pub fn should_simplify(
    requires_focus: bool,
    complexity: ComplexityLevel,
    emotional: &EmotionalContext,
) -> bool {
    emotional.needs_task_breakdown || complexity == ComplexityLevel::Complex || requires_focus
}

/// Scores and classification for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    /// Confidence (emails, brain dumps) or relevance (Drive files) in [0, 1].
    pub confidence: f64,
    /// Priority as suggested, before escalation.
    pub priority: SuggestedPriority,
    /// Whether any strong signal escalates the candidate.
    pub is_high_priority: bool,
    pub complexity: ComplexityLevel,
    pub should_simplify: bool,
    /// Whether the candidate clears the relevance bar for becoming a task.
    pub is_task_relevant: bool,
    /// Per-signal breakdown, for Drive files only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_signals: Option<RelevanceSignals>,
}

/// Score normalized candidate signals.
///
/// Emails and brain dumps are task-relevant when they carry any confidence or
/// escalate to high priority; Drive files use the relevance threshold.
pub fn score(signals: &CandidateSignals, config: &PipelineConfig) -> CandidateScore {
    let confidence = clamp_unit(signals.confidence.unwrap_or(0.0));
    let high = is_high_priority(
        signals.priority,
        confidence,
        &signals.emotional_context,
        config.high_confidence_threshold,
    );
    let simplify = should_simplify(
        signals.requires_focus,
        signals.complexity,
        &signals.emotional_context,
    );

    let is_task_relevant = match signals.relevance {
        Some(_) => confidence >= config.relevance_threshold,
        None => high || confidence > 0.0 || signals.confidence.is_none(),
    };

    CandidateScore {
        confidence,
        priority: signals.priority,
        is_high_priority: high,
        complexity: signals.complexity,
        should_simplify: simplify,
        is_task_relevant,
        relevance_signals: signals.relevance,
    }
}
