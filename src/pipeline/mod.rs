//! Capture-to-task pipeline.
//!
//! Every artifact flows through the same stages:
//! 1. Fetch: source collaborators deliver raw emails and Drive files
//! 2. Infer: the inference collaborator suggests title, priority and context
//! 3. Score: bounded relevance/confidence plus priority classification
//! 4. Adapt: breakdown hints and a recommended action time
//! 5. Save: the repository persists the artifact
//!
//! Stages 3 and 4 are pure ([`annotate`]); the async orchestration lives in
//! [`processor::CapturePipeline`]. The pipeline never creates tasks itself.

pub mod adaptation;
pub mod conversion;
pub mod extract;
pub mod processor;
pub mod scoring;
pub mod types;

use chrono::{DateTime, Utc};

use crate::capture::model::CaptureArtifact;
use crate::config::PipelineConfig;
use crate::inference::SuggestionBundle;
use crate::pipeline::types::{AnnotatedCandidate, CandidateSignals};

/// Score and adapt one artifact at `now`.
///
/// Emails get the suggestion folded into their fields and brain dumps keep
/// it alongside their text, so re-annotating a stored artifact without a
/// suggestion scores it the same way. Drive files are re-evaluated against
/// `now` and the configured relevance threshold. Same inputs always give the
/// same candidate.
pub fn annotate(
    artifact: CaptureArtifact,
    suggestion: Option<&SuggestionBundle>,
    now: DateTime<Utc>,
    config: &PipelineConfig,
) -> AnnotatedCandidate {
    let artifact = match (artifact, suggestion) {
        (CaptureArtifact::Email(e), Some(bundle)) => CaptureArtifact::Email(e.with_suggestion(bundle)),
        (CaptureArtifact::BrainDump(d), Some(bundle)) => CaptureArtifact::BrainDump(d.with_suggestion(bundle)),
        (CaptureArtifact::Drive(f), _) => CaptureArtifact::Drive(f.reevaluate(now, config.relevance_threshold)),
        (other, _) => other,
    };

    let signals = CandidateSignals::from_artifact(&artifact, None);
    let score = scoring::score(&signals, config);
    let adaptation = adaptation::adapt(&signals, &score, now);
    let preview = match &artifact {
        CaptureArtifact::BrainDump(d) => d.preview(config.preview_chars),
        CaptureArtifact::Email(e) => e.preview(config.preview_chars),
        CaptureArtifact::Drive(f) => extract::preview(f.name(), config.preview_chars),
    };

    AnnotatedCandidate {
        artifact,
        signals,
        score,
        adaptation,
        preview,
        evaluated_at: now,
    }
}
