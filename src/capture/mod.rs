//! Capture artifacts and the attention context attached to them.

pub mod emotional;
pub mod model;

pub use emotional::{
    AdhdIndicators, ComplexityLevel, EmotionalContext, Recommendations, SuggestedPriority,
};
pub use model::{
    BrainDump, Capture, CaptureArtifact, DriveFile, DriveFileMetadata, EmailCapture,
    EmailMetadata, SourceType, TaskLink, dedup_by_id,
};
