//! Capture artifact model: brain dumps, emails, and Drive files.
//!
//! Artifacts are immutable values. Every change goes through a consuming
//! derivation (`with_*`, `mark_as_processed`, `link_to_task`) that returns a
//! new value, so an artifact held elsewhere is never altered underneath it.

use std::collections::{BTreeSet, HashSet};
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capture::emotional::{ComplexityLevel, EmotionalContext, SuggestedPriority};
use crate::config::DEFAULT_HIGH_CONFIDENCE_THRESHOLD;
use crate::error::CaptureError;
use crate::inference::SuggestionBundle;
use crate::pipeline::extract::{self, TASK_KEYWORDS, URGENCY_KEYWORDS};
use crate::pipeline::scoring;

// ── Shared pieces ───────────────────────────────────────────────────

/// Which source an artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    BrainDump,
    Email,
    Drive,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BrainDump => "brain_dump",
            Self::Email => "email",
            Self::Drive => "drive",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "brain_dump" => Ok(Self::BrainDump),
            "email" => Ok(Self::Email),
            "drive" => Ok(Self::Drive),
            _ => Err(format!("Unknown source type: {s}")),
        }
    }
}

/// Weak back-reference to a task owned by the external task store.
///
/// The id and the timestamp only ever exist together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLink {
    pub task_id: String,
    pub linked_at: DateTime<Utc>,
}

/// Link transition shared by all variants: unlinked → linked, terminal.
///
/// Relinking to the same task is a no-op that keeps the original timestamp.
fn link_transition(
    artifact_id: &str,
    current: Option<&TaskLink>,
    task_id: String,
    at: DateTime<Utc>,
) -> Result<TaskLink, CaptureError> {
    if task_id.trim().is_empty() {
        return Err(CaptureError::InvalidCapture {
            reason: "task id must not be empty".into(),
        });
    }
    match current {
        Some(existing) if existing.task_id == task_id => Ok(existing.clone()),
        Some(existing) => Err(CaptureError::AlreadyLinked {
            id: artifact_id.to_string(),
            task_id: existing.task_id.clone(),
        }),
        None => Ok(TaskLink {
            task_id,
            linked_at: at,
        }),
    }
}

/// Capabilities every capture variant exposes to the pipeline.
pub trait Capture {
    /// Stable identifier of the artifact.
    fn id(&self) -> &str;

    /// Primary text the heuristics run over.
    fn content(&self) -> &str;

    /// The timestamp recency is judged against.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Whether the artifact can be turned into a task.
    fn is_convertible(&self) -> bool;

    fn source_type(&self) -> SourceType;

    /// Current task link, if any.
    fn task_link(&self) -> Option<&TaskLink>;

    fn has_content(&self) -> bool {
        !self.content().trim().is_empty()
    }

    fn linked_task_id(&self) -> Option<&str> {
        self.task_link().map(|l| l.task_id.as_str())
    }
}

// ── Brain dump ──────────────────────────────────────────────────────

/// Free-form text captured by the user.
///
/// Content is never empty: construction and `with_content` reject blank text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BrainDumpRecord")]
pub struct BrainDump {
    id: String,
    content: String,
    created_at: DateTime<Utc>,
    tags: BTreeSet<String>,
    is_processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    mood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<TaskLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<SuggestionBundle>,
}

/// Wire form of a brain dump, validated on the way in.
#[derive(Deserialize)]
struct BrainDumpRecord {
    id: String,
    content: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    tags: BTreeSet<String>,
    #[serde(default)]
    is_processed: bool,
    #[serde(default)]
    mood: Option<String>,
    #[serde(default)]
    link: Option<TaskLink>,
    #[serde(default)]
    suggestion: Option<SuggestionBundle>,
}

impl TryFrom<BrainDumpRecord> for BrainDump {
    type Error = CaptureError;

    fn try_from(r: BrainDumpRecord) -> Result<Self, Self::Error> {
        let dump = BrainDump::with_id(r.id, r.content, r.created_at)?;
        Ok(BrainDump {
            tags: r.tags,
            is_processed: r.is_processed,
            mood: r.mood,
            link: r.link,
            suggestion: r.suggestion,
            ..dump
        })
    }
}

fn validate_content(content: &str) -> Result<(), CaptureError> {
    if content.trim().is_empty() {
        return Err(CaptureError::InvalidCapture {
            reason: "brain dump content is empty".into(),
        });
    }
    Ok(())
}

impl BrainDump {
    /// Capture new text with a generated id.
    pub fn new(content: impl Into<String>, created_at: DateTime<Utc>) -> Result<Self, CaptureError> {
        Self::with_id(Uuid::new_v4().to_string(), content, created_at)
    }

    /// Rebuild a brain dump with a known id.
    pub fn with_id(
        id: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CaptureError> {
        let content = content.into();
        validate_content(&content)?;
        Ok(Self {
            id: id.into(),
            content,
            created_at,
            tags: BTreeSet::new(),
            is_processed: false,
            mood: None,
            link: None,
            suggestion: None,
        })
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn is_processed(&self) -> bool {
        self.is_processed
    }

    pub fn mood(&self) -> Option<&str> {
        self.mood.as_deref()
    }

    /// Suggestion captured alongside the text, if inference ran.
    pub fn suggestion(&self) -> Option<&SuggestionBundle> {
        self.suggestion.as_ref()
    }

    /// Builder: replace the content. Fails on blank text.
    pub fn with_content(self, content: impl Into<String>) -> Result<Self, CaptureError> {
        let content = content.into();
        validate_content(&content)?;
        Ok(Self { content, ..self })
    }

    /// Builder: replace the tag set.
    pub fn with_tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    /// Builder: set the mood.
    pub fn with_mood(self, mood: impl Into<String>) -> Self {
        Self {
            mood: Some(mood.into()),
            ..self
        }
    }

    /// Builder: keep the suggestion bundle with the dump so later reviews
    /// score it the same way.
    pub fn with_suggestion(self, bundle: &SuggestionBundle) -> Self {
        Self {
            suggestion: Some(bundle.clone()),
            ..self
        }
    }

    /// Captured → processed. One-way and idempotent.
    pub fn mark_as_processed(self) -> Self {
        Self {
            is_processed: true,
            ..self
        }
    }

    /// Unlinked → linked.
    pub fn link_to_task(
        self,
        task_id: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<Self, CaptureError> {
        let link = link_transition(&self.id, self.link.as_ref(), task_id.into(), at)?;
        Ok(Self {
            link: Some(link),
            ..self
        })
    }

    pub fn word_count(&self) -> usize {
        extract::word_count(&self.content)
    }

    /// Bullet and numbered lines, marker stripped, in source order.
    pub fn extract_tasks(&self) -> Vec<String> {
        extract::extract_line_items(&self.content)
    }

    pub fn preview(&self, max_chars: usize) -> String {
        extract::preview(&self.content, max_chars)
    }

    /// Whether the text itself contains urgency keywords.
    pub fn is_urgent(&self) -> bool {
        extract::contains_any_keyword(&self.content, URGENCY_KEYWORDS)
    }
}

impl Capture for BrainDump {
    fn id(&self) -> &str {
        &self.id
    }
    fn content(&self) -> &str {
        &self.content
    }
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn is_convertible(&self) -> bool {
        true
    }
    fn source_type(&self) -> SourceType {
        SourceType::BrainDump
    }
    fn task_link(&self) -> Option<&TaskLink> {
        self.link.as_ref()
    }
}

// ── Email ───────────────────────────────────────────────────────────

/// Raw email metadata as delivered by an email fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMetadata {
    pub message_id: String,
    pub thread_id: String,
    pub subject: String,
    pub body: String,
    pub sender: String,
    pub received_at: DateTime<Utc>,
    #[serde(default)]
    pub is_unread: bool,
    #[serde(default)]
    pub labels: BTreeSet<String>,
}

/// An incoming email plus the suggestions and attention context attached to it.
///
/// `action_confidence` holds whatever the inference collaborator sent;
/// read it through [`EmailCapture::confidence`], which clamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailCapture {
    pub message_id: String,
    pub thread_id: String,
    pub subject: String,
    pub body: String,
    pub sender: String,
    pub received_at: DateTime<Utc>,
    pub is_unread: bool,
    pub labels: BTreeSet<String>,

    pub suggested_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub suggested_priority: SuggestedPriority,
    #[serde(default)]
    pub suggested_tags: Vec<String>,
    #[serde(default)]
    pub action_confidence: f64,

    #[serde(default)]
    pub requires_focus: bool,
    #[serde(default)]
    pub complexity_level: ComplexityLevel,
    #[serde(default)]
    pub emotional_context: EmotionalContext,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    conversion: Option<TaskLink>,
}

impl EmailCapture {
    /// Wrap fetched metadata. Suggestion fields start as "no signal",
    /// with the subject standing in for the title.
    pub fn new(meta: EmailMetadata) -> Self {
        Self {
            suggested_title: meta.subject.clone(),
            message_id: meta.message_id,
            thread_id: meta.thread_id,
            subject: meta.subject,
            body: meta.body,
            sender: meta.sender,
            received_at: meta.received_at,
            is_unread: meta.is_unread,
            labels: meta.labels,
            suggested_description: None,
            suggested_due_date: None,
            suggested_priority: SuggestedPriority::default(),
            suggested_tags: Vec::new(),
            action_confidence: 0.0,
            requires_focus: false,
            complexity_level: ComplexityLevel::default(),
            emotional_context: EmotionalContext::default(),
            conversion: None,
        }
    }

    /// Action confidence clamped to [0, 1]. NaN reads as 0.
    pub fn confidence(&self) -> f64 {
        scoring::clamp_unit(self.action_confidence)
    }

    /// Subject or body mentions an urgency keyword.
    pub fn is_urgent(&self) -> bool {
        extract::contains_any_keyword(&self.subject, URGENCY_KEYWORDS)
            || extract::contains_any_keyword(&self.body, URGENCY_KEYWORDS)
    }

    /// High priority using the default confidence threshold.
    pub fn is_high_priority(&self) -> bool {
        self.is_high_priority_with(DEFAULT_HIGH_CONFIDENCE_THRESHOLD)
    }

    /// Any strong signal surfaces the email: an `important` label, confidence
    /// strictly above `threshold`, or an overwhelmed emotional state.
    pub fn is_high_priority_with(&self, threshold: f64) -> bool {
        scoring::is_high_priority(
            self.suggested_priority,
            self.confidence(),
            &self.emotional_context,
            threshold,
        )
    }

    /// Any of: breakdown needed, complex, or requires focus.
    pub fn should_simplify(&self) -> bool {
        scoring::should_simplify(self.requires_focus, self.complexity_level, &self.emotional_context)
    }

    pub fn preview(&self, max_chars: usize) -> String {
        extract::preview(&self.body, max_chars)
    }

    /// Display name from a `Name <addr>` sender, or the raw sender.
    pub fn sender_display(&self) -> &str {
        match self.sender.find('<') {
            Some(pos) if pos > 0 => self.sender[..pos].trim().trim_matches('"'),
            _ => self.sender.trim_matches(|c: char| c == '<' || c == '>'),
        }
    }

    pub fn is_converted(&self) -> bool {
        self.conversion.is_some()
    }

    pub fn linked_task_id(&self) -> Option<&str> {
        self.conversion.as_ref().map(|l| l.task_id.as_str())
    }

    pub fn converted_at(&self) -> Option<DateTime<Utc>> {
        self.conversion.as_ref().map(|l| l.linked_at)
    }

    /// Builder: replace the labels.
    pub fn with_labels<I, S>(self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    /// Builder: set the unread flag.
    pub fn with_unread(self, is_unread: bool) -> Self {
        Self { is_unread, ..self }
    }

    /// Fold a suggestion bundle into the email's AI-supplied fields.
    ///
    /// A blank title keeps the current one; absent confidence keeps the
    /// current value.
    pub fn with_suggestion(self, bundle: &SuggestionBundle) -> Self {
        let suggested_title = if bundle.title.trim().is_empty() {
            self.suggested_title
        } else {
            bundle.title.clone()
        };
        Self {
            suggested_title,
            suggested_description: bundle.description.clone(),
            suggested_due_date: bundle.due_date,
            suggested_priority: bundle.priority,
            suggested_tags: bundle.tags.clone(),
            action_confidence: bundle.confidence.unwrap_or(self.action_confidence),
            requires_focus: bundle.requires_focus,
            complexity_level: bundle.complexity_level,
            emotional_context: bundle.emotional_context.clone(),
            ..self
        }
    }

    /// Unlinked → converted. Task id and timestamp are set together.
    pub fn link_to_task(
        self,
        task_id: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<Self, CaptureError> {
        let link = link_transition(&self.message_id, self.conversion.as_ref(), task_id.into(), at)?;
        Ok(Self {
            conversion: Some(link),
            ..self
        })
    }
}

impl Capture for EmailCapture {
    fn id(&self) -> &str {
        &self.message_id
    }
    fn content(&self) -> &str {
        &self.body
    }
    fn timestamp(&self) -> DateTime<Utc> {
        self.received_at
    }
    fn is_convertible(&self) -> bool {
        true
    }
    fn source_type(&self) -> SourceType {
        SourceType::Email
    }
    fn task_link(&self) -> Option<&TaskLink> {
        self.conversion.as_ref()
    }
}

// ── Drive file ──────────────────────────────────────────────────────

const WORKSPACE_DOCUMENT_TYPES: &[&str] = &[
    "application/vnd.google-apps.document",
    "application/vnd.google-apps.spreadsheet",
    "application/vnd.google-apps.presentation",
];

const PLAIN_TEXT_TYPE: &str = "text/plain";
const FOLDER_TYPE: &str = "application/vnd.google-apps.folder";

/// Raw file metadata as delivered by a Drive fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveFileMetadata {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default)]
    pub is_folder: bool,
    #[serde(default)]
    pub owners: Vec<String>,
    #[serde(default)]
    pub is_shared: bool,
}

impl DriveFileMetadata {
    pub fn is_workspace_document(&self) -> bool {
        WORKSPACE_DOCUMENT_TYPES.contains(&self.mime_type.as_str())
    }

    pub fn is_plain_text(&self) -> bool {
        self.mime_type == PLAIN_TEXT_TYPE
    }

    pub fn has_task_keywords(&self) -> bool {
        extract::contains_any_keyword(&self.name, TASK_KEYWORDS)
    }
}

/// A linked cloud file with its cached relevance evaluation.
///
/// The score and `is_task_relevant` flag are recomputed by every derivation
/// that touches a contributing field, so the flag always equals
/// `score >= threshold` for the stored threshold and evaluation time.
/// Equality and hashing use the file id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "DriveFileRecord", from = "DriveFileRecord")]
pub struct DriveFile {
    metadata: DriveFileMetadata,
    link: Option<TaskLink>,
    relevance_threshold: f64,
    evaluated_at: DateTime<Utc>,
    task_relevance_score: f64,
    is_task_relevant: bool,
}

/// Wire form of a Drive file. The cached score and flag are written out for
/// consumers but recomputed on read.
#[derive(Serialize, Deserialize)]
struct DriveFileRecord {
    #[serde(flatten)]
    metadata: DriveFileMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    link: Option<TaskLink>,
    relevance_threshold: f64,
    evaluated_at: DateTime<Utc>,
    #[serde(default)]
    task_relevance_score: f64,
    #[serde(default)]
    is_task_relevant: bool,
}

impl From<DriveFile> for DriveFileRecord {
    fn from(f: DriveFile) -> Self {
        Self {
            metadata: f.metadata,
            link: f.link,
            relevance_threshold: f.relevance_threshold,
            evaluated_at: f.evaluated_at,
            task_relevance_score: f.task_relevance_score,
            is_task_relevant: f.is_task_relevant,
        }
    }
}

impl From<DriveFileRecord> for DriveFile {
    fn from(r: DriveFileRecord) -> Self {
        DriveFile::evaluate(r.metadata, r.link, r.evaluated_at, r.relevance_threshold)
    }
}

impl DriveFile {
    /// Wrap fetched metadata and evaluate relevance at `now`.
    pub fn new(metadata: DriveFileMetadata, now: DateTime<Utc>, threshold: f64) -> Self {
        Self::evaluate(metadata, None, now, threshold)
    }

    fn evaluate(
        metadata: DriveFileMetadata,
        link: Option<TaskLink>,
        evaluated_at: DateTime<Utc>,
        relevance_threshold: f64,
    ) -> Self {
        let score = scoring::drive_relevance(&metadata, link.is_some(), evaluated_at).score();
        Self {
            metadata,
            link,
            relevance_threshold,
            evaluated_at,
            task_relevance_score: score,
            is_task_relevant: score >= relevance_threshold,
        }
    }

    pub fn metadata(&self) -> &DriveFileMetadata {
        &self.metadata
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn mime_type(&self) -> &str {
        &self.metadata.mime_type
    }

    pub fn modified_at(&self) -> DateTime<Utc> {
        self.metadata.modified_at
    }

    pub fn linked_at(&self) -> Option<DateTime<Utc>> {
        self.link.as_ref().map(|l| l.linked_at)
    }

    /// Cached relevance score in [0, 1].
    pub fn task_relevance_score(&self) -> f64 {
        self.task_relevance_score
    }

    pub fn is_task_relevant(&self) -> bool {
        self.is_task_relevant
    }

    pub fn relevance_threshold(&self) -> f64 {
        self.relevance_threshold
    }

    /// When the cached relevance was last computed.
    pub fn evaluated_at(&self) -> DateTime<Utc> {
        self.evaluated_at
    }

    pub fn has_task_keywords(&self) -> bool {
        self.metadata.has_task_keywords()
    }

    pub fn is_recent(&self, now: DateTime<Utc>) -> bool {
        extract::is_recent(self.metadata.modified_at, now)
    }

    pub fn is_workspace_document(&self) -> bool {
        self.metadata.is_workspace_document()
    }

    pub fn is_plain_text(&self) -> bool {
        self.metadata.is_plain_text()
    }

    /// Human-readable size, e.g. `1.5 MB`. `None` when the source gave no size.
    pub fn display_size(&self) -> Option<String> {
        const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
        let bytes = self.metadata.size?;
        if bytes < 1024 {
            return Some(format!("{bytes} B"));
        }
        #[allow(clippy::cast_precision_loss)]
        let mut value = bytes as f64;
        let mut unit = 0;
        while value >= 1024.0 && unit < UNITS.len() - 1 {
            value /= 1024.0;
            unit += 1;
        }
        Some(format!("{value:.1} {}", UNITS[unit]))
    }

    /// Derive a copy with edited metadata, re-evaluated at the same instant
    /// and threshold.
    pub fn with_metadata(self, edit: impl FnOnce(&mut DriveFileMetadata)) -> Self {
        let mut metadata = self.metadata;
        edit(&mut metadata);
        Self::evaluate(metadata, self.link, self.evaluated_at, self.relevance_threshold)
    }

    /// Re-evaluate relevance at a new instant or threshold.
    pub fn reevaluate(self, now: DateTime<Utc>, threshold: f64) -> Self {
        Self::evaluate(self.metadata, self.link, now, threshold)
    }

    /// Unlinked → linked. Folders cannot be linked.
    pub fn link_to_task(
        self,
        task_id: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<Self, CaptureError> {
        if self.metadata.is_folder || self.metadata.mime_type == FOLDER_TYPE {
            return Err(CaptureError::NotConvertible {
                id: self.metadata.id.clone(),
            });
        }
        let link = link_transition(&self.metadata.id, self.link.as_ref(), task_id.into(), at)?;
        Ok(Self::evaluate(
            self.metadata,
            Some(link),
            self.evaluated_at,
            self.relevance_threshold,
        ))
    }
}

impl PartialEq for DriveFile {
    fn eq(&self, other: &Self) -> bool {
        self.metadata.id == other.metadata.id
    }
}

impl Eq for DriveFile {}

impl Hash for DriveFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.metadata.id.hash(state);
    }
}

impl Capture for DriveFile {
    fn id(&self) -> &str {
        &self.metadata.id
    }
    fn content(&self) -> &str {
        &self.metadata.name
    }
    fn timestamp(&self) -> DateTime<Utc> {
        self.metadata.modified_at
    }
    fn is_convertible(&self) -> bool {
        !self.metadata.is_folder && self.metadata.mime_type != FOLDER_TYPE
    }
    fn source_type(&self) -> SourceType {
        SourceType::Drive
    }
    fn task_link(&self) -> Option<&TaskLink> {
        self.link.as_ref()
    }
}

/// Drop repeated files from a batch of fetches. First occurrence wins and
/// order is preserved.
pub fn dedup_by_id(files: Vec<DriveFile>) -> Vec<DriveFile> {
    let mut seen = HashSet::new();
    files
        .into_iter()
        .filter(|f| seen.insert(f.metadata.id.clone()))
        .collect()
}

// ── Artifact union ──────────────────────────────────────────────────

/// Any capture artifact entering the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CaptureArtifact {
    BrainDump(BrainDump),
    Email(EmailCapture),
    Drive(DriveFile),
}

impl CaptureArtifact {
    fn inner(&self) -> &dyn Capture {
        match self {
            Self::BrainDump(d) => d,
            Self::Email(e) => e,
            Self::Drive(f) => f,
        }
    }

    /// Link to a task id, dispatching to the variant's transition.
    pub fn link_to_task(
        self,
        task_id: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<Self, CaptureError> {
        Ok(match self {
            Self::BrainDump(d) => Self::BrainDump(d.link_to_task(task_id, at)?),
            Self::Email(e) => Self::Email(e.link_to_task(task_id, at)?),
            Self::Drive(f) => Self::Drive(f.link_to_task(task_id, at)?),
        })
    }

    /// Carry the task link of a stored copy over to a freshly fetched one.
    ///
    /// Linking is terminal, so a re-fetch never drops it. Drive relevance is
    /// re-evaluated with the link counted.
    pub fn with_link_of(self, stored: &CaptureArtifact) -> Self {
        let Some(link) = stored.task_link().cloned() else {
            return self;
        };
        match self {
            Self::BrainDump(d) => Self::BrainDump(BrainDump {
                link: Some(link),
                ..d
            }),
            Self::Email(e) => Self::Email(EmailCapture {
                conversion: Some(link),
                ..e
            }),
            Self::Drive(f) => Self::Drive(DriveFile::evaluate(
                f.metadata,
                Some(link),
                f.evaluated_at,
                f.relevance_threshold,
            )),
        }
    }
}

impl Capture for CaptureArtifact {
    fn id(&self) -> &str {
        self.inner().id()
    }
    fn content(&self) -> &str {
        self.inner().content()
    }
    fn timestamp(&self) -> DateTime<Utc> {
        self.inner().timestamp()
    }
    fn is_convertible(&self) -> bool {
        self.inner().is_convertible()
    }
    fn source_type(&self) -> SourceType {
        self.inner().source_type()
    }
    fn task_link(&self) -> Option<&TaskLink> {
        self.inner().task_link()
    }
}

impl From<BrainDump> for CaptureArtifact {
    fn from(d: BrainDump) -> Self {
        Self::BrainDump(d)
    }
}

impl From<EmailCapture> for CaptureArtifact {
    fn from(e: EmailCapture) -> Self {
        Self::Email(e)
    }
}

impl From<DriveFile> for CaptureArtifact {
    fn from(f: DriveFile) -> Self {
        Self::Drive(f)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn drive_meta(id: &str, name: &str, mime: &str) -> DriveFileMetadata {
        DriveFileMetadata {
            id: id.into(),
            name: name.into(),
            mime_type: mime.into(),
            created_at: now() - Duration::days(60),
            modified_at: now() - Duration::days(30),
            web_view_link: None,
            icon_link: None,
            size: None,
            is_folder: false,
            owners: vec!["me@example.com".into()],
            is_shared: false,
        }
    }

    fn email_meta() -> EmailMetadata {
        EmailMetadata {
            message_id: "msg-1".into(),
            thread_id: "thread-1".into(),
            subject: "Quarterly report".into(),
            body: "Can you send the numbers by Friday?".into(),
            sender: "Alice Smith <alice@example.com>".into(),
            received_at: now(),
            is_unread: true,
            labels: BTreeSet::from(["INBOX".to_string()]),
        }
    }

    // ── Brain dump ──────────────────────────────────────────────

    #[test]
    fn brain_dump_rejects_blank_content() {
        assert!(matches!(
            BrainDump::new("   \n\t", now()),
            Err(CaptureError::InvalidCapture { .. })
        ));
        assert!(BrainDump::new("", now()).is_err());
    }

    #[test]
    fn brain_dump_defaults() {
        let dump = BrainDump::new("call the dentist", now()).unwrap();
        assert!(!dump.is_processed());
        assert!(dump.tags().is_empty());
        assert!(dump.mood().is_none());
        assert!(dump.linked_task_id().is_none());
        assert_eq!(dump.timestamp(), now());
        assert!(dump.has_content());
    }

    #[test]
    fn brain_dump_derivations_leave_original_untouched() {
        let original = BrainDump::new("- a\n- b", now()).unwrap();
        let derived = original
            .clone()
            .with_tags(["home", "errands"])
            .with_mood("tired");
        assert!(original.tags().is_empty());
        assert_eq!(derived.tags().len(), 2);
        assert_eq!(derived.mood(), Some("tired"));
        assert_eq!(derived.id(), original.id());
    }

    #[test]
    fn brain_dump_with_content_validates() {
        let dump = BrainDump::new("first", now()).unwrap();
        assert!(dump.clone().with_content(" ").is_err());
        assert_eq!(dump.with_content("second").unwrap().content(), "second");
    }

    #[test]
    fn mark_as_processed_is_idempotent() {
        let dump = BrainDump::new("note", now()).unwrap();
        let once = dump.clone().mark_as_processed();
        let twice = dump.mark_as_processed().mark_as_processed();
        assert!(once.is_processed());
        assert_eq!(once, twice);
    }

    #[test]
    fn brain_dump_word_count_and_tasks() {
        let dump = BrainDump::new("- buy milk\n* call mom\n3. pay rent\njust a note", now()).unwrap();
        assert_eq!(dump.extract_tasks(), vec!["buy milk", "call mom", "pay rent"]);
        assert_eq!(dump.word_count(), 12);
    }

    #[test]
    fn brain_dump_deserialize_rejects_blank_content() {
        let json = r#"{"id":"x","content":"  ","created_at":"2026-03-10T12:00:00Z"}"#;
        assert!(serde_json::from_str::<BrainDump>(json).is_err());

        let json = r#"{"id":"x","content":"ok","created_at":"2026-03-10T12:00:00Z","tags":["a"]}"#;
        let dump: BrainDump = serde_json::from_str(json).unwrap();
        assert_eq!(dump.id(), "x");
        assert!(dump.tags().contains("a"));
    }

    // ── Linking ─────────────────────────────────────────────────

    #[test]
    fn link_sets_id_and_timestamp_together() {
        let email = EmailCapture::new(email_meta());
        assert!(!email.is_converted());
        assert!(email.converted_at().is_none());

        let linked = email.link_to_task("task-9", now()).unwrap();
        assert!(linked.is_converted());
        assert_eq!(linked.linked_task_id(), Some("task-9"));
        assert_eq!(linked.converted_at(), Some(now()));
    }

    #[test]
    fn relinking_same_task_keeps_first_timestamp() {
        let later = now() + Duration::hours(3);
        let linked = EmailCapture::new(email_meta())
            .link_to_task("task-9", now())
            .unwrap()
            .link_to_task("task-9", later)
            .unwrap();
        assert_eq!(linked.converted_at(), Some(now()));
    }

    #[test]
    fn relinking_different_task_is_rejected() {
        let linked = BrainDump::new("x", now())
            .unwrap()
            .link_to_task("task-1", now())
            .unwrap();
        assert!(matches!(
            linked.link_to_task("task-2", now()),
            Err(CaptureError::AlreadyLinked { ref task_id, .. }) if task_id == "task-1"
        ));
    }

    #[test]
    fn empty_task_id_is_rejected() {
        let email = EmailCapture::new(email_meta());
        assert!(email.link_to_task("  ", now()).is_err());
    }

    // ── Email ───────────────────────────────────────────────────

    #[test]
    fn email_new_uses_subject_as_title() {
        let email = EmailCapture::new(email_meta());
        assert_eq!(email.suggested_title, "Quarterly report");
        assert_eq!(email.complexity_level, ComplexityLevel::Moderate);
        assert_eq!(email.suggested_priority, SuggestedPriority::Later);
        assert_eq!(email.id(), "msg-1");
    }

    #[test]
    fn email_confidence_is_clamped_on_read() {
        let mut email = EmailCapture::new(email_meta());
        email.action_confidence = 1.7;
        assert_eq!(email.confidence(), 1.0);
        email.action_confidence = -0.3;
        assert_eq!(email.confidence(), 0.0);
        email.action_confidence = f64::NAN;
        assert_eq!(email.confidence(), 0.0);
    }

    #[test]
    fn high_priority_from_confidence_despite_later_label() {
        let mut email = EmailCapture::new(email_meta());
        email.suggested_priority = SuggestedPriority::Later;
        email.action_confidence = 0.95;
        assert!(!email.emotional_context.is_overwhelmed);
        assert!(email.is_high_priority());
    }

    #[test]
    fn confidence_threshold_is_strict() {
        let mut email = EmailCapture::new(email_meta());
        email.action_confidence = 0.8;
        assert!(!email.is_high_priority());
    }

    #[test]
    fn high_priority_from_label_or_overwhelm() {
        let mut email = EmailCapture::new(email_meta());
        email.suggested_priority = SuggestedPriority::Important;
        assert!(email.is_high_priority());

        let mut email = EmailCapture::new(email_meta());
        email.emotional_context.is_overwhelmed = true;
        assert!(email.is_high_priority());
    }

    #[test]
    fn urgency_from_subject_or_body() {
        let mut email = EmailCapture::new(email_meta());
        assert!(!email.is_urgent());
        email.subject = "URGENT: server down".into();
        assert!(email.is_urgent());

        let mut email = EmailCapture::new(email_meta());
        email.body = "Please reply asap".into();
        assert!(email.is_urgent());
    }

    #[test]
    fn should_simplify_signals() {
        let email = EmailCapture::new(email_meta());
        assert!(!email.should_simplify());

        let mut focus = email.clone();
        focus.requires_focus = true;
        assert!(focus.should_simplify());

        let mut complex = email.clone();
        complex.complexity_level = ComplexityLevel::Complex;
        assert!(complex.should_simplify());

        let mut breakdown = email;
        breakdown.emotional_context.needs_task_breakdown = true;
        assert!(breakdown.should_simplify());
    }

    #[test]
    fn sender_display_variants() {
        let mut email = EmailCapture::new(email_meta());
        assert_eq!(email.sender_display(), "Alice Smith");
        email.sender = "\"Bob\" <bob@example.com>".into();
        assert_eq!(email.sender_display(), "Bob");
        email.sender = "carol@example.com".into();
        assert_eq!(email.sender_display(), "carol@example.com");
    }

    #[test]
    fn email_serde_roundtrip_keeps_conversion() {
        let email = EmailCapture::new(email_meta())
            .link_to_task("task-3", now())
            .unwrap();
        let json = serde_json::to_string(&email).unwrap();
        let parsed: EmailCapture = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.linked_task_id(), Some("task-3"));
        assert_eq!(parsed, email);
    }

    // ── Drive ───────────────────────────────────────────────────

    #[test]
    fn drive_all_signals_saturate_at_one() {
        let mut meta = drive_meta("f1", "Project agenda", "application/vnd.google-apps.document");
        meta.modified_at = now() - Duration::days(1);
        meta.is_shared = true;
        let file = DriveFile::new(meta, now(), 0.5)
            .link_to_task("task-1", now())
            .unwrap();
        assert_eq!(file.task_relevance_score(), 1.0);
        assert!(file.is_task_relevant());
    }

    #[test]
    fn drive_stale_unshared_image_is_not_relevant() {
        let file = DriveFile::new(drive_meta("f2", "beach.jpg", "image/jpeg"), now(), 0.5);
        assert_eq!(file.task_relevance_score(), 0.0);
        assert!(!file.is_task_relevant());
    }

    #[test]
    fn drive_flag_tracks_edits() {
        let file = DriveFile::new(drive_meta("f3", "budget", "text/plain"), now(), 0.5);
        assert!(!file.is_task_relevant());

        let edited = file.with_metadata(|m| {
            m.name = "budget meeting notes".into();
            m.is_shared = true;
        });
        // keyword 0.3 + plain text 0.1 + shared 0.1
        assert!((edited.task_relevance_score() - 0.5).abs() < 1e-9);
        assert!(edited.is_task_relevant());
    }

    #[test]
    fn drive_flag_tracks_linking() {
        let mut meta = drive_meta("f4", "photo", "application/vnd.google-apps.document");
        meta.modified_at = now() - Duration::days(2);
        let file = DriveFile::new(meta, now(), 0.5);
        assert!((file.task_relevance_score() - 0.4).abs() < 1e-9);
        assert!(!file.is_task_relevant());

        let linked = file.link_to_task("task-5", now()).unwrap();
        assert!((linked.task_relevance_score() - 0.7).abs() < 1e-9);
        assert!(linked.is_task_relevant());
        assert_eq!(linked.linked_at(), Some(now()));
    }

    #[test]
    fn drive_reevaluate_ages_out_recency() {
        let mut meta = drive_meta("f5", "sprint tasks", "application/vnd.google-apps.spreadsheet");
        meta.modified_at = now() - Duration::days(1);
        let file = DriveFile::new(meta, now(), 0.5);
        assert!((file.task_relevance_score() - 0.7).abs() < 1e-9);

        let later = file.reevaluate(now() + Duration::days(10), 0.5);
        assert!((later.task_relevance_score() - 0.5).abs() < 1e-9);
        assert!(later.is_task_relevant());

        let stricter = later.reevaluate(now() + Duration::days(10), 0.6);
        assert!(!stricter.is_task_relevant());
    }

    #[test]
    fn drive_folders_cannot_be_linked() {
        let mut meta = drive_meta("dir", "Projects", FOLDER_TYPE);
        meta.is_folder = true;
        let folder = DriveFile::new(meta, now(), 0.5);
        assert!(!folder.is_convertible());
        assert!(matches!(
            folder.link_to_task("task-1", now()),
            Err(CaptureError::NotConvertible { .. })
        ));
    }

    #[test]
    fn drive_equality_is_by_id() {
        let a = DriveFile::new(drive_meta("same", "one", "text/plain"), now(), 0.5);
        let b = DriveFile::new(drive_meta("same", "two", "image/png"), now(), 0.9);
        let c = DriveFile::new(drive_meta("other", "one", "text/plain"), now(), 0.5);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(HashSet::from([a, b, c]).len(), 2);
    }

    #[test]
    fn dedup_keeps_first_occurrence_in_order() {
        let files = vec![
            DriveFile::new(drive_meta("a", "first a", "text/plain"), now(), 0.5),
            DriveFile::new(drive_meta("b", "b", "text/plain"), now(), 0.5),
            DriveFile::new(drive_meta("a", "second a", "text/plain"), now(), 0.5),
        ];
        let unique = dedup_by_id(files);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].name(), "first a");
        assert_eq!(unique[1].id(), "b");
    }

    #[test]
    fn drive_display_size() {
        let mut meta = drive_meta("s", "file", "text/plain");
        assert!(DriveFile::new(meta.clone(), now(), 0.5).display_size().is_none());
        meta.size = Some(512);
        assert_eq!(DriveFile::new(meta.clone(), now(), 0.5).display_size().as_deref(), Some("512 B"));
        meta.size = Some(1536 * 1024);
        assert_eq!(DriveFile::new(meta, now(), 0.5).display_size().as_deref(), Some("1.5 MB"));
    }

    #[test]
    fn drive_deserialize_recomputes_cached_flag() {
        let file = DriveFile::new(drive_meta("f6", "notes", "text/plain"), now(), 0.3);
        let mut json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["is_task_relevant"], true);
        json["is_task_relevant"] = serde_json::json!(false);
        json["task_relevance_score"] = serde_json::json!(0.0);

        let parsed: DriveFile = serde_json::from_value(json).unwrap();
        assert!(parsed.is_task_relevant());
        assert!((parsed.task_relevance_score() - 0.4).abs() < 1e-9);
    }

    // ── Union ───────────────────────────────────────────────────

    #[test]
    fn artifact_union_is_tagged_by_source() {
        let artifact: CaptureArtifact = BrainDump::with_id("bd-1", "hello", now()).unwrap().into();
        let json = serde_json::to_value(&artifact).unwrap();
        assert_eq!(json["source"], "brain_dump");
        assert_eq!(json["id"], "bd-1");

        let back: CaptureArtifact = serde_json::from_value(json).unwrap();
        assert_eq!(back.source_type(), SourceType::BrainDump);
        assert_eq!(back.id(), "bd-1");
    }

    #[test]
    fn artifact_union_drive_roundtrip() {
        let artifact: CaptureArtifact =
            DriveFile::new(drive_meta("f7", "todo list", "text/plain"), now(), 0.5).into();
        let json = serde_json::to_string(&artifact).unwrap();
        let back: CaptureArtifact = serde_json::from_str(&json).unwrap();
        match back {
            CaptureArtifact::Drive(f) => {
                assert_eq!(f.id(), "f7");
                assert_eq!(f.relevance_threshold(), 0.5);
            }
            other => panic!("Expected Drive, got {other:?}"),
        }
    }

    #[test]
    fn source_type_string_roundtrip() {
        for source in [SourceType::BrainDump, SourceType::Email, SourceType::Drive] {
            assert_eq!(source.as_str().parse::<SourceType>(), Ok(source));
        }
        assert!("calendar".parse::<SourceType>().is_err());
    }
}
