//! Inference collaborator boundary.
//!
//! The model behind the service is out of scope. This module defines the
//! contract (`InferenceService`), the suggestion bundle it returns, and the
//! tolerant adapter that turns a raw JSON payload into a bundle: missing or
//! malformed fields degrade to "no signal" defaults instead of failing the
//! capture.

pub mod http;

pub use http::{HttpInferenceService, InferenceConfig};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::capture::emotional::{ComplexityLevel, EmotionalContext, SuggestedPriority};
use crate::capture::model::SourceType;
use crate::error::{CollaboratorError, SuggestionError};
use crate::pipeline::scoring::clamp_unit;

/// Structured suggestions for one capture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionBundle {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub priority: SuggestedPriority,
    pub tags: Vec<String>,
    /// Clamped to [0, 1] by the adapter. `None` means the service sent nothing usable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub emotional_context: EmotionalContext,
    pub requires_focus: bool,
    pub complexity_level: ComplexityLevel,
}

/// Result of tolerant parsing: a usable bundle plus what was wrong with the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSuggestion {
    pub bundle: SuggestionBundle,
    pub issues: Vec<SuggestionError>,
}

/// Look up a field under its snake_case or camelCase name.
fn field<'a>(value: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|n| value.get(*n))
        .find(|v| !v.is_null())
}

impl SuggestionBundle {
    /// Parse a raw payload, substituting defaults for anything missing or
    /// malformed. `fallback_title` is used when the payload has no title.
    pub fn from_value(value: &Value, fallback_title: &str) -> ParsedSuggestion {
        let mut issues = Vec::new();
        let mut bundle = SuggestionBundle::default();

        if !value.is_object() {
            issues.push(SuggestionError::malformed("payload", "expected a JSON object"));
            bundle.title = fallback_title.to_string();
            return ParsedSuggestion { bundle, issues };
        }

        bundle.title = match field(value, &["title", "suggested_title", "suggestedTitle"]) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(_) => {
                issues.push(SuggestionError::malformed("title", "expected a non-empty string"));
                fallback_title.to_string()
            }
            None => {
                issues.push(SuggestionError::malformed("title", "missing"));
                fallback_title.to_string()
            }
        };

        bundle.description = match field(value, &["description", "suggested_description", "suggestedDescription"]) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::String(_)) | None => None,
            Some(_) => {
                issues.push(SuggestionError::malformed("description", "expected a string"));
                None
            }
        };

        bundle.due_date = match field(value, &["due_date", "dueDate", "suggested_due_date", "suggestedDueDate"]) {
            Some(Value::String(s)) => match DateTime::parse_from_rfc3339(s) {
                Ok(dt) => Some(dt.with_timezone(&Utc)),
                Err(e) => {
                    issues.push(SuggestionError::malformed("due_date", format!("{e}")));
                    None
                }
            },
            Some(_) => {
                issues.push(SuggestionError::malformed("due_date", "expected an RFC 3339 string"));
                None
            }
            None => None,
        };

        bundle.priority = match field(value, &["priority", "suggested_priority", "suggestedPriority"]) {
            Some(Value::String(s)) => s.parse().unwrap_or_else(|e: String| {
                issues.push(SuggestionError::malformed("priority", e));
                SuggestedPriority::default()
            }),
            Some(_) => {
                issues.push(SuggestionError::malformed("priority", "expected a string"));
                SuggestedPriority::default()
            }
            None => {
                issues.push(SuggestionError::malformed("priority", "missing"));
                SuggestedPriority::default()
            }
        };

        bundle.tags = match field(value, &["tags", "suggested_tags", "suggestedTags"]) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
            Some(_) => {
                issues.push(SuggestionError::malformed("tags", "expected an array"));
                Vec::new()
            }
            None => Vec::new(),
        };

        bundle.confidence = match field(value, &["confidence", "action_confidence", "actionConfidence"]) {
            Some(v) => match v.as_f64() {
                Some(c) => Some(clamp_unit(c)),
                None => {
                    issues.push(SuggestionError::malformed("confidence", "expected a number"));
                    None
                }
            },
            None => {
                issues.push(SuggestionError::malformed("confidence", "missing"));
                None
            }
        };

        bundle.emotional_context = match field(value, &["emotional_context", "emotionalContext"]) {
            Some(v) => serde_json::from_value(v.clone()).unwrap_or_else(|e| {
                issues.push(SuggestionError::malformed("emotional_context", format!("{e}")));
                EmotionalContext::default()
            }),
            None => EmotionalContext::default(),
        };

        bundle.requires_focus = match field(value, &["requires_focus", "requiresFocus"]) {
            Some(Value::Bool(b)) => *b,
            Some(_) => {
                issues.push(SuggestionError::malformed("requires_focus", "expected a boolean"));
                false
            }
            None => false,
        };

        bundle.complexity_level = match field(value, &["complexity_level", "complexityLevel"]) {
            Some(Value::String(s)) => s.parse().unwrap_or_else(|e: String| {
                issues.push(SuggestionError::malformed("complexity_level", e));
                ComplexityLevel::default()
            }),
            Some(_) => {
                issues.push(SuggestionError::malformed("complexity_level", "expected a string"));
                ComplexityLevel::default()
            }
            None => {
                issues.push(SuggestionError::malformed("complexity_level", "missing"));
                ComplexityLevel::default()
            }
        };

        ParsedSuggestion { bundle, issues }
    }

    /// Parse a raw payload, failing on the first malformed or missing field.
    pub fn from_value_strict(value: &Value) -> Result<Self, SuggestionError> {
        let parsed = Self::from_value(value, "");
        match parsed.issues.into_iter().next() {
            Some(issue) => Err(issue),
            None => Ok(parsed.bundle),
        }
    }
}

impl ParsedSuggestion {
    /// Log each issue and keep the degraded bundle.
    pub fn into_bundle_logged(self, service: &str) -> SuggestionBundle {
        for issue in &self.issues {
            warn!(service = %service, error = %issue, "Degraded suggestion field, using default");
        }
        self.bundle
    }
}

/// Inference collaborator: raw capture text in, suggestion bundle out.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Service name for logging.
    fn name(&self) -> &str;

    /// Suggest task fields for the given text.
    async fn suggest(&self, source: SourceType, text: &str) -> Result<SuggestionBundle, CollaboratorError>;
}

/// Returns the same canned bundle for every request.
///
/// Used offline and in tests.
pub struct StaticInferenceService {
    bundle: SuggestionBundle,
}

impl StaticInferenceService {
    pub fn new(bundle: SuggestionBundle) -> Self {
        Self { bundle }
    }

    /// Canned bundle parsed leniently from JSON.
    pub fn from_value(value: &Value) -> Self {
        Self::new(SuggestionBundle::from_value(value, "").into_bundle_logged("static"))
    }
}

#[async_trait]
impl InferenceService for StaticInferenceService {
    fn name(&self) -> &str {
        "static"
    }

    async fn suggest(&self, _source: SourceType, _text: &str) -> Result<SuggestionBundle, CollaboratorError> {
        Ok(self.bundle.clone())
    }
}
