//! Emotional/attention context and the discrete labels the inference
//! collaborator attaches to a capture.

use serde::{Deserialize, Serialize};

/// Priority label suggested by the inference collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedPriority {
    Important,
    Simple,
    #[default]
    Later,
}

impl SuggestedPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Important => "important",
            Self::Simple => "simple",
            Self::Later => "later",
        }
    }
}

impl std::fmt::Display for SuggestedPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SuggestedPriority {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "important" => Ok(Self::Important),
            "simple" => Ok(Self::Simple),
            "later" => Ok(Self::Later),
            other => Err(format!("Unknown priority: {other}")),
        }
    }
}

/// How much effort a capture looks like it needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Simple,
    #[default]
    Moderate,
    Complex,
}

impl ComplexityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
        }
    }
}

impl std::fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ComplexityLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "moderate" => Ok(Self::Moderate),
            "complex" => Ok(Self::Complex),
            other => Err(format!("Unknown complexity level: {other}")),
        }
    }
}

/// Attention-state indicators inferred from the capture text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdhdIndicators {
    /// The user appears to be deep in a focus session.
    #[serde(alias = "hyperfocusState")]
    pub hyperfocus_state: bool,
    /// Text jumps between unrelated topics.
    #[serde(alias = "taskSwitching")]
    pub task_switching: bool,
    /// Signs of losing track of time or deadlines.
    #[serde(alias = "timeBlindness")]
    pub time_blindness: bool,
}

/// Handling recommendations from the inference collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recommendations {
    #[serde(alias = "suggestBreak")]
    pub suggest_break: bool,
    #[serde(alias = "provideEncouragement")]
    pub provide_encouragement: bool,
    #[serde(alias = "simplifyLanguage")]
    pub simplify_language: bool,
}

/// Emotional analysis attached to a capture.
///
/// Every field defaults to "no signal" so a partial analysis deserializes
/// cleanly. camelCase keys are accepted on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionalContext {
    #[serde(alias = "isOverwhelmed")]
    pub is_overwhelmed: bool,
    #[serde(alias = "needsTaskBreakdown")]
    pub needs_task_breakdown: bool,
    #[serde(alias = "adhdIndicators")]
    pub adhd_indicators: AdhdIndicators,
    pub recommendations: Recommendations,
}
