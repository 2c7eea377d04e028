//! Configuration types.

use crate::error::ConfigError;

/// Default minimum relevance score for a Drive file to count as task-relevant.
pub const DEFAULT_RELEVANCE_THRESHOLD: f64 = 0.5;

/// Default action confidence above which an email is surfaced as high priority.
pub const DEFAULT_HIGH_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Default number of items requested from a source fetcher.
pub const DEFAULT_FETCH_LIMIT: usize = 10;

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Drive files scoring at or above this are task-relevant.
    pub relevance_threshold: f64,
    /// Emails whose clamped action confidence is strictly above this are high priority.
    pub high_confidence_threshold: f64,
    /// Fetch limit used when a caller does not pass one.
    pub default_fetch_limit: usize,
    /// Length of content previews on annotated candidates.
    pub preview_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
            high_confidence_threshold: DEFAULT_HIGH_CONFIDENCE_THRESHOLD,
            default_fetch_limit: DEFAULT_FETCH_LIMIT,
            preview_chars: 150,
        }
    }
}

impl PipelineConfig {
    /// Build a config from `CAPTURE_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("CAPTURE_RELEVANCE_THRESHOLD") {
            config.relevance_threshold = parse_unit("CAPTURE_RELEVANCE_THRESHOLD", &raw)?;
        }
        if let Some(raw) = lookup("CAPTURE_HIGH_CONFIDENCE") {
            config.high_confidence_threshold = parse_unit("CAPTURE_HIGH_CONFIDENCE", &raw)?;
        }
        if let Some(raw) = lookup("CAPTURE_FETCH_LIMIT") {
            config.default_fetch_limit = parse_count("CAPTURE_FETCH_LIMIT", &raw)?;
        }
        if let Some(raw) = lookup("CAPTURE_PREVIEW_CHARS") {
            config.preview_chars = parse_count("CAPTURE_PREVIEW_CHARS", &raw)?;
        }

        Ok(config)
    }

    /// Resolve an optional caller-supplied fetch limit.
    pub fn fetch_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_fetch_limit)
    }
}

/// Parse a value that must lie in [0.0, 1.0].
fn parse_unit(key: &str, raw: &str) -> Result<f64, ConfigError> {
    let value: f64 = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("{e}"),
    })?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{value} is outside [0, 1]"),
        });
    }
    Ok(value)
}

/// Parse a positive count.
fn parse_count(key: &str, raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than zero".into(),
        }),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{e}"),
        }),
    }
}
