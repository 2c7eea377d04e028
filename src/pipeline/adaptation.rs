//! ADHD adaptation layer: turns scored signals into handling guidance.
//!
//! Two outputs:
//! - breakdown hints, emitted only when the candidate should be simplified,
//!   in a fixed order
//! - a recommended action time, chosen by a strict first-match cascade
//!
//! Deterministic given the same signals and `now`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::capture::emotional::ComplexityLevel;
use crate::capture::model::EmailCapture;
use crate::pipeline::scoring::CandidateScore;
use crate::pipeline::types::CandidateSignals;

/// One line of breakdown guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakdownHint {
    #[serde(rename = "schedule focused time")]
    ScheduleFocusedTime,
    #[serde(rename = "break into sub-tasks")]
    BreakIntoSubTasks,
    #[serde(rename = "take a break first")]
    TakeBreakFirst,
    #[serde(rename = "start with the easiest part")]
    StartWithEasiestPart,
}

impl BreakdownHint {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ScheduleFocusedTime => "schedule focused time",
            Self::BreakIntoSubTasks => "break into sub-tasks",
            Self::TakeBreakFirst => "take a break first",
            Self::StartWithEasiestPart => "start with the easiest part",
        }
    }
}

impl std::fmt::Display for BreakdownHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// When the user should act on a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionTime {
    #[serde(rename = "when feeling calmer")]
    WhenCalmer,
    #[serde(rename = "during current focus session")]
    DuringFocusSession,
    #[serde(rename = "within 2 hours")]
    WithinTwoHours,
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "this week")]
    ThisWeek,
    #[serde(rename = "when energy allows")]
    WhenEnergyAllows,
}

impl ActionTime {
    pub fn label(&self) -> &'static str {
        match self {
            Self::WhenCalmer => "when feeling calmer",
            Self::DuringFocusSession => "during current focus session",
            Self::WithinTwoHours => "within 2 hours",
            Self::Today => "today",
            Self::ThisWeek => "this week",
            Self::WhenEnergyAllows => "when energy allows",
        }
    }
}

impl std::fmt::Display for ActionTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// User-facing guidance for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adaptation {
    pub simplify: bool,
    pub breakdown: Vec<BreakdownHint>,
    pub recommended_action_time: ActionTime,
}

/// Breakdown hints in fixed order. Empty unless `should_simplify`.
pub fn breakdown_suggestions(signals: &CandidateSignals, should_simplify: bool) -> Vec<BreakdownHint> {
    if !should_simplify {
        return Vec::new();
    }
    let recommendations = &signals.emotional_context.recommendations;
    [
        (signals.requires_focus, BreakdownHint::ScheduleFocusedTime),
        (
            signals.complexity == ComplexityLevel::Complex,
            BreakdownHint::BreakIntoSubTasks,
        ),
        (recommendations.suggest_break, BreakdownHint::TakeBreakFirst),
        (
            recommendations.provide_encouragement,
            BreakdownHint::StartWithEasiestPart,
        ),
    ]
    .into_iter()
    .filter_map(|(fires, hint)| fires.then_some(hint))
    .collect()
}

/// First matching rule wins:
/// overwhelmed → focus + hyperfocus → urgent → due ≤ 1 day → due ≤ 3 days → default.
///
/// Due-date windows are inclusive and measured from `now`; overdue items land
/// in "today".
pub fn recommended_action_time(signals: &CandidateSignals, now: DateTime<Utc>) -> ActionTime {
    let emotional = &signals.emotional_context;
    if emotional.is_overwhelmed {
        return ActionTime::WhenCalmer;
    }
    if signals.requires_focus && emotional.adhd_indicators.hyperfocus_state {
        return ActionTime::DuringFocusSession;
    }
    if signals.is_urgent {
        return ActionTime::WithinTwoHours;
    }
    if let Some(due) = signals.suggested_due_date {
        let until_due = due - now;
        if until_due <= Duration::days(1) {
            return ActionTime::Today;
        }
        if until_due <= Duration::days(3) {
            return ActionTime::ThisWeek;
        }
    }
    ActionTime::WhenEnergyAllows
}

/// Full adaptation for a scored candidate.
pub fn adapt(signals: &CandidateSignals, score: &CandidateScore, now: DateTime<Utc>) -> Adaptation {
    Adaptation {
        simplify: score.should_simplify,
        breakdown: breakdown_suggestions(signals, score.should_simplify),
        recommended_action_time: recommended_action_time(signals, now),
    }
}

impl EmailCapture {
    /// Breakdown hints for this email.
    pub fn breakdown_suggestions(&self) -> Vec<BreakdownHint> {
        let signals = CandidateSignals::from_email(self);
        breakdown_suggestions(&signals, self.should_simplify())
    }

    /// Recommended action time for this email.
    pub fn recommended_action_time(&self, now: DateTime<Utc>) -> ActionTime {
        recommended_action_time(&CandidateSignals::from_email(self), now)
    }
}
