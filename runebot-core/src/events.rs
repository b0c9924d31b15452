//! Typed events emitted by the decision loop.
//!
//! The core performs no human-facing text formatting; a separate
//! narrative component subscribes through an [`EventSink`] and renders
//! these however it likes.

use serde::{Deserialize, Serialize};

/// A discrete, structured event from one decision cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentEvent {
    /// An action was chosen.
    DecisionMade {
        action: String,
        confidence: f64,
        reasoning: String,
    },

    /// An executed action's outcome was recorded.
    OutcomeRecorded {
        action: String,
        success: bool,
        reward: f64,
    },

    /// A death was logged.
    DeathLogged { location: String, reason: String },

    /// A location was gated behind retry requirements.
    LocationAvoided { location: String },

    /// A goal crossed its completion threshold.
    GoalCompleted { name: String },

    /// A quest moved from active to completed.
    QuestCompleted { name: String },

    /// A tutorial objective was matched and the index advanced.
    ObjectiveAdvanced { step: String, objective_index: usize },

    /// A tutorial step finished all its objectives.
    StepCompleted { step: String },

    /// Every tutorial step is complete.
    TutorialCompleted,
}

/// Receiver for agent events. Implementations must not block the
/// decision cycle.
pub trait EventSink {
    fn emit(&self, event: &AgentEvent);
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &AgentEvent) {}
}
