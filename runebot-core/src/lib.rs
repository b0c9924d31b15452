//! Decision and learning core for an autonomous game-playing agent.
//!
//! This crate provides:
//! - Bounded per-action outcome memory with recency-weighted scoring
//!   and exploration/exploitation control
//! - Resilience tracking with an avoid list gated behind stat
//!   requirements, plus the death policy built on it
//! - Goal and quest tracking with exactly-once completion transitions
//! - A personality-weighted candidate-action selector
//! - A strictly linear onboarding state machine
//!
//! Everything hangs off an [`AgentSession`], one per game session, with
//! a write-through JSON store per session. Perception, execution,
//! knowledge search, and narration are external collaborators.
//!
//! # Quick Start
//!
//! ```no_run
//! use runebot_core::{AgentSession, Observation, OutcomeContext, SessionConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::new("MyAgent");
//!     let mut session = AgentSession::new(config)?;
//!
//!     let observation = Observation::new("Welcome to the island!")
//!         .with_location("Tutorial Island")
//!         .with_candidates(vec!["Talk to the Survival Expert".to_string()]);
//!
//!     let _selection = session.decide(&observation)?;
//!     // ... caller executes the chosen action ...
//!     session.record_outcome(
//!         "Talk to the Survival Expert",
//!         true,
//!         10.0,
//!         OutcomeContext::at_step("survival_expert_intro"),
//!     )?;
//!     Ok(())
//! }
//! ```

pub mod events;
pub mod goals;
pub mod learning;
pub mod observation;
pub mod personality;
pub mod selector;
pub mod session;
pub mod store;
pub mod testing;
pub mod tutorial;

// Primary public API
pub use events::{AgentEvent, EventSink, NullSink};
pub use goals::{progress_from_percent, Goal, GoalKind, GoalTracker, ProgressUpdate, QuestGoal};
pub use learning::{
    ActionChoice, ActionOutcome, ActionStats, DeathHandler, OutcomeContext, OutcomeMemory,
    RecoveryOutcome, RecoveryPolicy, ResilienceTracker, RetryCheck, StatRequirement,
};
pub use observation::Observation;
pub use personality::{PersonalityProfile, PersonalityWeights, PlayStyle, QuestStrategy};
pub use selector::{
    ActionCategory, ActionSelector, Candidate, Decision, KnowledgeHit, KnowledgeSource,
    NoKnowledge, RestrictionPolicy, Selection, SelectionError,
};
pub use session::{AgentSession, SessionConfig, SessionError};
pub use store::{SessionStore, StoreError};
pub use testing::{RecordingSink, StaticKnowledge};
pub use tutorial::{
    ObjectiveMatcher, TutorialProgress, TutorialSignal, TutorialState, TutorialStep,
    TUTORIAL_SCRIPT,
};
