//! The learning half of the decision loop: per-action outcome memory,
//! resilience tracking, and the death policy built on top of it.

pub mod death;
pub mod outcome;
pub mod resilience;

pub use death::{DeathHandler, RecoveryOutcome, RecoveryPolicy, UnmodeledRecovery};
pub use outcome::{
    ActionChoice, ActionOutcome, ActionStats, EmptyCandidates, OutcomeContext, OutcomeMemory,
    EXPLORATION_CONFIDENCE, MAX_OUTCOMES,
};
pub use resilience::{
    AvoidListEntry, DeathLogEntry, DecisionOutcome, ResilienceTracker, RetryCheck, StatRequirement,
    SuccessChain,
};
