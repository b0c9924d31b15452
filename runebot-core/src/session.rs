//! AgentSession - the primary public API for the decision loop.
//!
//! One session owns one instance of every subsystem, keyed by session
//! name on disk. Each cycle is perceive -> decide -> (caller executes)
//! -> record, run to completion before the next cycle begins. Saves
//! are blocking write-throughs; if one fails the in-memory state stays
//! authoritative for the current cycle and the error is surfaced for
//! the caller to retry or log.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::events::{AgentEvent, EventSink, NullSink};
use crate::goals::{Goal, GoalTracker, ProgressUpdate, QuestGoal};
use crate::learning::death::{DeathHandler, RecoveryOutcome};
use crate::learning::outcome::{EmptyCandidates, OutcomeContext, OutcomeMemory};
use crate::learning::resilience::ResilienceTracker;
use crate::observation::Observation;
use crate::personality::PersonalityProfile;
use crate::selector::{
    ActionCategory, ActionSelector, Candidate, Decision, KnowledgeSource, NoKnowledge, Selection,
    SelectionError,
};
use crate::store::{
    unix_now, SessionStore, StoreError, GOALS_DOC, META_DOC, OUTCOMES_DOC, RESILIENCE_DOC,
    TUTORIAL_DOC,
};
use crate::tutorial::{TutorialProgress, TutorialSignal, TutorialState};

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("{0}")]
    EmptyCandidates(#[from] EmptyCandidates),
}

/// Configuration for creating or resuming a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Session name; also keys the on-disk store directory.
    pub session_name: String,

    /// Root directory for per-session stores.
    pub data_dir: PathBuf,

    /// Personality for this session.
    pub profile: PersonalityProfile,

    /// Seed for deterministic runs; `None` seeds from entropy.
    pub rng_seed: Option<u64>,
}

impl SessionConfig {
    pub fn new(session_name: impl Into<String>) -> Self {
        Self {
            session_name: session_name.into(),
            data_dir: PathBuf::from("state"),
            profile: PersonalityProfile::default(),
            rng_seed: None,
        }
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_profile(mut self, profile: PersonalityProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}

/// Identity written once when a session directory is first created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMeta {
    pub session_id: Uuid,
    pub session_name: String,
    pub created_at: u64,
}

impl SessionMeta {
    fn new(session_name: &str) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            session_name: session_name.to_string(),
            created_at: unix_now(),
        }
    }
}

/// One agent session: every subsystem instance, the store, and the
/// decision cycle that ties them together.
///
/// Sessions must have a single writer; the store does no locking.
pub struct AgentSession {
    meta: SessionMeta,
    store: SessionStore,
    outcomes: OutcomeMemory,
    resilience: ResilienceTracker,
    death_handler: DeathHandler,
    goals: GoalTracker,
    tutorial: TutorialProgress,
    selector: ActionSelector,
    knowledge: Box<dyn KnowledgeSource>,
    sink: Box<dyn EventSink>,
    rng: StdRng,
}

impl AgentSession {
    /// Create or resume a session. Missing or corrupt persisted state
    /// re-initializes the affected subsystem to its defaults.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let store = SessionStore::open(&config.data_dir, &config.session_name)?;

        let meta = match store.load_optional::<SessionMeta>(META_DOC) {
            Some(meta) => meta,
            None => {
                let meta = SessionMeta::new(&config.session_name);
                store.save(META_DOC, &meta)?;
                meta
            }
        };

        let outcomes = store.load_or_default(OUTCOMES_DOC);
        let mut resilience: ResilienceTracker = store.load_or_default(RESILIENCE_DOC);
        resilience.rebuild_avoided();
        let goals = store.load_or_default(GOALS_DOC);
        let tutorial_state: TutorialState = store
            .load_optional(TUTORIAL_DOC)
            .unwrap_or_default();
        let tutorial = TutorialProgress::from_state(tutorial_state);

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        debug!(session = %config.session_name, id = %meta.session_id, "session ready");
        Ok(Self {
            meta,
            store,
            outcomes,
            resilience,
            death_handler: DeathHandler::new(),
            goals,
            tutorial,
            selector: ActionSelector::new(config.profile),
            knowledge: Box::new(NoKnowledge),
            sink: Box::new(NullSink),
            rng,
        })
    }

    /// Subscribe an event sink.
    pub fn set_event_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sink = sink;
    }

    /// Plug in a knowledge collaborator.
    pub fn set_knowledge(&mut self, knowledge: Box<dyn KnowledgeSource>) {
        self.knowledge = knowledge;
    }

    /// Decide what to do for one observation.
    ///
    /// While onboarding is incomplete the tutorial drives the decision
    /// from its current objective; afterwards the personality-weighted
    /// selector takes over.
    pub fn decide(&mut self, observation: &Observation) -> Result<Selection, SessionError> {
        if !self.tutorial.is_complete() {
            if let Some(selection) = self.tutorial_decision(observation)? {
                return Ok(selection);
            }
        }

        let selection = self.selector.select(
            observation,
            &self.outcomes,
            &self.resilience,
            &self.goals,
            self.knowledge.as_ref(),
        )?;
        if let Selection::Chosen(decision) = &selection {
            self.sink.emit(&AgentEvent::DecisionMade {
                action: decision.candidate.name.clone(),
                confidence: decision.confidence,
                reasoning: decision.reasoning.clone(),
            });
        }
        Ok(selection)
    }

    /// Record the outcome of the action the caller executed.
    pub fn record_outcome(
        &mut self,
        action: &str,
        success: bool,
        reward: f64,
        context: OutcomeContext,
    ) -> Result<(), SessionError> {
        self.outcomes.record(action, success, context.clone());
        self.resilience
            .log_decision_outcome(action, success, reward, context.clone());
        let blended = self.resilience.score(action, context.location.as_deref());
        self.resilience.update_confidence(action, blended);

        self.sink.emit(&AgentEvent::OutcomeRecorded {
            action: action.to_string(),
            success,
            reward,
        });

        self.store.save(OUTCOMES_DOC, &self.outcomes)?;
        self.store.save(RESILIENCE_DOC, &self.resilience)?;
        Ok(())
    }

    /// Record an ordered run of actions that paid off together.
    pub fn record_success_chain(
        &mut self,
        actions: Vec<String>,
        total_reward: f64,
    ) -> Result<(), SessionError> {
        self.resilience.add_success_chain(actions, total_reward);
        self.store.save(RESILIENCE_DOC, &self.resilience)?;
        Ok(())
    }

    /// Handle a death the caller observed.
    pub fn report_death(
        &mut self,
        location: &str,
        equipment: Vec<String>,
        reason: &str,
    ) -> Result<RecoveryOutcome, SessionError> {
        let gated_before = self.resilience.avoid_list().len();
        let outcome =
            self.death_handler
                .handle_death(&mut self.resilience, location, equipment, reason);

        self.sink.emit(&AgentEvent::DeathLogged {
            location: location.to_string(),
            reason: reason.to_string(),
        });
        if self.resilience.avoid_list().len() > gated_before {
            self.sink.emit(&AgentEvent::LocationAvoided {
                location: location.to_string(),
            });
        }

        self.store.save(RESILIENCE_DOC, &self.resilience)?;
        Ok(outcome)
    }

    /// Track a new goal.
    pub fn add_goal(&mut self, goal: Goal) -> Result<(), SessionError> {
        self.goals.add_goal(goal);
        self.store.save(GOALS_DOC, &self.goals)?;
        Ok(())
    }

    /// Track a quest as immediately active.
    pub fn add_quest(&mut self, quest: QuestGoal) -> Result<(), SessionError> {
        self.goals.add_quest(quest);
        self.store.save(GOALS_DOC, &self.goals)?;
        Ok(())
    }

    /// Update a goal's progress (fraction in `[0, 1]`).
    pub fn update_goal_progress(
        &mut self,
        name: &str,
        progress: f64,
    ) -> Result<ProgressUpdate, SessionError> {
        let update = self.goals.update_goal_progress(name, progress);
        if let ProgressUpdate::Completed { name } = &update {
            self.sink.emit(&AgentEvent::GoalCompleted { name: name.clone() });
        }
        self.store.save(GOALS_DOC, &self.goals)?;
        Ok(update)
    }

    /// Update an active quest's progress (fraction in `[0, 1]`).
    pub fn update_quest_progress(
        &mut self,
        name: &str,
        progress: f64,
    ) -> Result<ProgressUpdate, SessionError> {
        let update = self.goals.update_quest_progress(name, progress);
        if let ProgressUpdate::Completed { name } = &update {
            self.sink
                .emit(&AgentEvent::QuestCompleted { name: name.clone() });
        }
        self.store.save(GOALS_DOC, &self.goals)?;
        Ok(update)
    }

    pub fn session_id(&self) -> Uuid {
        self.meta.session_id
    }

    pub fn outcomes(&self) -> &OutcomeMemory {
        &self.outcomes
    }

    pub fn resilience(&self) -> &ResilienceTracker {
        &self.resilience
    }

    pub fn goals(&self) -> &GoalTracker {
        &self.goals
    }

    pub fn tutorial(&self) -> &TutorialProgress {
        &self.tutorial
    }

    pub fn death_handler(&self) -> &DeathHandler {
        &self.death_handler
    }

    /// Drive the tutorial against the observed text. Returns `None`
    /// when the tutorial finished and the selector should take over.
    fn tutorial_decision(
        &mut self,
        observation: &Observation,
    ) -> Result<Option<Selection>, SessionError> {
        let signal = self.tutorial.process(&observation.text);
        match &signal {
            TutorialSignal::StepComplete { completed, .. } => {
                self.sink.emit(&AgentEvent::StepCompleted {
                    step: completed.clone(),
                });
                if self.tutorial.is_complete() {
                    self.sink.emit(&AgentEvent::TutorialCompleted);
                }
            }
            TutorialSignal::ContinueStep { .. } => {
                if let Some(step) = self.tutorial.current_step() {
                    self.sink.emit(&AgentEvent::ObjectiveAdvanced {
                        step: step.name.clone(),
                        objective_index: self.tutorial.state().current_objective_index,
                    });
                }
            }
            TutorialSignal::SuggestObjective { .. } | TutorialSignal::Complete => {}
        }
        self.store.save(TUTORIAL_DOC, self.tutorial.state())?;

        if self.tutorial.is_complete() {
            return Ok(None);
        }

        let step = self.tutorial.current_step().map(|s| s.name.clone());
        let objective = self.tutorial.current_objective().map(str::to_string);
        let choice = self.outcomes.best_action_with_rng(
            &observation.candidate_actions,
            step.as_deref(),
            objective.as_deref(),
            &mut self.rng,
        )?;

        let reasoning = match &objective {
            Some(objective) => format!("tutorial objective: {objective}"),
            None => "tutorial".to_string(),
        };
        let candidate = Candidate::new(choice.action.clone(), ActionCategory::General)
            .with_location(observation.location.clone());

        self.sink.emit(&AgentEvent::DecisionMade {
            action: choice.action.clone(),
            confidence: choice.confidence,
            reasoning: reasoning.clone(),
        });

        Ok(Some(Selection::Chosen(Decision {
            candidate,
            confidence: choice.confidence,
            reasoning,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::personality::PlayStyle;
    use crate::testing::RecordingSink;
    use tempfile::TempDir;

    fn config(dir: &TempDir, name: &str) -> SessionConfig {
        SessionConfig::new(name)
            .with_data_dir(dir.path())
            .with_rng_seed(42)
            .with_profile(
                PersonalityProfile::new("tester").with_styles(vec![PlayStyle::CasualSkiller]),
            )
    }

    #[test]
    fn test_session_id_is_stable_across_reopen() {
        let dir = TempDir::new().unwrap();
        let first = AgentSession::new(config(&dir, "stable")).unwrap();
        let id = first.session_id();
        drop(first);

        let second = AgentSession::new(config(&dir, "stable")).unwrap();
        assert_eq!(second.session_id(), id);
    }

    #[test]
    fn test_tutorial_drives_early_decisions() {
        let dir = TempDir::new().unwrap();
        let mut session = AgentSession::new(config(&dir, "tut")).unwrap();

        let obs = Observation::new("An island welcome.")
            .with_location("Tutorial Island")
            .with_candidates(vec![
                "Talk to the Survival Expert".to_string(),
                "Wander off".to_string(),
            ]);

        let selection = session.decide(&obs).unwrap();
        let Selection::Chosen(decision) = selection else {
            panic!("expected a chosen action");
        };
        assert!(decision.reasoning.starts_with("tutorial objective:"));
    }

    #[test]
    fn test_empty_candidates_fail_loudly_during_tutorial() {
        let dir = TempDir::new().unwrap();
        let mut session = AgentSession::new(config(&dir, "loud")).unwrap();

        let obs = Observation::new("nothing to do").with_location("Tutorial Island");
        let result = session.decide(&obs);
        assert!(matches!(result, Err(SessionError::EmptyCandidates(_))));
    }

    #[test]
    fn test_record_outcome_updates_confidence_and_persists() {
        let dir = TempDir::new().unwrap();
        let mut session = AgentSession::new(config(&dir, "learn")).unwrap();

        let context = OutcomeContext::at_step("survival_expert_intro")
            .with_location("Tutorial Island");
        session
            .record_outcome("Talk to the Survival Expert", true, 10.0, context)
            .unwrap();

        assert_eq!(
            session.outcomes().history("Talk to the Survival Expert").len(),
            1
        );
        let confidence = session
            .resilience()
            .action_confidence("Talk to the Survival Expert");
        assert!(confidence > 0.5);

        // A fresh session over the same store sees the same history.
        drop(session);
        let reopened = AgentSession::new(config(&dir, "learn")).unwrap();
        assert_eq!(
            reopened.outcomes().history("Talk to the Survival Expert").len(),
            1
        );
    }

    #[test]
    fn test_death_events_and_gating() {
        let dir = TempDir::new().unwrap();
        let mut session = AgentSession::new(config(&dir, "deaths")).unwrap();
        let sink = RecordingSink::default();
        session.set_event_sink(Box::new(sink.clone()));

        let outcome = session
            .report_death("Lava Maze", vec!["rune_scimitar".to_string()], "too weak")
            .unwrap();
        assert!(!outcome.recovered);

        let events = sink.events();
        assert!(events
            .iter()
            .any(|e| matches!(e, AgentEvent::DeathLogged { location, .. } if location == "Lava Maze")));
        assert!(events
            .iter()
            .any(|e| matches!(e, AgentEvent::LocationAvoided { location } if location == "Lava Maze")));
    }

    #[test]
    fn test_goal_completion_emits_once() {
        let dir = TempDir::new().unwrap();
        let mut session = AgentSession::new(config(&dir, "goals")).unwrap();
        let sink = RecordingSink::default();
        session.set_event_sink(Box::new(sink.clone()));

        session
            .add_goal(Goal::new(
                "Complete Tutorial Island",
                "Learn the basics",
                crate::goals::GoalKind::ShortTerm,
            ))
            .unwrap();

        session
            .update_goal_progress("Complete Tutorial Island", 1.0)
            .unwrap();
        session
            .update_goal_progress("Complete Tutorial Island", 1.0)
            .unwrap();

        let completions = sink
            .events()
            .iter()
            .filter(|e| matches!(e, AgentEvent::GoalCompleted { .. }))
            .count();
        assert_eq!(completions, 1);
    }
}
