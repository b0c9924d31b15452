//! Bounded per-action outcome memory with recency-weighted scoring.
//!
//! Every executed action's outcome is appended to a bounded FIFO
//! history (at most [`MAX_OUTCOMES`] per action). Scoring blends the
//! recent success rate with the overall rate, rewards context matches,
//! and penalizes repetition so the agent keeps moving instead of
//! farming one successful action.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::store::unix_now;

/// Maximum retained outcomes per action; older entries are evicted
/// first-in-first-out.
pub const MAX_OUTCOMES: usize = 10;

/// Confidence reported whenever the exploration branch fires.
pub const EXPLORATION_CONFIDENCE: f64 = 0.3;

/// Window of most recent outcomes weighted more heavily.
const RECENT_WINDOW: usize = 3;

/// Score given to candidates with no recorded history.
const NEUTRAL_SCORE: f64 = 50.0;

/// Floor applied after bonuses and penalties.
const MIN_SCORE: f64 = 10.0;

const STEP_MATCH_BONUS: f64 = 50.0;
const OBJECTIVE_MATCH_BONUS: f64 = 100.0;
const STEP_SUCCESS_BONUS: f64 = 30.0;
const RECENT_FAILURE_PENALTY: f64 = 20.0;
const REPEAT_SUCCESS_PENALTY: f64 = 200.0;
const STAGNATION_ATTEMPTS: usize = 3;
const STAGNATION_PENALTY_STEP: f64 = 20.0;
const STAGNATION_PENALTY_CAP: f64 = 100.0;

const DEFAULT_EXPLORATION_RATE: f64 = 0.1;
const POST_SUCCESS_EXPLORATION_RATE: f64 = 0.3;

/// The situation an outcome was recorded in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeContext {
    /// Tutorial step or activity phase the action ran under.
    pub step: Option<String>,

    /// Objective being pursued at the time.
    pub objective: Option<String>,

    /// Where the action was attempted.
    pub location: Option<String>,
}

impl OutcomeContext {
    /// Context carrying only a step name.
    pub fn at_step(step: impl Into<String>) -> Self {
        Self {
            step: Some(step.into()),
            ..Self::default()
        }
    }

    /// Set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the objective.
    pub fn with_objective(mut self, objective: impl Into<String>) -> Self {
        self.objective = Some(objective.into());
        self
    }
}

/// One recorded outcome for an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub context: OutcomeContext,
    pub timestamp: u64,
}

/// Aggregate statistics for one action's history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionStats {
    pub attempts: usize,
    pub successes: usize,
    pub failures: usize,
    pub success_rate: f64,
}

/// The chosen action with the memory's confidence in it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionChoice {
    pub action: String,
    pub confidence: f64,
    /// True when this pick came from the exploration branch.
    pub explored: bool,
}

/// Selecting from an empty candidate list is a caller precondition
/// violation, reported loudly rather than papered over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("candidate action list is empty")]
pub struct EmptyCandidates;

/// Bounded per-action outcome history and best-action scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeMemory {
    history: BTreeMap<String, Vec<ActionOutcome>>,
    exploration_rate: f64,
    post_success_exploration_rate: f64,
}

impl Default for OutcomeMemory {
    fn default() -> Self {
        Self {
            history: BTreeMap::new(),
            exploration_rate: DEFAULT_EXPLORATION_RATE,
            post_success_exploration_rate: POST_SUCCESS_EXPLORATION_RATE,
        }
    }
}

impl OutcomeMemory {
    /// Create an empty memory with default exploration rates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the exploration rates (base, and after a success).
    pub fn set_exploration_rates(&mut self, base: f64, after_success: f64) {
        self.exploration_rate = base.clamp(0.0, 1.0);
        self.post_success_exploration_rate = after_success.clamp(0.0, 1.0);
    }

    /// Record an outcome, evicting the oldest entry once the per-action
    /// history exceeds [`MAX_OUTCOMES`].
    pub fn record(&mut self, action: &str, success: bool, context: OutcomeContext) {
        let outcomes = self.history.entry(action.to_string()).or_default();
        outcomes.push(ActionOutcome {
            success,
            context,
            timestamp: unix_now(),
        });
        while outcomes.len() > MAX_OUTCOMES {
            outcomes.remove(0);
        }
    }

    /// Recorded outcomes for an action, oldest first.
    pub fn history(&self, action: &str) -> &[ActionOutcome] {
        self.history.get(action).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Aggregate statistics for an action, if it has any history.
    pub fn stats(&self, action: &str) -> Option<ActionStats> {
        let outcomes = self.history.get(action)?;
        if outcomes.is_empty() {
            return None;
        }
        let attempts = outcomes.len();
        let successes = outcomes.iter().filter(|o| o.success).count();
        Some(ActionStats {
            attempts,
            successes,
            failures: attempts - successes,
            success_rate: successes as f64 / attempts as f64,
        })
    }

    /// First candidate (in list order) whose most recent outcome was a
    /// success.
    pub fn last_successful<'a>(&self, candidates: &'a [String]) -> Option<&'a str> {
        candidates
            .iter()
            .find(|c| {
                self.history
                    .get(c.as_str())
                    .and_then(|outcomes| outcomes.last())
                    .map(|o| o.success)
                    .unwrap_or(false)
            })
            .map(String::as_str)
    }

    /// Score one candidate against the current step and objective.
    ///
    /// Candidates without history keep a neutral score; bonuses and
    /// penalties only apply once at least one outcome is recorded.
    pub fn score_action(
        &self,
        action: &str,
        last_successful: Option<&str>,
        current_step: Option<&str>,
        current_objective: Option<&str>,
    ) -> f64 {
        let outcomes = match self.history.get(action) {
            Some(outcomes) if !outcomes.is_empty() => outcomes,
            _ => return NEUTRAL_SCORE,
        };

        let attempts = outcomes.len();
        let successes = outcomes.iter().filter(|o| o.success).count();
        let recent = &outcomes[attempts.saturating_sub(RECENT_WINDOW)..];
        let recent_successes = recent.iter().filter(|o| o.success).count();

        let overall_rate = successes as f64 / attempts as f64;
        let recent_rate = recent_successes as f64 / recent.len() as f64;
        let base = (recent_rate * 0.7 + overall_rate * 0.3) * 100.0;

        let mut bonuses = 0.0;
        let name = action.to_lowercase();
        if let Some(step) = current_step {
            if !step.is_empty() && name.contains(&step.to_lowercase()) {
                bonuses += STEP_MATCH_BONUS;
            }
            let step_successes = outcomes
                .iter()
                .filter(|o| o.success && o.context.step.as_deref() == Some(step))
                .count();
            bonuses += step_successes as f64 * STEP_SUCCESS_BONUS;
        }
        if let Some(objective) = current_objective {
            if !objective.is_empty() && name.contains(&objective.to_lowercase()) {
                bonuses += OBJECTIVE_MATCH_BONUS;
            }
        }

        let mut penalties = 0.0;
        let recent_failures = recent.len() - recent_successes;
        penalties += recent_failures as f64 * RECENT_FAILURE_PENALTY;
        if last_successful == Some(action) {
            penalties += REPEAT_SUCCESS_PENALTY;
        }
        if attempts > STAGNATION_ATTEMPTS {
            penalties += (attempts as f64 * STAGNATION_PENALTY_STEP).min(STAGNATION_PENALTY_CAP);
        }

        (base + bonuses - penalties).max(MIN_SCORE)
    }

    /// Pick the best candidate for the current step and objective,
    /// drawing randomness from the thread RNG.
    pub fn best_action(
        &self,
        candidates: &[String],
        current_step: Option<&str>,
        current_objective: Option<&str>,
    ) -> Result<ActionChoice, EmptyCandidates> {
        self.best_action_with_rng(
            candidates,
            current_step,
            current_objective,
            &mut rand::thread_rng(),
        )
    }

    /// Pick the best candidate using a caller-supplied RNG.
    ///
    /// Exploitation returns the max-scoring candidate, ties broken by
    /// first-seen candidate order. Exploration (base rate, raised after
    /// a success) returns a uniform pick excluding the last successful
    /// action, always at [`EXPLORATION_CONFIDENCE`].
    pub fn best_action_with_rng<R: Rng>(
        &self,
        candidates: &[String],
        current_step: Option<&str>,
        current_objective: Option<&str>,
        rng: &mut R,
    ) -> Result<ActionChoice, EmptyCandidates> {
        if candidates.is_empty() {
            return Err(EmptyCandidates);
        }

        let last_successful = self.last_successful(candidates);

        let rate = if last_successful.is_some() {
            self.post_success_exploration_rate
        } else {
            self.exploration_rate
        };
        if rng.gen::<f64>() < rate {
            let pool: Vec<&String> = candidates
                .iter()
                .filter(|c| Some(c.as_str()) != last_successful)
                .collect();
            let action = if pool.is_empty() {
                candidates[rng.gen_range(0..candidates.len())].clone()
            } else {
                pool[rng.gen_range(0..pool.len())].clone()
            };
            return Ok(ActionChoice {
                action,
                confidence: EXPLORATION_CONFIDENCE,
                explored: true,
            });
        }

        let scores: Vec<f64> = candidates
            .iter()
            .map(|c| self.score_action(c, last_successful, current_step, current_objective))
            .collect();

        // Strict greater-than keeps the first-seen candidate on ties.
        let mut best = 0;
        for (i, score) in scores.iter().enumerate() {
            if *score > scores[best] {
                best = i;
            }
        }

        let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = scores.iter().cloned().fold(f64::INFINITY, f64::min);
        let confidence = if max > min {
            0.1 + 0.8 * (scores[best] - min) / (max - min)
        } else {
            0.5
        };

        Ok(ActionChoice {
            action: candidates[best].clone(),
            confidence,
            explored: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_history_is_bounded() {
        let mut memory = OutcomeMemory::new();
        for i in 0..25 {
            memory.record("Chop Tree", i % 2 == 0, OutcomeContext::default());
        }
        assert_eq!(memory.history("Chop Tree").len(), MAX_OUTCOMES);
    }

    #[test]
    fn test_eviction_keeps_most_recent() {
        let mut memory = OutcomeMemory::new();
        for i in 0..15 {
            let context = OutcomeContext::at_step(format!("step_{i}"));
            memory.record("Fish", true, context);
        }
        let history = memory.history("Fish");
        assert_eq!(history[0].context.step.as_deref(), Some("step_5"));
        assert_eq!(history[9].context.step.as_deref(), Some("step_14"));
    }

    #[test]
    fn test_fresh_candidates_tie_at_neutral() {
        let mut memory = OutcomeMemory::new();
        memory.set_exploration_rates(0.0, 0.0);

        let candidates = strings(&["Talk to Guide", "Chop Tree"]);
        let choice = memory.best_action(&candidates, None, None).unwrap();

        assert_eq!(choice.action, "Talk to Guide");
        assert_eq!(choice.confidence, 0.5);
        assert!(!choice.explored);
    }

    #[test]
    fn test_empty_candidates_is_an_error() {
        let memory = OutcomeMemory::new();
        assert_eq!(
            memory.best_action(&[], None, None),
            Err(EmptyCandidates)
        );
    }

    #[test]
    fn test_weighted_score_formula() {
        let mut memory = OutcomeMemory::new();
        let context = OutcomeContext::at_step("mining");
        memory.record("Mine Copper", true, context.clone());
        memory.record("Mine Copper", true, context.clone());
        memory.record("Mine Copper", false, context.clone());
        memory.record("Mine Copper", true, context);

        // recent (last 3) = 2/3, overall = 3/4, three successes share
        // the "mining" step, one recent failure, four attempts total.
        let expected = (0.7 * (2.0 / 3.0) + 0.3 * 0.75) * 100.0
            + 3.0 * STEP_SUCCESS_BONUS
            - RECENT_FAILURE_PENALTY
            - (4.0 * STAGNATION_PENALTY_STEP);
        let score = memory.score_action("Mine Copper", None, Some("mining"), None);
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_repeat_success_penalty_applies() {
        let mut memory = OutcomeMemory::new();
        memory.record("Cook Shrimp", true, OutcomeContext::default());

        let without = memory.score_action("Cook Shrimp", None, None, None);
        assert_eq!(without, 100.0);

        // As the last successful action it drops to the floor.
        let with = memory.score_action("Cook Shrimp", Some("Cook Shrimp"), None, None);
        assert_eq!(with, 10.0);
    }

    #[test]
    fn test_score_floor() {
        let mut memory = OutcomeMemory::new();
        for _ in 0..10 {
            memory.record("Burn Bread", false, OutcomeContext::default());
        }
        let score = memory.score_action("Burn Bread", None, None, None);
        assert_eq!(score, 10.0);
    }

    #[test]
    fn test_objective_bonus_needs_history() {
        let mut memory = OutcomeMemory::new();
        let fresh = memory.score_action("Light a fire", None, None, Some("fire"));
        assert_eq!(fresh, 50.0);

        memory.record("Light a fire", true, OutcomeContext::default());
        let seasoned = memory.score_action("Light a fire", None, None, Some("fire"));
        assert!(seasoned > 100.0);
    }

    #[test]
    fn test_exploration_confidence_is_fixed() {
        let mut memory = OutcomeMemory::new();
        memory.set_exploration_rates(1.0, 1.0);
        memory.record("Chop Tree", true, OutcomeContext::default());

        let candidates = strings(&["Chop Tree", "Fish Shrimp", "Light Fire"]);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let choice = memory
                .best_action_with_rng(&candidates, None, None, &mut rng)
                .unwrap();
            assert!(choice.explored);
            assert_eq!(choice.confidence, EXPLORATION_CONFIDENCE);
            assert_ne!(choice.action, "Chop Tree");
        }
    }

    #[test]
    fn test_exploration_excludes_only_last_success() {
        let mut memory = OutcomeMemory::new();
        memory.set_exploration_rates(1.0, 1.0);
        memory.record("Chop Tree", true, OutcomeContext::default());

        let candidates = strings(&["Chop Tree"]);
        let mut rng = StdRng::seed_from_u64(3);
        let choice = memory
            .best_action_with_rng(&candidates, None, None, &mut rng)
            .unwrap();
        // Sole candidate is the last success, so it is allowed back in.
        assert_eq!(choice.action, "Chop Tree");
    }

    #[test]
    fn test_tie_break_is_first_seen() {
        let mut memory = OutcomeMemory::new();
        memory.set_exploration_rates(0.0, 0.0);

        let candidates = strings(&["Zeta", "Alpha", "Midway"]);
        let choice = memory.best_action(&candidates, None, None).unwrap();
        assert_eq!(choice.action, "Zeta");
    }

    #[test]
    fn test_serde_roundtrip_preserves_scoring() {
        let mut memory = OutcomeMemory::new();
        memory.set_exploration_rates(0.0, 0.0);
        memory.record("Mine Tin", true, OutcomeContext::at_step("mining"));
        memory.record("Mine Tin", false, OutcomeContext::at_step("mining"));

        let json = serde_json::to_string(&memory).unwrap();
        let restored: OutcomeMemory = serde_json::from_str(&json).unwrap();

        let candidates = strings(&["Mine Tin", "Smelt Bronze"]);
        assert_eq!(
            memory.best_action(&candidates, Some("mining"), None).unwrap(),
            restored
                .best_action(&candidates, Some("mining"), None)
                .unwrap()
        );
    }
}
