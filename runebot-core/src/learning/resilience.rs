//! Resilience tracking: deaths, decision outcomes, success chains, and
//! the avoid list that gates dangerous locations behind stat
//! requirements.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::learning::outcome::OutcomeContext;
use crate::store::unix_now;

/// Decision outcomes considered when blending an action score.
const RECENT_OUTCOME_WINDOW: usize = 10;

/// Score contribution cap from the recent success rate.
const SUCCESS_RATE_WEIGHT: f64 = 0.2;

/// Score contribution cap from average reward.
const REWARD_BONUS_CAP: f64 = 0.3;

/// Score penalty for acting in an avoided location.
const AVOIDED_LOCATION_PENALTY: f64 = 0.4;

/// Confidence assumed for actions never scored before.
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// One recorded death.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeathLogEntry {
    pub timestamp: u64,
    pub location: String,
    /// Items carried (and lost) at the time of death.
    pub equipment: Vec<String>,
    pub reason: String,
}

/// A minimum-stat gate, checked in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRequirement {
    pub stat: String,
    pub level: i64,
}

impl StatRequirement {
    pub fn new(stat: impl Into<String>, level: i64) -> Self {
        Self {
            stat: stat.into(),
            level,
        }
    }
}

/// A location gated behind requirements before retrying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvoidListEntry {
    pub location: String,
    pub reason: String,
    pub added_at: u64,
    /// Requirements to lift the gate, checked in order; the first
    /// unmet one is reported.
    pub requirements: Vec<StatRequirement>,
}

/// The outcome of one executed decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub timestamp: u64,
    pub action: String,
    pub success: bool,
    pub reward: f64,
    pub context: OutcomeContext,
}

/// An ordered run of actions that paid off together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessChain {
    pub timestamp: u64,
    pub actions: Vec<String>,
    pub total_reward: f64,
}

/// Result of a retry-eligibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryCheck {
    pub allowed: bool,
    pub message: String,
}

/// Tracks deaths, decision outcomes, success chains, avoidance entries,
/// and per-action confidence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResilienceTracker {
    death_log: Vec<DeathLogEntry>,
    decision_outcomes: Vec<DecisionOutcome>,
    success_chains: Vec<SuccessChain>,
    avoid_list: Vec<AvoidListEntry>,
    confidence_scores: BTreeMap<String, f64>,
    avoided_locations: BTreeSet<String>,
}

impl ResilienceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the avoided set from the persisted logs. Called after a
    /// reload so avoidance survives restarts even if the set itself was
    /// written by an older version.
    pub fn rebuild_avoided(&mut self) {
        for entry in &self.death_log {
            self.avoided_locations.insert(entry.location.clone());
        }
        for entry in &self.avoid_list {
            self.avoided_locations.insert(entry.location.clone());
        }
    }

    /// Log a death at the current time.
    pub fn log_death(&mut self, location: &str, equipment: Vec<String>, reason: &str) {
        self.log_death_at(location, equipment, reason, unix_now());
    }

    /// Log a death with an explicit timestamp.
    pub fn log_death_at(
        &mut self,
        location: &str,
        equipment: Vec<String>,
        reason: &str,
        timestamp: u64,
    ) {
        self.death_log.push(DeathLogEntry {
            timestamp,
            location: location.to_string(),
            equipment,
            reason: reason.to_string(),
        });
        self.avoided_locations.insert(location.to_string());
    }

    /// Log the outcome of an executed decision.
    pub fn log_decision_outcome(
        &mut self,
        action: &str,
        success: bool,
        reward: f64,
        context: OutcomeContext,
    ) {
        self.decision_outcomes.push(DecisionOutcome {
            timestamp: unix_now(),
            action: action.to_string(),
            success,
            reward,
            context,
        });
    }

    /// Record an ordered run of actions that paid off together.
    pub fn add_success_chain(&mut self, actions: Vec<String>, total_reward: f64) {
        self.success_chains.push(SuccessChain {
            timestamp: unix_now(),
            actions,
            total_reward,
        });
    }

    /// Gate a location behind stat requirements.
    pub fn add_to_avoid_list(
        &mut self,
        location: &str,
        reason: &str,
        requirements: Vec<StatRequirement>,
    ) {
        self.avoid_list.push(AvoidListEntry {
            location: location.to_string(),
            reason: reason.to_string(),
            added_at: unix_now(),
            requirements,
        });
        self.avoided_locations.insert(location.to_string());
    }

    /// Mark a location as dangerous without a full death entry.
    pub fn record_near_death(&mut self, location: &str) {
        self.avoided_locations.insert(location.to_string());
    }

    /// Set the confidence score for an action, clamped into `[0, 1]`.
    pub fn update_confidence(&mut self, action: &str, score: f64) {
        self.confidence_scores
            .insert(action.to_string(), score.clamp(0.0, 1.0));
    }

    /// Stored confidence for an action, 0.5 when unknown.
    pub fn action_confidence(&self, action: &str) -> f64 {
        self.confidence_scores
            .get(action)
            .copied()
            .unwrap_or(DEFAULT_CONFIDENCE)
    }

    /// Whether a gated location may be retried with the given stats.
    ///
    /// The earliest avoid-list entry for the location wins; a location
    /// with no entries may always be retried.
    pub fn can_retry(&self, location: &str, stats: &BTreeMap<String, i64>) -> RetryCheck {
        for entry in &self.avoid_list {
            if entry.location != location {
                continue;
            }
            for requirement in &entry.requirements {
                let current = stats.get(&requirement.stat).copied().unwrap_or(0);
                if current < requirement.level {
                    return RetryCheck {
                        allowed: false,
                        message: format!("Need {} >= {}", requirement.stat, requirement.level),
                    };
                }
            }
            return RetryCheck {
                allowed: true,
                message: "Requirements met".to_string(),
            };
        }
        RetryCheck {
            allowed: true,
            message: "Location not in avoid list".to_string(),
        }
    }

    /// The `n` most recent deaths, newest first.
    pub fn recent_deaths(&self, n: usize) -> Vec<&DeathLogEntry> {
        let mut deaths: Vec<&DeathLogEntry> = self.death_log.iter().collect();
        deaths.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        deaths.truncate(n);
        deaths
    }

    /// Success chains with at least the given total reward.
    pub fn successful_chains(&self, min_reward: f64) -> Vec<&SuccessChain> {
        self.success_chains
            .iter()
            .filter(|chain| chain.total_reward >= min_reward)
            .collect()
    }

    /// The most recent decision outcomes for one action, oldest first.
    pub fn action_history(&self, action: &str, limit: usize) -> Vec<&DecisionOutcome> {
        let matching: Vec<&DecisionOutcome> = self
            .decision_outcomes
            .iter()
            .filter(|o| o.action == action)
            .collect();
        let start = matching.len().saturating_sub(limit);
        matching[start..].to_vec()
    }

    /// Blended score for an action in a location.
    ///
    /// Starts from stored confidence, adds up to 0.2 from the recent
    /// success rate and up to 0.3 from average reward, subtracts 0.4
    /// when the location is avoided, and clamps into `[0, 1]`.
    pub fn score(&self, action: &str, location: Option<&str>) -> f64 {
        let mut score = self.action_confidence(action);

        let recent = self.action_history(action, RECENT_OUTCOME_WINDOW);
        if !recent.is_empty() {
            let successes = recent.iter().filter(|o| o.success).count();
            let success_rate = successes as f64 / recent.len() as f64;
            score += success_rate * SUCCESS_RATE_WEIGHT;

            let avg_reward =
                recent.iter().map(|o| o.reward).sum::<f64>() / recent.len() as f64;
            score += (avg_reward / 100.0).min(REWARD_BONUS_CAP);
        }

        if let Some(location) = location {
            if self.avoided_locations.contains(location) {
                score -= AVOIDED_LOCATION_PENALTY;
            }
        }

        score.clamp(0.0, 1.0)
    }

    /// Locations currently considered dangerous.
    pub fn avoided_locations(&self) -> impl Iterator<Item = &str> {
        self.avoided_locations.iter().map(String::as_str)
    }

    /// Whether a location has no avoidance mark against it.
    pub fn is_location_safe(&self, location: &str) -> bool {
        !self.avoided_locations.contains(location)
    }

    /// Danger estimate for a location: 1.0 once avoided, otherwise
    /// scaled by recorded deaths there.
    pub fn danger_level(&self, location: &str) -> f64 {
        if self.avoided_locations.contains(location) {
            return 1.0;
        }
        let deaths = self
            .death_log
            .iter()
            .filter(|d| d.location == location)
            .count();
        (deaths as f64 * 0.2).min(1.0)
    }

    /// All recorded deaths, oldest first.
    pub fn death_log(&self) -> &[DeathLogEntry] {
        &self.death_log
    }

    /// All avoid-list entries, oldest first.
    pub fn avoid_list(&self) -> &[AvoidListEntry] {
        &self.avoid_list
    }
}
