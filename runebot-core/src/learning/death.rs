//! Death policy: decide whether a death blacklists its location behind
//! stat gates, or whether item recovery should be attempted.

use tracing::info;

use crate::learning::resilience::{ResilienceTracker, StatRequirement};

/// Deaths at the same location within the recent window before it gets
/// gated.
const REPEAT_DEATH_LIMIT: usize = 2;

/// How many recent deaths are examined for repeats.
const DEATH_WINDOW: usize = 5;

/// Result of handling a death.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryOutcome {
    /// Whether an item-recovery path was taken.
    pub recovered: bool,
    pub message: String,
}

/// Hooks for the parts of recovery this core does not model: whether
/// the death location is reachable again, and the fallback
/// lost-property office. Replace [`UnmodeledRecovery`] once travel and
/// reclaim costs are modeled.
pub trait RecoveryPolicy {
    /// Whether the agent can travel back to the death location.
    fn can_return_to(&self, location: &str) -> bool;

    /// Recover items through the lost-property office.
    fn recover_through_office(&self, items: &[String]) -> RecoveryOutcome;
}

/// Placeholder policy: never able to return, office always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnmodeledRecovery;

impl RecoveryPolicy for UnmodeledRecovery {
    fn can_return_to(&self, _location: &str) -> bool {
        false
    }

    fn recover_through_office(&self, _items: &[String]) -> RecoveryOutcome {
        RecoveryOutcome {
            recovered: true,
            message: "Recovering items through the lost-property office".to_string(),
        }
    }
}

/// Decides, on death, between blacklisting the location and attempting
/// item recovery.
pub struct DeathHandler {
    last_death_location: Option<String>,
    lost_items: Vec<String>,
    policy: Box<dyn RecoveryPolicy>,
}

impl Default for DeathHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl DeathHandler {
    pub fn new() -> Self {
        Self {
            last_death_location: None,
            lost_items: Vec::new(),
            policy: Box::new(UnmodeledRecovery),
        }
    }

    /// Use a custom recovery policy.
    pub fn with_policy(mut self, policy: Box<dyn RecoveryPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Handle a death: always log it first, then either gate the
    /// location behind requirements or attempt item recovery.
    pub fn handle_death(
        &mut self,
        tracker: &mut ResilienceTracker,
        location: &str,
        equipment: Vec<String>,
        reason: &str,
    ) -> RecoveryOutcome {
        self.last_death_location = Some(location.to_string());
        self.lost_items = equipment.clone();

        tracker.log_death(location, equipment, reason);

        if self.should_avoid(tracker, location, reason) {
            let requirements = retry_requirements(reason);
            tracker.add_to_avoid_list(location, reason, requirements.clone());
            info!(location, reason, "location gated after death");

            let listed = if requirements.is_empty() {
                "no specific requirements recorded".to_string()
            } else {
                requirements
                    .iter()
                    .map(|r| format!("{} >= {}", r.stat, r.level))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            return RecoveryOutcome {
                recovered: false,
                message: format!("Added {location} to the avoid list; retry once {listed}"),
            };
        }

        self.attempt_recovery()
    }

    /// Whether the location should be gated: repeated deaths there, or
    /// a reason that reads under-leveled.
    pub fn should_avoid(
        &self,
        tracker: &ResilienceTracker,
        location: &str,
        reason: &str,
    ) -> bool {
        let repeats = tracker
            .recent_deaths(DEATH_WINDOW)
            .iter()
            .filter(|d| d.location == location)
            .count();
        if repeats >= REPEAT_DEATH_LIMIT {
            return true;
        }

        let reason = reason.to_lowercase();
        reason.contains("too weak") || reason.contains("underleveled")
    }

    /// Ordered human-readable recovery steps. Descriptive only; the
    /// caller turns these into real actions.
    pub fn recovery_plan(&self) -> Vec<String> {
        let Some(location) = &self.last_death_location else {
            return Vec::new();
        };

        let mut plan = vec![format!("Return to {location}"), "Recover items".to_string()];
        for item in &self.lost_items {
            plan.push(format!("Re-equip {item}"));
        }
        plan.push("Return to safe area".to_string());
        plan
    }

    /// Feed a recovery step's result back into the decision log.
    pub fn update_recovery_progress(
        &self,
        tracker: &mut ResilienceTracker,
        step: &str,
        success: bool,
    ) {
        let reward = if success { 10.0 } else { -5.0 };
        let context = crate::learning::outcome::OutcomeContext {
            location: self.last_death_location.clone(),
            ..Default::default()
        };
        tracker.log_decision_outcome(&format!("recovery_{step}"), success, reward, context);
    }

    /// Where the agent last died, if anywhere.
    pub fn last_death_location(&self) -> Option<&str> {
        self.last_death_location.as_deref()
    }

    fn attempt_recovery(&self) -> RecoveryOutcome {
        let Some(location) = &self.last_death_location else {
            return RecoveryOutcome {
                recovered: false,
                message: "No death location or items to recover".to_string(),
            };
        };
        if self.lost_items.is_empty() {
            return RecoveryOutcome {
                recovered: false,
                message: "No death location or items to recover".to_string(),
            };
        }

        if self.policy.can_return_to(location) {
            return RecoveryOutcome {
                recovered: true,
                message: format!("Returning to {location} to recover items"),
            };
        }

        self.policy.recover_through_office(&self.lost_items)
    }
}

/// Derive retry requirements from the reason text.
///
/// Combat-flavored reasons (including reading as under-leveled) gate on
/// combat level and health plus the relevant attack style; agility and
/// thieving mishaps gate on their skills.
pub fn retry_requirements(reason: &str) -> Vec<StatRequirement> {
    let reason = reason.to_lowercase();
    let mut requirements = Vec::new();

    let combat_flavored = reason.contains("combat")
        || reason.contains("too weak")
        || reason.contains("underleveled");
    if combat_flavored {
        requirements.push(StatRequirement::new("combat_level", 10));
        requirements.push(StatRequirement::new("health", 30));

        if reason.contains("ranged") {
            requirements.push(StatRequirement::new("ranged", 20));
        } else if reason.contains("magic") {
            requirements.push(StatRequirement::new("magic", 20));
        } else {
            requirements.push(StatRequirement::new("attack", 20));
            requirements.push(StatRequirement::new("strength", 20));
            requirements.push(StatRequirement::new("defence", 20));
        }
    }

    if reason.contains("agility") {
        requirements.push(StatRequirement::new("agility", 30));
    }
    if reason.contains("thieving") {
        requirements.push(StatRequirement::new("thieving", 25));
    }

    requirements
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_underleveled_death_gates_location() {
        let mut tracker = ResilienceTracker::new();
        let mut handler = DeathHandler::new();

        let outcome = handler.handle_death(
            &mut tracker,
            "Lava Maze",
            vec!["rune_scimitar".to_string()],
            "too weak",
        );
        assert!(!outcome.recovered);
        assert!(outcome.message.contains("avoid list"));
        assert!(outcome.message.contains("combat_level >= 10"));
    }

    #[test]
    fn test_repeat_deaths_gate_and_requirements_check_in_order() {
        let mut tracker = ResilienceTracker::new();
        let mut handler = DeathHandler::new();

        handler.handle_death(&mut tracker, "Lava Maze", vec![], "too weak");
        handler.handle_death(&mut tracker, "Lava Maze", vec![], "too weak");

        assert!(handler.should_avoid(&tracker, "Lava Maze", "anything"));

        let mut stats = BTreeMap::new();
        stats.insert("combat_level".to_string(), 5);
        let check = tracker.can_retry("Lava Maze", &stats);
        assert!(!check.allowed);
        assert_eq!(check.message, "Need combat_level >= 10");
    }

    #[test]
    fn test_single_ordinary_death_attempts_recovery() {
        let mut tracker = ResilienceTracker::new();
        let mut handler = DeathHandler::new();

        let outcome = handler.handle_death(
            &mut tracker,
            "Cow Field",
            vec!["bread".to_string()],
            "careless",
        );
        // Can't return (unmodeled), so the office path fires.
        assert!(outcome.recovered);
        assert!(outcome.message.contains("lost-property office"));
    }

    #[test]
    fn test_no_items_means_nothing_to_recover() {
        let mut tracker = ResilienceTracker::new();
        let mut handler = DeathHandler::new();

        let outcome = handler.handle_death(&mut tracker, "Cow Field", vec![], "careless");
        assert!(!outcome.recovered);
        assert_eq!(outcome.message, "No death location or items to recover");
    }

    #[test]
    fn test_ranged_reason_swaps_melee_triad() {
        let reqs = retry_requirements("combat death to ranged guards");
        let stats: Vec<&str> = reqs.iter().map(|r| r.stat.as_str()).collect();
        assert_eq!(stats, vec!["combat_level", "health", "ranged"]);
    }

    #[test]
    fn test_melee_reason_requires_triad() {
        let reqs = retry_requirements("combat death");
        let stats: Vec<&str> = reqs.iter().map(|r| r.stat.as_str()).collect();
        assert_eq!(
            stats,
            vec!["combat_level", "health", "attack", "strength", "defence"]
        );
    }

    #[test]
    fn test_skill_mishaps_gate_their_skills() {
        let reqs = retry_requirements("failed an agility obstacle");
        assert_eq!(reqs, vec![StatRequirement::new("agility", 30)]);

        let reqs = retry_requirements("caught thieving");
        assert_eq!(reqs, vec![StatRequirement::new("thieving", 25)]);
    }

    #[test]
    fn test_recovery_plan_lists_every_item() {
        let mut tracker = ResilienceTracker::new();
        let mut handler = DeathHandler::new();
        handler.handle_death(
            &mut tracker,
            "Cow Field",
            vec!["sword".to_string(), "shield".to_string()],
            "careless",
        );

        let plan = handler.recovery_plan();
        assert_eq!(
            plan,
            vec![
                "Return to Cow Field",
                "Recover items",
                "Re-equip sword",
                "Re-equip shield",
                "Return to safe area",
            ]
        );
    }

    #[test]
    fn test_recovery_progress_feeds_decision_log() {
        let mut tracker = ResilienceTracker::new();
        let mut handler = DeathHandler::new();
        handler.handle_death(&mut tracker, "Cow Field", vec!["bread".to_string()], "careless");

        handler.update_recovery_progress(&mut tracker, "return", true);
        let history = tracker.action_history("recovery_return", 10);
        assert_eq!(history.len(), 1);
        assert!(history[0].success);
        assert_eq!(history[0].reward, 10.0);
    }
}
