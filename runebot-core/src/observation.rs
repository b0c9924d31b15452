//! Observations - structured snapshots of perceivable game state.
//!
//! An [`Observation`] is the sole perception input to the decision loop.
//! It is produced by an external collaborator (screen parser, network
//! client); the core never parses free text beyond case-insensitive
//! substring checks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One cycle's snapshot of everything the agent can perceive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Observation {
    /// Raw screen or message text for this cycle.
    pub text: String,

    /// Current location name.
    pub location: String,

    /// Tutorial step hint, if the caller knows it (onboarding only).
    pub tutorial_step: Option<String>,

    /// Tutorial objective hint, if the caller knows it (onboarding only).
    pub tutorial_objective: Option<String>,

    /// Candidate action names offered by the environment this cycle.
    pub candidate_actions: Vec<String>,

    /// Discovered inventory snapshot: item name -> count.
    pub inventory: BTreeMap<String, u32>,

    /// Discovered skill snapshot: skill name -> level.
    pub skills: BTreeMap<String, i64>,

    /// Total carried wealth in coins.
    pub wealth: i64,

    /// Quest points earned so far.
    pub quest_points: u32,

    /// Locations the agent has discovered.
    pub discovered_locations: Vec<String>,
}

impl Observation {
    /// Create an observation from raw text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Set the current location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Set the candidate action names offered this cycle.
    pub fn with_candidates(mut self, candidates: Vec<String>) -> Self {
        self.candidate_actions = candidates;
        self
    }

    /// Add an inventory item with a count.
    pub fn with_item(mut self, name: impl Into<String>, count: u32) -> Self {
        self.inventory.insert(name.into(), count);
        self
    }

    /// Add a skill at a level.
    pub fn with_skill(mut self, name: impl Into<String>, level: i64) -> Self {
        self.skills.insert(name.into(), level);
        self
    }

    /// Add a discovered location.
    pub fn with_discovered(mut self, location: impl Into<String>) -> Self {
        self.discovered_locations.push(location.into());
        self
    }

    /// Set the carried wealth.
    pub fn with_wealth(mut self, wealth: i64) -> Self {
        self.wealth = wealth;
        self
    }

    /// Whether at least one of the named item is carried.
    pub fn has_item(&self, name: &str) -> bool {
        self.inventory.get(name).copied().unwrap_or(0) > 0
    }

    /// Current level of a skill, 0 if undiscovered.
    pub fn skill_level(&self, name: &str) -> i64 {
        self.skills.get(name).copied().unwrap_or(0)
    }

    /// Whether every skill requirement is met by the snapshot.
    pub fn meets_skills(&self, requirements: &BTreeMap<String, i64>) -> bool {
        requirements
            .iter()
            .all(|(skill, level)| self.skill_level(skill) >= *level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_roundtrip() {
        let obs = Observation::new("Welcome to the island")
            .with_location("Tutorial Island")
            .with_item("bronze_dagger", 1)
            .with_skill("mining", 5);

        assert_eq!(obs.location, "Tutorial Island");
        assert!(obs.has_item("bronze_dagger"));
        assert!(!obs.has_item("rune_scimitar"));
        assert_eq!(obs.skill_level("mining"), 5);
        assert_eq!(obs.skill_level("fishing"), 0);
    }

    #[test]
    fn test_meets_skills() {
        let obs = Observation::new("")
            .with_skill("attack", 20)
            .with_skill("strength", 15);

        let mut reqs = BTreeMap::new();
        reqs.insert("attack".to_string(), 20);
        assert!(obs.meets_skills(&reqs));

        reqs.insert("strength".to_string(), 16);
        assert!(!obs.meets_skills(&reqs));
    }

    #[test]
    fn test_serde_roundtrip() {
        let obs = Observation::new("text").with_location("Lumbridge");
        let json = serde_json::to_string(&obs).unwrap();
        let back: Observation = serde_json::from_str(&json).unwrap();
        assert_eq!(back.location, "Lumbridge");
    }
}
