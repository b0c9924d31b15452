//! Linear onboarding state machine.
//!
//! The tutorial is a singly-linked chain of steps, each with ordered
//! objectives. Progress advances when the current objective's text
//! appears (case-insensitively) in the observed text; matching lives
//! behind [`ObjectiveMatcher`] so it can be replaced by a real intent
//! classifier without touching the transition logic.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// One immutable tutorial step definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorialStep {
    pub name: String,
    pub instructor: String,
    pub location: String,
    pub description: String,
    /// Ordered objectives; all must match, in order, to finish the step.
    pub objectives: Vec<String>,
    pub required_items: Vec<String>,
    pub required_skills: BTreeMap<String, i64>,
    /// Phrases the game shows when the step wraps up.
    pub completion_triggers: Vec<String>,
    /// At most one successor; `None` marks the final step.
    pub next_step: Option<String>,
    pub xp_rewards: BTreeMap<String, i64>,
    pub item_rewards: BTreeMap<String, i64>,
}

impl TutorialStep {
    fn new(
        name: &str,
        instructor: &str,
        location: &str,
        description: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            instructor: instructor.to_string(),
            location: location.to_string(),
            description: description.to_string(),
            objectives: Vec::new(),
            required_items: Vec::new(),
            required_skills: BTreeMap::new(),
            completion_triggers: Vec::new(),
            next_step: None,
            xp_rewards: BTreeMap::new(),
            item_rewards: BTreeMap::new(),
        }
    }

    fn with_objectives(mut self, objectives: &[&str]) -> Self {
        self.objectives = objectives.iter().map(|o| o.to_string()).collect();
        self
    }

    fn with_completion_triggers(mut self, triggers: &[&str]) -> Self {
        self.completion_triggers = triggers.iter().map(|t| t.to_string()).collect();
        self
    }

    fn with_next_step(mut self, next: &str) -> Self {
        self.next_step = Some(next.to_string());
        self
    }

    fn with_required_item(mut self, item: &str) -> Self {
        self.required_items.push(item.to_string());
        self
    }

    fn with_xp_reward(mut self, skill: &str, amount: i64) -> Self {
        self.xp_rewards.insert(skill.to_string(), amount);
        self
    }

    fn with_item_reward(mut self, item: &str, count: i64) -> Self {
        self.item_rewards.insert(item.to_string(), count);
        self
    }
}

lazy_static::lazy_static! {
    /// The built-in island onboarding script, in chain order.
    pub static ref TUTORIAL_SCRIPT: Vec<TutorialStep> = vec![
        TutorialStep::new(
            "survival_expert_intro",
            "Survival Expert",
            "Tutorial Island - Survival Area",
            "Learn basic survival skills",
        )
        .with_objectives(&[
            "Talk to the Survival Expert",
            "Click on the fishing spot to catch shrimp",
            "Light a fire",
            "Cook the shrimp",
        ])
        .with_completion_triggers(&[
            "You have completed the survival section",
            "Now head through the gate to find your next instructor",
        ])
        .with_next_step("master_chef")
        .with_xp_reward("fishing", 25)
        .with_xp_reward("firemaking", 25)
        .with_xp_reward("cooking", 25)
        .with_item_reward("shrimp", 5)
        .with_item_reward("logs", 5),

        TutorialStep::new(
            "master_chef",
            "Master Chef",
            "Tutorial Island - Cooking Area",
            "Learn to make bread",
        )
        .with_objectives(&[
            "Talk to the Master Chef",
            "Make flour from wheat",
            "Make bread dough",
            "Bake bread",
        ])
        .with_completion_triggers(&["You've made bread", "Move through the door to continue"])
        .with_next_step("quest_guide")
        .with_xp_reward("cooking", 50)
        .with_xp_reward("crafting", 25)
        .with_item_reward("bread", 5)
        .with_item_reward("flour", 10)
        .with_item_reward("wheat", 10),

        TutorialStep::new(
            "quest_guide",
            "Quest Guide",
            "Tutorial Island - Quest Area",
            "Learn about quests",
        )
        .with_objectives(&[
            "Talk to the Quest Guide",
            "Open the quest journal",
            "Read about quests",
        ])
        .with_completion_triggers(&[
            "You've learned about quests",
            "Head through the gate to continue",
        ])
        .with_next_step("mining_instructor")
        .with_xp_reward("quest_points", 1),

        TutorialStep::new(
            "mining_instructor",
            "Mining Instructor",
            "Tutorial Island - Mining Area",
            "Learn to mine",
        )
        .with_objectives(&[
            "Talk to the Mining Instructor",
            "Mine copper and tin ore",
            "Smelt a bronze bar",
            "Make a bronze dagger",
        ])
        .with_completion_triggers(&[
            "You've made a bronze dagger",
            "Head through the gate to continue",
        ])
        .with_next_step("combat_instructor")
        .with_xp_reward("mining", 50)
        .with_xp_reward("smithing", 50)
        .with_xp_reward("crafting", 25)
        .with_item_reward("copper_ore", 5)
        .with_item_reward("tin_ore", 5)
        .with_item_reward("bronze_bar", 3)
        .with_item_reward("bronze_dagger", 1),

        TutorialStep::new(
            "combat_instructor",
            "Combat Instructor",
            "Tutorial Island - Combat Area",
            "Learn combat basics",
        )
        .with_objectives(&[
            "Talk to the Combat Instructor",
            "Equip the bronze dagger",
            "Attack the chicken",
            "Bury the bones",
        ])
        .with_completion_triggers(&[
            "You've learned combat basics",
            "Head through the gate to continue",
        ])
        .with_next_step("banker")
        .with_required_item("bronze_dagger")
        .with_xp_reward("attack", 25)
        .with_xp_reward("strength", 25)
        .with_xp_reward("defence", 25)
        .with_xp_reward("prayer", 25)
        .with_item_reward("bones", 5)
        .with_item_reward("chicken", 3),

        TutorialStep::new(
            "banker",
            "Banker",
            "Tutorial Island - Bank Area",
            "Learn about banking",
        )
        .with_objectives(&[
            "Talk to the Banker",
            "Open your bank",
            "Deposit items",
            "Withdraw items",
        ])
        .with_completion_triggers(&[
            "You've learned about banking",
            "Head through the gate to continue",
        ])
        .with_next_step("final_gate")
        .with_item_reward("coins", 25),

        TutorialStep::new(
            "final_gate",
            "Gate Keeper",
            "Tutorial Island - Final Gate",
            "Leave the island",
        )
        .with_objectives(&["Talk to the Gate Keeper", "Confirm you're ready to leave"])
        .with_completion_triggers(&[
            "You are now ready to leave",
            "You will be teleported to the mainland",
        ])
        .with_item_reward("coins", 25),
    ];
}

/// Decides whether an objective is satisfied by observed text. The
/// default is case-insensitive substring containment.
pub trait ObjectiveMatcher {
    fn matches(&self, objective: &str, text: &str) -> bool;
}

/// Case-insensitive substring containment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl ObjectiveMatcher for SubstringMatcher {
    fn matches(&self, objective: &str, text: &str) -> bool {
        text.to_lowercase().contains(&objective.to_lowercase())
    }
}

/// The persisted slice of tutorial progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorialState {
    pub current_step: Option<String>,
    pub completed_steps: BTreeSet<String>,
    pub current_objective_index: usize,
}

impl Default for TutorialState {
    fn default() -> Self {
        Self {
            current_step: TUTORIAL_SCRIPT.first().map(|step| step.name.clone()),
            completed_steps: BTreeSet::new(),
            current_objective_index: 0,
        }
    }
}

/// Signal from processing one piece of observed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TutorialSignal {
    /// The step's last objective matched; the step is done.
    StepComplete {
        completed: String,
        next_step: Option<String>,
    },

    /// An objective matched; the step continues with the next one.
    ContinueStep { next_objective: String },

    /// Nothing matched; re-present the unchanged objective. A stall,
    /// not an error.
    SuggestObjective { objective: String },

    /// Every step is already complete.
    Complete,
}

/// Tracks progress through the tutorial script.
pub struct TutorialProgress {
    steps: Vec<TutorialStep>,
    state: TutorialState,
    matcher: Box<dyn ObjectiveMatcher>,
}

impl Default for TutorialProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl TutorialProgress {
    /// Start at the first step of the built-in script.
    pub fn new() -> Self {
        Self::from_state(TutorialState::default())
    }

    /// Resume from persisted state.
    pub fn from_state(state: TutorialState) -> Self {
        Self {
            steps: TUTORIAL_SCRIPT.clone(),
            state,
            matcher: Box::new(SubstringMatcher),
        }
    }

    /// Replace the objective matcher.
    pub fn with_matcher(mut self, matcher: Box<dyn ObjectiveMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// The persisted slice of progress.
    pub fn state(&self) -> &TutorialState {
        &self.state
    }

    /// The current step definition, if any step remains.
    pub fn current_step(&self) -> Option<&TutorialStep> {
        let name = self.state.current_step.as_deref()?;
        self.steps.iter().find(|step| step.name == name)
    }

    /// The objective currently being pursued.
    pub fn current_objective(&self) -> Option<&str> {
        let step = self.current_step()?;
        step.objectives
            .get(self.state.current_objective_index)
            .map(String::as_str)
    }

    /// Whether every step has been completed. Monotonic: once true it
    /// stays true for any sequence of further calls.
    pub fn is_complete(&self) -> bool {
        self.state.completed_steps.len() >= self.steps.len()
    }

    /// Advance against one piece of observed text.
    pub fn process(&mut self, text: &str) -> TutorialSignal {
        if self.is_complete() {
            return TutorialSignal::Complete;
        }
        let Some(step) = self.current_step().cloned() else {
            return TutorialSignal::Complete;
        };
        let Some(objective) = step
            .objectives
            .get(self.state.current_objective_index)
            .cloned()
        else {
            return TutorialSignal::Complete;
        };

        if !self.matcher.matches(&objective, text) {
            return TutorialSignal::SuggestObjective { objective };
        }

        self.state.current_objective_index += 1;

        if self.state.current_objective_index >= step.objectives.len() {
            self.state.completed_steps.insert(step.name.clone());
            self.state.current_objective_index = 0;
            self.state.current_step = step.next_step.clone();
            info!(step = %step.name, "tutorial step complete");
            return TutorialSignal::StepComplete {
                completed: step.name,
                next_step: step.next_step,
            };
        }

        TutorialSignal::ContinueStep {
            next_objective: step.objectives[self.state.current_objective_index].clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_is_a_chain() {
        // Each step names the next, and only the last has no successor.
        for window in TUTORIAL_SCRIPT.windows(2) {
            assert_eq!(window[0].next_step.as_deref(), Some(window[1].name.as_str()));
        }
        assert!(TUTORIAL_SCRIPT.last().unwrap().next_step.is_none());
        assert_eq!(TUTORIAL_SCRIPT.len(), 7);
    }

    #[test]
    fn test_first_step_completes_into_second() {
        let mut tutorial = TutorialProgress::new();
        assert_eq!(
            tutorial.current_objective(),
            Some("Talk to the Survival Expert")
        );

        let texts = [
            "You talk to the Survival Expert about the basics.",
            "You click on the fishing spot to catch shrimp. Success!",
            "You light a fire with the logs.",
            "You cook the shrimp over the fire.",
        ];

        let mut last = None;
        for text in texts {
            last = Some(tutorial.process(text));
        }

        assert_eq!(
            last,
            Some(TutorialSignal::StepComplete {
                completed: "survival_expert_intro".to_string(),
                next_step: Some("master_chef".to_string()),
            })
        );
        assert_eq!(
            tutorial.state().current_step.as_deref(),
            Some("master_chef")
        );
        assert_eq!(tutorial.state().current_objective_index, 0);
        assert!(tutorial
            .state()
            .completed_steps
            .contains("survival_expert_intro"));
    }

    #[test]
    fn test_unmatched_text_stalls() {
        let mut tutorial = TutorialProgress::new();
        let signal = tutorial.process("A seagull flies past.");
        assert_eq!(
            signal,
            TutorialSignal::SuggestObjective {
                objective: "Talk to the Survival Expert".to_string()
            }
        );
        assert_eq!(tutorial.state().current_objective_index, 0);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let mut tutorial = TutorialProgress::new();
        let signal = tutorial.process("you TALK TO THE SURVIVAL EXPERT eagerly");
        assert_eq!(
            signal,
            TutorialSignal::ContinueStep {
                next_objective: "Click on the fishing spot to catch shrimp".to_string()
            }
        );
    }

    fn run_full_script(tutorial: &mut TutorialProgress) {
        while let Some(objective) = tutorial.current_objective().map(str::to_string) {
            tutorial.process(&objective);
        }
    }

    #[test]
    fn test_completion_is_monotonic() {
        let mut tutorial = TutorialProgress::new();
        run_full_script(&mut tutorial);

        assert!(tutorial.is_complete());
        assert_eq!(tutorial.state().completed_steps.len(), 7);

        for _ in 0..5 {
            assert_eq!(tutorial.process("anything at all"), TutorialSignal::Complete);
            assert!(tutorial.is_complete());
        }
    }

    #[test]
    fn test_state_roundtrip_resumes_midway() {
        let mut tutorial = TutorialProgress::new();
        tutorial.process("Talk to the Survival Expert");
        tutorial.process("Click on the fishing spot to catch shrimp");

        let state = tutorial.state().clone();
        let mut resumed = TutorialProgress::from_state(state.clone());
        assert_eq!(resumed.state(), &state);
        assert_eq!(resumed.current_objective(), Some("Light a fire"));

        let signal = resumed.process("You light a fire.");
        assert_eq!(
            signal,
            TutorialSignal::ContinueStep {
                next_objective: "Cook the shrimp".to_string()
            }
        );
    }

    #[test]
    fn test_final_step_has_no_successor() {
        let mut tutorial = TutorialProgress::new();
        run_full_script(&mut tutorial);
        assert_eq!(tutorial.state().current_step, None);
        assert_eq!(tutorial.current_objective(), None);
    }

    struct AlwaysMatches;

    impl ObjectiveMatcher for AlwaysMatches {
        fn matches(&self, _objective: &str, _text: &str) -> bool {
            true
        }
    }

    #[test]
    fn test_pluggable_matcher() {
        let mut tutorial = TutorialProgress::new().with_matcher(Box::new(AlwaysMatches));
        let signal = tutorial.process("gibberish");
        assert!(matches!(signal, TutorialSignal::ContinueStep { .. }));
    }
}
