//! Personality configuration: static weights and play-style preferences.
//!
//! Weights are read-only per session; there is no online learning here.
//! Restriction strings are matched by the selector through a pluggable
//! predicate so the substring heuristic can later be replaced by a real
//! classifier.

use serde::{Deserialize, Serialize};

/// Static scalar biases applied during action scoring.
///
/// Every weight lives in `[0.0, 1.0]`; construction clamps out-of-range
/// values rather than rejecting them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersonalityWeights {
    pub risk_tolerance: f64,
    pub efficiency_focus: f64,
    pub social_preference: f64,
    pub exploration_preference: f64,
    pub goal_orientation: f64,
}

impl PersonalityWeights {
    /// Build a weight vector, clamping each component into `[0, 1]`.
    pub fn new(
        risk_tolerance: f64,
        efficiency_focus: f64,
        social_preference: f64,
        exploration_preference: f64,
        goal_orientation: f64,
    ) -> Self {
        Self {
            risk_tolerance: risk_tolerance.clamp(0.0, 1.0),
            efficiency_focus: efficiency_focus.clamp(0.0, 1.0),
            social_preference: social_preference.clamp(0.0, 1.0),
            exploration_preference: exploration_preference.clamp(0.0, 1.0),
            goal_orientation: goal_orientation.clamp(0.0, 1.0),
        }
    }
}

impl Default for PersonalityWeights {
    fn default() -> Self {
        Self {
            risk_tolerance: 0.5,
            efficiency_focus: 0.5,
            social_preference: 0.5,
            exploration_preference: 0.5,
            goal_orientation: 0.5,
        }
    }
}

/// A broad way of playing the game. Each active style unlocks a family
/// of candidate actions during selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayStyle {
    Explorer,
    SweatyPvmer,
    CasualSkiller,
    SkillerPure,
    LoreSeeker,
    MoneyMaker,
    Completionist,
    PetHunter,
    Socialite,
}

/// How the agent approaches quests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestStrategy {
    #[default]
    FollowGuide,
    Explore,
    Efficient,
}

/// A complete personality profile for one agent session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalityProfile {
    /// Display name of the persona.
    pub name: String,

    /// Active play styles, in priority order.
    pub styles: Vec<PlayStyle>,

    /// Long-term goal phrases; a candidate action referencing one of
    /// these by name gets a scoring boost.
    pub long_term_goals: Vec<String>,

    /// Self-imposed restriction phrases (e.g. "trading"). Candidates
    /// whose names match a restriction are filtered out.
    pub restrictions: Vec<String>,

    /// Quest approach.
    pub quest_strategy: QuestStrategy,

    /// Scalar scoring biases.
    pub weights: PersonalityWeights,
}

impl PersonalityProfile {
    /// Create a profile with a name and sensible defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            styles: vec![PlayStyle::CasualSkiller],
            long_term_goals: Vec::new(),
            restrictions: Vec::new(),
            quest_strategy: QuestStrategy::default(),
            weights: PersonalityWeights::default(),
        }
    }

    /// Replace the active play styles.
    pub fn with_styles(mut self, styles: Vec<PlayStyle>) -> Self {
        self.styles = styles;
        self
    }

    /// Add a long-term goal phrase.
    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.long_term_goals.push(goal.into());
        self
    }

    /// Add a restriction phrase.
    pub fn with_restriction(mut self, restriction: impl Into<String>) -> Self {
        self.restrictions.push(restriction.into());
        self
    }

    /// Set the quest strategy.
    pub fn with_quest_strategy(mut self, strategy: QuestStrategy) -> Self {
        self.quest_strategy = strategy;
        self
    }

    /// Set the weight vector.
    pub fn with_weights(mut self, weights: PersonalityWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Whether a style is active for this profile.
    pub fn has_style(&self, style: PlayStyle) -> bool {
        self.styles.contains(&style)
    }
}

impl Default for PersonalityProfile {
    fn default() -> Self {
        Self::new("Default")
    }
}
