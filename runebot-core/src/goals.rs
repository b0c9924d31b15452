//! Goal and quest tracking with exactly-once completion transitions.
//!
//! Progress is a fraction in `[0.0, 1.0]`; the completion threshold is
//! 1.0. Callers holding percentage values convert at the boundary with
//! [`progress_from_percent`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::store::unix_now;

/// Progress at which a goal or quest completes.
pub const COMPLETION_THRESHOLD: f64 = 1.0;

/// Convert a 0-100 percentage into the fraction scale used everywhere
/// inside this crate.
pub fn progress_from_percent(percent: f64) -> f64 {
    (percent / 100.0).clamp(0.0, 1.0)
}

/// Whether a goal is a near-term task or a long campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    ShortTerm,
    LongTerm,
}

/// A tracked goal. `completed` transitions false -> true exactly once
/// and never reverts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub name: String,
    pub description: String,
    /// Fraction in `[0, 1]`.
    pub progress: f64,
    pub completed: bool,
    pub requirements: BTreeMap<String, i64>,
    pub kind: GoalKind,
    pub created_at: u64,
    pub completed_at: Option<u64>,
}

impl Goal {
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: GoalKind) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            progress: 0.0,
            completed: false,
            requirements: BTreeMap::new(),
            kind,
            created_at: unix_now(),
            completed_at: None,
        }
    }

    /// Add a skill-level requirement.
    pub fn with_requirement(mut self, skill: impl Into<String>, level: i64) -> Self {
        self.requirements.insert(skill.into(), level);
        self
    }
}

/// A quest tracked through the available/active/completed sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestGoal {
    pub name: String,
    pub description: String,
    /// Fraction in `[0, 1]`.
    pub progress: f64,
    pub completed: bool,
    pub required_skills: BTreeMap<String, i64>,
    pub required_quest_points: u32,
    pub required_items: Vec<String>,
    pub rewards: Vec<String>,
    pub created_at: u64,
    pub completed_at: Option<u64>,
}

impl QuestGoal {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            progress: 0.0,
            completed: false,
            required_skills: BTreeMap::new(),
            required_quest_points: 0,
            required_items: Vec::new(),
            rewards: Vec::new(),
            created_at: unix_now(),
            completed_at: None,
        }
    }

    /// Add a skill-level requirement.
    pub fn with_required_skill(mut self, skill: impl Into<String>, level: i64) -> Self {
        self.required_skills.insert(skill.into(), level);
        self
    }

    /// Add a reward description.
    pub fn with_reward(mut self, reward: impl Into<String>) -> Self {
        self.rewards.push(reward.into());
        self
    }

    /// Whether the requirements are met by a skill snapshot and earned
    /// quest points.
    pub fn requirements_met(&self, skills: &BTreeMap<String, i64>, quest_points: u32) -> bool {
        if quest_points < self.required_quest_points {
            return false;
        }
        self.required_skills
            .iter()
            .all(|(skill, level)| skills.get(skill).copied().unwrap_or(0) >= *level)
    }
}

/// Result of a progress update.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressUpdate {
    /// Progress recorded; the goal is still open.
    Updated { progress: f64 },

    /// The goal crossed its threshold just now. Fires at most once per
    /// goal.
    Completed { name: String },

    /// No goal or quest by that name; the loop carries on.
    NotFound,
}

/// Tracks short/long-term goals and quest progress.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalTracker {
    short_term: Vec<Goal>,
    long_term: Vec<Goal>,
    available_quests: Vec<QuestGoal>,
    active_quests: Vec<QuestGoal>,
    completed_quests: Vec<QuestGoal>,
    quest_points: u32,
}

impl GoalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new goal.
    pub fn add_goal(&mut self, goal: Goal) {
        match goal.kind {
            GoalKind::ShortTerm => self.short_term.push(goal),
            GoalKind::LongTerm => self.long_term.push(goal),
        }
    }

    /// Track a quest as immediately active.
    pub fn add_quest(&mut self, quest: QuestGoal) {
        self.active_quests.push(quest);
    }

    /// Record a quest the agent could take on later.
    pub fn offer_quest(&mut self, quest: QuestGoal) {
        self.available_quests.push(quest);
    }

    /// Move an offered quest into the active set. Returns false when no
    /// quest by that name is available.
    pub fn accept_quest(&mut self, name: &str) -> bool {
        let Some(index) = self.available_quests.iter().position(|q| q.name == name) else {
            return false;
        };
        let quest = self.available_quests.remove(index);
        self.active_quests.push(quest);
        true
    }

    /// Update a goal's progress, searching short-term then long-term
    /// goals by name.
    pub fn update_goal_progress(&mut self, name: &str, progress: f64) -> ProgressUpdate {
        let progress = progress.clamp(0.0, 1.0);
        for goal in self.short_term.iter_mut().chain(self.long_term.iter_mut()) {
            if goal.name != name {
                continue;
            }
            goal.progress = progress;
            if progress >= COMPLETION_THRESHOLD && !goal.completed {
                goal.completed = true;
                goal.completed_at = Some(unix_now());
                return ProgressUpdate::Completed {
                    name: goal.name.clone(),
                };
            }
            return ProgressUpdate::Updated { progress };
        }
        ProgressUpdate::NotFound
    }

    /// Update an active quest's progress. Completion moves the quest to
    /// the completed set and awards a quest point, exactly once.
    pub fn update_quest_progress(&mut self, name: &str, progress: f64) -> ProgressUpdate {
        let progress = progress.clamp(0.0, 1.0);
        let Some(index) = self.active_quests.iter().position(|q| q.name == name) else {
            return ProgressUpdate::NotFound;
        };

        let quest = &mut self.active_quests[index];
        quest.progress = progress;
        if progress >= COMPLETION_THRESHOLD && !quest.completed {
            let mut quest = self.active_quests.remove(index);
            quest.completed = true;
            quest.completed_at = Some(unix_now());
            let name = quest.name.clone();
            self.completed_quests.push(quest);
            self.quest_points += 1;
            return ProgressUpdate::Completed { name };
        }
        ProgressUpdate::Updated { progress }
    }

    /// Offered quests whose requirements the snapshot meets.
    pub fn eligible_quests(&self, skills: &BTreeMap<String, i64>) -> Vec<&QuestGoal> {
        self.available_quests
            .iter()
            .filter(|q| q.requirements_met(skills, self.quest_points))
            .collect()
    }

    pub fn short_term_goals(&self) -> &[Goal] {
        &self.short_term
    }

    pub fn long_term_goals(&self) -> &[Goal] {
        &self.long_term
    }

    pub fn available_quests(&self) -> &[QuestGoal] {
        &self.available_quests
    }

    pub fn active_quests(&self) -> &[QuestGoal] {
        &self.active_quests
    }

    pub fn completed_quests(&self) -> &[QuestGoal] {
        &self.completed_quests
    }

    pub fn quest_points(&self) -> u32 {
        self.quest_points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_completes_exactly_once() {
        let mut tracker = GoalTracker::new();
        tracker.add_goal(Goal::new(
            "Complete Tutorial Island",
            "Learn the basics",
            GoalKind::ShortTerm,
        ));

        let first = tracker.update_goal_progress("Complete Tutorial Island", 1.0);
        assert_eq!(
            first,
            ProgressUpdate::Completed {
                name: "Complete Tutorial Island".to_string()
            }
        );

        // Re-crossing the threshold must not re-trigger completion.
        let second = tracker.update_goal_progress("Complete Tutorial Island", 1.0);
        assert_eq!(second, ProgressUpdate::Updated { progress: 1.0 });
        assert!(tracker.short_term_goals()[0].completed);
    }

    #[test]
    fn test_unknown_goal_is_not_found() {
        let mut tracker = GoalTracker::new();
        assert_eq!(
            tracker.update_goal_progress("Missing", 0.5),
            ProgressUpdate::NotFound
        );
    }

    #[test]
    fn test_long_term_goals_searched_after_short() {
        let mut tracker = GoalTracker::new();
        tracker.add_goal(
            Goal::new("Reach Combat Level 30", "Train combat", GoalKind::LongTerm)
                .with_requirement("attack", 30),
        );

        let update = tracker.update_goal_progress("Reach Combat Level 30", 0.4);
        assert_eq!(update, ProgressUpdate::Updated { progress: 0.4 });
    }

    #[test]
    fn test_quest_moves_active_to_completed_once() {
        let mut tracker = GoalTracker::new();
        tracker.add_quest(QuestGoal::new("Cook's Assistant", "Help the cook"));

        let update = tracker.update_quest_progress("Cook's Assistant", 1.0);
        assert_eq!(
            update,
            ProgressUpdate::Completed {
                name: "Cook's Assistant".to_string()
            }
        );
        assert!(tracker.active_quests().is_empty());
        assert_eq!(tracker.completed_quests().len(), 1);
        assert_eq!(tracker.quest_points(), 1);

        // Completed quests never move backward or re-complete.
        assert_eq!(
            tracker.update_quest_progress("Cook's Assistant", 1.0),
            ProgressUpdate::NotFound
        );
        assert_eq!(tracker.quest_points(), 1);
    }

    #[test]
    fn test_accept_quest_moves_available_to_active() {
        let mut tracker = GoalTracker::new();
        tracker.offer_quest(QuestGoal::new("Sheep Shearer", "Shear some sheep"));

        assert!(tracker.accept_quest("Sheep Shearer"));
        assert!(tracker.available_quests().is_empty());
        assert_eq!(tracker.active_quests().len(), 1);
        assert!(!tracker.accept_quest("Sheep Shearer"));
    }

    #[test]
    fn test_eligible_quests_respect_requirements() {
        let mut tracker = GoalTracker::new();
        tracker.offer_quest(
            QuestGoal::new("Dragon Slayer", "Slay the dragon").with_required_skill("attack", 40),
        );
        tracker.offer_quest(QuestGoal::new("Rune Mysteries", "Learn about runes"));

        let mut skills = BTreeMap::new();
        skills.insert("attack".to_string(), 10);
        let eligible = tracker.eligible_quests(&skills);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].name, "Rune Mysteries");
    }

    #[test]
    fn test_progress_from_percent() {
        assert_eq!(progress_from_percent(50.0), 0.5);
        assert_eq!(progress_from_percent(150.0), 1.0);
        assert_eq!(progress_from_percent(-10.0), 0.0);
    }

    #[test]
    fn test_progress_clamped() {
        let mut tracker = GoalTracker::new();
        tracker.add_goal(Goal::new("Clamp", "", GoalKind::ShortTerm));
        tracker.update_goal_progress("Clamp", 2.5);
        assert_eq!(tracker.short_term_goals()[0].progress, 1.0);
    }
}
