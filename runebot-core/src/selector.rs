//! Personality-weighted action selection.
//!
//! Candidates come from per-style generators (pure functions of the
//! observation and discovered state), get filtered by restrictions and
//! feasibility, then ranked by a personality score blended with the
//! resilience tracker's score and the outcome memory's learned bias.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use crate::goals::GoalTracker;
use crate::learning::outcome::OutcomeMemory;
use crate::learning::resilience::ResilienceTracker;
use crate::observation::Observation;
use crate::personality::{PersonalityProfile, PlayStyle, QuestStrategy};

/// Weight of the personality score in the final blend.
const PERSONALITY_WEIGHT: f64 = 0.5;

/// Weight of the resilience tracker's score in the final blend.
const RESILIENCE_WEIGHT: f64 = 0.3;

/// Weight of the outcome memory's learned success rate in the blend.
const MEMORY_WEIGHT: f64 = 0.2;

/// Bonus when a candidate's category matches an active style.
const STYLE_MATCH_BONUS: f64 = 0.3;

/// Bonus when a candidate references a long-term goal by name.
const GOAL_MATCH_BONUS: f64 = 0.2;

/// Wealth ceiling below which money-making stays attractive.
const WEALTH_TARGET: i64 = 1_000_000;

/// Broad family a candidate action belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Combat,
    Skilling,
    Questing,
    Exploration,
    MoneyMaking,
    Completion,
    PetHunting,
    Social,
    General,
}

impl ActionCategory {
    /// Lowercase label used by the restriction heuristic.
    pub fn label(&self) -> &'static str {
        match self {
            ActionCategory::Combat => "combat",
            ActionCategory::Skilling => "skilling",
            ActionCategory::Questing => "questing",
            ActionCategory::Exploration => "exploration",
            ActionCategory::MoneyMaking => "money_making",
            ActionCategory::Completion => "completion",
            ActionCategory::PetHunting => "pet_hunting",
            ActionCategory::Social => "social",
            ActionCategory::General => "general",
        }
    }
}

/// A named possible behavior considered during selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub description: String,
    pub category: ActionCategory,
    /// Where the action would happen, when known.
    pub location: Option<String>,
    pub required_items: Vec<String>,
    pub required_skills: BTreeMap<String, i64>,
    pub expected_rewards: Vec<String>,
    /// Risk indicators; any entry marks the action as dangerous.
    pub risks: Vec<String>,
}

impl Candidate {
    pub fn new(name: impl Into<String>, category: ActionCategory) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            category,
            location: None,
            required_items: Vec::new(),
            required_skills: BTreeMap::new(),
            expected_rewards: Vec::new(),
            risks: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_required_item(mut self, item: impl Into<String>) -> Self {
        self.required_items.push(item.into());
        self
    }

    pub fn with_required_skill(mut self, skill: impl Into<String>, level: i64) -> Self {
        self.required_skills.insert(skill.into(), level);
        self
    }

    pub fn with_risk(mut self, risk: impl Into<String>) -> Self {
        self.risks.push(risk.into());
        self
    }

    /// Dangerous actions carry at least one risk indicator.
    pub fn is_dangerous(&self) -> bool {
        !self.risks.is_empty()
    }
}

/// A hit from the knowledge collaborator. The core treats these as
/// opaque candidate metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeHit {
    pub title: String,
    pub snippet: String,
}

/// Opaque query function into the wiki/knowledge subsystem.
pub trait KnowledgeSource {
    fn query(&self, text: &str) -> Vec<KnowledgeHit>;
}

/// Knowledge source that knows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKnowledge;

impl KnowledgeSource for NoKnowledge {
    fn query(&self, _text: &str) -> Vec<KnowledgeHit> {
        Vec::new()
    }
}

/// Predicate deciding whether a candidate violates a personality
/// restriction. Kept behind a trait so the substring heuristic can be
/// swapped for a real classifier without touching the scoring.
pub trait RestrictionPolicy {
    fn blocks(&self, candidate: &Candidate) -> bool;
}

/// The default restriction heuristic: a candidate is blocked when its
/// name or category label contains a restriction phrase. Two aliases
/// are special-cased ("ge" blocks the grand exchange, "trading" blocks
/// trades). Fragile by construction; see `RestrictionPolicy`.
#[derive(Debug, Clone, Default)]
pub struct SubstringRestrictions {
    patterns: Vec<String>,
}

impl SubstringRestrictions {
    pub fn new(patterns: &[String]) -> Self {
        Self {
            patterns: patterns.iter().map(|p| p.to_lowercase()).collect(),
        }
    }
}

impl RestrictionPolicy for SubstringRestrictions {
    fn blocks(&self, candidate: &Candidate) -> bool {
        let name = candidate.name.to_lowercase();
        let category = candidate.category.label();
        for pattern in &self.patterns {
            if pattern.is_empty() {
                continue;
            }
            if name.contains(pattern) || category.contains(pattern.as_str()) {
                return true;
            }
            if pattern == "ge" && name.contains("grand_exchange") {
                return true;
            }
            if pattern == "trading" && name.contains("trade") {
                return true;
            }
        }
        false
    }
}

/// The chosen action with confidence and stated reasoning.
#[derive(Debug, Clone)]
pub struct Decision {
    pub candidate: Candidate,
    pub confidence: f64,
    pub reasoning: String,
}

/// Outcome of a selection pass.
#[derive(Debug, Clone)]
pub enum Selection {
    /// A feasible action was chosen.
    Chosen(Decision),

    /// Every candidate failed a requirement. Carries the best-ranked
    /// infeasible candidate and what it is missing, so the caller can
    /// decide whether to wait, re-observe, or attempt it anyway.
    NoneFeasible {
        best: Candidate,
        missing: Vec<String>,
    },
}

/// Errors from selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// No generator produced a candidate for this observation. A caller
    /// precondition violation, reported loudly.
    #[error("no candidate actions were generated for this observation")]
    NoCandidates,
}

/// Builds, filters, and ranks candidate actions for one observation.
pub struct ActionSelector {
    profile: PersonalityProfile,
    restrictions: Box<dyn RestrictionPolicy>,
}

impl ActionSelector {
    /// Create a selector whose restriction policy is the default
    /// substring heuristic over the profile's restriction phrases.
    pub fn new(profile: PersonalityProfile) -> Self {
        let restrictions = Box::new(SubstringRestrictions::new(&profile.restrictions));
        Self {
            profile,
            restrictions,
        }
    }

    /// Replace the restriction policy.
    pub fn with_restriction_policy(mut self, policy: Box<dyn RestrictionPolicy>) -> Self {
        self.restrictions = policy;
        self
    }

    pub fn profile(&self) -> &PersonalityProfile {
        &self.profile
    }

    /// Select the best action for this observation.
    pub fn select(
        &self,
        observation: &Observation,
        outcomes: &OutcomeMemory,
        resilience: &ResilienceTracker,
        goals: &GoalTracker,
        knowledge: &dyn KnowledgeSource,
    ) -> Result<Selection, SelectionError> {
        let candidates = self.generate(observation, goals, knowledge);
        if candidates.is_empty() {
            return Err(SelectionError::NoCandidates);
        }

        let allowed: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| !self.restrictions.blocks(c))
            .collect();
        if allowed.is_empty() {
            return Err(SelectionError::NoCandidates);
        }

        let (feasible, infeasible): (Vec<Candidate>, Vec<Candidate>) = allowed
            .into_iter()
            .partition(|c| self.is_feasible(c, observation));

        if feasible.is_empty() {
            // Report instead of returning an action the agent cannot
            // actually perform.
            if let Some(best) = self.rank_by_personality(&infeasible) {
                let best = best.clone();
                let missing = self.missing_requirements(&best, observation);
                debug!(action = %best.name, "no feasible candidate");
                return Ok(Selection::NoneFeasible { best, missing });
            }
            return Err(SelectionError::NoCandidates);
        }

        let mut best_index = 0;
        let mut best_score = f64::NEG_INFINITY;
        let mut best_parts = (0.0, 0.0, 0.0);
        for (index, candidate) in feasible.iter().enumerate() {
            let personality = self.personality_score(candidate);
            let location = candidate
                .location
                .as_deref()
                .or(if observation.location.is_empty() {
                    None
                } else {
                    Some(observation.location.as_str())
                });
            let resilience_score = resilience.score(&candidate.name, location);
            let memory_bias = outcomes
                .stats(&candidate.name)
                .map(|s| s.success_rate)
                .unwrap_or(0.5);
            let blended = (personality * PERSONALITY_WEIGHT
                + resilience_score * RESILIENCE_WEIGHT
                + memory_bias * MEMORY_WEIGHT)
                .clamp(0.0, 1.0);
            // Strict greater-than keeps the first-generated candidate
            // on ties.
            if blended > best_score {
                best_score = blended;
                best_index = index;
                best_parts = (personality, resilience_score, memory_bias);
            }
        }

        let candidate = feasible[best_index].clone();
        let (personality, resilience_score, memory_bias) = best_parts;
        let reasoning = format!(
            "{} [{}]: personality {:.2}, resilience {:.2}, memory {:.2}",
            candidate.name,
            candidate.category.label(),
            personality,
            resilience_score,
            memory_bias,
        );

        Ok(Selection::Chosen(Decision {
            candidate,
            confidence: best_score,
            reasoning,
        }))
    }

    /// Union the per-style generators, the goal tracker's active
    /// quests, knowledge hits, and the environment-offered candidates.
    /// Duplicate names keep their first occurrence.
    fn generate(
        &self,
        observation: &Observation,
        goals: &GoalTracker,
        knowledge: &dyn KnowledgeSource,
    ) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for style in &self.profile.styles {
            match style {
                PlayStyle::SweatyPvmer => {
                    candidates.extend(combat_candidates(observation));
                }
                PlayStyle::Explorer => {
                    candidates.extend(exploration_candidates(observation));
                }
                PlayStyle::CasualSkiller | PlayStyle::SkillerPure => {
                    candidates.extend(skilling_candidates(observation));
                }
                PlayStyle::LoreSeeker => {
                    candidates.extend(quest_candidates(
                        self.profile.quest_strategy,
                        goals,
                        knowledge,
                    ));
                }
                PlayStyle::MoneyMaker => {
                    candidates.extend(money_candidates(observation));
                }
                PlayStyle::Completionist => {
                    candidates.push(
                        Candidate::new("Review completion progress", ActionCategory::Completion)
                            .with_description("Check completion status across the game"),
                    );
                }
                PlayStyle::PetHunter => {
                    candidates.push(
                        Candidate::new("Hunt for a pet", ActionCategory::PetHunting)
                            .with_description("Grind activities with pet drops"),
                    );
                }
                PlayStyle::Socialite => {
                    candidates.push(
                        Candidate::new("Chat with nearby players", ActionCategory::Social)
                            .with_description("Socialize where people gather"),
                    );
                }
            }
        }

        for name in &observation.candidate_actions {
            candidates.push(
                Candidate::new(name.clone(), ActionCategory::General)
                    .with_description("Offered by the environment"),
            );
        }

        let mut seen = std::collections::BTreeSet::new();
        candidates.retain(|c| seen.insert(c.name.clone()));
        candidates
    }

    fn is_feasible(&self, candidate: &Candidate, observation: &Observation) -> bool {
        candidate
            .required_items
            .iter()
            .all(|item| observation.has_item(item))
            && observation.meets_skills(&candidate.required_skills)
    }

    fn missing_requirements(&self, candidate: &Candidate, observation: &Observation) -> Vec<String> {
        let mut missing = Vec::new();
        for item in &candidate.required_items {
            if !observation.has_item(item) {
                missing.push(format!("item: {item}"));
            }
        }
        for (skill, level) in &candidate.required_skills {
            if observation.skill_level(skill) < *level {
                missing.push(format!("skill: {skill} >= {level}"));
            }
        }
        missing
    }

    fn rank_by_personality<'a>(&self, candidates: &'a [Candidate]) -> Option<&'a Candidate> {
        let mut best: Option<(&Candidate, f64)> = None;
        for candidate in candidates {
            let score = self.personality_score(candidate);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((candidate, score)),
            }
        }
        best.map(|(c, _)| c)
    }

    /// Personality score in `[0, 1]`: base 0.5, a style-match bonus, a
    /// long-term-goal bonus, a danger adjustment scaled by risk
    /// tolerance, and a lean from the weight matching the category.
    fn personality_score(&self, candidate: &Candidate) -> f64 {
        let weights = &self.profile.weights;
        let mut score = 0.5;

        if self.style_matches(candidate.category) {
            score += STYLE_MATCH_BONUS;
        }

        let name = candidate.name.to_lowercase();
        if self
            .profile
            .long_term_goals
            .iter()
            .any(|goal| !goal.is_empty() && name.contains(&goal.to_lowercase()))
        {
            score += GOAL_MATCH_BONUS;
        }

        if candidate.is_dangerous() {
            // +0.2 at full risk tolerance, -0.2 at none.
            score += (weights.risk_tolerance - 0.5) * 0.4;
        }

        let affinity = match candidate.category {
            ActionCategory::Exploration => weights.exploration_preference,
            ActionCategory::Social => weights.social_preference,
            ActionCategory::Skilling | ActionCategory::MoneyMaking => weights.efficiency_focus,
            ActionCategory::Questing | ActionCategory::Completion => weights.goal_orientation,
            ActionCategory::Combat | ActionCategory::PetHunting => weights.risk_tolerance,
            ActionCategory::General => 0.5,
        };
        score += (affinity - 0.5) * 0.2;

        score.clamp(0.0, 1.0)
    }

    fn style_matches(&self, category: ActionCategory) -> bool {
        self.profile.styles.iter().any(|style| {
            matches!(
                (style, category),
                (PlayStyle::SweatyPvmer, ActionCategory::Combat)
                    | (PlayStyle::Explorer, ActionCategory::Exploration)
                    | (PlayStyle::CasualSkiller, ActionCategory::Skilling)
                    | (PlayStyle::SkillerPure, ActionCategory::Skilling)
                    | (PlayStyle::LoreSeeker, ActionCategory::Questing)
                    | (PlayStyle::MoneyMaker, ActionCategory::MoneyMaking)
                    | (PlayStyle::Completionist, ActionCategory::Completion)
                    | (PlayStyle::PetHunter, ActionCategory::PetHunting)
                    | (PlayStyle::Socialite, ActionCategory::Social)
            )
        })
    }
}

fn combat_candidates(observation: &Observation) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    if observation.location.to_lowercase().contains("boss") {
        candidates.push(
            Candidate::new("Fight the boss", ActionCategory::Combat)
                .with_description("Fight the boss in this area")
                .with_location(observation.location.clone())
                .with_required_skill("combat_level", 70)
                .with_required_item("food")
                .with_required_item("potions")
                .with_risk("boss fight"),
        );
    }
    candidates
}

fn exploration_candidates(observation: &Observation) -> Vec<Candidate> {
    observation
        .discovered_locations
        .iter()
        .filter(|location| **location != observation.location)
        .map(|location| {
            Candidate::new(format!("Explore {location}"), ActionCategory::Exploration)
                .with_description(format!("Travel to and explore {location}"))
                .with_location(location.clone())
        })
        .collect()
}

fn skilling_candidates(observation: &Observation) -> Vec<Candidate> {
    observation
        .skills
        .iter()
        .filter(|(_, level)| **level < 99)
        .map(|(skill, _)| {
            Candidate::new(format!("Train {skill}"), ActionCategory::Skilling)
                .with_description(format!("Train the {skill} skill"))
        })
        .collect()
}

fn quest_candidates(
    strategy: QuestStrategy,
    goals: &GoalTracker,
    knowledge: &dyn KnowledgeSource,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    let guide = match strategy {
        QuestStrategy::FollowGuide => "Follow the quest guide",
        QuestStrategy::Explore => "Explore the quest area",
        QuestStrategy::Efficient => "Plan an efficient quest route",
    };
    candidates.push(
        Candidate::new(guide, ActionCategory::Questing)
            .with_description("Work on questing the preferred way"),
    );

    for quest in goals.active_quests() {
        candidates.push(
            Candidate::new(format!("Advance quest {}", quest.name), ActionCategory::Questing)
                .with_description(quest.description.clone()),
        );
    }

    for hit in knowledge.query("What quests are available for a new player?") {
        candidates.push(
            Candidate::new(format!("Start quest {}", hit.title), ActionCategory::Questing)
                .with_description(hit.snippet),
        );
    }

    candidates
}

fn money_candidates(observation: &Observation) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    if observation.wealth < WEALTH_TARGET {
        candidates.push(
            Candidate::new("Focus on money making", ActionCategory::MoneyMaking)
                .with_description("Work towards the next wealth milestone"),
        );
    }
    candidates
}
