//! Explicit-state probabilistic models.
//!
//! A model is an ordered collection of states `0..n`. State `i` owns zero or
//! more enumerated choices, each a [`Distribution`] over successor states.
//! Fully stochastic models (DTMC, CTMC) have at most one choice per state.
//!
//! The [`Model`] trait is the read-only view used by checkers and by product
//! construction. Representations that can be rebuilt with new choices
//! advertise it through [`Model::product_builder`], which hands out a
//! [`ModelBuilder`] for a fresh model of the same representation.

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::bitset::BitSet;
use crate::distribution::Distribution;
use crate::state::State;
use crate::types::{ModelType, Player};

/// A named reward structure: state rewards plus optional per-choice rewards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RewardStructure {
    pub name: String,
    pub state_rewards: Vec<f64>,
    /// `choice_rewards[s][c]`, the reward for taking choice `c` in state `s`.
    pub choice_rewards: Option<Vec<Vec<f64>>>,
}

impl RewardStructure {
    pub fn new(name: impl Into<String>, state_rewards: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            state_rewards,
            choice_rewards: None,
        }
    }

    pub fn with_choice_rewards(mut self, choice_rewards: Vec<Vec<f64>>) -> Self {
        self.choice_rewards = Some(choice_rewards);
        self
    }

    pub fn state_reward(&self, state: usize) -> f64 {
        self.state_rewards.get(state).copied().unwrap_or(0.0)
    }

    pub fn choice_reward(&self, state: usize, choice: usize) -> f64 {
        self.choice_rewards
            .as_ref()
            .and_then(|r| r.get(state))
            .and_then(|r| r.get(choice))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Read-only view of a probabilistic model.
pub trait Model {
    fn model_type(&self) -> ModelType;

    fn num_states(&self) -> usize;

    fn num_choices(&self, state: usize) -> usize;

    /// The distribution of choice `index` in `state`, if it exists.
    fn choice(&self, state: usize, index: usize) -> Option<Cow<'_, Distribution>>;

    fn initial_states(&self) -> &BitSet;

    /// Variable valuations of the states, if the model carries them.
    fn states_list(&self) -> Option<&[State]>;

    /// Labels attached to the model itself (e.g. by model construction).
    fn labels(&self) -> &BTreeMap<String, BitSet>;

    fn reward_structures(&self) -> &[RewardStructure];

    /// Owner of `state`; only meaningful for games.
    fn player(&self, _state: usize) -> Player {
        Player::One
    }

    /// Returns a builder for a fresh model of this representation with
    /// `num_states` states, or `None` if the representation cannot be rebuilt
    /// choice by choice.
    fn product_builder(&self, _num_states: usize) -> Option<Box<dyn ModelBuilder>> {
        None
    }

    /// Total number of choices.
    fn num_all_choices(&self) -> usize {
        (0..self.num_states()).map(|s| self.num_choices(s)).sum()
    }

    /// Total number of transitions.
    fn num_transitions(&self) -> usize {
        (0..self.num_states())
            .flat_map(|s| (0..self.num_choices(s)).map(move |c| (s, c)))
            .filter_map(|(s, c)| self.choice(s, c).map(|d| d.len()))
            .sum()
    }

    /// Looks up a reward structure by name, or the first one for `None`.
    fn reward_structure(&self, name: Option<&str>) -> Option<&RewardStructure> {
        match name {
            Some(name) => self.reward_structures().iter().find(|r| r.name == name),
            None => self.reward_structures().first(),
        }
    }

    /// Short summary for log output.
    fn info_string(&self) -> String {
        format!(
            "{} with {} states, {} choices, {} transitions",
            self.model_type(),
            self.num_states(),
            self.num_all_choices(),
            self.num_transitions()
        )
    }
}

/// In-place construction of a model, choice by choice.
pub trait ModelBuilder {
    fn set_states_list(&mut self, states: Vec<State>);

    fn add_initial_state(&mut self, state: usize);

    fn add_label(&mut self, name: String, states: BitSet);

    fn add_reward_structure(&mut self, rewards: RewardStructure);

    /// Appends a choice to `state` and returns its index.
    fn add_choice(&mut self, state: usize, distribution: Distribution) -> usize;

    fn build(self: Box<Self>) -> Box<dyn Model>;
}

/// A model stored as a vector of choice lists, one per state.
///
/// This is the mutable representation: choices can be appended at any time.
#[derive(Debug, Clone)]
pub struct ExplicitModel {
    model_type: ModelType,
    trans: Vec<Vec<Distribution>>,
    initial: BitSet,
    states_list: Option<Vec<State>>,
    labels: BTreeMap<String, BitSet>,
    rewards: Vec<RewardStructure>,
    players: Option<Vec<Player>>,
}

impl ExplicitModel {
    pub fn new(model_type: ModelType, num_states: usize) -> Self {
        Self {
            model_type,
            trans: vec![Vec::new(); num_states],
            initial: BitSet::new(num_states),
            states_list: None,
            labels: BTreeMap::new(),
            rewards: Vec::new(),
            players: None,
        }
    }

    /// Appends a choice to `state` and returns its index.
    pub fn add_choice(&mut self, state: usize, distribution: Distribution) -> usize {
        let choices = &mut self.trans[state];
        choices.push(distribution);
        choices.len() - 1
    }

    pub fn add_initial_state(&mut self, state: usize) {
        self.initial.insert(state);
    }

    pub fn add_label(&mut self, name: impl Into<String>, states: BitSet) {
        self.labels.insert(name.into(), states);
    }

    pub fn add_reward_structure(&mut self, rewards: RewardStructure) {
        self.rewards.push(rewards);
    }

    pub fn set_states_list(&mut self, states: Vec<State>) {
        self.states_list = Some(states);
    }

    pub fn set_players(&mut self, players: Vec<Player>) {
        self.players = Some(players);
    }

    /// Adds a self-loop to every state without choices. Returns the fixed states.
    pub fn fix_deadlocks(&mut self) -> BitSet {
        let mut fixed = BitSet::empty();
        for s in 0..self.trans.len() {
            if self.trans[s].is_empty() {
                self.trans[s].push(Distribution::point(s));
                fixed.insert(s);
            }
        }
        fixed
    }

    pub fn choices(&self, state: usize) -> &[Distribution] {
        &self.trans[state]
    }
}

impl Model for ExplicitModel {
    fn model_type(&self) -> ModelType {
        self.model_type
    }

    fn num_states(&self) -> usize {
        self.trans.len()
    }

    fn num_choices(&self, state: usize) -> usize {
        self.trans.get(state).map_or(0, |c| c.len())
    }

    fn choice(&self, state: usize, index: usize) -> Option<Cow<'_, Distribution>> {
        self.trans.get(state)?.get(index).map(Cow::Borrowed)
    }

    fn initial_states(&self) -> &BitSet {
        &self.initial
    }

    fn states_list(&self) -> Option<&[State]> {
        self.states_list.as_deref()
    }

    fn labels(&self) -> &BTreeMap<String, BitSet> {
        &self.labels
    }

    fn reward_structures(&self) -> &[RewardStructure] {
        &self.rewards
    }

    fn player(&self, state: usize) -> Player {
        self.players
            .as_ref()
            .and_then(|p| p.get(state).copied())
            .unwrap_or_default()
    }

    fn product_builder(&self, num_states: usize) -> Option<Box<dyn ModelBuilder>> {
        Some(Box::new(ExplicitModel::new(self.model_type, num_states)))
    }
}

impl ModelBuilder for ExplicitModel {
    fn set_states_list(&mut self, states: Vec<State>) {
        ExplicitModel::set_states_list(self, states);
    }

    fn add_initial_state(&mut self, state: usize) {
        ExplicitModel::add_initial_state(self, state);
    }

    fn add_label(&mut self, name: String, states: BitSet) {
        ExplicitModel::add_label(self, name, states);
    }

    fn add_reward_structure(&mut self, rewards: RewardStructure) {
        ExplicitModel::add_reward_structure(self, rewards);
    }

    fn add_choice(&mut self, state: usize, distribution: Distribution) -> usize {
        ExplicitModel::add_choice(self, state, distribution)
    }

    fn build(self: Box<Self>) -> Box<dyn Model> {
        self
    }
}
