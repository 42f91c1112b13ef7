//! Compressed-row storage for models.
//!
//! [`SparseModel`] packs all choices into flat arrays: `row_starts[s]` is the
//! first choice of state `s`, `choice_starts[c]` the first transition of
//! choice `c`, and `cols`/`non_zeros` hold the successor indices and weights.
//! It is immutable; rebuilding one choice at a time goes through an
//! [`ExplicitModel`] and is converted back on [`ModelBuilder::build`].

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::bitset::BitSet;
use crate::distribution::Distribution;
use crate::model::{ExplicitModel, Model, ModelBuilder, RewardStructure};
use crate::state::State;
use crate::types::{ModelType, Player};

#[derive(Debug, Clone)]
pub struct SparseModel {
    model_type: ModelType,
    row_starts: Vec<usize>,
    choice_starts: Vec<usize>,
    cols: Vec<usize>,
    non_zeros: Vec<f64>,
    initial: BitSet,
    states_list: Option<Vec<State>>,
    labels: BTreeMap<String, BitSet>,
    rewards: Vec<RewardStructure>,
    players: Vec<Player>,
}

impl SparseModel {
    /// Packs any model into compressed-row form.
    pub fn from_model(model: &dyn Model) -> Self {
        let n = model.num_states();
        let mut row_starts = Vec::with_capacity(n + 1);
        let mut choice_starts = Vec::with_capacity(model.num_all_choices() + 1);
        let mut cols = Vec::new();
        let mut non_zeros = Vec::new();

        for s in 0..n {
            row_starts.push(choice_starts.len());
            for c in 0..model.num_choices(s) {
                choice_starts.push(cols.len());
                if let Some(d) = model.choice(s, c) {
                    for (t, w) in d.iter() {
                        cols.push(t);
                        non_zeros.push(w);
                    }
                }
            }
        }
        row_starts.push(choice_starts.len());
        choice_starts.push(cols.len());

        Self {
            model_type: model.model_type(),
            row_starts,
            choice_starts,
            cols,
            non_zeros,
            initial: model.initial_states().clone(),
            states_list: model.states_list().map(|s| s.to_vec()),
            labels: model.labels().clone(),
            rewards: model.reward_structures().to_vec(),
            players: (0..n).map(|s| model.player(s)).collect(),
        }
    }

    fn choice_index(&self, state: usize, index: usize) -> Option<usize> {
        let start = *self.row_starts.get(state)?;
        let end = *self.row_starts.get(state + 1)?;
        let c = start + index;
        (c < end).then_some(c)
    }
}

impl Model for SparseModel {
    fn model_type(&self) -> ModelType {
        self.model_type
    }

    fn num_states(&self) -> usize {
        self.row_starts.len() - 1
    }

    fn num_choices(&self, state: usize) -> usize {
        match (self.row_starts.get(state), self.row_starts.get(state + 1)) {
            (Some(start), Some(end)) => end - start,
            _ => 0,
        }
    }

    fn choice(&self, state: usize, index: usize) -> Option<Cow<'_, Distribution>> {
        let c = self.choice_index(state, index)?;
        let range = self.choice_starts[c]..self.choice_starts[c + 1];
        let d = self.cols[range.clone()]
            .iter()
            .copied()
            .zip(self.non_zeros[range].iter().copied())
            .collect();
        Some(Cow::Owned(d))
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
        self.players.get(state).copied().unwrap_or_default()
    }

    fn product_builder(&self, num_states: usize) -> Option<Box<dyn ModelBuilder>> {
        Some(Box::new(SparseBuilder {
            inner: ExplicitModel::new(self.model_type, num_states),
        }))
    }

    fn num_transitions(&self) -> usize {
        self.cols.len()
    }
}

/// Builds through an [`ExplicitModel`] and packs the result.
struct SparseBuilder {
    inner: ExplicitModel,
}

impl ModelBuilder for SparseBuilder {
    fn set_states_list(&mut self, states: Vec<State>) {
        self.inner.set_states_list(states);
    }

    fn add_initial_state(&mut self, state: usize) {
        self.inner.add_initial_state(state);
    }

    fn add_label(&mut self, name: String, states: BitSet) {
        self.inner.add_label(name, states);
    }

    fn add_reward_structure(&mut self, rewards: RewardStructure) {
        self.inner.add_reward_structure(rewards);
    }

    fn add_choice(&mut self, state: usize, distribution: Distribution) -> usize {
        self.inner.add_choice(state, distribution)
    }

    fn build(self: Box<Self>) -> Box<dyn Model> {
        Box::new(SparseModel::from_model(&self.inner))
    }
}

impl From<&ExplicitModel> for SparseModel {
    fn from(model: &ExplicitModel) -> Self {
        SparseModel::from_model(model)
    }
}
