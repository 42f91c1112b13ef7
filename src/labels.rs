//! Labelling information: named sets of states (atomic propositions).

use std::collections::BTreeMap;

use crate::bitset::BitSet;
use crate::model::Model;

/// The labelling reference handed to the dispatcher.
///
/// Labels given here take precedence over labels carried by the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Labels {
    labels: BTreeMap<String, BitSet>,
}

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the labels carried by `model`.
    pub fn from_model(model: &dyn Model) -> Self {
        Self {
            labels: model.labels().clone(),
        }
    }

    pub fn add(&mut self, name: impl Into<String>, states: BitSet) {
        self.labels.insert(name.into(), states);
    }

    pub fn get(&self, name: &str) -> Option<&BitSet> {
        self.labels.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.labels.contains_key(name)
    }

    /// Label names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Resolves `name` here first, then among the labels of `model`.
    ///
    /// The built-in labels `init` and `deadlock` are always available.
    pub fn resolve(&self, name: &str, model: &dyn Model) -> Option<BitSet> {
        if let Some(states) = self.labels.get(name).or_else(|| model.labels().get(name)) {
            return Some(states.clone());
        }
        match name {
            "init" => Some(model.initial_states().clone()),
            "deadlock" => Some((0..model.num_states()).filter(|&s| model.num_choices(s) == 0).collect()),
            _ => None,
        }
    }
}

impl FromIterator<(String, BitSet)> for Labels {
    fn from_iter<I: IntoIterator<Item = (String, BitSet)>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}
