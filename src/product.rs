//! Product of a step-bounded strategy with a decision process.
//!
//! The product has one copy of the model per memory level `j` in
//! `1..=bound`. Level `j` lives in block `bound - j`, so product state
//! `(bound - j) * n + i` is original state `i` with `j` steps remaining, and
//! the initial states sit in block 0 at full memory. In each copy only the
//! choice the strategy picks survives; its successors move to level `j - 1`,
//! except at level 1 where they stay at level 1. Once no steps remain the
//! step-bounded objective is already decided, so the last copy absorbs the
//! rest of the run.
//!
//! The result is a model of the same type and representation as the input,
//! with a single choice per state.

use log::{debug, info};

use crate::bitset::BitSet;
use crate::error::{StrategyError, StrategyResult};
use crate::model::{Model, ModelBuilder, RewardStructure};
use crate::state::{State, Value};
use crate::strategy::{MemoryElement, Strategy};
use crate::types::ModelType;

/// Builds the product of `strategy` with `model`.
///
/// The strategy's memory is overwritten level by level while the product is
/// built and restored afterwards, on success or failure, if it was active.
/// Any failure to resolve a move is fatal and reports the offending state and
/// memory level.
pub fn build_product<S: Strategy + ?Sized>(strategy: &mut S, model: &dyn Model) -> StrategyResult<Box<dyn Model>> {
    if !strategy.supports_product() {
        return Err(StrategyError::UnsupportedProductModel(format!(
            "{} does not support product construction",
            strategy.strategy_type()
        )));
    }
    if model.model_type() != ModelType::Mdp {
        return Err(StrategyError::UnsupportedProductModel(format!(
            "expected an MDP, got a {}",
            model.model_type()
        )));
    }

    let n = model.num_states();
    let bound = strategy.memory_size();
    if bound == 0 || n == 0 {
        return Err(StrategyError::UnsupportedProductModel(format!(
            "product of {} states and {} memory levels is empty",
            n, bound
        )));
    }

    if let Some(states) = model.states_list() {
        if states.len() != n {
            return Err(StrategyError::UnsupportedProductModel(format!(
                "the model has {} states but {} state valuations",
                n,
                states.len()
            )));
        }
    }

    let num_states = n * bound;
    let mut builder = model.product_builder(num_states).ok_or_else(|| {
        StrategyError::UnsupportedProductModel("the model representation cannot be rebuilt".to_string())
    })?;
    info!("Building product of {} with {} memory levels", model.info_string(), bound);

    let saved = strategy.current_memory_element().ok();
    let resolved = resolve_levels(strategy, model, builder.as_mut(), bound);
    if let Some(memory) = saved {
        strategy.set_memory(memory)?;
    }
    let actions = resolved?;

    for s in model.initial_states().iter() {
        builder.add_initial_state(s);
    }

    for (name, states) in model.labels() {
        let lifted: BitSet = (0..bound)
            .flat_map(|b| states.iter().map(move |s| b * n + s))
            .collect();
        builder.add_label(name.clone(), lifted);
    }

    for rewards in model.reward_structures() {
        let state_rewards = (0..num_states).map(|p| rewards.state_reward(p % n)).collect();
        let mut lifted = RewardStructure::new(rewards.name.clone(), state_rewards);
        if rewards.choice_rewards.is_some() {
            let choice_rewards = (0..num_states)
                .map(|p| vec![rewards.choice_reward(p % n, actions[p])])
                .collect();
            lifted = lifted.with_choice_rewards(choice_rewards);
        }
        builder.add_reward_structure(lifted);
    }

    let states_list = (0..bound)
        .flat_map(|b| (0..n).map(move |s| (b, s)))
        .map(|(b, s)| {
            let memory = State::new(vec![Value::Int((bound - b) as i64)]);
            match model.states_list() {
                Some(states) => states[s].concat(&memory),
                None => State::from(vec![s as i64]).concat(&memory),
            }
        })
        .collect();
    builder.set_states_list(states_list);

    let product = builder.build();
    info!("Product has {}", product.info_string());
    Ok(product)
}

/// Adds the chosen choice of every product state to `builder`, level by level
/// from `bound` down to 1. Returns the choice taken in each product state.
fn resolve_levels<S: Strategy + ?Sized>(
    strategy: &mut S,
    model: &dyn Model,
    builder: &mut dyn ModelBuilder,
    bound: usize,
) -> StrategyResult<Vec<usize>> {
    let n = model.num_states();
    let block_of = |level: usize| bound - level;

    let mut actions = vec![0; n * bound];
    for level in (1..=bound).rev() {
        let block = block_of(level);
        let next_block = block_of(if level > 1 { level - 1 } else { 1 });
        let fail = |state: usize, source: StrategyError| StrategyError::ProductConstruction {
            state,
            memory: level,
            source: Box::new(source),
        };

        strategy
            .set_memory(MemoryElement::Int(level as i64))
            .map_err(|e| fail(0, e))?;

        for s in 0..n {
            let mv = strategy.next_move(s).map_err(|e| fail(s, e))?;
            let action = match (mv.len(), mv.support().next()) {
                (1, Some(action)) => action,
                _ => {
                    return Err(fail(
                        s,
                        StrategyError::InvalidStrategyState(format!("move {} is not deterministic", mv)),
                    ))
                }
            };
            let choice = model.choice(s, action).ok_or_else(|| {
                fail(
                    s,
                    StrategyError::UnsupportedProductModel(format!(
                        "state {} has {} choices, the strategy picks {}",
                        s,
                        model.num_choices(s),
                        action
                    )),
                )
            })?;

            let product_state = block * n + s;
            builder.add_choice(product_state, choice.map_targets(|t| next_block * n + t));
            actions[product_state] = action;
        }
        debug!("Product level {} done", level);
    }
    Ok(actions)
}
