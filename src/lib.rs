//! # pmc-rs: Probabilistic Model Checking in Rust
//!
//! **`pmc-rs`** computes probabilities and expected rewards on explicit-state
//! probabilistic models, and synthesises and applies finite-memory strategies.
//!
//! ## Models
//!
//! Five model types are supported, see [`ModelType`][crate::types::ModelType]:
//! discrete-time Markov chains (DTMC), Markov decision processes (MDP),
//! continuous-time Markov chains (CTMC), continuous-time MDPs (CTMDP) and
//! stochastic two-player games (STPG).
//! A model is a sequence of states `0..n`, each owning zero or more choices,
//! and every choice is a [`Distribution`][crate::distribution::Distribution]
//! over successor states.
//! Two representations implement the [`Model`][crate::model::Model] trait:
//! [`ExplicitModel`][crate::model::ExplicitModel] (a list of distributions per
//! state) and [`SparseModel`][crate::sparse::SparseModel] (compressed rows).
//!
//! ## Model Checking
//!
//! All checking goes through the [`Dispatcher`][crate::dispatch::Dispatcher]:
//! it validates the property against the model type, resolves the solver
//! [`Settings`][crate::config::Settings], picks the checker for the model
//! type and runs it.
//!
//! ```rust
//! use pmc_rs::config::Settings;
//! use pmc_rs::dispatch::Dispatcher;
//! use pmc_rs::distribution::Distribution;
//! use pmc_rs::labels::Labels;
//! use pmc_rs::model::ExplicitModel;
//! use pmc_rs::property::{Opt, Property, PropertySet, StateFormula};
//! use pmc_rs::types::ModelType;
//!
//! // 0 --a--> {1: 0.5, 2: 0.5}
//! // 0 --b--> {1: 0.9, 2: 0.1}
//! let mut mdp = ExplicitModel::new(ModelType::Mdp, 3);
//! mdp.add_choice(0, [(1, 0.5), (2, 0.5)].into_iter().collect());
//! mdp.add_choice(0, [(1, 0.9), (2, 0.1)].into_iter().collect());
//! mdp.add_choice(1, Distribution::point(1));
//! mdp.add_choice(2, Distribution::point(2));
//! mdp.add_initial_state(0);
//! mdp.add_label("goal", [1].into_iter().collect());
//!
//! let dispatcher = Dispatcher::new(Settings::default().with_mdp_soln_method("Policy iteration"));
//! let property = Property::prob(Some(Opt::Max), StateFormula::label("goal").eventually());
//! let result = dispatcher
//!     .model_check(&mdp, &Labels::from_model(&mdp), &PropertySet::new(), &property)
//!     .unwrap();
//! assert_eq!(result.value_f64(), Some(0.9));
//! ```
//!
//! ## Strategies
//!
//! A [`StepBoundedDeterministicStrategy`][crate::strategy::StepBoundedDeterministicStrategy]
//! picks one choice per state depending on the number of steps remaining.
//! It can be written by hand, or generated by the MDP checker for
//! step-bounded properties when
//! [`Settings::generate_strategy`][crate::config::Settings::generate_strategy]
//! is set. Its [product][crate::product] with an MDP is a new model with one
//! choice per state, which can be checked again.
//!
//! ## Core Components
//!
//! - **[`checker`]**: The checkers, precomputation and numerical methods.
//! - **[`strategy`]**: The [`Strategy`][crate::strategy::Strategy] trait and the step-bounded strategy.
//! - **[`product`]**: Product construction of a strategy and a model.

pub mod bitset;
pub mod checker;
pub mod config;
pub mod dispatch;
pub mod distribution;
pub mod error;
pub mod expr;
pub mod labels;
pub mod model;
pub mod product;
pub mod property;
pub mod result;
pub mod sparse;
pub mod state;
pub mod strategy;
pub mod types;
pub mod update;
