//! Model-checking entry point.
//!
//! The [`Dispatcher`] selects a checker for the model type, resolves the
//! solver [`Settings`] into [`CheckerOptions`](crate::config::CheckerOptions)
//! for it, and runs it on a single property. It keeps no state between
//! calls: every [`Dispatcher::model_check`] creates and configures a fresh
//! checker.
//!
//! # Examples
//!
//! ```
//! use pmc_rs::distribution::Distribution;
//! use pmc_rs::dispatch::Dispatcher;
//! use pmc_rs::labels::Labels;
//! use pmc_rs::model::ExplicitModel;
//! use pmc_rs::property::{Property, PropertySet, StateFormula};
//! use pmc_rs::types::ModelType;
//!
//! let mut model = ExplicitModel::new(ModelType::Dtmc, 3);
//! model.add_choice(0, [(1, 0.5), (2, 0.5)].into_iter().collect());
//! model.add_choice(1, Distribution::point(1));
//! model.add_choice(2, Distribution::point(2));
//! model.add_initial_state(0);
//! model.add_label("done", [1].into_iter().collect());
//!
//! let labels = Labels::from_model(&model);
//! let property = Property::prob(None, StateFormula::label("done").eventually());
//! let result = Dispatcher::default()
//!     .model_check(&model, &labels, &PropertySet::new(), &property)
//!     .unwrap();
//! assert_eq!(result.value_f64(), Some(0.5));
//! ```

use log::{debug, info};

use crate::checker::{CtmcChecker, CtmdpChecker, DtmcChecker, MdpChecker, ModelChecker, StpgChecker};
use crate::config::{CheckerOptions, Settings};
use crate::error::CheckError;
use crate::labels::Labels;
use crate::model::Model;
use crate::property::{Property, PropertySet};
use crate::result::CheckResult;
use crate::types::ModelType;

/// Creates the checker for a model type.
pub fn checker_for(model_type: ModelType, options: CheckerOptions) -> Box<dyn ModelChecker> {
    match model_type {
        ModelType::Dtmc => Box::new(DtmcChecker::new(options)),
        ModelType::Mdp => Box::new(MdpChecker::new(options)),
        ModelType::Ctmc => Box::new(CtmcChecker::new(options)),
        ModelType::Ctmdp => Box::new(CtmdpChecker::new(options)),
        ModelType::Stpg => Box::new(StpgChecker::new(options)),
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    settings: Settings,
}

impl Dispatcher {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Model checks `property` on `model`.
    ///
    /// Fails with [`CheckError::PropertyModelMismatch`] before any checker is
    /// created if the property does not make sense for the model type.
    pub fn model_check(
        &self,
        model: &dyn Model,
        labels: &Labels,
        props: &PropertySet,
        property: &Property,
    ) -> Result<CheckResult, CheckError> {
        property.check_valid(model)?;
        check_structure(model)?;

        let model_type = model.model_type();
        let options = self.settings.resolve(model_type)?;
        info!("Model checking {} on {}", property, model.info_string());
        info!(
            "Using {} checker: {}, termination {} ({:e}), precomputation {}",
            model_type,
            options.soln_method,
            options.term_crit,
            options.term_crit_param,
            if options.precomputation { "on" } else { "off" },
        );

        let checker = checker_for(model_type, options);
        let result = checker.check(model, labels, props, property)?;
        info!(
            "Result: {} ({} iterations, {:?})",
            result.value, result.stats.iterations, result.stats.elapsed
        );
        Ok(result)
    }
}

/// Rejects nondeterminism in models whose type does not allow it.
fn check_structure(model: &dyn Model) -> Result<(), CheckError> {
    let model_type = model.model_type();
    if model_type.is_nondeterministic() {
        return Ok(());
    }
    if let Some(s) = (0..model.num_states()).find(|&s| model.num_choices(s) > 1) {
        return Err(CheckError::InvalidModel(format!(
            "state {} of a {} has {} choices",
            s,
            model_type,
            model.num_choices(s)
        )));
    }
    debug!("Structure check passed for {}", model_type);
    Ok(())
}
