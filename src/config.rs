//! Solver settings and resolved checker options.
//!
//! [`Settings`] holds the user-facing, string-valued solver settings (as they
//! would come from a settings file or command line). The dispatcher resolves
//! them into typed [`CheckerOptions`] for the selected checker.
//!
//! # Examples
//!
//! ```
//! use pmc_rs::config::Settings;
//!
//! let settings = Settings::default()
//!     .with_term_crit("Absolute")
//!     .with_term_crit_param(1e-8)
//!     .with_mdp_soln_method("Policy iteration");
//! assert_eq!(settings.term_crit, "Absolute");
//! ```

use std::fmt;

use log::warn;

use crate::error::CheckError;
use crate::types::ModelType;

/// Convergence test on successive iterates.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TermCrit {
    /// `max |x' - x| < ε`
    Absolute,
    /// `max |x' - x| / |x'| < ε`
    Relative,
}

impl TermCrit {
    /// Parses a setting value. Unknown values yield `None`.
    pub fn from_setting(s: &str) -> Option<Self> {
        match s {
            "Absolute" => Some(TermCrit::Absolute),
            "Relative" => Some(TermCrit::Relative),
            _ => None,
        }
    }
}

impl fmt::Display for TermCrit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermCrit::Absolute => write!(f, "Absolute"),
            TermCrit::Relative => write!(f, "Relative"),
        }
    }
}

/// Linear-equation / fixed-point solution method.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SolnMethod {
    ValueIteration,
    GaussSeidel,
    PolicyIteration,
    ModifiedPolicyIteration,
}

impl SolnMethod {
    /// Resolves a method setting for a model type.
    ///
    /// DTMCs and CTMCs support value iteration and Gauss-Seidel; MDPs also
    /// support (modified) policy iteration; CTMDPs and games support value
    /// iteration and Gauss-Seidel. Anything unrecognised falls back to value
    /// iteration.
    pub fn from_setting(model_type: ModelType, s: &str) -> Self {
        let method = match (model_type, s) {
            (_, "Gauss-Seidel") => Some(SolnMethod::GaussSeidel),
            (_, "Value iteration" | "Jacobi" | "Power") => Some(SolnMethod::ValueIteration),
            (ModelType::Mdp, "Policy iteration") => Some(SolnMethod::PolicyIteration),
            (ModelType::Mdp, "Modified policy iteration") => Some(SolnMethod::ModifiedPolicyIteration),
            _ => None,
        };
        method.unwrap_or_else(|| {
            warn!("Unsupported solution method {:?} for {}, using value iteration", s, model_type);
            SolnMethod::ValueIteration
        })
    }
}

impl fmt::Display for SolnMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolnMethod::ValueIteration => write!(f, "Value iteration"),
            SolnMethod::GaussSeidel => write!(f, "Gauss-Seidel"),
            SolnMethod::PolicyIteration => write!(f, "Policy iteration"),
            SolnMethod::ModifiedPolicyIteration => write!(f, "Modified policy iteration"),
        }
    }
}

/// User-facing solver settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Perform graph-based precomputation before numerical iteration (default: true)
    pub precomputation: bool,
    /// Termination criterion, "Absolute" or "Relative" (default: "Relative")
    pub term_crit: String,
    /// Termination epsilon (default: 1e-6)
    pub term_crit_param: f64,
    /// Iteration ceiling for unbounded numerical methods (default: 10000)
    pub max_iters: usize,
    /// Linear equation method for DTMCs and CTMCs (default: "Jacobi")
    pub lin_eq_method: String,
    /// Solution method for MDPs, CTMDPs and games (default: "Value iteration")
    pub mdp_soln_method: String,
    /// Sweeps per policy evaluation in modified policy iteration (default: 20)
    pub mpi_sweeps: usize,
    /// Synthesise a step-bounded strategy where supported (default: false)
    pub generate_strategy: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            precomputation: true,
            term_crit: "Relative".to_string(),
            term_crit_param: 1e-6,
            max_iters: 10_000,
            lin_eq_method: "Jacobi".to_string(),
            mdp_soln_method: "Value iteration".to_string(),
            mpi_sweeps: 20,
            generate_strategy: false,
        }
    }
}

impl Settings {
    pub fn with_precomputation(mut self, precomputation: bool) -> Self {
        self.precomputation = precomputation;
        self
    }

    pub fn with_term_crit(mut self, term_crit: impl Into<String>) -> Self {
        self.term_crit = term_crit.into();
        self
    }

    pub fn with_term_crit_param(mut self, term_crit_param: f64) -> Self {
        self.term_crit_param = term_crit_param;
        self
    }

    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn with_lin_eq_method(mut self, method: impl Into<String>) -> Self {
        self.lin_eq_method = method.into();
        self
    }

    pub fn with_mdp_soln_method(mut self, method: impl Into<String>) -> Self {
        self.mdp_soln_method = method.into();
        self
    }

    pub fn with_mpi_sweeps(mut self, mpi_sweeps: usize) -> Self {
        self.mpi_sweeps = mpi_sweeps;
        self
    }

    pub fn with_generate_strategy(mut self, generate_strategy: bool) -> Self {
        self.generate_strategy = generate_strategy;
        self
    }

    /// Resolves these settings into typed options for a checker of `model_type`.
    pub fn resolve(&self, model_type: ModelType) -> Result<CheckerOptions, CheckError> {
        let term_crit = TermCrit::from_setting(&self.term_crit).ok_or_else(|| CheckError::Configuration {
            key: "term_crit",
            value: self.term_crit.clone(),
        })?;
        if !(self.term_crit_param.is_finite() && self.term_crit_param > 0.0) {
            return Err(CheckError::Configuration {
                key: "term_crit_param",
                value: self.term_crit_param.to_string(),
            });
        }
        if self.max_iters == 0 {
            return Err(CheckError::Configuration {
                key: "max_iters",
                value: "0".to_string(),
            });
        }
        let method_setting = match model_type {
            ModelType::Dtmc | ModelType::Ctmc => &self.lin_eq_method,
            ModelType::Mdp | ModelType::Ctmdp | ModelType::Stpg => &self.mdp_soln_method,
        };
        Ok(CheckerOptions {
            precomputation: self.precomputation,
            term_crit,
            term_crit_param: self.term_crit_param,
            max_iters: self.max_iters,
            soln_method: SolnMethod::from_setting(model_type, method_setting),
            mpi_sweeps: self.mpi_sweeps.max(1),
            generate_strategy: self.generate_strategy,
        })
    }
}

/// Typed numerical options carried by a checker.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckerOptions {
    pub precomputation: bool,
    pub term_crit: TermCrit,
    pub term_crit_param: f64,
    pub max_iters: usize,
    pub soln_method: SolnMethod,
    pub mpi_sweeps: usize,
    pub generate_strategy: bool,
}

impl Default for CheckerOptions {
    fn default() -> Self {
        Self {
            precomputation: true,
            term_crit: TermCrit::Relative,
            term_crit_param: 1e-6,
            max_iters: 10_000,
            soln_method: SolnMethod::ValueIteration,
            mpi_sweeps: 20,
            generate_strategy: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_default_resolution() {
        let opts = Settings::default().resolve(ModelType::Dtmc).unwrap();
        assert_eq!(opts, CheckerOptions::default());
    }

    #[test]
    fn test_dtmc_methods() {
        let s = Settings::default().with_lin_eq_method("Gauss-Seidel");
        assert_eq!(s.resolve(ModelType::Dtmc).unwrap().soln_method, SolnMethod::GaussSeidel);
        // The MDP setting does not affect chains
        let s = Settings::default().with_mdp_soln_method("Gauss-Seidel");
        assert_eq!(s.resolve(ModelType::Dtmc).unwrap().soln_method, SolnMethod::ValueIteration);
    }

    #[test]
    fn test_mdp_methods() {
        for (setting, method) in [
            ("Gauss-Seidel", SolnMethod::GaussSeidel),
            ("Policy iteration", SolnMethod::PolicyIteration),
            ("Modified policy iteration", SolnMethod::ModifiedPolicyIteration),
            ("Value iteration", SolnMethod::ValueIteration),
        ] {
            let s = Settings::default().with_mdp_soln_method(setting);
            assert_eq!(s.resolve(ModelType::Mdp).unwrap().soln_method, method);
        }
    }

    #[test]
    fn test_unknown_method_falls_back() {
        let s = Settings::default().with_mdp_soln_method("Interval iteration");
        assert_eq!(s.resolve(ModelType::Mdp).unwrap().soln_method, SolnMethod::ValueIteration);
        // Policy iteration is an MDP-only method
        let s = Settings::default().with_lin_eq_method("Policy iteration");
        assert_eq!(s.resolve(ModelType::Dtmc).unwrap().soln_method, SolnMethod::ValueIteration);
        let s = Settings::default().with_mdp_soln_method("Policy iteration");
        assert_eq!(s.resolve(ModelType::Stpg).unwrap().soln_method, SolnMethod::ValueIteration);
    }

    #[test]
    fn test_bad_term_crit() {
        let s = Settings::default().with_term_crit("Sideways");
        assert!(matches!(
            s.resolve(ModelType::Dtmc),
            Err(CheckError::Configuration { key: "term_crit", .. })
        ));
        let s = Settings::default().with_term_crit_param(0.0);
        assert!(matches!(
            s.resolve(ModelType::Mdp),
            Err(CheckError::Configuration { key: "term_crit_param", .. })
        ));
    }

    #[test]
    fn test_mpi_sweeps() {
        let s = Settings::default().with_mpi_sweeps(5);
        assert_eq!(s.resolve(ModelType::Mdp).unwrap().mpi_sweeps, 5);
        // At least one sweep per evaluation
        let s = Settings::default().with_mpi_sweeps(0);
        assert_eq!(s.resolve(ModelType::Mdp).unwrap().mpi_sweeps, 1);
    }
}
