//! Model-semantic types and game players.
//!
//! Every model declares exactly one [`ModelType`]. The dispatcher keys its
//! checker selection on it, and property validity is judged against it.

use std::fmt;
use std::str::FromStr;

use crate::error::CheckError;

/// Semantic class of a probabilistic model.
///
/// # Invariants
///
/// - Discrete-time types (`Dtmc`, `Mdp`, `Stpg`) carry probabilities in their distributions.
/// - Continuous-time types (`Ctmc`, `Ctmdp`) carry rates.
/// - Purely stochastic types (`Dtmc`, `Ctmc`) have at most one choice per state.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ModelType {
    /// Discrete-time Markov chain.
    Dtmc,
    /// Markov decision process.
    Mdp,
    /// Continuous-time Markov chain.
    Ctmc,
    /// Continuous-time Markov decision process.
    Ctmdp,
    /// Stochastic two-player game.
    Stpg,
}

impl ModelType {
    pub const ALL: [ModelType; 5] = [
        ModelType::Dtmc,
        ModelType::Mdp,
        ModelType::Ctmc,
        ModelType::Ctmdp,
        ModelType::Stpg,
    ];

    /// Returns `true` if states may offer more than one choice.
    pub fn is_nondeterministic(self) -> bool {
        matches!(self, ModelType::Mdp | ModelType::Ctmdp | ModelType::Stpg)
    }

    /// Returns `true` if distributions hold rates rather than probabilities.
    pub fn is_continuous_time(self) -> bool {
        matches!(self, ModelType::Ctmc | ModelType::Ctmdp)
    }

    /// Short upper-case name, as used in model files and log output.
    pub fn name(self) -> &'static str {
        match self {
            ModelType::Dtmc => "DTMC",
            ModelType::Mdp => "MDP",
            ModelType::Ctmc => "CTMC",
            ModelType::Ctmdp => "CTMDP",
            ModelType::Stpg => "STPG",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ModelType {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| CheckError::UnsupportedModelType(s.to_string()))
    }
}

/// Owner of a state in a stochastic two-player game.
///
/// Non-game models treat every state as owned by [`Player::One`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Player {
    #[default]
    One,
    Two,
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::One => write!(f, "P1"),
            Player::Two => write!(f, "P2"),
        }
    }
}
