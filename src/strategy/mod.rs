//! Strategies resolving the nondeterminism of a decision process.
//!
//! A strategy observes the current state, carries some memory, and picks the
//! next move. The [`Strategy`] trait is the capability set shared by every
//! variant; [`StepBoundedDeterministicStrategy`] is the finite-memory variant
//! whose memory counts down the steps remaining until a bound.
//!
//! # Memory
//!
//! A strategy's memory is exposed as a [`MemoryElement`]. Each variant
//! decides which shapes it accepts in [`Strategy::set_memory`]; a shape it
//! cannot interpret is rejected with
//! [`StrategyError::InvalidMemoryType`](crate::error::StrategyError::InvalidMemoryType).
//!
//! # Concurrency
//!
//! [`Strategy::next_move`] answers for the *current* memory value. A strategy
//! instance is a single logical thread of control: evaluating moves for
//! different contexts needs either exclusive access or one instance each.

mod step_bounded;

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::distribution::Distribution;
use crate::error::{StrategyError, StrategyResult};
use crate::model::Model;

pub use step_bounded::StepBoundedDeterministicStrategy;

/// The memory of a strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryElement {
    /// No memory (memoryless strategies).
    None,
    /// A single counter.
    Int(i64),
    /// A tuple of counters.
    Tuple(Vec<i64>),
}

impl fmt::Display for MemoryElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryElement::None => write!(f, "-"),
            MemoryElement::Int(i) => write!(f, "{}", i),
            MemoryElement::Tuple(values) => {
                write!(f, "(")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Capability set of a strategy.
pub trait Strategy {
    /// Activates the strategy in the initial `state`.
    fn init(&mut self, state: usize) -> StrategyResult<()>;

    /// Advances the memory after `action` was taken in `state`.
    fn update_memory(&mut self, action: usize, state: usize) -> StrategyResult<()>;

    /// The distribution over choices of `state` for the current memory.
    fn next_move(&self, state: usize) -> StrategyResult<Distribution>;

    /// Restores the initial memory.
    fn reset(&mut self);

    /// Number of memory levels the strategy distinguishes in a product.
    fn memory_size(&self) -> usize;

    fn current_memory_element(&self) -> StrategyResult<MemoryElement>;

    fn set_memory(&mut self, memory: MemoryElement) -> StrategyResult<()>;

    /// Writes the strategy's textual export to `out`.
    fn write_to(&self, out: &mut dyn Write) -> io::Result<()>;

    /// Exports the strategy to a file. Write failures are returned, not retried.
    fn export_to_file(&self, path: &Path) -> StrategyResult<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_to(&mut out)?;
        out.flush()?;
        Ok(())
    }

    /// Returns true if [`Strategy::build_product`] is available.
    fn supports_product(&self) -> bool {
        false
    }

    /// Builds the product of this strategy with `model`.
    fn build_product(&mut self, _model: &dyn Model) -> StrategyResult<Box<dyn Model>> {
        Err(StrategyError::UnsupportedProductModel(format!(
            "{} does not support product construction",
            self.strategy_type()
        )))
    }

    fn info(&self) -> &str;

    fn set_info(&mut self, info: String);

    fn strategy_type(&self) -> &'static str;

    /// Human-readable description of the live strategy state.
    fn state_description(&self) -> String;
}
