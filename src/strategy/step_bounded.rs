//! Step-bounded deterministic strategies.
//!
//! The memory of this strategy is a single counter: the number of steps
//! remaining until the bound is exhausted. It starts at `bound`, decreases by
//! one per step and stays at 0 afterwards, so the strategy distinguishes
//! exactly `bound + 1` memory values.
//!
//! The decision table holds, for every state, a sequence of `(pivot, action)`
//! pairs with non-increasing pivots `b_k >= ... >= b_0`. It defines a
//! piecewise-constant function from memory to action: with `m` steps
//! remaining, the selected pair is the one with the smallest pivot `>= m`,
//! so `c_i` is taken for `m` in `(b_{i-1}, b_i]` and `c_0` for `m` in
//! `[0, b_0]`.
//!
//! Pivots above the bound are clamped down to it, which can leave several
//! leading pairs with the same pivot. Within such a run of equal pivots `p`,
//! the first pair is taken when exactly `p` steps remain and the last pair
//! once fewer remain.
//!
//! # Example
//!
//! ```
//! use pmc_rs::strategy::{StepBoundedDeterministicStrategy, Strategy};
//!
//! let mut strat = StepBoundedDeterministicStrategy::new(vec![vec![25, 1, 24, 2]], 25).unwrap();
//! strat.init(0).unwrap();
//! assert_eq!(strat.next_move(0).unwrap().get(1), 1.0);
//! strat.update_memory(1, 0).unwrap();
//! assert_eq!(strat.next_move(0).unwrap().get(2), 1.0);
//! ```

use std::io::{self, Write};

use log::debug;

use crate::distribution::Distribution;
use crate::error::{StrategyError, StrategyResult};
use crate::model::Model;
use crate::product;
use crate::strategy::{MemoryElement, Strategy};

const DEFAULT_INFO: &str = "No information available";

#[derive(Debug, Clone, PartialEq)]
pub struct StepBoundedDeterministicStrategy {
    /// Normalised `(pivot, action)` pairs per state.
    choices: Vec<Vec<(usize, usize)>>,
    bound: usize,
    /// Steps remaining; `None` until the strategy is activated.
    memory: Option<usize>,
    /// Number of integers in the raw table.
    table_size: usize,
    info: String,
}

impl StepBoundedDeterministicStrategy {
    /// Validates and normalises a raw choice table.
    ///
    /// `choices[s]` is the flat sequence `b_k, c_k, b_{k-1}, c_{k-1}, ..., b_0, c_0`
    /// for state `s`. The table is rejected if any value is negative, a
    /// sequence has odd length or is empty, pivots increase, or a state's first
    /// pivot is below `bound`. Pivots above `bound` are clamped to it.
    pub fn new(choices: Vec<Vec<i64>>, bound: i64) -> StrategyResult<Self> {
        if bound < 0 {
            return Err(StrategyError::MalformedStrategyTable {
                state: 0,
                reason: format!("the bound must be non-negative, got {}", bound),
            });
        }
        let bound = bound as usize;

        let mut table = Vec::with_capacity(choices.len());
        let mut table_size = 0;
        for (state, row) in choices.iter().enumerate() {
            let malformed = |reason: String| StrategyError::MalformedStrategyTable { state, reason };

            table_size += row.len();
            if row.is_empty() {
                return Err(malformed("no (pivot, action) pairs".to_string()));
            }
            if row.len() % 2 != 0 {
                return Err(malformed(format!("odd number of values ({})", row.len())));
            }
            if let Some(v) = row.iter().find(|&&v| v < 0) {
                return Err(malformed(format!("negative value {}", v)));
            }

            let mut pairs = Vec::with_capacity(row.len() / 2);
            let mut prev = bound;
            for (k, pair) in row.chunks_exact(2).enumerate() {
                let (pivot, action) = (pair[0] as usize, pair[1] as usize);
                if k == 0 && pivot < bound {
                    return Err(malformed(format!("first pivot {} is below the bound {}", pivot, bound)));
                }
                let pivot = pivot.min(bound);
                if pivot > prev {
                    return Err(malformed(format!("pivot {} follows smaller pivot {}", pivot, prev)));
                }
                prev = pivot;
                pairs.push((pivot, action));
            }
            table.push(pairs);
        }

        Ok(Self {
            choices: table,
            bound,
            memory: None,
            table_size,
            info: DEFAULT_INFO.to_string(),
        })
    }

    /// Builds a strategy from per-state action sequences indexed by memory.
    ///
    /// `actions[s][m - 1]` is the action for state `s` with `m` steps
    /// remaining, for `m` in `1..=bound`. Runs of equal actions are merged
    /// into a single pair.
    pub fn from_actions(actions: &[Vec<usize>], bound: usize) -> StrategyResult<Self> {
        let mut table = Vec::with_capacity(actions.len());
        for (state, seq) in actions.iter().enumerate() {
            if seq.len() != bound || bound == 0 {
                return Err(StrategyError::MalformedStrategyTable {
                    state,
                    reason: format!("expected {} actions, got {}", bound, seq.len()),
                });
            }
            let mut row = Vec::new();
            let mut pivot = bound;
            let mut action = seq[bound - 1];
            for m in (1..bound).rev() {
                if seq[m - 1] != action {
                    row.extend([pivot as i64, action as i64]);
                    pivot = m;
                    action = seq[m - 1];
                }
            }
            row.extend([pivot as i64, action as i64]);
            table.push(row);
        }
        Self::new(table, bound as i64)
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Number of states the table covers.
    pub fn num_states(&self) -> usize {
        self.choices.len()
    }

    /// The normalised `(pivot, action)` pairs of `state`.
    pub fn choices(&self, state: usize) -> Option<&[(usize, usize)]> {
        self.choices.get(state).map(|c| c.as_slice())
    }

    /// Number of integers in the decision table.
    pub fn choice_table_size(&self) -> usize {
        self.table_size
    }

    /// Steps remaining, or `None` before activation.
    pub fn memory(&self) -> Option<usize> {
        self.memory
    }

    /// The action of `state` with `memory` steps remaining.
    pub fn action_at(&self, state: usize, memory: usize) -> StrategyResult<usize> {
        let pairs = self.choices.get(state).ok_or(StrategyError::UndefinedStrategyState {
            state,
            num_states: self.choices.len(),
        })?;

        // Pairs with pivot >= memory form a prefix, since pivots do not increase.
        let end = pairs.iter().take_while(|(pivot, _)| *pivot >= memory).count();
        if end == 0 {
            return Ok(pairs[0].1);
        }
        let pivot = pairs[end - 1].0;
        let index = if pivot == memory {
            pairs.iter().position(|(p, _)| *p == pivot).unwrap_or(end - 1)
        } else {
            end - 1
        };
        Ok(pairs[index].1)
    }

    fn active_memory(&self) -> StrategyResult<usize> {
        self.memory
            .ok_or_else(|| StrategyError::InvalidStrategyState("the strategy has not been initialised".to_string()))
    }
}

impl Strategy for StepBoundedDeterministicStrategy {
    fn init(&mut self, _state: usize) -> StrategyResult<()> {
        self.memory = Some(self.bound);
        Ok(())
    }

    fn update_memory(&mut self, _action: usize, _state: usize) -> StrategyResult<()> {
        let memory = self.active_memory()?;
        self.memory = Some(memory.saturating_sub(1));
        Ok(())
    }

    fn next_move(&self, state: usize) -> StrategyResult<Distribution> {
        let memory = self.active_memory()?;
        if state >= self.choices.len() {
            return Err(StrategyError::UndefinedStrategyState {
                state,
                num_states: self.choices.len(),
            });
        }
        let action = self.action_at(state, memory)?;
        debug!("next_move(state = {}, memory = {}) -> {}", state, memory, action);
        Ok(Distribution::point(action))
    }

    fn reset(&mut self) {
        self.memory = Some(self.bound);
    }

    fn memory_size(&self) -> usize {
        self.bound
    }

    fn current_memory_element(&self) -> StrategyResult<MemoryElement> {
        Ok(MemoryElement::Int(self.active_memory()? as i64))
    }

    fn set_memory(&mut self, memory: MemoryElement) -> StrategyResult<()> {
        match memory {
            MemoryElement::Int(m) if (0..=self.bound as i64).contains(&m) => {
                self.memory = Some(m as usize);
                Ok(())
            }
            MemoryElement::Int(m) => Err(StrategyError::InvalidMemoryType(format!(
                "memory {} is outside 0..={}",
                m, self.bound
            ))),
            other => Err(StrategyError::InvalidMemoryType(format!(
                "memory has to be an integer for this strategy, got {}",
                other
            ))),
        }
    }

    fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "// Strategy for step-bounded properties")?;
        writeln!(out, "// format: stateId, b1, c1, b2, c2,..., bn, cn")?;
        writeln!(out, "// (b1>b2>...>bn)")?;
        writeln!(
            out,
            "// where: ci (1<=i<n) is the choice taken when the number of steps remaining before the bound is exceeded is >=bi and <bi+1"
        )?;
        writeln!(out, "// cn is the choice taken after bn or less steps remain until bound is exceeded.")?;
        writeln!(out, "Strategy:")?;
        for (state, pairs) in self.choices.iter().enumerate() {
            write!(out, "{}", state)?;
            for (pivot, action) in pairs {
                write!(out, ", {}, {}", pivot, action)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    fn supports_product(&self) -> bool {
        true
    }

    /// Builds the product with `model`. The memory, including the
    /// uninitialised state, is left as it was.
    fn build_product(&mut self, model: &dyn Model) -> StrategyResult<Box<dyn Model>> {
        let memory = self.memory;
        let product = product::build_product(self, model);
        self.memory = memory;
        product
    }

    fn info(&self) -> &str {
        &self.info
    }

    fn set_info(&mut self, info: String) {
        self.info = info;
    }

    fn strategy_type(&self) -> &'static str {
        "Finite memory strategy"
    }

    fn state_description(&self) -> String {
        let memory = match self.memory {
            Some(m) => m.to_string(),
            None => "uninitialised".to_string(),
        };
        format!(
            "Finite memory deterministic strategy\nSize of memory: {}\nSize of next move function: {}\nMemory state: {}",
            self.bound, self.table_size, memory
        )
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn action(strat: &StepBoundedDeterministicStrategy, state: usize) -> usize {
        let d = strat.next_move(state).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d.sum(), 1.0);
        let a = d.support().next().unwrap();
        a
    }

    fn scenario() -> StepBoundedDeterministicStrategy {
        StepBoundedDeterministicStrategy::new(vec![vec![30, 1, 28, 2], vec![25, 1, 24, 2]], 25).unwrap()
    }

    #[test]
    fn test_clamping() {
        let strat = scenario();
        assert_eq!(strat.choices(0).unwrap(), &[(25, 1), (25, 2)]);
        assert_eq!(strat.choices(1).unwrap(), &[(25, 1), (24, 2)]);
        assert_eq!(strat.choice_table_size(), 8);
    }

    #[test]
    fn test_scenario_decoding() {
        let mut strat = scenario();
        strat.init(0).unwrap();
        assert_eq!(action(&strat, 0), 1);
        assert_eq!(action(&strat, 1), 1);
        for _ in 0..25 {
            strat.update_memory(0, 0).unwrap();
            assert_eq!(action(&strat, 0), 2);
            assert_eq!(action(&strat, 1), 2);
        }
        assert_eq!(strat.memory(), Some(0));
    }

    #[test]
    fn test_monotonic_decoding() {
        // c = 7 on (6, 10], 8 on (3, 6], 9 on [0, 3]
        let strat = StepBoundedDeterministicStrategy::new(vec![vec![10, 7, 6, 8, 3, 9]], 10).unwrap();
        for m in 0..=10 {
            let expected = if m > 6 {
                7
            } else if m > 3 {
                8
            } else {
                9
            };
            assert_eq!(strat.action_at(0, m).unwrap(), expected, "memory {}", m);
        }
    }

    #[test]
    fn test_decoding_independent_of_call_order() {
        let mut strat = StepBoundedDeterministicStrategy::new(vec![vec![10, 7, 6, 8, 3, 9]], 10).unwrap();
        for m in [3usize, 10, 0, 7, 6, 4] {
            strat.set_memory(MemoryElement::Int(m as i64)).unwrap();
            assert_eq!(action(&strat, 0), strat.action_at(0, m).unwrap());
        }
    }

    #[test]
    fn test_rejects_negative_values() {
        let err = StepBoundedDeterministicStrategy::new(vec![vec![5, 0], vec![5, -1]], 5).unwrap_err();
        assert!(matches!(err, StrategyError::MalformedStrategyTable { state: 1, .. }));
        assert!(StepBoundedDeterministicStrategy::new(vec![vec![-5, 0]], 5).is_err());
    }

    #[test]
    fn test_rejects_increasing_pivots() {
        let err = StepBoundedDeterministicStrategy::new(vec![vec![5, 0, 2, 1, 3, 0]], 5).unwrap_err();
        assert!(matches!(err, StrategyError::MalformedStrategyTable { state: 0, .. }));
    }

    #[test]
    fn test_rejects_first_pivot_below_bound() {
        let err = StepBoundedDeterministicStrategy::new(vec![vec![4, 0]], 5).unwrap_err();
        assert!(matches!(err, StrategyError::MalformedStrategyTable { state: 0, .. }));
    }

    #[test]
    fn test_rejects_negative_bound_and_bad_shapes() {
        assert!(StepBoundedDeterministicStrategy::new(vec![vec![5, 0]], -1).is_err());
        assert!(StepBoundedDeterministicStrategy::new(vec![vec![5, 0, 3]], 5).is_err());
        assert!(StepBoundedDeterministicStrategy::new(vec![vec![]], 5).is_err());
    }

    #[test]
    fn test_clamps_instead_of_rejecting() {
        let strat = StepBoundedDeterministicStrategy::new(vec![vec![100, 3, 50, 4, 2, 5]], 10).unwrap();
        assert_eq!(strat.choices(0).unwrap(), &[(10, 3), (10, 4), (2, 5)]);
    }

    #[test]
    fn test_memory_lifecycle() {
        let mut strat = StepBoundedDeterministicStrategy::new(vec![vec![3, 0]], 3).unwrap();
        assert!(matches!(strat.next_move(0), Err(StrategyError::InvalidStrategyState(_))));
        assert!(strat.current_memory_element().is_err());
        assert!(strat.update_memory(0, 0).is_err());

        strat.init(0).unwrap();
        assert_eq!(strat.current_memory_element().unwrap(), MemoryElement::Int(3));
        for k in 1..=5 {
            strat.update_memory(0, 0).unwrap();
            assert_eq!(strat.current_memory_element().unwrap(), MemoryElement::Int(3i64.saturating_sub(k).max(0)));
        }
        strat.reset();
        assert_eq!(strat.memory(), Some(3));
    }

    #[test]
    fn test_reset_from_uninitialised() {
        let mut strat = StepBoundedDeterministicStrategy::new(vec![vec![3, 0]], 3).unwrap();
        strat.reset();
        assert_eq!(strat.memory(), Some(3));
    }

    #[test]
    fn test_state_boundary() {
        let mut strat = scenario();
        strat.init(0).unwrap();
        assert!(strat.next_move(1).is_ok());
        let err = strat.next_move(2).unwrap_err();
        assert!(matches!(
            err,
            StrategyError::UndefinedStrategyState { state: 2, num_states: 2 }
        ));
        assert!(strat.next_move(3).is_err());
    }

    #[test]
    fn test_set_memory() {
        let mut strat = scenario();
        strat.set_memory(MemoryElement::Int(24)).unwrap();
        assert_eq!(action(&strat, 1), 2);
        assert!(matches!(
            strat.set_memory(MemoryElement::Tuple(vec![1, 2])),
            Err(StrategyError::InvalidMemoryType(_))
        ));
        assert!(matches!(
            strat.set_memory(MemoryElement::None),
            Err(StrategyError::InvalidMemoryType(_))
        ));
        assert!(strat.set_memory(MemoryElement::Int(26)).is_err());
        assert!(strat.set_memory(MemoryElement::Int(-1)).is_err());
        assert_eq!(strat.memory(), Some(24));
    }

    #[test]
    fn test_export_format() {
        let strat = scenario();
        let mut out = Vec::new();
        strat.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "// Strategy for step-bounded properties");
        assert_eq!(lines[5], "Strategy:");
        assert_eq!(lines[6], "0, 25, 1, 25, 2");
        assert_eq!(lines[7], "1, 25, 1, 24, 2");
        assert_eq!(lines.len(), 8);
        assert!(text.ends_with('\n'));

        let mut again = Vec::new();
        strat.write_to(&mut again).unwrap();
        assert_eq!(text.as_bytes(), again.as_slice());
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strat.txt");
        let strat = scenario();
        strat.export_to_file(&path).unwrap();
        let mut expected = Vec::new();
        strat.write_to(&mut expected).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), expected);

        let missing = dir.path().join("no-such-dir").join("strat.txt");
        assert!(matches!(strat.export_to_file(&missing), Err(StrategyError::Io(_))));
    }

    #[test]
    fn test_descriptions() {
        let mut strat = scenario();
        assert_eq!(strat.info(), "No information available");
        strat.set_info("optimal for F<=25 goal".to_string());
        assert_eq!(strat.info(), "optimal for F<=25 goal");
        assert_eq!(strat.strategy_type(), "Finite memory strategy");

        assert!(strat.state_description().ends_with("Memory state: uninitialised"));
        strat.init(0).unwrap();
        strat.update_memory(0, 0).unwrap();
        let desc = strat.state_description();
        assert!(desc.contains("Size of memory: 25"));
        assert!(desc.contains("Size of next move function: 8"));
        assert!(desc.ends_with("Memory state: 24"));
    }

    #[test]
    fn test_from_actions() {
        // memory 5,4 -> 0; 3,2 -> 1; 1 -> 0
        let strat = StepBoundedDeterministicStrategy::from_actions(&[vec![0, 1, 1, 0, 0]], 5).unwrap();
        assert_eq!(strat.choices(0).unwrap(), &[(5, 0), (3, 1), (1, 0)]);
        let decoded: Vec<_> = (1..=5).map(|m| strat.action_at(0, m).unwrap()).collect();
        assert_eq!(decoded, vec![0, 1, 1, 0, 0]);

        let constant = StepBoundedDeterministicStrategy::from_actions(&[vec![2, 2, 2]], 3).unwrap();
        assert_eq!(constant.choices(0).unwrap(), &[(3, 2)]);
    }
}
