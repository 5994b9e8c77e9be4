//! # Search Data Structures
//!
//! Subproblem targets, pruned subproblems, run statistics and the error types
//! shared by the two search phases.

/**
 * File: /src/search/types.rs
 * Created Date: Thursday, October 16th 2025
 * Author: Zihan
 * -----
 * Last Modified: Friday, 17th October 2025 4:05:18 pm
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-16		Zihan	Created data structures for the distributed candidate search
 */

use crate::config::ConfigError;
use crate::matrix::{Axis, MatrixError};
use crate::scratch::ScratchError;
use crate::search::solver::SolverError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

/// Index of a worker in the pool, `0..num_workers`
pub type WorkerId = usize;

/// A candidate target: keep exactly `row_sum` rows with at least `min_cols`
/// columns valid in all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subproblem {
    pub row_sum: usize,
    pub min_cols: usize,
}

impl Subproblem {
    pub fn new(row_sum: usize, min_cols: usize) -> Self {
        Self { row_sum, min_cols }
    }

    /// Required count along `axis`: rows for `Row`, columns for `Col`
    pub fn required(&self, axis: Axis) -> usize {
        match axis {
            Axis::Row => self.row_sum,
            Axis::Col => self.min_cols,
        }
    }
}

impl fmt::Display for Subproblem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(row_sum={}, min_cols={})", self.row_sum, self.min_cols)
    }
}

/// Local indices that cannot be kept together with `index`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutList {
    pub index: usize,
    pub others: Vec<usize>,
}

/// A subproblem after pruning: what is still allowed plus the cut lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrunedSubproblem {
    pub target: Subproblem,
    /// One flag per free row (local index)
    pub valid_rows: Vec<bool>,
    /// One flag per free column (local index)
    pub valid_cols: Vec<bool>,
    pub row_cuts: Vec<CutList>,
    pub col_cuts: Vec<CutList>,
}

impl PrunedSubproblem {
    pub fn valid(&self, axis: Axis) -> &[bool] {
        match axis {
            Axis::Row => &self.valid_rows,
            Axis::Col => &self.valid_cols,
        }
    }

    pub fn cuts(&self, axis: Axis) -> &[CutList] {
        match axis {
            Axis::Row => &self.row_cuts,
            Axis::Col => &self.col_cuts,
        }
    }

    /// Each cut once, as `(low, high)` local index pairs
    pub fn cut_pairs(&self, axis: Axis) -> Vec<(usize, usize)> {
        let mut pairs: Vec<(usize, usize)> = self
            .cuts(axis)
            .iter()
            .flat_map(|cut| {
                cut.others
                    .iter()
                    .map(move |&o| (cut.index.min(o), cut.index.max(o)))
            })
            .collect();
        pairs.sort_unstable();
        pairs.dedup();
        pairs
    }
}

/// Result of running the pruning fixed point for one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PruneOutcome {
    Feasible(PrunedSubproblem),
    /// Fewer free members than required survived along `axis`
    Infeasible {
        axis: Axis,
        remaining: usize,
        required: usize,
    },
}

/// Counters kept by the coordinator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProtocolStats {
    pub dispatched: usize,
    pub completed: usize,
    pub improvements: usize,
    pub end_signals: usize,
}

/// Timing information for each phase
#[derive(Debug, Clone, Default, Serialize)]
pub struct PhaseTimings {
    pub precompute_ms: u64,
    pub search_ms: u64,
    pub total_ms: u64,
}

/// Statistics from a search run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchStats {
    /// Row counts looked at by the scheduler
    pub candidates_considered: usize,
    /// Skipped by the column upper bound
    pub skipped_by_bound: usize,
    /// Proven infeasible by pruning on the coordinator
    pub pruned_infeasible: usize,
    pub protocol: ProtocolStats,
    pub phase_times: PhaseTimings,
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors from the overall search
#[derive(Debug)]
pub enum SearchError {
    Matrix(MatrixError),
    Config(ConfigError),
    Scratch(ScratchError),
    Solver(SolverError),
    /// Unexpected message, dead worker or malformed payload
    Protocol(String),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SearchError::Matrix(e) => write!(f, "Matrix error: {}", e),
            SearchError::Config(e) => write!(f, "Configuration error: {}", e),
            SearchError::Scratch(e) => write!(f, "Scratch state error: {}", e),
            SearchError::Solver(e) => write!(f, "Exact solver error: {}", e),
            SearchError::Protocol(msg) => write!(f, "Protocol violation: {}", msg),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SearchError::Matrix(e) => Some(e),
            SearchError::Config(e) => Some(e),
            SearchError::Scratch(e) => Some(e),
            SearchError::Solver(e) => Some(e),
            SearchError::Protocol(_) => None,
        }
    }
}

impl From<MatrixError> for SearchError {
    fn from(e: MatrixError) -> Self {
        SearchError::Matrix(e)
    }
}

impl From<ConfigError> for SearchError {
    fn from(e: ConfigError) -> Self {
        SearchError::Config(e)
    }
}

impl From<ScratchError> for SearchError {
    fn from(e: ScratchError) -> Self {
        SearchError::Scratch(e)
    }
}

impl From<SolverError> for SearchError {
    fn from(e: SolverError) -> Self {
        SearchError::Solver(e)
    }
}
