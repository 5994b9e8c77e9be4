/**
 * File: /src/search/scheduler.rs
 * Created Date: Thursday, October 16th 2025
 * Author: Zihan
 * -----
 * Last Modified: Thursday, 16th October 2025 5:14:40 pm
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-16		Zihan	Candidate ordering and column upper bound
 */

use crate::matrix::{Axis, MatrixIndex};
use crate::search::types::Subproblem;

/// What to do with one row count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateDecision {
    Try(Subproblem),
    /// Even the best case cannot reach `min_cols` columns
    Skip { min_cols: usize, max_cols: usize },
}

/// Orders row counts closest-first around the incumbent's row count and
/// bounds the number of columns each row count can keep.
#[derive(Debug, Clone)]
pub struct CandidateScheduler {
    order: Vec<usize>,
    /// `max_cols_possible[i]`: any `i + 1` rows include one with at least
    /// the `i`-th smallest missing count, so at most that many columns remain
    max_cols_possible: Vec<usize>,
}

impl CandidateScheduler {
    pub fn new(matrix: &MatrixIndex, incumbent_rows: usize) -> Self {
        let num_rows = matrix.num_rows();
        let num_cols = matrix.num_cols();

        // Distance from the incumbent's row count; the sort is stable so ties
        // keep the smaller row count first.
        let mut order: Vec<usize> = (1..=num_rows).collect();
        order.sort_by_key(|&r| r.abs_diff(incumbent_rows));

        let mut missing_per_row = matrix.invalid_counts(Axis::Row).to_vec();
        missing_per_row.sort_unstable();
        let max_cols_possible = missing_per_row
            .iter()
            .map(|&missing| num_cols - missing)
            .collect();

        Self {
            order,
            max_cols_possible,
        }
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Upper bound on the columns of any complete submatrix with `row_sum` rows
    pub fn max_cols_possible(&self, row_sum: usize) -> usize {
        self.max_cols_possible[row_sum - 1]
    }

    /// Smallest column count that strictly beats `best_elements`
    pub fn min_cols(best_elements: usize, row_sum: usize) -> usize {
        best_elements / row_sum + 1
    }

    pub fn evaluate(&self, row_sum: usize, best_elements: usize) -> CandidateDecision {
        let min_cols = Self::min_cols(best_elements, row_sum);
        let max_cols = self.max_cols_possible(row_sum);
        if min_cols > max_cols {
            CandidateDecision::Skip { min_cols, max_cols }
        } else {
            CandidateDecision::Try(Subproblem::new(row_sum, min_cols))
        }
    }
}
