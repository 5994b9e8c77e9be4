/**
 * File: /src/search/incumbent.rs
 * Created Date: Thursday, October 16th 2025
 * Author: Zihan
 * -----
 * Last Modified: Thursday, 16th October 2025 6:02:33 pm
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-18		Zihan	Swap masks for transposed inputs
 * 2025-10-16		Zihan	Best complete submatrix found so far
 */

use crate::matrix::MatrixIndex;
use crate::submatrix::Submatrix;
use crate::util::count_true;

/// The best complete submatrix known to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incumbent {
    rows_to_keep: Vec<bool>,
    cols_to_keep: Vec<bool>,
    num_elements: usize,
}

impl Incumbent {
    /// Nothing kept; any non-empty complete submatrix improves on it
    pub fn empty(num_rows: usize, num_cols: usize) -> Self {
        Self {
            rows_to_keep: vec![false; num_rows],
            cols_to_keep: vec![false; num_cols],
            num_elements: 0,
        }
    }

    pub fn new(rows_to_keep: Vec<bool>, cols_to_keep: Vec<bool>) -> Self {
        let num_elements = count_true(&rows_to_keep) * count_true(&cols_to_keep);
        Self {
            rows_to_keep,
            cols_to_keep,
            num_elements,
        }
    }

    pub fn from_submatrix(submatrix: &Submatrix) -> Self {
        Self::new(submatrix.rows_mask(), submatrix.cols_mask())
    }

    pub fn rows_to_keep(&self) -> &[bool] {
        &self.rows_to_keep
    }

    pub fn cols_to_keep(&self) -> &[bool] {
        &self.cols_to_keep
    }

    pub fn num_rows(&self) -> usize {
        count_true(&self.rows_to_keep)
    }

    pub fn num_cols(&self) -> usize {
        count_true(&self.cols_to_keep)
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    /// The same selection on the transposed matrix
    pub fn transposed(&self) -> Incumbent {
        Self {
            rows_to_keep: self.cols_to_keep.clone(),
            cols_to_keep: self.rows_to_keep.clone(),
            num_elements: self.num_elements,
        }
    }

    /// Shape matches `matrix` and every kept cell is valid
    pub fn is_feasible_for(&self, matrix: &MatrixIndex) -> bool {
        Submatrix::from_masks(matrix, &self.rows_to_keep, &self.cols_to_keep)
            .map_or(false, |s| s.is_complete())
    }

    /// Replace with `candidate` only if it is strictly larger.
    pub fn try_replace(&mut self, candidate: Incumbent) -> bool {
        if candidate.num_elements > self.num_elements {
            *self = candidate;
            true
        } else {
            false
        }
    }
}
