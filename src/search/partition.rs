/**
 * File: /src/search/partition.rs
 * Created Date: Thursday, October 16th 2025
 * Author: Zihan
 * -----
 * Last Modified: Thursday, 16th October 2025 2:51:09 pm
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-16		Zihan	Forced / free split of rows and columns
 */

use crate::matrix::{Axis, MatrixIndex};

/// Members of one axis split into forced (no NA) and free (at least one NA).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AxisPartition {
    pub forced: Vec<usize>,
    pub free: Vec<usize>,
}

impl AxisPartition {
    fn from_counts(invalid: &[usize]) -> Self {
        let (forced, free): (Vec<usize>, Vec<usize>) = (0..invalid.len()).partition(|&k| invalid[k] == 0);
        Self { forced, free }
    }
}

/// Forced/free split for both axes, fixed for a whole run.
///
/// Local indices into `free` are what the pair tables, masks and cut lists
/// talk about; `free[local]` is the global index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    rows: AxisPartition,
    cols: AxisPartition,
}

impl Partition {
    pub fn from_matrix(matrix: &MatrixIndex) -> Self {
        Self {
            rows: AxisPartition::from_counts(matrix.invalid_counts(Axis::Row)),
            cols: AxisPartition::from_counts(matrix.invalid_counts(Axis::Col)),
        }
    }

    pub fn from_parts(rows: AxisPartition, cols: AxisPartition) -> Self {
        Self { rows, cols }
    }

    pub fn axis(&self, axis: Axis) -> &AxisPartition {
        match axis {
            Axis::Row => &self.rows,
            Axis::Col => &self.cols,
        }
    }

    pub fn forced(&self, axis: Axis) -> &[usize] {
        &self.axis(axis).forced
    }

    pub fn free(&self, axis: Axis) -> &[usize] {
        &self.axis(axis).free
    }

    pub fn num_forced(&self, axis: Axis) -> usize {
        self.axis(axis).forced.len()
    }

    pub fn num_free(&self, axis: Axis) -> usize {
        self.axis(axis).free.len()
    }

    pub fn global(&self, axis: Axis, local: usize) -> usize {
        self.axis(axis).free[local]
    }

    /// True when this partition is the one `matrix` produces.
    pub fn matches(&self, matrix: &MatrixIndex) -> bool {
        *self == Self::from_matrix(matrix)
    }

    /// Global keep-mask: every forced member plus the selected free ones.
    pub fn expand(&self, axis: Axis, local_selected: &[bool], len: usize) -> Vec<bool> {
        let mut mask = vec![false; len];
        for &g in self.forced(axis) {
            mask[g] = true;
        }
        for (local, &keep) in local_selected.iter().enumerate() {
            if keep {
                mask[self.global(axis, local)] = true;
            }
        }
        mask
    }
}
