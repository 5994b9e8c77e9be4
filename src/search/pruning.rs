//! # Pair-Count Pruning
//!
//! For a target `(row_sum, min_cols)` a kept column must share at least
//! `row_sum` valid rows with `min_cols - 1` other kept columns, and a kept row
//! must share at least `min_cols` valid columns with `row_sum - 1` other kept
//! rows. Members that cannot meet this are eliminated until nothing changes.
//!
//! Pair tables count shared *free* members only, so both thresholds are
//! lowered by the forced count of the other axis.

/**
 * File: /src/search/pruning.rs
 * Created Date: Thursday, October 16th 2025
 * Author: Zihan
 * -----
 * Last Modified: Friday, 17th October 2025 11:40:02 am
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-17		Zihan	Worker-side refinement with recalculated tables
 * 2025-10-16		Zihan	Column / row fixed-point passes and cut lists
 */

use crate::matrix::{Axis, MatrixIndex};
use crate::pairs::PairCompatibilityTable;
use crate::search::partition::Partition;
use crate::search::types::{CutList, PruneOutcome, PrunedSubproblem, Subproblem};
use crate::util::count_true;
use log::debug;

pub struct PruningEngine<'a> {
    matrix: &'a MatrixIndex,
    partition: &'a Partition,
    row_pairs: &'a PairCompatibilityTable,
    col_pairs: &'a PairCompatibilityTable,
}

impl<'a> PruningEngine<'a> {
    pub fn new(
        matrix: &'a MatrixIndex,
        partition: &'a Partition,
        row_pairs: &'a PairCompatibilityTable,
        col_pairs: &'a PairCompatibilityTable,
    ) -> Self {
        Self {
            matrix,
            partition,
            row_pairs,
            col_pairs,
        }
    }

    fn table(&self, axis: Axis) -> &PairCompatibilityTable {
        match axis {
            Axis::Row => self.row_pairs,
            Axis::Col => self.col_pairs,
        }
    }

    /// Free members still needed along `axis` once the forced ones are kept
    pub fn needed_free(&self, target: Subproblem, axis: Axis) -> usize {
        target
            .required(axis)
            .saturating_sub(self.partition.num_forced(axis))
    }

    /// Minimum pair count a surviving pair along `axis` must reach
    pub fn pair_threshold(&self, target: Subproblem, axis: Axis) -> usize {
        target
            .required(axis.other())
            .saturating_sub(self.partition.num_forced(axis.other()))
    }

    /// Column pass, then row pass, then cut lists for whatever survived.
    pub fn prune(&self, target: Subproblem) -> PruneOutcome {
        if target.row_sum < self.partition.num_forced(Axis::Row) {
            return PruneOutcome::Infeasible {
                axis: Axis::Row,
                remaining: target.row_sum,
                required: self.partition.num_forced(Axis::Row),
            };
        }

        let mut valid_cols = vec![true; self.partition.num_free(Axis::Col)];
        if let Err(outcome) = self.prune_axis(Axis::Col, target, &mut valid_cols) {
            return outcome;
        }
        let mut valid_rows = vec![true; self.partition.num_free(Axis::Row)];
        if let Err(outcome) = self.prune_axis(Axis::Row, target, &mut valid_rows) {
            return outcome;
        }

        PruneOutcome::Feasible(self.finish(target, valid_rows, valid_cols))
    }

    /// Fixed-point elimination along one axis.
    ///
    /// Returns the number of members eliminated, or the infeasibility proof
    /// as soon as fewer than the required number remain.
    pub fn prune_axis(
        &self,
        axis: Axis,
        target: Subproblem,
        valid: &mut [bool],
    ) -> Result<usize, PruneOutcome> {
        let table = self.table(axis);
        let free = self.partition.free(axis);
        let needed = self.needed_free(target, axis);
        let partners = needed.saturating_sub(1);
        let threshold = self.pair_threshold(target, axis);
        let capacity = target.required(axis.other());

        let mut remaining = count_true(valid);
        let mut eliminated = 0;
        loop {
            let mut changed = false;
            for local in 0..valid.len() {
                if !valid[local] {
                    continue;
                }
                let too_sparse = self.matrix.valid_count(axis, free[local]) < capacity;
                if too_sparse || table.num_pairs_gte(local, threshold, valid) < partners {
                    valid[local] = false;
                    remaining -= 1;
                    eliminated += 1;
                    changed = true;
                }
            }

            if remaining < needed {
                return Err(PruneOutcome::Infeasible {
                    axis,
                    remaining,
                    required: needed,
                });
            }
            if !changed {
                break;
            }
        }

        debug!(
            "{} pass for {}: eliminated {}, {} remain",
            axis, target, eliminated, remaining
        );
        Ok(eliminated)
    }

    /// Incompatible pairs among the survivors along `axis`
    pub fn cut_lists(&self, axis: Axis, target: Subproblem, valid: &[bool]) -> Vec<CutList> {
        let table = self.table(axis);
        let threshold = self.pair_threshold(target, axis);
        (0..valid.len())
            .filter(|&local| valid[local])
            .filter_map(|local| {
                let others = table.pairs_lt(local, threshold, valid);
                if others.is_empty() {
                    None
                } else {
                    Some(CutList {
                        index: local,
                        others,
                    })
                }
            })
            .collect()
    }

    fn finish(&self, target: Subproblem, valid_rows: Vec<bool>, valid_cols: Vec<bool>) -> PrunedSubproblem {
        let row_cuts = self.cut_lists(Axis::Row, target, &valid_rows);
        let col_cuts = self.cut_lists(Axis::Col, target, &valid_cols);
        PrunedSubproblem {
            target,
            valid_rows,
            valid_cols,
            row_cuts,
            col_cuts,
        }
    }

    /// Tighten an already pruned subproblem.
    ///
    /// Pair counts are recomputed over the surviving members of the other
    /// axis, then both passes run again, alternating until neither removes
    /// anything.
    pub fn refine(matrix: &MatrixIndex, partition: &Partition, pruned: &PrunedSubproblem) -> PruneOutcome {
        let target = pruned.target;
        let free_rows = partition.free(Axis::Row);
        let free_cols = partition.free(Axis::Col);
        let mut valid_rows = pruned.valid_rows.clone();
        let mut valid_cols = pruned.valid_cols.clone();

        let mut round = 0;
        loop {
            round += 1;
            let row_pairs = PairCompatibilityTable::recalculate(matrix, Axis::Row, free_rows, free_cols, &valid_cols);
            let col_pairs = PairCompatibilityTable::recalculate(matrix, Axis::Col, free_cols, free_rows, &valid_rows);
            let engine = PruningEngine::new(matrix, partition, &row_pairs, &col_pairs);

            let removed_cols = match engine.prune_axis(Axis::Col, target, &mut valid_cols) {
                Ok(n) => n,
                Err(outcome) => return outcome,
            };
            let removed_rows = match engine.prune_axis(Axis::Row, target, &mut valid_rows) {
                Ok(n) => n,
                Err(outcome) => return outcome,
            };

            if removed_cols == 0 && removed_rows == 0 {
                debug!("Refinement of {} stable after {} rounds", target, round);
                return PruneOutcome::Feasible(engine.finish(target, valid_rows, valid_cols));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        matrix: MatrixIndex,
        partition: Partition,
        row_pairs: PairCompatibilityTable,
        col_pairs: PairCompatibilityTable,
    }

    impl Fixture {
        fn new(na: &[Vec<bool>]) -> Self {
            let matrix = MatrixIndex::from_na_rows(na).unwrap();
            let partition = Partition::from_matrix(&matrix);
            let row_pairs = PairCompatibilityTable::build(
                &matrix,
                Axis::Row,
                partition.free(Axis::Row),
                partition.free(Axis::Col),
            );
            let col_pairs = PairCompatibilityTable::build(
                &matrix,
                Axis::Col,
                partition.free(Axis::Col),
                partition.free(Axis::Row),
            );
            Self {
                matrix,
                partition,
                row_pairs,
                col_pairs,
            }
        }

        fn engine(&self) -> PruningEngine<'_> {
            PruningEngine::new(&self.matrix, &self.partition, &self.row_pairs, &self.col_pairs)
        }
    }

    fn diagonal_na(n: usize) -> Vec<Vec<bool>> {
        (0..n).map(|i| (0..n).map(|j| i == j).collect()).collect()
    }

    #[test]
    fn test_diagonal_feasible_target() {
        // 4x4 with NA on the diagonal: any 2 rows keep the 2 other columns.
        let f = Fixture::new(&diagonal_na(4));
        match f.engine().prune(Subproblem::new(2, 2)) {
            PruneOutcome::Feasible(p) => {
                assert_eq!(p.valid_rows, vec![true; 4]);
                assert_eq!(p.valid_cols, vec![true; 4]);
            }
            other => panic!("expected feasible, got {:?}", other),
        }
    }

    #[test]
    fn test_diagonal_infeasible_target() {
        // Two kept columns would have to share 3 rows; every pair shares only 2.
        let f = Fixture::new(&diagonal_na(4));
        match f.engine().prune(Subproblem::new(3, 2)) {
            PruneOutcome::Infeasible { axis, .. } => assert_eq!(axis, Axis::Col),
            other => panic!("expected infeasible, got {:?}", other),
        }
    }

    #[test]
    fn test_capacity_eliminates_sparse_rows() {
        let na = vec![
            vec![false, false, false, true],
            vec![true, true, true, false],
            vec![false, false, false, true],
        ];
        let f = Fixture::new(&na);
        match f.engine().prune(Subproblem::new(2, 3)) {
            PruneOutcome::Feasible(p) => {
                // Row 1 has a single valid cell, column 3 is valid in one row only.
                assert_eq!(p.valid_rows, vec![true, false, true]);
                assert_eq!(p.valid_cols, vec![true, true, true, false]);
                assert!(p.row_cuts.is_empty());
            }
            other => panic!("expected feasible, got {:?}", other),
        }
    }

    #[test]
    fn test_forced_rows_bound_row_sum() {
        let na = vec![vec![false, false], vec![false, true]];
        let f = Fixture::new(&na);
        match f.engine().prune(Subproblem::new(0, 1)) {
            PruneOutcome::Infeasible { axis, required, .. } => {
                assert_eq!(axis, Axis::Row);
                assert_eq!(required, 1);
            }
            other => panic!("expected infeasible, got {:?}", other),
        }
    }

    #[test]
    fn test_cut_lists_mark_incompatible_pairs() {
        // Rows 0 and 1 share no valid column, so they cannot be kept together.
        let na = vec![
            vec![false, false, true, true],
            vec![true, true, false, false],
            vec![false, false, false, false],
        ];
        let f = Fixture::new(&na);
        let engine = f.engine();
        let target = Subproblem::new(2, 2);
        match engine.prune(target) {
            PruneOutcome::Feasible(p) => {
                // Row 2 is forced; free rows are 0 and 1 (local 0 and 1).
                assert_eq!(p.valid_rows, vec![true, true]);
                assert_eq!(p.cut_pairs(Axis::Row), vec![(0, 1)]);
            }
            other => panic!("expected feasible, got {:?}", other),
        }
    }

    #[test]
    fn test_refine_never_grows_masks() {
        let na = vec![
            vec![false, true, false, false, true],
            vec![false, false, true, false, false],
            vec![true, false, false, false, false],
            vec![false, false, false, true, false],
            vec![false, true, false, false, false],
        ];
        let f = Fixture::new(&na);
        let target = Subproblem::new(3, 3);
        let first = match f.engine().prune(target) {
            PruneOutcome::Feasible(p) => p,
            other => panic!("expected feasible, got {:?}", other),
        };
        if let PruneOutcome::Feasible(refined) = PruningEngine::refine(&f.matrix, &f.partition, &first) {
            for (after, before) in refined.valid_rows.iter().zip(&first.valid_rows) {
                assert!(!after || *before);
            }
            for (after, before) in refined.valid_cols.iter().zip(&first.valid_cols) {
                assert!(!after || *before);
            }
        }
    }
}
