//! # Exact Subproblem Solver
//!
//! Workers hand every pruned subproblem to an [`ExactSolver`]. The trait keeps
//! the search independent of how the optimisation is carried out; the crate
//! ships [`BranchAndBoundSolver`], an exact enumeration over row subsets.
//!
//! For a target `(row_sum, min_cols)` the solver maximises the number of kept
//! columns subject to: every forced row and column kept, exactly `row_sum`
//! rows, no NA cell kept, no cut pair kept together, objective at least
//! `min_cols`. Anything below the cutoff is reported as infeasible.

/**
 * File: /src/search/solver.rs
 * Created Date: Thursday, October 16th 2025
 * Author: Zihan
 * -----
 * Last Modified: Friday, 17th October 2025 1:18:45 pm
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-17		Zihan	Node limit, independent-set step for column cuts
 * 2025-10-16		Zihan	ExactSolver trait and branch and bound implementation
 */

use crate::matrix::{Axis, MatrixIndex};
use crate::search::partition::Partition;
use crate::search::types::{PrunedSubproblem, Subproblem};
use crate::util::{count_true, mask_from_indices, BitSet};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum SolverError {
    /// Masks, fixed sets or cuts do not fit the partition
    InvalidRequest(String),
    /// Gave up after exploring the configured number of nodes
    NodeLimit(usize),
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SolverError::InvalidRequest(msg) => write!(f, "Invalid solve request: {}", msg),
            SolverError::NodeLimit(limit) => write!(f, "Node limit of {} reached", limit),
        }
    }
}

impl Error for SolverError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub status: SolveStatus,
    /// Kept columns, forced ones included; zero when infeasible
    pub objective: usize,
    pub rows_to_keep: Vec<bool>,
    pub cols_to_keep: Vec<bool>,
}

impl Solution {
    pub fn infeasible(num_rows: usize, num_cols: usize) -> Self {
        Self {
            status: SolveStatus::Infeasible,
            objective: 0,
            rows_to_keep: vec![false; num_rows],
            cols_to_keep: vec![false; num_cols],
        }
    }
}

/// One subproblem as seen by the solver. Row and column indices are local to
/// the free members of the partition.
#[derive(Debug, Clone)]
pub struct SolveRequest<'a> {
    pub matrix: &'a MatrixIndex,
    pub partition: &'a Partition,
    pub target: Subproblem,
    /// Free rows that may be kept (fixed to zero otherwise)
    pub allowed_rows: Vec<bool>,
    pub allowed_cols: Vec<bool>,
    /// Free rows that must be kept
    pub fixed_rows: Vec<usize>,
    pub fixed_cols: Vec<usize>,
    pub row_cuts: Vec<(usize, usize)>,
    pub col_cuts: Vec<(usize, usize)>,
}

impl<'a> SolveRequest<'a> {
    pub fn from_pruned(matrix: &'a MatrixIndex, partition: &'a Partition, pruned: &PrunedSubproblem) -> Self {
        Self {
            matrix,
            partition,
            target: pruned.target,
            allowed_rows: pruned.valid_rows.clone(),
            allowed_cols: pruned.valid_cols.clone(),
            fixed_rows: Vec::new(),
            fixed_cols: Vec::new(),
            row_cuts: pruned.cut_pairs(Axis::Row),
            col_cuts: pruned.cut_pairs(Axis::Col),
        }
    }

    fn allowed(&self, axis: Axis) -> &[bool] {
        match axis {
            Axis::Row => &self.allowed_rows,
            Axis::Col => &self.allowed_cols,
        }
    }

    fn fixed(&self, axis: Axis) -> &[usize] {
        match axis {
            Axis::Row => &self.fixed_rows,
            Axis::Col => &self.fixed_cols,
        }
    }

    fn cuts(&self, axis: Axis) -> &[(usize, usize)] {
        match axis {
            Axis::Row => &self.row_cuts,
            Axis::Col => &self.col_cuts,
        }
    }

    pub fn validate(&self) -> Result<(), SolverError> {
        for axis in [Axis::Row, Axis::Col] {
            let n = self.partition.num_free(axis);
            if self.allowed(axis).len() != n {
                return Err(SolverError::InvalidRequest(format!(
                    "{} mask has {} entries for {} free members",
                    axis,
                    self.allowed(axis).len(),
                    n
                )));
            }
            let out_of_range = self.fixed(axis).iter().any(|&i| i >= n)
                || self.cuts(axis).iter().any(|&(a, b)| a >= n || b >= n || a == b);
            if out_of_range {
                return Err(SolverError::InvalidRequest(format!(
                    "{} fixed set or cuts out of range",
                    axis
                )));
            }
        }
        if self.partition.free(Axis::Row).iter().any(|&r| r >= self.matrix.num_rows())
            || self.partition.free(Axis::Col).iter().any(|&c| c >= self.matrix.num_cols())
        {
            return Err(SolverError::InvalidRequest(
                "partition does not fit the matrix".to_string(),
            ));
        }
        Ok(())
    }
}

/// Solves one subproblem to optimality.
pub trait ExactSolver: Send + Sync {
    fn solve(&self, request: &SolveRequest<'_>) -> Result<Solution, SolverError>;

    fn name(&self) -> &str;
}

/// Depth-first search over subsets of the allowed free rows.
///
/// Kept columns are the intersection of the chosen rows' valid columns, held
/// as a [`BitSet`]; the bound is the size of that intersection.
#[derive(Debug, Clone, Default)]
pub struct BranchAndBoundSolver {
    node_limit: Option<usize>,
}

impl BranchAndBoundSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node_limit(node_limit: usize) -> Self {
        Self {
            node_limit: Some(node_limit),
        }
    }
}

impl ExactSolver for BranchAndBoundSolver {
    fn solve(&self, request: &SolveRequest<'_>) -> Result<Solution, SolverError> {
        request.validate()?;
        let num_rows = request.matrix.num_rows();
        let num_cols = request.matrix.num_cols();

        let mut search = match RowSearch::setup(request, self.node_limit) {
            Some(search) => search,
            None => return Ok(Solution::infeasible(num_rows, num_cols)),
        };
        let mut chosen = search.fixed_rows.clone();
        let start = search.start_cols.clone();
        search.descend(0, &mut chosen, start)?;

        Ok(match search.best {
            Some(best) => {
                let rows = mask_from_indices(request.partition.num_free(Axis::Row), &best.rows);
                let cols = mask_from_indices(request.partition.num_free(Axis::Col), &best.cols);
                Solution {
                    status: SolveStatus::Optimal,
                    objective: best.objective,
                    rows_to_keep: request.partition.expand(Axis::Row, &rows, num_rows),
                    cols_to_keep: request.partition.expand(Axis::Col, &cols, num_cols),
                }
            }
            None => Solution::infeasible(num_rows, num_cols),
        })
    }

    fn name(&self) -> &str {
        "branch-and-bound"
    }
}

struct Best {
    objective: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
}

struct RowSearch {
    /// Free rows to choose, fixed ones included
    k: usize,
    forced_cols: usize,
    min_cols: usize,
    row_bits: Vec<BitSet>,
    row_conflicts: Vec<BitSet>,
    col_conflicts: Vec<BitSet>,
    fixed_rows: Vec<usize>,
    fixed_cols: Vec<usize>,
    start_cols: BitSet,
    candidates: Vec<usize>,
    best: Option<Best>,
    nodes: usize,
    node_limit: Option<usize>,
}

fn conflict_sets(len: usize, cuts: &[(usize, usize)]) -> Vec<BitSet> {
    let mut sets = vec![BitSet::new(len); len];
    for &(a, b) in cuts {
        sets[a].insert(b);
        sets[b].insert(a);
    }
    sets
}

impl RowSearch {
    /// `None` when the request is infeasible before any branching
    fn setup(request: &SolveRequest<'_>, node_limit: Option<usize>) -> Option<Self> {
        let partition = request.partition;
        let free_rows = partition.free(Axis::Row);
        let free_cols = partition.free(Axis::Col);
        let k = request
            .target
            .row_sum
            .checked_sub(partition.num_forced(Axis::Row))?;
        if k > count_true(&request.allowed_rows) || request.fixed_rows.len() > k {
            return None;
        }

        let allowed_cols = BitSet::from_mask(&request.allowed_cols);
        let row_conflicts = conflict_sets(free_rows.len(), &request.row_cuts);
        let col_conflicts = conflict_sets(free_cols.len(), &request.col_cuts);

        let fixed_cols = request.fixed_cols.clone();
        for (n, &c) in fixed_cols.iter().enumerate() {
            if !allowed_cols.contains(c) || fixed_cols[..n].iter().any(|&d| col_conflicts[c].contains(d)) {
                return None;
            }
        }

        let row_bits: Vec<BitSet> = free_rows
            .iter()
            .map(|&r| {
                let mut bits = allowed_cols.clone();
                for (local, &c) in free_cols.iter().enumerate() {
                    if !request.matrix.is_valid(r, c) {
                        bits.remove(local);
                    }
                }
                bits
            })
            .collect();
        let eligible: Vec<bool> = (0..free_rows.len())
            .map(|r| request.allowed_rows[r] && fixed_cols.iter().all(|&c| row_bits[r].contains(c)))
            .collect();

        let fixed_rows = request.fixed_rows.clone();
        let mut start_cols = allowed_cols;
        for (n, &r) in fixed_rows.iter().enumerate() {
            if !eligible[r] || fixed_rows[..n].iter().any(|&s| row_conflicts[r].contains(s)) {
                return None;
            }
            start_cols.intersect_with(&row_bits[r]);
        }

        let mut candidates: Vec<usize> = (0..free_rows.len())
            .filter(|&r| eligible[r] && !fixed_rows.contains(&r))
            .filter(|&r| fixed_rows.iter().all(|&s| !row_conflicts[r].contains(s)))
            .collect();
        candidates.sort_by_key(|&r| std::cmp::Reverse(row_bits[r].count()));

        Some(Self {
            k,
            forced_cols: partition.num_forced(Axis::Col),
            min_cols: request.target.min_cols,
            row_bits,
            row_conflicts,
            col_conflicts,
            fixed_rows,
            fixed_cols,
            start_cols,
            candidates,
            best: None,
            nodes: 0,
            node_limit,
        })
    }

    fn cannot_improve(&self, bound: usize) -> bool {
        bound < self.min_cols || self.best.as_ref().map_or(false, |b| bound <= b.objective)
    }

    fn descend(&mut self, start: usize, chosen: &mut Vec<usize>, cols: BitSet) -> Result<(), SolverError> {
        self.nodes += 1;
        if let Some(limit) = self.node_limit {
            if self.nodes > limit {
                return Err(SolverError::NodeLimit(limit));
            }
        }
        if self.cannot_improve(self.forced_cols + cols.count()) {
            return Ok(());
        }

        if chosen.len() == self.k {
            let kept = self.best_columns(&cols);
            let objective = self.forced_cols + kept.len();
            if !self.cannot_improve(objective) {
                self.best = Some(Best {
                    objective,
                    rows: chosen.clone(),
                    cols: kept,
                });
            }
            return Ok(());
        }

        let need = self.k - chosen.len();
        for i in start..self.candidates.len() {
            if self.candidates.len() - i < need {
                break;
            }
            let r = self.candidates[i];
            if chosen.iter().any(|&s| self.row_conflicts[r].contains(s)) {
                continue;
            }
            let next = cols.intersection(&self.row_bits[r]);
            chosen.push(r);
            self.descend(i + 1, chosen, next)?;
            chosen.pop();
        }
        Ok(())
    }

    /// Largest set of columns from `cols` with no cut pair inside, fixed
    /// columns always included.
    fn best_columns(&self, cols: &BitSet) -> Vec<usize> {
        let mut kept = self.fixed_cols.clone();
        let open: Vec<usize> = cols
            .iter()
            .filter(|c| !self.fixed_cols.contains(c))
            .filter(|&c| self.fixed_cols.iter().all(|&f| !self.col_conflicts[c].contains(f)))
            .collect();
        let (clear, involved): (Vec<usize>, Vec<usize>) = open
            .iter()
            .partition(|&&c| open.iter().all(|&d| !self.col_conflicts[c].contains(d)));
        kept.extend(clear);
        kept.extend(max_independent_set(&involved, &self.col_conflicts));
        kept.sort_unstable();
        kept
    }
}

fn max_independent_set(vertices: &[usize], neighbors: &[BitSet]) -> Vec<usize> {
    let (v, rest) = match vertices.split_first() {
        Some((&v, rest)) => (v, rest),
        None => return Vec::new(),
    };
    let apart: Vec<usize> = rest
        .iter()
        .copied()
        .filter(|&u| !neighbors[v].contains(u))
        .collect();
    let mut with_v = max_independent_set(&apart, neighbors);
    with_v.push(v);
    if apart.len() == rest.len() {
        return with_v;
    }
    let without_v = max_independent_set(rest, neighbors);
    if without_v.len() > with_v.len() {
        without_v
    } else {
        with_v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submatrix::Submatrix;

    fn setup(na: &[Vec<bool>]) -> (MatrixIndex, Partition) {
        let m = MatrixIndex::from_na_rows(na).unwrap();
        let p = Partition::from_matrix(&m);
        (m, p)
    }

    fn request<'a>(m: &'a MatrixIndex, p: &'a Partition, row_sum: usize, min_cols: usize) -> SolveRequest<'a> {
        SolveRequest {
            matrix: m,
            partition: p,
            target: Subproblem::new(row_sum, min_cols),
            allowed_rows: vec![true; p.num_free(Axis::Row)],
            allowed_cols: vec![true; p.num_free(Axis::Col)],
            fixed_rows: vec![],
            fixed_cols: vec![],
            row_cuts: vec![],
            col_cuts: vec![],
        }
    }

    fn sample() -> Vec<Vec<bool>> {
        vec![
            vec![true, false, false, false, false],
            vec![false, true, false, false, false],
            vec![false, false, false, false, false],
            vec![false, false, false, false, false],
        ]
    }

    #[test]
    fn test_optimal_columns_for_row_sum() {
        let (m, p) = setup(&sample());
        let solver = BranchAndBoundSolver::new();

        let solution = solver.solve(&request(&m, &p, 4, 1)).unwrap();
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.objective, 3);
        assert_eq!(solution.rows_to_keep, vec![true; 4]);
        assert_eq!(solution.cols_to_keep, vec![false, false, true, true, true]);

        let solution = solver.solve(&request(&m, &p, 3, 1)).unwrap();
        assert_eq!(solution.objective, 4);
        let kept = Submatrix::from_masks(&m, &solution.rows_to_keep, &solution.cols_to_keep).unwrap();
        assert!(kept.is_complete());
        assert_eq!(kept.num_rows(), 3);
    }

    #[test]
    fn test_cutoff_gives_infeasible() {
        let (m, p) = setup(&sample());
        let solution = BranchAndBoundSolver::new()
            .solve(&request(&m, &p, 4, 4))
            .unwrap();
        assert_eq!(solution.status, SolveStatus::Infeasible);
        assert_eq!(solution.objective, 0);
    }

    #[test]
    fn test_row_cuts_respected() {
        let (m, p) = setup(&sample());
        // Free rows are 0 and 1; cutting them forces the 3-row answer to drop one.
        let mut req = request(&m, &p, 4, 1);
        req.row_cuts = vec![(0, 1)];
        let solution = BranchAndBoundSolver::new().solve(&req).unwrap();
        assert_eq!(solution.status, SolveStatus::Infeasible);

        let mut req = request(&m, &p, 3, 1);
        req.row_cuts = vec![(0, 1)];
        let solution = BranchAndBoundSolver::new().solve(&req).unwrap();
        assert_eq!(solution.objective, 4);
    }

    #[test]
    fn test_column_cuts_and_fixed_sets() {
        let (m, p) = setup(&sample());
        // Free columns are 0 and 1, both valid for rows 2 and 3.
        let mut req = request(&m, &p, 2, 1);
        req.col_cuts = vec![(0, 1)];
        let solution = BranchAndBoundSolver::new().solve(&req).unwrap();
        assert_eq!(solution.objective, 4);

        let mut req = request(&m, &p, 3, 1);
        req.fixed_rows = vec![0];
        let solution = BranchAndBoundSolver::new().solve(&req).unwrap();
        assert!(solution.rows_to_keep[0]);
        assert_eq!(solution.objective, 4);

        let mut req = request(&m, &p, 3, 1);
        req.fixed_cols = vec![0];
        let solution = BranchAndBoundSolver::new().solve(&req).unwrap();
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert!(solution.cols_to_keep[0]);
        assert!(!solution.rows_to_keep[0]);
    }

    #[test]
    fn test_invalid_request_and_node_limit() {
        let (m, p) = setup(&sample());
        let mut req = request(&m, &p, 3, 1);
        req.allowed_rows = vec![true];
        assert!(matches!(
            BranchAndBoundSolver::new().solve(&req),
            Err(SolverError::InvalidRequest(_))
        ));

        let req = request(&m, &p, 3, 1);
        assert!(matches!(
            BranchAndBoundSolver::with_node_limit(1).solve(&req),
            Err(SolverError::NodeLimit(1))
        ));
    }

    #[test]
    fn test_max_independent_set() {
        let neighbors = conflict_sets(4, &[(0, 1), (1, 2), (2, 3)]);
        let set = max_independent_set(&[0, 1, 2, 3], &neighbors);
        assert_eq!(set.len(), 2);
    }
}
