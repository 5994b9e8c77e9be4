/**
 * File: /src/greedy.rs
 * Created Date: Thursday, October 16th 2025
 * Author: Zihan
 * -----
 * Last Modified: Thursday, 16th October 2025 7:40:22 pm
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-16		Zihan	Row-adding greedy seed for the incumbent
 */

use crate::matrix::{Axis, MatrixIndex};
use crate::search::incumbent::Incumbent;
use log::debug;

/// Adds rows from most to least complete, keeping the columns valid in all
/// of them, and remembers the best rows x cols product along the way.
pub struct AddRowGreedy<'a> {
    matrix: &'a MatrixIndex,
}

impl<'a> AddRowGreedy<'a> {
    pub fn new(matrix: &'a MatrixIndex) -> Self {
        Self { matrix }
    }

    /// Rows by increasing missing count, ties in index order
    pub fn row_order(&self) -> Vec<usize> {
        let missing = self.matrix.invalid_counts(Axis::Row);
        let mut order: Vec<usize> = (0..self.matrix.num_rows()).collect();
        order.sort_by_key(|&r| missing[r]);
        order
    }

    pub fn solve(&self) -> Incumbent {
        let num_rows = self.matrix.num_rows();
        let num_cols = self.matrix.num_cols();
        let order = self.row_order();

        let mut cols = vec![true; num_cols];
        let mut best = 0;
        let mut best_prefix = 0;
        let mut best_cols = vec![false; num_cols];

        for (step, &r) in order.iter().enumerate() {
            let mut kept = 0;
            for (c, keep) in cols.iter_mut().enumerate() {
                *keep = *keep && self.matrix.is_valid(r, c);
                if *keep {
                    kept += 1;
                }
            }
            if kept == 0 {
                break;
            }
            let elements = (step + 1) * kept;
            if elements > best {
                best = elements;
                best_prefix = step + 1;
                best_cols.copy_from_slice(&cols);
            }
        }

        let mut rows = vec![false; num_rows];
        for &r in &order[..best_prefix] {
            rows[r] = true;
        }
        debug!("Greedy kept the first {} rows, {} elements", best_prefix, best);
        Incumbent::new(rows, best_cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greedy_prefix() {
        let m = MatrixIndex::from_na_rows(&[
            vec![true, false, false, false, false],
            vec![false, true, false, false, false],
            vec![false, false, false, false, false],
            vec![false, false, false, false, false],
        ])
        .unwrap();
        let greedy = AddRowGreedy::new(&m);
        assert_eq!(greedy.row_order(), vec![2, 3, 0, 1]);

        let seed = greedy.solve();
        assert_eq!(seed.num_elements(), 12);
        assert_eq!(seed.rows_to_keep(), &[true, false, true, true]);
        assert_eq!(seed.cols_to_keep(), &[false, true, true, true, true]);
        assert!(seed.is_feasible_for(&m));
    }

    #[test]
    fn test_all_missing_gives_empty_seed() {
        let m = MatrixIndex::from_na_rows(&[vec![true, true], vec![true, true]]).unwrap();
        let seed = AddRowGreedy::new(&m).solve();
        assert_eq!(seed.num_elements(), 0);
        assert_eq!(seed.rows_to_keep(), &[false, false]);
    }
}
