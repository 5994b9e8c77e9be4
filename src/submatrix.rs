/**
 * File: /src/submatrix.rs
 * Created Date: Monday January 22nd 2024
 * Author: Zihan
 * -----
 * Last Modified: Wednesday, 15th October 2025 10:02:13 am
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-15		Zihan	Submatrix now selects rows/cols of a MatrixIndex
**/

/// A selection of rows and columns of a [`MatrixIndex`]
use crate::matrix::MatrixIndex;
use crate::util::{indices_of, mask_from_indices};
use std::ops::Index;

///
/// # Example
/// ```
/// use nomiss::matrix::MatrixIndex;
/// use nomiss::submatrix::Submatrix;
/// let m = MatrixIndex::from_na_rows(&[
///     vec![true, false, false],
///     vec![false, false, false],
///     vec![false, true, false],
/// ]).unwrap();
/// let b = Submatrix::from_indices(&m, &[0, 1], &[1, 2]).unwrap();
///
/// assert!(b.is_complete());
/// assert_eq!(b.num_elements(), 4);
/// assert!(b[(0, 0)]);
/// ```
pub struct Submatrix<'a> {
    matrix: &'a MatrixIndex,
    row_indices: Vec<usize>,
    col_indices: Vec<usize>,
}

impl<'a> Submatrix<'a> {
    fn new(matrix: &'a MatrixIndex, row_indices: Vec<usize>, col_indices: Vec<usize>) -> Option<Self> {
        let rows_ok = row_indices.iter().all(|&r| r < matrix.num_rows());
        let cols_ok = col_indices.iter().all(|&c| c < matrix.num_cols());

        if rows_ok && cols_ok {
            Some(Submatrix {
                matrix,
                row_indices,
                col_indices,
            })
        } else {
            None
        }
    }

    pub fn from_indices(
        matrix: &'a MatrixIndex,
        row_indices: &[usize],
        col_indices: &[usize],
    ) -> Option<Self> {
        Self::new(matrix, row_indices.to_vec(), col_indices.to_vec())
    }

    /// `None` when the mask lengths do not match the matrix
    pub fn from_masks(matrix: &'a MatrixIndex, rows_to_keep: &[bool], cols_to_keep: &[bool]) -> Option<Self> {
        if rows_to_keep.len() != matrix.num_rows() || cols_to_keep.len() != matrix.num_cols() {
            return None;
        }
        Self::new(matrix, indices_of(rows_to_keep), indices_of(cols_to_keep))
    }

    pub fn num_rows(&self) -> usize {
        self.row_indices.len()
    }

    pub fn num_cols(&self) -> usize {
        self.col_indices.len()
    }

    pub fn num_elements(&self) -> usize {
        self.num_rows() * self.num_cols()
    }

    pub fn row_indices(&self) -> &[usize] {
        &self.row_indices
    }

    pub fn col_indices(&self) -> &[usize] {
        &self.col_indices
    }

    /// True when no selected cell is NA
    pub fn is_complete(&self) -> bool {
        self.row_indices
            .iter()
            .all(|&r| self.col_indices.iter().all(|&c| self.matrix.is_valid(r, c)))
    }

    pub fn rows_mask(&self) -> Vec<bool> {
        mask_from_indices(self.matrix.num_rows(), &self.row_indices)
    }

    pub fn cols_mask(&self) -> Vec<bool> {
        mask_from_indices(self.matrix.num_cols(), &self.col_indices)
    }
}

impl<'a> Index<(usize, usize)> for Submatrix<'a> {
    type Output = bool;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.matrix[(self.row_indices[index.0], self.col_indices[index.1])]
    }
}

// impl Display
/// # Example
/// ```log
/// [., x]
/// [., .]
/// ```
/// `.` is a valid cell, `x` a missing one.
impl<'a> std::fmt::Display for Submatrix<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for i in 0..self.num_rows() {
            let cells: Vec<&str> = (0..self.num_cols())
                .map(|j| if self[(i, j)] { "." } else { "x" })
                .collect();
            writeln!(f, "[{}]", cells.join(", "))?;
        }
        Ok(())
    }
}
