//! # Matrix Orientation
//!
//! The search enumerates subsets of rows and walks every candidate row
//! count, so it runs on whichever orientation has fewer rows. A tall input
//! is transposed before the search and the kept rows and columns are mapped
//! back afterwards.

/**
 * File: /src/orientation.rs
 * Created Date: Saturday, October 18th 2025
 * Author: Zihan
 * -----
 * Last Modified: Saturday, 18th October 2025 11:14:05 am
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-18		Zihan	Search on the shorter axis
 */

use crate::matrix::{DataTable, MatrixIndex};
use crate::search::Incumbent;
use log::info;
use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    AsGiven,
    Transposed,
}

impl Orientation {
    /// Transposed when the table has more data rows than data columns
    pub fn of(table: &DataTable) -> Orientation {
        if table.num_data_rows() > table.num_data_cols() {
            Orientation::Transposed
        } else {
            Orientation::AsGiven
        }
    }

    pub fn is_transposed(self) -> bool {
        self == Orientation::Transposed
    }

    /// `None` when the table is searched as given
    pub fn apply(self, table: &DataTable) -> Option<DataTable> {
        match self {
            Orientation::AsGiven => None,
            Orientation::Transposed => {
                info!(
                    "Transposing {}x{} matrix, rows outnumber columns",
                    table.num_data_rows(),
                    table.num_data_cols()
                );
                Some(table.transposed())
            }
        }
    }

    /// Map a matrix seen by the search back to the input orientation.
    pub fn restore_matrix(self, matrix: &MatrixIndex) -> Cow<'_, MatrixIndex> {
        match self {
            Orientation::AsGiven => Cow::Borrowed(matrix),
            Orientation::Transposed => Cow::Owned(matrix.transposed()),
        }
    }

    /// Map a solution found by the search back to the input orientation.
    pub fn restore(self, incumbent: Incumbent) -> Incumbent {
        match self {
            Orientation::AsGiven => incumbent,
            Orientation::Transposed => incumbent.transposed(),
        }
    }
}

/// `<dir>/<stem>_T.tsv` next to the input file
pub fn transposed_file_name<P: AsRef<Path>>(data_file: P) -> PathBuf {
    let data_file = data_file.as_ref();
    let stem = data_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    data_file.with_file_name(format!("{}_T.tsv", stem))
}

pub fn write_table<P: AsRef<Path>>(path: P, table: &DataTable) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    table.write_tsv(&mut out)?;
    out.flush()
}

/// Append `data_file,rows,cols,valid_cells` for the searched orientation.
pub fn write_matrix_stats<P: AsRef<Path>>(
    path: P,
    data_file: &str,
    matrix: &MatrixIndex,
) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(
        file,
        "{},{},{},{}",
        data_file,
        matrix.num_rows(),
        matrix.num_cols(),
        matrix.num_valid()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tall_table() -> DataTable {
        let lines = [
            "id\ta\tb",
            "r0\t1\tNA",
            "r1\t2\t3",
            "r2\tNA\t4",
            "r3\t5\t6",
        ];
        DataTable::from_lines(&lines, 1, 1).unwrap()
    }

    #[test]
    fn test_orientation_choice() {
        let tall = tall_table();
        assert_eq!(Orientation::of(&tall), Orientation::Transposed);
        let wide = tall.transposed();
        assert_eq!(Orientation::of(&wide), Orientation::AsGiven);
        assert!(Orientation::AsGiven.apply(&wide).is_none());

        let square = DataTable::from_lines(&["h\tx", "r\t1"], 1, 1).unwrap();
        assert_eq!(Orientation::of(&square), Orientation::AsGiven);
    }

    #[test]
    fn test_solution_maps_back() {
        let tall = tall_table();
        let orientation = Orientation::of(&tall);
        let searched = orientation.apply(&tall).unwrap();
        let matrix = MatrixIndex::from_table(&searched, "NA");
        assert_eq!((matrix.num_rows(), matrix.num_cols()), (2, 4));

        // Both columns of the input, rows r1 and r3
        let found = Incumbent::new(vec![true, true], vec![false, true, false, true]);
        assert!(found.is_feasible_for(&matrix));

        let input_matrix = orientation.restore_matrix(&matrix);
        let best = orientation.restore(found);
        assert!(best.is_feasible_for(&input_matrix));
        assert_eq!(best.rows_to_keep(), &[false, true, false, true]);
        assert_eq!(best.cols_to_keep(), &[true, true]);
        assert_eq!(
            input_matrix.fingerprint(),
            MatrixIndex::from_table(&tall, "NA").fingerprint()
        );
    }

    #[test]
    fn test_transposed_file_and_stats() {
        let dir = TempDir::new().unwrap();
        let tall = tall_table();
        let path = transposed_file_name(dir.path().join("input.tsv"));
        assert_eq!(path.file_name().unwrap(), "input_T.tsv");

        let searched = tall.transposed();
        write_table(&path, &searched).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "id\tr0\tr1\tr2\tr3\na\t1\t2\tNA\t5\nb\tNA\t3\t4\t6\n"
        );
        let reread = DataTable::read_tsv(&path, 1, 1).unwrap();
        assert_eq!(reread.num_data_rows(), 2);
        assert_eq!(reread.cell(1, 3), "6");

        let stats = dir.path().join("matrix_stats.csv");
        let matrix = MatrixIndex::from_table(&searched, "NA");
        write_matrix_stats(&stats, "input.tsv", &matrix).unwrap();
        assert_eq!(fs::read_to_string(&stats).unwrap(), "input.tsv,2,4,6\n");
    }
}
