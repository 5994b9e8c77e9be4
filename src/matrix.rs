/*
 * File: /matrix.rs
 * Created Date: Thursday November 23rd 2023
 * Author: Zihan
 * -----
 * Last Modified: Tuesday, 14th October 2025 9:12:40 am
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-18		Zihan	Matrix fingerprint, transposition
 * 2025-10-14		Zihan	Replace numeric Matrix<T> with NA-aware DataTable / MatrixIndex
 */

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::ops::Index;
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Which side of the matrix is the "primary" one.
///
/// Everything that exists once for rows and once for columns (partition,
/// pair tables, pruning passes) is written against an `Axis` instead of being
/// duplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Row,
    Col,
}

impl Axis {
    pub fn other(self) -> Axis {
        match self {
            Axis::Row => Axis::Col,
            Axis::Col => Axis::Row,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::Row => "row",
            Axis::Col => "col",
        }
    }

    pub fn from_name(name: &str) -> Option<Axis> {
        match name {
            "row" => Some(Axis::Row),
            "col" => Some(Axis::Col),
            _ => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Errors raised while loading a data matrix
#[derive(Debug)]
pub enum MatrixError {
    Io { path: String, source: io::Error },
    Empty,
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    HeaderTooLarge {
        header_rows: usize,
        header_cols: usize,
        rows: usize,
        cols: usize,
    },
}

impl fmt::Display for MatrixError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MatrixError::Io { path, source } => {
                write!(f, "Could not read matrix file {}: {}", path, source)
            }
            MatrixError::Empty => write!(f, "Matrix contains no data cells"),
            MatrixError::RaggedRow {
                line,
                expected,
                found,
            } => write!(
                f,
                "Line {} has {} fields, expected {}",
                line, found, expected
            ),
            MatrixError::HeaderTooLarge {
                header_rows,
                header_cols,
                rows,
                cols,
            } => write!(
                f,
                "{} header rows / {} header cols do not fit a {}x{} file",
                header_rows, header_cols, rows, cols
            ),
        }
    }
}

impl Error for MatrixError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MatrixError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Raw tab separated file: header lines, per-row labels and the data cells.
#[derive(Debug, Clone)]
pub struct DataTable {
    header_rows: Vec<Vec<String>>,
    header_cols: Vec<Vec<String>>,
    data: Array2<String>,
}

impl DataTable {
    pub fn read_tsv<P: AsRef<Path>>(
        path: P,
        num_header_rows: usize,
        num_header_cols: usize,
    ) -> Result<DataTable, MatrixError> {
        let path = path.as_ref();
        let io_err = |source| MatrixError::Io {
            path: path.display().to_string(),
            source,
        };
        let reader = BufReader::new(File::open(path).map_err(io_err)?);
        let lines = reader.lines().collect::<Result<Vec<_>, _>>().map_err(io_err)?;
        Self::from_lines(&lines, num_header_rows, num_header_cols)
    }

    /// Parse already split lines. Blank lines are ignored.
    pub fn from_lines<S: AsRef<str>>(
        lines: &[S],
        num_header_rows: usize,
        num_header_cols: usize,
    ) -> Result<DataTable, MatrixError> {
        let rows: Vec<(usize, Vec<&str>)> = lines
            .iter()
            .enumerate()
            .map(|(n, l)| (n + 1, l.as_ref().trim_end_matches('\r')))
            .filter(|(_, l)| !l.is_empty())
            .map(|(n, l)| (n, l.split('\t').collect()))
            .collect();

        let num_cols = match rows.first() {
            Some((_, fields)) => fields.len(),
            None => return Err(MatrixError::Empty),
        };
        for (line, fields) in &rows {
            if fields.len() != num_cols {
                return Err(MatrixError::RaggedRow {
                    line: *line,
                    expected: num_cols,
                    found: fields.len(),
                });
            }
        }
        if num_header_rows >= rows.len() || num_header_cols >= num_cols {
            return Err(MatrixError::HeaderTooLarge {
                header_rows: num_header_rows,
                header_cols: num_header_cols,
                rows: rows.len(),
                cols: num_cols,
            });
        }

        let to_owned = |fields: &[&str]| fields.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let header_rows = rows[..num_header_rows]
            .iter()
            .map(|(_, fields)| to_owned(&fields[..]))
            .collect();

        let num_data_rows = rows.len() - num_header_rows;
        let num_data_cols = num_cols - num_header_cols;
        let mut header_cols = Vec::with_capacity(num_data_rows);
        let mut cells = Vec::with_capacity(num_data_rows * num_data_cols);
        for (_, fields) in &rows[num_header_rows..] {
            header_cols.push(to_owned(&fields[..num_header_cols]));
            cells.extend(fields[num_header_cols..].iter().map(|s| s.to_string()));
        }

        let data = Array2::from_shape_vec((num_data_rows, num_data_cols), cells)
            .map_err(|_| MatrixError::Empty)?;
        Ok(DataTable {
            header_rows,
            header_cols,
            data,
        })
    }

    pub fn num_data_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn num_data_cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn num_header_rows(&self) -> usize {
        self.header_rows.len()
    }

    pub fn num_header_cols(&self) -> usize {
        self.header_cols.first().map_or(0, |h| h.len())
    }

    pub fn cell(&self, i: usize, j: usize) -> &str {
        &self.data[(i, j)]
    }

    /// Swap data rows and columns. Header rows become header columns and
    /// the other way around.
    pub fn transposed(&self) -> DataTable {
        let num_header_rows = self.num_header_rows();
        let num_header_cols = self.num_header_cols();
        let header_rows = (0..num_header_cols)
            .map(|k| {
                self.header_rows
                    .iter()
                    .map(|h| h[k].clone())
                    .chain(self.header_cols.iter().map(|labels| labels[k].clone()))
                    .collect()
            })
            .collect();
        let header_cols = (0..self.num_data_cols())
            .map(|j| {
                (0..num_header_rows)
                    .map(|r| self.header_rows[r][num_header_cols + j].clone())
                    .collect()
            })
            .collect();
        DataTable {
            header_rows,
            header_cols,
            data: self.data.t().to_owned(),
        }
    }

    pub fn write_tsv<W: Write>(&self, out: W) -> io::Result<()> {
        self.write_kept(
            out,
            &vec![true; self.num_data_rows()],
            &vec![true; self.num_data_cols()],
        )
    }

    /// Write the kept part of the table, headers included, as TSV.
    pub fn write_kept<W: Write>(
        &self,
        mut out: W,
        rows_to_keep: &[bool],
        cols_to_keep: &[bool],
    ) -> io::Result<()> {
        let num_header_cols = self.num_header_cols();
        for header in &self.header_rows {
            let mut fields: Vec<&str> = header[..num_header_cols].iter().map(String::as_str).collect();
            fields.extend(
                header[num_header_cols..]
                    .iter()
                    .zip(cols_to_keep)
                    .filter(|(_, &keep)| keep)
                    .map(|(h, _)| h.as_str()),
            );
            writeln!(out, "{}", fields.join("\t"))?;
        }
        for (i, labels) in self.header_cols.iter().enumerate() {
            if !rows_to_keep[i] {
                continue;
            }
            let mut fields: Vec<&str> = labels.iter().map(String::as_str).collect();
            fields.extend(
                (0..self.num_data_cols())
                    .filter(|&j| cols_to_keep[j])
                    .map(|j| self.cell(i, j)),
            );
            writeln!(out, "{}", fields.join("\t"))?;
        }
        Ok(())
    }
}

/// Validity view of a data matrix with eagerly computed per-row and
/// per-column NA counts.
#[derive(Debug, Clone)]
pub struct MatrixIndex {
    valid: Array2<bool>,
    invalid_in_row: Vec<usize>,
    invalid_in_col: Vec<usize>,
}

impl MatrixIndex {
    /// `valid[(i, j)]` is false where the cell is NA.
    pub fn from_validity(valid: Array2<bool>) -> MatrixIndex {
        let invalid_in_row = valid
            .rows()
            .into_iter()
            .map(|row| row.iter().filter(|&&v| !v).count())
            .collect();
        let invalid_in_col = valid
            .columns()
            .into_iter()
            .map(|col| col.iter().filter(|&&v| !v).count())
            .collect();
        MatrixIndex {
            valid,
            invalid_in_row,
            invalid_in_col,
        }
    }

    pub fn from_na_mask(na: &Array2<bool>) -> MatrixIndex {
        Self::from_validity(na.mapv(|is_na| !is_na))
    }

    pub fn from_table(table: &DataTable, na_symbol: &str) -> MatrixIndex {
        Self::from_validity(table.data.map(|cell| cell.as_str() != na_symbol))
    }

    /// Build from explicit NA flags, one slice per row.
    pub fn from_na_rows<R: AsRef<[bool]>>(rows: &[R]) -> Result<MatrixIndex, MatrixError> {
        let num_cols = match rows.first() {
            Some(r) => r.as_ref().len(),
            None => return Err(MatrixError::Empty),
        };
        if num_cols == 0 {
            return Err(MatrixError::Empty);
        }
        let mut flat = Vec::with_capacity(rows.len() * num_cols);
        for (line, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != num_cols {
                return Err(MatrixError::RaggedRow {
                    line: line + 1,
                    expected: num_cols,
                    found: row.len(),
                });
            }
            flat.extend(row.iter().map(|&is_na| !is_na));
        }
        let valid = Array2::from_shape_vec((rows.len(), num_cols), flat)
            .map_err(|_| MatrixError::Empty)?;
        Ok(Self::from_validity(valid))
    }

    pub fn num_rows(&self) -> usize {
        self.valid.nrows()
    }

    pub fn num_cols(&self) -> usize {
        self.valid.ncols()
    }

    pub fn len(&self, axis: Axis) -> usize {
        match axis {
            Axis::Row => self.num_rows(),
            Axis::Col => self.num_cols(),
        }
    }

    pub fn is_na(&self, i: usize, j: usize) -> bool {
        !self.valid[(i, j)]
    }

    pub fn is_valid(&self, i: usize, j: usize) -> bool {
        self.valid[(i, j)]
    }

    /// Validity of the cell at `primary` along `axis` and `secondary` on the
    /// other axis.
    pub fn is_valid_along(&self, axis: Axis, primary: usize, secondary: usize) -> bool {
        match axis {
            Axis::Row => self.valid[(primary, secondary)],
            Axis::Col => self.valid[(secondary, primary)],
        }
    }

    pub fn invalid_in_row(&self, i: usize) -> usize {
        self.invalid_in_row[i]
    }

    pub fn invalid_in_col(&self, j: usize) -> usize {
        self.invalid_in_col[j]
    }

    pub fn valid_in_row(&self, i: usize) -> usize {
        self.num_cols() - self.invalid_in_row[i]
    }

    pub fn valid_in_col(&self, j: usize) -> usize {
        self.num_rows() - self.invalid_in_col[j]
    }

    pub fn invalid_count(&self, axis: Axis, idx: usize) -> usize {
        match axis {
            Axis::Row => self.invalid_in_row(idx),
            Axis::Col => self.invalid_in_col(idx),
        }
    }

    pub fn valid_count(&self, axis: Axis, idx: usize) -> usize {
        match axis {
            Axis::Row => self.valid_in_row(idx),
            Axis::Col => self.valid_in_col(idx),
        }
    }

    pub fn invalid_counts(&self, axis: Axis) -> &[usize] {
        match axis {
            Axis::Row => &self.invalid_in_row,
            Axis::Col => &self.invalid_in_col,
        }
    }

    /// Positions on the other axis where `idx` is NA
    pub fn invalid_indices(&self, axis: Axis, idx: usize) -> Vec<usize> {
        (0..self.len(axis.other()))
            .filter(|&k| !self.is_valid_along(axis, idx, k))
            .collect()
    }

    pub fn num_all_valid(&self, axis: Axis) -> usize {
        self.invalid_counts(axis).iter().filter(|&&n| n == 0).count()
    }

    pub fn num_valid(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    /// Number of valid cells inside the selected rows and columns.
    pub fn valid_kept(&self, rows_to_keep: &[bool], cols_to_keep: &[bool]) -> usize {
        self.valid
            .indexed_iter()
            .filter(|&((i, j), &v)| v && rows_to_keep[i] && cols_to_keep[j])
            .count()
    }

    pub fn frac_missing(&self, axis: Axis, idx: usize) -> f64 {
        self.invalid_count(axis, idx) as f64 / self.len(axis.other()) as f64
    }

    pub fn max_frac_missing(&self, axis: Axis) -> f64 {
        (0..self.len(axis))
            .map(|k| self.frac_missing(axis, k))
            .fold(0.0, f64::max)
    }

    pub fn min_frac_missing(&self, axis: Axis) -> f64 {
        (0..self.len(axis))
            .map(|k| self.frac_missing(axis, k))
            .fold(1.0, f64::min)
    }

    /// SHA-256 of the shape and the row-major validity bits, hex encoded.
    /// Two matrices share a fingerprint only if they have the same NA layout.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.num_rows() as u64).to_le_bytes());
        hasher.update((self.num_cols() as u64).to_le_bytes());
        for row in self.valid.rows() {
            let cells = row.to_vec();
            let packed: Vec<u8> = cells
                .chunks(8)
                .map(|chunk| {
                    chunk
                        .iter()
                        .enumerate()
                        .fold(0u8, |byte, (k, &v)| byte | ((v as u8) << k))
                })
                .collect();
            hasher.update(&packed);
        }
        hex::encode(hasher.finalize())
    }

    pub fn transposed(&self) -> MatrixIndex {
        MatrixIndex {
            valid: self.valid.t().to_owned(),
            invalid_in_row: self.invalid_in_col.clone(),
            invalid_in_col: self.invalid_in_row.clone(),
        }
    }

    /// `missing count -> number of rows (or cols) with that count`
    pub fn missing_histogram(&self, axis: Axis) -> BTreeMap<usize, usize> {
        let mut histogram = BTreeMap::new();
        for &n in self.invalid_counts(axis) {
            *histogram.entry(n).or_insert(0) += 1;
        }
        histogram
    }
}

impl Index<(usize, usize)> for MatrixIndex {
    type Output = bool;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.valid[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_lines() -> Vec<String> {
        vec![
            "id\tc0\tc1\tc2".to_string(),
            "r0\t1\tNA\t3".to_string(),
            "r1\t4\t5\t6".to_string(),
            "r2\tNA\tNA\t9".to_string(),
        ]
    }

    #[test]
    fn test_read_table() {
        let table = DataTable::from_lines(&sample_lines(), 1, 1).unwrap();
        assert_eq!(table.num_data_rows(), 3);
        assert_eq!(table.num_data_cols(), 3);
        assert_eq!(table.num_header_rows(), 1);
        assert_eq!(table.num_header_cols(), 1);
        assert_eq!(table.cell(2, 2), "9");
    }

    #[test]
    fn test_ragged_row_is_rejected() {
        let mut lines = sample_lines();
        lines.push("r3\t1\t2".to_string());
        match DataTable::from_lines(&lines, 1, 1) {
            Err(MatrixError::RaggedRow { line, expected, found }) => {
                assert_eq!((line, expected, found), (5, 4, 3));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_header_too_large() {
        assert!(matches!(
            DataTable::from_lines(&sample_lines(), 4, 1),
            Err(MatrixError::HeaderTooLarge { .. })
        ));
        assert!(matches!(
            DataTable::from_lines::<String>(&[], 1, 1),
            Err(MatrixError::Empty)
        ));
    }

    #[test]
    fn test_counts() {
        let table = DataTable::from_lines(&sample_lines(), 1, 1).unwrap();
        let m = MatrixIndex::from_table(&table, "NA");
        assert_eq!(m.invalid_in_row(0), 1);
        assert_eq!(m.invalid_in_row(1), 0);
        assert_eq!(m.invalid_in_row(2), 2);
        assert_eq!(m.invalid_in_col(0), 1);
        assert_eq!(m.invalid_in_col(1), 2);
        assert_eq!(m.invalid_in_col(2), 0);
        assert_eq!(m.num_valid(), 6);
        assert_eq!(m.num_all_valid(Axis::Row), 1);
        assert_eq!(m.num_all_valid(Axis::Col), 1);
        assert_eq!(m.invalid_indices(Axis::Row, 2), vec![0, 1]);
        assert_eq!(m.invalid_indices(Axis::Col, 1), vec![0, 2]);
        assert!(!m[(0, 1)]);
        assert!(m.is_na(2, 0));

        for i in 0..m.num_rows() {
            assert_eq!(m.invalid_in_row(i) + m.valid_in_row(i), m.num_cols());
        }
        for j in 0..m.num_cols() {
            assert_eq!(m.invalid_in_col(j) + m.valid_in_col(j), m.num_rows());
        }
    }

    #[test]
    fn test_along_axis_is_transposed() {
        let m = MatrixIndex::from_na_rows(&[vec![false, true], vec![false, false]]).unwrap();
        assert!(!m.is_valid_along(Axis::Row, 0, 1));
        assert!(!m.is_valid_along(Axis::Col, 1, 0));
        assert!(m.is_valid_along(Axis::Col, 0, 1));
        assert_eq!(m.valid_count(Axis::Col, 1), 1);
        assert_eq!(m.missing_histogram(Axis::Row).get(&1), Some(&1));
    }

    #[test]
    fn test_valid_kept_and_fractions() {
        let m = MatrixIndex::from_na_rows(&[
            vec![true, false, false, false],
            vec![false, false, false, false],
        ])
        .unwrap();
        assert_eq!(m.valid_kept(&[true, true], &[false, true, true, true]), 6);
        assert_eq!(m.valid_kept(&[true, false], &[true, true, true, true]), 3);
        assert!((m.frac_missing(Axis::Row, 0) - 0.25).abs() < 1e-12);
        assert!((m.max_frac_missing(Axis::Col) - 0.5).abs() < 1e-12);
        assert_eq!(m.min_frac_missing(Axis::Row), 0.0);
    }

    #[test]
    fn test_ragged_na_rows() {
        assert!(matches!(
            MatrixIndex::from_na_rows(&[vec![true], vec![true, false]]),
            Err(MatrixError::RaggedRow { .. })
        ));
    }

    #[test]
    fn test_transpose_table() {
        let table = DataTable::from_lines(&sample_lines(), 1, 1).unwrap();
        let t = table.transposed();
        assert_eq!((t.num_data_rows(), t.num_data_cols()), (3, 3));
        assert_eq!(t.cell(0, 2), "NA");
        assert_eq!(t.cell(2, 1), "6");

        let mut out = Vec::new();
        t.write_tsv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "id\tr0\tr1\tr2\nc0\t1\t4\tNA\nc1\tNA\t5\tNA\nc2\t3\t6\t9\n"
        );

        let mut once = Vec::new();
        table.write_tsv(&mut once).unwrap();
        let mut twice = Vec::new();
        t.transposed().write_tsv(&mut twice).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_transpose_uneven_headers() {
        let lines = ["a\tb\tc\td", "e\tf\tg\th", "x\ty\t1\tNA"];
        let table = DataTable::from_lines(&lines, 2, 2).unwrap();
        let t = table.transposed();
        assert_eq!((t.num_header_rows(), t.num_header_cols()), (2, 2));
        assert_eq!((t.num_data_rows(), t.num_data_cols()), (2, 1));

        let mut out = Vec::new();
        t.write_tsv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "a\te\tx\nb\tf\ty\nc\tg\t1\nd\th\tNA\n"
        );

        let m = MatrixIndex::from_table(&table, "NA");
        let mt = MatrixIndex::from_table(&t, "NA");
        assert_eq!(mt.fingerprint(), m.transposed().fingerprint());
        assert_eq!(mt.invalid_in_row(1), 1);
    }

    #[test]
    fn test_fingerprint_tracks_na_layout() {
        let a = MatrixIndex::from_na_rows(&[vec![true, false], vec![false, true]]).unwrap();
        let b = MatrixIndex::from_na_rows(&[vec![false, true], vec![true, false]]).unwrap();
        let a2 = MatrixIndex::from_na_rows(&[vec![true, false], vec![false, true]]).unwrap();
        assert_eq!(a.fingerprint(), a2.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
        assert_ne!(a.fingerprint(), b.fingerprint());

        // Same cells, different shape
        let row = MatrixIndex::from_na_rows(&[vec![false, false, false, false]]).unwrap();
        let col = MatrixIndex::from_na_rows(&[vec![false, false], vec![false, false]]).unwrap();
        assert_ne!(row.fingerprint(), col.fingerprint());
    }

    #[test]
    fn test_write_kept() {
        let table = DataTable::from_lines(&sample_lines(), 1, 1).unwrap();
        let mut out = Vec::new();
        table
            .write_kept(&mut out, &[false, true, true], &[false, false, true])
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "id\tc2\nr1\t6\nr2\t9\n");
    }
}
