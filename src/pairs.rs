//! Pairwise compatibility counts.
//!
//! For two free members `a < b` of one axis, `count(a, b)` is the number of
//! free members of the other axis in which both are valid. The table is
//! triangular: line `a` stores `count(a, a+1), count(a, a+2), ...`.

/**
 * File: /src/pairs.rs
 * Created Date: Thursday, October 16th 2025
 * Author: Zihan
 * -----
 * Last Modified: Thursday, 16th October 2025 11:40:02 am
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-16		Zihan	Pairwise compatibility counts for free rows / free cols
**/

use std::error::Error;
use std::fmt;
use std::io::{self, BufRead, Write};

use rayon::prelude::*;

use crate::matrix::{Axis, MatrixIndex};

const FORMAT_TAG: &str = "nomiss-pairs";
const FORMAT_VERSION: &str = "v1";

#[derive(Debug)]
pub enum PairTableError {
    Io(io::Error),
    Header(String),
    Line { line: usize, reason: String },
}

impl fmt::Display for PairTableError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PairTableError::Io(e) => write!(f, "I/O error: {}", e),
            PairTableError::Header(msg) => write!(f, "Bad pair table header: {}", msg),
            PairTableError::Line { line, reason } => {
                write!(f, "Bad pair table line {}: {}", line, reason)
            }
        }
    }
}

impl Error for PairTableError {}

impl From<io::Error> for PairTableError {
    fn from(e: io::Error) -> Self {
        PairTableError::Io(e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairCompatibilityTable {
    axis: Axis,
    len: usize,
    values: Vec<Vec<u32>>,
}

impl PairCompatibilityTable {
    /// Count, for every pair of `free` members along `axis`, the members of
    /// `other_free` in which both are valid.
    pub fn build(matrix: &MatrixIndex, axis: Axis, free: &[usize], other_free: &[usize]) -> Self {
        let values = (0..free.len().saturating_sub(1))
            .into_par_iter()
            .map(|a| Self::line_counts(matrix, axis, free, other_free, a))
            .collect();
        Self {
            axis,
            len: free.len(),
            values,
        }
    }

    /// The lines owned by `rank` when work is strided over `world_size`
    /// participants: `rank, rank + world_size, ...`.
    pub fn build_stride(
        matrix: &MatrixIndex,
        axis: Axis,
        free: &[usize],
        other_free: &[usize],
        rank: usize,
        world_size: usize,
    ) -> Vec<Vec<u32>> {
        (rank..free.len().saturating_sub(1))
            .step_by(world_size.max(1))
            .map(|a| Self::line_counts(matrix, axis, free, other_free, a))
            .collect()
    }

    /// Counts for line `a` against every `b > a`.
    ///
    /// The valid positions of `free[a]` are collected once; each `b` then only
    /// loses count for its NA cells inside that set.
    pub fn line_counts(
        matrix: &MatrixIndex,
        axis: Axis,
        free: &[usize],
        other_free: &[usize],
        a: usize,
    ) -> Vec<u32> {
        let first = free[a];
        let shared: Vec<usize> = other_free
            .iter()
            .copied()
            .filter(|&k| matrix.is_valid_along(axis, first, k))
            .collect();

        free[a + 1..]
            .iter()
            .map(|&second| {
                let missing = shared
                    .iter()
                    .filter(|&&k| !matrix.is_valid_along(axis, second, k))
                    .count();
                (shared.len() - missing) as u32
            })
            .collect()
    }

    /// Rebuild the counts considering only the members of `other_free` whose
    /// `other_valid` flag is still set.
    pub fn recalculate(
        matrix: &MatrixIndex,
        axis: Axis,
        free: &[usize],
        other_free: &[usize],
        other_valid: &[bool],
    ) -> Self {
        let narrowed: Vec<usize> = other_free
            .iter()
            .zip(other_valid)
            .filter(|(_, &v)| v)
            .map(|(&k, _)| k)
            .collect();
        Self::build(matrix, axis, free, &narrowed)
    }

    /// Assemble a table from its lines, `lines[a]` holding `len - 1 - a` counts.
    pub fn from_lines(axis: Axis, len: usize, values: Vec<Vec<u32>>) -> Result<Self, PairTableError> {
        let expected_lines = len.saturating_sub(1);
        if values.len() != expected_lines {
            return Err(PairTableError::Header(format!(
                "expected {} lines for {} members, found {}",
                expected_lines,
                len,
                values.len()
            )));
        }
        for (a, line) in values.iter().enumerate() {
            if line.len() != len - 1 - a {
                return Err(PairTableError::Line {
                    line: a + 2,
                    reason: format!("expected {} counts, found {}", len - 1 - a, line.len()),
                });
            }
        }
        Ok(Self { axis, len, values })
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Number of free members the table covers
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn count(&self, a: usize, b: usize) -> u32 {
        assert!(a != b, "no self pair for {}", a);
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        self.values[lo][hi - lo - 1]
    }

    /// Visit every other index still marked valid together with its count.
    fn for_each_partner<F: FnMut(usize, u32)>(&self, idx: usize, valid: &[bool], mut f: F) {
        for i in 0..idx {
            if valid[i] {
                f(i, self.values[i][idx - i - 1]);
            }
        }
        if let Some(line) = self.values.get(idx) {
            for (offset, &c) in line.iter().enumerate() {
                let j = idx + 1 + offset;
                if valid[j] {
                    f(j, c);
                }
            }
        }
    }

    /// Number of valid partners of `idx` whose count is at least `threshold`.
    /// Zero when `idx` itself is no longer valid.
    pub fn num_pairs_gte(&self, idx: usize, threshold: usize, valid: &[bool]) -> usize {
        if !valid[idx] {
            return 0;
        }
        let mut n = 0;
        self.for_each_partner(idx, valid, |_, c| {
            if c as usize >= threshold {
                n += 1;
            }
        });
        n
    }

    /// Valid partners of `idx` whose count is below `threshold`.
    pub fn pairs_lt(&self, idx: usize, threshold: usize, valid: &[bool]) -> Vec<usize> {
        let mut pairs = Vec::new();
        self.for_each_partner(idx, valid, |j, c| {
            if (c as usize) < threshold {
                pairs.push(j);
            }
        });
        pairs
    }

    pub fn header_line(axis: Axis, len: usize) -> String {
        format!("{} {} {} {}", FORMAT_TAG, FORMAT_VERSION, axis, len)
    }

    pub fn write_line<W: Write>(out: &mut W, counts: &[u32]) -> io::Result<()> {
        let fields: Vec<String> = counts.iter().map(|c| c.to_string()).collect();
        writeln!(out, "{}", fields.join(","))
    }

    pub fn parse_line(text: &str, line: usize) -> Result<Vec<u32>, PairTableError> {
        text.trim_end()
            .split(',')
            .map(|field| {
                field.parse::<u32>().map_err(|e| PairTableError::Line {
                    line,
                    reason: format!("{:?}: {}", field, e),
                })
            })
            .collect()
    }

    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "{}", Self::header_line(self.axis, self.len))?;
        for line in &self.values {
            Self::write_line(&mut out, line)?;
        }
        out.flush()
    }

    pub fn read_from<R: BufRead>(input: R) -> Result<Self, PairTableError> {
        let mut lines = input.lines();
        let header = lines
            .next()
            .ok_or_else(|| PairTableError::Header("empty file".to_string()))??;
        let fields: Vec<&str> = header.split_whitespace().collect();
        let (axis, len) = match fields.as_slice() {
            [tag, version, axis, len] if *tag == FORMAT_TAG => {
                if *version != FORMAT_VERSION {
                    return Err(PairTableError::Header(format!(
                        "unsupported version {}",
                        version
                    )));
                }
                let axis = Axis::from_name(axis)
                    .ok_or_else(|| PairTableError::Header(format!("unknown axis {}", axis)))?;
                let len = len
                    .parse::<usize>()
                    .map_err(|e| PairTableError::Header(format!("bad length: {}", e)))?;
                (axis, len)
            }
            _ => return Err(PairTableError::Header(header.clone())),
        };

        let mut values = Vec::with_capacity(len.saturating_sub(1));
        for (n, text) in lines.enumerate() {
            values.push(Self::parse_line(&text?, n + 2)?);
        }
        Self::from_lines(axis, len, values)
    }
}
