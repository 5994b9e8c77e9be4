//! # Scratch Directory
//!
//! Everything the two phases exchange on disk: the forced/free id lists, the
//! pair tables (whole and as per-rank shards) and the incumbent checkpoint.
//!
//! Files:
//! - `forced_rows.txt`, `free_rows.txt`, `forced_cols.txt`, `free_cols.txt`:
//!   one global index per line
//! - `row_pairs.csv`, `col_pairs.csv`: pair tables, versioned header
//! - `row_pairs_part<k>.csv`, `col_pairs_part<k>.csv`: lines written by rank `k`
//! - `matrix.fp`: fingerprint of the matrix the tables were built from
//! - `incumbent.sol`: best solution so far

/**
 * File: /src/scratch.rs
 * Created Date: Thursday, October 16th 2025
 * Author: Zihan
 * -----
 * Last Modified: Friday, 17th October 2025 10:26:51 am
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-18		Zihan	Matrix fingerprint guards reuse of the tables
 * 2025-10-17		Zihan	Atomic incumbent checkpoint
 * 2025-10-16		Zihan	Id lists, pair tables and shard merge
 */

use crate::matrix::{Axis, MatrixIndex};
use crate::pairs::{PairCompatibilityTable, PairTableError};
use crate::search::incumbent::Incumbent;
use crate::search::partition::{AxisPartition, Partition};
use crate::util::{bits_to_mask, mask_to_bits};
use log::{debug, info};
use std::error::Error;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const CHECKPOINT_TAG: &str = "nomiss-incumbent";
const CHECKPOINT_VERSION: &str = "v1";
const CHECKPOINT_FILE: &str = "incumbent.sol";
const FINGERPRINT_TAG: &str = "nomiss-matrix";
const FINGERPRINT_VERSION: &str = "v1";
const FINGERPRINT_FILE: &str = "matrix.fp";

#[derive(Debug)]
pub enum ScratchError {
    Io {
        path: PathBuf,
        source: io::Error,
    },
    /// File exists but its content cannot be used
    Corrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    Version {
        path: PathBuf,
        found: String,
    },
}

impl fmt::Display for ScratchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScratchError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            ScratchError::Corrupt { path, line, reason } => {
                write!(f, "{} line {}: {}", path.display(), line, reason)
            }
            ScratchError::Version { path, found } => {
                write!(f, "{}: unsupported format {:?}", path.display(), found)
            }
        }
    }
}

impl Error for ScratchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ScratchError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ScratchError + '_ {
    move |source| ScratchError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn corrupt(path: &Path, line: usize, reason: impl Into<String>) -> ScratchError {
    ScratchError::Corrupt {
        path: path.to_path_buf(),
        line,
        reason: reason.into(),
    }
}

fn from_pair_error(path: &Path, e: PairTableError) -> ScratchError {
    match e {
        PairTableError::Io(source) => ScratchError::Io {
            path: path.to_path_buf(),
            source,
        },
        PairTableError::Header(reason) => corrupt(path, 1, reason),
        PairTableError::Line { line, reason } => corrupt(path, line, reason),
    }
}

/// Handle on the scratch directory shared by both phases
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self, ScratchError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(io_error(&root))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn ids_file(kind: &str, axis: Axis) -> String {
        format!("{}_{}s.txt", kind, axis)
    }

    pub fn pairs_file(axis: Axis) -> String {
        format!("{}_pairs.csv", axis)
    }

    pub fn shard_file(axis: Axis, rank: usize) -> String {
        format!("{}_pairs_part{}.csv", axis, rank)
    }

    // ------------------------------------------------------------------
    // Id lists
    // ------------------------------------------------------------------

    pub fn write_ids(&self, name: &str, ids: &[usize]) -> Result<(), ScratchError> {
        let path = self.path(name);
        let file = File::create(&path).map_err(io_error(&path))?;
        let mut out = BufWriter::new(file);
        for id in ids {
            writeln!(out, "{}", id).map_err(io_error(&path))?;
        }
        out.flush().map_err(io_error(&path))
    }

    pub fn read_ids(&self, name: &str) -> Result<Vec<usize>, ScratchError> {
        let path = self.path(name);
        let file = File::open(&path).map_err(io_error(&path))?;
        let mut ids = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(io_error(&path))?;
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            let id = text
                .parse::<usize>()
                .map_err(|e| corrupt(&path, n + 1, format!("{:?}: {}", text, e)))?;
            ids.push(id);
        }
        Ok(ids)
    }

    pub fn write_partition(&self, partition: &Partition) -> Result<(), ScratchError> {
        for axis in [Axis::Row, Axis::Col] {
            self.write_ids(&Self::ids_file("forced", axis), partition.forced(axis))?;
            self.write_ids(&Self::ids_file("free", axis), partition.free(axis))?;
        }
        Ok(())
    }

    pub fn read_partition(&self) -> Result<Partition, ScratchError> {
        let read_axis = |axis: Axis| -> Result<AxisPartition, ScratchError> {
            Ok(AxisPartition {
                forced: self.read_ids(&Self::ids_file("forced", axis))?,
                free: self.read_ids(&Self::ids_file("free", axis))?,
            })
        };
        Ok(Partition::from_parts(read_axis(Axis::Row)?, read_axis(Axis::Col)?))
    }

    // ------------------------------------------------------------------
    // Pair tables
    // ------------------------------------------------------------------

    pub fn has_pairs(&self) -> bool {
        [Axis::Row, Axis::Col]
            .iter()
            .all(|&axis| self.path(&Self::pairs_file(axis)).is_file())
    }

    pub fn write_pairs(&self, table: &PairCompatibilityTable) -> Result<(), ScratchError> {
        let path = self.path(&Self::pairs_file(table.axis()));
        let file = File::create(&path).map_err(io_error(&path))?;
        table.write_to(BufWriter::new(file)).map_err(io_error(&path))
    }

    pub fn read_pairs(&self, axis: Axis) -> Result<PairCompatibilityTable, ScratchError> {
        let path = self.path(&Self::pairs_file(axis));
        let file = File::open(&path).map_err(io_error(&path))?;
        let table = PairCompatibilityTable::read_from(BufReader::new(file))
            .map_err(|e| from_pair_error(&path, e))?;
        if table.axis() != axis {
            return Err(corrupt(&path, 1, format!("holds {} pairs", table.axis())));
        }
        Ok(table)
    }

    /// Lines `rank, rank + world_size, ...` of one table, no header
    pub fn write_shard(&self, axis: Axis, rank: usize, lines: &[Vec<u32>]) -> Result<(), ScratchError> {
        let path = self.path(&Self::shard_file(axis, rank));
        let file = File::create(&path).map_err(io_error(&path))?;
        let mut out = BufWriter::new(file);
        for line in lines {
            PairCompatibilityTable::write_line(&mut out, line).map_err(io_error(&path))?;
        }
        out.flush().map_err(io_error(&path))
    }

    fn read_shard(&self, axis: Axis, rank: usize) -> Result<Vec<Vec<u32>>, ScratchError> {
        let path = self.path(&Self::shard_file(axis, rank));
        let file = File::open(&path).map_err(io_error(&path))?;
        let mut lines = Vec::new();
        for (n, text) in BufReader::new(file).lines().enumerate() {
            let text = text.map_err(io_error(&path))?;
            let counts = PairCompatibilityTable::parse_line(&text, n + 1)
                .map_err(|e| from_pair_error(&path, e))?;
            lines.push(counts);
        }
        Ok(lines)
    }

    /// Interleave the shards of `world_size` ranks back into line order,
    /// write the whole table and delete the shards.
    pub fn merge_shards(
        &self,
        axis: Axis,
        len: usize,
        world_size: usize,
    ) -> Result<PairCompatibilityTable, ScratchError> {
        let world_size = world_size.max(1);
        let mut shards = Vec::with_capacity(world_size);
        for rank in 0..world_size {
            shards.push(self.read_shard(axis, rank)?.into_iter());
        }

        let num_lines = len.saturating_sub(1);
        let mut values = Vec::with_capacity(num_lines);
        for a in 0..num_lines {
            let rank = a % world_size;
            let line = shards[rank].next().ok_or_else(|| {
                corrupt(
                    &self.path(&Self::shard_file(axis, rank)),
                    a / world_size + 1,
                    "shard ends early",
                )
            })?;
            values.push(line);
        }
        for (rank, rest) in shards.iter_mut().enumerate() {
            if rest.next().is_some() {
                return Err(corrupt(
                    &self.path(&Self::shard_file(axis, rank)),
                    0,
                    "shard has extra lines",
                ));
            }
        }

        let path = self.path(&Self::pairs_file(axis));
        let table = PairCompatibilityTable::from_lines(axis, len, values)
            .map_err(|e| from_pair_error(&path, e))?;
        self.write_pairs(&table)?;

        for rank in 0..world_size {
            let shard = self.path(&Self::shard_file(axis, rank));
            fs::remove_file(&shard).map_err(io_error(&shard))?;
        }
        debug!("Merged {} {} shards into {}", world_size, axis, path.display());
        Ok(table)
    }

    // ------------------------------------------------------------------
    // Matrix fingerprint
    // ------------------------------------------------------------------

    pub fn fingerprint_path(&self) -> PathBuf {
        self.path(FINGERPRINT_FILE)
    }

    pub fn write_fingerprint(&self, fingerprint: &str) -> Result<(), ScratchError> {
        let path = self.fingerprint_path();
        let text = format!("{} {} {}\n", FINGERPRINT_TAG, FINGERPRINT_VERSION, fingerprint);
        fs::write(&path, text).map_err(io_error(&path))
    }

    /// Removed before the tables are rebuilt, so an interrupted build is
    /// never taken for a finished one.
    pub fn clear_fingerprint(&self) -> Result<(), ScratchError> {
        let path = self.fingerprint_path();
        match fs::remove_file(&path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(io_error(&path)(e)),
            _ => Ok(()),
        }
    }

    /// `Ok(None)` when no fingerprint has been written
    pub fn read_fingerprint(&self) -> Result<Option<String>, ScratchError> {
        let path = self.fingerprint_path();
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path).map_err(io_error(&path))?;
        let fields: Vec<&str> = text.split_whitespace().collect();
        match fields.as_slice() {
            [tag, version, fingerprint] if *tag == FINGERPRINT_TAG && *version == FINGERPRINT_VERSION => {
                Ok(Some(fingerprint.to_string()))
            }
            _ => Err(ScratchError::Version {
                path,
                found: text.lines().next().unwrap_or("").to_string(),
            }),
        }
    }

    /// Fails unless the stored fingerprint is the one of `matrix`.
    pub fn verify_fingerprint(&self, matrix: &MatrixIndex) -> Result<(), ScratchError> {
        let path = self.fingerprint_path();
        match self.read_fingerprint()? {
            Some(stored) if stored == matrix.fingerprint() => Ok(()),
            Some(_) => Err(corrupt(&path, 1, "tables were built from another matrix")),
            None => Err(corrupt(&path, 0, "no matrix fingerprint")),
        }
    }

    // ------------------------------------------------------------------
    // Incumbent checkpoint
    // ------------------------------------------------------------------

    pub fn checkpoint_path(&self) -> PathBuf {
        self.path(CHECKPOINT_FILE)
    }

    /// Write to a temporary file, then rename over the previous checkpoint.
    pub fn write_incumbent(&self, incumbent: &Incumbent) -> Result<(), ScratchError> {
        let path = self.checkpoint_path();
        let tmp = self.path(&format!("{}.tmp", CHECKPOINT_FILE));
        {
            let file = File::create(&tmp).map_err(io_error(&tmp))?;
            let mut out = BufWriter::new(file);
            let write = |out: &mut BufWriter<File>| -> io::Result<()> {
                writeln!(out, "{} {}", CHECKPOINT_TAG, CHECKPOINT_VERSION)?;
                writeln!(
                    out,
                    "{} {} {}",
                    incumbent.rows_to_keep().len(),
                    incumbent.cols_to_keep().len(),
                    incumbent.num_elements()
                )?;
                writeln!(out, "{}", mask_to_bits(incumbent.rows_to_keep()))?;
                writeln!(out, "{}", mask_to_bits(incumbent.cols_to_keep()))?;
                out.flush()?;
                out.get_ref().sync_all()
            };
            write(&mut out).map_err(io_error(&tmp))?;
        }
        fs::rename(&tmp, &path).map_err(io_error(&path))
    }

    /// `Ok(None)` when no checkpoint has been written yet
    pub fn read_incumbent(&self) -> Result<Option<Incumbent>, ScratchError> {
        let path = self.checkpoint_path();
        if !path.is_file() {
            return Ok(None);
        }
        let file = File::open(&path).map_err(io_error(&path))?;
        let lines: Vec<String> = BufReader::new(file)
            .lines()
            .collect::<io::Result<_>>()
            .map_err(io_error(&path))?;

        let header = lines.first().map(String::as_str).unwrap_or("");
        if header != format!("{} {}", CHECKPOINT_TAG, CHECKPOINT_VERSION) {
            return Err(ScratchError::Version {
                path,
                found: header.to_string(),
            });
        }
        if lines.len() < 4 {
            return Err(corrupt(&path, lines.len() + 1, "truncated checkpoint"));
        }

        let dims: Vec<usize> = lines[1]
            .split_whitespace()
            .map(|f| f.parse::<usize>())
            .collect::<Result<_, _>>()
            .map_err(|e| corrupt(&path, 2, e.to_string()))?;
        let (num_rows, num_cols, num_elements) = match dims.as_slice() {
            [r, c, e] => (*r, *c, *e),
            _ => return Err(corrupt(&path, 2, "expected <rows> <cols> <num_elements>")),
        };

        let rows = bits_to_mask(lines[2].trim()).ok_or_else(|| corrupt(&path, 3, "bad row mask"))?;
        let cols = bits_to_mask(lines[3].trim()).ok_or_else(|| corrupt(&path, 4, "bad column mask"))?;
        if rows.len() != num_rows || cols.len() != num_cols {
            return Err(corrupt(&path, 3, "mask lengths disagree with header"));
        }

        let incumbent = Incumbent::new(rows, cols);
        if incumbent.num_elements() != num_elements {
            return Err(corrupt(
                &path,
                2,
                format!(
                    "header says {} elements, masks give {}",
                    num_elements,
                    incumbent.num_elements()
                ),
            ));
        }
        info!(
            "Loaded checkpoint {} with {} elements",
            path.display(),
            num_elements
        );
        Ok(Some(incumbent))
    }
}
