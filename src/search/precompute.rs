//! # Phase 1: Pair Table Construction
//!
//! Partitions rows and columns into forced and free, then builds both pair
//! tables with the lines strided over `world_size` ranks. Each rank writes
//! its own shard; once every rank is done the shards are merged into the
//! two table files. The matrix fingerprint is written last and marks the
//! tables as complete.

/**
 * File: /src/search/precompute.rs
 * Created Date: Thursday, October 16th 2025
 * Author: Zihan
 * -----
 * Last Modified: Friday, 17th October 2025 10:58:37 am
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-18		Zihan	Reuse only tables built from the same matrix
 * 2025-10-17		Zihan	Reuse tables from a previous run
 * 2025-10-16		Zihan	Strided shard build over rayon ranks
 */

use crate::matrix::{Axis, MatrixIndex};
use crate::pairs::PairCompatibilityTable;
use crate::scratch::ScratchDir;
use crate::search::partition::Partition;
use crate::search::types::SearchError;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::time::Instant;

/// Build the partition and both pair tables into `scratch`.
pub fn run_precompute(
    matrix: &MatrixIndex,
    scratch: &ScratchDir,
    world_size: usize,
) -> Result<Partition, SearchError> {
    let start = Instant::now();
    let world_size = world_size.max(1);
    let partition = Partition::from_matrix(matrix);
    info!(
        "Partition: {} forced / {} free rows, {} forced / {} free cols",
        partition.num_forced(Axis::Row),
        partition.num_free(Axis::Row),
        partition.num_forced(Axis::Col),
        partition.num_free(Axis::Col)
    );
    scratch.clear_fingerprint()?;
    scratch.write_partition(&partition)?;

    for axis in [Axis::Row, Axis::Col] {
        let free = partition.free(axis);
        let other_free = partition.free(axis.other());
        (0..world_size).into_par_iter().try_for_each(|rank| {
            let lines =
                PairCompatibilityTable::build_stride(matrix, axis, free, other_free, rank, world_size);
            debug!("Rank {} built {} {} lines", rank, lines.len(), axis);
            scratch.write_shard(axis, rank, &lines)
        })?;
        scratch.merge_shards(axis, free.len(), world_size)?;
    }

    scratch.write_fingerprint(&matrix.fingerprint())?;
    info!(
        "Pair tables built by {} ranks in {:?}",
        world_size,
        start.elapsed()
    );
    Ok(partition)
}

/// The partition stored in `scratch`, if it and both tables were built from
/// `matrix`.
pub fn load_current(matrix: &MatrixIndex, scratch: &ScratchDir) -> Option<Partition> {
    if !scratch.has_pairs() {
        return None;
    }
    let loaded = scratch.verify_fingerprint(matrix).and_then(|_| {
        let partition = scratch.read_partition()?;
        let rows = scratch.read_pairs(Axis::Row)?;
        let cols = scratch.read_pairs(Axis::Col)?;
        Ok((partition, rows.len(), cols.len()))
    });
    match loaded {
        Ok((partition, rows, cols))
            if partition.matches(matrix)
                && rows == partition.num_free(Axis::Row)
                && cols == partition.num_free(Axis::Col) =>
        {
            Some(partition)
        }
        Ok(_) => {
            warn!("Scratch state in {} belongs to another matrix", scratch.root().display());
            None
        }
        Err(e) => {
            warn!("Ignoring scratch state: {}", e);
            None
        }
    }
}

/// Reuse the tables in `scratch` when `resume` is set and they fit, build
/// them otherwise. The flag tells whether they were reused.
pub fn ensure_precomputed(
    matrix: &MatrixIndex,
    scratch: &ScratchDir,
    world_size: usize,
    resume: bool,
) -> Result<(Partition, bool), SearchError> {
    if resume {
        if let Some(partition) = load_current(matrix, scratch) {
            info!("Reusing pair tables from {}", scratch.root().display());
            return Ok((partition, true));
        }
    }
    Ok((run_precompute(matrix, scratch, world_size)?, false))
}
