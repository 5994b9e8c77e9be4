//! # Search Pipeline
//!
//! Phase 2 driver: loads the scratch state written by phase 1, seeds the
//! incumbent, then walks the candidate row counts, pruning each on the
//! coordinator and handing the survivors to the worker pool.
//!
//! ## Example
//!
//! ```no_run
//! use nomiss::matrix::MatrixIndex;
//! use nomiss::scratch::ScratchDir;
//! use nomiss::search::{BranchAndBoundSolver, SearchPipeline};
//!
//! let matrix = MatrixIndex::from_na_rows(&[vec![true, false], vec![false, false]]).unwrap();
//! let scratch = ScratchDir::create("scratch").unwrap();
//! let pipeline = SearchPipeline::builder().num_workers(2).build();
//! let outcome = pipeline.run(&matrix, &scratch, &BranchAndBoundSolver::new()).unwrap();
//! println!("kept {} elements", outcome.incumbent.num_elements());
//! ```

/**
 * File: /src/search/pipeline.rs
 * Created Date: Thursday, October 16th 2025
 * Author: Zihan
 * -----
 * Last Modified: Friday, 17th October 2025 4:31:56 pm
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-17		Zihan	Resume from checkpoint, join workers explicitly
 * 2025-10-16		Zihan	Phase 2 driver over scoped worker threads
 */

use crate::greedy::AddRowGreedy;
use crate::matrix::{Axis, MatrixIndex};
use crate::scratch::{ScratchDir, ScratchError};
use crate::search::coordinator::Coordinator;
use crate::search::incumbent::Incumbent;
use crate::search::partition::Partition;
use crate::search::precompute::ensure_precomputed;
use crate::search::protocol::channel_pool;
use crate::search::pruning::PruningEngine;
use crate::search::scheduler::{CandidateDecision, CandidateScheduler};
use crate::search::solver::ExactSolver;
use crate::search::types::{ProtocolStats, PruneOutcome, SearchError, SearchStats};
use crate::search::worker::{Worker, WorkerOptions};
use log::{debug, info, warn};
use std::thread;
use std::time::Instant;

/// Configuration for a search run
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub num_workers: usize,
    /// Reuse scratch tables and resume from the checkpoint
    pub resume: bool,
    pub worker: WorkerOptions,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            num_workers: 1,
            resume: true,
            worker: WorkerOptions::default(),
        }
    }
}

/// Result of a search run
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub incumbent: Incumbent,
    pub stats: SearchStats,
}

pub struct SearchPipeline {
    options: SearchOptions,
}

impl SearchPipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn new(options: SearchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Phase 1 (unless reusable state is found) followed by phase 2.
    pub fn run<S: ExactSolver + ?Sized>(
        &self,
        matrix: &MatrixIndex,
        scratch: &ScratchDir,
        solver: &S,
    ) -> Result<SearchOutcome, SearchError> {
        let start = Instant::now();
        info!(
            "Starting search on {}x{} matrix with {} workers",
            matrix.num_rows(),
            matrix.num_cols(),
            self.options.num_workers
        );

        let precompute_start = Instant::now();
        let world_size = self.options.num_workers + 1;
        let (_, reused) = ensure_precomputed(matrix, scratch, world_size, self.options.resume)?;
        let precompute_ms = precompute_start.elapsed().as_millis() as u64;
        // Fresh tables invalidate any older checkpoint
        let resume = self.options.resume && reused;

        let mut outcome = self.search_inner(matrix, scratch, solver, resume)?;
        outcome.stats.phase_times.precompute_ms = precompute_ms;
        outcome.stats.phase_times.total_ms = start.elapsed().as_millis() as u64;
        info!(
            "Search completed in {:?}: {} rows x {} cols = {} elements",
            start.elapsed(),
            outcome.incumbent.num_rows(),
            outcome.incumbent.num_cols(),
            outcome.incumbent.num_elements()
        );
        Ok(outcome)
    }

    /// Phase 2 only, against state phase 1 already left in `scratch`.
    pub fn search<S: ExactSolver + ?Sized>(
        &self,
        matrix: &MatrixIndex,
        scratch: &ScratchDir,
        solver: &S,
    ) -> Result<SearchOutcome, SearchError> {
        self.search_inner(matrix, scratch, solver, self.options.resume)
    }

    fn search_inner<S: ExactSolver + ?Sized>(
        &self,
        matrix: &MatrixIndex,
        scratch: &ScratchDir,
        solver: &S,
        resume: bool,
    ) -> Result<SearchOutcome, SearchError> {
        let search_start = Instant::now();
        scratch.verify_fingerprint(matrix)?;
        let partition = scratch.read_partition()?;
        if !partition.matches(matrix) {
            return Err(ScratchError::Corrupt {
                path: scratch.path(&ScratchDir::ids_file("free", Axis::Row)),
                line: 0,
                reason: "partition does not match the matrix".to_string(),
            }
            .into());
        }
        let row_pairs = scratch.read_pairs(Axis::Row)?;
        let col_pairs = scratch.read_pairs(Axis::Col)?;
        for (axis, table) in [(Axis::Row, &row_pairs), (Axis::Col, &col_pairs)] {
            if table.len() != partition.num_free(axis) {
                return Err(ScratchError::Corrupt {
                    path: scratch.path(&ScratchDir::pairs_file(axis)),
                    line: 1,
                    reason: format!(
                        "{} members, partition has {} free",
                        table.len(),
                        partition.num_free(axis)
                    ),
                }
                .into());
            }
        }

        let incumbent = self.seed(matrix, scratch, resume)?;
        scratch.write_incumbent(&incumbent)?;

        let scheduler = CandidateScheduler::new(matrix, incumbent.num_rows());
        let engine = PruningEngine::new(matrix, &partition, &row_pairs, &col_pairs);
        let mut stats = SearchStats::default();

        let (incumbent, protocol) =
            self.run_pool(matrix, &partition, scratch, solver, incumbent, &scheduler, &engine, &mut stats)?;
        stats.protocol = protocol;
        stats.phase_times.search_ms = search_start.elapsed().as_millis() as u64;
        Ok(SearchOutcome { incumbent, stats })
    }

    /// Greedy seed, replaced by the checkpoint when resuming from a better one.
    fn seed(&self, matrix: &MatrixIndex, scratch: &ScratchDir, resume: bool) -> Result<Incumbent, SearchError> {
        let mut incumbent = AddRowGreedy::new(matrix).solve();
        info!(
            "Greedy seed: {} rows x {} cols = {} elements",
            incumbent.num_rows(),
            incumbent.num_cols(),
            incumbent.num_elements()
        );
        if !resume {
            return Ok(incumbent);
        }
        match scratch.read_incumbent() {
            Ok(Some(saved)) if saved.is_feasible_for(matrix) => {
                if incumbent.try_replace(saved) {
                    info!("Resuming from checkpoint with {} elements", incumbent.num_elements());
                }
            }
            Ok(Some(_)) => warn!("Checkpoint does not fit this matrix, ignoring it"),
            Ok(None) => {}
            Err(e) => warn!("Ignoring unreadable checkpoint: {}", e),
        }
        Ok(incumbent)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_pool<S: ExactSolver + ?Sized>(
        &self,
        matrix: &MatrixIndex,
        partition: &Partition,
        scratch: &ScratchDir,
        solver: &S,
        incumbent: Incumbent,
        scheduler: &CandidateScheduler,
        engine: &PruningEngine<'_>,
        stats: &mut SearchStats,
    ) -> Result<(Incumbent, ProtocolStats), SearchError> {
        let num_workers = self.options.num_workers.max(1);
        let (links, worker_links) = channel_pool(num_workers);
        let worker_options = self.options.worker;

        thread::scope(|scope| {
            let handles: Vec<_> = worker_links
                .into_iter()
                .map(|link| {
                    let worker = Worker::new(matrix, partition, solver, link, worker_options);
                    scope.spawn(move || worker.run_guarded())
                })
                .collect();

            let mut coordinator = Coordinator::new(matrix, incumbent, links, Some(scratch));
            let result = match drive(&mut coordinator, scheduler, engine, stats) {
                Ok(()) => coordinator.finish(),
                Err(e) => Err(e),
            };

            let mut worker_failure = None;
            for (id, handle) in handles.into_iter().enumerate() {
                match handle.join() {
                    Ok(Ok(solved)) => debug!("Worker {} joined after {} subproblems", id, solved),
                    Ok(Err(e)) => worker_failure = Some(e),
                    Err(_) => {
                        worker_failure =
                            Some(SearchError::Protocol(format!("worker {} panicked", id)))
                    }
                }
            }
            match (result, worker_failure) {
                (Ok(_), Some(e)) => Err(e),
                (result, _) => result,
            }
        })
    }
}

/// Walk the scheduler's order, dispatching every candidate that survives
/// the bound and the pruning.
fn drive(
    coordinator: &mut Coordinator<'_>,
    scheduler: &CandidateScheduler,
    engine: &PruningEngine<'_>,
    stats: &mut SearchStats,
) -> Result<(), SearchError> {
    for &row_sum in scheduler.order() {
        stats.candidates_considered += 1;
        let best = coordinator.incumbent().num_elements();
        let target = match scheduler.evaluate(row_sum, best) {
            CandidateDecision::Try(target) => target,
            CandidateDecision::Skip { min_cols, max_cols } => {
                stats.skipped_by_bound += 1;
                debug!(
                    "Skipping row_sum={}: needs {} cols, at most {} possible",
                    row_sum, min_cols, max_cols
                );
                continue;
            }
        };
        match engine.prune(target) {
            PruneOutcome::Feasible(problem) => coordinator.dispatch(problem)?,
            PruneOutcome::Infeasible {
                axis,
                remaining,
                required,
            } => {
                stats.pruned_infeasible += 1;
                debug!(
                    "Pruned {}: {} free {}s left, {} needed",
                    target, remaining, axis, required
                );
            }
        }
    }
    Ok(())
}

/// Builder for [`SearchPipeline`]
pub struct PipelineBuilder {
    options: SearchOptions,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            options: SearchOptions::default(),
        }
    }

    pub fn num_workers(mut self, num_workers: usize) -> Self {
        self.options.num_workers = num_workers.max(1);
        self
    }

    pub fn resume(mut self, resume: bool) -> Self {
        self.options.resume = resume;
        self
    }

    pub fn refine(mut self, refine: bool) -> Self {
        self.options.worker.refine = refine;
        self
    }

    pub fn large_matrix(mut self, cells: usize) -> Self {
        self.options.worker.large_matrix = cells;
        self
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> SearchPipeline {
        SearchPipeline::new(self.options)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
