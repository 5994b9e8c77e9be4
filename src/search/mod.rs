//! # Distributed Candidate Search
//!
//! Finds the largest submatrix without missing cells.
//!
//! ## Phases
//!
//! 1. **Precompute**: split rows and columns into forced (no NA) and free,
//!    then count for every pair of free rows (columns) the free columns (rows)
//!    valid in both. Work is strided over ranks; results land in the scratch
//!    directory so the next phase can run separately.
//! 2. **Search**: try row counts nearest the incumbent first. Each target
//!    `(row_sum, min_cols)` is bounded, pruned to a fixed point on the
//!    coordinator and, if still feasible, sent to a worker that refines it and
//!    calls the exact solver. Strictly better answers replace the incumbent,
//!    which is checkpointed on every change.
//!
//! Rows and columns share one implementation through [`Axis`](crate::matrix::Axis).

/**
 * File: /src/search/mod.rs
 * Created Date: Thursday, October 16th 2025
 * Author: Zihan
 * -----
 * Last Modified: Friday, 17th October 2025 5:36:09 pm
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-16		Zihan	Created two-phase search module
 */

pub mod types;
pub mod partition;
pub mod pruning;
pub mod scheduler;
pub mod incumbent;
pub mod solver;
pub mod protocol;
pub mod coordinator;
pub mod worker;
pub mod precompute;
pub mod pipeline;

pub use types::*;
pub use partition::{AxisPartition, Partition};
pub use pruning::PruningEngine;
pub use scheduler::{CandidateDecision, CandidateScheduler};
pub use incumbent::Incumbent;
pub use solver::{BranchAndBoundSolver, ExactSolver, Solution, SolveRequest, SolveStatus, SolverError};
pub use protocol::{channel_pool, Completion, CoordinatorLinks, FromWorker, ToWorker, WorkerLink};
pub use coordinator::Coordinator;
pub use worker::{Worker, WorkerOptions};
pub use precompute::{ensure_precomputed, load_current, run_precompute};
pub use pipeline::{PipelineBuilder, SearchOptions, SearchOutcome, SearchPipeline};
