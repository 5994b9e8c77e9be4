/**
 * File: /src/search/worker.rs
 * Created Date: Thursday, October 16th 2025
 * Author: Zihan
 * -----
 * Last Modified: Friday, 17th October 2025 3:20:11 pm
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-17		Zihan	Abort guard so a panicking solver cannot stall the coordinator
 * 2025-10-16		Zihan	Receive / refine / solve / reply loop
 */

use crate::matrix::{Axis, MatrixIndex};
use crate::search::partition::Partition;
use crate::search::protocol::{Completion, FromWorker, ToWorker, WorkerLink};
use crate::search::pruning::PruningEngine;
use crate::search::solver::{ExactSolver, SolveRequest, SolveStatus};
use crate::search::types::{PruneOutcome, PrunedSubproblem, SearchError, WorkerId};
use log::{debug, info, warn};
use std::sync::mpsc::Sender;

#[derive(Debug, Clone, Copy)]
pub struct WorkerOptions {
    /// Recompute pair counts on the worker before solving
    pub refine: bool,
    /// No refinement above this many free cells
    pub large_matrix: usize,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            refine: true,
            large_matrix: 1_000_000,
        }
    }
}

/// Sends `Abort` if the worker thread unwinds before reaching the end of
/// its loop.
struct AbortOnPanic {
    worker: WorkerId,
    outbox: Sender<FromWorker>,
}

impl Drop for AbortOnPanic {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let _ = self.outbox.send(FromWorker::Abort {
                worker: self.worker,
                reason: "worker panicked".to_string(),
            });
        }
    }
}

pub struct Worker<'a, S: ExactSolver + ?Sized> {
    matrix: &'a MatrixIndex,
    partition: &'a Partition,
    solver: &'a S,
    link: WorkerLink,
    options: WorkerOptions,
}

impl<'a, S: ExactSolver + ?Sized> Worker<'a, S> {
    pub fn new(
        matrix: &'a MatrixIndex,
        partition: &'a Partition,
        solver: &'a S,
        link: WorkerLink,
        options: WorkerOptions,
    ) -> Self {
        Self {
            matrix,
            partition,
            solver,
            link,
            options,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.link.id
    }

    /// [`Worker::run`], reporting failures and panics to the coordinator as
    /// `Abort`.
    pub fn run_guarded(self) -> Result<usize, SearchError> {
        let id = self.id();
        let outbox = self.link.outbox.clone();
        let _guard = AbortOnPanic {
            worker: id,
            outbox: outbox.clone(),
        };
        let result = self.run();
        if let Err(e) = &result {
            let _ = outbox.send(FromWorker::Abort {
                worker: id,
                reason: e.to_string(),
            });
        }
        result
    }

    /// Serve subproblems until `End`. Returns how many were solved.
    pub fn run(self) -> Result<usize, SearchError> {
        let id = self.id();
        debug!("Worker {} started with {}", id, self.solver.name());
        let mut solved = 0;
        loop {
            match self.link.inbox.recv() {
                Ok(ToWorker::Solve(problem)) => {
                    let completion = self.solve(problem)?;
                    solved += 1;
                    self.link
                        .outbox
                        .send(FromWorker::Completed(completion))
                        .map_err(|_| {
                            SearchError::Protocol(format!("worker {}: coordinator is gone", id))
                        })?;
                }
                Ok(ToWorker::End) => break,
                Err(_) => {
                    warn!("Worker {}: coordinator hung up without End", id);
                    break;
                }
            }
        }
        info!("Worker {} stopped after {} subproblems", id, solved);
        Ok(solved)
    }

    fn should_refine(&self) -> bool {
        let cells = self.partition.num_free(Axis::Row) * self.partition.num_free(Axis::Col);
        self.options.refine && cells <= self.options.large_matrix
    }

    /// Refine (when enabled), solve, and package the reply.
    pub fn solve(&self, problem: PrunedSubproblem) -> Result<Completion, SearchError> {
        let target = problem.target;
        let problem = if self.should_refine() {
            match PruningEngine::refine(self.matrix, self.partition, &problem) {
                PruneOutcome::Feasible(refined) => refined,
                PruneOutcome::Infeasible { axis, remaining, required } => {
                    debug!(
                        "Worker {}: {} infeasible after refinement ({} {}s left, {} needed)",
                        self.id(),
                        target,
                        remaining,
                        axis,
                        required
                    );
                    return Ok(self.reply(target.row_sum, 0, None));
                }
            }
        } else {
            problem
        };

        let request = SolveRequest::from_pruned(self.matrix, self.partition, &problem);
        let solution = self.solver.solve(&request)?;
        let found = solution.status == SolveStatus::Optimal && solution.objective >= target.min_cols;
        let masks = if found {
            Some((solution.rows_to_keep, solution.cols_to_keep))
        } else {
            None
        };
        let objective = if found { solution.objective } else { 0 };
        Ok(self.reply(target.row_sum, objective, masks))
    }

    fn reply(&self, row_sum: usize, objective: usize, masks: Option<(Vec<bool>, Vec<bool>)>) -> Completion {
        let (rows_to_keep, cols_to_keep) = match masks {
            Some((rows, cols)) => (Some(rows), Some(cols)),
            None => (None, None),
        };
        Completion {
            worker: self.id(),
            row_sum,
            objective,
            rows_to_keep,
            cols_to_keep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairs::PairCompatibilityTable;
    use crate::search::protocol::channel_pool;
    use crate::search::solver::{BranchAndBoundSolver, Solution, SolverError};
    use crate::search::types::Subproblem;
    use std::thread;

    fn matrix() -> MatrixIndex {
        MatrixIndex::from_na_rows(&[
            vec![true, false, false, false, false],
            vec![false, true, false, false, false],
            vec![false, false, false, false, false],
            vec![false, false, false, false, false],
        ])
        .unwrap()
    }

    fn pruned(m: &MatrixIndex, p: &Partition, target: Subproblem) -> PrunedSubproblem {
        let rows = PairCompatibilityTable::build(m, Axis::Row, p.free(Axis::Row), p.free(Axis::Col));
        let cols = PairCompatibilityTable::build(m, Axis::Col, p.free(Axis::Col), p.free(Axis::Row));
        match PruningEngine::new(m, p, &rows, &cols).prune(target) {
            PruneOutcome::Feasible(pruned) => pruned,
            other => panic!("expected feasible, got {:?}", other),
        }
    }

    struct PanickingSolver;

    impl ExactSolver for PanickingSolver {
        fn solve(&self, _request: &SolveRequest<'_>) -> Result<Solution, SolverError> {
            panic!("solver exploded");
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    #[test]
    fn test_worker_replies_with_masks() {
        let m = matrix();
        let p = Partition::from_matrix(&m);
        let solver = BranchAndBoundSolver::new();
        let (links, mut workers) = channel_pool(1);
        let worker = Worker::new(&m, &p, &solver, workers.remove(0), WorkerOptions::default());

        let problem = pruned(&m, &p, Subproblem::new(4, 3));
        let reply = worker.solve(problem).unwrap();
        assert_eq!(reply.objective, 3);
        assert_eq!(reply.cols_to_keep, Some(vec![false, false, true, true, true]));

        let problem = pruned(&m, &p, Subproblem::new(3, 4));
        let options = WorkerOptions {
            refine: false,
            ..WorkerOptions::default()
        };
        let (_, mut more) = channel_pool(1);
        let plain = Worker::new(&m, &p, &solver, more.remove(0), options);
        let reply = plain.solve(problem).unwrap();
        assert_eq!(reply.objective, 4);
        assert!(reply.rows_to_keep.is_some());
        drop(links);
    }

    #[test]
    fn test_below_cutoff_sends_no_masks() {
        let m = matrix();
        let p = Partition::from_matrix(&m);
        let solver = BranchAndBoundSolver::new();
        let (_links, mut workers) = channel_pool(1);
        let worker = Worker::new(&m, &p, &solver, workers.remove(0), WorkerOptions::default());

        let mut problem = pruned(&m, &p, Subproblem::new(4, 3));
        problem.target.min_cols = 4;
        let reply = worker.solve(problem).unwrap();
        assert_eq!(reply.objective, 0);
        assert!(reply.rows_to_keep.is_none());
        assert!(reply.cols_to_keep.is_none());
    }

    #[test]
    fn test_run_until_end() {
        let m = matrix();
        let p = Partition::from_matrix(&m);
        let solver = BranchAndBoundSolver::new();
        let (links, mut workers) = channel_pool(1);
        let link = workers.remove(0);
        let problem = pruned(&m, &p, Subproblem::new(4, 3));

        let solved = thread::scope(|s| {
            let handle = s.spawn(|| Worker::new(&m, &p, &solver, link, WorkerOptions::default()).run_guarded());
            links.inboxes[0].send(ToWorker::Solve(problem)).unwrap();
            match links.completions.recv().unwrap() {
                FromWorker::Completed(c) => assert_eq!(c.objective, 3),
                other => panic!("unexpected {:?}", other),
            }
            links.inboxes[0].send(ToWorker::End).unwrap();
            handle.join().unwrap()
        });
        assert_eq!(solved.unwrap(), 1);
    }

    #[test]
    fn test_panic_becomes_abort() {
        let m = matrix();
        let p = Partition::from_matrix(&m);
        let (links, mut workers) = channel_pool(1);
        let link = workers.remove(0);
        let problem = pruned(&m, &p, Subproblem::new(4, 3));

        thread::scope(|s| {
            let handle = s.spawn(|| Worker::new(&m, &p, &PanickingSolver, link, WorkerOptions::default()).run_guarded());
            links.inboxes[0].send(ToWorker::Solve(problem)).unwrap();
            match links.completions.recv().unwrap() {
                FromWorker::Abort { worker, reason } => {
                    assert_eq!(worker, 0);
                    assert!(reason.contains("panicked"));
                }
                other => panic!("unexpected {:?}", other),
            }
            assert!(handle.join().is_err());
        });
    }
}
