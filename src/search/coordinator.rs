//! # Coordinator
//!
//! Owns the incumbent, hands pruned subproblems to idle workers and folds
//! their completions back in. A worker is either on the available stack or
//! busy with exactly one subproblem; the coordinator never waits on a
//! completion unless it has nowhere else to send work.

/**
 * File: /src/search/coordinator.rs
 * Created Date: Thursday, October 16th 2025
 * Author: Zihan
 * -----
 * Last Modified: Friday, 17th October 2025 2:44:30 pm
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-17		Zihan	Validate completions, broadcast End on fatal errors
 * 2025-10-16		Zihan	Dispatch / completion loop
 */

use crate::matrix::MatrixIndex;
use crate::scratch::ScratchDir;
use crate::search::incumbent::Incumbent;
use crate::search::protocol::{Completion, CoordinatorLinks, FromWorker, ToWorker};
use crate::search::types::{ProtocolStats, PrunedSubproblem, SearchError, Subproblem, WorkerId};
use log::{debug, error, info};
use std::sync::mpsc::{Receiver, SyncSender};

pub struct Coordinator<'a> {
    matrix: &'a MatrixIndex,
    incumbent: Incumbent,
    checkpoint: Option<&'a ScratchDir>,
    inboxes: Vec<SyncSender<ToWorker>>,
    completions: Receiver<FromWorker>,
    /// Idle workers; the last pushed is the next to receive work
    available: Vec<WorkerId>,
    busy: Vec<Option<Subproblem>>,
    stats: ProtocolStats,
    ended: bool,
}

impl<'a> Coordinator<'a> {
    /// `checkpoint`: where to persist every improvement, if anywhere
    pub fn new(
        matrix: &'a MatrixIndex,
        incumbent: Incumbent,
        links: CoordinatorLinks,
        checkpoint: Option<&'a ScratchDir>,
    ) -> Self {
        let num_workers = links.inboxes.len();
        Self {
            matrix,
            incumbent,
            checkpoint,
            inboxes: links.inboxes,
            completions: links.completions,
            available: (0..num_workers).rev().collect(),
            busy: vec![None; num_workers],
            stats: ProtocolStats::default(),
            ended: false,
        }
    }

    pub fn incumbent(&self) -> &Incumbent {
        &self.incumbent
    }

    pub fn stats(&self) -> &ProtocolStats {
        &self.stats
    }

    pub fn num_workers(&self) -> usize {
        self.inboxes.len()
    }

    pub fn in_flight(&self) -> usize {
        self.busy.iter().filter(|b| b.is_some()).count()
    }

    /// Send `problem` to an idle worker, first waiting for a completion when
    /// every worker is busy.
    pub fn dispatch(&mut self, problem: PrunedSubproblem) -> Result<(), SearchError> {
        let result = self.try_dispatch(problem);
        self.end_on_error(result)
    }

    /// Block for one completion and apply it.
    pub fn receive_completion(&mut self) -> Result<(), SearchError> {
        let result = self.try_receive();
        self.end_on_error(result)
    }

    /// Wait for every busy worker to report back.
    pub fn drain(&mut self) -> Result<(), SearchError> {
        while self.in_flight() > 0 {
            self.receive_completion()?;
        }
        Ok(())
    }

    /// Drain, then send `End` to every worker.
    pub fn finish(mut self) -> Result<(Incumbent, ProtocolStats), SearchError> {
        self.drain()?;
        self.broadcast_end();
        info!(
            "Search finished: {} dispatched, {} completed, {} improvements",
            self.stats.dispatched, self.stats.completed, self.stats.improvements
        );
        Ok((self.incumbent, self.stats))
    }

    fn try_dispatch(&mut self, problem: PrunedSubproblem) -> Result<(), SearchError> {
        if self.available.is_empty() {
            self.try_receive()?;
        }
        let worker = self.available.pop().ok_or_else(|| {
            SearchError::Protocol("no worker became available".to_string())
        })?;
        let target = problem.target;
        self.inboxes[worker]
            .send(ToWorker::Solve(problem))
            .map_err(|_| SearchError::Protocol(format!("worker {} is gone", worker)))?;
        self.busy[worker] = Some(target);
        self.stats.dispatched += 1;
        debug!("Dispatched {} to worker {}", target, worker);
        Ok(())
    }

    fn try_receive(&mut self) -> Result<(), SearchError> {
        if self.in_flight() == 0 {
            return Err(SearchError::Protocol(
                "waiting for a completion with no worker busy".to_string(),
            ));
        }
        match self.completions.recv() {
            Ok(FromWorker::Completed(completion)) => self.apply(completion),
            Ok(FromWorker::Abort { worker, reason }) => Err(SearchError::Protocol(format!(
                "worker {} aborted: {}",
                worker, reason
            ))),
            Err(_) => Err(SearchError::Protocol(
                "all workers disconnected".to_string(),
            )),
        }
    }

    fn apply(&mut self, completion: Completion) -> Result<(), SearchError> {
        let worker = completion.worker;
        let target = match self.busy.get(worker) {
            Some(Some(target)) => *target,
            _ => {
                return Err(SearchError::Protocol(format!(
                    "completion from worker {} which is not busy",
                    worker
                )))
            }
        };
        if target.row_sum != completion.row_sum {
            return Err(SearchError::Protocol(format!(
                "worker {} answered row_sum {} for {}",
                worker, completion.row_sum, target
            )));
        }
        self.busy[worker] = None;
        self.available.push(worker);
        self.stats.completed += 1;

        let num_elements = completion.objective * completion.row_sum;
        if num_elements <= self.incumbent.num_elements() {
            debug!(
                "Worker {} finished {} with {} elements, no improvement",
                worker, target, num_elements
            );
            return Ok(());
        }

        let (rows, cols) = match (completion.rows_to_keep, completion.cols_to_keep) {
            (Some(rows), Some(cols)) => (rows, cols),
            _ => {
                return Err(SearchError::Protocol(format!(
                    "worker {} reported {} elements without an assignment",
                    worker, num_elements
                )))
            }
        };
        let candidate = Incumbent::new(rows, cols);
        if candidate.num_elements() != num_elements
            || candidate.num_rows() != completion.row_sum
            || !candidate.is_feasible_for(self.matrix)
        {
            return Err(SearchError::Protocol(format!(
                "worker {} reported an assignment inconsistent with {}",
                worker, target
            )));
        }

        if self.incumbent.try_replace(candidate) {
            self.stats.improvements += 1;
            info!(
                "New incumbent from worker {}: {} rows x {} cols = {} elements",
                worker,
                self.incumbent.num_rows(),
                self.incumbent.num_cols(),
                num_elements
            );
            if let Some(scratch) = self.checkpoint {
                scratch.write_incumbent(&self.incumbent)?;
            }
        }
        Ok(())
    }

    fn end_on_error(&mut self, result: Result<(), SearchError>) -> Result<(), SearchError> {
        if let Err(e) = &result {
            error!("Stopping workers: {}", e);
            self.broadcast_end();
        }
        result
    }

    /// End every worker once. A failed send means the worker already stopped.
    fn broadcast_end(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        for (worker, inbox) in self.inboxes.iter().enumerate() {
            match inbox.send(ToWorker::End) {
                Ok(()) => self.stats.end_signals += 1,
                Err(e) => debug!("End not delivered to worker {}: {}", worker, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::protocol::channel_pool;

    fn problem(row_sum: usize, min_cols: usize) -> PrunedSubproblem {
        PrunedSubproblem {
            target: Subproblem::new(row_sum, min_cols),
            valid_rows: vec![],
            valid_cols: vec![],
            row_cuts: vec![],
            col_cuts: vec![],
        }
    }

    fn matrix() -> MatrixIndex {
        MatrixIndex::from_na_rows(&[vec![false, true], vec![false, false]]).unwrap()
    }

    #[test]
    fn test_dispatch_and_improve() {
        let m = matrix();
        let (links, workers) = channel_pool(1);
        let mut c = Coordinator::new(&m, Incumbent::empty(2, 2), links, None);

        c.dispatch(problem(2, 1)).unwrap();
        assert_eq!(c.in_flight(), 1);
        assert!(matches!(workers[0].inbox.recv().unwrap(), ToWorker::Solve(_)));

        workers[0]
            .outbox
            .send(FromWorker::Completed(Completion {
                worker: 0,
                row_sum: 2,
                objective: 1,
                rows_to_keep: Some(vec![true, true]),
                cols_to_keep: Some(vec![true, false]),
            }))
            .unwrap();
        let (best, stats) = c.finish().unwrap();
        assert_eq!(best.num_elements(), 2);
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.improvements, 1);
        assert_eq!(stats.end_signals, 1);
        assert_eq!(workers[0].inbox.recv().unwrap(), ToWorker::End);
    }

    #[test]
    fn test_infeasible_assignment_is_fatal() {
        let m = matrix();
        let (links, workers) = channel_pool(2);
        let mut c = Coordinator::new(&m, Incumbent::empty(2, 2), links, None);
        c.dispatch(problem(2, 1)).unwrap();
        workers[0]
            .outbox
            .send(FromWorker::Completed(Completion {
                worker: 0,
                row_sum: 2,
                objective: 2,
                rows_to_keep: Some(vec![true, true]),
                cols_to_keep: Some(vec![true, true]),
            }))
            .unwrap();
        assert!(matches!(c.drain(), Err(SearchError::Protocol(_))));
        // Both workers were told to stop
        assert!(matches!(workers[0].inbox.recv().unwrap(), ToWorker::Solve(_)));
        assert_eq!(workers[0].inbox.recv().unwrap(), ToWorker::End);
        assert_eq!(workers[1].inbox.recv().unwrap(), ToWorker::End);
    }

    #[test]
    fn test_completion_from_idle_worker_is_fatal() {
        let m = matrix();
        let (links, workers) = channel_pool(2);
        let mut c = Coordinator::new(&m, Incumbent::empty(2, 2), links, None);
        c.dispatch(problem(1, 1)).unwrap();
        workers[1]
            .outbox
            .send(FromWorker::Completed(Completion {
                worker: 1,
                row_sum: 1,
                objective: 0,
                rows_to_keep: None,
                cols_to_keep: None,
            }))
            .unwrap();
        assert!(matches!(
            c.receive_completion(),
            Err(SearchError::Protocol(_))
        ));
    }

    #[test]
    fn test_abort_is_fatal() {
        let m = matrix();
        let (links, workers) = channel_pool(1);
        let mut c = Coordinator::new(&m, Incumbent::empty(2, 2), links, None);
        c.dispatch(problem(1, 1)).unwrap();
        workers[0]
            .outbox
            .send(FromWorker::Abort {
                worker: 0,
                reason: "solver failed".to_string(),
            })
            .unwrap();
        match c.receive_completion() {
            Err(SearchError::Protocol(msg)) => assert!(msg.contains("solver failed")),
            other => panic!("expected protocol error, got {:?}", other),
        }
    }

    #[test]
    fn test_equal_result_keeps_incumbent() {
        let m = matrix();
        let (links, workers) = channel_pool(1);
        let seed = Incumbent::new(vec![true, true], vec![true, false]);
        let mut c = Coordinator::new(&m, seed.clone(), links, None);
        c.dispatch(problem(1, 3)).unwrap();
        workers[0]
            .outbox
            .send(FromWorker::Completed(Completion {
                worker: 0,
                row_sum: 1,
                objective: 2,
                rows_to_keep: Some(vec![false, true]),
                cols_to_keep: Some(vec![true, true]),
            }))
            .unwrap();
        let (best, stats) = c.finish().unwrap();
        assert_eq!(best, seed);
        assert_eq!(stats.improvements, 0);
    }
}
