/**
 * File: /src/search/protocol.rs
 * Created Date: Thursday, October 16th 2025
 * Author: Zihan
 * -----
 * Last Modified: Friday, 17th October 2025 9:12:07 am
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-17		Zihan	Abort message for failed workers
 * 2025-10-16		Zihan	Coordinator / worker messages over mpsc channels
 */

use crate::search::types::{PrunedSubproblem, WorkerId};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};

/// Coordinator to worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToWorker {
    Solve(PrunedSubproblem),
    End,
}

/// Reply for one solved subproblem.
///
/// The masks are only attached when `objective >= min_cols`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub worker: WorkerId,
    pub row_sum: usize,
    pub objective: usize,
    pub rows_to_keep: Option<Vec<bool>>,
    pub cols_to_keep: Option<Vec<bool>>,
}

/// Worker to coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FromWorker {
    Completed(Completion),
    /// The worker failed and will not answer again
    Abort { worker: WorkerId, reason: String },
}

/// Coordinator side of the pool: one bounded inbox per worker, one shared
/// completion queue.
pub struct CoordinatorLinks {
    pub inboxes: Vec<SyncSender<ToWorker>>,
    pub completions: Receiver<FromWorker>,
}

pub struct WorkerLink {
    pub id: WorkerId,
    pub inbox: Receiver<ToWorker>,
    pub outbox: Sender<FromWorker>,
}

/// A worker holds at most one task, so its inbox only needs room for that
/// task and the `End` that may follow it.
pub fn channel_pool(num_workers: usize) -> (CoordinatorLinks, Vec<WorkerLink>) {
    let (outbox, completions) = mpsc::channel();
    let mut inboxes = Vec::with_capacity(num_workers);
    let mut workers = Vec::with_capacity(num_workers);
    for id in 0..num_workers {
        let (tx, rx) = mpsc::sync_channel(2);
        inboxes.push(tx);
        workers.push(WorkerLink {
            id,
            inbox: rx,
            outbox: outbox.clone(),
        });
    }
    (
        CoordinatorLinks {
            inboxes,
            completions,
        },
        workers,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::types::Subproblem;

    #[test]
    fn test_channel_pool_routes_messages() {
        let (links, workers) = channel_pool(2);
        assert_eq!(links.inboxes.len(), 2);
        assert_eq!(workers[1].id, 1);

        links.inboxes[1].send(ToWorker::End).unwrap();
        assert_eq!(workers[1].inbox.recv().unwrap(), ToWorker::End);

        let problem = PrunedSubproblem {
            target: Subproblem::new(1, 1),
            valid_rows: vec![true],
            valid_cols: vec![true],
            row_cuts: vec![],
            col_cuts: vec![],
        };
        links.inboxes[0].send(ToWorker::Solve(problem.clone())).unwrap();
        assert_eq!(workers[0].inbox.recv().unwrap(), ToWorker::Solve(problem));

        workers[0]
            .outbox
            .send(FromWorker::Abort {
                worker: 0,
                reason: "boom".to_string(),
            })
            .unwrap();
        match links.completions.recv().unwrap() {
            FromWorker::Abort { worker, .. } => assert_eq!(worker, 0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_completions_close_when_workers_drop() {
        let (links, workers) = channel_pool(3);
        drop(workers);
        assert!(links.completions.recv().is_err());
    }
}
