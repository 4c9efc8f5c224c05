use std::future::Future;

use tokio::task::{JoinError, JoinSet};

/// Counters over the lifetime of a supervisor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub dispatched: u64,
    pub reaped: u64,
    /// Workers that ended in a panic
    pub crashed: u64,
}

/// Owns every dispatched worker until it has been reaped.
///
/// Workers share nothing with the supervisor or with each other once
/// dispatched. A finished worker stays in the set until `reap` or
/// `wait_exit` collects it.
pub struct Supervisor {
    workers: JoinSet<()>,
    stats: WorkerStats,
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            workers: JoinSet::new(),
            stats: WorkerStats::default(),
        }
    }

    /// Spawns `worker` as an independently scheduled task.
    pub fn dispatch<F>(&mut self, worker: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.workers.spawn(worker);
        self.stats.dispatched += 1;
    }

    /// Workers dispatched and not yet reaped, finished or not.
    pub fn in_flight(&self) -> usize {
        self.workers.len()
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats
    }

    /// Collects every worker that has already finished without waiting.
    ///
    /// Returns how many were collected; zero is normal.
    pub fn reap(&mut self) -> usize {
        let mut collected = 0;
        while let Some(result) = self.workers.try_join_next() {
            self.record(result);
            collected += 1;
        }
        collected
    }

    /// Waits for the next worker to finish and collects it.
    ///
    /// Returns `false` when no worker is left.
    pub async fn wait_exit(&mut self) -> bool {
        match self.workers.join_next().await {
            Some(result) => {
                self.record(result);
                true
            }
            None => false,
        }
    }

    fn record(&mut self, result: Result<(), JoinError>) {
        self.stats.reaped += 1;

        if let Err(e) = result {
            if e.is_panic() {
                self.stats.crashed += 1;
                tracing::error!(error = %e, "Worker crashed");
            } else {
                tracing::warn!(error = %e, "Worker cancelled");
            }
        }
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}
