//! Retention sweeper: periodically delete workspaces older than the TTL.
//!
//! One task per process. Each pass lists the workspace root, removes every
//! directory whose mtime is more than `ttl` in the past, then sleeps for
//! `sweep_interval`. The first pass runs immediately on start.
//!
//! Failures never end the loop: an unreadable root is logged and retried on
//! the next pass, and a directory that refuses deletion is logged and left
//! for the next pass too.
//!
//! A job that runs longer than the TTL can have its workspace removed from
//! under it. Keep the TTL well above the slowest expected job.

use crate::config::RetentionPolicy;
use crate::workspace::{WorkspaceEntry, WorkspaceStore};
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: usize,
    pub failed: usize,
}

/// Deletes expired workspaces from a [`WorkspaceStore`].
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    store: WorkspaceStore,
    policy: RetentionPolicy,
}

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    /// Token that stops the sweeper when cancelled.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop the sweeper and wait for the task to exit.
    ///
    /// A pass already in progress finishes its current deletion first.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.join.await {
            error!("Retention sweeper task ended abnormally: {}", e);
        }
    }
}

impl RetentionSweeper {
    pub fn new(store: WorkspaceStore, policy: RetentionPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Whether a workspace last modified at `modified` has expired at `now`.
    ///
    /// Age must strictly exceed the TTL. An mtime in the future counts as age
    /// zero.
    pub fn is_expired(&self, modified: SystemTime, now: SystemTime) -> bool {
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        age > self.policy.ttl
    }

    /// Run one pass against the current wall clock.
    pub async fn sweep_once(&self) -> SweepReport {
        self.sweep_at(SystemTime::now()).await
    }

    /// Run one pass as if the current time were `now`.
    pub async fn sweep_at(&self, now: SystemTime) -> SweepReport {
        let entries = match self.store.list_all().await {
            Ok(entries) => entries,
            Err(e) => {
                error!("Retention sweep could not list workspaces: {}", e);
                return SweepReport::default();
            }
        };

        self.sweep_entries(entries, now).await
    }

    /// Expire `entries` one by one. A failed removal is counted and skipped.
    pub(crate) async fn sweep_entries(
        &self,
        entries: Vec<WorkspaceEntry>,
        now: SystemTime,
    ) -> SweepReport {
        let mut report = SweepReport {
            scanned: entries.len(),
            ..SweepReport::default()
        };

        for entry in entries {
            if !self.is_expired(entry.modified, now) {
                continue;
            }
            if self.store.remove(&entry.path).await {
                report.removed += 1;
            } else {
                report.failed += 1;
            }
        }

        if report.removed > 0 || report.failed > 0 {
            info!(
                scanned = report.scanned,
                removed = report.removed,
                failed = report.failed,
                "Retention sweep finished"
            );
        } else {
            debug!(scanned = report.scanned, "Retention sweep: nothing expired");
        }
        report
    }

    /// Spawn the sweep loop on the current tokio runtime.
    pub fn spawn(self) -> SweeperHandle {
        self.spawn_with_token(CancellationToken::new())
    }

    /// Spawn the sweep loop, stopping when `token` is cancelled.
    pub fn spawn_with_token(self, token: CancellationToken) -> SweeperHandle {
        let task_token = token.clone();
        let join = tokio::spawn(async move { self.run(task_token).await });
        SweeperHandle { token, join }
    }

    async fn run(self, token: CancellationToken) {
        info!(
            "Retention sweeper started (ttl={}s, interval={}s, root={})",
            self.policy.ttl.as_secs(),
            self.policy.sweep_interval.as_secs(),
            self.store.root().display()
        );

        loop {
            if token.is_cancelled() {
                break;
            }

            self.sweep_once().await;

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.policy.sweep_interval) => {}
            }
        }

        info!("Retention sweeper stopped");
    }
}
