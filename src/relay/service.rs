// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Relay Service
//!
//! Admission and lifecycle of pipeline runs.
//!
//! Submitting an intent creates a `processing` record and returns at once;
//! the run itself is spawned in the background. At most `max_in_flight`
//! runs execute concurrently, the rest wait for a permit at stage `Init`.
//!
//! ## Shutdown
//!
//! Cancelling the service token stops admission of waiting runs and
//! interrupts runs that are idle in the settlement wait. Runs inside an
//! irreversible step finish that step. [`RelayService::shutdown`] waits for
//! all spawned runs, bounded by a grace period.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use super::executor::RelayExecutor;
use super::intent::RelayIntent;
use super::ports::{SettlementVenue, SourceLedger};
use super::stage::RelayMode;
use crate::models::ExecutionRecord;
use crate::tracker::{ExecutionHandle, ExecutionTracker, TrackerError};

const SHUTDOWN_REASON: &str = "Cancelled: relay service shut down before the run started";
/// Recorded when a run ends without producing an outcome (panic or abort).
const ABORTED_REASON: &str = "Internal: relay run aborted unexpectedly";

/// Type-erased entry point used by the HTTP layer.
pub trait IntentSubmitter: Send + Sync {
    /// Record a new execution and start it in the background.
    fn submit(&self, intent: RelayIntent) -> Result<ExecutionRecord, TrackerError>;

    fn mode(&self) -> RelayMode;

    fn vault_address(&self) -> Address;
}

pub struct RelayService<L, V> {
    executor: Arc<RelayExecutor<L, V>>,
    tracker: Arc<ExecutionTracker>,
    permits: Arc<Semaphore>,
    tasks: TaskTracker,
    shutdown: CancellationToken,
}

impl<L: SourceLedger, V: SettlementVenue> RelayService<L, V> {
    pub fn new(
        executor: RelayExecutor<L, V>,
        tracker: Arc<ExecutionTracker>,
        max_in_flight: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            executor: Arc::new(executor),
            tracker,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            tasks: TaskTracker::new(),
            shutdown,
        }
    }

    pub fn tracker(&self) -> &Arc<ExecutionTracker> {
        &self.tracker
    }

    /// Run one intent to a terminal record on the current task.
    pub async fn run_to_completion(
        &self,
        intent: RelayIntent,
    ) -> Result<ExecutionRecord, TrackerError> {
        let record = self.tracker.create()?;
        let handle = self.tracker.handle(record.id);
        drive(Arc::clone(&self.executor), handle, intent, self.shutdown.clone()).await
    }

    /// Stop admitting runs and wait up to `grace` for spawned ones.
    ///
    /// Returns whether every run finished in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.shutdown.cancel();
        self.tasks.close();
        info!(in_flight = self.tasks.len(), "Waiting for relay runs to finish");
        match tokio::time::timeout(grace, self.tasks.wait()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    remaining = self.tasks.len(),
                    "Relay runs still active after shutdown grace period"
                );
                false
            }
        }
    }
}

impl<L: SourceLedger, V: SettlementVenue> IntentSubmitter for RelayService<L, V> {
    fn submit(&self, intent: RelayIntent) -> Result<ExecutionRecord, TrackerError> {
        let record = self.tracker.create()?;
        let handle = self.tracker.handle(record.id.clone());
        let executor = Arc::clone(&self.executor);
        let permits = Arc::clone(&self.permits);
        let cancel = self.shutdown.clone();

        self.tasks.spawn(async move {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = permits.acquire_owned() => permit.ok(),
            };
            let Some(_permit) = permit else {
                if let Err(e) = handle.fail(SHUTDOWN_REASON) {
                    warn!(execution_id = %handle.id(), error = %e, "Failed to record cancellation");
                }
                return;
            };
            let id = handle.id().to_string();
            if let Err(e) = drive(executor, handle, intent, cancel).await {
                warn!(execution_id = %id, error = %e, "Failed to record relay outcome");
            }
        });

        Ok(record)
    }

    fn mode(&self) -> RelayMode {
        self.executor.settings().mode
    }

    fn vault_address(&self) -> Address {
        self.executor.ledger().vault_address()
    }
}

/// Execute on its own task and write the terminal outcome.
///
/// A run that panics is still closed as `failed`.
async fn drive<L: SourceLedger, V: SettlementVenue>(
    executor: Arc<RelayExecutor<L, V>>,
    handle: ExecutionHandle,
    intent: RelayIntent,
    cancel: CancellationToken,
) -> Result<ExecutionRecord, TrackerError> {
    let run_handle = handle.clone();
    let run =
        tokio::spawn(async move { executor.execute(&run_handle, intent, &cancel).await });

    match run.await {
        Ok(Ok(proof)) => handle.complete(proof),
        Ok(Err(e)) => {
            warn!(execution_id = %handle.id(), kind = %e.kind(), error = %e, "Relay failed");
            handle.fail(e.record_message())
        }
        Err(join_error) => {
            error!(execution_id = %handle.id(), error = %join_error, "Relay run aborted");
            handle.fail(ABORTED_REASON)
        }
    }
}
