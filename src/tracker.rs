// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Execution Tracker
//!
//! Owns every execution record. A record is created as `processing`, moves
//! through pipeline stages, and ends `completed` (with proof) or `failed`
//! (with reason). Terminal records are immutable: later writes are refused,
//! so repeated status queries return the same record.
//!
//! Each pipeline run receives an [`ExecutionHandle`] for its own id and is
//! the only writer of that record. Status queries read concurrently.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{ExecutionProof, ExecutionRecord, ExecutionStatus, RelayStage};
use crate::storage::{ExecutionStore, StoreError};

/// Reason recorded for runs found `processing` at startup.
pub const INTERRUPTED_REASON: &str = "Interrupted: process restarted before the relay finished";

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Execution not found")]
    NotFound,

    #[error("execution {id} is already {status}")]
    Terminal { id: String, status: &'static str },

    #[error("execution id collision")]
    IdCollision,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct ExecutionTracker {
    store: Arc<dyn ExecutionStore>,
}

impl ExecutionTracker {
    pub fn new(store: Arc<dyn ExecutionStore>) -> Self {
        Self { store }
    }

    /// Allocate a fresh id and record it as `processing`.
    pub fn create(&self) -> Result<ExecutionRecord, TrackerError> {
        let record = ExecutionRecord::processing(Uuid::new_v4().to_string(), Utc::now());
        if !self.store.insert_new(&record)? {
            return Err(TrackerError::IdCollision);
        }
        info!(execution_id = %record.id, "Execution created");
        Ok(record)
    }

    pub fn get(&self, id: &str) -> Result<ExecutionRecord, TrackerError> {
        self.store.get(id)?.ok_or(TrackerError::NotFound)
    }

    /// Record that a run reached `stage`.
    pub fn set_stage(&self, id: &str, stage: RelayStage) -> Result<(), TrackerError> {
        let mut record = self.open_record(id)?;
        record.stage = stage;
        self.store.put(&record)?;
        Ok(())
    }

    pub fn complete(
        &self,
        id: &str,
        proof: ExecutionProof,
    ) -> Result<ExecutionRecord, TrackerError> {
        let mut record = self.open_record(id)?;
        record.status = ExecutionStatus::Completed;
        record.stage = RelayStage::Completed;
        record.completed_at = Some(proof.completed_at);
        record.result = Some(proof);
        self.store.put(&record)?;
        info!(execution_id = %id, "Execution completed");
        Ok(record)
    }

    pub fn fail(&self, id: &str, reason: impl Into<String>) -> Result<ExecutionRecord, TrackerError> {
        let mut record = self.open_record(id)?;
        let reason = reason.into();
        warn!(execution_id = %id, stage = %record.stage, error = %reason, "Execution failed");
        record.status = ExecutionStatus::Failed;
        record.stage = RelayStage::Failed;
        record.completed_at = Some(Utc::now());
        record.error = Some(reason);
        self.store.put(&record)?;
        Ok(record)
    }

    /// Fail every record still `processing`. Called once at startup, before
    /// any run is admitted. Returns how many records were closed.
    pub fn recover_interrupted(&self) -> Result<usize, TrackerError> {
        let stuck = self.store.list_by_status(ExecutionStatus::Processing)?;
        for record in &stuck {
            self.fail(&record.id, INTERRUPTED_REASON)?;
        }
        if !stuck.is_empty() {
            warn!(count = stuck.len(), "Closed executions interrupted by a restart");
        }
        Ok(stuck.len())
    }

    /// Write handle for one run's record.
    pub fn handle(self: &Arc<Self>, id: impl Into<String>) -> ExecutionHandle {
        ExecutionHandle {
            tracker: Arc::clone(self),
            id: id.into(),
        }
    }

    fn open_record(&self, id: &str) -> Result<ExecutionRecord, TrackerError> {
        let record = self.get(id)?;
        if record.status.is_terminal() {
            return Err(TrackerError::Terminal {
                id: id.to_string(),
                status: record.status.as_str(),
            });
        }
        Ok(record)
    }
}

/// The single writer of one execution record.
#[derive(Clone)]
pub struct ExecutionHandle {
    tracker: Arc<ExecutionTracker>,
    id: String,
}

impl ExecutionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Publish stage progress. A storage failure here does not stop the run.
    pub fn advance(&self, stage: RelayStage) {
        if let Err(e) = self.tracker.set_stage(&self.id, stage) {
            warn!(execution_id = %self.id, stage = %stage, error = %e, "Failed to record stage");
        }
    }

    pub fn complete(&self, proof: ExecutionProof) -> Result<ExecutionRecord, TrackerError> {
        self.tracker.complete(&self.id, proof)
    }

    pub fn fail(&self, reason: impl Into<String>) -> Result<ExecutionRecord, TrackerError> {
        self.tracker.fail(&self.id, reason)
    }
}
