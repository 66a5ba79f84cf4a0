// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Execution Storage
//!
//! Key-value persistence for execution records, keyed by execution id.
//!
//! The tracker talks to an [`ExecutionStore`] and never to a concrete
//! backend, so the in-memory map used for local runs can be swapped for the
//! durable redb store without touching the pipeline.
//!
//! ## Backends
//!
//! - [`InMemoryExecutionStore`]: `RwLock<HashMap>`, lost on restart
//! - [`RedbExecutionStore`]: single-file ACID database under `DATA_DIR`

pub mod execution_db;
pub mod memory;

pub use execution_db::RedbExecutionStore;
pub use memory::InMemoryExecutionStore;

use crate::models::{ExecutionRecord, ExecutionStatus};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for execution records.
pub trait ExecutionStore: Send + Sync {
    /// Insert `record` unless its id is taken. Returns whether it was inserted.
    fn insert_new(&self, record: &ExecutionRecord) -> StoreResult<bool>;

    fn get(&self, id: &str) -> StoreResult<Option<ExecutionRecord>>;

    /// Insert or overwrite.
    fn put(&self, record: &ExecutionRecord) -> StoreResult<()>;

    fn list_by_status(&self, status: ExecutionStatus) -> StoreResult<Vec<ExecutionRecord>>;
}
