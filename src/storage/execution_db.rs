// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded execution database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `executions`: execution id → serialized ExecutionRecord (JSON bytes)

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{ExecutionStore, StoreResult};
use crate::models::{ExecutionRecord, ExecutionStatus};

const EXECUTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("executions");

/// File name of the database inside `DATA_DIR`.
pub const EXECUTIONS_DB_FILE: &str = "executions.redb";

/// Durable execution store.
pub struct RedbExecutionStore {
    db: Database,
}

impl RedbExecutionStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(EXECUTIONS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Open `DATA_DIR/executions.redb`.
    pub fn open_in(data_dir: &Path) -> StoreResult<Self> {
        Self::open(&data_dir.join(EXECUTIONS_DB_FILE))
    }
}

impl ExecutionStore for RedbExecutionStore {
    fn insert_new(&self, record: &ExecutionRecord) -> StoreResult<bool> {
        let json = serde_json::to_vec(record)?;
        let write_txn = self.db.begin_write()?;
        let inserted = {
            let mut table = write_txn.open_table(EXECUTIONS)?;
            if table.get(record.id.as_str())?.is_some() {
                false
            } else {
                table.insert(record.id.as_str(), json.as_slice())?;
                true
            }
        };
        write_txn.commit()?;
        Ok(inserted)
    }

    fn get(&self, id: &str) -> StoreResult<Option<ExecutionRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EXECUTIONS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn put(&self, record: &ExecutionRecord) -> StoreResult<()> {
        let json = serde_json::to_vec(record)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(EXECUTIONS)?;
            table.insert(record.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn list_by_status(&self, status: ExecutionStatus) -> StoreResult<Vec<ExecutionRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EXECUTIONS)?;

        let mut records = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            let record: ExecutionRecord = serde_json::from_slice(entry.1.value())?;
            if record.status == status {
                records.push(record);
            }
        }
        Ok(records)
    }
}
