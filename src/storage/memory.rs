// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process-local execution store.

use std::collections::HashMap;
use std::sync::RwLock;

use super::{ExecutionStore, StoreError, StoreResult};
use crate::models::{ExecutionRecord, ExecutionStatus};

#[derive(Debug, Default)]
pub struct InMemoryExecutionStore {
    records: RwLock<HashMap<String, ExecutionRecord>>,
}

impl InMemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExecutionStore for InMemoryExecutionStore {
    fn insert_new(&self, record: &ExecutionRecord) -> StoreResult<bool> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        if records.contains_key(&record.id) {
            return Ok(false);
        }
        records.insert(record.id.clone(), record.clone());
        Ok(true)
    }

    fn get(&self, id: &str) -> StoreResult<Option<ExecutionRecord>> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.get(id).cloned())
    }

    fn put(&self, record: &ExecutionRecord) -> StoreResult<()> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn list_by_status(&self, status: ExecutionStatus) -> StoreResult<Vec<ExecutionRecord>> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn insert_new_refuses_duplicates() {
        let store = InMemoryExecutionStore::new();
        let record = ExecutionRecord::processing("a", Utc::now());
        assert!(store.insert_new(&record).unwrap());

        let mut other = record.clone();
        other.error = Some("clobbered".into());
        assert!(!store.insert_new(&other).unwrap());
        assert_eq!(store.get("a").unwrap(), Some(record));
    }

    #[test]
    fn list_by_status_filters() {
        let store = InMemoryExecutionStore::new();
        store.put(&ExecutionRecord::processing("a", Utc::now())).unwrap();
        let mut done = ExecutionRecord::processing("b", Utc::now());
        done.status = ExecutionStatus::Failed;
        done.error = Some("x".into());
        store.put(&done).unwrap();

        let processing = store.list_by_status(ExecutionStatus::Processing).unwrap();
        assert_eq!(processing.len(), 1);
        assert_eq!(processing[0].id, "a");
        assert!(store.get("missing").unwrap().is_none());
    }
}
