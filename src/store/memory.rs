//! In-process record store
//!
//! Backs tests and local development. Follows document-store semantics for
//! filters and sorts so that behavior matches the MongoDB backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use super::{Filter, Record, RecordId, RecordStore, SequenceStore, Sort, StoreError, StoreResult};

/// A collection held in memory.
pub struct MemoryCollection<R: Record> {
    records: RwLock<Vec<R>>,
}

impl<R: Record> MemoryCollection<R> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    fn check_unique(records: &[R], candidate: &R) -> StoreResult<()> {
        for key in R::UNIQUE {
            let clash = records.iter().any(|existing| {
                existing.id() != candidate.id()
                    && key
                        .iter()
                        .all(|field| existing.field(field) == candidate.field(field))
            });
            if clash {
                return Err(StoreError::Duplicate(format!(
                    "{} ({})",
                    R::COLLECTION,
                    key.join(", ")
                )));
            }
        }
        Ok(())
    }
}

impl<R: Record> Default for MemoryCollection<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for MemoryCollection<R> {
    async fn find(
        &self,
        filter: &Filter,
        sort: Option<Sort>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<R>> {
        let records = self.records.read().await;
        let mut found: Vec<R> = records
            .iter()
            .filter(|record| filter.matches(*record))
            .cloned()
            .collect();

        if let Some(sort) = sort {
            found.sort_by(|a, b| sort.compare(a, b));
        }
        if let Some(limit) = limit {
            found.truncate(limit);
        }

        Ok(found)
    }

    async fn count(&self, filter: &Filter) -> StoreResult<u64> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|record| filter.matches(*record)).count() as u64)
    }

    async fn insert(&self, record: &R) -> StoreResult<()> {
        let mut records = self.records.write().await;
        if records.iter().any(|existing| existing.id() == record.id()) {
            return Err(StoreError::Duplicate(format!(
                "{} (_id {})",
                R::COLLECTION,
                record.id()
            )));
        }
        Self::check_unique(&records, record)?;
        records.push(record.clone());
        Ok(())
    }

    async fn replace(&self, record: &R) -> StoreResult<bool> {
        let mut records = self.records.write().await;
        Self::check_unique(&records, record)?;
        match records.iter_mut().find(|existing| existing.id() == record.id()) {
            Some(slot) => {
                *slot = record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &RecordId) -> StoreResult<bool> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|record| record.id() != id);
        Ok(records.len() != before)
    }
}

/// Counters held in memory.
#[derive(Default)]
pub struct MemorySequences {
    values: Mutex<HashMap<String, i64>>,
}

impl MemorySequences {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SequenceStore for MemorySequences {
    async fn next_value(&self, key: &str) -> StoreResult<i64> {
        let mut values = self.values.lock().await;
        let value = values.entry(key.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }
}
