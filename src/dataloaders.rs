//! DataLoader utilities for batch loading
//!
//! Implements the DataLoader pattern for preventing N+1 query problems.
//! Loads requested by sibling resolvers within one batching window are
//! merged into a single `_id in [...]` query. A fresh set of [`Loaders`] is
//! attached to every GraphQL request, so the cache never outlives the
//! request that filled it.

use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::dataloader::{DataLoader, HashMapCache, Loader};

use crate::models::{Label, Milestone, Repository, User};
use crate::store::{
    fields, Clause, Filter, Record, RecordId, RecordStore, StoreError, StoreResult, Stores,
};

/// Loads records of one collection by id with a single `_id in [...]` query.
pub struct RecordLoader<R: Record> {
    store: Arc<dyn RecordStore<R>>,
}

impl<R: Record> RecordLoader<R> {
    pub fn new(store: Arc<dyn RecordStore<R>>) -> Self {
        Self { store }
    }
}

impl<R: Record> Loader<RecordId> for RecordLoader<R> {
    type Value = R;
    type Error = StoreError;

    /// Keys with no record are left out of the map.
    async fn load(&self, keys: &[RecordId]) -> StoreResult<HashMap<RecordId, R>> {
        let filter = Filter::all().and(Clause::is_in(fields::ID, keys.iter()));
        let records = self.store.find(&filter, None, None).await?;
        Ok(records
            .into_iter()
            .map(|record| (record.id().clone(), record))
            .collect())
    }
}

/// Per-collection loader keyed by record id, caching for the request.
pub type RecordDataLoader<R> = DataLoader<RecordLoader<R>, HashMapCache>;

fn record_loader<R: Record>(store: &Arc<dyn RecordStore<R>>) -> RecordDataLoader<R> {
    DataLoader::with_cache(
        RecordLoader::new(store.clone()),
        tokio::spawn,
        HashMapCache::default(),
    )
}

/// The loaders of one request.
pub struct Loaders {
    pub users: RecordDataLoader<User>,
    pub repositories: RecordDataLoader<Repository>,
    pub labels: RecordDataLoader<Label>,
    pub milestones: RecordDataLoader<Milestone>,
}

impl Loaders {
    pub fn new(stores: &Stores) -> Self {
        Self {
            users: record_loader(&stores.users),
            repositories: record_loader(&stores.repositories),
            labels: record_loader(&stores.labels),
            milestones: record_loader(&stores.milestones),
        }
    }
}

/// Loads records for `ids`, keeping the order of `ids` and skipping ids
/// with no record.
pub async fn load_ordered<R: Record>(
    loader: &RecordDataLoader<R>,
    ids: &[RecordId],
) -> StoreResult<Vec<R>> {
    let mut found = loader.load_many(ids.iter().cloned()).await?;
    Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
}
