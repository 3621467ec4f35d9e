//! Record store abstraction
//!
//! Records live in collections of a document database. Resolvers and the
//! pagination engine talk to them through [`RecordStore`], which exposes
//! find/count/insert/replace/delete over a small predicate language
//! ([`Filter`]) and a single-field [`Sort`].

mod filter;
pub mod memory;
#[cfg(feature = "mongo")]
pub mod mongo;

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use filter::{Clause, Filter};
pub use memory::{MemoryCollection, MemorySequences};

use crate::models::{Issue, Label, Milestone, Repository, User};

/// Document field names shared by the models, filters and sorts.
pub mod fields {
    pub const ID: &str = "_id";
    pub const ASSIGNEES: &str = "assignees";
    pub const BODY: &str = "body";
    pub const CLOSED: &str = "closed";
    pub const CREATED_AT: &str = "createdAt";
    pub const CREATED_BY: &str = "createdBy";
    pub const EMAIL: &str = "email";
    pub const LABELS: &str = "labels";
    pub const MILESTONE: &str = "milestone";
    pub const NAME: &str = "name";
    pub const NUMBER: &str = "number";
    pub const OWNER_ID: &str = "ownerId";
    pub const REPOSITORY_ID: &str = "repositoryId";
    pub const TITLE: &str = "title";
    pub const UPDATED_AT: &str = "updatedAt";
    pub const USERNAME: &str = "username";
    pub const VISIBILITY: &str = "visibility";
}

/// Store errors
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Identifier of a stored record (hex ObjectId).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Fresh identifier, increasing in creation order.
    pub fn generate() -> Self {
        Self(bson::oid::ObjectId::new().to_hex())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<async_graphql::ID> for RecordId {
    fn from(value: async_graphql::ID) -> Self {
        Self(value.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A field value as seen by filters and sorts.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Id(RecordId),
    List(Vec<Value>),
}

impl Value {
    /// Compares two scalar values of the same kind.
    ///
    /// `Null` sorts before everything else; values of different kinds are
    /// incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Id(a), Value::Id(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

impl From<RecordId> for Value {
    fn from(value: RecordId) -> Self {
        Value::Id(value)
    }
}

impl From<&RecordId> for Value {
    fn from(value: &RecordId) -> Self {
        Value::Id(value.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Single-field sort. Ties are broken by `_id` ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: &'static str,
    pub direction: Direction,
}

impl Sort {
    pub fn new(field: &'static str, direction: Direction) -> Self {
        Self { field, direction }
    }

    /// Orders two records by this sort, then by id.
    pub fn compare<R: Record>(&self, a: &R, b: &R) -> Ordering {
        let left = a.field(self.field).unwrap_or(Value::Null);
        let right = b.field(self.field).unwrap_or(Value::Null);
        let ordering = left.compare(&right).unwrap_or(Ordering::Equal);
        let ordering = match self.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        };
        ordering.then_with(|| a.id().cmp(b.id()))
    }
}

/// A document stored in a named collection.
pub trait Record:
    Clone + fmt::Debug + Send + Sync + Unpin + Serialize + DeserializeOwned + 'static
{
    /// Collection name.
    const COLLECTION: &'static str;

    /// Field sets that must be unique across the collection.
    const UNIQUE: &'static [&'static [&'static str]] = &[];

    fn id(&self) -> &RecordId;

    /// Value of a document field, `None` when the record has no such field.
    fn field(&self, name: &str) -> Option<Value>;
}

/// Find/create/update/delete over one collection.
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// Records matching `filter`, ordered by `sort`, capped at `limit`.
    async fn find(
        &self,
        filter: &Filter,
        sort: Option<Sort>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<R>>;

    /// Number of records matching `filter`.
    async fn count(&self, filter: &Filter) -> StoreResult<u64>;

    async fn insert(&self, record: &R) -> StoreResult<()>;

    /// Replaces the record with the same id. Returns `false` if none matched.
    async fn replace(&self, record: &R) -> StoreResult<bool>;

    /// Deletes by id. Returns `false` if nothing was deleted.
    async fn delete(&self, id: &RecordId) -> StoreResult<bool>;

    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<R>> {
        Ok(self.find(filter, None, Some(1)).await?.into_iter().next())
    }

    async fn find_by_id(&self, id: &RecordId) -> StoreResult<Option<R>> {
        self.find_one(&Filter::all().and(Clause::eq(fields::ID, id)))
            .await
    }

    async fn exists(&self, filter: &Filter) -> StoreResult<bool> {
        Ok(!self.find(filter, None, Some(1)).await?.is_empty())
    }
}

/// Named monotonically increasing counters.
#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Increments the counter and returns the new value. Starts at 1.
    async fn next_value(&self, key: &str) -> StoreResult<i64>;
}

/// Handles to every collection the API uses.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn RecordStore<User>>,
    pub repositories: Arc<dyn RecordStore<Repository>>,
    pub issues: Arc<dyn RecordStore<Issue>>,
    pub labels: Arc<dyn RecordStore<Label>>,
    pub milestones: Arc<dyn RecordStore<Milestone>>,
    pub sequences: Arc<dyn SequenceStore>,
}

impl Stores {
    /// Stores kept in process memory.
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(MemoryCollection::<User>::new()),
            repositories: Arc::new(MemoryCollection::<Repository>::new()),
            issues: Arc::new(MemoryCollection::<Issue>::new()),
            labels: Arc::new(MemoryCollection::<Label>::new()),
            milestones: Arc::new(MemoryCollection::<Milestone>::new()),
            sequences: Arc::new(MemorySequences::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_compare_null_first() {
        assert_eq!(Value::Null.compare(&Value::Int(1)), Some(Ordering::Less));
        assert_eq!(Value::Int(2).compare(&Value::Int(1)), Some(Ordering::Greater));
        assert_eq!(Value::Int(2).compare(&Value::Text("2".into())), None);
    }

    #[test]
    fn test_option_into_value() {
        let missing: Option<String> = None;
        assert_eq!(Value::from(missing), Value::Null);
        assert_eq!(Value::from(Some(3i64)), Value::Int(3));
    }

    #[test]
    fn test_generated_ids_increase() {
        let a = RecordId::generate();
        let b = RecordId::generate();
        assert!(a < b);
        assert_eq!(a.as_str().len(), 24);
    }
}
