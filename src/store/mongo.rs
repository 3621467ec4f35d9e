//! MongoDB record store

use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use tracing::{debug, info};

use super::{
    fields, Clause, Direction, Filter, Record, RecordId, RecordStore, SequenceStore, Sort,
    StoreError, StoreResult, Stores, Value,
};

const DUPLICATE_KEY: i32 = 11000;
const SEQUENCES: &str = "sequence_numbers";

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        if let ErrorKind::Write(WriteFailure::WriteError(ref write)) = *err.kind {
            if write.code == DUPLICATE_KEY {
                return StoreError::Duplicate(write.message.clone());
            }
        }
        StoreError::Backend(err.to_string())
    }
}

/// Connects to MongoDB and prepares every collection.
pub async fn connect(uri: &str, database: &str) -> StoreResult<Stores> {
    let client = Client::with_uri_str(uri).await?;
    let db = client.database(database);
    db.run_command(doc! { "ping": 1 }).await?;
    info!(database, "Connected to MongoDB");

    Ok(Stores {
        users: Arc::new(MongoCollection::open(&db).await?),
        repositories: Arc::new(MongoCollection::open(&db).await?),
        issues: Arc::new(MongoCollection::open(&db).await?),
        labels: Arc::new(MongoCollection::open(&db).await?),
        milestones: Arc::new(MongoCollection::open(&db).await?),
        sequences: Arc::new(MongoSequences {
            inner: db.collection(SEQUENCES),
        }),
    })
}

/// A typed MongoDB collection.
pub struct MongoCollection<R: Record> {
    inner: Collection<R>,
}

impl<R: Record> MongoCollection<R> {
    /// Opens the collection and creates its unique indexes.
    pub async fn open(db: &Database) -> StoreResult<Self> {
        let inner = db.collection::<R>(R::COLLECTION);
        for key in R::UNIQUE {
            let keys: Document = key
                .iter()
                .map(|field| (field.to_string(), Bson::Int32(1)))
                .collect();
            let index = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build();
            inner.create_index(index).await?;
        }
        debug!(collection = R::COLLECTION, "Collection ready");
        Ok(Self { inner })
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for MongoCollection<R> {
    async fn find(
        &self,
        filter: &Filter,
        sort: Option<Sort>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<R>> {
        let mut action = self.inner.find(filter_document(filter));
        if let Some(sort) = sort {
            action = action.sort(sort_document(sort));
        }
        if let Some(limit) = limit {
            action = action.limit(limit as i64);
        }
        let cursor = action.await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count(&self, filter: &Filter) -> StoreResult<u64> {
        Ok(self.inner.count_documents(filter_document(filter)).await?)
    }

    async fn insert(&self, record: &R) -> StoreResult<()> {
        self.inner.insert_one(record).await?;
        Ok(())
    }

    async fn replace(&self, record: &R) -> StoreResult<bool> {
        let result = self
            .inner
            .replace_one(doc! { fields::ID: record.id().as_str() }, record)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, id: &RecordId) -> StoreResult<bool> {
        let result = self
            .inner
            .delete_one(doc! { fields::ID: id.as_str() })
            .await?;
        Ok(result.deleted_count > 0)
    }
}

/// Counters kept in the `sequence_numbers` collection.
pub struct MongoSequences {
    inner: Collection<Document>,
}

#[async_trait]
impl SequenceStore for MongoSequences {
    async fn next_value(&self, key: &str) -> StoreResult<i64> {
        let updated = self
            .inner
            .find_one_and_update(doc! { "entity": key }, doc! { "$inc": { "value": 1_i64 } })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| StoreError::Backend(format!("sequence {key} was not created")))?;

        match updated.get("value") {
            Some(Bson::Int64(value)) => Ok(*value),
            Some(Bson::Int32(value)) => Ok(i64::from(*value)),
            other => Err(StoreError::Serialization(format!(
                "sequence {key} holds {other:?}"
            ))),
        }
    }
}

/// Translates a filter into a MongoDB query document.
pub fn filter_document(filter: &Filter) -> Document {
    let clauses: Vec<Bson> = filter
        .clauses()
        .iter()
        .map(|clause| Bson::Document(clause_document(clause)))
        .collect();

    match clauses.len() {
        0 => Document::new(),
        1 => match clauses.into_iter().next() {
            Some(Bson::Document(single)) => single,
            _ => Document::new(),
        },
        _ => doc! { "$and": clauses },
    }
}

fn clause_document(clause: &Clause) -> Document {
    match clause {
        Clause::Eq(field, value) => doc! { *field: to_bson(value) },
        Clause::In(field, values) => {
            let values: Vec<Bson> = values.iter().map(to_bson).collect();
            doc! { *field: { "$in": values } }
        }
        Clause::Gt(field, value) => doc! { *field: { "$gt": to_bson(value) } },
        Clause::Lt(field, value) => doc! { *field: { "$lt": to_bson(value) } },
        Clause::Contains(field, needle) => doc! { *field: { "$regex": regex::escape(needle) } },
    }
}

fn sort_document(sort: Sort) -> Document {
    let direction = match sort.direction {
        Direction::Asc => 1,
        Direction::Desc => -1,
    };
    doc! { sort.field: direction, fields::ID: 1 }
}

fn to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(value) => Bson::Boolean(*value),
        Value::Int(value) => Bson::Int64(*value),
        Value::Text(value) => Bson::String(value.clone()),
        Value::Timestamp(value) => Bson::DateTime(mongodb::bson::DateTime::from_chrono(*value)),
        Value::Id(id) => Bson::String(id.as_str().to_string()),
        Value::List(values) => Bson::Array(values.iter().map(to_bson).collect()),
    }
}
