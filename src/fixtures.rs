//! Record builders shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_graphql::{Request, Response};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::config::AppConfig;
use crate::models::{Issue, Label, Milestone, Repository, User, Visibility};
use crate::schema::{build_schema, prepare_request, TrackerSchema};
use crate::store::{
    Filter, Record, RecordId, RecordStore, Sort, StoreError, StoreResult, Stores,
};

/// `minute` minutes after a fixed epoch.
pub fn at(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minute)
}

pub fn user(username: &str) -> User {
    User {
        id: RecordId::generate(),
        email: format!("{username}@example.com"),
        name: None,
        password: String::new(),
        username: username.to_string(),
    }
}

pub fn repository(owner: &RecordId, name: &str, created_at: DateTime<Utc>) -> Repository {
    Repository {
        id: RecordId::generate(),
        description: None,
        name: name.to_string(),
        owner_id: owner.clone(),
        visibility: Visibility::Public,
        created_at,
        updated_at: created_at,
    }
}

/// Issue `number` in a throwaway repository.
pub fn issue(number: i64, created_at: DateTime<Utc>) -> Issue {
    issue_in(&RecordId::from("repository"), &RecordId::from("author"), number, created_at)
}

pub fn issue_in(
    repository: &RecordId,
    author: &RecordId,
    number: i64,
    created_at: DateTime<Utc>,
) -> Issue {
    Issue {
        id: RecordId::generate(),
        assignees: Vec::new(),
        body: None,
        closed: false,
        closed_at: None,
        created_by: author.clone(),
        labels: Vec::new(),
        milestone: None,
        number,
        repository_id: repository.clone(),
        title: format!("Issue {number}"),
        created_at,
        updated_at: created_at,
    }
}

pub fn label(repository: &RecordId, name: &str, created_at: DateTime<Utc>) -> Label {
    Label {
        id: RecordId::generate(),
        color: "d73a4a".to_string(),
        description: None,
        name: name.to_string(),
        repository_id: repository.clone(),
        created_at,
        updated_at: created_at,
    }
}

pub fn milestone(repository: &RecordId, number: i64, created_at: DateTime<Utc>) -> Milestone {
    Milestone {
        id: RecordId::generate(),
        closed: false,
        closed_at: None,
        description: None,
        due_on: None,
        number,
        repository_id: repository.clone(),
        title: format!("Milestone {number}"),
        created_at,
        updated_at: created_at,
    }
}

/// A user owning one repository, both stored.
pub async fn owner_with_repository(stores: &Stores) -> (User, Repository) {
    let owner = user("octocat");
    stores.users.insert(&owner).await.unwrap();
    let repository = repository(&owner.id, "hello-world", at(0));
    stores.repositories.insert(&repository).await.unwrap();
    (owner, repository)
}

/// Stores `count` issues numbered from 1, one minute apart.
pub async fn seed_issues(
    stores: &Stores,
    repository: &Repository,
    author: &User,
    count: i64,
) -> Vec<Issue> {
    let mut issues = Vec::new();
    for number in 1..=count {
        let issue = issue_in(&repository.id, &author.id, number, at(number));
        stores.issues.insert(&issue).await.unwrap();
        issues.push(issue);
    }
    issues
}

pub fn schema(stores: &Stores) -> TrackerSchema {
    build_schema(stores.clone(), &AppConfig::default())
}

/// Runs `query` as `viewer`, or anonymously.
pub async fn execute(
    schema: &TrackerSchema,
    stores: &Stores,
    viewer: Option<&User>,
    query: &str,
) -> Response {
    schema
        .execute(prepare_request(Request::new(query), stores, viewer.cloned()))
        .await
}

/// Runs `query` and returns its data, failing on any error.
pub async fn data(
    schema: &TrackerSchema,
    stores: &Stores,
    viewer: Option<&User>,
    query: &str,
) -> serde_json::Value {
    let response = execute(schema, stores, viewer, query).await;
    assert!(response.errors.is_empty(), "unexpected errors: {:?}", response.errors);
    response.data.into_json().unwrap()
}

/// `extensions.code` of the first error.
pub fn error_code(response: &Response) -> Option<String> {
    let code = response.errors.first()?.extensions.as_ref()?.get("code")?;
    match code {
        async_graphql::Value::String(code) => Some(code.clone()),
        _ => None,
    }
}

/// Wraps a store and counts the `find` queries that reach it.
pub struct CountingStore<R: Record> {
    inner: Arc<dyn RecordStore<R>>,
    finds: AtomicUsize,
}

impl<R: Record> CountingStore<R> {
    pub fn new(inner: Arc<dyn RecordStore<R>>) -> Self {
        Self {
            inner,
            finds: AtomicUsize::new(0),
        }
    }

    pub fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for CountingStore<R> {
    async fn find(
        &self,
        filter: &Filter,
        sort: Option<Sort>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<R>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.inner.find(filter, sort, limit).await
    }

    async fn count(&self, filter: &Filter) -> StoreResult<u64> {
        self.inner.count(filter).await
    }

    async fn insert(&self, record: &R) -> StoreResult<()> {
        self.inner.insert(record).await
    }

    async fn replace(&self, record: &R) -> StoreResult<bool> {
        self.inner.replace(record).await
    }

    async fn delete(&self, id: &RecordId) -> StoreResult<bool> {
        self.inner.delete(id).await
    }
}

/// A store whose backend is down: every operation fails.
pub struct FailingStore;

impl FailingStore {
    fn down<T>() -> StoreResult<T> {
        Err(StoreError::Backend("connection refused".into()))
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for FailingStore {
    async fn find(&self, _: &Filter, _: Option<Sort>, _: Option<usize>) -> StoreResult<Vec<R>> {
        Self::down()
    }

    async fn count(&self, _: &Filter) -> StoreResult<u64> {
        Self::down()
    }

    async fn insert(&self, _: &R) -> StoreResult<()> {
        Self::down()
    }

    async fn replace(&self, _: &R) -> StoreResult<bool> {
        Self::down()
    }

    async fn delete(&self, _: &RecordId) -> StoreResult<bool> {
        Self::down()
    }
}
