//! Stored documents
//!
//! Field names follow the document layout (`camelCase`, `_id`). Timestamps
//! are kept at millisecond precision, the resolution of BSON dates and of
//! the canonical cursor form.

use std::sync::atomic::{AtomicI64, Ordering};

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{fields, Record, RecordId, Value};

/// Last millisecond handed out by [`now`].
static LAST_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Current time at millisecond precision, strictly increasing within the
/// process: two calls never return the same instant, even inside one
/// millisecond.
pub fn now() -> DateTime<Utc> {
    let wall = Utc::now().timestamp_millis();
    let previous = LAST_MILLIS
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| Some(wall.max(last + 1)))
        .unwrap_or(wall);
    DateTime::from_timestamp_millis(wall.max(previous + 1))
        .unwrap_or_else(|| Utc::now().trunc_subsecs(3))
}

/// `Option` counterpart of [`chrono_datetime_as_bson_datetime`].
mod opt_bson_datetime {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        (*value).map(bson::DateTime::from_chrono).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(Option::<bson::DateTime>::deserialize(deserializer)?.map(|value| value.to_chrono()))
    }
}

/// An account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Argon2 PHC string.
    pub password: String,
    pub username: String,
}

impl Record for User {
    const COLLECTION: &'static str = "users";
    const UNIQUE: &'static [&'static [&'static str]] = &[&[fields::USERNAME], &[fields::EMAIL]];

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            fields::ID => Some(Value::from(&self.id)),
            fields::EMAIL => Some(Value::from(self.email.as_str())),
            fields::NAME => Some(Value::from(self.name.clone())),
            fields::USERNAME => Some(Value::from(self.username.as_str())),
            _ => None,
        }
    }
}

/// Who can see a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    Private,
    Public,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Private => "PRIVATE",
            Visibility::Public => "PUBLIC",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    #[serde(rename = "_id")]
    pub id: RecordId,
    #[serde(default)]
    pub description: Option<String>,
    pub name: String,
    pub owner_id: RecordId,
    pub visibility: Visibility,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Record for Repository {
    const COLLECTION: &'static str = "repositories";
    const UNIQUE: &'static [&'static [&'static str]] = &[&[fields::OWNER_ID, fields::NAME]];

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            fields::ID => Some(Value::from(&self.id)),
            fields::NAME => Some(Value::from(self.name.as_str())),
            fields::OWNER_ID => Some(Value::from(&self.owner_id)),
            fields::VISIBILITY => Some(Value::from(self.visibility.as_str())),
            fields::CREATED_AT => Some(Value::from(self.created_at)),
            fields::UPDATED_AT => Some(Value::from(self.updated_at)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    #[serde(rename = "_id")]
    pub id: RecordId,
    #[serde(default)]
    pub assignees: Vec<RecordId>,
    #[serde(default)]
    pub body: Option<String>,
    pub closed: bool,
    #[serde(default, with = "opt_bson_datetime")]
    pub closed_at: Option<DateTime<Utc>>,
    pub created_by: RecordId,
    #[serde(default)]
    pub labels: Vec<RecordId>,
    #[serde(default)]
    pub milestone: Option<RecordId>,
    pub number: i64,
    pub repository_id: RecordId,
    pub title: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Record for Issue {
    const COLLECTION: &'static str = "issues";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            fields::ID => Some(Value::from(&self.id)),
            fields::ASSIGNEES => Some(Value::List(
                self.assignees.iter().map(Value::from).collect(),
            )),
            fields::BODY => Some(Value::from(self.body.clone())),
            fields::CLOSED => Some(Value::from(self.closed)),
            fields::CREATED_BY => Some(Value::from(&self.created_by)),
            fields::LABELS => Some(Value::List(self.labels.iter().map(Value::from).collect())),
            fields::MILESTONE => Some(Value::from(self.milestone.clone())),
            fields::NUMBER => Some(Value::from(self.number)),
            fields::REPOSITORY_ID => Some(Value::from(&self.repository_id)),
            fields::TITLE => Some(Value::from(self.title.as_str())),
            fields::CREATED_AT => Some(Value::from(self.created_at)),
            fields::UPDATED_AT => Some(Value::from(self.updated_at)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    #[serde(rename = "_id")]
    pub id: RecordId,
    /// Six hex digits, no leading `#`.
    pub color: String,
    #[serde(default)]
    pub description: Option<String>,
    pub name: String,
    pub repository_id: RecordId,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Record for Label {
    const COLLECTION: &'static str = "labels";
    const UNIQUE: &'static [&'static [&'static str]] = &[&[fields::REPOSITORY_ID, fields::NAME]];

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            fields::ID => Some(Value::from(&self.id)),
            fields::NAME => Some(Value::from(self.name.as_str())),
            fields::REPOSITORY_ID => Some(Value::from(&self.repository_id)),
            fields::CREATED_AT => Some(Value::from(self.created_at)),
            fields::UPDATED_AT => Some(Value::from(self.updated_at)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub closed: bool,
    #[serde(default, with = "opt_bson_datetime")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "opt_bson_datetime")]
    pub due_on: Option<DateTime<Utc>>,
    pub number: i64,
    pub repository_id: RecordId,
    pub title: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Record for Milestone {
    const COLLECTION: &'static str = "milestones";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            fields::ID => Some(Value::from(&self.id)),
            fields::CLOSED => Some(Value::from(self.closed)),
            fields::NUMBER => Some(Value::from(self.number)),
            fields::REPOSITORY_ID => Some(Value::from(&self.repository_id)),
            fields::TITLE => Some(Value::from(self.title.as_str())),
            fields::CREATED_AT => Some(Value::from(self.created_at)),
            fields::UPDATED_AT => Some(Value::from(self.updated_at)),
            _ => None,
        }
    }
}
