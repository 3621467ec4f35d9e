//! Windowing over a filtered, sorted collection
//!
//! A request is answered with two store queries: the full filtered set,
//! used to place the page within the collection, and the windowed set,
//! narrowed by the cursor comparison and capped at `first`. The two reads
//! are not isolated from each other; a concurrent write between them may
//! show up in one and not the other.

use std::str::FromStr;

use async_graphql::OutputType;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cursor::CursorCodec;
use super::order::SortOrder;
use super::{Connection, Edge};
use crate::store::{Clause, Filter, Record, RecordStore, Value};
use crate::ApiError;

/// How `hasNextPage`, `hasPreviousPage` and `totalCount` are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryStrategy {
    /// Load the full filtered set and locate the page in it.
    #[default]
    FullScan,
    /// Count the set and probe for one record past each end of the page.
    Probe,
}

impl FromStr for BoundaryStrategy {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full-scan" => Ok(BoundaryStrategy::FullScan),
            "probe" => Ok(BoundaryStrategy::Probe),
            other => Err(ApiError::Configuration(format!(
                "unknown boundary strategy '{other}' (expected 'full-scan' or 'probe')"
            ))),
        }
    }
}

/// Page size limits and boundary strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size when `first` is omitted.
    pub default_first: usize,
    /// Largest accepted `first`.
    pub max_first: usize,
    pub strategy: BoundaryStrategy,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_first: 10,
            max_first: 100,
            strategy: BoundaryStrategy::default(),
        }
    }
}

/// The `first` / `after` / `before` arguments of a connection field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Window {
    pub first: Option<i32>,
    pub after: Option<String>,
    pub before: Option<String>,
}

impl Window {
    pub fn new(first: Option<i32>, after: Option<String>, before: Option<String>) -> Self {
        Self {
            first,
            after,
            before,
        }
    }

    /// Validated page size.
    pub fn limit(&self, config: &PaginationConfig) -> crate::Result<usize> {
        let Some(first) = self.first else {
            return Ok(config.default_first);
        };
        let first = usize::try_from(first)
            .map_err(|_| ApiError::Pagination("'first' must be non-negative".to_string()))?;
        if first > config.max_first {
            return Err(ApiError::Pagination(format!(
                "'first' cannot exceed {}",
                config.max_first
            )));
        }
        Ok(first)
    }

    /// The cursor comparison for this window. `before` wins over `after`.
    pub fn boundary(&self, order: &SortOrder) -> crate::Result<Option<Clause>> {
        if let Some(before) = &self.before {
            let value = CursorCodec::decode_value(before, order.key.kind)?;
            return Ok(Some(order.before(value)));
        }
        if let Some(after) = &self.after {
            let value = CursorCodec::decode_value(after, order.key.kind)?;
            return Ok(Some(order.after(value)));
        }
        Ok(None)
    }
}

/// Answers one connection request.
///
/// `filter` selects the records the connection ranges over, `order` sorts
/// them, and `window` picks the page. Cursors hold the ordering value of
/// their record, so a cursor whose record has since changed or vanished
/// still marks a position: the page starts past its value.
pub async fn paginate<R>(
    store: &dyn RecordStore<R>,
    config: &PaginationConfig,
    filter: Filter,
    order: SortOrder,
    window: &Window,
) -> crate::Result<Connection<R>>
where
    R: Record + OutputType,
    Edge<R>: OutputType,
{
    let limit = window.limit(config)?;
    let boundary = window.boundary(&order)?;
    let sort = order.sort();

    let connection = match config.strategy {
        BoundaryStrategy::FullScan => {
            let all = store.find(&filter, Some(sort), None).await?;
            let total = count_of(all.len());
            if limit == 0 {
                Connection::empty(total)
            } else {
                let windowed = store
                    .find(&filter.and_opt(boundary), Some(sort), Some(limit))
                    .await?;
                let (has_next, has_previous) = match (windowed.first(), windowed.last()) {
                    (Some(first), Some(last)) => {
                        let start = position(&all, first);
                        let end = position(&all, last);
                        (
                            end.is_some_and(|end| end + 1 < all.len()),
                            start.is_some_and(|start| start > 0),
                        )
                    }
                    _ => (false, false),
                };
                Connection::new(edges(windowed, &order)?, has_next, has_previous, total)
            }
        }
        BoundaryStrategy::Probe => {
            let total = count_of(store.count(&filter).await?);
            if limit == 0 {
                Connection::empty(total)
            } else {
                let windowed = store
                    .find(&filter.clone().and_opt(boundary), Some(sort), Some(limit))
                    .await?;
                let (has_next, has_previous) = match (windowed.first(), windowed.last()) {
                    (Some(first), Some(last)) => {
                        let past_end = order.after(ordering_value(last, &order)?);
                        let before_start = order.before(ordering_value(first, &order)?);
                        (
                            store.exists(&filter.clone().and(past_end)).await?,
                            store.exists(&filter.and(before_start)).await?,
                        )
                    }
                    _ => (false, false),
                };
                Connection::new(edges(windowed, &order)?, has_next, has_previous, total)
            }
        }
    };

    debug!(
        collection = R::COLLECTION,
        field = order.key.field,
        returned = connection.edges.len(),
        total = connection.total_count,
        "Paginated connection"
    );
    Ok(connection)
}

fn position<R: Record>(all: &[R], record: &R) -> Option<usize> {
    all.iter().position(|candidate| candidate.id() == record.id())
}

fn count_of<N: TryInto<i64>>(n: N) -> i64 {
    n.try_into().unwrap_or(i64::MAX)
}

fn ordering_value<R: Record>(record: &R, order: &SortOrder) -> crate::Result<Value> {
    record.field(order.key.field).ok_or_else(|| {
        ApiError::Internal(format!(
            "{} has no ordering field '{}'",
            R::COLLECTION,
            order.key.field
        ))
    })
}

fn edges<R>(records: Vec<R>, order: &SortOrder) -> crate::Result<Vec<Edge<R>>>
where
    R: Record + OutputType,
{
    records
        .into_iter()
        .map(|node| {
            let value = ordering_value(&node, order)?;
            let cursor = CursorCodec::encode_value(&value).ok_or_else(|| {
                ApiError::Internal(format!(
                    "'{}' of {} cannot be used as a cursor",
                    order.key.field,
                    node.id()
                ))
            })?;
            Ok(Edge { cursor, node })
        })
        .collect()
}
