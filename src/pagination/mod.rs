//! Relay-style cursor pagination
//!
//! Connections page through a filtered collection by the value of one
//! ordering field. See [`paginate`] for the windowing rules.

mod cursor;
mod engine;
mod order;

use async_graphql::{OutputType, SimpleObject};

use crate::models::{Issue, Label, Milestone, Repository};

pub use cursor::{canonical, parse_canonical, CursorCodec};
pub use engine::{paginate, BoundaryStrategy, PaginationConfig, Window};
pub use order::{
    IssueOrderField, KeyKind, LabelOrderField, MilestoneOrderField, Order, OrderDirection,
    OrderField, OrderKey, RepositoryOrderField, SortOrder,
};

/// Page information
#[derive(SimpleObject, Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// Edge in a connection
#[derive(SimpleObject, Debug, Clone)]
#[graphql(concrete(name = "IssueEdge", params(Issue)))]
#[graphql(concrete(name = "LabelEdge", params(Label)))]
#[graphql(concrete(name = "MilestoneEdge", params(Milestone)))]
#[graphql(concrete(name = "RepositoryEdge", params(Repository)))]
pub struct Edge<T: OutputType> {
    /// Opaque position of the node, usable as `after` or `before`.
    pub cursor: String,
    pub node: T,
}

/// Connection (paginated result)
#[derive(SimpleObject, Debug, Clone)]
#[graphql(concrete(name = "IssueConnection", params(Issue)))]
#[graphql(concrete(name = "LabelConnection", params(Label)))]
#[graphql(concrete(name = "MilestoneConnection", params(Milestone)))]
#[graphql(concrete(name = "RepositoryConnection", params(Repository)))]
pub struct Connection<T: OutputType>
where
    Edge<T>: OutputType,
{
    pub edges: Vec<Edge<T>>,
    /// The nodes of `edges`, without cursors.
    pub nodes: Vec<T>,
    pub page_info: PageInfo,
    /// Number of records matching the filter, ignoring the window.
    pub total_count: i64,
}

impl<T: OutputType + Clone> Connection<T>
where
    Edge<T>: OutputType,
{
    /// Create new connection
    pub fn new(edges: Vec<Edge<T>>, has_next: bool, has_previous: bool, total_count: i64) -> Self {
        let start_cursor = edges.first().map(|e| e.cursor.clone());
        let end_cursor = edges.last().map(|e| e.cursor.clone());
        let nodes = edges.iter().map(|e| e.node.clone()).collect();

        Self {
            edges,
            nodes,
            page_info: PageInfo {
                has_next_page: has_next,
                has_previous_page: has_previous,
                start_cursor,
                end_cursor,
            },
            total_count,
        }
    }

    /// Create empty connection
    pub fn empty(total_count: i64) -> Self {
        Self {
            edges: Vec::new(),
            nodes: Vec::new(),
            page_info: PageInfo::default(),
            total_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_connection_creation() {
        let edges = vec![
            Edge {
                cursor: CursorCodec::encode("1"),
                node: fixtures::issue(1, fixtures::at(1)),
            },
            Edge {
                cursor: CursorCodec::encode("2"),
                node: fixtures::issue(2, fixtures::at(2)),
            },
        ];
        let conn = Connection::new(edges, true, false, 5);
        assert_eq!(conn.edges.len(), 2);
        assert_eq!(conn.nodes.len(), 2);
        assert!(conn.page_info.has_next_page);
        assert!(!conn.page_info.has_previous_page);
        assert_eq!(conn.page_info.start_cursor.as_deref(), Some("MQ=="));
        assert_eq!(conn.page_info.end_cursor.as_deref(), Some("Mg=="));
        assert_eq!(conn.total_count, 5);
    }

    #[test]
    fn test_empty_connection() {
        let conn = Connection::<Issue>::empty(0);
        assert!(conn.edges.is_empty());
        assert_eq!(conn.page_info, PageInfo::default());
        assert_eq!(conn.page_info.start_cursor, None);
    }
}
