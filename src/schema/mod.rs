//! GraphQL schema definition.
//!
//! Schema-wide data ([`Stores`], [`crate::AuthConfig`],
//! [`crate::PaginationConfig`]) is
//! attached once at build time. Per-request data (the [`Loaders`] and the
//! optional [`Viewer`]) is attached by [`prepare_request`].

pub mod inputs;
mod mutation;
mod objects;
mod query;

use async_graphql::{EmptySubscription, Request, Schema};

pub use mutation::{
    normalize_color, AuthPayload, DeletePayload, IssuePayload, LabelPayload, MilestonePayload,
    MutationRoot, RepositoryPayload,
};
pub use query::QueryRoot;

use crate::auth::Viewer;
use crate::config::AppConfig;
use crate::dataloaders::Loaders;
use crate::models::User;
use crate::store::Stores;

// -----------------------------------------------------------------------------
// Schema Configuration
// -----------------------------------------------------------------------------

/// Maximum query depth.
/// Introspection needs a depth of about 13.
pub const MAX_QUERY_DEPTH: usize = 15;

/// Maximum query complexity score. Each field counts 1 by default.
pub const MAX_QUERY_COMPLEXITY: usize = 500;

pub type TrackerSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

// -----------------------------------------------------------------------------
// Schema Builder
// -----------------------------------------------------------------------------

/// Build the schema over `stores` with depth and complexity limits.
pub fn build_schema(stores: Stores, config: &AppConfig) -> TrackerSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(stores)
        .data(config.auth.clone())
        .data(config.pagination)
        .limit_depth(MAX_QUERY_DEPTH)
        .limit_complexity(MAX_QUERY_COMPLEXITY)
        .finish()
}

/// Attach fresh loaders and the viewer, if any, to a request.
pub fn prepare_request(request: Request, stores: &Stores, viewer: Option<User>) -> Request {
    let request = request.data(Loaders::new(stores));
    match viewer {
        Some(user) => request.data(Viewer(user)),
        None => request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, CountingStore};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_pages_through_fifteen_issues() {
        let stores = Stores::in_memory();
        let schema = fixtures::schema(&stores);
        let (owner, repository) = fixtures::owner_with_repository(&stores).await;
        fixtures::seed_issues(&stores, &repository, &owner, 15).await;

        let page = |after: Option<&str>| {
            let after = after.map(|c| format!(r#", after: "{c}""#)).unwrap_or_default();
            format!(
                r#"{{ repository(owner: "octocat", name: "hello-world") {{
                    issues(first: 10{after}) {{
                        totalCount
                        edges {{ cursor node {{ number }} }}
                        nodes {{ number }}
                        pageInfo {{ hasNextPage hasPreviousPage startCursor endCursor }}
                    }}
                }} }}"#
            )
        };

        let data = fixtures::data(&schema, &stores, Some(&owner), &page(None)).await;
        let issues = &data["repository"]["issues"];
        assert_eq!(issues["totalCount"], 15);
        assert_eq!(issues["edges"].as_array().unwrap().len(), 10);
        assert_eq!(issues["nodes"][0]["number"], 1);
        assert_eq!(issues["nodes"][9]["number"], 10);
        assert_eq!(issues["pageInfo"]["hasNextPage"], true);
        assert_eq!(issues["pageInfo"]["hasPreviousPage"], false);
        assert_eq!(issues["pageInfo"]["startCursor"], issues["edges"][0]["cursor"]);
        let end = issues["pageInfo"]["endCursor"].as_str().unwrap().to_string();

        let data = fixtures::data(&schema, &stores, Some(&owner), &page(Some(&end))).await;
        let issues = &data["repository"]["issues"];
        let numbers: Vec<i64> = issues["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|node| node["number"].as_i64().unwrap())
            .collect();
        assert_eq!(numbers, vec![11, 12, 13, 14, 15]);
        assert_eq!(issues["pageInfo"]["hasNextPage"], false);
        assert_eq!(issues["pageInfo"]["hasPreviousPage"], true);
    }

    #[tokio::test]
    async fn test_repository_connections_require_viewer() {
        let stores = Stores::in_memory();
        let schema = fixtures::schema(&stores);
        fixtures::owner_with_repository(&stores).await;

        let response = fixtures::execute(
            &schema,
            &stores,
            None,
            r#"{ repository(owner: "octocat", name: "hello-world") { name issues { totalCount } } }"#,
        )
        .await;
        assert_eq!(fixtures::error_code(&response).as_deref(), Some("UNAUTHENTICATED"));
    }

    #[tokio::test]
    async fn test_invalid_cursor_is_user_input() {
        let stores = Stores::in_memory();
        let schema = fixtures::schema(&stores);
        let (owner, _) = fixtures::owner_with_repository(&stores).await;

        let response = fixtures::execute(
            &schema,
            &stores,
            Some(&owner),
            r#"{ repository(owner: "octocat", name: "hello-world") { issues(after: "%%%") { totalCount } } }"#,
        )
        .await;
        assert_eq!(fixtures::error_code(&response).as_deref(), Some("BAD_USER_INPUT"));
    }

    #[tokio::test]
    async fn test_viewer_and_name_with_owner() {
        let stores = Stores::in_memory();
        let schema = fixtures::schema(&stores);
        let (owner, _) = fixtures::owner_with_repository(&stores).await;

        let data = fixtures::data(
            &schema,
            &stores,
            Some(&owner),
            r#"{ viewer { login repository(name: "hello-world") { nameWithOwner isPrivate visibility } } }"#,
        )
        .await;
        assert_eq!(
            data["viewer"],
            json!({
                "login": "octocat",
                "repository": {
                    "nameWithOwner": "octocat/hello-world",
                    "isPrivate": false,
                    "visibility": "PUBLIC",
                },
            })
        );

        let response = fixtures::execute(&schema, &stores, None, "{ viewer { login } }").await;
        assert_eq!(fixtures::error_code(&response).as_deref(), Some("UNAUTHENTICATED"));
    }

    #[tokio::test]
    async fn test_unknown_repository_is_null() {
        let stores = Stores::in_memory();
        let schema = fixtures::schema(&stores);
        fixtures::owner_with_repository(&stores).await;

        let data = fixtures::data(
            &schema,
            &stores,
            None,
            r#"{ a: repository(owner: "nobody", name: "hello-world") { name } b: repository(owner: "octocat", name: "missing") { name } }"#,
        )
        .await;
        assert_eq!(data, json!({"a": null, "b": null}));
    }

    #[tokio::test]
    async fn test_milestone_progress() {
        let stores = Stores::in_memory();
        let schema = fixtures::schema(&stores);
        let (owner, repository) = fixtures::owner_with_repository(&stores).await;

        let milestone = fixtures::milestone(&repository.id, 1, fixtures::at(0));
        stores.milestones.insert(&milestone).await.unwrap();
        let empty = fixtures::milestone(&repository.id, 2, fixtures::at(1));
        stores.milestones.insert(&empty).await.unwrap();

        for (number, closed) in [(1, true), (2, false), (3, false), (4, true)] {
            let mut issue =
                fixtures::issue_in(&repository.id, &owner.id, number, fixtures::at(number));
            issue.milestone = Some(milestone.id.clone());
            issue.closed = closed;
            stores.issues.insert(&issue).await.unwrap();
        }

        let data = fixtures::data(
            &schema,
            &stores,
            Some(&owner),
            r#"{ repository(owner: "octocat", name: "hello-world") {
                one: milestone(number: 1) { progressPercentage issues(states: [OPEN]) { totalCount } }
                two: milestone(number: 2) { progressPercentage }
            } }"#,
        )
        .await;
        let repository = &data["repository"];
        assert_eq!(repository["one"]["progressPercentage"], 50.0);
        assert_eq!(repository["one"]["issues"]["totalCount"], 2);
        assert_eq!(repository["two"]["progressPercentage"], 0.0);
    }

    #[tokio::test]
    async fn test_labels_ordered_by_name_descending() {
        let stores = Stores::in_memory();
        let schema = fixtures::schema(&stores);
        let (owner, repository) = fixtures::owner_with_repository(&stores).await;
        for (minute, name) in ["bug", "docs", "enhancement"].into_iter().enumerate() {
            let label = fixtures::label(&repository.id, name, fixtures::at(minute as i64));
            stores.labels.insert(&label).await.unwrap();
        }

        let data = fixtures::data(
            &schema,
            &stores,
            Some(&owner),
            r#"{ repository(owner: "octocat", name: "hello-world") {
                labels(first: 2, orderBy: {field: NAME, direction: DESC}) {
                    nodes { name }
                    pageInfo { hasNextPage }
                }
            } }"#,
        )
        .await;
        assert_eq!(
            data["repository"]["labels"],
            json!({
                "nodes": [{"name": "enhancement"}, {"name": "docs"}],
                "pageInfo": {"hasNextPage": true},
            })
        );
    }

    #[tokio::test]
    async fn test_issue_relations_resolve_through_loaders() {
        let stores = Stores::in_memory();
        let schema = fixtures::schema(&stores);
        let (owner, repository) = fixtures::owner_with_repository(&stores).await;
        let label = fixtures::label(&repository.id, "bug", fixtures::at(0));
        stores.labels.insert(&label).await.unwrap();

        let mut issue = fixtures::issue_in(&repository.id, &owner.id, 1, fixtures::at(1));
        issue.assignees = vec![owner.id.clone()];
        issue.labels = vec![label.id.clone()];
        stores.issues.insert(&issue).await.unwrap();

        let data = fixtures::data(
            &schema,
            &stores,
            Some(&owner),
            r#"{ repository(owner: "octocat", name: "hello-world") {
                issue(number: 1) {
                    assignees { login }
                    createdBy { login }
                    labels { name color }
                    repository { name }
                }
            } }"#,
        )
        .await;
        assert_eq!(
            data["repository"]["issue"],
            json!({
                "assignees": [{"login": "octocat"}],
                "createdBy": {"login": "octocat"},
                "labels": [{"name": "bug", "color": "d73a4a"}],
                "repository": {"name": "hello-world"},
            })
        );
    }

    #[tokio::test]
    async fn test_nested_users_load_in_one_query() {
        let mut stores = Stores::in_memory();
        let counting = Arc::new(CountingStore::new(stores.users.clone()));
        stores.users = counting.clone();
        let (owner, repository) = fixtures::owner_with_repository(&stores).await;
        for number in 1..=10 {
            let author = fixtures::user(&format!("author{number}"));
            stores.users.insert(&author).await.unwrap();
            let issue =
                fixtures::issue_in(&repository.id, &author.id, number, fixtures::at(number));
            stores.issues.insert(&issue).await.unwrap();
        }
        let schema = fixtures::schema(&stores);

        let before = counting.finds();
        let data = fixtures::data(
            &schema,
            &stores,
            Some(&owner),
            r#"{ repository(owner: "octocat", name: "hello-world") {
                issues(first: 10) { nodes { createdBy { login } } }
            } }"#,
        )
        .await;
        let logins: Vec<_> = data["repository"]["issues"]["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|node| node["createdBy"]["login"].as_str().unwrap().to_string())
            .collect();
        let expected: Vec<_> = (1..=10).map(|n| format!("author{n}")).collect();
        assert_eq!(logins, expected);

        // One lookup for the owner by login, one batch for every author.
        assert_eq!(counting.finds() - before, 2);
    }

    #[tokio::test]
    async fn test_query_depth_is_limited() {
        let stores = Stores::in_memory();
        let schema = fixtures::schema(&stores);
        let mut query = String::from("login");
        for _ in 0..MAX_QUERY_DEPTH {
            query = format!("repository(name: \"x\") {{ owner {{ {query} }} }}");
        }
        let query = format!("{{ viewer {{ {query} }} }}");
        let response = fixtures::execute(&schema, &stores, None, &query).await;
        assert!(!response.errors.is_empty());
    }
}
