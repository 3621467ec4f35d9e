//! GraphQL objects over the stored documents
//!
//! Connection fields build a store [`Filter`] for their scope and hand it
//! to [`paginate`] together with the requested order and window.

use async_graphql::{Context, Object, Result, ResultExt, ID};

use super::inputs::{
    IssueFilters, IssueState, MilestoneState, RepositoryPrivacy, RepositoryVisibility,
};
use crate::auth::require_viewer;
use crate::dataloaders::{load_ordered, Loaders};
use crate::models::{Issue, Label, Milestone, Repository, User, Visibility};
use crate::pagination::{
    paginate, Connection, IssueOrderField, LabelOrderField, MilestoneOrderField, Order, SortOrder,
    PaginationConfig, RepositoryOrderField, Window,
};
use crate::store::{fields, Clause, Filter, RecordId, Stores};
use crate::types::DateTime;

/// Arguments of an issue connection field.
pub(crate) struct IssueArgs {
    pub window: Window,
    pub filter_by: Option<IssueFilters>,
    pub labels: Option<Vec<String>>,
    pub order_by: Option<Order<IssueOrderField>>,
    pub states: Option<Vec<IssueState>>,
}

/// Id of the user with `login`, as a one-element or empty list.
async fn ids_for_login(stores: &Stores, login: &str) -> Result<Vec<RecordId>> {
    let user = stores
        .users
        .find_one(&Filter::all().and(Clause::eq(fields::USERNAME, login)))
        .await
        .extend()?;
    Ok(user.map(|user| user.id).into_iter().collect())
}

/// Narrows `base` by the issue connection arguments.
///
/// Label names are resolved to ids, within `label_scope` when given. A
/// login that names no user makes the filter match nothing.
pub(crate) async fn issue_filter(
    stores: &Stores,
    base: Filter,
    label_scope: Option<&RecordId>,
    args: &IssueArgs,
) -> Result<Filter> {
    let mut filter = base;

    if let Some(states) = &args.states {
        filter = filter.and(Clause::is_in(
            fields::CLOSED,
            states.iter().map(|state| state.is_closed()),
        ));
    }

    if let Some(names) = &args.labels {
        let label_filter = Filter::all()
            .and(Clause::is_in(fields::NAME, names.iter().map(String::as_str)))
            .and_opt(label_scope.map(|repository| Clause::eq(fields::REPOSITORY_ID, repository)));
        let labels = stores.labels.find(&label_filter, None, None).await.extend()?;
        filter = filter.and(Clause::is_in(
            fields::LABELS,
            labels.into_iter().map(|label| label.id),
        ));
    }

    if let Some(filter_by) = &args.filter_by {
        if let Some(login) = &filter_by.assignee {
            let ids = ids_for_login(stores, login).await?;
            filter = filter.and(Clause::is_in(fields::ASSIGNEES, ids));
        }
        if let Some(login) = &filter_by.created_by {
            let ids = ids_for_login(stores, login).await?;
            filter = filter.and(Clause::is_in(fields::CREATED_BY, ids));
        }
        if let Some(login) = &filter_by.mentioned {
            if ids_for_login(stores, login).await?.is_empty() {
                filter = filter.and(Clause::is_in(fields::ID, Vec::<RecordId>::new()));
            } else {
                filter = filter.and(Clause::contains(fields::BODY, format!("@{login}")));
            }
        }
    }

    Ok(filter)
}

async fn issue_connection(
    ctx: &Context<'_>,
    base: Filter,
    label_scope: Option<&RecordId>,
    args: IssueArgs,
) -> Result<Connection<Issue>> {
    let stores = ctx.data::<Stores>()?;
    let config = ctx.data::<PaginationConfig>()?;
    let filter = issue_filter(stores, base, label_scope, &args).await?;
    paginate(
        stores.issues.as_ref(),
        config,
        filter,
        SortOrder::resolve(args.order_by.as_ref()),
        &args.window,
    )
    .await
    .extend()
}

fn state_clause(closed: Option<Vec<bool>>) -> Option<Clause> {
    closed.map(|closed| Clause::is_in(fields::CLOSED, closed))
}

#[Object]
impl User {
    async fn email(&self) -> &str {
        &self.email
    }

    async fn id(&self) -> ID {
        ID(self.id.to_string())
    }

    /// Issues created by this user.
    async fn issues(
        &self,
        ctx: &Context<'_>,
        after: Option<String>,
        before: Option<String>,
        filter_by: Option<IssueFilters>,
        first: Option<i32>,
        labels: Option<Vec<String>>,
        order_by: Option<Order<IssueOrderField>>,
        states: Option<Vec<IssueState>>,
    ) -> Result<Connection<Issue>> {
        let args = IssueArgs {
            window: Window::new(first, after, before),
            filter_by,
            labels,
            order_by,
            states,
        };
        let base = Filter::all().and(Clause::eq(fields::CREATED_BY, &self.id));
        issue_connection(ctx, base, None, args).await
    }

    /// The username used to log in.
    async fn login(&self) -> &str {
        &self.username
    }

    async fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Repositories owned by this user.
    async fn repositories(
        &self,
        ctx: &Context<'_>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        order_by: Option<Order<RepositoryOrderField>>,
        privacy: Option<RepositoryPrivacy>,
    ) -> Result<Connection<Repository>> {
        let stores = ctx.data::<Stores>()?;
        let config = ctx.data::<PaginationConfig>()?;
        let filter = Filter::all()
            .and(Clause::eq(fields::OWNER_ID, &self.id))
            .and_opt(privacy.map(|privacy| {
                Clause::eq(fields::VISIBILITY, Visibility::from(privacy).as_str())
            }));
        paginate(
            stores.repositories.as_ref(),
            config,
            filter,
            SortOrder::resolve(order_by.as_ref()),
            &Window::new(first, after, before),
        )
        .await
        .extend()
    }

    async fn repository(&self, ctx: &Context<'_>, name: String) -> Result<Option<Repository>> {
        let stores = ctx.data::<Stores>()?;
        let filter = Filter::all()
            .and(Clause::eq(fields::OWNER_ID, &self.id))
            .and(Clause::eq(fields::NAME, name));
        stores.repositories.find_one(&filter).await.extend()
    }
}

#[Object]
impl Repository {
    async fn created_at(&self) -> DateTime {
        self.created_at.into()
    }

    async fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    async fn id(&self) -> ID {
        ID(self.id.to_string())
    }

    async fn is_private(&self) -> bool {
        self.visibility == Visibility::Private
    }

    async fn issue(&self, ctx: &Context<'_>, number: i32) -> Result<Option<Issue>> {
        require_viewer(ctx)?;
        let stores = ctx.data::<Stores>()?;
        let filter = Filter::all()
            .and(Clause::eq(fields::REPOSITORY_ID, &self.id))
            .and(Clause::eq(fields::NUMBER, i64::from(number)));
        stores.issues.find_one(&filter).await.extend()
    }

    async fn issues(
        &self,
        ctx: &Context<'_>,
        after: Option<String>,
        before: Option<String>,
        filter_by: Option<IssueFilters>,
        first: Option<i32>,
        labels: Option<Vec<String>>,
        order_by: Option<Order<IssueOrderField>>,
        states: Option<Vec<IssueState>>,
    ) -> Result<Connection<Issue>> {
        require_viewer(ctx)?;
        let args = IssueArgs {
            window: Window::new(first, after, before),
            filter_by,
            labels,
            order_by,
            states,
        };
        let base = Filter::all().and(Clause::eq(fields::REPOSITORY_ID, &self.id));
        issue_connection(ctx, base, Some(&self.id), args).await
    }

    async fn label(&self, ctx: &Context<'_>, name: String) -> Result<Option<Label>> {
        require_viewer(ctx)?;
        let stores = ctx.data::<Stores>()?;
        let filter = Filter::all()
            .and(Clause::eq(fields::REPOSITORY_ID, &self.id))
            .and(Clause::eq(fields::NAME, name));
        stores.labels.find_one(&filter).await.extend()
    }

    async fn labels(
        &self,
        ctx: &Context<'_>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        order_by: Option<Order<LabelOrderField>>,
    ) -> Result<Connection<Label>> {
        require_viewer(ctx)?;
        let stores = ctx.data::<Stores>()?;
        let config = ctx.data::<PaginationConfig>()?;
        let filter = Filter::all().and(Clause::eq(fields::REPOSITORY_ID, &self.id));
        paginate(
            stores.labels.as_ref(),
            config,
            filter,
            SortOrder::resolve(order_by.as_ref()),
            &Window::new(first, after, before),
        )
        .await
        .extend()
    }

    async fn milestone(&self, ctx: &Context<'_>, number: i32) -> Result<Option<Milestone>> {
        require_viewer(ctx)?;
        let stores = ctx.data::<Stores>()?;
        let filter = Filter::all()
            .and(Clause::eq(fields::REPOSITORY_ID, &self.id))
            .and(Clause::eq(fields::NUMBER, i64::from(number)));
        stores.milestones.find_one(&filter).await.extend()
    }

    async fn milestones(
        &self,
        ctx: &Context<'_>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        order_by: Option<Order<MilestoneOrderField>>,
        states: Option<Vec<MilestoneState>>,
    ) -> Result<Connection<Milestone>> {
        require_viewer(ctx)?;
        let stores = ctx.data::<Stores>()?;
        let config = ctx.data::<PaginationConfig>()?;
        let closed =
            states.map(|states| states.into_iter().map(MilestoneState::is_closed).collect());
        let filter = Filter::all()
            .and(Clause::eq(fields::REPOSITORY_ID, &self.id))
            .and_opt(state_clause(closed));
        paginate(
            stores.milestones.as_ref(),
            config,
            filter,
            SortOrder::resolve(order_by.as_ref()),
            &Window::new(first, after, before),
        )
        .await
        .extend()
    }

    async fn name(&self) -> &str {
        &self.name
    }

    /// `owner/name`
    async fn name_with_owner(&self, ctx: &Context<'_>) -> Result<String> {
        let owner = ctx
            .data::<Loaders>()?
            .users
            .load_one(self.owner_id.clone())
            .await
            .extend()?;
        match owner {
            Some(owner) => Ok(format!("{}/{}", owner.username, self.name)),
            None => Ok(self.name.clone()),
        }
    }

    async fn owner(&self, ctx: &Context<'_>) -> Result<Option<User>> {
        ctx.data::<Loaders>()?
            .users
            .load_one(self.owner_id.clone())
            .await
            .extend()
    }

    async fn updated_at(&self) -> DateTime {
        self.updated_at.into()
    }

    async fn visibility(&self) -> RepositoryVisibility {
        self.visibility.into()
    }
}

#[Object]
impl Issue {
    async fn assignees(&self, ctx: &Context<'_>) -> Result<Vec<User>> {
        let loaders = ctx.data::<Loaders>()?;
        load_ordered(&loaders.users, &self.assignees).await.extend()
    }

    async fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    async fn closed(&self) -> bool {
        self.closed
    }

    async fn closed_at(&self) -> Option<DateTime> {
        self.closed_at.map(DateTime::from)
    }

    async fn created_at(&self) -> DateTime {
        self.created_at.into()
    }

    async fn created_by(&self, ctx: &Context<'_>) -> Result<Option<User>> {
        ctx.data::<Loaders>()?
            .users
            .load_one(self.created_by.clone())
            .await
            .extend()
    }

    async fn id(&self) -> ID {
        ID(self.id.to_string())
    }

    async fn labels(&self, ctx: &Context<'_>) -> Result<Vec<Label>> {
        let loaders = ctx.data::<Loaders>()?;
        load_ordered(&loaders.labels, &self.labels).await.extend()
    }

    async fn milestone(&self, ctx: &Context<'_>) -> Result<Option<Milestone>> {
        let Some(milestone) = &self.milestone else {
            return Ok(None);
        };
        ctx.data::<Loaders>()?
            .milestones
            .load_one(milestone.clone())
            .await
            .extend()
    }

    async fn number(&self) -> i64 {
        self.number
    }

    async fn repository(&self, ctx: &Context<'_>) -> Result<Option<Repository>> {
        ctx.data::<Loaders>()?
            .repositories
            .load_one(self.repository_id.clone())
            .await
            .extend()
    }

    async fn state(&self) -> IssueState {
        IssueState::of(self.closed)
    }

    async fn title(&self) -> &str {
        &self.title
    }

    async fn updated_at(&self) -> DateTime {
        self.updated_at.into()
    }
}

#[Object]
impl Label {
    /// Six hex digits, without `#`.
    async fn color(&self) -> &str {
        &self.color
    }

    async fn created_at(&self) -> DateTime {
        self.created_at.into()
    }

    async fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    async fn id(&self) -> ID {
        ID(self.id.to_string())
    }

    async fn name(&self) -> &str {
        &self.name
    }

    async fn updated_at(&self) -> DateTime {
        self.updated_at.into()
    }
}

#[Object]
impl Milestone {
    async fn closed(&self) -> bool {
        self.closed
    }

    async fn closed_at(&self) -> Option<DateTime> {
        self.closed_at.map(DateTime::from)
    }

    async fn created_at(&self) -> DateTime {
        self.created_at.into()
    }

    async fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    async fn due_on(&self) -> Option<DateTime> {
        self.due_on.map(DateTime::from)
    }

    async fn id(&self) -> ID {
        ID(self.id.to_string())
    }

    async fn issues(
        &self,
        ctx: &Context<'_>,
        after: Option<String>,
        before: Option<String>,
        filter_by: Option<IssueFilters>,
        first: Option<i32>,
        labels: Option<Vec<String>>,
        order_by: Option<Order<IssueOrderField>>,
        states: Option<Vec<IssueState>>,
    ) -> Result<Connection<Issue>> {
        require_viewer(ctx)?;
        let args = IssueArgs {
            window: Window::new(first, after, before),
            filter_by,
            labels,
            order_by,
            states,
        };
        let base = Filter::all().and(Clause::eq(fields::MILESTONE, &self.id));
        issue_connection(ctx, base, Some(&self.repository_id), args).await
    }

    async fn number(&self) -> i64 {
        self.number
    }

    /// Share of this milestone's issues that are closed, from 0 to 100.
    async fn progress_percentage(&self, ctx: &Context<'_>) -> Result<f64> {
        let stores = ctx.data::<Stores>()?;
        let all = Filter::all().and(Clause::eq(fields::MILESTONE, &self.id));
        let total = stores.issues.count(&all).await.extend()?;
        if total == 0 {
            return Ok(0.0);
        }
        let closed = stores
            .issues
            .count(&all.and(Clause::eq(fields::CLOSED, true)))
            .await
            .extend()?;
        Ok(closed as f64 / total as f64 * 100.0)
    }

    async fn state(&self) -> MilestoneState {
        MilestoneState::of(self.closed)
    }

    async fn title(&self) -> &str {
        &self.title
    }

    async fn updated_at(&self) -> DateTime {
        self.updated_at.into()
    }
}
