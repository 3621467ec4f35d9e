//! Mutation root
//!
//! Every mutation except `signup` and `login` needs a viewer. Targets that
//! do not exist are reported through `success: false`; invalid input is a
//! `BAD_USER_INPUT` error.

use async_graphql::{
    Context, ErrorExtensions, MaybeUndefined, Object, Result, ResultExt, SimpleObject, ID,
};
use tracing::{debug, info};

use super::inputs::{
    CreateIssueInput, CreateLabelInput, CreateMilestoneInput, CreateRepositoryInput, LogInInput,
    SignUpInput, UpdateIssueInput, UpdateLabelInput, UpdateMilestoneInput,
};
use crate::auth::{hash_password, issue_token, require_viewer, verify_password};
use crate::config::AuthConfig;
use crate::models::{now, Issue, Label, Milestone, Repository, User};
use crate::store::{fields, Clause, Filter, RecordId, StoreError, Stores};
use crate::ApiError;

#[derive(SimpleObject, Debug, Clone)]
pub struct AuthPayload {
    pub token: Option<String>,
    pub user: Option<User>,
}

#[derive(SimpleObject, Debug, Clone)]
pub struct RepositoryPayload {
    pub message: String,
    pub success: bool,
    pub repository: Option<Repository>,
}

#[derive(SimpleObject, Debug, Clone)]
pub struct IssuePayload {
    pub message: String,
    pub success: bool,
    pub issue: Option<Issue>,
}

#[derive(SimpleObject, Debug, Clone)]
pub struct LabelPayload {
    pub message: String,
    pub success: bool,
    pub label: Option<Label>,
}

#[derive(SimpleObject, Debug, Clone)]
pub struct MilestonePayload {
    pub message: String,
    pub success: bool,
    pub milestone: Option<Milestone>,
}

#[derive(SimpleObject, Debug, Clone)]
pub struct DeletePayload {
    pub message: String,
    pub success: bool,
}

impl IssuePayload {
    fn done(message: &str, issue: Issue) -> Self {
        Self {
            message: message.to_string(),
            success: true,
            issue: Some(issue),
        }
    }

    fn not_found() -> Self {
        Self {
            message: "The issue you were looking for could not be found.".to_string(),
            success: false,
            issue: None,
        }
    }
}

impl LabelPayload {
    fn done(message: &str, label: Label) -> Self {
        Self {
            message: message.to_string(),
            success: true,
            label: Some(label),
        }
    }

    fn not_found() -> Self {
        Self {
            message: "The label you were looking for could not be found.".to_string(),
            success: false,
            label: None,
        }
    }
}

impl MilestonePayload {
    fn done(message: &str, milestone: Milestone) -> Self {
        Self {
            message: message.to_string(),
            success: true,
            milestone: Some(milestone),
        }
    }

    fn not_found() -> Self {
        Self {
            message: "The milestone you were looking for could not be found.".to_string(),
            success: false,
            milestone: None,
        }
    }
}

impl DeletePayload {
    fn from_deleted(deleted: bool, what: &str) -> Self {
        if deleted {
            Self {
                message: format!("The {what} has been deleted."),
                success: true,
            }
        } else {
            Self {
                message: "There was nothing to delete.".to_string(),
                success: false,
            }
        }
    }
}

fn user_input(message: impl Into<String>) -> async_graphql::Error {
    ApiError::UserInput(message.into()).extend()
}

/// Maps a unique-key violation to a user-input error.
fn on_duplicate(err: StoreError, message: &str) -> async_graphql::Error {
    match err {
        StoreError::Duplicate(_) => user_input(message),
        other => other.extend(),
    }
}

/// Trims `value`, rejecting it when nothing is left.
fn not_blank(value: &str, what: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(user_input(format!("{what} cannot be blank")));
    }
    Ok(trimmed.to_string())
}

/// Validates a label colour and returns its stored form: six lowercase hex
/// digits without `#`. Three-digit colours are expanded (`f0a` → `ff00aa`).
pub fn normalize_color(color: &str) -> crate::Result<String> {
    let digits = color.strip_prefix('#').unwrap_or(color);
    if !matches!(digits.len(), 3 | 6) || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ApiError::UserInput("Invalid color code".to_string()));
    }
    let digits = digits.to_ascii_lowercase();
    if digits.len() == 3 {
        Ok(digits.chars().flat_map(|c| [c, c]).collect())
    } else {
        Ok(digits)
    }
}

fn record_ids(ids: Option<Vec<ID>>) -> Vec<RecordId> {
    ids.unwrap_or_default().into_iter().map(RecordId::from).collect()
}

/// Applies a nullable update: absent keeps, `null` clears, a value replaces.
fn apply<T>(target: &mut Option<T>, update: MaybeUndefined<T>) {
    match update {
        MaybeUndefined::Undefined => {}
        MaybeUndefined::Null => *target = None,
        MaybeUndefined::Value(value) => *target = Some(value),
    }
}

async fn target_repository(stores: &Stores, id: ID) -> Result<Repository> {
    stores
        .repositories
        .find_by_id(&RecordId::from(id))
        .await
        .extend()?
        .ok_or_else(|| user_input("The repository you were looking for could not be found."))
}

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Create an account and return a token for it.
    async fn signup(
        &self,
        ctx: &Context<'_>,
        input: SignUpInput,
    ) -> Result<AuthPayload> {
        let stores = ctx.data::<Stores>()?;
        let auth = ctx.data::<AuthConfig>()?;

        let username = not_blank(&input.username, "Username")?;
        let email = not_blank(&input.email, "Email")?;
        if input.password.is_empty() {
            return Err(user_input("Password cannot be blank"));
        }

        let user = User {
            id: RecordId::generate(),
            email,
            name: None,
            password: hash_password(&input.password).extend()?,
            username,
        };
        stores
            .users
            .insert(&user)
            .await
            .map_err(|e| on_duplicate(e, "Username or email is already taken"))?;
        info!(user = %user.username, "User signed up");

        let token = issue_token(&user.id, auth).extend()?;
        Ok(AuthPayload {
            token: Some(token),
            user: Some(user),
        })
    }

    /// Exchange email and password for a token.
    async fn login(
        &self,
        ctx: &Context<'_>,
        input: LogInInput,
    ) -> Result<AuthPayload> {
        let stores = ctx.data::<Stores>()?;
        let auth = ctx.data::<AuthConfig>()?;

        let user = stores
            .users
            .find_one(&Filter::all().and(Clause::eq(fields::EMAIL, input.email.trim())))
            .await
            .extend()?
            .filter(|user| verify_password(&input.password, &user.password))
            .ok_or_else(|| user_input("Invalid email or password"))?;

        let token = issue_token(&user.id, auth).extend()?;
        debug!(user = %user.username, "User logged in");
        Ok(AuthPayload {
            token: Some(token),
            user: Some(user),
        })
    }

    /// Create a repository owned by the viewer.
    async fn create_repository(
        &self,
        ctx: &Context<'_>,
        input: CreateRepositoryInput,
    ) -> Result<RepositoryPayload> {
        let viewer = require_viewer(ctx)?;
        let stores = ctx.data::<Stores>()?;

        let at = now();
        let repository = Repository {
            id: RecordId::generate(),
            description: input.description,
            name: not_blank(&input.name, "Name")?,
            owner_id: viewer.id.clone(),
            visibility: input.visibility.into(),
            created_at: at,
            updated_at: at,
        };
        stores
            .repositories
            .insert(&repository)
            .await
            .map_err(|e| on_duplicate(e, "Duplicate repository name"))?;
        info!(repository = %repository.name, owner = %viewer.username, "Repository created");

        Ok(RepositoryPayload {
            message: "A new repository has been created.".to_string(),
            success: true,
            repository: Some(repository),
        })
    }

    async fn create_issue(
        &self,
        ctx: &Context<'_>,
        input: CreateIssueInput,
    ) -> Result<IssuePayload> {
        let viewer = require_viewer(ctx)?;
        let stores = ctx.data::<Stores>()?;

        let title = not_blank(&input.title, "Title")?;
        let repository = target_repository(stores, input.repository_id).await?;
        let number = stores
            .sequences
            .next_value(&format!("issue:{}", repository.id))
            .await
            .extend()?;

        let at = now();
        let issue = Issue {
            id: RecordId::generate(),
            assignees: record_ids(input.assignee_ids),
            body: input.body,
            closed: false,
            closed_at: None,
            created_by: viewer.id.clone(),
            labels: record_ids(input.label_ids),
            milestone: input.milestone_id.map(RecordId::from),
            number,
            repository_id: repository.id,
            title,
            created_at: at,
            updated_at: at,
        };
        stores.issues.insert(&issue).await.extend()?;
        info!(number = issue.number, repository = %repository.name, "Issue created");

        Ok(IssuePayload::done("A new issue has been created.", issue))
    }

    async fn update_issue(
        &self,
        ctx: &Context<'_>,
        input: UpdateIssueInput,
    ) -> Result<IssuePayload> {
        require_viewer(ctx)?;
        let stores = ctx.data::<Stores>()?;

        let Some(mut issue) = stores
            .issues
            .find_by_id(&RecordId::from(input.id))
            .await
            .extend()?
        else {
            return Ok(IssuePayload::not_found());
        };

        if let Some(title) = input.title {
            issue.title = not_blank(&title, "Title")?;
        }
        if input.assignee_ids.is_some() {
            issue.assignees = record_ids(input.assignee_ids);
        }
        if input.label_ids.is_some() {
            issue.labels = record_ids(input.label_ids);
        }
        apply(&mut issue.body, input.body);
        apply(&mut issue.milestone, input.milestone_id.map_value(RecordId::from));
        issue.updated_at = now();

        if !stores.issues.replace(&issue).await.extend()? {
            return Ok(IssuePayload::not_found());
        }
        debug!(id = %issue.id, "Issue updated");
        Ok(IssuePayload::done("The issue has been updated.", issue))
    }

    async fn close_issue(&self, ctx: &Context<'_>, id: ID) -> Result<IssuePayload> {
        require_viewer(ctx)?;
        let stores = ctx.data::<Stores>()?;

        let Some(mut issue) = stores
            .issues
            .find_by_id(&RecordId::from(id))
            .await
            .extend()?
        else {
            return Ok(IssuePayload::not_found());
        };
        let at = now();
        issue.closed = true;
        issue.closed_at = Some(at);
        issue.updated_at = at;

        if !stores.issues.replace(&issue).await.extend()? {
            return Ok(IssuePayload::not_found());
        }
        Ok(IssuePayload::done("The issue has been closed.", issue))
    }

    async fn reopen_issue(&self, ctx: &Context<'_>, id: ID) -> Result<IssuePayload> {
        require_viewer(ctx)?;
        let stores = ctx.data::<Stores>()?;

        let Some(mut issue) = stores
            .issues
            .find_by_id(&RecordId::from(id))
            .await
            .extend()?
        else {
            return Ok(IssuePayload::not_found());
        };
        issue.closed = false;
        issue.closed_at = None;
        issue.updated_at = now();

        if !stores.issues.replace(&issue).await.extend()? {
            return Ok(IssuePayload::not_found());
        }
        Ok(IssuePayload::done("The issue has been reopened.", issue))
    }

    async fn delete_issue(&self, ctx: &Context<'_>, id: ID) -> Result<DeletePayload> {
        require_viewer(ctx)?;
        let stores = ctx.data::<Stores>()?;
        let deleted = stores.issues.delete(&RecordId::from(id)).await.extend()?;
        Ok(DeletePayload::from_deleted(deleted, "issue"))
    }

    async fn create_label(
        &self,
        ctx: &Context<'_>,
        input: CreateLabelInput,
    ) -> Result<LabelPayload> {
        require_viewer(ctx)?;
        let stores = ctx.data::<Stores>()?;

        let color = normalize_color(&input.color).extend()?;
        let name = not_blank(&input.name, "Name")?;
        let repository = target_repository(stores, input.repository_id).await?;

        let at = now();
        let label = Label {
            id: RecordId::generate(),
            color,
            description: input.description,
            name,
            repository_id: repository.id,
            created_at: at,
            updated_at: at,
        };
        stores
            .labels
            .insert(&label)
            .await
            .map_err(|e| on_duplicate(e, "Duplicate label name"))?;
        debug!(label = %label.name, "Label created");

        Ok(LabelPayload::done("A new label has been created.", label))
    }

    async fn update_label(
        &self,
        ctx: &Context<'_>,
        input: UpdateLabelInput,
    ) -> Result<LabelPayload> {
        require_viewer(ctx)?;
        let stores = ctx.data::<Stores>()?;

        let color = input.color.as_deref().map(normalize_color).transpose().extend()?;
        let name = input.name.as_deref().map(|name| not_blank(name, "Name")).transpose()?;

        let Some(mut label) = stores
            .labels
            .find_by_id(&RecordId::from(input.id))
            .await
            .extend()?
        else {
            return Ok(LabelPayload::not_found());
        };
        if let Some(color) = color {
            label.color = color;
        }
        if let Some(name) = name {
            label.name = name;
        }
        apply(&mut label.description, input.description);
        label.updated_at = now();

        let replaced = stores
            .labels
            .replace(&label)
            .await
            .map_err(|e| on_duplicate(e, "Duplicate label name"))?;
        if !replaced {
            return Ok(LabelPayload::not_found());
        }
        Ok(LabelPayload::done("The label has been updated.", label))
    }

    async fn delete_label(&self, ctx: &Context<'_>, id: ID) -> Result<DeletePayload> {
        require_viewer(ctx)?;
        let stores = ctx.data::<Stores>()?;
        let deleted = stores.labels.delete(&RecordId::from(id)).await.extend()?;
        Ok(DeletePayload::from_deleted(deleted, "label"))
    }

    async fn create_milestone(
        &self,
        ctx: &Context<'_>,
        input: CreateMilestoneInput,
    ) -> Result<MilestonePayload> {
        require_viewer(ctx)?;
        let stores = ctx.data::<Stores>()?;

        let title = not_blank(&input.title, "Title")?;
        let repository = target_repository(stores, input.repository_id).await?;
        let number = stores
            .sequences
            .next_value(&format!("milestone:{}", repository.id))
            .await
            .extend()?;

        let at = now();
        let milestone = Milestone {
            id: RecordId::generate(),
            closed: false,
            closed_at: None,
            description: input.description,
            due_on: input.due_on.map(Into::into),
            number,
            repository_id: repository.id,
            title,
            created_at: at,
            updated_at: at,
        };
        stores.milestones.insert(&milestone).await.extend()?;
        debug!(number = milestone.number, "Milestone created");

        Ok(MilestonePayload::done("A new milestone has been created.", milestone))
    }

    async fn update_milestone(
        &self,
        ctx: &Context<'_>,
        input: UpdateMilestoneInput,
    ) -> Result<MilestonePayload> {
        require_viewer(ctx)?;
        let stores = ctx.data::<Stores>()?;

        let Some(mut milestone) = stores
            .milestones
            .find_by_id(&RecordId::from(input.id))
            .await
            .extend()?
        else {
            return Ok(MilestonePayload::not_found());
        };

        if let Some(title) = input.title {
            milestone.title = not_blank(&title, "Title")?;
        }
        apply(&mut milestone.description, input.description);
        apply(&mut milestone.due_on, input.due_on.map_value(Into::into));
        milestone.updated_at = now();

        if !stores.milestones.replace(&milestone).await.extend()? {
            return Ok(MilestonePayload::not_found());
        }
        Ok(MilestonePayload::done("The milestone has been updated.", milestone))
    }

    async fn close_milestone(&self, ctx: &Context<'_>, id: ID) -> Result<MilestonePayload> {
        require_viewer(ctx)?;
        let stores = ctx.data::<Stores>()?;

        let Some(mut milestone) = stores
            .milestones
            .find_by_id(&RecordId::from(id))
            .await
            .extend()?
        else {
            return Ok(MilestonePayload::not_found());
        };
        let at = now();
        milestone.closed = true;
        milestone.closed_at = Some(at);
        milestone.updated_at = at;

        if !stores.milestones.replace(&milestone).await.extend()? {
            return Ok(MilestonePayload::not_found());
        }
        Ok(MilestonePayload::done("The milestone has been closed.", milestone))
    }

    async fn reopen_milestone(&self, ctx: &Context<'_>, id: ID) -> Result<MilestonePayload> {
        require_viewer(ctx)?;
        let stores = ctx.data::<Stores>()?;

        let Some(mut milestone) = stores
            .milestones
            .find_by_id(&RecordId::from(id))
            .await
            .extend()?
        else {
            return Ok(MilestonePayload::not_found());
        };
        milestone.closed = false;
        milestone.closed_at = None;
        milestone.updated_at = now();

        if !stores.milestones.replace(&milestone).await.extend()? {
            return Ok(MilestonePayload::not_found());
        }
        Ok(MilestonePayload::done("The milestone has been reopened.", milestone))
    }

    async fn delete_milestone(&self, ctx: &Context<'_>, id: ID) -> Result<DeletePayload> {
        require_viewer(ctx)?;
        let stores = ctx.data::<Stores>()?;
        let deleted = stores.milestones.delete(&RecordId::from(id)).await.extend()?;
        Ok(DeletePayload::from_deleted(deleted, "milestone"))
    }
}
