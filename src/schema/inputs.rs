//! Input objects and enums

use async_graphql::{Enum, InputObject, MaybeUndefined, ID};

use crate::models::Visibility;
use crate::types::DateTime;

/// The possible states of an issue.
#[derive(Enum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum IssueState {
    Closed,
    Open,
}

impl IssueState {
    pub fn of(closed: bool) -> Self {
        if closed {
            IssueState::Closed
        } else {
            IssueState::Open
        }
    }

    pub fn is_closed(self) -> bool {
        self == IssueState::Closed
    }
}

/// The possible states of a milestone.
#[derive(Enum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum MilestoneState {
    Closed,
    Open,
}

impl MilestoneState {
    pub fn of(closed: bool) -> Self {
        if closed {
            MilestoneState::Closed
        } else {
            MilestoneState::Open
        }
    }

    pub fn is_closed(self) -> bool {
        self == MilestoneState::Closed
    }
}

/// The repository's visibility level.
#[derive(Enum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum RepositoryVisibility {
    Private,
    Public,
}

impl From<Visibility> for RepositoryVisibility {
    fn from(visibility: Visibility) -> Self {
        match visibility {
            Visibility::Private => RepositoryVisibility::Private,
            Visibility::Public => RepositoryVisibility::Public,
        }
    }
}

impl From<RepositoryVisibility> for Visibility {
    fn from(visibility: RepositoryVisibility) -> Self {
        match visibility {
            RepositoryVisibility::Private => Visibility::Private,
            RepositoryVisibility::Public => Visibility::Public,
        }
    }
}

/// The privacy of a repository, used to filter repository lists.
#[derive(Enum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum RepositoryPrivacy {
    Private,
    Public,
}

impl From<RepositoryPrivacy> for Visibility {
    fn from(privacy: RepositoryPrivacy) -> Self {
        match privacy {
            RepositoryPrivacy::Private => Visibility::Private,
            RepositoryPrivacy::Public => Visibility::Public,
        }
    }
}

/// Ways in which to filter lists of issues. Each value is a user login.
#[derive(InputObject, Debug, Clone, Default)]
pub struct IssueFilters {
    /// Issues assigned to this user.
    pub assignee: Option<String>,
    /// Issues created by this user.
    pub created_by: Option<String>,
    /// Issues whose body mentions this user.
    pub mentioned: Option<String>,
}

#[derive(InputObject, Debug, Clone)]
pub struct SignUpInput {
    pub email: String,
    pub password: String,
    pub username: String,
}

#[derive(InputObject, Debug, Clone)]
pub struct LogInInput {
    pub email: String,
    pub password: String,
}

#[derive(InputObject, Debug, Clone)]
pub struct CreateRepositoryInput {
    pub description: Option<String>,
    pub name: String,
    pub visibility: RepositoryVisibility,
}

#[derive(InputObject, Debug, Clone)]
pub struct CreateIssueInput {
    pub assignee_ids: Option<Vec<ID>>,
    pub body: Option<String>,
    pub label_ids: Option<Vec<ID>>,
    pub milestone_id: Option<ID>,
    pub repository_id: ID,
    pub title: String,
}

/// Omitted fields are left unchanged; `null` clears `body` and `milestoneId`.
#[derive(InputObject, Debug, Clone)]
pub struct UpdateIssueInput {
    pub assignee_ids: Option<Vec<ID>>,
    pub body: MaybeUndefined<String>,
    pub id: ID,
    pub label_ids: Option<Vec<ID>>,
    pub milestone_id: MaybeUndefined<ID>,
    pub title: Option<String>,
}

#[derive(InputObject, Debug, Clone)]
pub struct CreateLabelInput {
    /// Three or six hex digits, optionally prefixed with `#`.
    pub color: String,
    pub description: Option<String>,
    pub name: String,
    pub repository_id: ID,
}

#[derive(InputObject, Debug, Clone)]
pub struct UpdateLabelInput {
    pub color: Option<String>,
    pub description: MaybeUndefined<String>,
    pub id: ID,
    pub name: Option<String>,
}

#[derive(InputObject, Debug, Clone)]
pub struct CreateMilestoneInput {
    pub description: Option<String>,
    pub due_on: Option<DateTime>,
    pub repository_id: ID,
    pub title: String,
}

#[derive(InputObject, Debug, Clone)]
pub struct UpdateMilestoneInput {
    pub description: MaybeUndefined<String>,
    pub due_on: MaybeUndefined<DateTime>,
    pub id: ID,
    pub title: Option<String>,
}
