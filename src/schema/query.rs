//! Query root

use async_graphql::{Context, Object, Result, ResultExt};

use crate::auth::require_viewer;
use crate::models::{Repository, User};
use crate::store::{fields, Clause, Direction, Filter, Sort, Stores};

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Look up a repository by its owner's login and its name.
    async fn repository(
        &self,
        ctx: &Context<'_>,
        name: String,
        owner: String,
    ) -> Result<Option<Repository>> {
        let stores = ctx.data::<Stores>()?;
        let Some(owner) = find_user(stores, &owner).await? else {
            return Ok(None);
        };
        let filter = Filter::all()
            .and(Clause::eq(fields::OWNER_ID, &owner.id))
            .and(Clause::eq(fields::NAME, name));
        stores.repositories.find_one(&filter).await.extend()
    }

    /// Look up a user by login.
    async fn user(&self, ctx: &Context<'_>, login: String) -> Result<Option<User>> {
        let stores = ctx.data::<Stores>()?;
        find_user(stores, &login).await
    }

    /// Every user, by login.
    async fn users(&self, ctx: &Context<'_>) -> Result<Vec<User>> {
        let stores = ctx.data::<Stores>()?;
        stores
            .users
            .find(
                &Filter::all(),
                Some(Sort::new(fields::USERNAME, Direction::Asc)),
                None,
            )
            .await
            .extend()
    }

    /// The currently authenticated user.
    async fn viewer(&self, ctx: &Context<'_>) -> Result<User> {
        require_viewer(ctx).cloned()
    }
}

async fn find_user(stores: &Stores, login: &str) -> Result<Option<User>> {
    stores
        .users
        .find_one(&Filter::all().and(Clause::eq(fields::USERNAME, login)))
        .await
        .extend()
}
