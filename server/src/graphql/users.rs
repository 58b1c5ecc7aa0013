use async_graphql::{Context, ID, InputObject, Object};
use entity::users;
use platform_api::{ApiError, ApiResult, normalize_email, parse_id, validate_display_name};
use platform_authz::{Action, Scope};
use platform_db::{Page, UserChanges, user_record};
use tracing::{info, instrument};

use super::{GqlResult, UserNode, current_user, database, policy};

#[derive(Default)]
pub struct UserQuery;

#[derive(Default)]
pub struct UserMutation;

#[derive(Clone, Debug, InputObject)]
pub struct UpdateUserInput {
    pub id: ID,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[Object]
impl UserQuery {
    /// Administrators list everyone, everybody else only themselves.
    #[instrument(name = "graphql.users", skip_all)]
    async fn users(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<UserNode>> {
        list(ctx, Page::new(first, offset)).await.gql()
    }

    #[instrument(name = "graphql.user", skip_all)]
    async fn user(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<UserNode> {
        show(ctx, &id).await.gql()
    }

    #[instrument(name = "graphql.user_count", skip_all)]
    async fn user_count(&self, ctx: &Context<'_>) -> async_graphql::Result<u64> {
        count(ctx).await.gql()
    }
}

#[Object]
impl UserMutation {
    #[instrument(name = "graphql.update_user", skip_all)]
    async fn update_user(
        &self,
        ctx: &Context<'_>,
        input: UpdateUserInput,
    ) -> async_graphql::Result<UserNode> {
        update(ctx, input).await.gql()
    }

    #[instrument(name = "graphql.destroy_user", skip_all)]
    async fn destroy_user(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        destroy(ctx, &id).await.gql()
    }

    #[instrument(name = "graphql.promote_user", skip_all)]
    async fn promote_user(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<UserNode> {
        change_role(ctx, &id, true).await.gql()
    }

    #[instrument(name = "graphql.demote_user", skip_all)]
    async fn demote_user(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<UserNode> {
        change_role(ctx, &id, false).await.gql()
    }
}

async fn list(ctx: &Context<'_>, page: Page) -> ApiResult<Vec<UserNode>> {
    let actor = current_user(ctx)?.actor();
    let rows = platform_db::list_users(database(ctx)?, Scope::resolve(&actor), page).await?;
    Ok(rows.into_iter().map(UserNode::from).collect())
}

async fn count(ctx: &Context<'_>) -> ApiResult<u64> {
    let actor = current_user(ctx)?.actor();
    policy(ctx)?.authorize(&actor, Action::IndexUsers)?;
    Ok(platform_db::user_count(database(ctx)?).await?)
}

async fn show(ctx: &Context<'_>, id: &ID) -> ApiResult<UserNode> {
    let actor = current_user(ctx)?.actor();
    let target = load(ctx, id).await?;
    policy(ctx)?.authorize(&actor, Action::ShowUser(user_record(&target)))?;
    Ok(target.into())
}

async fn update(ctx: &Context<'_>, input: UpdateUserInput) -> ApiResult<UserNode> {
    let actor = current_user(ctx)?.actor();
    let target = load(ctx, &input.id).await?;
    policy(ctx)?.authorize(&actor, Action::UpdateUser(user_record(&target)))?;
    let changes = UserChanges {
        email: input.email.as_deref().map(normalize_email).transpose()?,
        display_name: input
            .display_name
            .as_deref()
            .map(validate_display_name)
            .transpose()?,
    };
    let updated = platform_db::update_user(database(ctx)?, target.id, changes).await?;
    Ok(updated.into())
}

async fn destroy(ctx: &Context<'_>, id: &ID) -> ApiResult<bool> {
    let actor = current_user(ctx)?.actor();
    let target = load(ctx, id).await?;
    policy(ctx)?.authorize(&actor, Action::DestroyUser(user_record(&target)))?;
    let deleted = platform_db::delete_user(database(ctx)?, target.id).await?;
    info!(actor = %actor.id, target = %target.id, "user destroyed");
    Ok(deleted)
}

async fn change_role(ctx: &Context<'_>, id: &ID, system_admin: bool) -> ApiResult<UserNode> {
    let actor = current_user(ctx)?.actor();
    let target = load(ctx, id).await?;
    let engine = policy(ctx)?;
    engine.authorize(&actor, Action::ManageRoles)?;
    let record = user_record(&target);
    if system_admin {
        engine.authorize(&actor, Action::PromoteUser(record))?;
        if target.system_admin {
            return Ok(target.into());
        }
    } else {
        engine.authorize(&actor, Action::DemoteUser(record))?;
    }
    let updated = platform_db::set_system_admin(database(ctx)?, target.id, system_admin).await?;
    info!(actor = %actor.id, target = %target.id, system_admin, "user role changed");
    Ok(updated.into())
}

async fn load(ctx: &Context<'_>, id: &ID) -> ApiResult<users::Model> {
    let id = parse_id(id.as_str())?;
    platform_db::find_user(database(ctx)?, id)
        .await?
        .ok_or(ApiError::NotFound)
}
