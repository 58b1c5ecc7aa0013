use async_graphql::{Context, ID, Object};
use platform_api::{ApiError, ApiResult, parse_id};
use platform_authz::{Action, Resource};
use platform_db::{Page, user_record};
use tracing::{info, instrument};

use super::{
    AuditLogNode, GqlResult, SessionPayload, app_config, append_session_cookie, current_user,
    database, policy,
};
use crate::session::{Impersonation, issue_token, session_cookie};

#[derive(Default)]
pub struct ImpersonationQuery;

#[derive(Default)]
pub struct ImpersonationMutation;

#[Object]
impl ImpersonationQuery {
    #[instrument(name = "graphql.audit_logs", skip_all)]
    async fn audit_logs(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<AuditLogNode>> {
        audit_logs(ctx, Page::new(first, offset)).await.gql()
    }
}

#[Object]
impl ImpersonationMutation {
    /// Act as `user_id` until `stopImpersonation`.
    #[instrument(name = "graphql.start_impersonation", skip_all)]
    async fn start_impersonation(
        &self,
        ctx: &Context<'_>,
        user_id: ID,
    ) -> async_graphql::Result<SessionPayload> {
        let (token, payload) = start(ctx, &user_id).await.gql()?;
        set_cookie(ctx, &token)?;
        Ok(payload)
    }

    #[instrument(name = "graphql.stop_impersonation", skip_all)]
    async fn stop_impersonation(&self, ctx: &Context<'_>) -> async_graphql::Result<SessionPayload> {
        let (token, payload) = stop(ctx).await.gql()?;
        set_cookie(ctx, &token)?;
        Ok(payload)
    }
}

async fn audit_logs(ctx: &Context<'_>, page: Page) -> ApiResult<Vec<AuditLogNode>> {
    let actor = current_user(ctx)?.actor();
    policy(ctx)?.authorize(&actor, Action::ViewAuditLogs)?;
    let rows = platform_db::list_impersonations(database(ctx)?, page).await?;
    Ok(rows.into_iter().map(AuditLogNode::from).collect())
}

async fn start(ctx: &Context<'_>, user_id: &ID) -> ApiResult<(String, SessionPayload)> {
    let requester = current_user(ctx)?;
    let actor = requester.actor();
    let pool = database(ctx)?;
    let target_id = parse_id(user_id.as_str())?;
    let target = platform_db::find_user(pool, target_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    policy(ctx)?.authorize(
        &actor,
        Action::StartImpersonation(Resource::User(user_record(&target))),
    )?;

    let log = platform_db::record_impersonation_start(pool, actor.id, target.id).await?;
    let imp = Impersonation {
        admin_id: actor.id,
        log_id: log.id,
    };
    let token = issue_token(app_config(ctx)?, target.id, Some(imp))
        .map_err(|err| ApiError::internal(err.into()))?;
    info!(admin = %actor.id, target = %target.id, log_id = %log.id, "impersonation session issued");
    Ok((token.clone(), SessionPayload::signed_in(token, target)))
}

async fn stop(ctx: &Context<'_>) -> ApiResult<(String, SessionPayload)> {
    let requester = current_user(ctx)?;
    let Some(imp) = requester.impersonation.clone() else {
        return Err(ApiError::invalid("not impersonating anyone"));
    };
    policy(ctx)?.authorize(&requester.true_actor(), Action::StopImpersonation)?;

    platform_db::record_impersonation_stop(database(ctx)?, imp.log_id).await?;
    let admin = imp.admin;
    let token = issue_token(app_config(ctx)?, admin.id, None)
        .map_err(|err| ApiError::internal(err.into()))?;
    Ok((token.clone(), SessionPayload::signed_in(token, admin)))
}

fn set_cookie(ctx: &Context<'_>, token: &str) -> async_graphql::Result<()> {
    let ttl = app_config(ctx).gql()?.session_ttl_minutes;
    append_session_cookie(ctx, session_cookie(token, ttl));
    Ok(())
}
