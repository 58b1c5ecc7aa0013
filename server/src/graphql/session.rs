use async_graphql::{Context, Object, SimpleObject};
use platform_api::{ApiError, ApiResult, normalize_email};
use tracing::{info, instrument, warn};

use super::{
    GqlResult, SessionPayload, UserNode, app_config, append_session_cookie, current_user,
    database,
};
use crate::session::{expired_session_cookie, issue_token, session_cookie, verify_password};

#[derive(Default)]
pub struct SessionQuery;

#[derive(Default)]
pub struct SessionMutation;

#[derive(Clone, Debug, SimpleObject)]
pub struct HealthPayload {
    pub ok: bool,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct MePayload {
    pub user: UserNode,
    /// The administrator acting as `user`, if any.
    pub impersonated_by: Option<UserNode>,
}

#[Object]
impl SessionQuery {
    #[instrument(name = "graphql.health", skip_all)]
    async fn health(&self) -> HealthPayload {
        HealthPayload { ok: true }
    }

    #[instrument(name = "graphql.version", skip_all)]
    async fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    #[instrument(name = "graphql.me", skip_all)]
    async fn me(&self, ctx: &Context<'_>) -> async_graphql::Result<MePayload> {
        let requester = current_user(ctx).gql()?;
        Ok(MePayload {
            user: requester.user.clone().into(),
            impersonated_by: requester
                .impersonation
                .as_ref()
                .map(|imp| UserNode::from(imp.admin.clone())),
        })
    }
}

#[Object]
impl SessionMutation {
    #[instrument(name = "graphql.login", skip_all)]
    async fn login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> async_graphql::Result<SessionPayload> {
        let payload = login(ctx, &email, &password).await.gql()?;
        if let Some(token) = &payload.token {
            let ttl = app_config(ctx).gql()?.session_ttl_minutes;
            append_session_cookie(ctx, session_cookie(token, ttl));
        }
        Ok(payload)
    }

    #[instrument(name = "graphql.logout", skip_all)]
    async fn logout(&self, ctx: &Context<'_>) -> bool {
        append_session_cookie(ctx, expired_session_cookie());
        true
    }
}

async fn login(ctx: &Context<'_>, email: &str, password: &str) -> ApiResult<SessionPayload> {
    let config = app_config(ctx)?;
    if !config.local_auth_enabled {
        return Err(ApiError::invalid("local authentication is disabled"));
    }
    let email = normalize_email(email)?;
    let Some(user) = platform_db::find_user_by_email(database(ctx)?, &email).await? else {
        return Ok(SessionPayload::failed("invalid credentials"));
    };
    let verified = user
        .password_hash
        .as_deref()
        .is_some_and(|hash| verify_password(password, hash));
    if !verified {
        warn!(user = %user.id, "failed login");
        return Ok(SessionPayload::failed("invalid credentials"));
    }
    let token =
        issue_token(config, user.id, None).map_err(|err| ApiError::internal(err.into()))?;
    info!(user = %user.id, "user signed in");
    Ok(SessionPayload::signed_in(token, user))
}
