mod impersonation;
mod session;
mod users;

use std::sync::Arc;

use async_graphql::{
    Context, EmptySubscription, ErrorExtensions, MergedObject, Schema, SimpleObject, ID,
};
use axum::http::header::SET_COOKIE;
use axum_extra::extract::cookie::Cookie;
use chrono::{DateTime, Utc};
use entity::{impersonations, users as user_rows};
use platform_api::{ApiError, ApiResult};
use platform_authz::PolicyEngine;
use platform_db::DbPool;

use crate::{config::AppConfig, session::RequestUser};

pub use impersonation::{ImpersonationMutation, ImpersonationQuery};
pub use session::{SessionMutation, SessionQuery};
pub use users::{UserMutation, UserQuery};

pub type SchemaType = Schema<QueryRoot, MutationRoot, EmptySubscription>;

#[derive(MergedObject, Default)]
pub struct QueryRoot(SessionQuery, UserQuery, ImpersonationQuery);

#[derive(MergedObject, Default)]
pub struct MutationRoot(SessionMutation, UserMutation, ImpersonationMutation);

pub fn build_schema(pool: DbPool, config: Arc<AppConfig>) -> SchemaType {
    Schema::build(
        QueryRoot::default(),
        MutationRoot::default(),
        EmptySubscription,
    )
    .data(pool)
    .data(config)
    .data(PolicyEngine)
    .finish()
}

/// SDL for the schema; needs no database or secrets.
pub fn schema_sdl() -> String {
    Schema::build(
        QueryRoot::default(),
        MutationRoot::default(),
        EmptySubscription,
    )
    .finish()
    .sdl()
}

#[derive(Clone, Debug, SimpleObject)]
pub struct UserNode {
    pub id: ID,
    pub email: String,
    pub display_name: String,
    pub system_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user_rows::Model> for UserNode {
    fn from(model: user_rows::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            email: model.email,
            display_name: model.display_name,
            system_admin: model.system_admin,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct AuditLogNode {
    pub id: ID,
    pub impersonator_id: ID,
    pub impersonated_id: ID,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<impersonations::Model> for AuditLogNode {
    fn from(model: impersonations::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            impersonator_id: ID::from(model.impersonator_id.to_string()),
            impersonated_id: ID::from(model.impersonated_id.to_string()),
            started_at: model.started_at.into(),
            ended_at: model.ended_at.map(Into::into),
        }
    }
}

/// Returned by every mutation that changes who the caller is.
#[derive(Clone, Debug, Default, SimpleObject)]
pub struct SessionPayload {
    pub ok: bool,
    pub token: Option<String>,
    pub user: Option<UserNode>,
    pub error: Option<String>,
}

impl SessionPayload {
    fn signed_in(token: String, user: user_rows::Model) -> Self {
        Self {
            ok: true,
            token: Some(token),
            user: Some(user.into()),
            error: None,
        }
    }

    fn failed(message: &str) -> Self {
        Self {
            ok: false,
            error: Some(message.to_string()),
            ..Self::default()
        }
    }
}

/// Attach GraphQL error extensions to an [`ApiResult`].
pub(crate) trait GqlResult<T> {
    fn gql(self) -> async_graphql::Result<T>;
}

impl<T> GqlResult<T> for ApiResult<T> {
    fn gql(self) -> async_graphql::Result<T> {
        self.map_err(|err| err.extend())
    }
}

pub(crate) fn database<'a>(ctx: &Context<'a>) -> ApiResult<&'a DbPool> {
    ctx.data::<DbPool>()
        .map_err(|_| ApiError::internal(anyhow::anyhow!("missing database pool")))
}

pub(crate) fn app_config<'a>(ctx: &Context<'a>) -> ApiResult<&'a Arc<AppConfig>> {
    ctx.data::<Arc<AppConfig>>()
        .map_err(|_| ApiError::internal(anyhow::anyhow!("missing app configuration")))
}

pub(crate) fn policy<'a>(ctx: &Context<'a>) -> ApiResult<&'a PolicyEngine> {
    ctx.data::<PolicyEngine>()
        .map_err(|_| ApiError::internal(anyhow::anyhow!("missing policy engine")))
}

pub(crate) fn current_user<'a>(ctx: &Context<'a>) -> ApiResult<&'a RequestUser> {
    ctx.data::<RequestUser>()
        .map_err(|_| ApiError::Unauthenticated)
}

pub(crate) fn append_session_cookie(ctx: &Context<'_>, cookie: Cookie<'_>) {
    ctx.append_http_header(SET_COOKIE, cookie.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_exposes_console_operations() {
        let pool = sea_orm::DatabaseConnection::Disconnected;
        let config = Arc::new(AppConfig::from_secret(&[3u8; 32]).unwrap());
        let sdl = build_schema(pool, config).sdl();
        for field in [
            "me",
            "users",
            "userCount",
            "auditLogs",
            "startImpersonation",
            "stopImpersonation",
            "promoteUser",
            "demoteUser",
            "destroyUser",
        ] {
            assert!(sdl.contains(field), "missing {field}");
        }
    }
}
