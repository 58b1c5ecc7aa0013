//! Shared harness: an in-memory SQLite database behind the real router.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use entity::users;
use http_body_util::BodyExt;
use migration::{Migrator, MigratorTrait};
use platform_db::{DbPool, NewUser};
use serde_json::{Value, json};
use server::{
    AppConfig, AppState, build_router,
    session::{hash_password, issue_token},
};
use tower::ServiceExt;

pub const PASSWORD: &str = "correct horse battery staple";

pub struct Harness {
    pub pool: DbPool,
    pub config: Arc<AppConfig>,
    router: Router,
}

impl Harness {
    pub async fn new() -> Result<Self> {
        let pool = platform_db::connect_url("sqlite::memory:", None).await?;
        Migrator::up(&pool, None).await?;
        let config = Arc::new(AppConfig::from_secret(&[7u8; 32])?);
        let router = build_router(AppState::new(pool.clone(), config.clone()));
        Ok(Self {
            pool,
            config,
            router,
        })
    }

    pub async fn user(&self, email: &str, system_admin: bool) -> Result<users::Model> {
        let password_hash =
            hash_password(PASSWORD).map_err(|err| anyhow::anyhow!("hash failed: {err}"))?;
        let user = platform_db::insert_user(
            &self.pool,
            NewUser {
                email: email.to_string(),
                display_name: email.split('@').next().unwrap_or(email).to_string(),
                system_admin,
                password_hash: Some(password_hash),
            },
        )
        .await?;
        Ok(user)
    }

    pub fn token_for(&self, user: &users::Model) -> Result<String> {
        Ok(issue_token(&self.config, user.id, None)?)
    }

    /// Send a JSON request and return the status with the parsed body.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).context("response body is not JSON")?
        };
        Ok((status, value))
    }

    /// POST a GraphQL document and return the full response object.
    pub async fn graphql(&self, token: Option<&str>, query: &str, variables: Value) -> Result<Value> {
        let (status, body) = self
            .call(
                Method::POST,
                "/graphql",
                token,
                Some(json!({ "query": query, "variables": variables })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "graphql returned {status}");
        Ok(body)
    }
}

/// The `extensions.code` of the first GraphQL error, if any.
pub fn error_code(response: &Value) -> Option<&str> {
    response["errors"][0]["extensions"]["code"].as_str()
}
