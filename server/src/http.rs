use std::{
    net::SocketAddr,
    sync::Arc,
};

use anyhow::Context;
use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::{self, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, request::Parts},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use platform_api::ApiError;
use platform_authz::{AuthzError, PolicyEngine};
use platform_db::{DbError, DbPool};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    configurations,
    graphql::SchemaType,
    session::{RequestUser, authenticate_headers},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub schema: SchemaType,
    pub config: Arc<AppConfig>,
    pub policy: PolicyEngine,
}

impl AppState {
    pub fn new(pool: DbPool, config: Arc<AppConfig>) -> Self {
        let schema = crate::graphql::build_schema(pool.clone(), config.clone());
        Self {
            pool,
            schema,
            config,
            policy: PolicyEngine,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl From<SocketAddr> for ServeConfig {
    fn from(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "console server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let layer = CorsLayer::new()
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ]);
    if allowed.is_empty() {
        layer.allow_origin(AllowOrigin::any())
    } else {
        layer
            .allow_credentials(true)
            .allow_origin(AllowOrigin::list(allowed))
    }
}

pub fn build_router(state: AppState) -> Router {
    let header_name = HeaderName::from_static("x-request-id");
    Router::new()
        .route("/health", get(health_handler))
        .route("/graphiql", get(graphiql_handler))
        .route("/graphql", get(graphql_handler).post(graphql_handler))
        .nest("/configurations", configurations::routes())
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), MakeRequestUuid))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let mut req = request.into_inner();
    if let Some(user) = authenticate_headers(&state.pool, &state.config, &headers).await {
        req = req.data(user);
    }
    state.schema.execute(req).await.into()
}

async fn graphiql_handler() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = state.pool.ping().await.is_ok();
    if !db_ok {
        warn!("health check could not reach the database");
    }
    Json(HealthResponse {
        ok: db_ok,
        db_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    db_ok: bool,
    version: &'static str,
}

/// Extractor for routes that require a session.
pub struct CurrentUser(pub RequestUser);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = HttpError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate_headers(&state.pool, &state.config, &parts.headers)
            .await
            .map(CurrentUser)
            .ok_or(HttpError(ApiError::Unauthenticated))
    }
}

pub type HttpResult<T> = Result<T, HttpError>;

#[derive(Debug)]
pub struct HttpError(pub ApiError);

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ApiError> for HttpError {
    fn from(value: ApiError) -> Self {
        Self(value)
    }
}

impl From<AuthzError> for HttpError {
    fn from(value: AuthzError) -> Self {
        Self(value.into())
    }
}

impl From<DbError> for HttpError {
    fn from(value: DbError) -> Self {
        Self(value.into())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.0.body())).into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use http_body_util::BodyExt;
    use migration::{Migrator, MigratorTrait};
    use tower::ServiceExt;

    use super::*;

    async fn router() -> Router {
        let pool = platform_db::connect_url("sqlite::memory:", None).await.unwrap();
        Migrator::up(&pool, None).await.unwrap();
        let config = Arc::new(AppConfig::from_secret(&[5u8; 32]).unwrap());
        build_router(AppState::new(pool, config))
    }

    #[tokio::test]
    async fn health_reports_database() {
        let response = router()
            .await
            .oneshot(http::Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["db_ok"], true);
    }

    #[tokio::test]
    async fn configuration_routes_need_a_session() {
        let response = router()
            .await
            .oneshot(
                http::Request::get("/configurations")
                    .header(http::header::AUTHORIZATION, "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn errors_map_to_statuses() {
        assert_eq!(
            HttpError(ApiError::invalid("bad")).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(HttpError(ApiError::NotFound).status(), StatusCode::NOT_FOUND);
    }
}
