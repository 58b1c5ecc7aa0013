//! JSON resource for runtime configuration entries. Administrator-only.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use entity::configurations::Model;
use platform_api::ApiError;
use platform_authz::{Action, ConfigurationAction};
use platform_db::{ConfigurationChanges, NewConfiguration};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::http::{AppState, CurrentUser, HttpResult};

const MAX_KEY_LEN: usize = 128;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/{id}", get(show).patch(update).delete(destroy))
        .route("/{id}/toggle", post(toggle))
}

#[derive(Debug, Deserialize)]
pub struct CreateConfiguration {
    pub key: String,
    pub value: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateConfiguration {
    pub key: Option<String>,
    pub value: Option<String>,
    pub enabled: Option<bool>,
}

async fn index(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> HttpResult<Json<Vec<Model>>> {
    authorize(&state, &user, ConfigurationAction::Index)?;
    Ok(Json(platform_db::list_configurations(&state.pool).await?))
}

async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateConfiguration>,
) -> HttpResult<(StatusCode, Json<Model>)> {
    authorize(&state, &user, ConfigurationAction::Create)?;
    let input = NewConfiguration {
        key: validate_key(&body.key)?,
        value: body.value,
        enabled: body.enabled,
    };
    let row = platform_db::insert_configuration(&state.pool, input).await?;
    info!(actor = %user.user.id, key = %row.key, "configuration created");
    Ok((StatusCode::CREATED, Json(row)))
}

async fn show(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> HttpResult<Json<Model>> {
    authorize(&state, &user, ConfigurationAction::Show(id))?;
    let row = platform_db::find_configuration(&state.pool, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(row))
}

async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateConfiguration>,
) -> HttpResult<Json<Model>> {
    authorize(&state, &user, ConfigurationAction::Update(id))?;
    let changes = ConfigurationChanges {
        key: body.key.as_deref().map(validate_key).transpose()?,
        value: body.value,
        enabled: body.enabled,
    };
    Ok(Json(
        platform_db::update_configuration(&state.pool, id, changes).await?,
    ))
}

async fn destroy(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> HttpResult<StatusCode> {
    authorize(&state, &user, ConfigurationAction::Destroy(id))?;
    platform_db::delete_configuration(&state.pool, id).await?;
    info!(actor = %user.user.id, %id, "configuration destroyed");
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> HttpResult<Json<Model>> {
    authorize(&state, &user, ConfigurationAction::Toggle(id))?;
    let row = platform_db::toggle_configuration(&state.pool, id).await?;
    info!(actor = %user.user.id, key = %row.key, enabled = row.enabled, "configuration toggled");
    Ok(Json(row))
}

fn authorize(
    state: &AppState,
    user: &crate::session::RequestUser,
    action: ConfigurationAction,
) -> HttpResult<()> {
    state
        .policy
        .authorize(&user.actor(), Action::Configuration(action))?;
    Ok(())
}

fn validate_key(raw: &str) -> Result<String, ApiError> {
    let key = raw.trim();
    if key.is_empty() {
        return Err(ApiError::invalid("key is required"));
    }
    if key.chars().count() > MAX_KEY_LEN {
        return Err(ApiError::invalid(format!(
            "key must be <= {MAX_KEY_LEN} characters"
        )));
    }
    if key.chars().any(char::is_whitespace) {
        return Err(ApiError::invalid("key must not contain whitespace"));
    }
    Ok(key.to_string())
}
