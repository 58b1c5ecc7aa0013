use std::sync::Arc;

use async_graphql::{Error, ErrorExtensions};
use platform_authz::AuthzError;
use platform_db::DbError;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Shared result type for GraphQL resolvers and REST handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error, Clone)]
pub enum ApiError {
    #[error("login required")]
    Unauthenticated,
    #[error("insufficient permissions")]
    Forbidden(AuthzError),
    #[error("resource not found")]
    NotFound,
    #[error("{0}")]
    InvalidInput(String),
    #[error("internal server error")]
    Internal(Arc<anyhow::Error>),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::InvalidInput(_) => "VALIDATION",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self::Internal(Arc::new(err))
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// JSON body used by the REST surface.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::internal(value)
    }
}

impl From<AuthzError> for ApiError {
    fn from(value: AuthzError) -> Self {
        Self::Forbidden(value)
    }
}

impl From<DbError> for ApiError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::NotFound { .. } => ApiError::NotFound,
            DbError::Conflict(what) => ApiError::InvalidInput(format!("{what} already exists")),
            other => {
                tracing::error!(error = %other, "database failure");
                ApiError::internal(other.into())
            }
        }
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> Error {
        let mut err = Error::new(self.to_string());
        err = err.extend_with(|_err, e| {
            e.set("code", self.code());
        });
        if let ApiError::Forbidden(AuthzError::Denied { action, .. }) = self {
            let action = action.clone();
            err = err.extend_with(move |_err, e| {
                e.set("action", action);
            });
        }
        err
    }
}

pub fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::invalid("invalid id"))
}

/// Lowercase and sanity-check an email address.
pub fn normalize_email(value: &str) -> ApiResult<String> {
    let trimmed = value.trim().to_lowercase();
    if trimmed.is_empty() || !trimmed.contains('@') || trimmed.len() > 320 {
        return Err(ApiError::invalid("invalid email address"));
    }
    Ok(trimmed)
}

pub fn validate_display_name(value: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::invalid("displayName is required"));
    }
    if trimmed.chars().count() > 128 {
        return Err(ApiError::invalid("displayName must be <= 128 characters"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::Value;

    fn code_of(err: &Error) -> Option<Value> {
        err.extensions
            .as_ref()
            .and_then(|map| map.get("code"))
            .cloned()
    }

    #[test]
    fn internal_errors_are_masked() {
        let err = ApiError::internal(anyhow::anyhow!("boom")).extend();
        assert_eq!(err.message, "internal server error");
        assert_eq!(code_of(&err), Some(Value::from("INTERNAL")));
    }

    #[test]
    fn denials_carry_forbidden_code_and_action() {
        let denied = AuthzError::Denied {
            action: "users:destroy".into(),
            resource: "user:1".into(),
        };
        let err = ApiError::from(denied).extend();
        assert_eq!(code_of(&err), Some(Value::from("FORBIDDEN")));
        let action = err
            .extensions
            .as_ref()
            .and_then(|map| map.get("action"))
            .cloned();
        assert_eq!(action, Some(Value::from("users:destroy")));
    }

    #[test]
    fn db_errors_map_to_api_errors() {
        let missing = DbError::NotFound {
            entity: "user",
            id: Uuid::nil(),
        };
        assert!(matches!(ApiError::from(missing), ApiError::NotFound));
        let conflict = ApiError::from(DbError::Conflict("email"));
        assert_eq!(conflict.code(), "VALIDATION");
        assert_eq!(conflict.to_string(), "email already exists");
    }

    #[test]
    fn email_and_name_validation() {
        assert_eq!(normalize_email("  Ada@Example.TEST ").unwrap(), "ada@example.test");
        assert!(normalize_email("nope").is_err());
        assert!(validate_display_name("   ").is_err());
        assert_eq!(validate_display_name(" Ada ").unwrap(), "Ada");
        assert!(parse_id("not-a-uuid").is_err());
    }
}
