//! Session tokens, password hashing and request identity.
//!
//! A session is an HS256 JWT. While an administrator impersonates someone,
//! `sub` is the impersonated user, `imp` holds the administrator and
//! `imp_log` the audit row of that impersonation. Every policy sees the
//! impersonated user except stopping, which is checked against the true
//! user. An impersonation token stops working once its audit row is closed.

use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use argon2::Argon2;
use axum::http::{HeaderMap, header};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use entity::users;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use platform_authz::Actor;
use platform_db::DbPool;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::AppConfig;

pub const SESSION_COOKIE: &str = "console_session";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imp: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imp_log: Option<Uuid>,
    pub exp: usize,
    pub iat: usize,
}

impl SessionClaims {
    /// Both impersonation claims, or `None` when either is missing.
    pub fn impersonation(&self) -> Option<Impersonation> {
        Some(Impersonation {
            admin_id: self.imp?,
            log_id: self.imp_log?,
        })
    }
}

/// Who is impersonating, and under which audit row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Impersonation {
    pub admin_id: Uuid,
    pub log_id: Uuid,
}

pub fn issue_token(
    config: &AppConfig,
    user_id: Uuid,
    impersonation: Option<Impersonation>,
) -> jsonwebtoken::errors::Result<String> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(Duration::minutes(config.session_ttl_minutes))
        .unwrap_or(now)
        .timestamp() as usize;
    let claims = SessionClaims {
        sub: user_id,
        imp: impersonation.map(|imp| imp.admin_id),
        imp_log: impersonation.map(|imp| imp.log_id),
        exp,
        iat: now.timestamp() as usize,
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(&config.jwt_secret),
    )
}

pub fn decode_token(config: &AppConfig, token: &str) -> jsonwebtoken::errors::Result<SessionClaims> {
    jsonwebtoken::decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(&config.jwt_secret),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

/// `Authorization: Bearer` wins over the session cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        if let Some(rest) = value.to_str().ok().and_then(|v| v.strip_prefix("Bearer ")) {
            return Some(rest.trim().to_string());
        }
    }
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(token: &str, ttl_minutes: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_owned()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(ttl_minutes.max(0)))
        .build()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    cookie.make_removal();
    cookie
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

/// False for malformed hashes as well as wrong passwords.
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// The identity a request runs as.
#[derive(Clone, Debug)]
pub struct RequestUser {
    pub user: users::Model,
    /// Set while an administrator is impersonating `user`.
    pub impersonation: Option<ActiveImpersonation>,
}

#[derive(Clone, Debug)]
pub struct ActiveImpersonation {
    pub admin: users::Model,
    pub log_id: Uuid,
}

impl RequestUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user.id, self.user.system_admin)
    }

    /// The administrator behind an impersonation, or the user itself.
    pub fn true_actor(&self) -> Actor {
        self.impersonation
            .as_ref()
            .map(|imp| Actor::new(imp.admin.id, imp.admin.system_admin))
            .unwrap_or_else(|| self.actor())
    }
}

/// Resolve a token into the current user. Any failure means anonymous.
pub async fn authenticate(pool: &DbPool, config: &AppConfig, token: &str) -> Option<RequestUser> {
    let claims = match decode_token(config, token) {
        Ok(claims) => claims,
        Err(err) => {
            debug!(error = %err, "rejected session token");
            return None;
        }
    };
    let impersonation = match (claims.imp, claims.impersonation()) {
        (None, _) => None,
        (Some(_), Some(imp)) => Some(resolve_impersonation(pool, claims.sub, imp).await?),
        (Some(_), None) => {
            debug!(user = %claims.sub, "impersonation token without audit row");
            return None;
        }
    };
    let user = platform_db::find_user(pool, claims.sub).await.ok()??;
    Some(RequestUser {
        user,
        impersonation,
    })
}

/// The audit row must still be open and match both parties.
async fn resolve_impersonation(
    pool: &DbPool,
    user_id: Uuid,
    imp: Impersonation,
) -> Option<ActiveImpersonation> {
    let row = platform_db::find_impersonation(pool, imp.log_id).await.ok()??;
    if row.ended_at.is_some() || row.impersonator_id != imp.admin_id || row.impersonated_id != user_id
    {
        debug!(log_id = %imp.log_id, "impersonation session is closed");
        return None;
    }
    let admin = platform_db::find_user(pool, imp.admin_id).await.ok()??;
    Some(ActiveImpersonation {
        admin,
        log_id: imp.log_id,
    })
}

pub async fn authenticate_headers(
    pool: &DbPool,
    config: &AppConfig,
    headers: &HeaderMap,
) -> Option<RequestUser> {
    let token = extract_token(headers)?;
    authenticate(pool, config, &token).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn config() -> AppConfig {
        AppConfig::from_secret(&[9u8; 32]).unwrap()
    }

    #[test]
    fn tokens_round_trip_impersonation() {
        let config = config();
        let admin = Uuid::new_v4();
        let member = Uuid::new_v4();
        let imp = Impersonation {
            admin_id: admin,
            log_id: Uuid::new_v4(),
        };
        let token = issue_token(&config, member, Some(imp)).unwrap();
        let claims = decode_token(&config, &token).unwrap();
        assert_eq!(claims.sub, member);
        assert_eq!(claims.impersonation(), Some(imp));
    }

    #[test]
    fn plain_tokens_carry_no_impersonation() {
        let config = config();
        let token = issue_token(&config, Uuid::new_v4(), None).unwrap();
        let claims = decode_token(&config, &token).unwrap();
        assert_eq!(claims.imp, None);
        assert_eq!(claims.impersonation(), None);
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let token = issue_token(&config(), Uuid::new_v4(), None).unwrap();
        let other = AppConfig::from_secret(&[1u8; 32]).unwrap();
        assert!(decode_token(&other, &token).is_err());
    }

    #[test]
    fn bearer_header_beats_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; console_session=from-cookie"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("from-cookie"));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn empty_cookie_is_no_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("console_session="));
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn session_cookies_are_http_only() {
        let cookie = session_cookie("abc", 10);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::minutes(10)));

        let expired = expired_session_cookie();
        assert_eq!(expired.value(), "");
        assert_eq!(expired.max_age(), Some(time::Duration::ZERO));
        assert!(expired.to_string().starts_with("console_session=;"));
    }

    #[test]
    fn password_hashes_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }
}
