use std::fmt;

use anyhow::{Context, Result, anyhow};
use base64::{Engine as _, engine::general_purpose::STANDARD};

const MIN_SECRET_BYTES: usize = 32;
const DEFAULT_SESSION_TTL_MINUTES: i64 = 12 * 60;

#[derive(Clone)]
pub struct AppConfig {
    pub jwt_secret: Vec<u8>,
    pub session_ttl_minutes: i64,
    pub local_auth_enabled: bool,
    pub cors_allowed_origins: Vec<String>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("jwt_secret", &"<redacted>")
            .field("session_ttl_minutes", &self.session_ttl_minutes)
            .field("local_auth_enabled", &self.local_auth_enabled)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .finish()
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let secret =
            std::env::var("JWT_SECRET_BASE64").context("JWT_SECRET_BASE64 missing")?;
        let secret_bytes = STANDARD
            .decode(secret.trim())
            .context("invalid JWT_SECRET_BASE64")?;

        let session_ttl_minutes = match std::env::var("SESSION_TTL_MINUTES") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .context("SESSION_TTL_MINUTES must be an integer")?,
            Err(_) => DEFAULT_SESSION_TTL_MINUTES,
        };
        if session_ttl_minutes <= 0 {
            return Err(anyhow!("SESSION_TTL_MINUTES must be positive"));
        }

        let local_auth_enabled = std::env::var("LOCAL_AUTH_ENABLED")
            .ok()
            .map(|val| parse_flag(&val))
            .unwrap_or(true);

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .map(|raw| split_origins(&raw))
            .unwrap_or_default();

        let mut config = Self::from_secret(&secret_bytes)?;
        config.session_ttl_minutes = session_ttl_minutes;
        config.local_auth_enabled = local_auth_enabled;
        config.cors_allowed_origins = cors_allowed_origins;
        Ok(config)
    }

    /// Defaults plus the given signing secret.
    pub fn from_secret(secret: &[u8]) -> Result<Self> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(anyhow!(
                "JWT secret must be at least {MIN_SECRET_BYTES} bytes"
            ));
        }
        Ok(Self {
            jwt_secret: secret.to_vec(),
            session_ttl_minutes: DEFAULT_SESSION_TTL_MINUTES,
            local_auth_enabled: true,
            cors_allowed_origins: Vec::new(),
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_secrets_are_rejected() {
        assert!(AppConfig::from_secret(b"too-short").is_err());
        let config = AppConfig::from_secret(&[7u8; 32]).unwrap();
        assert!(config.local_auth_enabled);
        assert_eq!(config.session_ttl_minutes, DEFAULT_SESSION_TTL_MINUTES);
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let config = AppConfig::from_secret(&[42u8; 32]).unwrap();
        let rendered = format!("{config:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("42"));
    }

    #[test]
    fn flags_and_origins() {
        assert!(parse_flag("YES"));
        assert!(parse_flag(" 1 "));
        assert!(!parse_flag("off"));
        assert_eq!(
            split_origins("http://a.test, ,http://b.test"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }
}
