use std::env;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

pub const API_URL_ENV: &str = "NAVIGATOR_API_URL";
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Upper bounds for each network-touching step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthTimeouts {
    /// Whole-call deadline for resume-on-start. Headers and body share it.
    pub resume: Duration,
    /// Header budget for registration.
    pub register: Duration,
    /// Independent body budget for registration responses.
    pub register_decode: Duration,
    pub logout: Duration,
}

impl Default for AuthTimeouts {
    fn default() -> Self {
        Self {
            resume: Duration::from_secs(10),
            register: Duration::from_secs(30),
            register_decode: Duration::from_secs(5),
            logout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub base_url: Url,
    pub timeouts: AuthTimeouts,
}

impl AuthConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` if `base_url` is not an absolute http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let raw = base_url.trim();
        let parsed = Url::parse(raw).map_err(|source| ConfigError::InvalidBaseUrl {
            raw: raw.to_owned(),
            source,
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme { raw: raw.to_owned() });
        }

        Ok(Self {
            base_url: parsed,
            timeouts: AuthTimeouts::default(),
        })
    }

    /// Resolve the remote service location from `NAVIGATOR_API_URL`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the variable is set to an invalid URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_value(env::var(API_URL_ENV).ok())
    }

    fn from_env_value(value: Option<String>) -> Result<Self, ConfigError> {
        match value {
            Some(raw) if !raw.trim().is_empty() => Self::new(&raw),
            _ => Self::new(DEFAULT_API_URL),
        }
    }

    #[must_use]
    pub fn with_timeouts(mut self, timeouts: AuthTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Absolute URL for an endpoint path such as `/auth/me`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_env_value_uses_default() {
        let config = AuthConfig::from_env_value(None).unwrap();
        assert_eq!(config.endpoint("/auth/me"), "http://localhost:8000/auth/me");
        assert_eq!(config.timeouts, AuthTimeouts::default());
    }

    #[test]
    fn blank_env_value_uses_default() {
        let config = AuthConfig::from_env_value(Some("   ".into())).unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:8000/");
    }

    #[test]
    fn base_path_and_trailing_slash_are_preserved() {
        let config = AuthConfig::new("https://api.example.com/v1/").unwrap();
        assert_eq!(
            config.endpoint("auth/register"),
            "https://api.example.com/v1/auth/register"
        );
    }

    #[test]
    fn invalid_urls_are_rejected() {
        let err = AuthConfig::from_env_value(Some("not a url".into())).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));

        let err = AuthConfig::new("ftp://example.com").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedScheme { .. }));
    }

    #[test]
    fn default_budgets_match_operation_limits() {
        let timeouts = AuthTimeouts::default();
        assert_eq!(timeouts.resume, Duration::from_secs(10));
        assert_eq!(timeouts.register, Duration::from_secs(30));
        assert_eq!(timeouts.register_decode, Duration::from_secs(5));
        assert_eq!(timeouts.logout, Duration::from_secs(10));
    }
}
