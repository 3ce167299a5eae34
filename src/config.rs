//! Server configuration loaded from environment variables.

use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Site configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Public base URL, no trailing slash (used for sitemaps and canonical links)
    pub site_url: String,
    pub site_name: String,
    pub strapi_url: String,
    pub strapi_token: Option<String>,
    pub cms_timeout: Duration,
    /// Base for relative media URLs returned by the CMS
    pub media_url: String,
    pub redis_url: Option<String>,
    pub cache_fresh_for: Duration,
    pub cache_stale_for: Duration,
    pub revalidate_secret: Option<String>,
    pub signature_header: String,
    pub analytics_url: Option<String>,
    pub cookie_secure: bool,
    pub session_max_age: Duration,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let strapi_url = trim_url(get("STRAPI_URL").unwrap_or_else(|| "http://localhost:1337".to_string()));
        let media_url = get("MEDIA_URL").map(trim_url).unwrap_or_else(|| strapi_url.clone());

        let session_days: u64 = parse_or("SESSION_MAX_AGE_DAYS", get("SESSION_MAX_AGE_DAYS"), 7)?;
        let session_secs = session_days
            .checked_mul(24 * 60 * 60)
            .ok_or_else(|| ConfigError::Invalid {
                key: "SESSION_MAX_AGE_DAYS",
                value: session_days.to_string(),
                reason: "too large".to_string(),
            })?;

        Ok(Self {
            bind_addr: parse_or(
                "SITE_BIND_ADDR",
                get("SITE_BIND_ADDR"),
                SocketAddr::from(([127, 0, 0, 1], 3000)),
            )?,
            site_url: trim_url(get("SITE_URL").unwrap_or_else(|| "http://localhost:3000".to_string())),
            site_name: get("SITE_NAME").unwrap_or_else(|| "Casino Reviews".to_string()),
            strapi_url,
            strapi_token: get("STRAPI_API_TOKEN"),
            cms_timeout: Duration::from_secs(parse_or("CMS_TIMEOUT_SECS", get("CMS_TIMEOUT_SECS"), 10)?),
            media_url,
            redis_url: get("REDIS_URL"),
            cache_fresh_for: Duration::from_secs(parse_or("CACHE_TTL_SECS", get("CACHE_TTL_SECS"), 300)?),
            cache_stale_for: Duration::from_secs(parse_or("CACHE_STALE_SECS", get("CACHE_STALE_SECS"), 3600)?),
            revalidate_secret: get("REVALIDATE_SECRET"),
            signature_header: get("REVALIDATE_SIGNATURE_HEADER")
                .map(|h| h.to_ascii_lowercase())
                .unwrap_or_else(|| "x-webhook-signature".to_string()),
            analytics_url: get("ANALYTICS_URL").map(trim_url),
            cookie_secure: parse_bool("COOKIE_SECURE", get("COOKIE_SECURE"), false)?,
            session_max_age: Duration::from_secs(session_secs),
        })
    }
}

fn trim_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_bool(key: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::Invalid {
            key,
            value: raw.unwrap_or_default(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.strapi_url, "http://localhost:1337");
        assert_eq!(config.media_url, config.strapi_url);
        assert!(config.redis_url.is_none());
        assert!(config.revalidate_secret.is_none());
        assert_eq!(config.cache_fresh_for, Duration::from_secs(300));
        assert_eq!(config.session_max_age, Duration::from_secs(7 * 86400));
        assert!(!config.cookie_secure);
    }

    #[test]
    fn test_overrides_and_url_trimming() {
        let config = load(&[
            ("SITE_URL", "https://example.com/"),
            ("STRAPI_URL", "https://cms.example.com/"),
            ("MEDIA_URL", "https://cdn.example.com//"),
            ("COOKIE_SECURE", "true"),
            ("REVALIDATE_SIGNATURE_HEADER", "X-Strapi-Signature"),
            ("SESSION_MAX_AGE_DAYS", "1"),
        ])
        .unwrap();
        assert_eq!(config.site_url, "https://example.com");
        assert_eq!(config.strapi_url, "https://cms.example.com");
        assert_eq!(config.media_url, "https://cdn.example.com");
        assert!(config.cookie_secure);
        assert_eq!(config.signature_header, "x-strapi-signature");
        assert_eq!(config.session_max_age, Duration::from_secs(86400));
    }

    #[test]
    fn test_invalid_values() {
        assert!(load(&[("CACHE_TTL_SECS", "soon")]).is_err());
        assert!(load(&[("COOKIE_SECURE", "maybe")]).is_err());
        assert!(load(&[("SITE_BIND_ADDR", "localhost")]).is_err());
    }

    #[test]
    fn test_session_age_overflow_rejected() {
        let err = load(&[("SESSION_MAX_AGE_DAYS", "300000000000000")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SESSION_MAX_AGE_DAYS", .. }));
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = load(&[("REDIS_URL", "  "), ("STRAPI_API_TOKEN", "")]).unwrap();
        assert!(config.redis_url.is_none());
        assert!(config.strapi_token.is_none());
    }
}
