use std::time::Duration;

use anyhow::Context as _;
use axum_extra::extract::cookie::Key;
use sha2::Digest as _;

pub const DEFAULT_STRAPI_API_URL: &str = "http://localhost:1337";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct StrapiConfig {
    /// CMS origin without a trailing slash.
    pub api_url: String,
    pub api_token: Option<String>,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct Config {
    pub strapi: StrapiConfig,
    pub preview_secret: Option<String>,
    pub cookie_secure: bool,
    cookie_secret: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("strapi_api_url", &self.strapi.api_url)
            .field("strapi_api_token", &self.strapi.api_token.as_ref().map(|_| "***"))
            .field("timeout", &self.strapi.timeout)
            .field("preview_secret", &self.preview_secret.as_ref().map(|_| "***"))
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source. Blank
    /// values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let api_url = var("STRAPI_API_URL")
            .unwrap_or_else(|| DEFAULT_STRAPI_API_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        url::Url::parse(&api_url).with_context(|| format!("invalid STRAPI_API_URL: {api_url}"))?;

        let timeout_secs = match var("STRAPI_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("invalid STRAPI_TIMEOUT_SECS: {raw}"))?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            anyhow::bail!("STRAPI_TIMEOUT_SECS must be at least 1");
        }

        let cookie_secure = var("PREVIEW_COOKIE_SECURE")
            .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"));

        Ok(Self {
            strapi: StrapiConfig {
                api_url,
                api_token: var("STRAPI_API_TOKEN"),
                timeout: Duration::from_secs(timeout_secs),
            },
            preview_secret: var("PREVIEW_SECRET"),
            cookie_secure,
            cookie_secret: var("PREVIEW_COOKIE_SECRET"),
        })
    }

    /// Signing key for the preview cookie.
    ///
    /// Derived from `PREVIEW_COOKIE_SECRET`, falling back to `PREVIEW_SECRET`.
    /// Without either, a random key is generated, so preview sessions do not
    /// survive a restart.
    pub fn cookie_key(&self) -> Key {
        match self
            .cookie_secret
            .as_deref()
            .or(self.preview_secret.as_deref())
        {
            Some(secret) => {
                let digest = sha2::Sha512::digest(secret.as_bytes());
                Key::from(digest.as_slice())
            }
            None => {
                tracing::warn!("no cookie secret configured; using a random per-process key");
                Key::generate()
            }
        }
    }
}
