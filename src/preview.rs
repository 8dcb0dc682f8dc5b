//! Draft preview toggle.
//!
//! The preview flag lives entirely in a signed, httpOnly cookie. Enabling it
//! requires the shared secret (when one is configured) and a same-origin
//! redirect target; disabling it always succeeds.

use axum_extra::extract::SignedCookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::Deserialize;
use sha2::{Digest as _, Sha256};
use url::{Position, Url};

pub const PREVIEW_COOKIE: &str = "strapi_preview";

const LOCAL_ORIGIN: &str = "http://localhost";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewMode {
    #[default]
    Disabled,
    Enabled,
}

impl PreviewMode {
    /// Reads the flag from the request cookies. A cookie that fails signature
    /// verification is ignored.
    pub fn from_jar(jar: &SignedCookieJar) -> Self {
        match jar.get(PREVIEW_COOKIE) {
            Some(cookie) if cookie.value() == "1" => Self::Enabled,
            _ => Self::Disabled,
        }
    }

    pub fn is_enabled(self) -> bool {
        self == Self::Enabled
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnableParams {
    pub url: Option<String>,
    pub secret: Option<String>,
    pub status: Option<String>,
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisableParams {
    pub url: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PreviewError {
    #[error("Invalid preview secret")]
    InvalidSecret,
    #[error("The url parameter must be a path starting with \"/\"")]
    InvalidUrl,
}

/// Validates an enable request and returns the redirect location. The
/// secret is checked before the target. Forwarded `status` and `locale`
/// replace any the target already carries.
pub fn enable_target(
    params: &EnableParams,
    configured_secret: Option<&str>,
) -> Result<String, PreviewError> {
    if let Some(expected) = configured_secret
        && !secrets_match(params.secret.as_deref().unwrap_or_default(), expected)
    {
        return Err(PreviewError::InvalidSecret);
    }

    let mut target = params
        .url
        .as_deref()
        .and_then(local_url)
        .ok_or(PreviewError::InvalidUrl)?;

    let forwarded: Vec<(&str, &str)> = [("status", &params.status), ("locale", &params.locale)]
        .into_iter()
        .filter_map(|(key, value)| {
            let value = value.as_deref().map(str::trim).filter(|v| !v.is_empty())?;
            Some((key, value))
        })
        .collect();
    if !forwarded.is_empty() {
        let kept: Vec<(String, String)> = target
            .query_pairs()
            .filter(|(key, _)| !forwarded.iter().any(|(name, _)| key == name))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        target.set_query(None);
        target
            .query_pairs_mut()
            .extend_pairs(kept)
            .extend_pairs(forwarded);
    }

    Ok(relative(&target))
}

/// Redirect location after disabling preview. Targets that would leave the
/// site, or that can't be sent as a location, fall back to `/`.
pub fn disable_target(params: &DisableParams) -> String {
    match params.url.as_deref() {
        Some(raw) => match local_url(raw) {
            Some(target) => relative(&target),
            None if raw.trim().is_empty() => "/".to_owned(),
            None => {
                tracing::warn!(url = raw, "ignoring non-local preview disable target");
                "/".to_owned()
            }
        },
        None => "/".to_owned(),
    }
}

/// `true` for a path on this origin. `//host` and `/\host` are treated by
/// browsers as another origin and are rejected.
pub fn is_local_path(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\")
}

/// Parses a same-origin path against a placeholder origin. Control
/// characters are refused outright; everything else comes back
/// percent-encoded.
fn local_url(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if !is_local_path(raw) || raw.chars().any(char::is_control) {
        return None;
    }
    let base = Url::parse(LOCAL_ORIGIN).ok()?;
    let target = Url::options().base_url(Some(&base)).parse(raw).ok()?;
    (target.origin() == base.origin()).then_some(target)
}

/// Path, query and fragment of `url`.
fn relative(url: &Url) -> String {
    url[Position::BeforePath..].to_owned()
}

fn secrets_match(supplied: &str, expected: &str) -> bool {
    Sha256::digest(supplied.as_bytes()) == Sha256::digest(expected.as_bytes())
}

pub fn enable(jar: SignedCookieJar, secure: bool) -> SignedCookieJar {
    let cookie = Cookie::build((PREVIEW_COOKIE, "1"))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(if secure { SameSite::None } else { SameSite::Lax });
    jar.add(cookie)
}

pub fn disable(jar: SignedCookieJar) -> SignedCookieJar {
    jar.remove(Cookie::build(PREVIEW_COOKIE).path("/"))
}
