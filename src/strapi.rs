use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CACHE_CONTROL, USER_AGENT};
use serde::{Deserialize, Serialize};

use crate::config::StrapiConfig;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    Published,
}

impl ContentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }
}

/// Query string for a Strapi REST request, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrapiQuery {
    pairs: Vec<(String, String)>,
}

impl StrapiQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// `filters[<field>][$eq]=<value>`
    pub fn filter_eq(mut self, field: &str, value: &str) -> Self {
        self.pairs
            .push((format!("filters[{field}][$eq]"), value.to_owned()));
        self
    }

    /// Raw `populate` directive, e.g. `populate("[blocks][populate]", "*")`.
    pub fn populate(mut self, path: &str, value: &str) -> Self {
        self.pairs.push((format!("populate{path}"), value.to_owned()));
        self
    }

    pub fn sort(mut self, value: &str) -> Self {
        self.pairs.push(("sort".to_owned(), value.to_owned()));
        self
    }

    pub fn status(mut self, status: ContentStatus) -> Self {
        self.pairs
            .push(("status".to_owned(), status.as_str().to_owned()));
        self
    }

    pub fn locale(mut self, locale: Option<&str>) -> Self {
        if let Some(locale) = locale {
            self.pairs.push(("locale".to_owned(), locale.to_owned()));
        }
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

/// Read access to CMS content.
#[async_trait]
pub trait ContentApi: Send + Sync {
    async fn fetch(&self, path: &str, query: &StrapiQuery) -> anyhow::Result<serde_json::Value>;
}

#[derive(Debug, Clone)]
pub struct StrapiClient {
    http: reqwest::Client,
    api_url: String,
    api_token: Option<String>,
}

impl StrapiClient {
    pub fn new(config: &StrapiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("build strapi http client")?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_token: config.api_token.clone(),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.api_url)
        } else {
            format!("{}/{path}", self.api_url)
        }
    }
}

#[async_trait]
impl ContentApi for StrapiClient {
    async fn fetch(&self, path: &str, query: &StrapiQuery) -> anyhow::Result<serde_json::Value> {
        let endpoint = self.endpoint(path);
        tracing::debug!(%endpoint, query = ?query.pairs(), "strapi request");

        let mut request = self
            .http
            .get(&endpoint)
            .query(query.pairs())
            .header(USER_AGENT, concat!("strapi-preview/", env!("CARGO_PKG_VERSION")))
            .header(ACCEPT, "application/json")
            .header(CACHE_CONTROL, "no-store");
        if let Some(token) = self.api_token.as_deref() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("GET {endpoint}"))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .with_context(|| format!("read response body: {endpoint}"))?;
        if !status.is_success() {
            anyhow::bail!("Strapi request failed ({status}) for {endpoint}: {raw}");
        }

        serde_json::from_str(&raw).with_context(|| format!("parse strapi response: {endpoint}"))
    }
}
