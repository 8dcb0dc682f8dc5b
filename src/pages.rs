use anyhow::Context as _;
use serde::Deserialize;

use crate::cli::{PageKind, RenderArgs};
use crate::config::Config;
use crate::content::{About, Article, Category};
use crate::normalize::{response_entries, response_entry};
use crate::preview::PreviewMode;
use crate::render::{self, Layout};
use crate::strapi::{ContentApi, ContentStatus, StrapiClient, StrapiQuery};

/// Query overrides accepted by every page route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub status: Option<ContentStatus>,
    pub locale: Option<String>,
}

/// Everything a renderer needs to know about the inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub preview: PreviewMode,
    pub query: PageQuery,
    /// Path and query of the request, used for the preview exit link.
    pub path: String,
}

impl RequestContext {
    pub fn new(preview: PreviewMode, query: PageQuery, path: impl Into<String>) -> Self {
        Self {
            preview,
            query,
            path: path.into(),
        }
    }

    /// Explicit `status` wins, then the preview flag, then `published`.
    pub fn status(&self) -> ContentStatus {
        match (self.query.status, self.preview) {
            (Some(status), _) => status,
            (None, PreviewMode::Enabled) => ContentStatus::Draft,
            (None, PreviewMode::Disabled) => ContentStatus::Published,
        }
    }

    pub fn locale(&self) -> Option<&str> {
        self.query
            .locale
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }

    /// Adds the effective status and locale filters to `query`.
    fn scope(&self, query: StrapiQuery) -> StrapiQuery {
        query.status(self.status()).locale(self.locale())
    }

    fn layout<'a>(&'a self, title: &'a str) -> Layout<'a> {
        Layout {
            title,
            preview: self.preview.is_enabled(),
            current_path: &self.path,
            locale: self.locale(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    Found(String),
    NotFound(String),
}

impl Page {
    pub fn html(&self) -> &str {
        match self {
            Self::Found(html) | Self::NotFound(html) => html,
        }
    }

    pub fn into_html(self) -> String {
        match self {
            Self::Found(html) | Self::NotFound(html) => html,
        }
    }
}

pub async fn article(
    api: &dyn ContentApi,
    origin: &str,
    ctx: &RequestContext,
    slug: &str,
) -> anyhow::Result<Page> {
    let query = StrapiQuery::new()
        .filter_eq("slug", slug)
        .populate("[cover]", "true")
        .populate("[author][populate]", "*")
        .populate("[category]", "true")
        .populate("[blocks][populate]", "*");
    let body = api
        .fetch("/api/articles", &ctx.scope(query))
        .await
        .with_context(|| format!("fetch article: {slug}"))?;

    let Some(entry) = response_entry(&body) else {
        tracing::info!(slug, status = ctx.status().as_str(), "article not found");
        return Ok(not_found(ctx, "article"));
    };
    let article = Article::from_record(&entry);
    tracing::debug!(slug, blocks = article.blocks.len(), "render article");

    let body = render::article_body(&article, origin, ctx.locale());
    Ok(Page::Found(render::page(&ctx.layout(&article.title), &body)))
}

pub async fn about(
    api: &dyn ContentApi,
    origin: &str,
    ctx: &RequestContext,
) -> anyhow::Result<Page> {
    let query = StrapiQuery::new().populate("[blocks][populate]", "*");
    let body = api
        .fetch("/api/about", &ctx.scope(query))
        .await
        .context("fetch about")?;

    let Some(entry) = response_entry(&body) else {
        tracing::info!(status = ctx.status().as_str(), "about not found");
        return Ok(not_found(ctx, "page"));
    };
    let about = About::from_record(&entry);

    let body = render::about_body(&about, origin);
    Ok(Page::Found(render::page(&ctx.layout(&about.title), &body)))
}

pub async fn category(
    api: &dyn ContentApi,
    origin: &str,
    ctx: &RequestContext,
    slug: &str,
) -> anyhow::Result<Page> {
    let query = StrapiQuery::new()
        .filter_eq("slug", slug)
        .populate("[articles][populate]", "*");
    let body = api
        .fetch("/api/categories", &ctx.scope(query))
        .await
        .with_context(|| format!("fetch category: {slug}"))?;

    let Some(entry) = response_entry(&body) else {
        tracing::info!(slug, status = ctx.status().as_str(), "category not found");
        return Ok(not_found(ctx, "category"));
    };
    let category = Category::from_record(&entry);

    let body = render::category_body(&category, origin, ctx.locale());
    Ok(Page::Found(render::page(&ctx.layout(&category.name), &body)))
}

/// Article listing for the home page. An empty collection is not an error.
pub async fn index(
    api: &dyn ContentApi,
    origin: &str,
    ctx: &RequestContext,
) -> anyhow::Result<Page> {
    let query = StrapiQuery::new()
        .sort("publishedAt:desc")
        .populate("[cover]", "true");
    let body = api
        .fetch("/api/articles", &ctx.scope(query))
        .await
        .context("fetch articles")?;

    let articles: Vec<Article> = response_entries(&body)
        .iter()
        .map(Article::from_record)
        .collect();

    let body = render::index_body(&articles, origin, ctx.locale());
    Ok(Page::Found(render::page(&ctx.layout("Blog"), &body)))
}

pub fn not_found(ctx: &RequestContext, what: &str) -> Page {
    Page::NotFound(render::page(
        &ctx.layout("Not found"),
        &render::not_found_body(what),
    ))
}

pub fn failure(ctx: &RequestContext) -> String {
    render::page(&ctx.layout("Error"), &render::error_body())
}

/// Renders a single page outside the server, for the `render` command.
pub async fn run(args: &RenderArgs, config: &Config) -> anyhow::Result<Page> {
    let client = StrapiClient::new(&config.strapi).context("create strapi client")?;
    let origin = config.strapi.api_url.as_str();
    let preview = if args.draft {
        PreviewMode::Enabled
    } else {
        PreviewMode::Disabled
    };
    let query = PageQuery {
        status: args.status,
        locale: args.locale.clone(),
    };
    let slug = || {
        args.slug
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("--slug is required to render {:?}", args.page))
    };

    match args.page {
        PageKind::Index => index(&client, origin, &RequestContext::new(preview, query, "/")).await,
        PageKind::About => {
            about(&client, origin, &RequestContext::new(preview, query, "/about")).await
        }
        PageKind::Article => {
            let slug = slug()?;
            let ctx = RequestContext::new(preview, query, format!("/blog/{slug}"));
            article(&client, origin, &ctx, slug).await
        }
        PageKind::Category => {
            let slug = slug()?;
            let ctx = RequestContext::new(preview, query, format!("/category/{slug}"));
            category(&client, origin, &ctx, slug).await
        }
    }
}
