use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use axum::Router;
use axum::extract::{FromRef, OriginalUri, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use axum::routing::get;
use axum_extra::extract::SignedCookieJar;
use axum_extra::extract::cookie::Key;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::pages::{self, Page, PageQuery, RequestContext};
use crate::preview::{self, DisableParams, EnableParams, PreviewError, PreviewMode};
use crate::strapi::{ContentApi, StrapiClient};

#[derive(Clone)]
pub struct AppState {
    api: Arc<dyn ContentApi>,
    config: Arc<Config>,
    key: Key,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let client = StrapiClient::new(&config.strapi).context("create strapi client")?;
        Ok(Self::with_api(config, Arc::new(client)))
    }

    /// State backed by an arbitrary content source.
    pub fn with_api(config: Config, api: Arc<dyn ContentApi>) -> Self {
        let key = config.cookie_key();
        Self {
            api,
            config: Arc::new(config),
            key,
        }
    }

    fn origin(&self) -> &str {
        &self.config.strapi.api_url
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/", get(index_handler))
        .route("/about", get(about_handler))
        .route("/blog/:slug", get(article_handler))
        .route("/category/:slug", get(category_handler))
        .route("/api/preview/enable", get(enable_preview))
        .route("/api/preview/disable", get(disable_preview))
        .fallback(fallback_handler)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, config: Config) -> anyhow::Result<()> {
    tracing::info!(?config, "starting strapi-preview");
    let state = AppState::new(config)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {addr}: {err}"))?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(?err, "listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

/// A page render that failed upstream; answered with the generic failure
/// page.
struct PageError {
    ctx: RequestContext,
    err: anyhow::Error,
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        tracing::error!(path = %self.ctx.path, err = %format!("{:#}", self.err), "page render failed");
        (StatusCode::BAD_GATEWAY, Html(pages::failure(&self.ctx))).into_response()
    }
}

fn page_response(ctx: RequestContext, result: anyhow::Result<Page>) -> Result<Response, PageError> {
    match result {
        Ok(Page::Found(html)) => Ok(Html(html).into_response()),
        Ok(Page::NotFound(html)) => Ok((StatusCode::NOT_FOUND, Html(html)).into_response()),
        Err(err) => Err(PageError { ctx, err }),
    }
}

fn request_context(jar: &SignedCookieJar, query: PageQuery, uri: &OriginalUri) -> RequestContext {
    let path = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_owned(), |pq| pq.as_str().to_owned());
    RequestContext::new(PreviewMode::from_jar(jar), query, path)
}

async fn index_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    uri: OriginalUri,
    Query(query): Query<PageQuery>,
) -> Result<Response, PageError> {
    let ctx = request_context(&jar, query, &uri);
    let result = pages::index(state.api.as_ref(), state.origin(), &ctx).await;
    page_response(ctx, result)
}

async fn about_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    uri: OriginalUri,
    Query(query): Query<PageQuery>,
) -> Result<Response, PageError> {
    let ctx = request_context(&jar, query, &uri);
    let result = pages::about(state.api.as_ref(), state.origin(), &ctx).await;
    page_response(ctx, result)
}

async fn article_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    uri: OriginalUri,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, PageError> {
    let ctx = request_context(&jar, query, &uri);
    let result = pages::article(state.api.as_ref(), state.origin(), &ctx, &slug).await;
    page_response(ctx, result)
}

async fn category_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    uri: OriginalUri,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, PageError> {
    let ctx = request_context(&jar, query, &uri);
    let result = pages::category(state.api.as_ref(), state.origin(), &ctx, &slug).await;
    page_response(ctx, result)
}

async fn fallback_handler(jar: SignedCookieJar, uri: OriginalUri) -> Response {
    let ctx = request_context(&jar, PageQuery::default(), &uri);
    (StatusCode::NOT_FOUND, Html(pages::not_found(&ctx, "page").into_html())).into_response()
}

async fn enable_preview(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Query(params): Query<EnableParams>,
) -> Result<(SignedCookieJar, Redirect), (StatusCode, Json<serde_json::Value>)> {
    let target = preview::enable_target(&params, state.config.preview_secret.as_deref())
        .map_err(|err| {
            let status = match err {
                PreviewError::InvalidSecret => StatusCode::UNAUTHORIZED,
                PreviewError::InvalidUrl => StatusCode::BAD_REQUEST,
            };
            tracing::warn!(%status, %err, "preview enable rejected");
            (status, Json(serde_json::json!({ "message": err.to_string() })))
        })?;

    tracing::info!(%target, "preview enabled");
    Ok((
        preview::enable(jar, state.config.cookie_secure),
        Redirect::temporary(&target),
    ))
}

async fn disable_preview(
    jar: SignedCookieJar,
    Query(params): Query<DisableParams>,
) -> (SignedCookieJar, Redirect) {
    let target = preview::disable_target(&params);
    tracing::info!(%target, "preview disabled");
    (preview::disable(jar), Redirect::temporary(&target))
}
