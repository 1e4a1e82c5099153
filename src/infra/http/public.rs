use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{
    application::{error::HttpError, site::SiteMap},
    infra::assets::{StaticAssets, not_found_response},
};

use super::middleware::trace_requests;

#[derive(Clone)]
pub struct HttpState {
    pub site: Arc<SiteMap>,
    pub assets: Arc<StaticAssets>,
    /// Normalised prefix such as `/_static`.
    pub static_prefix: String,
}

pub fn build_router(state: HttpState) -> Router {
    let static_route = format!("{}/{{*path}}", state.static_prefix);

    Router::new()
        .route(&static_route, get(static_asset))
        .route("/", get(site_root))
        .route("/{*path}", get(site_page))
        .with_state(state)
        .layer(middleware::from_fn(trace_requests))
}

async fn static_asset(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    match state.assets.resolve(&path).await {
        Some(asset) => asset.into_response(),
        None => not_found_response("infra::http::public::static_asset"),
    }
}

async fn site_root(State(state): State<HttpState>) -> Response {
    page_response(&state.site, "/")
}

async fn site_page(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    page_response(&state.site, &path)
}

fn page_response(site: &SiteMap, path: &str) -> Response {
    let Some(html) = site.get(path) else {
        return HttpError::new(
            "infra::http::public::site_page",
            StatusCode::NOT_FOUND,
            "Not Found",
            format!("no page for `/{}`", path.trim_start_matches('/')),
        )
        .into_response();
    };

    let len = html.len();
    let mut response = Response::new(Body::from(html.to_string()));
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}
