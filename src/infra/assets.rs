//! Static asset serving: the configured directory first, then the bundle
//! compiled into the binary.

use std::{io::ErrorKind, path::PathBuf};

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use include_dir::{Dir, include_dir};
use mime_guess::Mime;
use tracing::warn;

use crate::application::error::ErrorReport;

static EMBEDDED_ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

/// A resolved asset ready to be sent.
#[derive(Debug, Clone)]
pub struct Asset {
    contents: Bytes,
    mime: Mime,
}

impl Asset {
    pub fn contents(&self) -> &Bytes {
        &self.contents
    }

    pub fn mime(&self) -> &Mime {
        &self.mime
    }
}

/// Asset lookup rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct StaticAssets {
    directory: PathBuf,
}

impl StaticAssets {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Resolve a request path relative to the asset root.
    ///
    /// Paths that try to leave the root or name a directory resolve to `None`.
    pub async fn resolve(&self, path: &str) -> Option<Asset> {
        let segments = validate_asset_path(path)?;
        let relative = segments.join("/");
        let mime = mime_guess::from_path(&relative).first_or_octet_stream();

        let on_disk = segments
            .iter()
            .fold(self.directory.clone(), |acc, segment| acc.join(segment));
        match tokio::fs::read(&on_disk).await {
            Ok(bytes) => {
                return Some(Asset {
                    contents: Bytes::from(bytes),
                    mime,
                });
            }
            Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {}
            Err(err) => {
                warn!(
                    target = "mdsite::assets",
                    path = %on_disk.display(),
                    error = %err,
                    "Failed to read static asset; trying embedded bundle"
                );
            }
        }

        let file = EMBEDDED_ASSETS.get_file(&relative)?;
        Some(Asset {
            contents: Bytes::from_static(file.contents()),
            mime,
        })
    }
}

/// Split `path` into safe segments. Rejects empty paths, directory paths,
/// `.`/`..` segments and backslashes.
fn validate_asset_path(path: &str) -> Option<Vec<&str>> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        return None;
    }

    let segments: Vec<&str> = trimmed.split('/').collect();
    let safe = segments.iter().all(|segment| {
        !segment.is_empty() && *segment != "." && *segment != ".." && !segment.contains('\\')
    });
    safe.then_some(segments)
}

impl IntoResponse for Asset {
    fn into_response(self) -> Response {
        build_response(self.contents, &self.mime)
    }
}

pub(crate) fn not_found_response(source: &'static str) -> Response {
    let mut response = StatusCode::NOT_FOUND.into_response();
    ErrorReport::from_message(source, StatusCode::NOT_FOUND, "Static asset not found")
        .attach(&mut response);
    response
}

fn build_response(bytes: Bytes, mime: &Mime) -> Response {
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    );

    response
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn rejects_traversal_and_directories() {
        assert!(validate_asset_path("../secret").is_none());
        assert!(validate_asset_path("css/../../x").is_none());
        assert!(validate_asset_path("css/").is_none());
        assert!(validate_asset_path("").is_none());
        assert!(validate_asset_path("a\\b").is_none());
        assert_eq!(
            validate_asset_path("/css/site.css"),
            Some(vec!["css", "site.css"])
        );
    }

    #[tokio::test]
    async fn disk_assets_take_precedence_over_bundle() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(dir.path().join("style.css"), "body{}").expect("write");
        let assets = StaticAssets::new(dir.path());

        let asset = assets.resolve("style.css").await.expect("asset");
        assert_eq!(asset.contents().as_ref(), b"body{}");
        assert_eq!(asset.mime().essence_str(), "text/css");
    }

    #[tokio::test]
    async fn falls_back_to_embedded_bundle() {
        let dir = tempfile::tempdir().expect("temp dir");
        let assets = StaticAssets::new(dir.path().join("missing"));

        let asset = assets.resolve("index.js").await.expect("embedded asset");
        assert!(!asset.contents().is_empty());
        assert!(assets.resolve("nope.txt").await.is_none());
    }
}
