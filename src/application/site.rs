//! Page discovery and the startup site map.

use std::{
    collections::HashMap,
    io,
    num::NonZeroUsize,
    path::{Component, Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use futures::{StreamExt, TryStreamExt, stream};
use metrics::gauge;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::application::render::{MarkdownRenderService, RenderOptions};

/// File name that turns a directory into a page.
pub const PAGE_FILE: &str = "page.md";

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("content directory `{path}` is not a directory")]
    NotADirectory { path: PathBuf },
    #[error("failed to walk content directory: {source}")]
    Walk {
        #[source]
        source: walkdir::Error,
    },
    #[error("failed to read `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("render task for `{path}` did not complete: {message}")]
    Task { path: PathBuf, message: String },
}

/// A discovered page: its request path and the markdown file behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSource {
    pub route: String,
    pub file: PathBuf,
}

/// Request path → rendered document. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct SiteMap {
    pages: HashMap<String, Arc<str>>,
}

impl SiteMap {
    pub fn from_pages(pages: impl IntoIterator<Item = (String, Arc<str>)>) -> Self {
        Self {
            pages: pages.into_iter().collect(),
        }
    }

    /// Look up a request path; trailing slashes are ignored.
    pub fn get(&self, path: &str) -> Option<Arc<str>> {
        self.pages.get(&normalize_route(path)).cloned()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Routes in sorted order.
    pub fn routes(&self) -> Vec<&str> {
        let mut routes: Vec<&str> = self.pages.keys().map(String::as_str).collect();
        routes.sort_unstable();
        routes
    }
}

/// `/docs/`, `docs`, `/docs//` → `/docs`; empty → `/`.
pub fn normalize_route(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Route served for `file`, or `None` when it is not a page file under `root`.
pub fn route_for(root: &Path, file: &Path) -> Option<String> {
    if file.file_name()? != PAGE_FILE {
        return None;
    }

    let relative = file.parent()?.strip_prefix(root).ok()?;
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return None,
        }
    }

    Some(format!("/{}", segments.join("/")))
}

/// Every `page.md` under `root`, sorted by route.
pub fn discover_pages(root: &Path) -> Result<Vec<PageSource>, SiteError> {
    if !root.is_dir() {
        return Err(SiteError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let mut pages = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| SiteError::Walk { source })?;
        if !entry.file_type().is_file() {
            continue;
        }

        if let Some(route) = route_for(root, entry.path()) {
            pages.push(PageSource {
                route,
                file: entry.path().to_path_buf(),
            });
        }
    }

    pages.sort_by(|left, right| left.route.cmp(&right.route));
    Ok(pages)
}

/// Render every discovered page in full-page mode.
///
/// Rendering runs on the blocking pool with at most `concurrency` pages in
/// flight. Any read failure aborts the build.
pub async fn build_site_map(
    root: &Path,
    renderer: Arc<MarkdownRenderService>,
    options: &RenderOptions,
    concurrency: NonZeroUsize,
) -> Result<SiteMap, SiteError> {
    let started = Instant::now();
    let sources = discover_pages(root)?;
    let options = Arc::new(options.clone().with_full_render(true));

    let pages: Vec<(String, Arc<str>)> = stream::iter(sources)
        .map(|source| {
            let renderer = Arc::clone(&renderer);
            let options = Arc::clone(&options);
            async move { render_source(source, renderer, options).await }
        })
        .buffer_unordered(concurrency.get())
        .try_collect()
        .await?;

    let site = SiteMap::from_pages(pages);
    gauge!("mdsite_site_pages").set(site.len() as f64);
    info!(
        target = "mdsite::site",
        root = %root.display(),
        pages = site.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Site map built"
    );

    Ok(site)
}

async fn render_source(
    source: PageSource,
    renderer: Arc<MarkdownRenderService>,
    options: Arc<RenderOptions>,
) -> Result<(String, Arc<str>), SiteError> {
    let PageSource { route, file } = source;
    let task_path = file.clone();

    let rendered = tokio::task::spawn_blocking(move || {
        let markdown = std::fs::read_to_string(&file).map_err(|source| SiteError::Read {
            path: file.clone(),
            source,
        })?;
        debug!(
            target = "mdsite::site",
            route = %route,
            file = %file.display(),
            "Rendering page"
        );
        let html = renderer.render_page(&markdown, &options);
        Ok::<_, SiteError>((route, Arc::<str>::from(html)))
    })
    .await
    .map_err(|err| SiteError::Task {
        path: task_path,
        message: err.to_string(),
    })??;

    Ok(rendered)
}
