//! Markdown-to-HTML rendering pipeline.
//!
//! Rendering is pure: markdown text and a [`RenderOptions`] value go in, one
//! HTML string comes out. Stage failures degrade to simpler output and are
//! reported through tracing and metrics instead of errors.

mod content;
mod options;
mod service;
mod types;

pub use content::{
    ContentSource, FOOTER_COMPONENT, FsContentSource, HEADER_COMPONENT, MemoryContentSource,
};
pub use options::{DEFAULT_HIGHLIGHT_STYLE, DEFAULT_TAB_WIDTH, RenderOptions};
pub use service::{
    CLASS_PREFIX, DEFAULT_ASSET_PREFIX, DEFAULT_SITE_TITLE, FALLBACK_THEME, HighlightRegistry,
    LINE_ANCHOR_PREFIX, MarkdownRenderService, PLAIN_LABEL, PageAssets, emit_css,
    fallback_code_block,
};
pub use types::RenderError;
