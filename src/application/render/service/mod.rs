mod anchors;
mod codeblock;
mod compose;
mod config;
mod decorate;
mod highlight;
mod registry;
mod rewrite;
mod stylesheet;

use std::{sync::Arc, time::Instant};

use comrak::{
    Arena, format_html_with_plugins, nodes::AstNode, options::Plugins, parse_document,
};
use metrics::{counter, histogram};
use tracing::{debug, warn};

use crate::application::render::{
    content::{ContentSource, FOOTER_COMPONENT, HEADER_COMPONENT},
    options::RenderOptions,
    types::RenderError,
};

pub use codeblock::{PLAIN_LABEL, fallback_code_block};
pub use highlight::{CLASS_PREFIX, LINE_ANCHOR_PREFIX};
pub use registry::{FALLBACK_THEME, HighlightRegistry};
pub use stylesheet::emit_css;

use anchors::HeadingIds;
use compose::{PageParts, compose_document};
use config::{build_sanitizer, default_options};
use decorate::decorate;
use rewrite::{HeadingInfo, RewriteOutcome, rewrite_ast};

/// Prefix under which the page stylesheet and script are served by default.
pub const DEFAULT_ASSET_PREFIX: &str = "/_static";
/// Title used for pages without any heading.
pub const DEFAULT_SITE_TITLE: &str = "mdsite";

/// Asset references placed in the `<head>` of full pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageAssets {
    pub stylesheet_href: String,
    pub script_href: String,
}

impl PageAssets {
    /// `{prefix}/style.css` and `{prefix}/index.js`.
    pub fn under_prefix(prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        Self {
            stylesheet_href: format!("{prefix}/style.css"),
            script_href: format!("{prefix}/index.js"),
        }
    }
}

impl Default for PageAssets {
    fn default() -> Self {
        Self::under_prefix(DEFAULT_ASSET_PREFIX)
    }
}

/// Comrak-based pipeline with syntect highlighting and ammonia sanitisation.
///
/// Holds read-only state only, so one instance is shared across threads
/// behind an `Arc`. No stage error escapes [`render`](Self::render): each
/// stage has a degraded output it switches to instead.
pub struct MarkdownRenderService {
    options: comrak::Options<'static>,
    registry: Arc<HighlightRegistry>,
    sanitizer: ammonia::Builder<'static>,
    content: Arc<dyn ContentSource>,
    assets: PageAssets,
    site_title: String,
}

/// Decorated, not yet sanitised HTML plus what the rewrite pass observed.
struct RenderedBody {
    html: String,
    outcome: RewriteOutcome,
}

impl MarkdownRenderService {
    /// Renderer backed by the process-wide highlight registry.
    pub fn new(content: Arc<dyn ContentSource>) -> Self {
        Self {
            options: default_options(),
            registry: HighlightRegistry::shared(),
            sanitizer: build_sanitizer(),
            content,
            assets: PageAssets::default(),
            site_title: DEFAULT_SITE_TITLE.to_string(),
        }
    }

    pub fn with_registry(mut self, registry: Arc<HighlightRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_assets(mut self, assets: PageAssets) -> Self {
        self.assets = assets;
        self
    }

    pub fn with_site_title(mut self, site_title: impl Into<String>) -> Self {
        self.site_title = site_title.into();
        self
    }

    pub fn registry(&self) -> &HighlightRegistry {
        &self.registry
    }

    /// Render markdown as a fragment or a full page depending on
    /// `options.full_render`.
    pub fn render(&self, markdown: &str, options: &RenderOptions) -> String {
        if options.full_render {
            self.render_page(markdown, options)
        } else {
            self.render_fragment(markdown, options)
        }
    }

    /// Sanitised body HTML only. Never loads header or footer.
    pub fn render_fragment(&self, markdown: &str, options: &RenderOptions) -> String {
        let started = Instant::now();
        let html = self.fragment(markdown, options).html;
        record_render("fragment", started);
        html
    }

    /// Complete HTML document: body, header and footer fragments, theme css
    /// and asset references.
    pub fn render_page(&self, markdown: &str, options: &RenderOptions) -> String {
        let started = Instant::now();
        let component_options = options.fragment();

        let body = self.fragment(markdown, options);
        let header = self.component(HEADER_COMPONENT, &component_options);
        let footer = self.component(FOOTER_COMPONENT, &component_options);
        let theme_css = options
            .use_classes
            .then(|| self.emit_css(&options.highlight_style));

        let title = body.outcome.title().unwrap_or(&self.site_title);
        let document = compose_document(&PageParts {
            title,
            stylesheet_href: &self.assets.stylesheet_href,
            script_href: &self.assets.script_href,
            theme_css: theme_css.as_deref(),
            header: &header,
            body: &body.html,
            footer: &footer,
        });

        record_render("page", started);
        document
    }

    /// Fragment HTML with sanitisation skipped, for inspecting what the
    /// sanitiser removes.
    pub fn render_unsanitized(&self, markdown: &str, options: &RenderOptions) -> String {
        self.render_body(markdown, options).html
    }

    /// Apply the whitelist. Idempotent.
    pub fn sanitize(&self, html: &str) -> String {
        self.sanitizer.clean(html).to_string()
    }

    /// Highlight a single code fragment outside of any document.
    pub fn highlight(
        &self,
        code: &str,
        language: &str,
        options: &RenderOptions,
    ) -> Result<String, RenderError> {
        highlight::highlight_code(&self.registry, code, language, 1, options)
    }

    pub fn emit_css(&self, theme_name: &str) -> String {
        stylesheet::emit_css(&self.registry, theme_name)
    }

    fn fragment(&self, markdown: &str, options: &RenderOptions) -> RenderedBody {
        let RenderedBody { html, outcome } = self.render_body(markdown, options);
        RenderedBody {
            html: self.sanitize(&html),
            outcome,
        }
    }

    fn render_body(&self, markdown: &str, options: &RenderOptions) -> RenderedBody {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);
        let outcome = rewrite_ast(root, &self.registry, options);

        let html = match render_html_stage(root, &self.options, &outcome.headings) {
            Ok(html) => decorate(&html),
            Err(err) => {
                warn!(
                    target = "mdsite::render",
                    error = %err,
                    "HTML formatting failed; emitting escaped source"
                );
                format!("<pre>{}</pre>", codeblock::escape_html(markdown))
            }
        };

        debug!(
            target = "mdsite::render",
            code_blocks = outcome.code_blocks,
            fallbacks = outcome.fallbacks,
            headings = outcome.headings.len(),
            "Rendered markdown"
        );

        RenderedBody { html, outcome }
    }

    fn component(&self, name: &str, options: &RenderOptions) -> String {
        match self.content.load_component(name) {
            Ok(Some(markdown)) => self.fragment(&markdown, options).html,
            Ok(None) => String::new(),
            Err(err) => {
                warn!(
                    target = "mdsite::render",
                    component = name,
                    error = %err,
                    "Failed to read page component; rendering it empty"
                );
                String::new()
            }
        }
    }
}

fn render_html_stage<'a>(
    root: &'a AstNode<'a>,
    options: &comrak::Options<'static>,
    headings: &[HeadingInfo],
) -> Result<String, RenderError> {
    let heading_ids = HeadingIds::new(headings);
    let mut plugins = Plugins::default();
    plugins.render.heading_adapter = Some(&heading_ids);

    let mut html = String::new();
    format_html_with_plugins(root, options, &mut html, &plugins).map_err(|err| {
        RenderError::Markdown {
            message: err.to_string(),
        }
    })?;
    Ok(html)
}

fn record_render(mode: &'static str, started: Instant) {
    counter!("mdsite_render_total", "mode" => mode).increment(1);
    histogram!("mdsite_render_ms").record(started.elapsed().as_secs_f64() * 1000.0);
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::application::render::content::MemoryContentSource;

    struct BrokenSource;

    impl ContentSource for BrokenSource {
        fn load_component(&self, _name: &str) -> io::Result<Option<String>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    fn service() -> MarkdownRenderService {
        MarkdownRenderService::new(Arc::new(
            MemoryContentSource::new()
                .with_component(HEADER_COMPONENT, "**Site header**")
                .with_component(FOOTER_COMPONENT, "Footer text"),
        ))
    }

    #[test]
    fn go_block_gets_label_copy_button_and_highlighting() {
        let html = service().render("```go\nfmt.Println(\"hi\")\n```\n", &RenderOptions::default());

        assert!(html.contains("<div class=\"codeblock\" data-lang=\"go\">"));
        assert!(html.contains("<span class=\"codeblock-lang\">GO</span>"));
        assert!(html.contains("class=\"codeblock-copy\""));
        assert!(html.contains("syntax-"));
        assert!(html.contains("Println"));
    }

    #[test]
    fn plain_block_without_hint_keeps_container_shape() {
        let options = RenderOptions::default().with_syntax_highlight(false);
        let html = service().render("```\nplain\n```\n", &options);

        assert!(html.contains(concat!(
            "<div class=\"codeblock\"><div class=\"codeblock-toolbar\">",
            "<span class=\"codeblock-lang\">TEXT</span>",
            "<button type=\"button\" class=\"codeblock-copy\" aria-label=\"Copy code\">Copy</button>",
            "</div><div class=\"codeblock-body\"><pre><code>plain</code></pre></div></div>"
        )));
    }

    #[test]
    fn unknown_language_never_fails() {
        let html = service().render("```klingon\nqapla'\n```\n", &RenderOptions::default());

        assert!(html.contains("<span class=\"codeblock-lang\">KLINGON</span>"));
        assert!(html.contains("qapla"));
    }

    #[test]
    fn disabled_label_removes_label() {
        let options = RenderOptions::default().with_toolbar(false, true);
        let html = service().render("```rust\nfn main() {}\n```\n", &options);

        assert!(!html.contains("codeblock-lang"));
        assert!(html.contains("codeblock-copy"));
    }

    #[test]
    fn scripts_are_stripped() {
        let html = service().render(
            "<script>alert(1)</script>\n\nHello <b onclick=\"x()\">there</b>\n",
            &RenderOptions::default(),
        );

        assert!(!html.contains("<script"));
        assert!(!html.contains("alert(1)"));
        assert!(!html.contains("onclick"));
        assert!(html.contains("<b>there</b>"));
    }

    #[test]
    fn sanitize_is_idempotent() {
        let service = service();
        let rendered = service.render(
            "# Title\n\n```go\nfmt.Println(\"hi\")\n```\n\n[ext](https://example.com) & <em>done</em>\n",
            &RenderOptions::default().with_classes(false),
        );

        assert_eq!(service.sanitize(&rendered), rendered);
        let once = service.sanitize("<p title=\"a&quot;b\">x &amp; <i>y</p>");
        assert_eq!(service.sanitize(&once), once);
    }

    #[test]
    fn fragment_mode_has_no_page_chrome() {
        let html = service().render("# Hello", &RenderOptions::default());

        assert!(!html.contains("<header>"));
        assert!(!html.contains("<footer>"));
        assert!(!html.contains("<html"));
        assert!(html.contains("<h1 id=\"hello\">Hello</h1>"));
    }

    #[test]
    fn page_mode_wraps_body_with_components_once() {
        let html = service().render("# Welcome\n\nBody", &RenderOptions::page());

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert_eq!(html.matches("<header>").count(), 1);
        assert_eq!(html.matches("<footer>").count(), 1);
        assert!(html.contains("<header><p><strong>Site header</strong></p>\n</header>"));
        assert!(html.contains("<footer><p>Footer text</p>\n</footer>"));
        assert!(html.contains("<title>Welcome</title>"));
        assert!(html.contains("<link rel=\"stylesheet\" href=\"/_static/style.css\">"));
        assert!(html.contains("<style>"));
    }

    #[test]
    fn page_mode_with_missing_components_still_has_containers() {
        let service = MarkdownRenderService::new(Arc::new(MemoryContentSource::new()))
            .with_site_title("Handbook");
        let html = service.render("no headings here", &RenderOptions::page());

        assert!(html.contains("<header></header>"));
        assert!(html.contains("<footer></footer>"));
        assert!(html.contains("<title>Handbook</title>"));
    }

    #[test]
    fn unreadable_components_render_empty() {
        let service = MarkdownRenderService::new(Arc::new(BrokenSource));
        let html = service.render("text", &RenderOptions::page());

        assert!(html.contains("<header></header>"));
        assert!(html.contains("<main><p>text</p>\n</main>"));
    }

    #[test]
    fn inline_style_pages_skip_theme_css() {
        let options = RenderOptions::page().with_classes(false);
        let html = service().render("`x`", &options);

        assert!(!html.contains("<style>"));
    }

    #[test]
    fn custom_asset_prefix_is_used() {
        let service = service().with_assets(PageAssets::under_prefix("/assets/"));
        let html = service.render("x", &RenderOptions::page());

        assert!(html.contains("href=\"/assets/style.css\""));
        assert!(html.contains("src=\"/assets/index.js\""));
    }

    #[test]
    fn external_links_survive_sanitization() {
        let html = service().render(
            "[out](https://example.com) and [in](/docs)",
            &RenderOptions::default(),
        );

        assert!(html.contains("target=\"_blank\""));
        assert!(html.contains("rel=\"nofollow noopener noreferrer\""));
        assert!(html.contains("<a href=\"/docs\">in</a>"));
    }

    #[test]
    fn unsanitized_render_keeps_raw_html() {
        let html = service().render_unsanitized("<script>x()</script>", &RenderOptions::default());

        assert!(html.contains("<script>x()</script>"));
    }

    #[test]
    fn highlight_is_available_standalone() {
        let html = service()
            .highlight("SELECT 1;", "sql", &RenderOptions::default())
            .expect("highlighted");

        assert!(html.contains("data-lang=\"sql\""));
        assert!(html.contains("id=\"L1-1\""));
    }

    const GO_SNIPPET: &str = "if a < b && ok {\n\tfmt.Println(\"hi\")\n}\n";

    /// Text with every tag removed; entities are left as serialized.
    fn text_content(html: &str) -> String {
        let mut text = String::new();
        let mut in_tag = false;
        for ch in html.chars() {
            match ch {
                '<' => in_tag = true,
                '>' => in_tag = false,
                _ if !in_tag => text.push(ch),
                _ => {}
            }
        }
        text
    }

    fn attribute_value<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
        let needle = format!(" {name}=\"");
        let start = tag.find(&needle)? + needle.len();
        let len = tag[start..].find('"')?;
        Some(&tag[start..start + len])
    }

    /// Opening tags in document order with their structural attributes.
    /// `style` is only recorded as present since the sanitizer normalizes it.
    fn markup_outline(html: &str) -> Vec<String> {
        let mut outline = Vec::new();
        let mut rest = html;
        while let Some(open) = rest.find('<') {
            let after = &rest[open + 1..];
            let Some(close) = after.find('>') else {
                break;
            };
            let tag = &after[..close];
            rest = &after[close + 1..];
            if tag.starts_with('/') {
                continue;
            }

            let mut entry = tag.split_whitespace().next().unwrap_or_default().to_string();
            for name in ["class", "id", "href", "type", "aria-label", "data-lang"] {
                if let Some(value) = attribute_value(tag, name) {
                    entry.push_str(&format!(" {name}={value}"));
                }
            }
            if attribute_value(tag, "style").is_some() {
                entry.push_str(" style");
            }
            outline.push(entry);
        }
        outline
    }

    #[test]
    fn go_code_text_stays_escaped_after_sanitizing() {
        let markdown = format!("```go\n{GO_SNIPPET}```\n");

        for options in [
            RenderOptions::default(),
            RenderOptions::default().with_syntax_highlight(false),
        ] {
            let unsanitized = text_content(&service().render_unsanitized(&markdown, &options));
            assert!(unsanitized.contains("fmt.Println(&quot;hi&quot;)"), "{unsanitized}");

            let html = service().render_fragment(&markdown, &options);
            let text = text_content(&html);

            assert!(text.contains("a &lt; b &amp;&amp; ok"), "{text}");
            // Quotes come back as plain text once the sanitizer re-serializes.
            assert!(text.contains("fmt.Println(\"hi\")"), "{text}");
            assert!(!html.contains("&quot;"));
        }
    }

    #[test]
    fn sanitizer_keeps_highlighter_markup() {
        let service = service();

        for options in [
            RenderOptions::default(),
            RenderOptions::default().with_classes(false),
        ] {
            let raw = service
                .highlight(GO_SNIPPET, "go", &options)
                .expect("highlighted");
            let cleaned = service.sanitize(&raw);

            assert_eq!(markup_outline(&cleaned), markup_outline(&raw));
            assert!(cleaned.contains("<span class=\"line\">"));
            assert!(cleaned.contains("<pre class=\"lnt-column\">"));
            assert!(cleaned.contains("<td class=\"lntd code\">"));
            assert!(cleaned.contains("<span class=\"lnt\" id=\"L1-3\">"));
            assert!(cleaned.contains("<a class=\"lnlinks\" href=\"#L1-3\">3</a>"));
            assert!(cleaned.contains("class=\"codeblock-copy\""));
        }

        let inline = service
            .highlight(GO_SNIPPET, "go", &RenderOptions::default().with_classes(false))
            .expect("highlighted");
        let cleaned = service.sanitize(&inline);
        assert!(cleaned.contains("<span style=\"color:"));
        assert!(!cleaned.contains("syntax-keyword"));
    }
}
