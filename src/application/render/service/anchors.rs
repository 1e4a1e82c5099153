//! Heading ids written by comrak itself, from the slugs the AST pass recorded.
//!
//! Raw `<hN>` markup in the source goes through comrak untouched and never
//! reaches the adapter, so it cannot shift the ids of markdown headings.

use std::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};

use comrak::{
    adapters::{HeadingAdapter, HeadingMeta},
    nodes::Sourcepos,
};

use super::{codeblock::escape_html, rewrite::HeadingInfo};

/// Hands out recorded slugs in document order, one per rendered heading.
pub(crate) struct HeadingIds<'a> {
    headings: &'a [HeadingInfo],
    next: AtomicUsize,
}

impl<'a> HeadingIds<'a> {
    pub(crate) fn new(headings: &'a [HeadingInfo]) -> Self {
        Self {
            headings,
            next: AtomicUsize::new(0),
        }
    }
}

impl HeadingAdapter for HeadingIds<'_> {
    fn enter(
        &self,
        output: &mut dyn fmt::Write,
        heading: &HeadingMeta,
        _sourcepos: Option<Sourcepos>,
    ) -> fmt::Result {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        match self
            .headings
            .get(index)
            .filter(|info| info.level == heading.level)
        {
            Some(info) => write!(
                output,
                "<h{} id=\"{}\">",
                heading.level,
                escape_html(&info.slug)
            ),
            None => write!(output, "<h{}>", heading.level),
        }
    }

    fn exit(&self, output: &mut dyn fmt::Write, heading: &HeadingMeta) -> fmt::Result {
        writeln!(output, "</h{}>", heading.level)
    }
}

#[cfg(test)]
mod tests {
    use comrak::{Arena, format_html_with_plugins, options::Plugins, parse_document};

    use super::*;
    use crate::application::render::service::config::default_options;

    fn heading(level: u8, slug: &str) -> HeadingInfo {
        HeadingInfo {
            level,
            slug: slug.to_string(),
            text: slug.to_string(),
        }
    }

    fn render(markdown: &str, headings: &[HeadingInfo]) -> String {
        let options = default_options();
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &options);
        let ids = HeadingIds::new(headings);
        let mut plugins = Plugins::default();
        plugins.render.heading_adapter = Some(&ids);

        let mut html = String::new();
        format_html_with_plugins(root, &options, &mut html, &plugins).expect("html");
        html
    }

    #[test]
    fn assigns_ids_in_document_order() {
        let html = render("# A\n\nx\n\n## B\n", &[heading(1, "a"), heading(2, "b")]);

        assert_eq!(html, "<h1 id=\"a\">A</h1>\n<p>x</p>\n<h2 id=\"b\">B</h2>\n");
    }

    #[test]
    fn raw_headings_do_not_consume_ids() {
        let html = render(
            "<h2>raw</h2>\n\n# Real\n\n## Other\n",
            &[heading(1, "real"), heading(2, "other")],
        );

        assert!(html.contains("<h2>raw</h2>"));
        assert!(html.contains("<h1 id=\"real\">Real</h1>"));
        assert!(html.contains("<h2 id=\"other\">Other</h2>"));
    }

    #[test]
    fn headings_without_a_recorded_slug_render_bare() {
        let html = render("# A\n\n## B\n", &[heading(1, "a")]);

        assert!(html.contains("<h1 id=\"a\">A</h1>"));
        assert!(html.contains("<h2>B</h2>"));
    }
}
