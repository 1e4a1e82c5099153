use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use metrics::counter;
use tracing::debug;

use crate::{application::render::options::RenderOptions, domain::slug::AnchorSlugger};

use super::{codeblock::fallback_code_block, highlight, registry::HighlightRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HeadingInfo {
    pub(crate) level: u8,
    pub(crate) slug: String,
    pub(crate) text: String,
}

#[derive(Debug, Default)]
pub(crate) struct RewriteOutcome {
    pub(crate) code_blocks: usize,
    pub(crate) fallbacks: usize,
    pub(crate) headings: Vec<HeadingInfo>,
}

impl RewriteOutcome {
    /// Text of the first heading, used as the page title.
    pub(crate) fn title(&self) -> Option<&str> {
        self.headings
            .first()
            .map(|heading| heading.text.as_str())
            .filter(|text| !text.is_empty())
    }
}

/// Replace every code block with pre-rendered HTML and record headings.
///
/// Code blocks become `HtmlBlock` nodes so comrak emits the markup verbatim.
/// Everything else is left for comrak's own renderer.
pub(crate) fn rewrite_ast<'a>(
    root: &'a AstNode<'a>,
    registry: &HighlightRegistry,
    options: &RenderOptions,
) -> RewriteOutcome {
    let mut walker = RewriteWalker::new(registry, options);
    walker.visit_nodes(root);
    walker.outcome
}

struct RewriteWalker<'a> {
    registry: &'a HighlightRegistry,
    options: &'a RenderOptions,
    outcome: RewriteOutcome,
    slugger: AnchorSlugger,
}

impl<'a> RewriteWalker<'a> {
    fn new(registry: &'a HighlightRegistry, options: &'a RenderOptions) -> Self {
        Self {
            registry,
            options,
            outcome: RewriteOutcome::default(),
            slugger: AnchorSlugger::new(),
        }
    }

    fn visit_nodes(&mut self, node: &AstNode<'_>) {
        if let Some(level) = heading_level(node) {
            let text = collect_inline_text(node);
            let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
            let slug = self.slugger.anchor_for(&normalized);
            self.outcome.headings.push(HeadingInfo {
                level,
                slug,
                text: normalized,
            });
        }

        if let Some((language, literal)) = extract_code_block(node) {
            let html = self.render_code_block(&language, &literal);
            let mut data = node.data.borrow_mut();
            data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
                block_type: 0,
                literal: html,
            });
        }

        let mut child = node.first_child();
        while let Some(next) = child {
            self.visit_nodes(next);
            child = next.next_sibling();
        }
    }

    fn render_code_block(&mut self, language: &str, literal: &str) -> String {
        self.outcome.code_blocks += 1;

        if !self.options.syntax_highlight {
            return fallback_code_block(literal, language, self.options);
        }

        let block = self.outcome.code_blocks;
        match highlight::highlight_code(self.registry, literal, language, block, self.options) {
            Ok(html) => html,
            Err(err) => {
                debug!(
                    target = "mdsite::render::highlight",
                    language,
                    block,
                    error = %err,
                    "Highlighting failed; using plain code block"
                );
                counter!("mdsite_highlight_fallback_total").increment(1);
                self.outcome.fallbacks += 1;
                fallback_code_block(literal, language, self.options)
            }
        }
    }
}

/// `(hint, literal)` for code-block nodes. Indented blocks carry no hint;
/// fenced blocks use the first word of the info string, lowercased.
fn extract_code_block(node: &AstNode<'_>) -> Option<(String, String)> {
    let data = node.data.borrow();
    let NodeValue::CodeBlock(block) = &data.value else {
        return None;
    };

    let language = if block.fenced {
        block
            .info
            .split_whitespace()
            .next()
            .map(str::to_lowercase)
            .unwrap_or_default()
    } else {
        String::new()
    };

    Some((language, block.literal.clone()))
}

fn heading_level(node: &AstNode<'_>) -> Option<u8> {
    let data = node.data.borrow();
    if let NodeValue::Heading(heading) = &data.value {
        Some(heading.level)
    } else {
        None
    }
}

fn collect_inline_text(node: &AstNode<'_>) -> String {
    fn walk(node: &AstNode<'_>, buffer: &mut String) {
        {
            let data = node.data.borrow();
            match &data.value {
                NodeValue::Text(text) => buffer.push_str(text),
                NodeValue::Code(code) => buffer.push_str(&code.literal),
                NodeValue::LineBreak | NodeValue::SoftBreak => buffer.push(' '),
                _ => {}
            }
        }
        let mut child = node.first_child();
        while let Some(next) = child {
            walk(next, buffer);
            child = next.next_sibling();
        }
    }

    let mut text = String::new();
    let mut child = node.first_child();
    while let Some(next) = child {
        walk(next, &mut text);
        child = next.next_sibling();
    }
    text
}

#[cfg(test)]
mod tests {
    use comrak::{Arena, format_html, parse_document};
    use syntect::{highlighting::ThemeSet, parsing::SyntaxSet};

    use super::*;
    use crate::application::render::service::config::default_options;

    fn registry() -> HighlightRegistry {
        HighlightRegistry::new(
            SyntaxSet::load_defaults_newlines(),
            ThemeSet::load_defaults(),
        )
    }

    fn render(markdown: &str, options: &RenderOptions) -> (String, RewriteOutcome) {
        let comrak_options = default_options();
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &comrak_options);
        let outcome = rewrite_ast(root, &registry(), options);

        let mut html = String::new();
        format_html(root, &comrak_options, &mut html).expect("html");
        (html, outcome)
    }

    #[test]
    fn fenced_block_is_replaced_by_highlighter_output() {
        let (html, outcome) = render(
            "```Go linenos\nfmt.Println(\"hi\")\n```\n",
            &RenderOptions::default(),
        );

        assert_eq!(outcome.code_blocks, 1);
        assert_eq!(outcome.fallbacks, 0);
        assert!(html.contains("<div class=\"codeblock\" data-lang=\"go\">"));
        assert!(html.contains("syntax-source"));
        assert!(!html.contains("<pre><code class=\"language-go\">"));
    }

    #[test]
    fn indented_block_has_no_hint() {
        let (html, outcome) = render("Intro\n\n    let x = 1;\n", &RenderOptions::default());

        assert_eq!(outcome.code_blocks, 1);
        assert!(html.contains("<div class=\"codeblock\">"));
        assert!(html.contains("<span class=\"codeblock-lang\">TEXT</span>"));
    }

    #[test]
    fn disabled_highlighting_uses_fallback_without_classes() {
        let options = RenderOptions::default().with_syntax_highlight(false);
        let (html, _) = render("```rust\nlet a = \"<b>\";\n```\n", &options);

        assert!(html.contains("<code class=\"language-rust\">let a = &quot;&lt;b&gt;&quot;;</code>"));
        assert!(!html.contains("syntax-"));
    }

    #[test]
    fn literal_is_not_rendered_as_markdown() {
        let (html, _) = render("```\n# not a heading\n*not emphasis*\n```\n", &RenderOptions::default());

        assert!(!html.contains("<h1>"));
        assert!(!html.contains("<em>"));
        assert!(html.contains("*not emphasis*"));
    }

    #[test]
    fn line_anchors_are_numbered_per_block() {
        let (html, outcome) = render(
            "```\na\n```\n\n```\nb\n```\n",
            &RenderOptions::default(),
        );

        assert_eq!(outcome.code_blocks, 2);
        assert!(html.contains("id=\"L1-1\""));
        assert!(html.contains("id=\"L2-1\""));
    }

    #[test]
    fn headings_are_recorded_with_unique_slugs() {
        let (_, outcome) = render(
            "# Getting `started`\n\n## Setup\n\n## Setup\n",
            &RenderOptions::default(),
        );

        let slugs: Vec<_> = outcome.headings.iter().map(|h| h.slug.as_str()).collect();
        assert_eq!(slugs, ["getting-started", "setup", "setup-2"]);
        assert_eq!(outcome.headings[0].level, 1);
        assert_eq!(outcome.title(), Some("Getting started"));
    }

    #[test]
    fn other_nodes_use_standard_rendering() {
        let (html, _) = render(
            "| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n\n- [x] done\n",
            &RenderOptions::default(),
        );

        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains("type=\"checkbox\""));
    }
}
