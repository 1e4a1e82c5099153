//! Theme stylesheet for classed highlighter output.

use syntect::html::{ClassStyle, css_for_theme_with_class_style};
use tracing::warn;

use super::registry::HighlightRegistry;

/// Layout rules for the container, toolbar and line-number table.
const STRUCTURAL_CSS: &str = r#"
.codeblock { margin: 1rem 0; border: 1px solid #e5e7eb; border-radius: 0.5rem; overflow: hidden; }
.codeblock-toolbar { display: flex; align-items: center; justify-content: space-between; padding: 0.375rem 0.5rem; font: 12px/1.2 system-ui, sans-serif; background: #f8fafc; border-bottom: 1px solid #e5e7eb; }
.codeblock-lang { opacity: 0.75; letter-spacing: 0.04em; }
.codeblock-copy { border: 0; background: #eef2ff; padding: 0.25rem 0.5rem; border-radius: 0.375rem; cursor: pointer; }
.codeblock-copy.is-copied { background: #dcfce7; }
.codeblock-body { overflow: auto; }
.codeblock-body pre { margin: 0; padding: 0.75rem 0; }
.codeblock-body .line { display: inline-block; min-width: 100%; padding: 0 0.75rem; box-sizing: border-box; }

.lntable { border-spacing: 0; border-collapse: collapse; width: 100%; margin: 0; }
.lntable td { vertical-align: top; padding: 0; border: 0; }
.lntd:first-child { width: 1%; user-select: none; opacity: 0.6; }
.lnt { display: block; padding: 0 0.75rem; text-align: right; }
.lnt:target { background: #fff8c5; }
.lnlinks { color: inherit; text-decoration: none; }
.lntd.code { width: 99%; }
"#;

/// Theme CSS for the `syntax-` classes followed by the structural rules.
///
/// Unknown names resolve to the fallback theme. When syntect cannot produce
/// theme CSS only the structural rules are returned.
pub fn emit_css(registry: &HighlightRegistry, theme_name: &str) -> String {
    let theme = registry.theme_or_fallback(theme_name);
    let class_style = ClassStyle::SpacedPrefixed { prefix: "syntax-" };

    let mut css = match css_for_theme_with_class_style(theme, class_style) {
        Ok(css) => css,
        Err(err) => {
            warn!(
                target = "mdsite::render::stylesheet",
                theme = theme_name,
                error = %err,
                "Failed to generate theme css"
            );
            String::new()
        }
    };

    css.push_str(STRUCTURAL_CSS);
    css
}
