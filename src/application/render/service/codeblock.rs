//! Code-block container shared by the highlighter and the plain-text fallback.
//!
//! Both paths produce the same outer structure so the stylesheet and the
//! copy button behave identically whether or not highlighting succeeded:
//!
//! ```text
//! <div class="codeblock" data-lang="go">
//!   <div class="codeblock-toolbar">
//!     <span class="codeblock-lang">GO</span>
//!     <button type="button" class="codeblock-copy" aria-label="Copy code">Copy</button>
//!   </div>
//!   <div class="codeblock-body">…</div>
//! </div>
//! ```

use crate::application::render::options::RenderOptions;

/// Label shown when a block carries no language hint.
pub const PLAIN_LABEL: &str = "text";

/// Wrap rendered code in the container and optional toolbar.
pub(crate) fn wrap_code_block(language: &str, body: &str, options: &RenderOptions) -> String {
    let language = language.trim();
    let mut html = String::with_capacity(body.len() + 256);

    html.push_str("<div class=\"codeblock\"");
    if !language.is_empty() {
        html.push_str(" data-lang=\"");
        html.push_str(&escape_html(&language.to_lowercase()));
        html.push('"');
    }
    html.push('>');

    if options.show_language_label || options.copy_button {
        html.push_str("<div class=\"codeblock-toolbar\">");
        if options.show_language_label {
            let label = if language.is_empty() {
                PLAIN_LABEL
            } else {
                language
            };
            html.push_str("<span class=\"codeblock-lang\">");
            html.push_str(&escape_html(&label.to_uppercase()));
            html.push_str("</span>");
        }
        if options.copy_button {
            html.push_str(
                "<button type=\"button\" class=\"codeblock-copy\" aria-label=\"Copy code\">Copy</button>",
            );
        }
        html.push_str("</div>");
    }

    html.push_str("<div class=\"codeblock-body\">");
    html.push_str(body);
    html.push_str("</div></div>");
    html
}

/// Escaped, unhighlighted rendition of a code block. Always succeeds.
pub fn fallback_code_block(code: &str, language: &str, options: &RenderOptions) -> String {
    let language = language.trim();
    let code = code.strip_suffix('\n').unwrap_or(code);

    let mut body = String::with_capacity(code.len() + 48);
    body.push_str("<pre><code");
    if !language.is_empty() {
        body.push_str(" class=\"language-");
        body.push_str(&escape_html(&language.to_lowercase()));
        body.push('"');
    }
    body.push('>');
    body.push_str(&escape_html(code));
    body.push_str("</code></pre>");

    wrap_code_block(language, &body, options)
}

pub(crate) fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
