//! Tokenizing highlighter: grammar selection, tokenization, HTML formatting.
//!
//! Code is tokenized once per line with syntect's `ParseState`. The resulting
//! token stream is formatted either with `syntax-` prefixed classes (themed by
//! the emitted stylesheet) or with inline colours from the resolved theme.
//! Each line is closed on its own, which keeps the line-number table aligned.

use syntect::{
    highlighting::{Color, HighlightIterator, HighlightState, Highlighter, Style, Theme},
    html::{IncludeBackground, styled_line_to_highlighted_html},
    parsing::{ParseState, Scope, ScopeStack, SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

use crate::application::render::{options::RenderOptions, types::RenderError};

use super::{
    codeblock::{escape_html, wrap_code_block},
    registry::HighlightRegistry,
};

/// Prefix applied to every scope atom in classed output.
pub const CLASS_PREFIX: &str = "syntax-";
/// Prefix of line anchors, followed by `{block}-{line}`.
pub const LINE_ANCHOR_PREFIX: &str = "L";

/// How a token should be styled.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    /// Scope stack active for the token (classed output).
    Scopes(Vec<Scope>),
    /// Resolved theme style (inline output).
    Styled(Style),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token<'a> {
    pub(crate) kind: TokenKind,
    pub(crate) text: &'a str,
}

/// Highlight one code block and wrap it in the shared container.
///
/// `block` is the 1-based ordinal of the block in its document and keeps
/// line anchors unique when a page holds several blocks.
pub(crate) fn highlight_code(
    registry: &HighlightRegistry,
    code: &str,
    language: &str,
    block: usize,
    options: &RenderOptions,
) -> Result<String, RenderError> {
    let language = language.trim();
    let syntax = registry.select_syntax(language, code);
    let source = normalize_source(code, options.tab_width);

    let theme = (!options.use_classes).then(|| registry.theme_or_fallback(&options.highlight_style));
    let lines = tokenize(registry.syntax_set(), syntax, &source, theme)
        .map_err(|message| RenderError::highlighting(language, message))?;

    let mut rendered_lines = Vec::with_capacity(lines.len());
    for tokens in &lines {
        let line = format_line(tokens).map_err(|err| RenderError::highlighting(language, err))?;
        rendered_lines.push(line);
    }

    let body = format_body(&rendered_lines, language, block, theme, options);
    Ok(wrap_code_block(language, &body, options))
}

/// Split `source` into per-line token streams.
///
/// With a theme the tokens carry resolved styles; without one they carry the
/// scope stack so the formatter can emit classes.
pub(crate) fn tokenize<'a>(
    syntax_set: &SyntaxSet,
    syntax: &SyntaxReference,
    source: &'a str,
    theme: Option<&Theme>,
) -> Result<Vec<Vec<Token<'a>>>, String> {
    let mut parse_state = ParseState::new(syntax);
    let mut scope_stack = ScopeStack::new();
    let highlighter = theme.map(Highlighter::new);
    let mut highlight_state = highlighter
        .as_ref()
        .map(|highlighter| HighlightState::new(highlighter, ScopeStack::new()));

    let mut lines = Vec::new();
    for line in LinesWithEndings::from(source) {
        let ops = parse_state
            .parse_line(line, syntax_set)
            .map_err(|err| err.to_string())?;

        let tokens = match (&highlighter, highlight_state.as_mut()) {
            (Some(highlighter), Some(state)) => {
                // Regions are contiguous; re-slice from `line` so tokens borrow the source.
                let regions: Vec<(Style, usize)> =
                    HighlightIterator::new(state, &ops, line, highlighter)
                        .map(|(style, text)| (style, text.len()))
                        .collect();
                let mut cursor = 0;
                let mut tokens = Vec::with_capacity(regions.len());
                for (style, len) in regions {
                    let text = &line[cursor..cursor + len];
                    cursor += len;
                    if !text.is_empty() {
                        tokens.push(Token {
                            kind: TokenKind::Styled(style),
                            text,
                        });
                    }
                }
                tokens
            }
            _ => {
                let mut tokens = Vec::new();
                let mut cursor = 0;
                for (offset, op) in &ops {
                    let offset = (*offset).min(line.len());
                    if offset > cursor {
                        tokens.push(Token {
                            kind: TokenKind::Scopes(scope_stack.as_slice().to_vec()),
                            text: &line[cursor..offset],
                        });
                        cursor = offset;
                    }
                    scope_stack.apply(op).map_err(|err| format!("{err:?}"))?;
                }
                if cursor < line.len() {
                    tokens.push(Token {
                        kind: TokenKind::Scopes(scope_stack.as_slice().to_vec()),
                        text: &line[cursor..],
                    });
                }
                tokens
            }
        };

        lines.push(tokens);
    }

    Ok(lines)
}

fn format_line(tokens: &[Token<'_>]) -> Result<String, syntect::Error> {
    let mut html = String::from("<span class=\"line\">");

    for token in tokens {
        let text = token.text.trim_end_matches(['\n', '\r']);
        if text.is_empty() {
            continue;
        }

        match &token.kind {
            TokenKind::Scopes(scopes) => {
                for scope in scopes {
                    html.push_str("<span class=\"");
                    html.push_str(&scope_classes(*scope));
                    html.push_str("\">");
                }
                html.push_str(&escape_html(text));
                for _ in scopes {
                    html.push_str("</span>");
                }
            }
            TokenKind::Styled(style) => {
                html.push_str(&styled_line_to_highlighted_html(
                    &[(*style, text)],
                    IncludeBackground::No,
                )?);
            }
        }
    }

    html.push_str("</span>");
    Ok(html)
}

fn format_body(
    lines: &[String],
    language: &str,
    block: usize,
    theme: Option<&Theme>,
    options: &RenderOptions,
) -> String {
    let mut pre = String::from("<pre class=\"syntax-highlight");
    if theme.is_none() {
        pre.push(' ');
        pre.push_str(CLASS_PREFIX);
        pre.push_str("code");
    }
    pre.push('"');
    if let Some(style) = theme.and_then(pre_style) {
        pre.push_str(" style=\"");
        pre.push_str(&style);
        pre.push('"');
    }
    pre.push_str("><code");
    if !language.is_empty() {
        pre.push_str(" class=\"language-");
        pre.push_str(&escape_html(&language.to_lowercase()));
        pre.push('"');
    }
    pre.push('>');
    for line in lines {
        pre.push_str(line);
        pre.push('\n');
    }
    pre.push_str("</code></pre>");

    if !options.line_numbers {
        return pre;
    }

    let mut gutter = String::from("<pre class=\"lnt-column\"><code>");
    for number in 1..=lines.len() {
        if options.linkable_line_numbers {
            let anchor = format!("{LINE_ANCHOR_PREFIX}{block}-{number}");
            gutter.push_str(&format!(
                "<span class=\"lnt\" id=\"{anchor}\"><a class=\"lnlinks\" href=\"#{anchor}\">{number}</a></span>\n"
            ));
        } else {
            gutter.push_str(&format!("<span class=\"lnt\">{number}</span>\n"));
        }
    }
    gutter.push_str("</code></pre>");

    format!(
        "<table class=\"lntable\"><tbody><tr><td class=\"lntd\">{gutter}</td><td class=\"lntd code\">{pre}</td></tr></tbody></table>"
    )
}

/// `syntax-keyword syntax-control syntax-go` for `keyword.control.go`.
fn scope_classes(scope: Scope) -> String {
    scope
        .build_string()
        .split('.')
        .filter(|atom| !atom.is_empty())
        .map(|atom| format!("{CLASS_PREFIX}{atom}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn pre_style(theme: &Theme) -> Option<String> {
    let mut declarations = Vec::new();
    if let Some(background) = theme.settings.background {
        declarations.push(format!("background-color: {}", color_hex(background)));
    }
    if let Some(foreground) = theme.settings.foreground {
        declarations.push(format!("color: {}", color_hex(foreground)));
    }
    (!declarations.is_empty()).then(|| declarations.join("; "))
}

fn color_hex(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

/// Expand tabs and make sure the final line ends with a newline, which the
/// newline-aware grammars expect.
fn normalize_source(code: &str, tab_width: usize) -> String {
    let mut source = if tab_width == 0 || !code.contains('\t') {
        code.to_string()
    } else {
        expand_tabs(code, tab_width)
    };
    if !source.is_empty() && !source.ends_with('\n') {
        source.push('\n');
    }
    source
}

fn expand_tabs(code: &str, tab_width: usize) -> String {
    let mut expanded = String::with_capacity(code.len());
    let mut column = 0usize;

    for ch in code.chars() {
        match ch {
            '\t' => {
                let spaces = tab_width - (column % tab_width);
                expanded.extend(std::iter::repeat_n(' ', spaces));
                column += spaces;
            }
            '\n' => {
                expanded.push(ch);
                column = 0;
            }
            _ => {
                expanded.push(ch);
                column += 1;
            }
        }
    }

    expanded
}
