use std::{borrow::Cow, collections::HashSet};

use ammonia::Builder as AmmoniaBuilder;
use comrak::options::Options;

pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

/// Whitelist applied to every rendered fragment.
///
/// Besides the usual user-content tags it admits the code-block markup: the
/// toolbar button, the line-number table, `data-lang`, and inline `style` on
/// highlighter spans (passed through [`sanitize_style_attribute`]).
pub(crate) fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "abbr",
        "blockquote",
        "br",
        "button",
        "code",
        "dd",
        "del",
        "div",
        "dl",
        "dt",
        "em",
        "figcaption",
        "figure",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "i",
        "img",
        "input",
        "ins",
        "kbd",
        "li",
        "mark",
        "ol",
        "p",
        "pre",
        "s",
        "section",
        "span",
        "strong",
        "sub",
        "sup",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "u",
        "ul",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from([
        "class",
        "id",
        "title",
        "lang",
        "dir",
        "aria-hidden",
        "aria-label",
        "role",
        "data-footnote-ref",
        "data-footnotes",
        "data-footnote-backref",
        "data-footnote-backref-idx",
    ]);
    builder.generic_attributes(generic);

    builder.add_tag_attributes("a", &["target", "rel"]);
    builder.add_tag_attributes("button", &["type"]);
    builder.add_tag_attributes("div", &["data-lang"]);
    builder.add_tag_attributes("span", &["style"]);
    builder.add_tag_attributes("pre", &["style"]);
    builder.add_tag_attributes("code", &["style"]);
    builder.add_tag_attributes(
        "img",
        &["title", "width", "height", "alt", "loading", "decoding"],
    );
    builder.add_tag_attributes("th", &["align", "colspan", "rowspan", "scope"]);
    builder.add_tag_attributes("td", &["align", "colspan", "rowspan"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled"]);

    builder.add_url_schemes(["http", "https", "mailto", "tel"].iter().copied());
    // `rel` is whitelisted above and set by the decoration pass.
    builder.link_rel(None);

    builder.attribute_filter(|_element, attribute, value| {
        if attribute.eq_ignore_ascii_case("style") {
            sanitize_style_attribute(value).map(Cow::Owned)
        } else {
            Some(Cow::Borrowed(value))
        }
    });

    builder
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.tagfilter = false;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.superscript = true;
    ext.footnotes = true;
    ext.description_lists = true;
    ext.front_matter_delimiter = Some("---".to_string());

    let render = &mut options.render;
    render.r#unsafe = true;
    render.tasklist_classes = true;
    render.sourcepos = false;
}

fn sanitize_style_attribute(value: &str) -> Option<String> {
    let mut sanitized = Vec::new();

    for declaration in value.split(';') {
        let decl = declaration.trim();
        if decl.is_empty() {
            continue;
        }

        if is_safe_style_declaration(decl) {
            sanitized.push(decl);
        }
    }

    if sanitized.is_empty() {
        None
    } else {
        Some(sanitized.join("; "))
    }
}

fn is_safe_style_declaration(decl: &str) -> bool {
    let lower = decl.to_ascii_lowercase();

    const FORBIDDEN_SUBSTRINGS: [&str; 7] = [
        "expression(",
        "javascript:",
        "vbscript:",
        "-moz-binding",
        "behavior:",
        "behaviour:",
        "@import",
    ];

    if FORBIDDEN_SUBSTRINGS
        .iter()
        .any(|needle| lower.contains(needle))
    {
        return false;
    }

    !contains_unsafe_url(&lower)
}

fn contains_unsafe_url(lower_decl: &str) -> bool {
    let mut offset = 0;

    while let Some(start) = lower_decl[offset..].find("url(") {
        let open = offset + start + 4;
        let rest = &lower_decl[open..];
        let Some(close_rel) = rest.find(')') else {
            // unterminated
            return true;
        };

        let close = open + close_rel;
        let target = lower_decl[open..close]
            .trim_matches(|c: char| c.is_whitespace() || c == '\'' || c == '"');
        if is_unsafe_url(target) {
            return true;
        }

        offset = close + 1;
    }

    false
}

fn is_unsafe_url(url: &str) -> bool {
    if url.starts_with("data:image/") {
        return false;
    }

    url.starts_with("data:")
        || url.starts_with("file:")
        || url.contains("javascript:")
        || url.contains("vbscript:")
}

#[cfg(test)]
mod tests {
    use super::{build_sanitizer, contains_unsafe_url, sanitize_style_attribute};

    #[test]
    fn style_filter_keeps_highlighter_colours() {
        assert_eq!(
            sanitize_style_attribute("color:#a71d5d;").as_deref(),
            Some("color:#a71d5d")
        );
        assert_eq!(
            sanitize_style_attribute("background-color: #ffffff; color: #323232").as_deref(),
            Some("background-color: #ffffff; color: #323232")
        );
    }

    #[test]
    fn style_filter_drops_unsafe_rules() {
        let input = "color: red; background: url('javascript:alert(1)'); expression(test);";
        assert_eq!(sanitize_style_attribute(input).as_deref(), Some("color: red"));
        assert!(sanitize_style_attribute("background-image: url(javascript:x)").is_none());
    }

    #[test]
    fn detects_unsafe_urls() {
        assert!(contains_unsafe_url("background:url(javascript:alert(1))"));
        assert!(contains_unsafe_url("background:url(oops"));
        assert!(!contains_unsafe_url(
            "background:url('https://example.com/bg.png')"
        ));
        assert!(!contains_unsafe_url(
            "background:url('data:image/png;base64,AAAA')"
        ));
    }

    #[test]
    fn keeps_code_block_markup() {
        let html = build_sanitizer()
            .clean(concat!(
                "<div class=\"codeblock\" data-lang=\"go\">",
                "<div class=\"codeblock-toolbar\"><span class=\"codeblock-lang\">GO</span>",
                "<button type=\"button\" class=\"codeblock-copy\" aria-label=\"Copy code\">Copy</button></div>",
                "<div class=\"codeblock-body\"><table class=\"lntable\"><tbody><tr>",
                "<td class=\"lntd\"><span class=\"lnt\" id=\"L1-1\"><a class=\"lnlinks\" href=\"#L1-1\">1</a></span></td>",
                "<td class=\"lntd code\"><pre style=\"color: #323232\"><code>x</code></pre></td>",
                "</tr></tbody></table></div></div>"
            ))
            .to_string();

        assert!(html.contains("data-lang=\"go\""));
        assert!(html.contains("<button type=\"button\" class=\"codeblock-copy\" aria-label=\"Copy code\">"));
        assert!(html.contains("id=\"L1-1\""));
        assert!(html.contains("href=\"#L1-1\""));
        assert!(html.contains("style=\"color: #323232\""));
    }

    #[test]
    fn strips_scripts_and_event_handlers() {
        let html = build_sanitizer()
            .clean("<p onclick=\"x()\">hi</p><script>alert(1)</script>")
            .to_string();

        assert_eq!(html, "<p>hi</p>");
    }

    #[test]
    fn external_link_attributes_survive() {
        let html = build_sanitizer()
            .clean("<a href=\"https://example.com\" target=\"_blank\" rel=\"nofollow noopener noreferrer\">x</a>")
            .to_string();

        assert!(html.contains("target=\"_blank\""));
        assert!(html.contains("rel=\"nofollow noopener noreferrer\""));
    }
}
