//! Full-page document assembly.

use super::codeblock::escape_html;

/// Everything a page needs besides its body.
#[derive(Debug, Clone, Default)]
pub(crate) struct PageParts<'a> {
    pub(crate) title: &'a str,
    pub(crate) stylesheet_href: &'a str,
    pub(crate) script_href: &'a str,
    /// Inline theme CSS; omitted when highlighting uses inline styles.
    pub(crate) theme_css: Option<&'a str>,
    pub(crate) header: &'a str,
    pub(crate) body: &'a str,
    pub(crate) footer: &'a str,
}

pub(crate) fn compose_document(parts: &PageParts<'_>) -> String {
    let mut html = String::with_capacity(
        parts.body.len()
            + parts.header.len()
            + parts.footer.len()
            + parts.theme_css.map_or(0, str::len)
            + 512,
    );

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str("<title>");
    html.push_str(&escape_html(parts.title));
    html.push_str("</title>\n");
    html.push_str("<link rel=\"stylesheet\" href=\"");
    html.push_str(&escape_html(parts.stylesheet_href));
    html.push_str("\">\n");
    if let Some(css) = parts.theme_css {
        html.push_str("<style>");
        // must not close the element early
        html.push_str(&css.replace("</style", "<\\/style"));
        html.push_str("</style>\n");
    }
    html.push_str("<script src=\"");
    html.push_str(&escape_html(parts.script_href));
    html.push_str("\" defer></script>\n");
    html.push_str("</head>\n<body>\n");

    html.push_str("<header>");
    html.push_str(parts.header);
    html.push_str("</header>\n<main>");
    html.push_str(parts.body);
    html.push_str("</main>\n<footer>");
    html.push_str(parts.footer);
    html.push_str("</footer>\n");

    html.push_str("</body>\n</html>\n");
    html
}
