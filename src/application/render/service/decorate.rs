//! HTML post-pass over comrak's output: external links.

use std::collections::BTreeSet;

use lol_html::{RewriteStrSettings, element, rewrite_str};
use tracing::warn;
use url::Url;

use crate::application::render::types::RenderError;

const EXTERNAL_REL: [&str; 3] = ["nofollow", "noopener", "noreferrer"];

/// Apply external-link attributes. A failing pass is logged and its input
/// is kept unchanged.
pub(crate) fn decorate(html: &str) -> String {
    match mark_external_links(html) {
        Ok(rewritten) => rewritten,
        Err(err) => {
            warn!(
                target = "mdsite::render::decorate",
                error = %err,
                "Skipping external link attributes"
            );
            html.to_string()
        }
    }
}

/// Open absolute `http(s)` links in a new tab without leaking the referrer.
pub(crate) fn mark_external_links(html: &str) -> Result<String, RenderError> {
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("a[href]", |el| {
                let is_external = el
                    .get_attribute("href")
                    .is_some_and(|href| is_external_http_url(&href));
                if is_external {
                    let rel = merge_rel(el.get_attribute("rel"), &EXTERNAL_REL);
                    el.set_attribute("target", "_blank")?;
                    el.set_attribute("rel", &rel)?;
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(RenderError::document)
}

fn is_external_http_url(value: &str) -> bool {
    Url::parse(value.trim()).is_ok_and(|url| {
        matches!(url.scheme(), "http" | "https") && url.host_str().is_some()
    })
}

fn merge_rel(existing: Option<String>, required: &[&str]) -> String {
    let mut tokens: BTreeSet<String> = existing
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_ascii_lowercase)
        .collect();
    for &token in required {
        tokens.insert(token.to_string());
    }
    tokens.into_iter().collect::<Vec<_>>().join(" ")
}
