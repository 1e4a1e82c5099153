//! Read-only grammar and theme lookup shared by every render.

use std::sync::Arc;

use once_cell::sync::Lazy;
use syntect::{
    dumps::from_uncompressed_data,
    highlighting::{Theme, ThemeSet},
    parsing::{SyntaxReference, SyntaxSet},
};
use tracing::warn;

/// Theme used whenever the requested one is unknown.
pub const FALLBACK_THEME: &str = "InspiredGitHub";

/// Friendly names accepted in configuration, mapped onto bundled syntect themes.
const THEME_ALIASES: &[(&str, &str)] = &[
    ("github", "InspiredGitHub"),
    ("inspired-github", "InspiredGitHub"),
    ("solarized-light", "Solarized (light)"),
    ("solarized-dark", "Solarized (dark)"),
    ("ocean-light", "base16-ocean.light"),
    ("ocean-dark", "base16-ocean.dark"),
    ("eighties", "base16-eighties.dark"),
    ("mocha", "base16-mocha.dark"),
];

static SHARED_REGISTRY: Lazy<Arc<HighlightRegistry>> =
    Lazy::new(|| Arc::new(HighlightRegistry::load()));

/// Grammars and themes queried by name. Lookups return `None` for unknown
/// names; the fallback tiers live in [`HighlightRegistry::select_syntax`] and
/// [`HighlightRegistry::theme_or_fallback`].
pub struct HighlightRegistry {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    fallback_theme: Theme,
}

impl HighlightRegistry {
    pub fn new(syntax_set: SyntaxSet, theme_set: ThemeSet) -> Self {
        let fallback_theme = theme_set
            .themes
            .get(FALLBACK_THEME)
            .cloned()
            .unwrap_or_default();

        Self {
            syntax_set,
            theme_set,
            fallback_theme,
        }
    }

    /// Load the syntax pack generated at build time plus syntect's bundled themes.
    pub fn load() -> Self {
        let syntax_bytes = include_bytes!(env!("SYNTAX_PACK_FILE"));
        let syntax_set = match from_uncompressed_data::<SyntaxSet>(syntax_bytes) {
            Ok(set) => set,
            Err(err) => {
                warn!(
                    target = "mdsite::render::registry",
                    error = %err,
                    "Embedded syntax pack unreadable; using syntect defaults"
                );
                SyntaxSet::load_defaults_newlines()
            }
        };

        Self::new(syntax_set, ThemeSet::load_defaults())
    }

    /// Process-wide registry, loaded on first use.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED_REGISTRY)
    }

    pub fn syntax_set(&self) -> &SyntaxSet {
        &self.syntax_set
    }

    /// Grammar registered under `hint` (token, name, then extension; case-insensitive).
    pub fn find_syntax(&self, hint: &str) -> Option<&SyntaxReference> {
        let token = hint.trim();
        if token.is_empty() {
            return None;
        }

        let lowercase = token.to_ascii_lowercase();
        self.syntax_set
            .find_syntax_by_token(&lowercase)
            .or_else(|| self.syntax_set.find_syntax_by_name(token))
            .or_else(|| self.syntax_set.find_syntax_by_extension(&lowercase))
    }

    /// Guess a grammar from the code itself (shebangs, `<?php`, `<?xml`, modelines).
    pub fn detect_syntax(&self, code: &str) -> Option<&SyntaxReference> {
        let first_line = code.lines().find(|line| !line.trim().is_empty())?;
        self.syntax_set.find_syntax_by_first_line(first_line)
    }

    pub fn plain_text(&self) -> &SyntaxReference {
        self.syntax_set.find_syntax_plain_text()
    }

    /// Hint, then content detection, then plain text. Never fails.
    pub fn select_syntax(&self, hint: &str, code: &str) -> &SyntaxReference {
        self.find_syntax(hint)
            .or_else(|| self.detect_syntax(code))
            .unwrap_or_else(|| self.plain_text())
    }

    /// Theme registered under `name` or one of its aliases (case-insensitive).
    pub fn find_theme(&self, name: &str) -> Option<&Theme> {
        let requested = name.trim();
        if requested.is_empty() {
            return None;
        }

        let canonical = THEME_ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(requested))
            .map_or(requested, |(_, theme)| *theme);

        self.theme_set.themes.get(canonical).or_else(|| {
            self.theme_set
                .themes
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(canonical))
                .map(|(_, theme)| theme)
        })
    }

    pub fn theme_or_fallback(&self, name: &str) -> &Theme {
        self.find_theme(name).unwrap_or(&self.fallback_theme)
    }
}
