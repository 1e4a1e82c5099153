/// Highlight theme used when none is configured.
pub const DEFAULT_HIGHLIGHT_STYLE: &str = "github";
/// Tab stop used when expanding tabs inside code blocks.
pub const DEFAULT_TAB_WIDTH: usize = 4;

/// Per-call rendering switches.
///
/// Options are resolved once before a render starts and only ever read while
/// it runs. Overrides produce a modified copy; the defaults themselves are
/// never touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Wrap the body with header/footer components and asset references.
    pub full_render: bool,
    /// Run code blocks through the highlighter instead of the plain fallback.
    pub syntax_highlight: bool,
    /// Theme name, e.g. `github`, `solarized-light`, `ocean-dark`.
    pub highlight_style: String,
    /// Emit CSS classes (themed by the page stylesheet) instead of inline styles.
    pub use_classes: bool,
    pub line_numbers: bool,
    /// Give every line number an `id` and a self-link.
    pub linkable_line_numbers: bool,
    /// Tab stop for tab expansion; `0` keeps tabs as-is.
    pub tab_width: usize,
    pub show_language_label: bool,
    pub copy_button: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            full_render: false,
            syntax_highlight: true,
            highlight_style: DEFAULT_HIGHLIGHT_STYLE.to_string(),
            use_classes: true,
            line_numbers: true,
            linkable_line_numbers: true,
            tab_width: DEFAULT_TAB_WIDTH,
            show_language_label: true,
            copy_button: true,
        }
    }
}

impl RenderOptions {
    /// Defaults with full-page composition enabled.
    pub fn page() -> Self {
        Self {
            full_render: true,
            ..Self::default()
        }
    }

    /// Copy of these options forced into fragment mode.
    pub fn fragment(&self) -> Self {
        Self {
            full_render: false,
            ..self.clone()
        }
    }

    pub fn with_full_render(mut self, full_render: bool) -> Self {
        self.full_render = full_render;
        self
    }

    pub fn with_syntax_highlight(mut self, enabled: bool) -> Self {
        self.syntax_highlight = enabled;
        self
    }

    pub fn with_highlight_style(mut self, style: impl Into<String>) -> Self {
        self.highlight_style = style.into();
        self
    }

    pub fn with_classes(mut self, use_classes: bool) -> Self {
        self.use_classes = use_classes;
        self
    }

    pub fn with_line_numbers(mut self, line_numbers: bool, linkable: bool) -> Self {
        self.line_numbers = line_numbers;
        self.linkable_line_numbers = linkable;
        self
    }

    pub fn with_tab_width(mut self, tab_width: usize) -> Self {
        self.tab_width = tab_width;
        self
    }

    pub fn with_toolbar(mut self, show_language_label: bool, copy_button: bool) -> Self {
        self.show_language_label = show_language_label;
        self.copy_button = copy_button;
        self
    }
}
