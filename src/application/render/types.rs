use thiserror::Error;

/// Errors raised inside the rendering pipeline.
///
/// None of these escape [`MarkdownRenderService::render`](super::MarkdownRenderService):
/// every stage has a degraded output it switches to instead. They exist so
/// the stages can be tested and logged individually.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlighting { language: String, message: String },
    #[error("document processing failed: {message}")]
    Document { message: String },
}

impl RenderError {
    pub(crate) fn highlighting(language: &str, error: impl std::fmt::Display) -> Self {
        let language = if language.is_empty() {
            "text".to_string()
        } else {
            language.to_string()
        };
        Self::Highlighting {
            language,
            message: error.to_string(),
        }
    }

    pub(crate) fn document(error: impl std::fmt::Display) -> Self {
        Self::Document {
            message: error.to_string(),
        }
    }
}
