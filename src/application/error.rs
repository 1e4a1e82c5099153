use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{application::site::SiteError, config::LoadError, infra::error::InfraError};

/// Diagnostic chain attached to error responses and picked up by the
/// response-logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Error response with a fixed public message and an attached diagnostic report.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

/// Top-level failure of the binary. Every variant ends the process.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Site(#[from] SiteError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Short name of the phase that failed, for the final log line.
    pub fn stage(&self) -> &'static str {
        match self {
            AppError::Config(_) => "configuration",
            AppError::Site(_) => "site build",
            AppError::Infra(InfraError::Telemetry(_)) => "telemetry",
            AppError::Infra(InfraError::Bind { .. } | InfraError::Serve(_)) => "http",
            AppError::Infra(InfraError::ReadInput { .. } | InfraError::WriteOutput(_)) => {
                "render"
            }
            AppError::Unexpected(_) => "runtime",
        }
    }

    /// This error followed by its `source()` chain.
    pub fn chain(&self) -> Vec<String> {
        let mut messages = vec![self.to_string()];
        let mut current = StdError::source(self);
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn http_error_attaches_report() {
        let response = HttpError::new(
            "tests::http_error",
            StatusCode::NOT_FOUND,
            "Not Found",
            "no page for `/x`",
        )
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.source, "tests::http_error");
        assert_eq!(report.messages, ["no page for `/x`"]);
    }

    #[test]
    fn chain_follows_sources() {
        let error = AppError::from(SiteError::Read {
            path: "content/page.md".into(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        });

        assert_eq!(error.stage(), "site build");
        let chain = error.chain();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[1], "denied");
    }

    #[test]
    fn infra_errors_name_their_stage() {
        let error = AppError::from(InfraError::read_input(
            "notes.md",
            io::Error::new(io::ErrorKind::NotFound, "missing"),
        ));

        assert_eq!(error.stage(), "render");
        assert!(error.chain()[0].contains("notes.md"));
    }
}
