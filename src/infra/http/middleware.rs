use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use metrics::counter;
use tracing::{Instrument, debug, error, info_span, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Per-request identifier, available as a request and response extension.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Tag the request with an id, run it inside a span, and log the outcome.
///
/// Successful requests are logged at `debug`. Failures are logged at `warn`
/// (4xx) or `error` (5xx) together with the [`ErrorReport`] the handler
/// attached, which is removed from the response before it leaves.
pub async fn trace_requests(mut request: Request<Body>, next: Next) -> Response {
    let context = RequestContext {
        request_id: Uuid::new_v4().to_string(),
    };
    request.extensions_mut().insert(context.clone());

    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let span = info_span!(
        target: "mdsite::http",
        "request",
        request_id = %context.request_id,
        method = %method,
        path = %path,
    );

    let started = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    let status = response.status();

    counter!("mdsite_http_requests_total", "status" => status_class(status.as_u16()))
        .increment(1);

    let report = response.extensions_mut().remove::<ErrorReport>();
    span.in_scope(|| log_outcome(status, elapsed_ms, report));

    if let Ok(value) = HeaderValue::from_str(&context.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(context);
    response
}

fn log_outcome(status: StatusCode, elapsed_ms: u64, report: Option<ErrorReport>) {
    if !(status.is_client_error() || status.is_server_error()) {
        debug!(
            target = "mdsite::http::response",
            status = status.as_u16(),
            elapsed_ms,
            "Request served"
        );
        return;
    }

    let (source, chain) = report
        .map(|report| (report.source, report.messages))
        .unwrap_or(("unknown", Vec::new()));
    if status.is_server_error() {
        error!(
            target = "mdsite::http::response",
            status = status.as_u16(),
            elapsed_ms,
            source,
            chain = ?chain,
            "Request failed"
        );
    } else {
        warn!(
            target = "mdsite::http::response",
            status = status.as_u16(),
            elapsed_ms,
            source,
            chain = ?chain,
            "Request rejected"
        );
    }
}

fn status_class(status: u16) -> &'static str {
    match status {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_statuses_by_class() {
        assert_eq!(status_class(200), "2xx");
        assert_eq!(status_class(304), "3xx");
        assert_eq!(status_class(404), "4xx");
        assert_eq!(status_class(503), "5xx");
    }
}
