//! Tracing subscriber setup and metric descriptions.
//!
//! All log output goes to stderr: `mdsite render` writes the rendered page to
//! stdout and the two must not interleave.

use std::{io, sync::Once};

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing::{Subscriber, level_filters::LevelFilter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Dependencies that are chatty at `debug` and below.
const QUIET_TARGETS: &[&str] = &["hyper", "h2", "tower", "html5ever", "selectors"];

/// Install the global subscriber and register metric descriptions.
///
/// `RUST_LOG` directives take precedence over the configured level.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    tracing_subscriber::registry()
        .with(env_filter(logging.level))
        .with(ErrorLayer::default())
        .with(output_layer(logging.format))
        .try_init()
        .map_err(|err| InfraError::telemetry(format!("subscriber already installed: {err}")))
}

fn env_filter(level: LevelFilter) -> EnvFilter {
    let mut filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if level > LevelFilter::INFO {
        for target in QUIET_TARGETS {
            if let Ok(directive) = format!("{target}=info").parse() {
                filter = filter.add_directive(directive);
            }
        }
    }
    filter
}

fn output_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(io::stderr)
            .boxed(),
    }
}

/// Register units and help text for every metric the crate emits.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "mdsite_render_total",
            Unit::Count,
            "Markdown renders, labelled by mode (fragment or page)."
        );
        describe_histogram!(
            "mdsite_render_ms",
            Unit::Milliseconds,
            "Markdown render latency."
        );
        describe_counter!(
            "mdsite_highlight_fallback_total",
            Unit::Count,
            "Code blocks emitted as plain text after highlighting failed."
        );
        describe_counter!(
            "mdsite_http_requests_total",
            Unit::Count,
            "HTTP responses served, labelled by status class."
        );
        describe_gauge!(
            "mdsite_site_pages",
            Unit::Count,
            "Pages in the site map built at startup."
        );
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_levels_quiet_dependencies() {
        let filter = env_filter(LevelFilter::TRACE).to_string();

        for target in QUIET_TARGETS {
            assert!(filter.contains(&format!("{target}=info")), "{filter}");
        }
    }

    #[test]
    fn default_level_adds_no_extra_directives() {
        let filter = env_filter(LevelFilter::INFO).to_string();

        assert!(!filter.contains("hyper"));
    }
}
