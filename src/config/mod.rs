//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    net::SocketAddr, num::NonZeroUsize, path::PathBuf, str::FromStr, time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::render::{
    DEFAULT_ASSET_PREFIX, DEFAULT_HIGHLIGHT_STYLE, DEFAULT_SITE_TITLE, DEFAULT_TAB_WIDTH,
    RenderOptions,
};

pub use cli::{
    CliArgs, Command, ContentOverrides, LoggingOverrides, RenderArgs, RenderOverrides, ServeArgs,
    ServeOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "mdsite";
const ENV_PREFIX: &str = "MDSITE";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3002;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_CONTENT_DIR: &str = "content";
const DEFAULT_STATIC_DIR: &str = "static";
const DEFAULT_RENDER_CONCURRENCY: usize = 4;
const MAX_TAB_WIDTH: usize = 16;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub content: ContentSettings,
    pub render: RenderSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub directory: PathBuf,
    pub static_directory: PathBuf,
    /// Always starts with `/` and never ends with one.
    pub static_prefix: String,
    pub site_title: String,
    pub render_concurrency: NonZeroUsize,
}

/// Rendering switches applied to every page. Pages always render in
/// full-page mode, so there is no setting for it.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub syntax_highlight: bool,
    pub highlight_style: String,
    pub use_classes: bool,
    pub line_numbers: bool,
    pub linkable_line_numbers: bool,
    pub tab_width: usize,
    pub show_language_label: bool,
    pub copy_button: bool,
}

impl RenderSettings {
    /// Full-page render options carrying these settings.
    pub fn page_options(&self) -> RenderOptions {
        RenderOptions {
            full_render: true,
            syntax_highlight: self.syntax_highlight,
            highlight_style: self.highlight_style.clone(),
            use_classes: self.use_classes,
            line_numbers: self.line_numbers,
            linkable_line_numbers: self.linkable_line_numbers,
            tab_width: self.tab_width,
            show_language_label: self.show_language_label,
            copy_button: self.copy_button,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Render(args)) => {
            raw.apply_logging_overrides(&args.logging);
            raw.apply_content_overrides(&args.content);
            raw.apply_render_overrides(&args.render);
        }
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    content: RawContentSettings,
    render: RawRenderSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }

        self.apply_logging_overrides(&overrides.logging);
        self.apply_content_overrides(&overrides.content);
        self.apply_render_overrides(&overrides.render);
    }

    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_content_overrides(&mut self, overrides: &ContentOverrides) {
        if let Some(directory) = overrides.directory.as_ref() {
            self.content.directory = Some(directory.clone());
        }
        if let Some(directory) = overrides.static_directory.as_ref() {
            self.content.static_directory = Some(directory.clone());
        }
        if let Some(prefix) = overrides.static_prefix.as_ref() {
            self.content.static_prefix = Some(prefix.clone());
        }
        if let Some(title) = overrides.site_title.as_ref() {
            self.content.site_title = Some(title.clone());
        }
        if let Some(concurrency) = overrides.render_concurrency {
            self.content.render_concurrency = Some(concurrency);
        }
    }

    fn apply_render_overrides(&mut self, overrides: &RenderOverrides) {
        let render = &mut self.render;
        if let Some(value) = overrides.syntax_highlight {
            render.syntax_highlight = Some(value);
        }
        if let Some(style) = overrides.highlight_style.as_ref() {
            render.highlight_style = Some(style.clone());
        }
        if let Some(value) = overrides.use_classes {
            render.use_classes = Some(value);
        }
        if let Some(value) = overrides.line_numbers {
            render.line_numbers = Some(value);
        }
        if let Some(value) = overrides.linkable_line_numbers {
            render.linkable_line_numbers = Some(value);
        }
        if let Some(value) = overrides.tab_width {
            render.tab_width = Some(value);
        }
        if let Some(value) = overrides.show_language_label {
            render.show_language_label = Some(value);
        }
        if let Some(value) = overrides.copy_button {
            render.copy_button = Some(value);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            content,
            render,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            content: build_content_settings(content)?,
            render: build_render_settings(render)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server
        .host
        .map(|host| normalize_host(&host))
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let directory = content
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONTENT_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "content.directory",
            "path must not be empty",
        ));
    }

    let static_directory = content
        .static_directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));
    if static_directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "content.static_directory",
            "path must not be empty",
        ));
    }

    let static_prefix = normalize_prefix(
        content
            .static_prefix
            .as_deref()
            .unwrap_or(DEFAULT_ASSET_PREFIX),
    )
    .map_err(|reason| LoadError::invalid("content.static_prefix", reason))?;

    let site_title = content
        .site_title
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string());

    let render_concurrency = NonZeroUsize::new(
        content
            .render_concurrency
            .unwrap_or(DEFAULT_RENDER_CONCURRENCY),
    )
    .ok_or_else(|| {
        LoadError::invalid("content.render_concurrency", "must be greater than zero")
    })?;

    Ok(ContentSettings {
        directory,
        static_directory,
        static_prefix,
        site_title,
        render_concurrency,
    })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let defaults = RenderOptions::default();

    let highlight_style = render
        .highlight_style
        .map(|style| style.trim().to_string())
        .filter(|style| !style.is_empty())
        .unwrap_or_else(|| DEFAULT_HIGHLIGHT_STYLE.to_string());

    let tab_width = render.tab_width.unwrap_or(DEFAULT_TAB_WIDTH);
    if tab_width > MAX_TAB_WIDTH {
        return Err(LoadError::invalid(
            "render.tab_width",
            format!("must be at most {MAX_TAB_WIDTH}"),
        ));
    }

    Ok(RenderSettings {
        syntax_highlight: render.syntax_highlight.unwrap_or(defaults.syntax_highlight),
        highlight_style,
        use_classes: render.use_classes.unwrap_or(defaults.use_classes),
        line_numbers: render.line_numbers.unwrap_or(defaults.line_numbers),
        linkable_line_numbers: render
            .linkable_line_numbers
            .unwrap_or(defaults.linkable_line_numbers),
        tab_width,
        show_language_label: render
            .show_language_label
            .unwrap_or(defaults.show_language_label),
        copy_button: render.copy_button.unwrap_or(defaults.copy_button),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    directory: Option<PathBuf>,
    static_directory: Option<PathBuf>,
    static_prefix: Option<String>,
    site_title: Option<String>,
    render_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    syntax_highlight: Option<bool>,
    highlight_style: Option<String>,
    use_classes: Option<bool>,
    line_numbers: Option<bool>,
    linkable_line_numbers: Option<bool>,
    tab_width: Option<usize>,
    show_language_label: Option<bool>,
    copy_button: Option<bool>,
}

fn normalize_host(host: &str) -> String {
    let trimmed = host.trim();
    if trimmed.eq_ignore_ascii_case("localhost") {
        DEFAULT_HOST.to_string()
    } else {
        trimmed.to_string()
    }
}

/// `_static/` → `/_static`.
///
/// The prefix becomes a literal route, so router syntax such as `{name}`,
/// `*rest` or `:name` is rejected along with anything else outside
/// `[A-Za-z0-9._~-]` and `/`.
fn normalize_prefix(prefix: &str) -> Result<String, &'static str> {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Err("prefix must contain at least one path segment");
    }

    let literal = trimmed
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '~' | '/'));
    if !literal || trimmed.split('/').any(str::is_empty) {
        return Err("prefix may only contain letters, digits, `-`, `_`, `.`, `~` and single `/` separators");
    }
    Ok(format!("/{trimmed}"))
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}
