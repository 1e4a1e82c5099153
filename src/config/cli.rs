use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the mdsite binary.
#[derive(Debug, Parser)]
#[command(
    name = "mdsite",
    version,
    about = "Serve a directory of markdown pages as highlighted, sanitized HTML"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "MDSITE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render the content directory and serve it over HTTP (default).
    Serve(Box<ServeArgs>),
    /// Render a single markdown file to stdout.
    Render(Box<RenderArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    /// Markdown file to render.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Emit only the body fragment instead of a full page.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub fragment: bool,

    /// Skip sanitisation; prints the HTML exactly as the pipeline produced it.
    #[arg(long = "no-sanitize", action = clap::ArgAction::SetTrue)]
    pub no_sanitize: bool,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub content: ContentOverrides,

    #[command(flatten)]
    pub render: RenderOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub content: ContentOverrides,

    #[command(flatten)]
    pub render: RenderOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ContentOverrides {
    /// Override the directory scanned for `page.md` files and components.
    #[arg(long = "content-directory", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub directory: Option<PathBuf>,

    /// Override the directory static assets are served from.
    #[arg(long = "static-directory", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub static_directory: Option<PathBuf>,

    /// Override the URL prefix static assets are served under.
    #[arg(long = "static-prefix", value_name = "PREFIX")]
    pub static_prefix: Option<String>,

    /// Override the title used for pages without a heading.
    #[arg(long = "site-title", value_name = "TITLE")]
    pub site_title: Option<String>,

    /// Override the number of pages rendered concurrently at startup.
    #[arg(long = "render-concurrency", value_name = "COUNT")]
    pub render_concurrency: Option<usize>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    /// Toggle syntax highlighting of code blocks.
    #[arg(
        long = "render-syntax-highlight",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub syntax_highlight: Option<bool>,

    /// Override the highlight theme (e.g. github, solarized-dark, ocean-light).
    #[arg(long = "render-highlight-style", value_name = "THEME")]
    pub highlight_style: Option<String>,

    /// Emit CSS classes instead of inline styles.
    #[arg(
        long = "render-use-classes",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub use_classes: Option<bool>,

    /// Toggle line numbers.
    #[arg(
        long = "render-line-numbers",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub line_numbers: Option<bool>,

    /// Toggle anchors on line numbers.
    #[arg(
        long = "render-linkable-line-numbers",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub linkable_line_numbers: Option<bool>,

    /// Override the tab width used inside code blocks.
    #[arg(long = "render-tab-width", value_name = "COLUMNS")]
    pub tab_width: Option<usize>,

    /// Toggle the language label in the code-block toolbar.
    #[arg(
        long = "render-show-language-label",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub show_language_label: Option<bool>,

    /// Toggle the copy button in the code-block toolbar.
    #[arg(
        long = "render-copy-button",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub copy_button: Option<bool>,
}
