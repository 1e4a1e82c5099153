use std::{
    io::{self, Write},
    process,
    sync::Arc,
    time::Duration,
};

use mdsite::{
    application::{
        error::AppError,
        render::{FsContentSource, MarkdownRenderService, PageAssets},
        site::{self, SiteMap},
    },
    config,
    infra::{
        assets::StaticAssets,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tracing::{Dispatch, Level, debug, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let log = || {
        error!(
            stage = error.stage(),
            error = %error,
            chain = ?error.chain(),
            "application error"
        );
    };

    if dispatcher::has_been_set() {
        log();
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, log);
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Render(args) => run_render(settings, *args).await,
    }
}

fn build_renderer(settings: &config::Settings) -> MarkdownRenderService {
    let content = Arc::new(FsContentSource::new(settings.content.directory.clone()));
    MarkdownRenderService::new(content)
        .with_assets(PageAssets::under_prefix(&settings.content.static_prefix))
        .with_site_title(settings.content.site_title.clone())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let renderer = Arc::new(build_renderer(&settings));
    let options = settings.render.page_options();

    let site = site::build_site_map(
        &settings.content.directory,
        renderer,
        &options,
        settings.content.render_concurrency,
    )
    .await?;
    log_routes(&site);
    if site.is_empty() {
        warn!(
            target = "mdsite::site",
            root = %settings.content.directory.display(),
            "No pages found; every request will return 404"
        );
    }

    let http_state = HttpState {
        site: Arc::new(site),
        assets: Arc::new(StaticAssets::new(settings.content.static_directory.clone())),
        static_prefix: settings.content.static_prefix.clone(),
    };

    serve_http(&settings, http_state).await
}

fn log_routes(site: &SiteMap) {
    for route in site.routes() {
        debug!(target = "mdsite::site", route, "Route registered");
    }
}

async fn run_render(
    settings: config::Settings,
    args: config::RenderArgs,
) -> Result<(), AppError> {
    let markdown = tokio::fs::read_to_string(&args.file)
        .await
        .map_err(|err| InfraError::read_input(&args.file, err))?;

    let renderer = build_renderer(&settings);
    let options = settings.render.page_options();

    let html = tokio::task::spawn_blocking(move || {
        if args.no_sanitize {
            renderer.render_unsanitized(&markdown, &options)
        } else if args.fragment {
            renderer.render_fragment(&markdown, &options)
        } else {
            renderer.render_page(&markdown, &options)
        }
    })
    .await
    .map_err(|err| AppError::unexpected(format!("render task failed: {err}")))?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{html}")
        .and_then(|()| stdout.flush())
        .map_err(InfraError::WriteOutput)?;

    Ok(())
}

async fn serve_http(settings: &config::Settings, http_state: HttpState) -> Result<(), AppError> {
    let pages = http_state.site.len();
    let router = http::build_router(http_state);

    let addr = settings.server.addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| InfraError::Bind { addr, source })?;

    info!(
        target = "mdsite::http",
        addr = %addr,
        pages,
        "Listening"
    );

    let grace = settings.server.graceful_shutdown;
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(grace))
        .await
        .map_err(InfraError::Serve)?;

    info!(target = "mdsite::http", "Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C. A second timer forces exit if in-flight requests do
/// not drain within `grace`.
async fn shutdown_signal(grace: Duration) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target = "mdsite::http", error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }

    info!(
        target = "mdsite::http",
        grace_secs = grace.as_secs(),
        "Shutdown requested; draining connections"
    );

    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!(target = "mdsite::http", "Graceful shutdown timed out; exiting");
        process::exit(1);
    });
}
