use anyhow::Context;
use journal_service::{
    DefaultAppState,
    config::Config,
    db::establish_connection,
    integrations::Integrations,
    routes::create_router,
    shutdown::{GracefulShutdownLayer, ShutdownState},
};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("journal_service=debug".parse()?),
        )
        .init();

    let config = Config::from_env()?;

    let connection = establish_connection(&config.database_url)
        .with_context(|| format!("failed to open database at {}", config.database_url))?;
    info!(database_url = %config.database_url, "Connected to database");

    let integrations = Integrations::from_config(&config).context("failed to build HTTP client")?;
    info!(
        mastodon = integrations.mastodon.is_some(),
        bluesky = integrations.bluesky.is_some(),
        github = integrations.github.is_some(),
        spotify = integrations.spotify.is_some(),
        "Integrations configured"
    );
    if config.auth.admin_password.is_none() {
        warn!("ADMIN_PASSWORD is not set; the composer is disabled");
    }

    let bind_addr = config.bind_addr.clone();
    let app_state = DefaultAppState::new(Arc::new(Mutex::new(connection)), config, integrations);
    let shutdown_state = ShutdownState::new();

    let app = create_router()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(GracefulShutdownLayer::new(shutdown_state.clone()))
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT)),
        )
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind to {bind_addr}"))?;

    info!(%bind_addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_state))
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal(shutdown_state: ShutdownState) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining requests");
    shutdown_state.begin_draining();
    shutdown_state.drained().await;
    info!("All in-flight requests finished");
}
