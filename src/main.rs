//! Trivia backend entrypoint wiring the cycle runner, SSE streams and admin routes.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trivia_back::{
    config::SettingsStore,
    dao::question_source::opentdb::{OpenTdbConfig, OpenTdbSource},
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let settings = SettingsStore::load();
    let snapshot = settings.snapshot().await;
    let source = OpenTdbSource::new(OpenTdbConfig::from(&snapshot))
        .context("building the Open Trivia DB client")?;
    info!(api_url = %snapshot.api_url, enabled = snapshot.start_enabled, "trivia settings ready");

    let (app_state, runner) = AppState::new(settings, Arc::new(source)).await;
    let runner_task = tokio::spawn(runner.run());

    let app = build_router(app_state.clone());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    stop_runner(&app_state, runner_task).await;
    Ok(())
}

/// Stop the trivia loop and wait for the runner to drop its queue.
async fn stop_runner(state: &SharedState, runner: tokio::task::JoinHandle<()>) {
    if let Err(err) = state.scheduler().shutdown() {
        warn!(error = %err, "trivia loop already gone at shutdown");
    }
    if let Err(err) = runner.await {
        warn!(error = %err, "trivia loop task ended abnormally");
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
