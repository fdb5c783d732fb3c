use ballsort::{config, routes, services, state};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = config::GameConfig::from_env().expect("invalid configuration");
    let port = config.port;
    tracing::info!(
        move_rule = ?config.move_rule,
        static_dir = %config.static_dir.display(),
        max_payload_bytes = config.max_payload_bytes,
        "configuration loaded"
    );

    let state = state::AppState::new(config);

    // Spawn background session sweep.
    let sweep = services::sweep::spawn_sweep_task(state.clone());

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "ballsort listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");

    sweep.abort();
    tracing::info!("ballsort stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to install ctrl-c handler; running until killed");
        std::future::pending::<()>().await;
    }
}
