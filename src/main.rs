use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use storefront_api::config::{init_tracing, load_config};
use storefront_api::gateway::HttpPaymentGateway;
use storefront_api::{api_router, db, events, AppServices, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;
    init_tracing(config.log_level(), config.log_json);

    let db = Arc::new(
        db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?,
    );
    if config.auto_migrate {
        db::run_migrations(&db).await?;
    }

    let (event_sender, _events_handle) = events::start();
    let event_sender = Arc::new(event_sender);

    let config = Arc::new(config);
    let gateway = Arc::new(HttpPaymentGateway::new(
        config.gateway_base_url.clone(),
        config.gateway_key_id.clone(),
        config.gateway_key_secret.clone(),
    ));

    let services = AppServices::new(
        db.clone(),
        event_sender.clone(),
        config.clone(),
        gateway,
    );
    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        event_sender,
        services,
    });

    let app = api_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
