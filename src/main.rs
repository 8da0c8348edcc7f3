use dossier_portal::{
    AppState,
    auth::bootstrap_admin,
    config::{AppConfig, Env},
    create_router,
    repository::{InMemoryRepository, PostgresRepository, RepositoryState},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Configuration, logging, store, bootstrap administrator, then the HTTP server.
/// The store is closed once the server has drained.
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dossier_portal=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    let repo: RepositoryState = match &config.db_url {
        Some(db_url) => Arc::new(
            PostgresRepository::connect(db_url)
                .await
                .expect("FATAL: Failed to open Postgres store. Check DATABASE_URL."),
        ),
        None => {
            tracing::warn!("DATABASE_URL not set; records live in memory and vanish on exit");
            Arc::new(InMemoryRepository::new())
        }
    };

    bootstrap_admin(&repo, &config.admin_username, &config.admin_password)
        .await
        .expect("FATAL: Failed to bootstrap the administrator account.");

    let addr = format!("0.0.0.0:{}", config.port);
    let app = create_router(AppState {
        repo: repo.clone(),
        config,
    });

    let listener = TcpListener::bind(&addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener.");

    tracing::info!("Listening on {}", addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("FATAL: HTTP server error.");

    repo.close().await;
    tracing::info!("Store closed, shutting down");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
