use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. Only visitor-level data is served here.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // Landing page listing the zones and their entry roles.
        .route("/", get(handlers::get_zones))
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /login
        // Form login; returns a bearer token.
        .route("/login", post(handlers::login))
        // GET /archives
        // Dossiers classified C, i.e. what a visitor may read.
        .route("/archives", get(handlers::get_archives))
}
