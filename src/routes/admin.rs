use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Admin Router Module
///
/// Record creation, nested under `/admin`. Every handler requires the admin role.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /admin/users
        // Issue a new account with a role.
        .route("/users", post(handlers::create_user))
        // POST /admin/dossiers
        .route("/dossiers", post(handlers::create_dossier))
        // POST /admin/subjects
        .route("/subjects", post(handlers::create_subject))
}
