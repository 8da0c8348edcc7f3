use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes that need a resolved `AuthUser`. The authentication layer sits on the
/// router above; the minimum role of each route is checked inside its handler.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // Any authenticated role.
        .route("/me", get(handlers::get_me))
        // GET /lab
        // Researcher and above.
        .route("/lab", get(handlers::get_lab))
        // GET /direction
        // Admin only.
        .route("/direction", get(handlers::get_direction))
        // GET /dossiers
        // Researcher and above; narrowed to the caller's visible labels.
        .route("/dossiers", get(handlers::get_dossiers))
        // GET /subjects
        // Researcher and above.
        .route("/subjects", get(handlers::get_subjects))
}
