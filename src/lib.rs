use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Role hierarchy, access guard and classification filter. Pure, no I/O.
pub mod rbac;

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod security;

pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::PortalError;
pub use rbac::{Classification, Role, can_access, filter_by_classification, rank, visible_labels};
pub use repository::{InMemoryRepository, PostgresRepository, Repository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for every documented handler, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::get_zones, handlers::get_archives, handlers::get_me,
        handlers::get_lab, handlers::get_direction, handlers::get_dossiers, handlers::get_subjects,
        handlers::create_user, handlers::create_dossier, handlers::create_subject
    ),
    components(
        schemas(
            models::User, models::Dossier, models::Subject, models::DangerLevel,
            models::LoginRequest, models::LoginResponse, models::CreateUserRequest,
            models::CreateDossierRequest, models::CreateSubjectRequest, models::UserProfile,
            models::Zone, rbac::Role, rbac::Classification,
        )
    ),
    tags(
        (name = "dossier-portal", description = "Role-gated dossier and subject archive")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared by every request: the store handle and the immutable configuration.
/// The store is opened before the router is built and closed after the server stops.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub config: AppConfig,
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Scoped to the authenticated and admin routers. Resolving the `AuthUser`
/// extractor is the whole check: a missing, expired or forged token (or a user
/// that no longer exists) rejects the request with 401 before any handler runs.
/// Role checks happen afterwards, inside the handlers, so a 403 always means
/// "known principal, insufficient rank".
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the full routing tree around one `AppState`:
/// public routes, authenticated routes and the `/admin` subtree, each gated by
/// `auth_middleware` where needed, plus a JSON 404 fallback for everything else.
/// Observability and CORS layers wrap the whole tree.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS: the portal is read by a separate front end.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Correlation header shared by the request-id layers and the span logger.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Routing tree
    let base_router = Router::new()
        // OpenAPI document and Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Landing page, health, login and the public archives.
        .merge(public::public_routes())
        // Profile, zones and catalogs: a session is required, ranks are checked per handler.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Record creation. Same session gate; every handler then requires `Role::Admin`.
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Unrouted paths answer with `PortalError::NotFound`.
        .fallback(handlers::not_found)
        .with_state(state);

    // 3. Observability, outermost first.
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Tag every request with a fresh UUID unless the caller sent one.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. One span per request; the latency is logged when the response leaves.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Echo the request id back so clients can quote it.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS applies to every response, including 401/403/404.
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the `http_request` span: method, URI and request id up front. The
/// `user` field starts empty and is filled by the `AuthUser` extractor once a
/// principal resolves, so denied and anonymous requests are easy to tell apart
/// in the logs.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
        req_id = %request_id,
        user = tracing::field::Empty,
    )
}
