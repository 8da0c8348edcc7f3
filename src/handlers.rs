use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{PortalError, PortalResult},
    models::{
        CreateDossierRequest, CreateSubjectRequest, CreateUserRequest, Dossier, LoginRequest,
        LoginResponse, Subject, User, UserProfile, Zone,
    },
    rbac::Role,
};
use axum::{Form, Json, extract::State, http::StatusCode};

// --- Public Handlers ---

/// login
///
/// [Public Route] Exchanges a username/password form for a session token.
///
/// *Security*: an unknown username and a wrong password produce the same
/// 401 "invalid credentials" response.
#[utoipa::path(
    post,
    path = "/login",
    request_body(
        content = LoginRequest,
        content_type = "application/x-www-form-urlencoded"
    ),
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Form(payload): Form<LoginRequest>,
) -> PortalResult<Json<LoginResponse>> {
    let user = auth::authenticate(&state.repo, &payload.username, &payload.password).await?;
    let token = auth::issue_token(user.id, &state.config.jwt_secret, state.config.token_ttl_secs)?;
    tracing::info!(user = %user.username, role = %user.role, "login");

    Ok(Json(LoginResponse {
        token,
        user: UserProfile::new(user.id, user.username, user.role),
    }))
}

/// get_zones
///
/// [Public Route] Landing page: every zone with the role it requires, lowest first.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Zone catalog", body = [Zone]))
)]
pub async fn get_zones() -> Json<Vec<Zone>> {
    Json(Zone::catalog())
}

/// get_archives
///
/// [Public Route] The public archives: dossiers a visitor may read.
#[utoipa::path(
    get,
    path = "/archives",
    responses((status = 200, description = "Public dossiers", body = [Dossier]))
)]
pub async fn get_archives(State(state): State<AppState>) -> PortalResult<Json<Vec<Dossier>>> {
    let dossiers = state
        .repo
        .list_dossiers(Some(Role::Visitor.visible_labels()))
        .await?;
    Ok(Json(dossiers))
}

/// not_found
///
/// Fallback for every unrouted path.
pub async fn not_found() -> PortalError {
    PortalError::NotFound
}

// --- Authenticated Handlers ---

/// get_me
///
/// [Authenticated Route] The caller's principal, readable labels and reachable zones.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(AuthUser { id, username, role }: AuthUser) -> Json<UserProfile> {
    Json(UserProfile::new(id, username, role))
}

/// get_lab
///
/// [Researcher Route] Laboratory zone.
#[utoipa::path(
    get,
    path = "/lab",
    responses(
        (status = 200, description = "Zone", body = Zone),
        (status = 403, description = "Below researcher")
    )
)]
pub async fn get_lab(user: AuthUser) -> PortalResult<Json<Zone>> {
    let zone = Zone::lab();
    user.require(zone.required_role)?;
    Ok(Json(zone))
}

/// get_direction
///
/// [Admin Route] Scientific direction zone.
#[utoipa::path(
    get,
    path = "/direction",
    responses(
        (status = 200, description = "Zone", body = Zone),
        (status = 403, description = "Below admin")
    )
)]
pub async fn get_direction(user: AuthUser) -> PortalResult<Json<Zone>> {
    let zone = Zone::direction();
    user.require(zone.required_role)?;
    Ok(Json(zone))
}

/// get_dossiers
///
/// [Researcher Route] Lists the dossiers whose classification the caller's role
/// may read, in creation order. The label set narrows the store query itself.
#[utoipa::path(
    get,
    path = "/dossiers",
    responses(
        (status = 200, description = "Visible dossiers", body = [Dossier]),
        (status = 403, description = "Below researcher")
    )
)]
pub async fn get_dossiers(
    user: AuthUser,
    State(state): State<AppState>,
) -> PortalResult<Json<Vec<Dossier>>> {
    user.require(Role::Researcher)?;
    let dossiers = state
        .repo
        .list_dossiers(Some(user.role.visible_labels()))
        .await?;
    Ok(Json(dossiers))
}

/// get_subjects
///
/// [Researcher Route] Lists every subject file.
#[utoipa::path(
    get,
    path = "/subjects",
    responses(
        (status = 200, description = "Subjects", body = [Subject]),
        (status = 403, description = "Below researcher")
    )
)]
pub async fn get_subjects(
    user: AuthUser,
    State(state): State<AppState>,
) -> PortalResult<Json<Vec<Subject>>> {
    user.require(Role::Researcher)?;
    Ok(Json(state.repo.list_subjects().await?))
}

// --- Admin Handlers ---

/// create_user
///
/// [Admin Route] Creates an account. A taken username is a 409 Conflict and
/// leaves the store unchanged.
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body(
        content = CreateUserRequest,
        content_type = "application/x-www-form-urlencoded"
    ),
    responses(
        (status = 201, description = "Created", body = User),
        (status = 400, description = "Missing field or unknown role"),
        (status = 403, description = "Not admin"),
        (status = 409, description = "Username taken")
    )
)]
pub async fn create_user(
    user: AuthUser,
    State(state): State<AppState>,
    Form(payload): Form<CreateUserRequest>,
) -> PortalResult<(StatusCode, Json<User>)> {
    user.require(Role::Admin)?;
    let (username, password, role) = payload.validate()?;
    let created = auth::register_user(&state.repo, username, &password, role).await?;
    tracing::info!(
        by = %user.username,
        user = %created.username,
        role = %created.role,
        "user created"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// create_dossier
///
/// [Admin Route] Files a new dossier. Unrecognized classifications are rejected.
#[utoipa::path(
    post,
    path = "/admin/dossiers",
    request_body(
        content = CreateDossierRequest,
        content_type = "application/x-www-form-urlencoded"
    ),
    responses(
        (status = 201, description = "Created", body = Dossier),
        (status = 400, description = "Missing field or unknown classification"),
        (status = 403, description = "Not admin")
    )
)]
pub async fn create_dossier(
    user: AuthUser,
    State(state): State<AppState>,
    Form(payload): Form<CreateDossierRequest>,
) -> PortalResult<(StatusCode, Json<Dossier>)> {
    user.require(Role::Admin)?;
    let dossier = state.repo.create_dossier(payload.into_new_dossier()?).await?;
    tracing::info!(id = dossier.id, classification = %dossier.classification, "dossier created");
    Ok((StatusCode::CREATED, Json(dossier)))
}

/// create_subject
///
/// [Admin Route] Files a new subject. Absent risk coefficient becomes 0 and an
/// absent status becomes "unknown".
#[utoipa::path(
    post,
    path = "/admin/subjects",
    request_body(
        content = CreateSubjectRequest,
        content_type = "application/x-www-form-urlencoded"
    ),
    responses(
        (status = 201, description = "Created", body = Subject),
        (status = 400, description = "Missing field or unknown danger level"),
        (status = 403, description = "Not admin")
    )
)]
pub async fn create_subject(
    user: AuthUser,
    State(state): State<AppState>,
    Form(payload): Form<CreateSubjectRequest>,
) -> PortalResult<(StatusCode, Json<Subject>)> {
    user.require(Role::Admin)?;
    let subject = state.repo.create_subject(payload.into_new_subject()?).await?;
    tracing::info!(id = subject.id, name = %subject.name, "subject created");
    Ok((StatusCode::CREATED, Json(subject)))
}
