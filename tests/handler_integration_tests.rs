use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use dossier_portal::{
    AppState, PortalError,
    auth::{self, AuthUser},
    config::AppConfig,
    handlers,
    models::{
        CreateDossierRequest, CreateSubjectRequest, CreateUserRequest, Dossier, LoginRequest,
        NewDossier,
    },
    rbac::{Classification, Role},
    repository::{InMemoryRepository, RepositoryState},
};
use std::sync::Arc;
use tokio::test;

// --- TEST UTILITIES ---

fn create_test_state() -> AppState {
    AppState {
        repo: Arc::new(InMemoryRepository::new()) as RepositoryState,
        config: AppConfig::default(),
    }
}

fn principal(role: Role) -> AuthUser {
    AuthUser {
        id: 1,
        username: format!("{}-agent", role),
        role,
    }
}

async fn seed_dossiers(state: &AppState) {
    for (title, classification) in [
        ("Jason", Classification::A),
        ("One-Eyed Owl", Classification::Sss),
        ("Gourmet", Classification::B),
        ("Ward 20 census", Classification::C),
    ] {
        state
            .repo
            .create_dossier(NewDossier {
                title: title.to_string(),
                body: "...".to_string(),
                classification,
            })
            .await
            .unwrap();
    }
}

fn titles(dossiers: &[Dossier]) -> Vec<&str> {
    dossiers.iter().map(|d| d.title.as_str()).collect()
}

fn dossier_form(classification: &str) -> CreateDossierRequest {
    CreateDossierRequest {
        title: Some("Rabbit".to_string()),
        body: Some("Masked ghoul seen in the 20th ward".to_string()),
        classification: Some(classification.to_string()),
    }
}

// --- HANDLER TESTS ---

#[test]
async fn test_get_dossiers_filtered_for_senior() {
    let state = create_test_state();
    seed_dossiers(&state).await;

    let Json(dossiers) = handlers::get_dossiers(principal(Role::Senior), State(state))
        .await
        .unwrap();

    assert_eq!(titles(&dossiers), vec!["Jason", "Gourmet", "Ward 20 census"]);
}

#[test]
async fn test_get_dossiers_everything_for_admin() {
    let state = create_test_state();
    seed_dossiers(&state).await;

    let Json(dossiers) = handlers::get_dossiers(principal(Role::Admin), State(state))
        .await
        .unwrap();

    assert_eq!(dossiers.len(), 4);
}

#[test]
async fn test_get_dossiers_forbidden_for_visitor() {
    let state = create_test_state();
    let result = handlers::get_dossiers(principal(Role::Visitor), State(state)).await;
    assert_eq!(result.unwrap_err(), PortalError::Forbidden);
}

#[test]
async fn test_archives_show_only_c() {
    let state = create_test_state();
    seed_dossiers(&state).await;

    let Json(dossiers) = handlers::get_archives(State(state)).await.unwrap();
    assert_eq!(titles(&dossiers), vec!["Ward 20 census"]);
}

#[test]
async fn test_landing_lists_every_zone() {
    let Json(zones) = handlers::get_zones().await;
    let entries: Vec<(&str, Role)> = zones
        .iter()
        .map(|z| (z.name.as_str(), z.required_role))
        .collect();
    assert_eq!(
        entries,
        vec![
            ("archives", Role::Visitor),
            ("lab", Role::Researcher),
            ("direction", Role::Admin)
        ]
    );
}

#[test]
async fn test_zones_are_gated() {
    assert!(handlers::get_lab(principal(Role::Researcher)).await.is_ok());
    assert_eq!(
        handlers::get_lab(principal(Role::Visitor)).await.unwrap_err(),
        PortalError::Forbidden
    );
    assert_eq!(
        handlers::get_direction(principal(Role::Senior)).await.unwrap_err(),
        PortalError::Forbidden
    );
    let Json(zone) = handlers::get_direction(principal(Role::Admin)).await.unwrap();
    assert_eq!(zone.name, "direction");
}

#[test]
async fn test_create_dossier_requires_admin() {
    let state = create_test_state();
    let result = handlers::create_dossier(
        principal(Role::Senior),
        State(state.clone()),
        Form(dossier_form("B")),
    )
    .await;

    assert_eq!(result.unwrap_err(), PortalError::Forbidden);
    assert!(state.repo.list_dossiers(None).await.unwrap().is_empty());
}

#[test]
async fn test_create_dossier_success() {
    let state = create_test_state();
    let (status, Json(dossier)) = handlers::create_dossier(
        principal(Role::Admin),
        State(state.clone()),
        Form(dossier_form("B")),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(dossier.classification, Classification::B);
    assert_eq!(state.repo.list_dossiers(None).await.unwrap(), vec![dossier]);
}

#[test]
async fn test_dossier_text_round_trips_unchanged() {
    let state = create_test_state();
    let form = CreateDossierRequest {
        title: Some(" Rabbit ".to_string()),
        body: Some("    indented\n\nsecond\n".to_string()),
        classification: Some("C".to_string()),
    };

    handlers::create_dossier(principal(Role::Admin), State(state.clone()), Form(form))
        .await
        .unwrap();

    let Json(archives) = handlers::get_archives(State(state)).await.unwrap();
    assert_eq!(archives[0].title, " Rabbit ");
    assert_eq!(archives[0].body, "    indented\n\nsecond\n");
}

#[test]
async fn test_create_dossier_rejects_unknown_label() {
    let state = create_test_state();
    let result = handlers::create_dossier(
        principal(Role::Admin),
        State(state.clone()),
        Form(dossier_form("TOP-SECRET")),
    )
    .await;

    let err = result.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert!(state.repo.list_dossiers(None).await.unwrap().is_empty());
}

#[test]
async fn test_create_subject_applies_defaults() {
    let state = create_test_state();
    let form = CreateSubjectRequest {
        name: Some("X".to_string()),
        description: Some("Y".to_string()),
        kind: Some("ghoul".to_string()),
        danger_level: Some("High".to_string()),
        ..CreateSubjectRequest::default()
    };

    let (status, Json(subject)) =
        handlers::create_subject(principal(Role::Admin), State(state.clone()), Form(form))
            .await
            .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(subject.risk_coefficient, 0);
    assert_eq!(subject.status, "unknown");
    assert_eq!(subject.alias, None);

    let Json(listed) = handlers::get_subjects(principal(Role::Researcher), State(state))
        .await
        .unwrap();
    assert_eq!(listed, vec![subject]);
}

#[test]
async fn test_create_user_conflict() {
    let state = create_test_state();
    let form = || CreateUserRequest {
        username: Some("touka".to_string()),
        password: Some("rabbit".to_string()),
        role: Some("researcher".to_string()),
    };

    let (status, Json(created)) =
        handlers::create_user(principal(Role::Admin), State(state.clone()), Form(form()))
            .await
            .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created.role, Role::Researcher);

    let err = handlers::create_user(principal(Role::Admin), State(state.clone()), Form(form()))
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::ConstraintViolation(_)));
    assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
}

#[test]
async fn test_login_issues_usable_token() {
    let state = create_test_state();
    auth::register_user(&state.repo, "hide".to_string(), "tortoise", Role::Senior)
        .await
        .unwrap();

    let Json(response) = handlers::login(
        State(state.clone()),
        Form(LoginRequest {
            username: "hide".to_string(),
            password: "tortoise".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(response.user.role, Role::Senior);
    let claims = auth::decode_token(&response.token, &state.config.jwt_secret).unwrap();
    assert_eq!(claims.sub, response.user.id.to_string());
}

#[test]
async fn test_login_failures_share_one_response() {
    let state = create_test_state();
    auth::register_user(&state.repo, "hide".to_string(), "tortoise", Role::Senior)
        .await
        .unwrap();

    let attempt = |username: &str, password: &str| {
        handlers::login(
            State(state.clone()),
            Form(LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            }),
        )
    };

    let wrong_password = attempt("hide", "hare").await.unwrap_err().into_response();
    let unknown_user = attempt("ghost", "hare").await.unwrap_err().into_response();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);

    let body_a = axum::body::to_bytes(wrong_password.into_body(), usize::MAX).await.unwrap();
    let body_b = axum::body::to_bytes(unknown_user.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body_a, body_b);
}
