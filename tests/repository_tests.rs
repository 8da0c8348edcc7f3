use dossier_portal::{
    PortalError,
    models::{DangerLevel, NewDossier, NewSubject, NewUser},
    rbac::{Classification, Role},
    repository::{InMemoryRepository, Repository},
};

fn new_user(username: &str, role: Role) -> NewUser {
    NewUser {
        username: username.to_string(),
        password_hash: "$argon2id$v=19$stub".to_string(),
        role,
    }
}

fn new_dossier(title: &str, classification: Classification) -> NewDossier {
    NewDossier {
        title: title.to_string(),
        body: format!("{} body", title),
        classification,
    }
}

fn new_subject(name: &str) -> NewSubject {
    NewSubject {
        name: name.to_string(),
        alias: None,
        kind: "ghoul".to_string(),
        risk_coefficient: 0,
        attack_type: None,
        status: "unknown".to_string(),
        description: "Observed near the 11th ward".to_string(),
        danger_level: DangerLevel::Medium,
        internal_notes: None,
    }
}

// --- Users ---

#[tokio::test]
async fn test_create_and_find_user() {
    let repo = InMemoryRepository::new();
    let created = repo.create_user(new_user("amon", Role::Senior)).await.unwrap();

    let found = repo.find_user_by_username("amon").await.unwrap().unwrap();
    assert_eq!(found, created);
    assert_eq!(repo.get_user(created.id).await.unwrap(), Some(created));
}

#[tokio::test]
async fn test_find_unknown_username_is_none() {
    let repo = InMemoryRepository::new();
    assert_eq!(repo.find_user_by_username("ghost").await.unwrap(), None);
    assert_eq!(repo.get_user(42).await.unwrap(), None);
}

#[tokio::test]
async fn test_duplicate_username_is_constraint_violation() {
    let repo = InMemoryRepository::new();
    let original = repo.create_user(new_user("juzo", Role::Researcher)).await.unwrap();

    let result = repo.create_user(new_user("juzo", Role::Admin)).await;
    assert!(matches!(result, Err(PortalError::ConstraintViolation(_))));

    // Store unchanged: same record, same role.
    let stored = repo.find_user_by_username("juzo").await.unwrap().unwrap();
    assert_eq!(stored, original);
    assert_eq!(stored.role, Role::Researcher);

    let next = repo.create_user(new_user("akira", Role::Visitor)).await.unwrap();
    assert!(next.id > original.id);
}

#[tokio::test]
async fn test_concurrent_creates_of_same_username_admit_one() {
    let repo = std::sync::Arc::new(InMemoryRepository::new());
    let mut handles = Vec::new();
    for _ in 0..8 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.create_user(new_user("kaneki", Role::Visitor)).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
}

// --- Dossiers ---

#[tokio::test]
async fn test_dossier_ids_are_monotonic() {
    let repo = InMemoryRepository::new();
    let first = repo.create_dossier(new_dossier("a", Classification::C)).await.unwrap();
    let second = repo.create_dossier(new_dossier("b", Classification::B)).await.unwrap();
    let third = repo.create_dossier(new_dossier("c", Classification::A)).await.unwrap();

    assert!(first.id < second.id && second.id < third.id);
}

#[tokio::test]
async fn test_list_dossiers_with_label_filter() {
    let repo = InMemoryRepository::new();
    for (title, label) in [
        ("one", Classification::A),
        ("two", Classification::Sss),
        ("three", Classification::C),
        ("four", Classification::A),
    ] {
        repo.create_dossier(new_dossier(title, label)).await.unwrap();
    }

    let all = repo.list_dossiers(None).await.unwrap();
    assert_eq!(all.len(), 4);

    let senior = repo
        .list_dossiers(Some(Role::Senior.visible_labels()))
        .await
        .unwrap();
    let titles: Vec<&str> = senior.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["one", "three", "four"]);

    let no_labels: &[Classification] = &[];
    let nothing = repo.list_dossiers(Some(no_labels)).await.unwrap();
    assert!(nothing.is_empty());
}

#[tokio::test]
async fn test_listing_is_idempotent() {
    let repo = InMemoryRepository::new();
    repo.create_dossier(new_dossier("x", Classification::B)).await.unwrap();
    repo.create_dossier(new_dossier("y", Classification::C)).await.unwrap();
    repo.create_subject(new_subject("Rize")).await.unwrap();

    assert_eq!(
        repo.list_dossiers(None).await.unwrap(),
        repo.list_dossiers(None).await.unwrap()
    );
    assert_eq!(
        repo.list_subjects().await.unwrap(),
        repo.list_subjects().await.unwrap()
    );
}

// --- Subjects ---

#[tokio::test]
async fn test_subjects_round_through_the_store() {
    let repo = InMemoryRepository::new();
    let created = repo.create_subject(new_subject("Rize")).await.unwrap();
    let second = repo.create_subject(new_subject("Yamori")).await.unwrap();

    assert_eq!(created.id + 1, second.id);
    let listed = repo.list_subjects().await.unwrap();
    assert_eq!(listed, vec![created, second]);
}

#[tokio::test]
async fn test_identity_sequences_are_per_kind() {
    let repo = InMemoryRepository::new();
    let dossier = repo.create_dossier(new_dossier("d", Classification::C)).await.unwrap();
    let subject = repo.create_subject(new_subject("s")).await.unwrap();
    let user = repo.create_user(new_user("u", Role::Visitor)).await.unwrap();

    assert_eq!((dossier.id, subject.id, user.id), (1, 1, 1));
}
