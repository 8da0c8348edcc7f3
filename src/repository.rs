use async_trait::async_trait;
use sqlx::{FromRow, PgPool, postgres::PgPoolOptions};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    error::{PortalError, PortalResult},
    models::{DangerLevel, Dossier, NewDossier, NewSubject, NewUser, Subject, User},
    rbac::{Classification, Role, filter_by_labels},
};

/// Repository Trait
///
/// Persistence contract for the three record kinds. Records are append-only:
/// there is no update or delete. Identities are assigned by the store, increase
/// monotonically per kind and are never reused.
///
/// Every listing is ordered by identity, so two reads with no create in between
/// return the same sequence.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn find_user_by_username(&self, username: &str) -> PortalResult<Option<User>>;
    async fn get_user(&self, id: i64) -> PortalResult<Option<User>>;
    /// Fails with `ConstraintViolation` when the username is taken; the store is left unchanged.
    async fn create_user(&self, user: NewUser) -> PortalResult<User>;

    // --- Dossiers ---
    /// `None` lists every dossier; `Some(labels)` only those carrying one of `labels`.
    async fn list_dossiers(&self, labels: Option<&[Classification]>) -> PortalResult<Vec<Dossier>>;
    async fn create_dossier(&self, dossier: NewDossier) -> PortalResult<Dossier>;

    // --- Subjects ---
    async fn list_subjects(&self) -> PortalResult<Vec<Subject>>;
    async fn create_subject(&self, subject: NewSubject) -> PortalResult<Subject>;

    /// Releases the underlying store. Called once at shutdown.
    async fn close(&self);
}

/// RepositoryState
///
/// The shared handle injected into every request through `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

// --- Postgres ---

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('visitor', 'researcher', 'senior', 'admin'))
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS dossiers (
        id BIGSERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        body TEXT NOT NULL,
        classification TEXT NOT NULL CHECK (classification IN ('C', 'B', 'A', 'SSS'))
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS subjects (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        alias TEXT,
        kind TEXT NOT NULL,
        risk_coefficient BIGINT NOT NULL DEFAULT 0,
        attack_type TEXT,
        status TEXT NOT NULL,
        description TEXT NOT NULL,
        danger_level TEXT NOT NULL CHECK (danger_level IN ('Low', 'Medium', 'High', 'Extreme')),
        internal_notes TEXT
    )
    "#,
];

// Raw rows: enums are stored as TEXT and parsed on the way out.

#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    role: String,
}

impl TryFrom<UserRow> for User {
    type Error = PortalError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            role: row.role.parse::<Role>().map_err(PortalError::Storage)?,
        })
    }
}

#[derive(FromRow)]
struct DossierRow {
    id: i64,
    title: String,
    body: String,
    classification: String,
}

impl TryFrom<DossierRow> for Dossier {
    type Error = PortalError;

    fn try_from(row: DossierRow) -> Result<Self, Self::Error> {
        Ok(Dossier {
            id: row.id,
            title: row.title,
            body: row.body,
            classification: row
                .classification
                .parse::<Classification>()
                .map_err(PortalError::Storage)?,
        })
    }
}

#[derive(FromRow)]
struct SubjectRow {
    id: i64,
    name: String,
    alias: Option<String>,
    kind: String,
    risk_coefficient: i64,
    attack_type: Option<String>,
    status: String,
    description: String,
    danger_level: String,
    internal_notes: Option<String>,
}

impl TryFrom<SubjectRow> for Subject {
    type Error = PortalError;

    fn try_from(row: SubjectRow) -> Result<Self, Self::Error> {
        Ok(Subject {
            id: row.id,
            name: row.name,
            alias: row.alias,
            kind: row.kind,
            risk_coefficient: row.risk_coefficient,
            attack_type: row.attack_type,
            status: row.status,
            description: row.description,
            danger_level: row
                .danger_level
                .parse::<DangerLevel>()
                .map_err(PortalError::Storage)?,
            internal_notes: row.internal_notes,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> PortalResult<Vec<T>>
where
    T: TryFrom<R, Error = PortalError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Maps a store failure to a `PortalError`, tagging opaque failures with `op`.
/// Logging happens once, where the error is rendered.
fn store_error(op: &'static str) -> impl FnOnce(sqlx::Error) -> PortalError {
    move |e| match PortalError::from(e) {
        PortalError::Storage(detail) => PortalError::Storage(format!("{}: {}", op, detail)),
        other => other,
    }
}

/// PostgresRepository
///
/// The production implementation of `Repository`, backed by a PostgreSQL pool.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Wraps an already initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// connect
    ///
    /// Opens the pool and makes sure the three tables exist.
    pub async fn connect(db_url: &str) -> PortalResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
            .map_err(store_error("connect"))?;
        let repo = Self::new(pool);
        repo.init_schema().await?;
        Ok(repo)
    }

    /// init_schema
    ///
    /// Idempotent `CREATE TABLE IF NOT EXISTS` for users, dossiers and subjects.
    pub async fn init_schema(&self) -> PortalResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(store_error("init_schema"))?;
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_user_by_username(&self, username: &str) -> PortalResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, role FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("find_user_by_username"))?;
        row.map(User::try_from).transpose()
    }

    async fn get_user(&self, id: i64) -> PortalResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, role FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("get_user"))?;
        row.map(User::try_from).transpose()
    }

    /// create_user
    ///
    /// The `UNIQUE` index on `username` serializes concurrent creations; the loser
    /// gets a `ConstraintViolation`.
    async fn create_user(&self, user: NewUser) -> PortalResult<User> {
        let result = sqlx::query_as::<_, UserRow>(
            r#"INSERT INTO users (username, password_hash, role) VALUES ($1, $2, $3)
               RETURNING id, username, password_hash, role"#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => User::try_from(row),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                PortalError::ConstraintViolation(format!("username '{}'", user.username)),
            ),
            Err(e) => Err(store_error("create_user")(e)),
        }
    }

    /// list_dossiers
    ///
    /// The label filter is pushed into the query as `classification = ANY($1)`.
    async fn list_dossiers(&self, labels: Option<&[Classification]>) -> PortalResult<Vec<Dossier>> {
        let rows = match labels {
            Some(labels) => {
                let labels: Vec<String> = labels.iter().map(|l| l.as_str().to_string()).collect();
                sqlx::query_as::<_, DossierRow>(
                    r#"SELECT id, title, body, classification FROM dossiers
                       WHERE classification = ANY($1) ORDER BY id ASC"#,
                )
                .bind(labels)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, DossierRow>(
                    "SELECT id, title, body, classification FROM dossiers ORDER BY id ASC",
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(store_error("list_dossiers"))?;
        convert_all(rows)
    }

    async fn create_dossier(&self, dossier: NewDossier) -> PortalResult<Dossier> {
        let row = sqlx::query_as::<_, DossierRow>(
            r#"INSERT INTO dossiers (title, body, classification) VALUES ($1, $2, $3)
               RETURNING id, title, body, classification"#,
        )
        .bind(dossier.title)
        .bind(dossier.body)
        .bind(dossier.classification.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("create_dossier"))?;
        Dossier::try_from(row)
    }

    async fn list_subjects(&self) -> PortalResult<Vec<Subject>> {
        let rows = sqlx::query_as::<_, SubjectRow>(
            r#"SELECT id, name, alias, kind, risk_coefficient, attack_type, status,
                      description, danger_level, internal_notes
               FROM subjects ORDER BY id ASC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("list_subjects"))?;
        convert_all(rows)
    }

    async fn create_subject(&self, subject: NewSubject) -> PortalResult<Subject> {
        let row = sqlx::query_as::<_, SubjectRow>(
            r#"INSERT INTO subjects
                   (name, alias, kind, risk_coefficient, attack_type, status,
                    description, danger_level, internal_notes)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING id, name, alias, kind, risk_coefficient, attack_type, status,
                         description, danger_level, internal_notes"#,
        )
        .bind(subject.name)
        .bind(subject.alias)
        .bind(subject.kind)
        .bind(subject.risk_coefficient)
        .bind(subject.attack_type)
        .bind(subject.status)
        .bind(subject.description)
        .bind(subject.danger_level.as_str())
        .bind(subject.internal_notes)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("create_subject"))?;
        Subject::try_from(row)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

// --- In-Memory ---

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    dossiers: Vec<Dossier>,
    subjects: Vec<Subject>,
    // Last identity handed out per kind.
    user_seq: i64,
    dossier_seq: i64,
    subject_seq: i64,
}

/// InMemoryRepository
///
/// A process-local `Repository` for tests and for local runs without a database.
/// A single write lock makes each create atomic, including the username check.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_user_by_username(&self, username: &str) -> PortalResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn get_user(&self, id: i64) -> PortalResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(&self, user: NewUser) -> PortalResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(PortalError::ConstraintViolation(format!(
                "username '{}'",
                user.username
            )));
        }
        tables.user_seq += 1;
        let created = User {
            id: tables.user_seq,
            username: user.username,
            password_hash: user.password_hash,
            role: user.role,
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn list_dossiers(&self, labels: Option<&[Classification]>) -> PortalResult<Vec<Dossier>> {
        let tables = self.tables.read().await;
        let all = tables.dossiers.iter().cloned();
        Ok(match labels {
            Some(labels) => filter_by_labels(all, labels),
            None => all.collect(),
        })
    }

    async fn create_dossier(&self, dossier: NewDossier) -> PortalResult<Dossier> {
        let mut tables = self.tables.write().await;
        tables.dossier_seq += 1;
        let created = Dossier {
            id: tables.dossier_seq,
            title: dossier.title,
            body: dossier.body,
            classification: dossier.classification,
        };
        tables.dossiers.push(created.clone());
        Ok(created)
    }

    async fn list_subjects(&self) -> PortalResult<Vec<Subject>> {
        Ok(self.tables.read().await.subjects.clone())
    }

    async fn create_subject(&self, subject: NewSubject) -> PortalResult<Subject> {
        let mut tables = self.tables.write().await;
        tables.subject_seq += 1;
        let created = Subject {
            id: tables.subject_seq,
            name: subject.name,
            alias: subject.alias,
            kind: subject.kind,
            risk_coefficient: subject.risk_coefficient,
            attack_type: subject.attack_type,
            status: subject.status,
            description: subject.description,
            danger_level: subject.danger_level,
            internal_notes: subject.internal_notes,
        };
        tables.subjects.push(created.clone());
        Ok(created)
    }

    async fn close(&self) {
        tracing::debug!("in-memory store released");
    }
}
