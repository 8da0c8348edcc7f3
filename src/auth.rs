use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::{
    config::{AppConfig, Env},
    error::{PortalError, PortalResult},
    models::{NewUser, User},
    rbac::Role,
    repository::RepositoryState,
    security::{hash_password, hash_password_blocking, run_blocking, verify_password},
};

/// Claims
///
/// Payload of a session token issued by `POST /login`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user id in decimal. The role is reloaded from the store
    /// on every request, so a token never outlives a role change.
    pub sub: String,
    /// Expiration Time (exp).
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// AuthUser
///
/// The authenticated principal of a request. Handlers receive it as an extractor
/// argument and check its role with `require`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    /// require
    ///
    /// Access Guard at the handler boundary: `Forbidden` when the principal ranks
    /// below `required`.
    pub fn require(&self, required: Role) -> PortalResult<()> {
        if self.role.can_access(required) {
            Ok(())
        } else {
            tracing::warn!(
                user = %self.username,
                role = %self.role,
                required = %required,
                "access denied"
            );
            Err(PortalError::Forbidden)
        }
    }
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// 1. Local bypass: in `Env::Local`, an `x-user-id` header naming an existing user is enough.
/// 2. Bearer token extraction and JWT validation (signature and expiry).
/// 3. Store lookup, so deleted users and role changes take effect immediately.
///
/// Rejection: `PortalError::NotAuthenticated` (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = PortalError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|id| id.trim().parse::<i64>().ok());
            if let Some(user_id) = bypass_id {
                if let Some(user) = repo.get_user(user_id).await? {
                    tracing::Span::current().record("user", user.username.as_str());
                    return Ok(user.into());
                }
            }
        }
        // Production, or the bypass did not resolve: fall through to the token.

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(PortalError::NotAuthenticated)?;

        let claims = decode_token(token, &config.jwt_secret)?;

        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| PortalError::NotAuthenticated)?;

        let user = repo
            .get_user(user_id)
            .await?
            .ok_or(PortalError::NotAuthenticated)?;

        tracing::Span::current().record("user", user.username.as_str());
        Ok(user.into())
    }
}

/// issue_token
///
/// Signs a session token for `user_id`, valid for `ttl_secs`.
pub fn issue_token(user_id: i64, secret: &str, ttl_secs: u64) -> PortalResult<String> {
    let now = Utc::now().timestamp().max(0) as usize;
    let ttl = usize::try_from(ttl_secs).unwrap_or(usize::MAX);
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now.saturating_add(ttl),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| PortalError::Storage(format!("token signing failed: {}", e)))
}

/// decode_token
///
/// Validates signature and expiry. Every failure is `NotAuthenticated`.
pub fn decode_token(token: &str, secret: &str) -> PortalResult<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation) {
        Ok(data) => Ok(data.claims),
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                other => tracing::debug!("rejected token: {:?}", other),
            }
            Err(PortalError::NotAuthenticated)
        }
    }
}

// Verified against when the username is unknown, so a miss costs the same as a
// wrong password.
static DECOY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("decoy-password-never-matches").ok());

/// authenticate
///
/// Resolves a username/password pair to a user. Unknown usernames and wrong
/// passwords both yield `InvalidCredentials`. The Argon2 verify runs on the
/// blocking pool.
pub async fn authenticate(
    repo: &RepositoryState,
    username: &str,
    password: &str,
) -> PortalResult<User> {
    let user = repo.find_user_by_username(username).await?;
    let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
    let password = password.to_string();

    let matched = run_blocking(move || match stored_hash {
        Some(hash) => verify_password(&hash, &password),
        None => {
            if let Some(decoy) = DECOY_HASH.as_deref() {
                let _ = verify_password(decoy, &password);
            }
            false
        }
    })
    .await?;

    match user {
        Some(user) if matched => Ok(user),
        Some(_) => {
            tracing::debug!(user = %username, "wrong password");
            Err(PortalError::InvalidCredentials)
        }
        None => {
            tracing::debug!(user = %username, "unknown username");
            Err(PortalError::InvalidCredentials)
        }
    }
}

/// register_user
///
/// Hashes the password and stores a new account.
pub async fn register_user(
    repo: &RepositoryState,
    username: String,
    password: &str,
    role: Role,
) -> PortalResult<User> {
    let password_hash = hash_password_blocking(password.to_string()).await?;
    repo.create_user(NewUser {
        username,
        password_hash,
        role,
    })
    .await
}

/// bootstrap_admin
///
/// Makes sure the configured administrator exists. Returns `true` when it had to
/// be created; a second call is a no-op.
pub async fn bootstrap_admin(
    repo: &RepositoryState,
    username: &str,
    password: &str,
) -> PortalResult<bool> {
    if repo.find_user_by_username(username).await?.is_some() {
        return Ok(false);
    }
    match register_user(repo, username.to_string(), password, Role::Admin).await {
        Ok(admin) => {
            tracing::info!(
                user = %admin.username,
                id = admin.id,
                "bootstrap administrator created"
            );
            Ok(true)
        }
        // Another instance won the race.
        Err(PortalError::ConstraintViolation(_)) => Ok(false),
        Err(e) => Err(e),
    }
}
