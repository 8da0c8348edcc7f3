use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

use crate::error::{PortalError, PortalResult};

/// hash_password
///
/// Argon2id with default parameters, encoded as a PHC string.
pub fn hash_password(password: &str) -> Result<String, PortalError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| PortalError::Storage(e.to_string()))?;
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| PortalError::Storage(e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PortalError::Storage(e.to_string()))?
        .to_string();
    Ok(phc)
}

/// verify_password
///
/// False on mismatch and on a hash that does not parse.
pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// run_blocking
///
/// Runs CPU-bound work (Argon2) on the blocking pool so the async workers keep
/// serving other connections meanwhile.
pub async fn run_blocking<T, F>(task: F) -> PortalResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| PortalError::Storage(format!("spawn_blocking failed: {}", e)))
}

/// `hash_password` on the blocking pool.
pub async fn hash_password_blocking(password: String) -> PortalResult<String> {
    run_blocking(move || hash_password(&password)).await?
}
