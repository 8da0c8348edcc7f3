use std::env;

/// Default lifetime of an issued session token: one shift (8 hours).
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 8 * 60 * 60;

const LOCAL_JWT_SECRET: &str = "local-dossier-portal-secret-do-not-deploy";

/// AppConfig
///
/// Immutable configuration loaded once at startup and shared through `AppState`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the developer bypass and log format.
    pub env: Env,
    // Postgres connection string. `None` runs on the in-memory store.
    pub db_url: Option<String>,
    // HMAC secret signing session tokens.
    pub jwt_secret: String,
    pub port: u16,
    pub token_ttl_secs: u64,
    // Administrator account guaranteed to exist after bootstrap.
    pub admin_username: String,
    pub admin_password: String,
}

/// Env
///
/// Local enables developer conveniences; Production demands every secret explicitly.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe, non-panicking values for test scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            port: 3000,
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            admin_username: "admin".to_string(),
            admin_password: "admin".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// In production, panics when `DATABASE_URL`, `JWT_SECRET` or `ADMIN_PASSWORD`
    /// is missing, and in any environment when `PORT` or `TOKEN_TTL_SECS` is not a number.
    /// The portal refuses to start half-configured.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").unwrap_or_default().as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let port = env::var("PORT")
            .map(|p| p.parse().expect("FATAL: PORT must be a port number"))
            .unwrap_or(3000);
        let token_ttl_secs = env::var("TOKEN_TTL_SECS")
            .map(|t| t.parse().expect("FATAL: TOKEN_TTL_SECS must be a number of seconds"))
            .unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        let admin_username = env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());

        match env {
            Env::Local => Self {
                env: Env::Local,
                // Without a database the portal keeps everything in memory.
                db_url: env::var("DATABASE_URL").ok(),
                jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
                port,
                token_ttl_secs,
                admin_username,
                admin_password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string()),
            },
            Env::Production => Self {
                env: Env::Production,
                db_url: Some(
                    env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod"),
                ),
                jwt_secret: env::var("JWT_SECRET").expect("FATAL: JWT_SECRET required in prod"),
                port,
                token_ttl_secs,
                admin_username,
                admin_password: env::var("ADMIN_PASSWORD")
                    .expect("FATAL: ADMIN_PASSWORD required in prod"),
            },
        }
    }
}
