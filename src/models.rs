use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    error::PortalError,
    rbac::{Classification, Classified, Role},
};

/// Placeholder stored for free-text fields the form left empty.
pub const UNKNOWN_PLACEHOLDER: &str = "unknown";

// --- Core Records ---

/// User
///
/// An account allowed to log in. The password hash never leaves the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
}

/// Dossier
///
/// A classified text record. Its label decides who may read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Dossier {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub classification: Classification,
}

impl Classified for Dossier {
    fn classification(&self) -> Classification {
        self.classification
    }
}

/// DangerLevel
///
/// Threat assessment attached to a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub enum DangerLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl DangerLevel {
    pub const ALL: [DangerLevel; 4] = [
        DangerLevel::Low,
        DangerLevel::Medium,
        DangerLevel::High,
        DangerLevel::Extreme,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DangerLevel::Low => "Low",
            DangerLevel::Medium => "Medium",
            DangerLevel::High => "High",
            DangerLevel::Extreme => "Extreme",
        }
    }
}

impl fmt::Display for DangerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DangerLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        DangerLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("unknown danger level '{}'", s))
    }
}

/// Subject
///
/// Biographical and threat-assessment record of a tracked individual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub alias: Option<String>,
    /// Free-form, e.g. "ghoul" or "experimental subject".
    pub kind: String,
    pub risk_coefficient: i64,
    pub attack_type: Option<String>,
    pub status: String,
    pub description: String,
    pub danger_level: DangerLevel,
    pub internal_notes: Option<String>,
}

// --- Validated Inputs (what the repository accepts) ---

/// A user ready to be inserted; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDossier {
    pub title: String,
    pub body: String,
    pub classification: Classification,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubject {
    pub name: String,
    pub alias: Option<String>,
    pub kind: String,
    pub risk_coefficient: i64,
    pub attack_type: Option<String>,
    pub status: String,
    pub description: String,
    pub danger_level: DangerLevel,
    pub internal_notes: Option<String>,
}

// --- Request Payloads (raw form fields) ---

/// LoginRequest
///
/// Form posted to `POST /login`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// CreateUserRequest
///
/// Form posted by an administrator to `POST /admin/users`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// CreateDossierRequest
///
/// Form posted to `POST /admin/dossiers`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateDossierRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub classification: Option<String>,
}

/// CreateSubjectRequest
///
/// Form posted to `POST /admin/subjects`. Every field arrives as raw text;
/// `into_new_subject` applies presence checks and defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateSubjectRequest {
    pub name: Option<String>,
    pub alias: Option<String>,
    pub kind: Option<String>,
    pub risk_coefficient: Option<String>,
    pub attack_type: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub danger_level: Option<String>,
    pub internal_notes: Option<String>,
}

/// A form field as submitted; blank (whitespace only) counts as absent.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(value: Option<String>, field: &str) -> Result<String, PortalError> {
    present(value).ok_or_else(|| PortalError::Validation(format!("{} is required", field)))
}

fn parse_field<T: FromStr<Err = String>>(
    value: Option<String>,
    field: &str,
) -> Result<T, PortalError> {
    required(value, field)?
        .parse()
        .map_err(PortalError::Validation)
}

impl CreateUserRequest {
    /// Returns the username, plain password and role after presence checks.
    pub fn validate(self) -> Result<(String, String, Role), PortalError> {
        let username = required(self.username, "username")?.trim().to_string();
        // Passwords are not trimmed.
        let password = self
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| PortalError::Validation("password is required".to_string()))?;
        let role = parse_field(self.role, "role")?;
        Ok((username, password, role))
    }
}

impl CreateDossierRequest {
    pub fn into_new_dossier(self) -> Result<NewDossier, PortalError> {
        Ok(NewDossier {
            title: required(self.title, "title")?,
            body: required(self.body, "body")?,
            classification: parse_field(self.classification, "classification")?,
        })
    }
}

impl CreateSubjectRequest {
    pub fn into_new_subject(self) -> Result<NewSubject, PortalError> {
        let risk_coefficient = match present(self.risk_coefficient) {
            None => 0,
            Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
                PortalError::Validation(format!("risk_coefficient '{}' is not an integer", raw))
            })?,
        };

        Ok(NewSubject {
            name: required(self.name, "name")?,
            alias: present(self.alias),
            kind: required(self.kind, "kind")?,
            risk_coefficient,
            attack_type: present(self.attack_type),
            status: present(self.status).unwrap_or_else(|| UNKNOWN_PLACEHOLDER.to_string()),
            description: required(self.description, "description")?,
            danger_level: parse_field(self.danger_level, "danger_level")?,
            internal_notes: present(self.internal_notes),
        })
    }
}

// --- Responses ---

/// LoginResponse
///
/// Bearer token plus the principal it identifies.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// UserProfile
///
/// The authenticated principal as seen by clients (GET /me).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub visible_labels: Vec<Classification>,
    /// Names of the zones this role may enter.
    pub zones: Vec<String>,
}

impl UserProfile {
    pub fn new(id: i64, username: String, role: Role) -> Self {
        Self {
            id,
            username,
            role,
            visible_labels: role.visible_labels().to_vec(),
            zones: Zone::catalog()
                .into_iter()
                .filter(|zone| role.can_access(zone.required_role))
                .map(|zone| zone.name)
                .collect(),
        }
    }
}

/// Zone
///
/// An area of the portal gated by a minimum role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Zone {
    pub name: String,
    pub required_role: Role,
    pub summary: String,
}

impl Zone {
    fn new(name: &str, required_role: Role, summary: &str) -> Self {
        Self {
            name: name.to_string(),
            required_role,
            summary: summary.to_string(),
        }
    }

    pub fn archives() -> Self {
        Self::new("archives", Role::Visitor, "Public archives, open to everyone")
    }

    pub fn lab() -> Self {
        Self::new("lab", Role::Researcher, "Experiments, reports and subject files")
    }

    pub fn direction() -> Self {
        Self::new("direction", Role::Admin, "Scientific direction, SSS-classified dossiers")
    }

    pub fn catalog() -> Vec<Zone> {
        vec![Self::archives(), Self::lab(), Self::direction()]
    }
}
