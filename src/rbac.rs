use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;

/// Rank returned for any role name outside the canonical hierarchy.
/// It sits below every defined role, so unknown roles are denied by default.
pub const UNKNOWN_RANK: i32 = -1;

/// Role
///
/// The privilege tiers of the portal. Declaration order is the seniority order:
/// the derived `Ord` is what the Access Guard compares, so reordering the variants
/// changes who can reach what.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Visitor,
    Researcher,
    Senior,
    Admin,
}

impl Role {
    /// Every role, lowest privilege first.
    pub const ALL: [Role; 4] = [Role::Visitor, Role::Researcher, Role::Senior, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Visitor => "visitor",
            Role::Researcher => "researcher",
            Role::Senior => "senior",
            Role::Admin => "admin",
        }
    }

    /// Position in the hierarchy (0 = visitor).
    pub fn rank(self) -> i32 {
        match self {
            Role::Visitor => 0,
            Role::Researcher => 1,
            Role::Senior => 2,
            Role::Admin => 3,
        }
    }

    /// Access Guard, typed form.
    pub fn can_access(self, required: Role) -> bool {
        self >= required
    }

    /// The classification labels this role may read. Each set is a superset of
    /// the sets of the roles ranked below it.
    pub fn visible_labels(self) -> &'static [Classification] {
        use Classification::*;
        match self {
            Role::Visitor => &[C],
            Role::Researcher => &[C, B],
            Role::Senior => &[C, B, A],
            Role::Admin => &[C, B, A, Sss],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("unknown role '{}'", s))
    }
}

/// Classification
///
/// Sensitivity tier of a dossier, from `C` (lowest) to `SSS` (highest).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Classification {
    C,
    B,
    A,
    Sss,
}

impl Classification {
    pub const ALL: [Classification; 4] = [
        Classification::C,
        Classification::B,
        Classification::A,
        Classification::Sss,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::C => "C",
            Classification::B => "B",
            Classification::A => "A",
            Classification::Sss => "SSS",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Classification::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("unknown classification '{}'", s))
    }
}

/// Anything carrying a classification label can go through the filter.
pub trait Classified {
    fn classification(&self) -> Classification;
}

/// rank
///
/// Hierarchy index of a role name, or `UNKNOWN_RANK` when the name is not one of
/// the four canonical roles.
pub fn rank(role: &str) -> i32 {
    role.parse::<Role>().map(Role::rank).unwrap_or(UNKNOWN_RANK)
}

/// can_access
///
/// Access Guard over raw role names: `rank(actual) >= rank(required)`.
/// An unknown required level denies everyone rather than letting unknown
/// actual roles through on an equal sentinel.
pub fn can_access(actual: &str, required: &str) -> bool {
    let required = rank(required);
    required != UNKNOWN_RANK && rank(actual) >= required
}

/// visible_labels
///
/// Labels readable by a role name; empty for an unknown role.
pub fn visible_labels(role: &str) -> &'static [Classification] {
    role.parse::<Role>()
        .map(Role::visible_labels)
        .unwrap_or(&[])
}

/// filter_by_labels
///
/// Keeps the records whose label is in `labels`, preserving their relative order.
pub fn filter_by_labels<T, I>(records: I, labels: &[Classification]) -> Vec<T>
where
    T: Classified,
    I: IntoIterator<Item = T>,
{
    records
        .into_iter()
        .filter(|record| labels.contains(&record.classification()))
        .collect()
}

/// filter_by_classification
///
/// Order-preserving subsequence of `records` visible to `role`.
pub fn filter_by_classification<T, I>(records: I, role: &str) -> Vec<T>
where
    T: Classified,
    I: IntoIterator<Item = T>,
{
    filter_by_labels(records, visible_labels(role))
}
