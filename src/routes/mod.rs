//! Router Module Index
//!
//! Routes are split by how much identity they need, so the authentication layer
//! is attached per module rather than per route.

/// No session required.
pub mod public;

/// Requires a resolved `AuthUser`.
pub mod authenticated;

/// Requires the admin role.
pub mod admin;
