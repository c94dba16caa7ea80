//! Well-known role name constants.
//!
//! These must match the `users.role` column values seeded by the migrations.

/// Full administrative access, including the export admin endpoints.
pub const ROLE_ADMIN: &str = "admin";

/// Regular authenticated user.
pub const ROLE_USER: &str = "user";
