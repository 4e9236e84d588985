//! User account entity.
//!
//! # Invariants
//! - `username` is unique and never changes after creation.
//! - `password` is stored as given. Hashing is out of scope for this core,
//!   and a production deployment must hash it before it reaches storage.

use super::validation::ValidationError;
use serde::{Deserialize, Serialize};

/// Registered account, also the authenticated principal of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
}

impl User {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.username.trim().is_empty() {
            return Err(ValidationError::BlankUsername);
        }
        Ok(())
    }
}

/// Queryable columns of `users`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserColumn {
    Username,
    Password,
}
