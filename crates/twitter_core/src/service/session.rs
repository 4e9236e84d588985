//! Explicit current-user context for one interactive session.

use crate::model::User;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    NotLoggedIn,
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotLoggedIn => write!(f, "no user is logged in"),
        }
    }
}

impl Error for SessionError {}

/// Holds at most one authenticated user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    current: Option<User>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any previous principal.
    pub fn login(&mut self, user: User) {
        self.current = Some(user);
    }

    /// Clears the principal and returns it.
    pub fn logout(&mut self) -> Option<User> {
        self.current.take()
    }

    pub fn current(&self) -> Option<&User> {
        self.current.as_ref()
    }

    pub fn require_user(&self) -> Result<&User, SessionError> {
        self.current.as_ref().ok_or(SessionError::NotLoggedIn)
    }
}
