//! Repository layer contracts and SQLite implementations.
//!
//! # Responsibility
//! - Provide one CRUD/query family per persisted entity.
//! - Translate storage constraint failures into semantic errors.
//! - Keep SQL text inside the persistence boundary.
//!
//! # Invariants
//! - "Not found" on lookup is `Ok(None)`, never an error.
//! - Deleting a missing key is a reported no-op (`Ok(false)`).
//! - Uniqueness and foreign-key violations surface as `DuplicateKey`,
//!   `DanglingReference` or `StillReferenced`, never as raw SQLite errors.
//! - Repositories accept any `&Connection`, so callers compose them inside
//!   one `rusqlite::Transaction`.

use crate::db::{schema_version, DbError, SCHEMA_VERSION};
use crate::model::ValidationError;
use rusqlite::{ffi, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod follow_repo;
pub mod query;
pub mod tag_repo;
pub mod tweet_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Row rejected before reaching storage.
    Validation(ValidationError),
    /// Primary or unique key already exists.
    DuplicateKey { entity: &'static str, key: String },
    /// A foreign key does not resolve to an existing row.
    DanglingReference { entity: &'static str, key: String },
    /// Row cannot be deleted while other rows reference it.
    StillReferenced { entity: &'static str, key: String },
    /// Update target does not exist.
    NotFound { entity: &'static str, key: String },
    /// Connection schema is not at the version this build writes.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted row cannot be converted to a valid model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateKey { entity, key } => write!(f, "duplicate {entity} key: {key}"),
            Self::DanglingReference { entity, key } => {
                write!(f, "{entity} references a missing row: {key}")
            }
            Self::StillReferenced { entity, key } => {
                write!(f, "{entity} is still referenced: {key}")
            }
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Statement kind used to classify constraint failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteKind {
    Insert,
    Update,
    Delete,
}

/// Maps a failed write to a semantic repository error.
///
/// Only key constraints are classified. CHECK, NOT NULL and trigger
/// failures stay `RepoError::Db`.
pub(crate) fn classify_write_error(
    err: rusqlite::Error,
    kind: WriteKind,
    entity: &'static str,
    key: impl Display,
) -> RepoError {
    let extended_code = match &err {
        rusqlite::Error::SqliteFailure(failure, _) => failure.extended_code,
        _ => return err.into(),
    };

    let key = key.to_string();
    match (extended_code, kind) {
        (ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE, _) => {
            RepoError::DuplicateKey { entity, key }
        }
        (ffi::SQLITE_CONSTRAINT_FOREIGNKEY, WriteKind::Delete) => {
            RepoError::StillReferenced { entity, key }
        }
        (ffi::SQLITE_CONSTRAINT_FOREIGNKEY, WriteKind::Insert | WriteKind::Update) => {
            RepoError::DanglingReference { entity, key }
        }
        _ => err.into(),
    }
}

/// Rejects connections that were not opened through `db::open_db*`.
pub(crate) fn ensure_schema_ready(conn: &Connection) -> RepoResult<()> {
    let actual_version = schema_version(conn)?;
    if actual_version != SCHEMA_VERSION {
        return Err(RepoError::UninitializedConnection {
            expected_version: SCHEMA_VERSION,
            actual_version,
        });
    }
    Ok(())
}
