//! User repository contract and SQLite implementation.
//!
//! # Invariants
//! - `username` is the primary key; a second insert fails with `DuplicateKey`.
//! - Passwords are compared and stored verbatim.

use crate::model::{User, UserColumn};
use crate::repo::query::{count_rows, fetch_all, FindAll};
use crate::repo::{classify_write_error, ensure_schema_ready, RepoError, RepoResult, WriteKind};
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_SELECT_SQL: &str = "SELECT username, password FROM users";
const ENTITY: &str = "user";

/// Repository interface for user accounts.
pub trait UserRepository {
    fn create_user(&self, user: &User) -> RepoResult<()>;
    fn find_user(&self, username: &str) -> RepoResult<Option<User>>;
    fn find_users(&self, query: &FindAll<UserColumn>) -> RepoResult<Vec<User>>;
    fn count_users(&self) -> RepoResult<u64>;
    /// Replaces the password of an existing account.
    fn update_user(&self, user: &User) -> RepoResult<()>;
    /// Fails with `StillReferenced` while the user still owns tweets.
    fn delete_user(&self, username: &str) -> RepoResult<bool>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    /// Skips the schema check for callers that already ran it.
    pub(crate) fn from_ready(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<()> {
        user.validate()?;
        self.conn
            .execute(
                "INSERT INTO users (username, password) VALUES (?1, ?2);",
                params![user.username, user.password],
            )
            .map_err(|err| classify_write_error(err, WriteKind::Insert, ENTITY, &user.username))?;
        Ok(())
    }

    fn find_user(&self, username: &str) -> RepoResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE username = ?1;"),
                [username],
                parse_user_row,
            )
            .optional()?;
        Ok(user)
    }

    fn find_users(&self, query: &FindAll<UserColumn>) -> RepoResult<Vec<User>> {
        fetch_all(self.conn, USER_SELECT_SQL, query, |row| {
            Ok(parse_user_row(row)?)
        })
    }

    fn count_users(&self) -> RepoResult<u64> {
        count_rows(self.conn, "users")
    }

    fn update_user(&self, user: &User) -> RepoResult<()> {
        user.validate()?;
        let changed = self
            .conn
            .execute(
                "UPDATE users SET password = ?2 WHERE username = ?1;",
                params![user.username, user.password],
            )
            .map_err(|err| classify_write_error(err, WriteKind::Update, ENTITY, &user.username))?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: ENTITY,
                key: user.username.clone(),
            });
        }
        Ok(())
    }

    fn delete_user(&self, username: &str) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE username = ?1;", [username])
            .map_err(|err| classify_write_error(err, WriteKind::Delete, ENTITY, username))?;
        Ok(changed > 0)
    }
}

fn parse_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        username: row.get("username")?,
        password: row.get("password")?,
    })
}
