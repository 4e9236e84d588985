//! Follow-edge repository contract and SQLite implementation.
//!
//! # Invariants
//! - `(follower, followee)` is the primary key; duplicates fail with `DuplicateKey`.
//! - Both endpoints must be existing users.
//! - Lookups by follower use the primary key; lookups by followee use
//!   `idx_follows_followee`.

use crate::model::{FollowColumn, FollowEdge};
use crate::repo::query::{fetch_all, FindAll};
use crate::repo::{classify_write_error, ensure_schema_ready, RepoResult, WriteKind};
use rusqlite::{params, Connection, OptionalExtension, Row};

const FOLLOW_SELECT_SQL: &str = "SELECT follower, followee FROM follows";
const ENTITY: &str = "follow";

pub trait FollowRepository {
    fn create_follow(&self, edge: &FollowEdge) -> RepoResult<()>;
    fn find_follow(&self, edge: &FollowEdge) -> RepoResult<Option<FollowEdge>>;
    fn find_follows(&self, query: &FindAll<FollowColumn>) -> RepoResult<Vec<FollowEdge>>;
    fn delete_follow(&self, edge: &FollowEdge) -> RepoResult<bool>;
}

pub struct SqliteFollowRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFollowRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    /// Skips the schema check for callers that already ran it.
    pub(crate) fn from_ready(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl FollowRepository for SqliteFollowRepository<'_> {
    fn create_follow(&self, edge: &FollowEdge) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO follows (follower, followee) VALUES (?1, ?2);",
                params![edge.follower, edge.followee],
            )
            .map_err(|err| classify_write_error(err, WriteKind::Insert, ENTITY, edge_key(edge)))?;
        Ok(())
    }

    fn find_follow(&self, edge: &FollowEdge) -> RepoResult<Option<FollowEdge>> {
        let found = self
            .conn
            .query_row(
                &format!("{FOLLOW_SELECT_SQL} WHERE follower = ?1 AND followee = ?2;"),
                params![edge.follower, edge.followee],
                parse_follow_row,
            )
            .optional()?;
        Ok(found)
    }

    fn find_follows(&self, query: &FindAll<FollowColumn>) -> RepoResult<Vec<FollowEdge>> {
        fetch_all(self.conn, FOLLOW_SELECT_SQL, query, |row| {
            Ok(parse_follow_row(row)?)
        })
    }

    fn delete_follow(&self, edge: &FollowEdge) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute(
                "DELETE FROM follows WHERE follower = ?1 AND followee = ?2;",
                params![edge.follower, edge.followee],
            )
            .map_err(|err| classify_write_error(err, WriteKind::Delete, ENTITY, edge_key(edge)))?;
        Ok(changed > 0)
    }
}

fn parse_follow_row(row: &Row<'_>) -> rusqlite::Result<FollowEdge> {
    Ok(FollowEdge {
        follower: row.get("follower")?,
        followee: row.get("followee")?,
    })
}

fn edge_key(edge: &FollowEdge) -> String {
    format!("{}->{}", edge.follower, edge.followee)
}
