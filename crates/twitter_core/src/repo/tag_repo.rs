//! Tag and tweet-tag repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist tags keyed by unique, case-sensitive content.
//! - Persist tweet-tag join rows.
//!
//! # Invariants
//! - Tag content uniqueness is a storage constraint; a clashing insert fails
//!   with `DuplicateKey`, which find-or-create callers resolve by re-fetching.
//! - Join rows require both the tweet and the tag to exist.
//! - A tag attached to any tweet cannot be deleted.

use crate::model::tag::validate_tag_content;
use crate::model::{Tag, TagColumn, TagId, TweetId, TweetTag, TweetTagColumn};
use crate::repo::query::{count_rows, fetch_all, FindAll, MAX_BOUND_IDS};
use crate::repo::{classify_write_error, ensure_schema_ready, RepoError, RepoResult, WriteKind};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const TAG_SELECT_SQL: &str = "SELECT id, content FROM tags";
const TWEET_TAG_SELECT_SQL: &str = "SELECT tweet_id, tag_id FROM tweet_tags";
const TAG_ENTITY: &str = "tag";
const TWEET_TAG_ENTITY: &str = "tweet_tag";

pub trait TagRepository {
    fn create_tag(&self, content: &str) -> RepoResult<Tag>;
    fn find_tag(&self, id: TagId) -> RepoResult<Option<Tag>>;
    /// Exact, case-sensitive content lookup.
    fn find_tag_by_content(&self, content: &str) -> RepoResult<Option<Tag>>;
    fn find_tags(&self, query: &FindAll<TagColumn>) -> RepoResult<Vec<Tag>>;
    fn update_tag(&self, tag: &Tag) -> RepoResult<()>;
    fn delete_tag(&self, id: TagId) -> RepoResult<bool>;
    fn count_tags(&self) -> RepoResult<u64>;

    fn create_tweet_tag(&self, link: &TweetTag) -> RepoResult<()>;
    fn find_tweet_tags(&self, query: &FindAll<TweetTagColumn>) -> RepoResult<Vec<TweetTag>>;
    fn delete_tweet_tag(&self, link: &TweetTag) -> RepoResult<bool>;
    /// `(tweet_id, tag content)` pairs for every link of `tweet_ids`.
    ///
    /// Ids are bound in batches, so any number of tweets can be resolved.
    fn find_tag_contents_for_tweets(
        &self,
        tweet_ids: &[TweetId],
    ) -> RepoResult<Vec<(TweetId, String)>>;
}

pub struct SqliteTagRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTagRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    /// Skips the schema check for callers that already ran it.
    pub(crate) fn from_ready(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TagRepository for SqliteTagRepository<'_> {
    fn create_tag(&self, content: &str) -> RepoResult<Tag> {
        validate_tag_content(content)?;
        self.conn
            .execute("INSERT INTO tags (content) VALUES (?1);", [content])
            .map_err(|err| classify_write_error(err, WriteKind::Insert, TAG_ENTITY, content))?;

        Ok(Tag {
            id: self.conn.last_insert_rowid(),
            content: content.to_string(),
        })
    }

    fn find_tag(&self, id: TagId) -> RepoResult<Option<Tag>> {
        let tag = self
            .conn
            .query_row(
                &format!("{TAG_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_tag_row,
            )
            .optional()?;
        Ok(tag)
    }

    fn find_tag_by_content(&self, content: &str) -> RepoResult<Option<Tag>> {
        let tag = self
            .conn
            .query_row(
                &format!("{TAG_SELECT_SQL} WHERE content = ?1;"),
                [content],
                parse_tag_row,
            )
            .optional()?;
        Ok(tag)
    }

    fn find_tags(&self, query: &FindAll<TagColumn>) -> RepoResult<Vec<Tag>> {
        fetch_all(self.conn, TAG_SELECT_SQL, query, |row| Ok(parse_tag_row(row)?))
    }

    fn update_tag(&self, tag: &Tag) -> RepoResult<()> {
        tag.validate()?;
        let changed = self
            .conn
            .execute(
                "UPDATE tags SET content = ?2 WHERE id = ?1;",
                params![tag.id, tag.content],
            )
            .map_err(|err| {
                classify_write_error(err, WriteKind::Update, TAG_ENTITY, &tag.content)
            })?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: TAG_ENTITY,
                key: tag.id.to_string(),
            });
        }
        Ok(())
    }

    fn delete_tag(&self, id: TagId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM tags WHERE id = ?1;", [id])
            .map_err(|err| classify_write_error(err, WriteKind::Delete, TAG_ENTITY, id))?;
        Ok(changed > 0)
    }

    fn count_tags(&self) -> RepoResult<u64> {
        count_rows(self.conn, "tags")
    }

    fn create_tweet_tag(&self, link: &TweetTag) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO tweet_tags (tweet_id, tag_id) VALUES (?1, ?2);",
                params![link.tweet_id, link.tag_id],
            )
            .map_err(|err| {
                classify_write_error(err, WriteKind::Insert, TWEET_TAG_ENTITY, link_key(link))
            })?;
        Ok(())
    }

    fn find_tweet_tags(&self, query: &FindAll<TweetTagColumn>) -> RepoResult<Vec<TweetTag>> {
        fetch_all(self.conn, TWEET_TAG_SELECT_SQL, query, |row| {
            Ok(TweetTag {
                tweet_id: row.get("tweet_id")?,
                tag_id: row.get("tag_id")?,
            })
        })
    }

    fn delete_tweet_tag(&self, link: &TweetTag) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute(
                "DELETE FROM tweet_tags WHERE tweet_id = ?1 AND tag_id = ?2;",
                params![link.tweet_id, link.tag_id],
            )
            .map_err(|err| {
                classify_write_error(err, WriteKind::Delete, TWEET_TAG_ENTITY, link_key(link))
            })?;
        Ok(changed > 0)
    }

    fn find_tag_contents_for_tweets(
        &self,
        tweet_ids: &[TweetId],
    ) -> RepoResult<Vec<(TweetId, String)>> {
        let mut pairs = Vec::new();
        for batch in tweet_ids.chunks(MAX_BOUND_IDS) {
            let placeholders = vec!["?"; batch.len()].join(", ");
            let sql = format!(
                "SELECT tt.tweet_id, t.content
                 FROM tweet_tags tt
                 INNER JOIN tags t ON t.id = tt.tag_id
                 WHERE tt.tweet_id IN ({placeholders});"
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(batch.iter()), |row| {
                Ok((row.get::<_, TweetId>(0)?, row.get::<_, String>(1)?))
            })?;
            for pair in rows {
                pairs.push(pair?);
            }
        }
        Ok(pairs)
    }
}

fn parse_tag_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get("id")?,
        content: row.get("content")?,
    })
}

fn link_key(link: &TweetTag) -> String {
    format!("tweet_id={} tag_id={}", link.tweet_id, link.tag_id)
}
