//! Tweet repository contract and SQLite implementation.
//!
//! # Invariants
//! - Ids come from `AUTOINCREMENT`, so they increase and are never reused.
//! - Tweets have no update path.
//! - `author` must name an existing user at insert time.
//! - Feed and tag reads resolve membership in SQL, so they bind a fixed
//!   number of parameters however many followees or links exist.

use crate::model::{NewTweet, TagId, Tweet, TweetColumn, TweetId};
use crate::repo::query::{count_rows, fetch_all, visit_all, FindAll};
use crate::repo::{classify_write_error, ensure_schema_ready, RepoResult, WriteKind};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::ops::ControlFlow;

const TWEET_SELECT_SQL: &str = "SELECT id, content, timestamp, author FROM tweets";
const FOLLOWEE_TWEETS_SQL: &str = "SELECT id, content, timestamp, author
     FROM tweets
     WHERE author IN (SELECT followee FROM follows WHERE follower = ?1)
     ORDER BY timestamp DESC, id DESC
     LIMIT ?2;";
const TAGGED_TWEETS_SQL: &str = "SELECT t.id AS id, t.content AS content,
            t.timestamp AS timestamp, t.author AS author
     FROM tweets t
     INNER JOIN tweet_tags tt ON tt.tweet_id = t.id
     WHERE tt.tag_id = ?1
     ORDER BY t.timestamp DESC, t.id DESC;";
const ENTITY: &str = "tweet";

pub trait TweetRepository {
    /// Inserts a tweet and returns the stored row with its generated id.
    fn create_tweet(&self, tweet: &NewTweet) -> RepoResult<Tweet>;
    fn find_tweet(&self, id: TweetId) -> RepoResult<Option<Tweet>>;
    fn find_tweets(&self, query: &FindAll<TweetColumn>) -> RepoResult<Vec<Tweet>>;
    /// Streams matching tweets to `visit` until it breaks.
    fn visit_tweets(
        &self,
        query: &FindAll<TweetColumn>,
        visit: &mut dyn FnMut(Tweet) -> ControlFlow<()>,
    ) -> RepoResult<()>;
    /// Newest `limit` tweets by accounts `follower` follows.
    fn find_followee_tweets(&self, follower: &str, limit: u32) -> RepoResult<Vec<Tweet>>;
    /// Every tweet linked to `tag_id`, newest first.
    fn find_tagged_tweets(&self, tag_id: TagId) -> RepoResult<Vec<Tweet>>;
    fn count_tweets(&self) -> RepoResult<u64>;
    /// Removes the tweet and its tag links.
    fn delete_tweet(&self, id: TweetId) -> RepoResult<bool>;
}

pub struct SqliteTweetRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTweetRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    /// Skips the schema check for callers that already ran it.
    pub(crate) fn from_ready(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TweetRepository for SqliteTweetRepository<'_> {
    fn create_tweet(&self, tweet: &NewTweet) -> RepoResult<Tweet> {
        tweet.validate()?;
        self.conn
            .execute(
                "INSERT INTO tweets (content, timestamp, author) VALUES (?1, ?2, ?3);",
                params![tweet.content, tweet.timestamp, tweet.author],
            )
            .map_err(|err| {
                classify_write_error(err, WriteKind::Insert, ENTITY, format!("author={}", tweet.author))
            })?;

        Ok(Tweet {
            id: self.conn.last_insert_rowid(),
            content: tweet.content.clone(),
            timestamp: tweet.timestamp,
            author: tweet.author.clone(),
        })
    }

    fn find_tweet(&self, id: TweetId) -> RepoResult<Option<Tweet>> {
        let tweet = self
            .conn
            .query_row(
                &format!("{TWEET_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_tweet_row,
            )
            .optional()?;
        Ok(tweet)
    }

    fn find_tweets(&self, query: &FindAll<TweetColumn>) -> RepoResult<Vec<Tweet>> {
        fetch_all(self.conn, TWEET_SELECT_SQL, query, |row| {
            Ok(parse_tweet_row(row)?)
        })
    }

    fn visit_tweets(
        &self,
        query: &FindAll<TweetColumn>,
        visit: &mut dyn FnMut(Tweet) -> ControlFlow<()>,
    ) -> RepoResult<()> {
        visit_all(
            self.conn,
            TWEET_SELECT_SQL,
            query,
            |row| Ok(parse_tweet_row(row)?),
            visit,
        )
    }

    fn find_followee_tweets(&self, follower: &str, limit: u32) -> RepoResult<Vec<Tweet>> {
        let mut stmt = self.conn.prepare(FOLLOWEE_TWEETS_SQL)?;
        let rows = stmt.query_map(params![follower, i64::from(limit)], parse_tweet_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn find_tagged_tweets(&self, tag_id: TagId) -> RepoResult<Vec<Tweet>> {
        let mut stmt = self.conn.prepare(TAGGED_TWEETS_SQL)?;
        let rows = stmt.query_map([tag_id], parse_tweet_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn count_tweets(&self) -> RepoResult<u64> {
        count_rows(self.conn, "tweets")
    }

    fn delete_tweet(&self, id: TweetId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM tweets WHERE id = ?1;", [id])
            .map_err(|err| classify_write_error(err, WriteKind::Delete, ENTITY, id))?;
        Ok(changed > 0)
    }
}

fn parse_tweet_row(row: &Row<'_>) -> rusqlite::Result<Tweet> {
    Ok(Tweet {
        id: row.get("id")?,
        content: row.get("content")?,
        timestamp: row.get("timestamp")?,
        author: row.get("author")?,
    })
}
