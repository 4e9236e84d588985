//! Read paths: feed, own tweets, search by tag, search by user.
//!
//! # Responsibility
//! - Produce newest-first tweet sequences with their tags attached.
//! - Keep feed assembly in one filtered, ordered and limited query.
//!
//! # Invariants
//! - Ordering is always `timestamp DESC, id DESC`.
//! - Feed filters to followees first, then orders, then applies the window.
//! - Feed never contains the reader's own tweets.

use crate::model::{Tweet, TweetColumn, TweetRecord, User};
use crate::repo::query::{Filter, FindAll, SortDirection};
use crate::repo::tag_repo::{SqliteTagRepository, TagRepository};
use crate::repo::tweet_repo::{SqliteTweetRepository, TweetRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::{ensure_schema_ready, RepoError, RepoResult};
use log::debug;
use rusqlite::Connection;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Feed size used when the caller does not choose one.
pub const FEED_DEFAULT_WINDOW: u32 = 5;
/// Largest accepted feed window.
pub const FEED_WINDOW_MAX: u32 = 50;

#[derive(Debug)]
pub enum FeedError {
    UnknownUser(String),
    UnknownTag(String),
    Repo(RepoError),
}

impl Display for FeedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownUser(username) => write!(f, "user does not exist: {username}"),
            Self::UnknownTag(content) => write!(f, "tag does not exist: {content}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FeedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for FeedError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Normalizes a requested feed window.
///
/// `None` means the default window; larger requests clamp to the maximum.
pub fn normalize_feed_window(window: Option<u32>) -> u32 {
    match window {
        Some(value) if value > FEED_WINDOW_MAX => FEED_WINDOW_MAX,
        Some(value) => value,
        None => FEED_DEFAULT_WINDOW,
    }
}

/// Read-only feed engine over one connection.
pub struct FeedService<'conn> {
    tweets: SqliteTweetRepository<'conn>,
    tags: SqliteTagRepository<'conn>,
    users: SqliteUserRepository<'conn>,
    window: u32,
}

impl<'conn> FeedService<'conn> {
    pub fn try_new(conn: &'conn Connection) -> Result<Self, FeedError> {
        ensure_schema_ready(conn)?;
        Ok(Self {
            tweets: SqliteTweetRepository::from_ready(conn),
            tags: SqliteTagRepository::from_ready(conn),
            users: SqliteUserRepository::from_ready(conn),
            window: FEED_DEFAULT_WINDOW,
        })
    }

    /// Overrides the window used by `feed`.
    pub fn with_window(mut self, window: u32) -> Self {
        self.window = normalize_feed_window(Some(window));
        self
    }

    /// Most recent tweets from accounts `user` follows, using the configured window.
    pub fn feed(&self, user: &User) -> Result<Vec<TweetRecord>, FeedError> {
        self.feed_with_window(user, self.window)
    }

    /// Most recent `window` tweets from accounts `user` follows.
    ///
    /// Returns fewer when fewer qualify, and nothing for a zero window.
    pub fn feed_with_window(
        &self,
        user: &User,
        window: u32,
    ) -> Result<Vec<TweetRecord>, FeedError> {
        let window = normalize_feed_window(Some(window));
        if window == 0 {
            return Ok(Vec::new());
        }

        let tweets = self.tweets.find_followee_tweets(&user.username, window)?;
        let records = self.with_tags(tweets)?;
        debug!(
            "event=feed_read module=feed status=ok window={window} count={}",
            records.len()
        );
        Ok(records)
    }

    /// Every tweet `user` authored, newest first.
    pub fn own_tweets(&self, user: &User) -> Result<Vec<TweetRecord>, FeedError> {
        Ok(self.authored_by(&user.username)?)
    }

    /// Every tweet linked to the tag with this content, newest first.
    ///
    /// Content is trimmed like stored tag tokens, then matched exactly.
    pub fn tweets_by_tag(&self, content: &str) -> Result<Vec<TweetRecord>, FeedError> {
        let content = content.trim();
        let tag = self
            .tags
            .find_tag_by_content(content)?
            .ok_or_else(|| FeedError::UnknownTag(content.to_string()))?;

        Ok(self.with_tags(self.tweets.find_tagged_tweets(tag.id)?)?)
    }

    /// Tweets of another account; does not touch the caller's session.
    pub fn tweets_by_user(&self, username: &str) -> Result<Vec<TweetRecord>, FeedError> {
        let username = username.trim();
        if self.users.find_user(username)?.is_none() {
            return Err(FeedError::UnknownUser(username.to_string()));
        }
        Ok(self.authored_by(username)?)
    }

    fn authored_by(&self, username: &str) -> RepoResult<Vec<TweetRecord>> {
        let query = newest_first(FindAll::new().filter(Filter::eq(TweetColumn::Author, username)));
        self.with_tags(self.tweets.find_tweets(&query)?)
    }

    /// Attaches sorted tag contents, keeping the order of `tweets`.
    fn with_tags(&self, tweets: Vec<Tweet>) -> RepoResult<Vec<TweetRecord>> {
        if tweets.is_empty() {
            return Ok(Vec::new());
        }

        let ids = tweets.iter().map(|tweet| tweet.id).collect::<Vec<_>>();
        let mut tags_by_tweet: HashMap<_, Vec<String>> = HashMap::new();
        for (tweet_id, content) in self.tags.find_tag_contents_for_tweets(&ids)? {
            tags_by_tweet.entry(tweet_id).or_default().push(content);
        }

        Ok(tweets
            .into_iter()
            .map(|tweet| {
                let mut tags = tags_by_tweet.remove(&tweet.id).unwrap_or_default();
                tags.sort();
                TweetRecord { tweet, tags }
            })
            .collect())
    }
}

fn newest_first(query: FindAll<TweetColumn>) -> FindAll<TweetColumn> {
    query
        .order_by(TweetColumn::Timestamp, SortDirection::Desc)
        .order_by(TweetColumn::Id, SortDirection::Desc)
}

#[cfg(test)]
mod tests {
    use super::{normalize_feed_window, FEED_DEFAULT_WINDOW, FEED_WINDOW_MAX};

    #[test]
    fn feed_window_defaults_and_clamps() {
        assert_eq!(normalize_feed_window(None), FEED_DEFAULT_WINDOW);
        assert_eq!(normalize_feed_window(Some(0)), 0);
        assert_eq!(normalize_feed_window(Some(7)), 7);
        assert_eq!(normalize_feed_window(Some(500)), FEED_WINDOW_MAX);
    }
}
