//! Tweet entity and its tagged read model.
//!
//! # Invariants
//! - `id` is generated by storage, strictly increasing and never reused.
//! - Tweets are immutable once written.
//! - `timestamp` is epoch milliseconds and only drives ordering.

use super::validation::ValidationError;
use serde::{Deserialize, Serialize};

pub type TweetId = i64;

/// Persisted tweet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: TweetId,
    pub content: String,
    pub timestamp: i64,
    /// Username of the author.
    pub author: String,
}

/// Insert shape for a tweet; storage assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTweet {
    pub content: String,
    pub timestamp: i64,
    pub author: String,
}

impl NewTweet {
    pub fn new(author: impl Into<String>, content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            content: content.into(),
            timestamp,
            author: author.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.content.trim().is_empty() {
            return Err(ValidationError::BlankTweetContent);
        }
        if self.author.trim().is_empty() {
            return Err(ValidationError::BlankUsername);
        }
        Ok(())
    }
}

/// Tweet joined with the contents of its tags, sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetRecord {
    #[serde(flatten)]
    pub tweet: Tweet,
    pub tags: Vec<String>,
}

/// Queryable columns of `tweets`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweetColumn {
    Id,
    Content,
    Timestamp,
    Author,
}
