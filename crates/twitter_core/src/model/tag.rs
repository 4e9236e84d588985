//! Tag entity and the tweet-tag join record.
//!
//! # Invariants
//! - Tag `content` is case-sensitive and unique; equal content means the same tag.
//! - Tags outlive the tweets that reference them.
//! - A `TweetTag` pair appears at most once.

use super::tweet::TweetId;
use super::validation::ValidationError;
use serde::{Deserialize, Serialize};

pub type TagId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub content: String,
}

impl Tag {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_tag_content(&self.content)
    }
}

/// Rejects blank tag content.
pub fn validate_tag_content(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::BlankTagContent);
    }
    Ok(())
}

/// Join row between one tweet and one tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TweetTag {
    pub tweet_id: TweetId,
    pub tag_id: TagId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagColumn {
    Id,
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweetTagColumn {
    TweetId,
    TagId,
}
