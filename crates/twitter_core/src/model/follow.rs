//! Directed follow edge.

use serde::{Deserialize, Serialize};

/// `follower` receives `followee`'s tweets in their feed.
///
/// Edges are keyed by the ordered pair; `(a, b)` and `(b, a)` are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FollowEdge {
    pub follower: String,
    pub followee: String,
}

impl FollowEdge {
    pub fn new(follower: impl Into<String>, followee: impl Into<String>) -> Self {
        Self {
            follower: follower.into(),
            followee: followee.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowColumn {
    Follower,
    Followee,
}
