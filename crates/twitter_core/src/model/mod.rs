//! Relational schema for the social graph.
//!
//! # Responsibility
//! - Define the five persisted entities and their key shapes.
//! - Declare the queryable columns of every entity.
//!
//! # Invariants
//! - `User` identity is `username`; `Tweet` and `Tag` identity is the generated id.
//! - `FollowEdge` and `TweetTag` are identified by their composite key.
//! - Model types carry no storage behavior.

pub mod follow;
pub mod tag;
pub mod tweet;
pub mod user;
pub mod validation;

pub use follow::{FollowColumn, FollowEdge};
pub use tag::{Tag, TagColumn, TagId, TweetTag, TweetTagColumn};
pub use tweet::{NewTweet, Tweet, TweetColumn, TweetId, TweetRecord};
pub use user::{User, UserColumn};
pub use validation::ValidationError;
