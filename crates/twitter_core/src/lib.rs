//! Relational core of a minimal console social network.
//! Accounts, the follow graph, tagged tweets and their read paths live here;
//! presentation stays outside this crate.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{
    FollowEdge, NewTweet, Tag, TagId, Tweet, TweetId, TweetRecord, TweetTag, User,
    ValidationError,
};
pub use repo::follow_repo::{FollowRepository, SqliteFollowRepository};
pub use repo::query::{Filter, FilterValue, FindAll, SortDirection};
pub use repo::tag_repo::{SqliteTagRepository, TagRepository};
pub use repo::tweet_repo::{SqliteTweetRepository, TweetRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::feed_service::{FeedError, FeedService, FEED_DEFAULT_WINDOW, FEED_WINDOW_MAX};
pub use service::graph_service::{GraphError, GraphService};
pub use service::session::{Session, SessionError};
pub use service::tweet_text::{parse_tweet_text, split_tag_input, ParsedTweet};

/// Minimal health-check API for wiring probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
