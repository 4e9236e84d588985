//! Account, follow-graph and posting use-cases.
//!
//! # Responsibility
//! - Register and authenticate accounts.
//! - Create and remove follow edges under graph policy.
//! - Resolve tags with find-or-create and post tagged tweets.
//!
//! # Invariants
//! - A user never follows itself; an ordered pair is followed at most once.
//! - Check-then-act sequences run inside one `IMMEDIATE` transaction and
//!   roll back on any error.
//! - Equal tag content always resolves to the same tag row.
//! - One tweet never links the same tag twice.

use crate::model::{
    FollowColumn, FollowEdge, NewTweet, Tag, TweetRecord, TweetTag, User, ValidationError,
};
use crate::repo::follow_repo::{FollowRepository, SqliteFollowRepository};
use crate::repo::query::{Filter, FindAll};
use crate::repo::tag_repo::{SqliteTagRepository, TagRepository};
use crate::repo::tweet_repo::{SqliteTweetRepository, TweetRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::{ensure_schema_ready, RepoError, RepoResult};
use crate::service::tweet_text::parse_tweet_text;
use log::{info, warn};
use rusqlite::{Connection, TransactionBehavior};
use std::collections::{BTreeSet, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Errors from graph use-cases.
#[derive(Debug)]
pub enum GraphError {
    /// Username is blank after trim.
    InvalidUsername,
    DuplicateUsername(String),
    /// Password and its confirmation differ.
    PasswordMismatch,
    InvalidCredentials,
    UnknownUser(String),
    SelfFollow(String),
    AlreadyFollowing(String),
    NotFollowing(String),
    /// Tag token is blank after trim.
    InvalidTag(String),
    /// Tweet content is blank after trim.
    EmptyTweet,
    Repo(RepoError),
}

impl Display for GraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUsername => write!(f, "username must not be blank"),
            Self::DuplicateUsername(username) => {
                write!(f, "username is already taken: {username}")
            }
            Self::PasswordMismatch => write!(f, "passwords do not match"),
            Self::InvalidCredentials => write!(f, "invalid username or password"),
            Self::UnknownUser(username) => write!(f, "user does not exist: {username}"),
            Self::SelfFollow(username) => write!(f, "user cannot follow itself: {username}"),
            Self::AlreadyFollowing(username) => write!(f, "already following {username}"),
            Self::NotFollowing(username) => write!(f, "not following {username}"),
            Self::InvalidTag(value) => write!(f, "invalid tag: `{value}`"),
            Self::EmptyTweet => write!(f, "tweet content must not be blank"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GraphError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for GraphError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for GraphError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// Repositories bound to one connection or transaction.
struct Repos<'a> {
    users: SqliteUserRepository<'a>,
    tweets: SqliteTweetRepository<'a>,
    tags: SqliteTagRepository<'a>,
    follows: SqliteFollowRepository<'a>,
}

impl<'a> Repos<'a> {
    fn bind(conn: &'a Connection) -> Self {
        Self {
            users: SqliteUserRepository::from_ready(conn),
            tweets: SqliteTweetRepository::from_ready(conn),
            tags: SqliteTagRepository::from_ready(conn),
            follows: SqliteFollowRepository::from_ready(conn),
        }
    }
}

/// Graph operations facade over one SQLite connection.
pub struct GraphService<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> GraphService<'conn> {
    /// Creates the service over a connection opened by `db::open_db*`.
    pub fn try_new(conn: &'conn mut Connection) -> Result<Self, GraphError> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    /// Creates an account and returns it as the authenticated principal.
    pub fn register(&mut self, username: &str, password: &str) -> Result<User, GraphError> {
        let user = User::new(username.trim(), password);
        user.validate().map_err(|_| GraphError::InvalidUsername)?;

        let created = self.in_transaction(|repos| {
            repos.users.create_user(&user).map_err(|err| match err {
                RepoError::DuplicateKey { .. } => {
                    GraphError::DuplicateUsername(user.username.clone())
                }
                other => other.into(),
            })?;
            Ok(user)
        });

        match &created {
            Ok(_) => info!("event=user_register module=graph status=ok"),
            Err(err) => warn!("event=user_register module=graph status=rejected reason={err}"),
        }
        created
    }

    /// Registers after checking the password was typed the same way twice.
    pub fn register_confirmed(
        &mut self,
        username: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<User, GraphError> {
        if password != confirmation {
            return Err(GraphError::PasswordMismatch);
        }
        self.register(username, password)
    }

    /// Returns the account only when both username and password match.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<User, GraphError> {
        let users = SqliteUserRepository::from_ready(&*self.conn);
        match users.find_user(username.trim())? {
            Some(user) if user.password == password => {
                info!("event=user_login module=graph status=ok");
                Ok(user)
            }
            _ => {
                warn!("event=user_login module=graph status=rejected");
                Err(GraphError::InvalidCredentials)
            }
        }
    }

    /// Makes `actor` follow `target`.
    ///
    /// Checks run in order: target exists, target is not `actor`, edge is new.
    pub fn follow(&mut self, actor: &User, target: &str) -> Result<FollowEdge, GraphError> {
        let target = target.trim();
        let edge = self.in_transaction(|repos| {
            if repos.users.find_user(target)?.is_none() {
                return Err(GraphError::UnknownUser(target.to_string()));
            }
            if target == actor.username {
                return Err(GraphError::SelfFollow(target.to_string()));
            }

            let edge = FollowEdge::new(actor.username.as_str(), target);
            if repos.follows.find_follow(&edge)?.is_some() {
                return Err(GraphError::AlreadyFollowing(target.to_string()));
            }
            repos.follows.create_follow(&edge).map_err(|err| match err {
                RepoError::DuplicateKey { .. } => GraphError::AlreadyFollowing(target.to_string()),
                RepoError::DanglingReference { .. } => {
                    GraphError::UnknownUser(actor.username.clone())
                }
                other => other.into(),
            })?;
            Ok(edge)
        })?;

        info!("event=follow module=graph status=ok");
        Ok(edge)
    }

    /// Removes the `actor -> target` edge.
    pub fn unfollow(&mut self, actor: &User, target: &str) -> Result<(), GraphError> {
        let target = target.trim();
        self.in_transaction(|repos| {
            let edge = FollowEdge::new(actor.username.as_str(), target);
            if !repos.follows.delete_follow(&edge)? {
                return Err(GraphError::NotFollowing(target.to_string()));
            }
            Ok(())
        })?;

        info!("event=unfollow module=graph status=ok");
        Ok(())
    }

    /// Usernames `user` follows.
    pub fn following_set(&self, user: &User) -> Result<BTreeSet<String>, GraphError> {
        let follows = SqliteFollowRepository::from_ready(&*self.conn);
        Ok(following_of(&follows, &user.username)?)
    }

    /// Usernames following `user`.
    pub fn followers_set(&self, user: &User) -> Result<BTreeSet<String>, GraphError> {
        let follows = SqliteFollowRepository::from_ready(&*self.conn);
        let edges = follows.find_follows(
            &FindAll::new().filter(Filter::eq(FollowColumn::Followee, user.username.as_str())),
        )?;
        Ok(edges.into_iter().map(|edge| edge.follower).collect())
    }

    /// Returns the tag with exactly this content, creating it when absent.
    pub fn attach_or_create_tag(&mut self, content: &str) -> Result<Tag, GraphError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(GraphError::InvalidTag(content.to_string()));
        }
        self.in_transaction(|repos| Ok(resolve_tag(&repos.tags, content)?))
    }

    /// Posts a tweet stamped with the current time.
    pub fn post_tweet<S: AsRef<str>>(
        &mut self,
        author: &User,
        content: &str,
        tag_tokens: &[S],
    ) -> Result<TweetRecord, GraphError> {
        self.post_tweet_at(author, content, tag_tokens, now_epoch_ms())
    }

    /// Posts a tweet with an explicit epoch-ms timestamp.
    ///
    /// The tweet, any new tags and every join row commit together or not at
    /// all. Repeated tokens link once.
    pub fn post_tweet_at<S: AsRef<str>>(
        &mut self,
        author: &User,
        content: &str,
        tag_tokens: &[S],
        timestamp: i64,
    ) -> Result<TweetRecord, GraphError> {
        let new_tweet = NewTweet::new(author.username.as_str(), content.trim(), timestamp);
        new_tweet.validate().map_err(|err| match err {
            ValidationError::BlankUsername => GraphError::UnknownUser(author.username.clone()),
            ValidationError::BlankTweetContent | ValidationError::BlankTagContent => {
                GraphError::EmptyTweet
            }
        })?;
        let tokens = distinct_tokens(tag_tokens)?;

        let record = self.in_transaction(|repos| {
            let tweet = repos.tweets.create_tweet(&new_tweet).map_err(|err| match err {
                RepoError::DanglingReference { .. } => {
                    GraphError::UnknownUser(author.username.clone())
                }
                other => other.into(),
            })?;

            let mut tags = Vec::with_capacity(tokens.len());
            for token in &tokens {
                let tag = resolve_tag(&repos.tags, token)?;
                repos.tags.create_tweet_tag(&TweetTag {
                    tweet_id: tweet.id,
                    tag_id: tag.id,
                })?;
                tags.push(tag.content);
            }
            tags.sort();
            Ok(TweetRecord { tweet, tags })
        })?;

        info!(
            "event=tweet_post module=graph status=ok tweet_id={} tag_count={}",
            record.tweet.id,
            record.tags.len()
        );
        Ok(record)
    }

    /// Posts free text, turning `#token`s into tags.
    pub fn post_tweet_text(&mut self, author: &User, text: &str) -> Result<TweetRecord, GraphError> {
        let parsed = parse_tweet_text(text);
        self.post_tweet(author, &parsed.content, parsed.tags.as_slice())
    }

    fn in_transaction<T>(
        &mut self,
        op: impl FnOnce(&Repos<'_>) -> Result<T, GraphError>,
    ) -> Result<T, GraphError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        // Dropping `tx` on the error path rolls every write back.
        let value = op(&Repos::bind(&tx))?;
        tx.commit()?;
        Ok(value)
    }
}

/// Followee usernames of `username`, answered from the primary key.
fn following_of(
    follows: &impl FollowRepository,
    username: &str,
) -> RepoResult<BTreeSet<String>> {
    let edges = follows
        .find_follows(&FindAll::new().filter(Filter::eq(FollowColumn::Follower, username)))?;
    Ok(edges.into_iter().map(|edge| edge.followee).collect())
}

/// Find-or-create by exact content.
///
/// A `DuplicateKey` on insert means another writer created the tag between
/// lookup and insert; the existing row is returned.
fn resolve_tag(tags: &impl TagRepository, content: &str) -> RepoResult<Tag> {
    if let Some(tag) = tags.find_tag_by_content(content)? {
        return Ok(tag);
    }
    match tags.create_tag(content) {
        Ok(tag) => Ok(tag),
        Err(RepoError::DuplicateKey { .. }) => {
            tags.find_tag_by_content(content)?.ok_or_else(|| {
                RepoError::InvalidData(format!("tag `{content}` missing after duplicate insert"))
            })
        }
        Err(err) => Err(err),
    }
}

/// Trims tokens and drops repeats, keeping first-occurrence order.
fn distinct_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<String>, GraphError> {
    let mut seen = HashSet::new();
    let mut distinct = Vec::new();
    for token in tokens {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(GraphError::InvalidTag(token.as_ref().to_string()));
        }
        if seen.insert(trimmed) {
            distinct.push(trimmed.to_string());
        }
    }
    Ok(distinct)
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{distinct_tokens, resolve_tag, GraphError};
    use crate::model::{Tag, TagColumn, TagId, TweetId, TweetTag, TweetTagColumn};
    use crate::repo::query::FindAll;
    use crate::repo::tag_repo::TagRepository;
    use crate::repo::{RepoError, RepoResult};
    use std::cell::Cell;

    /// Tag store where another writer inserts `content` between lookup and insert.
    struct RacingTags {
        lookups: Cell<u32>,
        winner: Tag,
    }

    impl TagRepository for RacingTags {
        fn create_tag(&self, content: &str) -> RepoResult<Tag> {
            Err(RepoError::DuplicateKey {
                entity: "tag",
                key: content.to_string(),
            })
        }

        fn find_tag(&self, _id: TagId) -> RepoResult<Option<Tag>> {
            unreachable!("resolve_tag looks tags up by content")
        }

        fn find_tag_by_content(&self, _content: &str) -> RepoResult<Option<Tag>> {
            let seen = self.lookups.get();
            self.lookups.set(seen + 1);
            Ok((seen > 0).then(|| self.winner.clone()))
        }

        fn find_tags(&self, _query: &FindAll<TagColumn>) -> RepoResult<Vec<Tag>> {
            unreachable!()
        }

        fn update_tag(&self, _tag: &Tag) -> RepoResult<()> {
            unreachable!()
        }

        fn delete_tag(&self, _id: TagId) -> RepoResult<bool> {
            unreachable!()
        }

        fn count_tags(&self) -> RepoResult<u64> {
            unreachable!()
        }

        fn create_tweet_tag(&self, _link: &TweetTag) -> RepoResult<()> {
            unreachable!()
        }

        fn find_tweet_tags(&self, _query: &FindAll<TweetTagColumn>) -> RepoResult<Vec<TweetTag>> {
            unreachable!()
        }

        fn delete_tweet_tag(&self, _link: &TweetTag) -> RepoResult<bool> {
            unreachable!()
        }

        fn find_tag_contents_for_tweets(
            &self,
            _tweet_ids: &[TweetId],
        ) -> RepoResult<Vec<(TweetId, String)>> {
            unreachable!()
        }
    }

    #[test]
    fn resolve_tag_refetches_when_insert_loses_race() {
        let tags = RacingTags {
            lookups: Cell::new(0),
            winner: Tag {
                id: 7,
                content: "rust".to_string(),
            },
        };

        let tag = resolve_tag(&tags, "rust").unwrap();
        assert_eq!(tag.id, 7);
        assert_eq!(tags.lookups.get(), 2);
    }

    #[test]
    fn distinct_tokens_trims_and_keeps_first_occurrence_order() {
        let tokens = distinct_tokens(&[" y", "x", "y ", "x", "X"]).unwrap();
        assert_eq!(tokens, vec!["y", "x", "X"]);
    }

    #[test]
    fn distinct_tokens_rejects_blank_token() {
        let err = distinct_tokens(&["x", "  "]).unwrap_err();
        assert!(matches!(err, GraphError::InvalidTag(_)));
    }
}
