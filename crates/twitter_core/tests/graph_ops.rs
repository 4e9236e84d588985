use rusqlite::Connection;
use std::collections::BTreeSet;
use twitter_core::db::open_db_in_memory;
use twitter_core::{GraphError, GraphService, User};

const NO_TAGS: &[&str] = &[];

fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn set_of(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[test]
fn register_then_authenticate() {
    let mut conn = open_db_in_memory().unwrap();
    let mut graph = GraphService::try_new(&mut conn).unwrap();

    let alice = graph.register("alice", "pw1").unwrap();
    assert_eq!(alice, User::new("alice", "pw1"));

    assert_eq!(graph.authenticate("alice", "pw1").unwrap(), alice);
    assert!(matches!(
        graph.authenticate("alice", "wrong"),
        Err(GraphError::InvalidCredentials)
    ));
    assert!(matches!(
        graph.authenticate("nobody", "pw1"),
        Err(GraphError::InvalidCredentials)
    ));
}

#[test]
fn register_rejects_duplicates_blank_names_and_mismatched_confirmation() {
    let mut conn = open_db_in_memory().unwrap();
    let mut graph = GraphService::try_new(&mut conn).unwrap();

    graph.register("alice", "pw1").unwrap();
    match graph.register(" alice ", "pw2") {
        Err(GraphError::DuplicateUsername(name)) => assert_eq!(name, "alice"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(matches!(
        graph.register("   ", "pw"),
        Err(GraphError::InvalidUsername)
    ));
    assert!(matches!(
        graph.register_confirmed("bob", "pw1", "pw2"),
        Err(GraphError::PasswordMismatch)
    ));

    let bob = graph.register_confirmed("bob", "pw1", "pw1").unwrap();
    assert_eq!(bob.username, "bob");

    // The first password survives the rejected duplicate.
    graph.authenticate("alice", "pw1").unwrap();
    drop(graph);
    assert_eq!(count_rows(&conn, "users"), 2);
}

#[test]
fn follow_then_unfollow_restores_following_set() {
    let mut conn = open_db_in_memory().unwrap();
    let mut graph = GraphService::try_new(&mut conn).unwrap();

    let alice = graph.register("alice", "pw").unwrap();
    let bob = graph.register("bob", "pw").unwrap();
    graph.register("carol", "pw").unwrap();

    graph.follow(&alice, "carol").unwrap();
    let before = graph.following_set(&alice).unwrap();

    let edge = graph.follow(&alice, "bob").unwrap();
    assert_eq!(edge.follower, "alice");
    assert_eq!(edge.followee, "bob");
    assert_eq!(graph.following_set(&alice).unwrap(), set_of(&["bob", "carol"]));
    assert_eq!(graph.followers_set(&bob).unwrap(), set_of(&["alice"]));

    graph.unfollow(&alice, "bob").unwrap();
    assert_eq!(graph.following_set(&alice).unwrap(), before);
    assert!(graph.followers_set(&bob).unwrap().is_empty());
}

#[test]
fn follow_checks_unknown_then_self_then_duplicate() {
    let mut conn = open_db_in_memory().unwrap();
    let mut graph = GraphService::try_new(&mut conn).unwrap();

    let alice = graph.register("alice", "pw").unwrap();
    graph.register("bob", "pw").unwrap();

    match graph.follow(&alice, "zed") {
        Err(GraphError::UnknownUser(name)) => assert_eq!(name, "zed"),
        other => panic!("unexpected result: {other:?}"),
    }
    match graph.follow(&alice, "alice") {
        Err(GraphError::SelfFollow(name)) => assert_eq!(name, "alice"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(graph.following_set(&alice).unwrap().is_empty());

    graph.follow(&alice, "bob").unwrap();
    match graph.follow(&alice, "bob") {
        Err(GraphError::AlreadyFollowing(name)) => assert_eq!(name, "bob"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(graph.following_set(&alice).unwrap(), set_of(&["bob"]));
}

#[test]
fn unfollow_without_edge_is_rejected() {
    let mut conn = open_db_in_memory().unwrap();
    let mut graph = GraphService::try_new(&mut conn).unwrap();

    let alice = graph.register("alice", "pw").unwrap();
    graph.register("bob", "pw").unwrap();

    match graph.unfollow(&alice, "bob") {
        Err(GraphError::NotFollowing(name)) => assert_eq!(name, "bob"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(matches!(
        graph.unfollow(&alice, "zed"),
        Err(GraphError::NotFollowing(_))
    ));
}

#[test]
fn attach_or_create_tag_is_idempotent() {
    let mut conn = open_db_in_memory().unwrap();
    let mut graph = GraphService::try_new(&mut conn).unwrap();

    let first = graph.attach_or_create_tag("rust").unwrap();
    let second = graph.attach_or_create_tag(" rust ").unwrap();
    assert_eq!(first, second);

    let other_case = graph.attach_or_create_tag("Rust").unwrap();
    assert_ne!(other_case.id, first.id);

    assert!(matches!(
        graph.attach_or_create_tag("  "),
        Err(GraphError::InvalidTag(_))
    ));
    drop(graph);
    assert_eq!(count_rows(&conn, "tags"), 2);
}

#[test]
fn post_tweet_links_each_distinct_tag_once() {
    let mut conn = open_db_in_memory().unwrap();
    let mut graph = GraphService::try_new(&mut conn).unwrap();

    let alice = graph.register("alice", "pw").unwrap();
    let record = graph
        .post_tweet_at(&alice, "hello", &["x", "y", "x"], 100)
        .unwrap();

    assert_eq!(record.tweet.content, "hello");
    assert_eq!(record.tweet.author, "alice");
    assert_eq!(record.tweet.timestamp, 100);
    assert_eq!(record.tags, vec!["x", "y"]);

    let again = graph.post_tweet_at(&alice, "again", &["y"], 200).unwrap();
    assert!(again.tweet.id > record.tweet.id);

    drop(graph);
    assert_eq!(count_rows(&conn, "tweets"), 2);
    assert_eq!(count_rows(&conn, "tags"), 2);
    assert_eq!(count_rows(&conn, "tweet_tags"), 3);
}

#[test]
fn post_tweet_without_tags_stores_no_links() {
    let mut conn = open_db_in_memory().unwrap();
    let mut graph = GraphService::try_new(&mut conn).unwrap();

    let alice = graph.register("alice", "pw").unwrap();
    let record = graph.post_tweet(&alice, "quiet", NO_TAGS).unwrap();
    assert!(record.tags.is_empty());
    assert!(record.tweet.timestamp > 0);

    drop(graph);
    assert_eq!(count_rows(&conn, "tweet_tags"), 0);
}

#[test]
fn post_tweet_rejects_blank_content_and_blank_tags() {
    let mut conn = open_db_in_memory().unwrap();
    let mut graph = GraphService::try_new(&mut conn).unwrap();

    let alice = graph.register("alice", "pw").unwrap();
    assert!(matches!(
        graph.post_tweet(&alice, "   ", NO_TAGS),
        Err(GraphError::EmptyTweet)
    ));
    assert!(matches!(
        graph.post_tweet(&alice, "hello", &["ok", " "]),
        Err(GraphError::InvalidTag(_))
    ));

    drop(graph);
    assert_eq!(count_rows(&conn, "tweets"), 0);
    assert_eq!(count_rows(&conn, "tags"), 0);
}

#[test]
fn post_tweet_for_unregistered_author_is_unknown_user() {
    let mut conn = open_db_in_memory().unwrap();
    let mut graph = GraphService::try_new(&mut conn).unwrap();

    let ghost = User::new("ghost", "pw");
    match graph.post_tweet(&ghost, "boo", &["x"]) {
        Err(GraphError::UnknownUser(name)) => assert_eq!(name, "ghost"),
        other => panic!("unexpected result: {other:?}"),
    }

    drop(graph);
    assert_eq!(count_rows(&conn, "tweets"), 0);
    assert_eq!(count_rows(&conn, "tags"), 0);
}

#[test]
fn post_tweet_with_blank_author_is_unknown_user() {
    let mut conn = open_db_in_memory().unwrap();
    let mut graph = GraphService::try_new(&mut conn).unwrap();

    let nameless = User::new("  ", "pw");
    match graph.post_tweet(&nameless, "boo", NO_TAGS) {
        Err(GraphError::UnknownUser(name)) => assert_eq!(name, "  "),
        other => panic!("unexpected result: {other:?}"),
    }

    drop(graph);
    assert_eq!(count_rows(&conn, "tweets"), 0);
}

#[test]
fn failed_link_rolls_back_tweet_and_new_tags() {
    let mut conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TRIGGER reject_forbidden_link
         BEFORE INSERT ON tweet_tags
         WHEN (SELECT content FROM tags WHERE id = NEW.tag_id) = 'forbidden'
         BEGIN
             SELECT RAISE(ABORT, 'forbidden tag');
         END;",
    )
    .unwrap();

    let mut graph = GraphService::try_new(&mut conn).unwrap();
    let alice = graph.register("alice", "pw").unwrap();

    let err = graph
        .post_tweet_at(&alice, "hello", &["fine", "forbidden"], 1)
        .unwrap_err();
    assert!(matches!(err, GraphError::Repo(_)));

    drop(graph);
    assert_eq!(count_rows(&conn, "users"), 1);
    assert_eq!(count_rows(&conn, "tweets"), 0);
    assert_eq!(count_rows(&conn, "tags"), 0);
    assert_eq!(count_rows(&conn, "tweet_tags"), 0);
}

#[test]
fn post_tweet_text_extracts_hashtags() {
    let mut conn = open_db_in_memory().unwrap();
    let mut graph = GraphService::try_new(&mut conn).unwrap();

    let alice = graph.register("alice", "pw").unwrap();
    let record = graph.post_tweet_text(&alice, "hello #y #x").unwrap();
    assert_eq!(record.tweet.content, "hello");
    assert_eq!(record.tags, vec!["x", "y"]);
}
