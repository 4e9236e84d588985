//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `twitter_core` linkage and environment configuration.
//! - Open the configured database and print deterministic probe lines.

use std::process::ExitCode;
use twitter_core::db::schema_version;
use twitter_core::{
    CoreConfig, SqliteTagRepository, SqliteTweetRepository, SqliteUserRepository, TagRepository,
    TweetRepository, UserRepository,
};

fn main() -> ExitCode {
    println!("twitter_core ping={}", twitter_core::ping());
    println!("twitter_core version={}", twitter_core::core_version());

    let config = CoreConfig::from_env();
    if let Err(err) = config.init_logging() {
        eprintln!("logging init failed: {err}");
        return ExitCode::FAILURE;
    }

    match probe(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_probe module=cli status=error error={err}");
            eprintln!("probe failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn probe(config: &CoreConfig) -> Result<(), Box<dyn std::error::Error>> {
    let conn = config.open_db()?;
    println!("db_path={}", config.db_path.display());
    println!("schema_version={}", schema_version(&conn)?);

    let users = SqliteUserRepository::try_new(&conn)?.count_users()?;
    let tweets = SqliteTweetRepository::try_new(&conn)?.count_tweets()?;
    let tags = SqliteTagRepository::try_new(&conn)?.count_tags()?;
    println!(
        "users={users} tweets={tweets} tags={tags} feed_window={}",
        config.feed_window
    );
    Ok(())
}
