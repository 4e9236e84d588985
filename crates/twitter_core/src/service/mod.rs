//! Use-case services over the repository layer.
//!
//! # Responsibility
//! - Enforce graph policy (self-follow, duplicate edges, credentials).
//! - Scope composite mutations in one transaction each.
//! - Assemble ordered, tagged tweet sequences for read paths.
//!
//! # Invariants
//! - Callers pass the acting `User` explicitly; services keep no session state.
//! - A failed composite mutation leaves storage in its pre-call state.

pub mod feed_service;
pub mod graph_service;
pub mod session;
pub mod tweet_text;
