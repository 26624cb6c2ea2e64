#![deny(missing_docs)]
//! # bindb
//! A sharded, disk-persistent key-value store with a RESP-compatible TCP
//! frontend. Keys and values are arbitrary byte strings.
//!
//! Data lives in `N` shard files, each an append-only log of records with
//! tombstone-based deletion. A key is routed to its shard by hash; each
//! shard pairs its file with a small LRU cache and a readers-writer lock, so
//! reads proceed concurrently while writes and compaction are serialized per
//! shard. A background thread periodically rewrites each shard file to
//! reclaim tombstoned records, and files damaged by a crash are truncated
//! back to their last whole record on open.
//!
//! The server speaks RESP-2 (arrays of bulk strings in, simple strings /
//! errors / integers / bulk strings out) and supports `SET`, `GET` and
//! `DEL`.

mod cache;
mod client;
mod config;
mod engine;
mod error;
mod record;
mod resp;
mod server;
pub mod thread_pool;

pub use client::Client;
pub use config::Options;
pub use engine::{KvEngine, Mode, Store};
pub use error::{Result, StoreError};
pub use resp::{Command, Reply, Session};
pub use server::Server;
