//! # Ferrotype
//!
//! An incremental feed-to-disk picture mirror.
//!
//! ## Architecture
//!
//! Ferrotype follows a single pipeline, run once per trigger:
//!
//! ```text
//! Store (cutoff) → Walker → Mirror → Store + files on disk
//! ```
//!
//! - [`sync::walker`]: walks the paginated feed from the newest page
//!   toward older ones until the high-water mark is reached
//! - [`sync::mirror`]: downloads each new image atomically and persists
//!   the entry, one failure never aborting the batch
//! - [`sync::job`]: orchestrates a run and keeps runs from overlapping
//!
//! ## Quick Start
//!
//! ```bash
//! # Run one sync pass
//! ferrotype sync
//!
//! # List what has been mirrored
//! ferrotype list
//!
//! # Keep syncing every eight hours
//! ferrotype daemon start
//! ```

/// Application context and error handling.
///
/// [`AppContext`](app::AppContext) wires together store, feed source,
/// image source and the sync job.
pub mod app;

/// Configuration management.
///
/// Loads from `~/.config/ferrotype/config.toml`.
pub mod config;

/// Command-line interface using clap.
pub mod cli;

/// Background daemon for scheduled syncs.
///
/// - `ferrotype daemon start` - Start the background sync
/// - `ferrotype daemon stop` - Stop the daemon
/// - `ferrotype daemon status` - Check if daemon is running
pub mod daemon;

/// Core domain model: the mirrored [`Picture`](domain::Picture) and its
/// external-id extraction.
pub mod domain;

/// Feed page parsing.
///
/// Converts raw RSS documents into [`FeedPage`](feed::FeedPage) values
/// with their pagination links.
pub mod feed;

/// HTTP access to the feed and the image endpoint.
///
/// - [`FeedSource`](fetcher::FeedSource) / [`ImageSource`](fetcher::ImageSource):
///   async trait seams the sync core consumes
/// - [`HttpFeedSource`](fetcher::HttpFeedSource), [`HttpImageSource`](fetcher::HttpImageSource):
///   reqwest-based implementations
pub mod fetcher;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;

/// The synchronization core: pagination walker, asset mirror, sync job.
pub mod sync;
