//! # Local Wisdom
//!
//! A crowdsourced collection of proverbs and life lessons in many languages,
//! with semantic near-duplicate detection at submission time.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌──────────────┐   ┌────────────┐
//! │ CLI/HTTP │──▶│  Collector  │──▶│ dedup::check │──▶│  Embedder  │
//! └──────────┘   └──────┬──────┘   └──────────────┘   │ local/http │
//!                       │                             └────────────┘
//!                       ▼
//!                ┌─────────────┐
//!                │ CorpusStore │  json │ sqlite │ memory
//!                └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! wisdom init
//! wisdom submit proverb "Hard work pays off." --language English
//! wisdom browse
//! wisdom serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Categories, items, language options |
//! | [`embedding`] | Sentence-embedding backends and the load-once handle |
//! | [`dedup`] | Near-duplicate detection |
//! | [`store`] | Corpus persistence backends |
//! | [`submit`] | Submission flow |
//! | [`browse`] | Listing and rendering stored items |
//! | [`export`] | CSV / JSON export |
//! | [`server`] | HTTP JSON API |
//! | [`db`] | SQLite connection |
//! | [`migrate`] | SQLite schema |

pub mod browse;
pub mod config;
pub mod db;
pub mod dedup;
pub mod embedding;
pub mod error;
pub mod export;
pub mod migrate;
pub mod models;
pub mod server;
pub mod store;
pub mod submit;
