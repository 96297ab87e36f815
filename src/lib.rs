//! # MWI
//!
//! **A web-intelligence workbench for building topical web corpora.**
//!
//! Research projects are grouped into *lands*: a name, a language, a
//! weighted term dictionary and seed URLs. The engine recursively fetches
//! pages, extracts their readable body, scores topical relevance against
//! the stemmed dictionary, maintains the outlink graph, classifies embedded
//! media, and keeps everything durable in SQLite.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌──────────┐
//! │ Fetcher  │──▶│   Pipeline     │──▶│  SQLite   │
//! │ +archive │   │ clean · score │   │  (WAL)    │
//! └──────────┘   │ links · media │   └────┬─────┘
//!                └───────┬───────┘        │
//!                        │ optional       │
//!                ┌───────▼───────┐   ┌────▼─────┐
//!                │ LLM gate      │   │   CLI    │
//!                │ Readable ref. │   │  (mwi)   │
//!                └───────────────┘   └──────────┘
//! ```
//!
//! ## Data Flow
//!
//! 1. `land addurl` seeds [`models::Expression`]s at depth 0.
//! 2. `land crawl` fetches uncrawled expressions in bounded batches
//!    ([`fetch`]), routes each response through the content pipeline
//!    ([`pipeline`]): metadata, denylist cleaning, readable text, relevance
//!    ([`dictionary`]), then link and media discovery for relevant pages.
//! 3. `land readable` drives an external extractor over fetched pages and
//!    folds its output back under a merge strategy ([`readable`]).
//! 4. `land medianalyse` measures discovered images ([`media`]).
//! 5. `land consolidate` rebuilds derived state from stored pages without
//!    refetching ([`consolidate`]).
//! 6. `domain crawl` and `heuristic update` maintain per-host metadata and
//!    canonical domain keys ([`domains`]).
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration with `MWI_*` env overrides |
//! | [`models`] | Row types: `Land`, `Word`, `Domain`, `Expression`, `Media`, … |
//! | [`store`] | All persistence operations over the SQLite pool |
//! | [`dictionary`] | Tokenization, stemming, weighted relevance scoring |
//! | [`fetch`] | Bounded-concurrency HTTP with Wayback fallback |
//! | [`pipeline`] | HTML cleaning, extraction, link/media discovery, writeback |
//! | [`crawl`] | The `land crawl` orchestration |
//! | [`readable`] | External extractor + merge strategies |
//! | [`gate`] | Optional LLM yes/no admission filter with budget |
//! | [`media`] | Image download and measurement |
//! | [`consolidate`] | Derived-state rebuild |
//! | [`domains`] | Domain enrichment and host heuristics |
//! | [`land`] | Land management verbs |
//! | [`db`] / [`migrate`] | Pool setup and schema creation |

pub mod config;
pub mod consolidate;
pub mod crawl;
pub mod db;
pub mod dictionary;
pub mod domains;
pub mod fetch;
pub mod gate;
pub mod land;
pub mod media;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod readable;
pub mod store;
