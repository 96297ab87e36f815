//! Core row types stored in SQLite.
//!
//! The data lifecycle is:
//!
//! ```text
//! land addurl → Expression(depth 0) → crawl → fetch + extract
//!                                       ↓
//!                    relevance > 0 → links + media discovery
//!                                       ↓
//!                land readable → refined body, recomputed score
//!                land medianalyse → image measurements on Media
//! ```
//!
//! Timestamps are Unix epoch seconds (`i64`); `None` means "has not
//! happened yet" and the lifecycle columns (`fetched_at`, `approved_at`,
//! `readable_at`, `analyzed_at`) double as state markers for verb queries.

use sqlx::FromRow;

/// A research project: a named corpus with a language, a weighted term
/// dictionary and seed URLs. Root of the delete cascade.
#[derive(Debug, Clone, FromRow)]
pub struct Land {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Language code, default `fr`. Expressions whose detected language does
    /// not prefix-match this are scored 0.
    pub lang: String,
    pub created_at: i64,
}

/// Global vocabulary entry shared across lands.
#[derive(Debug, Clone, FromRow)]
pub struct Word {
    pub id: i64,
    /// Original surface form, unique.
    pub term: String,
    /// Stemmed form, indexed; the scoring unit.
    pub lemma: String,
}

/// A unique host with cached homepage metadata.
#[derive(Debug, Clone, FromRow)]
pub struct Domain {
    pub id: i64,
    pub name: String,
    pub http_status: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub created_at: i64,
    pub fetched_at: Option<i64>,
}

/// A single page URL within a Land.
#[derive(Debug, Clone, FromRow)]
pub struct Expression {
    pub id: i64,
    pub land_id: i64,
    pub domain_id: i64,
    /// Canonical URL: fragment stripped, scheme/host lowercased. Globally
    /// unique.
    pub url: String,
    /// Minimum link distance to a seed at first sight; later discoveries may
    /// only lower it.
    pub depth: i64,
    pub http_status: Option<String>,
    pub lang: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub author: Option<String>,
    /// Cleaned reading body, markdown-preferred once refined.
    pub readable: Option<String>,
    pub relevance: i64,
    pub created_at: i64,
    pub published_at: Option<i64>,
    pub fetched_at: Option<i64>,
    pub approved_at: Option<i64>,
    pub readable_at: Option<i64>,
}

/// Media kinds recognized by discovery.
pub const MEDIA_KIND_IMG: &str = "img";
pub const MEDIA_KIND_VIDEO: &str = "video";
pub const MEDIA_KIND_AUDIO: &str = "audio";

/// An image/video/audio reference discovered inside an Expression, plus
/// the measurements written by `land medianalyse`.
#[derive(Debug, Clone, FromRow)]
pub struct Media {
    pub id: i64,
    pub expression_id: i64,
    pub url: String,
    /// `img`, `video` or `audio`.
    pub kind: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub file_size: Option<i64>,
    pub format: Option<String>,
    pub color_mode: Option<String>,
    /// JSON array of `{rgb, hex, hsv, name, percentage}` tuples, ordered by
    /// coverage.
    pub dominant_colors: Option<String>,
    pub has_transparency: Option<bool>,
    pub aspect_ratio: Option<f64>,
    /// JSON object of EXIF fields; GPS reduced to decimal lat/long.
    pub exif_data: Option<String>,
    /// 8×8 average hash, 16 hex chars.
    pub image_hash: Option<String>,
    /// JSON object mapping web-safe hex colors to summed percentages.
    pub websafe_colors: Option<String>,
    /// JSON array of deterministic content hints (logo/screenshot/text).
    pub content_tags: Option<String>,
    pub nsfw_score: Option<f64>,
    pub analyzed_at: Option<i64>,
    pub analysis_error: Option<String>,
}

/// Hierarchical annotation node. Read-only to the engine: rows are authored
/// by external tooling and only participate in the delete cascade.
#[derive(Debug, Clone, FromRow)]
#[allow(dead_code)]
pub struct Tag {
    pub id: i64,
    pub land_id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub sorting: i64,
    /// Hex value string as `#FF0022`.
    pub color: String,
}

/// A text span tagged under a [`Tag`]. Read-only to the engine.
#[derive(Debug, Clone, FromRow)]
#[allow(dead_code)]
pub struct TaggedContent {
    pub id: i64,
    pub tag_id: i64,
    pub expression_id: i64,
    pub text: String,
    pub from_char: i64,
    pub to_char: i64,
}

pub fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
