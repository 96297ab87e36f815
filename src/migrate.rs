//! Database schema creation.
//!
//! Creates all tables and indexes; designed to be run via `mwi db setup`.
//!
//! # Schema
//!
//! ```text
//! ┌──────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │  land    │─┐  │   expression    │─┐  │     media       │
//! │          │ │  │                 │ │  │                 │
//! │ id (PK)  │ └──│ land_id         │ └──│ expression_id   │
//! │ name  U  │    │ domain_id ──────┼──┐ │ url, kind       │
//! │ lang     │    │ url  (UNIQUE)   │  │ │ width, height…  │
//! └────┬─────┘    │ depth, relevance│  │ │ image_hash      │
//!      │          │ *_at lifecycle  │  │ │ analyzed_at     │
//!      │          └────────┬────────┘  │ └─────────────────┘
//!      │                   │           │
//! ┌────┴────────────┐ ┌────┴─────────┐ │ ┌──────────┐
//! │ land_dictionary │ │expression_link│ └─│  domain  │
//! │ (land_id,       │ │ (source_id,  │   │ id (PK)  │
//! │  word_id) PK    │ │  target_id)PK│   │ name  U  │
//! └─────────────────┘ └──────────────┘   └──────────┘
//! ```
//!
//! `word` is global vocabulary; `tag`/`tagged_content` are authored by
//! external tooling and only participate in the delete cascade.
//!
//! # Destructive setup
//!
//! Unlike incremental migrations, `db setup` recreates the model from
//! scratch: existing tables are dropped first. The caller is responsible
//! for confirming with the operator.

use anyhow::Result;
use sqlx::SqlitePool;

const TABLES: &[&str] = &[
    "tagged_content",
    "tag",
    "media",
    "expression_link",
    "expression",
    "land_dictionary",
    "word",
    "domain",
    "land",
];

/// Drop and recreate the full schema.
pub async fn setup(pool: &SqlitePool) -> Result<()> {
    for table in TABLES {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }
    create_schema(pool).await
}

/// Create all tables and indexes if they do not exist yet.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS land (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            lang TEXT NOT NULL DEFAULT 'fr',
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS word (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            term TEXT NOT NULL UNIQUE,
            lemma TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS land_dictionary (
            land_id INTEGER NOT NULL,
            word_id INTEGER NOT NULL,
            PRIMARY KEY (land_id, word_id),
            FOREIGN KEY (land_id) REFERENCES land(id) ON DELETE CASCADE,
            FOREIGN KEY (word_id) REFERENCES word(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS domain (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            http_status TEXT,
            title TEXT,
            description TEXT,
            keywords TEXT,
            created_at INTEGER NOT NULL,
            fetched_at INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS expression (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            land_id INTEGER NOT NULL,
            domain_id INTEGER NOT NULL,
            url TEXT NOT NULL UNIQUE,
            depth INTEGER NOT NULL DEFAULT 0,
            http_status TEXT,
            lang TEXT,
            title TEXT,
            description TEXT,
            keywords TEXT,
            author TEXT,
            readable TEXT,
            relevance INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            published_at INTEGER,
            fetched_at INTEGER,
            approved_at INTEGER,
            readable_at INTEGER,
            FOREIGN KEY (land_id) REFERENCES land(id) ON DELETE CASCADE,
            FOREIGN KEY (domain_id) REFERENCES domain(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS expression_link (
            source_id INTEGER NOT NULL,
            target_id INTEGER NOT NULL,
            PRIMARY KEY (source_id, target_id),
            FOREIGN KEY (source_id) REFERENCES expression(id) ON DELETE CASCADE,
            FOREIGN KEY (target_id) REFERENCES expression(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS media (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            expression_id INTEGER NOT NULL,
            url TEXT NOT NULL,
            kind TEXT NOT NULL,
            width INTEGER,
            height INTEGER,
            file_size INTEGER,
            format TEXT,
            color_mode TEXT,
            dominant_colors TEXT,
            has_transparency BOOLEAN,
            aspect_ratio REAL,
            exif_data TEXT,
            image_hash TEXT,
            websafe_colors TEXT,
            content_tags TEXT,
            nsfw_score REAL,
            analyzed_at INTEGER,
            analysis_error TEXT,
            UNIQUE (expression_id, url, kind),
            FOREIGN KEY (expression_id) REFERENCES expression(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tag (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            land_id INTEGER NOT NULL,
            parent_id INTEGER,
            name TEXT NOT NULL,
            sorting INTEGER NOT NULL DEFAULT 0,
            color TEXT NOT NULL DEFAULT '#000000',
            FOREIGN KEY (land_id) REFERENCES land(id) ON DELETE CASCADE,
            FOREIGN KEY (parent_id) REFERENCES tag(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tagged_content (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tag_id INTEGER NOT NULL,
            expression_id INTEGER NOT NULL,
            text TEXT NOT NULL,
            from_char INTEGER NOT NULL,
            to_char INTEGER NOT NULL,
            FOREIGN KEY (tag_id) REFERENCES tag(id) ON DELETE CASCADE,
            FOREIGN KEY (expression_id) REFERENCES expression(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Indexes for the verb query patterns
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_word_lemma ON word(lemma)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_expression_land ON expression(land_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_expression_fetched ON expression(fetched_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_expression_http ON expression(http_status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_expression_readable ON expression(readable_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_media_expression ON media(expression_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_media_analyzed ON media(analyzed_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_media_hash ON media(image_hash)")
        .execute(pool)
        .await?;

    Ok(())
}
