//! Storage access layer.
//!
//! A [`Store`] owns the SQLite pool for the duration of one verb run and is
//! the only component that mutates persisted state. Pipelines read rows,
//! transform them, and write them back by primary key; they never hold
//! cross-operation references.
//!
//! Concurrency contract: WAL mode permits concurrent readers; writers are
//! serialized by SQLite. Races on unique keys (two tasks discovering the
//! same URL) are resolved by insert-or-ignore followed by re-select, so a
//! conflict is always a success on re-read.

use anyhow::{anyhow, Result};
use sqlx::SqlitePool;

use crate::models::{now_timestamp, Domain, Expression, Land, Media, Word};

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ============ Lands ============

    pub async fn get_land(&self, name: &str) -> Result<Option<Land>> {
        let land = sqlx::query_as::<_, Land>("SELECT * FROM land WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(land)
    }

    pub async fn create_land(&self, name: &str, description: &str, lang: &str) -> Result<Land> {
        sqlx::query("INSERT INTO land (name, description, lang, created_at) VALUES (?, ?, ?, ?)")
            .bind(name)
            .bind(description)
            .bind(lang)
            .bind(now_timestamp())
            .execute(&self.pool)
            .await?;
        self.get_land(name)
            .await?
            .ok_or_else(|| anyhow!("Land '{}' vanished after insert", name))
    }

    pub async fn list_lands(&self) -> Result<Vec<Land>> {
        let lands = sqlx::query_as::<_, Land>("SELECT * FROM land ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(lands)
    }

    /// Delete a land and everything under it, or — when `max_relevance` is
    /// given — only its expressions scored strictly below that threshold.
    /// Links, media and tagged content go with their expressions via
    /// foreign-key cascade; Word and Domain rows survive.
    pub async fn delete_land(&self, name: &str, max_relevance: Option<f64>) -> Result<u64> {
        let land = self
            .get_land(name)
            .await?
            .ok_or_else(|| anyhow!("Land '{}' not found", name))?;

        match max_relevance {
            Some(threshold) => {
                let result =
                    sqlx::query("DELETE FROM expression WHERE land_id = ? AND relevance < ?")
                        .bind(land.id)
                        .bind(threshold)
                        .execute(&self.pool)
                        .await?;
                Ok(result.rows_affected())
            }
            None => {
                let result = sqlx::query("DELETE FROM land WHERE id = ?")
                    .bind(land.id)
                    .execute(&self.pool)
                    .await?;
                Ok(result.rows_affected())
            }
        }
    }

    // ============ Words & dictionary ============

    pub async fn add_word_if_absent(&self, term: &str, lemma: &str) -> Result<Word> {
        sqlx::query("INSERT OR IGNORE INTO word (term, lemma) VALUES (?, ?)")
            .bind(term)
            .bind(lemma)
            .execute(&self.pool)
            .await?;
        let word = sqlx::query_as::<_, Word>("SELECT * FROM word WHERE term = ?")
            .bind(term)
            .fetch_one(&self.pool)
            .await?;
        Ok(word)
    }

    pub async fn link_land_word(&self, land_id: i64, word_id: i64) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO land_dictionary (land_id, word_id) VALUES (?, ?)")
            .bind(land_id)
            .bind(word_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Distinct stemmed forms making up the land's scoring dictionary.
    pub async fn land_lemmas(&self, land_id: i64) -> Result<Vec<String>> {
        let lemmas: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT w.lemma FROM word w
            JOIN land_dictionary ld ON ld.word_id = w.id
            WHERE ld.land_id = ?
            ORDER BY w.lemma
            "#,
        )
        .bind(land_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lemmas)
    }

    pub async fn land_terms(&self, land_id: i64) -> Result<Vec<String>> {
        let terms: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT w.term FROM word w
            JOIN land_dictionary ld ON ld.word_id = w.id
            WHERE ld.land_id = ?
            ORDER BY w.term
            "#,
        )
        .bind(land_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(terms)
    }

    // ============ Domains ============

    pub async fn get_or_create_domain(&self, name: &str) -> Result<Domain> {
        sqlx::query("INSERT OR IGNORE INTO domain (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(now_timestamp())
            .execute(&self.pool)
            .await?;
        let domain = sqlx::query_as::<_, Domain>("SELECT * FROM domain WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(domain)
    }

    pub async fn save_domain(&self, domain: &Domain) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE domain SET name = ?, http_status = ?, title = ?, description = ?,
                keywords = ?, fetched_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&domain.name)
        .bind(&domain.http_status)
        .bind(&domain.title)
        .bind(&domain.description)
        .bind(&domain.keywords)
        .bind(domain.fetched_at)
        .bind(domain.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Domains needing a metadata fetch: never fetched, or matching a
    /// re-run HTTP status filter.
    pub async fn domains_to_fetch(
        &self,
        limit: Option<i64>,
        http_status: Option<&str>,
    ) -> Result<Vec<Domain>> {
        let limit = limit.unwrap_or(-1);
        let domains = match http_status {
            Some(status) => {
                sqlx::query_as::<_, Domain>(
                    "SELECT * FROM domain WHERE http_status = ? ORDER BY name LIMIT ?",
                )
                .bind(status)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Domain>(
                    "SELECT * FROM domain WHERE fetched_at IS NULL ORDER BY name LIMIT ?",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(domains)
    }

    // ============ Expressions ============

    pub async fn get_expression(&self, id: i64) -> Result<Option<Expression>> {
        let expression = sqlx::query_as::<_, Expression>("SELECT * FROM expression WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(expression)
    }

    pub async fn get_expression_by_url(&self, url: &str) -> Result<Option<Expression>> {
        let expression = sqlx::query_as::<_, Expression>("SELECT * FROM expression WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(expression)
    }

    /// Insert the URL at `depth` or return the existing row. An existing
    /// expression never has its depth raised; a discovery at lower depth
    /// lowers it. Insert races resolve by re-select.
    pub async fn upsert_expression(
        &self,
        land_id: i64,
        domain_id: i64,
        url: &str,
        depth: i64,
    ) -> Result<Expression> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO expression (land_id, domain_id, url, depth, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(land_id)
        .bind(domain_id)
        .bind(url)
        .bind(depth)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;

        let existing = sqlx::query_as::<_, Expression>("SELECT * FROM expression WHERE url = ?")
            .bind(url)
            .fetch_one(&self.pool)
            .await?;

        if depth < existing.depth {
            sqlx::query("UPDATE expression SET depth = ? WHERE id = ? AND depth > ?")
                .bind(depth)
                .bind(existing.id)
                .bind(depth)
                .execute(&self.pool)
                .await?;
            return Ok(Expression { depth, ..existing });
        }
        Ok(existing)
    }

    /// Write back every mutable scalar field of an expression in one
    /// statement; the row update is the commit point for a crawled page.
    pub async fn save_expression(&self, e: &Expression) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE expression SET
                domain_id = ?, depth = ?, http_status = ?, lang = ?, title = ?,
                description = ?, keywords = ?, author = ?, readable = ?, relevance = ?,
                published_at = ?, fetched_at = ?, approved_at = ?, readable_at = ?
            WHERE id = ?
            "#,
        )
        .bind(e.domain_id)
        .bind(e.depth)
        .bind(&e.http_status)
        .bind(&e.lang)
        .bind(&e.title)
        .bind(&e.description)
        .bind(&e.keywords)
        .bind(&e.author)
        .bind(&e.readable)
        .bind(e.relevance)
        .bind(e.published_at)
        .bind(e.fetched_at)
        .bind(e.approved_at)
        .bind(e.readable_at)
        .bind(e.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Expressions selected by `land crawl`: unfetched rows, or rows whose
    /// recorded status matches the `--http` re-run filter. Ordered shallow
    /// first so the frontier grows breadth-first.
    pub async fn expressions_to_crawl(
        &self,
        land_id: i64,
        limit: Option<i64>,
        http_status: Option<&str>,
        max_depth: Option<i64>,
    ) -> Result<Vec<Expression>> {
        let limit = limit.unwrap_or(-1);
        let max_depth = max_depth.unwrap_or(i64::MAX);
        let expressions = match http_status {
            Some(status) => {
                sqlx::query_as::<_, Expression>(
                    r#"
                    SELECT * FROM expression
                    WHERE land_id = ? AND http_status = ? AND depth <= ?
                    ORDER BY depth, id LIMIT ?
                    "#,
                )
                .bind(land_id)
                .bind(status)
                .bind(max_depth)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Expression>(
                    r#"
                    SELECT * FROM expression
                    WHERE land_id = ? AND fetched_at IS NULL AND depth <= ?
                    ORDER BY depth, id LIMIT ?
                    "#,
                )
                .bind(land_id)
                .bind(max_depth)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(expressions)
    }

    /// Expressions eligible for the readable refiner: fetched but not yet
    /// refined.
    pub async fn expressions_for_readable(
        &self,
        land_id: i64,
        limit: Option<i64>,
        depth: Option<i64>,
    ) -> Result<Vec<Expression>> {
        let limit = limit.unwrap_or(-1);
        let max_depth = depth.unwrap_or(i64::MAX);
        let expressions = sqlx::query_as::<_, Expression>(
            r#"
            SELECT * FROM expression
            WHERE land_id = ? AND fetched_at IS NOT NULL AND readable_at IS NULL
                AND depth <= ?
            ORDER BY depth, id LIMIT ?
            "#,
        )
        .bind(land_id)
        .bind(max_depth)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(expressions)
    }

    /// Fetched expressions for the consolidator, depth-bounded.
    pub async fn expressions_for_consolidation(
        &self,
        land_id: i64,
        limit: Option<i64>,
        depth: Option<i64>,
    ) -> Result<Vec<Expression>> {
        let limit = limit.unwrap_or(-1);
        let max_depth = depth.unwrap_or(i64::MAX);
        let expressions = sqlx::query_as::<_, Expression>(
            r#"
            SELECT * FROM expression
            WHERE land_id = ? AND fetched_at IS NOT NULL AND depth <= ?
            ORDER BY depth, id LIMIT ?
            "#,
        )
        .bind(land_id)
        .bind(max_depth)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(expressions)
    }

    /// Expressions carrying a readable body, for the bulk re-score that
    /// follows `land addterm`.
    pub async fn expressions_with_readable(&self, land_id: i64) -> Result<Vec<Expression>> {
        let expressions = sqlx::query_as::<_, Expression>(
            "SELECT * FROM expression WHERE land_id = ? AND readable IS NOT NULL",
        )
        .bind(land_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(expressions)
    }

    pub async fn all_expressions(&self) -> Result<Vec<Expression>> {
        let expressions = sqlx::query_as::<_, Expression>("SELECT * FROM expression ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(expressions)
    }

    pub async fn set_expression_domain(&self, expression_id: i64, domain_id: i64) -> Result<()> {
        sqlx::query("UPDATE expression SET domain_id = ? WHERE id = ?")
            .bind(domain_id)
            .bind(expression_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count_expressions(&self, land_id: i64) -> Result<(i64, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM expression WHERE land_id = ?")
            .bind(land_id)
            .fetch_one(&self.pool)
            .await?;
        let remaining: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM expression WHERE land_id = ? AND fetched_at IS NULL",
        )
        .bind(land_id)
        .fetch_one(&self.pool)
        .await?;
        Ok((total, remaining))
    }

    // ============ Links ============

    /// Record a directed edge; duplicates are silently absorbed.
    pub async fn add_link(&self, source_id: i64, target_id: i64) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO expression_link (source_id, target_id) VALUES (?, ?)")
            .bind(source_id)
            .bind(target_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Replace all outbound edges of `source_id` with `target_ids` in one
    /// transaction. Used by the refiner only when the extractor supplied a
    /// non-empty link set.
    pub async fn replace_expression_links(
        &self,
        source_id: i64,
        target_ids: &[i64],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM expression_link WHERE source_id = ?")
            .bind(source_id)
            .execute(&mut *tx)
            .await?;
        for &target_id in target_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO expression_link (source_id, target_id) VALUES (?, ?)",
            )
            .bind(source_id)
            .bind(target_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn outbound_link_targets(&self, source_id: i64) -> Result<Vec<i64>> {
        let targets: Vec<i64> =
            sqlx::query_scalar("SELECT target_id FROM expression_link WHERE source_id = ?")
                .bind(source_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(targets)
    }

    // ============ Media ============

    /// Record a media reference keyed on `(expression, url, kind)`;
    /// idempotent. Returns the row id.
    pub async fn upsert_media(&self, expression_id: i64, url: &str, kind: &str) -> Result<i64> {
        sqlx::query("INSERT OR IGNORE INTO media (expression_id, url, kind) VALUES (?, ?, ?)")
            .bind(expression_id)
            .bind(url)
            .bind(kind)
            .execute(&self.pool)
            .await?;
        let id: i64 = sqlx::query_scalar(
            "SELECT id FROM media WHERE expression_id = ? AND url = ? AND kind = ?",
        )
        .bind(expression_id)
        .bind(url)
        .bind(kind)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Write back analysis fields for one media row.
    pub async fn save_media(&self, m: &Media) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE media SET
                width = ?, height = ?, file_size = ?, format = ?, color_mode = ?,
                dominant_colors = ?, has_transparency = ?, aspect_ratio = ?, exif_data = ?,
                image_hash = ?, websafe_colors = ?, content_tags = ?, nsfw_score = ?,
                analyzed_at = ?, analysis_error = ?
            WHERE id = ?
            "#,
        )
        .bind(m.width)
        .bind(m.height)
        .bind(m.file_size)
        .bind(&m.format)
        .bind(&m.color_mode)
        .bind(&m.dominant_colors)
        .bind(m.has_transparency)
        .bind(m.aspect_ratio)
        .bind(&m.exif_data)
        .bind(&m.image_hash)
        .bind(&m.websafe_colors)
        .bind(&m.content_tags)
        .bind(m.nsfw_score)
        .bind(m.analyzed_at)
        .bind(&m.analysis_error)
        .bind(m.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_media_by_id(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM media WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Image media whose owning expression satisfies the optional
    /// `(depth ≤ D, relevance ≥ R)` filter. `include_analyzed` selects
    /// already-analyzed rows for the reanalysis mode.
    pub async fn media_for_analysis(
        &self,
        land_id: i64,
        max_depth: Option<i64>,
        min_relevance: Option<i64>,
        include_analyzed: bool,
    ) -> Result<Vec<Media>> {
        let max_depth = max_depth.unwrap_or(i64::MAX);
        let min_relevance = min_relevance.unwrap_or(i64::MIN);
        let analyzed_clause = if include_analyzed {
            ""
        } else {
            "AND m.analyzed_at IS NULL"
        };
        let sql = format!(
            r#"
            SELECT m.* FROM media m
            JOIN expression e ON e.id = m.expression_id
            WHERE e.land_id = ? AND m.kind = 'img'
                AND e.depth <= ? AND e.relevance >= ? {}
            ORDER BY m.id
            "#,
            analyzed_clause
        );
        let media = sqlx::query_as::<_, Media>(&sql)
            .bind(land_id)
            .bind(max_depth)
            .bind(min_relevance)
            .fetch_all(&self.pool)
            .await?;
        Ok(media)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;

    // One connection: every pooled connection to `:memory:` would otherwise
    // open its own empty database.
    async fn test_store() -> Store {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate::create_schema(&pool).await.unwrap();
        Store::new(pool)
    }

    async fn seed_expression(store: &Store, url: &str, depth: i64) -> Expression {
        let land = match store.get_land("test").await.unwrap() {
            Some(land) => land,
            None => store.create_land("test", "", "fr").await.unwrap(),
        };
        let domain = store.get_or_create_domain("example.com").await.unwrap();
        store
            .upsert_expression(land.id, domain.id, url, depth)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn upsert_expression_never_raises_depth() {
        let store = test_store().await;
        let first = seed_expression(&store, "https://example.com/a", 1).await;
        assert_eq!(first.depth, 1);

        // Re-discovery at a greater depth keeps the original.
        let again = seed_expression(&store, "https://example.com/a", 3).await;
        assert_eq!(again.id, first.id);
        assert_eq!(again.depth, 1);

        // Re-discovery at a lower depth lowers it.
        let lowered = seed_expression(&store, "https://example.com/a", 0).await;
        assert_eq!(lowered.depth, 0);
        let reread = store.get_expression(first.id).await.unwrap().unwrap();
        assert_eq!(reread.depth, 0);
    }

    #[tokio::test]
    async fn add_link_is_idempotent() {
        let store = test_store().await;
        let a = seed_expression(&store, "https://example.com/a", 0).await;
        let b = seed_expression(&store, "https://example.com/b", 1).await;

        store.add_link(a.id, b.id).await.unwrap();
        store.add_link(a.id, b.id).await.unwrap();

        let targets = store.outbound_link_targets(a.id).await.unwrap();
        assert_eq!(targets, vec![b.id]);
    }

    #[tokio::test]
    async fn upsert_media_is_idempotent() {
        let store = test_store().await;
        let e = seed_expression(&store, "https://example.com/a", 0).await;

        let first = store
            .upsert_media(e.id, "https://example.com/pic.jpg", "img")
            .await
            .unwrap();
        let second = store
            .upsert_media(e.id, "https://example.com/pic.jpg", "img")
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn delete_land_cascades_but_spares_words_and_domains() {
        let store = test_store().await;
        let a = seed_expression(&store, "https://example.com/a", 0).await;
        let b = seed_expression(&store, "https://example.com/b", 1).await;
        store.add_link(a.id, b.id).await.unwrap();
        store
            .upsert_media(a.id, "https://example.com/pic.jpg", "img")
            .await
            .unwrap();
        let land = store.get_land("test").await.unwrap().unwrap();
        let word = store.add_word_if_absent("pollution", "pollut").await.unwrap();
        store.link_land_word(land.id, word.id).await.unwrap();

        store.delete_land("test", None).await.unwrap();

        assert!(store.get_land("test").await.unwrap().is_none());
        assert!(store.get_expression(a.id).await.unwrap().is_none());
        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM expression_link")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(links, 0);
        let media: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM media")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(media, 0);
        // Vocabulary and domains survive the cascade.
        let words: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM word")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(words, 1);
        let domains: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM domain")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(domains, 1);
    }

    #[tokio::test]
    async fn delete_land_with_threshold_keeps_relevant_expressions() {
        let store = test_store().await;
        let mut a = seed_expression(&store, "https://example.com/a", 0).await;
        a.relevance = 5;
        store.save_expression(&a).await.unwrap();
        seed_expression(&store, "https://example.com/b", 1).await;

        let deleted = store.delete_land("test", Some(1.0)).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(store.get_expression(a.id).await.unwrap().is_some());
        assert!(store.get_land("test").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn dictionary_lemmas_are_distinct() {
        let store = test_store().await;
        let land = store.create_land("dict", "", "fr").await.unwrap();
        for (term, lemma) in [("pollution", "pollut"), ("pollutions", "pollut"), ("asthme", "asthm")] {
            let word = store.add_word_if_absent(term, lemma).await.unwrap();
            store.link_land_word(land.id, word.id).await.unwrap();
        }
        let lemmas = store.land_lemmas(land.id).await.unwrap();
        assert_eq!(lemmas, vec!["asthm".to_string(), "pollut".to_string()]);
    }

    #[tokio::test]
    async fn crawl_selection_honors_filters() {
        let store = test_store().await;
        let mut a = seed_expression(&store, "https://example.com/a", 0).await;
        let b = seed_expression(&store, "https://example.com/b", 2).await;
        a.http_status = Some("404".to_string());
        a.fetched_at = Some(now_timestamp());
        store.save_expression(&a).await.unwrap();
        let land = store.get_land("test").await.unwrap().unwrap();

        // Default: unfetched only.
        let unfetched = store
            .expressions_to_crawl(land.id, None, None, None)
            .await
            .unwrap();
        assert_eq!(unfetched.len(), 1);
        assert_eq!(unfetched[0].id, b.id);

        // HTTP re-run filter selects the failed row.
        let retry = store
            .expressions_to_crawl(land.id, None, Some("404"), None)
            .await
            .unwrap();
        assert_eq!(retry.len(), 1);
        assert_eq!(retry[0].id, a.id);

        // Depth bound excludes the deep row.
        let shallow = store
            .expressions_to_crawl(land.id, None, None, Some(1))
            .await
            .unwrap();
        assert!(shallow.is_empty());
    }
}
