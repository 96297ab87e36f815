//! Land management verbs: create, list, addterm, addurl, delete.

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::path::Path;
use url::Url;

use crate::config::Config;
use crate::dictionary::{self, Lemmatizer};
use crate::domains::Heuristics;
use crate::models::now_timestamp;
use crate::pipeline;
use crate::store::Store;

pub async fn create(store: &Store, name: &str, description: &str, lang: &str) -> Result<()> {
    if store.get_land(name).await?.is_some() {
        bail!("Land \"{}\" already exists", name);
    }
    store.create_land(name, description, lang).await?;
    println!("Land \"{}\" created", name);
    Ok(())
}

/// Print each land with its dictionary and crawl progress.
pub async fn list(store: &Store, name: Option<&str>) -> Result<()> {
    let lands = match name {
        Some(name) => match store.get_land(name).await? {
            Some(land) => vec![land],
            None => bail!("Land \"{}\" not found", name),
        },
        None => store.list_lands().await?,
    };
    if lands.is_empty() {
        println!("No land created");
        return Ok(());
    }
    for land in lands {
        let terms = store.land_terms(land.id).await?;
        let (total, remaining) = store.count_expressions(land.id).await?;
        let created = chrono::DateTime::from_timestamp(land.created_at, 0)
            .map(|d| d.format("%B %d %Y %H:%M").to_string())
            .unwrap_or_default();
        println!("{} - ({})", land.name, created);
        println!("\t{}", land.description);
        println!("\t{} terms in land dictionary [{}]", terms.len(), terms.join(", "));
        println!(
            "\t{} expressions in land ({} remaining to crawl)",
            total, remaining
        );
    }
    Ok(())
}

/// Add comma-separated terms to a land's dictionary, then re-score every
/// expression that already has a readable body. The LLM gate is never
/// consulted on this bulk path.
pub async fn add_terms(store: &Store, land_name: &str, terms: &str) -> Result<u64> {
    let Some(land) = store.get_land(land_name).await? else {
        bail!("Land \"{}\" not found", land_name);
    };
    let lemmatizer = Lemmatizer::for_language(&land.lang);

    let mut added = 0u64;
    for term in split_arg(terms) {
        let lemma = lemmatizer.lemma(&term);
        let word = store.add_word_if_absent(&term, &lemma).await?;
        store.link_land_word(land.id, word.id).await?;
        println!("Term \"{}\" added to land {}", term, land.name);
        added += 1;
    }

    rescore_land(store, land.id, &land.lang).await?;
    Ok(added)
}

/// Recompute relevance for every expression with a readable body, using the
/// land's current dictionary.
async fn rescore_land(store: &Store, land_id: i64, lang: &str) -> Result<u64> {
    let lemmatizer = Lemmatizer::for_language(lang);
    let dictionary: HashSet<String> = store.land_lemmas(land_id).await?.into_iter().collect();
    let expressions = store.expressions_with_readable(land_id).await?;
    let count = expressions.len() as u64;
    if count > 0 {
        println!("Updating relevance for {} expressions", count);
    }
    for mut expression in expressions {
        expression.relevance = dictionary::relevance(
            expression.title.as_deref(),
            expression.readable.as_deref(),
            expression.lang.as_deref(),
            lang,
            &dictionary,
            &lemmatizer,
        );
        expression.approved_at = if expression.relevance > 0 {
            expression.approved_at.or_else(|| Some(now_timestamp()))
        } else {
            None
        };
        store.save_expression(&expression).await?;
    }
    Ok(count)
}

/// Seed URLs into a land at depth 0, from a comma list and/or a file with
/// one URL per line. Returns the number of new expressions.
pub async fn add_urls(
    config: &Config,
    store: &Store,
    land_name: &str,
    urls: Option<&str>,
    path: Option<&Path>,
) -> Result<u64> {
    let Some(land) = store.get_land(land_name).await? else {
        bail!("Land \"{}\" not found", land_name);
    };
    let heuristics = Heuristics::from_config(&config.heuristics)?;

    let mut candidates: Vec<String> = Vec::new();
    if let Some(urls) = urls {
        candidates.extend(split_arg(urls));
    }
    if let Some(path) = path {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read URL file: {}", path.display()))?;
        candidates.extend(content.lines().map(|l| l.trim().to_string()));
    }

    let mut added = 0u64;
    for candidate in candidates {
        let Some(url) = normalize_seed(&candidate) else {
            continue;
        };
        let Some(host) = heuristics.domain_key(&url) else {
            continue;
        };
        let existed = store.get_expression_by_url(&url).await?.is_some();
        let domain = store.get_or_create_domain(&host).await?;
        let expression = store
            .upsert_expression(land.id, domain.id, &url, 0)
            .await?;
        if !existed && expression.land_id == land.id {
            added += 1;
        }
    }
    Ok(added)
}

/// Delete a land (or, with `max_relevance`, only its low-scoring
/// expressions). The caller is responsible for operator confirmation.
pub async fn delete(store: &Store, name: &str, max_relevance: Option<f64>) -> Result<()> {
    let deleted = store.delete_land(name, max_relevance).await?;
    match max_relevance {
        Some(threshold) => println!(
            "{} expressions below relevance {} deleted from land {}",
            deleted, threshold, name
        ),
        None => println!("Land {} deleted", name),
    }
    Ok(())
}

/// Split a comma/space separated argument list (`"a, b c"` → `[a, b, c]`).
fn split_arg(arg: &str) -> Vec<String> {
    arg.split([',', ' '])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Validate and canonicalize a seed URL: absolute http/https with a host,
/// fragment stripped.
fn normalize_seed(candidate: &str) -> Option<String> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return None;
    }
    let url = Url::parse(trimmed).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.host_str().filter(|h| !h.is_empty())?;
    Some(pipeline::normalize_url(&url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;

    async fn test_store() -> Store {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate::create_schema(&pool).await.unwrap();
        Store::new(pool)
    }

    #[test]
    fn split_arg_filters_empties() {
        assert_eq!(split_arg("asthme, pollution  air"), vec!["asthme", "pollution", "air"]);
        assert_eq!(split_arg(""), Vec::<String>::new());
    }

    #[test]
    fn normalize_seed_rejects_non_http() {
        assert_eq!(normalize_seed("ftp://example.com/x"), None);
        assert_eq!(normalize_seed("not a url"), None);
        assert_eq!(
            normalize_seed("https://Example.com/page#frag").as_deref(),
            Some("https://example.com/page")
        );
    }

    #[tokio::test]
    async fn add_urls_counts_only_new_seeds() {
        let store = test_store().await;
        store.create_land("a", "", "fr").await.unwrap();
        let config = Config::default();

        let added = add_urls(
            &config,
            &store,
            "a",
            Some("https://example.com/one, https://example.com/two, not-a-url"),
            None,
        )
        .await
        .unwrap();
        assert_eq!(added, 2);

        // Re-adding the same URLs adds nothing.
        let again = add_urls(&config, &store, "a", Some("https://example.com/one"), None)
            .await
            .unwrap();
        assert_eq!(again, 0);
    }

    #[tokio::test]
    async fn add_terms_stores_lemmas_and_rescores() {
        let store = test_store().await;
        let land = store.create_land("b", "", "fr").await.unwrap();
        let domain = store.get_or_create_domain("example.com").await.unwrap();
        let mut expression = store
            .upsert_expression(land.id, domain.id, "https://example.com/p", 0)
            .await
            .unwrap();
        expression.title = Some("La pollution urbaine".to_string());
        expression.readable = Some("pollution partout".to_string());
        store.save_expression(&expression).await.unwrap();

        add_terms(&store, "b", "pollution, asthme").await.unwrap();

        let rescored = store.get_expression(expression.id).await.unwrap().unwrap();
        assert_eq!(rescored.relevance, 10 + 1);
        assert!(rescored.approved_at.is_some());

        let lemmas = store.land_lemmas(land.id).await.unwrap();
        assert_eq!(lemmas.len(), 2);
    }
}
