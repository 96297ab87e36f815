//! Domain enrichment and host-normalization heuristics.
//!
//! Every expression is keyed under a Domain. The key is normally the URL
//! host, but configured heuristics can widen it to a host+path family so
//! that, say, all of a social account's pages collapse onto one domain row
//! (`m.facebook.com/someuser` → `facebook.com/someuser`-style canonical
//! keys).
//!
//! `domain crawl` fills in per-host metadata through a cascade: the readable
//! extractor's fetch view (https then http), then the fetcher with its
//! archive fallback, reading `<title>` and description/keywords meta tags
//! and preferring whichever source produced a non-empty value.

use anyhow::{Context, Result};
use futures::future::join_all;
use regex::Regex;
use std::collections::BTreeMap;
use url::Url;

use crate::config::Config;
use crate::fetch::Fetcher;
use crate::models::{now_timestamp, Domain};
use crate::pipeline;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::readable;
use crate::store::Store;

/// Compiled, ordered host-normalization rules.
pub struct Heuristics {
    rules: Vec<(String, Regex)>,
}

impl Heuristics {
    pub fn from_config(map: &BTreeMap<String, String>) -> Result<Self> {
        let mut rules = Vec::with_capacity(map.len());
        for (suffix, pattern) in map {
            let regex = Regex::new(pattern)
                .with_context(|| format!("Invalid heuristic pattern for '{}'", suffix))?;
            rules.push((suffix.clone(), regex));
        }
        Ok(Self { rules })
    }

    /// Canonical domain key for a URL: the first matching heuristic capture,
    /// or the bare host. `None` when the URL has no host.
    pub fn domain_key(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_string();
        for (suffix, regex) in &self.rules {
            if host == *suffix || host.ends_with(&format!(".{}", suffix)) {
                if let Some(captures) = regex.captures(url) {
                    if let Some(capture) = captures.get(1) {
                        return Some(capture.as_str().trim_end_matches('/').to_string());
                    }
                }
            }
        }
        Some(host)
    }
}

/// `domain crawl`: enrich domains lacking metadata (or matching an HTTP
/// status re-run filter) in bounded batches.
pub async fn crawl_domains(
    config: &Config,
    store: &Store,
    limit: Option<i64>,
    http_status: Option<&str>,
    progress: &dyn ProgressReporter,
) -> Result<(u64, u64)> {
    let domains = store.domains_to_fetch(limit, http_status).await?;
    let fetcher = Fetcher::new(&config.crawl)?;

    let mut processed = 0u64;
    let mut errors = 0u64;
    let total_batches = domains.len().div_ceil(config.crawl.parallel_connections.max(1));

    for (index, batch) in domains.chunks(config.crawl.parallel_connections).enumerate() {
        progress.report(ProgressEvent::Batch {
            verb: "domain crawl".to_string(),
            n: index as u64 + 1,
            total: total_batches as u64,
            items: batch.len() as u64,
        });
        let futures = batch
            .iter()
            .map(|domain| enrich_domain(config, &fetcher, domain.clone()));
        for enriched in join_all(futures).await {
            match enriched {
                Ok(domain) => {
                    store.save_domain(&domain).await?;
                    if domain.title.is_some() || domain.description.is_some() {
                        processed += 1;
                    } else {
                        errors += 1;
                    }
                }
                Err(err) => {
                    eprintln!("domain crawl error: {}", err);
                    errors += 1;
                }
            }
        }
    }
    Ok((processed, errors))
}

/// Fetch one homepage through the cascade and merge metadata, preferring
/// non-empty values in cascade order.
async fn enrich_domain(config: &Config, fetcher: &Fetcher, mut domain: Domain) -> Result<Domain> {
    let https_url = format!("https://{}/", domain.name_host());
    let http_url = format!("http://{}/", domain.name_host());

    // (i) extractor view, https then http
    let mut extractor_title = None;
    let mut extractor_description = None;
    if let Some(extractor) = &config.readable.extractor {
        for url in [&https_url, &http_url] {
            if let Ok(output) =
                readable::run_extractor(extractor, url, 1, config.readable.timeout_secs).await
            {
                extractor_title = output.title.filter(|t| !t.is_empty());
                extractor_description = output.excerpt.filter(|e| !e.is_empty());
                if extractor_title.is_some() || extractor_description.is_some() {
                    break;
                }
            }
        }
    }

    // (ii)+(iii) fetcher (direct GET with archive fallback), https then http
    let mut outcome = fetcher.fetch(&https_url).await;
    if outcome.html.is_none() {
        outcome = fetcher.fetch(&http_url).await;
    }
    domain.http_status = Some(outcome.status.clone());
    domain.fetched_at = Some(now_timestamp());

    if let Some(html) = &outcome.html {
        let base = Url::parse(&https_url)?;
        let extract = pipeline::extract_page(html, &base);
        domain.title = extract.title.or(extractor_title.clone());
        domain.description = extract.description.or(extractor_description.clone());
        domain.keywords = extract.keywords.or(domain.keywords.take());
    } else {
        domain.title = extractor_title.or(domain.title.take());
        domain.description = extractor_description.or(domain.description.take());
    }
    Ok(domain)
}

impl Domain {
    /// Heuristic keys may carry a path (`facebook.com/user`); homepage
    /// fetches only want the host part.
    fn name_host(&self) -> &str {
        self.name.split('/').next().unwrap_or(&self.name)
    }
}

/// `heuristic update`: re-key every expression's domain reference to the
/// canonical host, creating domains as needed. Offline; content untouched.
pub async fn update_heuristics(store: &Store, heuristics: &Heuristics) -> Result<u64> {
    let expressions = store.all_expressions().await?;
    let mut updated = 0u64;
    let mut domain_names: BTreeMap<i64, String> = BTreeMap::new();

    for expression in expressions {
        let Some(key) = heuristics.domain_key(&expression.url) else {
            continue;
        };
        let current = match domain_names.get(&expression.domain_id) {
            Some(name) => name.clone(),
            None => {
                let name: String = sqlx::query_scalar("SELECT name FROM domain WHERE id = ?")
                    .bind(expression.domain_id)
                    .fetch_one(store.pool())
                    .await?;
                domain_names.insert(expression.domain_id, name.clone());
                name
            }
        };
        if key != current {
            let canonical = store.get_or_create_domain(&key).await?;
            store
                .set_expression_domain(expression.id, canonical.id)
                .await?;
            updated += 1;
        }
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn heuristics() -> Heuristics {
        Heuristics::from_config(&Config::default().heuristics).unwrap()
    }

    #[test]
    fn plain_hosts_key_to_themselves() {
        let h = heuristics();
        assert_eq!(
            h.domain_key("https://www.example.com/page").as_deref(),
            Some("www.example.com")
        );
    }

    #[test]
    fn facebook_pages_collapse_to_account() {
        let h = heuristics();
        assert_eq!(
            h.domain_key("https://m.facebook.com/someuser?ref=x").as_deref(),
            Some("m.facebook.com/someuser")
        );
    }

    #[test]
    fn unmatched_heuristic_falls_back_to_host() {
        let h = heuristics();
        // Host matches the facebook suffix but the URL has no path for the
        // capture to grab.
        assert_eq!(
            h.domain_key("https://facebook.com/").as_deref(),
            Some("facebook.com")
        );
    }

    #[test]
    fn urls_without_host_are_skipped() {
        let h = heuristics();
        assert_eq!(h.domain_key("not a url"), None);
    }
}
