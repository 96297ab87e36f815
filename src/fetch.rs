//! HTTP fetcher with archival fallback.
//!
//! One [`Fetcher`] is shared by all tasks of a verb run. Every outcome is
//! encoded in the returned [`FetchOutcome`] rather than an error: transient
//! and definitive failures alike end up as a recorded status, so a batch
//! never aborts because one URL misbehaved.
//!
//! When the live fetch fails or returns non-HTML, one lookup against the
//! public Wayback availability endpoint is attempted; a hit is fetched and
//! returned with the *original* status preserved.

use anyhow::{Context, Result};
use std::time::Duration;

use crate::config::CrawlConfig;

const WAYBACK_ENDPOINT: &str = "https://archive.org/wayback/available";

/// Status string recorded when no HTTP response was obtained at all.
pub const STATUS_UNREACHABLE: &str = "000";

/// Result of one fetch attempt, archival fallback included.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Original HTTP status, or `"000"` when the request never completed.
    pub status: String,
    /// HTML body when the live page or an archived snapshot yielded one.
    pub html: Option<String>,
    /// URL after redirects (live fetch) or the requested URL.
    pub final_url: String,
}

pub struct Fetcher {
    client: reqwest::Client,
    wayback_endpoint: String,
}

impl Fetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            wayback_endpoint: WAYBACK_ENDPOINT.to_string(),
        })
    }

    /// Fetch one URL. Non-HTML and error responses fall back to the archive;
    /// the outcome always records the live status.
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        match self.fetch_live(url).await {
            Ok((status, Some(html), final_url)) => FetchOutcome {
                status,
                html: Some(html),
                final_url,
            },
            Ok((status, None, final_url)) => {
                let html = self.fetch_archived(url).await;
                FetchOutcome {
                    status,
                    html,
                    final_url,
                }
            }
            Err(_) => {
                let html = self.fetch_archived(url).await;
                FetchOutcome {
                    status: STATUS_UNREACHABLE.to_string(),
                    html,
                    final_url: url.to_string(),
                }
            }
        }
    }

    /// Live GET. Returns the HTML body only for 2xx responses whose
    /// Content-Type mentions `html`.
    async fn fetch_live(&self, url: &str) -> Result<(String, Option<String>, String)> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16().to_string();
        let final_url = response.url().to_string();
        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("html"))
            .unwrap_or(false);

        if response.status().is_success() && is_html {
            let body = response.text().await?;
            Ok((status, Some(body), final_url))
        } else {
            Ok((status, None, final_url))
        }
    }

    /// One archival lookup followed by a snapshot fetch on a hit.
    async fn fetch_archived(&self, url: &str) -> Option<String> {
        let lookup = self
            .client
            .get(&self.wayback_endpoint)
            .query(&[("url", url)])
            .send()
            .await
            .ok()?;
        let json: serde_json::Value = lookup.json().await.ok()?;
        let snapshot_url = snapshot_url(&json)?;

        let response = self.client.get(&snapshot_url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        response.text().await.ok()
    }
}

/// Read exactly `archived_snapshots.closest.url`; anything missing means no
/// fallback.
pub fn snapshot_url(json: &serde_json::Value) -> Option<String> {
    json.get("archived_snapshots")?
        .get("closest")?
        .get("url")?
        .as_str()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_url_reads_closest() {
        let json = serde_json::json!({
            "archived_snapshots": {
                "closest": {
                    "available": true,
                    "url": "http://web.archive.org/web/2024/https://example.com/",
                    "status": "200"
                }
            }
        });
        assert_eq!(
            snapshot_url(&json).as_deref(),
            Some("http://web.archive.org/web/2024/https://example.com/")
        );
    }

    #[test]
    fn snapshot_url_missing_means_no_fallback() {
        assert_eq!(snapshot_url(&serde_json::json!({})), None);
        assert_eq!(
            snapshot_url(&serde_json::json!({"archived_snapshots": {}})),
            None
        );
        assert_eq!(
            snapshot_url(&serde_json::json!({"archived_snapshots": {"closest": {}}})),
            None
        );
    }
}
