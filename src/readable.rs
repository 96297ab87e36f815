//! Readable refiner: drives an external high-quality extractor over fetched
//! expressions and folds its output into the store under a configurable
//! merge strategy.
//!
//! The extractor is any executable that takes a URL and prints a JSON object
//! with title, markdown body, excerpt, author, publication date, language,
//! lead image, enumerated images and enumerated outlinks. Extraction runs
//! per batch with bounded concurrency; each URL gets up to `max_retries`
//! attempts with exponential backoff (1, 2, 4 s).
//!
//! Outbound links are *replaced* only when the extractor returned a
//! non-empty link set — an empty extraction must never regress the graph.

use anyhow::{bail, Context, Result};
use futures::future::join_all;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::config::Config;
use crate::dictionary::Lemmatizer;
use crate::domains::Heuristics;
use crate::gate::RelevanceGate;
use crate::models::{now_timestamp, Expression, MEDIA_KIND_IMG, MEDIA_KIND_VIDEO};
use crate::pipeline::{self, PipelineContext};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::store::Store;

/// How extractor output combines with stored fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Extractor value wins whenever non-empty.
    MercuryPriority,
    /// Stored value wins whenever non-empty; extractor only fills holes.
    PreserveExisting,
    /// Per-field policy: longer title/description, extractor readable,
    /// stored dates/author/language unless empty.
    SmartMerge,
}

impl FromStr for MergeStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mercury_priority" => Ok(Self::MercuryPriority),
            "preserve_existing" => Ok(Self::PreserveExisting),
            "smart_merge" => Ok(Self::SmartMerge),
            other => bail!("Unknown merge strategy: '{}'", other),
        }
    }
}

/// Field classes with distinct smart-merge policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Title,
    Readable,
    Description,
    /// Dates, author, language: extractor fills only empty stored values.
    Provenance,
    Other,
}

/// Combine one stored/extracted field pair under a strategy.
///
/// An empty side always loses; with both sides non-empty the strategy
/// decides.
pub fn merge_field<'a>(
    strategy: MergeStrategy,
    kind: FieldKind,
    stored: Option<&'a str>,
    extracted: Option<&'a str>,
) -> Option<&'a str> {
    let stored = stored.filter(|s| !s.trim().is_empty());
    let extracted = extracted.filter(|s| !s.trim().is_empty());
    match (stored, extracted) {
        (None, any) => any,
        (some, None) => some,
        (Some(s), Some(e)) => Some(match strategy {
            MergeStrategy::MercuryPriority => e,
            MergeStrategy::PreserveExisting => s,
            MergeStrategy::SmartMerge => match kind {
                FieldKind::Title | FieldKind::Description => {
                    if e.len() > s.len() {
                        e
                    } else {
                        s
                    }
                }
                FieldKind::Readable => e,
                FieldKind::Provenance => s,
                FieldKind::Other => e,
            },
        }),
    }
}

/// Parsed extractor JSON. Unknown fields are ignored; media and link
/// entries accept both bare-string and object shapes.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ExtractorOutput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub markdown: Option<String>,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub date_published: Option<String>,
    pub lang: Option<String>,
    /// Writing direction (`ltr`/`rtl`). Never a language; kept separate so
    /// it cannot leak into the language-mismatch rule.
    pub direction: Option<String>,
    pub lead_image_url: Option<String>,
    #[serde(default)]
    pub images: Vec<MediaRef>,
    #[serde(default)]
    pub videos: Vec<MediaRef>,
    #[serde(default)]
    pub links: Vec<LinkRef>,
}

impl ExtractorOutput {
    pub fn body(&self) -> Option<&str> {
        self.markdown.as_deref().or(self.content.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MediaRef {
    Url(String),
    Tagged { src: String },
}

impl MediaRef {
    pub fn src(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Tagged { src } => src,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LinkRef {
    Url(String),
    Tagged { href: String },
}

impl LinkRef {
    pub fn href(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Tagged { href } => href,
        }
    }
}

/// Invoke the extractor once per attempt with exponential backoff.
pub async fn run_extractor(
    extractor: &str,
    url: &str,
    max_retries: u32,
    timeout_secs: u64,
) -> Result<ExtractorOutput> {
    let mut last_err = None;
    for attempt in 0..max_retries.max(1) {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_secs(1u64 << (attempt - 1).min(4))).await;
        }
        let mut command = tokio::process::Command::new(extractor);
        command
            .arg(url)
            .arg("--format=markdown")
            .arg("--extract-media")
            .arg("--extract-links")
            .kill_on_drop(true);
        match tokio::time::timeout(Duration::from_secs(timeout_secs), command.output()).await {
            Ok(Ok(output)) if output.status.success() => {
                let parsed = serde_json::from_slice::<ExtractorOutput>(&output.stdout)
                    .with_context(|| format!("Extractor returned invalid JSON for {}", url));
                match parsed {
                    Ok(result) => return Ok(result),
                    // Malformed JSON will not improve on retry.
                    Err(err) => return Err(err),
                }
            }
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                last_err = Some(anyhow::anyhow!("Extractor failed for {}: {}", url, stderr));
            }
            Ok(Err(err)) => {
                last_err = Some(anyhow::Error::from(err).context("Failed to spawn extractor"));
            }
            Err(_) => {
                last_err = Some(anyhow::anyhow!(
                    "Extractor timed out after {}s for {}",
                    timeout_secs,
                    url
                ));
            }
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Extractor failed for {}", url)))
}

/// Summary statistics for one refiner run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RefineStats {
    pub processed: u64,
    pub updated: u64,
    pub skipped: u64,
    pub errors: u64,
}

/// Run the refiner over a land. Batches of `batch_size` extract
/// concurrently; results are folded back one expression at a time.
pub async fn refine_land(
    config: &Config,
    store: &Store,
    land_name: &str,
    limit: Option<i64>,
    depth: Option<i64>,
    merge: MergeStrategy,
    progress: &dyn ProgressReporter,
) -> Result<RefineStats> {
    let Some(land) = store.get_land(land_name).await? else {
        bail!("Land \"{}\" not found", land_name);
    };
    let Some(extractor) = config.readable.extractor.clone() else {
        bail!("No readable extractor configured (readable.extractor)");
    };

    let lemmatizer = Lemmatizer::for_language(&land.lang);
    let dictionary: HashSet<String> = store.land_lemmas(land.id).await?.into_iter().collect();
    let heuristics = Heuristics::from_config(&config.heuristics)?;
    let gate = RelevanceGate::from_config(
        &config.openrouter,
        store.land_lemmas(land.id).await?,
    );
    let ctx = PipelineContext {
        store,
        config,
        land: &land,
        dictionary: &dictionary,
        lemmatizer: &lemmatizer,
        heuristics: &heuristics,
        gate: gate.as_ref(),
    };

    let expressions = store
        .expressions_for_readable(land.id, limit, depth)
        .await?;

    let mut stats = RefineStats::default();
    let window = config.readable.batch_size.max(1);
    let total_batches = expressions.len().div_ceil(window);

    for (index, batch) in expressions.chunks(window).enumerate() {
        progress.report(ProgressEvent::Batch {
            verb: format!("readable {}", land.name),
            n: index as u64 + 1,
            total: total_batches as u64,
            items: batch.len() as u64,
        });

        let extractions = batch.iter().map(|expression| {
            let extractor = extractor.clone();
            let url = expression.url.clone();
            let retries = config.readable.max_retries;
            let timeout = config.readable.timeout_secs;
            async move { run_extractor(&extractor, &url, retries, timeout).await }
        });
        let outputs = join_all(extractions).await;

        for (expression, output) in batch.iter().zip(outputs) {
            match output {
                Ok(output) => {
                    match apply_refinement(&ctx, expression.clone(), &output, merge).await {
                        Ok(changed) => {
                            stats.processed += 1;
                            if changed {
                                stats.updated += 1;
                            } else {
                                stats.skipped += 1;
                            }
                        }
                        Err(err) => {
                            eprintln!("readable error for {}: {}", expression.url, err);
                            stats.errors += 1;
                        }
                    }
                }
                Err(err) => {
                    // Exhausted retries: leave the expression untouched.
                    eprintln!("{}", err);
                    stats.errors += 1;
                }
            }
        }
    }
    Ok(stats)
}

/// Fold one extractor output into its expression: merge fields, recompute
/// relevance (gate included), harvest media and links, replace edges only
/// when the extractor produced some.
async fn apply_refinement(
    ctx: &PipelineContext<'_>,
    mut expression: Expression,
    output: &ExtractorOutput,
    merge: MergeStrategy,
) -> Result<bool> {
    let before = expression.clone();

    expression.title = merge_field(
        merge,
        FieldKind::Title,
        before.title.as_deref(),
        output.title.as_deref(),
    )
    .map(String::from);
    expression.description = merge_field(
        merge,
        FieldKind::Description,
        before.description.as_deref(),
        output.excerpt.as_deref(),
    )
    .map(String::from);
    expression.readable = merge_field(
        merge,
        FieldKind::Readable,
        before.readable.as_deref(),
        output.body(),
    )
    .map(String::from);
    expression.author = merge_field(
        merge,
        FieldKind::Provenance,
        before.author.as_deref(),
        output.author.as_deref(),
    )
    .map(String::from);
    // `direction` is deliberately ignored here: ltr/rtl is not a language.
    expression.lang = merge_field(
        merge,
        FieldKind::Provenance,
        before.lang.as_deref(),
        output.lang.as_deref(),
    )
    .map(String::from);
    if expression.published_at.is_none() {
        expression.published_at = output.date_published.as_deref().and_then(parse_published_date);
    }

    let changed = expression.title != before.title
        || expression.description != before.description
        || expression.readable != before.readable
        || expression.author != before.author
        || expression.lang != before.lang
        || expression.published_at != before.published_at;

    expression.readable_at = Some(now_timestamp());

    let base = Url::parse(&expression.url)?;
    let links = harvest_links(output, &base);
    let media = harvest_media(output, &base);

    // Commit the row and upsert media; link handling follows its own
    // replace-or-preserve rule below.
    pipeline::score_and_write(ctx, &mut expression, &[], &media, true).await?;

    // Replace outbound edges only with a non-empty extracted set; an empty
    // set must not regress the existing graph.
    if !links.is_empty()
        && expression.relevance > 0
        && expression.depth < ctx.config.crawl.max_depth
    {
        let mut targets = Vec::new();
        for url in &links {
            if let Some(host) = ctx.heuristics.domain_key(url) {
                let domain = ctx.store.get_or_create_domain(&host).await?;
                let target = ctx
                    .store
                    .upsert_expression(ctx.land.id, domain.id, url, expression.depth + 1)
                    .await?;
                if target.land_id == ctx.land.id && target.id != expression.id {
                    targets.push(target.id);
                }
            }
        }
        ctx.store
            .replace_expression_links(expression.id, &targets)
            .await?;
    }

    Ok(changed)
}

/// Crawlable, normalized outlinks from the extractor's structured output.
fn harvest_links(output: &ExtractorOutput, base: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    output
        .links
        .iter()
        .filter_map(|link| pipeline::crawlable_url(link.href(), base))
        .map(|url| pipeline::normalize_url(&url))
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Media references from the extractor's structured output, lead image
/// included, with the content pipeline's extension rules applied.
fn harvest_media(output: &ExtractorOutput, base: &Url) -> Vec<(String, String)> {
    let mut media = Vec::new();
    let mut seen = HashSet::new();
    let images = output
        .images
        .iter()
        .map(|m| m.src().to_string())
        .chain(output.lead_image_url.iter().cloned());
    for src in images {
        if let Some(url) = resolve_with_extension(&src, base, MEDIA_KIND_IMG) {
            if seen.insert(url.clone()) {
                media.push((url, MEDIA_KIND_IMG.to_string()));
            }
        }
    }
    for video in &output.videos {
        if let Some(url) = resolve_with_extension(video.src(), base, MEDIA_KIND_VIDEO) {
            if seen.insert(url.clone()) {
                media.push((url, MEDIA_KIND_VIDEO.to_string()));
            }
        }
    }
    media
}

fn resolve_with_extension(src: &str, base: &Url, kind: &str) -> Option<String> {
    // Reuse the pipeline's media rules by faking a tag-shaped document is
    // not worth it; resolve and check the path suffix directly.
    let url = base.join(src.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let path = url.path().to_ascii_lowercase();
    let extensions: &[&str] = match kind {
        MEDIA_KIND_IMG => &["jpg", "jpeg", "png", "gif", "webp", "bmp", "svg"],
        MEDIA_KIND_VIDEO => &["mp4", "webm", "ogg", "ogv", "mov", "avi", "mkv"],
        _ => return None,
    };
    if !extensions.iter().any(|e| path.ends_with(&format!(".{}", e))) {
        return None;
    }
    Some(pipeline::normalize_url(&url))
}

/// Parse the extractor's publication date: RFC 3339 first, then a plain
/// date.
pub fn parse_published_date(value: &str) -> Option<i64> {
    if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(datetime.timestamp());
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp());
    }
    None
}

/// Markdown image references: `![alt](url "title")`. Used by the
/// consolidator to re-discover media from refined bodies.
pub fn extract_markdown_media(markdown: &str, base: &Url) -> Vec<(String, String)> {
    let pattern = Regex::new(r#"!\[[^\]]*\]\(([^)\s]+)(?:\s+"[^"]*")?\)"#).expect("static regex");
    let mut seen = HashSet::new();
    pattern
        .captures_iter(markdown)
        .filter_map(|caps| resolve_with_extension(&caps[1], base, MEDIA_KIND_IMG))
        .filter(|url| seen.insert(url.clone()))
        .map(|url| (url, MEDIA_KIND_IMG.to_string()))
        .collect()
}

/// Markdown links `[text](url)`, excluding image embeds.
pub fn extract_markdown_links(markdown: &str, base: &Url) -> Vec<String> {
    let pattern =
        Regex::new(r#"(^|[^!])\[[^\]]+\]\(([^)\s]+)(?:\s+"[^"]*")?\)"#).expect("static regex");
    let mut seen = HashSet::new();
    pattern
        .captures_iter(markdown)
        .filter_map(|caps| pipeline::crawlable_url(&caps[2], base))
        .map(|url| pipeline::normalize_url(&url))
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserve_existing_never_overwrites() {
        let merged = merge_field(
            MergeStrategy::PreserveExisting,
            FieldKind::Title,
            Some("Stored"),
            Some("Extracted"),
        );
        assert_eq!(merged, Some("Stored"));
        // But it fills holes.
        let filled = merge_field(
            MergeStrategy::PreserveExisting,
            FieldKind::Title,
            None,
            Some("Extracted"),
        );
        assert_eq!(filled, Some("Extracted"));
    }

    #[test]
    fn mercury_priority_takes_extracted_when_nonempty() {
        let merged = merge_field(
            MergeStrategy::MercuryPriority,
            FieldKind::Description,
            Some("Stored"),
            Some("Extracted"),
        );
        assert_eq!(merged, Some("Extracted"));
        // Empty extraction never wins.
        let kept = merge_field(
            MergeStrategy::MercuryPriority,
            FieldKind::Description,
            Some("Stored"),
            Some("  "),
        );
        assert_eq!(kept, Some("Stored"));
    }

    #[test]
    fn smart_merge_title_prefers_longer() {
        let merged = merge_field(
            MergeStrategy::SmartMerge,
            FieldKind::Title,
            Some("Short"),
            Some("Much Longer Title"),
        );
        assert_eq!(merged, Some("Much Longer Title"));
        let kept = merge_field(
            MergeStrategy::SmartMerge,
            FieldKind::Title,
            Some("The Longest Stored Title"),
            Some("Tiny"),
        );
        assert_eq!(kept, Some("The Longest Stored Title"));
    }

    #[test]
    fn smart_merge_readable_prefers_extractor() {
        let merged = merge_field(
            MergeStrategy::SmartMerge,
            FieldKind::Readable,
            Some("old"),
            Some("new"),
        );
        assert_eq!(merged, Some("new"));
    }

    #[test]
    fn smart_merge_provenance_keeps_stored() {
        let merged = merge_field(
            MergeStrategy::SmartMerge,
            FieldKind::Provenance,
            Some("fr"),
            Some("en"),
        );
        assert_eq!(merged, Some("fr"));
        let filled = merge_field(
            MergeStrategy::SmartMerge,
            FieldKind::Provenance,
            None,
            Some("en"),
        );
        assert_eq!(filled, Some("en"));
    }

    #[test]
    fn extractor_output_accepts_both_media_shapes() {
        let json = r#"{
            "title": "T",
            "markdown": "body",
            "images": ["https://example.com/a.jpg", {"src": "/b.png", "alt": "x"}],
            "links": [{"href": "https://example.com/next", "text": "next"}, "https://example.com/plain"]
        }"#;
        let output: ExtractorOutput = serde_json::from_str(json).unwrap();
        assert_eq!(output.images.len(), 2);
        assert_eq!(output.images[0].src(), "https://example.com/a.jpg");
        assert_eq!(output.images[1].src(), "/b.png");
        assert_eq!(output.links[0].href(), "https://example.com/next");
        assert_eq!(output.links[1].href(), "https://example.com/plain");
        assert_eq!(output.body(), Some("body"));
    }

    #[test]
    fn body_falls_back_to_content() {
        let output: ExtractorOutput =
            serde_json::from_str(r#"{"content": "only content"}"#).unwrap();
        assert_eq!(output.body(), Some("only content"));
    }

    #[test]
    fn parses_publication_dates() {
        assert_eq!(
            parse_published_date("2024-02-01T10:30:00+00:00"),
            Some(1706783400)
        );
        assert!(parse_published_date("2024-02-01").is_some());
        assert_eq!(parse_published_date("yesterday"), None);
    }

    #[test]
    fn markdown_media_extraction() {
        let base = Url::parse("https://example.com/article").unwrap();
        let markdown = "Intro ![smog](/img/smog.jpg \"Smog\") and ![x](https://cdn.example.org/p.png)";
        let media = extract_markdown_media(markdown, &base);
        assert_eq!(
            media,
            vec![
                ("https://example.com/img/smog.jpg".to_string(), "img".to_string()),
                ("https://cdn.example.org/p.png".to_string(), "img".to_string()),
            ]
        );
    }

    #[test]
    fn markdown_links_exclude_images() {
        let base = Url::parse("https://example.com/article").unwrap();
        let markdown = "See [the study](/etude) but not ![pic](/img/p.jpg)";
        let links = extract_markdown_links(markdown, &base);
        assert_eq!(links, vec!["https://example.com/etude".to_string()]);
    }
}
