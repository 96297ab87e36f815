//! Content pipeline: HTML parsing, cleaning, readable extraction, link and
//! media discovery, and the expression writeback sequence.
//!
//! The writeback order within a single expression is fixed: scalar fields →
//! relevance → timestamps → row commit → link inserts → media inserts. A
//! failure after the row commit leaves the expression durable; link and
//! media insertion is idempotent and resumable, so a rerun repairs the rest.

use anyhow::Result;
use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

use crate::config::Config;
use crate::dictionary::{self, Lemmatizer};
use crate::domains::Heuristics;
use crate::fetch::FetchOutcome;
use crate::gate::RelevanceGate;
use crate::models::{now_timestamp, Expression, Land, MEDIA_KIND_AUDIO, MEDIA_KIND_IMG, MEDIA_KIND_VIDEO};
use crate::store::Store;

/// Elements stripped before any text or link is read. Part of the engine
/// contract; do not narrow.
const TAG_DENYLIST: &[&str] = &[
    "script", "style", "noscript", "nav", "footer", "header", "aside", "form", "iframe", "svg",
];

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "svg"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogg", "ogv", "mov", "avi", "mkv"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "aac", "flac", "m4a"];

/// Everything the pipeline reads out of one HTML document.
#[derive(Debug, Default, Clone)]
pub struct PageExtract {
    pub lang: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    /// Visible text of the cleaned DOM, whitespace-normalized.
    pub readable: String,
    /// Crawlable outlinks, already resolved and normalized.
    pub links: Vec<String>,
    /// `(absolute url, kind)` media references with recognized extensions.
    pub media: Vec<(String, String)>,
}

/// Shared read-only context for one verb run.
pub struct PipelineContext<'a> {
    pub store: &'a Store,
    pub config: &'a Config,
    pub land: &'a Land,
    pub dictionary: &'a HashSet<String>,
    pub lemmatizer: &'a Lemmatizer,
    pub heuristics: &'a Heuristics,
    pub gate: Option<&'a RelevanceGate>,
}

/// Parse a document and pull out metadata, readable text, outlinks and
/// media in one pass over the cleaned DOM.
pub fn extract_page(html: &str, base: &Url) -> PageExtract {
    let document = Html::parse_document(html);
    let mut extract = PageExtract::default();

    let html_selector = Selector::parse("html").expect("static selector");
    extract.lang = document
        .select(&html_selector)
        .next()
        .and_then(|el| el.value().attr("lang"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let title_selector = Selector::parse("title").expect("static selector");
    extract.title = document
        .select(&title_selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    extract.description = meta_content(&document, "description");
    extract.keywords = meta_content(&document, "keywords");

    let mut text = String::new();
    let mut hrefs: Vec<String> = Vec::new();
    let mut media: Vec<(String, String)> = Vec::new();
    for child in document.tree.root().children() {
        walk(child, &mut text, &mut hrefs, &mut media);
    }
    extract.readable = normalize_whitespace(&text);

    let mut seen = HashSet::new();
    for href in hrefs {
        if let Some(url) = crawlable_url(&href, base) {
            let normalized = normalize_url(&url);
            if seen.insert(normalized.clone()) {
                extract.links.push(normalized);
            }
        }
    }

    let mut seen_media = HashSet::new();
    for (src, kind) in media {
        if let Some(url) = resolve_media_url(&src, base, &kind) {
            if seen_media.insert((url.clone(), kind.clone())) {
                extract.media.push((url, kind));
            }
        }
    }

    extract
}

fn meta_content(document: &Html, name: &str) -> Option<String> {
    let selector = Selector::parse(&format!("meta[name=\"{}\"]", name)).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Depth-first walk that skips denylisted subtrees while collecting text,
/// anchor hrefs and media srcs.
fn walk(
    node: NodeRef<'_, Node>,
    text: &mut String,
    hrefs: &mut Vec<String>,
    media: &mut Vec<(String, String)>,
) {
    match node.value() {
        Node::Element(element) => {
            let name = element.name();
            if TAG_DENYLIST.contains(&name) {
                return;
            }
            if name == "a" {
                if let Some(href) = element.attr("href") {
                    hrefs.push(href.to_string());
                }
            }
            if let Some(kind) = media_kind_for_tag(name) {
                if let Some(src) = element.attr("src") {
                    media.push((src.to_string(), kind.to_string()));
                }
            }
            for child in node.children() {
                walk(child, text, hrefs, media);
            }
        }
        Node::Text(t) => {
            text.push_str(&t);
            text.push(' ');
        }
        _ => {}
    }
}

fn media_kind_for_tag(tag: &str) -> Option<&'static str> {
    match tag {
        "img" => Some(MEDIA_KIND_IMG),
        "video" => Some(MEDIA_KIND_VIDEO),
        "audio" => Some(MEDIA_KIND_AUDIO),
        _ => None,
    }
}

/// Collapse runs of blanks; keep line structure by dropping empty lines.
fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolve an href against the page URL and apply the crawlable predicate:
/// http/https scheme, non-empty host, no pseudo-scheme.
pub fn crawlable_url(href: &str, base: &Url) -> Option<Url> {
    let trimmed = href.trim();
    let lowered = trimmed.to_ascii_lowercase();
    if lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("javascript:")
        || lowered.starts_with("data:")
    {
        return None;
    }
    let url = base.join(trimmed).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.host_str().filter(|h| !h.is_empty())?;
    Some(url)
}

/// Canonical form: fragment stripped; scheme and host are already
/// lower-cased by the parser.
pub fn normalize_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

/// Accept a media src only when its path carries a recognized extension for
/// the tag kind.
fn resolve_media_url(src: &str, base: &Url, kind: &str) -> Option<String> {
    let url = base.join(src.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let path = url.path().to_ascii_lowercase();
    let extensions = match kind {
        MEDIA_KIND_IMG => IMAGE_EXTENSIONS,
        MEDIA_KIND_VIDEO => VIDEO_EXTENSIONS,
        MEDIA_KIND_AUDIO => AUDIO_EXTENSIONS,
        _ => return None,
    };
    let recognized = extensions
        .iter()
        .any(|ext| path.ends_with(&format!(".{}", ext)));
    if !recognized {
        return None;
    }
    Some(normalize_url(&url))
}

/// Outcome of processing one fetched expression.
pub enum ProcessOutcome {
    /// Content extracted and written back.
    Processed,
    /// Fetch concluded without usable HTML; status recorded.
    NoContent,
}

/// Apply the full content pipeline to a fetched page and write it back.
pub async fn process_fetched(
    ctx: &PipelineContext<'_>,
    mut expression: Expression,
    outcome: FetchOutcome,
) -> Result<ProcessOutcome> {
    expression.http_status = Some(outcome.status.clone());
    expression.fetched_at = Some(now_timestamp());

    let Some(html) = outcome.html else {
        ctx.store.save_expression(&expression).await?;
        return Ok(ProcessOutcome::NoContent);
    };

    let base = Url::parse(&expression.url)?;
    let extract = extract_page(&html, &base);

    if ctx.config.crawl.archive {
        archive_html(ctx.config, &expression, &html)?;
    }

    apply_extract(&mut expression, &extract);
    score_and_write(ctx, &mut expression, &extract.links, &extract.media, true).await?;
    Ok(ProcessOutcome::Processed)
}

/// Copy extracted scalar fields onto the expression.
fn apply_extract(expression: &mut Expression, extract: &PageExtract) {
    if extract.lang.is_some() {
        expression.lang = extract.lang.clone();
    }
    if extract.title.is_some() {
        expression.title = extract.title.clone();
    }
    if extract.description.is_some() {
        expression.description = extract.description.clone();
    }
    if extract.keywords.is_some() {
        expression.keywords = extract.keywords.clone();
    }
    expression.readable = Some(extract.readable.clone()).filter(|r| !r.is_empty());
}

/// Score, stamp, commit, then discover. Shared by crawl and consolidate.
///
/// With `consult_gate`, a definitive gate "no" zeroes the score and
/// suppresses discovery entirely; any other gate answer falls back to the
/// local dictionary score.
pub async fn score_and_write(
    ctx: &PipelineContext<'_>,
    expression: &mut Expression,
    links: &[String],
    media: &[(String, String)],
    consult_gate: bool,
) -> Result<()> {
    let vetoed = match (consult_gate, ctx.gate) {
        (true, Some(gate)) => gate.allows(ctx.land, expression).await == Some(false),
        _ => false,
    };

    expression.relevance = if vetoed {
        0
    } else {
        dictionary::relevance(
            expression.title.as_deref(),
            expression.readable.as_deref(),
            expression.lang.as_deref(),
            &ctx.land.lang,
            ctx.dictionary,
            ctx.lemmatizer,
        )
    };
    expression.approved_at = if expression.relevance > 0 {
        expression.approved_at.or_else(|| Some(now_timestamp()))
    } else {
        None
    };

    // Row commit; discovery below is idempotent and resumable.
    ctx.store.save_expression(expression).await?;

    if expression.relevance > 0 {
        if expression.depth < ctx.config.crawl.max_depth {
            discover_links(ctx, expression, links).await?;
        }
        discover_media(ctx, expression, media).await?;
    }
    Ok(())
}

/// Upsert link targets at `depth + 1` and record the edges. Targets that
/// already belong to another land are skipped so both endpoints of every
/// edge stay in the same land.
pub async fn discover_links(
    ctx: &PipelineContext<'_>,
    source: &Expression,
    links: &[String],
) -> Result<usize> {
    let mut added = 0;
    for url in links {
        let host = ctx.heuristics.domain_key(url);
        let Some(host) = host else { continue };
        let domain = ctx.store.get_or_create_domain(&host).await?;
        let target = ctx
            .store
            .upsert_expression(ctx.land.id, domain.id, url, source.depth + 1)
            .await?;
        if target.land_id != ctx.land.id || target.id == source.id {
            continue;
        }
        ctx.store.add_link(source.id, target.id).await?;
        added += 1;
    }
    Ok(added)
}

pub async fn discover_media(
    ctx: &PipelineContext<'_>,
    source: &Expression,
    media: &[(String, String)],
) -> Result<usize> {
    for (url, kind) in media {
        ctx.store.upsert_media(source.id, url, kind).await?;
    }
    Ok(media.len())
}

/// Keep a raw HTML archive under `<data>/lands/<land_id>/<expression_id>`.
fn archive_html(config: &Config, expression: &Expression, html: &str) -> Result<()> {
    let dir = config
        .data
        .location
        .join("lands")
        .join(expression.land_id.to_string());
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join(expression.id.to_string()), html.trim())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"<!DOCTYPE html>
<html lang="fr">
<head>
    <title>Asthme et pollution urbaine</title>
    <meta name="description" content="Effets de la pollution sur l'asthme">
    <meta name="keywords" content="asthme, pollution, ville">
    <script>var tracked = true;</script>
</head>
<body>
    <nav><a href="/menu">Menu</a></nav>
    <article>
        <p>La pollution urbaine aggrave l'asthme.</p>
        <a href="/etude">Une étude</a>
        <a href="https://example.org/rapport#section2">Rapport</a>
        <a href="mailto:contact@example.com">Écrire</a>
        <a href="javascript:void(0)">Rien</a>
        <img src="/images/smog.jpg" alt="">
        <img src="/images/pixel">
        <video src="/clips/interview.mp4"></video>
        <audio src="../sons/ambiance.mp3"></audio>
    </article>
    <footer><a href="/mentions">Mentions légales</a></footer>
</body>
</html>"#;

    fn base() -> Url {
        Url::parse("https://example.com/articles/pollution").unwrap()
    }

    #[test]
    fn extracts_metadata() {
        let extract = extract_page(FIXTURE, &base());
        assert_eq!(extract.lang.as_deref(), Some("fr"));
        assert_eq!(extract.title.as_deref(), Some("Asthme et pollution urbaine"));
        assert_eq!(
            extract.description.as_deref(),
            Some("Effets de la pollution sur l'asthme")
        );
        assert_eq!(extract.keywords.as_deref(), Some("asthme, pollution, ville"));
    }

    #[test]
    fn denylist_strips_script_nav_footer() {
        let extract = extract_page(FIXTURE, &base());
        assert!(extract.readable.contains("La pollution urbaine"));
        assert!(!extract.readable.contains("tracked"));
        assert!(!extract.readable.contains("Menu"));
        assert!(!extract.readable.contains("Mentions"));
    }

    #[test]
    fn links_are_resolved_normalized_and_filtered() {
        let extract = extract_page(FIXTURE, &base());
        // Nav and footer anchors are under denylisted elements; mailto and
        // javascript are not crawlable; the fragment is stripped.
        assert_eq!(
            extract.links,
            vec![
                "https://example.com/etude".to_string(),
                "https://example.org/rapport".to_string(),
            ]
        );
    }

    #[test]
    fn media_requires_recognized_extension() {
        let extract = extract_page(FIXTURE, &base());
        assert_eq!(
            extract.media,
            vec![
                ("https://example.com/images/smog.jpg".to_string(), "img".to_string()),
                ("https://example.com/clips/interview.mp4".to_string(), "video".to_string()),
                ("https://example.com/sons/ambiance.mp3".to_string(), "audio".to_string()),
            ]
        );
    }

    #[test]
    fn crawlable_rejects_pseudo_schemes() {
        let base = base();
        assert!(crawlable_url("mailto:x@y.z", &base).is_none());
        assert!(crawlable_url("tel:+33102030405", &base).is_none());
        assert!(crawlable_url("javascript:alert(1)", &base).is_none());
        assert!(crawlable_url("data:text/plain,hello", &base).is_none());
        assert!(crawlable_url("ftp://example.com/file", &base).is_none());
        assert!(crawlable_url("/page", &base).is_some());
        assert!(crawlable_url("https://example.org/", &base).is_some());
    }

    #[test]
    fn normalize_strips_fragment_and_lowercases_host() {
        let url = Url::parse("HTTPS://Example.COM/Path#anchor").unwrap();
        assert_eq!(normalize_url(&url), "https://example.com/Path");
    }

    #[test]
    fn whitespace_normalization_collapses_blanks() {
        let input = "  line one  \n\n\n   line   two \n   ";
        assert_eq!(normalize_whitespace(input), "line one\nline two");
    }

    #[test]
    fn media_extension_case_is_ignored() {
        let base = base();
        assert!(resolve_media_url("/a/photo.JPG", &base, "img").is_some());
        assert!(resolve_media_url("/a/clip.MKV", &base, "video").is_some());
        assert!(resolve_media_url("/a/page.html", &base, "img").is_none());
        // A video extension on an img tag is not a match.
        assert!(resolve_media_url("/a/clip.mp4", &base, "img").is_none());
    }
}
