//! The `land consolidate` verb: rebuild derived state from stored pages.
//!
//! External tools mutate the store (tag editors, manual SQL, partial runs);
//! consolidation restores the derived layers without touching the network.
//! For every fetched expression it re-reads the archived HTML when one
//! exists — falling back to markdown parsing of the refined readable —
//! re-discovers outlinks and media with the same rules as the crawl
//! pipeline, and recomputes relevance and `approved_at`. Nothing is
//! deleted; inserts are idempotent.

use anyhow::{bail, Result};
use std::collections::HashSet;
use url::Url;

use crate::config::Config;
use crate::dictionary::Lemmatizer;
use crate::domains::Heuristics;
use crate::models::Expression;
use crate::pipeline::{self, PipelineContext};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::readable;
use crate::store::Store;

/// Run one consolidation pass. Returns `(processed, errors)`.
pub async fn consolidate_land(
    config: &Config,
    store: &Store,
    land_name: &str,
    limit: Option<i64>,
    depth: Option<i64>,
    progress: &dyn ProgressReporter,
) -> Result<(u64, u64)> {
    let Some(land) = store.get_land(land_name).await? else {
        bail!("Land \"{}\" not found", land_name);
    };

    let lemmatizer = Lemmatizer::for_language(&land.lang);
    let dictionary: HashSet<String> = store.land_lemmas(land.id).await?.into_iter().collect();
    let heuristics = Heuristics::from_config(&config.heuristics)?;
    // The bulk rebuild path never consults the LLM gate.
    let ctx = PipelineContext {
        store,
        config,
        land: &land,
        dictionary: &dictionary,
        lemmatizer: &lemmatizer,
        heuristics: &heuristics,
        gate: None,
    };

    let expressions = store
        .expressions_for_consolidation(land.id, limit, depth)
        .await?;

    let mut processed = 0u64;
    let mut errors = 0u64;
    let total = expressions.len() as u64;
    progress.report(ProgressEvent::Batch {
        verb: format!("consolidate {}", land.name),
        n: 1,
        total: 1,
        items: total,
    });

    for expression in expressions {
        match consolidate_expression(&ctx, expression).await {
            Ok(()) => processed += 1,
            Err(err) => {
                eprintln!("consolidate error: {}", err);
                errors += 1;
            }
        }
    }
    Ok((processed, errors))
}

async fn consolidate_expression(
    ctx: &PipelineContext<'_>,
    mut expression: Expression,
) -> Result<()> {
    let base = Url::parse(&expression.url)?;

    let (links, media) = match read_archived_html(ctx.config, &expression) {
        Some(html) => {
            let extract = pipeline::extract_page(&html, &base);
            (extract.links, extract.media)
        }
        None => match expression.readable.as_deref() {
            Some(markdown) => (
                readable::extract_markdown_links(markdown, &base),
                readable::extract_markdown_media(markdown, &base),
            ),
            None => (Vec::new(), Vec::new()),
        },
    };

    pipeline::score_and_write(ctx, &mut expression, &links, &media, false).await
}

fn read_archived_html(config: &Config, expression: &Expression) -> Option<String> {
    let path = config
        .data
        .location
        .join("lands")
        .join(expression.land_id.to_string())
        .join(expression.id.to_string());
    std::fs::read_to_string(path).ok()
}
