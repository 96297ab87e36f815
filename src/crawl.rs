//! The `land crawl` verb.
//!
//! Pulls the land's uncrawled expressions (or an `--http` status re-run
//! set), fetches them in windows of `parallel_connections`, and routes each
//! response through the content pipeline. Fetches within a window run
//! concurrently; the whole window is awaited before the next one starts, so
//! memory stays bounded and progress lines land between batches. Store
//! writebacks happen after the window completes, one expression at a time —
//! SQLite serializes writers anyway, and it keeps every partially-committed
//! expression whole.
//!
//! Cancellation: Ctrl-C raises a stop flag checked between items and between
//! batches; in-flight requests finish within their timeout and everything
//! already written back stays durable.

use anyhow::{bail, Result};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::dictionary::Lemmatizer;
use crate::domains::Heuristics;
use crate::fetch::Fetcher;
use crate::gate::RelevanceGate;
use crate::pipeline::{self, PipelineContext, ProcessOutcome};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::store::Store;

/// Run one crawl over a land. Returns `(processed, errors)`.
pub async fn crawl_land(
    config: &Config,
    store: &Store,
    land_name: &str,
    limit: Option<i64>,
    http_status: Option<&str>,
    max_depth: Option<i64>,
    progress: &dyn ProgressReporter,
) -> Result<(u64, u64)> {
    let Some(land) = store.get_land(land_name).await? else {
        bail!("Land \"{}\" not found", land_name);
    };

    let lemmatizer = Lemmatizer::for_language(&land.lang);
    let dictionary: HashSet<String> = store.land_lemmas(land.id).await?.into_iter().collect();
    let heuristics = Heuristics::from_config(&config.heuristics)?;
    let gate = RelevanceGate::from_config(
        &config.openrouter,
        store.land_lemmas(land.id).await?,
    );
    let fetcher = Fetcher::new(&config.crawl)?;

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
        .expressions_to_crawl(land.id, limit, http_status, max_depth)
        .await?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                stop.store(true, Ordering::Release);
            }
        });
    }

    let mut processed = 0u64;
    let mut errors = 0u64;
    let window = config.crawl.parallel_connections.max(1);
    let total_batches = expressions.len().div_ceil(window);

    for (index, batch) in expressions.chunks(window).enumerate() {
        if stop.load(Ordering::Acquire) {
            break;
        }
        progress.report(ProgressEvent::Batch {
            verb: format!("crawl {}", land.name),
            n: index as u64 + 1,
            total: total_batches as u64,
            items: batch.len() as u64,
        });

        let fetches = batch.iter().map(|expression| {
            let fetcher = &fetcher;
            async move {
                let outcome = fetcher.fetch(&expression.url).await;
                (expression.clone(), outcome)
            }
        });
        let results = join_all(fetches).await;

        for (expression, outcome) in results {
            if stop.load(Ordering::Acquire) {
                break;
            }
            match pipeline::process_fetched(&ctx, expression, outcome).await {
                Ok(ProcessOutcome::Processed) => processed += 1,
                Ok(ProcessOutcome::NoContent) => errors += 1,
                Err(err) => {
                    eprintln!("crawl error: {}", err);
                    errors += 1;
                }
            }
        }
    }

    Ok((processed, errors))
}
