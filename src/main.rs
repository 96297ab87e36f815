//! # MWI CLI (`mwi`)
//!
//! Command-line entry point for the web-intelligence workbench.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mwi db setup` | Recreate the database schema (destructive, confirmed) |
//! | `mwi land create --name X` | Create a land |
//! | `mwi land list` | Show lands, dictionaries and crawl progress |
//! | `mwi land addterm --land X --terms "a, b"` | Extend a land dictionary |
//! | `mwi land addurl --land X --urls ...` | Seed URLs at depth 0 |
//! | `mwi land crawl --name X` | Fetch, score and expand the corpus |
//! | `mwi land readable --name X` | Refine bodies via the external extractor |
//! | `mwi land consolidate --name X` | Rebuild links/media/scores from stored pages |
//! | `mwi land medianalyse --name X` | Measure discovered images |
//! | `mwi land delete --name X` | Delete a land (or low-relevance expressions) |
//! | `mwi domain crawl` | Enrich per-host metadata |
//! | `mwi heuristic update` | Re-key expressions onto canonical domains |
//!
//! Exit codes follow the workbench convention: **1 = success, 0 = failure**.
//! Results go to stdout; progress and errors go to stderr.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

use mwi::config::{self, Config};
use mwi::media::AnalyzeOptions;
use mwi::progress::StderrProgress;
use mwi::readable::MergeStrategy;
use mwi::store::Store;
use mwi::{consolidate, crawl, db, domains, land, media, migrate, readable};

/// MWI — a command-line manager for web-intelligence research corpora.
#[derive(Parser)]
#[command(
    name = "mwi",
    about = "Web-intelligence workbench: crawl, score and annotate topical web corpora",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Missing file means defaults;
    /// `MWI_*` environment variables override either way.
    #[arg(long, global = true, default_value = "config/mwi.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database maintenance.
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    /// Land management and processing verbs.
    Land {
        #[command(subcommand)]
        action: LandAction,
    },
    /// Domain metadata enrichment.
    Domain {
        #[command(subcommand)]
        action: DomainAction,
    },
    /// Host-normalization heuristics.
    Heuristic {
        #[command(subcommand)]
        action: HeuristicAction,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Drop and recreate all tables. Destructive; asks for confirmation.
    Setup,
}

#[derive(Subcommand)]
enum LandAction {
    /// Create a new land.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        desc: String,
        /// Land language code; drives stemming and the language-mismatch rule.
        #[arg(long, default_value = "fr")]
        lang: String,
    },
    /// List lands with dictionary and crawl progress.
    List {
        #[arg(long)]
        name: Option<String>,
    },
    /// Add comma-separated terms to a land dictionary and re-score it.
    Addterm {
        #[arg(long)]
        land: String,
        #[arg(long)]
        terms: String,
    },
    /// Seed URLs into a land (comma list and/or file with one URL per line).
    Addurl {
        #[arg(long)]
        land: String,
        #[arg(long)]
        urls: Option<String>,
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Fetch uncrawled expressions, score them and expand the link graph.
    Crawl {
        #[arg(long)]
        name: String,
        /// Maximum number of expressions to fetch this run.
        #[arg(long)]
        limit: Option<i64>,
        /// Re-crawl expressions whose recorded HTTP status matches.
        #[arg(long)]
        http: Option<String>,
        /// Only fetch expressions at or below this depth.
        #[arg(long)]
        depth: Option<i64>,
    },
    /// Refine readable bodies through the configured external extractor.
    Readable {
        #[arg(long)]
        name: String,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        depth: Option<i64>,
        /// smart_merge, mercury_priority or preserve_existing.
        #[arg(long)]
        merge: Option<String>,
    },
    /// Rebuild links, media and scores from stored pages (no refetch).
    Consolidate {
        #[arg(long)]
        name: String,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        depth: Option<i64>,
    },
    /// Delete a land, or only its expressions under a relevance threshold.
    Delete {
        #[arg(long)]
        name: String,
        /// Delete only expressions with relevance strictly below this value.
        #[arg(long)]
        maxrel: Option<f64>,
    },
    /// Download and measure the land's image media.
    Medianalyse {
        #[arg(long)]
        name: String,
        #[arg(long)]
        depth: Option<i64>,
        #[arg(long)]
        minrel: Option<i64>,
        /// Re-evaluate media that were already analyzed.
        #[arg(long)]
        reanalyze: bool,
        /// Delete media violating the configured size thresholds
        /// (asks for confirmation).
        #[arg(long)]
        purge: bool,
    },
}

#[derive(Subcommand)]
enum DomainAction {
    /// Fetch homepage metadata for domains that still lack it.
    Crawl {
        #[arg(long)]
        limit: Option<i64>,
        /// Re-fetch domains whose recorded HTTP status matches.
        #[arg(long)]
        http: Option<String>,
    },
}

#[derive(Subcommand)]
enum HeuristicAction {
    /// Re-key every expression's domain to its canonical host.
    Update,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(()) => 1,
        Err(err) => {
            println!("{:#}", err);
            eprintln!("{:#}", err);
            0
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config::load_config(&cli.config)?;
    let pool = db::connect(&config).await?;
    let store = Store::new(pool);
    let progress = StderrProgress;

    match cli.command {
        Commands::Db { action } => match action {
            DbAction::Setup => {
                if !confirm(
                    "Warning, existing data will be lost, type 'Y' to proceed: ",
                    &config,
                ) {
                    println!("Database setup aborted");
                    return Ok(());
                }
                migrate::setup(store.pool()).await?;
                println!("Model created, setup complete");
            }
        },
        Commands::Land { action } => match action {
            LandAction::Create { name, desc, lang } => {
                land::create(&store, &name, &desc, &lang).await?;
            }
            LandAction::List { name } => {
                land::list(&store, name.as_deref()).await?;
            }
            LandAction::Addterm { land: name, terms } => {
                let added = land::add_terms(&store, &name, &terms).await?;
                println!("{} terms in land {}", added, name);
            }
            LandAction::Addurl {
                land: name,
                urls,
                path,
            } => {
                if urls.is_none() && path.is_none() {
                    anyhow::bail!("Either --urls or --path is required");
                }
                let added =
                    land::add_urls(&config, &store, &name, urls.as_deref(), path.as_deref())
                        .await?;
                println!("{} URLs added to land {}", added, name);
            }
            LandAction::Crawl {
                name,
                limit,
                http,
                depth,
            } => {
                let (processed, errors) = crawl::crawl_land(
                    &config,
                    &store,
                    &name,
                    limit,
                    http.as_deref(),
                    depth,
                    &progress,
                )
                .await?;
                println!("{} processed, {} errors", processed, errors);
            }
            LandAction::Readable {
                name,
                limit,
                depth,
                merge,
            } => {
                let merge = MergeStrategy::from_str(
                    merge.as_deref().unwrap_or(config.readable.merge.as_str()),
                )?;
                let stats =
                    readable::refine_land(&config, &store, &name, limit, depth, merge, &progress)
                        .await?;
                println!(
                    "{} processed, {} errors (updated: {}, skipped: {})",
                    stats.processed, stats.errors, stats.updated, stats.skipped
                );
            }
            LandAction::Consolidate { name, limit, depth } => {
                let (processed, errors) =
                    consolidate::consolidate_land(&config, &store, &name, limit, depth, &progress)
                        .await?;
                println!("{} processed, {} errors", processed, errors);
            }
            LandAction::Delete { name, maxrel } => {
                if !confirm(
                    "Land and underlying objects will be deleted, type 'Y' to proceed: ",
                    &config,
                ) {
                    println!("Land deletion aborted");
                    return Ok(());
                }
                land::delete(&store, &name, maxrel).await?;
            }
            LandAction::Medianalyse {
                name,
                depth,
                minrel,
                reanalyze,
                purge,
            } => {
                if purge
                    && !confirm(
                        "Media violating thresholds will be deleted, type 'Y' to proceed: ",
                        &config,
                    )
                {
                    println!("Media analysis aborted");
                    return Ok(());
                }
                let options = AnalyzeOptions {
                    max_depth: depth,
                    min_relevance: minrel,
                    reanalyze,
                    purge,
                };
                let (processed, errors) =
                    media::analyze_land(&config, &store, &name, options, &progress).await?;
                println!("{} processed, {} errors", processed, errors);
            }
        },
        Commands::Domain { action } => match action {
            DomainAction::Crawl { limit, http } => {
                let (processed, errors) =
                    domains::crawl_domains(&config, &store, limit, http.as_deref(), &progress)
                        .await?;
                println!("{} processed, {} errors", processed, errors);
            }
        },
        Commands::Heuristic { action } => match action {
            HeuristicAction::Update => {
                let heuristics = domains::Heuristics::from_config(&config.heuristics)?;
                let updated = domains::update_heuristics(&store, &heuristics).await?;
                println!("{} domain reference(s) updated", updated);
            }
        },
    }
    Ok(())
}

/// Ask the operator for an explicit `Y` before a destructive action.
fn confirm(message: &str, config: &Config) -> bool {
    if config.assume_yes {
        return true;
    }
    print!("{}", message);
    use std::io::Write;
    let _ = std::io::stdout().flush();
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    answer.trim() == "Y"
}
