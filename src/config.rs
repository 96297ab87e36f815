use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Application configuration, loaded from a TOML file with `MWI_*`
/// environment overrides applied on top.
///
/// A missing config file is not an error: every section has workable
/// defaults so `mwi db setup` runs on a fresh checkout.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub crawl: CrawlConfig,
    pub readable: ReadableConfig,
    pub openrouter: OpenRouterConfig,
    pub media: MediaConfig,
    /// Host-suffix keyed URL heuristics: when an expression URL's host ends
    /// with the key, the first capture of the value regex becomes the
    /// canonical domain key (e.g. collapse `m.facebook.com/user` pages onto
    /// `facebook.com/user`).
    pub heuristics: BTreeMap<String, String>,
    /// Skip interactive confirmation prompts for destructive verbs.
    pub assume_yes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            crawl: CrawlConfig::default(),
            readable: ReadableConfig::default(),
            openrouter: OpenRouterConfig::default(),
            media: MediaConfig::default(),
            heuristics: default_heuristics(),
            assume_yes: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DataConfig {
    /// Data directory: holds `mwi.db` and the `lands/` HTML archive tree.
    pub location: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            location: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CrawlConfig {
    /// Bounded in-flight HTTP operations per batch window.
    pub parallel_connections: usize,
    /// Total per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Connect sub-timeout in seconds.
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    /// Keep a raw HTML archive under `<data>/lands/<land>/<expression>`.
    pub archive: bool,
    /// Outlinks are not discovered from expressions at or beyond this depth.
    pub max_depth: i64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            parallel_connections: 10,
            timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: format!("mwi/{}", env!("CARGO_PKG_VERSION")),
            archive: false,
            max_depth: 3,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReadableConfig {
    /// Path to the readable extractor executable. `None` disables the
    /// `land readable` verb.
    pub extractor: Option<String>,
    /// Default merge strategy: `smart_merge`, `mercury_priority`,
    /// or `preserve_existing`.
    pub merge: String,
    pub batch_size: usize,
    pub max_retries: u32,
    /// Per-attempt extractor timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ReadableConfig {
    fn default() -> Self {
        Self {
            extractor: None,
            merge: "smart_merge".to_string(),
            batch_size: 10,
            max_retries: 3,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OpenRouterConfig {
    pub enabled: bool,
    pub api_key: String,
    pub model: String,
    /// Chat completions endpoint; overridable so tests can stub the gate.
    pub endpoint: String,
    pub timeout_secs: u64,
    /// Readable body truncation sent to the gate.
    pub readable_max_chars: usize,
    /// Hard per-run call budget; the gate disables itself past this.
    pub max_calls_per_run: u32,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            model: String::new(),
            endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            timeout_secs: 15,
            readable_max_chars: 6000,
            max_calls_per_run: 500,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MediaConfig {
    pub min_width: u32,
    pub min_height: u32,
    /// Reject downloads larger than this many bytes.
    pub max_file_size: u64,
    pub download_timeout_secs: u64,
    pub max_retries: u32,
    pub extract_colors: bool,
    pub extract_exif: bool,
    pub n_dominant_colors: usize,
    /// Ordered deny regexes matched against media URLs (ads, trackers,
    /// tracking pixels).
    pub deny_patterns: Vec<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            min_width: 100,
            min_height: 100,
            max_file_size: 10 * 1024 * 1024,
            download_timeout_secs: 30,
            max_retries: 2,
            extract_colors: true,
            extract_exif: true,
            n_dominant_colors: 5,
            deny_patterns: default_media_deny_patterns(),
        }
    }
}

fn default_media_deny_patterns() -> Vec<String> {
    [
        r"/ads?[/._-]",
        r"banner",
        r"tracking",
        r"pixel",
        r"beacon",
        r"analytics",
        r"doubleclick",
        r"googlesyndication",
        r"amazon-adsystem",
        r"facebook\.com/tr",
        r"google-analytics",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_heuristics() -> BTreeMap<String, String> {
    [
        (
            "facebook.com",
            r"([a-z0-9\-_]+\.facebook\.com/[a-zA-Z0-9\.\-_]+)",
        ),
        (
            "twitter.com",
            r"([a-z0-9\-_]*\.?twitter\.com/[a-zA-Z0-9\.\-_]+)",
        ),
        (
            "linkedin.com",
            r"([a-z0-9\-_]+\.linkedin\.com/[a-zA-Z0-9\.\-_]+)",
        ),
        (
            "instagram.com",
            r"([a-z0-9\-_]+\.instagram\.com/[a-zA-Z0-9\.\-_]+)",
        ),
        (
            "youtube.com",
            r"([a-z0-9\-_]+\.youtube\.com/[a-zA-Z0-9\.\-_]+)",
        ),
        ("vimeo.com", r"([a-z0-9\-_]+\.vimeo\.com/[a-zA-Z0-9\.\-_]+)"),
        (
            "pinterest.com",
            r"([a-z0-9\-_]+\.pinterest\.com/[a-zA-Z0-9\.\-_]+)",
        ),
        (
            "dailymotion.com",
            r"([a-z0-9\-_]+\.dailymotion\.com/[a-zA-Z0-9\.\-_]+)",
        ),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Merge strategies accepted by `land readable --merge`.
pub const MERGE_STRATEGIES: &[&str] = &["smart_merge", "mercury_priority", "preserve_existing"];

pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config)?;
    validate(&config)?;
    Ok(config)
}

/// Environment variables override the persisted configuration at run time.
fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Ok(v) = std::env::var("MWI_DATA_LOCATION") {
        config.data.location = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("MWI_OPENROUTER_ENABLED") {
        config.openrouter.enabled = matches!(v.as_str(), "1" | "true" | "yes");
    }
    if let Ok(v) = std::env::var("MWI_OPENROUTER_API_KEY") {
        config.openrouter.api_key = v;
    }
    if let Ok(v) = std::env::var("MWI_OPENROUTER_MODEL") {
        config.openrouter.model = v;
    }
    if let Ok(v) = std::env::var("MWI_OPENROUTER_TIMEOUT") {
        config.openrouter.timeout_secs = v
            .parse()
            .with_context(|| "MWI_OPENROUTER_TIMEOUT must be an integer number of seconds")?;
    }
    if let Ok(v) = std::env::var("MWI_OPENROUTER_READABLE_MAX_CHARS") {
        config.openrouter.readable_max_chars = v
            .parse()
            .with_context(|| "MWI_OPENROUTER_READABLE_MAX_CHARS must be an integer")?;
    }
    if let Ok(v) = std::env::var("MWI_OPENROUTER_MAX_CALLS_PER_RUN") {
        config.openrouter.max_calls_per_run = v
            .parse()
            .with_context(|| "MWI_OPENROUTER_MAX_CALLS_PER_RUN must be an integer")?;
    }
    Ok(())
}

fn validate(config: &Config) -> Result<()> {
    if config.crawl.parallel_connections == 0 {
        bail!("crawl.parallel_connections must be > 0");
    }
    if !MERGE_STRATEGIES.contains(&config.readable.merge.as_str()) {
        bail!(
            "Unknown merge strategy: '{}'. Must be one of {}",
            config.readable.merge,
            MERGE_STRATEGIES.join(", ")
        );
    }
    if config.openrouter.enabled && config.openrouter.model.is_empty() {
        bail!("openrouter.model must be set when the relevance gate is enabled");
    }
    if config.media.n_dominant_colors == 0 {
        bail!("media.n_dominant_colors must be > 0");
    }
    for pattern in &config.media.deny_patterns {
        regex::Regex::new(pattern)
            .with_context(|| format!("Invalid media deny pattern: '{}'", pattern))?;
    }
    for (host, pattern) in &config.heuristics {
        regex::Regex::new(pattern)
            .with_context(|| format!("Invalid heuristic for '{}': '{}'", host, pattern))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        validate(&config).unwrap();
        assert_eq!(config.crawl.parallel_connections, 10);
        assert_eq!(config.readable.merge, "smart_merge");
        assert_eq!(config.openrouter.max_calls_per_run, 500);
        assert_eq!(config.media.min_width, 100);
    }

    #[test]
    fn rejects_unknown_merge_strategy() {
        let mut config = Config::default();
        config.readable.merge = "newest_wins".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_gate_without_model() {
        let mut config = Config::default();
        config.openrouter.enabled = true;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn parses_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [data]
            location = "/tmp/corpus"

            [crawl]
            parallel_connections = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.data.location, PathBuf::from("/tmp/corpus"));
        assert_eq!(config.crawl.parallel_connections, 4);
        // Untouched sections keep their defaults.
        assert_eq!(config.readable.batch_size, 10);
    }
}
