//! Optional LLM relevance gate.
//!
//! When enabled, each candidate page is submitted once to an OpenRouter-style
//! chat endpoint as a yes/no question before local scoring applies. Only a
//! definitive "no" has any effect (score forced to 0, discovery suppressed);
//! ambiguity, errors, timeouts and budget exhaustion all fall back to the
//! local dictionary score — the gate never blocks a run.
//!
//! The call budget is a process-wide atomic counter. Crossing it disables
//! the gate for the remainder of the run with a single notice on stderr.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use crate::config::OpenRouterConfig;
use crate::models::{Expression, Land};

/// Normalized first-word verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Yes,
    No,
    Unknown,
}

pub struct RelevanceGate {
    client: reqwest::Client,
    config: OpenRouterConfig,
    /// Distinct dictionary lemmas of the land, snapshot at run start.
    lemmas: Vec<String>,
    calls: AtomicU32,
    budget_notice_emitted: AtomicBool,
}

impl RelevanceGate {
    /// Build the gate when configuration enables it; `None` otherwise.
    pub fn from_config(config: &OpenRouterConfig, lemmas: Vec<String>) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        if config.api_key.is_empty() || config.model.is_empty() {
            eprintln!("relevance gate disabled: missing API key or model");
            return None;
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .ok()?;
        Some(Self {
            client,
            config: config.clone(),
            lemmas,
            calls: AtomicU32::new(0),
            budget_notice_emitted: AtomicBool::new(false),
        })
    }

    /// Ask the classifier whether the expression belongs in the land.
    ///
    /// `Some(false)` is a veto; `Some(true)` and `None` both proceed with
    /// local scoring.
    pub async fn allows(&self, land: &Land, expression: &Expression) -> Option<bool> {
        if !self.try_consume_budget() {
            return None;
        }

        let prompt = self.build_prompt(land, expression);
        match self.ask(&prompt).await {
            Ok(answer) => match first_word_verdict(&answer) {
                Verdict::No => {
                    println!("gate verdict=no for {}", expression.url);
                    Some(false)
                }
                Verdict::Yes => Some(true),
                Verdict::Unknown => None,
            },
            Err(err) => {
                eprintln!("gate error for {}: {}", expression.url, err);
                None
            }
        }
    }

    /// Reserve one budget slot; past the limit the gate stays off for the
    /// rest of the run.
    fn try_consume_budget(&self) -> bool {
        let used = self.calls.fetch_add(1, Ordering::SeqCst);
        if used >= self.config.max_calls_per_run {
            if !self.budget_notice_emitted.swap(true, Ordering::SeqCst) {
                eprintln!(
                    "relevance gate budget of {} calls reached; disabled for the rest of the run",
                    self.config.max_calls_per_run
                );
            }
            return false;
        }
        true
    }

    fn build_prompt(&self, land: &Land, expression: &Expression) -> String {
        let readable = expression
            .readable
            .as_deref()
            .map(|r| truncate_chars(r, self.config.readable_max_chars))
            .unwrap_or_default();
        format!(
            "We are assembling a corpus of web pages for content analysis and need to know \
             whether the crawled page below belongs in the project.\n\
             Project:\n\
             - Name: {name}\n\
             - Description: {desc}\n\
             - Language: {lang}\n\
             - Key lemmas: {lemmas}\n\
             Page:\n\
             - URL: {url}\n\
             - Title: {title}\n\
             - Description: {page_desc}\n\
             - Body excerpt: {readable}\n\
             Answer with exactly one word: \"yes\" or \"no\".",
            name = land.name,
            desc = land.description,
            lang = land.lang,
            lemmas = self.lemmas.join(", "),
            url = expression.url,
            title = expression.title.as_deref().unwrap_or(""),
            page_desc = expression.description.as_deref().unwrap_or(""),
            readable = readable,
        )
    }

    async fn ask(&self, prompt: &str) -> anyhow::Result<String> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0,
        });
        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("gate endpoint returned {}", status);
        }
        let json: serde_json::Value = response.json().await?;
        let content = json
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or_default();
        Ok(content.to_string())
    }
}

/// Normalize the classifier's first word. French and English affirmatives
/// and negatives are both recognized; anything else is unknown.
pub fn first_word_verdict(answer: &str) -> Verdict {
    let first = answer
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    if first.starts_with("non") || first == "no" {
        Verdict::No
    } else if first.starts_with("oui") || first.starts_with("yes") {
        Verdict::Yes
    } else {
        Verdict::Unknown
    }
}

/// Char-safe truncation.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
