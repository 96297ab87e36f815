//! Tokenization, stemming and relevance scoring.
//!
//! A land's dictionary is the set of distinct lemmas over its terms. Scoring
//! is integer and deterministic:
//!
//! ```text
//! score = 10 · (dictionary lemma hits in the title)
//!        +  1 · (dictionary lemma hits in the readable body)
//! ```
//!
//! Tokens are produced at Unicode word boundaries, folded to lower case with
//! diacritics stripped, then stemmed with the Snowball stemmer matching the
//! land language (French and English; any other language code falls back to
//! the folded token itself).
//!
//! If an expression carries a detected language that does not prefix-match
//! the land language, its score is forced to 0 regardless of content.

use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

/// Title tokens weigh ten times a body token.
const TITLE_WEIGHT: i64 = 10;
const BODY_WEIGHT: i64 = 1;

/// Language-keyed lemmatizer. Construction is cheap; one instance is shared
/// read-only for the duration of a run.
pub struct Lemmatizer {
    stemmer: Option<Stemmer>,
}

impl Lemmatizer {
    /// Select the stemmer from a land language code (`fr`, `fr-FR`, `en`, …).
    /// Unknown languages get an identity fallback.
    pub fn for_language(lang: &str) -> Self {
        let lang = lang.to_ascii_lowercase();
        let algorithm = if lang.starts_with("fr") {
            Some(Algorithm::French)
        } else if lang.starts_with("en") {
            Some(Algorithm::English)
        } else {
            None
        };
        Self {
            stemmer: algorithm.map(Stemmer::create),
        }
    }

    /// Fold and stem a single token.
    pub fn lemma(&self, token: &str) -> String {
        let folded = fold(token);
        match &self.stemmer {
            Some(stemmer) => stemmer.stem(&folded).to_string(),
            None => folded,
        }
    }
}

/// Lower-case and strip diacritics (NFD decomposition, combining marks
/// removed).
pub fn fold(token: &str) -> String {
    token
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Split at Unicode word boundaries. Apostrophes split further so French
/// elisions (`l'asthme`) expose the noun to the dictionary.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.unicode_words()
        .flat_map(|word| word.split(['\'', '\u{2019}']))
        .filter(|token| !token.is_empty())
        .collect()
}

/// Count tokens of `text` whose lemma belongs to the dictionary.
fn lemma_hits(text: &str, dictionary: &HashSet<String>, lemmatizer: &Lemmatizer) -> i64 {
    tokenize(text)
        .iter()
        .filter(|token| dictionary.contains(&lemmatizer.lemma(token)))
        .count() as i64
}

/// Case-insensitive prefix match on language codes: `fr` accepts `fr`,
/// `fr-FR` and `FR`; it rejects `en`. An absent detected language always
/// matches.
pub fn language_matches(detected: Option<&str>, land_lang: &str) -> bool {
    match detected {
        None => true,
        Some(code) => {
            let code = code.trim().to_ascii_lowercase();
            if code.is_empty() {
                return true;
            }
            let land = land_lang.trim().to_ascii_lowercase();
            code.starts_with(&land) || land.starts_with(&code)
        }
    }
}

/// Compute the integer relevance of a page.
///
/// `body` is the readable text, falling back to extracted HTML text when no
/// refinement has happened. Empty dictionary or a language mismatch yields 0.
pub fn relevance(
    title: Option<&str>,
    body: Option<&str>,
    detected_lang: Option<&str>,
    land_lang: &str,
    dictionary: &HashSet<String>,
    lemmatizer: &Lemmatizer,
) -> i64 {
    if dictionary.is_empty() || !language_matches(detected_lang, land_lang) {
        return 0;
    }
    let title_hits = title.map_or(0, |t| lemma_hits(t, dictionary, lemmatizer));
    let body_hits = body.map_or(0, |b| lemma_hits(b, dictionary, lemmatizer));
    TITLE_WEIGHT * title_hits + BODY_WEIGHT * body_hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn french_dictionary(terms: &[&str]) -> (HashSet<String>, Lemmatizer) {
        let lemmatizer = Lemmatizer::for_language("fr");
        let dictionary = terms.iter().map(|t| lemmatizer.lemma(t)).collect();
        (dictionary, lemmatizer)
    }

    #[test]
    fn fold_strips_diacritics_and_case() {
        assert_eq!(fold("Pollué"), "pollue");
        assert_eq!(fold("ASTHME"), "asthme");
        assert_eq!(fold("Müller"), "muller");
    }

    #[test]
    fn tokenize_uses_word_boundaries() {
        let tokens = tokenize("L'asthme, et la pollution urbaine!");
        assert!(tokens.contains(&"asthme"));
        assert!(tokens.contains(&"pollution"));
        assert!(!tokens.iter().any(|t| t.contains(',')));
    }

    #[test]
    fn french_inflections_share_a_lemma() {
        let lemmatizer = Lemmatizer::for_language("fr");
        assert_eq!(lemmatizer.lemma("pollution"), lemmatizer.lemma("pollutions"));
    }

    #[test]
    fn identity_fallback_for_unknown_language() {
        let lemmatizer = Lemmatizer::for_language("de");
        assert_eq!(lemmatizer.lemma("Häuser"), "hauser");
    }

    #[test]
    fn title_counts_ten_body_counts_one() {
        let (dictionary, lemmatizer) = french_dictionary(&["asthme", "pollution"]);
        let score = relevance(
            Some("Asthme et pollution urbaine"),
            Some("La pollution aggrave la pollution. Pollution partout."),
            None,
            "fr",
            &dictionary,
            &lemmatizer,
        );
        // 2 title hits, 3 body hits.
        assert_eq!(score, 10 * 2 + 3);
    }

    #[test]
    fn language_mismatch_forces_zero() {
        let (dictionary, lemmatizer) = french_dictionary(&["pollution"]);
        let score = relevance(
            Some("pollution pollution"),
            Some("pollution"),
            Some("en"),
            "fr",
            &dictionary,
            &lemmatizer,
        );
        assert_eq!(score, 0);
    }

    #[test]
    fn regional_codes_prefix_match() {
        assert!(language_matches(Some("fr-FR"), "fr"));
        assert!(language_matches(Some("FR"), "fr"));
        assert!(language_matches(Some("fr"), "fr-FR"));
        assert!(!language_matches(Some("en-US"), "fr"));
        assert!(language_matches(None, "fr"));
        assert!(language_matches(Some(""), "fr"));
    }

    #[test]
    fn empty_dictionary_scores_zero() {
        let lemmatizer = Lemmatizer::for_language("fr");
        let dictionary = HashSet::new();
        assert_eq!(
            relevance(Some("pollution"), Some("pollution"), None, "fr", &dictionary, &lemmatizer),
            0
        );
    }

    #[test]
    fn missing_fields_contribute_nothing() {
        let (dictionary, lemmatizer) = french_dictionary(&["pollution"]);
        assert_eq!(relevance(None, None, None, "fr", &dictionary, &lemmatizer), 0);
        assert_eq!(
            relevance(Some(""), Some(""), None, "fr", &dictionary, &lemmatizer),
            0
        );
    }

    #[test]
    fn score_is_deterministic() {
        let (dictionary, lemmatizer) = french_dictionary(&["asthme", "pollution"]);
        let run = || {
            relevance(
                Some("Asthme et pollution urbaine"),
                Some("pollution pollution pollution"),
                Some("fr"),
                "fr",
                &dictionary,
                &lemmatizer,
            )
        };
        assert_eq!(run(), run());
    }
}
