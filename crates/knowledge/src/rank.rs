//! Lexical relevance ranking.
//!
//! Score = sum over query tokens of the token's substring occurrence count in
//! `"{title} {description} {category}"` (case-folded), times 1.5 for
//! authoritative categories. Zero-score documents are dropped. Linear in
//! documents x tokens; scopes hold tens to hundreds of documents.

use crate::catalog::DocumentIndex;
use crate::types::{Document, RankedDocument};
use docent_core::AppResult;
use regex::Regex;
use std::cmp::Ordering;
use std::sync::OnceLock;

/// Default number of documents returned.
pub const DEFAULT_LIMIT: usize = 5;

/// Multiplier for manual, troubleshooting and SOP documents.
pub const AUTHORITATIVE_BOOST: f64 = 1.5;

/// Tokens of this many characters or fewer are discarded.
const MIN_TOKEN_CHARS: usize = 3;

fn word_pattern() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"\w+").expect("static regex"))
}

/// Split a query into case-folded word tokens longer than three characters.
///
/// Repeated words are kept; each occurrence contributes to the score.
pub fn tokenize(query: &str) -> Vec<String> {
    word_pattern()
        .find_iter(query)
        .map(|m| m.as_str().to_lowercase())
        .filter(|token| token.chars().count() > MIN_TOKEN_CHARS)
        .collect()
}

/// Case-folded text a document is matched against.
pub fn searchable_text(document: &Document) -> String {
    format!(
        "{} {} {}",
        document.title,
        document.description.as_deref().unwrap_or(""),
        document.category.map(|c| c.as_str()).unwrap_or("")
    )
    .to_lowercase()
}

/// Score one document against pre-tokenized query terms.
pub fn score_document(document: &Document, tokens: &[String]) -> f64 {
    let text = searchable_text(document);
    let raw: usize = tokens.iter().map(|t| text.matches(t.as_str()).count()).sum();

    let mut score = raw as f64;
    if document.category.is_some_and(|c| c.is_authoritative()) {
        score *= AUTHORITATIVE_BOOST;
    }
    score
}

/// Rank already-loaded documents against a query.
///
/// Returns at most `limit` documents with a positive score, in descending
/// score order. Ties keep the input order. Ineligible documents are skipped
/// even if the index view let them through.
pub fn rank_documents(documents: &[Document], query: &str, limit: usize) -> Vec<RankedDocument> {
    let tokens = tokenize(query);
    if tokens.is_empty() {
        tracing::debug!("Query has no rankable tokens");
        return Vec::new();
    }

    let mut ranked: Vec<RankedDocument> = documents
        .iter()
        .filter(|d| d.is_eligible())
        .filter_map(|d| {
            let score = score_document(d, &tokens);
            (score > 0.0).then(|| RankedDocument {
                document: d.clone(),
                score,
            })
        })
        .collect();

    // Vec::sort_by is stable, so equal scores keep iteration order
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    ranked.truncate(limit);

    tracing::debug!(
        tokens = tokens.len(),
        candidates = documents.len(),
        matched = ranked.len(),
        "Ranked documents"
    );

    ranked
}

/// Load a scope's eligible documents from an index view, then rank them.
pub fn rank_scope(
    index: &dyn DocumentIndex,
    scope: &str,
    query: &str,
    limit: usize,
) -> AppResult<Vec<RankedDocument>> {
    let documents = index.list_eligible(scope)?;
    Ok(rank_documents(&documents, query, limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentCategory;

    #[test]
    fn test_tokenize_drops_short_words() {
        assert_eq!(
            tokenize("How do I purge the HPLC pump at 5 mL/min?"),
            vec!["purge", "hplc", "pump"]
        );
    }

    #[test]
    fn test_tokenize_keeps_repeats() {
        assert_eq!(tokenize("lamp Lamp"), vec!["lamp", "lamp"]);
    }

    #[test]
    fn test_substring_matches_count() {
        let doc = Document::new("d", "s", "Recalibration and calibration");
        let tokens = tokenize("calibration");
        assert_eq!(score_document(&doc, &tokens), 2.0);
    }

    #[test]
    fn test_category_text_is_searchable() {
        let doc = Document::new("d", "s", "Weekly checks").with_category(DocumentCategory::Maintenance);
        assert_eq!(score_document(&doc, &tokenize("maintenance")), 1.0);
    }

    #[test]
    fn test_authoritative_boost_is_exactly_one_and_a_half() {
        let base = Document::new("d", "s", "Detector lamp replacement")
            .with_description("Replace the detector lamp after 2000 hours");
        let tokens = tokenize("detector lamp");

        let plain = score_document(
            &base.clone().with_category(DocumentCategory::Training),
            &tokens,
        );
        for category in [
            DocumentCategory::Manual,
            DocumentCategory::Troubleshooting,
            DocumentCategory::Sop,
        ] {
            let boosted = score_document(&base.clone().with_category(category), &tokens);
            assert_eq!(boosted, plain * 1.5);
        }
    }

    #[test]
    fn test_zero_score_documents_excluded() {
        let docs = vec![
            Document::new("a", "s", "Column care"),
            Document::new("b", "s", "Injector cleaning"),
        ];
        let ranked = rank_documents(&docs, "column", 5);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].document.id, "a");
    }

    #[test]
    fn test_no_matching_tokens_yields_empty() {
        let docs = vec![Document::new("a", "s", "Column care")];
        assert!(rank_documents(&docs, "spectrometer", 5).is_empty());
        assert!(rank_documents(&docs, "a an the", 5).is_empty());
    }

    #[test]
    fn test_limit_and_order() {
        let docs: Vec<Document> = (1..=8)
            .map(|i| {
                Document::new(format!("d{}", i), "s", "pump ".repeat(i))
            })
            .collect();

        let ranked = rank_documents(&docs, "pump", 3);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].document.id, "d8");
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_ties_keep_input_order() {
        let docs = vec![
            Document::new("first", "s", "pump seal"),
            Document::new("second", "s", "pump valve"),
            Document::new("third", "s", "pump head"),
        ];
        let ranked = rank_documents(&docs, "pump", 5);
        let ids: Vec<&str> = ranked.iter().map(|r| r.document.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_ineligible_documents_skipped() {
        let docs = vec![
            Document::new("old", "s", "pump manual").archived(),
            Document::new("new", "s", "pump manual"),
        ];
        let ranked = rank_documents(&docs, "pump", 5);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].document.id, "new");
    }
}
