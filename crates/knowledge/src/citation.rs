//! Citation linking.
//!
//! The model cites sources with literal `[Source N]` markers, where N is the
//! 1-based position of the document in the ranked list the prompt was built
//! from. That list is the arena; `N - 1` is the index. The linker must be
//! given the same list, unchanged.

use crate::types::{DocumentCategory, DocumentKind, RankedDocument};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Confidence recorded for a citation the model made explicitly.
pub const LINKED_CITATION_SCORE: f32 = 0.9;

/// Confidence recorded for a citation attached from retrieval alone.
pub const RETRIEVAL_CITATION_SCORE: f32 = 0.8;

fn marker_pattern() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"\[Source (\d+)\]").expect("static regex"))
}

/// A resolved citation, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationCandidate {
    pub document_id: String,
    pub title: String,
    pub kind: DocumentKind,
    pub category: Option<DocumentCategory>,

    /// 1-based position in the ranked list
    pub source_number: usize,

    /// First marker text that resolved to this document, e.g. "[Source 2]"
    pub marker: Option<String>,

    pub score: f32,
}

impl CitationCandidate {
    fn from_ranked(ranked: &RankedDocument, source_number: usize, marker: Option<String>, score: f32) -> Self {
        let document = &ranked.document;
        Self {
            document_id: document.id.clone(),
            title: document.title.clone(),
            kind: document.kind,
            category: document.category,
            source_number,
            marker,
            score,
        }
    }
}

/// Generated text paired with the citations resolved from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedAnswer {
    /// The generated text, unmodified; markers stay visible
    pub text: String,
    pub citations: Vec<CitationCandidate>,
}

/// Resolve the markers in `generated_text` against `ranked`.
///
/// Out-of-range markers are dropped with a warning. Citations are
/// deduplicated by document id, keeping first-occurrence order.
pub fn link(generated_text: String, ranked: &[RankedDocument]) -> LinkedAnswer {
    let mut seen = HashSet::new();
    let mut citations = Vec::new();
    let mut misses = 0usize;

    for caps in marker_pattern().captures_iter(&generated_text) {
        let marker = &caps[0];
        let resolved = caps[1]
            .parse::<usize>()
            .ok()
            .filter(|n| *n >= 1)
            .and_then(|n| ranked.get(n - 1).map(|doc| (n, doc)));

        let Some((number, doc)) = resolved else {
            misses += 1;
            tracing::warn!(
                marker,
                available = ranked.len(),
                "Dropping citation marker with no matching source"
            );
            continue;
        };

        if seen.insert(doc.document.id.clone()) {
            citations.push(CitationCandidate::from_ranked(
                doc,
                number,
                Some(marker.to_string()),
                LINKED_CITATION_SCORE,
            ));
        }
    }

    tracing::debug!(citations = citations.len(), misses, "Linked citations");

    LinkedAnswer {
        text: generated_text,
        citations,
    }
}

/// Citations for the first `count` ranked documents at retrieval confidence,
/// deduplicated by document id.
pub fn retrieval_citations(ranked: &[RankedDocument], count: usize) -> Vec<CitationCandidate> {
    let mut seen = HashSet::new();
    ranked
        .iter()
        .enumerate()
        .filter(|(_, doc)| seen.insert(doc.document.id.clone()))
        .take(count)
        .map(|(i, doc)| CitationCandidate::from_ranked(doc, i + 1, None, RETRIEVAL_CITATION_SCORE))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Document;

    fn ranked(ids: &[&str]) -> Vec<RankedDocument> {
        ids.iter()
            .map(|id| RankedDocument {
                document: Document::new(*id, "s", format!("Title {}", id)),
                score: 1.0,
            })
            .collect()
    }

    #[test]
    fn test_out_of_range_marker_dropped() {
        let docs = ranked(&["a", "b"]);
        let linked = link("See [Source 1] and [Source 4]".to_string(), &docs);

        assert_eq!(linked.citations.len(), 1);
        assert_eq!(linked.citations[0].document_id, "a");
        assert_eq!(linked.citations[0].source_number, 1);
        assert_eq!(linked.citations[0].score, LINKED_CITATION_SCORE);
        assert_eq!(linked.text, "See [Source 1] and [Source 4]");
    }

    #[test]
    fn test_zero_marker_dropped() {
        let docs = ranked(&["a"]);
        assert!(link("[Source 0]".to_string(), &docs).citations.is_empty());
    }

    #[test]
    fn test_huge_marker_dropped() {
        let docs = ranked(&["a"]);
        let linked = link("[Source 99999999999999999999999]".to_string(), &docs);
        assert!(linked.citations.is_empty());
    }

    #[test]
    fn test_repeated_marker_deduplicated() {
        let docs = ranked(&["a"]);
        let linked = link("[Source 1] ... [Source 1]".to_string(), &docs);
        assert_eq!(linked.citations.len(), 1);
    }

    #[test]
    fn test_same_document_listed_twice_collapses() {
        let mut docs = ranked(&["a", "b"]);
        docs.push(docs[0].clone());

        let linked = link("[Source 3] then [Source 2] then [Source 1]".to_string(), &docs);
        let ids: Vec<&str> = linked.citations.iter().map(|c| c.document_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(linked.citations[0].marker.as_deref(), Some("[Source 3]"));
        assert!(linked.text.contains("[Source 1]"));
    }

    #[test]
    fn test_first_occurrence_order() {
        let docs = ranked(&["a", "b", "c"]);
        let linked = link("[Source 3] [Source 1] [Source 3] [Source 2]".to_string(), &docs);
        let ids: Vec<&str> = linked.citations.iter().map(|c| c.document_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_malformed_markers_ignored() {
        let docs = ranked(&["a"]);
        let linked = link("[source 1] [Source one] [Source  1] Source 1".to_string(), &docs);
        assert!(linked.citations.is_empty());
    }

    #[test]
    fn test_no_sources_means_no_citations() {
        let linked = link("[Source 1]".to_string(), &[]);
        assert!(linked.citations.is_empty());
    }

    #[test]
    fn test_retrieval_citations() {
        let docs = ranked(&["a", "b", "c"]);
        let cites = retrieval_citations(&docs, 2);
        assert_eq!(cites.len(), 2);
        assert!(cites.iter().all(|c| c.score == RETRIEVAL_CITATION_SCORE));
        assert!(cites.iter().all(|c| c.marker.is_none()));
        assert_eq!(cites[1].source_number, 2);
    }
}
