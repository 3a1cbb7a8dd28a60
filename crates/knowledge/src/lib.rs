//! Document knowledge for Docent.
//!
//! Provides the read-only document index view, lexical relevance ranking
//! and citation linking. Nothing here performs generation or persistence.

pub mod catalog;
pub mod citation;
pub mod rank;
pub mod types;


// Re-export commonly used types
pub use catalog::{CatalogDocumentIndex, DocumentIndex, MemoryDocumentIndex};
pub use citation::{
    link, retrieval_citations, CitationCandidate, LinkedAnswer, LINKED_CITATION_SCORE,
    RETRIEVAL_CITATION_SCORE,
};
pub use rank::{rank_documents, rank_scope, DEFAULT_LIMIT};
pub use types::{
    Document, DocumentCategory, DocumentKind, DocumentStatus, RankedDocument, ScopeContext,
};
