//! Read-only document index views.
//!
//! The repository that owns documents is an external collaborator. The core
//! only needs the eligible documents of one scope plus that scope's
//! descriptive metadata, both loaded before any ranking happens.

use crate::types::{Document, ScopeContext};
use docent_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Trait for document index views.
///
/// Implementations must exclude archived and rejected documents from
/// `list_eligible`. Ordering is unspecified; the ranker sorts.
pub trait DocumentIndex: Send + Sync {
    /// Eligible documents of a scope.
    fn list_eligible(&self, scope: &str) -> AppResult<Vec<Document>>;

    /// Metadata of a scope, `None` when the scope is unknown.
    fn scope_context(&self, scope: &str) -> AppResult<Option<ScopeContext>>;
}

/// In-process index over a fixed set of scopes and documents.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentIndex {
    scopes: HashMap<String, ScopeContext>,
    documents: Vec<Document>,
}

impl MemoryDocumentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scope(mut self, scope: ScopeContext) -> Self {
        self.add_scope(scope);
        self
    }

    pub fn with_document(mut self, document: Document) -> Self {
        self.add_document(document);
        self
    }

    pub fn add_scope(&mut self, scope: ScopeContext) {
        self.scopes.insert(scope.id.clone(), scope);
    }

    /// Add a document; a document with the same id replaces the old one in place.
    pub fn add_document(&mut self, document: Document) {
        match self.documents.iter_mut().find(|d| d.id == document.id) {
            Some(existing) => *existing = document,
            None => self.documents.push(document),
        }
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

impl DocumentIndex for MemoryDocumentIndex {
    fn list_eligible(&self, scope: &str) -> AppResult<Vec<Document>> {
        Ok(self
            .documents
            .iter()
            .filter(|d| d.scope == scope && d.is_eligible())
            .cloned()
            .collect())
    }

    fn scope_context(&self, scope: &str) -> AppResult<Option<ScopeContext>> {
        Ok(self.scopes.get(scope).cloned())
    }
}

/// On-disk catalog layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    scopes: Vec<ScopeContext>,
    #[serde(default)]
    documents: Vec<Document>,
}

/// Index view loaded from a YAML catalog file.
///
/// ```yaml
/// scopes:
///   - id: hplc-1
///     name: Agilent 1260 Infinity II
///     vendor: Agilent
///     models: ["G7111B"]
/// documents:
///   - id: doc-1
///     scope: hplc-1
///     title: Startup SOP
///     category: sop
///     status: approved
/// ```
#[derive(Debug, Clone, Default)]
pub struct CatalogDocumentIndex {
    inner: MemoryDocumentIndex,
}

impl CatalogDocumentIndex {
    /// Load a catalog. A missing file yields an empty catalog.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            tracing::warn!("Document catalog not found at {:?}; using an empty catalog", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Knowledge(format!("Failed to read catalog {:?}: {}", path, e))
        })?;

        Self::from_yaml(&contents)
            .map_err(|e| AppError::Knowledge(format!("Invalid catalog {:?}: {}", path, e)))
    }

    /// Parse a catalog from YAML text.
    pub fn from_yaml(contents: &str) -> AppResult<Self> {
        let file: CatalogFile = serde_yaml::from_str(contents)?;

        let mut inner = MemoryDocumentIndex::new();
        for scope in file.scopes {
            inner.add_scope(scope);
        }
        for document in file.documents {
            if !inner.scopes.contains_key(&document.scope) {
                tracing::warn!(
                    document = %document.id,
                    scope = %document.scope,
                    "Catalog document references an undeclared scope"
                );
            }
            inner.add_document(document);
        }

        tracing::debug!(
            scopes = inner.scope_count(),
            documents = inner.document_count(),
            "Loaded document catalog"
        );

        Ok(Self { inner })
    }

    pub fn scope_count(&self) -> usize {
        self.inner.scope_count()
    }

    pub fn document_count(&self) -> usize {
        self.inner.document_count()
    }
}

impl DocumentIndex for CatalogDocumentIndex {
    fn list_eligible(&self, scope: &str) -> AppResult<Vec<Document>> {
        self.inner.list_eligible(scope)
    }

    fn scope_context(&self, scope: &str) -> AppResult<Option<ScopeContext>> {
        self.inner.scope_context(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentCategory, DocumentStatus};
    use tempfile::TempDir;

    const CATALOG: &str = r#"
scopes:
  - id: hplc-1
    name: Agilent 1260 Infinity II
    vendor: Agilent
    models: ["G7111B", "G7129A"]
    description: Quaternary HPLC system
documents:
  - id: doc-1
    scope: hplc-1
    title: Startup SOP
    description: Purge, equilibrate, run blank.
    category: sop
    status: approved
  - id: doc-2
    scope: hplc-1
    title: Old manual
    category: manual
    archived: true
  - id: doc-3
    scope: hplc-1
    title: Bad scan
    kind: image
    status: rejected
  - id: doc-4
    scope: flow-9
    title: Cytometer manual
"#;

    #[test]
    fn test_catalog_filters_ineligible_documents() {
        let index = CatalogDocumentIndex::from_yaml(CATALOG).unwrap();
        assert_eq!(index.document_count(), 4);

        let docs = index.list_eligible("hplc-1").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "doc-1");
        assert_eq!(docs[0].category, Some(DocumentCategory::Sop));
        assert_eq!(docs[0].status, DocumentStatus::Approved);
    }

    #[test]
    fn test_catalog_scope_context() {
        let index = CatalogDocumentIndex::from_yaml(CATALOG).unwrap();
        let scope = index.scope_context("hplc-1").unwrap().unwrap();
        assert_eq!(scope.name, "Agilent 1260 Infinity II");
        assert_eq!(scope.models, vec!["G7111B", "G7129A"]);
        assert!(index.scope_context("unknown").unwrap().is_none());
    }

    #[test]
    fn test_missing_catalog_is_empty() {
        let temp = TempDir::new().unwrap();
        let index = CatalogDocumentIndex::load(&temp.path().join("catalog.yaml")).unwrap();
        assert_eq!(index.document_count(), 0);
        assert!(index.list_eligible("hplc-1").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_catalog_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("catalog.yaml");
        std::fs::write(&path, "documents: [{ id: 1 }]").unwrap();
        assert!(matches!(
            CatalogDocumentIndex::load(&path),
            Err(AppError::Knowledge(_))
        ));
    }

    #[test]
    fn test_memory_index_replaces_same_id() {
        let mut index = MemoryDocumentIndex::new();
        index.add_document(Document::new("d1", "s", "First"));
        index.add_document(Document::new("d2", "s", "Second"));
        index.add_document(Document::new("d1", "s", "First, revised"));

        let docs = index.list_eligible("s").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].title, "First, revised");
    }
}
