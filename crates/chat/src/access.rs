//! Access policy collaborator.
//!
//! Identity is supplied by the caller; the policy only decides whether a
//! principal may ask about a scope.

use docent_core::{AppError, AppResult};
use std::collections::{HashMap, HashSet};

pub trait AccessPolicy: Send + Sync {
    /// `Err(AppError::Forbidden)` when `principal` may not use `scope`.
    fn check_scope(&self, principal: Option<&str>, scope: &str) -> AppResult<()>;
}

/// Permits every principal on every scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn check_scope(&self, _principal: Option<&str>, _scope: &str) -> AppResult<()> {
        Ok(())
    }
}

/// Explicit per-principal scope grants. Anonymous callers get `public` scopes only.
#[derive(Debug, Clone, Default)]
pub struct ScopeAllowList {
    grants: HashMap<String, HashSet<String>>,
    public: HashSet<String>,
}

impl ScopeAllowList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, principal: impl Into<String>, scope: impl Into<String>) -> Self {
        self.grants
            .entry(principal.into())
            .or_default()
            .insert(scope.into());
        self
    }

    pub fn public_scope(mut self, scope: impl Into<String>) -> Self {
        self.public.insert(scope.into());
        self
    }
}

impl AccessPolicy for ScopeAllowList {
    fn check_scope(&self, principal: Option<&str>, scope: &str) -> AppResult<()> {
        if self.public.contains(scope) {
            return Ok(());
        }

        let granted = principal
            .and_then(|p| self.grants.get(p))
            .is_some_and(|scopes| scopes.contains(scope));

        if granted {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "{} may not access scope {}",
                principal.unwrap_or("anonymous caller"),
                scope
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all() {
        assert!(AllowAll.check_scope(None, "anything").is_ok());
    }

    #[test]
    fn test_allow_list() {
        let policy = ScopeAllowList::new()
            .grant("ana", "hplc")
            .public_scope("demo");

        assert!(policy.check_scope(Some("ana"), "hplc").is_ok());
        assert!(policy.check_scope(None, "demo").is_ok());
        assert!(matches!(
            policy.check_scope(Some("ana"), "nmr"),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            policy.check_scope(None, "hplc"),
            Err(AppError::Forbidden(_))
        ));
    }
}
