//! The active set of search terms edited before a scan.

use uuid::Uuid;

use crate::errors::{ClientError, ClientResult};
use crate::models::{SearchTerm, TermCategory};

/// Insertion-ordered terms, unique case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct SearchTermSet {
    terms: Vec<SearchTerm>,
}

impl SearchTermSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a trimmed term. Empty values and case-insensitive duplicates are
    /// rejected and leave the set unchanged.
    pub fn add(&mut self, value: &str, category: TermCategory) -> ClientResult<SearchTerm> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ClientError::validation("Search term cannot be empty"));
        }
        if self
            .terms
            .iter()
            .any(|term| term.value.to_lowercase() == value.to_lowercase())
        {
            return Err(ClientError::validation(format!(
                "'{}' is already in the search list",
                value
            )));
        }

        let term = SearchTerm {
            id: Uuid::now_v7().to_string(),
            value: value.to_string(),
            category,
        };
        self.terms.push(term.clone());
        Ok(term)
    }

    /// Removes the term with `id`, returning it if present.
    pub fn remove(&mut self, id: &str) -> Option<SearchTerm> {
        let index = self.terms.iter().position(|term| term.id == id)?;
        Some(self.terms.remove(index))
    }

    pub fn clear(&mut self) {
        self.terms.clear();
    }

    /// Term values in insertion order, as sent to the scan endpoint.
    pub fn values(&self) -> Vec<String> {
        self.terms.iter().map(|term| term.value.clone()).collect()
    }

    pub fn terms(&self) -> &[SearchTerm] {
        &self.terms
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchTerm> {
        self.terms.iter()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
