//! Document registry: the in-memory mirror of the user's documents.
//!
//! Holds only server-confirmed state. Order is whatever the last hydration
//! returned, with creations prepended; nothing here reorders entries.

use chrono::NaiveDate;

use crate::models::{DocumentId, DocumentSummary};

#[derive(Debug, Default, Clone)]
pub struct DocumentRegistry {
    documents: Vec<DocumentSummary>,
    selected: Option<DocumentId>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self) -> &[DocumentSummary] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: &DocumentId) -> Option<&DocumentSummary> {
        self.documents.iter().find(|d| &d.id == id)
    }

    /// Documents whose name contains `term`, ignoring case. An empty term
    /// matches everything.
    pub fn filter(&self, term: &str) -> Vec<&DocumentSummary> {
        let needle = term.to_lowercase();
        self.documents
            .iter()
            .filter(|d| d.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Replace the whole list with a fresh hydration.
    ///
    /// Duplicate ids keep their first occurrence. A selection that no longer
    /// exists is dropped.
    pub fn replace_all(&mut self, documents: Vec<DocumentSummary>) {
        let mut unique: Vec<DocumentSummary> = Vec::with_capacity(documents.len());
        for doc in documents {
            if !unique.iter().any(|d| d.id == doc.id) {
                unique.push(doc);
            }
        }
        self.documents = unique;

        if let Some(id) = &self.selected {
            if self.get(id).is_none() {
                self.selected = None;
            }
        }
    }

    /// Insert a newly created document at the head and select it.
    pub fn prepend_and_select(&mut self, document: DocumentSummary) {
        self.documents.retain(|d| d.id != document.id);
        self.selected = Some(document.id.clone());
        self.documents.insert(0, document);
    }

    /// Update name and date of the entry with `id`. Returns false if absent.
    pub fn rename(&mut self, id: &DocumentId, name: &str, updated: NaiveDate) -> bool {
        match self.documents.iter_mut().find(|d| &d.id == id) {
            Some(doc) => {
                doc.name = name.to_string();
                doc.updated = updated;
                true
            }
            None => false,
        }
    }

    /// Remove the entry with `id`, clearing the selection if it pointed there.
    pub fn remove(&mut self, id: &DocumentId) -> Option<DocumentSummary> {
        let index = self.documents.iter().position(|d| &d.id == id)?;
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        Some(self.documents.remove(index))
    }

    /// Make `id` the current document. Returns false if it is not listed.
    pub fn select(&mut self, id: &DocumentId) -> bool {
        if self.get(id).is_some() {
            self.selected = Some(id.clone());
            true
        } else {
            false
        }
    }

    pub fn selected(&self) -> Option<&DocumentSummary> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }

    pub fn selected_id(&self) -> Option<&DocumentId> {
        self.selected.as_ref()
    }

    /// Drop everything (used on logout).
    pub fn clear(&mut self) {
        self.documents.clear();
        self.selected = None;
    }
}
