//! Document sync client.
//!
//! Runs create/rename/delete/list against the backend and applies the
//! confirmed result to the registry. Nothing is applied optimistically: the
//! registry changes only after the server has answered with success, and a
//! failed call leaves it exactly as it was. No call is retried.

use chrono::{NaiveDate, Utc};
use tracing::debug;

use crate::api::ApiClient;
use crate::error::{ClientError, Result};
use crate::models::{DocumentId, DocumentSummary};
use crate::registry::DocumentRegistry;

pub const BLANK_NAME: &str = "Please enter a mindmap name!";
pub const NO_SELECTION: &str = "Select a mindmap first";

#[derive(Debug)]
pub struct DocumentSync {
    api: ApiClient,
    registry: DocumentRegistry,
}

impl DocumentSync {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            registry: DocumentRegistry::new(),
        }
    }

    pub const fn registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DocumentRegistry {
        &mut self.registry
    }

    /// Hydrate the registry from the backend, replacing its contents.
    pub async fn list(&mut self) -> Result<usize> {
        let remote = self.api.list_documents().await?;
        let today = today();
        let documents: Vec<DocumentSummary> = remote
            .into_iter()
            .map(|d| DocumentSummary::normalized(d.id, d.name, d.updated_at, d.color, today))
            .collect();

        debug!(count = documents.len(), "hydrated registry");
        self.registry.replace_all(documents);
        Ok(self.registry.len())
    }

    /// Create a document, prepend it and select it.
    pub async fn create(&mut self, name: &str) -> Result<DocumentId> {
        let name = non_blank(name)?;
        let created = self.api.create_document(name).await?;
        debug!(id = %created.id, root = ?created.root_node_id, "created document");

        let name = created
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| name.to_string());
        let summary = DocumentSummary::normalized(created.id.clone(), name, None, None, today());
        self.registry.prepend_and_select(summary);
        Ok(created.id)
    }

    /// Rename document `id`. A document must be selected.
    ///
    /// The name the server echoes back wins; the requested name is used only
    /// when the response omits it.
    pub async fn rename(&mut self, id: &DocumentId, new_name: &str) -> Result<()> {
        if self.registry.selected_id().is_none() {
            return Err(ClientError::Precondition(NO_SELECTION.to_string()));
        }
        let new_name = non_blank(new_name)?;

        let renamed = self.api.rename_document(id, new_name).await?;
        let name = renamed
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| new_name.to_string());
        let updated = renamed.updated_at.map_or_else(today, |t| t.date_naive());

        if !self.registry.rename(id, &name, updated) {
            debug!(%id, "renamed document is not in the registry");
        }
        Ok(())
    }

    /// Delete document `id`; clears the selection if it was selected.
    pub async fn delete(&mut self, id: &DocumentId) -> Result<()> {
        self.api.delete_document(id).await?;
        self.registry.remove(id);
        Ok(())
    }

    /// Content persistence does not exist yet; saving only checks that there
    /// is something selected.
    pub fn save(&self) -> Result<&DocumentSummary> {
        self.registry
            .selected()
            .ok_or_else(|| ClientError::Precondition(NO_SELECTION.to_string()))
    }
}

fn non_blank(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(ClientError::Precondition(BLANK_NAME.to_string()))
    } else {
        Ok(trimmed)
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
