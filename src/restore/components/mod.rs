pub(crate) mod blob_storage;
pub(crate) mod database;
pub(crate) mod document_store;
pub(crate) mod filesystem;

use async_trait::async_trait;
use std::path::Path;

use crate::errors::Result;
use crate::restore::manifest::Component;

pub use blob_storage::{BlobStorageRestorer, BlobStore};
pub use database::DatabaseRestorer;
pub use document_store::{DocumentStore, DocumentStoreRestorer, WriteOp};
pub use filesystem::FilesystemRestorer;

/// Outcome of one component restorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentReport {
    pub component: Component,
    pub restored: usize,
    pub failed: usize,
    /// Set when the component was skipped as a whole (e.g. no database configured).
    pub skipped: Option<String>,
}

impl ComponentReport {
    pub fn new(component: Component) -> Self {
        ComponentReport { component, restored: 0, failed: 0, skipped: None }
    }

    pub fn skipped(component: Component, reason: impl Into<String>) -> Self {
        ComponentReport { skipped: Some(reason.into()), ..ComponentReport::new(component) }
    }

    pub fn summary(&self) -> String {
        match &self.skipped {
            Some(reason) => format!("{} skipped: {}", self.component, reason),
            None if self.failed > 0 => format!(
                "{} restored {} item(s), {} failed",
                self.component, self.restored, self.failed
            ),
            None => format!("{} restored {} item(s)", self.component, self.restored),
        }
    }
}

/// One restore strategy, selected by a manifest component flag.
#[async_trait]
pub trait ComponentRestorer: Send + Sync {
    fn component(&self) -> Component;

    /// Whether item-level failures are logged and skipped instead of aborting the run.
    fn continues_on_item_failure(&self) -> bool;

    async fn restore(&self, staged_root: &Path) -> Result<ComponentReport>;
}
