use thiserror::Error;

use crate::restore::manifest::Component;

#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Verification failed: missing component data for {}", format_components(.missing))]
    Verification { missing: Vec<Component> },

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Confirmation failed: {0}")]
    Confirmation(String),

    #[error("Document store restore failed: {0}")]
    DocumentStore(String),

    #[error("Blob storage restore failed: {0}")]
    BlobStorage(String),

    #[error("Failed to upload object '{name}': {reason}")]
    BlobObject { name: String, reason: String },

    #[error("Database engine unavailable: {0}")]
    DatabaseEngine(String),

    #[error("Database restore failed: {0}")]
    DatabaseRestore(String),

    #[error("Asset restore failed: {0}")]
    Asset(String),

    #[error("Config restore failed: {0}")]
    Config(String),

    #[error("Cleanup failed: {0}")]
    Cleanup(String),

    #[error("Invalid orchestrator transition: cannot {action} while {state}")]
    InvalidTransition { action: &'static str, state: String },

    #[error("No restorer registered for component {0}")]
    MissingRestorer(Component),
}

impl RestoreError {
    /// Non-fatal errors are logged where they occur and never unwind to the orchestrator.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RestoreError::BlobObject { .. } | RestoreError::DatabaseEngine(_) | RestoreError::Cleanup(_)
        )
    }
}

fn format_components(components: &[Component]) -> String {
    components
        .iter()
        .map(|c| c.key())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, RestoreError>;
