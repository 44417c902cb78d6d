pub(crate) mod archive;
pub(crate) mod components;
pub(crate) mod confirm;
mod logic;
pub(crate) mod manifest;

use std::path::Path;

use crate::clients::{FirestoreClient, S3BlobStore};
use crate::config::RestoreSettings;
use crate::errors::RestoreError;
use components::{
    BlobStorageRestorer, BlobStore, ComponentRestorer, DatabaseRestorer, DocumentStore,
    DocumentStoreRestorer, FilesystemRestorer,
};
use confirm::TerminalPrompt;

pub use logic::{RestoreOptions, RestoreOrchestrator, RestoreOutcome};

/// Builds one restorer per component from the environment settings.
///
/// Clients whose credentials are missing are left out; the matching restorer only fails
/// if the archive actually asks for that component.
pub async fn build_restorers(settings: &RestoreSettings) -> Vec<Box<dyn ComponentRestorer>> {
    let document_store: Option<Box<dyn DocumentStore>> = match &settings.firestore {
        Some(config) => match FirestoreClient::new(config) {
            Ok(client) => Some(Box::new(client)),
            Err(e) => {
                tracing::warn!("Document store client unavailable: {:#}", e);
                None
            }
        },
        None => None,
    };

    let blob_store: Option<Box<dyn BlobStore>> = match &settings.storage {
        Some(config) => Some(Box::new(S3BlobStore::connect(config).await)),
        None => None,
    };

    vec![
        Box::new(DocumentStoreRestorer::new(document_store)),
        Box::new(BlobStorageRestorer::new(blob_store)),
        Box::new(DatabaseRestorer::new(settings.database_url.clone())),
        Box::new(FilesystemRestorer::assets(&settings.target_dir)),
        Box::new(FilesystemRestorer::config(&settings.target_dir)),
    ]
}

/// Public entry point for the restore process.
pub async fn run_restore_flow(
    settings: &RestoreSettings,
    archive_path: &Path,
    auto_confirm: bool,
) -> Result<RestoreOutcome, RestoreError> {
    let options = RestoreOptions {
        temp_root: settings.temp_root.clone(),
        auto_confirm,
        database_engine: components::database::describe_engine(settings.database_url.as_deref()),
    };
    let restorers = build_restorers(settings).await;
    let mut orchestrator = RestoreOrchestrator::new(options, restorers);
    let mut prompt = TerminalPrompt::stdio();

    orchestrator.run(archive_path, &mut prompt).await
}
