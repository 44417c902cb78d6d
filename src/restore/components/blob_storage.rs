// restoretool/src/restore/components/blob_storage.rs
use async_trait::async_trait;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

use super::{ComponentReport, ComponentRestorer};
use crate::errors::{RestoreError, Result};
use crate::restore::manifest::{Component, MANIFEST_FILE};

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Single-object upload client for the live blob store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, object_name: &str, source: &Path, content_type: &str)
    -> anyhow::Result<()>;
}

/// One entry of `storage/manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageEntry {
    pub name: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl StorageEntry {
    /// Name of the staged payload: the object name with path separators flattened.
    pub fn staged_file_name(&self) -> String {
        self.name.replace('/', "_")
    }

    pub fn content_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE)
    }
}

pub struct BlobStorageRestorer {
    store: Option<Box<dyn BlobStore>>,
}

impl BlobStorageRestorer {
    pub fn new(store: Option<Box<dyn BlobStore>>) -> Self {
        BlobStorageRestorer { store }
    }

    async fn upload_entry(
        store: &dyn BlobStore,
        storage_dir: &Path,
        entry: &StorageEntry,
    ) -> std::result::Result<(), RestoreError> {
        let source = storage_dir.join(entry.staged_file_name());
        if !source.is_file() {
            return Err(RestoreError::BlobObject {
                name: entry.name.clone(),
                reason: format!("staged file {} is missing", source.display()),
            });
        }
        store
            .upload(&entry.name, &source, entry.content_type())
            .await
            .map_err(|e| RestoreError::BlobObject {
                name: entry.name.clone(),
                reason: format!("{:#}", e),
            })
    }
}

pub fn load_storage_manifest(storage_dir: &Path) -> Result<Vec<StorageEntry>> {
    let manifest_path = storage_dir.join(MANIFEST_FILE);
    let content = fs::read_to_string(&manifest_path).map_err(|e| {
        RestoreError::BlobStorage(format!("Failed to read {}: {}", manifest_path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        RestoreError::BlobStorage(format!("Invalid storage manifest {}: {}", manifest_path.display(), e))
    })
}

#[async_trait]
impl ComponentRestorer for BlobStorageRestorer {
    fn component(&self) -> Component {
        Component::BlobStorage
    }

    fn continues_on_item_failure(&self) -> bool {
        true
    }

    async fn restore(&self, staged_root: &Path) -> Result<ComponentReport> {
        let store = self.store.as_deref().ok_or_else(|| {
            RestoreError::BlobStorage(
                "blob storage is not configured (set the STORAGE_* variables)".to_string(),
            )
        })?;

        let storage_dir = staged_root.join(Component::BlobStorage.staged_path());
        if !storage_dir.is_dir() {
            return Err(RestoreError::BlobStorage(format!(
                "Storage staging directory not found: {}",
                storage_dir.display()
            )));
        }
        let entries = load_storage_manifest(&storage_dir)?;
        println!("Uploading {} object(s)...", entries.len());

        let mut report = ComponentReport::new(Component::BlobStorage);
        for entry in &entries {
            match Self::upload_entry(store, &storage_dir, entry).await {
                Ok(()) => {
                    report.restored += 1;
                    println!("   ✓ {}", entry.name);
                }
                Err(e) => {
                    report.failed += 1;
                    warn!("{}", e);
                    eprintln!("   ⚠️ Skipped {}: {}", entry.name, e);
                }
            }
        }

        println!(
            "✓ Uploaded {}/{} object(s)",
            report.restored,
            entries.len()
        );
        Ok(report)
    }
}
