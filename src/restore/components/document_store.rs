// restoretool/src/restore/components/document_store.rs
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::info;

use super::{ComponentReport, ComponentRestorer};
use crate::errors::{RestoreError, Result};
use crate::restore::manifest::Component;

/// Maximum number of writes the document store accepts in one atomic commit.
pub const BATCH_LIMIT: usize = 500;

/// A full-document upsert keyed by collection and document id.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOp {
    pub collection: String,
    pub id: String,
    pub data: Map<String, Value>,
}

/// Batched-write client for the live document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Commits all writes atomically. `writes.len()` never exceeds [`BATCH_LIMIT`].
    async fn commit(&self, writes: &[WriteOp]) -> anyhow::Result<()>;
}

#[derive(Debug, Deserialize)]
struct DocumentRecord {
    id: String,
    #[serde(default)]
    data: Map<String, Value>,
}

pub struct DocumentStoreRestorer {
    store: Option<Box<dyn DocumentStore>>,
}

impl DocumentStoreRestorer {
    pub fn new(store: Option<Box<dyn DocumentStore>>) -> Self {
        DocumentStoreRestorer { store }
    }
}

/// Reads `firestore.json` into write operations, preserving collection and document order.
pub fn load_write_ops(dump_path: &Path) -> Result<Vec<WriteOp>> {
    let content = fs::read_to_string(dump_path).map_err(|e| {
        RestoreError::DocumentStore(format!("Failed to read {}: {}", dump_path.display(), e))
    })?;
    let collections: Map<String, Value> = serde_json::from_str(&content).map_err(|e| {
        RestoreError::DocumentStore(format!("Invalid document dump {}: {}", dump_path.display(), e))
    })?;

    let mut ops = Vec::new();
    for (collection, documents) in collections {
        let records: Vec<DocumentRecord> = serde_json::from_value(documents).map_err(|e| {
            RestoreError::DocumentStore(format!(
                "Invalid documents in collection '{}': {}",
                collection, e
            ))
        })?;
        ops.extend(records.into_iter().map(|record| WriteOp {
            collection: collection.clone(),
            id: record.id,
            data: record.data,
        }));
    }
    Ok(ops)
}

/// Commits `ops` in sequential batches of at most [`BATCH_LIMIT`]; returns the number of commits.
///
/// Batches span collection boundaries. The first failed commit aborts the remaining batches.
pub async fn commit_in_batches(store: &dyn DocumentStore, ops: &[WriteOp]) -> Result<usize> {
    let mut commits = 0;
    let mut batch: Vec<WriteOp> = Vec::with_capacity(BATCH_LIMIT.min(ops.len()));

    for op in ops {
        batch.push(op.clone());
        if batch.len() == BATCH_LIMIT {
            commit_batch(store, &batch, commits).await?;
            commits += 1;
            batch.clear();
        }
    }
    if !batch.is_empty() {
        commit_batch(store, &batch, commits).await?;
        commits += 1;
    }
    Ok(commits)
}

async fn commit_batch(store: &dyn DocumentStore, batch: &[WriteOp], index: usize) -> Result<()> {
    store.commit(batch).await.map_err(|e| {
        RestoreError::DocumentStore(format!(
            "Batch {} ({} writes) failed to commit: {:#}",
            index + 1,
            batch.len(),
            e
        ))
    })?;
    info!("Committed batch {} ({} writes)", index + 1, batch.len());
    Ok(())
}

#[async_trait]
impl ComponentRestorer for DocumentStoreRestorer {
    fn component(&self) -> Component {
        Component::DocumentStore
    }

    fn continues_on_item_failure(&self) -> bool {
        false
    }

    async fn restore(&self, staged_root: &Path) -> Result<ComponentReport> {
        let store = self.store.as_deref().ok_or_else(|| {
            RestoreError::DocumentStore(
                "document store is not configured (set FIRESTORE_PROJECT_ID and FIRESTORE_ACCESS_TOKEN or FIRESTORE_EMULATOR_HOST)".to_string(),
            )
        })?;

        let ops = load_write_ops(&staged_root.join(Component::DocumentStore.staged_path()))?;
        println!("Replaying {} document(s) in batches of {}...", ops.len(), BATCH_LIMIT);

        let commits = commit_in_batches(store, &ops).await?;
        println!("✓ Committed {} document(s) in {} batch(es)", ops.len(), commits);

        Ok(ComponentReport {
            restored: ops.len(),
            ..ComponentReport::new(Component::DocumentStore)
        })
    }
}
