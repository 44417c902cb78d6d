// restoretool/src/restore/manifest.rs
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::errors::{RestoreError, Result};

pub const MANIFEST_FILE: &str = "manifest.json";

/// The restorable subsystems, in the order they are replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    DocumentStore,
    BlobStorage,
    Database,
    Assets,
    Config,
}

impl Component {
    pub const ORDER: [Component; 5] = [
        Component::DocumentStore,
        Component::BlobStorage,
        Component::Database,
        Component::Assets,
        Component::Config,
    ];

    /// Key used for this component in `manifest.json`.
    pub fn key(self) -> &'static str {
        match self {
            Component::DocumentStore => "documentStore",
            Component::BlobStorage => "blobStorage",
            Component::Database => "database",
            Component::Assets => "assets",
            Component::Config => "config",
        }
    }

    /// Path inside the staged root that must exist when the component is flagged.
    pub fn staged_path(self) -> &'static str {
        match self {
            Component::DocumentStore => "firestore.json",
            Component::BlobStorage => "storage",
            Component::Database => "database",
            Component::Assets => "assets",
            Component::Config => "config",
        }
    }

    fn expects_directory(self) -> bool {
        !matches!(self, Component::DocumentStore)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentFlags {
    #[serde(default)]
    pub document_store: bool,
    #[serde(default)]
    pub blob_storage: bool,
    #[serde(default)]
    pub database: bool,
    #[serde(default)]
    pub assets: bool,
    #[serde(default)]
    pub config: bool,
}

impl ComponentFlags {
    pub fn includes(&self, component: Component) -> bool {
        match component {
            Component::DocumentStore => self.document_store,
            Component::BlobStorage => self.blob_storage,
            Component::Database => self.database,
            Component::Assets => self.assets,
            Component::Config => self.config,
        }
    }

    pub fn enabled(&self) -> Vec<Component> {
        Component::ORDER.into_iter().filter(|c| self.includes(*c)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestMetadata {
    pub file_count: u64,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub backup_type: String,
    pub timestamp: DateTime<Utc>,
    pub components: ComponentFlags,
    pub metadata: ManifestMetadata,
}

#[derive(Deserialize)]
struct RawManifest {
    #[serde(rename = "type")]
    backup_type: String,
    timestamp: DateTime<Utc>,
    components: serde_json::Map<String, serde_json::Value>,
    metadata: ManifestMetadata,
}

impl Manifest {
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: RawManifest = serde_json::from_str(content)
            .map_err(|e| RestoreError::InvalidManifest(e.to_string()))?;

        for key in raw.components.keys() {
            if !Component::ORDER.iter().any(|c| c.key() == key) {
                warn!("Ignoring unknown component '{}' in manifest", key);
            }
        }

        let components: ComponentFlags =
            serde_json::from_value(serde_json::Value::Object(raw.components))
                .map_err(|e| RestoreError::InvalidManifest(format!("components: {}", e)))?;

        Ok(Manifest {
            backup_type: raw.backup_type,
            timestamp: raw.timestamp,
            components,
            metadata: raw.metadata,
        })
    }
}

/// Reads the staged manifest and checks that every flagged component is physically present.
///
/// All missing components are reported together so the operator can fix the archive in one pass.
pub fn verify_manifest(staged_root: &Path) -> Result<Manifest> {
    let manifest_path = staged_root.join(MANIFEST_FILE);
    let content = fs::read_to_string(&manifest_path).map_err(|e| {
        RestoreError::InvalidManifest(format!(
            "cannot read {}: {}",
            manifest_path.display(),
            e
        ))
    })?;
    let manifest = Manifest::from_json(&content)?;

    let missing: Vec<Component> = manifest
        .components
        .enabled()
        .into_iter()
        .filter(|component| !component_present(staged_root, *component))
        .collect();

    if !missing.is_empty() {
        return Err(RestoreError::Verification { missing });
    }
    Ok(manifest)
}

fn component_present(staged_root: &Path, component: Component) -> bool {
    let path: PathBuf = staged_root.join(component.staged_path());
    if component.expects_directory() {
        path.is_dir()
    } else {
        path.is_file()
    }
}
