// restoretool/src/restore/components/filesystem.rs
use async_trait::async_trait;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use super::{ComponentReport, ComponentRestorer};
use crate::errors::{RestoreError, Result};
use crate::restore::manifest::Component;

pub const ASSET_DIRS: &[&str] = &["public", "images", "documents", "uploads"];

/// Configuration files that may be restored. Secrets never appear here.
pub const CONFIG_FILES: &[&str] = &[
    "next.config.js",
    "next.config.mjs",
    "firebase.json",
    ".firebaserc",
    "vercel.json",
];

/// Mirrors staged assets or config files onto the live tree, snapshotting what it replaces.
pub struct FilesystemRestorer {
    component: Component,
    target_dir: PathBuf,
}

impl FilesystemRestorer {
    pub fn assets(target_dir: impl Into<PathBuf>) -> Self {
        FilesystemRestorer { component: Component::Assets, target_dir: target_dir.into() }
    }

    pub fn config(target_dir: impl Into<PathBuf>) -> Self {
        FilesystemRestorer { component: Component::Config, target_dir: target_dir.into() }
    }

    fn tracked_entries(&self) -> &'static [&'static str] {
        match self.component {
            Component::Config => CONFIG_FILES,
            _ => ASSET_DIRS,
        }
    }

    fn copy_error(&self, message: String) -> RestoreError {
        match self.component {
            Component::Config => RestoreError::Config(message),
            _ => RestoreError::Asset(message),
        }
    }
}

/// `<name>.bak.<timestamp>` next to the live path.
pub fn snapshot_path(live: &Path, timestamp: &str) -> PathBuf {
    let name = live
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    live.with_file_name(format!("{}.bak.{}", name, timestamp))
}

/// First snapshot name not already on disk: `<name>.bak.<ts>`, then `.1`, `.2`, ...
fn free_snapshot_path(live: &Path, timestamp: &str) -> PathBuf {
    let base = snapshot_path(live, timestamp);
    let mut candidate = base.clone();
    let mut suffix = 1;
    while fs::symlink_metadata(&candidate).is_ok() {
        let mut name = base.as_os_str().to_os_string();
        name.push(format!(".{}", suffix));
        candidate = PathBuf::from(name);
        suffix += 1;
    }
    candidate
}

/// Renames an existing live path out of the way. A failed rename is logged, never fatal.
fn snapshot_existing(live: &Path, timestamp: &str) -> Option<PathBuf> {
    if fs::symlink_metadata(live).is_err() {
        return None;
    }
    let backup = free_snapshot_path(live, timestamp);
    match fs::rename(live, &backup) {
        Ok(()) => {
            println!("   Saved existing {} as {}", live.display(), backup.display());
            Some(backup)
        }
        Err(e) => {
            warn!(
                "Could not snapshot {} before overwrite, continuing: {}",
                live.display(),
                e
            );
            None
        }
    }
}

/// Recursively copies `source` to `dest`. Files overwrite; directories merge.
/// Symlinks in the staged tree are skipped, never followed.
pub fn copy_tree(source: &Path, dest: &Path) -> std::io::Result<u64> {
    let metadata = fs::symlink_metadata(source)?;
    if metadata.file_type().is_symlink() {
        warn!("Skipping symlink {}", source.display());
        return Ok(0);
    }
    if metadata.is_file() {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, dest)?;
        return Ok(1);
    }

    let mut copied = 0;
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(std::io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(std::io::Error::other)?;
        let target = dest.join(relative);
        if entry.file_type().is_symlink() {
            warn!("Skipping symlink {}", entry.path().display());
        } else if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[async_trait]
impl ComponentRestorer for FilesystemRestorer {
    fn component(&self) -> Component {
        self.component
    }

    fn continues_on_item_failure(&self) -> bool {
        false
    }

    async fn restore(&self, staged_root: &Path) -> Result<ComponentReport> {
        let staged_dir = staged_root.join(self.component.staged_path());
        let timestamp = Local::now().format("%Y-%m-%d_%H_%M_%S").to_string();
        let mut report = ComponentReport::new(self.component);

        for name in self.tracked_entries() {
            let source = staged_dir.join(name);
            match fs::symlink_metadata(&source) {
                Err(_) => continue,
                Ok(metadata) if metadata.file_type().is_symlink() => {
                    warn!("Skipping staged symlink {}", source.display());
                    continue;
                }
                Ok(_) => {}
            }
            let live = self.target_dir.join(name);
            println!("Restoring {} -> {}", source.display(), live.display());

            snapshot_existing(&live, &timestamp);

            let copied = copy_tree(&source, &live).map_err(|e| {
                self.copy_error(format!(
                    "Failed to copy {} to {}: {}",
                    source.display(),
                    live.display(),
                    e
                ))
            })?;
            println!("   ✓ {} ({} file(s))", name, copied);
            report.restored += 1;
        }

        println!("✓ Restored {} {} item(s)", report.restored, self.component);
        Ok(report)
    }
}
