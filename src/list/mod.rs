// restoretool/src/list/mod.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::format_size;

const ARCHIVE_EXTENSIONS: &[&str] = &[".tar.gz", ".tgz"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveInfo {
    pub name: String,
    pub path: PathBuf,
    pub created: DateTime<Local>,
    pub size: u64,
}

/// Archives in `backup_dir`, newest first. A missing directory yields an empty list.
pub fn find_archives(backup_dir: &Path) -> Result<Vec<ArchiveInfo>> {
    if !backup_dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(backup_dir)
        .with_context(|| format!("Failed to read backup directory {}", backup_dir.display()))?;

    let mut archives = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read entry in {}", backup_dir.display()))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !ARCHIVE_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
            continue;
        }
        let metadata = entry
            .metadata()
            .with_context(|| format!("Failed to stat {}", entry.path().display()))?;
        if !metadata.is_file() {
            continue;
        }
        // Not every filesystem records creation time.
        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .with_context(|| format!("No timestamp available for {}", entry.path().display()))?;

        archives.push(ArchiveInfo {
            name,
            path: entry.path(),
            created: DateTime::<Local>::from(created),
            size: metadata.len(),
        });
    }

    archives.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| a.name.cmp(&b.name)));
    Ok(archives)
}

pub fn run_list_flow(backup_dir: &Path) -> Result<()> {
    println!("📂 Available backups in {}:", backup_dir.display());

    if !backup_dir.exists() {
        println!("Backup directory {} does not exist. No backups found.", backup_dir.display());
        return Ok(());
    }

    let archives = find_archives(backup_dir)?;
    if archives.is_empty() {
        println!("No backups found.");
        return Ok(());
    }

    for archive in &archives {
        println!(
            "  {:<48} {}  {:>10}",
            archive.name,
            archive.created.format("%Y-%m-%d %H:%M:%S"),
            format_size(archive.size)
        );
    }
    println!("\n{} backup(s). Restore one with: restoretool <archive-path>", archives.len());
    Ok(())
}
