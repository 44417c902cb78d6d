// restoretool/src/restore/archive.rs
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tempfile::{Builder as TempDirBuilder, TempDir};
use tracing::{info, warn};

use crate::errors::{RestoreError, Result};
use crate::restore::manifest::MANIFEST_FILE;

/// Staging area owned by a single restore run.
///
/// The directory is removed by [`StagingDir::cleanup`]; if the value is dropped without
/// an explicit cleanup, `TempDir`'s destructor still removes it.
#[derive(Debug)]
pub struct StagingDir {
    dir: TempDir,
    root: PathBuf,
}

impl StagingDir {
    /// Directory the archive was unpacked into.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// The extracted top-level folder that holds `manifest.json`.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Removes the staging tree. Failures are reported, never fatal.
    pub fn cleanup(self) -> std::result::Result<(), RestoreError> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| {
            RestoreError::Cleanup(format!("Failed to remove {}: {}", path.display(), e))
        })
    }
}

/// Extracts a GZipped TAR archive into a fresh staging directory under `temp_root`.
///
/// # Arguments
/// * `archive_path` - Path to the `.tar.gz` archive file.
/// * `temp_root` - Fixed root under which per-run staging directories are created.
///
/// # Returns
/// The staging directory, with its root resolved to the single extracted folder.
pub fn extract_archive(archive_path: &Path, temp_root: &Path) -> Result<StagingDir> {
    if !archive_path.is_file() {
        return Err(RestoreError::Extraction(format!(
            "Archive is not a readable file: {}",
            archive_path.display()
        )));
    }

    fs::create_dir_all(temp_root).map_err(|e| {
        RestoreError::Extraction(format!(
            "Failed to create staging root {}: {}",
            temp_root.display(),
            e
        ))
    })?;

    let dir = TempDirBuilder::new()
        .prefix("restore_")
        .tempdir_in(temp_root)
        .map_err(|e| {
            RestoreError::Extraction(format!(
                "Failed to create staging directory in {}: {}",
                temp_root.display(),
                e
            ))
        })?;

    info!(
        "Extracting {} into {}",
        archive_path.display(),
        dir.path().display()
    );

    let archive_file = File::open(archive_path).map_err(|e| {
        RestoreError::Extraction(format!(
            "Failed to open archive file {}: {}",
            archive_path.display(),
            e
        ))
    })?;
    let gz_decoder = flate2::read::GzDecoder::new(archive_file);
    let mut archive = tar::Archive::new(gz_decoder);

    if let Err(e) = archive.unpack(dir.path()) {
        let message = format!(
            "Failed to unpack archive {} (corrupt or not a tar.gz?): {}",
            archive_path.display(),
            e
        );
        if let Err(close_err) = dir.close() {
            warn!("Failed to remove partial staging directory: {}", close_err);
        }
        return Err(RestoreError::Extraction(message));
    }

    let root = match locate_staged_root(dir.path()) {
        Ok(root) => root,
        Err(e) => {
            if let Err(close_err) = dir.close() {
                warn!("Failed to remove staging directory: {}", close_err);
            }
            return Err(e);
        }
    };

    Ok(StagingDir { dir, root })
}

/// Resolves the staged root: the single top-level folder, or the staging directory itself
/// when the archive was built with `manifest.json` at its top level.
fn locate_staged_root(staging: &Path) -> Result<PathBuf> {
    if staging.join(MANIFEST_FILE).is_file() {
        return Ok(staging.to_path_buf());
    }

    let entries = fs::read_dir(staging).map_err(|e| {
        RestoreError::Extraction(format!("Failed to read {}: {}", staging.display(), e))
    })?;

    let mut folders = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| RestoreError::Extraction(e.to_string()))?;
        if entry.path().is_dir() {
            folders.push(entry.path());
        }
    }

    match folders.len() {
        1 => Ok(folders.remove(0)),
        0 => Err(RestoreError::Extraction(
            "Archive is empty: no top-level folder found".to_string(),
        )),
        n => Err(RestoreError::Extraction(format!(
            "Archive must contain exactly one top-level folder, found {}",
            n
        ))),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tar::Builder;
    use tempfile::TempDir;

    /// Packs `source_dir` into `dest` as a tar.gz, nesting everything under `top_level` when given.
    pub(crate) fn pack_tar_gz(source_dir: &Path, dest: &Path, top_level: Option<&str>) {
        let file = File::create(dest).unwrap();
        let enc = GzEncoder::new(file, Compression::default());
        let mut builder = Builder::new(enc);
        builder.append_dir_all(top_level.unwrap_or("."), source_dir).unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_extracts_single_top_level_folder() {
        let src = TempDir::new().unwrap();
        fs::write(src.path().join(MANIFEST_FILE), "{}").unwrap();
        let work = TempDir::new().unwrap();
        let archive = work.path().join("backup.tar.gz");
        pack_tar_gz(src.path(), &archive, Some("backup-2024"));

        let temp_root = work.path().join("staging");
        let staging = extract_archive(&archive, &temp_root).unwrap();

        assert!(staging.root().ends_with("backup-2024"));
        assert!(staging.root().join(MANIFEST_FILE).is_file());
        assert!(staging.path().starts_with(&temp_root));

        let staged = staging.path().to_path_buf();
        staging.cleanup().unwrap();
        assert!(!staged.exists());
        assert!(temp_root.exists());
    }

    #[test]
    fn test_manifest_at_top_level_uses_staging_dir() {
        let src = TempDir::new().unwrap();
        fs::write(src.path().join(MANIFEST_FILE), "{}").unwrap();
        fs::create_dir_all(src.path().join("assets")).unwrap();
        let work = TempDir::new().unwrap();
        let archive = work.path().join("flat.tar.gz");
        pack_tar_gz(src.path(), &archive, None);

        let staging = extract_archive(&archive, &work.path().join("staging")).unwrap();
        assert_eq!(staging.root(), staging.path());
    }

    #[test]
    fn test_missing_archive_fails() {
        let work = TempDir::new().unwrap();
        let result = extract_archive(&work.path().join("nope.tar.gz"), work.path());
        assert!(matches!(result, Err(RestoreError::Extraction(_))));
    }

    #[test]
    fn test_corrupt_archive_fails_and_leaves_no_staging() {
        let work = TempDir::new().unwrap();
        let archive = work.path().join("corrupt.tar.gz");
        fs::write(&archive, b"definitely not gzip").unwrap();
        let temp_root = work.path().join("staging");

        let result = extract_archive(&archive, &temp_root);
        assert!(matches!(result, Err(RestoreError::Extraction(_))));
        assert_eq!(fs::read_dir(&temp_root).unwrap().count(), 0);
    }

    #[test]
    fn test_multiple_top_level_folders_are_rejected() {
        let src = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("one")).unwrap();
        fs::create_dir_all(src.path().join("two")).unwrap();
        let work = TempDir::new().unwrap();
        let archive = work.path().join("ambiguous.tar.gz");
        pack_tar_gz(src.path(), &archive, None);

        let result = extract_archive(&archive, &work.path().join("staging"));
        assert!(matches!(result, Err(RestoreError::Extraction(_))));
    }
}
