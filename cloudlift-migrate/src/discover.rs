//! Candidate discovery: which files in a directory may hold configuration.

use std::path::{Path, PathBuf};

use crate::error::{io_err, MigrateError};

/// Name fragments that mark variable files, state files and backups.
const EXCLUDED: &[&str] = &[".tfvars", ".tfstate", ".backup", ".bak"];

/// `*.tf`, minus anything matching [`EXCLUDED`].
pub fn is_config_file_name(name: &str) -> bool {
    name.ends_with(".tf") && !EXCLUDED.iter().any(|pattern| name.contains(pattern))
}

/// Configuration files directly inside `dir`, sorted by file name. Symlinks
/// to regular files count; dangling links do not.
pub fn try_discover(dir: &Path) -> Result<Vec<PathBuf>, MigrateError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| io_err(dir, e))?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter(|e| is_config_file_name(&e.file_name().to_string_lossy()))
        .map(|e| e.path())
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// [`try_discover`], treating an unreadable directory as empty.
pub fn discover_tf_files(dir: &Path) -> Vec<PathBuf> {
    match try_discover(dir) {
        Ok(files) => files,
        Err(err) => {
            tracing::warn!(dir = %dir.display(), error = %err, "could not read directory");
            Vec::new()
        }
    }
}
