//! Unified diff preview for `cloudlift diff`.

use std::path::{Path, PathBuf};

use similar::TextDiff;

use cloudlift_core::config::RunConfig;
use cloudlift_core::types::{MigrationPlan, NotMigratable};

use crate::pipeline::plan_directory;

/// A single file diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: PathBuf,
    pub unified_diff: String,
}

/// Diff result for a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryDiff {
    pub directory: PathBuf,
    pub ambiguous: Vec<String>,
    pub diff: Result<FileDiff, NotMigratable>,
}

/// Compute what a migration of `directory` would change. No files are
/// written and no process is started.
pub fn diff_directory(directory: &Path, config: &RunConfig) -> DirectoryDiff {
    let scanned = plan_directory(directory, config);
    let ambiguous = scanned.ambiguous();
    DirectoryDiff {
        directory: scanned.directory,
        ambiguous,
        diff: scanned.plan.map(|plan| plan_diff(&plan)),
    }
}

/// Unified diff between a plan's original and migrated text.
pub fn plan_diff(plan: &MigrationPlan) -> FileDiff {
    let name = plan.file_name();
    let old_header = format!("a/{name}");
    let new_header = format!("b/{name}");
    let unified = TextDiff::from_lines(&plan.original, &plan.migrated)
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(3)
        .to_string();
    FileDiff {
        path: plan.file.clone(),
        unified_diff: unified,
    }
}
