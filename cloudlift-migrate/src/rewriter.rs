//! Transactional file rewrite.
//!
//! ## Stages
//!
//! ```text
//! Planned → BackedUp → Written → Formatted → Initialized → [TagReconciled] → Committed
//!                         └──────────────┴────── fatal ─────→ RolledBack
//! ```
//!
//! 1. Copy the file to `<file>.bak`, keeping timestamps, and record its
//!    SHA-256 digest.
//! 2. Write the migrated text to `<file>.cloudlift.tmp` and rename it over
//!    the original. A symlinked file is resolved first so the link survives,
//!    and the original permission bits are carried over.
//! 3. `terraform fmt`. A failure here is a warning only.
//! 4. `terraform init`. A failure restores the backup, verifies the digest
//!    and keeps the `.bak` on disk.
//! 5. Run the tag hook, if any.
//! 6. Delete the backup unless it was asked to be kept.
//!
//! Nothing touches the file before step 1 succeeds.

use std::path::{Path, PathBuf};

use filetime::FileTime;
use serde::Serialize;
use sha2::{Digest, Sha256};

use cloudlift_core::types::{backup_path_for, BackupRecord, MigrationPlan};
use cloudlift_remote::ReconcileOutcome;

use crate::error::{io_err, MigrateError};
use crate::terraform::Terraform;

// ---------------------------------------------------------------------------
// Stage and outcome
// ---------------------------------------------------------------------------

/// Position of a [`Transaction`] in the rewrite sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Planned,
    BackedUp,
    Written,
    Formatted,
    Initialized,
    TagReconciled,
    Committed,
    RolledBack,
}

/// How a rewrite ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RewriteOutcome {
    /// The migration stuck. `backup` is set when the `.bak` was kept.
    Committed {
        backup: Option<PathBuf>,
        format_warning: Option<String>,
        init_output: String,
        tag: Option<ReconcileOutcome>,
    },
    /// A fatal step failed and the original content is back in place.
    RolledBack {
        error: String,
        output: Option<String>,
        backup: PathBuf,
    },
    /// A fatal step failed and the original could not be put back.
    RestoreFailed {
        error: String,
        output: Option<String>,
        restore_error: String,
        backup: PathBuf,
    },
    /// The backup could not be taken; the file was never touched.
    Aborted { error: String },
}

impl RewriteOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, RewriteOutcome::Committed { .. })
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// One file rewrite in progress. Created by taking the backup.
#[derive(Debug)]
pub struct Transaction<'p> {
    plan: &'p MigrationPlan,
    record: BackupRecord,
    stage: Stage,
}

impl<'p> Transaction<'p> {
    /// Planned → BackedUp.
    pub fn begin(plan: &'p MigrationPlan, keep_backup: bool) -> Result<Self, MigrateError> {
        let backup = backup_path_for(&plan.file);
        copy_preserving_times(&plan.file, &backup)?;
        let digest = file_digest(&backup)?;
        tracing::info!(file = %plan.file.display(), backup = %backup.display(), "backup created");

        let mut tx = Self {
            plan,
            record: BackupRecord {
                original: plan.file.clone(),
                backup,
                temporary: !keep_backup,
                digest,
            },
            stage: Stage::Planned,
        };
        tx.advance(Stage::BackedUp);
        Ok(tx)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn backup(&self) -> &BackupRecord {
        &self.record
    }

    /// BackedUp → Written.
    pub fn write(&mut self) -> Result<(), MigrateError> {
        let target =
            std::fs::canonicalize(&self.plan.file).map_err(|e| io_err(&self.plan.file, e))?;
        let tmp = PathBuf::from(format!("{}.cloudlift.tmp", target.display()));
        write_via_tmp(&target, &self.plan.migrated, &tmp)?;
        self.advance(Stage::Written);
        Ok(())
    }

    /// Written → Formatted. Returns a warning when formatting failed.
    pub fn format(&mut self, terraform: &dyn Terraform) -> Option<String> {
        let warning = match terraform.fmt(&self.plan.file, self.plan.folder()) {
            Ok(()) => None,
            Err(err) => {
                tracing::warn!(file = %self.plan.file.display(), error = %err, "formatting failed, continuing");
                Some(err.to_string())
            }
        };
        self.advance(Stage::Formatted);
        warning
    }

    /// Formatted → Initialized.
    pub fn initialize(&mut self, terraform: &dyn Terraform) -> Result<String, MigrateError> {
        let output = terraform.init(self.plan.folder())?;
        self.advance(Stage::Initialized);
        Ok(output)
    }

    /// Initialized → TagReconciled.
    pub fn mark_reconciled(&mut self) {
        self.advance(Stage::TagReconciled);
    }

    /// → Committed. Returns the backup path when it is kept.
    pub fn commit(mut self) -> Option<PathBuf> {
        self.advance(Stage::Committed);
        if !self.record.temporary {
            return Some(self.record.backup);
        }
        if let Err(err) = std::fs::remove_file(&self.record.backup) {
            tracing::warn!(backup = %self.record.backup.display(), error = %err, "could not remove backup");
        }
        None
    }

    /// → RolledBack. Restores the backup over the file and keeps the `.bak`.
    pub fn rollback(mut self, error: MigrateError) -> RewriteOutcome {
        let output = error.output().map(str::to_string);
        let backup = self.record.backup.clone();
        match restore(&self.record) {
            Ok(()) => {
                self.advance(Stage::RolledBack);
                tracing::warn!(file = %self.plan.file.display(), error = %error, "migration rolled back");
                RewriteOutcome::RolledBack {
                    error: error.to_string(),
                    output,
                    backup,
                }
            }
            Err(restore_err) => {
                tracing::error!(
                    file = %self.plan.file.display(),
                    backup = %backup.display(),
                    error = %restore_err,
                    "restore failed; restore the file manually from its backup"
                );
                RewriteOutcome::RestoreFailed {
                    error: error.to_string(),
                    output,
                    restore_error: restore_err.to_string(),
                    backup,
                }
            }
        }
    }

    fn advance(&mut self, next: Stage) {
        tracing::debug!(file = %self.plan.file.display(), from = ?self.stage, to = ?next, "stage");
        self.stage = next;
    }
}

/// Run the full stage sequence for `plan`.
///
/// `reconcile` runs after a successful init; returning `None` means there
/// was nothing to reconcile.
pub fn apply<F>(
    plan: &MigrationPlan,
    terraform: &dyn Terraform,
    keep_backup: bool,
    reconcile: F,
) -> RewriteOutcome
where
    F: FnOnce() -> Option<ReconcileOutcome>,
{
    let mut tx = match Transaction::begin(plan, keep_backup) {
        Ok(tx) => tx,
        Err(err) => {
            tracing::error!(file = %plan.file.display(), error = %err, "backup failed, file left untouched");
            return RewriteOutcome::Aborted {
                error: err.to_string(),
            };
        }
    };

    if let Err(err) = tx.write() {
        return tx.rollback(err);
    }
    let format_warning = tx.format(terraform);
    let init_output = match tx.initialize(terraform) {
        Ok(output) => output,
        Err(err) => return tx.rollback(err),
    };
    let tag = reconcile();
    if tag.is_some() {
        tx.mark_reconciled();
    }
    let backup = tx.commit();

    RewriteOutcome::Committed {
        backup,
        format_warning,
        init_output,
        tag,
    }
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

fn copy_preserving_times(from: &Path, to: &Path) -> Result<(), MigrateError> {
    std::fs::copy(from, to).map_err(|e| io_err(to, e))?;
    let meta = std::fs::metadata(from).map_err(|e| io_err(from, e))?;
    filetime::set_file_times(
        to,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    )
    .map_err(|e| io_err(to, e))
}

/// Replace the regular file at `path` with `content` through `tmp`, keeping
/// the file's permissions.
fn write_via_tmp(path: &Path, content: &str, tmp: &Path) -> Result<(), MigrateError> {
    let permissions = std::fs::metadata(path)
        .map_err(|e| io_err(path, e))?
        .permissions();
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;
    let swapped = std::fs::set_permissions(tmp, permissions)
        .map_err(|e| io_err(tmp, e))
        .and_then(|()| std::fs::rename(tmp, path).map_err(|e| io_err(path, e)));
    if swapped.is_err() {
        let _ = std::fs::remove_file(tmp);
    }
    swapped
}

/// SHA-256 hex digest of the file at `path`.
pub fn file_digest(path: &Path) -> Result<String, MigrateError> {
    let bytes = std::fs::read(path).map_err(|e| io_err(path, e))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Copy the backup over the original and check the result hashes to the
/// recorded digest.
pub fn restore(record: &BackupRecord) -> Result<(), MigrateError> {
    copy_preserving_times(&record.backup, &record.original)?;
    if file_digest(&record.original)? != record.digest {
        return Err(MigrateError::RestoreMismatch {
            path: record.original.clone(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
