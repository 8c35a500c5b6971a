//! Per-directory migration pipeline shared by `cloudlift migrate` and
//! `cloudlift diff`.
//!
//! Directories are processed sequentially and independently: a failure in
//! one is recorded in its [`DirectoryReport`] and the run moves on.

use std::path::{Path, PathBuf};

use serde::Serialize;

use cloudlift_core::config::RunConfig;
use cloudlift_core::types::{
    MigrationPlan, NotMigratable, TagReconciliationRequest, WorkspaceBinding, WorkspaceName,
};
use cloudlift_hcl::{
    extract, locate, parses_remote_backend, render, workspace_attribute, LocatedBlock,
};
use cloudlift_remote::{reconcile, WorkspaceApi};

use crate::discover;
use crate::error::MigrateError;
use crate::rewriter::{self, RewriteOutcome};
use crate::terraform::Terraform;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What happened to one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DirectoryOutcome {
    /// Nothing to migrate.
    Skipped { reason: NotMigratable },
    /// Dry run: the file would be rewritten.
    WouldMigrate {
        file: PathBuf,
        /// Rendered workspace selection, e.g. `name = "net-prod"`.
        workspaces: String,
        /// Workspace whose tags would be reconciled.
        tag_workspace: Option<String>,
    },
    /// The rewrite ran.
    Applied { file: PathBuf, result: RewriteOutcome },
}

impl DirectoryOutcome {
    /// True when a rewrite ran and did not commit.
    pub fn is_failure(&self) -> bool {
        matches!(self, DirectoryOutcome::Applied { result, .. } if !result.is_committed())
    }
}

/// Result of processing one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryReport {
    pub directory: PathBuf,
    /// Files holding a legacy block, in discovery order.
    pub candidates: Vec<String>,
    /// Candidates after the first; these are left alone.
    pub ambiguous: Vec<String>,
    pub outcome: DirectoryOutcome,
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Scan result for one directory, before anything is mutated.
#[derive(Debug, Clone)]
pub struct DirectoryPlan {
    pub directory: PathBuf,
    pub candidates: Vec<String>,
    pub plan: Result<MigrationPlan, NotMigratable>,
}

impl DirectoryPlan {
    pub fn ambiguous(&self) -> Vec<String> {
        self.candidates.iter().skip(1).cloned().collect()
    }
}

/// Discover, locate, extract and synthesize. Reads files only.
pub fn plan_directory(directory: &Path, config: &RunConfig) -> DirectoryPlan {
    let files = discover::discover_tf_files(directory);
    if files.is_empty() {
        tracing::info!(dir = %directory.display(), "no .tf files");
        return DirectoryPlan {
            directory: directory.to_path_buf(),
            candidates: Vec::new(),
            plan: Err(NotMigratable::NoConfigFiles),
        };
    }

    let mut matched: Vec<(PathBuf, String, LocatedBlock)> = Vec::new();
    for path in files {
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(file = %path.display(), error = %err, "could not read file");
                continue;
            }
        };
        match locate(&text) {
            Some(block) => matched.push((path, text, block)),
            None if parses_remote_backend(&text) => tracing::debug!(
                file = %path.display(),
                "parser found a remote backend the block scan missed; file skipped"
            ),
            None => {}
        }
    }

    let candidates: Vec<String> = matched.iter().map(|(path, _, _)| file_name(path)).collect();
    if candidates.len() > 1 {
        tracing::warn!(
            dir = %directory.display(),
            files = ?candidates,
            "remote backend declared in several files; only the first is migrated"
        );
    }

    let plan = match matched.into_iter().next() {
        Some((path, text, block)) => build_plan(directory, path, text, &block, config),
        None => Err(NotMigratable::NoLegacyBlock),
    };
    DirectoryPlan {
        directory: directory.to_path_buf(),
        candidates,
        plan,
    }
}

fn build_plan(
    directory: &Path,
    file: PathBuf,
    original: String,
    block: &LocatedBlock,
    config: &RunConfig,
) -> Result<MigrationPlan, NotMigratable> {
    let extraction = extract(&original, block)?;
    let descriptor = extraction.descriptor;
    tracing::debug!(file = %file.display(), strategy = extraction.strategy, "backend parsed");

    if let Some(declared) = descriptor.hostname() {
        if declared != config.hostname {
            tracing::warn!(
                file = %file.display(),
                declared,
                configured = %config.hostname,
                "backend declares a different hostname; using the configured one"
            );
        }
    }

    let replacement = render(&descriptor, &config.hostname, &block.indent);
    let migrated = block.replace(&original, &replacement);
    let binding = descriptor.binding().clone();

    let tag_request = match &binding {
        WorkspaceBinding::Prefixed(tag) => match workspace_for(directory) {
            Some(workspace) => Some(TagReconciliationRequest {
                hostname: config.hostname.clone(),
                organization: descriptor.organization().clone(),
                workspace,
                tag: tag.clone(),
            }),
            None => {
                tracing::warn!(dir = %directory.display(), "cannot derive a workspace name from directory");
                None
            }
        },
        WorkspaceBinding::Named(_) => None,
    };

    Ok(MigrationPlan {
        file,
        span: block.span.clone(),
        original,
        replacement,
        migrated,
        binding,
        tag_request,
        dry_run: config.dry_run(),
    })
}

/// Remote workspace name assumed for a directory: its base name.
pub fn workspace_for(directory: &Path) -> Option<WorkspaceName> {
    directory
        .file_name()
        .map(|name| WorkspaceName(name.to_string_lossy().into_owned()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Check the terraform binary is usable. Dry runs never call out.
pub fn preflight(config: &RunConfig, terraform: &dyn Terraform) -> Result<Option<String>, MigrateError> {
    if config.dry_run() {
        return Ok(None);
    }
    let version = terraform.version()?;
    tracing::info!(%version, "terraform available");
    Ok(Some(version))
}

/// Migrate one directory.
///
/// `api` is used for tag reconciliation on prefix-bound workspaces; pass
/// `None` when no credential is available.
pub fn migrate_directory(
    directory: &Path,
    config: &RunConfig,
    terraform: &dyn Terraform,
    api: Option<&dyn WorkspaceApi>,
) -> DirectoryReport {
    let scanned = plan_directory(directory, config);
    let ambiguous = scanned.ambiguous();
    let DirectoryPlan {
        directory,
        candidates,
        plan,
    } = scanned;

    let outcome = match plan {
        Err(reason) => {
            tracing::info!(dir = %directory.display(), %reason, "skipped");
            DirectoryOutcome::Skipped { reason }
        }
        Ok(plan) if plan.dry_run => DirectoryOutcome::WouldMigrate {
            workspaces: workspace_attribute(&plan.binding),
            tag_workspace: plan.tag_request.as_ref().map(|r| r.workspace.0.clone()),
            file: plan.file,
        },
        Ok(plan) => {
            let result = rewriter::apply(&plan, terraform, config.keep_backup, || {
                let request = plan.tag_request.as_ref()?;
                let api = api?;
                Some(reconcile(api, request))
            });
            DirectoryOutcome::Applied {
                file: plan.file,
                result,
            }
        }
    };

    DirectoryReport {
        directory,
        candidates,
        ambiguous,
        outcome,
    }
}

/// Migrate every configured directory in order, handing each report to
/// `on_report` as soon as it is ready.
pub fn run<F>(
    config: &RunConfig,
    terraform: &dyn Terraform,
    api: Option<&dyn WorkspaceApi>,
    mut on_report: F,
) -> Vec<DirectoryReport>
where
    F: FnMut(&DirectoryReport),
{
    let mut reports = Vec::with_capacity(config.directories.len());
    for directory in &config.directories {
        tracing::info!(dir = %directory.display(), "processing");
        let report = migrate_directory(directory, config, terraform, api);
        on_report(&report);
        reports.push(report);
    }
    reports
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
