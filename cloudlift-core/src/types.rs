//! Domain types for the backend migration engine.
//!
//! Filesystem locations are always `PathBuf`. Descriptors are immutable once
//! built; the only way to obtain one is [`BackendDescriptor::from_fields`],
//! which enforces the migratability rules.

use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Host used when none is configured. A cloud block targeting this host
/// omits its `hostname` attribute.
pub const DEFAULT_HOSTNAME: &str = "app.terraform.io";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed remote organization name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganizationName(pub String);

impl fmt::Display for OrganizationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for OrganizationName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrganizationName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed remote workspace name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceName(pub String);

impl fmt::Display for WorkspaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for WorkspaceName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkspaceName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Backend descriptor
// ---------------------------------------------------------------------------

/// How the configuration selects its remote workspace(s).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceBinding {
    /// A single workspace selected by exact name.
    Named(WorkspaceName),
    /// A family of workspaces sharing a tag. Holds the cleaned prefix, which
    /// is used verbatim as the tag.
    Prefixed(String),
}

/// Derive a workspace tag from a legacy workspace prefix by stripping
/// leading and trailing hyphens: `"-team-"` becomes `"team"`.
pub fn derive_tag(prefix: &str) -> String {
    prefix.trim_matches('-').to_string()
}

/// Raw attribute values read out of a legacy backend block, before the
/// migratability rules are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendFields {
    pub organization: Option<String>,
    pub name: Option<String>,
    pub prefix: Option<String>,
    pub hostname: Option<String>,
}

/// Why a file cannot be migrated. This is a reportable outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotMigratable {
    /// The directory holds no `.tf` files.
    NoConfigFiles,
    /// No legacy backend block in any candidate file.
    NoLegacyBlock,
    /// The block has no (or an empty) `organization`.
    MissingOrganization,
    /// The block has neither a workspace `name` nor a `prefix`.
    MissingWorkspace,
    /// The prefix was made only of hyphens, leaving no tag.
    EmptyTag,
}

impl fmt::Display for NotMigratable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotMigratable::NoConfigFiles => write!(f, "no .tf files"),
            NotMigratable::NoLegacyBlock => write!(f, "no remote backend found"),
            NotMigratable::MissingOrganization => write!(f, "remote backend has no organization"),
            NotMigratable::MissingWorkspace => {
                write!(f, "remote backend has neither a workspace name nor a prefix")
            }
            NotMigratable::EmptyTag => write!(f, "workspace prefix yields an empty tag"),
        }
    }
}

/// The semantic content of a legacy backend block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDescriptor {
    organization: OrganizationName,
    binding: WorkspaceBinding,
    hostname: Option<String>,
}

impl BackendDescriptor {
    /// Apply the migratability rules to raw fields.
    ///
    /// `name` wins over `prefix` when both are present.
    pub fn from_fields(fields: BackendFields) -> Result<Self, NotMigratable> {
        let organization = fields
            .organization
            .filter(|org| !org.is_empty())
            .ok_or(NotMigratable::MissingOrganization)?;

        let binding = match (fields.name, fields.prefix) {
            (Some(name), _) if !name.is_empty() => WorkspaceBinding::Named(WorkspaceName(name)),
            (_, Some(prefix)) => {
                let tag = derive_tag(&prefix);
                if tag.is_empty() {
                    return Err(NotMigratable::EmptyTag);
                }
                WorkspaceBinding::Prefixed(tag)
            }
            _ => return Err(NotMigratable::MissingWorkspace),
        };

        Ok(Self {
            organization: OrganizationName(organization),
            binding,
            hostname: fields.hostname.filter(|h| !h.is_empty()),
        })
    }

    pub fn organization(&self) -> &OrganizationName {
        &self.organization
    }

    pub fn binding(&self) -> &WorkspaceBinding {
        &self.binding
    }

    /// Hostname declared inside the legacy block, if any.
    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Plan / backup / tag request
// ---------------------------------------------------------------------------

/// Remote tag association to ensure after a prefix-bound migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagReconciliationRequest {
    pub hostname: String,
    pub organization: OrganizationName,
    pub workspace: WorkspaceName,
    pub tag: String,
}

/// Everything needed to perform (or report) a single file migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    /// Absolute path of the file being migrated.
    pub file: PathBuf,
    /// Byte range of the legacy declaration in `original`.
    pub span: Range<usize>,
    /// File content before migration.
    pub original: String,
    /// Synthesized cloud block that replaces `span`.
    pub replacement: String,
    /// Full file content after migration.
    pub migrated: String,
    pub binding: WorkspaceBinding,
    pub tag_request: Option<TagReconciliationRequest>,
    pub dry_run: bool,
}

impl MigrationPlan {
    /// Bare file name, for reporting.
    pub fn file_name(&self) -> String {
        self.file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file.display().to_string())
    }

    /// Directory the file lives in; external tools run there.
    pub fn folder(&self) -> &Path {
        self.file.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// A pre-mutation copy of a configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    pub original: PathBuf,
    pub backup: PathBuf,
    /// Delete the backup once the migration fully succeeds.
    pub temporary: bool,
    /// SHA-256 hex digest of the content that was backed up.
    pub digest: String,
}

/// `<path>.bak`: sibling backup location for a configuration file.
pub fn backup_path_for(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.bak", path.display()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
