//! Run configuration, resolved once at process start.
//!
//! # Precedence
//!
//! For every field: CLI override > environment variable > run manifest >
//! built-in default.
//!
//! # API pattern
//!
//! - `resolve_at(overrides, env, cwd)`: explicit environment lookup and
//!   working directory; used in tests.
//! - `resolve(overrides)`: reads the process environment and current
//!   directory, delegates to `resolve_at`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::DEFAULT_HOSTNAME;

/// API token variable.
pub const TOKEN_ENV: &str = "TFC_TOKEN";
/// Remote hostname variable.
pub const HOSTNAME_ENV: &str = "TFC_HOSTNAME";
/// Path to the terraform executable.
pub const TERRAFORM_ENV: &str = "CLOUDLIFT_TERRAFORM";
/// Executable looked up on `PATH` when nothing else is configured.
pub const DEFAULT_TERRAFORM_BIN: &str = "terraform";

/// Whether the run may touch disk, processes, and the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    DryRun,
    Apply,
}

/// Values supplied on the command line. `None` / empty means "not given".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub token: Option<String>,
    pub hostname: Option<String>,
    pub apply: bool,
    pub directories: Vec<PathBuf>,
    pub backup: bool,
    pub manifest: Option<PathBuf>,
    pub terraform_bin: Option<PathBuf>,
}

/// Optional YAML run manifest.
///
/// ```yaml
/// directories:
///   - infra/network
///   - infra/dns
/// hostname: tfe.example.com
/// backup: true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub directories: Vec<PathBuf>,
    pub hostname: Option<String>,
    pub backup: Option<bool>,
}

/// Fully resolved configuration handed to the migration engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub token: Option<String>,
    pub hostname: String,
    /// Absolute target directories, in the order given.
    pub directories: Vec<PathBuf>,
    pub mode: RunMode,
    /// Keep the `.bak` file after a successful migration.
    pub keep_backup: bool,
    pub terraform_bin: PathBuf,
}

impl RunConfig {
    pub fn dry_run(&self) -> bool {
        self.mode == RunMode::DryRun
    }
}

/// Load a run manifest from disk.
pub fn load_manifest(path: &Path) -> Result<Manifest, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Manifest {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve against an explicit environment and working directory.
pub fn resolve_at<F>(
    overrides: ConfigOverrides,
    env: F,
    cwd: &Path,
) -> Result<RunConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    let (manifest, manifest_base) = match overrides.manifest.as_deref() {
        Some(path) => {
            let path = absolutize(cwd, path);
            let base = path.parent().map(Path::to_path_buf).unwrap_or_else(|| cwd.to_path_buf());
            (load_manifest(&path)?, base)
        }
        None => (Manifest::default(), cwd.to_path_buf()),
    };

    let mode = if overrides.apply {
        RunMode::Apply
    } else {
        RunMode::DryRun
    };

    let token = overrides
        .token
        .filter(|t| !t.trim().is_empty())
        .or_else(|| env(TOKEN_ENV));
    if mode == RunMode::Apply && token.is_none() {
        return Err(ConfigError::MissingToken);
    }

    let hostname = overrides
        .hostname
        .or_else(|| env(HOSTNAME_ENV))
        .or(manifest.hostname)
        .unwrap_or_else(|| DEFAULT_HOSTNAME.to_string())
        .trim()
        .to_string();
    if hostname.is_empty() {
        return Err(ConfigError::EmptyHostname);
    }

    let directories = if !overrides.directories.is_empty() {
        overrides
            .directories
            .iter()
            .map(|d| absolutize(cwd, d))
            .collect()
    } else if !manifest.directories.is_empty() {
        manifest
            .directories
            .iter()
            .map(|d| absolutize(&manifest_base, d))
            .collect()
    } else {
        vec![absolutize(cwd, Path::new("."))]
    };

    let terraform_bin = overrides
        .terraform_bin
        .or_else(|| env(TERRAFORM_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TERRAFORM_BIN));

    Ok(RunConfig {
        token,
        hostname,
        directories,
        mode,
        keep_backup: overrides.backup || manifest.backup.unwrap_or(false),
        terraform_bin,
    })
}

/// Resolve against the process environment and current directory.
pub fn resolve(overrides: ConfigOverrides) -> Result<RunConfig, ConfigError> {
    let cwd = std::env::current_dir().map_err(|e| io_err(".", e))?;
    resolve_at(overrides, |key| std::env::var(key).ok(), &cwd)
}

/// Join relative paths onto `base`; canonicalize when the target exists so
/// directory names (used as workspace names) are never `.` or `..`.
fn absolutize(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    std::fs::canonicalize(&joined).unwrap_or(joined)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_dry_run_on_default_host_in_cwd() {
        let cwd = TempDir::new().unwrap();
        let cfg = resolve_at(ConfigOverrides::default(), env_of(&[]), cwd.path()).unwrap();
        assert_eq!(cfg.mode, RunMode::DryRun);
        assert_eq!(cfg.hostname, DEFAULT_HOSTNAME);
        assert_eq!(cfg.directories, vec![fs::canonicalize(cwd.path()).unwrap()]);
        assert_eq!(cfg.terraform_bin, PathBuf::from("terraform"));
        assert!(!cfg.keep_backup);
    }

    #[test]
    fn apply_without_token_is_rejected() {
        let cwd = TempDir::new().unwrap();
        let overrides = ConfigOverrides {
            apply: true,
            ..Default::default()
        };
        let err = resolve_at(overrides, env_of(&[]), cwd.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken));
    }

    #[test]
    fn blank_env_token_counts_as_missing() {
        let cwd = TempDir::new().unwrap();
        let overrides = ConfigOverrides {
            apply: true,
            ..Default::default()
        };
        let err = resolve_at(overrides, env_of(&[(TOKEN_ENV, "  ")]), cwd.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken));
    }

    #[test]
    fn cli_beats_env_for_token_and_hostname() {
        let cwd = TempDir::new().unwrap();
        let overrides = ConfigOverrides {
            token: Some("cli-token".into()),
            hostname: Some("tfe.cli.example".into()),
            apply: true,
            ..Default::default()
        };
        let env = env_of(&[(TOKEN_ENV, "env-token"), (HOSTNAME_ENV, "tfe.env.example")]);
        let cfg = resolve_at(overrides, env, cwd.path()).unwrap();
        assert_eq!(cfg.token.as_deref(), Some("cli-token"));
        assert_eq!(cfg.hostname, "tfe.cli.example");
        assert_eq!(cfg.mode, RunMode::Apply);
    }

    #[test]
    fn env_supplies_missing_values() {
        let cwd = TempDir::new().unwrap();
        let env = env_of(&[
            (TOKEN_ENV, "env-token"),
            (HOSTNAME_ENV, "tfe.env.example"),
            (TERRAFORM_ENV, "/opt/tf/terraform"),
        ]);
        let cfg = resolve_at(ConfigOverrides::default(), env, cwd.path()).unwrap();
        assert_eq!(cfg.token.as_deref(), Some("env-token"));
        assert_eq!(cfg.hostname, "tfe.env.example");
        assert_eq!(cfg.terraform_bin, PathBuf::from("/opt/tf/terraform"));
    }

    #[test]
    fn relative_directories_resolve_against_cwd() {
        let cwd = TempDir::new().unwrap();
        fs::create_dir_all(cwd.path().join("net")).unwrap();
        let overrides = ConfigOverrides {
            directories: vec![PathBuf::from("net"), PathBuf::from("missing")],
            ..Default::default()
        };
        let cfg = resolve_at(overrides, env_of(&[]), cwd.path()).unwrap();
        let root = fs::canonicalize(cwd.path()).unwrap();
        assert_eq!(cfg.directories[0], root.join("net"));
        assert_eq!(cfg.directories[1], cwd.path().join("missing"));
    }

    #[test]
    fn manifest_supplies_directories_hostname_and_backup() {
        let cwd = TempDir::new().unwrap();
        let runs = cwd.path().join("runs");
        fs::create_dir_all(runs.join("dns")).unwrap();
        fs::write(
            runs.join("cloudlift.yaml"),
            "directories:\n  - dns\nhostname: tfe.manifest.example\nbackup: true\n",
        )
        .unwrap();

        let overrides = ConfigOverrides {
            manifest: Some(PathBuf::from("runs/cloudlift.yaml")),
            ..Default::default()
        };
        let cfg = resolve_at(overrides, env_of(&[]), cwd.path()).unwrap();
        assert_eq!(
            cfg.directories,
            vec![fs::canonicalize(runs.join("dns")).unwrap()]
        );
        assert_eq!(cfg.hostname, "tfe.manifest.example");
        assert!(cfg.keep_backup);
    }

    #[test]
    fn env_hostname_beats_manifest() {
        let cwd = TempDir::new().unwrap();
        let manifest = cwd.path().join("m.yaml");
        fs::write(&manifest, "hostname: tfe.manifest.example\n").unwrap();
        let overrides = ConfigOverrides {
            manifest: Some(manifest),
            ..Default::default()
        };
        let cfg = resolve_at(overrides, env_of(&[(HOSTNAME_ENV, "tfe.env.example")]), cwd.path())
            .unwrap();
        assert_eq!(cfg.hostname, "tfe.env.example");
    }

    #[test]
    fn malformed_manifest_reports_path() {
        let cwd = TempDir::new().unwrap();
        let manifest = cwd.path().join("bad.yaml");
        fs::write(&manifest, "directories: [unclosed\n").unwrap();
        let overrides = ConfigOverrides {
            manifest: Some(manifest),
            ..Default::default()
        };
        let err = resolve_at(overrides, env_of(&[]), cwd.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Manifest { .. }), "got: {err}");
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn unknown_manifest_key_is_rejected() {
        let cwd = TempDir::new().unwrap();
        let manifest = cwd.path().join("typo.yaml");
        fs::write(&manifest, "directorys:\n  - a\n").unwrap();
        let err = load_manifest(&manifest).unwrap_err();
        assert!(matches!(err, ConfigError::Manifest { .. }));
    }
}
