//! The `terraform` executable, behind the [`Terraform`] trait so the
//! rewriter can be driven by a fake in tests.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::error::{io_err, MigrateError};

/// Answer written to `terraform init`'s state-migration prompt.
const CONFIRMATION: &[u8] = b"yes\n";

/// External tool operations used during a migration.
pub trait Terraform {
    /// Version string; used as an availability check.
    fn version(&self) -> Result<String, MigrateError>;

    /// Normalise formatting of `file`. Failure is reported, never fatal.
    fn fmt(&self, file: &Path, dir: &Path) -> Result<(), MigrateError>;

    /// Initialise `dir` against its (new) backend, confirming any prompt.
    /// Returns the combined output on success.
    fn init(&self, dir: &Path) -> Result<String, MigrateError>;
}

/// [`Terraform`] implemented by spawning the real binary.
#[derive(Debug, Clone)]
pub struct TerraformCli {
    binary: PathBuf,
}

impl TerraformCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command(&self) -> Command {
        Command::new(&self.binary)
    }

    fn spawn_err(&self, source: std::io::Error) -> MigrateError {
        if source.kind() == ErrorKind::NotFound {
            MigrateError::ToolMissing {
                program: self.binary.clone(),
            }
        } else {
            MigrateError::Spawn {
                program: self.binary.clone(),
                source,
            }
        }
    }
}

impl Terraform for TerraformCli {
    fn version(&self) -> Result<String, MigrateError> {
        let output = self
            .command()
            .arg("version")
            .output()
            .map_err(|e| self.spawn_err(e))?;
        check("version", &output)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }

    fn fmt(&self, file: &Path, dir: &Path) -> Result<(), MigrateError> {
        let output = self
            .command()
            .arg("fmt")
            .arg(file)
            .current_dir(dir)
            .output()
            .map_err(|e| self.spawn_err(e))?;
        check("fmt", &output)
    }

    fn init(&self, dir: &Path) -> Result<String, MigrateError> {
        let mut child = self
            .command()
            .arg("init")
            .current_dir(dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_err(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            // The process may exit without reading its input.
            if let Err(err) = stdin.write_all(CONFIRMATION) {
                if err.kind() != ErrorKind::BrokenPipe {
                    return Err(io_err(dir, err));
                }
            }
        }

        let output = child.wait_with_output().map_err(|e| io_err(dir, e))?;
        check("init", &output)?;
        Ok(combined(&output))
    }
}

/// Stdout followed by stderr, trailing whitespace trimmed.
fn combined(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stderr);
    }
    text.trim_end().to_string()
}

fn check(command: &'static str, output: &Output) -> Result<(), MigrateError> {
    if output.status.success() {
        return Ok(());
    }
    Err(MigrateError::ToolFailed {
        command,
        status: output.status.to_string(),
        output: combined(output),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_binary_is_tool_missing() {
        let dir = TempDir::new().unwrap();
        let tf = TerraformCli::new(dir.path().join("no-such-terraform"));
        assert!(matches!(tf.version(), Err(MigrateError::ToolMissing { .. })));
        assert!(matches!(tf.init(dir.path()), Err(MigrateError::ToolMissing { .. })));
    }

    #[cfg(unix)]
    mod scripted {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, body: &str) -> TerraformCli {
            let path = dir.join("terraform");
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            TerraformCli::new(path)
        }

        #[test]
        fn version_returns_first_line() {
            let dir = TempDir::new().unwrap();
            let tf = script(dir.path(), "echo 'Terraform v1.7.5'\necho 'on linux_amd64'");
            assert_eq!(tf.version().unwrap(), "Terraform v1.7.5");
        }

        #[test]
        fn init_receives_confirmation_and_combines_output() {
            let dir = TempDir::new().unwrap();
            let tf = script(
                dir.path(),
                "read answer\necho \"answered $answer\"\necho 'note' 1>&2",
            );
            let out = tf.init(dir.path()).unwrap();
            assert_eq!(out, "answered yes\nnote");
        }

        #[test]
        fn failing_init_carries_output() {
            let dir = TempDir::new().unwrap();
            let tf = script(dir.path(), "echo 'Error: backend unreachable' 1>&2\nexit 1");
            let err = tf.init(dir.path()).unwrap_err();
            assert!(matches!(err, MigrateError::ToolFailed { command: "init", .. }));
            assert_eq!(err.output(), Some("Error: backend unreachable"));
        }

        #[test]
        fn init_that_ignores_stdin_still_succeeds() {
            let dir = TempDir::new().unwrap();
            let tf = script(dir.path(), "exec 0<&-\necho done");
            assert_eq!(tf.init(dir.path()).unwrap(), "done");
        }
    }
}
