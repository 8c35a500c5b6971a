//! `cloudlift migrate`: rewrite, initialise and tag each target directory.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use cloudlift_core::config::{self, ConfigOverrides, RunConfig, RunMode};
use cloudlift_migrate::{
    pipeline, DirectoryOutcome, DirectoryReport, RewriteOutcome, TerraformCli,
};
use cloudlift_remote::{ReconcileOutcome, TfcClient, WorkspaceApi};

/// Exact answer that confirms an applying run.
const CONFIRMATION: &str = "YES";

/// Arguments for `cloudlift migrate`.
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// API token for tag updates (falls back to TFC_TOKEN).
    #[arg(long)]
    pub token: Option<String>,

    /// Terraform Cloud / Enterprise hostname (falls back to TFC_HOSTNAME).
    #[arg(long)]
    pub hostname: Option<String>,

    /// Actually modify files; without this flag only a preview is printed.
    #[arg(long)]
    pub no_dry_run: bool,

    /// Directory to migrate; repeatable. Defaults to the current directory.
    #[arg(short = 'd', long = "directory", value_name = "DIR")]
    pub directories: Vec<PathBuf>,

    /// Keep `<file>.bak` after a successful migration.
    #[arg(long)]
    pub backup: bool,

    /// YAML manifest listing directories and defaults.
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Terraform executable (falls back to CLOUDLIFT_TERRAFORM).
    #[arg(long, value_name = "PATH")]
    pub terraform: Option<PathBuf>,

    /// Emit a machine-readable run report.
    #[arg(long)]
    pub json: bool,
}

impl MigrateArgs {
    pub fn run(self) -> Result<()> {
        let json = self.json;
        let config = config::resolve(ConfigOverrides {
            token: self.token,
            hostname: self.hostname,
            apply: self.no_dry_run,
            directories: self.directories,
            backup: self.backup,
            manifest: self.manifest,
            terraform_bin: self.terraform,
        })
        .context("invalid configuration")?;
        tracing::debug!(
            mode = ?config.mode,
            hostname = %config.hostname,
            directories = config.directories.len(),
            "configuration resolved"
        );

        let terraform = TerraformCli::new(&config.terraform_bin);
        let version = pipeline::preflight(&config, &terraform)
            .context("terraform is required to migrate")?;

        if !json {
            print_header(&config, version.as_deref());
        }
        if !config.dry_run() && !confirm()? {
            println!("Aborted; nothing was changed.");
            return Ok(());
        }

        let client = match (&config.token, config.mode) {
            (Some(token), RunMode::Apply) => Some(TfcClient::new(&config.hostname, token)),
            _ => None,
        };
        let api = client.as_ref().map(|c| c as &dyn WorkspaceApi);

        let started_at = Utc::now();
        let reports = pipeline::run(&config, &terraform, api, |report| {
            if !json {
                print_report(report, &config);
            }
        });
        let finished_at = Utc::now();

        if json {
            print_json(&RunReport {
                started_at,
                finished_at,
                mode: config.mode,
                hostname: &config.hostname,
                terraform: version,
                directories: &reports,
            })?;
        } else {
            print_summary(&reports);
        }

        let failed = reports.iter().filter(|r| r.outcome.is_failure()).count();
        if failed > 0 {
            bail!("{failed} of {} directories failed to migrate", reports.len());
        }
        Ok(())
    }
}

/// Ask for explicit confirmation on stderr; anything but exactly `YES`
/// declines. Only the line terminator is stripped.
fn confirm() -> Result<bool> {
    let mut stderr = std::io::stderr();
    write!(
        stderr,
        "{} This will modify files and re-initialise state. Type '{CONFIRMATION}' to proceed: ",
        "WARNING:".yellow().bold()
    )?;
    stderr.flush()?;

    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    Ok(answer.trim_end_matches(['\r', '\n']) == CONFIRMATION)
}

// ---------------------------------------------------------------------------
// Text output
// ---------------------------------------------------------------------------

fn print_header(config: &RunConfig, version: Option<&str>) {
    let mode = match config.mode {
        RunMode::DryRun => "DRY RUN".cyan().bold(),
        RunMode::Apply => "APPLY".red().bold(),
    };
    println!(
        "cloudlift v{} | {mode} | host {} | {} directories",
        env!("CARGO_PKG_VERSION"),
        config.hostname,
        config.directories.len()
    );
    if let Some(version) = version {
        println!("{}", version.bright_black());
    }
}

fn print_report(report: &DirectoryReport, config: &RunConfig) {
    let dir = report.directory.display();
    for extra in &report.ambiguous {
        println!(
            "{} {dir}: {extra} also declares a remote backend and was left unchanged",
            "!".yellow().bold()
        );
    }

    match &report.outcome {
        DirectoryOutcome::Skipped { reason } => {
            println!("{} {dir}: {reason}", "·".bright_black());
        }
        DirectoryOutcome::WouldMigrate {
            file,
            workspaces,
            tag_workspace,
        } => {
            let tag = tag_workspace
                .as_deref()
                .map(|ws| format!(" and add tag to '{ws}'"))
                .unwrap_or_default();
            println!(
                "{} Would update {} with host '{}', {workspaces}{tag}",
                "[DRY RUN]".cyan(),
                file.display(),
                config.hostname
            );
        }
        DirectoryOutcome::Applied { file, result } => print_applied(file, result),
    }
}

fn print_applied(file: &Path, result: &RewriteOutcome) {
    let file = file.display();
    match result {
        RewriteOutcome::Committed {
            backup,
            format_warning,
            init_output,
            tag,
        } => {
            println!("{} migrated {file}", "✓".green().bold());
            if let Some(warning) = format_warning {
                println!("  {} {warning}", "fmt:".yellow());
            }
            print_output(init_output);
            match tag {
                Some(ReconcileOutcome::Added) => println!("  tag added"),
                Some(ReconcileOutcome::AlreadyPresent) => println!("  tag already present"),
                Some(ReconcileOutcome::Failed { detail }) => {
                    println!("  {} tag update failed: {detail}", "!".yellow().bold())
                }
                None => {}
            }
            if let Some(backup) = backup {
                println!("  backup kept at {}", backup.display());
            }
        }
        RewriteOutcome::RolledBack {
            error,
            output,
            backup,
        } => {
            println!("{} {file}: {error}", "✗".red().bold());
            if let Some(output) = output {
                print_output(output);
            }
            println!(
                "  original restored; backup kept at {}",
                backup.display()
            );
        }
        RewriteOutcome::RestoreFailed {
            error,
            output,
            restore_error,
            backup,
        } => {
            println!("{} {file}: {error}", "✗".red().bold());
            if let Some(output) = output {
                print_output(output);
            }
            println!(
                "  {} restore failed ({restore_error}); copy {} over {file} by hand",
                "CRITICAL:".red().bold(),
                backup.display()
            );
        }
        RewriteOutcome::Aborted { error } => {
            println!("{} {file}: {error}; file left untouched", "✗".red().bold());
        }
    }
}

fn print_output(output: &str) {
    for line in output.lines() {
        println!("  {}", line.bright_black());
    }
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "directory")]
    directory: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "detail")]
    detail: String,
}

fn print_summary(reports: &[DirectoryReport]) {
    if reports.is_empty() {
        return;
    }
    let rows: Vec<SummaryRow> = reports
        .iter()
        .map(|r| SummaryRow {
            directory: r.directory.display().to_string(),
            status: status_label(&r.outcome).to_string(),
            detail: status_detail(&r.outcome),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn status_label(outcome: &DirectoryOutcome) -> &'static str {
    match outcome {
        DirectoryOutcome::Skipped { .. } => "SKIPPED",
        DirectoryOutcome::WouldMigrate { .. } => "WOULD MIGRATE",
        DirectoryOutcome::Applied { result, .. } => match result {
            RewriteOutcome::Committed { .. } => "MIGRATED",
            RewriteOutcome::RolledBack { .. } => "ROLLED BACK",
            RewriteOutcome::RestoreFailed { .. } => "RESTORE FAILED",
            RewriteOutcome::Aborted { .. } => "ABORTED",
        },
    }
}

fn status_detail(outcome: &DirectoryOutcome) -> String {
    match outcome {
        DirectoryOutcome::Skipped { reason } => reason.to_string(),
        DirectoryOutcome::WouldMigrate { file, .. } => file_name(file),
        DirectoryOutcome::Applied { file, result } => match result {
            RewriteOutcome::Committed { .. } => file_name(file),
            RewriteOutcome::RolledBack { error, .. }
            | RewriteOutcome::RestoreFailed { error, .. }
            | RewriteOutcome::Aborted { error } => error.clone(),
        },
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// JSON output
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RunReport<'a> {
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    mode: RunMode,
    hostname: &'a str,
    terraform: Option<String>,
    directories: &'a [DirectoryReport],
}

fn print_json(report: &RunReport<'_>) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(report).context("failed to serialize run report")?
    );
    Ok(())
}
