//! `cloudlift diff`: show unified diffs for what migrate would write.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use cloudlift_core::config::{self, ConfigOverrides};
use cloudlift_migrate::diff_directory;

/// Arguments for `cloudlift diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Directory to diff; repeatable. Defaults to the current directory.
    #[arg(short = 'd', long = "directory", value_name = "DIR")]
    pub directories: Vec<PathBuf>,

    /// Hostname the cloud block is rendered for (falls back to TFC_HOSTNAME).
    #[arg(long)]
    pub hostname: Option<String>,

    /// YAML manifest listing directories and defaults.
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let config = config::resolve(ConfigOverrides {
            hostname: self.hostname,
            directories: self.directories,
            manifest: self.manifest,
            ..Default::default()
        })
        .context("invalid configuration")?;

        for directory in &config.directories {
            let result = diff_directory(directory, &config);
            for extra in &result.ambiguous {
                eprintln!(
                    "{} {}: {extra} also declares a remote backend and would be left unchanged",
                    "!".yellow().bold(),
                    result.directory.display()
                );
            }
            match result.diff {
                Ok(diff) => {
                    print!("{}", diff.unified_diff);
                    if !diff.unified_diff.ends_with('\n') {
                        println!();
                    }
                }
                Err(reason) => {
                    println!("No changes for {}: {reason}.", result.directory.display());
                }
            }
        }

        Ok(())
    }
}
