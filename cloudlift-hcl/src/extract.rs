//! Backend descriptor extraction.
//!
//! Two strategies share the [`ExtractStrategy`] seam and are tried in a
//! fixed order; the first one that does not error wins:
//!
//! 1. [`StructuredStrategy`]: parses the whole file with `hcl-rs` and walks
//!    `terraform` → `backend "remote"` → `workspaces`. Comments, quoting and
//!    escapes are handled by the parser.
//! 2. [`PatternStrategy`]: line patterns over the located block's raw
//!    content. Lines whose first non-blank character is `#` are skipped, but
//!    same-line trailing comments are *not* stripped: a trailing
//!    `# name = "old"` is read as if it were live.

use once_cell::sync::Lazy;
use regex::Regex;

use cloudlift_core::types::{BackendDescriptor, BackendFields, NotMigratable};
use hcl::{Block, Body, Expression};

use crate::error::HclError;
use crate::locator::LocatedBlock;

/// One way of reading a legacy block's attributes.
pub trait ExtractStrategy {
    /// Short label for logs and reports.
    fn name(&self) -> &'static str;

    /// Read the raw backend fields out of `text`.
    fn extract(&self, text: &str, block: &LocatedBlock) -> Result<BackendFields, HclError>;
}

/// Result of a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub descriptor: BackendDescriptor,
    /// Name of the strategy that produced the descriptor.
    pub strategy: &'static str,
}

/// Run the strategies in order and apply the migratability rules to the
/// first strategy's fields.
pub fn extract(text: &str, block: &LocatedBlock) -> Result<Extraction, NotMigratable> {
    let strategies: [&dyn ExtractStrategy; 2] = [&StructuredStrategy, &PatternStrategy];
    extract_with(&strategies, text, block)
}

/// [`extract`] with an explicit strategy list.
pub fn extract_with(
    strategies: &[&dyn ExtractStrategy],
    text: &str,
    block: &LocatedBlock,
) -> Result<Extraction, NotMigratable> {
    for strategy in strategies {
        match strategy.extract(text, block) {
            Ok(fields) => {
                tracing::debug!(strategy = strategy.name(), ?fields, "backend fields extracted");
                return BackendDescriptor::from_fields(fields).map(|descriptor| Extraction {
                    descriptor,
                    strategy: strategy.name(),
                });
            }
            Err(err) => {
                tracing::warn!(
                    strategy = strategy.name(),
                    error = %err,
                    "extraction failed, falling back"
                );
            }
        }
    }
    Err(NotMigratable::MissingOrganization)
}

// ---------------------------------------------------------------------------
// Structured strategy
// ---------------------------------------------------------------------------

/// Full-document parse with `hcl-rs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredStrategy;

impl ExtractStrategy for StructuredStrategy {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn extract(&self, text: &str, _block: &LocatedBlock) -> Result<BackendFields, HclError> {
        let body = hcl::parse(text)?;
        let remote = remote_backend(&body).ok_or(HclError::BackendNotFound)?;

        let config = remote.body();
        let workspaces = child_blocks(config, "workspaces").next();
        Ok(BackendFields {
            organization: string_attr(config, "organization"),
            name: workspaces.and_then(|ws| string_attr(ws.body(), "name")),
            prefix: workspaces.and_then(|ws| string_attr(ws.body(), "prefix")),
            hostname: string_attr(config, "hostname"),
        })
    }
}

/// Whether a full parse of `text` finds a remote backend. Text that does not
/// parse counts as `false`.
pub fn parses_remote_backend(text: &str) -> bool {
    hcl::parse(text)
        .map(|body| remote_backend(&body).is_some())
        .unwrap_or(false)
}

fn remote_backend(body: &Body) -> Option<&Block> {
    child_blocks(body, "terraform")
        .flat_map(|tf| child_blocks(tf.body(), "backend"))
        .find(|backend| {
            backend
                .labels()
                .first()
                .is_some_and(|label| label.as_str() == "remote")
        })
}

fn child_blocks<'a>(body: &'a Body, identifier: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
    body.blocks()
        .filter(move |block| block.identifier() == identifier)
}

/// Literal string value of `key`; interpolated or non-string values are `None`.
fn string_attr(body: &Body, key: &str) -> Option<String> {
    body.attributes()
        .find(|attr| attr.key() == key)
        .and_then(|attr| match attr.expr() {
            Expression::String(value) => Some(value.clone()),
            _ => None,
        })
}

// ---------------------------------------------------------------------------
// Pattern strategy
// ---------------------------------------------------------------------------

static ORGANIZATION: Lazy<Regex> = Lazy::new(|| attribute_pattern("organization"));
static NAME: Lazy<Regex> = Lazy::new(|| attribute_pattern("name"));
static PREFIX: Lazy<Regex> = Lazy::new(|| attribute_pattern("prefix"));

fn attribute_pattern(key: &str) -> Regex {
    Regex::new(&format!(r#"\b{key}\s*=\s*"(?P<val>[^"]+)""#)).expect("static regex")
}

/// Line-oriented fallback over the located block's raw content.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternStrategy;

impl PatternStrategy {
    fn find(pattern: &Regex, inner: &str) -> Option<String> {
        inner
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .find_map(|line| pattern.captures(line))
            .map(|caps| caps["val"].to_string())
    }
}

impl ExtractStrategy for PatternStrategy {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn extract(&self, text: &str, block: &LocatedBlock) -> Result<BackendFields, HclError> {
        let inner = block.inner(text);
        Ok(BackendFields {
            organization: Self::find(&ORGANIZATION, inner),
            name: Self::find(&NAME, inner),
            prefix: Self::find(&PREFIX, inner),
            hostname: None,
        })
    }
}
