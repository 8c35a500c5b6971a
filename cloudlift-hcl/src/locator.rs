//! Block locator: finds the first `backend "remote"` declaration nested
//! directly inside a top-level `terraform { }` block.
//!
//! The scan is brace-balanced and skips string literals and comments
//! (`#`, `//`, `/* */`), so braces in strings, commented-out declarations and
//! nested `workspaces { }` blocks do not confuse it. Heredocs are not
//! recognised.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

static TERRAFORM_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^terraform\s*\{").expect("static regex"));
static BACKEND_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^backend\s+"remote"\s*\{"#).expect("static regex"));

/// Location of a legacy backend declaration within a file's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedBlock {
    /// `backend` keyword through the declaration's closing brace, inclusive.
    pub span: Range<usize>,
    /// Everything between the declaration's braces.
    pub body: Range<usize>,
    /// Indentation of the line the declaration starts on.
    pub indent: String,
}

impl LocatedBlock {
    /// Text before the declaration.
    pub fn prefix<'a>(&self, text: &'a str) -> &'a str {
        &text[..self.span.start]
    }

    /// Raw content between the declaration's braces.
    pub fn inner<'a>(&self, text: &'a str) -> &'a str {
        &text[self.body.clone()]
    }

    /// Text after the declaration's closing brace.
    pub fn suffix<'a>(&self, text: &'a str) -> &'a str {
        &text[self.span.end..]
    }

    /// Substitute `block` for the declaration; all other bytes are kept.
    pub fn replace(&self, text: &str, block: &str) -> String {
        let mut out = String::with_capacity(text.len() + block.len());
        out.push_str(self.prefix(text));
        out.push_str(block);
        out.push_str(self.suffix(text));
        out
    }
}

/// Find the first legacy backend declaration, or `None` when the file is
/// not a migration candidate.
pub fn locate(text: &str) -> Option<LocatedBlock> {
    let mut depth = 0usize;
    let mut code = CodeBytes::new(text, 0);
    while let Some((i, b)) = code.next() {
        match b {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b't' if depth == 0 && at_word_start(text, i) => {
                let Some(m) = TERRAFORM_OPEN.find(&text[i..]) else {
                    continue;
                };
                let open = i + m.end() - 1;
                let close = matching_brace(text, open)?;
                if let Some(found) = locate_in_terraform(text, open, close) {
                    return Some(found);
                }
                code = CodeBytes::new(text, close + 1);
            }
            _ => {}
        }
    }
    None
}

fn locate_in_terraform(text: &str, open: usize, close: usize) -> Option<LocatedBlock> {
    let mut depth = 0usize;
    for (i, b) in CodeBytes::new(text, open + 1) {
        if i >= close {
            break;
        }
        match b {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b'b' if depth == 0 && at_word_start(text, i) => {
                let Some(m) = BACKEND_OPEN.find(&text[i..]) else {
                    continue;
                };
                let block_open = i + m.end() - 1;
                let block_close = matching_brace(text, block_open)?;
                if block_close > close {
                    return None;
                }
                return Some(LocatedBlock {
                    span: i..block_close + 1,
                    body: block_open + 1..block_close,
                    indent: line_indent(text, i),
                });
            }
            _ => {}
        }
    }
    None
}

/// Index of the `}` balancing the `{` at `open`.
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in CodeBytes::new(text, open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

fn at_word_start(text: &str, i: usize) -> bool {
    i == 0 || !is_ident_byte(text.as_bytes()[i - 1])
}

/// Leading whitespace of the line containing byte `i`. When other code
/// precedes `i` on that line, one extra level is added.
fn line_indent(text: &str, i: usize) -> String {
    let line_start = text[..i].rfind('\n').map_or(0, |n| n + 1);
    let before = &text[line_start..i];
    let lead: String = before
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect();
    if lead.len() == before.len() {
        lead
    } else {
        format!("{lead}  ")
    }
}

// ---------------------------------------------------------------------------
// Code-byte iterator
// ---------------------------------------------------------------------------

/// Yields `(index, byte)` for every byte outside string literals and
/// comments, starting at `pos`.
struct CodeBytes<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> CodeBytes<'a> {
    fn new(text: &'a str, pos: usize) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos,
        }
    }

    fn skip_string(&self, from: usize) -> usize {
        let mut i = from;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                b'"' => return i + 1,
                // HCL strings never span lines; stop at the newline.
                b'\n' => return i,
                _ => i += 1,
            }
        }
        self.bytes.len()
    }

    fn skip_line(&self, from: usize) -> usize {
        self.bytes[from..]
            .iter()
            .position(|b| *b == b'\n')
            .map_or(self.bytes.len(), |n| from + n)
    }

    fn skip_block_comment(&self, from: usize) -> usize {
        self.bytes[from..]
            .windows(2)
            .position(|w| w == b"*/")
            .map_or(self.bytes.len(), |n| from + n + 2)
    }
}

impl Iterator for CodeBytes<'_> {
    type Item = (usize, u8);

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.bytes.len() {
            let i = self.pos;
            let b = self.bytes[i];
            let next = self.bytes.get(i + 1).copied();
            match (b, next) {
                (b'"', _) => self.pos = self.skip_string(i + 1),
                (b'#', _) | (b'/', Some(b'/')) => self.pos = self.skip_line(i),
                (b'/', Some(b'*')) => self.pos = self.skip_block_comment(i + 2),
                _ => {
                    self.pos = i + 1;
                    return Some((i, b));
                }
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const NAMED: &str = r#"terraform {
  required_version = ">= 1.5"

  backend "remote" {
    organization = "acme"

    workspaces {
      name = "net-prod"
    }
  }
}

resource "null_resource" "x" {}
"#;

    #[test]
    fn finds_block_with_nested_workspaces() {
        let block = locate(NAMED).expect("located");
        let declared = &NAMED[block.span.clone()];
        assert!(declared.starts_with("backend \"remote\" {"));
        assert!(declared.ends_with("}\n  }"));
        assert!(block.inner(NAMED).contains("name = \"net-prod\""));
        assert_eq!(block.indent, "  ");
        assert_eq!(block.suffix(NAMED), "\n}\n\nresource \"null_resource\" \"x\" {}\n");
    }

    #[test]
    fn no_terraform_block_is_not_found() {
        assert!(locate("resource \"a\" \"b\" {\n  x = 1\n}\n").is_none());
        assert!(locate("").is_none());
    }

    #[test]
    fn other_backend_types_are_ignored() {
        let text = "terraform {\n  backend \"s3\" {\n    bucket = \"b\"\n  }\n}\n";
        assert!(locate(text).is_none());
    }

    #[test]
    fn commented_out_declaration_is_ignored() {
        let text = "terraform {\n  # backend \"remote\" {\n  // backend \"remote\" {\n  /* backend \"remote\" { */\n}\n";
        assert!(locate(text).is_none());
    }

    #[test]
    fn backend_outside_terraform_block_is_ignored() {
        let text = "locals {\n  backend \"remote\" {\n  }\n}\n";
        assert!(locate(text).is_none());
    }

    #[test]
    fn braces_before_and_inside_strings_are_tolerated() {
        let text = r#"resource "a" "b" {
  tags = { k = "v}" }
}

terraform {
  backend "remote" {
    organization = "weird}org"
    workspaces { name = "w" }
  }
}
"#;
        let block = locate(text).expect("located");
        assert!(block.inner(text).contains("weird}org"));
        assert!(block.suffix(text).starts_with("\n}\n"));
    }

    #[test]
    fn second_terraform_block_is_searched() {
        let text = "terraform {\n  required_version = \"1\"\n}\n\nterraform {\n  backend \"remote\" {\n    organization = \"o\"\n  }\n}\n";
        let block = locate(text).expect("located");
        assert!(block.prefix(text).contains("required_version"));
    }

    #[test]
    fn replace_preserves_everything_outside_span() {
        let block = locate(NAMED).expect("located");
        let out = block.replace(NAMED, "cloud {}");
        assert_eq!(
            out,
            format!("{}cloud {{}}{}", block.prefix(NAMED), block.suffix(NAMED))
        );
        assert!(out.starts_with("terraform {\n  required_version"));
        assert!(out.ends_with("resource \"null_resource\" \"x\" {}\n"));
    }

    #[test]
    fn unbalanced_block_is_not_found() {
        let text = "terraform {\n  backend \"remote\" {\n    organization = \"o\"\n";
        assert!(locate(text).is_none());
    }

    #[test]
    fn same_line_declaration_gets_extra_indent() {
        let text = "terraform { backend \"remote\" { organization = \"o\" } }\n";
        let block = locate(text).expect("located");
        assert_eq!(block.indent, "  ");
        assert_eq!(block.inner(text), " organization = \"o\" ");
    }

    #[test]
    fn tab_indentation_is_kept() {
        let text = "terraform {\n\tbackend \"remote\" {\n\t}\n}\n";
        let block = locate(text).expect("located");
        assert_eq!(block.indent, "\t");
    }
}
