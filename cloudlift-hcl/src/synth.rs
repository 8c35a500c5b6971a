//! Cloud block synthesis.
//!
//! The block is rendered to slot into the located span: its first line
//! continues the line the legacy `backend` keyword sat on, and every
//! following line is indented relative to that line's indentation.
//!
//! ```text
//! cloud {
//!     hostname = "tfe.example.com"      <- only for non-default hosts
//!     organization = "acme"
//!     workspaces {
//!       name = "net-prod"               <- or: tags = ["team"]
//!     }
//!   }
//! ```

use cloudlift_core::types::{BackendDescriptor, WorkspaceBinding, DEFAULT_HOSTNAME};

const INDENT_UNIT: &str = "  ";

/// Render the cloud block replacing a legacy backend declaration.
///
/// `indent` is the indentation of the line the declaration started on.
pub fn render(descriptor: &BackendDescriptor, hostname: &str, indent: &str) -> String {
    let field = format!("{indent}{INDENT_UNIT}");
    let nested = format!("{field}{INDENT_UNIT}");

    let mut out = String::from("cloud {\n");
    if let Some(host) = host_attribute(hostname) {
        out.push_str(&format!("{field}{host}\n"));
    }
    out.push_str(&format!(
        "{field}organization = \"{}\"\n",
        escape(&descriptor.organization().0)
    ));
    out.push_str(&format!("{field}workspaces {{\n"));
    out.push_str(&format!("{nested}{}\n", workspace_attribute(descriptor.binding())));
    out.push_str(&format!("{field}}}\n"));
    out.push_str(&format!("{indent}}}"));
    out
}

/// `hostname = "<host>"`, or `None` for the default host.
pub fn host_attribute(hostname: &str) -> Option<String> {
    (hostname != DEFAULT_HOSTNAME).then(|| format!("hostname = \"{}\"", escape(hostname)))
}

/// The attribute carried by the cloud block's `workspaces` body.
pub fn workspace_attribute(binding: &WorkspaceBinding) -> String {
    match binding {
        WorkspaceBinding::Named(name) => format!("name = \"{}\"", escape(&name.0)),
        WorkspaceBinding::Prefixed(tag) => format!("tags = [\"{}\"]", escape(tag)),
    }
}

/// Escape a value for a quoted HCL string literal.
fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace("${", "$${")
        .replace("%{", "%%{")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use cloudlift_core::types::BackendFields;

    fn descriptor(name: Option<&str>, prefix: Option<&str>) -> BackendDescriptor {
        BackendDescriptor::from_fields(BackendFields {
            organization: Some("acme".into()),
            name: name.map(str::to_string),
            prefix: prefix.map(str::to_string),
            hostname: None,
        })
        .expect("descriptor")
    }

    #[test]
    fn named_block_on_default_host() {
        let block = render(&descriptor(Some("net-prod"), None), DEFAULT_HOSTNAME, "  ");
        assert_eq!(
            block,
            "cloud {\n    organization = \"acme\"\n    workspaces {\n      name = \"net-prod\"\n    }\n  }"
        );
    }

    #[test]
    fn named_block_has_one_name_and_no_tags() {
        let block = render(&descriptor(Some("net-prod"), None), DEFAULT_HOSTNAME, "  ");
        assert_eq!(block.matches("name = ").count(), 1);
        assert_eq!(block.matches("tags = ").count(), 0);
    }

    #[test]
    fn prefixed_block_emits_single_tag() {
        let block = render(&descriptor(None, Some("-team-")), DEFAULT_HOSTNAME, "  ");
        assert!(block.contains("      tags = [\"team\"]\n"));
        assert!(!block.contains("name = "));
    }

    #[test]
    fn hostname_emitted_only_for_custom_host() {
        let d = descriptor(Some("w"), None);
        assert!(!render(&d, "app.terraform.io", "  ").contains("hostname"));
        let custom = render(&d, "tfe.example.com", "  ");
        assert!(custom.starts_with("cloud {\n    hostname = \"tfe.example.com\"\n    organization"));
    }

    #[test]
    fn host_attribute_is_pure() {
        assert_eq!(host_attribute(DEFAULT_HOSTNAME), None);
        assert_eq!(
            host_attribute("tfe.example.com").as_deref(),
            Some("hostname = \"tfe.example.com\"")
        );
    }

    #[test]
    fn indentation_follows_declaration_line() {
        let block = render(&descriptor(Some("w"), None), DEFAULT_HOSTNAME, "");
        assert_eq!(
            block,
            "cloud {\n  organization = \"acme\"\n  workspaces {\n    name = \"w\"\n  }\n}"
        );
    }

    #[test]
    fn values_are_escaped() {
        let d = BackendDescriptor::from_fields(BackendFields {
            organization: Some("a\"b".into()),
            name: Some("${x}".into()),
            ..Default::default()
        })
        .expect("descriptor");
        let block = render(&d, DEFAULT_HOSTNAME, "");
        assert!(block.contains("organization = \"a\\\"b\""));
        assert!(block.contains("name = \"$${x}\""));
    }
}
