//! Legacy backend handling for Terraform configuration text.
//!
//! [`locate`] finds a `backend "remote"` declaration, [`extract`] reads it
//! into a [`BackendDescriptor`](cloudlift_core::BackendDescriptor), and
//! [`render`] produces the replacement `cloud` block.
//!
//! ```rust
//! use cloudlift_hcl::{extract, locate, render};
//!
//! let text = "terraform {\n  backend \"remote\" {\n    organization = \"acme\"\n    workspaces {\n      name = \"prod\"\n    }\n  }\n}\n";
//! let block = locate(text).expect("legacy block");
//! let found = extract(text, &block).expect("migratable");
//! let cloud = render(&found.descriptor, "app.terraform.io", &block.indent);
//! assert!(block.replace(text, &cloud).contains("cloud {"));
//! ```

pub mod error;
pub mod extract;
pub mod locator;
pub mod synth;

pub use error::HclError;
pub use extract::{
    extract, parses_remote_backend, ExtractStrategy, Extraction, PatternStrategy,
    StructuredStrategy,
};
pub use locator::{locate, LocatedBlock};
pub use synth::{host_attribute, render, workspace_attribute};
