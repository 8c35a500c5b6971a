//! Idempotent workspace tag reconciliation.
//!
//! Best effort: every failure is logged and reported as
//! [`ReconcileOutcome::Failed`], never returned as an error, so a finished
//! file migration is never undone by the remote side.

use serde::Serialize;

use cloudlift_core::types::TagReconciliationRequest;

use crate::client::WorkspaceApi;

/// What reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// The workspace already carried the tag; nothing was sent.
    AlreadyPresent,
    /// The tag association was created.
    Added,
    /// Lookup or update failed.
    Failed { detail: String },
}

/// Ensure the requested tag is associated with the workspace.
pub fn reconcile(api: &dyn WorkspaceApi, request: &TagReconciliationRequest) -> ReconcileOutcome {
    let workspace = match api.show_workspace(&request.organization, &request.workspace) {
        Ok(workspace) => workspace,
        Err(err) => {
            tracing::warn!(
                host = %request.hostname,
                organization = %request.organization,
                workspace = %request.workspace,
                error = %err,
                "workspace lookup failed; tag not reconciled"
            );
            return ReconcileOutcome::Failed {
                detail: format!("GET workspace failed: {err}"),
            };
        }
    };

    if workspace.tag_names.iter().any(|t| *t == request.tag) {
        tracing::info!(workspace = %request.workspace, tag = %request.tag, "tag already present");
        return ReconcileOutcome::AlreadyPresent;
    }

    match api.add_tag(&workspace.id, &request.tag) {
        Ok(()) => {
            tracing::info!(
                host = %request.hostname,
                workspace = %request.workspace,
                tag = %request.tag,
                "tag added"
            );
            ReconcileOutcome::Added
        }
        Err(err) => {
            tracing::warn!(
                host = %request.hostname,
                workspace = %request.workspace,
                tag = %request.tag,
                error = %err,
                "adding tag failed"
            );
            ReconcileOutcome::Failed {
                detail: format!("add tag failed: {err}"),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use cloudlift_core::types::{OrganizationName, WorkspaceName};

    use super::*;
    use crate::client::Workspace;
    use crate::error::ApiError;

    /// In-memory workspace with recorded calls.
    #[derive(Default)]
    struct FakeApi {
        tags: RefCell<Vec<String>>,
        lookups: Cell<usize>,
        adds: Cell<usize>,
        lookup_status: Option<u16>,
        add_status: Option<u16>,
    }

    impl WorkspaceApi for FakeApi {
        fn show_workspace(
            &self,
            _organization: &OrganizationName,
            _workspace: &WorkspaceName,
        ) -> Result<Workspace, ApiError> {
            self.lookups.set(self.lookups.get() + 1);
            if let Some(status) = self.lookup_status {
                return Err(ApiError::Status {
                    status,
                    body: "nope".into(),
                });
            }
            Ok(Workspace {
                id: "ws-1".into(),
                tag_names: self.tags.borrow().clone(),
            })
        }

        fn add_tag(&self, workspace_id: &str, tag: &str) -> Result<(), ApiError> {
            assert_eq!(workspace_id, "ws-1");
            self.adds.set(self.adds.get() + 1);
            if let Some(status) = self.add_status {
                return Err(ApiError::Status {
                    status,
                    body: "denied".into(),
                });
            }
            self.tags.borrow_mut().push(tag.to_string());
            Ok(())
        }
    }

    fn request() -> TagReconciliationRequest {
        TagReconciliationRequest {
            hostname: "app.terraform.io".into(),
            organization: OrganizationName::from("acme"),
            workspace: WorkspaceName::from("network"),
            tag: "team".into(),
        }
    }

    #[test]
    fn second_run_is_a_no_op() {
        let api = FakeApi::default();
        assert_eq!(reconcile(&api, &request()), ReconcileOutcome::Added);
        assert_eq!(reconcile(&api, &request()), ReconcileOutcome::AlreadyPresent);
        assert_eq!(api.adds.get(), 1, "exactly one association call");
        assert_eq!(api.lookups.get(), 2);
    }

    #[test]
    fn existing_tag_skips_update() {
        let api = FakeApi {
            tags: RefCell::new(vec!["other".into(), "team".into()]),
            ..Default::default()
        };
        assert_eq!(reconcile(&api, &request()), ReconcileOutcome::AlreadyPresent);
        assert_eq!(api.adds.get(), 0);
    }

    #[test]
    fn lookup_failure_is_swallowed() {
        let api = FakeApi {
            lookup_status: Some(404),
            ..Default::default()
        };
        let outcome = reconcile(&api, &request());
        let ReconcileOutcome::Failed { detail } = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert!(detail.contains("404"));
        assert_eq!(api.adds.get(), 0);
    }

    #[test]
    fn update_failure_is_swallowed() {
        let api = FakeApi {
            add_status: Some(422),
            ..Default::default()
        };
        assert!(matches!(
            reconcile(&api, &request()),
            ReconcileOutcome::Failed { .. }
        ));
        assert_eq!(api.adds.get(), 1);
    }
}
