//! Blocking client for the workspace API (`/api/v2`).
//!
//! Every request carries `Authorization: Bearer <token>` and the JSON:API
//! content type, and is bounded by [`REQUEST_TIMEOUT`].

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use cloudlift_core::types::{OrganizationName, WorkspaceName};

use crate::error::ApiError;

/// Upper bound for a single API call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CONTENT_TYPE: &str = "application/vnd.api+json";

/// The parts of a remote workspace the reconciler needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub id: String,
    pub tag_names: Vec<String>,
}

/// Remote operations used by tag reconciliation.
pub trait WorkspaceApi {
    /// Look a workspace up by organization and name.
    fn show_workspace(
        &self,
        organization: &OrganizationName,
        workspace: &WorkspaceName,
    ) -> Result<Workspace, ApiError>;

    /// Associate `tag` with the workspace identified by `workspace_id`.
    fn add_tag(&self, workspace_id: &str, tag: &str) -> Result<(), ApiError>;
}

// ---------------------------------------------------------------------------
// Response documents
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WorkspaceDocument {
    data: WorkspaceData,
}

#[derive(Debug, Deserialize)]
struct WorkspaceData {
    id: String,
    #[serde(default)]
    attributes: WorkspaceAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct WorkspaceAttributes {
    #[serde(rename = "tag-names", default)]
    tag_names: Option<Vec<String>>,
}

/// Decode a workspace `show` response body.
pub fn parse_workspace(body: &str) -> Result<Workspace, ApiError> {
    let doc: WorkspaceDocument =
        serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    Ok(Workspace {
        id: doc.data.id,
        tag_names: doc.data.attributes.tag_names.unwrap_or_default(),
    })
}

// ---------------------------------------------------------------------------
// ureq-backed client
// ---------------------------------------------------------------------------

/// [`WorkspaceApi`] over HTTPS.
pub struct TfcClient {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

impl TfcClient {
    /// Client for `https://<hostname>/api/v2`.
    pub fn new(hostname: &str, token: &str) -> Self {
        Self::with_base_url(format!("https://{hostname}/api/v2"), token)
    }

    /// Client for an explicit API root (no trailing slash).
    pub fn with_base_url(base_url: impl Into<String>, token: &str) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn workspace_url(&self, organization: &OrganizationName, workspace: &WorkspaceName) -> String {
        format!(
            "{}/organizations/{organization}/workspaces/{workspace}",
            self.base_url
        )
    }

    fn tags_url(&self, workspace_id: &str) -> String {
        format!("{}/workspaces/{workspace_id}/relationships/tags", self.base_url)
    }

    fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl WorkspaceApi for TfcClient {
    fn show_workspace(
        &self,
        organization: &OrganizationName,
        workspace: &WorkspaceName,
    ) -> Result<Workspace, ApiError> {
        let url = self.workspace_url(organization, workspace);
        tracing::debug!(%url, "GET workspace");
        let body = self
            .agent
            .get(&url)
            .set("Authorization", &self.authorization())
            .set("Content-Type", CONTENT_TYPE)
            .call()?
            .into_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        parse_workspace(&body)
    }

    fn add_tag(&self, workspace_id: &str, tag: &str) -> Result<(), ApiError> {
        let url = self.tags_url(workspace_id);
        tracing::debug!(%url, tag, "POST workspace tag");
        self.agent
            .post(&url)
            .set("Authorization", &self.authorization())
            .set("Content-Type", CONTENT_TYPE)
            .send_json(json!({
                "data": [{ "type": "tags", "attributes": { "name": tag } }]
            }))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_id_and_tag_names() {
        let body = r#"{"data":{"id":"ws-abc123","type":"workspaces","attributes":{"name":"net","tag-names":["team","prod"]}}}"#;
        let ws = parse_workspace(body).expect("workspace");
        assert_eq!(ws.id, "ws-abc123");
        assert_eq!(ws.tag_names, vec!["team", "prod"]);
    }

    #[test]
    fn null_or_missing_tag_names_mean_no_tags() {
        let null_tags = r#"{"data":{"id":"ws-1","attributes":{"tag-names":null}}}"#;
        assert!(parse_workspace(null_tags).unwrap().tag_names.is_empty());
        let no_attrs = r#"{"data":{"id":"ws-2"}}"#;
        assert!(parse_workspace(no_attrs).unwrap().tag_names.is_empty());
    }

    #[test]
    fn malformed_body_is_decode_error() {
        let err = parse_workspace(r#"{"errors":[{"status":"404"}]}"#).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)), "got: {err}");
    }

    #[test]
    fn urls_are_rooted_at_api_v2() {
        let client = TfcClient::new("tfe.example.com", "t0ken");
        assert_eq!(
            client.workspace_url(&"acme".into(), &"net".into()),
            "https://tfe.example.com/api/v2/organizations/acme/workspaces/net"
        );
        assert_eq!(
            client.tags_url("ws-1"),
            "https://tfe.example.com/api/v2/workspaces/ws-1/relationships/tags"
        );
        assert_eq!(client.authorization(), "Bearer t0ken");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = TfcClient::with_base_url("http://localhost:8080/api/v2/", "t");
        assert_eq!(client.tags_url("ws-9"), "http://localhost:8080/api/v2/workspaces/ws-9/relationships/tags");
    }
}
