use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::{ComplianceClient, TOKEN_TIMEOUT};
use crate::devmon::report::error::{ReportError, Result};
use crate::devmon::report::model::Workspace;

const GRANT_TYPE: &str = "client_credentials";
const MAX_ERROR_BODY: usize = 300;

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    scope: &'a str,
    grant_type: &'a str,
}

/// Bearer token issued for one workspace. The expiry is informational only;
/// a run is expected to finish well before it.
#[derive(Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl ComplianceClient {
    /// Runs the client-credentials grant for `workspace`. A single attempt is
    /// made; any failure surfaces as [`ReportError::Auth`].
    #[instrument(level = "debug", skip_all, fields(workspace = %workspace.name))]
    pub fn authenticate(&self, workspace: &Workspace) -> Result<AccessToken> {
        let auth_error = |status: Option<u16>, message: String| ReportError::Auth {
            workspace: workspace.name.clone(),
            status,
            message,
        };

        let request = TokenRequest {
            client_id: &workspace.client_id,
            client_secret: &workspace.client_secret,
            scope: &self.scope,
            grant_type: GRANT_TYPE,
        };

        let response = self
            .http
            .post(&self.endpoints.token_url)
            .json(&request)
            .timeout(TOKEN_TIMEOUT)
            .send()
            .map_err(|error| auth_error(None, error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(status = status.as_u16(), "token request rejected");
            return Err(auth_error(Some(status.as_u16()), truncate(&body)));
        }

        let token: AccessToken = response.json().map_err(|error| {
            auth_error(
                Some(status.as_u16()),
                format!("invalid token response: {error}"),
            )
        })?;
        if token.access_token.is_empty() {
            return Err(auth_error(
                Some(status.as_u16()),
                "token response carried an empty access_token".to_string(),
            ));
        }

        info!(expires_in = ?token.expires_in, "authenticated");
        Ok(token)
    }
}

fn truncate(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devmon::report::api::ApiEndpoints;
    use mockito::Matcher;

    fn workspace() -> Workspace {
        Workspace {
            name: "acme".to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
        }
    }

    #[test]
    fn exchanges_client_credentials_for_token() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/oauth/token")
            .match_body(Matcher::Json(serde_json::json!({
                "client_id": "client",
                "client_secret": "secret",
                "scope": "vanta-api.all:read",
                "grant_type": "client_credentials"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"tok-1","token_type":"Bearer","expires_in":3600}"#)
            .create();

        let client = ComplianceClient::new(
            ApiEndpoints::with_base(&server.url()),
            "vanta-api.all:read",
        );
        let token = client.authenticate(&workspace()).expect("token issued");

        mock.assert();
        assert_eq!(token.access_token, "tok-1");
        assert_eq!(token.expires_in, Some(3600));
        assert!(!format!("{token:?}").contains("tok-1"));
    }

    #[test]
    fn rejected_credentials_carry_workspace_and_status() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/oauth/token")
            .with_status(401)
            .with_body(r#"{"error":"invalid_client"}"#)
            .create();

        let client = ComplianceClient::new(ApiEndpoints::with_base(&server.url()), "scope");
        match client.authenticate(&workspace()) {
            Err(ReportError::Auth {
                workspace,
                status,
                message,
            }) => {
                assert_eq!(workspace, "acme");
                assert_eq!(status, Some(401));
                assert!(message.contains("invalid_client"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(MAX_ERROR_BODY + 50);
        let truncated = truncate(&body);
        assert_eq!(truncated.chars().count(), MAX_ERROR_BODY + 1);
        assert!(truncated.ends_with('…'));
    }
}
