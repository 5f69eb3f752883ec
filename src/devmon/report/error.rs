use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Error type covering the failures a report run can hit, from reading the
/// workspace file to talking to the API and writing the outputs.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Wrapper for IO failures such as reading the config or writing reports.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the CSV writer.
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Raised when the workspace file is not shaped as expected.
    #[error("invalid config: {0}")]
    Config(String),

    /// Raised when a workspace entry lacks one of its required fields.
    #[error("invalid config: workspace entry {index} is missing '{field}'")]
    MissingField { index: usize, field: &'static str },

    /// Raised when a required workspace field is present but is not a
    /// non-empty string.
    #[error("invalid config: workspace entry {index}: '{field}' must be a non-empty string")]
    InvalidField { index: usize, field: &'static str },

    /// Raised when two workspace entries share a name, ignoring case.
    #[error("invalid config: workspace name '{0}' is declared more than once")]
    DuplicateWorkspace(String),

    /// Raised when the workspace list is empty.
    #[error("invalid config: no workspaces configured")]
    NoWorkspaces,

    /// Raised when a `--param` argument is not a `key=value` pair.
    #[error("invalid param format (expected key=value): {0}")]
    InvalidParam(String),

    /// Raised when the token endpoint rejects the workspace credentials or
    /// cannot be reached.
    #[error("[{workspace}] authentication failed{}: {message}", status_suffix(.status))]
    Auth {
        workspace: String,
        status: Option<u16>,
        message: String,
    },

    /// Raised when a people page matches none of the known envelope shapes.
    #[error("[{workspace}] unrecognised response shape on page {page} (top-level keys: {keys})")]
    ResponseShape {
        workspace: String,
        page: usize,
        keys: String,
    },

    /// Raised when a people page request fails at the transport level or
    /// returns a non-success status.
    #[error("[{workspace}] request for page {page} failed: {message}")]
    Network {
        workspace: String,
        page: usize,
        message: String,
    },

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl ReportError {
    /// Per-workspace failures are logged and skipped; everything else aborts
    /// the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ReportError::Auth { .. } | ReportError::ResponseShape { .. } | ReportError::Network { .. }
        )
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|code| format!(" with status {code}"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_mentions_workspace_and_status() {
        let error = ReportError::Auth {
            workspace: "acme".to_string(),
            status: Some(401),
            message: "invalid_client".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "[acme] authentication failed with status 401: invalid_client"
        );

        let error = ReportError::Auth {
            workspace: "acme".to_string(),
            status: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "[acme] authentication failed: connection refused"
        );
    }

    #[test]
    fn workspace_errors_are_not_fatal() {
        let shape = ReportError::ResponseShape {
            workspace: "acme".to_string(),
            page: 1,
            keys: "data".to_string(),
        };
        assert!(!shape.is_fatal());
        assert!(ReportError::NoWorkspaces.is_fatal());
        assert!(
            ReportError::MissingField {
                index: 2,
                field: "client_id"
            }
            .is_fatal()
        );
    }

    #[test]
    fn invalid_field_names_entry_and_field() {
        let error = ReportError::InvalidField {
            index: 0,
            field: "name",
        };
        assert_eq!(
            error.to_string(),
            "invalid config: workspace entry 0: 'name' must be a non-empty string"
        );
        assert!(error.is_fatal());
    }
}
