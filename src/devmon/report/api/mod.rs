//! Blocking client for the compliance platform's REST API.
//!
//! [`auth`] exchanges workspace credentials for a bearer token and
//! [`people`] walks the paginated people listing.

pub mod auth;
pub mod people;

use std::time::Duration;

use reqwest::blocking::Client;

pub use auth::AccessToken;
pub use people::{EnvelopeStrategy, PeoplePages, ENVELOPE_STRATEGIES, MAX_PAGE_SIZE};

/// Production API host.
pub const DEFAULT_API_BASE: &str = "https://api.vanta.com";
/// Scope requested when the caller does not name one.
pub const DEFAULT_SCOPE: &str = "vanta-api.all:read";

const TOKEN_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Token and people endpoints of one API host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    pub token_url: String,
    pub people_url: String,
}

impl ApiEndpoints {
    /// Endpoints rooted at `base`, e.g. a staging host or a local mock server.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            token_url: format!("{base}/oauth/token"),
            people_url: format!("{base}/v1/people"),
        }
    }
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self::with_base(DEFAULT_API_BASE)
    }
}

/// Shared HTTP client plus the endpoints and scope used for every workspace.
#[derive(Debug, Clone)]
pub struct ComplianceClient {
    http: Client,
    endpoints: ApiEndpoints,
    scope: String,
}

impl ComplianceClient {
    pub fn new(endpoints: ApiEndpoints, scope: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            endpoints,
            scope: scope.into(),
        }
    }
}

impl Default for ComplianceClient {
    fn default() -> Self {
        Self::new(ApiEndpoints::default(), DEFAULT_SCOPE)
    }
}
