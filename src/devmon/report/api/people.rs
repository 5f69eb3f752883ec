use std::collections::VecDeque;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{AccessToken, ComplianceClient, PAGE_TIMEOUT};
use crate::devmon::report::error::{ReportError, Result};

/// Largest page the people endpoint serves.
pub const MAX_PAGE_SIZE: u32 = 100;

const PAGE_SIZE_PARAM: &str = "pageSize";
const PAGE_CURSOR_PARAM: &str = "pageCursor";

/// One place a people page may keep its person array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeStrategy {
    pub name: &'static str,
    pub path: &'static [&'static str],
}

/// Envelope shapes probed in order; the first accepted one wins.
pub const ENVELOPE_STRATEGIES: [EnvelopeStrategy; 5] = [
    EnvelopeStrategy {
        name: "results.data",
        path: &["results", "data"],
    },
    EnvelopeStrategy {
        name: "results.nodes",
        path: &["results", "nodes"],
    },
    EnvelopeStrategy {
        name: "results.results",
        path: &["results", "results"],
    },
    EnvelopeStrategy {
        name: "people",
        path: &["people"],
    },
    EnvelopeStrategy {
        name: "results",
        path: &["results"],
    },
];

impl EnvelopeStrategy {
    /// Object holding the person array, where page info usually sits too.
    fn container<'a>(&self, body: &'a Value) -> Option<&'a Value> {
        let (_, parents) = self.path.split_last()?;
        parents
            .iter()
            .try_fold(body, |value, key| value.get(key))
    }

    /// Returns the person array when the field exists, is not null, and
    /// holds only JSON objects.
    pub fn extract(&self, body: &Value) -> Option<Vec<Value>> {
        let (field, _) = self.path.split_last()?;
        let items = self.container(body)?.get(field)?.as_array()?;
        if items.iter().all(Value::is_object) {
            Some(items.clone())
        } else {
            None
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    #[serde(default)]
    has_next_page: bool,
    #[serde(default)]
    end_cursor: Option<String>,
}

/// One decoded people page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    pub next_cursor: Option<String>,
    pub strategy: &'static str,
}

/// Decodes a page body, or `None` when no envelope strategy accepts it.
pub fn parse_page(body: &Value) -> Option<Page> {
    ENVELOPE_STRATEGIES.iter().find_map(|strategy| {
        let items = strategy.extract(body)?;
        Some(Page {
            items,
            next_cursor: next_cursor(body, strategy.container(body)),
            strategy: strategy.name,
        })
    })
}

fn next_cursor(body: &Value, container: Option<&Value>) -> Option<String> {
    let page_info = container
        .and_then(|value| value.get("pageInfo"))
        .or_else(|| body.get("pageInfo"))
        .or_else(|| body.get("resultsPageInfo"))
        .and_then(|value| PageInfo::deserialize(value).ok())
        .unwrap_or_default();

    let has_next_page = page_info.has_next_page;
    let from_page_info = page_info
        .end_cursor
        .filter(|cursor| has_next_page && !cursor.is_empty());

    from_page_info.or_else(|| {
        body.get("nextPageCursor")
            .and_then(Value::as_str)
            .filter(|cursor| !cursor.is_empty())
            .map(str::to_string)
    })
}

/// Caps a requested page size to what the API serves.
pub fn clamp_page_size(requested: u32) -> u32 {
    requested.clamp(1, MAX_PAGE_SIZE)
}

fn top_level_keys(body: &Value) -> String {
    match body.as_object() {
        Some(object) => object.keys().cloned().collect::<Vec<_>>().join(","),
        None => "<not an object>".to_string(),
    }
}

impl ComplianceClient {
    /// Lazily walks every people page for one workspace. Pages are requested
    /// only as the returned iterator is drained.
    pub fn fetch_people<'a>(
        &'a self,
        token: &'a AccessToken,
        workspace: &'a str,
        page_size: u32,
        extra_params: &'a [(String, String)],
    ) -> PeoplePages<'a> {
        let clamped = clamp_page_size(page_size);
        if clamped != page_size {
            warn!(requested = page_size, used = clamped, "page size clamped");
        }
        PeoplePages {
            client: self,
            token,
            workspace,
            page_size: clamped,
            extra_params,
            buffer: VecDeque::new(),
            cursor: None,
            page: 0,
            finished: false,
        }
    }

    #[instrument(level = "debug", skip(self, token, query))]
    fn get_people_page(
        &self,
        token: &AccessToken,
        workspace: &str,
        page: usize,
        query: &[(String, String)],
    ) -> Result<Value> {
        let network_error = |message: String| ReportError::Network {
            workspace: workspace.to_string(),
            page,
            message,
        };

        let response = self
            .http
            .get(&self.endpoints.people_url)
            .bearer_auth(&token.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query)
            .timeout(PAGE_TIMEOUT)
            .send()
            .map_err(|error| network_error(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(network_error(format!("status {}: {}", status.as_u16(), body.trim())));
        }

        response
            .json::<Value>()
            .map_err(|error| network_error(format!("invalid JSON body: {error}")))
    }
}

/// Finite, single-pass sequence of raw person objects for one workspace.
///
/// After the first error the iterator yields that error once and then ends;
/// items from earlier pages have already been handed out.
pub struct PeoplePages<'a> {
    client: &'a ComplianceClient,
    token: &'a AccessToken,
    workspace: &'a str,
    page_size: u32,
    extra_params: &'a [(String, String)],
    buffer: VecDeque<Value>,
    cursor: Option<String>,
    page: usize,
    finished: bool,
}

impl PeoplePages<'_> {
    /// Page size actually sent, after clamping.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of pages requested so far.
    pub fn pages_fetched(&self) -> usize {
        self.page
    }

    fn query(&self) -> Vec<(String, String)> {
        let mut query: Vec<(String, String)> = self
            .extra_params
            .iter()
            .filter(|(key, _)| key != PAGE_SIZE_PARAM && key != PAGE_CURSOR_PARAM)
            .cloned()
            .collect();
        query.push((PAGE_SIZE_PARAM.to_string(), self.page_size.to_string()));
        if let Some(cursor) = &self.cursor {
            query.push((PAGE_CURSOR_PARAM.to_string(), cursor.clone()));
        }
        query
    }

    fn fetch_next_page(&mut self) -> Result<()> {
        self.page += 1;
        let query = self.query();
        let body = self
            .client
            .get_people_page(self.token, self.workspace, self.page, &query)?;

        let page = parse_page(&body).ok_or_else(|| ReportError::ResponseShape {
            workspace: self.workspace.to_string(),
            page: self.page,
            keys: top_level_keys(&body),
        })?;
        debug!(
            workspace = self.workspace,
            page = self.page,
            strategy = page.strategy,
            items = page.items.len(),
            "people page received"
        );

        if page.items.is_empty() {
            self.finished = true;
            return Ok(());
        }
        self.buffer.extend(page.items);

        match page.next_cursor {
            Some(cursor) if self.cursor.as_deref() == Some(cursor.as_str()) => {
                warn!(workspace = self.workspace, %cursor, "cursor did not advance, stopping");
                self.finished = true;
            }
            Some(cursor) => self.cursor = Some(cursor),
            None => self.finished = true,
        }
        Ok(())
    }
}

impl Iterator for PeoplePages<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            if self.finished {
                return None;
            }
            if let Err(error) = self.fetch_next_page() {
                self.finished = true;
                return Some(Err(error));
            }
        }
    }
}
