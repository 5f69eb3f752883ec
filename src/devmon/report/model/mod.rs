use std::fmt;

/// Name of the device-monitoring task inside `tasksSummary.details`.
pub const DEVICE_MONITORING_TASK: &str = "installDeviceMonitoring";

/// Raw report columns, in output order.
pub const RAW_COLUMNS: [&str; 15] = [
    "workspace",
    "personId",
    "emailAddress",
    "name_display",
    "name_first",
    "name_last",
    "employment_status",
    "employment_startDate",
    "employment_endDate",
    "installDeviceMonitoring_status",
    "installDeviceMonitoring_completionDate",
    "installDeviceMonitoring_dueDate",
    "installDeviceMonitoring_disabled",
    "installDeviceMonitoring_installed",
    "installDeviceMonitoring_daysOverdue",
];

/// Identity columns that open every consolidated row.
pub const IDENTITY_COLUMNS: [&str; 5] = [
    "emailAddress",
    "name_display",
    "name_first",
    "name_last",
    "employment_status",
];

/// Per-workspace column suffixes; each consolidated column is named
/// `{workspace}__{suffix}`.
pub const WORKSPACE_COLUMN_SUFFIXES: [&str; 6] = [
    "installDeviceMonitoring_status",
    "installDeviceMonitoring_completionDate",
    "installDeviceMonitoring_dueDate",
    "installDeviceMonitoring_disabled",
    "installDeviceMonitoring_installed",
    "installDeviceMonitoring_daysOverdue",
];

/// A tenant workspace and the client credentials used to reach it.
#[derive(Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Unique name, also used as the consolidated column prefix.
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("name", &self.name)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Device-monitoring task state for one person in one workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskState {
    pub status: Option<String>,
    pub completion_date: Option<String>,
    pub due_date: Option<String>,
    pub disabled: Option<bool>,
    pub installed: bool,
    pub days_overdue: Option<i64>,
}

impl TaskState {
    /// Cells in [`WORKSPACE_COLUMN_SUFFIXES`] order.
    pub fn cells(&self) -> Vec<String> {
        vec![
            text_cell(&self.status),
            text_cell(&self.completion_date),
            text_cell(&self.due_date),
            self.disabled.map(|value| value.to_string()).unwrap_or_default(),
            self.installed.to_string(),
            self.days_overdue.map(|value| value.to_string()).unwrap_or_default(),
        ]
    }
}

/// One person as returned by one workspace, flattened to the raw columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonRecord {
    pub workspace: String,
    pub person_id: Option<String>,
    pub email_address: Option<String>,
    pub name_display: Option<String>,
    pub name_first: Option<String>,
    pub name_last: Option<String>,
    pub employment_status: Option<String>,
    pub employment_start_date: Option<String>,
    pub employment_end_date: Option<String>,
    pub task: TaskState,
}

impl PersonRecord {
    /// Trimmed, lowercased email; empty when the person has none.
    pub fn normalized_email(&self) -> String {
        normalize_email(self.email_address.as_deref().unwrap_or_default())
    }

    /// Cells in [`RAW_COLUMNS`] order.
    pub fn cells(&self) -> Vec<String> {
        let mut cells = vec![
            self.workspace.clone(),
            text_cell(&self.person_id),
            text_cell(&self.email_address),
            text_cell(&self.name_display),
            text_cell(&self.name_first),
            text_cell(&self.name_last),
            text_cell(&self.employment_status),
            text_cell(&self.employment_start_date),
            text_cell(&self.employment_end_date),
        ];
        cells.extend(self.task.cells());
        cells
    }
}

/// One row per unique email, with the task state from every workspace the
/// person was seen in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsolidatedRecord {
    pub email_address: String,
    pub name_display: Option<String>,
    pub name_first: Option<String>,
    pub name_last: Option<String>,
    pub employment_status: Option<String>,
    /// Workspace name → task state, only for workspaces the person appears in.
    pub workspaces: Vec<(String, TaskState)>,
}

impl ConsolidatedRecord {
    pub fn workspace(&self, name: &str) -> Option<&TaskState> {
        self.workspaces
            .iter()
            .find(|(workspace, _)| workspace == name)
            .map(|(_, state)| state)
    }

    /// Cells for the identity columns followed by one block per entry of
    /// `workspace_order`; absent workspaces yield empty cells.
    pub fn cells(&self, workspace_order: &[String]) -> Vec<String> {
        let mut cells = vec![
            self.email_address.clone(),
            text_cell(&self.name_display),
            text_cell(&self.name_first),
            text_cell(&self.name_last),
            text_cell(&self.employment_status),
        ];
        for name in workspace_order {
            match self.workspace(name) {
                Some(state) => cells.extend(state.cells()),
                None => cells.extend(WORKSPACE_COLUMN_SUFFIXES.iter().map(|_| String::new())),
            }
        }
        cells
    }
}

/// Header row for the consolidated table.
pub fn consolidated_columns(workspace_order: &[String]) -> Vec<String> {
    let mut columns: Vec<String> = IDENTITY_COLUMNS.iter().map(|c| c.to_string()).collect();
    for name in workspace_order {
        columns.extend(
            WORKSPACE_COLUMN_SUFFIXES
                .iter()
                .map(|suffix| format!("{name}__{suffix}")),
        );
    }
    columns
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn text_cell(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}
