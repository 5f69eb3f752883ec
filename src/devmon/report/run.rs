use std::fmt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::devmon::report::api::ComplianceClient;
use crate::devmon::report::config::{QueryParams, load_workspaces};
use crate::devmon::report::consolidate::consolidate;
use crate::devmon::report::error::Result;
use crate::devmon::report::extract::{EmailFilter, extract};
use crate::devmon::report::flatten::{WorkbookData, build_workbook};
use crate::devmon::report::io::{csv_write, excel_write};
use crate::devmon::report::model::{PersonRecord, Workspace};

/// Output prefix used when the caller does not pick one.
pub const DEFAULT_OUT_PREFIX: &str = "vanta_device_monitoring_report";

/// Everything a report run needs besides the HTTP client.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config: PathBuf,
    pub page_size: u32,
    pub params: QueryParams,
    pub emails: EmailFilter,
    pub out_prefix: String,
    /// Pause between workspaces, to stay clear of rate limits.
    pub pause: Duration,
}

/// The three files a run produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub raw_csv: PathBuf,
    pub consolidated_csv: PathBuf,
    pub workbook: PathBuf,
}

impl OutputPaths {
    pub fn for_prefix(prefix: &str) -> Self {
        Self {
            raw_csv: PathBuf::from(format!("{prefix}__raw.csv")),
            consolidated_csv: PathBuf::from(format!("{prefix}__consolidated.csv")),
            workbook: PathBuf::from(format!("{prefix}.xlsx")),
        }
    }

    fn all(&self) -> [&Path; 3] {
        [&self.raw_csv, &self.consolidated_csv, &self.workbook]
    }
}

/// How far one workspace got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceStatus {
    /// Every page was read.
    Complete,
    /// No token; the workspace contributed nothing.
    AuthFailed(String),
    /// Pagination stopped early; rows read before the failure are kept.
    Incomplete(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceOutcome {
    pub name: String,
    pub rows: usize,
    pub status: WorkspaceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub workspaces: Vec<WorkspaceOutcome>,
    pub raw_rows: usize,
    pub consolidated_rows: usize,
    pub outputs: OutputPaths,
}

impl RunSummary {
    /// Workspaces that failed to authenticate.
    pub fn skipped(&self) -> usize {
        self.workspaces
            .iter()
            .filter(|outcome| matches!(outcome.status, WorkspaceStatus::AuthFailed(_)))
            .count()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.workspaces {
            match &outcome.status {
                WorkspaceStatus::Complete => {
                    writeln!(f, "[{}] {} rows", outcome.name, outcome.rows)?
                }
                WorkspaceStatus::AuthFailed(_) => {
                    writeln!(f, "[{}] skipped (authentication failed)", outcome.name)?
                }
                WorkspaceStatus::Incomplete(_) => writeln!(
                    f,
                    "[{}] {} rows (incomplete, pagination stopped early)",
                    outcome.name, outcome.rows
                )?,
            }
        }
        writeln!(
            f,
            "Total: {} raw rows, {} consolidated rows, {} workspace(s) skipped",
            self.raw_rows,
            self.consolidated_rows,
            self.skipped()
        )?;
        write!(f, "Done.")?;
        for path in self.outputs.all() {
            write!(f, "\n- {}", path.display())?;
        }
        Ok(())
    }
}

/// Loads the config, walks every workspace in declaration order, then writes
/// the raw and consolidated reports. Per-workspace failures are logged and
/// reflected in the summary; only config and output errors abort the run.
#[instrument(level = "info", skip_all, fields(config = %options.config.display()))]
pub fn run(options: &RunOptions, client: &ComplianceClient) -> Result<RunSummary> {
    let workspaces = load_workspaces(&options.config)?;
    let declared: Vec<String> = workspaces.iter().map(|w| w.name.clone()).collect();

    let mut raw: Vec<PersonRecord> = Vec::new();
    let mut outcomes = Vec::with_capacity(workspaces.len());
    for (index, workspace) in workspaces.iter().enumerate() {
        if index > 0 && !options.pause.is_zero() {
            thread::sleep(options.pause);
        }
        let (rows, outcome) = collect_workspace(client, workspace, options);
        raw.extend(rows);
        outcomes.push(outcome);
    }

    let consolidation = consolidate(&raw, &declared);
    info!(
        raw_rows = raw.len(),
        consolidated_rows = consolidation.records.len(),
        "consolidated records"
    );

    let workbook = build_workbook(&raw, &consolidation);
    let outputs = OutputPaths::for_prefix(&options.out_prefix);
    write_reports(&workbook, &outputs)?;

    Ok(RunSummary {
        workspaces: outcomes,
        raw_rows: raw.len(),
        consolidated_rows: consolidation.records.len(),
        outputs,
    })
}

/// Authenticates, pages through and extracts one workspace. Returns the rows
/// that passed the email filter; never fails the run.
#[instrument(level = "info", skip_all, fields(workspace = %workspace.name))]
pub fn collect_workspace(
    client: &ComplianceClient,
    workspace: &Workspace,
    options: &RunOptions,
) -> (Vec<PersonRecord>, WorkspaceOutcome) {
    let token = match client.authenticate(workspace) {
        Ok(token) => token,
        Err(error) => {
            warn!(%error, "skipping workspace");
            let outcome = WorkspaceOutcome {
                name: workspace.name.clone(),
                rows: 0,
                status: WorkspaceStatus::AuthFailed(error.to_string()),
            };
            return (Vec::new(), outcome);
        }
    };

    let mut rows = Vec::new();
    let mut status = WorkspaceStatus::Complete;
    let pages = client.fetch_people(&token, &workspace.name, options.page_size, &options.params);
    for item in pages {
        match item {
            Ok(person) => {
                let record = extract(&person, &workspace.name);
                debug!(
                    email = record.email_address.as_deref().unwrap_or_default(),
                    status = record.task.status.as_deref().unwrap_or_default(),
                    due_date = record.task.due_date.as_deref().unwrap_or_default(),
                    "device monitoring task"
                );
                if options.emails.accepts(&record) {
                    rows.push(record);
                }
            }
            Err(error) => {
                warn!(%error, "keeping rows collected so far");
                status = WorkspaceStatus::Incomplete(error.to_string());
            }
        }
    }

    info!(rows = rows.len(), "collected people rows");
    let outcome = WorkspaceOutcome {
        name: workspace.name.clone(),
        rows: rows.len(),
        status,
    };
    (rows, outcome)
}

/// Writes both CSV files and the two-sheet workbook.
pub fn write_reports(workbook: &WorkbookData, outputs: &OutputPaths) -> Result<()> {
    csv_write::write_table(&outputs.raw_csv, &workbook.raw)?;
    csv_write::write_table(&outputs.consolidated_csv, &workbook.consolidated)?;
    excel_write::write_workbook(&outputs.workbook, workbook)
}
