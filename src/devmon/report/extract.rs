use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::devmon::report::model::{
    DEVICE_MONITORING_TASK, PersonRecord, TaskState, normalize_email,
};

const STATUS_OVERDUE: &str = "OVERDUE";
const COMPLETED_STATUSES: [&str; 2] = ["COMPLETE", "COMPLETED"];
const SECONDS_PER_DAY: i64 = 86_400;

/// Flattens one raw person object, computing overdue days against the
/// current time.
pub fn extract(person: &Value, workspace: &str) -> PersonRecord {
    extract_at(person, workspace, Utc::now())
}

/// Same as [`extract`] with an explicit clock.
pub fn extract_at(person: &Value, workspace: &str, now: DateTime<Utc>) -> PersonRecord {
    PersonRecord {
        workspace: workspace.to_string(),
        person_id: text_at(person, &["id"]),
        email_address: text_at(person, &["emailAddress"]),
        name_display: text_at(person, &["name", "display"]),
        name_first: text_at(person, &["name", "first"]),
        name_last: text_at(person, &["name", "last"]),
        employment_status: text_at(person, &["employment", "status"]),
        employment_start_date: text_at(person, &["employment", "startDate"]),
        employment_end_date: text_at(person, &["employment", "endDate"]),
        task: device_monitoring_task(person, now),
    }
}

fn device_monitoring_task(person: &Value, now: DateTime<Utc>) -> TaskState {
    let Some(task) = value_at(person, &["tasksSummary", "details", DEVICE_MONITORING_TASK])
        .filter(|task| task.is_object())
    else {
        return TaskState::default();
    };

    let status = text_at(task, &["status"]);
    let due_date = text_at(task, &["dueDate"]);
    let installed = status
        .as_deref()
        .is_some_and(|status| COMPLETED_STATUSES.iter().any(|c| status.eq_ignore_ascii_case(c)));

    let days_overdue = match (status.as_deref(), due_date.as_deref()) {
        (Some(status), Some(due)) if status.eq_ignore_ascii_case(STATUS_OVERDUE) => {
            parse_due_date(due).map(|due| whole_days_between(due, now))
        }
        _ => None,
    };

    TaskState {
        completion_date: text_at(task, &["completionDate"]),
        disabled: task.get("disabled").and_then(Value::as_bool),
        status,
        due_date,
        installed,
        days_overdue,
    }
}

/// Whole days from `from` to `to`, rounded down, so a due date later today
/// already counts as one day early.
fn whole_days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Accepts RFC 3339 timestamps (`2025-07-02T02:46:59.919Z`) and bare dates,
/// which are read as midnight UTC.
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

fn value_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(key))
}

/// Strings are copied verbatim; numbers and booleans keep their JSON text;
/// null, arrays and objects count as absent.
fn text_at(value: &Value, path: &[&str]) -> Option<String> {
    match value_at(value, path)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Case-insensitive allow-list of email addresses. An empty filter keeps
/// every record.
#[derive(Debug, Clone, Default)]
pub struct EmailFilter {
    allowed: HashSet<String>,
}

impl EmailFilter {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = emails
            .into_iter()
            .map(|email| normalize_email(email.as_ref()))
            .filter(|email| !email.is_empty())
            .collect();
        Self { allowed }
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn accepts(&self, record: &PersonRecord) -> bool {
        self.allowed.is_empty() || self.allowed.contains(&record.normalized_email())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn copies_identity_and_employment_fields() {
        let person = json!({
            "id": "p-1",
            "emailAddress": "Jane@Example.com",
            "name": {"display": "Jane Doe", "first": "Jane", "last": "Doe"},
            "employment": {"status": "CURRENT", "startDate": "2024-01-02", "endDate": null}
        });

        let record = extract_at(&person, "acme", now());
        assert_eq!(record.workspace, "acme");
        assert_eq!(record.person_id.as_deref(), Some("p-1"));
        assert_eq!(record.email_address.as_deref(), Some("Jane@Example.com"));
        assert_eq!(record.name_display.as_deref(), Some("Jane Doe"));
        assert_eq!(record.name_last.as_deref(), Some("Doe"));
        assert_eq!(record.employment_status.as_deref(), Some("CURRENT"));
        assert_eq!(record.employment_start_date.as_deref(), Some("2024-01-02"));
        assert_eq!(record.employment_end_date, None);
    }

    #[test]
    fn missing_task_leaves_task_fields_empty() {
        let person = json!({"id": "p-2", "emailAddress": "x@example.com"});
        let record = extract_at(&person, "acme", now());
        assert_eq!(record.task, TaskState::default());
        assert!(!record.task.installed);
        assert_eq!(record.name_first, None);
    }

    #[test]
    fn completed_task_counts_as_installed() {
        let person = json!({
            "tasksSummary": {"details": {"installDeviceMonitoring": {
                "status": "COMPLETE",
                "completionDate": "2025-07-02T02:46:59.919Z",
                "dueDate": "2025-07-10T00:00:00Z",
                "disabled": false
            }}}
        });

        let task = extract_at(&person, "acme", now()).task;
        assert!(task.installed);
        assert_eq!(task.disabled, Some(false));
        assert_eq!(task.days_overdue, None);
        assert_eq!(task.completion_date.as_deref(), Some("2025-07-02T02:46:59.919Z"));
    }

    #[test]
    fn overdue_task_counts_whole_days() {
        let due = (now() - Duration::days(10)).to_rfc3339();
        let person = json!({
            "tasksSummary": {"details": {"installDeviceMonitoring": {
                "status": "OVERDUE",
                "dueDate": due
            }}}
        });

        let task = extract_at(&person, "acme", now()).task;
        assert!(!task.installed);
        assert_eq!(task.days_overdue, Some(10));
    }

    #[test]
    fn overdue_without_due_date_has_no_day_count() {
        let person = json!({
            "tasksSummary": {"details": {"installDeviceMonitoring": {"status": "OVERDUE"}}}
        });
        assert_eq!(extract_at(&person, "acme", now()).task.days_overdue, None);
    }

    #[test]
    fn future_due_date_marked_overdue_goes_negative() {
        let person = json!({
            "tasksSummary": {"details": {"installDeviceMonitoring": {
                "status": "OVERDUE",
                "dueDate": "2025-08-20"
            }}}
        });
        // 4.5 days ahead rounds down to -5.
        assert_eq!(extract_at(&person, "acme", now()).task.days_overdue, Some(-5));
    }

    #[test]
    fn partial_days_round_down() {
        let overdue = |due: DateTime<Utc>| {
            let person = json!({
                "tasksSummary": {"details": {"installDeviceMonitoring": {
                    "status": "OVERDUE",
                    "dueDate": due.to_rfc3339()
                }}}
            });
            extract_at(&person, "acme", now()).task.days_overdue
        };

        assert_eq!(overdue(now() - Duration::hours(36)), Some(1));
        assert_eq!(overdue(now() - Duration::hours(1)), Some(0));
        assert_eq!(overdue(now() + Duration::hours(1)), Some(-1));
        assert_eq!(overdue(now()), Some(0));
    }

    #[test]
    fn non_overdue_status_ignores_due_date() {
        let person = json!({
            "tasksSummary": {"details": {"installDeviceMonitoring": {
                "status": "DUE_SOON",
                "dueDate": "2025-08-01"
            }}}
        });
        assert_eq!(extract_at(&person, "acme", now()).task.days_overdue, None);
    }

    #[test]
    fn parses_bare_and_rfc3339_dates() {
        assert_eq!(
            parse_due_date("2025-08-05"),
            Some(Utc.with_ymd_and_hms(2025, 8, 5, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_due_date("2025-08-05T10:30:00+02:00"),
            Some(Utc.with_ymd_and_hms(2025, 8, 5, 8, 30, 0).unwrap())
        );
        assert_eq!(parse_due_date("next week"), None);
    }

    #[test]
    fn email_filter_is_case_insensitive() {
        let filter = EmailFilter::new(["  Jane@Example.com ", ""]);
        let record = PersonRecord {
            email_address: Some("jane@example.COM".to_string()),
            ..PersonRecord::default()
        };
        let other = PersonRecord {
            email_address: Some("john@example.com".to_string()),
            ..PersonRecord::default()
        };

        assert!(!filter.is_empty());
        assert!(filter.accepts(&record));
        assert!(!filter.accepts(&other));
        assert!(EmailFilter::default().accepts(&other));
    }
}
