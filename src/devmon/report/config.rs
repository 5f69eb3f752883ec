use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::devmon::report::error::{ReportError, Result};
use crate::devmon::report::model::Workspace;

/// Query keys the people endpoint accepts more than once.
pub const MULTI_VALUE_PARAMS: [&str; 2] = ["taskTypeMatchesAny", "taskStatusMatchesAny"];

/// Extra query pairs forwarded to every people page request.
pub type QueryParams = Vec<(String, String)>;

#[derive(Deserialize)]
struct ConfigFile {
    workspaces: Option<Vec<Value>>,
}

/// Reads the workspace list from `path`, keeping declaration order.
#[instrument(level = "debug", fields(path = %path.display()))]
pub fn load_workspaces(path: &Path) -> Result<Vec<Workspace>> {
    let source = fs::read_to_string(path)?;
    let workspaces = parse_workspaces(&source)?;
    debug!(count = workspaces.len(), "loaded workspace config");
    Ok(workspaces)
}

/// Parses a workspace document. Comments are stripped first.
pub fn parse_workspaces(source: &str) -> Result<Vec<Workspace>> {
    let cleaned = strip_comments(source);
    let value: Value = serde_json::from_str(&cleaned)?;
    if !value.is_object() {
        return Err(ReportError::Config(
            "expected a JSON object with a 'workspaces' array".to_string(),
        ));
    }

    let file: ConfigFile = serde_json::from_value(value)
        .map_err(|error| ReportError::Config(format!("'workspaces' must be an array: {error}")))?;
    let entries = file
        .workspaces
        .ok_or_else(|| ReportError::Config("missing 'workspaces' key".to_string()))?;
    if entries.is_empty() {
        return Err(ReportError::NoWorkspaces);
    }

    let mut seen = HashSet::new();
    let mut workspaces = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        if !entry.is_object() {
            return Err(ReportError::Config(format!(
                "workspace entry {index} is not an object"
            )));
        }
        let workspace = Workspace {
            name: required_field(entry, index, "name")?,
            client_id: required_field(entry, index, "client_id")?,
            client_secret: required_field(entry, index, "client_secret")?,
        };
        // Consolidated headers embed the name, and sheet headers must be
        // unique regardless of case.
        if !seen.insert(workspace.name.to_lowercase()) {
            return Err(ReportError::DuplicateWorkspace(workspace.name));
        }
        workspaces.push(workspace);
    }
    Ok(workspaces)
}

/// Returns the field verbatim; surrounding whitespace only matters for the
/// emptiness check.
fn required_field(entry: &Value, index: usize, field: &'static str) -> Result<String> {
    match entry.get(field) {
        None | Some(Value::Null) => Err(ReportError::MissingField { index, field }),
        Some(Value::String(value)) if !value.trim().is_empty() => Ok(value.clone()),
        Some(_) => Err(ReportError::InvalidField { index, field }),
    }
}

/// Removes `//` and `/* */` comments outside of string literals. Newlines
/// inside comments are kept so parse errors still point at the right line.
pub fn strip_comments(source: &str) -> String {
    let mut output = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_string = false;

    while let Some(ch) = chars.next() {
        if in_string {
            output.push(ch);
            match ch {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        output.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        let next = chars.peek().copied();
        match (ch, next) {
            ('"', _) => {
                in_string = true;
                output.push(ch);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        output.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut previous = '\0';
                for next in chars.by_ref() {
                    if next == '\n' {
                        output.push('\n');
                    }
                    if previous == '*' && next == '/' {
                        break;
                    }
                    previous = next;
                }
            }
            _ => output.push(ch),
        }
    }

    output
}

/// Parses repeated `key=value` arguments. Keys listed in
/// [`MULTI_VALUE_PARAMS`] accumulate; any other key keeps its last value.
pub fn parse_query_params(items: &[String]) -> Result<QueryParams> {
    let mut params: QueryParams = Vec::new();
    for item in items {
        let (key, value) = item
            .split_once('=')
            .ok_or_else(|| ReportError::InvalidParam(item.clone()))?;
        if key.is_empty() {
            return Err(ReportError::InvalidParam(item.clone()));
        }

        if MULTI_VALUE_PARAMS.contains(&key) {
            params.push((key.to_string(), value.to_string()));
        } else if let Some(existing) = params.iter_mut().find(|(existing, _)| existing == key) {
            existing.1 = value.to_string();
        } else {
            params.push((key.to_string(), value.to_string()));
        }
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_workspaces_in_declaration_order() {
        let source = r#"{
            "workspaces": [
                {"name": "zeta", "client_id": "z-id", "client_secret": "z-secret"},
                {"name": "alpha", "client_id": "a-id", "client_secret": "a-secret"}
            ]
        }"#;

        let workspaces = parse_workspaces(source).expect("config parsed");
        let names: Vec<&str> = workspaces.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha"]);
        assert_eq!(workspaces[1].client_secret, "a-secret");
    }

    #[test]
    fn tolerates_comments() {
        let source = r#"{
            // production tenants
            "workspaces": [
                /* the main one */
                {"name": "main", "client_id": "id//not-a-comment", "client_secret": "s/*x*/"}
            ]
        }"#;

        let workspaces = parse_workspaces(source).expect("config parsed");
        assert_eq!(workspaces[0].client_id, "id//not-a-comment");
        assert_eq!(workspaces[0].client_secret, "s/*x*/");
    }

    #[test]
    fn missing_field_names_entry_index() {
        let source = r#"{"workspaces": [
            {"name": "ok", "client_id": "id", "client_secret": "secret"},
            {"name": "broken", "client_id": "id"}
        ]}"#;

        match parse_workspaces(source) {
            Err(ReportError::MissingField { index, field }) => {
                assert_eq!(index, 1);
                assert_eq!(field, "client_secret");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_and_duplicate_workspaces() {
        assert!(matches!(
            parse_workspaces(r#"{"workspaces": []}"#),
            Err(ReportError::NoWorkspaces)
        ));

        let duplicated = r#"{"workspaces": [
            {"name": "a", "client_id": "1", "client_secret": "1"},
            {"name": "a", "client_id": "2", "client_secret": "2"}
        ]}"#;
        assert!(matches!(
            parse_workspaces(duplicated),
            Err(ReportError::DuplicateWorkspace(name)) if name == "a"
        ));

        assert!(matches!(
            parse_workspaces(r#"[]"#),
            Err(ReportError::Config(_))
        ));
    }

    #[test]
    fn names_differing_only_by_case_are_duplicates() {
        let source = r#"{"workspaces": [
            {"name": "Acme", "client_id": "1", "client_secret": "1"},
            {"name": "acme", "client_id": "2", "client_secret": "2"}
        ]}"#;
        assert!(matches!(
            parse_workspaces(source),
            Err(ReportError::DuplicateWorkspace(name)) if name == "acme"
        ));
    }

    #[test]
    fn credentials_are_kept_verbatim() {
        let source = r#"{"workspaces": [
            {"name": "main", "client_id": " id ", "client_secret": "secret\t"}
        ]}"#;

        let workspaces = parse_workspaces(source).expect("config parsed");
        assert_eq!(workspaces[0].client_id, " id ");
        assert_eq!(workspaces[0].client_secret, "secret\t");
    }

    #[test]
    fn wrongly_typed_or_blank_fields_are_invalid_not_missing() {
        let numeric = r#"{"workspaces": [
            {"name": 5, "client_id": "id", "client_secret": "secret"}
        ]}"#;
        assert!(matches!(
            parse_workspaces(numeric),
            Err(ReportError::InvalidField { index: 0, field: "name" })
        ));

        let blank = r#"{"workspaces": [
            {"name": "main", "client_id": "  ", "client_secret": "secret"}
        ]}"#;
        assert!(matches!(
            parse_workspaces(blank),
            Err(ReportError::InvalidField { index: 0, field: "client_id" })
        ));

        let null = r#"{"workspaces": [
            {"name": "main", "client_id": "id", "client_secret": null}
        ]}"#;
        assert!(matches!(
            parse_workspaces(null),
            Err(ReportError::MissingField { index: 0, field: "client_secret" })
        ));
    }

    #[test]
    fn query_params_accumulate_known_multi_keys() {
        let items = vec![
            "taskTypeMatchesAny=INSTALL_DEVICE_MONITORING".to_string(),
            "employmentStatus=CURRENT".to_string(),
            "taskStatusMatchesAny=OVERDUE".to_string(),
            "taskStatusMatchesAny=DUE_SOON".to_string(),
            "employmentStatus=FORMER".to_string(),
            "search=a=b".to_string(),
        ];

        let params = parse_query_params(&items).expect("params parsed");
        assert_eq!(
            params,
            vec![
                (
                    "taskTypeMatchesAny".to_string(),
                    "INSTALL_DEVICE_MONITORING".to_string()
                ),
                ("employmentStatus".to_string(), "FORMER".to_string()),
                ("taskStatusMatchesAny".to_string(), "OVERDUE".to_string()),
                ("taskStatusMatchesAny".to_string(), "DUE_SOON".to_string()),
                ("search".to_string(), "a=b".to_string()),
            ]
        );
    }

    #[test]
    fn query_params_require_equals_sign() {
        let items = vec!["pageSize".to_string()];
        assert!(matches!(
            parse_query_params(&items),
            Err(ReportError::InvalidParam(item)) if item == "pageSize"
        ));
    }
}
