use std::collections::BTreeMap;

use crate::devmon::report::model::{ConsolidatedRecord, PersonRecord};

/// Consolidated rows plus the workspace order used for their column blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Consolidation {
    pub records: Vec<ConsolidatedRecord>,
    pub workspace_order: Vec<String>,
}

/// Grouping key: the normalised email, or the raw row position for people
/// without one so they are never merged with each other. Anonymous rows sort
/// after every email, by the workspace's block position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum GroupKey {
    Email(String),
    Anonymous { block: usize, index: usize },
}

/// Folds raw rows into one row per email.
///
/// Identity fields keep the first non-empty value seen, in raw-row order.
/// Within one workspace the last row for an email wins. Column blocks cover
/// every workspace present in `raw`, ordered as in `declared` with
/// undeclared names appended in first-seen order.
pub fn consolidate(raw: &[PersonRecord], declared: &[String]) -> Consolidation {
    let workspace_order = workspace_order(raw, declared);
    let mut groups: BTreeMap<GroupKey, ConsolidatedRecord> = BTreeMap::new();

    for (index, record) in raw.iter().enumerate() {
        let email = record.normalized_email();
        let key = if email.is_empty() {
            GroupKey::Anonymous {
                block: workspace_order
                    .iter()
                    .position(|name| *name == record.workspace)
                    .unwrap_or(workspace_order.len()),
                index,
            }
        } else {
            GroupKey::Email(email.clone())
        };

        let entry = groups.entry(key).or_insert_with(|| ConsolidatedRecord {
            email_address: email,
            ..ConsolidatedRecord::default()
        });
        merge_identity(entry, record);

        match entry
            .workspaces
            .iter_mut()
            .find(|(workspace, _)| *workspace == record.workspace)
        {
            Some((_, state)) => *state = record.task.clone(),
            None => entry
                .workspaces
                .push((record.workspace.clone(), record.task.clone())),
        }
    }

    Consolidation {
        records: groups.into_values().collect(),
        workspace_order,
    }
}

fn merge_identity(target: &mut ConsolidatedRecord, record: &PersonRecord) {
    fill(&mut target.name_display, &record.name_display);
    fill(&mut target.name_first, &record.name_first);
    fill(&mut target.name_last, &record.name_last);
    fill(&mut target.employment_status, &record.employment_status);
}

fn fill(slot: &mut Option<String>, candidate: &Option<String>) {
    let missing = slot.as_deref().is_none_or(|value| value.trim().is_empty());
    if missing {
        if let Some(value) = candidate.as_deref().filter(|value| !value.trim().is_empty()) {
            *slot = Some(value.to_string());
        }
    }
}

fn workspace_order(raw: &[PersonRecord], declared: &[String]) -> Vec<String> {
    let mut seen: Vec<&str> = Vec::new();
    for record in raw {
        if !seen.contains(&record.workspace.as_str()) {
            seen.push(&record.workspace);
        }
    }

    let mut order: Vec<String> = declared
        .iter()
        .filter(|name| seen.contains(&name.as_str()))
        .cloned()
        .collect();
    for name in seen {
        if !declared.iter().any(|declared| declared == name) {
            order.push(name.to_string());
        }
    }
    order
}
