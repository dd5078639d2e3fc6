use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::payload::{scalar_to_string, Descriptor, WorkItem};

pub const ASSIGNED_TO_FIELD: &str = "System.AssignedTo";
pub const STATE_FIELD: &str = "System.State";
pub const TAGS_FIELD: &str = "System.Tags";
pub const PRIORITY_FIELD: &str = "Microsoft.VSTS.Common.Priority";
pub const AUTOMATION_STATUS_FIELD: &str = "Microsoft.VSTS.TCM.AutomationStatus";
pub const STATE_CHANGE_DATE_FIELD: &str = "Microsoft.VSTS.Common.StateChangeDate";

/// Identity keys tried in order when the assignee is an object.
const DISPLAY_NAME_KEYS: &[&str] = &["displayName", "name", "uniqueName", "mail"];

/// Assignee as the tracker sends it: a bare name or an identity object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Assignee {
    Name(String),
    Identity(Map<String, Value>),
}

impl Assignee {
    pub fn display_name(&self) -> String {
        match self {
            Self::Name(name) => name.trim().to_string(),
            Self::Identity(identity) => DISPLAY_NAME_KEYS
                .iter()
                .filter_map(|key| identity.get(*key).and_then(Value::as_str))
                .map(str::trim)
                .find(|name| !name.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(identity.clone()).to_string()),
        }
    }
}

/// Author string for a work item; empty when nobody is assigned.
pub fn normalize_author(item: &WorkItem) -> String {
    item.field(ASSIGNED_TO_FIELD)
        .and_then(|value| Assignee::deserialize(value).ok())
        .map(|assignee| assignee.display_name())
        .unwrap_or_default()
}

/// Status vocabulary of the test case editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Draft,
    #[serde(rename = "In Progress")]
    InProgress,
    Done,
    Blocked,
    Deprecated,
}

/// Free-text tracker states (compared lowercased) and the status they mean.
/// Extend here when a project uses its own workflow states.
const STATUS_SYNONYMS: &[(&str, Status)] = &[
    ("draft", Status::Draft),
    ("design", Status::Draft),
    ("new", Status::Draft),
    ("черновик", Status::Draft),
    ("проектирование", Status::Draft),
    ("новый", Status::Draft),
    ("in progress", Status::InProgress),
    ("active", Status::InProgress),
    ("ready", Status::InProgress),
    ("review", Status::InProgress),
    ("in review", Status::InProgress),
    ("ready for review", Status::InProgress),
    ("в работе", Status::InProgress),
    ("на ревью", Status::InProgress),
    ("на согласовании", Status::InProgress),
    ("done", Status::Done),
    ("closed", Status::Done),
    ("completed", Status::Done),
    ("resolved", Status::Done),
    ("approved", Status::Done),
    ("готово", Status::Done),
    ("закрыт", Status::Done),
    ("завершен", Status::Done),
    ("blocked", Status::Blocked),
    ("заблокирован", Status::Blocked),
    ("deprecated", Status::Deprecated),
    ("obsolete", Status::Deprecated),
    ("removed", Status::Deprecated),
    ("устарел", Status::Deprecated),
];

pub fn normalize_status(raw: &str) -> Status {
    let key = raw.trim().to_lowercase();
    STATUS_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == key)
        .map(|(_, status)| *status)
        .unwrap_or_default()
}

/// `"smoke; ui;;regression "` → `["smoke", "ui", "regression"]`
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Context lines for the description: project, plan, suite, priority,
/// automation status and state change date, each only when present.
pub fn compose_description(item: &WorkItem) -> String {
    let mut lines = Vec::new();

    for (label, descriptor) in [
        ("Project", &item.project),
        ("Test plan", &item.plan),
        ("Test suite", &item.suite),
    ] {
        if let Some(line) = descriptor.as_ref().and_then(|d| describe(label, d)) {
            lines.push(line);
        }
    }

    if let Some(priority) = item.field(PRIORITY_FIELD).and_then(scalar_to_string) {
        lines.push(format!("Priority: {priority}"));
    }

    if let Some(status) = item
        .field_str(AUTOMATION_STATUS_FIELD)
        .filter(|s| !s.is_empty())
    {
        lines.push(format!("Automation status: {status}"));
    }

    if let Some(date) = item
        .field_str(STATE_CHANGE_DATE_FIELD)
        .filter(|s| !s.is_empty())
    {
        lines.push(format!("State changed: {date}"));
    }

    lines.join("\n")
}

fn describe(label: &str, descriptor: &Descriptor) -> Option<String> {
    let name = descriptor.name.as_deref().filter(|n| !n.is_empty())?;
    Some(match descriptor.id.as_ref().and_then(scalar_to_string) {
        Some(id) => format!("{label}: {name} (ID: {id})"),
        None => format!("{label}: {name}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item_with(fields: Value) -> WorkItem {
        WorkItem {
            fields: fields.as_object().cloned().unwrap_or_default(),
            ..WorkItem::default()
        }
    }

    #[test]
    fn author_from_plain_string() {
        let item = item_with(json!({"System.AssignedTo": "  Ann Smith <ann@corp> "}));
        assert_eq!(normalize_author(&item), "Ann Smith <ann@corp>");
    }

    #[test]
    fn author_prefers_display_name_keys_in_order() {
        let item = item_with(json!({"System.AssignedTo": {
            "uniqueName": "CORP\\ann",
            "displayName": "Ann Smith",
            "id": "a1"
        }}));
        assert_eq!(normalize_author(&item), "Ann Smith");

        let item = item_with(json!({"System.AssignedTo": {
            "displayName": "",
            "uniqueName": "CORP\\ann"
        }}));
        assert_eq!(normalize_author(&item), "CORP\\ann");
    }

    #[test]
    fn author_without_known_keys_dumps_structure() {
        let item = item_with(json!({"System.AssignedTo": {"id": "a1"}}));
        assert_eq!(normalize_author(&item), r#"{"id":"a1"}"#);
    }

    #[test]
    fn missing_or_null_author_is_empty() {
        assert_eq!(normalize_author(&item_with(json!({}))), "");
        assert_eq!(
            normalize_author(&item_with(json!({"System.AssignedTo": null}))),
            ""
        );
    }

    #[test]
    fn status_synonyms_are_case_insensitive() {
        assert_eq!(normalize_status("Ready for Review"), Status::InProgress);
        assert_eq!(normalize_status("  CLOSED "), Status::Done);
        assert_eq!(normalize_status("На ревью"), Status::InProgress);
        assert_eq!(normalize_status("Design"), Status::Draft);
        assert_eq!(normalize_status("Obsolete"), Status::Deprecated);
    }

    #[test]
    fn unknown_or_empty_status_defaults_to_draft() {
        assert_eq!(normalize_status(""), Status::Draft);
        assert_eq!(normalize_status("Waiting for Godot"), Status::Draft);
    }

    #[test]
    fn status_serializes_with_editor_labels() {
        assert_eq!(
            serde_json::to_string(&Status::InProgress).unwrap(),
            "\"In Progress\""
        );
        assert_eq!(serde_json::to_string(&Status::Draft).unwrap(), "\"Draft\"");
    }

    #[test]
    fn tags_split_on_semicolons() {
        assert_eq!(
            split_tags("smoke; ui;;regression "),
            vec!["smoke", "ui", "regression"]
        );
        assert!(split_tags(" ; ").is_empty());
    }

    #[test]
    fn description_lists_present_context_only() {
        let mut item = item_with(json!({
            "Microsoft.VSTS.Common.Priority": 2,
            "Microsoft.VSTS.TCM.AutomationStatus": "Not Automated",
            "Microsoft.VSTS.Common.StateChangeDate": ""
        }));
        item.project = Some(Descriptor {
            id: Some(json!("p-1")),
            name: Some("Shop".to_string()),
        });
        item.suite = Some(Descriptor {
            id: Some(json!(11)),
            name: Some("Login".to_string()),
        });

        assert_eq!(
            compose_description(&item),
            "Project: Shop (ID: p-1)\nTest suite: Login (ID: 11)\nPriority: 2\nAutomation status: Not Automated"
        );
    }

    #[test]
    fn description_is_empty_without_context() {
        assert_eq!(compose_description(&WorkItem::default()), "");
    }
}
