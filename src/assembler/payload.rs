use log::debug;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{AlmError, Result};

pub const TITLE_FIELD: &str = "System.Title";
pub const ID_FIELD: &str = "System.Id";
pub const TEAM_PROJECT_FIELD: &str = "System.TeamProject";
pub const STEPS_FIELD: &str = "Microsoft.VSTS.TCM.Steps";

/// Removes commas that directly precede `}` or `]` outside string literals,
/// repeating until the text stops changing. Valid JSON comes back unchanged.
pub fn repair_trailing_commas(raw: &str) -> String {
    let mut current = raw.to_string();
    loop {
        let next = strip_trailing_commas(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_trailing_commas(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut repaired = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;

    for (index, &c) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            repaired.push(c);
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                repaired.push(c);
            }
            ',' if closes_container(&chars[index + 1..]) => {}
            _ => repaired.push(c),
        }
    }

    repaired
}

fn closes_container(rest: &[char]) -> bool {
    rest.iter()
        .find(|c| !c.is_whitespace())
        .is_some_and(|c| matches!(c, '}' | ']'))
}

/// Parses a payload strictly, falling back to one trailing-comma repair.
pub fn parse_document(raw: &str) -> Result<Value> {
    match serde_json::from_str(raw) {
        Ok(value) => Ok(value),
        Err(strict_error) => {
            debug!("Strict parse failed ({strict_error}), retrying after repair");
            serde_json::from_str(&repair_trailing_commas(raw))
                .map_err(|e| AlmError::MalformedDocument(e.to_string()))
        }
    }
}

/// `{id, name}` context descriptor (project, plan, suite).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Descriptor {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A test case work item, independent of the document shape it came in.
#[derive(Debug, Clone, Default)]
pub struct WorkItem {
    pub id: Option<String>,
    pub title: Option<String>,
    pub fields: Map<String, Value>,
    pub project: Option<Descriptor>,
    pub plan: Option<Descriptor>,
    pub suite: Option<Descriptor>,
}

impl WorkItem {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|value| !value.is_null())
    }

    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// Identifier used in error reports.
    pub fn label(&self) -> String {
        self.title
            .clone()
            .or_else(|| self.id.clone())
            .unwrap_or_else(|| "untitled".to_string())
    }
}

#[derive(Deserialize)]
struct CollectionPayload {
    #[serde(default)]
    value: Vec<Option<SuiteEntry>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuiteEntry {
    #[serde(default)]
    work_item: Option<EntryWorkItem>,
    #[serde(default)]
    test_plan: Option<Descriptor>,
    #[serde(default)]
    test_suite: Option<Descriptor>,
    #[serde(default)]
    project: Option<Descriptor>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryWorkItem {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    work_item_fields: Option<Vec<Map<String, Value>>>,
}

#[derive(Deserialize)]
struct SingleItemPayload {
    #[serde(default)]
    id: Option<Value>,
    fields: Map<String, Value>,
}

/// Work items of a suite response (`{"value": [...]}`) or of a single work
/// item response (`{"id": .., "fields": {...}}`).
pub fn work_items(document: Value) -> Result<Vec<WorkItem>> {
    let Value::Object(object) = &document else {
        return Err(AlmError::MalformedDocument(
            "expected a JSON object at the top level".to_string(),
        ));
    };

    if object.get("fields").is_some_and(Value::is_object) {
        let single: SingleItemPayload = serde_json::from_value(document)?;
        return Ok(vec![single_work_item(single)]);
    }

    if object.get("value").is_some_and(Value::is_array) {
        let collection: CollectionPayload = serde_json::from_value(document)?;
        return Ok(collection
            .value
            .into_iter()
            .flatten()
            .map(collection_work_item)
            .collect());
    }

    Err(AlmError::MalformedDocument(
        "neither a \"value\" collection nor a \"fields\" object".to_string(),
    ))
}

fn collection_work_item(entry: SuiteEntry) -> WorkItem {
    let item = entry.work_item.unwrap_or(EntryWorkItem {
        id: None,
        name: None,
        work_item_fields: None,
    });

    let mut fields = Map::new();
    for field in item.work_item_fields.unwrap_or_default() {
        fields.extend(field);
    }

    WorkItem {
        id: item.id.as_ref().and_then(scalar_to_string),
        title: item.name.filter(|name| !name.trim().is_empty()),
        fields,
        project: entry.project,
        plan: entry.test_plan,
        suite: entry.test_suite,
    }
}

fn single_work_item(payload: SingleItemPayload) -> WorkItem {
    let fields = payload.fields;

    let id = payload
        .id
        .as_ref()
        .or_else(|| fields.get(ID_FIELD))
        .and_then(scalar_to_string);
    let title = fields
        .get(TITLE_FIELD)
        .and_then(Value::as_str)
        .filter(|title| !title.trim().is_empty())
        .map(str::to_string);
    let project = fields
        .get(TEAM_PROJECT_FIELD)
        .and_then(Value::as_str)
        .map(|name| Descriptor {
            id: None,
            name: Some(name.to_string()),
        });

    WorkItem {
        id,
        title,
        fields,
        project,
        plan: None,
        suite: None,
    }
}

/// Renders ids that may arrive as numbers or strings.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
