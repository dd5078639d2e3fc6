use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::assembler::fields::Status;
use crate::assembler::steps::{ParsedStep, StepKind};

/// Canonical test case document written by the assembler.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTestCase {
    pub id: String,
    pub title: String,
    pub description: String,
    pub preconditions: String,
    pub expected_result: String,
    pub epic: String,
    pub feature: String,
    pub story: String,
    pub component: String,
    pub test_layer: &'static str,
    pub severity: &'static str,
    pub priority: &'static str,
    pub test_type: &'static str,
    pub status: Status,
    pub author: String,
    pub tags: Vec<String>,
    pub steps: Vec<TestStep>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl NormalizedTestCase {
    /// Blank document stamped with the current time. A missing id is
    /// generated, a missing title is derived from the id.
    pub fn new(id: Option<String>, title: Option<String>) -> Self {
        let now = Utc::now().timestamp_millis();
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        Self {
            title: title.unwrap_or_else(|| format!("Test case {id}")),
            id,
            description: String::new(),
            preconditions: String::new(),
            expected_result: String::new(),
            epic: String::new(),
            feature: String::new(),
            story: String::new(),
            component: String::new(),
            test_layer: "E2E",
            severity: "NORMAL",
            priority: "MEDIUM",
            test_type: "manual",
            status: Status::default(),
            author: String::new(),
            tags: Vec::new(),
            steps: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStep {
    pub id: String,
    pub name: String,
    pub kind: StepKind,
    pub description: String,
    pub expected_result: String,
    pub status: &'static str,
}

impl From<ParsedStep> for TestStep {
    fn from(step: ParsedStep) -> Self {
        let name = [&step.action, &step.expected]
            .into_iter()
            .find_map(|text| text.lines().next().filter(|line| !line.is_empty()))
            .unwrap_or_default()
            .to_string();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            kind: step.kind,
            description: step.action,
            expected_result: step.expected,
            status: "pending",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn step_name_is_first_action_line() {
        let step = TestStep::from(ParsedStep {
            id: 1,
            kind: StepKind::Action,
            action: "Open page\n- check header".to_string(),
            expected: "Page shown".to_string(),
        });

        assert_eq!(step.name, "Open page");
        assert_eq!(step.description, "Open page\n- check header");
        assert_eq!(step.status, "pending");
        assert!(Uuid::parse_str(&step.id).is_ok());
    }

    #[test]
    fn step_name_falls_back_to_expected_result() {
        let step = TestStep::from(ParsedStep {
            id: 2,
            kind: StepKind::Validation,
            action: String::new(),
            expected: "Title is shown\nin bold".to_string(),
        });

        assert_eq!(step.name, "Title is shown");
        assert_eq!(step.description, "");
        assert_eq!(step.expected_result, "Title is shown\nin bold");
    }

    #[test]
    fn missing_id_and_title_are_filled_in() {
        let case = NormalizedTestCase::new(None, None);

        assert!(Uuid::parse_str(&case.id).is_ok());
        assert_eq!(case.title, format!("Test case {}", case.id));
    }

    #[test]
    fn serializes_camel_case_with_defaults() {
        let mut case = NormalizedTestCase::new(Some("501".into()), Some("Login works".into()));
        case.tags = vec!["smoke".to_string()];

        let json: Value = serde_json::to_value(&case).unwrap();

        assert_eq!(json["id"], "501");
        assert_eq!(json["title"], "Login works");
        assert_eq!(json["testLayer"], "E2E");
        assert_eq!(json["testType"], "manual");
        assert_eq!(json["severity"], "NORMAL");
        assert_eq!(json["priority"], "MEDIUM");
        assert_eq!(json["status"], "Draft");
        assert_eq!(json["expectedResult"], "");
        assert_eq!(json["tags"][0], "smoke");
        assert!(json["createdAt"].as_i64().unwrap() > 0);
        assert_eq!(json["createdAt"], json["updatedAt"]);
    }
}
