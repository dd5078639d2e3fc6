use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Serializer};

use super::text::normalize_text;

static STEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<step\s+id="(\d+)"\s+type="(\w+)"[^>]*>(.*?)</step>"#)
        .expect("valid step regex")
});

static PARAMETER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<parameterizedString\b[^>]*?(?:/>|>(.*?)</parameterizedString>)")
        .expect("valid parameter regex")
});

/// What a step does, from its `type` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    Action,
    Validation,
    Other(String),
}

impl StepKind {
    fn from_type(step_type: &str) -> Self {
        match step_type {
            "ActionStep" => Self::Action,
            "ValidateStep" => Self::Validation,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Action => "action",
            Self::Validation => "validation",
            Self::Other(other) => other,
        }
    }
}

impl Serialize for StepKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One step as found in the step markup, text already normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStep {
    pub id: u64,
    pub kind: StepKind,
    pub action: String,
    pub expected: String,
}

impl ParsedStep {
    pub fn is_empty(&self) -> bool {
        self.action.is_empty() && self.expected.is_empty()
    }
}

/// Extracts the ordered steps from a `Microsoft.VSTS.TCM.Steps` value.
///
/// The first `parameterizedString` of a step is the action, the second the
/// expected result. Markup without recognizable steps yields no steps. A step
/// id too large to represent falls back to the step's 1-based position.
pub fn extract_steps(markup: &str) -> Vec<ParsedStep> {
    STEP.captures_iter(markup)
        .enumerate()
        .map(|(index, caps)| {
            let id = caps[1].parse().unwrap_or(index as u64 + 1);
            let mut parameters = PARAMETER
                .captures_iter(&caps[3])
                .map(|param| param.get(1).map_or("", |m| m.as_str()));

            let action = parameters.next().map(normalize_text).unwrap_or_default();
            let expected = parameters.next().map(normalize_text).unwrap_or_default();

            ParsedStep {
                id,
                kind: StepKind::from_type(&caps[2]),
                action,
                expected,
            }
        })
        .collect()
}
