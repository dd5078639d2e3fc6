pub mod fields;
pub mod filename;
pub mod payload;
pub mod steps;
pub mod text;

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;

use crate::error::Result;
use crate::model::{NormalizedTestCase, TestStep};
use crate::persist::write_atomically;

use fields::{
    compose_description, normalize_author, normalize_status, split_tags, STATE_FIELD, TAGS_FIELD,
};
use filename::{sanitize_title, unique_filename};
use payload::{parse_document, work_items, WorkItem, STEPS_FIELD};
use steps::extract_steps;

/// A payload file or work item that could not be turned into a test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub source: String,
    pub message: String,
}

#[derive(Debug, Default, Serialize)]
pub struct AssemblyReport {
    pub files: usize,
    pub created: usize,
    pub failures: Vec<ItemFailure>,
}

impl AssemblyReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn merge(&mut self, other: AssemblyReport) {
        self.files += other.files;
        self.created += other.created;
        self.failures.extend(other.failures);
    }

    fn fail(&mut self, source: impl Into<String>, message: impl ToString) {
        let failure = ItemFailure {
            source: source.into(),
            message: message.to_string(),
        };
        warn!("{}: {}", failure.source, failure.message);
        self.failures.push(failure);
    }
}

/// Turns raw payload files into test case documents below `target_root`.
pub struct Assembler {
    target_root: PathBuf,
}

impl Assembler {
    pub fn new(target_root: impl Into<PathBuf>) -> Self {
        Self {
            target_root: target_root.into(),
        }
    }

    /// Folder receiving the test cases of one payload file: the file stem
    /// under the target root.
    pub fn target_folder(&self, payload_path: &Path) -> PathBuf {
        let stem = payload_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "payload".to_string());
        self.target_root.join(stem)
    }

    pub fn assemble_files(&self, paths: &[PathBuf]) -> AssemblyReport {
        let mut report = AssemblyReport::default();
        for path in paths {
            report.merge(self.assemble_file(path));
        }
        info!(
            "Assembled {} test cases from {} files ({} failures)",
            report.created,
            report.files,
            report.failed()
        );
        report
    }

    /// Assembles every work item of one payload file. Failures are recorded
    /// in the report, per file when the payload is unusable and per item
    /// otherwise.
    pub fn assemble_file(&self, path: &Path) -> AssemblyReport {
        let mut report = AssemblyReport {
            files: 1,
            ..AssemblyReport::default()
        };
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let items = match read_work_items(path) {
            Ok(items) if items.is_empty() => {
                report.fail(file_name, "no test cases found");
                return report;
            }
            Ok(items) => items,
            Err(e) => {
                report.fail(file_name, e);
                return report;
            }
        };

        let folder = self.target_folder(path);
        debug!("Assembling {} items from {file_name} into {}", items.len(), folder.display());

        for item in &items {
            match write_test_case(item, &folder) {
                Ok(written) => {
                    debug!("Wrote {}", written.display());
                    report.created += 1;
                }
                Err(e) => report.fail(format!("{file_name} → {}", item.label()), e),
            }
        }

        report
    }
}

fn read_work_items(path: &Path) -> Result<Vec<WorkItem>> {
    let raw = std::fs::read_to_string(path)?;
    let document = parse_document(raw.trim_start_matches('\u{feff}'))?;
    work_items(document)
}

/// Builds the canonical document for one work item.
pub fn build_test_case(item: &WorkItem) -> NormalizedTestCase {
    let mut case = NormalizedTestCase::new(item.id.clone(), item.title.clone());

    case.description = compose_description(item);
    case.status = normalize_status(item.field_str(STATE_FIELD).unwrap_or_default());
    case.author = normalize_author(item);
    case.tags = item.field_str(TAGS_FIELD).map(split_tags).unwrap_or_default();
    case.steps = item
        .field_str(STEPS_FIELD)
        .map(extract_steps)
        .unwrap_or_default()
        .into_iter()
        .filter(|step| !step.is_empty())
        .map(TestStep::from)
        .collect();

    case
}

fn write_test_case(item: &WorkItem, folder: &Path) -> Result<PathBuf> {
    let case = build_test_case(item);
    let stem = sanitize_title(&case.title, Some(&case.id));
    let path = folder.join(unique_filename(&stem, folder));

    let contents = serde_json::to_vec_pretty(&case)?;
    write_atomically(&path, &contents)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::fields::Status;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    const STEPS_MARKUP: &str = r#"<steps id="0" last="3"><step id="2" type="ActionStep"><parameterizedString isformatted="true">&lt;DIV&gt;Open login page&lt;/DIV&gt;</parameterizedString><parameterizedString isformatted="true">Form shown</parameterizedString></step><step id="3" type="ValidateStep"><parameterizedString isformatted="true" /><parameterizedString isformatted="true" /></step></steps>"#;

    fn collection_payload() -> Value {
        json!({
            "count": 2,
            "value": [
                {
                    "testPlan": {"id": 10, "name": "Regression"},
                    "testSuite": {"id": 11, "name": "Login"},
                    "workItem": {
                        "id": 501,
                        "name": "Login: happy/path!!",
                        "workItemFields": [
                            {"Microsoft.VSTS.TCM.Steps": STEPS_MARKUP},
                            {"System.State": "Ready"},
                            {"System.AssignedTo": {"displayName": "Ann Smith"}},
                            {"System.Tags": "smoke; login"}
                        ]
                    }
                },
                {
                    "workItem": {"id": 502, "name": "Login: happy/path"}
                }
            ]
        })
    }

    fn write_payload(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn build_test_case_normalizes_fields() {
        let items = work_items(collection_payload()).unwrap();

        let case = build_test_case(&items[0]);

        assert_eq!(case.id, "501");
        assert_eq!(case.title, "Login: happy/path!!");
        assert_eq!(case.status, Status::InProgress);
        assert_eq!(case.author, "Ann Smith");
        assert_eq!(case.tags, vec!["smoke", "login"]);
        assert_eq!(
            case.description,
            "Test plan: Regression (ID: 10)\nTest suite: Login (ID: 11)"
        );
        assert_eq!(case.steps.len(), 1);
        assert_eq!(case.steps[0].name, "Open login page");
        assert_eq!(case.steps[0].expected_result, "Form shown");
    }

    #[test]
    fn assembles_collection_into_stem_folder_with_unique_names() {
        let dir = TempDir::new().unwrap();
        let payload = write_payload(dir.path(), "11.json", &collection_payload().to_string());
        let assembler = Assembler::new(dir.path().join("cases"));

        let report = assembler.assemble_file(&payload);

        assert_eq!(report.created, 2);
        assert!(report.failures.is_empty());
        let folder = dir.path().join("cases").join("11");
        let first = read_json(&folder.join("Login_happy_path.json"));
        let second = read_json(&folder.join("Login_happy_path_1.json"));
        assert_eq!(first["id"], "501");
        assert_eq!(first["status"], "In Progress");
        assert_eq!(first["steps"][0]["kind"], "action");
        assert_eq!(second["id"], "502");
        assert_eq!(second["status"], "Draft");
        assert_eq!(second["steps"], json!([]));
    }

    #[test]
    fn single_item_payload_is_supported() {
        let dir = TempDir::new().unwrap();
        let payload = write_payload(
            dir.path(),
            "case.json",
            r#"{"id": 7, "fields": {"System.Title": "Checkout", "System.State": "Closed",}}"#,
        );

        let report = Assembler::new(dir.path()).assemble_file(&payload);

        assert_eq!(report.created, 1);
        let case = read_json(&dir.path().join("case").join("Checkout.json"));
        assert_eq!(case["status"], "Done");
    }

    #[test]
    fn unparseable_file_is_a_file_level_failure() {
        let dir = TempDir::new().unwrap();
        let payload = write_payload(dir.path(), "broken.json", "{\"value\": [oops");

        let report = Assembler::new(dir.path()).assemble_file(&payload);

        assert_eq!(report.created, 0);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].source, "broken.json");
        assert!(!dir.path().join("broken").exists());
    }

    #[test]
    fn empty_payload_reports_no_test_cases() {
        let dir = TempDir::new().unwrap();
        let payload = write_payload(dir.path(), "empty.json", r#"{"count": 0, "value": []}"#);

        let report = Assembler::new(dir.path()).assemble_file(&payload);

        assert_eq!(
            report.failures,
            vec![ItemFailure {
                source: "empty.json".to_string(),
                message: "no test cases found".to_string(),
            }]
        );
    }

    #[test]
    fn batch_continues_past_failed_files() {
        let dir = TempDir::new().unwrap();
        let broken = write_payload(dir.path(), "1.json", "not json");
        let good = write_payload(dir.path(), "2.json", &collection_payload().to_string());
        let missing = dir.path().join("3.json");

        let report =
            Assembler::new(dir.path().join("out")).assemble_files(&[broken, good, missing]);

        assert_eq!(report.files, 3);
        assert_eq!(report.created, 2);
        assert_eq!(report.failed(), 2);
    }
}
