use std::fmt::Write;
use std::path::Path;

use comfy_table::{Cell, Color as TableColor};

use crate::assembler::AssemblyReport;
use crate::import::ImportStats;
use crate::tracker::FetchStats;

use super::styling::{bright, bright_yellow, cyan, dim, failure_count};
use super::tables::{color_coded_created_cell, color_coded_error_cell, create_table};

/// Failure lines shown before the rest is elided.
const MAX_LISTED_FAILURES: usize = 20;

/// Prints the end-of-run report of a full import to stdout.
///
/// Shows one table per stage (suites fetched, test cases assembled) followed
/// by the first failures, identifier first.
pub fn print_import_summary(stats: &ImportStats) {
    println!("{}", render_import_summary(stats));
}

pub fn print_fetch_summary(stats: &FetchStats) {
    println!("{}", render_fetch_summary(stats));
}

pub fn print_assembly_summary(report: &AssemblyReport) {
    println!("{}", render_assembly_summary(report));
}

pub fn print_hierarchy_summary(suites: usize, with_parents: usize, path: &Path) {
    let mut output = String::new();
    add_section_header(&mut output, "🌳", "Suite Hierarchy");
    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}",
        dim("Suites:"),
        bright_yellow(suites),
        dim("With ancestors:"),
        bright_yellow(with_parents),
        dim("Written to:"),
        cyan(path.display())
    );
    println!("{output}");
}

fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn render_import_summary(stats: &ImportStats) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Overview");
    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n",
        dim("Suites in hierarchy:"),
        bright_yellow(stats.suites),
        dim("Suite errors:"),
        failure_count(stats.fetch.errors()),
        dim("Test case errors:"),
        failure_count(stats.assembly.failed())
    );

    add_fetch_section(&mut output, &stats.fetch);
    add_assembly_section(&mut output, &stats.assembly, stats.assembly_skipped);

    let failures: Vec<(String, &str)> = stats
        .fetch
        .failures
        .iter()
        .map(|f| (format!("suite {}", f.suite_id), f.message.as_str()))
        .chain(
            stats
                .assembly
                .failures
                .iter()
                .map(|f| (f.source.clone(), f.message.as_str())),
        )
        .collect();
    add_failures_section(&mut output, &failures);

    output
}

fn render_fetch_summary(stats: &FetchStats) -> String {
    let mut output = String::new();
    add_fetch_section(&mut output, stats);

    let failures: Vec<(String, &str)> = stats
        .failures
        .iter()
        .map(|f| (format!("suite {}", f.suite_id), f.message.as_str()))
        .collect();
    add_failures_section(&mut output, &failures);

    output
}

fn render_assembly_summary(report: &AssemblyReport) -> String {
    let mut output = String::new();
    add_assembly_section(&mut output, report, 0);

    let failures: Vec<(String, &str)> = report
        .failures
        .iter()
        .map(|f| (f.source.clone(), f.message.as_str()))
        .collect();
    add_failures_section(&mut output, &failures);

    output
}

fn add_fetch_section(output: &mut String, stats: &FetchStats) {
    add_section_header(output, "📡", "Suites");

    let mut table = create_table();
    table.set_header(create_cyan_header(&["Considered", "Fetched", "Skipped", "Errors"]));
    table.add_row(vec![
        Cell::new(stats.total),
        color_coded_created_cell(stats.fetched),
        Cell::new(stats.skipped),
        color_coded_error_cell(stats.errors()),
    ]);

    let _ = writeln!(output, "{table}\n");
}

fn add_assembly_section(output: &mut String, report: &AssemblyReport, skipped: usize) {
    add_section_header(output, "🧪", "Test Cases");

    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "Payload Files",
        "Already Assembled",
        "Created",
        "Failed",
    ]));
    table.add_row(vec![
        Cell::new(report.files),
        Cell::new(skipped),
        color_coded_created_cell(report.created),
        color_coded_error_cell(report.failed()),
    ]);

    let _ = writeln!(output, "{table}\n");
}

fn add_failures_section(output: &mut String, failures: &[(String, &str)]) {
    if failures.is_empty() {
        return;
    }

    add_section_header(output, "⚠️", "Failures");
    for (source, message) in failures.iter().take(MAX_LISTED_FAILURES) {
        let _ = writeln!(output, "  {} {}: {}", cyan("•"), bright(source), dim(message));
    }
    if failures.len() > MAX_LISTED_FAILURES {
        let _ = writeln!(
            output,
            "  {}",
            dim(format!("... and {} more", failures.len() - MAX_LISTED_FAILURES))
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::ItemFailure;
    use crate::tracker::SuiteFailure;

    fn create_fetch_stats(fetched: usize, skipped: usize, failed: &[u64]) -> FetchStats {
        FetchStats {
            total: fetched + skipped + failed.len(),
            fetched,
            skipped,
            failures: failed
                .iter()
                .map(|&suite_id| SuiteFailure {
                    suite_id,
                    message: "Gave up after 3 attempts: Request timed out".to_string(),
                })
                .collect(),
        }
    }

    fn create_report(created: usize, failed: usize) -> AssemblyReport {
        AssemblyReport {
            files: created + failed,
            created,
            failures: (0..failed)
                .map(|i| ItemFailure {
                    source: format!("{i}.json"),
                    message: "no test cases found".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_render_import_summary_shows_both_stages() {
        let stats = ImportStats {
            suites: 4,
            fetch: create_fetch_stats(2, 1, &[9]),
            assembly_skipped: 1,
            assembly: create_report(5, 0),
        };

        let output = render_import_summary(&stats);

        assert!(output.contains("Overview"));
        assert!(output.contains("Suites in hierarchy:"));
        assert!(output.contains("Considered"));
        assert!(output.contains("Payload Files"));
        assert!(output.contains("suite 9"));
        assert!(output.contains("Gave up after 3 attempts"));
    }

    #[test]
    fn test_render_fetch_summary_without_failures_has_no_failure_section() {
        let output = render_fetch_summary(&create_fetch_stats(3, 0, &[]));

        assert!(output.contains("Fetched"));
        assert!(!output.contains("Failures"));
    }

    #[test]
    fn test_render_assembly_summary_lists_failed_files() {
        let output = render_assembly_summary(&create_report(0, 2));

        assert!(output.contains("0.json"));
        assert!(output.contains("1.json"));
        assert!(output.contains("no test cases found"));
    }

    #[test]
    fn test_failure_list_is_bounded() {
        let failed: Vec<u64> = (1..=25).collect();

        let output = render_fetch_summary(&create_fetch_stats(0, 0, &failed));

        assert!(output.contains("suite 20"));
        assert!(!output.contains("suite 21"));
        assert!(output.contains("... and 5 more"));
    }
}
