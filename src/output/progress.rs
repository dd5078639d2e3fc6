use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::assembler::AssemblyReport;
use crate::tracker::FetchStats;

use super::styling::{bright, bright_green, bright_red, bright_yellow};

/// Spinners for the three import phases
pub struct PhaseProgress {
    pb: ProgressBar,
}

impl PhaseProgress {
    pub fn start_hierarchy() -> Self {
        eprintln!("{}  {}", bright("⚙️"), bright("Phases").underlined());
        let pb = create_spinner(bright_yellow("Phase 1/3: Resolving suite hierarchy").to_string());
        Self { pb }
    }

    pub fn finish_hierarchy_start_fetch(self, suites: usize) -> Self {
        self.pb.finish_with_message(
            bright_green(format!("Phase 1/3: Resolved {suites} suites ✓")).to_string(),
        );
        let pb = create_spinner(bright_yellow("Phase 2/3: Fetching suite payloads").to_string());
        Self { pb }
    }

    pub fn finish_fetch_start_assemble(self, stats: &FetchStats) -> Self {
        let message = format!(
            "Phase 2/3: Fetched {} suites, skipped {}",
            stats.fetched, stats.skipped
        );
        self.pb.finish_with_message(finished(message, stats.errors()));
        let pb = create_spinner(bright_yellow("Phase 3/3: Assembling test cases").to_string());
        Self { pb }
    }

    pub fn finish_assemble(self, report: &AssemblyReport) {
        let message = format!("Phase 3/3: Created {} test cases", report.created);
        self.pb.finish_with_message(finished(message, report.failed()));
        eprintln!();
    }
}

fn finished(message: String, errors: usize) -> String {
    if errors == 0 {
        bright_green(format!("{message} ✓")).to_string()
    } else {
        bright_red(format!("{message}, {errors} errors ✗")).to_string()
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {msg} {spinner}")
            .expect("valid spinner template"),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
