mod progress;
mod styling;
mod summary;
mod tables;

pub use progress::PhaseProgress;
use styling::{dim, magenta_bold};
pub use summary::{
    print_assembly_summary, print_fetch_summary, print_hierarchy_summary, print_import_summary,
};

/// Prints the `alm-import` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("📥 ALM Import"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Test case import from the test plan tracker")
    );
}
