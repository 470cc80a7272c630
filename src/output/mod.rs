mod progress;
mod styling;
mod summary;
mod tables;

pub use progress::{ItemProgress, StageProgress};
use styling::{label, title};
pub use summary::{print_probe_summary, print_run_summary, print_verification};

/// Prints the `repominer` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        title("⛏️ repominer"),
        label(env!("CARGO_PKG_VERSION")),
        label("Repository History Mining Pipeline")
    );
}
