use std::fmt::Write;

use comfy_table::{Cell, Color as TableColor};

use crate::pipeline::{ProbeLedger, VerificationReport};
use crate::records::RunOutcome;

use super::styling::{accent, emphasis, label, toned, Tone};
use super::tables::{color_coded_rate_cell, create_cyan_header, create_table, stage_cell};

/// Prints the per-project outcome table of a mining run to stdout.
///
/// One row per project with a mark for each stage and the recorded error,
/// followed by per-stage success counts.
pub fn print_run_summary(outcomes: &[RunOutcome]) {
    println!("{}", render_run_summary(outcomes));
}

pub fn print_verification(report: &VerificationReport) {
    println!("{}", render_verification(report));
}

pub fn print_probe_summary(ledger: &ProbeLedger) {
    println!("{}", render_probe_summary(ledger));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", emphasis(emoji), emphasis(title).underlined());
}

fn count(outcomes: &[RunOutcome], stage: impl Fn(&RunOutcome) -> bool) -> usize {
    outcomes.iter().filter(|o| stage(o)).count()
}

fn render_run_summary(outcomes: &[RunOutcome]) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Run Summary");

    if outcomes.is_empty() {
        let _ = writeln!(output, "{}", toned("No projects were mined.", Tone::Pending));
        return output;
    }

    let clean = count(outcomes, |o| o.error.is_none());
    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n",
        label("Projects:"),
        toned(outcomes.len(), Tone::Pending),
        label("Without errors:"),
        toned(clean, Tone::from_ok(clean == outcomes.len())),
    );

    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "Project",
        "Diff",
        "Effort",
        "Bug fix",
        "Refactoring",
        "Error",
    ]));

    for outcome in outcomes {
        table.add_row(vec![
            Cell::new(&outcome.project),
            stage_cell(outcome.diff_ok),
            stage_cell(outcome.effort_ok),
            stage_cell(outcome.bugfix_ok),
            stage_cell(outcome.refactoring_ok),
            Cell::new(outcome.error.as_deref().unwrap_or("")).fg(TableColor::DarkGrey),
        ]);
    }

    let total = outcomes.len();
    table.add_row(vec![
        Cell::new("Succeeded").fg(TableColor::Cyan),
        color_coded_rate_cell(count(outcomes, |o| o.diff_ok), total),
        color_coded_rate_cell(count(outcomes, |o| o.effort_ok), total),
        color_coded_rate_cell(count(outcomes, |o| o.bugfix_ok), total),
        color_coded_rate_cell(count(outcomes, |o| o.refactoring_ok), total),
        Cell::new(""),
    ]);

    let _ = writeln!(output, "{table}");
    output
}

fn render_verification(report: &VerificationReport) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "🔎", "Output Verification");
    let _ = writeln!(
        output,
        "  {} {}\n",
        label("Projects checked:"),
        toned(report.projects_checked, Tone::Pending)
    );

    let mut table = create_table();
    table.set_header(create_cyan_header(&["Artifact", "Present", "Missing list"]));

    for missing in &report.missing {
        let present = report.projects_checked - missing.urls.len();
        table.add_row(vec![
            Cell::new(missing.kind.file_name()),
            color_coded_rate_cell(present, report.projects_checked),
            Cell::new(missing.kind.missing_list()),
        ]);
    }

    let _ = writeln!(output, "{table}");
    output
}

fn render_probe_summary(ledger: &ProbeLedger) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "🔗", "Final Results");
    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}",
        label("Successful links:"),
        toned(ledger.successful(), Tone::Done),
        label("Failed links:"),
        toned(ledger.failed(), Tone::Failed),
        label("Total unique projects processed:"),
        accent(ledger.processed()),
    );
    output
}
