//! Formatting functions for user-facing output.
//!
//! Everything the operator reads goes through here; diagnostics go through
//! `tracing` instead.

use console::style;
use semver::Version;

use crate::boundary::BoundaryWarning;

/// Print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print a success message with a green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Print a status message with a yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Print a stage skip together with the reason, dimmed.
pub fn display_skip(message: &str, reason: &str) {
    println!(
        "{} {} {}",
        style("→").yellow(),
        message,
        style(format!("({})", reason)).dim()
    );
}

/// Print what a dry run would have done.
pub fn display_dry_run(action: &str) {
    println!("{} {}", style("[dry-run]").cyan(), action);
}

/// Print a boundary warning with a yellow warning icon.
pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow().bold(), warning);
}

/// Render the version transition, e.g. `1.2.3 -> 1.3.0`.
pub fn format_version_change(current: &Version, next: &Version) -> String {
    format!("{} -> {}", style(current).dim(), style(next).green().bold())
}

/// Show the resolved version and why it was chosen.
pub fn display_version_plan(current: &Version, next: &Version, reason: Option<&str>) {
    println!("\n{}", style("Release plan").bold());
    println!("  {}", format_version_change(current, next));
    if let Some(reason) = reason {
        println!("  {}", style(reason).dim());
    }
}

/// Print the list of rollback steps that ran.
pub fn display_rollback(descriptions: &[String]) {
    if descriptions.is_empty() {
        return;
    }
    eprintln!("{}", style("Rolled back:").yellow().bold());
    for description in descriptions {
        eprintln!("  - {}", description);
    }
}
