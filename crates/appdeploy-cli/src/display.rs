//! Display formatting for CLI output

use appdeploy_kube::DeployReport;
use console::style;

/// Print the outcome of a run
pub fn print_report(report: &DeployReport) {
    for manifest in &report.applied {
        println!("  {} {}", style("✓").green(), manifest);
    }
    for item in &report.skipped {
        println!("  {} {} {}", style("-").dim(), item, style("(rendered empty)").dim());
    }
    for manifest in &report.deleted {
        println!("  {} {} {}", style("✗").red(), manifest, style("(deleted)").dim());
    }

    println!();
    println!("{} {}", style("✓").green().bold(), report.summary());
}
