//! End-of-run summary and exit-code derivation.

use std::fmt::Write;

use crate::core::report::{InstallReport, Summary};
use crate::ops::orchestrator::RunResult;
use crate::util::errors::exit_code;

fn write_section(output: &mut String, mark: &str, title: &str, reports: &[InstallReport], with_errors: bool) {
    if reports.is_empty() {
        return;
    }

    let _ = writeln!(output, "\n{} {} ({}):", mark, title, reports.len());
    for report in reports {
        let version = match &report.version {
            Some(v) => format!(" (v{})", v),
            None => String::new(),
        };
        let _ = writeln!(output, "  - {}{}: {}", report.tool, version, report.message);

        if with_errors {
            if let Some(error) = &report.error {
                for (i, line) in error.lines().enumerate() {
                    let label = if i == 0 { "error: " } else { "       " };
                    let _ = writeln!(output, "    {}{}", label, line);
                }
            }
        }
    }
}

/// Render the summary block printed after `init`, `install` and `upgrade`.
///
/// Failed entries carry the captured error text, indented under the tool.
pub fn format_summary(summary: &Summary) -> String {
    let rule = "=".repeat(60);
    let mut output = String::new();

    let _ = writeln!(output, "{}", rule);
    let _ = writeln!(output, "Summary");
    let _ = write!(output, "{}", rule);

    write_section(&mut output, "[OK]", "Succeeded", &summary.successes, false);
    write_section(&mut output, "[--]", "Skipped", &summary.skips, false);
    write_section(&mut output, "[!!]", "Failed", &summary.failures, true);

    let _ = writeln!(output, "\n{}", rule);
    let _ = writeln!(
        output,
        "Total: {}  succeeded: {}  skipped: {}  failed: {}",
        summary.total(),
        summary.successes.len(),
        summary.skips.len(),
        summary.failures.len()
    );

    output
}

/// Process exit code for a finished run.
pub fn exit_code_for(result: &RunResult) -> i32 {
    if result.interrupted {
        return exit_code::USER_INTERRUPT;
    }

    if result.summary().all_attempted_failed() {
        exit_code::ALL_TASKS_FAILED
    } else {
        exit_code::SUCCESS
    }
}
