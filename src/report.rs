// PERFPREP STATUS LINES
// ONE LINE PER STEP, ONE SUMMARY PER PROFILE. STDOUT IS THE REPORTING CHANNEL;
// DIAGNOSTICS GO THROUGH log TO STDERR.

use crate::profile::{ProfileResult, StepOutcome, StepResult};
use crate::topology::BulkReport;

const LABEL_WIDTH: usize = 26;

pub fn step_line(step: &StepOutcome) -> String {
    let status = match &step.result {
        StepResult::Toggle(o) => o.to_string(),
        StepResult::Bulk(r) => r.to_string(),
    };
    format!("  {:<width$}{}", step.label, status, width = LABEL_WIDTH)
}

// PER-UNIT DETAIL LINES FOR A BULK STEP THAT HAD FAILURES
pub fn bulk_failure_lines(report: &BulkReport) -> Vec<String> {
    report
        .failures
        .iter()
        .map(|(id, o)| format!("    cpu{:<4}{}", id, o))
        .collect()
}

pub fn print_step(step: &StepOutcome) {
    println!("{}", step_line(step));
    if let StepResult::Bulk(r) = &step.result {
        for line in bulk_failure_lines(r) {
            println!("{}", line);
        }
    }
}

pub fn summary_line(result: &ProfileResult) -> String {
    if let Some(e) = &result.aborted {
        return format!("{} ABORTED: {} (NOTHING WAS CHANGED)", result.profile.to_uppercase(), e);
    }
    format!(
        "{}: {} STEPS, {} CHANGES, {} FAILED",
        result.profile.to_uppercase(),
        result.steps.len(),
        result.changed(),
        result.failed()
    )
}

pub fn print_summary(result: &ProfileResult) {
    println!();
    println!("{}", summary_line(result));
}
