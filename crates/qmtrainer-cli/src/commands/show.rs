//! The `qmtrainer show` command.

use anyhow::Result;
use comfy_table::{Cell, Color, Table};

use qmtrainer_core::engine::{Evaluation, StepStatus};
use qmtrainer_core::model::SessionId;
use qmtrainer_core::report::SessionReport;

use super::{require_session, Context};

pub async fn execute(ctx: &Context, id: SessionId, format: String) -> Result<()> {
    let protocol = ctx.protocol()?;
    let store = ctx.store().await?;
    let session = require_session(store.as_ref(), id).await?;
    let report = SessionReport::project(&session, &protocol)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Session #{} | {} | trainer {} | {} | {}",
        report.session_id,
        report.disponent,
        report.trainer,
        report.start_time.format("%Y-%m-%d %H:%M"),
        report.source
    );
    println!("Duration: {} s", report.total_secs);
    print_evaluation(&report.evaluation);

    if !report.feedback.is_empty() {
        println!("\nFeedback:");
        for fb in &report.feedback {
            println!(
                "  {}  {}  {}",
                fb.created_at.format("%Y-%m-%d %H:%M"),
                fb.id,
                fb.overall
            );
        }
    }

    Ok(())
}

fn status_color(status: StepStatus) -> Color {
    match status {
        StepStatus::Ok => Color::Green,
        StepStatus::TooSlow => Color::Yellow,
        StepStatus::Missing => Color::Red,
    }
}

/// Print the step table and verdict of an evaluation.
pub(crate) fn print_evaluation(evaluation: &Evaluation) {
    let mut table = Table::new();
    table.set_header(vec!["Step", "Time", "Interval", "Deadline", "Status", "Points"]);

    let secs = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
    for step in &evaluation.steps {
        table.add_row(vec![
            Cell::new(&step.name),
            Cell::new(secs(step.cumulative_secs.map(|s| format!("{s} s")))),
            Cell::new(secs(step.interval_secs.map(|s| format!("{s} s")))),
            Cell::new(secs(step.threshold_secs.map(|s| format!("{s} s")))),
            Cell::new(step.status.label()).fg(status_color(step.status)),
            Cell::new(format!("{}/{}", step.awarded_points, step.max_points)),
        ]);
    }
    println!("{table}");

    println!(
        "Score: {}/{} (pass at {}) => {}",
        evaluation.score,
        evaluation.max_points,
        evaluation.pass_threshold,
        if evaluation.passed { "PASSED" } else { "FAILED" }
    );
}
