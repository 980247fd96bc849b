//! HTML report generator.
//!
//! Produces self-contained HTML files with all CSS/JS inlined: one page per
//! session, and a listing page across all sessions.

use anyhow::{Context, Result};
use std::path::Path;

use qmtrainer_core::engine::{StepResult, StepStatus};
use qmtrainer_core::feedback::{FeedbackRecord, SbiObservation};
use qmtrainer_core::report::{SessionListing, SessionReport};
use qmtrainer_core::statistics::SessionSummary;

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Seconds as `m:ss`, negative values keep their sign.
fn format_secs(secs: i64) -> String {
    let sign = if secs < 0 { "-" } else { "" };
    let abs = secs.unsigned_abs();
    format!("{sign}{}:{:02}", abs / 60, abs % 60)
}

fn status_class(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Ok => "ok",
        StepStatus::TooSlow => "slow",
        StepStatus::Missing => "missing",
    }
}

fn status_color(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Ok => "#22c55e",
        StepStatus::TooSlow => "#eab308",
        StepStatus::Missing => "#ef4444",
    }
}

fn verdict(passed: bool) -> (&'static str, &'static str) {
    if passed {
        ("pass", "Bestanden")
    } else {
        ("fail", "Nicht bestanden")
    }
}

fn push_head(html: &mut String, title: &str) {
    html.push_str("<!DOCTYPE html>\n<html lang=\"de\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!("<title>{}</title>\n", html_escape(title)));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");
}

/// Generate the HTML report for a single session.
pub fn generate_html(report: &SessionReport) -> String {
    let mut html = String::new();
    let evaluation = &report.evaluation;

    push_head(
        &mut html,
        &format!("QM report: {} #{}", report.disponent, report.session_id),
    );

    // Header
    html.push_str("<header>\n");
    html.push_str(&format!(
        "<h1>QM report: {}</h1>\n",
        html_escape(&report.disponent)
    ));
    html.push_str(&format!(
        "<p class=\"meta\">Session #{} | Trainer: <strong>{}</strong> | {} | {} | generated {}</p>\n",
        report.session_id,
        html_escape(&report.trainer),
        html_escape(&report.protocol_name),
        report.source,
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));
    html.push_str("</header>\n");

    // Summary
    let (verdict_class, verdict_text) = verdict(evaluation.passed);
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>Summary</h2>\n");
    html.push_str("<table class=\"summary\">\n<tbody>\n");
    html.push_str(&format!(
        "<tr><th>Start</th><td>{}</td></tr>\n",
        report.start_time.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str(&format!(
        "<tr><th>End</th><td>{}</td></tr>\n",
        report.end_time.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str(&format!(
        "<tr><th>Duration</th><td>{} ({} s)</td></tr>\n",
        format_secs(report.total_secs),
        report.total_secs
    ));
    html.push_str(&format!(
        "<tr><th>Score</th><td>{} / {} (pass at {})</td></tr>\n",
        evaluation.score, evaluation.max_points, evaluation.pass_threshold
    ));
    html.push_str(&format!(
        "<tr><th>Result</th><td class=\"{verdict_class}\">{verdict_text}</td></tr>\n"
    ));
    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    // Steps
    html.push_str("<section class=\"results\">\n");
    html.push_str("<h2>Steps</h2>\n");
    html.push_str("<table class=\"results-table\">\n");
    html.push_str("<thead><tr><th>Step</th><th>Time</th><th>Interval</th><th>Deadline</th><th>Status</th><th>Points</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for step in &evaluation.steps {
        html.push_str(&step_row(step));
    }
    html.push_str("</tbody></table>\n");
    if !evaluation.steps.is_empty() {
        html.push_str(&generate_step_chart(&evaluation.steps));
    }
    html.push_str("</section>\n");

    // Feedback
    html.push_str("<section class=\"feedback\">\n");
    html.push_str("<h2>Feedback</h2>\n");
    if report.feedback.is_empty() {
        html.push_str("<p class=\"meta\">No feedback recorded.</p>\n");
    }
    for fb in &report.feedback {
        html.push_str(&feedback_block(fb));
    }
    html.push_str("</section>\n");

    html.push_str("</body>\n</html>");
    html
}

fn step_row(step: &StepResult) -> String {
    let time = step
        .cumulative_secs
        .map(|s| format!("{s} s"))
        .unwrap_or_else(|| "-".to_string());
    let interval = step
        .interval_secs
        .map(|s| format!("{s} s"))
        .unwrap_or_else(|| "-".to_string());
    let deadline = step
        .threshold_secs
        .map(|s| format!("{s} s"))
        .unwrap_or_else(|| "-".to_string());
    let name = if step.out_of_order {
        format!("{} <span class=\"meta\">(out of order)</span>", html_escape(&step.name))
    } else {
        html_escape(&step.name)
    };

    format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"{}\">{}</td><td>{} / {}</td></tr>\n",
        name,
        time,
        interval,
        deadline,
        status_class(step.status),
        step.status.label(),
        step.awarded_points,
        step.max_points
    )
}

fn sbi(title: &str, obs: &SbiObservation) -> String {
    format!(
        "<h4>{}</h4>\n<dl>\n<dt>Situation</dt><dd>{}</dd>\n<dt>Behavior</dt><dd>{}</dd>\n<dt>Impact</dt><dd>{}</dd>\n</dl>\n",
        title,
        html_escape(&obs.situation),
        html_escape(&obs.behavior),
        html_escape(&obs.impact)
    )
}

fn feedback_block(fb: &FeedbackRecord) -> String {
    let mut out = String::new();
    out.push_str("<article class=\"feedback-entry\">\n");
    out.push_str(&format!(
        "<h3>Feedback {}</h3>\n",
        fb.created_at.format("%Y-%m-%d %H:%M")
    ));
    out.push_str(&sbi("Positive", &fb.positive));
    out.push_str(&sbi("Needs improvement", &fb.negative));
    out.push_str("<dl>\n");
    for (label, value) in [
        ("SMART goal", &fb.smart_goal),
        ("Support", &fb.support),
        ("Next steps", &fb.next_steps),
        ("Overall", &fb.overall),
    ] {
        out.push_str(&format!("<dt>{label}</dt><dd>{}</dd>\n", html_escape(value)));
    }
    out.push_str("</dl>\n</article>\n");
    out
}

/// Generate the listing page across all sessions.
pub fn generate_listing_html(listing: &SessionListing) -> String {
    let mut html = String::new();

    push_head(&mut html, &format!("QM sessions: {}", listing.protocol_name));

    html.push_str("<header>\n");
    html.push_str("<h1>QM sessions</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">Protocol: <strong>{}</strong> | {} sessions | max {} points, pass at {} | generated {}</p>\n",
        html_escape(&listing.protocol_name),
        listing.sessions.len(),
        listing.max_points,
        listing.pass_threshold,
        listing.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));
    html.push_str("</header>\n");

    html.push_str(&summary_section(&listing.summary, listing.max_points));

    html.push_str("<section class=\"results\">\n");
    html.push_str("<h2>Sessions</h2>\n");
    html.push_str("<table class=\"results-table\" id=\"results\">\n");
    html.push_str("<thead><tr><th onclick=\"sortTable(0)\">#</th><th onclick=\"sortTable(1)\">Start</th><th onclick=\"sortTable(2)\">Disponent</th><th onclick=\"sortTable(3)\">Trainer</th><th onclick=\"sortTable(4)\">Duration</th><th onclick=\"sortTable(5)\">Score</th><th onclick=\"sortTable(6)\">Result</th><th onclick=\"sortTable(7)\">Source</th><th onclick=\"sortTable(8)\">Feedback</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for row in &listing.sessions {
        let (class, text) = verdict(row.evaluation.passed);
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{} / {}</td><td class=\"{}\">{}</td><td>{}</td><td>{}</td></tr>\n",
            row.id,
            row.start_time.format("%Y-%m-%d %H:%M"),
            html_escape(&row.disponent),
            html_escape(&row.trainer),
            format_secs(row.total_secs),
            row.evaluation.score,
            row.evaluation.max_points,
            class,
            text,
            row.source,
            row.feedback_count
        ));
    }
    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

fn summary_section(summary: &SessionSummary, max_points: u32) -> String {
    let mut out = String::new();
    out.push_str("<section class=\"dashboard\">\n");
    out.push_str("<h2>Summary</h2>\n");
    out.push_str("<table class=\"summary\">\n<tbody>\n");
    out.push_str(&format!(
        "<tr><th>Sessions</th><td>{}</td></tr>\n",
        summary.count
    ));
    out.push_str(&format!(
        "<tr><th>Average duration</th><td>{} ({} s)</td></tr>\n",
        format_secs(summary.average_total_secs),
        summary.average_total_secs
    ));
    out.push_str(&format!(
        "<tr><th>Average score</th><td>{} / {}</td></tr>\n",
        summary.average_score, max_points
    ));
    out.push_str(&format!(
        "<tr><th>Passed</th><td>{} of {}</td></tr>\n",
        summary.passed_count, summary.count
    ));
    out.push_str("</tbody></table>\n");

    if !summary.per_step.is_empty() {
        out.push_str("<table class=\"results-table\">\n");
        out.push_str("<thead><tr><th>Step</th><th>OK</th><th>Zu langsam</th><th>Fehlt</th><th>Avg time</th></tr></thead>\n<tbody>\n");
        for step in &summary.per_step {
            let avg = step
                .average_cumulative_secs
                .map(|s| format!("{s} s"))
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&format!(
                "<tr><td>{}</td><td class=\"ok\">{}</td><td class=\"slow\">{}</td><td class=\"missing\">{}</td><td>{}</td></tr>\n",
                html_escape(&step.name),
                step.ok,
                step.too_slow,
                step.missing,
                avg
            ));
        }
        out.push_str("</tbody></table>\n");
    }
    out.push_str("</section>\n");
    out
}

/// Write a session report to a file.
pub fn write_html_report(report: &SessionReport, path: &Path) -> Result<()> {
    write_page(&generate_html(report), path)
}

/// Write the session listing to a file.
pub fn write_listing_html(listing: &SessionListing, path: &Path) -> Result<()> {
    write_page(&generate_listing_html(listing), path)
}

fn write_page(html: &str, path: &Path) -> Result<()> {
    let write = || -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, html)?;
        Ok(())
    };
    write().with_context(|| format!("report generation failed: {}", path.display()))
}

/// Horizontal bars of cumulative time per step, with a tick at each deadline.
fn generate_step_chart(steps: &[StepResult]) -> String {
    let bar_height = 22;
    let max_width = 400;
    let padding = 8;
    let label_width = 360;

    let scale_max = steps
        .iter()
        .flat_map(|s| [s.cumulative_secs, s.threshold_secs])
        .flatten()
        .max()
        .unwrap_or(0)
        .max(1);
    let scaled = |secs: u32| (u64::from(secs) * max_width as u64 / u64::from(scale_max)) as usize;

    let total_height = steps.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 80,
        total_height
    );

    for (i, step) in steps.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let width = step.cumulative_secs.map(scaled).unwrap_or(0);

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(&step.name)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"3\"/>\n",
            label_width,
            y,
            width,
            bar_height,
            status_color(step.status)
        ));
        if let Some(threshold) = step.threshold_secs {
            let x = label_width + scaled(threshold);
            svg.push_str(&format!(
                "  <line x1=\"{x}\" y1=\"{}\" x2=\"{x}\" y2=\"{}\" stroke=\"currentColor\" stroke-width=\"2\"/>\n",
                y,
                y + bar_height
            ));
        }
        let label = match step.cumulative_secs {
            Some(secs) => format!("{secs} s"),
            None => step.status.label().to_string(),
        };
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{}</text>\n",
            label_width + width.max(scaled(step.threshold_secs.unwrap_or(0))) + 8,
            y + bar_height / 2,
            label
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --ok: #dcfce7; --slow: #fef9c3; --missing: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --ok: #064e3b; --slow: #713f12; --missing: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); }
#results th { cursor: pointer; }
.ok, .pass { background: var(--ok); }
.slow { background: var(--slow); }
.missing, .fail { background: var(--missing); }
.feedback-entry { border: 1px solid var(--border); border-radius: 8px; padding: 0 1rem 1rem; margin: 1rem 0; }
dt { font-weight: bold; margin-top: 0.5rem; }
dd { margin-left: 1rem; }
svg { margin: 1rem 0; }
"#;

const JS: &str = r#"
function sortTable(col) {
  const table = document.getElementById('results');
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    return asc ? va.localeCompare(vb, undefined, {numeric: true}) : vb.localeCompare(va, undefined, {numeric: true});
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use qmtrainer_core::feedback::{FeedbackForm, FeedbackRecord};
    use qmtrainer_core::model::{ManualEntry, NewSession, Session};
    use qmtrainer_core::protocol::Protocol;

    fn make_session() -> Session {
        let entry = ManualEntry::new("Disponent <A>")
            .with_time("Anrufannahme", "8")
            .with_time("Erkennen Bewusstloser Patient", "200")
            .with_time("Anleitung Reanimation durch CSNA", "250");
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        let mut session =
            NewSession::from_manual_entry(&Protocol::reference(), "mueller", &entry, start)
                .unwrap()
                .into_session(3);
        let form = FeedbackForm {
            pos_situation: "Anrufannahme".into(),
            pos_behavior: "Ruhig".into(),
            pos_impact: "Vertrauen".into(),
            neg_situation: "Anleitung".into(),
            neg_behavior: "Zu spät".into(),
            neg_impact: "Zeitverlust".into(),
            smart_goal: "Ziel".into(),
            support: "Coaching".into(),
            next_steps: "Wiederholen".into(),
            overall: "Gut & solide".into(),
        };
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 10, 5, 42).unwrap();
        session
            .feedback
            .push(FeedbackRecord::new(form, created).unwrap());
        session
    }

    fn make_report() -> SessionReport {
        SessionReport::project(&make_session(), &Protocol::reference()).unwrap()
    }

    #[test]
    fn format_secs_pads_seconds() {
        assert_eq!(format_secs(0), "0:00");
        assert_eq!(format_secs(65), "1:05");
        assert_eq!(format_secs(-5), "-0:05");
    }

    #[test]
    fn html_report_contains_required_elements() {
        let html = generate_html(&make_report());

        assert!(html.contains("<html"));
        assert!(html.contains("</html>"));
        assert!(html.contains("Disponent &lt;A&gt;"));
        assert!(!html.contains("Disponent <A>"));
        assert!(html.contains("mueller"));
        assert!(html.contains("Anrufannahme"));
        assert!(html.contains("<svg"));
        assert!(html.contains("Nicht bestanden"));
    }

    #[test]
    fn html_report_shows_status_labels() {
        let html = generate_html(&make_report());
        assert!(html.contains("class=\"ok\">OK<"));
        assert!(html.contains("class=\"slow\">Zu langsam<"));
        assert!(html.contains("class=\"missing\">Fehlt<"));
    }

    #[test]
    fn html_report_formats_feedback_timestamp() {
        let html = generate_html(&make_report());
        assert!(html.contains("Feedback 2025-03-01 10:05"));
        assert!(html.contains("Gut &amp; solide"));
    }

    #[test]
    fn listing_contains_sessions_and_summary() {
        let listing = SessionListing::build(&Protocol::reference(), &[make_session()]).unwrap();
        let html = generate_listing_html(&listing);
        assert!(html.contains("QM sessions"));
        assert!(html.contains("Disponent &lt;A&gt;"));
        assert!(html.contains("2025-03-01 09:30"));
        assert!(html.contains("Average score"));
        assert!(html.contains("sortTable"));
    }

    #[test]
    fn empty_listing_renders() {
        let listing = SessionListing::build(&Protocol::reference(), &[]).unwrap();
        let html = generate_listing_html(&listing);
        assert!(html.contains("0 sessions"));
    }

    #[test]
    fn html_report_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.html");

        write_html_report(&make_report(), &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<html"));
    }

    #[test]
    fn write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let err = write_html_report(&make_report(), &blocker.join("report.html")).unwrap_err();
        assert!(format!("{err:#}").starts_with("report generation failed"));
    }
}
