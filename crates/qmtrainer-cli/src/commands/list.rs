//! The `qmtrainer list` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use qmtrainer_core::report::SessionListing;
use qmtrainer_report::html::write_listing_html;

use super::Context;

pub async fn execute(
    ctx: &Context,
    disponent: Option<String>,
    format: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let protocol = ctx.protocol()?;
    let store = ctx.store().await?;

    let mut sessions = store.list_sessions().await?;
    if let Some(name) = &disponent {
        sessions.retain(|s| same_disponent(&s.disponent, name));
    }
    let listing = SessionListing::build(&protocol, &sessions)?;

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        "html" => {
            let path = output.unwrap_or_else(|| PathBuf::from("qmtrainer-sessions.html"));
            write_listing_html(&listing, &path)?;
            eprintln!("HTML listing: {}", path.display());
        }
        _ => print_listing(&listing),
    }

    Ok(())
}

/// Case-insensitive name match, including non-ASCII letters.
fn same_disponent(stored: &str, filter: &str) -> bool {
    stored.trim().to_lowercase() == filter.trim().to_lowercase()
}

fn print_listing(listing: &SessionListing) {
    if listing.sessions.is_empty() {
        println!("No sessions recorded.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "#", "Start", "Disponent", "Trainer", "Duration", "Score", "Result", "Source", "Feedback",
    ]);
    for row in &listing.sessions {
        table.add_row(vec![
            Cell::new(row.id),
            Cell::new(row.start_time.format("%Y-%m-%d %H:%M")),
            Cell::new(&row.disponent),
            Cell::new(&row.trainer),
            Cell::new(format!("{} s", row.total_secs)),
            Cell::new(format!("{}/{}", row.evaluation.score, row.evaluation.max_points)),
            Cell::new(if row.evaluation.passed { "passed" } else { "failed" }),
            Cell::new(row.source),
            Cell::new(row.feedback_count),
        ]);
    }
    println!("{table}");

    let summary = &listing.summary;
    println!(
        "{} session(s) | average duration {} s | average score {}/{} | {} passed",
        summary.count,
        summary.average_total_secs,
        summary.average_score,
        listing.max_points,
        summary.passed_count
    );
}
