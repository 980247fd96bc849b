//! The `qmtrainer report` command.

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use qmtrainer_core::model::SessionId;
use qmtrainer_core::report::SessionReport;
use qmtrainer_report::html::write_html_report;

use super::{require_session, Context};

pub async fn execute(
    ctx: &Context,
    id: SessionId,
    format: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let protocol = ctx.protocol()?;
    let store = ctx.store().await?;
    let session = require_session(store.as_ref(), id).await?;
    let report = SessionReport::project(&session, &protocol)?;

    let stem = format!("qm-report-{id}");
    match format.as_str() {
        "json" => {
            let path = output.unwrap_or_else(|| PathBuf::from(format!("{stem}.json")));
            report
                .save_json(&path)
                .context("report generation failed")?;
            eprintln!("JSON report: {}", path.display());
        }
        "html" => {
            let path = output.unwrap_or_else(|| PathBuf::from(format!("{stem}.html")));
            write_html_report(&report, &path)?;
            eprintln!("HTML report: {}", path.display());
        }
        other => anyhow::bail!("unknown report format: {other} (expected html or json)"),
    }

    Ok(())
}
