//! The `qmtrainer protocol` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use qmtrainer_core::parser::{parse_protocol, protocol_to_toml, validate_protocol};

use super::Context;

pub fn execute(ctx: &Context, file: Option<PathBuf>, format: String) -> Result<()> {
    let protocol = match &file {
        Some(path) => parse_protocol(path)?,
        None => ctx.protocol()?,
    };

    if format == "toml" {
        print!("{}", protocol_to_toml(&protocol)?);
        return Ok(());
    }

    println!(
        "Protocol: {} ({} steps, max {} points, pass at {})",
        protocol.name,
        protocol.len(),
        protocol.max_points(),
        protocol.pass_threshold()
    );

    let mut table = Table::new();
    table.set_header(vec!["#", "Step", "Points", "Deadline"]);
    for (i, step) in protocol.steps().iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&step.name),
            Cell::new(step.max_points),
            Cell::new(
                step.threshold_secs
                    .map(|s| format!("{s} s"))
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }
    println!("{table}");

    let warnings = validate_protocol(&protocol);
    for w in &warnings {
        let prefix = w
            .step
            .as_ref()
            .map(|name| format!("  [{name}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }
    if warnings.is_empty() {
        println!("Protocol valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
