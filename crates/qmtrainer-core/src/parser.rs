//! Input parsing: entered seconds and TOML protocol files.
//!
//! Loads protocol tables from TOML files and validates them.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::protocol::{Protocol, StepDefinition, ThresholdEdge, PASS_THRESHOLD, START_MARKER};

/// Parse an entered number of seconds.
///
/// Blank, non-numeric, fractional, or negative text yields `None`, which the
/// engine treats as a missing time.
pub fn parse_seconds(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<u32>().ok()
}

/// Intermediate TOML structure for protocol files.
#[derive(Debug, Serialize, Deserialize)]
struct TomlProtocolFile {
    protocol: TomlProtocolHeader,
    #[serde(default)]
    steps: Vec<StepDefinition>,
    #[serde(default)]
    thresholds: Vec<ThresholdEdge>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TomlProtocolHeader {
    name: String,
    #[serde(default = "default_start_marker")]
    start_marker: String,
    #[serde(default = "default_pass_threshold")]
    pass_threshold: u32,
}

fn default_start_marker() -> String {
    START_MARKER.to_string()
}

fn default_pass_threshold() -> u32 {
    PASS_THRESHOLD
}

/// Parse a protocol TOML file.
pub fn parse_protocol(path: &Path) -> Result<Protocol> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read protocol file: {}", path.display()))?;

    parse_protocol_str(&content, path)
}

/// Parse a protocol from a TOML string (useful for testing).
pub fn parse_protocol_str(content: &str, source_path: &Path) -> Result<Protocol> {
    let parsed: TomlProtocolFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let protocol = Protocol::from_edges(
        parsed.protocol.name,
        parsed.protocol.start_marker,
        parsed.steps,
        &parsed.thresholds,
        parsed.protocol.pass_threshold,
    )
    .with_context(|| format!("invalid protocol: {}", source_path.display()))?;

    Ok(protocol)
}

/// Render a protocol back to the TOML file format.
pub fn protocol_to_toml(protocol: &Protocol) -> Result<String> {
    let file = TomlProtocolFile {
        protocol: TomlProtocolHeader {
            name: protocol.name.clone(),
            start_marker: protocol.start_marker.clone(),
            pass_threshold: protocol.pass_threshold(),
        },
        steps: protocol
            .steps()
            .iter()
            .map(|s| StepDefinition {
                name: s.name.clone(),
                max_points: s.max_points,
            })
            .collect(),
        thresholds: protocol.edges(),
    };
    toml::to_string_pretty(&file)
        .with_context(|| format!("failed to render protocol '{}' as TOML", protocol.name))
}

/// A warning from protocol validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The step name (if applicable).
    pub step: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Check a protocol for tables that are valid but probably not intended.
pub fn validate_protocol(protocol: &Protocol) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if protocol.pass_threshold() > protocol.max_points() {
        warnings.push(ValidationWarning {
            step: None,
            message: format!(
                "pass threshold {} exceeds the maximum of {} points; nobody can pass",
                protocol.pass_threshold(),
                protocol.max_points()
            ),
        });
    }

    for step in protocol.steps() {
        if step.max_points == 0 {
            warnings.push(ValidationWarning {
                step: Some(step.name.clone()),
                message: "step awards no points".into(),
            });
        }
    }

    for step in protocol.steps().iter().skip(1) {
        if step.threshold_secs.is_none() {
            warnings.push(ValidationWarning {
                step: Some(step.name.clone()),
                message: "step has no deadline and always counts as on time".into(),
            });
        }
    }

    warnings
}
