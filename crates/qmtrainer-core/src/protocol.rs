//! The fixed QM protocol: ordered steps, deadlines, and point values.
//!
//! Deadlines are declared as edges between consecutive steps. The edge that
//! terminates at a step carries that step's deadline, measured from the
//! session start (not from the previous step).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Minimum score needed to pass the reference protocol.
pub const PASS_THRESHOLD: u32 = 35;

/// Name of the pseudo-step every session starts from.
pub const START_MARKER: &str = "Start";

/// Reference protocol steps in order, with their maximum points.
pub const REFERENCE_STEPS: &[(&str, u32)] = &[
    ("Anrufannahme", 2),
    ("Erkennen Bewusstloser Patient", 5),
    ("Alarmieren der Rettungsmittel (Rapid Dispatch)", 5),
    ("Erkennen Reanimationspflichtiger Patient", 5),
    ("Assistenz anfordern (Optional)", 2),
    ("Kommunikation mit Rettungsmitteln (Optional durch Disponent 2)", 3),
    ("Anleitung Reanimation eigenständig", 5),
    ("Anleitung Reanimation durch CSNA", 10),
    ("Metronom", 1),
    ("Rückversichern der Geschwindigkeit und Drucktiefe", 3),
];

/// Reference deadlines as `(from, to, seconds since start)`.
pub const REFERENCE_THRESHOLDS: &[(&str, &str, u32)] = &[
    (START_MARKER, "Anrufannahme", 10),
    ("Anrufannahme", "Erkennen Bewusstloser Patient", 60),
    (
        "Erkennen Bewusstloser Patient",
        "Alarmieren der Rettungsmittel (Rapid Dispatch)",
        70,
    ),
    (
        "Alarmieren der Rettungsmittel (Rapid Dispatch)",
        "Erkennen Reanimationspflichtiger Patient",
        120,
    ),
    (
        "Erkennen Reanimationspflichtiger Patient",
        "Assistenz anfordern (Optional)",
        130,
    ),
    (
        "Assistenz anfordern (Optional)",
        "Kommunikation mit Rettungsmitteln (Optional durch Disponent 2)",
        210,
    ),
    (
        "Kommunikation mit Rettungsmitteln (Optional durch Disponent 2)",
        "Anleitung Reanimation eigenständig",
        200,
    ),
    (
        "Anleitung Reanimation eigenständig",
        "Anleitung Reanimation durch CSNA",
        200,
    ),
    ("Anleitung Reanimation durch CSNA", "Metronom", 245),
    (
        "Metronom",
        "Rückversichern der Geschwindigkeit und Drucktiefe",
        280,
    ),
];

/// A step as declared in a protocol table, before deadlines are attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: String,
    pub max_points: u32,
}

/// A deadline edge between two consecutive steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdEdge {
    pub from: String,
    pub to: String,
    pub seconds: u32,
}

/// A protocol step with its resolved deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolStep {
    pub name: String,
    pub max_points: u32,
    /// Deadline in seconds from session start; `None` means no deadline.
    pub threshold_secs: Option<u32>,
}

/// An immutable, ordered QM protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Protocol {
    pub name: String,
    pub start_marker: String,
    steps: Vec<ProtocolStep>,
    pass_threshold: u32,
}

impl Protocol {
    /// Build a protocol from ordered step definitions and a deadline edge list.
    pub fn from_edges(
        name: impl Into<String>,
        start_marker: impl Into<String>,
        steps: Vec<StepDefinition>,
        edges: &[ThresholdEdge],
        pass_threshold: u32,
    ) -> Result<Self, ProtocolError> {
        let start_marker = start_marker.into();
        validate_edges(&start_marker, &steps, edges)?;
        Ok(Self {
            name: name.into(),
            steps: resolve(steps, edges),
            start_marker,
            pass_threshold,
        })
    }

    /// The Telefonreanimation protocol the training program is scored against.
    pub fn reference() -> Self {
        let steps = REFERENCE_STEPS
            .iter()
            .map(|(name, max_points)| StepDefinition {
                name: (*name).to_string(),
                max_points: *max_points,
            })
            .collect();
        let edges: Vec<ThresholdEdge> = REFERENCE_THRESHOLDS
            .iter()
            .map(|(from, to, seconds)| ThresholdEdge {
                from: (*from).to_string(),
                to: (*to).to_string(),
                seconds: *seconds,
            })
            .collect();

        Self {
            name: "Telefonreanimation".to_string(),
            start_marker: START_MARKER.to_string(),
            steps: resolve(steps, &edges),
            pass_threshold: PASS_THRESHOLD,
        }
    }

    /// Replace the pass bar without touching the point scale.
    pub fn with_pass_threshold(mut self, pass_threshold: u32) -> Self {
        self.pass_threshold = pass_threshold;
        self
    }

    pub fn steps(&self) -> &[ProtocolStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, name: &str) -> Option<&ProtocolStep> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Zero-based position of a step in the fixed order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name)
    }

    /// Deadline for a step; `None` for unknown steps and steps without a deadline.
    pub fn threshold(&self, name: &str) -> Option<u32> {
        self.step(name).and_then(|s| s.threshold_secs)
    }

    /// Sum of all step point values (MAX_POINTS).
    pub fn max_points(&self) -> u32 {
        self.steps.iter().map(|s| s.max_points).sum()
    }

    /// Minimum score needed to pass (PASS_THRESHOLD).
    pub fn pass_threshold(&self) -> u32 {
        self.pass_threshold
    }

    /// The deadline table back in edge form.
    pub fn edges(&self) -> Vec<ThresholdEdge> {
        let mut from = self.start_marker.as_str();
        let mut edges = Vec::new();
        for step in &self.steps {
            if let Some(seconds) = step.threshold_secs {
                edges.push(ThresholdEdge {
                    from: from.to_string(),
                    to: step.name.clone(),
                    seconds,
                });
            }
            from = &step.name;
        }
        edges
    }
}

fn validate_edges(
    start_marker: &str,
    steps: &[StepDefinition],
    edges: &[ThresholdEdge],
) -> Result<(), ProtocolError> {
    if steps.is_empty() {
        return Err(ProtocolError::Empty);
    }

    let mut names = HashSet::new();
    for step in steps {
        if !names.insert(step.name.as_str()) {
            return Err(ProtocolError::DuplicateStep(step.name.clone()));
        }
    }

    let mut targeted = HashSet::new();
    for edge in edges {
        let Some(pos) = steps.iter().position(|s| s.name == edge.to) else {
            return Err(ProtocolError::UnknownTarget(edge.to.clone()));
        };
        let expected = if pos == 0 {
            start_marker
        } else {
            steps[pos - 1].name.as_str()
        };
        if edge.from != expected {
            return Err(ProtocolError::NotConsecutive {
                from: edge.from.clone(),
                to: edge.to.clone(),
                expected: expected.to_string(),
            });
        }
        if !targeted.insert(edge.to.as_str()) {
            return Err(ProtocolError::DuplicateEdge(edge.to.clone()));
        }
    }

    Ok(())
}

fn resolve(steps: Vec<StepDefinition>, edges: &[ThresholdEdge]) -> Vec<ProtocolStep> {
    steps
        .into_iter()
        .map(|def| {
            let threshold_secs = edges.iter().find(|e| e.to == def.name).map(|e| e.seconds);
            ProtocolStep {
                name: def.name,
                max_points: def.max_points,
                threshold_secs,
            }
        })
        .collect()
}
