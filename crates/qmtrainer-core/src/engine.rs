//! The evaluation engine.
//!
//! Turns an ordered list of step timings into per-step status, intervals,
//! awarded points, a total score, and a pass/fail verdict. The engine is a
//! pure function of the protocol and the raw steps; every caller (live
//! submission, manual re-entry, listing, report) goes through [`evaluate`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EvaluationError;
use crate::protocol::{Protocol, ProtocolStep};

/// One submitted step timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStep {
    pub name: String,
    /// Seconds from session start; `None` when the step was not recorded.
    pub cumulative_secs: Option<u32>,
    /// Whether the step was captured out of protocol order (live capture only).
    #[serde(default)]
    pub out_of_order: bool,
}

impl RawStep {
    pub fn new(name: impl Into<String>, cumulative_secs: Option<u32>) -> Self {
        Self {
            name: name.into(),
            cumulative_secs,
            out_of_order: false,
        }
    }
}

/// Outcome of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepStatus {
    Ok,
    TooSlow,
    Missing,
}

impl StepStatus {
    /// The label shown to trainers.
    pub fn label(self) -> &'static str {
        match self {
            StepStatus::Ok => "OK",
            StepStatus::TooSlow => "Zu langsam",
            StepStatus::Missing => "Fehlt",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The evaluated result for one protocol step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,
    pub cumulative_secs: Option<u32>,
    /// Seconds since the previous recorded step. Negative when a later step
    /// reports an earlier time than the one before it.
    pub interval_secs: Option<i64>,
    pub threshold_secs: Option<u32>,
    pub status: StepStatus,
    pub max_points: u32,
    pub awarded_points: u32,
    /// Decay steps for overshooting the deadline; computed but not applied.
    pub deduction_steps: u32,
    #[serde(default)]
    pub out_of_order: bool,
}

/// The canonical evaluation of a full set of step timings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub steps: Vec<StepResult>,
    pub score: u32,
    pub max_points: u32,
    pub pass_threshold: u32,
    pub passed: bool,
}

impl Evaluation {
    /// The last recorded cumulative time, i.e. the running baseline after the
    /// final step. Zero when nothing was recorded.
    pub fn last_recorded_secs(&self) -> u32 {
        self.steps
            .iter()
            .rev()
            .find_map(|s| s.cumulative_secs)
            .unwrap_or(0)
    }

    pub fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }
}

/// Evaluate raw step timings against a protocol.
///
/// `raw_steps` must hold exactly one entry per protocol step, in protocol
/// order. Anything else is an integration error and nothing is evaluated.
pub fn evaluate(protocol: &Protocol, raw_steps: &[RawStep]) -> Result<Evaluation, EvaluationError> {
    check_shape(protocol, raw_steps)?;

    let mut prev_cumulative: u32 = 0;
    let mut steps = Vec::with_capacity(raw_steps.len());

    for (def, raw) in protocol.steps().iter().zip(raw_steps) {
        let result = match raw.cumulative_secs {
            None => StepResult {
                name: def.name.clone(),
                cumulative_secs: None,
                interval_secs: None,
                threshold_secs: def.threshold_secs,
                status: StepStatus::Missing,
                max_points: def.max_points,
                awarded_points: 0,
                deduction_steps: 0,
                out_of_order: raw.out_of_order,
            },
            Some(cumulative) => {
                let interval = i64::from(cumulative) - i64::from(prev_cumulative);
                prev_cumulative = cumulative;
                score_recorded_step(def, cumulative, interval, raw.out_of_order)
            }
        };
        steps.push(result);
    }

    let score: u32 = steps.iter().map(|s| s.awarded_points).sum();
    let passed = score >= protocol.pass_threshold();

    tracing::debug!(
        score,
        passed,
        missing = steps.iter().filter(|s| s.status == StepStatus::Missing).count(),
        "evaluated session"
    );

    Ok(Evaluation {
        steps,
        score,
        max_points: protocol.max_points(),
        pass_threshold: protocol.pass_threshold(),
        passed,
    })
}

fn check_shape(protocol: &Protocol, raw_steps: &[RawStep]) -> Result<(), EvaluationError> {
    if raw_steps.len() != protocol.len() {
        return Err(EvaluationError::StepCountMismatch {
            expected: protocol.len(),
            found: raw_steps.len(),
        });
    }
    for (position, (def, raw)) in protocol.steps().iter().zip(raw_steps).enumerate() {
        if def.name != raw.name {
            return Err(EvaluationError::UnexpectedStep {
                position,
                expected: def.name.clone(),
                found: raw.name.clone(),
            });
        }
    }
    Ok(())
}

fn score_recorded_step(
    def: &ProtocolStep,
    cumulative: u32,
    interval: i64,
    out_of_order: bool,
) -> StepResult {
    let status = match def.threshold_secs {
        Some(threshold) if cumulative > threshold => StepStatus::TooSlow,
        _ => StepStatus::Ok,
    };

    let (awarded_points, deduction) = match status {
        StepStatus::Ok => {
            let steps = deduction_steps(cumulative, def.threshold_secs);
            // The floor is the full point value, so the deduction never lands.
            let awarded = def.max_points.saturating_sub(steps).max(def.max_points);
            (awarded, steps)
        }
        _ => (0, 0),
    };

    StepResult {
        name: def.name.clone(),
        cumulative_secs: Some(cumulative),
        interval_secs: Some(interval),
        threshold_secs: def.threshold_secs,
        status,
        max_points: def.max_points,
        awarded_points,
        deduction_steps: deduction,
        out_of_order,
    }
}

/// Number of 10% decay steps the cumulative time overshoots the deadline by.
fn deduction_steps(cumulative: u32, threshold: Option<u32>) -> u32 {
    let threshold = threshold.unwrap_or(0);
    let overshoot = cumulative.saturating_sub(threshold);
    if threshold == 0 {
        return 0;
    }
    let steps = u64::from(overshoot) * 10 / u64::from(threshold);
    u32::try_from(steps).unwrap_or(u32::MAX)
}
