//! Read-side projections of stored sessions, with JSON persistence.
//!
//! Listings and reports never trust the points cached on a stored session;
//! they re-run the evaluation engine on the stored timings.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::Evaluation;
use crate::error::EvaluationError;
use crate::feedback::FeedbackRecord;
use crate::model::{Session, SessionId, SessionSource};
use crate::protocol::Protocol;
use crate::statistics::{summarize, SessionSummary};
use crate::traits::newest_first;

/// One line of the session listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: SessionId,
    pub trainer: String,
    pub disponent: String,
    pub start_time: DateTime<Utc>,
    pub total_secs: i64,
    pub source: SessionSource,
    pub evaluation: Evaluation,
    pub feedback_count: usize,
}

impl SessionRow {
    pub fn project(session: &Session, protocol: &Protocol) -> Result<Self, EvaluationError> {
        Ok(Self {
            id: session.id,
            trainer: session.trainer.clone(),
            disponent: session.disponent.clone(),
            start_time: session.start_time,
            total_secs: session.total_secs,
            source: session.source,
            evaluation: reevaluate(session, protocol)?,
            feedback_count: session.feedback.len(),
        })
    }
}

/// All sessions, newest first, with the cross-session summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionListing {
    pub generated_at: DateTime<Utc>,
    pub protocol_name: String,
    pub max_points: u32,
    pub pass_threshold: u32,
    pub sessions: Vec<SessionRow>,
    pub summary: SessionSummary,
}

impl SessionListing {
    pub fn build(protocol: &Protocol, sessions: &[Session]) -> Result<Self, EvaluationError> {
        let mut rows = sessions
            .iter()
            .map(|s| SessionRow::project(s, protocol))
            .collect::<Result<Vec<_>, _>>()?;
        rows.sort_by(|a, b| newest_first((a.start_time, a.id), (b.start_time, b.id)));
        let summary = summarize(&rows);

        Ok(Self {
            generated_at: Utc::now(),
            protocol_name: protocol.name.clone(),
            max_points: protocol.max_points(),
            pass_threshold: protocol.pass_threshold(),
            sessions: rows,
            summary,
        })
    }
}

/// Everything a rendered report of one session shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub generated_at: DateTime<Utc>,
    pub protocol_name: String,
    pub session_id: SessionId,
    pub trainer: String,
    pub disponent: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_secs: i64,
    pub source: SessionSource,
    pub evaluation: Evaluation,
    pub feedback: Vec<FeedbackRecord>,
}

impl SessionReport {
    /// Project a stored session into report form.
    pub fn project(session: &Session, protocol: &Protocol) -> Result<Self, EvaluationError> {
        Ok(Self {
            generated_at: Utc::now(),
            protocol_name: protocol.name.clone(),
            session_id: session.id,
            trainer: session.trainer.clone(),
            disponent: session.disponent.clone(),
            start_time: session.start_time,
            end_time: session.end_time,
            total_secs: session.total_secs,
            source: session.source,
            evaluation: reevaluate(session, protocol)?,
            feedback: session.feedback.clone(),
        })
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: SessionReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }
}

fn reevaluate(session: &Session, protocol: &Protocol) -> Result<Evaluation, EvaluationError> {
    let evaluation = session.evaluate(protocol)?;
    if evaluation.score != session.score {
        tracing::warn!(
            session = session.id,
            stored = session.score,
            current = evaluation.score,
            "stored score differs from re-evaluation"
        );
    }
    Ok(evaluation)
}
