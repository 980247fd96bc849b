//! Session data model.
//!
//! A session is one completed training attempt: who trained whom, when, and
//! the evaluated result of every protocol step. Sessions are created in one
//! step from either a live stopwatch submission or a manual re-entry, and are
//! never edited afterwards except by appending feedback.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{evaluate, Evaluation, RawStep, StepResult};
use crate::error::EvaluationError;
use crate::feedback::FeedbackRecord;
use crate::parser::parse_seconds;
use crate::protocol::Protocol;

/// Store-assigned session identifier.
pub type SessionId = u64;

/// How the step timings of a session were captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSource {
    /// Captured with the live stopwatch during the training.
    Live,
    /// Typed in after the fact.
    ManualEntry,
}

impl fmt::Display for SessionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionSource::Live => write!(f, "live"),
            SessionSource::ManualEntry => write!(f, "manual"),
        }
    }
}

/// A stopwatch submission as sent by the live training page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveSubmission {
    pub disponent: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Elapsed seconds as measured by the client.
    #[serde(default)]
    pub total: Option<i64>,
    pub steps: Vec<LiveStep>,
}

/// One step of a live submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStep {
    pub name: String,
    #[serde(default)]
    pub cumulative: Option<u32>,
    /// Client-side interval; recomputed by the engine and otherwise ignored.
    #[serde(default)]
    pub interval: Option<i64>,
    #[serde(default)]
    pub out_of_order: bool,
}

/// A manual re-entry: raw text per step name, as typed into the form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualEntry {
    pub disponent: String,
    /// Step name to entered seconds. Steps absent here are missing.
    #[serde(default)]
    pub times: BTreeMap<String, String>,
}

impl ManualEntry {
    pub fn new(disponent: impl Into<String>) -> Self {
        Self {
            disponent: disponent.into(),
            times: BTreeMap::new(),
        }
    }

    /// Builder form of [`ManualEntry::insert_time`]. A repeated step keeps the
    /// last value and logs a warning.
    pub fn with_time(mut self, step: impl Into<String>, raw: impl Into<String>) -> Self {
        let step = step.into();
        if let Some(previous) = self.times.insert(step.clone(), raw.into()) {
            tracing::warn!(step = %step, previous = %previous, "step time entered twice, keeping the last value");
        }
        self
    }

    /// Record the entered text for one step. Each step may be entered once.
    pub fn insert_time(
        &mut self,
        step: impl Into<String>,
        raw: impl Into<String>,
    ) -> Result<(), EvaluationError> {
        let step = step.into();
        if self.times.contains_key(&step) {
            return Err(EvaluationError::DuplicateTime(step));
        }
        self.times.insert(step, raw.into());
        Ok(())
    }

    /// Lay the entered times out in protocol order. Unparseable text becomes
    /// a missing time; unknown step names are rejected.
    pub fn raw_steps(&self, protocol: &Protocol) -> Result<Vec<RawStep>, EvaluationError> {
        if let Some(unknown) = self.times.keys().find(|k| protocol.step(k).is_none()) {
            return Err(EvaluationError::UnknownStep(unknown.clone()));
        }
        Ok(protocol
            .steps()
            .iter()
            .map(|step| {
                let secs = self.times.get(&step.name).and_then(|raw| parse_seconds(raw));
                RawStep::new(step.name.clone(), secs)
            })
            .collect())
    }
}

/// An evaluated session that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSession {
    pub trainer: String,
    pub disponent: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_secs: i64,
    pub source: SessionSource,
    pub evaluation: Evaluation,
}

impl NewSession {
    /// Evaluate a live stopwatch submission.
    pub fn from_live(
        protocol: &Protocol,
        trainer: &str,
        submission: LiveSubmission,
    ) -> Result<Self, EvaluationError> {
        let disponent = checked_disponent(&submission.disponent)?;
        let total_secs = (submission.end - submission.start).num_seconds();
        if total_secs < 0 {
            return Err(EvaluationError::NegativeDuration { total_secs });
        }
        if let Some(client_total) = submission.total {
            if client_total != total_secs {
                tracing::warn!(
                    client_total,
                    total_secs,
                    "submitted total differs from end - start, using end - start"
                );
            }
        }

        let raw: Vec<RawStep> = submission
            .steps
            .into_iter()
            .map(|s| RawStep {
                name: s.name,
                cumulative_secs: s.cumulative,
                out_of_order: s.out_of_order,
            })
            .collect();
        let evaluation = evaluate(protocol, &raw)?;

        Ok(Self {
            trainer: trainer.to_string(),
            disponent,
            start_time: submission.start,
            end_time: submission.end,
            total_secs,
            source: SessionSource::Live,
            evaluation,
        })
    }

    /// Evaluate a manual re-entry. The session is taken to start at `now` and
    /// to last until the last recorded step.
    pub fn from_manual_entry(
        protocol: &Protocol,
        trainer: &str,
        entry: &ManualEntry,
        now: DateTime<Utc>,
    ) -> Result<Self, EvaluationError> {
        let disponent = checked_disponent(&entry.disponent)?;
        let raw = entry.raw_steps(protocol)?;
        let evaluation = evaluate(protocol, &raw)?;
        let total_secs = i64::from(evaluation.last_recorded_secs());

        Ok(Self {
            trainer: trainer.to_string(),
            disponent,
            start_time: now,
            end_time: now + Duration::seconds(total_secs),
            total_secs,
            source: SessionSource::ManualEntry,
            evaluation,
        })
    }

    /// Attach the store-assigned id.
    pub fn into_session(self, id: SessionId) -> Session {
        Session {
            id,
            trainer: self.trainer,
            disponent: self.disponent,
            start_time: self.start_time,
            end_time: self.end_time,
            total_secs: self.total_secs,
            source: self.source,
            score: self.evaluation.score,
            passed: self.evaluation.passed,
            steps: self.evaluation.steps,
            feedback: Vec::new(),
        }
    }
}

fn checked_disponent(raw: &str) -> Result<String, EvaluationError> {
    let disponent = raw.trim();
    if disponent.is_empty() {
        return Err(EvaluationError::EmptyDisponent);
    }
    Ok(disponent.to_string())
}

/// A stored training session with its step results and feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub trainer: String,
    pub disponent: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_secs: i64,
    pub source: SessionSource,
    /// One entry per protocol step, in protocol order.
    pub steps: Vec<StepResult>,
    /// Score at creation time.
    pub score: u32,
    /// Verdict at creation time.
    pub passed: bool,
    #[serde(default)]
    pub feedback: Vec<FeedbackRecord>,
}

impl Session {
    /// The stored timings, ready to be evaluated again.
    pub fn raw_steps(&self) -> Vec<RawStep> {
        self.steps
            .iter()
            .map(|s| RawStep {
                name: s.name.clone(),
                cumulative_secs: s.cumulative_secs,
                out_of_order: s.out_of_order,
            })
            .collect()
    }

    /// Re-derive the evaluation from the stored timings.
    pub fn evaluate(&self, protocol: &Protocol) -> Result<Evaluation, EvaluationError> {
        evaluate(protocol, &self.raw_steps())
    }

    pub fn feedback(&self, id: Uuid) -> Option<&FeedbackRecord> {
        self.feedback.iter().find(|f| f.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StepStatus;
    use crate::feedback::sample_form;
    use chrono::TimeZone;

    fn live_submission(cumulative: &[Option<u32>]) -> LiveSubmission {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        LiveSubmission {
            disponent: "D-17".into(),
            start,
            end: start + Duration::seconds(300),
            total: Some(300),
            steps: Protocol::reference()
                .steps()
                .iter()
                .zip(cumulative)
                .map(|(s, c)| LiveStep {
                    name: s.name.clone(),
                    cumulative: *c,
                    interval: None,
                    out_of_order: false,
                })
                .collect(),
        }
    }

    #[test]
    fn live_submission_is_evaluated() {
        let mut times = vec![None; 10];
        times[0] = Some(8);
        times[1] = Some(40);
        let session =
            NewSession::from_live(&Protocol::reference(), "trainer1", live_submission(&times))
                .unwrap();
        assert_eq!(session.total_secs, 300);
        assert_eq!(session.source, SessionSource::Live);
        assert_eq!(session.evaluation.score, 7);
        assert_eq!(session.evaluation.steps[1].interval_secs, Some(32));
    }

    #[test]
    fn live_submission_rejects_negative_duration() {
        let mut submission = live_submission(&[None; 10]);
        submission.end = submission.start - Duration::seconds(5);
        let err = NewSession::from_live(&Protocol::reference(), "t", submission).unwrap_err();
        assert_eq!(err, EvaluationError::NegativeDuration { total_secs: -5 });
    }

    #[test]
    fn live_submission_with_missing_steps_is_rejected() {
        let mut submission = live_submission(&[None; 10]);
        submission.steps.pop();
        let err = NewSession::from_live(&Protocol::reference(), "t", submission).unwrap_err();
        assert!(matches!(err, EvaluationError::StepCountMismatch { .. }));
    }

    #[test]
    fn live_submission_parses_frontend_json() {
        let json = r#"{
            "disponent": "Max",
            "start": "2025-03-01T10:00:00Z",
            "end": "2025-03-01T10:04:10Z",
            "total": 250,
            "steps": [{"name": "Anrufannahme", "cumulative": 7, "interval": 7, "outOfOrder": true}]
        }"#;
        let submission: LiveSubmission = serde_json::from_str(json).unwrap();
        assert_eq!(submission.steps[0].cumulative, Some(7));
        assert!(submission.steps[0].out_of_order);
        assert_eq!((submission.end - submission.start).num_seconds(), 250);
    }

    #[test]
    fn manual_entry_treats_garbage_as_missing() {
        let protocol = Protocol::reference();
        let entry = ManualEntry::new("Erika")
            .with_time("Anrufannahme", "8")
            .with_time("Erkennen Bewusstloser Patient", "abc")
            .with_time("Metronom", "");
        let raw = entry.raw_steps(&protocol).unwrap();
        assert_eq!(raw.len(), 10);
        assert_eq!(raw[0].cumulative_secs, Some(8));
        assert_eq!(raw[1].cumulative_secs, None);
        assert_eq!(raw[8].cumulative_secs, None);
        assert!(raw.iter().all(|r| !r.out_of_order));
    }

    #[test]
    fn manual_entry_rejects_repeated_step() {
        let mut entry = ManualEntry::new("A");
        entry.insert_time("Anrufannahme", "8").unwrap();
        let err = entry.insert_time("Anrufannahme", "30").unwrap_err();
        assert_eq!(err, EvaluationError::DuplicateTime("Anrufannahme".into()));
        assert_eq!(entry.times["Anrufannahme"], "8");
    }

    #[test]
    fn builder_keeps_last_repeated_time() {
        let entry = ManualEntry::new("A")
            .with_time("Anrufannahme", "8")
            .with_time("Anrufannahme", "30");
        assert_eq!(entry.times.len(), 1);
        assert_eq!(entry.times["Anrufannahme"], "30");
    }

    #[test]
    fn manual_entry_rejects_unknown_step() {
        let entry = ManualEntry::new("Erika").with_time("Kaffee holen", "5");
        let err = entry.raw_steps(&Protocol::reference()).unwrap_err();
        assert_eq!(err, EvaluationError::UnknownStep("Kaffee holen".into()));
    }

    #[test]
    fn manual_entry_duration_follows_last_recorded_step() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let entry = ManualEntry::new("Erika")
            .with_time("Anrufannahme", "8")
            .with_time("Metronom", "240");
        let session =
            NewSession::from_manual_entry(&Protocol::reference(), "t", &entry, now).unwrap();
        assert_eq!(session.total_secs, 240);
        assert_eq!(session.end_time - session.start_time, Duration::seconds(240));
        assert_eq!(session.source, SessionSource::ManualEntry);
        assert_eq!(session.evaluation.steps[8].status, StepStatus::Ok);
    }

    #[test]
    fn blank_disponent_is_rejected() {
        let entry = ManualEntry::new("  ");
        let err = NewSession::from_manual_entry(&Protocol::reference(), "t", &entry, Utc::now())
            .unwrap_err();
        assert_eq!(err, EvaluationError::EmptyDisponent);
    }

    #[test]
    fn stored_session_re_evaluates_identically() {
        let now = Utc::now();
        let entry = ManualEntry::new("Erika")
            .with_time("Anrufannahme", "8")
            .with_time("Erkennen Bewusstloser Patient", "90");
        let protocol = Protocol::reference();
        let new = NewSession::from_manual_entry(&protocol, "t", &entry, now).unwrap();
        let expected = new.evaluation.clone();
        let session = new.into_session(1);
        assert_eq!(session.steps.len(), protocol.len());
        assert_eq!(session.evaluate(&protocol).unwrap(), expected);
        assert_eq!(session.score, 2);
        assert!(!session.passed);
    }

    #[test]
    fn feedback_lookup_by_id() {
        let now = Utc::now();
        let protocol = Protocol::reference();
        let mut session = NewSession::from_manual_entry(&protocol, "t", &ManualEntry::new("E"), now)
            .unwrap()
            .into_session(4);
        let record = FeedbackRecord::new(sample_form(), now).unwrap();
        let id = record.id;
        session.feedback.push(record);
        assert!(session.feedback(id).is_some());
        assert!(session.feedback(Uuid::new_v4()).is_none());
    }
}
