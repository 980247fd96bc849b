//! Structured feedback attached to a training session.
//!
//! Feedback follows the SBI model (situation, behavior, impact) for one
//! positive and one negative observation, plus a SMART development goal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EvaluationError;

/// One situation–behavior–impact observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SbiObservation {
    pub situation: String,
    pub behavior: String,
    pub impact: String,
}

/// The ten free-text fields of a feedback conversation, as entered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackForm {
    pub pos_situation: String,
    pub pos_behavior: String,
    pub pos_impact: String,
    pub neg_situation: String,
    pub neg_behavior: String,
    pub neg_impact: String,
    pub smart_goal: String,
    pub support: String,
    pub next_steps: String,
    pub overall: String,
}

impl FeedbackForm {
    fn fields(&self) -> [(&'static str, &str); 10] {
        [
            ("pos_situation", self.pos_situation.as_str()),
            ("pos_behavior", self.pos_behavior.as_str()),
            ("pos_impact", self.pos_impact.as_str()),
            ("neg_situation", self.neg_situation.as_str()),
            ("neg_behavior", self.neg_behavior.as_str()),
            ("neg_impact", self.neg_impact.as_str()),
            ("smart_goal", self.smart_goal.as_str()),
            ("support", self.support.as_str()),
            ("next_steps", self.next_steps.as_str()),
            ("overall", self.overall.as_str()),
        ]
    }

    /// Check that every field is filled in.
    pub fn validate(&self) -> Result<(), EvaluationError> {
        match self.fields().into_iter().find(|(_, v)| v.trim().is_empty()) {
            Some((name, _)) => Err(EvaluationError::EmptyFeedbackField(name)),
            None => Ok(()),
        }
    }
}

/// A stored, immutable feedback entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub positive: SbiObservation,
    pub negative: SbiObservation,
    pub smart_goal: String,
    pub support: String,
    pub next_steps: String,
    pub overall: String,
}

impl FeedbackRecord {
    /// Create a feedback entry from a completed form.
    pub fn new(form: FeedbackForm, created_at: DateTime<Utc>) -> Result<Self, EvaluationError> {
        form.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            created_at,
            positive: SbiObservation {
                situation: form.pos_situation,
                behavior: form.pos_behavior,
                impact: form.pos_impact,
            },
            negative: SbiObservation {
                situation: form.neg_situation,
                behavior: form.neg_behavior,
                impact: form.neg_impact,
            },
            smart_goal: form.smart_goal,
            support: form.support,
            next_steps: form.next_steps,
            overall: form.overall,
        })
    }
}

#[cfg(test)]
pub(crate) fn sample_form() -> FeedbackForm {
    FeedbackForm {
        pos_situation: "Anrufannahme".into(),
        pos_behavior: "Ruhige, klare Fragen".into(),
        pos_impact: "Anrufer blieb kooperativ".into(),
        neg_situation: "Anleitung".into(),
        neg_behavior: "Metronom spät gestartet".into(),
        neg_impact: "Drucktiefe ungleichmäßig".into(),
        smart_goal: "Metronom innerhalb 4 Minuten starten".into(),
        support: "Simulation wiederholen".into(),
        next_steps: "Nächstes Training in 2 Wochen".into(),
        overall: "Solide Leistung".into(),
    }
}
