//! The `qmtrainer feedback` commands.

use anyhow::{Context as _, Result};
use chrono::Utc;
use clap::Args;
use uuid::Uuid;

use qmtrainer_core::feedback::{FeedbackForm, FeedbackRecord, SbiObservation};
use qmtrainer_core::model::SessionId;

use super::{require_session, Context};

/// The ten fields of the feedback form. All are required.
#[derive(Args, Debug)]
pub struct FeedbackFields {
    /// Positive observation: situation
    #[arg(long)]
    pub pos_situation: String,
    /// Positive observation: behavior
    #[arg(long)]
    pub pos_behavior: String,
    /// Positive observation: impact
    #[arg(long)]
    pub pos_impact: String,
    /// Improvement area: situation
    #[arg(long)]
    pub neg_situation: String,
    /// Improvement area: behavior
    #[arg(long)]
    pub neg_behavior: String,
    /// Improvement area: impact
    #[arg(long)]
    pub neg_impact: String,
    /// SMART goal
    #[arg(long)]
    pub smart_goal: String,
    /// Support offered
    #[arg(long)]
    pub support: String,
    /// Agreed next steps
    #[arg(long)]
    pub next_steps: String,
    /// Overall assessment
    #[arg(long)]
    pub overall: String,
}

impl From<FeedbackFields> for FeedbackForm {
    fn from(f: FeedbackFields) -> Self {
        FeedbackForm {
            pos_situation: f.pos_situation,
            pos_behavior: f.pos_behavior,
            pos_impact: f.pos_impact,
            neg_situation: f.neg_situation,
            neg_behavior: f.neg_behavior,
            neg_impact: f.neg_impact,
            smart_goal: f.smart_goal,
            support: f.support,
            next_steps: f.next_steps,
            overall: f.overall,
        }
    }
}

pub async fn add(ctx: &Context, id: SessionId, fields: FeedbackFields) -> Result<()> {
    let trainer = ctx.trainer()?;
    let record = FeedbackRecord::new(fields.into(), Utc::now())?;
    let feedback_id = record.id;

    let store = ctx.store().await?;
    store
        .append_feedback(id, record)
        .await
        .with_context(|| format!("failed to add feedback to session {id}"))?;

    tracing::info!(session = id, trainer = %trainer, "feedback recorded");
    println!("Added feedback {feedback_id} to session #{id}");
    Ok(())
}

pub async fn show(ctx: &Context, id: SessionId, feedback_id: Uuid, format: String) -> Result<()> {
    let store = ctx.store().await?;
    let session = require_session(store.as_ref(), id).await?;
    let fb = session
        .feedback(feedback_id)
        .with_context(|| format!("feedback {feedback_id} not found on session {id}"))?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(fb)?);
        return Ok(());
    }

    println!(
        "Feedback for {} (session #{}), {}",
        session.disponent,
        session.id,
        fb.created_at.format("%Y-%m-%d %H:%M")
    );
    print_sbi("Positive", &fb.positive);
    print_sbi("Needs improvement", &fb.negative);
    println!("SMART goal: {}", fb.smart_goal);
    println!("Support:    {}", fb.support);
    println!("Next steps: {}", fb.next_steps);
    println!("Overall:    {}", fb.overall);
    Ok(())
}

fn print_sbi(title: &str, obs: &SbiObservation) {
    println!("\n{title}");
    println!("  Situation: {}", obs.situation);
    println!("  Behavior:  {}", obs.behavior);
    println!("  Impact:    {}", obs.impact);
}
