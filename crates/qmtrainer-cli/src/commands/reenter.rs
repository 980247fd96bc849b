//! The `qmtrainer reenter` command: store manually entered step times.

use anyhow::Result;
use chrono::Utc;

use qmtrainer_core::model::{ManualEntry, NewSession};

use super::show::print_evaluation;
use super::Context;

pub async fn execute(ctx: &Context, disponent: String, times: Vec<String>) -> Result<()> {
    let trainer = ctx.trainer()?;
    let protocol = ctx.protocol()?;

    let mut entry = ManualEntry::new(disponent);
    for pair in &times {
        let (step, secs) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("invalid --time '{pair}', expected STEP=SECONDS"))?;
        entry.insert_time(step.trim(), secs.trim())?;
    }

    let new_session = NewSession::from_manual_entry(&protocol, &trainer, &entry, Utc::now())?;
    let store = ctx.store().await?;
    let session = store.insert_session(new_session).await?;

    println!("Stored session #{} for {}", session.id, session.disponent);
    let evaluation = session.evaluate(&protocol)?;
    print_evaluation(&evaluation);
    Ok(())
}
