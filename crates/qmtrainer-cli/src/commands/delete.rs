//! The `qmtrainer delete` command.

use anyhow::Result;

use qmtrainer_core::model::SessionId;

use super::Context;

pub async fn execute(ctx: &Context, id: SessionId) -> Result<()> {
    let trainer = ctx.trainer()?;
    let store = ctx.store().await?;

    if !store.delete_session(id).await? {
        anyhow::bail!("session {id} not found");
    }
    tracing::info!(session = id, trainer = %trainer, "session deleted");
    println!("Deleted session #{id} with its steps and feedback");
    Ok(())
}
