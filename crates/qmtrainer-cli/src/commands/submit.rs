//! The `qmtrainer submit` command: store a live stopwatch submission.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context as _, Result};

use qmtrainer_core::model::{LiveSubmission, NewSession};

use super::show::print_evaluation;
use super::Context;

pub async fn execute(ctx: &Context, file: PathBuf) -> Result<()> {
    let trainer = ctx.trainer()?;
    let protocol = ctx.protocol()?;

    let content = if file.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read submission from stdin")?;
        buf
    } else {
        std::fs::read_to_string(&file)
            .with_context(|| format!("failed to read submission: {}", file.display()))?
    };
    let submission: LiveSubmission =
        serde_json::from_str(&content).context("failed to parse submission JSON")?;

    let new_session = NewSession::from_live(&protocol, &trainer, submission)?;
    let store = ctx.store().await?;
    let session = store.insert_session(new_session).await?;

    println!("Stored session #{} for {}", session.id, session.disponent);
    let evaluation = session.evaluate(&protocol)?;
    print_evaluation(&evaluation);
    Ok(())
}
