//! qmtrainer CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use qmtrainer_core::model::SessionId;

mod commands;

use commands::feedback::FeedbackFields;
use commands::Context;

#[derive(Parser)]
#[command(
    name = "qmtrainer",
    version,
    about = "Quality evaluation of CPR-instruction dispatch trainings"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Trainer identity recorded on new sessions
    #[arg(long, global = true)]
    trainer: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and protocol file
    Init,

    /// Show and validate the evaluation protocol
    Protocol {
        /// Protocol TOML file (default: the configured protocol)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Output format: text, toml
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Evaluate and store a live stopwatch submission (JSON, "-" for stdin)
    Submit {
        #[arg(long)]
        file: PathBuf,
    },

    /// Evaluate and store manually entered step times
    Reenter {
        /// Name of the trainee
        #[arg(long)]
        disponent: String,

        /// Step time as STEP=SECONDS (repeatable)
        #[arg(long = "time")]
        times: Vec<String>,
    },

    /// List stored sessions, newest first
    List {
        /// Only sessions of this trainee
        #[arg(long)]
        disponent: Option<String>,

        /// Output format: text, json, html
        #[arg(long, default_value = "text")]
        format: String,

        /// Output file for the html format
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show one session with its evaluated steps
    Show {
        id: SessionId,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Delete a session together with its steps and feedback
    Delete { id: SessionId },

    /// Record or read structured feedback
    Feedback {
        #[command(subcommand)]
        command: FeedbackCommands,
    },

    /// Write a session report file
    Report {
        id: SessionId,

        /// Output format: html, json
        #[arg(long, default_value = "html")]
        format: String,

        /// Output file (default: qm-report-<id>.<format>)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum FeedbackCommands {
    /// Append a feedback entry to a session
    Add {
        id: SessionId,

        #[command(flatten)]
        fields: FeedbackFields,
    },

    /// Show a single feedback entry
    Show {
        id: SessionId,
        feedback_id: Uuid,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("qmtrainer=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Init = cli.command {
        return commands::init::execute();
    }

    let ctx = Context::load(cli.config, cli.trainer)?;

    match cli.command {
        Commands::Init => Ok(()),
        Commands::Protocol { file, format } => commands::protocol::execute(&ctx, file, format),
        Commands::Submit { file } => commands::submit::execute(&ctx, file).await,
        Commands::Reenter { disponent, times } => {
            commands::reenter::execute(&ctx, disponent, times).await
        }
        Commands::List {
            disponent,
            format,
            output,
        } => commands::list::execute(&ctx, disponent, format, output).await,
        Commands::Show { id, format } => commands::show::execute(&ctx, id, format).await,
        Commands::Delete { id } => commands::delete::execute(&ctx, id).await,
        Commands::Feedback { command } => match command {
            FeedbackCommands::Add { id, fields } => commands::feedback::add(&ctx, id, fields).await,
            FeedbackCommands::Show {
                id,
                feedback_id,
                format,
            } => commands::feedback::show(&ctx, id, feedback_id, format).await,
        },
        Commands::Report { id, format, output } => {
            commands::report::execute(&ctx, id, format, output).await
        }
    }
}
