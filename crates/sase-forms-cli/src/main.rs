//! OpenSASE Forms CLI
//!
//! Operator command line over the forms engine.
//!
//! # Usage
//!
//! ```bash
//! opensase-forms forms validate survey.json
//! opensase-forms forms publish survey.json
//! opensase-forms forms status <form-id> disabled
//! opensase-forms submissions submit <form-id> --answers answers.json --code 1234
//! opensase-forms submissions list <form-id> --format yaml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod output;

#[derive(Parser)]
#[command(name = "opensase-forms")]
#[command(author = "OpenSASE")]
#[command(version)]
#[command(about = "OpenSASE Forms command line interface", long_about = None)]
pub struct Cli {
    /// Config file
    #[arg(long, env = "FORMS_CONFIG", default_value = sase_forms::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Directory of the file storage tier
    #[arg(long, env = "FORMS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Base URL for share links
    #[arg(long, env = "APP_URL")]
    base_url: Option<String>,

    /// Skip the file tier and keep everything in memory
    #[arg(long)]
    memory_only: bool,

    /// Output format
    #[arg(long, short, global = true, default_value = "json")]
    format: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage forms
    Forms {
        #[command(subcommand)]
        action: FormCommands,
    },
    /// Manage submissions
    Submissions {
        #[command(subcommand)]
        action: SubmissionCommands,
    },
    /// Show which storage tier is serving
    Health,
}

#[derive(Subcommand)]
pub enum FormCommands {
    /// Check a schema file without publishing it
    Validate { file: PathBuf },
    /// Publish a schema file
    Publish { file: PathBuf },
    /// Replace an existing form's definition, keeping its counter and status
    Republish { id: String, file: PathBuf },
    /// Get form details
    Get { id: String },
    /// List all forms
    List,
    /// Set form status
    Status {
        id: String,
        /// active or disabled
        status: String,
    },
    /// Delete a form and its submissions
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum SubmissionCommands {
    /// Submit answers from a JSON file
    Submit {
        form_id: String,
        #[arg(short, long)]
        answers: PathBuf,
        /// Validation code, when the form requires one
        #[arg(long)]
        code: Option<String>,
    },
    /// List submissions of a form, newest first
    List { form_id: String },
    /// Delete a single submission
    Delete { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    sase_forms::telemetry::init("info")?;

    let config = config::resolve(&cli)?;

    let succeeded = match cli.command {
        Commands::Forms { action: FormCommands::Validate { file } } => {
            commands::forms::validate(&file, cli.format)?
        }
        command => {
            let app = commands::App::open(&config).await?;
            match command {
                Commands::Forms { action } => commands::forms::handle(action, &app, cli.format).await?,
                Commands::Submissions { action } => {
                    commands::submissions::handle(action, &app, cli.format).await?
                }
                Commands::Health => commands::health(&app, cli.format)?,
            }
        }
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}
