use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod slash;

#[derive(Parser)]
#[command(name = "ofppt")]
#[command(about = "OFPPT Connect - AI study assistant, campus news and student profile")]
#[command(version)]
struct Cli {
    /// LLM model to use
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// LLM provider (gemini, claude, openai)
    #[arg(long, global = true)]
    provider: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive chat with the assistant (default)
    Chat,
    /// Send a single message and print the reply
    Ask {
        /// Message text
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Print the conversation history
    History {
        /// Print raw JSON instead of formatted turns
        #[arg(long)]
        json: bool,
    },
    /// Delete the turn with the given timestamp
    Delete { timestamp: i64 },
    /// Clear the conversation back to the greeting
    Reset,
    /// Browse campus news
    News {
        /// Course, Event, News, Clubs or All
        #[arg(long = "type", default_value = "all")]
        kind: String,
        /// Case-insensitive search in title and description
        #[arg(short, long, default_value = "")]
        search: String,
        /// Read a JSON snapshot instead of the local document store
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Manage the student profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Show the profile registered on this device
    Show,
    /// Register a new profile
    Create {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        filiere: String,
        #[arg(long)]
        niveau: String,
        #[arg(long)]
        annee: String,
        #[arg(long)]
        option: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = ofppt_core::Settings::load();

    if let Some(ref provider) = cli.provider {
        let provider = ofppt_core::config::LlmProvider::parse(provider)
            .ok_or_else(|| anyhow::anyhow!("Unknown provider: {}", provider))?;
        settings.set_provider(provider);
    }
    if let Some(ref model) = cli.model {
        settings.llm.model = model.clone();
    }

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => commands::run_chat(&settings).await?,
        Command::Ask { text } => commands::ask(&settings, &text.join(" ")).await?,
        Command::History { json } => commands::print_history(&settings, json).await?,
        Command::Delete { timestamp } => commands::delete(&settings, timestamp).await?,
        Command::Reset => commands::reset(&settings).await?,
        Command::News {
            kind,
            search,
            snapshot,
        } => commands::news(&settings, &kind, &search, snapshot.as_deref()).await?,
        Command::Profile { action } => match action {
            ProfileAction::Show => commands::show_profile(&settings).await?,
            ProfileAction::Create {
                first_name,
                last_name,
                filiere,
                niveau,
                annee,
                option,
            } => {
                let form = ofppt_core::NewUser {
                    first_name,
                    last_name,
                    filiere,
                    niveau,
                    annee,
                    option,
                };
                commands::create_profile(&settings, form).await?
            }
        },
    }

    Ok(())
}
