use anyhow::{Context, Result};
use chrono::{Local, TimeZone, Utc};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use ofppt_core::chat::{ChatTurn, Role};
use ofppt_core::news::{
    filter_news, relative_time, truncate_description, DEFAULT_DESCRIPTION_LEN,
};
use ofppt_core::{
    CompletionClient, ConversationStore, NewUser, NewsFeed, NewsFilter, NewsItem, OfpptError,
    ProfileService, Settings,
};

use crate::slash::{handle_command, SlashCommand};

/// Stands in for the completion service when no API key is configured, so
/// history commands keep working offline.
struct UnconfiguredClient {
    reason: String,
    model: String,
}

#[async_trait::async_trait]
impl CompletionClient for UnconfiguredClient {
    async fn complete(&self, _prompt: &str) -> Result<String, OfpptError> {
        Err(OfpptError::Config(self.reason.clone()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn open_store(settings: &Settings) -> Result<ConversationStore> {
    let storage = Arc::new(settings.build_key_value_store()?);
    let llm: Arc<dyn CompletionClient> = match settings.build_completion_client() {
        Ok(client) => Arc::from(client),
        Err(e) => {
            tracing::debug!(error = %e, "Completion client unavailable");
            Arc::new(UnconfiguredClient {
                reason: e.to_string(),
                model: settings.llm.model.clone(),
            })
        }
    };
    Ok(settings.build_conversation_store(storage, llm))
}

/// Message shown instead of sending a chat turn when no API key is set.
fn missing_key_message(settings: &Settings) -> String {
    format!(
        "No API key configured for {}: export {}",
        settings.llm.model, settings.llm.api_key_env
    )
}

fn format_time(timestamp: i64) -> String {
    match Local.timestamp_millis_opt(timestamp).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => timestamp.to_string(),
    }
}

fn print_turn(turn: &ChatTurn) {
    let who = match turn.role {
        Role::User => "Vous",
        Role::Assistant => "Assistant",
    };
    println!("[{}] {} ({}):", turn.timestamp, who, format_time(turn.timestamp));
    println!("{}\n", turn.content);
}

pub async fn run_chat(settings: &Settings) -> Result<()> {
    let store = open_store(settings)?;

    println!("OFPPT Assistant ({}). Type /help for commands.\n", store.model());
    for turn in store.history().await {
        print_turn(&turn);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match handle_command(input) {
            SlashCommand::Quit => break,
            SlashCommand::Message(msg) => println!("{}\n", msg),
            SlashCommand::History => {
                for turn in store.history().await {
                    print_turn(&turn);
                }
            }
            SlashCommand::Clear => {
                store.reset_to_greeting().await;
                for turn in store.history().await {
                    print_turn(&turn);
                }
            }
            SlashCommand::Delete(ts) => {
                store.delete_turn(ts).await;
                println!("Message supprimé.\n");
            }
            SlashCommand::NotACommand if settings.api_key().is_none() => {
                eprintln!("{}\n", missing_key_message(settings));
            }
            SlashCommand::NotACommand => match store.generate_response(input).await {
                Ok(reply) => {
                    if let Some(turn) = store.history().await.last() {
                        print_turn(turn);
                    } else {
                        println!("{}\n", reply);
                    }
                }
                Err(e) => {
                    eprintln!("Erreur: {}", e);
                    if e.is_retryable() {
                        eprintln!("Votre message est conservé. Réessayez.\n");
                    }
                }
            },
        }
    }

    Ok(())
}

pub async fn ask(settings: &Settings, text: &str) -> Result<()> {
    if settings.api_key().is_none() {
        anyhow::bail!(missing_key_message(settings));
    }
    let store = open_store(settings)?;
    let reply = store.generate_response(text).await?;
    println!("{}", reply);
    Ok(())
}

pub async fn print_history(settings: &Settings, json: bool) -> Result<()> {
    let store = open_store(settings)?;
    let history = store.history().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
    } else {
        for turn in &history {
            print_turn(turn);
        }
    }
    Ok(())
}

pub async fn delete(settings: &Settings, timestamp: i64) -> Result<()> {
    let store = open_store(settings)?;
    store.delete_turn(timestamp).await;
    println!("{} messages remaining", store.history().await.len());
    Ok(())
}

pub async fn reset(settings: &Settings) -> Result<()> {
    let store = open_store(settings)?;
    store.reset_to_greeting().await;
    println!("Conversation cleared");
    Ok(())
}

pub async fn news(
    settings: &Settings,
    kind: &str,
    search: &str,
    snapshot: Option<&Path>,
) -> Result<()> {
    let filter = NewsFilter::parse(kind).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown news type: {} (Course, Event, News, Clubs, All)",
            kind
        )
    })?;

    let items = match snapshot {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            NewsItem::from_snapshot(serde_json::from_str(&raw)?)
        }
        None => {
            let documents = Arc::new(settings.build_document_store()?);
            NewsFeed::new(documents).load().await?
        }
    };

    let matched = filter_news(&items, filter, search);
    if matched.is_empty() {
        println!("No news found");
        return Ok(());
    }

    let now = Utc::now();
    for item in matched {
        let age = relative_time(item.created_at, now);
        let summary = truncate_description(&item.description, DEFAULT_DESCRIPTION_LEN);
        println!("[{}] {} · {}", item.kind, item.title, age);
        println!("    {}\n", summary);
    }
    Ok(())
}

fn profile_service(settings: &Settings) -> Result<ProfileService> {
    let documents = Arc::new(settings.build_document_store()?);
    let local = Arc::new(settings.build_key_value_store()?);
    Ok(ProfileService::new(documents, local))
}

pub async fn show_profile(settings: &Settings) -> Result<()> {
    let service = profile_service(settings)?;
    match service.current_profile().await? {
        Some(user) => {
            println!("{}", user.full_name());
            println!("  Filière : {}", user.filiere);
            println!("  Niveau  : {}", user.niveau);
            println!("  Année   : {}", user.annee);
            if let Some(option) = user.option {
                println!("  Option  : {}", option);
            }
        }
        None => println!("No profile registered. Run `ofppt profile create`."),
    }
    Ok(())
}

pub async fn create_profile(settings: &Settings, form: NewUser) -> Result<()> {
    let service = profile_service(settings)?;
    let user = service.create_profile(form).await?;
    service.mark_registration_completed().await?;
    println!("Profile created: {} ({})", user.full_name(), user.id);
    Ok(())
}
