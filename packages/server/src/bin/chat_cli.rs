//! Terminal chat against the policy assistant
//!
//! Runs the same chat graph as the HTTP server, in-process. Conversation
//! history is kept for the session only.

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use dialoguer::{theme::ColorfulTheme, Input};
use server_core::config::{Config, DEFAULT_LOG_FILTER};
use server_core::domains::chat::{ChatGraph, ChatMessage, ReplyStatus};
use server_core::domains::sites::normalize_site_url;
use server_core::kernel::setup::build_server_deps;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_URL: &str = "https://github.com/";
const QUIT_WORDS: &[&str] = &["quit", "exit", "bye", "stop"];

#[derive(Parser)]
#[command(name = "chat_cli")]
#[command(about = "Ask questions about a website's privacy policy and terms")]
struct Cli {
    /// Site to ask about (prompted for when omitted)
    #[arg(long)]
    url: Option<String>,

    /// Session id used in logs
    #[arg(long, default_value = "cli")]
    session: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    let deps = build_server_deps(&config).await?;
    let graph = ChatGraph::new(&deps);
    let theme = ColorfulTheme::default();

    let url = match cli.url {
        Some(url) => url,
        None => Input::with_theme(&theme)
            .with_prompt("Website URL")
            .default(DEFAULT_URL.to_string())
            .interact_text()?,
    };
    let mut current_url = Some(normalize_site_url(&url)?);

    println!(
        "{} Asking about {}. Type 'quit' to exit.",
        style("ClauseBit").cyan().bold(),
        style(current_url.as_deref().unwrap_or(DEFAULT_URL)).underlined()
    );

    let mut history: Vec<ChatMessage> = Vec::new();

    loop {
        let question: String = Input::with_theme(&theme)
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()?;
        let question = question.trim().to_string();

        if question.is_empty() {
            println!("Please enter a question or type 'quit' to exit.");
            continue;
        }
        if QUIT_WORDS.contains(&question.to_lowercase().as_str()) {
            println!("{}", style("Goodbye!").dim());
            break;
        }

        let reply = graph
            .respond(
                &question,
                &cli.session,
                None,
                current_url.as_deref(),
                history.clone(),
            )
            .await;

        let label = match reply.status {
            ReplyStatus::Success => style("ClauseBit").green().bold(),
            ReplyStatus::NoResponse => style("ClauseBit").yellow().bold(),
        };
        println!("{}: {}\n", label, reply.response);

        history.push(ChatMessage::user(&question));
        history.push(ChatMessage::assistant(&reply.response));
        current_url = reply.current_url;
    }

    Ok(())
}
