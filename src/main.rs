//! codescribe - an interactive CLI assistant that turns AI replies into files.
//!
//! Forwards user prompts to a text-generation endpoint, renders the reply,
//! and persists any fenced code blocks it contains under a managed output
//! directory.

mod client;
mod config;
mod history;
mod repl;
mod scanner;
mod store;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use std::process::Command as ProcessCommand;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "codescribe")]
#[command(author, version, about = "An interactive CLI assistant that turns AI replies into files")]
#[command(long_about = "Chat with a text-generation API from your terminal.\n\nAny fenced code blocks in a reply are saved under the output directory\n(default: ./generated), named from the code itself, your request, or a\ngenerated_<n> fallback.")]
struct Cli {
    /// One-shot prompt; omit to start the interactive session
    #[arg(value_name = "PROMPT")]
    prompt: Option<String>,

    /// Override the model for this run
    #[arg(short, long, value_name = "MODEL")]
    model: Option<String>,

    /// Override the sampling temperature for this run
    #[arg(short, long, value_name = "TEMP")]
    temperature: Option<f32>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all generated files
    Files,
    /// Delete all generated files
    Clean,
    /// Open the configuration file in $EDITOR
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("codescribe=warn".parse().unwrap())
                .add_directive("reqwest=warn".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(model) = cli.model {
        config.backend.model = model;
    }
    if let Some(temperature) = cli.temperature {
        config.backend.temperature = temperature.clamp(0.0, 3.0);
    }

    match cli.command {
        Some(Commands::Files) => handle_files(&config),
        Some(Commands::Clean) => handle_clean(&config),
        Some(Commands::Config) => handle_config(),
        None => match cli.prompt {
            Some(prompt) => handle_prompt(&config, &prompt).await,
            None => handle_chat(&config).await,
        },
    }
}

/// List every file under the output root.
fn handle_files(config: &Config) -> Result<()> {
    let store = store::FileStore::new(&config.output.dir)?;
    let files = store.list();
    if files.is_empty() {
        println!("No files generated yet.");
        return Ok(());
    }
    for path in files {
        println!("{}", path.display());
    }
    Ok(())
}

/// Delete every file under the output root.
fn handle_clean(config: &Config) -> Result<()> {
    let store = store::FileStore::new(&config.output.dir)?;
    let count = store.clear()?;
    println!("Deleted {} file(s)", count);
    Ok(())
}

/// Open the configuration file in $EDITOR, creating it first if needed.
fn handle_config() -> Result<()> {
    let config_path = Config::config_path()?;

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !config_path.exists() {
        Config::default().save()?;
        println!("Created default config at {}", config_path.display());
    }

    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let status = ProcessCommand::new(&editor)
        .arg(&config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        eprintln!("Editor exited with non-zero status");
    }

    Ok(())
}

/// One-shot mode: a single chat turn without the interactive session.
/// The save pipeline still runs; saved paths go to stderr so stdout stays
/// clean for the reply itself.
async fn handle_prompt(config: &Config, prompt: &str) -> Result<()> {
    let client = client::ChatClient::new(
        &config.backend.url,
        &config.backend.model,
        config.backend.temperature,
    );
    let store = store::FileStore::new(&config.output.dir)?;
    let mut history = history::History::new(config.chat.history_limit);

    let reply = client
        .chat(&mut history, repl::SYSTEM_PROMPT, prompt)
        .await?;
    println!("{}", reply);

    let saved = store.process_response(&reply, prompt)?;
    for path in &saved {
        eprintln!("saved {}", path.display());
    }
    Ok(())
}

/// Interactive chat mode.
async fn handle_chat(config: &Config) -> Result<()> {
    if !atty::is(atty::Stream::Stdin) {
        anyhow::bail!("Interactive mode needs a terminal. Pass a prompt argument for one-shot use.");
    }

    let mut session = repl::Session::new(config)?;
    session.run().await
}
