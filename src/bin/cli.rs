//! WebMemory CLI
//!
//! Command-line interface for chatting with the history agent and checking
//! the health of its collaborators.

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{theme::ColorfulTheme, Input};
use std::io::{self, Write};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use webmemory::agent::prompts::{build_system_prompt, load_profile};
use webmemory::agent::{
    HistoryAgent, LoopCallback, LoopConfig, OpenAiClient, ToolObservation,
};
use webmemory::history::{init_pool, EmbeddingService, HistoryRetriever, HistoryStore};
use webmemory::tools::history_registry;
use webmemory::{Config, Error, Result, VERSION};

/// Shown instead of error details; the real error goes to the log only.
const GENERIC_FAILURE: &str = "An internal error occurred. Please try again.";

#[derive(Parser)]
#[command(
    name = "webmemory",
    author = "WebMemory Contributors",
    version = VERSION,
    about = "WebMemory - ask questions about your web browsing history",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat with the history agent
    Chat {
        /// Conversation thread id (a fresh one is generated if omitted)
        #[arg(short, long)]
        thread: Option<String>,
    },

    /// Ask a single question and print the answer
    Ask {
        /// The question to ask
        question: String,
        /// Conversation thread id
        #[arg(short, long)]
        thread: Option<String>,
    },

    /// Check the status of the provider, database, and profile
    Status,

    /// Show the user profile text the agent is given
    Profile,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env()?;
    init_logging(&config);

    match cli.command {
        Commands::Chat { thread } => {
            config.validate()?;
            chat(&config, thread).await
        }
        Commands::Ask { question, thread } => {
            config.validate()?;
            ask_once(&config, &question, thread).await
        }
        Commands::Status => check_status(&config).await,
        Commands::Profile => show_profile(&config),
    }
}

/// Initialize tracing from the log configuration
fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log.level));

    if config.log.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Wire up the full agent from configuration
async fn build_agent(config: &Config) -> Result<HistoryAgent> {
    let pool = init_pool(&config.database).await?;
    let embedding = EmbeddingService::new()?;
    let store: Arc<dyn HistoryRetriever> =
        Arc::new(HistoryStore::new(pool, embedding, &config.retrieval));

    let profile = load_profile(&config.profile_path);
    let system_prompt = build_system_prompt(&profile)?;

    let client = OpenAiClient::new(config.provider.clone())?;
    let registry = history_registry(store);

    Ok(HistoryAgent::new(
        client,
        registry,
        system_prompt,
        LoopConfig::from_config(&config.agent),
    ))
}

/// Prints tool activity as the loop works
struct ProgressCallback;

#[async_trait]
impl LoopCallback for ProgressCallback {
    async fn on_tool_executed(&self, tool_name: &str, observation: &ToolObservation) {
        let marker = if observation.success { "→" } else { "✗" };
        println!(
            "{}",
            style(format!("  {} {} ({}ms)", marker, tool_name, observation.duration_ms)).dim()
        );
    }
}

/// Interactive chat REPL
async fn chat(config: &Config, thread: Option<String>) -> Result<()> {
    let agent = build_agent(config).await?;
    let thread_id = thread.unwrap_or_else(|| format!("cli-{}", Uuid::new_v4()));

    println!();
    println!("{}", style("WebMemory - personal browsing-history agent").cyan().bold());
    println!("{}", style(format!("thread: {}", thread_id)).dim());
    println!("{}", style("Type your question, or 'exit' to quit.").dim());
    println!();

    loop {
        let question: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("you")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| Error::Internal(format!("Input error: {}", e)))?;

        let question = question.trim().to_string();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            println!("{}", style("Bye!").dim());
            break;
        }

        match agent
            .ask_with_callback(&question, &thread_id, ProgressCallback)
            .await
        {
            Ok(answer) => {
                println!("{} {}", style("agent").green().bold(), answer.answer);
                println!();
            }
            Err(e) => {
                error!("Agent turn failed: {}", e);
                println!("{} {}", style("agent").red().bold(), GENERIC_FAILURE);
                println!();
            }
        }
    }

    Ok(())
}

/// Answer one question and exit
async fn ask_once(config: &Config, question: &str, thread: Option<String>) -> Result<()> {
    let agent = build_agent(config).await?;
    let thread_id = thread.unwrap_or_else(|| format!("cli-{}", Uuid::new_v4()));

    match agent
        .ask_with_callback(question, &thread_id, ProgressCallback)
        .await
    {
        Ok(answer) => {
            println!("{}", answer.answer);
            Ok(())
        }
        Err(e) => {
            // The raw error may reference retrieved content; keep it in the
            // log and give the terminal only the generic notice.
            error!("Agent turn failed: {}", e);
            println!("{}", GENERIC_FAILURE);
            std::process::exit(1);
        }
    }
}

/// Check connectivity to the agent's collaborators
async fn check_status(config: &Config) -> Result<()> {
    println!();
    println!("{}", style("WebMemory status").cyan().bold());
    println!();

    // Provider
    print!("   Provider ({})... ", config.provider.model);
    io::stdout().flush()?;
    match OpenAiClient::new(config.provider.clone()) {
        Ok(client) => match client.list_models().await {
            Ok(models) => println!("{} ({} models visible)", style("✓").green(), models.len()),
            Err(e) => {
                error!("Provider check failed: {}", e);
                println!("{}", style("✗ unreachable").red());
            }
        },
        Err(e) => {
            error!("Provider client error: {}", e);
            println!("{}", style("✗ misconfigured").red());
        }
    }

    // Database
    print!("   PostgreSQL... ");
    io::stdout().flush()?;
    match init_pool(&config.database).await {
        Ok(_) => println!("{}", style("✓").green()),
        Err(e) => {
            error!("Database check failed: {}", e);
            println!("{}", style("✗ unreachable").red());
        }
    }

    // Profile
    print!("   Profile ({})... ", config.profile_path.display());
    io::stdout().flush()?;
    if config.profile_path.exists() {
        println!("{}", style("✓").green());
    } else {
        println!("{}", style("absent (sentinel will be used)").yellow());
    }

    println!();
    Ok(())
}

/// Print the profile text the agent will be given
fn show_profile(config: &Config) -> Result<()> {
    let profile = load_profile(&config.profile_path);
    println!("{}", profile);
    Ok(())
}
