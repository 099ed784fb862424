//! Crewlink CLI - chat with an agent-team backend from the terminal
//!
//! All backend interaction goes through `crewlink_core::ChatClient`; this
//! binary only parses arguments, renders client events and runs the prompt.

mod chat;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;

use crewlink_core::config::ConfigManager;
use crewlink_core::{ChatClient, Config};

use render::Renderer;

#[derive(Parser)]
#[command(name = "crewlink")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Chat with an agent-team backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Backend base URL (overrides config and CREWLINK_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Resume a previously issued session id
    #[arg(long, global = true)]
    session: Option<String>,

    /// Recursion limit forwarded with each query
    #[arg(long, global = true)]
    recursion_limit: Option<u32>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat mode
    Chat,

    /// Ask a single question and exit
    Ask {
        /// The question to send
        query: String,
    },

    /// List files in the session workspace
    Files,

    /// Download a workspace file
    Download {
        /// Path as shown by `files`
        path: String,

        /// Target directory (defaults to the configured download dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone())?,
        None => ConfigManager::default(),
    };

    // Setup logging - warn level by default so logs stay out of the chat
    // Use --verbose for info/debug level logs
    let filter = if cli.verbose {
        "info,crewlink_core=debug".to_string()
    } else {
        manager.config().general.log_level.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = manager.config_path().to_path_buf();
    let mut config = manager.into_config();
    if let Some(url) = &cli.base_url {
        config.api.base_url = url.clone();
    }
    if let Some(limit) = cli.recursion_limit {
        config.query.recursion_limit = limit;
    }

    let mut client = ChatClient::from_config(&config)?;
    if let Some(id) = &cli.session {
        client = client.with_session_id(id.clone());
    }

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => chat::run_chat(client, config.downloads.target_dir()).await?,
        Commands::Ask { query } => run_ask(client, &query).await?,
        Commands::Files => run_files(client, &config).await?,
        Commands::Download { path, out } => {
            let dir = out.unwrap_or_else(|| config.downloads.target_dir());
            run_download(client, &config, &path, dir).await?
        }
        Commands::Config => show_config(&config, &config_path)?,
    }

    Ok(())
}

async fn run_ask(client: ChatClient, query: &str) -> anyhow::Result<()> {
    let mut rx = client.subscribe();
    let mut renderer = Renderer::new();

    chat::run_query(&client, &mut renderer, &mut rx, query).await?;

    let snapshot = client.snapshot();
    if !snapshot.workspace_files.is_empty() {
        println!();
        chat::print_files(&client);
    }
    Ok(())
}

async fn run_files(client: ChatClient, config: &Config) -> anyhow::Result<()> {
    if !client.initialize().await {
        anyhow::bail!("could not establish a session with {}", config.api.base_url);
    }
    println!("Session: {}", style(client.session_id()).green());
    chat::print_files(&client);
    Ok(())
}

async fn run_download(client: ChatClient, config: &Config, path: &str, dir: PathBuf) -> anyhow::Result<()> {
    if !client.initialize().await {
        anyhow::bail!("could not establish a session with {}", config.api.base_url);
    }
    let target = client.download_workspace_path(path, &dir).await?;
    println!("{} {}", style("Saved").green(), target.display());
    Ok(())
}

fn show_config(config: &Config, path: &std::path::Path) -> anyhow::Result<()> {
    println!("{}", style("Configuration:").bold());
    println!();
    println!("  Config file: {}", style(path.display()).dim());
    println!("  Backend:     {}", style(&config.api.base_url).green());
    println!();
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
